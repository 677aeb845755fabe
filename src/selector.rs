//! Nearest-subject selection
//!
//! Only one subject is transmitted per tick: the tracked body whose root joint
//! is closest to the sensor.

use tracing::trace;

use crate::types::Body;

/// Index of the nearest tracked subject, if any.
///
/// Distance is the squared Euclidean distance of the root joint from the
/// sensor origin. Only tracked bodies with a root reading at a finite
/// distance are candidates. Ties go to the first candidate in iteration order.
pub fn nearest_index(bodies: &[Body]) -> Option<usize> {
    let mut nearest: Option<(usize, f64)> = None;

    for (index, body) in bodies.iter().enumerate() {
        if !body.tracked {
            continue;
        }
        let Some(root) = body.root_position() else {
            continue;
        };
        let distance = root.length_squared();
        if !distance.is_finite() {
            continue;
        }
        match nearest {
            Some((_, best)) if distance >= best => {}
            _ => nearest = Some((index, distance)),
        }
    }

    if let Some((index, distance)) = nearest {
        trace!(index, distance, candidates = bodies.len(), "Selected nearest subject");
    }
    nearest.map(|(index, _)| index)
}

/// The nearest tracked subject, if any.
pub fn select_nearest(bodies: &[Body]) -> Option<&Body> {
    nearest_index(bodies).map(|index| &bodies[index])
}
