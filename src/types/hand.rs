//! Hand state enumeration

use crate::{BridgeError, Result};

/// Hand pose reported by the sensor for one hand.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum HandState {
    #[default]
    Unknown = 0,
    NotTracked = 1,
    Open = 2,
    Closed = 3,
    Lasso = 4,
}

impl HandState {
    pub const ALL: [HandState; 5] = [
        HandState::Unknown,
        HandState::NotTracked,
        HandState::Open,
        HandState::Closed,
        HandState::Lasso,
    ];

    /// Integer code used on the wire.
    pub fn code(self) -> u8 {
        self as u8
    }
}

impl TryFrom<u32> for HandState {
    type Error = BridgeError;

    fn try_from(value: u32) -> Result<Self> {
        match value {
            0 => Ok(HandState::Unknown),
            1 => Ok(HandState::NotTracked),
            2 => Ok(HandState::Open),
            3 => Ok(HandState::Closed),
            4 => Ok(HandState::Lasso),
            _ => Err(BridgeError::decode("hand state", format!("unknown hand state code {}", value))),
        }
    }
}

/// Which hand a hand-state message refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HandSide {
    Left,
    Right,
}
