//! Body-tracking sensor bridge.
//!
//! Bodylink forwards body-tracking data from a sensor process to a consumer
//! process on the same machine (for example a game engine) over two
//! transports:
//!
//! - **Text channel**: one line per message (`S|...`, `L|2`, `P|`, ...) for
//!   low-volume, latency-sensitive pose and event data
//! - **Shared frame buffers**: two fixed-size named memory regions for color
//!   and depth rasters
//!
//! # Features
//!
//! - **Protocol codec**: locale-independent, round-trippable encoding of
//!   skeleton, hand, face, ping, error and debug messages
//! - **Nearest subject**: only the tracked body closest to the sensor is sent
//! - **Liveness watchdog**: the bridge exits when the consumer stops echoing
//!   pings
//! - **Bounded output**: a slow consumer drops whole ticks instead of
//!   stalling acquisition
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use bodylink::{Bridge, BridgeConfig, RecordingSource};
//!
//! #[tokio::main]
//! async fn main() -> bodylink::Result<()> {
//!     let source = RecordingSource::open("session.yaml")?;
//!     let outcome = Bridge::new(BridgeConfig::default(), source)
//!         .run(tokio::io::stdin(), tokio::io::stdout())
//!         .await?;
//!     println!("{:?}", outcome);
//!     Ok(())
//! }
//! ```

// Core types and error handling
mod error;
#[cfg(any(test, feature = "benchmark"))]
pub mod test_utils;
pub mod types;

// Codec and transports
pub mod protocol;
pub mod shm;

// Per-tick processing
pub mod assembler;
pub mod selector;

// Runtime
pub mod bridge;
pub mod config;
pub mod driver;
pub mod exit;
pub mod inbound;
pub mod logging;
pub mod outbound;
pub mod provider;
pub mod providers;
pub mod watchdog;

// Core exports
pub use error::*;
pub use types::*;

// Main API exports
pub use bridge::{Bridge, Shutdown};
pub use config::BridgeConfig;
pub use provider::SensorSource;
pub use providers::{AbsentSensor, RecordingSource};
