//! Process exit codes for the `bodylink` binary

use crate::bridge::Shutdown;
use crate::{BridgeError, Result};

pub const SUCCESS: i32 = 0;
pub const FAILURE: i32 = 1;
pub const NO_SENSOR: i32 = 2;
pub const WATCHDOG_TIMEOUT: i32 = 3;
pub const USAGE: i32 = 64;

/// Exit code for a finished session.
pub fn code_for(outcome: &Result<Shutdown>) -> i32 {
    match outcome {
        Ok(_) => SUCCESS,
        Err(BridgeError::NoSensorAvailable) => NO_SENSOR,
        Err(BridgeError::WatchdogTimeout { .. }) => WATCHDOG_TIMEOUT,
        Err(_) => FAILURE,
    }
}
