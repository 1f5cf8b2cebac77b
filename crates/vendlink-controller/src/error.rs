//! Error types for the controller.

use thiserror::Error;
use vendlink_hardware::HardwareError;

/// Result type alias for controller operations.
pub type Result<T> = std::result::Result<T, ControllerError>;

/// Errors that stop the controller.
///
/// Everything that goes wrong inside a transaction cycle is absorbed by the
/// control loop (retry or return to `Init`). Only these reach the caller.
#[derive(Debug, Error)]
pub enum ControllerError {
    /// The status display could not be brought up. The controller must not
    /// run without visible status output.
    #[error("Display initialization failed: {0}")]
    DisplayInit(#[source] HardwareError),

    /// Invalid configuration.
    #[error("Configuration error: {0}")]
    Config(#[from] vendlink_core::Error),
}
