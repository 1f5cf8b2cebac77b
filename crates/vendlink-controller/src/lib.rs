//! Vending transaction controller.
//!
//! This crate contains the transaction state machine and the control loop
//! that drives it, plus the display renderers used to report progress.

pub mod config;
pub mod controller;
pub mod display;
pub mod error;
pub mod state_machine;

pub use config::ControllerConfig;
pub use controller::TransactionController;
pub use display::{ConsoleDisplay, VirtualDisplay, pad_line, truncate_text};
pub use error::{ControllerError, Result};
pub use state_machine::{Phase, PhaseMachine, PhaseTransition};
