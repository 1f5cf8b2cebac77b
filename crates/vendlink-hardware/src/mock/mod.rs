//! Mock device implementations for testing and development.
//!
//! This module provides simulated devices that can be controlled
//! programmatically without requiring physical hardware.

pub mod display;
pub mod peripheral;

// Re-export commonly used types
pub use display::MockDisplay;
pub use peripheral::{MockPeripheral, MockPeripheralHandle};
