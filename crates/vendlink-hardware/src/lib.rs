//! Device abstraction layer for the vending controller.
//!
//! Two devices sit at the edge of the controller:
//!
//! - the subordinate microcontroller, reached through a [`PeripheralLink`]
//!   (polled for frames, written to with replies)
//! - the local status display, a passive [`StatusDisplay`] sink
//!
//! # Implementations
//!
//! - [`I2cPeripheralLink`]: any `embedded_hal::i2c::I2c` bus (Linux
//!   `/dev/i2c-*`, microcontroller HALs)
//! - [`mock::MockPeripheral`] / [`mock::MockDisplay`]: programmable devices
//!   for tests and development without hardware
//!
//! # Example
//!
//! ```
//! use vendlink_hardware::{PeripheralLink, mock::MockPeripheral};
//! use vendlink_protocol::ReplyCode;
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> vendlink_hardware::Result<()> {
//!     let (mut link, mut handle) = MockPeripheral::new();
//!
//!     handle.push_frame("CARD0001|11000").await?;
//!     let frame = link.poll().await?.unwrap();
//!     assert_eq!(frame.as_str(), "CARD0001|11000");
//!
//!     link.send(ReplyCode::Ok).await?;
//!     assert_eq!(handle.try_next_reply(), Some(ReplyCode::Ok));
//!     Ok(())
//! }
//! ```

pub mod error;
pub mod i2c;
pub mod mock;
pub mod traits;

pub use error::{HardwareError, Result};
pub use i2c::I2cPeripheralLink;
pub use traits::{PeripheralLink, StatusDisplay};
