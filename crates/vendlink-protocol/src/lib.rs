//! Wire protocol spoken with the vending peripheral.
//!
//! - [`frame`]: filtering raw bus bytes into a [`Frame`] and classifying it
//! - [`parser`]: decoding a data frame into a [`Transaction`](vendlink_core::Transaction)
//! - [`reply`]: the status codes written back to the peripheral

pub mod frame;
pub mod parser;
pub mod reply;

pub use frame::{Frame, FrameKind, is_frame_byte};
pub use parser::CommandParser;
pub use reply::ReplyCode;
