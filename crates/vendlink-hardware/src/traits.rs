//! Device trait definitions.
//!
//! These traits are the narrow seams between the controller and the devices
//! it drives. The controller is generic over them, so the same state machine
//! runs against a real bus, a host-side simulation or a test mock.
//!
//! All I/O methods use native `async fn` (Edition 2024 RPITIT). An
//! implementation may block inside them; the controller runs one step at a
//! time and never polls two devices concurrently.

#![allow(async_fn_in_trait)]

use vendlink_protocol::{Frame, ReplyCode};

use crate::error::Result;

/// Link to the subordinate microcontroller.
///
/// # Object Safety
///
/// This trait is NOT object-safe because `async fn` methods return opaque
/// futures. Use generic type parameters:
///
/// ```no_run
/// use vendlink_hardware::PeripheralLink;
/// use vendlink_hardware::error::Result;
///
/// async fn next_frame<L: PeripheralLink>(link: &mut L) -> Result<Option<String>> {
///     Ok(link.poll().await?.map(|f| f.as_str().to_string()))
/// }
/// ```
pub trait PeripheralLink: Send {
    /// Read one frame from the peripheral.
    ///
    /// Returns `Ok(None)` when the read produced no frame characters at all.
    /// The idle marker is returned as a regular frame; classifying it is the
    /// caller's job.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The bus transaction fails
    /// - The frame exceeds the maximum length
    /// - The device is disconnected
    async fn poll(&mut self) -> Result<Option<Frame>>;

    /// Write a status reply to the peripheral.
    ///
    /// Fire-and-forget: no acknowledgment is awaited.
    ///
    /// # Errors
    ///
    /// Returns an error if the bus transaction fails.
    async fn send(&mut self, reply: ReplyCode) -> Result<()>;
}

/// Local text display showing transaction progress.
///
/// The display is a passive sink. Messages are appended one line at a time
/// to a frame buffer and become visible on [`flush`](StatusDisplay::flush).
///
/// ```no_run
/// use vendlink_hardware::StatusDisplay;
/// use vendlink_hardware::error::Result;
///
/// fn render<D: StatusDisplay>(display: &mut D, card: &str) -> Result<()> {
///     display.clear();
///     display.show("Waiting for card scan");
///     display.show(&format!("-> {card}"));
///     display.flush()
/// }
/// ```
pub trait StatusDisplay: Send {
    /// Bring the display up.
    ///
    /// # Errors
    ///
    /// Returns `HardwareError::InitializationFailed` if the display cannot be
    /// used. The controller refuses to run without a display.
    fn init(&mut self) -> Result<()>;

    /// Start a new, empty frame.
    fn clear(&mut self);

    /// Append one line to the current frame.
    fn show(&mut self, message: &str);

    /// Push the current frame to the screen.
    ///
    /// # Errors
    ///
    /// Returns an error if the frame could not be written out.
    fn flush(&mut self) -> Result<()>;
}
