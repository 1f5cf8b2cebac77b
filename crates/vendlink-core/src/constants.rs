//! Core constants for the vending peripheral protocol.
//!
//! The subordinate microcontroller answers bus reads with a short ASCII
//! frame and accepts short ASCII replies:
//!
//! ```text
//! CARD0001|11000    card id (8) | command (1) amount (0..=14)
//! X                 idle, no new command yet
//! X3                dispense complete
//! OK / ERR          replies written back by the controller
//! ```
//!
//! # Usage
//!
//! ```
//! use vendlink_core::constants::*;
//!
//! assert_eq!(SEPARATOR_OFFSET, CARD_ID_LEN);
//! assert_eq!(COMMAND_OFFSET, CARD_ID_LEN + 1);
//! assert!(MAX_FRAME_LEN < MAX_READ_LEN);
//! ```

// ============================================================================
// Bus
// ============================================================================

/// Seven-bit bus address of the subordinate device.
pub const PERIPHERAL_ADDRESS: u8 = 9;

/// Number of bytes requested from the peripheral on every poll.
///
/// The peripheral pads unused bytes, which the frame filter discards.
pub const MAX_READ_LEN: usize = 50;

/// Maximum number of filtered characters accepted in one frame.
///
/// Frames longer than this are rejected instead of truncated.
pub const MAX_FRAME_LEN: usize = 40;

// ============================================================================
// Frame layout
// ============================================================================

/// Field separator between the card id and the command.
pub const FIELD_SEPARATOR: u8 = b'|';

/// Length of the card identifier at the start of a frame.
pub const CARD_ID_LEN: usize = 8;

/// Offset of the field separator.
pub const SEPARATOR_OFFSET: usize = CARD_ID_LEN;

/// Offset of the command character.
pub const COMMAND_OFFSET: usize = SEPARATOR_OFFSET + 1;

/// Offset of the first amount character.
pub const AMOUNT_OFFSET: usize = COMMAND_OFFSET + 1;

/// Maximum length of the amount text.
pub const MAX_AMOUNT_LEN: usize = 14;

/// Frame sent by the peripheral when it has nothing new to report.
pub const IDLE_MARKER: &str = "X";

/// Frame sent by the peripheral once dispensing has finished.
pub const DISPENSE_COMPLETE: &str = "X3";

/// Command character for a purchase.
pub const CMD_PURCHASE: char = '1';

/// Command character for a balance reload.
pub const CMD_RELOAD: char = '2';

// ============================================================================
// Replies
// ============================================================================

/// Reply sent when the card was authorized.
pub const REPLY_OK: &str = "OK";

/// Reply sent when the card was denied or could not be validated.
pub const REPLY_ERR: &str = "ERR";

// ============================================================================
// Validation
// ============================================================================

/// A card is authorized only when its balance is strictly greater than this.
pub const AUTHORIZATION_THRESHOLD: f64 = 10.0;

/// Default request timeout for the balance check, in milliseconds.
pub const DEFAULT_VALIDATION_TIMEOUT_MS: u64 = 15_000;

// ============================================================================
// Timing (milliseconds)
// ============================================================================

/// Delay before each poll while waiting for a card.
pub const CARD_POLL_INTERVAL_MS: u64 = 100;

/// Delay before each poll while waiting for dispensing to start.
pub const AUTHORIZED_POLL_INTERVAL_MS: u64 = 500;

/// Delay before each poll while dispensing.
pub const DISPENSE_POLL_INTERVAL_MS: u64 = 1_000;

/// Delay at the end of every control loop iteration.
pub const CYCLE_DELAY_MS: u64 = 250;

/// Delay after the accept/reject reply has been sent.
pub const VALIDATION_SETTLE_MS: u64 = 1_000;

/// How long the balance line stays on screen before the decision is acted on.
pub const BALANCE_HOLD_MS: u64 = 2_000;

/// How long the completion message stays on screen.
pub const COMPLETION_HOLD_MS: u64 = 1_000;

/// Delay between boot and the first poll.
pub const STARTUP_DELAY_MS: u64 = 5_000;

// ============================================================================
// Display
// ============================================================================

/// Text lines on the status display (128x32 panel, 8px font).
pub const DISPLAY_LINES: usize = 4;

/// Characters per line on the status display (128x32 panel, 6px font).
pub const DISPLAY_COLUMNS: usize = 21;
