//! Peripheral frame filtering and classification.
//!
//! Every poll reads a fixed number of bytes from the peripheral. The reply is
//! padded and may contain line noise, so only ASCII letters, digits and the
//! field separator `|` are kept. Everything else is dropped wherever it
//! appears, not just at the end:
//!
//! ```
//! use vendlink_protocol::Frame;
//!
//! let raw = b"CARD0001|1\x001000\xff\xff\r\n";
//! let frame = Frame::from_bytes(raw).unwrap().unwrap();
//! assert_eq!(frame.as_str(), "CARD0001|11000");
//! ```
//!
//! A read that yields no kept bytes is "no data" rather than an error:
//!
//! ```
//! use vendlink_protocol::Frame;
//!
//! assert!(Frame::from_bytes(&[0xff; 50]).unwrap().is_none());
//! ```
//!
//! # Bounds
//!
//! At most [`MAX_FRAME_LEN`] filtered characters are accepted. A longer frame
//! is rejected with [`Error::FrameOverflow`] instead of being cut short.

use std::fmt;

use vendlink_core::{
    Error, Result,
    constants::{DISPENSE_COMPLETE, FIELD_SEPARATOR, IDLE_MARKER, MAX_FRAME_LEN},
};

/// Whether a raw bus byte belongs in a frame.
#[inline]
pub fn is_frame_byte(byte: u8) -> bool {
    byte.is_ascii_alphanumeric() || byte == FIELD_SEPARATOR
}

/// What a frame means to the controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameKind {
    /// The idle marker `X`: nothing new.
    Idle,

    /// The completion code `X3`: dispensing finished.
    DispenseComplete,

    /// Anything else, usually a card command.
    Data,
}

/// One poll's worth of filtered characters.
///
/// A `Frame` is never empty and only ever contains ASCII alphanumerics and `|`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Frame(String);

impl Frame {
    /// Filter raw bus bytes into a frame.
    ///
    /// # Returns
    ///
    /// - `Ok(Some(frame))` when at least one byte survived filtering
    /// - `Ok(None)` when nothing did
    ///
    /// # Errors
    ///
    /// Returns `Error::FrameOverflow` when more than [`MAX_FRAME_LEN`]
    /// characters survive filtering.
    pub fn from_bytes(raw: &[u8]) -> Result<Option<Self>> {
        let filtered: String = raw
            .iter()
            .copied()
            .filter(|b| is_frame_byte(*b))
            .map(char::from)
            .collect();

        if filtered.is_empty() {
            return Ok(None);
        }

        if filtered.len() > MAX_FRAME_LEN {
            return Err(Error::FrameOverflow {
                len: filtered.len(),
                max: MAX_FRAME_LEN,
            });
        }

        Ok(Some(Frame(filtered)))
    }

    /// Build a frame from text that is already clean.
    ///
    /// # Errors
    ///
    /// Returns `Error::FrameFormat` if the text is empty or contains a
    /// character that filtering would drop, and `Error::FrameOverflow` if it
    /// is too long.
    ///
    /// # Examples
    ///
    /// ```
    /// use vendlink_protocol::{Frame, FrameKind};
    ///
    /// assert_eq!(Frame::new("X").unwrap().kind(), FrameKind::Idle);
    /// assert!(Frame::new("CARD 001").is_err());
    /// ```
    pub fn new(text: &str) -> Result<Self> {
        if text.is_empty() {
            return Err(Error::FrameFormat("empty frame".to_string()));
        }

        if let Some(bad) = text.chars().find(|c| !c.is_ascii() || !is_frame_byte(*c as u8)) {
            return Err(Error::FrameFormat(format!(
                "character {bad:?} is not allowed in a frame"
            )));
        }

        if text.len() > MAX_FRAME_LEN {
            return Err(Error::FrameOverflow {
                len: text.len(),
                max: MAX_FRAME_LEN,
            });
        }

        Ok(Frame(text.to_string()))
    }

    /// Classify the frame.
    #[must_use]
    pub fn kind(&self) -> FrameKind {
        match self.0.as_str() {
            IDLE_MARKER => FrameKind::Idle,
            DISPENSE_COMPLETE => FrameKind::DispenseComplete,
            _ => FrameKind::Data,
        }
    }

    /// Whether this is the idle marker.
    #[must_use]
    pub fn is_idle(&self) -> bool {
        self.kind() == FrameKind::Idle
    }

    /// Whether this is the dispense-complete code.
    #[must_use]
    pub fn is_dispense_complete(&self) -> bool {
        self.kind() == FrameKind::DispenseComplete
    }

    /// The frame text.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Number of characters in the frame.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Always `false`; kept for API symmetry with `len`.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn test_filters_noise_throughout() {
        // "." is noise too: "10.00" becomes "1000"
        let raw = b"\xffCA RD-0001|\n1\t10.00\xff";
        let frame = Frame::from_bytes(raw).unwrap().unwrap();
        assert_eq!(frame.as_str(), "CARD0001|11000");
    }

    #[test]
    fn test_all_padding_is_no_data() {
        assert_eq!(Frame::from_bytes(&[0xff; 50]).unwrap(), None);
        assert_eq!(Frame::from_bytes(&[0x00; 50]).unwrap(), None);
        assert_eq!(Frame::from_bytes(&[]).unwrap(), None);
    }

    #[test]
    fn test_overflow_is_rejected() {
        let raw = vec![b'A'; MAX_FRAME_LEN + 1];
        let result = Frame::from_bytes(&raw);

        match result {
            Err(Error::FrameOverflow { len, max }) => {
                assert_eq!(len, MAX_FRAME_LEN + 1);
                assert_eq!(max, MAX_FRAME_LEN);
            }
            other => panic!("Expected FrameOverflow, got {other:?}"),
        }
    }

    #[test]
    fn test_exactly_max_length_is_accepted() {
        let raw = vec![b'A'; MAX_FRAME_LEN];
        let frame = Frame::from_bytes(&raw).unwrap().unwrap();
        assert_eq!(frame.len(), MAX_FRAME_LEN);
    }

    #[test]
    fn test_noise_does_not_count_towards_limit() {
        let mut raw = vec![0xff; 200];
        raw.extend_from_slice(b"X3");
        let frame = Frame::from_bytes(&raw).unwrap().unwrap();
        assert!(frame.is_dispense_complete());
    }

    #[rstest]
    #[case("X", FrameKind::Idle)]
    #[case("X3", FrameKind::DispenseComplete)]
    #[case("X33", FrameKind::Data)]
    #[case("x", FrameKind::Data)]
    #[case("CARD0001|11000", FrameKind::Data)]
    fn test_kind(#[case] text: &str, #[case] expected: FrameKind) {
        assert_eq!(Frame::new(text).unwrap().kind(), expected);
    }

    #[test]
    fn test_idle_marker_with_padding() {
        let frame = Frame::from_bytes(b"X\x00\x00\xff").unwrap().unwrap();
        assert!(frame.is_idle());
        assert!(!frame.is_dispense_complete());
    }

    #[rstest]
    #[case("")]
    #[case("CARD 001")]
    #[case("CARD0001|1.5")]
    #[case("CARDÉ001")]
    fn test_new_rejects_unclean_text(#[case] text: &str) {
        assert!(matches!(Frame::new(text), Err(Error::FrameFormat(_))));
    }

    #[test]
    fn test_is_frame_byte() {
        assert!(is_frame_byte(b'a'));
        assert!(is_frame_byte(b'Z'));
        assert!(is_frame_byte(b'0'));
        assert!(is_frame_byte(b'|'));
        assert!(!is_frame_byte(b'.'));
        assert!(!is_frame_byte(b' '));
        assert!(!is_frame_byte(0x00));
        assert!(!is_frame_byte(0xff));
    }
}
