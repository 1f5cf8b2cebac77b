//! Recording display for tests.

use crate::{
    error::{HardwareError, Result},
    traits::StatusDisplay,
};

/// Display that records every flushed frame.
///
/// # Examples
///
/// ```
/// use vendlink_hardware::{StatusDisplay, mock::MockDisplay};
///
/// let mut display = MockDisplay::new();
/// display.init().unwrap();
/// display.show("Waiting for card scan");
/// display.flush().unwrap();
///
/// assert_eq!(display.last_frame().unwrap(), ["Waiting for card scan"]);
/// assert!(display.has_shown("Waiting"));
/// ```
#[derive(Debug, Default, Clone)]
pub struct MockDisplay {
    lines: Vec<String>,
    frames: Vec<Vec<String>>,
    initialized: bool,
    fail_init: bool,
}

impl MockDisplay {
    /// Create a working mock display.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a mock display whose initialization fails.
    pub fn failing() -> Self {
        Self {
            fail_init: true,
            ..Self::default()
        }
    }

    /// Whether `init` succeeded.
    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// Lines of the frame currently being built.
    pub fn pending_lines(&self) -> &[String] {
        &self.lines
    }

    /// Every frame flushed so far, oldest first.
    pub fn frames(&self) -> &[Vec<String>] {
        &self.frames
    }

    /// The most recently flushed frame.
    pub fn last_frame(&self) -> Option<&[String]> {
        self.frames.last().map(Vec::as_slice)
    }

    /// Whether any flushed line contains `text`.
    pub fn has_shown(&self, text: &str) -> bool {
        self.frames.iter().flatten().any(|line| line.contains(text))
    }
}

impl StatusDisplay for MockDisplay {
    fn init(&mut self) -> Result<()> {
        if self.fail_init {
            return Err(HardwareError::initialization_failed("mock display"));
        }
        self.initialized = true;
        Ok(())
    }

    fn clear(&mut self) {
        self.lines.clear();
    }

    fn show(&mut self, message: &str) {
        self.lines.push(message.to_string());
    }

    fn flush(&mut self) -> Result<()> {
        self.frames.push(self.lines.clone());
        Ok(())
    }
}
