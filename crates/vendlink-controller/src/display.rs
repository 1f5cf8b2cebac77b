//! Status display rendering.
//!
//! The controller reports progress on a small character grid (4 lines of
//! 21 columns on the reference hardware). Messages are appended one line at
//! a time below the previous one; once the grid is full the oldest line
//! scrolls off the top.
//!
//! # Character Set
//!
//! The grid holds printable ASCII only. Control characters are dropped and
//! any other non-ASCII character is replaced with `?` before rendering, so a
//! line is always exactly `columns` cells wide.
//!
//! # Examples
//!
//! ```
//! use vendlink_controller::VirtualDisplay;
//! use vendlink_hardware::StatusDisplay;
//!
//! let mut display = VirtualDisplay::new(4, 21);
//! display.init().unwrap();
//! display.show("Waiting for card scan");
//! display.show("-> CARD0001");
//! display.flush().unwrap();
//!
//! assert_eq!(display.get_line(1).unwrap().trim_end(), "-> CARD0001");
//! ```

use std::fmt::Write as _;
use std::io::Write;

use vendlink_core::{
    Error, Result,
    constants::{DISPLAY_COLUMNS, DISPLAY_LINES},
};
use vendlink_hardware::{HardwareError, StatusDisplay};

/// In-memory character grid implementing [`StatusDisplay`].
///
/// `show` writes into a pending buffer; `flush` publishes it as the visible
/// frame. Tests read the visible frame back with [`get_line`] and
/// [`get_all_lines`].
///
/// [`get_line`]: VirtualDisplay::get_line
/// [`get_all_lines`]: VirtualDisplay::get_all_lines
#[derive(Debug, Clone)]
pub struct VirtualDisplay {
    lines: usize,
    columns: usize,

    /// Frame being built.
    pending: Vec<String>,

    /// Next line `show` writes to.
    cursor: usize,

    /// Last flushed frame.
    visible: Vec<String>,

    /// Number of flushes so far.
    frames: u64,
}

impl VirtualDisplay {
    /// Create a blank display of the given size.
    pub fn new(lines: usize, columns: usize) -> Self {
        let blank = vec![" ".repeat(columns); lines];

        Self {
            lines,
            columns,
            pending: blank.clone(),
            cursor: 0,
            visible: blank,
            frames: 0,
        }
    }

    /// Grid size as `(lines, columns)`.
    pub fn size(&self) -> (usize, usize) {
        (self.lines, self.columns)
    }

    /// A line of the visible frame, padded to the column width.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidLine` if `line` is outside the grid.
    pub fn get_line(&self, line: usize) -> Result<&str> {
        self.visible
            .get(line)
            .map(String::as_str)
            .ok_or(Error::InvalidLine {
                line,
                max: self.lines.saturating_sub(1),
            })
    }

    /// Every line of the visible frame.
    pub fn get_all_lines(&self) -> Vec<&str> {
        self.visible.iter().map(String::as_str).collect()
    }

    /// Whether any visible line contains `text`.
    pub fn contains(&self, text: &str) -> bool {
        self.visible.iter().any(|line| line.contains(text))
    }

    /// Number of frames flushed so far.
    pub fn frame_count(&self) -> u64 {
        self.frames
    }

    /// Render the visible frame inside a border.
    ///
    /// ```text
    /// +---------------------+
    /// |Waiting for card scan|
    /// |-> CARD0001          |
    /// +---------------------+
    /// ```
    pub fn render(&self) -> String {
        let border = format!("+{}+", "-".repeat(self.columns));
        let mut out = String::with_capacity((self.lines + 2) * (self.columns + 3));

        let _ = writeln!(out, "{border}");
        for line in &self.visible {
            let _ = writeln!(out, "|{line}|");
        }
        let _ = writeln!(out, "{border}");
        out
    }

    fn scroll(&mut self) {
        self.pending.remove(0);
        self.pending.push(" ".repeat(self.columns));
        self.cursor = self.lines - 1;
    }
}

impl Default for VirtualDisplay {
    fn default() -> Self {
        Self::new(DISPLAY_LINES, DISPLAY_COLUMNS)
    }
}

impl StatusDisplay for VirtualDisplay {
    fn init(&mut self) -> vendlink_hardware::Result<()> {
        if self.lines == 0 || self.columns == 0 {
            return Err(HardwareError::initialization_failed(format!(
                "display geometry {}x{} has no cells",
                self.lines, self.columns
            )));
        }
        self.clear();
        Ok(())
    }

    fn clear(&mut self) {
        for line in &mut self.pending {
            *line = " ".repeat(self.columns);
        }
        self.cursor = 0;
    }

    fn show(&mut self, message: &str) {
        if self.lines == 0 {
            return;
        }
        if self.cursor >= self.lines {
            self.scroll();
        }

        let line = self.cursor;
        self.pending[line] = pad_line(&sanitize_text(message), self.columns);
        self.cursor += 1;
    }

    fn flush(&mut self) -> vendlink_hardware::Result<()> {
        self.visible.clone_from(&self.pending);
        self.frames += 1;
        Ok(())
    }
}

/// [`VirtualDisplay`] that draws every flushed frame to a writer.
///
/// The daemon uses it on stdout as a stand-in for the physical panel.
#[derive(Debug)]
pub struct ConsoleDisplay<W> {
    grid: VirtualDisplay,
    out: W,
}

impl<W: Write + Send> ConsoleDisplay<W> {
    /// Wrap `out` with a grid of the given size.
    pub fn new(out: W, lines: usize, columns: usize) -> Self {
        Self {
            grid: VirtualDisplay::new(lines, columns),
            out,
        }
    }

    /// The underlying grid.
    pub fn grid(&self) -> &VirtualDisplay {
        &self.grid
    }

    /// Give the writer back.
    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write + Send> StatusDisplay for ConsoleDisplay<W> {
    fn init(&mut self) -> vendlink_hardware::Result<()> {
        self.grid.init()
    }

    fn clear(&mut self) {
        self.grid.clear();
    }

    fn show(&mut self, message: &str) {
        self.grid.show(message);
    }

    fn flush(&mut self) -> vendlink_hardware::Result<()> {
        self.grid.flush()?;
        self.out.write_all(self.grid.render().as_bytes())?;
        self.out.flush()?;
        Ok(())
    }
}

/// Truncate text to at most `max_chars` characters.
///
/// # Examples
///
/// ```
/// use vendlink_controller::truncate_text;
///
/// assert_eq!(truncate_text("Waiting for card scan", 7), "Waiting");
/// assert_eq!(truncate_text("Done...", 21), "Done...");
/// ```
pub fn truncate_text(text: &str, max_chars: usize) -> String {
    text.chars().take(max_chars).collect()
}

/// Fit text to exactly `width` characters: truncate, then pad on the right.
///
/// # Examples
///
/// ```
/// use vendlink_controller::pad_line;
///
/// assert_eq!(pad_line("OK", 6), "OK    ");
/// assert_eq!(pad_line("Dispensing...", 4), "Disp");
/// ```
pub fn pad_line(text: &str, width: usize) -> String {
    let mut line = truncate_text(text, width);
    let padding = width - line.chars().count();
    line.extend(std::iter::repeat_n(' ', padding));
    line
}

/// Drop control characters and replace non-ASCII with `?`.
fn sanitize_text(text: &str) -> String {
    text.chars()
        .filter(|c| !c.is_control())
        .map(|c| if c.is_ascii() { c } else { '?' })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn shown(lines: &[&str]) -> VirtualDisplay {
        let mut display = VirtualDisplay::default();
        display.init().unwrap();
        for line in lines {
            display.show(line);
        }
        display.flush().unwrap();
        display
    }

    #[test]
    fn test_default_geometry() {
        let display = VirtualDisplay::default();
        assert_eq!(display.size(), (4, 21));
        assert!(display.get_all_lines().iter().all(|l| l.len() == 21));
    }

    #[test]
    fn test_show_appends_lines() {
        let display = shown(&["Waiting for card scan", "-> CARD0001"]);

        assert_eq!(display.get_line(0).unwrap(), "Waiting for card scan");
        assert_eq!(display.get_line(1).unwrap().trim_end(), "-> CARD0001");
        assert_eq!(display.get_line(2).unwrap().trim(), "");
    }

    #[test]
    fn test_nothing_visible_until_flush() {
        let mut display = VirtualDisplay::default();
        display.show("Dispensing...");

        assert!(!display.contains("Dispensing"));
        display.flush().unwrap();
        assert!(display.contains("Dispensing"));
        assert_eq!(display.frame_count(), 1);
    }

    #[test]
    fn test_full_grid_scrolls() {
        let display = shown(&["one", "two", "three", "four", "five"]);
        let lines: Vec<_> = display.get_all_lines().iter().map(|l| l.trim_end()).collect();

        assert_eq!(lines, vec!["two", "three", "four", "five"]);
    }

    #[test]
    fn test_clear_resets_cursor() {
        let mut display = shown(&["one", "two"]);
        display.clear();
        display.show("Done...");
        display.flush().unwrap();

        assert_eq!(display.get_line(0).unwrap().trim_end(), "Done...");
        assert_eq!(display.get_line(1).unwrap().trim(), "");
    }

    #[test]
    fn test_long_lines_truncate() {
        let display = shown(&["Balance: 123456789012345.00"]);
        assert_eq!(display.get_line(0).unwrap(), "Balance: 123456789012");
    }

    #[test]
    fn test_sanitize() {
        assert_eq!(sanitize_text("a\tb\nc"), "abc");
        assert_eq!(sanitize_text("Saldo: 5€"), "Saldo: 5?");
    }

    #[test]
    fn test_invalid_line() {
        let display = VirtualDisplay::default();

        assert!(matches!(
            display.get_line(4),
            Err(Error::InvalidLine { line: 4, max: 3 })
        ));
    }

    #[test]
    fn test_zero_geometry_fails_init() {
        let mut display = VirtualDisplay::new(0, 21);
        let err = display.init().unwrap_err();

        assert!(matches!(err, HardwareError::InitializationFailed { .. }));
        display.show("ignored");
    }

    #[test]
    fn test_pad_line() {
        assert_eq!(pad_line("", 3), "   ");
        assert_eq!(pad_line("Done...", 7), "Done...");
        assert_eq!(pad_line("Valid card", 5), "Valid");
    }

    #[test]
    fn test_render_border() {
        let mut display = VirtualDisplay::new(1, 4);
        display.show("OK");
        display.flush().unwrap();

        assert_eq!(display.render(), "+----+\n|OK  |\n+----+\n");
    }

    #[test]
    fn test_console_display_writes_frames() {
        let mut console = ConsoleDisplay::new(Vec::new(), 2, 8);
        console.init().unwrap();
        console.show("Done...");
        console.flush().unwrap();

        assert!(console.grid().contains("Done..."));
        let written = String::from_utf8(console.into_inner()).unwrap();
        assert_eq!(written, "+--------+\n|Done... |\n|        |\n+--------+\n");
    }
}
