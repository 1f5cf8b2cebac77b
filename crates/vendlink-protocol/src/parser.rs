//! Command frame parser.
//!
//! # Frame Format
//!
//! ```text
//! CARD0001|11000
//! ^^^^^^^^ card id, exactly 8 alphanumeric characters (bytes 0-7)
//!         ^ separator '|' (byte 8)
//!          ^ command character (byte 9)
//!           ^^^^ amount as decimal text (bytes 10..), may be empty
//! ```
//!
//! The amount ends at the first NUL or at the end of the input. Empty amount
//! text means `0.0`.
//!
//! # Command Characters
//!
//! The parser does not reject unknown command characters. They decode to
//! [`CommandKind::Unknown`] and the controller decides what to do with them.
//!
//! # Examples
//!
//! ```
//! use vendlink_core::CommandKind;
//! use vendlink_protocol::CommandParser;
//!
//! let tx = CommandParser::parse_text("CARD0001|11000").unwrap();
//! assert_eq!(tx.card_id.as_str(), "CARD0001");
//! assert_eq!(tx.command, CommandKind::Purchase);
//! assert_eq!(tx.amount, 1000.0);
//!
//! // Separator missing at offset 8
//! assert!(CommandParser::parse_text("CARD00011|1000").is_err());
//! ```

use vendlink_core::{
    CardId, CommandKind, Error, Result, Transaction,
    constants::{AMOUNT_OFFSET, CARD_ID_LEN, COMMAND_OFFSET, FIELD_SEPARATOR, MAX_AMOUNT_LEN, SEPARATOR_OFFSET},
};

use crate::frame::Frame;

/// Parser for peripheral command frames.
pub struct CommandParser;

impl CommandParser {
    /// Decode a filtered frame into a fresh [`Transaction`].
    ///
    /// # Errors
    ///
    /// See [`CommandParser::parse_text`].
    pub fn parse(frame: &Frame) -> Result<Transaction> {
        Self::parse_text(frame.as_str())
    }

    /// Decode raw frame text into a fresh [`Transaction`].
    ///
    /// # Errors
    ///
    /// - `Error::FrameFormat` if the text is not ASCII, is shorter than 10
    ///   characters, or has no `|` at offset 8
    /// - `Error::InvalidCardId` if the first 8 characters are not alphanumeric
    /// - `Error::InvalidAmount` if the amount text is too long or not a
    ///   plain decimal number
    pub fn parse_text(input: &str) -> Result<Transaction> {
        let input = input.split('\0').next().unwrap_or_default();

        if !input.is_ascii() {
            return Err(Error::FrameFormat("frame is not ASCII".to_string()));
        }

        let bytes = input.as_bytes();
        if bytes.len() <= SEPARATOR_OFFSET {
            return Err(Error::FrameFormat(format!(
                "frame too short: {} chars",
                bytes.len()
            )));
        }

        if bytes[SEPARATOR_OFFSET] != FIELD_SEPARATOR {
            return Err(Error::FrameFormat(format!(
                "expected '|' at offset {SEPARATOR_OFFSET}, found {:?}",
                char::from(bytes[SEPARATOR_OFFSET])
            )));
        }

        let card_id = CardId::new(&input[..CARD_ID_LEN])?;

        let command = bytes
            .get(COMMAND_OFFSET)
            .map(|b| CommandKind::from_char(char::from(*b)))
            .ok_or_else(|| Error::FrameFormat("missing command character".to_string()))?;

        let amount = parse_amount(input.get(AMOUNT_OFFSET..).unwrap_or_default())?;

        Ok(Transaction::new(card_id, command, amount))
    }
}

/// Parse the amount field.
fn parse_amount(text: &str) -> Result<f64> {
    if text.is_empty() {
        return Ok(0.0);
    }

    if text.len() > MAX_AMOUNT_LEN {
        return Err(Error::InvalidAmount(format!(
            "amount has {} chars, max {MAX_AMOUNT_LEN}",
            text.len()
        )));
    }

    let dots = text.bytes().filter(|b| *b == b'.').count();
    if dots > 1 || !text.bytes().all(|b| b.is_ascii_digit() || b == b'.') {
        return Err(Error::InvalidAmount(format!("'{text}' is not a decimal number")));
    }

    match text.parse::<f64>() {
        Ok(value) if value.is_finite() => Ok(value),
        _ => Err(Error::InvalidAmount(format!("'{text}' is not a decimal number"))),
    }
}
