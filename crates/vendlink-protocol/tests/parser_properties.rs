//! Property-based tests for frame filtering and command parsing.
//!
//! These tests use proptest to generate random frames, both well-formed and
//! arbitrary bus noise, and verify the parser invariants for all of them.

use proptest::prelude::*;
use vendlink_core::{CommandKind, Error, constants::MAX_FRAME_LEN};
use vendlink_protocol::{CommandParser, Frame, is_frame_byte};

/// Strategy for generating valid card ids (8 alphanumeric characters).
fn valid_card_id() -> impl Strategy<Value = String> {
    prop::string::string_regex("[A-Za-z0-9]{8}").expect("Failed to create card id regex strategy")
}

/// Strategy for generating the two meaningful command characters.
fn valid_command() -> impl Strategy<Value = char> {
    prop_oneof![Just('1'), Just('2')]
}

/// Strategy for generating amount text as it arrives after filtering (digits only).
fn valid_amount() -> impl Strategy<Value = String> {
    prop::string::string_regex("[0-9]{0,14}").expect("Failed to create amount regex strategy")
}

/// Strategy for generating bytes that the frame filter always drops.
fn noise_byte() -> impl Strategy<Value = u8> {
    any::<u8>().prop_filter("must not be a frame byte", |b| !is_frame_byte(*b))
}

proptest! {
    /// Property: every well-formed frame decodes to exactly its fields.
    #[test]
    fn prop_valid_frame_decodes(
        card in valid_card_id(),
        command in valid_command(),
        amount in valid_amount(),
    ) {
        let text = format!("{card}|{command}{amount}");
        let tx = CommandParser::parse_text(&text).unwrap();

        prop_assert_eq!(tx.card_id.as_str(), card.as_str());
        prop_assert_eq!(tx.command, CommandKind::from_char(command));

        let expected = if amount.is_empty() { 0.0 } else { amount.parse::<f64>().unwrap() };
        prop_assert_eq!(tx.amount, expected);
    }

    /// Property: noise interleaved anywhere in a frame is invisible after filtering.
    #[test]
    fn prop_noise_is_filtered(
        card in valid_card_id(),
        command in valid_command(),
        amount in valid_amount(),
        noise in prop::collection::vec(noise_byte(), 0..40),
        seed in any::<u64>(),
    ) {
        let clean = format!("{card}|{command}{amount}");

        let mut raw = Vec::new();
        let mut noise_iter = noise.iter();
        for (i, byte) in clean.bytes().enumerate() {
            if (seed >> (i % 64)) & 1 == 1
                && let Some(n) = noise_iter.next()
            {
                raw.push(*n);
            }
            raw.push(byte);
        }
        raw.extend(noise_iter);

        let frame = Frame::from_bytes(&raw).unwrap().unwrap();
        prop_assert_eq!(frame.as_str(), clean.as_str());
    }

    /// Property: filtering arbitrary bytes never panics and only yields clean, bounded frames.
    #[test]
    fn prop_arbitrary_bytes_are_safe(raw in prop::collection::vec(any::<u8>(), 0..128)) {
        match Frame::from_bytes(&raw) {
            Ok(Some(frame)) => {
                prop_assert!(frame.len() <= MAX_FRAME_LEN);
                prop_assert!(frame.as_str().bytes().all(is_frame_byte));
                let _ = CommandParser::parse(&frame);
            }
            Ok(None) => prop_assert!(raw.iter().all(|b| !is_frame_byte(*b))),
            Err(Error::FrameOverflow { len, max }) => prop_assert!(len > max),
            Err(other) => prop_assert!(false, "unexpected error {other:?}"),
        }
    }

    /// Property: text without '|' at offset 8 is always a format error.
    #[test]
    fn prop_missing_separator_is_format_error(
        text in prop::string::string_regex("[A-Za-z0-9]{9,20}").unwrap(),
    ) {
        prop_assert!(matches!(
            CommandParser::parse_text(&text),
            Err(Error::FrameFormat(_))
        ));
    }

    /// Property: anything shorter than 9 characters is a format error.
    #[test]
    fn prop_short_text_is_format_error(
        text in prop::string::string_regex("[A-Za-z0-9|]{0,8}").unwrap(),
    ) {
        prop_assert!(matches!(
            CommandParser::parse_text(&text),
            Err(Error::FrameFormat(_))
        ));
    }
}
