use crate::{
    Result,
    constants::{AUTHORIZATION_THRESHOLD, CARD_ID_LEN, CMD_PURCHASE, CMD_RELOAD},
    error::Error,
};
use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::fmt;
use subtle::ConstantTimeEq;
use uuid::Uuid;

/// Card identifier (exactly 8 ASCII alphanumeric characters)
///
/// # Security
/// This type implements constant-time comparison so that comparing card ids
/// does not leak where two ids differ.
#[derive(Debug, Clone, Eq, Serialize, Deserialize)]
pub struct CardId(String);

impl CardId {
    /// Create a new card id with validation.
    ///
    /// # Errors
    /// Returns `Error::InvalidCardId` if the id is not exactly 8 characters or
    /// contains anything other than ASCII letters and digits.
    pub fn new(id: &str) -> Result<Self> {
        let len = id.chars().count();
        if len != CARD_ID_LEN {
            return Err(Error::InvalidCardId(format!(
                "Card id must be {CARD_ID_LEN} chars, got {len}"
            )));
        }

        if !id.bytes().all(|b| b.is_ascii_alphanumeric()) {
            return Err(Error::InvalidCardId(format!(
                "Card id must be alphanumeric, got '{id}'"
            )));
        }

        Ok(CardId(id.to_string()))
    }

    /// Get the card id as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CardId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for CardId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        CardId::new(s)
    }
}

impl PartialEq for CardId {
    fn eq(&self, other: &Self) -> bool {
        self.0.as_bytes().ct_eq(other.0.as_bytes()).into()
    }
}

impl std::hash::Hash for CardId {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.0.hash(state);
    }
}

/// Command requested by the peripheral for the presented card.
///
/// Any character is representable; only purchase and reload are acted on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CommandKind {
    /// Purchase (`1`).
    Purchase,

    /// Balance reload (`2`).
    Reload,

    /// Any other command character.
    Unknown(char),
}

impl CommandKind {
    /// Map a command character to its kind.
    #[must_use]
    pub fn from_char(c: char) -> Self {
        match c {
            CMD_PURCHASE => CommandKind::Purchase,
            CMD_RELOAD => CommandKind::Reload,
            other => CommandKind::Unknown(other),
        }
    }

    /// The wire character for this command.
    #[must_use]
    pub fn as_char(&self) -> char {
        match self {
            CommandKind::Purchase => CMD_PURCHASE,
            CommandKind::Reload => CMD_RELOAD,
            CommandKind::Unknown(c) => *c,
        }
    }

    /// Whether the controller knows how to process this command.
    #[must_use]
    pub fn is_known(&self) -> bool {
        !matches!(self, CommandKind::Unknown(_))
    }
}

impl fmt::Display for CommandKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            CommandKind::Purchase => write!(f, "purchase"),
            CommandKind::Reload => write!(f, "reload"),
            CommandKind::Unknown(c) => write!(f, "unknown({c})"),
        }
    }
}

/// The in-flight request decoded from one peripheral frame.
///
/// A fresh value is built for every detection; nothing is carried over from
/// a previous cycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    /// Correlation id used in logs.
    pub id: Uuid,

    /// Presented card.
    pub card_id: CardId,

    /// Requested command.
    pub command: CommandKind,

    /// Requested amount.
    pub amount: f64,

    /// When the frame was decoded.
    pub detected_at: DateTime<Local>,
}

impl Transaction {
    /// Create a new transaction stamped with a fresh id and the current time.
    pub fn new(card_id: CardId, command: CommandKind, amount: f64) -> Self {
        Self {
            id: Uuid::new_v4(),
            card_id,
            command,
            amount,
            detected_at: Local::now(),
        }
    }
}

/// Outcome of a balance check.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ValidationResult {
    /// Whether dispensing may proceed.
    pub authorized: bool,

    /// Balance reported by the remote service, if one was obtained.
    pub balance: Option<f64>,
}

impl ValidationResult {
    /// Apply the authorization rule to an observed balance.
    ///
    /// # Examples
    ///
    /// ```
    /// use vendlink_core::ValidationResult;
    ///
    /// assert!(ValidationResult::from_balance(10.5).authorized);
    /// assert!(!ValidationResult::from_balance(10.0).authorized);
    /// ```
    #[must_use]
    pub fn from_balance(balance: f64) -> Self {
        Self {
            authorized: balance > AUTHORIZATION_THRESHOLD,
            balance: Some(balance),
        }
    }

    /// A denial with no observed balance.
    #[must_use]
    pub fn denied() -> Self {
        Self {
            authorized: false,
            balance: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn test_card_id_valid() {
        let id = CardId::new("CARD0001").unwrap();
        assert_eq!(id.as_str(), "CARD0001");
        assert_eq!(id.to_string(), "CARD0001");
    }

    #[rstest]
    #[case("")]
    #[case("CARD001")]
    #[case("CARD00001")]
    #[case("CARD|001")]
    #[case("CARD 001")]
    fn test_card_id_invalid(#[case] input: &str) {
        assert!(matches!(
            CardId::new(input),
            Err(Error::InvalidCardId(_))
        ));
    }

    #[test]
    fn test_card_id_from_str() {
        let id: CardId = "7B1CB128".parse().unwrap();
        assert_eq!(id, CardId::new("7B1CB128").unwrap());
    }

    #[test]
    fn test_card_id_equality_is_case_sensitive() {
        let upper = CardId::new("ABCDEFGH").unwrap();
        let lower = CardId::new("abcdefgh").unwrap();
        assert_ne!(upper, lower);
    }

    #[rstest]
    #[case('1', CommandKind::Purchase)]
    #[case('2', CommandKind::Reload)]
    #[case('7', CommandKind::Unknown('7'))]
    #[case('Z', CommandKind::Unknown('Z'))]
    fn test_command_from_char(#[case] c: char, #[case] expected: CommandKind) {
        let kind = CommandKind::from_char(c);
        assert_eq!(kind, expected);
        assert_eq!(kind.as_char(), c);
    }

    #[test]
    fn test_command_is_known() {
        assert!(CommandKind::Purchase.is_known());
        assert!(CommandKind::Reload.is_known());
        assert!(!CommandKind::Unknown('9').is_known());
    }

    #[test]
    fn test_command_display() {
        assert_eq!(CommandKind::Purchase.to_string(), "purchase");
        assert_eq!(CommandKind::Reload.to_string(), "reload");
        assert_eq!(CommandKind::Unknown('9').to_string(), "unknown(9)");
    }

    #[test]
    fn test_transactions_get_distinct_ids() {
        let card = CardId::new("CARD0001").unwrap();
        let first = Transaction::new(card.clone(), CommandKind::Purchase, 1000.0);
        let second = Transaction::new(card, CommandKind::Purchase, 1000.0);
        assert_ne!(first.id, second.id);
    }

    #[rstest]
    #[case(50.0, true)]
    #[case(10.01, true)]
    #[case(10.0, false)]
    #[case(5.0, false)]
    #[case(0.0, false)]
    #[case(-3.0, false)]
    fn test_authorization_threshold(#[case] balance: f64, #[case] authorized: bool) {
        let result = ValidationResult::from_balance(balance);
        assert_eq!(result.authorized, authorized);
        assert_eq!(result.balance, Some(balance));
    }

    #[test]
    fn test_denied_has_no_balance() {
        let result = ValidationResult::denied();
        assert!(!result.authorized);
        assert!(result.balance.is_none());
    }

    #[test]
    fn test_command_serialization() {
        let json = serde_json::to_string(&CommandKind::Reload).unwrap();
        assert_eq!(json, "\"reload\"");
    }
}
