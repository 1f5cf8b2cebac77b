//! Controller configuration.
//!
//! Every field defaults to the reference hardware's timing. Any of them can
//! be overridden through `VENDLINK_*` environment variables:
//!
//! | Variable | Field | Default |
//! |---|---|---|
//! | `VENDLINK_PERIPHERAL_ADDRESS` | `peripheral_address` | `9` |
//! | `VENDLINK_READ_LEN` | `read_len` | `50` |
//! | `VENDLINK_CARD_POLL_MS` | `card_poll_interval` | `100` |
//! | `VENDLINK_AUTHORIZED_POLL_MS` | `authorized_poll_interval` | `500` |
//! | `VENDLINK_DISPENSE_POLL_MS` | `dispense_poll_interval` | `1000` |
//! | `VENDLINK_CYCLE_DELAY_MS` | `cycle_delay` | `250` |
//! | `VENDLINK_SETTLE_MS` | `validation_settle` | `1000` |
//! | `VENDLINK_BALANCE_HOLD_MS` | `balance_hold` | `2000` |
//! | `VENDLINK_COMPLETION_HOLD_MS` | `completion_hold` | `1000` |
//! | `VENDLINK_PHASE_TIMEOUT_MS` | `phase_timeout` | unset (no watchdog) |
//!
//! The peripheral address accepts decimal or `0x`-prefixed hex.

use std::str::FromStr;
use std::time::Duration;

use vendlink_core::{
    Error, Result,
    constants::{
        AUTHORIZED_POLL_INTERVAL_MS, BALANCE_HOLD_MS, CARD_POLL_INTERVAL_MS, COMPLETION_HOLD_MS,
        CYCLE_DELAY_MS, DISPENSE_POLL_INTERVAL_MS, MAX_READ_LEN, PERIPHERAL_ADDRESS,
        VALIDATION_SETTLE_MS,
    },
};

/// Highest 7-bit bus address.
const MAX_ADDRESS: u8 = 0x7f;

/// Timing and bus settings for [`TransactionController`](crate::TransactionController).
#[derive(Debug, Clone, PartialEq)]
pub struct ControllerConfig {
    /// 7-bit bus address of the peripheral
    pub peripheral_address: u8,

    /// Bytes requested per poll
    pub read_len: usize,

    /// Delay between polls while waiting for a card
    pub card_poll_interval: Duration,

    /// Delay between polls while waiting for dispensing to start
    pub authorized_poll_interval: Duration,

    /// Delay between polls while waiting for dispensing to finish
    pub dispense_poll_interval: Duration,

    /// Delay at the end of every step
    pub cycle_delay: Duration,

    /// Delay after sending a decision to the peripheral
    pub validation_settle: Duration,

    /// How long the balance line stays up before the decision is acted on
    pub balance_hold: Duration,

    /// How long "Done..." stays up before the cycle restarts
    pub completion_hold: Duration,

    /// Watchdog for the peripheral waits; `None` waits forever
    pub phase_timeout: Option<Duration>,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            peripheral_address: PERIPHERAL_ADDRESS,
            read_len: MAX_READ_LEN,
            card_poll_interval: Duration::from_millis(CARD_POLL_INTERVAL_MS),
            authorized_poll_interval: Duration::from_millis(AUTHORIZED_POLL_INTERVAL_MS),
            dispense_poll_interval: Duration::from_millis(DISPENSE_POLL_INTERVAL_MS),
            cycle_delay: Duration::from_millis(CYCLE_DELAY_MS),
            validation_settle: Duration::from_millis(VALIDATION_SETTLE_MS),
            balance_hold: Duration::from_millis(BALANCE_HOLD_MS),
            completion_hold: Duration::from_millis(COMPLETION_HOLD_MS),
            phase_timeout: None,
        }
    }
}

impl ControllerConfig {
    /// Load from the process environment.
    ///
    /// # Errors
    ///
    /// See [`ControllerConfig::from_lookup`].
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load from an arbitrary key lookup, falling back to defaults.
    ///
    /// # Errors
    ///
    /// Returns `Error::Config` if a value does not parse or is out of range.
    ///
    /// # Examples
    ///
    /// ```
    /// use std::time::Duration;
    /// use vendlink_controller::ControllerConfig;
    ///
    /// let config = ControllerConfig::from_lookup(|key| match key {
    ///     "VENDLINK_PHASE_TIMEOUT_MS" => Some("30000".to_string()),
    ///     _ => None,
    /// })
    /// .unwrap();
    ///
    /// assert_eq!(config.phase_timeout, Some(Duration::from_secs(30)));
    /// assert_eq!(config.peripheral_address, 9);
    /// ```
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let peripheral_address = match lookup("VENDLINK_PERIPHERAL_ADDRESS") {
            Some(raw) => parse_address(&raw)?,
            None => defaults.peripheral_address,
        };

        let read_len = parse_var(&lookup, "VENDLINK_READ_LEN")?.unwrap_or(defaults.read_len);
        if !(1..=u8::MAX as usize).contains(&read_len) {
            return Err(Error::Config(format!(
                "VENDLINK_READ_LEN must be between 1 and 255, got {read_len}"
            )));
        }

        let millis = |key: &str, default: Duration| -> Result<Duration> {
            Ok(parse_var::<u64, _>(&lookup, key)?
                .map(Duration::from_millis)
                .unwrap_or(default))
        };

        let phase_timeout = parse_var::<u64, _>(&lookup, "VENDLINK_PHASE_TIMEOUT_MS")?
            .filter(|ms| *ms > 0)
            .map(Duration::from_millis);

        Ok(Self {
            peripheral_address,
            read_len,
            card_poll_interval: millis("VENDLINK_CARD_POLL_MS", defaults.card_poll_interval)?,
            authorized_poll_interval: millis(
                "VENDLINK_AUTHORIZED_POLL_MS",
                defaults.authorized_poll_interval,
            )?,
            dispense_poll_interval: millis(
                "VENDLINK_DISPENSE_POLL_MS",
                defaults.dispense_poll_interval,
            )?,
            cycle_delay: millis("VENDLINK_CYCLE_DELAY_MS", defaults.cycle_delay)?,
            validation_settle: millis("VENDLINK_SETTLE_MS", defaults.validation_settle)?,
            balance_hold: millis("VENDLINK_BALANCE_HOLD_MS", defaults.balance_hold)?,
            completion_hold: millis("VENDLINK_COMPLETION_HOLD_MS", defaults.completion_hold)?,
            phase_timeout,
        })
    }

    /// Configuration with every delay set to zero.
    ///
    /// Handy for tests that step the controller without a paused clock.
    pub fn without_delays() -> Self {
        Self {
            card_poll_interval: Duration::ZERO,
            authorized_poll_interval: Duration::ZERO,
            dispense_poll_interval: Duration::ZERO,
            cycle_delay: Duration::ZERO,
            validation_settle: Duration::ZERO,
            balance_hold: Duration::ZERO,
            completion_hold: Duration::ZERO,
            ..Self::default()
        }
    }
}

/// Parse an optional variable.
///
/// Returns `Ok(None)` when the key is absent or blank.
///
/// # Errors
///
/// Returns `Error::Config` naming the key when the value does not parse.
pub fn parse_var<T, F>(lookup: &F, key: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: std::fmt::Display,
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        Some(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|e| Error::Config(format!("{key}={raw:?}: {e}"))),
        _ => Ok(None),
    }
}

fn parse_address(raw: &str) -> Result<u8> {
    let raw = raw.trim();
    let parsed = match raw.strip_prefix("0x").or_else(|| raw.strip_prefix("0X")) {
        Some(hex) => u8::from_str_radix(hex, 16),
        None => raw.parse(),
    };

    match parsed {
        Ok(address) if address <= MAX_ADDRESS => Ok(address),
        _ => Err(Error::Config(format!(
            "VENDLINK_PERIPHERAL_ADDRESS={raw:?} is not a 7-bit address"
        ))),
    }
}
