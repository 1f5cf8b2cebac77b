//! Daemon configuration from the process environment.
//!
//! | Variable | Meaning | Default |
//! |---|---|---|
//! | `VENDLINK_API_HOST` | balance service base URL | required |
//! | `VENDLINK_AUTH_TOKEN` | `Authorization` header value | required |
//! | `VENDLINK_I2C_DEVICE` | I2C character device | `/dev/i2c-1` |
//! | `VENDLINK_VALIDATION_TIMEOUT_MS` | balance request timeout | `15000` |
//! | `VENDLINK_TRUST_ANCHOR` | PEM root certificate file | none |
//! | `VENDLINK_STARTUP_DELAY_MS` | wait before the first poll | `5000` |
//! | `VENDLINK_DISPLAY_LINES` | display rows | `4` |
//! | `VENDLINK_DISPLAY_COLUMNS` | display columns | `21` |
//!
//! Controller timing variables are documented on `ControllerConfig`.

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use vendlink_controller::{ControllerConfig, config::parse_var};
use vendlink_core::{
    Error, Result,
    constants::{DEFAULT_VALIDATION_TIMEOUT_MS, DISPLAY_COLUMNS, DISPLAY_LINES, STARTUP_DELAY_MS},
};
use vendlink_network::ValidationClientConfig;

const DEFAULT_I2C_DEVICE: &str = "/dev/i2c-1";

#[derive(Clone)]
pub struct DaemonConfig {
    pub i2c_device: PathBuf,
    pub api_host: String,
    pub auth_token: String,
    pub validation_timeout: Duration,
    pub trust_anchor: Option<PathBuf>,
    pub startup_delay: Duration,
    pub display_lines: usize,
    pub display_columns: usize,
    pub controller: ControllerConfig,
}

impl DaemonConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |key: &str| -> Result<String> {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
                .ok_or_else(|| Error::MissingConfig(key.to_string()))
        };

        let millis = |key: &str, default: u64| -> Result<Duration> {
            Ok(Duration::from_millis(
                parse_var(&lookup, key)?.unwrap_or(default),
            ))
        };

        let display_lines = parse_var(&lookup, "VENDLINK_DISPLAY_LINES")?.unwrap_or(DISPLAY_LINES);
        let display_columns =
            parse_var(&lookup, "VENDLINK_DISPLAY_COLUMNS")?.unwrap_or(DISPLAY_COLUMNS);

        Ok(Self {
            i2c_device: lookup("VENDLINK_I2C_DEVICE")
                .filter(|v| !v.trim().is_empty())
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_I2C_DEVICE)),
            api_host: required("VENDLINK_API_HOST")?,
            auth_token: required("VENDLINK_AUTH_TOKEN")?,
            validation_timeout: millis(
                "VENDLINK_VALIDATION_TIMEOUT_MS",
                DEFAULT_VALIDATION_TIMEOUT_MS,
            )?,
            trust_anchor: lookup("VENDLINK_TRUST_ANCHOR")
                .filter(|v| !v.trim().is_empty())
                .map(PathBuf::from),
            startup_delay: millis("VENDLINK_STARTUP_DELAY_MS", STARTUP_DELAY_MS)?,
            display_lines,
            display_columns,
            controller: ControllerConfig::from_lookup(&lookup)?,
        })
    }

    /// Build the validation client settings, reading the trust anchor file
    /// if one is configured.
    pub fn client_config(&self) -> Result<ValidationClientConfig> {
        let mut config = ValidationClientConfig::new(&self.api_host, &self.auth_token)
            .with_timeout(self.validation_timeout);

        if let Some(path) = &self.trust_anchor {
            config = config.with_trust_anchor(std::fs::read(path)?);
        }

        Ok(config)
    }
}

impl fmt::Debug for DaemonConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DaemonConfig")
            .field("i2c_device", &self.i2c_device)
            .field("api_host", &self.api_host)
            .field("auth_token", &"<redacted>")
            .field("validation_timeout", &self.validation_timeout)
            .field("trust_anchor", &self.trust_anchor)
            .field("startup_delay", &self.startup_delay)
            .field("display", &(self.display_lines, self.display_columns))
            .field("controller", &self.controller)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let mut map: HashMap<String, String> = HashMap::from([
            ("VENDLINK_API_HOST".to_string(), "https://api.example.com/cards".to_string()),
            ("VENDLINK_AUTH_TOKEN".to_string(), "secret".to_string()),
        ]);
        for (k, v) in pairs {
            map.insert(k.to_string(), v.to_string());
        }
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = DaemonConfig::from_lookup(lookup(&[])).unwrap();

        assert_eq!(config.i2c_device, PathBuf::from("/dev/i2c-1"));
        assert_eq!(config.validation_timeout, Duration::from_secs(15));
        assert_eq!(config.startup_delay, Duration::from_secs(5));
        assert_eq!((config.display_lines, config.display_columns), (4, 21));
        assert!(config.trust_anchor.is_none());
        assert_eq!(config.controller, ControllerConfig::default());
    }

    #[rstest]
    #[case("VENDLINK_API_HOST")]
    #[case("VENDLINK_AUTH_TOKEN")]
    fn test_required_keys(#[case] key: &str) {
        let err = DaemonConfig::from_lookup(lookup(&[(key, "  ")])).unwrap_err();
        assert!(matches!(err, Error::MissingConfig(ref k) if k == key));
    }

    #[test]
    fn test_overrides_reach_controller() {
        let config = DaemonConfig::from_lookup(lookup(&[
            ("VENDLINK_I2C_DEVICE", "/dev/i2c-3"),
            ("VENDLINK_VALIDATION_TIMEOUT_MS", "2500"),
            ("VENDLINK_STARTUP_DELAY_MS", "0"),
            ("VENDLINK_DISPLAY_COLUMNS", "16"),
            ("VENDLINK_PHASE_TIMEOUT_MS", "60000"),
        ]))
        .unwrap();

        assert_eq!(config.i2c_device, PathBuf::from("/dev/i2c-3"));
        assert_eq!(config.validation_timeout, Duration::from_millis(2500));
        assert_eq!(config.startup_delay, Duration::ZERO);
        assert_eq!(config.display_columns, 16);
        assert_eq!(config.controller.phase_timeout, Some(Duration::from_secs(60)));
    }

    #[test]
    fn test_invalid_number() {
        let err =
            DaemonConfig::from_lookup(lookup(&[("VENDLINK_DISPLAY_LINES", "four")])).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_client_config() {
        let config = DaemonConfig::from_lookup(lookup(&[("VENDLINK_VALIDATION_TIMEOUT_MS", "900")]))
            .unwrap();
        let client = config.client_config().unwrap();

        assert_eq!(client.api_host, "https://api.example.com/cards");
        assert_eq!(client.auth_token, "secret");
        assert_eq!(client.timeout, Duration::from_millis(900));
    }

    #[test]
    fn test_missing_trust_anchor_file() {
        let config =
            DaemonConfig::from_lookup(lookup(&[("VENDLINK_TRUST_ANCHOR", "/nonexistent/ca.pem")]))
                .unwrap();

        assert!(matches!(config.client_config(), Err(Error::Io(_))));
    }

    #[test]
    fn test_debug_redacts_token() {
        let config = DaemonConfig::from_lookup(lookup(&[])).unwrap();
        assert!(!format!("{config:?}").contains("secret"));
    }
}
