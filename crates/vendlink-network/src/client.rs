//! HTTPS client for the balance service.
//!
//! # Design
//!
//! The client is a thin request/decode layer:
//! - **One request per validation**: no retry, no caching of balances
//! - **Explicit timeout**: every request is bounded (default 15 s) and a
//!   timeout is reported as [`ValidationError::Timeout`], not folded into a
//!   generic failure
//! - **Decision by rule**: the authorization threshold lives in
//!   [`ValidationResult::from_balance`], not in the service
//!
//! Deciding what a failure means for the transaction is left to the
//! controller.

use std::fmt;
use std::net::IpAddr;
use std::time::Duration;

use reqwest::{
    Certificate, Client, StatusCode, Url,
    header::{AUTHORIZATION, HeaderValue},
};
use serde::Deserialize;
use tracing::{debug, info, warn};
use vendlink_core::{CardId, ValidationResult, constants::DEFAULT_VALIDATION_TIMEOUT_MS};

use crate::{
    error::{Result, ValidationError},
    validator::CardValidator,
};

/// Configuration for [`ValidationClient`].
///
/// # Example
///
/// ```
/// use vendlink_network::ValidationClientConfig;
/// use std::time::Duration;
///
/// let config = ValidationClientConfig::new("https://api.example.com/cards", "secret")
///     .with_timeout(Duration::from_secs(5));
/// assert_eq!(config.timeout, Duration::from_secs(5));
/// ```
#[derive(Clone)]
pub struct ValidationClientConfig {
    /// Base URL; the card id is appended as the last path segment
    pub api_host: String,

    /// Sent verbatim as the `Authorization` header
    pub auth_token: String,

    /// Bound on the whole request, connect through body
    pub timeout: Duration,

    /// Extra PEM root certificate trusted for the service
    pub trust_anchor_pem: Option<Vec<u8>>,
}

impl ValidationClientConfig {
    /// Create a configuration with the default timeout and no extra trust
    /// anchor.
    pub fn new(api_host: impl Into<String>, auth_token: impl Into<String>) -> Self {
        Self {
            api_host: api_host.into(),
            auth_token: auth_token.into(),
            timeout: Duration::from_millis(DEFAULT_VALIDATION_TIMEOUT_MS),
            trust_anchor_pem: None,
        }
    }

    /// Set the request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Trust an additional PEM-encoded root certificate.
    pub fn with_trust_anchor(mut self, pem: Vec<u8>) -> Self {
        self.trust_anchor_pem = Some(pem);
        self
    }
}

impl fmt::Debug for ValidationClientConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ValidationClientConfig")
            .field("api_host", &self.api_host)
            .field("auth_token", &"<redacted>")
            .field("timeout", &self.timeout)
            .field("trust_anchor_pem", &self.trust_anchor_pem.as_ref().map(Vec::len))
            .finish()
    }
}

#[derive(Debug, Deserialize)]
struct BalanceResponse {
    balance: f64,
}

/// HTTPS [`CardValidator`] backed by the remote balance service.
#[derive(Debug, Clone)]
pub struct ValidationClient {
    http: Client,
    api_host: String,
    authorization: HeaderValue,
    timeout: Duration,
}

impl ValidationClient {
    /// Build a client from its configuration.
    ///
    /// # Errors
    ///
    /// Returns `ValidationError::InvalidConfig` if:
    /// - The host is not an `https://` URL (`http://` is accepted for
    ///   loopback hosts only)
    /// - The token cannot be sent as a header value
    /// - The trust anchor is not valid PEM or the TLS backend rejects it
    pub fn new(config: ValidationClientConfig) -> Result<Self> {
        let api_host = config.api_host.trim_end_matches('/').to_string();
        check_scheme(&api_host)?;

        let mut authorization = HeaderValue::from_str(&config.auth_token).map_err(|_| {
            ValidationError::InvalidConfig("auth token is not a valid header value".to_string())
        })?;
        authorization.set_sensitive(true);

        let mut builder = Client::builder().timeout(config.timeout);
        if let Some(pem) = &config.trust_anchor_pem {
            let cert = Certificate::from_pem(pem)
                .map_err(|e| ValidationError::InvalidConfig(format!("trust anchor: {e}")))?;
            builder = builder.add_root_certificate(cert);
        }

        let http = builder
            .build()
            .map_err(|e| ValidationError::InvalidConfig(e.to_string()))?;

        debug!(api_host = %api_host, timeout = ?config.timeout, "Validation client ready");

        Ok(Self {
            http,
            api_host,
            authorization,
            timeout: config.timeout,
        })
    }

    /// Base URL of the balance service.
    pub fn api_host(&self) -> &str {
        &self.api_host
    }

    /// Fetch the raw balance for a card.
    ///
    /// # Errors
    ///
    /// - `Timeout` if the request exceeded the configured timeout
    /// - `Connect` if the service could not be reached
    /// - `Status` for any status other than 200 or 201
    /// - `Decode` if the body is not JSON with a numeric `balance`
    pub async fn check_balance(&self, card_id: &CardId) -> Result<f64> {
        let url = self.card_url(card_id);
        debug!(card = %card_id, "Requesting balance");

        let response = self
            .http
            .get(&url)
            .header(AUTHORIZATION, self.authorization.clone())
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;

        let status = response.status();
        if status != StatusCode::OK && status != StatusCode::CREATED {
            warn!(card = %card_id, status = status.as_u16(), "Balance service rejected request");
            return Err(ValidationError::Status(status.as_u16()));
        }

        let body = response.bytes().await.map_err(|e| self.transport_error(e))?;
        let parsed: BalanceResponse = serde_json::from_slice(&body)
            .map_err(|e| ValidationError::Decode(e.to_string()))?;

        Ok(parsed.balance)
    }

    /// Diagnostic reachability check against the service root.
    ///
    /// Returns the HTTP status, whatever it is.
    ///
    /// # Errors
    ///
    /// Returns a transport error if no response was received at all.
    pub async fn probe(&self) -> Result<u16> {
        let response = self
            .http
            .get(&self.api_host)
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;

        Ok(response.status().as_u16())
    }

    fn card_url(&self, card_id: &CardId) -> String {
        format!("{}/{}", self.api_host, card_id.as_str())
    }

    fn transport_error(&self, err: reqwest::Error) -> ValidationError {
        if err.is_timeout() {
            ValidationError::Timeout(u64::try_from(self.timeout.as_millis()).unwrap_or(u64::MAX))
        } else if err.is_connect() {
            ValidationError::Connect(err.to_string())
        } else {
            ValidationError::Http(err)
        }
    }
}

impl CardValidator for ValidationClient {
    async fn validate(&self, card_id: &CardId) -> Result<ValidationResult> {
        let balance = self.check_balance(card_id).await?;
        let result = ValidationResult::from_balance(balance);

        info!(card = %card_id, balance, authorized = result.authorized, "Card validated");
        Ok(result)
    }
}

/// Only TLS may carry the token off the machine.
fn check_scheme(api_host: &str) -> Result<()> {
    let url = Url::parse(api_host)
        .map_err(|e| ValidationError::InvalidConfig(format!("api host '{api_host}': {e}")))?;

    match url.scheme() {
        "https" => Ok(()),
        "http" if is_loopback(&url) => {
            warn!(api_host, "Balance service reached over plain HTTP");
            Ok(())
        }
        "http" => Err(ValidationError::InvalidConfig(format!(
            "api host '{api_host}' must use https"
        ))),
        scheme => Err(ValidationError::InvalidConfig(format!(
            "api host '{api_host}' has unsupported scheme '{scheme}'"
        ))),
    }
}

fn is_loopback(url: &Url) -> bool {
    url.host_str().is_some_and(|host| {
        host.eq_ignore_ascii_case("localhost")
            || host
                .trim_start_matches('[')
                .trim_end_matches(']')
                .parse::<IpAddr>()
                .is_ok_and(|ip| ip.is_loopback())
    })
}
