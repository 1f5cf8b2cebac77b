//! Remote card validation for the vending controller.
//!
//! A presented card is checked against a remote balance service before the
//! controller authorizes a dispense. The service is a single HTTPS endpoint:
//!
//! ```text
//! GET <host>/<card id>
//! Authorization: <token>
//!
//! 200 OK
//! {"balance": 42.5}
//! ```
//!
//! A balance strictly greater than 10 authorizes the card.
//!
//! # Components
//!
//! - [`CardValidator`]: the seam the controller is generic over
//! - [`ValidationClient`]: reqwest-based HTTPS implementation
//! - [`MockValidator`]: scripted balances for tests and development
//!
//! # Example
//!
//! ```no_run
//! use std::time::Duration;
//! use vendlink_core::CardId;
//! use vendlink_network::{CardValidator, ValidationClient, ValidationClientConfig};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = ValidationClientConfig::new("https://api.example.com/cards", "secret")
//!     .with_timeout(Duration::from_secs(5));
//! let client = ValidationClient::new(config)?;
//!
//! let result = client.validate(&CardId::new("CARD0001")?).await?;
//! println!("authorized: {}", result.authorized);
//! # Ok(())
//! # }
//! ```

mod client;
mod error;
mod mock;
mod validator;

pub use client::{ValidationClient, ValidationClientConfig};
pub use error::{Result, ValidationError};
pub use mock::{MockFailure, MockValidator};
pub use validator::CardValidator;
