//! Scripted validator for tests and development.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use vendlink_core::{CardId, ValidationResult};

use crate::{
    error::{Result, ValidationError},
    validator::CardValidator,
};

/// A scripted failure returned by [`MockValidator`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MockFailure {
    /// Behave as if the request timed out
    Timeout,
    /// Behave as if the service was unreachable
    Connect,
    /// Behave as if the service answered with this status
    Status(u16),
}

impl From<MockFailure> for ValidationError {
    fn from(failure: MockFailure) -> Self {
        match failure {
            MockFailure::Timeout => ValidationError::Timeout(0),
            MockFailure::Connect => ValidationError::Connect("mock connection refused".into()),
            MockFailure::Status(code) => ValidationError::Status(code),
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum Outcome {
    Balance(f64),
    Fail(MockFailure),
}

#[derive(Debug, Default)]
struct Inner {
    outcomes: HashMap<String, Outcome>,
    calls: Vec<CardId>,
}

/// [`CardValidator`] with per-card scripted balances.
///
/// Unknown cards answer like the real service does for an unknown id: HTTP
/// 404. Clones share state, so a test can keep one clone while the
/// controller owns another.
///
/// # Examples
///
/// ```
/// use vendlink_core::CardId;
/// use vendlink_network::{CardValidator, MockValidator};
///
/// #[tokio::main(flavor = "current_thread")]
/// async fn main() {
///     let validator = MockValidator::new().with_balance("CARD0001", 50.0);
///     let card = CardId::new("CARD0001").unwrap();
///
///     let result = validator.validate(&card).await.unwrap();
///     assert!(result.authorized);
///     assert_eq!(validator.calls(), vec![card]);
/// }
/// ```
#[derive(Debug, Clone, Default)]
pub struct MockValidator {
    inner: Arc<Mutex<Inner>>,
}

impl MockValidator {
    /// Create a validator that knows no cards.
    pub fn new() -> Self {
        Self::default()
    }

    /// Script a balance for a card.
    pub fn with_balance(self, card: &str, balance: f64) -> Self {
        self.script(card, Outcome::Balance(balance));
        self
    }

    /// Script a failure for a card.
    pub fn with_failure(self, card: &str, failure: MockFailure) -> Self {
        self.script(card, Outcome::Fail(failure));
        self
    }

    /// Change a card's balance after construction.
    pub fn set_balance(&self, card: &str, balance: f64) {
        self.script(card, Outcome::Balance(balance));
    }

    /// Cards validated so far, in call order.
    pub fn calls(&self) -> Vec<CardId> {
        self.lock().calls.clone()
    }

    fn script(&self, card: &str, outcome: Outcome) {
        self.lock().outcomes.insert(card.to_string(), outcome);
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl CardValidator for MockValidator {
    async fn validate(&self, card_id: &CardId) -> Result<ValidationResult> {
        let mut inner = self.lock();
        inner.calls.push(card_id.clone());

        match inner.outcomes.get(card_id.as_str()) {
            Some(Outcome::Balance(balance)) => Ok(ValidationResult::from_balance(*balance)),
            Some(Outcome::Fail(failure)) => Err((*failure).into()),
            None => Err(ValidationError::Status(404)),
        }
    }
}
