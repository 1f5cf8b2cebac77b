//! The card validation seam.

#![allow(async_fn_in_trait)]

use vendlink_core::{CardId, ValidationResult};

use crate::error::Result;

/// Checks whether a card may be charged.
///
/// The controller awaits this call inline: nothing else happens on the
/// control loop until it returns.
///
/// # Object Safety
///
/// This trait is NOT object-safe because `async fn` methods return opaque
/// futures. Use generic type parameters.
pub trait CardValidator: Send {
    /// Look up the card's balance and apply the authorization rule.
    ///
    /// # Errors
    ///
    /// Returns a [`ValidationError`](crate::ValidationError) when no balance
    /// could be obtained. Callers treat every error as a denial.
    async fn validate(&self, card_id: &CardId) -> Result<ValidationResult>;
}
