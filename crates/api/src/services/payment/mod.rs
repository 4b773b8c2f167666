//! Payment gateway seam.
//!
//! Checkout and the payment callback talk to [`PaymentGateway`]; the
//! production implementation is [`PaystackGateway`], and tests script a mock
//! against the same trait.

mod paystack;

pub use paystack::PaystackGateway;

use async_trait::async_trait;
use thiserror::Error;

use okra_core::{Email, Price};

/// Errors from the payment provider.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// Transport failure (connect, timeout, TLS).
    #[error("payment provider request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The provider answered but rejected the request.
    #[error("payment provider rejected the request: {0}")]
    Rejected(String),

    /// The provider's response did not match the documented shape.
    #[error("unexpected payment provider response: {0}")]
    UnexpectedResponse(String),
}

/// A payment the provider is ready to collect.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentSession {
    /// Where the shopper completes payment.
    pub authorization_url: String,
    /// Provider reference identifying this transaction.
    pub reference: String,
}

/// The provider's verdict on a transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerifiedPayment {
    /// The charge went through.
    Success,
    /// The charge failed or was abandoned.
    Failed,
}

/// Hosted-payment-page gateway: initialize a transaction, then verify it
/// after the shopper returns through the callback.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Start a transaction for `amount`, to be paid by `email`.
    ///
    /// The provider redirects the shopper to `callback_url` after payment.
    async fn initialize(
        &self,
        amount: Price,
        email: &Email,
        callback_url: &str,
    ) -> Result<PaymentSession, GatewayError>;

    /// Ask the provider for the final status of `reference`.
    async fn verify(&self, reference: &str) -> Result<VerifiedPayment, GatewayError>;
}
