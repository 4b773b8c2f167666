//! Paystack implementation of [`PaymentGateway`].
//!
//! Two endpoints are used: `POST /transaction/initialize` to obtain the
//! hosted payment page, and `GET /transaction/verify/{reference}` when the
//! shopper comes back through the callback. Paystack wraps both in an
//! envelope of `{ status, message, data }` where `status` is the request
//! outcome, not the charge outcome.

use async_trait::async_trait;
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};
use tracing::instrument;

use okra_core::{Email, Price};

use super::{GatewayError, PaymentGateway, PaymentSession, VerifiedPayment};
use crate::config::GatewayConfig;

/// Paystack API client.
pub struct PaystackGateway {
    client: reqwest::Client,
    api_base: String,
    secret_key: secrecy::SecretString,
    currency: String,
}

impl std::fmt::Debug for PaystackGateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PaystackGateway")
            .field("api_base", &self.api_base)
            .field("currency", &self.currency)
            .finish_non_exhaustive()
    }
}

#[derive(Serialize)]
struct InitializeRequest<'a> {
    email: &'a str,
    /// Amount in the currency's minor unit, as Paystack expects.
    amount: i64,
    currency: &'a str,
    callback_url: &'a str,
}

#[derive(Deserialize)]
struct Envelope<T> {
    status: bool,
    message: String,
    data: Option<T>,
}

#[derive(Deserialize)]
struct InitializeData {
    authorization_url: String,
    reference: String,
}

#[derive(Deserialize)]
struct VerifyData {
    status: String,
}

impl PaystackGateway {
    /// Build a gateway from config.
    ///
    /// # Errors
    ///
    /// Returns `GatewayError::Http` if the HTTP client cannot be built.
    pub fn new(config: &GatewayConfig, currency: &str) -> Result<Self, GatewayError> {
        let client = reqwest::Client::builder().timeout(config.timeout).build()?;

        Ok(Self {
            client,
            api_base: config.api_base.trim_end_matches('/').to_owned(),
            secret_key: config.secret_key.clone(),
            currency: currency.to_owned(),
        })
    }

    fn unwrap_envelope<T>(envelope: Envelope<T>) -> Result<T, GatewayError> {
        if !envelope.status {
            return Err(GatewayError::Rejected(envelope.message));
        }
        envelope
            .data
            .ok_or_else(|| GatewayError::UnexpectedResponse("missing data field".to_owned()))
    }
}

#[async_trait]
impl PaymentGateway for PaystackGateway {
    #[instrument(skip(self), fields(amount = %amount, email = %email))]
    async fn initialize(
        &self,
        amount: Price,
        email: &Email,
        callback_url: &str,
    ) -> Result<PaymentSession, GatewayError> {
        let request = InitializeRequest {
            email: email.as_str(),
            amount: amount.minor_units(),
            currency: &self.currency,
            callback_url,
        };

        let envelope: Envelope<InitializeData> = self
            .client
            .post(format!("{}/transaction/initialize", self.api_base))
            .bearer_auth(self.secret_key.expose_secret())
            .json(&request)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        let data = Self::unwrap_envelope(envelope)?;
        Ok(PaymentSession {
            authorization_url: data.authorization_url,
            reference: data.reference,
        })
    }

    #[instrument(skip(self))]
    async fn verify(&self, reference: &str) -> Result<VerifiedPayment, GatewayError> {
        let envelope: Envelope<VerifyData> = self
            .client
            .get(format!("{}/transaction/verify/{reference}", self.api_base))
            .bearer_auth(self.secret_key.expose_secret())
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        let data = Self::unwrap_envelope(envelope)?;
        // Anything other than an explicit success (abandoned, failed,
        // reversed) counts as a failed charge.
        Ok(if data.status == "success" {
            VerifiedPayment::Success
        } else {
            VerifiedPayment::Failed
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_envelope_rejection_carries_message() {
        let envelope: Envelope<InitializeData> = Envelope {
            status: false,
            message: "Invalid key".to_owned(),
            data: None,
        };
        match PaystackGateway::unwrap_envelope(envelope) {
            Err(GatewayError::Rejected(msg)) => assert_eq!(msg, "Invalid key"),
            Err(other) => panic!("unexpected error: {other:?}"),
            Ok(_) => panic!("expected rejection"),
        }
    }

    #[test]
    fn test_envelope_missing_data_is_unexpected() {
        let envelope: Envelope<VerifyData> = Envelope {
            status: true,
            message: "Verification successful".to_owned(),
            data: None,
        };
        assert!(matches!(
            PaystackGateway::unwrap_envelope(envelope),
            Err(GatewayError::UnexpectedResponse(_))
        ));
    }

    #[test]
    fn test_verify_response_shape() {
        let body = r#"{
            "status": true,
            "message": "Verification successful",
            "data": { "status": "success", "reference": "ref_123", "amount": 1000 }
        }"#;
        let envelope: Envelope<VerifyData> = serde_json::from_str(body).expect("parse");
        let data = PaystackGateway::unwrap_envelope(envelope).expect("data");
        assert_eq!(data.status, "success");
    }
}
