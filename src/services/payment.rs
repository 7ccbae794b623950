//! Payment gateway integration
//!
//! This service wraps the external payment provider behind a trait so
//! registration flows can be driven by any gateway, and tests can swap
//! in a stub. The HTTP implementation targets a Paystack-style API:
//! initialize returns a checkout URL, verification is a pull on the
//! transaction reference.

use std::time::Duration;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use crate::config::settings::PaymentConfig;
use crate::utils::errors::{PaymentError, PaymentResult};

/// Where to send the user to complete a payment
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentInitiation {
    pub payment_url: String,
    pub reference: String,
}

/// Gateway-side outcome of a payment
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaymentStatus {
    Success,
    Failed,
    Pending,
}

/// Gateway-side standing of a recurring subscription
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubscriptionStanding {
    Active,
    Lapsed,
}

/// External payment provider operations
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Start a payment and get the checkout URL for the user
    async fn initialize_payment(&self, email: &str, amount_minor: i64, reference: &str) -> PaymentResult<PaymentInitiation>;

    /// Look up the outcome of a previously initialized payment
    async fn verify_payment(&self, reference: &str) -> PaymentResult<PaymentStatus>;

    /// Check whether a customer's recurring subscription is still paid up
    async fn verify_subscription(&self, customer_reference: &str) -> PaymentResult<SubscriptionStanding>;
}

/// Generate a fresh payment reference
pub fn new_reference() -> String {
    use rand::Rng;
    const CHARSET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";
    let mut rng = rand::thread_rng();

    let suffix: String = (0..16)
        .map(|_| {
            let idx = rng.gen_range(0..CHARSET.len());
            CHARSET[idx] as char
        })
        .collect();

    format!("REF-{}", suffix)
}

#[derive(Debug, Clone, Deserialize)]
struct GatewayEnvelope<T> {
    status: bool,
    message: Option<String>,
    data: Option<T>,
}

#[derive(Debug, Clone, Deserialize)]
struct InitializeData {
    authorization_url: String,
    reference: String,
}

#[derive(Debug, Clone, Deserialize)]
struct VerifyData {
    status: String,
}

#[derive(Debug, Clone, Deserialize)]
struct SubscriptionData {
    status: String,
}

/// HTTP payment gateway client
#[derive(Debug, Clone)]
pub struct HttpPaymentGateway {
    client: Client,
    api_url: String,
    secret_key: String,
}

impl HttpPaymentGateway {
    /// Create a new gateway client from configuration
    pub fn new(config: &PaymentConfig) -> PaymentResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .user_agent("Reprise/1.0")
            .build()
            .map_err(|e| PaymentError::RequestFailed(e.to_string()))?;

        Ok(Self {
            client,
            api_url: config.api_url.trim_end_matches('/').to_string(),
            secret_key: config.secret_key.clone(),
        })
    }

    async fn get_json<T: serde::de::DeserializeOwned>(&self, url: &str) -> PaymentResult<GatewayEnvelope<T>> {
        let response = self
            .client
            .get(url)
            .bearer_auth(&self.secret_key)
            .send()
            .await
            .map_err(map_request_error)?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(PaymentError::RequestFailed(format!("HTTP {}: {}", status, error_text)));
        }

        response
            .json::<GatewayEnvelope<T>>()
            .await
            .map_err(|e| PaymentError::InvalidResponse(e.to_string()))
    }
}

#[async_trait]
impl PaymentGateway for HttpPaymentGateway {
    async fn initialize_payment(&self, email: &str, amount_minor: i64, reference: &str) -> PaymentResult<PaymentInitiation> {
        let url = format!("{}/transaction/initialize", self.api_url);
        debug!(reference = reference, amount_minor = amount_minor, "Initializing payment");

        let body = serde_json::json!({
            "email": email,
            "amount": amount_minor,
            "reference": reference,
        });

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.secret_key)
            .json(&body)
            .send()
            .await
            .map_err(map_request_error)?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(PaymentError::RequestFailed(format!("HTTP {}: {}", status, error_text)));
        }

        let envelope: GatewayEnvelope<InitializeData> = response
            .json()
            .await
            .map_err(|e| PaymentError::InvalidResponse(e.to_string()))?;

        if !envelope.status {
            return Err(PaymentError::RequestFailed(
                envelope.message.unwrap_or_else(|| "gateway reported failure".to_string()),
            ));
        }

        let data = envelope
            .data
            .ok_or_else(|| PaymentError::InvalidResponse("initialize response missing data".to_string()))?;

        Ok(PaymentInitiation {
            payment_url: data.authorization_url,
            reference: data.reference,
        })
    }

    async fn verify_payment(&self, reference: &str) -> PaymentResult<PaymentStatus> {
        let url = format!("{}/transaction/verify/{}", self.api_url, reference);
        debug!(reference = reference, "Verifying payment");

        let envelope: GatewayEnvelope<VerifyData> = self.get_json(&url).await?;

        if !envelope.status {
            return Err(PaymentError::RequestFailed(
                envelope.message.unwrap_or_else(|| "gateway reported failure".to_string()),
            ));
        }

        let data = envelope
            .data
            .ok_or_else(|| PaymentError::InvalidResponse("verify response missing data".to_string()))?;

        let status = match data.status.as_str() {
            "success" => PaymentStatus::Success,
            "failed" | "abandoned" | "reversed" => PaymentStatus::Failed,
            other => {
                debug!(reference = reference, status = other, "Payment still settling");
                PaymentStatus::Pending
            }
        };

        Ok(status)
    }

    async fn verify_subscription(&self, customer_reference: &str) -> PaymentResult<SubscriptionStanding> {
        let url = format!("{}/subscription/{}", self.api_url, customer_reference);
        debug!(customer_reference = customer_reference, "Verifying subscription standing");

        let envelope: GatewayEnvelope<SubscriptionData> = self.get_json(&url).await?;

        if !envelope.status {
            warn!(customer_reference = customer_reference, "Gateway could not resolve subscription");
            return Ok(SubscriptionStanding::Lapsed);
        }

        let data = envelope
            .data
            .ok_or_else(|| PaymentError::InvalidResponse("subscription response missing data".to_string()))?;

        let standing = match data.status.as_str() {
            "active" | "non-renewing" => SubscriptionStanding::Active,
            _ => SubscriptionStanding::Lapsed,
        };

        Ok(standing)
    }
}

fn map_request_error(e: reqwest::Error) -> PaymentError {
    if e.is_timeout() {
        PaymentError::Timeout
    } else if e.is_connect() {
        PaymentError::ServiceUnavailable
    } else {
        PaymentError::RequestFailed(e.to_string())
    }
}
