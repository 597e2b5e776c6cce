use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;

use super::{
    Checkout, GatewayError, InitializeRequest, PaymentGateway, Verification, VerificationStatus,
};

/// Paystack's JSON envelope.
#[derive(Debug, Deserialize)]
struct Envelope<T> {
    status: bool,
    #[serde(default)]
    message: String,
    data: Option<T>,
}

#[derive(Debug, Deserialize)]
struct InitializeData {
    authorization_url: String,
    access_code: String,
    reference: String,
}

#[derive(Debug, Deserialize)]
struct VerifyData {
    status: String,
    reference: String,
    amount: i64,
    #[serde(default)]
    metadata: serde_json::Value,
}

#[derive(Clone)]
pub struct PaystackGateway {
    client: Client,
    secret_key: String,
    base_url: String,
}

impl PaystackGateway {
    pub fn new(
        secret_key: String,
        base_url: String,
        timeout: Duration,
    ) -> Result<Self, GatewayError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| GatewayError::Unavailable(e.to_string()))?;
        Ok(Self {
            client,
            secret_key,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    async fn read<T: DeserializeOwned>(
        response: reqwest::Response,
        reference: &str,
    ) -> Result<T, GatewayError> {
        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(GatewayError::NotFound(reference.to_string()));
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            // Paystack answers unknown references with 400 and this message.
            if body.contains("reference not found") {
                return Err(GatewayError::NotFound(reference.to_string()));
            }
            return Err(GatewayError::Unavailable(format!("HTTP {status}: {body}")));
        }

        let envelope: Envelope<T> = response
            .json()
            .await
            .map_err(|e| GatewayError::Malformed(e.to_string()))?;
        if !envelope.status {
            return Err(GatewayError::Unavailable(envelope.message));
        }
        envelope
            .data
            .ok_or_else(|| GatewayError::Malformed("missing data".to_string()))
    }
}

fn transport_error(err: reqwest::Error) -> GatewayError {
    if err.is_timeout() {
        GatewayError::Timeout
    } else {
        GatewayError::Unavailable(err.to_string())
    }
}

/// Paystack transaction states collapsed to the three we act on. Abandoned
/// checkouts can still be completed by the payer, so they stay pending.
fn map_status(status: &str) -> VerificationStatus {
    match status {
        "success" => VerificationStatus::Success,
        "failed" | "reversed" => VerificationStatus::Failed,
        _ => VerificationStatus::Pending,
    }
}

/// Metadata comes back as an object, or as an empty string when none was sent.
fn normalize_metadata(metadata: serde_json::Value) -> serde_json::Value {
    match metadata {
        serde_json::Value::String(raw) => {
            serde_json::from_str(&raw).unwrap_or(serde_json::Value::Null)
        }
        other => other,
    }
}

#[async_trait]
impl PaymentGateway for PaystackGateway {
    async fn initialize(&self, request: InitializeRequest) -> Result<Checkout, GatewayError> {
        tracing::info!(
            reference = %request.reference,
            amount = request.amount,
            "Initializing payment"
        );

        let response = self
            .client
            .post(format!("{}/transaction/initialize", self.base_url))
            .bearer_auth(&self.secret_key)
            .json(&request)
            .send()
            .await
            .map_err(transport_error)?;

        let data: InitializeData = Self::read(response, &request.reference).await?;
        Ok(Checkout {
            authorization_url: data.authorization_url,
            access_code: data.access_code,
            reference: data.reference,
        })
    }

    async fn verify(&self, reference: &str) -> Result<Verification, GatewayError> {
        tracing::info!(%reference, "Verifying payment");

        let response = self
            .client
            .get(format!("{}/transaction/verify/{reference}", self.base_url))
            .bearer_auth(&self.secret_key)
            .send()
            .await
            .map_err(transport_error)?;

        let data: VerifyData = Self::read(response, reference).await?;
        Ok(Verification {
            status: map_status(&data.status),
            reference: data.reference,
            amount: data.amount,
            metadata: normalize_metadata(data.metadata),
        })
    }
}
