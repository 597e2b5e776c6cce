//! Payment gateway adapter.
//!
//! Two calls: [`PaymentGateway::initialize`] starts a hosted checkout and
//! [`PaymentGateway::verify`] asks the gateway what happened to a reference.
//! Verification is the only source of truth for whether money moved; a
//! timeout or transport failure is never read as a failed payment.

use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;

#[cfg(any(test, feature = "test-utils"))]
pub mod mock;
pub mod paystack;

#[cfg(any(test, feature = "test-utils"))]
pub use mock::{GatewayOutage, MockGateway};
pub use paystack::PaystackGateway;

#[derive(Debug, Error)]
pub enum GatewayError {
    /// Transport failure or non-success HTTP status.
    #[error("payment gateway unavailable: {0}")]
    Unavailable(String),

    /// No response in time. The outcome is unknown.
    #[error("payment gateway timed out")]
    Timeout,

    #[error("transaction '{0}' not found")]
    NotFound(String),

    #[error("unexpected gateway response: {0}")]
    Malformed(String),
}

#[derive(Debug, Clone, Serialize)]
pub struct InitializeRequest {
    /// Minor currency units (kobo).
    pub amount: i64,
    pub email: String,
    pub reference: String,
    pub callback_url: String,
    pub metadata: serde_json::Value,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Checkout {
    pub authorization_url: String,
    pub access_code: String,
    pub reference: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum VerificationStatus {
    Success,
    Failed,
    Pending,
}

#[derive(Debug, Clone)]
pub struct Verification {
    pub reference: String,
    pub status: VerificationStatus,
    /// Minor currency units actually paid.
    pub amount: i64,
    /// Metadata attached at initialization, as stored by the gateway.
    pub metadata: serde_json::Value,
}

#[async_trait]
pub trait PaymentGateway: Send + Sync {
    async fn initialize(&self, request: InitializeRequest) -> Result<Checkout, GatewayError>;
    async fn verify(&self, reference: &str) -> Result<Verification, GatewayError>;
}
