//! Scripted gateway for tests.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;

use super::{
    Checkout, GatewayError, InitializeRequest, PaymentGateway, Verification, VerificationStatus,
};

#[derive(Debug, Clone)]
struct Transaction {
    request: InitializeRequest,
    status: VerificationStatus,
    paid: i64,
}

/// Keeps initialized transactions in memory. Payments stay pending until a
/// test settles them with [`MockGateway::complete`] or [`MockGateway::fail`].
#[derive(Debug, Default)]
pub struct MockGateway {
    transactions: Mutex<HashMap<String, Transaction>>,
    outage: Mutex<Option<GatewayOutage>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GatewayOutage {
    Unavailable,
    Timeout,
}

impl MockGateway {
    pub fn new() -> Self {
        Self::default()
    }

    fn transactions(&self) -> MutexGuard<'_, HashMap<String, Transaction>> {
        self.transactions
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// The payer completed checkout for the initialized amount.
    pub fn complete(&self, reference: &str) {
        if let Some(tx) = self.transactions().get_mut(reference) {
            tx.status = VerificationStatus::Success;
            tx.paid = tx.request.amount;
        }
    }

    /// The payer completed checkout but the gateway settled a different amount.
    pub fn complete_with_amount(&self, reference: &str, paid: i64) {
        if let Some(tx) = self.transactions().get_mut(reference) {
            tx.status = VerificationStatus::Success;
            tx.paid = paid;
        }
    }

    pub fn fail(&self, reference: &str) {
        if let Some(tx) = self.transactions().get_mut(reference) {
            tx.status = VerificationStatus::Failed;
        }
    }

    pub fn set_outage(&self, outage: Option<GatewayOutage>) {
        *self.outage.lock().unwrap_or_else(PoisonError::into_inner) = outage;
    }

    pub fn initialized(&self, reference: &str) -> Option<InitializeRequest> {
        self.transactions()
            .get(reference)
            .map(|tx| tx.request.clone())
    }

    fn check_outage(&self) -> Result<(), GatewayError> {
        match *self.outage.lock().unwrap_or_else(PoisonError::into_inner) {
            Some(GatewayOutage::Unavailable) => {
                Err(GatewayError::Unavailable("HTTP 503".to_string()))
            }
            Some(GatewayOutage::Timeout) => Err(GatewayError::Timeout),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl PaymentGateway for MockGateway {
    async fn initialize(&self, request: InitializeRequest) -> Result<Checkout, GatewayError> {
        self.check_outage()?;
        let checkout = Checkout {
            authorization_url: format!("https://checkout.example.test/{}", request.reference),
            access_code: format!("ac_{}", request.reference.to_ascii_lowercase()),
            reference: request.reference.clone(),
        };
        self.transactions().insert(
            request.reference.clone(),
            Transaction {
                request,
                status: VerificationStatus::Pending,
                paid: 0,
            },
        );
        Ok(checkout)
    }

    async fn verify(&self, reference: &str) -> Result<Verification, GatewayError> {
        self.check_outage()?;
        let transactions = self.transactions();
        let tx = transactions
            .get(reference)
            .ok_or_else(|| GatewayError::NotFound(reference.to_string()))?;
        Ok(Verification {
            reference: reference.to_string(),
            status: tx.status,
            amount: tx.paid,
            metadata: tx.request.metadata.clone(),
        })
    }
}
