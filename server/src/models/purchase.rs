use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "payment_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    Pending,
    Completed,
    Failed,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Purchase {
    pub id: Uuid,
    pub event_id: Uuid,
    pub ticket_id: Option<Uuid>,
    pub email: String,
    pub amount: Decimal,
    /// Amount the payment was initialized for, kept when it differs from `amount`.
    pub expected_amount: Option<Decimal>,
    /// Set when the verified payment disagrees with what was initialized.
    pub flagged: bool,
    pub payment_reference: String,
    pub payment_status: PaymentStatus,
    pub created_at: DateTime<Utc>,
}
