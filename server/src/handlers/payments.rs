use axum::extract::State;
use axum::response::{IntoResponse, Response};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use super::extract::ApiJson;
use crate::auth::SessionUser;
use crate::models::{AttendeeInfo, Purchase, Ticket};
use crate::payments::VerificationStatus;
use crate::services::registration::{AmountMismatch, PaidRegistration, VerifyOutcome};
use crate::state::AppState;
use crate::utils::error::AppError;
use crate::utils::response::success;

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct InitializePaymentRequest {
    pub event_id: Uuid,
    pub ticket_type_id: Option<Uuid>,
    #[validate(nested)]
    pub attendee_info: AttendeeInfo,
    /// Minor currency units.
    #[validate(range(min = 1, message = "amount must be greater than zero"))]
    pub amount: i64,
    #[validate(email(message = "email is not a valid email address"))]
    pub email: String,
    #[serde(default)]
    pub metadata: serde_json::Value,
}

#[derive(Debug, Deserialize)]
pub struct VerifyPaymentRequest {
    pub reference: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct VerifiedPayment {
    ticket: Option<Ticket>,
    purchase: Purchase,
    already_processed: bool,
    oversold: bool,
    amount_mismatch: Option<AmountMismatch>,
}

pub async fn initialize_payment(
    State(state): State<AppState>,
    session: Option<SessionUser>,
    ApiJson(mut request): ApiJson<InitializePaymentRequest>,
) -> Result<Response, AppError> {
    request.email = request.email.trim().to_string();
    request.validate()?;

    let checkout = state
        .registrations()
        .initialize_payment(PaidRegistration {
            event_id: request.event_id,
            ticket_type_id: request.ticket_type_id,
            attendee: request.attendee_info,
            amount: request.amount,
            email: request.email,
            client_metadata: request.metadata,
            authenticated: session.is_some(),
        })
        .await?;
    Ok(success(checkout, "Payment initialized").into_response())
}

/// Safe to call repeatedly for the same reference.
pub async fn verify_payment(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<VerifyPaymentRequest>,
) -> Result<Response, AppError> {
    let reference = request.reference.trim();
    let body = match state.registrations().verify_payment(reference).await? {
        VerifyOutcome::Issued(issued) => VerifiedPayment {
            oversold: issued.oversold,
            amount_mismatch: issued.amount_mismatch,
            ticket: Some(issued.ticket),
            purchase: issued.purchase,
            already_processed: false,
        },
        VerifyOutcome::AlreadyProcessed {
            ticket,
            purchase,
            amount_mismatch,
        } => VerifiedPayment {
            oversold: ticket.as_ref().is_some_and(|t| t.oversold),
            ticket,
            purchase,
            already_processed: true,
            amount_mismatch,
        },
        VerifyOutcome::NotSuccessful(status) => {
            let message = match status {
                VerificationStatus::Pending => "Payment has not been completed",
                _ => "Payment was not successful",
            };
            return Err(AppError::PaymentNotSuccessful(message.to_string()));
        }
    };

    let message = if body.already_processed {
        "Payment already processed"
    } else {
        "Payment verified successfully"
    };
    Ok(success(body, message).into_response())
}
