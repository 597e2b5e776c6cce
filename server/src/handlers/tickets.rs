use axum::extract::State;
use axum::response::{IntoResponse, Response};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::extract::ApiJson;
use super::parse_ticket_type_selector;
use crate::auth::SessionUser;
use crate::models::{AttendeeInfo, Ticket};
use crate::services::registration::FreeRegistration;
use crate::state::AppState;
use crate::utils::error::AppError;
use crate::utils::response::created;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateTicketRequest {
    pub event_id: Uuid,
    pub attendee_info: AttendeeInfo,
    /// Ticket type id, or `free` / absent for events without tiers.
    #[serde(default, alias = "ticketTypeId")]
    pub ticket_type: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct IssuedTicket {
    ticket: Ticket,
    payment_reference: String,
    oversold: bool,
}

/// Free registration. Guests may register when the event allows it.
pub async fn create_ticket(
    State(state): State<AppState>,
    session: Option<SessionUser>,
    ApiJson(request): ApiJson<CreateTicketRequest>,
) -> Result<Response, AppError> {
    let ticket_type_id = parse_ticket_type_selector(request.ticket_type.as_deref())?;
    let issued = state
        .registrations()
        .register_free(FreeRegistration {
            event_id: request.event_id,
            ticket_type_id,
            attendee: request.attendee_info,
            authenticated: session.is_some(),
        })
        .await?;

    let body = IssuedTicket {
        ticket: issued.ticket,
        payment_reference: issued.purchase.payment_reference,
        oversold: issued.oversold,
    };
    Ok(created(body, "Ticket created successfully").into_response())
}
