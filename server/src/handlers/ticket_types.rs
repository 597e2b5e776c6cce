use axum::extract::State;
use axum::response::{IntoResponse, Response};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Deserialize;
use tracing::info;
use uuid::Uuid;

use super::extract::{ApiJson, ApiPath, ApiQuery};
use crate::auth::SessionUser;
use crate::models::{Event, TicketType};
use crate::state::AppState;
use crate::utils::error::AppError;
use crate::utils::response::{created, empty_success, success};
use crate::utils::validation::require_non_empty;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TicketTypeQuery {
    pub event_id: Option<Uuid>,
    pub user_id: Option<Uuid>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TicketTypePayload {
    pub event_id: Option<Uuid>,
    pub name: Option<String>,
    pub description: Option<String>,
    pub price: Option<Decimal>,
    #[serde(alias = "quantity")]
    pub quantity_available: Option<i32>,
    pub sale_start: Option<DateTime<Utc>>,
    pub sale_end: Option<DateTime<Utc>>,
    pub is_active: Option<bool>,
}

impl TicketTypePayload {
    fn apply(self, tt: &mut TicketType, now: DateTime<Utc>) -> Result<(), AppError> {
        if let Some(name) = self.name {
            require_non_empty(&name, "name")?;
            tt.name = name.trim().to_string();
        }
        if self.description.is_some() {
            tt.description = self.description;
        }
        if let Some(price) = self.price {
            if price.is_sign_negative() {
                return Err(AppError::ValidationError("price cannot be negative".to_string()));
            }
            tt.price = price;
        }
        if let Some(quantity) = self.quantity_available {
            if quantity < tt.quantity_sold {
                return Err(AppError::ValidationError(format!(
                    "quantityAvailable cannot be below the {} already sold",
                    tt.quantity_sold
                )));
            }
            tt.quantity_available = quantity;
        }
        if self.sale_start.is_some() {
            tt.sale_start = self.sale_start;
        }
        if self.sale_end.is_some() {
            tt.sale_end = self.sale_end;
        }
        if let (Some(start), Some(end)) = (tt.sale_start, tt.sale_end) {
            if end < start {
                return Err(AppError::ValidationError(
                    "saleEnd cannot be before saleStart".to_string(),
                ));
            }
        }
        if let Some(active) = self.is_active {
            tt.is_active = active;
        }
        tt.updated_at = now;
        Ok(())
    }
}

async fn owned_event(
    state: &AppState,
    session: &SessionUser,
    event_id: Uuid,
) -> Result<Event, AppError> {
    let event = state
        .store
        .get_event(event_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Event not found".to_string()))?;
    session.ensure_owns(event.user_id, "event")?;
    Ok(event)
}

async fn owned_ticket_type(
    state: &AppState,
    session: &SessionUser,
    id: Uuid,
) -> Result<TicketType, AppError> {
    let tt = state
        .store
        .get_ticket_type(id)
        .await?
        .ok_or_else(|| AppError::NotFound("Ticket type not found".to_string()))?;
    owned_event(state, session, tt.event_id).await?;
    Ok(tt)
}

/// By event for anyone while the event is published, or for its owner.
/// By user only for that user's own session.
pub async fn list_ticket_types(
    State(state): State<AppState>,
    session: Option<SessionUser>,
    ApiQuery(query): ApiQuery<TicketTypeQuery>,
) -> Result<Response, AppError> {
    let ticket_types = match (query.event_id, query.user_id) {
        (Some(event_id), _) => {
            let event = state
                .store
                .get_event(event_id)
                .await?
                .filter(|e| {
                    e.is_published
                        || session.as_ref().is_some_and(|u| e.is_owned_by(u.user_id))
                })
                .ok_or_else(|| AppError::NotFound("Event not found".to_string()))?;
            state.store.list_ticket_types_by_events(&[event.id]).await?
        }
        (None, Some(user_id)) => {
            let session = session.ok_or_else(|| AppError::AuthError("Unauthorized".to_string()))?;
            session.ensure_is(user_id)?;
            let event_ids: Vec<Uuid> = state
                .store
                .list_events_by_owner(user_id)
                .await?
                .iter()
                .map(|e| e.id)
                .collect();
            state.store.list_ticket_types_by_events(&event_ids).await?
        }
        (None, None) => {
            return Err(AppError::ValidationError(
                "eventId or userId is required".to_string(),
            ))
        }
    };
    Ok(success(ticket_types, "Ticket types retrieved successfully").into_response())
}

pub async fn create_ticket_type(
    State(state): State<AppState>,
    session: SessionUser,
    ApiJson(payload): ApiJson<TicketTypePayload>,
) -> Result<Response, AppError> {
    let event_id = payload
        .event_id
        .ok_or_else(|| AppError::ValidationError("eventId is required".to_string()))?;
    if payload.name.is_none() {
        return Err(AppError::ValidationError("name is required".to_string()));
    }
    let event = owned_event(&state, &session, event_id).await?;

    let now = Utc::now();
    let mut tt = TicketType {
        id: Uuid::new_v4(),
        event_id: event.id,
        name: String::new(),
        description: None,
        price: Decimal::ZERO,
        quantity_available: 0,
        quantity_sold: 0,
        sale_start: None,
        sale_end: None,
        is_active: true,
        created_at: now,
        updated_at: now,
    };
    payload.apply(&mut tt, now)?;

    let tt = state.store.insert_ticket_type(&tt).await?;
    info!(ticket_type_id = %tt.id, event_id = %event.id, "Ticket type created");
    Ok(created(tt, "Ticket type created successfully").into_response())
}

pub async fn update_ticket_type(
    State(state): State<AppState>,
    session: SessionUser,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(payload): ApiJson<TicketTypePayload>,
) -> Result<Response, AppError> {
    let mut tt = owned_ticket_type(&state, &session, id).await?;
    if payload.event_id.is_some_and(|event_id| event_id != tt.event_id) {
        return Err(AppError::ValidationError(
            "A ticket type cannot be moved to another event".to_string(),
        ));
    }
    payload.apply(&mut tt, Utc::now())?;
    let tt = state.store.update_ticket_type(&tt).await?;
    info!(ticket_type_id = %tt.id, "Ticket type updated");
    Ok(success(tt, "Ticket type updated successfully").into_response())
}

pub async fn delete_ticket_type(
    State(state): State<AppState>,
    session: SessionUser,
    ApiPath(id): ApiPath<Uuid>,
) -> Result<Response, AppError> {
    let tt = owned_ticket_type(&state, &session, id).await?;
    if tt.quantity_sold > 0 {
        return Err(AppError::Conflict(
            "Cannot delete a ticket type that has sales".to_string(),
        ));
    }
    state.store.delete_ticket_type(tt.id).await?;
    info!(ticket_type_id = %tt.id, "Ticket type deleted");
    Ok(empty_success("Ticket type deleted successfully").into_response())
}
