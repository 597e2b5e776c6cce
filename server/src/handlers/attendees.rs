use std::collections::HashMap;

use axum::extract::State;
use axum::response::{IntoResponse, Response};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::extract::ApiQuery;
use super::UserScope;
use crate::auth::SessionUser;
use crate::models::Ticket;
use crate::services::analytics::attendee_stats;
use crate::state::AppState;
use crate::utils::error::AppError;
use crate::utils::response::success;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttendeeQuery {
    pub user_id: Option<Uuid>,
    pub event_id: Option<Uuid>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct AttendeeRow {
    #[serde(flatten)]
    ticket: Ticket,
    event_title: String,
}

pub async fn list_attendees(
    State(state): State<AppState>,
    session: SessionUser,
    ApiQuery(query): ApiQuery<AttendeeQuery>,
) -> Result<Response, AppError> {
    let user_id = UserScope {
        user_id: query.user_id,
    }
    .authorize(&session)?;

    let mut events = state.store.list_events_by_owner(user_id).await?;
    if let Some(event_id) = query.event_id {
        events.retain(|e| e.id == event_id);
        if events.is_empty() {
            return Err(AppError::NotFound("Event not found".to_string()));
        }
    }

    let titles: HashMap<Uuid, String> = events.iter().map(|e| (e.id, e.title.clone())).collect();
    let event_ids: Vec<Uuid> = events.iter().map(|e| e.id).collect();
    let rows: Vec<AttendeeRow> = state
        .store
        .list_tickets_by_events(&event_ids)
        .await?
        .into_iter()
        .map(|ticket| AttendeeRow {
            event_title: titles.get(&ticket.event_id).cloned().unwrap_or_default(),
            ticket,
        })
        .collect();

    Ok(success(rows, "Attendees retrieved successfully").into_response())
}

pub async fn attendee_statistics(
    State(state): State<AppState>,
    session: SessionUser,
    ApiQuery(scope): ApiQuery<UserScope>,
) -> Result<Response, AppError> {
    let user_id = scope.authorize(&session)?;
    let events = state.store.list_events_by_owner(user_id).await?;
    let event_ids: Vec<Uuid> = events.iter().map(|e| e.id).collect();
    let tickets = state.store.list_tickets_by_events(&event_ids).await?;

    let stats = attendee_stats(&events, &tickets, Utc::now());
    Ok(success(stats, "Attendee statistics retrieved successfully").into_response())
}
