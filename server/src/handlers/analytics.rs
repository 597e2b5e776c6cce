use axum::extract::State;
use axum::response::{IntoResponse, Response};
use chrono::Utc;
use uuid::Uuid;

use super::extract::ApiQuery;
use super::UserScope;
use crate::auth::SessionUser;
use crate::services::analytics::{dashboard, RECENT_EVENTS_LIMIT};
use crate::state::AppState;
use crate::utils::error::AppError;
use crate::utils::response::success;

pub async fn dashboard_stats(
    State(state): State<AppState>,
    session: SessionUser,
    ApiQuery(scope): ApiQuery<UserScope>,
) -> Result<Response, AppError> {
    let user_id = scope.authorize(&session)?;

    let events = state.store.list_events_by_owner(user_id).await?;
    let event_ids: Vec<Uuid> = events.iter().map(|e| e.id).collect();
    let tickets = state.store.list_tickets_by_events(&event_ids).await?;
    let purchases = state
        .store
        .list_completed_purchases_by_events(&event_ids)
        .await?;

    let stats = dashboard(&events, &tickets, &purchases, Utc::now(), RECENT_EVENTS_LIMIT);
    Ok(success(stats, "Dashboard statistics retrieved successfully").into_response())
}
