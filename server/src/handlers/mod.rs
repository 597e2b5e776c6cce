use axum::response::{IntoResponse, Response};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::auth::SessionUser;
use crate::utils::error::AppError;
use crate::utils::response::success;

pub mod analytics;
pub mod attendees;
pub mod events;
pub mod extract;
pub mod payments;
pub mod qr;
pub mod ticket_types;
pub mod tickets;
pub mod wallet;
pub mod wizard;

#[derive(Serialize)]
struct HealthPayload {
    status: &'static str,
    service: &'static str,
}

pub async fn health_check() -> Response {
    let payload = HealthPayload {
        status: "ok",
        service: "ticketing-api",
    };

    success(payload, "Health check successful").into_response()
}

/// `?userId=` on user-scoped reads.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserScope {
    pub user_id: Option<Uuid>,
}

impl UserScope {
    /// The parameter is required and must name the session's own user.
    pub fn authorize(&self, session: &SessionUser) -> Result<Uuid, AppError> {
        let user_id = self
            .user_id
            .ok_or_else(|| AppError::ValidationError("userId is required".to_string()))?;
        session.ensure_is(user_id)?;
        Ok(user_id)
    }
}

/// Ticket type selectors arrive as an id or as the literal `free`.
pub(crate) fn parse_ticket_type_selector(raw: Option<&str>) -> Result<Option<Uuid>, AppError> {
    match raw.map(str::trim) {
        None | Some("") => Ok(None),
        Some(value) if value.eq_ignore_ascii_case("free") => Ok(None),
        Some(value) => Uuid::parse_str(value)
            .map(Some)
            .map_err(|_| AppError::ValidationError("ticketType is not a valid id".to_string())),
    }
}
