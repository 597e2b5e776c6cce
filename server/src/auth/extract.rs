use axum::async_trait;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use uuid::Uuid;

use super::AuthError;
use crate::state::AppState;
use crate::utils::error::AppError;

/// The caller, as resolved from the bearer token.
#[derive(Debug, Clone)]
pub struct SessionUser {
    pub user_id: Uuid,
    pub email: Option<String>,
}

impl SessionUser {
    /// Rejects requests whose `userId` parameter names someone else.
    pub fn ensure_is(&self, claimed: Uuid) -> Result<(), AppError> {
        if self.user_id != claimed {
            return Err(AppError::AuthError("Unauthorized".to_string()));
        }
        Ok(())
    }

    /// Ownership check for anything keyed to an organizer.
    pub fn ensure_owns(&self, owner: Uuid, resource: &str) -> Result<(), AppError> {
        if self.user_id != owner {
            return Err(AppError::Forbidden(format!(
                "You do not have access to this {resource}"
            )));
        }
        Ok(())
    }
}

fn bearer_token(parts: &Parts) -> Result<&str, AuthError> {
    let header = parts
        .headers
        .get(axum::http::header::AUTHORIZATION)
        .ok_or(AuthError::MissingToken)?
        .to_str()
        .map_err(|_| AuthError::MalformedHeader)?;
    let token = header
        .strip_prefix("Bearer ")
        .ok_or(AuthError::MalformedHeader)?
        .trim();
    if token.is_empty() {
        return Err(AuthError::MalformedHeader);
    }
    Ok(token)
}

#[async_trait]
impl FromRequestParts<AppState> for SessionUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = bearer_token(parts)?;
        let identity = state.identity.resolve(token).await?;
        Ok(SessionUser {
            user_id: identity.user_id,
            email: identity.email,
        })
    }
}
