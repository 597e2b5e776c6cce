use axum::extract::State;
use axum::response::{IntoResponse, Redirect, Response};
use reqwest::Url;

use super::extract::ApiPath;
use crate::state::AppState;
use crate::utils::codes::is_valid_reference;
use crate::utils::error::AppError;

const QR_SIZE: &str = "300x300";

/// Image URL for a QR code encoding `data` at the configured renderer.
pub fn render_url(base: &str, data: &str) -> Result<Url, AppError> {
    Url::parse_with_params(base, &[("size", QR_SIZE), ("data", data)])
        .map_err(|e| AppError::InternalServerError(format!("QR_RENDER_URL is invalid: {e}")))
}

/// Redirects to the rendered QR image for a ticket code or payment reference.
pub async fn qr_code(
    State(state): State<AppState>,
    ApiPath(reference): ApiPath<String>,
) -> Result<Response, AppError> {
    if !is_valid_reference(&reference) {
        return Err(AppError::ValidationError("reference is invalid".to_string()));
    }
    let url = render_url(&state.config.qr_render_url, &reference)?;
    Ok(Redirect::temporary(url.as_str()).into_response())
}
