//! JSON envelopes shared by every handler.
//!
//! Success: `{ "success": true, "data": ..., "message": ... }`.
//! Failure: `{ "success": false, "error": { "code", "message", "details" } }`.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use serde_json::Value;

#[derive(Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub success: bool,
    pub data: Option<T>,
    pub message: Option<String>,
}

#[derive(Serialize)]
pub struct ApiErrorBody {
    pub code: &'static str,
    pub message: String,
    pub details: Option<Value>,
}

#[derive(Serialize)]
pub struct ApiErrorResponse {
    pub success: bool,
    pub error: ApiErrorBody,
}

fn respond<T>(
    status: StatusCode,
    data: Option<T>,
    message: String,
) -> (StatusCode, Json<ApiResponse<T>>)
where
    T: Serialize,
{
    let body = ApiResponse {
        success: true,
        data,
        message: Some(message),
    };
    (status, Json(body))
}

pub fn success<T: Serialize>(data: T, message: impl Into<String>) -> impl IntoResponse {
    respond(StatusCode::OK, Some(data), message.into())
}

pub fn created<T: Serialize>(data: T, message: impl Into<String>) -> impl IntoResponse {
    respond(StatusCode::CREATED, Some(data), message.into())
}

pub fn empty_success(message: impl Into<String>) -> impl IntoResponse {
    respond::<()>(StatusCode::OK, None, message.into())
}

/// Error envelope. Details are never filled from internal errors.
pub fn failure(status: StatusCode, code: &'static str, message: impl Into<String>) -> Response {
    let body = ApiErrorResponse {
        success: false,
        error: ApiErrorBody {
            code,
            message: message.into(),
            details: None,
        },
    };
    (status, Json(body)).into_response()
}
