use axum::response::{IntoResponse, Response};

use super::extract::ApiJson;
use crate::services::wizard::{plan_steps, WizardState};
use crate::utils::error::AppError;
use crate::utils::response::success;

pub async fn wizard_steps(ApiJson(form): ApiJson<WizardState>) -> Result<Response, AppError> {
    Ok(success(plan_steps(&form), "Wizard steps computed").into_response())
}
