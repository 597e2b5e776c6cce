use validator::Validate;

use crate::models::{AttendeeInfo, CustomField};
use crate::utils::error::AppError;

pub fn require_non_empty(value: &str, field: &str) -> Result<(), AppError> {
    if value.trim().is_empty() {
        return Err(AppError::ValidationError(format!("{field} is required")));
    }
    Ok(())
}

/// Checks attendee details and that every required custom question has an answer.
pub fn validate_attendee(info: &AttendeeInfo, fields: &[CustomField]) -> Result<(), AppError> {
    info.validate()?;
    require_non_empty(&info.name, "attendee name")?;

    for field in fields.iter().filter(|f| f.required) {
        let answered = match info.responses.get(&field.id) {
            None | Some(serde_json::Value::Null) => false,
            Some(serde_json::Value::String(s)) => !s.trim().is_empty(),
            Some(serde_json::Value::Array(items)) => !items.is_empty(),
            Some(_) => true,
        };
        if !answered {
            return Err(AppError::ValidationError(format!(
                "'{}' is required",
                field.label
            )));
        }
    }
    Ok(())
}
