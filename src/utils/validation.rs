//! Input validation utilities

use validator::{Validate, ValidationError};

use crate::utils::error::AppError;

/// Reject names with control characters or surrounding whitespace
pub fn validate_display_name(name: &str) -> Result<(), ValidationError> {
    if name.trim() != name {
        return Err(ValidationError::new("surrounding_whitespace"));
    }
    if name.chars().any(char::is_control) {
        return Err(ValidationError::new("control_character"));
    }
    Ok(())
}

/// Validate a WeCom corp id: printable ASCII without spaces
pub fn validate_corp_id(corp_id: &str) -> Result<(), ValidationError> {
    if corp_id.bytes().all(|b| b.is_ascii_graphic()) {
        Ok(())
    } else {
        Err(ValidationError::new("invalid_corp_id"))
    }
}

/// Run derived validation on a request payload
pub fn validate_payload<T: Validate>(payload: &T) -> Result<(), AppError> {
    payload.validate().map_err(AppError::from)
}
