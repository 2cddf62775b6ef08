//! CLI input validation functions.
//!
//! These validators are used by clap's `value_parser` attribute to validate
//! user input at parse time, providing immediate feedback for invalid values.

use crate::commands::parse::{MAX_USER_ID_LENGTH, is_valid_user_id};

/// Validate a publish base URL.
///
/// Delegates to the validator in `commands::init` to maintain a single source
/// of truth for validation rules.
pub fn validate_base_url(s: &str) -> Result<String, String> {
    use crate::commands::init;

    let trimmed = s.trim();
    init::validate_base_url(trimmed).map_err(|e| e.to_string())?;
    Ok(trimmed.to_string())
}

/// Validate a user, community or channel identifier.
///
/// Identifiers must be usable inside a `<@id>` mention, so the same rules
/// apply to all three.
pub fn validate_id(s: &str) -> Result<String, String> {
    let s = s.trim();

    if s.is_empty() {
        return Err("Identifier cannot be empty".to_string());
    }

    if s.len() > MAX_USER_ID_LENGTH {
        return Err(format!(
            "Identifier cannot exceed {MAX_USER_ID_LENGTH} characters"
        ));
    }

    if !is_valid_user_id(s) {
        return Err(format!(
            "Invalid identifier '{s}': only letters, digits, '_' and '-' are allowed"
        ));
    }

    Ok(s.to_string())
}

/// Validate free text passed to `rapport say`.
pub fn validate_message(s: &str) -> Result<String, String> {
    if s.trim().is_empty() {
        return Err("Message cannot be empty".to_string());
    }
    Ok(s.to_string())
}
