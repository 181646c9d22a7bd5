use crate::errors::{AppError, AppResult};

const ID_DIGITS: usize = 17;

/// Validates a national id (17 digits followed by a digit or `X`) and returns
/// its canonical form with the check character upper-cased.
pub fn validate_national_id(id: &str) -> AppResult<String> {
    let invalid = |message: &str| AppError::InvalidId {
        id: id.to_string(),
        message: message.to_string(),
    };

    if id.chars().count() != ID_DIGITS + 1 {
        return Err(invalid("expected 18 characters"));
    }

    let mut chars = id.chars();
    if !chars.by_ref().take(ID_DIGITS).all(|ch| ch.is_ascii_digit()) {
        return Err(invalid("the first 17 characters must be digits"));
    }

    match chars.next() {
        Some(ch) if ch.is_ascii_digit() => Ok(id.to_string()),
        Some('x') | Some('X') => Ok(format!("{}X", &id[..ID_DIGITS])),
        _ => Err(invalid("the last character must be a digit or X")),
    }
}

/// Registry key for a caller-supplied id: the canonical form when the id is
/// well formed, otherwise the input unchanged so lookups simply miss.
pub fn canonical_id(id: &str) -> String {
    validate_national_id(id).unwrap_or_else(|_| id.to_string())
}

pub fn validate_display_name(name: &str) -> AppResult<String> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(AppError::InvalidName {
            name: name.to_string(),
            message: "name cannot be empty".into(),
        });
    }
    if trimmed.chars().any(char::is_control) {
        return Err(AppError::InvalidName {
            name: name.to_string(),
            message: "name cannot contain control characters".into(),
        });
    }
    Ok(trimmed.to_string())
}
