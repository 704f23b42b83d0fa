use once_cell::sync::Lazy;
use regex::Regex;

use crate::utils::error::{AppError, AppResult};

static EMAIL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$").expect("email regex is valid")
});

static PHONE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\+?[0-9]{8,15}$").expect("phone regex is valid"));

pub fn validate_email(email: &str) -> AppResult<()> {
    if email.len() > 254 || !EMAIL_RE.is_match(email) {
        return Err(AppError::ValidationError("Invalid email format".to_string()));
    }
    Ok(())
}

pub fn validate_password(password: &str) -> AppResult<()> {
    if password.len() < 8 || password.len() > 128 {
        return Err(AppError::ValidationError(
            "Password must be between 8 and 128 characters".to_string(),
        ));
    }
    if !password.chars().any(|c| c.is_alphabetic()) || !password.chars().any(|c| c.is_ascii_digit())
    {
        return Err(AppError::ValidationError(
            "Password must contain at least one letter and one digit".to_string(),
        ));
    }
    Ok(())
}

pub fn validate_phone(phone: &str) -> AppResult<()> {
    if !PHONE_RE.is_match(phone) {
        return Err(AppError::ValidationError(
            "Phone number must be 8 to 15 digits, optionally prefixed with +".to_string(),
        ));
    }
    Ok(())
}

/// Checks a trimmed free-text field against a character-count range.
pub fn validate_length(field: &str, value: &str, min: usize, max: usize) -> AppResult<()> {
    let len = value.trim().chars().count();
    if len < min || len > max {
        return Err(AppError::ValidationError(format!(
            "{} must be between {} and {} characters",
            field, min, max
        )));
    }
    Ok(())
}
