//! Field validation helpers used by request payloads.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::AppError;

/// Minimum password length.
pub const MIN_PASSWORD_LEN: usize = 8;

static EMAIL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z0-9._%+\-]+@[A-Za-z0-9\-]+(\.[A-Za-z0-9\-]+)*\.[A-Za-z]{2,}$")
        .expect("email pattern is valid")
});

/// Trim and lowercase an email address, rejecting malformed ones.
pub fn normalize_email(raw: &str) -> Result<String, AppError> {
    let email = raw.trim().to_lowercase();
    if !EMAIL_RE.is_match(&email) {
        return Err(AppError::Validation(format!("invalid email address: {}", raw.trim())));
    }
    Ok(email)
}

/// Passwords must have at least [`MIN_PASSWORD_LEN`] characters.
pub fn check_password(password: &str) -> Result<(), AppError> {
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(AppError::Validation(format!(
            "password must be at least {MIN_PASSWORD_LEN} characters"
        )));
    }
    Ok(())
}

/// Trim `value` and require `1..=max` characters.
pub fn required_text(field: &str, value: &str, max: usize) -> Result<String, AppError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(AppError::Validation(format!("{field} must not be empty")));
    }
    if trimmed.chars().count() > max {
        return Err(AppError::Validation(format!("{field} must be at most {max} characters")));
    }
    Ok(trimmed.to_string())
}

/// Trim an optional value, mapping blank to `None`, and cap its length.
pub fn optional_text(field: &str, value: Option<String>, max: usize) -> Result<Option<String>, AppError> {
    match value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty()) {
        Some(v) if v.chars().count() > max => Err(AppError::Validation(format!(
            "{field} must be at most {max} characters"
        ))),
        other => Ok(other),
    }
}

/// Phone numbers must be in E.164 form.
pub fn check_phone(field: &str, value: Option<String>) -> Result<Option<String>, AppError> {
    match value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty()) {
        Some(v) if !v.starts_with('+') || v.len() < 2 || !v[1..].chars().all(|c| c.is_ascii_digit()) => {
            Err(AppError::BadRequest(format!(
                "Invalid phone number format for {field}. Must start with +"
            )))
        }
        other => Ok(other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn email_is_normalized() {
        assert_eq!(normalize_email("  Alice@Example.COM ").unwrap(), "alice@example.com");
        assert!(normalize_email("no-at-sign").is_err());
        assert!(normalize_email("a@b").is_err());
    }

    #[test]
    fn password_length_is_enforced() {
        assert!(check_password("short").is_err());
        assert!(check_password("long enough").is_ok());
    }

    #[test]
    fn required_text_trims_and_bounds() {
        assert_eq!(required_text("name", "  Acme ", 10).unwrap(), "Acme");
        assert!(required_text("name", "   ", 10).is_err());
        assert!(required_text("name", "abcdefghijk", 10).is_err());
    }

    #[test]
    fn optional_text_drops_blanks() {
        assert_eq!(optional_text("x", Some("  ".into()), 5).unwrap(), None);
        assert_eq!(optional_text("x", Some(" en ".into()), 5).unwrap(), Some("en".into()));
        assert!(optional_text("x", Some("toolong".into()), 5).is_err());
    }

    #[test]
    fn phone_requires_plus_prefix() {
        assert_eq!(check_phone("to", Some("+15551234".into())).unwrap(), Some("+15551234".into()));
        assert!(check_phone("to", Some("15551234".into())).is_err());
        assert!(check_phone("to", Some("+1-555".into())).is_err());
        assert_eq!(check_phone("to", None).unwrap(), None);
    }
}
