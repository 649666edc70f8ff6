//! Input validation utilities

use common::Position;
use regex::Regex;
use std::sync::OnceLock;

pub const TITLE_LEN: std::ops::RangeInclusive<usize> = 3..=100;
pub const DESCRIPTION_LEN: std::ops::RangeInclusive<usize> = 10..=500;

/// Validate a display name, returning it trimmed
pub fn validate_name(name: &str) -> Result<String, String> {
    let name = name.trim();
    if name.chars().count() < 2 {
        return Err("Name must be at least 2 characters".to_string());
    }
    if name.chars().count() > 100 {
        return Err("Name must be at most 100 characters".to_string());
    }
    Ok(name.to_string())
}

/// Validate email, returning it trimmed and lower-cased
pub fn validate_email(email: &str) -> Result<String, String> {
    let email = email.trim().to_lowercase();
    if email.is_empty() {
        return Err("Email is required".to_string());
    }

    if email.len() > 254 {
        return Err("Email must be at most 254 characters long".to_string());
    }

    static EMAIL_REGEX: OnceLock<Regex> = OnceLock::new();
    let regex = EMAIL_REGEX.get_or_init(|| {
        Regex::new(r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$")
            .expect("Failed to compile email regex")
    });

    if !regex.is_match(&email) {
        return Err("Invalid email format".to_string());
    }

    Ok(email)
}

/// Validate password
pub fn validate_password(password: &str) -> Result<(), String> {
    if password.len() < 6 {
        return Err("Password must be at least 6 characters".to_string());
    }

    if password.len() > 128 {
        return Err("Password must be at most 128 characters".to_string());
    }

    Ok(())
}

fn validate_length(
    field: &str,
    value: &str,
    bounds: std::ops::RangeInclusive<usize>,
) -> Result<String, String> {
    let value = value.trim();
    if !bounds.contains(&value.chars().count()) {
        return Err(format!(
            "{} must be between {} and {} characters",
            field,
            bounds.start(),
            bounds.end()
        ));
    }
    Ok(value.to_string())
}

/// Validate an alert title, returning it trimmed
pub fn validate_title(title: &str) -> Result<String, String> {
    validate_length("Title", title, TITLE_LEN)
}

/// Validate an alert description, returning it trimmed
pub fn validate_description(description: &str) -> Result<String, String> {
    validate_length("Description", description, DESCRIPTION_LEN)
}

pub fn validate_position(position: &Position) -> Result<(), String> {
    if !position.is_valid() {
        return Err("Invalid coordinates".to_string());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn email_is_normalized() {
        assert_eq!(
            validate_email("  Ana.Pop@Example.COM ").unwrap(),
            "ana.pop@example.com"
        );
        assert!(validate_email("not-an-email").is_err());
        assert!(validate_email("").is_err());
    }

    #[test]
    fn name_needs_two_characters() {
        assert!(validate_name(" A ").is_err());
        assert_eq!(validate_name(" Ana ").unwrap(), "Ana");
    }

    #[test]
    fn password_needs_six_characters() {
        assert!(validate_password("12345").is_err());
        assert!(validate_password("123456").is_ok());
    }

    #[test]
    fn alert_text_bounds() {
        assert!(validate_title("ab").is_err());
        assert_eq!(
            validate_title("  Illegal logging near river ").unwrap(),
            "Illegal logging near river"
        );
        assert!(validate_title(&"x".repeat(101)).is_err());
        assert!(validate_description("too short").is_err());
        assert!(validate_description("Fresh stumps along the east bank").is_ok());
        assert!(validate_description(&"x".repeat(501)).is_err());
    }

    #[test]
    fn coordinates_must_be_in_range() {
        assert!(validate_position(&Position::new(45.9432, 24.9668, 10.0)).is_ok());
        assert!(validate_position(&Position::new(-91.0, 24.9668, 10.0)).is_err());
    }
}
