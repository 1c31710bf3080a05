//! Input validation for API requests.
//!
//! For collecting multiple validation errors and returning them as an
//! ApiError, use the `ValidationErrorBuilder` from the `error` module.

use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    /// Pragmatic email check: one @, something on each side, a dot in the domain
    static ref EMAIL_REGEX: Regex = Regex::new(
        r"^[^@\s]+@[^@\s]+\.[^@\s]+$"
    ).unwrap();

    /// Phone numbers: digits with optional +, spaces, dashes, parentheses
    static ref PHONE_REGEX: Regex = Regex::new(
        r"^\+?[0-9][0-9 ().-]{5,24}$"
    ).unwrap();
}

/// Validate a guest's display name
pub fn validate_guest_name(name: &str) -> Result<(), String> {
    let name = name.trim();
    if name.is_empty() {
        return Err("Guest name is required".to_string());
    }
    if name.len() < 2 {
        return Err("Guest name is too short (min 2 characters)".to_string());
    }
    if name.len() > 120 {
        return Err("Guest name is too long (max 120 characters)".to_string());
    }
    Ok(())
}

pub fn validate_email(email: &str) -> Result<(), String> {
    if email.is_empty() {
        return Err("Email is required".to_string());
    }
    if email.len() > 254 {
        return Err("Email is too long (max 254 characters)".to_string());
    }
    if !EMAIL_REGEX.is_match(email) {
        return Err("Invalid email format".to_string());
    }
    Ok(())
}

pub fn validate_phone(phone: &str) -> Result<(), String> {
    if phone.is_empty() {
        return Err("Phone number is required".to_string());
    }
    if !PHONE_REGEX.is_match(phone) {
        return Err("Invalid phone number format".to_string());
    }
    Ok(())
}

/// Validate a room-type label (e.g. "Deluxe Double")
pub fn validate_room_type(room_type: &str) -> Result<(), String> {
    let room_type = room_type.trim();
    if room_type.is_empty() {
        return Err("Room type is required".to_string());
    }
    if room_type.len() > 100 {
        return Err("Room type is too long (max 100 characters)".to_string());
    }
    Ok(())
}

pub fn validate_nightly_price(price: f64) -> Result<(), String> {
    if !price.is_finite() {
        return Err("Nightly price must be a number".to_string());
    }
    if price <= 0.0 {
        return Err("Nightly price must be greater than zero".to_string());
    }
    if price > 1_000_000.0 {
        return Err("Nightly price is out of range".to_string());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_email() {
        assert!(validate_email("guest@example.com").is_ok());
        assert!(validate_email("a.b+c@mail.example.co").is_ok());
        assert!(validate_email("").is_err());
        assert!(validate_email("no-at-sign").is_err());
        assert!(validate_email("two@@example.com").is_err());
        assert!(validate_email("@example.com").is_err());
    }

    #[test]
    fn test_validate_phone() {
        assert!(validate_phone("+34 600 123 456").is_ok());
        assert!(validate_phone("555-0102-33").is_ok());
        assert!(validate_phone("(212) 555-0199").is_err()); // must start with digit or +
        assert!(validate_phone("12345").is_err()); // too short
        assert!(validate_phone("").is_err());
        assert!(validate_phone("call me").is_err());
    }

    #[test]
    fn test_validate_guest_name() {
        assert!(validate_guest_name("Ana").is_ok());
        assert!(validate_guest_name("").is_err());
        assert!(validate_guest_name("A").is_err());
        assert!(validate_guest_name(&"x".repeat(121)).is_err());
    }

    #[test]
    fn test_validate_room_type() {
        assert!(validate_room_type("Deluxe Double").is_ok());
        assert!(validate_room_type("  ").is_err());
        assert!(validate_room_type(&"x".repeat(101)).is_err());
    }

    #[test]
    fn test_validate_nightly_price() {
        assert!(validate_nightly_price(120.0).is_ok());
        assert!(validate_nightly_price(0.0).is_err());
        assert!(validate_nightly_price(-10.0).is_err());
        assert!(validate_nightly_price(f64::NAN).is_err());
        assert!(validate_nightly_price(f64::INFINITY).is_err());
    }
}
