//! Business logic services.
//!
//! Services sit between route handlers and repositories. They validate input,
//! apply store rules and return typed errors that `AppError` maps to HTTP
//! responses.
//!
//! # Services
//!
//! - `auth` - Registration, login, profiles and back-office user management
//! - `catalog` - Categories and products
//! - `cart` - Session cart and pricing
//! - `account` - Sealed addresses and saved payment methods
//! - `checkout` - Totals, payment and order creation
//! - `orders` - Order history, cancellation and fulfilment status
//! - `content` - Contact inbox, banner and hero carousel
//! - `dashboard` - Back-office analytics

pub mod account;
pub mod auth;
pub mod cart;
pub mod catalog;
pub mod checkout;
pub mod content;
pub mod dashboard;
pub mod orders;

/// Longest accepted name or title.
pub const MAX_NAME_LENGTH: usize = 200;

/// Trim a required text field and check its length.
///
/// # Errors
///
/// Returns a client-facing message if the value is blank or longer than `max`
/// characters.
pub fn required_text(field: &str, value: &str, max: usize) -> Result<String, String> {
    let value = value.trim();
    if value.is_empty() {
        return Err(format!("{field} is required"));
    }
    if value.chars().count() > max {
        return Err(format!("{field} must be at most {max} characters"));
    }
    Ok(value.to_string())
}

/// Trim an optional text field; blank becomes `None`.
///
/// # Errors
///
/// Returns a client-facing message if the value is longer than `max` characters.
pub fn optional_text(field: &str, value: Option<&str>, max: usize) -> Result<Option<String>, String> {
    match value.map(str::trim) {
        None | Some("") => Ok(None),
        Some(value) if value.chars().count() > max => {
            Err(format!("{field} must be at most {max} characters"))
        }
        Some(value) => Ok(Some(value.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_required_text_trims() {
        assert_eq!(required_text("name", "  Mugs ", 10), Ok("Mugs".to_string()));
    }

    #[test]
    fn test_required_text_rejects_blank_and_long() {
        assert_eq!(
            required_text("name", "   ", 10),
            Err("name is required".to_string())
        );
        assert!(required_text("name", &"a".repeat(11), 10).is_err());
        assert!(required_text("name", &"é".repeat(10), 10).is_ok());
    }

    #[test]
    fn test_optional_text() {
        assert_eq!(optional_text("subject", None, 10), Ok(None));
        assert_eq!(optional_text("subject", Some("  "), 10), Ok(None));
        assert_eq!(
            optional_text("subject", Some(" Hi "), 10),
            Ok(Some("Hi".to_string()))
        );
        assert!(optional_text("subject", Some(&"a".repeat(11)), 10).is_err());
    }
}
