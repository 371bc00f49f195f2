//! Saved addresses and payment methods.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use emporium_core::{AddressId, PaymentInfoId, UserId};

const MAX_FIELD_LENGTH: usize = 200;

/// Address fields. Only ever stored sealed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddressDetails {
    pub full_name: String,
    pub line1: String,
    #[serde(default)]
    pub line2: Option<String>,
    pub city: String,
    #[serde(default)]
    pub state: Option<String>,
    pub postal_code: String,
    /// ISO 3166-1 alpha-2 country code.
    pub country: String,
    #[serde(default)]
    pub phone: Option<String>,
}

impl AddressDetails {
    /// Check required fields and lengths, returning a user-facing message.
    ///
    /// # Errors
    ///
    /// Returns the message describing the first invalid field.
    pub fn validate(&self) -> Result<(), String> {
        let required = [
            ("full_name", &self.full_name),
            ("line1", &self.line1),
            ("city", &self.city),
            ("postal_code", &self.postal_code),
            ("country", &self.country),
        ];
        for (field, value) in required {
            if value.trim().is_empty() {
                return Err(format!("{field} is required"));
            }
            if value.len() > MAX_FIELD_LENGTH {
                return Err(format!("{field} is too long"));
            }
        }

        let optional = [
            ("line2", &self.line2),
            ("state", &self.state),
            ("phone", &self.phone),
        ];
        for (field, value) in optional {
            if value.as_ref().is_some_and(|v| v.len() > MAX_FIELD_LENGTH) {
                return Err(format!("{field} is too long"));
            }
        }

        let country = self.country.trim();
        if country.len() != 2 || !country.chars().all(|c| c.is_ascii_alphabetic()) {
            return Err("country must be a two-letter code".to_string());
        }

        Ok(())
    }

    /// Lines as printed on a label or invoice.
    #[must_use]
    pub fn lines(&self) -> Vec<String> {
        let mut lines = vec![self.full_name.clone(), self.line1.clone()];
        if let Some(line2) = self.line2.as_deref().filter(|l| !l.trim().is_empty()) {
            lines.push(line2.to_string());
        }
        let region = match self.state.as_deref().filter(|s| !s.trim().is_empty()) {
            Some(state) => format!("{}, {} {}", self.city, state, self.postal_code),
            None => format!("{} {}", self.city, self.postal_code),
        };
        lines.push(region);
        lines.push(self.country.to_ascii_uppercase());
        lines
    }
}

/// Stored address row; `sealed` holds encrypted [`AddressDetails`].
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct AddressRecord {
    pub id: AddressId,
    pub user_id: UserId,
    pub label: String,
    pub sealed: String,
    pub is_default: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Address as returned to its owner.
#[derive(Debug, Clone, Serialize)]
pub struct Address {
    pub id: AddressId,
    pub label: String,
    pub is_default: bool,
    #[serde(flatten)]
    pub details: AddressDetails,
    pub created_at: DateTime<Utc>,
}

/// Card saved with the payment provider. Only display fields are kept locally.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct PaymentMethod {
    pub id: PaymentInfoId,
    #[serde(skip_serializing)]
    pub user_id: UserId,
    #[serde(skip_serializing)]
    pub stripe_payment_method_id: String,
    pub brand: String,
    pub last4: String,
    pub exp_month: i32,
    pub exp_year: i32,
    pub is_default: bool,
    pub created_at: DateTime<Utc>,
}

/// Card display details accepted by the payment sealing endpoints.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentDetails {
    pub cardholder_name: String,
    pub brand: String,
    pub last4: String,
    pub exp_month: u8,
    pub exp_year: u16,
}

impl PaymentDetails {
    /// Check field shapes, returning a user-facing message.
    ///
    /// # Errors
    ///
    /// Returns the message describing the first invalid field.
    pub fn validate(&self) -> Result<(), String> {
        if self.cardholder_name.trim().is_empty() {
            return Err("cardholder_name is required".to_string());
        }
        if self.last4.len() != 4 || !self.last4.chars().all(|c| c.is_ascii_digit()) {
            return Err("last4 must be four digits".to_string());
        }
        if !(1..=12).contains(&self.exp_month) {
            return Err("exp_month must be between 1 and 12".to_string());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn details() -> AddressDetails {
        AddressDetails {
            full_name: "Grace Hopper".to_string(),
            line1: "1 Navy Way".to_string(),
            line2: None,
            city: "Arlington".to_string(),
            state: Some("VA".to_string()),
            postal_code: "22201".to_string(),
            country: "us".to_string(),
            phone: None,
        }
    }

    #[test]
    fn test_valid_address() {
        assert!(details().validate().is_ok());
    }

    #[test]
    fn test_missing_required_field() {
        let mut address = details();
        address.city = "  ".to_string();
        assert_eq!(address.validate(), Err("city is required".to_string()));
    }

    #[test]
    fn test_country_must_be_two_letters() {
        let mut address = details();
        address.country = "USA".to_string();
        assert!(address.validate().is_err());
    }

    #[test]
    fn test_lines_include_region() {
        let lines = details().lines();
        assert_eq!(
            lines,
            vec!["Grace Hopper", "1 Navy Way", "Arlington, VA 22201", "US"]
        );
    }

    #[test]
    fn test_payment_details_validation() {
        let mut payment = PaymentDetails {
            cardholder_name: "Grace Hopper".to_string(),
            brand: "visa".to_string(),
            last4: "4242".to_string(),
            exp_month: 12,
            exp_year: 2030,
        };
        assert!(payment.validate().is_ok());
        payment.last4 = "42a2".to_string();
        assert!(payment.validate().is_err());
        payment.last4 = "4242".to_string();
        payment.exp_month = 13;
        assert!(payment.validate().is_err());
    }
}
