//! Account email addresses.

use core::fmt;

use serde::{Deserialize, Serialize};

/// Why a string was rejected as an email address.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum EmailError {
    #[error("email cannot be empty")]
    Empty,
    #[error("email must be at most {max} characters")]
    TooLong { max: usize },
    #[error("email cannot contain whitespace")]
    Whitespace,
    /// Zero or more than one `@`.
    #[error("email must contain exactly one @ symbol")]
    AtSymbol,
    #[error("email local part must be 1 to {max} characters")]
    LocalPart { max: usize },
    /// Empty domain, no dot, or a dot at either end.
    #[error("email domain is invalid")]
    Domain,
}

/// A structurally valid email address.
///
/// Validation is structural only: one `@`, a non-empty local part of at
/// most 64 characters and a dotted domain. Deliverability is never checked.
///
/// ```
/// use emporium_core::Email;
///
/// assert!(Email::parse("ada+shop@example.co.uk").is_ok());
/// assert!(Email::parse("ada@localhost").is_err());
/// assert_eq!(
///     Email::normalized(" Ada@Example.COM ").unwrap().as_str(),
///     "ada@example.com"
/// );
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(try_from = "String", into = "String")]
pub struct Email(String);

impl Email {
    /// Maximum length of an address (RFC 5321).
    pub const MAX_LENGTH: usize = 254;

    /// Maximum length of the part before the `@`.
    pub const MAX_LOCAL_LENGTH: usize = 64;

    /// Validate `s` as given, without changing case.
    ///
    /// # Errors
    ///
    /// Returns the first structural problem found.
    pub fn parse(s: &str) -> Result<Self, EmailError> {
        if s.is_empty() {
            return Err(EmailError::Empty);
        }
        if s.len() > Self::MAX_LENGTH {
            return Err(EmailError::TooLong {
                max: Self::MAX_LENGTH,
            });
        }
        if s.chars().any(char::is_whitespace) {
            return Err(EmailError::Whitespace);
        }

        let (local, domain) = s.split_once('@').ok_or(EmailError::AtSymbol)?;
        if domain.contains('@') {
            return Err(EmailError::AtSymbol);
        }
        if local.is_empty() || local.len() > Self::MAX_LOCAL_LENGTH {
            return Err(EmailError::LocalPart {
                max: Self::MAX_LOCAL_LENGTH,
            });
        }
        if !domain.contains('.') || domain.starts_with('.') || domain.ends_with('.') {
            return Err(EmailError::Domain);
        }

        Ok(Self(s.to_owned()))
    }

    /// Trim and lowercase, then [`parse`](Self::parse).
    ///
    /// Accounts are keyed by the normalized form, so every email written to
    /// the database goes through here.
    ///
    /// # Errors
    ///
    /// Same as [`Email::parse`].
    pub fn normalized(s: &str) -> Result<Self, EmailError> {
        Self::parse(&s.trim().to_lowercase())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Email {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for Email {
    type Error = EmailError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<Email> for String {
    fn from(email: Email) -> Self {
        email.0
    }
}

impl AsRef<str> for Email {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(feature = "postgres")]
impl sqlx::Type<sqlx::Postgres> for Email {
    fn type_info() -> sqlx::postgres::PgTypeInfo {
        <String as sqlx::Type<sqlx::Postgres>>::type_info()
    }

    fn compatible(ty: &sqlx::postgres::PgTypeInfo) -> bool {
        <String as sqlx::Type<sqlx::Postgres>>::compatible(ty)
    }
}

#[cfg(feature = "postgres")]
impl<'r> sqlx::Decode<'r, sqlx::Postgres> for Email {
    fn decode(value: sqlx::postgres::PgValueRef<'r>) -> Result<Self, sqlx::error::BoxDynError> {
        // Stored values were normalized on the way in.
        Ok(Self(<String as sqlx::Decode<sqlx::Postgres>>::decode(value)?))
    }
}

#[cfg(feature = "postgres")]
impl sqlx::Encode<'_, sqlx::Postgres> for Email {
    fn encode_by_ref(
        &self,
        buf: &mut sqlx::postgres::PgArgumentBuffer,
    ) -> Result<sqlx::encode::IsNull, sqlx::error::BoxDynError> {
        <String as sqlx::Encode<sqlx::Postgres>>::encode_by_ref(&self.0, buf)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_accepts_common_shapes() {
        for ok in [
            "ada@example.com",
            "ada.lovelace+orders@mail.example.co.uk",
            "a@b.io",
        ] {
            assert!(Email::parse(ok).is_ok(), "{ok}");
        }
    }

    #[test]
    fn test_rejections() {
        assert_eq!(Email::parse(""), Err(EmailError::Empty));
        assert_eq!(Email::parse("not-an-email"), Err(EmailError::AtSymbol));
        assert_eq!(Email::parse("a@b@example.com"), Err(EmailError::AtSymbol));
        assert_eq!(Email::parse("ada @example.com"), Err(EmailError::Whitespace));
        assert!(matches!(
            Email::parse("@example.com"),
            Err(EmailError::LocalPart { .. })
        ));
        assert_eq!(Email::parse("ada@localhost"), Err(EmailError::Domain));
        assert_eq!(Email::parse("ada@.example.com"), Err(EmailError::Domain));
        assert_eq!(Email::parse("ada@example."), Err(EmailError::Domain));
    }

    #[test]
    fn test_length_limits() {
        let local = "a".repeat(Email::MAX_LOCAL_LENGTH + 1);
        assert!(matches!(
            Email::parse(&format!("{local}@example.com")),
            Err(EmailError::LocalPart { .. })
        ));

        let domain = format!("{}.com", "d".repeat(Email::MAX_LENGTH));
        assert!(matches!(
            Email::parse(&format!("a@{domain}")),
            Err(EmailError::TooLong { .. })
        ));
    }

    #[test]
    fn test_normalized() {
        let email = Email::normalized("  Jane.Doe@Example.COM ").unwrap();
        assert_eq!(email.as_str(), "jane.doe@example.com");
        assert_eq!(Email::normalized("   "), Err(EmailError::Empty));
    }

    #[test]
    fn test_serde_validates() {
        let email: Email = serde_json::from_str("\"ada@example.com\"").unwrap();
        assert_eq!(serde_json::to_string(&email).unwrap(), "\"ada@example.com\"");

        assert!(serde_json::from_str::<Email>("\"nope\"").is_err());
    }
}
