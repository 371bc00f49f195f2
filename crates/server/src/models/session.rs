//! Session-related types.
//!
//! Types stored in the session for authentication state.

use serde::{Deserialize, Serialize};

use emporium_core::{Email, UserId, UserRole};

use super::user::User;

/// Session-stored user identity.
///
/// Minimal data stored in the session to identify the logged-in user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CurrentUser {
    /// User's database ID.
    pub id: UserId,
    /// User's email address.
    pub email: Email,
    /// Display name.
    pub name: String,
    /// Role as of the last authenticated request.
    pub role: UserRole,
}

impl CurrentUser {
    /// Whether the user may use the back office.
    #[must_use]
    pub fn is_admin(&self) -> bool {
        self.role == UserRole::Admin
    }

    /// Whether the user may act on resources owned by `owner`.
    #[must_use]
    pub fn can_access(&self, owner: UserId) -> bool {
        self.id == owner || self.is_admin()
    }
}

impl From<&User> for CurrentUser {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            email: user.email.clone(),
            name: user.name.clone(),
            role: user.role,
        }
    }
}

/// Session keys.
pub mod keys {
    /// Key for storing the current logged-in user.
    pub const CURRENT_USER: &str = "current_user";

    /// Key for the shopping cart lines.
    pub const CART: &str = "cart";

    /// Count of failed checkout attempts, mixed into the payment
    /// idempotency key.
    pub const CHECKOUT_ATTEMPT: &str = "checkout_attempt";
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn user(id: i32, role: UserRole) -> CurrentUser {
        CurrentUser {
            id: UserId::new(id),
            email: Email::parse("a@b.test").unwrap(),
            name: "A".to_string(),
            role,
        }
    }

    #[test]
    fn test_can_access_own_resources() {
        let customer = user(1, UserRole::Customer);
        assert!(customer.can_access(UserId::new(1)));
        assert!(!customer.can_access(UserId::new(2)));
    }

    #[test]
    fn test_admin_can_access_any_resource() {
        assert!(user(1, UserRole::Admin).can_access(UserId::new(99)));
    }
}
