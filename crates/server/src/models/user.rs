//! User domain types.

use chrono::{DateTime, Utc};
use serde::Serialize;

use emporium_core::{Email, UserId, UserRole};

/// A storefront or back-office account.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct User {
    /// Unique user ID.
    pub id: UserId,
    /// Lowercased email address.
    pub email: Email,
    /// Display name.
    pub name: String,
    /// Customer or admin.
    pub role: UserRole,
    /// Inactive users cannot log in.
    pub is_active: bool,
    /// Stripe customer, created on first saved card.
    #[serde(skip_serializing)]
    pub stripe_customer_id: Option<String>,
    /// When the user was created.
    pub created_at: DateTime<Utc>,
    /// When the user was last updated.
    pub updated_at: DateTime<Utc>,
}

/// A user together with their stored password hash.
#[derive(Debug, sqlx::FromRow)]
pub struct UserWithPassword {
    #[sqlx(flatten)]
    pub user: User,
    pub password_hash: String,
}
