//! Authentication service.
//!
//! Password registration and login, profile updates, and the back-office user
//! management rules.

mod error;

pub use error::AuthError;

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use serde::Serialize;
use sqlx::PgPool;

use emporium_core::{Email, UserId, UserRole};

use super::{MAX_NAME_LENGTH, required_text};
use crate::db::RepositoryError;
use crate::db::users::UserRepository;
use crate::models::{Page, Pagination, User};

/// Minimum password length.
const MIN_PASSWORD_LENGTH: usize = 8;

/// Maximum password length.
const MAX_PASSWORD_LENGTH: usize = 128;

/// What happened to a user removed from the back office.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum UserRemoval {
    Deleted,
    /// The user has orders, so the account was deactivated instead.
    Deactivated,
}

/// Authentication service.
///
/// Handles user registration, login and account maintenance.
pub struct AuthService<'a> {
    users: UserRepository<'a>,
}

impl<'a> AuthService<'a> {
    /// Create a new authentication service.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self {
            users: UserRepository::new(pool),
        }
    }

    // =========================================================================
    // Password Authentication
    // =========================================================================

    /// Register a new customer with email and password.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidEmail` if the email format is invalid.
    /// Returns `AuthError::WeakPassword` if the password doesn't meet requirements.
    /// Returns `AuthError::UserAlreadyExists` if the email is already registered.
    pub async fn register(&self, email: &str, name: &str, password: &str) -> Result<User, AuthError> {
        let email = Email::normalized(email)?;
        let name = validate_name(name)?;
        validate_password(password)?;

        if self.users.get_by_email(&email).await?.is_some() {
            return Err(AuthError::UserAlreadyExists);
        }

        let password_hash = hash_password(password)?;

        let user = self
            .users
            .create(&email, &name, &password_hash, UserRole::Customer)
            .await
            .map_err(|e| match e {
                RepositoryError::Conflict(_) => AuthError::UserAlreadyExists,
                other => AuthError::Repository(other),
            })?;

        tracing::info!(user_id = %user.id, "User registered");

        Ok(user)
    }

    /// Login with email and password.
    ///
    /// Unknown emails, wrong passwords and deactivated accounts all produce the
    /// same error.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidCredentials` if the email/password is wrong.
    pub async fn login(&self, email: &str, password: &str) -> Result<User, AuthError> {
        let email = Email::normalized(email).map_err(|_| AuthError::InvalidCredentials)?;

        let record = self
            .users
            .get_with_password(&email)
            .await?
            .ok_or(AuthError::InvalidCredentials)?;

        verify_password(password, &record.password_hash)?;

        if !record.user.is_active {
            tracing::info!(user_id = %record.user.id, "Login refused for inactive user");
            return Err(AuthError::InvalidCredentials);
        }

        Ok(record.user)
    }

    // =========================================================================
    // Profile
    // =========================================================================

    /// Get a user by ID.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::UserNotFound` if the user doesn't exist.
    pub async fn get_user(&self, id: UserId) -> Result<User, AuthError> {
        self.users.get_by_id(id).await?.ok_or(AuthError::UserNotFound)
    }

    /// Change name and/or email. `None` keeps the current value.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::UserAlreadyExists` if the new email belongs to
    /// someone else.
    pub async fn update_profile(
        &self,
        id: UserId,
        name: Option<&str>,
        email: Option<&str>,
    ) -> Result<User, AuthError> {
        let user = self.get_user(id).await?;

        let name = match name {
            Some(name) => validate_name(name)?,
            None => user.name,
        };
        let email = match email {
            Some(email) => Email::normalized(email)?,
            None => user.email,
        };

        let taken = self
            .users
            .get_by_email(&email)
            .await?
            .is_some_and(|existing| existing.id != id);
        if taken {
            return Err(AuthError::UserAlreadyExists);
        }

        self.users
            .update_profile(id, &name, &email)
            .await
            .map_err(|e| match e {
                RepositoryError::Conflict(_) => AuthError::UserAlreadyExists,
                RepositoryError::NotFound => AuthError::UserNotFound,
                other => AuthError::Repository(other),
            })
    }

    /// Change a password after checking the current one.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidCredentials` if `current` is wrong.
    /// Returns `AuthError::WeakPassword` if `new` doesn't meet requirements.
    pub async fn change_password(
        &self,
        id: UserId,
        current: &str,
        new: &str,
    ) -> Result<(), AuthError> {
        let hash = self
            .users
            .get_password_hash(id)
            .await?
            .ok_or(AuthError::UserNotFound)?;

        verify_password(current, &hash)?;
        validate_password(new)?;

        let new_hash = hash_password(new)?;
        self.users.update_password(id, &new_hash).await?;

        tracing::info!(user_id = %id, "Password changed");

        Ok(())
    }

    // =========================================================================
    // Back-office user management
    // =========================================================================

    /// List users, optionally filtered by email or name.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Repository` if the query fails.
    pub async fn list_users(
        &self,
        pagination: Pagination,
        search: Option<&str>,
    ) -> Result<Page<User>, AuthError> {
        let search = search.map(str::trim).filter(|s| !s.is_empty());
        let (users, total) = self.users.list(pagination, search).await?;
        Ok(Page::new(users, pagination, total))
    }

    /// Change a user's role and/or active flag.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::SelfModification` if `actor` would demote or
    /// deactivate their own account.
    pub async fn update_access(
        &self,
        actor: UserId,
        target: UserId,
        role: Option<UserRole>,
        is_active: Option<bool>,
    ) -> Result<User, AuthError> {
        if actor == target && (role == Some(UserRole::Customer) || is_active == Some(false)) {
            return Err(AuthError::SelfModification(
                "you cannot demote or deactivate your own account",
            ));
        }

        let user = self
            .users
            .update_access(target, role, is_active)
            .await
            .map_err(|e| match e {
                RepositoryError::NotFound => AuthError::UserNotFound,
                other => AuthError::Repository(other),
            })?;

        tracing::info!(
            actor = %actor,
            user_id = %target,
            role = %user.role,
            is_active = user.is_active,
            "User access updated"
        );

        Ok(user)
    }

    /// Delete a user, or deactivate them when they have order history.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::SelfModification` if `actor == target`.
    /// Returns `AuthError::UserNotFound` if the user doesn't exist.
    pub async fn remove_user(&self, actor: UserId, target: UserId) -> Result<UserRemoval, AuthError> {
        if actor == target {
            return Err(AuthError::SelfModification("you cannot delete your own account"));
        }

        if self.users.has_orders(target).await? {
            self.update_access(actor, target, None, Some(false)).await?;
            return Ok(UserRemoval::Deactivated);
        }

        if !self.users.delete(target).await? {
            return Err(AuthError::UserNotFound);
        }

        tracing::info!(actor = %actor, user_id = %target, "User deleted");

        Ok(UserRemoval::Deleted)
    }

    /// Grant the admin role by email.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::UserNotFound` if no user has this email.
    pub async fn promote_to_admin(&self, email: &str) -> Result<User, AuthError> {
        let email = Email::normalized(email)?;
        self.users
            .promote_to_admin(&email)
            .await
            .map_err(|e| match e {
                RepositoryError::NotFound => AuthError::UserNotFound,
                other => AuthError::Repository(other),
            })
    }
}

fn validate_name(name: &str) -> Result<String, AuthError> {
    required_text("name", name, MAX_NAME_LENGTH).map_err(AuthError::InvalidName)
}

/// Validate password meets requirements.
fn validate_password(password: &str) -> Result<(), AuthError> {
    let length = password.chars().count();
    if length < MIN_PASSWORD_LENGTH {
        return Err(AuthError::WeakPassword(format!(
            "password must be at least {MIN_PASSWORD_LENGTH} characters"
        )));
    }
    if length > MAX_PASSWORD_LENGTH {
        return Err(AuthError::WeakPassword(format!(
            "password must be at most {MAX_PASSWORD_LENGTH} characters"
        )));
    }

    Ok(())
}

/// Hash a password using Argon2id.
fn hash_password(password: &str) -> Result<String, AuthError> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();

    argon2
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|_| AuthError::PasswordHash)
}

/// Verify a password against a hash.
fn verify_password(password: &str, hash: &str) -> Result<(), AuthError> {
    let parsed_hash = PasswordHash::new(hash).map_err(|_| AuthError::InvalidCredentials)?;
    let argon2 = Argon2::default();

    argon2
        .verify_password(password.as_bytes(), &parsed_hash)
        .map_err(|_| AuthError::InvalidCredentials)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_password_length_bounds() {
        assert!(matches!(
            validate_password("short"),
            Err(AuthError::WeakPassword(_))
        ));
        assert!(validate_password("exactly8").is_ok());
        assert!(validate_password(&"p".repeat(128)).is_ok());
        assert!(matches!(
            validate_password(&"p".repeat(129)),
            Err(AuthError::WeakPassword(_))
        ));
    }

    #[test]
    fn test_hash_and_verify() {
        let hash = hash_password("correct horse battery").unwrap();
        assert!(hash.starts_with("$argon2id$"));
        assert!(verify_password("correct horse battery", &hash).is_ok());
        assert!(matches!(
            verify_password("wrong password", &hash),
            Err(AuthError::InvalidCredentials)
        ));
    }

    #[test]
    fn test_hashes_are_salted() {
        let a = hash_password("same password").unwrap();
        let b = hash_password("same password").unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_verify_rejects_garbage_hash() {
        assert!(matches!(
            verify_password("anything", "not-a-phc-string"),
            Err(AuthError::InvalidCredentials)
        ));
    }

    #[test]
    fn test_validate_name() {
        assert_eq!(validate_name(" Ada ").unwrap(), "Ada");
        assert!(matches!(validate_name(""), Err(AuthError::InvalidName(_))));
    }
}
