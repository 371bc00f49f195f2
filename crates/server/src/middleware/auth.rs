//! Authentication extractors.
//!
//! The signed-in user lives in the session under `session_keys::CURRENT_USER`.
//! Every extraction reloads the account, so deactivation and role changes
//! apply to sessions that already exist. Rejections are JSON errors: 401 when
//! nobody is signed in or the account is gone or inactive, 403 when the user
//! lacks the admin role.

use axum::{extract::FromRequestParts, http::request::Parts};
use tower_sessions::Session;

use crate::db::UserRepository;
use crate::error::AppError;
use crate::models::{CurrentUser, User, session_keys};
use crate::state::AppState;

/// Extractor that requires a signed-in user.
///
/// # Example
///
/// ```rust,ignore
/// async fn protected_handler(RequireAuth(user): RequireAuth) -> impl IntoResponse {
///     format!("Hello, {}!", user.name)
/// }
/// ```
pub struct RequireAuth(pub CurrentUser);

/// Extractor that requires a signed-in admin.
pub struct RequireAdmin(pub CurrentUser);

fn unauthorized() -> AppError {
    AppError::Unauthorized("authentication required".to_string())
}

/// The identity a session may keep using, given the account as stored now.
///
/// `None` means the account was deleted or deactivated and the session must
/// be signed out.
fn refreshed_identity(account: Option<User>) -> Option<CurrentUser> {
    account
        .filter(|user| user.is_active)
        .map(|user| CurrentUser::from(&user))
}

impl FromRequestParts<AppState> for RequireAuth {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let session = parts
            .extensions
            .get::<Session>()
            .cloned()
            .ok_or_else(unauthorized)?;
        let stored = session
            .get::<CurrentUser>(session_keys::CURRENT_USER)
            .await
            .ok()
            .flatten()
            .ok_or_else(unauthorized)?;

        let account = UserRepository::new(state.pool())
            .get_by_id(stored.id)
            .await?;
        let Some(user) = refreshed_identity(account) else {
            tracing::info!(user_id = %stored.id, "Signing out session of inactive account");
            clear_current_user(&session).await?;
            return Err(unauthorized());
        };

        if user.role != stored.role {
            tracing::info!(
                user_id = %user.id,
                from = %stored.role,
                to = %user.role,
                "Session role refreshed"
            );
            session.insert(session_keys::CURRENT_USER, &user).await?;
        }

        Ok(Self(user))
    }
}

impl FromRequestParts<AppState> for RequireAdmin {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let RequireAuth(user) = RequireAuth::from_request_parts(parts, state).await?;
        if !user.is_admin() {
            tracing::warn!(user_id = %user.id, path = %parts.uri.path(), "Admin access denied");
            return Err(AppError::Forbidden("admin access required".to_string()));
        }
        Ok(Self(user))
    }
}

/// Store the signed-in user in the session.
///
/// The session id is cycled first so a pre-login id cannot be reused.
///
/// # Errors
///
/// Returns an error if the session cannot be modified.
pub async fn set_current_user(
    session: &Session,
    user: &CurrentUser,
) -> Result<(), tower_sessions::session::Error> {
    session.cycle_id().await?;
    session.insert(session_keys::CURRENT_USER, user).await
}

/// Remove the signed-in user from the session (logout).
///
/// # Errors
///
/// Returns an error if the session cannot be modified.
pub async fn clear_current_user(session: &Session) -> Result<(), tower_sessions::session::Error> {
    session
        .remove::<CurrentUser>(session_keys::CURRENT_USER)
        .await?;
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::Utc;
    use emporium_core::{Email, UserId, UserRole};

    use super::*;

    fn account(role: UserRole, is_active: bool) -> User {
        User {
            id: UserId::new(4),
            email: Email::parse("grace@example.com").unwrap(),
            name: "Grace".to_string(),
            role,
            is_active,
            stripe_customer_id: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_active_account_keeps_session() {
        let user = refreshed_identity(Some(account(UserRole::Admin, true))).unwrap();
        assert_eq!(user.id, UserId::new(4));
        assert!(user.is_admin());
    }

    #[test]
    fn test_deactivated_account_loses_session() {
        assert!(refreshed_identity(Some(account(UserRole::Admin, false))).is_none());
    }

    #[test]
    fn test_deleted_account_loses_session() {
        assert!(refreshed_identity(None).is_none());
    }

    #[test]
    fn test_demoted_admin_is_no_longer_admin() {
        let user = refreshed_identity(Some(account(UserRole::Customer, true))).unwrap();
        assert!(!user.is_admin());
    }
}
