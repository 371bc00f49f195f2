//! User profile route handlers.

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use emporium_core::UserId;

use crate::error::{AppError, Result};
use crate::middleware::{RequireAuth, set_current_user};
use crate::models::{CurrentUser, User};
use crate::services::auth::AuthService;
use crate::state::AppState;

/// Profile update body. Omitted fields are left unchanged.
#[derive(Debug, Deserialize)]
pub struct UpdateProfileRequest {
    pub name: Option<String>,
    pub email: Option<String>,
}

/// Password change body.
#[derive(Debug, Deserialize)]
pub struct ChangePasswordRequest {
    pub current_password: String,
    pub new_password: String,
}

fn ensure_access(current: &CurrentUser, id: UserId) -> Result<()> {
    if current.can_access(id) {
        Ok(())
    } else {
        Err(AppError::Forbidden(
            "you do not have access to this user".to_string(),
        ))
    }
}

/// Show a user (self or admin).
#[instrument(skip(state, current), fields(viewer = %current.id))]
pub async fn show(
    State(state): State<AppState>,
    RequireAuth(current): RequireAuth,
    Path(id): Path<UserId>,
) -> Result<Json<User>> {
    ensure_access(&current, id)?;
    let user = AuthService::new(state.pool()).get_user(id).await?;
    Ok(Json(user))
}

/// Update name and/or email (self or admin).
#[instrument(skip(state, session, current, body), fields(viewer = %current.id))]
pub async fn update(
    State(state): State<AppState>,
    session: Session,
    RequireAuth(current): RequireAuth,
    Path(id): Path<UserId>,
    Json(body): Json<UpdateProfileRequest>,
) -> Result<Json<User>> {
    ensure_access(&current, id)?;

    let user = AuthService::new(state.pool())
        .update_profile(id, body.name.as_deref(), body.email.as_deref())
        .await?;

    // Keep the session identity in step with the profile
    if id == current.id {
        set_current_user(&session, &CurrentUser::from(&user)).await?;
    }

    Ok(Json(user))
}

/// Change the signed-in user's own password.
#[instrument(skip(state, current, body), fields(user_id = %current.id))]
pub async fn change_password(
    State(state): State<AppState>,
    RequireAuth(current): RequireAuth,
    Path(id): Path<UserId>,
    Json(body): Json<ChangePasswordRequest>,
) -> Result<StatusCode> {
    if id != current.id {
        return Err(AppError::Forbidden(
            "you can only change your own password".to_string(),
        ));
    }

    AuthService::new(state.pool())
        .change_password(id, &body.current_password, &body.new_password)
        .await?;

    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use axum::http::StatusCode;
    use serde_json::json;

    use super::super::test_support::{get, json, send};
    use super::*;
    use emporium_core::{Email, UserRole};

    #[tokio::test]
    async fn test_profile_requires_auth() {
        let response = send(get("/api/users/1")).await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let response = send(json(
            "POST",
            "/api/users/1/password",
            &json!({"current_password": "a", "new_password": "b"}),
        ))
        .await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[test]
    fn test_ensure_access() {
        let customer = CurrentUser {
            id: UserId::new(4),
            email: Email::parse("c@example.com").unwrap(),
            name: "C".to_string(),
            role: UserRole::Customer,
        };
        assert!(ensure_access(&customer, UserId::new(4)).is_ok());
        assert!(matches!(
            ensure_access(&customer, UserId::new(5)),
            Err(AppError::Forbidden(_))
        ));
    }
}
