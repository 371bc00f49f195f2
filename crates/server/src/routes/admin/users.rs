//! Back-office user management.

use axum::{
    Json,
    extract::{Path, Query, State},
};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use emporium_core::{UserId, UserRole};

use crate::error::Result;
use crate::middleware::RequireAdmin;
use crate::models::{Page, PageParams, User};
use crate::services::auth::{AuthService, UserRemoval};
use crate::state::AppState;

/// User search.
#[derive(Debug, Default, Deserialize)]
pub struct UserQuery {
    /// Matches email or name.
    pub q: Option<String>,
}

/// Access change body.
#[derive(Debug, Deserialize)]
pub struct UpdateAccessRequest {
    pub role: Option<UserRole>,
    pub is_active: Option<bool>,
}

/// Outcome of a delete request.
#[derive(Debug, Serialize)]
pub struct RemovalResponse {
    pub result: UserRemoval,
}

/// Users, newest first.
#[instrument(skip(state, admin), fields(admin_id = %admin.id))]
pub async fn index(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Query(params): Query<PageParams>,
    Query(query): Query<UserQuery>,
) -> Result<Json<Page<User>>> {
    let page = AuthService::new(state.pool())
        .list_users(params.into(), query.q.as_deref())
        .await?;
    Ok(Json(page))
}

/// Change role and/or active flag.
#[instrument(skip(state, admin, body), fields(admin_id = %admin.id))]
pub async fn update(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Path(id): Path<UserId>,
    Json(body): Json<UpdateAccessRequest>,
) -> Result<Json<User>> {
    let user = AuthService::new(state.pool())
        .update_access(admin.id, id, body.role, body.is_active)
        .await?;
    Ok(Json(user))
}

/// Delete a user, or deactivate them when they have orders.
#[instrument(skip(state, admin), fields(admin_id = %admin.id))]
pub async fn destroy(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Path(id): Path<UserId>,
) -> Result<Json<RemovalResponse>> {
    let result = AuthService::new(state.pool())
        .remove_user(admin.id, id)
        .await?;
    Ok(Json(RemovalResponse { result }))
}
