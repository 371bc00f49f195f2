//! Back-office content: contact inbox, banners and hero slides.

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use serde::Deserialize;
use tracing::instrument;

use emporium_core::{ContactMessageId, HeroSlideId, MainMessageId};

use crate::error::Result;
use crate::middleware::RequireAdmin;
use crate::models::{ContactMessage, HeroSlide, MainMessage, Page, PageParams};
use crate::services::content::{ContentService, HeroSlideInput, MainMessageInput};
use crate::state::AppState;

/// Inbox filter.
#[derive(Debug, Default, Deserialize)]
pub struct InboxQuery {
    #[serde(default)]
    pub unread: bool,
}

/// Read flag body.
#[derive(Debug, Deserialize)]
pub struct ReadRequest {
    #[serde(default = "default_read")]
    pub is_read: bool,
}

const fn default_read() -> bool {
    true
}

/// New slide order.
#[derive(Debug, Deserialize)]
pub struct ReorderRequest {
    pub ids: Vec<HeroSlideId>,
}

fn content(state: &AppState) -> ContentService<'_> {
    ContentService::new(state.pool())
}

// =============================================================================
// Contact messages
// =============================================================================

/// Inbox, newest first.
#[instrument(skip(state, _admin))]
pub async fn contact_messages(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    Query(params): Query<PageParams>,
    Query(query): Query<InboxQuery>,
) -> Result<Json<Page<ContactMessage>>> {
    Ok(Json(
        content(&state)
            .contact_messages(query.unread, params.into())
            .await?,
    ))
}

/// Mark a message read or unread.
#[instrument(skip(state, _admin))]
pub async fn mark_read(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    Path(id): Path<ContactMessageId>,
    Json(body): Json<ReadRequest>,
) -> Result<Json<ContactMessage>> {
    Ok(Json(content(&state).mark_read(id, body.is_read).await?))
}

/// Delete a message.
#[instrument(skip(state, _admin))]
pub async fn delete_contact_message(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    Path(id): Path<ContactMessageId>,
) -> Result<StatusCode> {
    content(&state).delete_contact_message(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// =============================================================================
// Banners
// =============================================================================

/// Every banner.
#[instrument(skip(state, _admin))]
pub async fn banners(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
) -> Result<Json<Vec<MainMessage>>> {
    Ok(Json(content(&state).banners().await?))
}

/// Create an inactive banner.
#[instrument(skip(state, _admin, body))]
pub async fn create_banner(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    Json(body): Json<MainMessageInput>,
) -> Result<(StatusCode, Json<MainMessage>)> {
    let banner = content(&state).create_banner(&body).await?;
    Ok((StatusCode::CREATED, Json(banner)))
}

/// Replace a banner.
#[instrument(skip(state, _admin, body))]
pub async fn update_banner(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    Path(id): Path<MainMessageId>,
    Json(body): Json<MainMessageInput>,
) -> Result<Json<MainMessage>> {
    Ok(Json(content(&state).update_banner(id, &body).await?))
}

/// Make a banner the only active one.
#[instrument(skip(state, admin), fields(admin_id = %admin.id))]
pub async fn activate_banner(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Path(id): Path<MainMessageId>,
) -> Result<Json<MainMessage>> {
    Ok(Json(content(&state).activate_banner(id).await?))
}

/// Hide a banner.
#[instrument(skip(state, _admin))]
pub async fn deactivate_banner(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    Path(id): Path<MainMessageId>,
) -> Result<Json<MainMessage>> {
    Ok(Json(content(&state).deactivate_banner(id).await?))
}

/// Delete a banner.
#[instrument(skip(state, _admin))]
pub async fn delete_banner(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    Path(id): Path<MainMessageId>,
) -> Result<StatusCode> {
    content(&state).delete_banner(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// =============================================================================
// Hero slides
// =============================================================================

/// Every slide by position.
#[instrument(skip(state, _admin))]
pub async fn slides(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
) -> Result<Json<Vec<HeroSlide>>> {
    Ok(Json(content(&state).slides(false).await?))
}

/// Append a slide.
#[instrument(skip(state, _admin, body))]
pub async fn create_slide(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    Json(body): Json<HeroSlideInput>,
) -> Result<(StatusCode, Json<HeroSlide>)> {
    let slide = content(&state).create_slide(&body).await?;
    Ok((StatusCode::CREATED, Json(slide)))
}

/// Replace a slide.
#[instrument(skip(state, _admin, body))]
pub async fn update_slide(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    Path(id): Path<HeroSlideId>,
    Json(body): Json<HeroSlideInput>,
) -> Result<Json<HeroSlide>> {
    Ok(Json(content(&state).update_slide(id, &body).await?))
}

/// Rewrite slide positions.
#[instrument(skip(state, _admin))]
pub async fn reorder_slides(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    Json(body): Json<ReorderRequest>,
) -> Result<Json<Vec<HeroSlide>>> {
    Ok(Json(content(&state).reorder_slides(&body.ids).await?))
}

/// Delete a slide.
#[instrument(skip(state, _admin))]
pub async fn delete_slide(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    Path(id): Path<HeroSlideId>,
) -> Result<StatusCode> {
    content(&state).delete_slide(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
