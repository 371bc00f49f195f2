//! Public content route handlers: contact form, banner and hero carousel.

use axum::{Json, extract::State, http::StatusCode};
use tracing::instrument;

use crate::error::Result;
use crate::models::{ContactMessage, HeroSlide, MainMessage};
use crate::services::content::{ContactInput, ContentService};
use crate::state::AppState;

/// Submit the contact form.
#[instrument(skip(state, body))]
pub async fn submit_contact(
    State(state): State<AppState>,
    Json(body): Json<ContactInput>,
) -> Result<(StatusCode, Json<ContactMessage>)> {
    let message = ContentService::new(state.pool())
        .submit_contact(&body)
        .await?;
    Ok((StatusCode::CREATED, Json(message)))
}

/// The active banner, or `null`.
#[instrument(skip(state))]
pub async fn main_message(State(state): State<AppState>) -> Result<Json<Option<MainMessage>>> {
    Ok(Json(ContentService::new(state.pool()).active_banner().await?))
}

/// Active slides by position.
#[instrument(skip(state))]
pub async fn hero_slides(State(state): State<AppState>) -> Result<Json<Vec<HeroSlide>>> {
    Ok(Json(ContentService::new(state.pool()).slides(true).await?))
}

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;
    use serde_json::json;

    use super::super::test_support::{body_json, json, send};

    #[tokio::test]
    async fn test_contact_validation_before_database() {
        let response = send(json(
            "POST",
            "/api/contact",
            &json!({"name": "Ada", "email": "ada@example.com", "message": "  "}),
        ))
        .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let response = send(json(
            "POST",
            "/api/contact",
            &json!({"name": "Ada", "email": "nope", "message": "Hello"}),
        ))
        .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = body_json(response).await;
        assert_eq!(body["error"], "invalid email address");
    }

    #[tokio::test]
    async fn test_contact_message_length_limit() {
        let response = send(json(
            "POST",
            "/api/contact",
            &json!({"name": "Ada", "email": "ada@example.com", "message": "x".repeat(5001)}),
        ))
        .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
