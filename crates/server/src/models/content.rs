//! Storefront content managed from the back office.

use chrono::{DateTime, Utc};
use serde::Serialize;

use emporium_core::{ContactMessageId, Email, HeroSlideId, MainMessageId};

/// A message sent through the contact form.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct ContactMessage {
    pub id: ContactMessageId,
    pub name: String,
    pub email: Email,
    pub subject: Option<String>,
    pub message: String,
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
}

/// Site-wide banner. At most one is active.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct MainMessage {
    pub id: MainMessageId,
    pub content: String,
    pub link_url: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Home page carousel slide.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct HeroSlide {
    pub id: HeroSlideId,
    pub title: String,
    pub subtitle: Option<String>,
    pub image_url: String,
    pub link_url: Option<String>,
    pub position: i32,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
