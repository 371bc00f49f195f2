//! Content service: contact inbox, site banner and hero carousel.

use serde::Deserialize;
use sqlx::PgPool;
use thiserror::Error;

use emporium_core::{ContactMessageId, Email, HeroSlideId, MainMessageId};

use super::{MAX_NAME_LENGTH, optional_text, required_text};
use crate::db::content::HeroSlideFields;
use crate::db::{
    ContactMessageRepository, HeroSlideRepository, MainMessageRepository, RepositoryError,
};
use crate::models::{ContactMessage, HeroSlide, MainMessage, Page, Pagination};

/// Longest accepted contact message.
pub const MAX_MESSAGE_LENGTH: usize = 5000;

const MAX_BANNER_LENGTH: usize = 500;
const MAX_URL_LENGTH: usize = 2048;

/// Errors from content operations.
#[derive(Debug, Error)]
pub enum ContentError {
    #[error("{0}")]
    Validation(String),

    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("database error: {0}")]
    Repository(#[from] RepositoryError),
}

impl From<String> for ContentError {
    fn from(message: String) -> Self {
        Self::Validation(message)
    }
}

/// Contact form submission.
#[derive(Debug, Clone, Deserialize)]
pub struct ContactInput {
    pub name: String,
    pub email: String,
    pub subject: Option<String>,
    pub message: String,
}

/// Banner fields.
#[derive(Debug, Clone, Deserialize)]
pub struct MainMessageInput {
    pub content: String,
    pub link_url: Option<String>,
}

/// Hero slide fields.
#[derive(Debug, Clone, Deserialize)]
pub struct HeroSlideInput {
    pub title: String,
    pub subtitle: Option<String>,
    pub image_url: String,
    pub link_url: Option<String>,
    pub is_active: Option<bool>,
}

impl HeroSlideInput {
    fn validate(&self) -> Result<HeroSlideFields, ContentError> {
        Ok(HeroSlideFields {
            title: required_text("title", &self.title, MAX_NAME_LENGTH)?,
            subtitle: optional_text("subtitle", self.subtitle.as_deref(), MAX_NAME_LENGTH)?,
            image_url: required_text("image_url", &self.image_url, MAX_URL_LENGTH)?,
            link_url: optional_text("link_url", self.link_url.as_deref(), MAX_URL_LENGTH)?,
            is_active: self.is_active,
        })
    }
}

/// Content service.
pub struct ContentService<'a> {
    contact: ContactMessageRepository<'a>,
    banners: MainMessageRepository<'a>,
    slides: HeroSlideRepository<'a>,
}

impl<'a> ContentService<'a> {
    /// Create a new content service.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self {
            contact: ContactMessageRepository::new(pool),
            banners: MainMessageRepository::new(pool),
            slides: HeroSlideRepository::new(pool),
        }
    }

    // =========================================================================
    // Contact messages
    // =========================================================================

    /// Store a contact form submission.
    ///
    /// # Errors
    ///
    /// Returns `ContentError::Validation` for a blank name or message, an
    /// invalid email, or a message longer than 5000 characters.
    pub async fn submit_contact(&self, input: &ContactInput) -> Result<ContactMessage, ContentError> {
        let name = required_text("name", &input.name, MAX_NAME_LENGTH)?;
        let email = Email::normalized(&input.email)
            .map_err(|_| ContentError::Validation("invalid email address".to_string()))?;
        let subject = optional_text("subject", input.subject.as_deref(), MAX_NAME_LENGTH)?;
        let message = required_text("message", &input.message, MAX_MESSAGE_LENGTH)?;

        let saved = self
            .contact
            .create(&name, &email, subject.as_deref(), &message)
            .await?;

        tracing::info!(contact_message_id = %saved.id, "Contact message received");

        Ok(saved)
    }

    /// Inbox, newest first.
    ///
    /// # Errors
    ///
    /// Returns `ContentError::Repository` if the query fails.
    pub async fn contact_messages(
        &self,
        unread_only: bool,
        pagination: Pagination,
    ) -> Result<Page<ContactMessage>, ContentError> {
        let (messages, total) = self.contact.list(unread_only, pagination).await?;
        Ok(Page::new(messages, pagination, total))
    }

    /// Mark a message read or unread.
    ///
    /// # Errors
    ///
    /// Returns `ContentError::NotFound` if the message doesn't exist.
    pub async fn mark_read(
        &self,
        id: ContactMessageId,
        is_read: bool,
    ) -> Result<ContactMessage, ContentError> {
        self.contact
            .set_read(id, is_read)
            .await
            .map_err(not_found("contact message"))
    }

    /// Delete a message.
    ///
    /// # Errors
    ///
    /// Returns `ContentError::NotFound` if the message doesn't exist.
    pub async fn delete_contact_message(&self, id: ContactMessageId) -> Result<(), ContentError> {
        if !self.contact.delete(id).await? {
            return Err(ContentError::NotFound("contact message"));
        }
        Ok(())
    }

    // =========================================================================
    // Banner
    // =========================================================================

    /// The active banner, if any.
    ///
    /// # Errors
    ///
    /// Returns `ContentError::Repository` if the query fails.
    pub async fn active_banner(&self) -> Result<Option<MainMessage>, ContentError> {
        Ok(self.banners.get_active().await?)
    }

    /// Every banner.
    ///
    /// # Errors
    ///
    /// Returns `ContentError::Repository` if the query fails.
    pub async fn banners(&self) -> Result<Vec<MainMessage>, ContentError> {
        Ok(self.banners.list().await?)
    }

    /// Create an inactive banner.
    ///
    /// # Errors
    ///
    /// Returns `ContentError::Validation` for blank or oversized content.
    pub async fn create_banner(&self, input: &MainMessageInput) -> Result<MainMessage, ContentError> {
        let (content, link_url) = validate_banner(input)?;
        Ok(self.banners.create(&content, link_url.as_deref()).await?)
    }

    /// Replace a banner's text and link.
    ///
    /// # Errors
    ///
    /// Returns `ContentError::NotFound` if the banner doesn't exist.
    pub async fn update_banner(
        &self,
        id: MainMessageId,
        input: &MainMessageInput,
    ) -> Result<MainMessage, ContentError> {
        let (content, link_url) = validate_banner(input)?;
        self.banners
            .update(id, &content, link_url.as_deref())
            .await
            .map_err(not_found("banner"))
    }

    /// Make a banner the only active one.
    ///
    /// # Errors
    ///
    /// Returns `ContentError::NotFound` if the banner doesn't exist.
    pub async fn activate_banner(&self, id: MainMessageId) -> Result<MainMessage, ContentError> {
        let banner = self
            .banners
            .activate(id)
            .await
            .map_err(not_found("banner"))?;
        tracing::info!(main_message_id = %id, "Banner activated");
        Ok(banner)
    }

    /// Hide a banner.
    ///
    /// # Errors
    ///
    /// Returns `ContentError::NotFound` if the banner doesn't exist.
    pub async fn deactivate_banner(&self, id: MainMessageId) -> Result<MainMessage, ContentError> {
        self.banners
            .deactivate(id)
            .await
            .map_err(not_found("banner"))
    }

    /// Delete a banner.
    ///
    /// # Errors
    ///
    /// Returns `ContentError::NotFound` if the banner doesn't exist.
    pub async fn delete_banner(&self, id: MainMessageId) -> Result<(), ContentError> {
        if !self.banners.delete(id).await? {
            return Err(ContentError::NotFound("banner"));
        }
        Ok(())
    }

    // =========================================================================
    // Hero carousel
    // =========================================================================

    /// Slides by position; `active_only` for the storefront.
    ///
    /// # Errors
    ///
    /// Returns `ContentError::Repository` if the query fails.
    pub async fn slides(&self, active_only: bool) -> Result<Vec<HeroSlide>, ContentError> {
        Ok(self.slides.list(active_only).await?)
    }

    /// Append a slide.
    ///
    /// # Errors
    ///
    /// Returns `ContentError::Validation` for missing title or image.
    pub async fn create_slide(&self, input: &HeroSlideInput) -> Result<HeroSlide, ContentError> {
        let fields = input.validate()?;
        Ok(self.slides.create(&fields).await?)
    }

    /// Replace a slide's fields.
    ///
    /// # Errors
    ///
    /// Returns `ContentError::NotFound` if the slide doesn't exist.
    pub async fn update_slide(
        &self,
        id: HeroSlideId,
        input: &HeroSlideInput,
    ) -> Result<HeroSlide, ContentError> {
        let fields = input.validate()?;
        self.slides
            .update(id, &fields)
            .await
            .map_err(not_found("slide"))
    }

    /// Put slides in the given order.
    ///
    /// # Errors
    ///
    /// Returns `ContentError::Validation` unless `ids` lists every slide once.
    pub async fn reorder_slides(&self, ids: &[HeroSlideId]) -> Result<Vec<HeroSlide>, ContentError> {
        self.slides.reorder(ids).await.map_err(|e| match e {
            RepositoryError::Conflict(message) => ContentError::Validation(message),
            other => ContentError::Repository(other),
        })
    }

    /// Delete a slide.
    ///
    /// # Errors
    ///
    /// Returns `ContentError::NotFound` if the slide doesn't exist.
    pub async fn delete_slide(&self, id: HeroSlideId) -> Result<(), ContentError> {
        if !self.slides.delete(id).await? {
            return Err(ContentError::NotFound("slide"));
        }
        Ok(())
    }
}

fn validate_banner(input: &MainMessageInput) -> Result<(String, Option<String>), ContentError> {
    Ok((
        required_text("content", &input.content, MAX_BANNER_LENGTH)?,
        optional_text("link_url", input.link_url.as_deref(), MAX_URL_LENGTH)?,
    ))
}

fn not_found(what: &'static str) -> impl Fn(RepositoryError) -> ContentError {
    move |err| match err {
        RepositoryError::NotFound => ContentError::NotFound(what),
        other => ContentError::Repository(other),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_slide_validation() {
        let input = HeroSlideInput {
            title: " Summer sale ".to_string(),
            subtitle: Some(String::new()),
            image_url: "https://cdn.example.com/summer.jpg".to_string(),
            link_url: None,
            is_active: None,
        };
        let fields = input.validate().unwrap();
        assert_eq!(fields.title, "Summer sale");
        assert_eq!(fields.subtitle, None);
        assert_eq!(fields.is_active, None);
    }

    #[test]
    fn test_slide_edit_passes_explicit_flag() {
        let input = HeroSlideInput {
            title: "Sale".to_string(),
            subtitle: None,
            image_url: "https://cdn.example.com/sale.jpg".to_string(),
            link_url: None,
            is_active: Some(false),
        };
        assert_eq!(input.validate().unwrap().is_active, Some(false));
    }

    #[test]
    fn test_slide_requires_image() {
        let input = HeroSlideInput {
            title: "Sale".to_string(),
            subtitle: None,
            image_url: "  ".to_string(),
            link_url: None,
            is_active: Some(false),
        };
        assert!(matches!(input.validate(), Err(ContentError::Validation(_))));
    }

    #[test]
    fn test_banner_validation() {
        let ok = MainMessageInput {
            content: "Free shipping over $50".to_string(),
            link_url: Some("/products".to_string()),
        };
        assert!(validate_banner(&ok).is_ok());

        let long = MainMessageInput {
            content: "x".repeat(MAX_BANNER_LENGTH + 1),
            link_url: None,
        };
        assert!(matches!(
            validate_banner(&long),
            Err(ContentError::Validation(_))
        ));
    }
}
