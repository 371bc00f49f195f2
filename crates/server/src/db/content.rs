//! Repositories for storefront content: contact messages, banners and the
//! hero carousel.

use sqlx::PgPool;

use emporium_core::{ContactMessageId, Email, HeroSlideId, MainMessageId};

use super::RepositoryError;
use crate::models::content::{ContactMessage, HeroSlide, MainMessage};
use crate::models::pagination::Pagination;

// =============================================================================
// Contact messages
// =============================================================================

/// Repository for contact form messages.
pub struct ContactMessageRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> ContactMessageRepository<'a> {
    /// Create a new contact message repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Store a message from the contact form.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the insert fails.
    pub async fn create(
        &self,
        name: &str,
        email: &Email,
        subject: Option<&str>,
        message: &str,
    ) -> Result<ContactMessage, RepositoryError> {
        let row = sqlx::query_as::<_, ContactMessage>(
            r"
            INSERT INTO contact_messages (name, email, subject, message)
            VALUES ($1, $2, $3, $4)
            RETURNING id, name, email, subject, message, is_read, created_at
            ",
        )
        .bind(name)
        .bind(email)
        .bind(subject)
        .bind(message)
        .fetch_one(self.pool)
        .await?;

        Ok(row)
    }

    /// Messages newest first, optionally only unread ones.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list(
        &self,
        unread_only: bool,
        pagination: Pagination,
    ) -> Result<(Vec<ContactMessage>, i64), RepositoryError> {
        let rows = sqlx::query_as::<_, ContactMessage>(
            r"
            SELECT id, name, email, subject, message, is_read, created_at
            FROM contact_messages
            WHERE NOT $1 OR NOT is_read
            ORDER BY created_at DESC, id DESC
            LIMIT $2 OFFSET $3
            ",
        )
        .bind(unread_only)
        .bind(pagination.limit())
        .bind(pagination.offset())
        .fetch_all(self.pool)
        .await?;

        let total: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM contact_messages WHERE NOT $1 OR NOT is_read")
                .bind(unread_only)
                .fetch_one(self.pool)
                .await?;

        Ok((rows, total))
    }

    /// Mark a message read or unread.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the message doesn't exist.
    pub async fn set_read(
        &self,
        id: ContactMessageId,
        is_read: bool,
    ) -> Result<ContactMessage, RepositoryError> {
        sqlx::query_as::<_, ContactMessage>(
            r"
            UPDATE contact_messages SET is_read = $2
            WHERE id = $1
            RETURNING id, name, email, subject, message, is_read, created_at
            ",
        )
        .bind(id)
        .bind(is_read)
        .fetch_optional(self.pool)
        .await?
        .ok_or(RepositoryError::NotFound)
    }

    /// Delete a message. Returns whether it existed.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn delete(&self, id: ContactMessageId) -> Result<bool, RepositoryError> {
        let result = sqlx::query("DELETE FROM contact_messages WHERE id = $1")
            .bind(id)
            .execute(self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}

// =============================================================================
// Main message (banner)
// =============================================================================

/// Repository for the site-wide banner.
pub struct MainMessageRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> MainMessageRepository<'a> {
    /// Create a new banner repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// The active banner, if any.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_active(&self) -> Result<Option<MainMessage>, RepositoryError> {
        let row = sqlx::query_as::<_, MainMessage>(
            r"
            SELECT id, content, link_url, is_active, created_at, updated_at
            FROM main_messages
            WHERE is_active
            LIMIT 1
            ",
        )
        .fetch_optional(self.pool)
        .await?;

        Ok(row)
    }

    /// Every banner, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list(&self) -> Result<Vec<MainMessage>, RepositoryError> {
        let rows = sqlx::query_as::<_, MainMessage>(
            r"
            SELECT id, content, link_url, is_active, created_at, updated_at
            FROM main_messages
            ORDER BY created_at DESC, id DESC
            ",
        )
        .fetch_all(self.pool)
        .await?;

        Ok(rows)
    }

    /// Create an inactive banner.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the insert fails.
    pub async fn create(
        &self,
        content: &str,
        link_url: Option<&str>,
    ) -> Result<MainMessage, RepositoryError> {
        let row = sqlx::query_as::<_, MainMessage>(
            r"
            INSERT INTO main_messages (content, link_url)
            VALUES ($1, $2)
            RETURNING id, content, link_url, is_active, created_at, updated_at
            ",
        )
        .bind(content)
        .bind(link_url)
        .fetch_one(self.pool)
        .await?;

        Ok(row)
    }

    /// Replace a banner's text and link.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the banner doesn't exist.
    pub async fn update(
        &self,
        id: MainMessageId,
        content: &str,
        link_url: Option<&str>,
    ) -> Result<MainMessage, RepositoryError> {
        sqlx::query_as::<_, MainMessage>(
            r"
            UPDATE main_messages
            SET content = $2, link_url = $3, updated_at = NOW()
            WHERE id = $1
            RETURNING id, content, link_url, is_active, created_at, updated_at
            ",
        )
        .bind(id)
        .bind(content)
        .bind(link_url)
        .fetch_optional(self.pool)
        .await?
        .ok_or(RepositoryError::NotFound)
    }

    /// Make one banner the only active one.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the banner doesn't exist.
    pub async fn activate(&self, id: MainMessageId) -> Result<MainMessage, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            "UPDATE main_messages SET is_active = FALSE, updated_at = NOW() WHERE is_active AND id <> $1",
        )
        .bind(id)
        .execute(&mut *tx)
        .await?;

        let row = sqlx::query_as::<_, MainMessage>(
            r"
            UPDATE main_messages
            SET is_active = TRUE, updated_at = NOW()
            WHERE id = $1
            RETURNING id, content, link_url, is_active, created_at, updated_at
            ",
        )
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(RepositoryError::NotFound)?;

        tx.commit().await?;

        Ok(row)
    }

    /// Deactivate a banner.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the banner doesn't exist.
    pub async fn deactivate(&self, id: MainMessageId) -> Result<MainMessage, RepositoryError> {
        sqlx::query_as::<_, MainMessage>(
            r"
            UPDATE main_messages
            SET is_active = FALSE, updated_at = NOW()
            WHERE id = $1
            RETURNING id, content, link_url, is_active, created_at, updated_at
            ",
        )
        .bind(id)
        .fetch_optional(self.pool)
        .await?
        .ok_or(RepositoryError::NotFound)
    }

    /// Delete a banner. Returns whether it existed.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn delete(&self, id: MainMessageId) -> Result<bool, RepositoryError> {
        let result = sqlx::query("DELETE FROM main_messages WHERE id = $1")
            .bind(id)
            .execute(self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}

// =============================================================================
// Hero carousel
// =============================================================================

/// Slide fields for create and update.
#[derive(Debug, Clone)]
pub struct HeroSlideFields {
    pub title: String,
    pub subtitle: Option<String>,
    pub image_url: String,
    pub link_url: Option<String>,
    /// `None` keeps the stored flag on update and means active on create.
    pub is_active: Option<bool>,
}

/// Repository for hero carousel slides.
pub struct HeroSlideRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> HeroSlideRepository<'a> {
    /// Create a new hero slide repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Slides ordered by position, optionally only active ones.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list(&self, active_only: bool) -> Result<Vec<HeroSlide>, RepositoryError> {
        let rows = sqlx::query_as::<_, HeroSlide>(
            r"
            SELECT id, title, subtitle, image_url, link_url, position, is_active,
                   created_at, updated_at
            FROM hero_slides
            WHERE NOT $1 OR is_active
            ORDER BY position ASC, id ASC
            ",
        )
        .bind(active_only)
        .fetch_all(self.pool)
        .await?;

        Ok(rows)
    }

    /// Append a slide at the end of the carousel.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the insert fails.
    pub async fn create(&self, fields: &HeroSlideFields) -> Result<HeroSlide, RepositoryError> {
        let row = sqlx::query_as::<_, HeroSlide>(
            r"
            INSERT INTO hero_slides (title, subtitle, image_url, link_url, is_active, position)
            VALUES ($1, $2, $3, $4, COALESCE($5, TRUE),
                    (SELECT COALESCE(MAX(position) + 1, 0) FROM hero_slides))
            RETURNING id, title, subtitle, image_url, link_url, position, is_active,
                      created_at, updated_at
            ",
        )
        .bind(&fields.title)
        .bind(fields.subtitle.as_deref())
        .bind(&fields.image_url)
        .bind(fields.link_url.as_deref())
        .bind(fields.is_active)
        .fetch_one(self.pool)
        .await?;

        Ok(row)
    }

    /// Replace a slide's fields. Position is changed only by reordering.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the slide doesn't exist.
    pub async fn update(
        &self,
        id: HeroSlideId,
        fields: &HeroSlideFields,
    ) -> Result<HeroSlide, RepositoryError> {
        sqlx::query_as::<_, HeroSlide>(
            r"
            UPDATE hero_slides
            SET title = $2, subtitle = $3, image_url = $4, link_url = $5,
                is_active = COALESCE($6, is_active),
                updated_at = NOW()
            WHERE id = $1
            RETURNING id, title, subtitle, image_url, link_url, position, is_active,
                      created_at, updated_at
            ",
        )
        .bind(id)
        .bind(&fields.title)
        .bind(fields.subtitle.as_deref())
        .bind(&fields.image_url)
        .bind(fields.link_url.as_deref())
        .bind(fields.is_active)
        .fetch_optional(self.pool)
        .await?
        .ok_or(RepositoryError::NotFound)
    }

    /// Rewrite positions so `ids[i]` sits at position `i`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if `ids` is not exactly the set of
    /// existing slides.
    pub async fn reorder(&self, ids: &[HeroSlideId]) -> Result<Vec<HeroSlide>, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let mut existing: Vec<HeroSlideId> =
            sqlx::query_scalar("SELECT id FROM hero_slides ORDER BY id FOR UPDATE")
                .fetch_all(&mut *tx)
                .await?;
        let mut requested = ids.to_vec();
        existing.sort_unstable();
        requested.sort_unstable();
        if existing != requested {
            return Err(RepositoryError::Conflict(
                "ids must list every slide exactly once".to_owned(),
            ));
        }

        for (position, id) in ids.iter().enumerate() {
            let position = i32::try_from(position)
                .map_err(|_| RepositoryError::Conflict("too many slides".to_owned()))?;
            sqlx::query("UPDATE hero_slides SET position = $2, updated_at = NOW() WHERE id = $1")
                .bind(*id)
                .bind(position)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;

        self.list(false).await
    }

    /// Delete a slide. Returns whether it existed.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn delete(&self, id: HeroSlideId) -> Result<bool, RepositoryError> {
        let result = sqlx::query("DELETE FROM hero_slides WHERE id = $1")
            .bind(id)
            .execute(self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
