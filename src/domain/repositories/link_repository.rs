//! Repository trait for tracking links and their clicks.

use async_trait::async_trait;

use crate::domain::entities::{AffiliateLink, LinkClick, NewAffiliateLink, NewLinkClick};
use crate::error::AppError;

/// Repository interface for affiliate tracking links.
///
/// # Implementations
///
/// - [`crate::infrastructure::persistence::PgLinkRepository`]
/// - [`crate::infrastructure::memory::MemoryStore`]
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait LinkRepository: Send + Sync {
    /// Creates a new link.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Conflict`] if the short code already exists.
    async fn create(&self, new_link: NewAffiliateLink) -> Result<AffiliateLink, AppError>;

    async fn find_by_id(&self, id: i64) -> Result<Option<AffiliateLink>, AppError>;

    async fn find_by_short_code(&self, short_code: &str)
    -> Result<Option<AffiliateLink>, AppError>;

    /// Lists an affiliate's links, newest first.
    async fn list_by_affiliate(&self, affiliate_id: i64) -> Result<Vec<AffiliateLink>, AppError>;

    /// Stores a click and bumps the counters it affects in one unit:
    /// the link's `click_count` and `last_click_at`, and the owner's
    /// `last_activity_at`.
    async fn record_click(&self, click: NewLinkClick) -> Result<LinkClick, AppError>;

    async fn find_click(&self, id: i64) -> Result<Option<LinkClick>, AppError>;

    /// Sets `is_active`. Returns `Ok(None)` if the link does not exist.
    async fn set_active(
        &self,
        id: i64,
        is_active: bool,
    ) -> Result<Option<AffiliateLink>, AppError>;
}
