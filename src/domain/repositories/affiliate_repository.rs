//! Repository trait for affiliate accounts.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use crate::domain::entities::{
    Affiliate, AffiliateStatus, AffiliateTier, NewAffiliate, Suspension,
};
use crate::error::AppError;

/// Repository interface for affiliate accounts and their status transitions.
///
/// Status-changing methods are conditional: they return `Ok(None)` when the
/// affiliate does not exist or is not in a state the transition accepts, so
/// that a concurrent transition can never be applied twice.
///
/// # Implementations
///
/// - [`crate::infrastructure::persistence::PgAffiliateRepository`]
/// - [`crate::infrastructure::memory::MemoryStore`]
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AffiliateRepository: Send + Sync {
    /// Inserts a new affiliate.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::AlreadyAffiliate`] if the user already has an
    /// affiliate record and [`AppError::Conflict`] if the affiliate code is
    /// taken.
    async fn create(&self, new_affiliate: NewAffiliate) -> Result<Affiliate, AppError>;

    /// Returns the suffix to try next for codes derived from `base`: 0 when
    /// no such code exists, otherwise one above the highest numeric suffix
    /// taken (the bare base counting as 0).
    async fn next_code_suffix(&self, base: &str) -> Result<u64, AppError>;

    async fn find_by_id(&self, id: i64) -> Result<Option<Affiliate>, AppError>;

    async fn find_by_user_id(&self, user_id: i64) -> Result<Option<Affiliate>, AppError>;

    async fn find_by_code(&self, code: &str) -> Result<Option<Affiliate>, AppError>;

    /// Lists affiliates newest first, optionally filtered by status.
    ///
    /// `page` is 1-indexed.
    async fn list(
        &self,
        status: Option<AffiliateStatus>,
        page: i64,
        page_size: i64,
    ) -> Result<Vec<Affiliate>, AppError>;

    async fn count(&self, status: Option<AffiliateStatus>) -> Result<i64, AppError>;

    /// Moves a PENDING or SUSPENDED affiliate to ACTIVE and stamps the approval.
    async fn activate(
        &self,
        id: i64,
        approved_by: i64,
        notes: Option<String>,
        at: DateTime<Utc>,
    ) -> Result<Option<Affiliate>, AppError>;

    /// Suspends a non-suspended affiliate and deactivates every one of its
    /// links in the same transaction.
    async fn suspend(
        &self,
        id: i64,
        suspended_by: i64,
        reason: String,
        at: DateTime<Utc>,
    ) -> Result<Option<Suspension>, AppError>;

    /// Updates tier and/or base commission rate. `None` leaves a field unchanged.
    async fn update_terms(
        &self,
        id: i64,
        tier: Option<AffiliateTier>,
        commission_rate: Option<Decimal>,
    ) -> Result<Option<Affiliate>, AppError>;
}
