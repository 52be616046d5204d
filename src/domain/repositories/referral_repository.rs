//! Repository trait for referrals and commissions.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::domain::entities::{Commission, ConversionEntry, ConversionRecord, NewReferral, Referral};
use crate::error::AppError;

/// Repository interface for the referral and commission ledger.
///
/// # Implementations
///
/// - [`crate::infrastructure::persistence::PgReferralRepository`]
/// - [`crate::infrastructure::memory::MemoryStore`]
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ReferralRepository: Send + Sync {
    /// Returns the open (PENDING or CONFIRMED) referral for the pair, creating
    /// one with `new_referral.status` if none exists.
    ///
    /// Concurrent calls for the same pair yield the same referral.
    async fn open_referral(&self, new_referral: NewReferral) -> Result<Referral, AppError>;

    /// Books a conversion as a single unit of work, holding the affiliate
    /// row for its whole duration:
    ///
    /// 1. lock the affiliate and check it is still ACTIVE
    /// 2. sum the `base_amount` of its commissions since `entry.month_start`
    ///    and price the entry with [`ConversionEntry::price`]
    /// 3. find or create the open referral for the pair (as CONFIRMED)
    /// 4. insert the PENDING commission
    /// 5. move the referral to CONVERTED with the conversion data
    /// 6. add to the affiliate's `total_sales`, `total_earnings`,
    ///    `available_balance` and `referral_count`, and touch `last_activity_at`
    /// 7. add to the originating link's `conversion_count` and `revenue`
    ///
    /// Returns `Ok(None)` without writing anything if the affiliate does not
    /// exist or is not ACTIVE.
    async fn record_conversion(
        &self,
        entry: ConversionEntry,
    ) -> Result<Option<ConversionRecord>, AppError>;

    async fn find_referral(&self, id: i64) -> Result<Option<Referral>, AppError>;

    async fn find_commission(&self, id: i64) -> Result<Option<Commission>, AppError>;

    /// Lists an affiliate's commissions, newest first.
    async fn list_commissions(&self, affiliate_id: i64) -> Result<Vec<Commission>, AppError>;

    /// Moves a PENDING commission to APPROVED. Returns `Ok(None)` if the
    /// commission does not exist or is not PENDING.
    async fn approve_commission(
        &self,
        id: i64,
        at: DateTime<Utc>,
    ) -> Result<Option<Commission>, AppError>;
}
