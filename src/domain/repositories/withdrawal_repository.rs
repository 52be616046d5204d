//! Repository trait for withdrawals.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::domain::entities::{NewWithdrawal, Withdrawal};
use crate::error::AppError;

/// Repository interface for payout requests.
///
/// # Implementations
///
/// - [`crate::infrastructure::persistence::PgWithdrawalRepository`]
/// - [`crate::infrastructure::memory::MemoryStore`]
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait WithdrawalRepository: Send + Sync {
    /// Reserves `amount` from the affiliate's available balance and inserts
    /// the PENDING withdrawal, atomically.
    ///
    /// The reservation only succeeds while the affiliate is ACTIVE and its
    /// available balance covers the amount; otherwise nothing is written and
    /// `Ok(None)` is returned.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Conflict`] if the reference already exists.
    async fn create_reserved(
        &self,
        new_withdrawal: NewWithdrawal,
    ) -> Result<Option<Withdrawal>, AppError>;

    async fn find_by_id(&self, id: i64) -> Result<Option<Withdrawal>, AppError>;

    /// Lists an affiliate's withdrawals, newest first.
    async fn list_by_affiliate(&self, affiliate_id: i64) -> Result<Vec<Withdrawal>, AppError>;

    /// PENDING → PROCESSING. Returns `Ok(None)` if not PENDING.
    async fn mark_processing(
        &self,
        id: i64,
        processed_by: i64,
        notes: Option<String>,
        at: DateTime<Utc>,
    ) -> Result<Option<Withdrawal>, AppError>;

    /// PROCESSING → COMPLETED, adding the gross amount to the affiliate's
    /// `total_withdrawn` in the same transaction. Returns `Ok(None)` if not
    /// PROCESSING.
    async fn mark_completed(
        &self,
        id: i64,
        payment_reference: String,
        at: DateTime<Utc>,
    ) -> Result<Option<Withdrawal>, AppError>;
}
