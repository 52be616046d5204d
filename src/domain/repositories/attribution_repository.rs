//! Repository trait for stored referral attributions.

use async_trait::async_trait;

use crate::domain::entities::Attribution;
use crate::error::AppError;

/// Stores the latest referral attribution per user.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AttributionRepository: Send + Sync {
    /// Saves the attribution, replacing any previous one for the same user.
    async fn save(&self, attribution: Attribution) -> Result<Attribution, AppError>;

    async fn find(&self, user_id: i64) -> Result<Option<Attribution>, AppError>;
}
