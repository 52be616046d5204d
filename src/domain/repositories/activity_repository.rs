//! Repository trait for the activity log.

use async_trait::async_trait;

use crate::domain::entities::{Activity, NewActivity};
use crate::error::AppError;

/// Append-only store of affiliate audit events.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ActivityRepository: Send + Sync {
    async fn append(&self, activity: NewActivity) -> Result<Activity, AppError>;

    /// Most recent activities first.
    async fn list_by_affiliate(
        &self,
        affiliate_id: i64,
        limit: i64,
    ) -> Result<Vec<Activity>, AppError>;
}
