//! Best-effort audit trail.

use std::sync::Arc;

use tracing::{debug, warn};

use crate::domain::entities::{Activity, ActivityMetadata, ActivityType, NewActivity};
use crate::domain::repositories::ActivityRepository;
use crate::error::AppError;

/// Largest page returned by [`ActivityLog::list`].
const MAX_LIST_LIMIT: i64 = 100;

/// Writes activity entries on behalf of the other services.
///
/// A failed write is logged and dropped; it never fails the operation that
/// produced the entry.
pub struct ActivityLog {
    repository: Arc<dyn ActivityRepository>,
}

impl ActivityLog {
    pub fn new(repository: Arc<dyn ActivityRepository>) -> Self {
        Self { repository }
    }

    pub async fn record(
        &self,
        affiliate_id: i64,
        activity_type: ActivityType,
        description: impl Into<String>,
        metadata: ActivityMetadata,
    ) {
        let activity = NewActivity {
            affiliate_id,
            activity_type,
            description: description.into(),
            metadata,
        };

        match self.repository.append(activity).await {
            Ok(stored) => debug!(
                affiliate_id,
                activity_id = stored.id,
                activity_type = activity_type.as_str(),
                "Activity recorded"
            ),
            Err(e) => warn!(
                affiliate_id,
                activity_type = activity_type.as_str(),
                error = %e,
                "Failed to record activity"
            ),
        }
    }

    /// Most recent activities first. `limit` is clamped to `1..=100`.
    pub async fn list(&self, affiliate_id: i64, limit: i64) -> Result<Vec<Activity>, AppError> {
        self.repository
            .list_by_affiliate(affiliate_id, limit.clamp(1, MAX_LIST_LIMIT))
            .await
    }
}
