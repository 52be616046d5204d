//! Read-only access to platform user accounts.

use async_trait::async_trait;

use crate::domain::entities::UserAccount;
use crate::error::AppError;

/// Lookup of the users that may become affiliates or be referred.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait UserDirectory: Send + Sync {
    async fn find_user(&self, id: i64) -> Result<Option<UserAccount>, AppError>;
}
