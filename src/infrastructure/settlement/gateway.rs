use async_trait::async_trait;

use crate::domain::entities::Withdrawal;
use crate::error::AppError;

/// Moves the net amount of a withdrawal to its destination.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SettlementGateway: Send + Sync {
    /// Settles the withdrawal and returns the provider's payment reference.
    ///
    /// # Errors
    ///
    /// Any error leaves the withdrawal in PROCESSING with its funds still
    /// reserved.
    async fn settle(&self, withdrawal: &Withdrawal) -> Result<String, AppError>;
}
