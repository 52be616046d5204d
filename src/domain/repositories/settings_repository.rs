//! Repository trait for program settings.

use async_trait::async_trait;

use crate::domain::entities::AffiliateSettings;
use crate::error::AppError;

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SettingsRepository: Send + Sync {
    /// Loads the stored settings, or `None` if they were never saved.
    async fn load(&self) -> Result<Option<AffiliateSettings>, AppError>;

    /// Inserts or replaces the settings row.
    async fn save(&self, settings: AffiliateSettings) -> Result<AffiliateSettings, AppError>;
}
