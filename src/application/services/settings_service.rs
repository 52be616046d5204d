//! Program settings provider.
//!
//! Settings are loaded once by [`SettingsService::initialize`] at startup and
//! then served from memory; updates are written through to the store.

use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::info;

use crate::domain::entities::{AffiliateSettings, SettingsPatch};
use crate::domain::repositories::SettingsRepository;
use crate::error::AppError;

pub struct SettingsService {
    repository: Arc<dyn SettingsRepository>,
    current: RwLock<AffiliateSettings>,
}

impl SettingsService {
    /// Loads the stored settings, persisting the defaults first if the store
    /// has none.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Internal`] if the store cannot be read or written.
    pub async fn initialize(repository: Arc<dyn SettingsRepository>) -> Result<Self, AppError> {
        let settings = match repository.load().await? {
            Some(settings) => settings,
            None => {
                info!("No affiliate settings stored, saving defaults");
                repository.save(AffiliateSettings::default()).await?
            }
        };

        info!(
            currency = %settings.currency,
            minimum_payout = %settings.minimum_payout,
            default_commission_rate = %settings.default_commission_rate,
            auto_approve = settings.auto_approve,
            "Affiliate settings loaded"
        );

        Ok(Self {
            repository,
            current: RwLock::new(settings),
        })
    }

    /// Returns a snapshot of the current settings.
    pub async fn current(&self) -> AffiliateSettings {
        self.current.read().await.clone()
    }

    /// Reads the settings row back from the store without touching the cached
    /// copy. Used by the health check.
    pub async fn check_store(&self) -> Result<(), AppError> {
        self.repository.load().await.map(|_| ())
    }

    /// Validates and persists a partial update.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Validation`] if any patched value is out of range.
    pub async fn update(&self, patch: SettingsPatch) -> Result<AffiliateSettings, AppError> {
        let mut current = self.current.write().await;
        let next = current.apply(patch)?;
        let saved = self.repository.save(next).await?;

        *current = saved.clone();
        info!(updated_at = %saved.updated_at, "Affiliate settings updated");

        Ok(saved)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::repositories::MockSettingsRepository;
    use rust_decimal::Decimal;

    #[tokio::test]
    async fn test_initialize_saves_defaults_when_missing() {
        let mut repo = MockSettingsRepository::new();
        repo.expect_load().times(1).returning(|| Ok(None));
        repo.expect_save()
            .withf(|s| s.minimum_payout == Decimal::new(50, 0) && s.currency == "USD")
            .times(1)
            .returning(Ok);

        let service = SettingsService::initialize(Arc::new(repo)).await.unwrap();

        assert_eq!(service.current().await.default_commission_rate, Decimal::new(5, 2));
    }

    #[tokio::test]
    async fn test_initialize_uses_stored_settings() {
        let mut repo = MockSettingsRepository::new();
        repo.expect_load().times(1).returning(|| {
            Ok(Some(AffiliateSettings {
                auto_approve: true,
                ..Default::default()
            }))
        });
        repo.expect_save().times(0);

        let service = SettingsService::initialize(Arc::new(repo)).await.unwrap();

        assert!(service.current().await.auto_approve);
    }

    #[tokio::test]
    async fn test_update_persists_and_caches() {
        let mut repo = MockSettingsRepository::new();
        repo.expect_load()
            .returning(|| Ok(Some(AffiliateSettings::default())));
        repo.expect_save().times(1).returning(Ok);

        let service = SettingsService::initialize(Arc::new(repo)).await.unwrap();
        let updated = service
            .update(SettingsPatch {
                minimum_payout: Some(Decimal::new(100, 0)),
                ..Default::default()
            })
            .await
            .unwrap();

        assert_eq!(updated.minimum_payout, Decimal::new(100, 0));
        assert_eq!(service.current().await.minimum_payout, Decimal::new(100, 0));
    }

    #[tokio::test]
    async fn test_update_rejects_invalid_patch_without_saving() {
        let mut repo = MockSettingsRepository::new();
        repo.expect_load()
            .returning(|| Ok(Some(AffiliateSettings::default())));
        repo.expect_save().times(0);

        let service = SettingsService::initialize(Arc::new(repo)).await.unwrap();
        let err = service
            .update(SettingsPatch {
                default_commission_rate: Some(Decimal::ZERO),
                ..Default::default()
            })
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::Validation { .. }));
        assert_eq!(service.current().await.default_commission_rate, Decimal::new(5, 2));
    }
}
