use async_trait::async_trait;
use sqlx::PgPool;
use std::sync::Arc;

use super::rows::SettingsRow;
use crate::domain::entities::AffiliateSettings;
use crate::domain::repositories::SettingsRepository;
use crate::error::AppError;

const SETTINGS_COLUMNS: &str = "minimum_payout, currency, default_commission_rate, auto_approve, \
     referral_window_days, commission_hold_days, updated_at";

/// Settings live in a single row with `id = 1`.
pub struct PgSettingsRepository {
    pool: Arc<PgPool>,
}

impl PgSettingsRepository {
    pub fn new(pool: Arc<PgPool>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SettingsRepository for PgSettingsRepository {
    async fn load(&self) -> Result<Option<AffiliateSettings>, AppError> {
        let sql = format!("SELECT {SETTINGS_COLUMNS} FROM affiliate_settings WHERE id = 1");
        let row = sqlx::query_as::<_, SettingsRow>(&sql)
            .fetch_optional(self.pool.as_ref())
            .await?;

        Ok(row.map(AffiliateSettings::from))
    }

    async fn save(&self, settings: AffiliateSettings) -> Result<AffiliateSettings, AppError> {
        let sql = format!(
            r#"
            INSERT INTO affiliate_settings
                (id, minimum_payout, currency, default_commission_rate, auto_approve,
                 referral_window_days, commission_hold_days, updated_at)
            VALUES (1, $1, $2, $3, $4, $5, $6, $7)
            ON CONFLICT (id) DO UPDATE
            SET minimum_payout = EXCLUDED.minimum_payout,
                currency = EXCLUDED.currency,
                default_commission_rate = EXCLUDED.default_commission_rate,
                auto_approve = EXCLUDED.auto_approve,
                referral_window_days = EXCLUDED.referral_window_days,
                commission_hold_days = EXCLUDED.commission_hold_days,
                updated_at = EXCLUDED.updated_at
            RETURNING {SETTINGS_COLUMNS}
            "#
        );
        let row = sqlx::query_as::<_, SettingsRow>(&sql)
            .bind(settings.minimum_payout)
            .bind(&settings.currency)
            .bind(settings.default_commission_rate)
            .bind(settings.auto_approve)
            .bind(settings.referral_window_days)
            .bind(settings.commission_hold_days)
            .bind(settings.updated_at)
            .fetch_one(self.pool.as_ref())
            .await?;

        Ok(row.into())
    }
}
