use async_trait::async_trait;
use sqlx::PgPool;
use std::sync::Arc;

use super::rows::AttributionRow;
use crate::domain::entities::Attribution;
use crate::domain::repositories::AttributionRepository;
use crate::error::AppError;

const ATTRIBUTION_COLUMNS: &str = "user_id, affiliate_code, token, click_id, expires_at, created_at";

pub struct PgAttributionRepository {
    pool: Arc<PgPool>,
}

impl PgAttributionRepository {
    pub fn new(pool: Arc<PgPool>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AttributionRepository for PgAttributionRepository {
    async fn save(&self, attribution: Attribution) -> Result<Attribution, AppError> {
        let sql = format!(
            r#"
            INSERT INTO referral_attributions
                (user_id, affiliate_code, token, click_id, expires_at, created_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (user_id) DO UPDATE
            SET affiliate_code = EXCLUDED.affiliate_code,
                token = EXCLUDED.token,
                click_id = EXCLUDED.click_id,
                expires_at = EXCLUDED.expires_at,
                created_at = EXCLUDED.created_at
            RETURNING {ATTRIBUTION_COLUMNS}
            "#
        );
        let row = sqlx::query_as::<_, AttributionRow>(&sql)
            .bind(attribution.user_id)
            .bind(&attribution.affiliate_code)
            .bind(&attribution.token)
            .bind(attribution.click_id)
            .bind(attribution.expires_at)
            .bind(attribution.created_at)
            .fetch_one(self.pool.as_ref())
            .await?;

        Ok(row.into())
    }

    async fn find(&self, user_id: i64) -> Result<Option<Attribution>, AppError> {
        let sql = format!("SELECT {ATTRIBUTION_COLUMNS} FROM referral_attributions WHERE user_id = $1");
        let row = sqlx::query_as::<_, AttributionRow>(&sql)
            .bind(user_id)
            .fetch_optional(self.pool.as_ref())
            .await?;

        Ok(row.map(Attribution::from))
    }
}
