//! PostgreSQL implementation of the affiliate repository.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;
use std::sync::Arc;
use tracing::debug;

use super::rows::{AFFILIATE_COLUMNS, AffiliateRow, convert_all};
use crate::domain::entities::{
    Affiliate, AffiliateStatus, AffiliateTier, NewAffiliate, Suspension,
};
use crate::domain::repositories::AffiliateRepository;
use crate::error::AppError;

/// PostgreSQL repository for affiliate accounts.
pub struct PgAffiliateRepository {
    pool: Arc<PgPool>,
}

impl PgAffiliateRepository {
    pub fn new(pool: Arc<PgPool>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AffiliateRepository for PgAffiliateRepository {
    async fn create(&self, new_affiliate: NewAffiliate) -> Result<Affiliate, AppError> {
        let sql = format!(
            r#"
            INSERT INTO affiliates
                (user_id, affiliate_code, display_name, website, status, tier,
                 commission_rate, approved_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING {AFFILIATE_COLUMNS}
            "#
        );

        let row = sqlx::query_as::<_, AffiliateRow>(&sql)
            .bind(new_affiliate.user_id)
            .bind(&new_affiliate.affiliate_code)
            .bind(&new_affiliate.display_name)
            .bind(&new_affiliate.website)
            .bind(new_affiliate.status.as_str())
            .bind(new_affiliate.tier.as_str())
            .bind(new_affiliate.commission_rate)
            .bind(new_affiliate.approved_at)
            .fetch_one(self.pool.as_ref())
            .await?;

        row.try_into()
    }

    async fn next_code_suffix(&self, base: &str) -> Result<u64, AppError> {
        let highest = sqlx::query_scalar::<_, Option<i64>>(
            r#"
            SELECT MAX(
                CASE WHEN affiliate_code = $1 THEN 0
                     ELSE substring(affiliate_code FROM char_length($1) + 1)::BIGINT
                END)
            FROM affiliates
            WHERE affiliate_code = $1
               OR (affiliate_code LIKE $2
                   AND substring(affiliate_code FROM char_length($1) + 1) ~ '^[0-9]{1,18}$')
            "#,
        )
        .bind(base)
        .bind(format!("{base}%"))
        .fetch_one(self.pool.as_ref())
        .await?;

        Ok(highest.map_or(0, |n| n.unsigned_abs() + 1))
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<Affiliate>, AppError> {
        let sql = format!("SELECT {AFFILIATE_COLUMNS} FROM affiliates WHERE id = $1");
        sqlx::query_as::<_, AffiliateRow>(&sql)
            .bind(id)
            .fetch_optional(self.pool.as_ref())
            .await?
            .map(Affiliate::try_from)
            .transpose()
    }

    async fn find_by_user_id(&self, user_id: i64) -> Result<Option<Affiliate>, AppError> {
        let sql = format!("SELECT {AFFILIATE_COLUMNS} FROM affiliates WHERE user_id = $1");
        sqlx::query_as::<_, AffiliateRow>(&sql)
            .bind(user_id)
            .fetch_optional(self.pool.as_ref())
            .await?
            .map(Affiliate::try_from)
            .transpose()
    }

    async fn find_by_code(&self, code: &str) -> Result<Option<Affiliate>, AppError> {
        let sql = format!("SELECT {AFFILIATE_COLUMNS} FROM affiliates WHERE affiliate_code = $1");
        sqlx::query_as::<_, AffiliateRow>(&sql)
            .bind(code)
            .fetch_optional(self.pool.as_ref())
            .await?
            .map(Affiliate::try_from)
            .transpose()
    }

    async fn list(
        &self,
        status: Option<AffiliateStatus>,
        page: i64,
        page_size: i64,
    ) -> Result<Vec<Affiliate>, AppError> {
        let offset = (page - 1) * page_size;
        let sql = format!(
            r#"
            SELECT {AFFILIATE_COLUMNS}
            FROM affiliates
            WHERE ($1::text IS NULL OR status = $1)
            ORDER BY created_at DESC, id DESC
            LIMIT $2 OFFSET $3
            "#
        );

        let rows = sqlx::query_as::<_, AffiliateRow>(&sql)
            .bind(status.map(|s| s.as_str()))
            .bind(page_size)
            .bind(offset)
            .fetch_all(self.pool.as_ref())
            .await?;

        convert_all(rows)
    }

    async fn count(&self, status: Option<AffiliateStatus>) -> Result<i64, AppError> {
        let count = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM affiliates WHERE ($1::text IS NULL OR status = $1)",
        )
        .bind(status.map(|s| s.as_str()))
        .fetch_one(self.pool.as_ref())
        .await?;

        Ok(count)
    }

    async fn activate(
        &self,
        id: i64,
        approved_by: i64,
        notes: Option<String>,
        at: DateTime<Utc>,
    ) -> Result<Option<Affiliate>, AppError> {
        let sql = format!(
            r#"
            UPDATE affiliates
            SET status = 'ACTIVE',
                approved_at = $2,
                approved_by = $3,
                approval_notes = $4,
                updated_at = $2
            WHERE id = $1 AND status IN ('PENDING', 'SUSPENDED')
            RETURNING {AFFILIATE_COLUMNS}
            "#
        );

        sqlx::query_as::<_, AffiliateRow>(&sql)
            .bind(id)
            .bind(at)
            .bind(approved_by)
            .bind(notes)
            .fetch_optional(self.pool.as_ref())
            .await?
            .map(Affiliate::try_from)
            .transpose()
    }

    async fn suspend(
        &self,
        id: i64,
        suspended_by: i64,
        reason: String,
        at: DateTime<Utc>,
    ) -> Result<Option<Suspension>, AppError> {
        let mut tx = self.pool.begin().await?;

        let sql = format!(
            r#"
            UPDATE affiliates
            SET status = 'SUSPENDED',
                suspended_at = $2,
                suspended_by = $3,
                suspension_reason = $4,
                updated_at = $2
            WHERE id = $1 AND status <> 'SUSPENDED'
            RETURNING {AFFILIATE_COLUMNS}
            "#
        );

        let Some(row) = sqlx::query_as::<_, AffiliateRow>(&sql)
            .bind(id)
            .bind(at)
            .bind(suspended_by)
            .bind(reason)
            .fetch_optional(&mut *tx)
            .await?
        else {
            return Ok(None);
        };

        let links_deactivated = sqlx::query(
            "UPDATE affiliate_links SET is_active = FALSE WHERE affiliate_id = $1 AND is_active",
        )
        .bind(id)
        .execute(&mut *tx)
        .await?
        .rows_affected();

        tx.commit().await?;
        debug!(affiliate_id = id, links_deactivated, "Suspension committed");

        Ok(Some(Suspension {
            affiliate: row.try_into()?,
            links_deactivated,
        }))
    }

    async fn update_terms(
        &self,
        id: i64,
        tier: Option<AffiliateTier>,
        commission_rate: Option<Decimal>,
    ) -> Result<Option<Affiliate>, AppError> {
        let sql = format!(
            r#"
            UPDATE affiliates
            SET tier = COALESCE($2, tier),
                commission_rate = COALESCE($3, commission_rate),
                updated_at = NOW()
            WHERE id = $1
            RETURNING {AFFILIATE_COLUMNS}
            "#
        );

        sqlx::query_as::<_, AffiliateRow>(&sql)
            .bind(id)
            .bind(tier.map(|t| t.as_str()))
            .bind(commission_rate)
            .fetch_optional(self.pool.as_ref())
            .await?
            .map(Affiliate::try_from)
            .transpose()
    }
}
