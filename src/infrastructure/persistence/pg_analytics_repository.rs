//! PostgreSQL implementation of performance aggregations.

use async_trait::async_trait;
use rust_decimal::Decimal;
use sqlx::PgPool;
use std::sync::Arc;

use super::rows::{LINK_COLUMNS, LinkRow, convert_all};
use crate::domain::entities::AffiliateLink;
use crate::domain::repositories::{
    AnalyticsRepository, ClickSummary, ConversionSummary, DateRange,
};
use crate::error::AppError;

/// Read-only aggregation queries. Nothing here writes.
pub struct PgAnalyticsRepository {
    pool: Arc<PgPool>,
}

impl PgAnalyticsRepository {
    pub fn new(pool: Arc<PgPool>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AnalyticsRepository for PgAnalyticsRepository {
    async fn click_summary(
        &self,
        affiliate_id: i64,
        range: DateRange,
    ) -> Result<ClickSummary, AppError> {
        let (total_clicks, unique_clicks) = sqlx::query_as::<_, (i64, i64)>(
            r#"
            SELECT COUNT(*), COUNT(DISTINCT ip)
            FROM affiliate_link_clicks
            WHERE affiliate_id = $1
              AND ($2::timestamptz IS NULL OR clicked_at >= $2)
              AND ($3::timestamptz IS NULL OR clicked_at <= $3)
            "#,
        )
        .bind(affiliate_id)
        .bind(range.start)
        .bind(range.end)
        .fetch_one(self.pool.as_ref())
        .await?;

        Ok(ClickSummary {
            total_clicks,
            unique_clicks,
        })
    }

    async fn conversion_summary(
        &self,
        affiliate_id: i64,
        range: DateRange,
    ) -> Result<ConversionSummary, AppError> {
        let (conversions, total_sales, total_commission) =
            sqlx::query_as::<_, (i64, Decimal, Decimal)>(
                r#"
                SELECT COUNT(*), COALESCE(SUM(base_amount), 0), COALESCE(SUM(amount), 0)
                FROM affiliate_commissions
                WHERE affiliate_id = $1
                  AND ($2::timestamptz IS NULL OR created_at >= $2)
                  AND ($3::timestamptz IS NULL OR created_at <= $3)
                "#,
            )
            .bind(affiliate_id)
            .bind(range.start)
            .bind(range.end)
            .fetch_one(self.pool.as_ref())
            .await?;

        Ok(ConversionSummary {
            conversions,
            total_sales,
            total_commission,
        })
    }

    async fn pending_commission_total(&self, affiliate_id: i64) -> Result<Decimal, AppError> {
        let total = sqlx::query_scalar::<_, Decimal>(
            r#"
            SELECT COALESCE(SUM(amount), 0)
            FROM affiliate_commissions
            WHERE affiliate_id = $1 AND status = 'PENDING'
            "#,
        )
        .bind(affiliate_id)
        .fetch_one(self.pool.as_ref())
        .await?;

        Ok(total)
    }

    async fn top_links(
        &self,
        affiliate_id: i64,
        limit: i64,
    ) -> Result<Vec<AffiliateLink>, AppError> {
        let sql = format!(
            r#"
            SELECT {LINK_COLUMNS}
            FROM affiliate_links
            WHERE affiliate_id = $1
            ORDER BY conversion_count DESC, click_count DESC, id ASC
            LIMIT $2
            "#
        );
        let rows = sqlx::query_as::<_, LinkRow>(&sql)
            .bind(affiliate_id)
            .bind(limit)
            .fetch_all(self.pool.as_ref())
            .await?;

        convert_all(rows)
    }
}
