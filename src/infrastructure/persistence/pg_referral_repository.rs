//! PostgreSQL implementation of the referral and commission ledger.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde_json::json;
use sqlx::types::Json;
use sqlx::{PgConnection, PgPool};
use std::sync::Arc;

use super::rows::{
    AFFILIATE_COLUMNS, AffiliateRow, COMMISSION_COLUMNS, CommissionRow, REFERRAL_COLUMNS,
    ReferralRow, convert_all,
};
use crate::domain::entities::{
    Affiliate, Commission, ConversionEntry, ConversionRecord, NewReferral, Referral,
    ReferralStatus,
};
use crate::domain::repositories::ReferralRepository;
use crate::error::AppError;

/// Attempts at the insert-or-select of an open referral before giving up.
const OPEN_REFERRAL_ATTEMPTS: usize = 3;

pub struct PgReferralRepository {
    pool: Arc<PgPool>,
}

impl PgReferralRepository {
    pub fn new(pool: Arc<PgPool>) -> Self {
        Self { pool }
    }
}

/// Returns the open referral for the pair, inserting one if none exists.
///
/// The insert relies on the partial unique index over open referrals, so
/// concurrent callers converge on a single row.
async fn find_or_insert_open(
    conn: &mut PgConnection,
    new_referral: &NewReferral,
) -> Result<Referral, AppError> {
    let insert = format!(
        r#"
        INSERT INTO affiliate_referrals
            (affiliate_id, referred_user_id, link_id, click_id, status)
        VALUES ($1, $2, $3, $4, $5)
        ON CONFLICT (affiliate_id, referred_user_id)
            WHERE status IN ('PENDING', 'CONFIRMED')
            DO NOTHING
        RETURNING {REFERRAL_COLUMNS}
        "#
    );
    let select = format!(
        r#"
        SELECT {REFERRAL_COLUMNS}
        FROM affiliate_referrals
        WHERE affiliate_id = $1
          AND referred_user_id = $2
          AND status IN ('PENDING', 'CONFIRMED')
        FOR UPDATE
        "#
    );

    for _ in 0..OPEN_REFERRAL_ATTEMPTS {
        if let Some(row) = sqlx::query_as::<_, ReferralRow>(&insert)
            .bind(new_referral.affiliate_id)
            .bind(new_referral.referred_user_id)
            .bind(new_referral.link_id)
            .bind(new_referral.click_id)
            .bind(new_referral.status.as_str())
            .fetch_optional(&mut *conn)
            .await?
        {
            return row.try_into();
        }

        // Lost the race to a concurrent insert; the winner's row is visible now
        // unless it was converted in between, in which case try again.
        if let Some(row) = sqlx::query_as::<_, ReferralRow>(&select)
            .bind(new_referral.affiliate_id)
            .bind(new_referral.referred_user_id)
            .fetch_optional(&mut *conn)
            .await?
        {
            return row.try_into();
        }
    }

    Err(AppError::conflict(
        "Could not open referral",
        json!({
            "affiliate_id": new_referral.affiliate_id,
            "referred_user_id": new_referral.referred_user_id,
        }),
    ))
}

/// Sum of `base_amount` of the affiliate's commissions created at or after
/// `since`.
async fn monthly_base_revenue(
    conn: &mut PgConnection,
    affiliate_id: i64,
    since: DateTime<Utc>,
) -> Result<Decimal, AppError> {
    let total = sqlx::query_scalar::<_, Decimal>(
        r#"
        SELECT COALESCE(SUM(base_amount), 0)
        FROM affiliate_commissions
        WHERE affiliate_id = $1 AND created_at >= $2
        "#,
    )
    .bind(affiliate_id)
    .bind(since)
    .fetch_one(conn)
    .await?;

    Ok(total)
}

#[async_trait]
impl ReferralRepository for PgReferralRepository {
    async fn open_referral(&self, new_referral: NewReferral) -> Result<Referral, AppError> {
        let mut conn = self.pool.acquire().await?;
        find_or_insert_open(&mut conn, &new_referral).await
    }

    async fn record_conversion(
        &self,
        entry: ConversionEntry,
    ) -> Result<Option<ConversionRecord>, AppError> {
        let mut tx = self.pool.begin().await?;

        // Serializes balance changes and pricing per affiliate.
        let lock_sql = format!("SELECT {AFFILIATE_COLUMNS} FROM affiliates WHERE id = $1 FOR UPDATE");
        let locked = sqlx::query_as::<_, AffiliateRow>(&lock_sql)
            .bind(entry.affiliate_id)
            .fetch_optional(&mut *tx)
            .await?
            .map(Affiliate::try_from)
            .transpose()?;
        let Some(locked) = locked.filter(Affiliate::is_active) else {
            return Ok(None);
        };

        let monthly = monthly_base_revenue(&mut tx, entry.affiliate_id, entry.month_start).await?;
        let priced = entry.price(&locked, monthly)?;

        let open = find_or_insert_open(
            &mut tx,
            &NewReferral {
                affiliate_id: entry.affiliate_id,
                referred_user_id: entry.referred_user_id,
                link_id: entry.link_id,
                click_id: entry.click_id,
                status: ReferralStatus::Confirmed,
            },
        )
        .await?;

        let commission_sql = format!(
            r#"
            INSERT INTO affiliate_commissions
                (affiliate_id, referral_id, commission_type, amount, rate, base_amount,
                 status, tier, order_id, metadata, due_date, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, 'PENDING', $7, $8, $9, $10, $11)
            RETURNING {COMMISSION_COLUMNS}
            "#
        );
        let commission: Commission = sqlx::query_as::<_, CommissionRow>(&commission_sql)
            .bind(entry.affiliate_id)
            .bind(open.id)
            .bind(&entry.conversion_type)
            .bind(priced.amount)
            .bind(priced.effective_rate)
            .bind(entry.conversion_value)
            .bind(priced.tier.as_str())
            .bind(&entry.order_id)
            .bind(Json(&priced.metadata))
            .bind(entry.due_date)
            .bind(entry.occurred_at)
            .fetch_one(&mut *tx)
            .await?
            .try_into()?;

        let referral_sql = format!(
            r#"
            UPDATE affiliate_referrals
            SET status = 'CONVERTED',
                conversion_type = $2,
                conversion_value = $3,
                commission_amount = $4,
                converted_at = $5
            WHERE id = $1
            RETURNING {REFERRAL_COLUMNS}
            "#
        );
        let referral: Referral = sqlx::query_as::<_, ReferralRow>(&referral_sql)
            .bind(open.id)
            .bind(&entry.conversion_type)
            .bind(entry.conversion_value)
            .bind(priced.amount)
            .bind(entry.occurred_at)
            .fetch_one(&mut *tx)
            .await?
            .try_into()?;

        let affiliate_sql = format!(
            r#"
            UPDATE affiliates
            SET total_sales = total_sales + $2,
                total_earnings = total_earnings + $3,
                available_balance = available_balance + $3,
                referral_count = referral_count + 1,
                last_activity_at = $4,
                updated_at = $4
            WHERE id = $1
            RETURNING {AFFILIATE_COLUMNS}
            "#
        );
        let affiliate: Affiliate = sqlx::query_as::<_, AffiliateRow>(&affiliate_sql)
            .bind(entry.affiliate_id)
            .bind(entry.conversion_value)
            .bind(priced.amount)
            .bind(entry.occurred_at)
            .fetch_one(&mut *tx)
            .await?
            .try_into()?;

        if let Some(link_id) = referral.link_id {
            sqlx::query(
                "UPDATE affiliate_links SET conversion_count = conversion_count + 1, \
                 revenue = revenue + $2 WHERE id = $1",
            )
            .bind(link_id)
            .bind(entry.conversion_value)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        Ok(Some(ConversionRecord {
            commission,
            referral,
            affiliate,
        }))
    }

    async fn find_referral(&self, id: i64) -> Result<Option<Referral>, AppError> {
        let sql = format!("SELECT {REFERRAL_COLUMNS} FROM affiliate_referrals WHERE id = $1");
        sqlx::query_as::<_, ReferralRow>(&sql)
            .bind(id)
            .fetch_optional(self.pool.as_ref())
            .await?
            .map(Referral::try_from)
            .transpose()
    }

    async fn find_commission(&self, id: i64) -> Result<Option<Commission>, AppError> {
        let sql = format!("SELECT {COMMISSION_COLUMNS} FROM affiliate_commissions WHERE id = $1");
        sqlx::query_as::<_, CommissionRow>(&sql)
            .bind(id)
            .fetch_optional(self.pool.as_ref())
            .await?
            .map(Commission::try_from)
            .transpose()
    }

    async fn list_commissions(&self, affiliate_id: i64) -> Result<Vec<Commission>, AppError> {
        let sql = format!(
            "SELECT {COMMISSION_COLUMNS} FROM affiliate_commissions WHERE affiliate_id = $1 \
             ORDER BY created_at DESC, id DESC"
        );
        let rows = sqlx::query_as::<_, CommissionRow>(&sql)
            .bind(affiliate_id)
            .fetch_all(self.pool.as_ref())
            .await?;

        convert_all(rows)
    }

    async fn approve_commission(
        &self,
        id: i64,
        at: DateTime<Utc>,
    ) -> Result<Option<Commission>, AppError> {
        let sql = format!(
            r#"
            UPDATE affiliate_commissions
            SET status = 'APPROVED', approved_at = $2
            WHERE id = $1 AND status = 'PENDING'
            RETURNING {COMMISSION_COLUMNS}
            "#
        );
        sqlx::query_as::<_, CommissionRow>(&sql)
            .bind(id)
            .bind(at)
            .fetch_optional(self.pool.as_ref())
            .await?
            .map(Commission::try_from)
            .transpose()
    }
}
