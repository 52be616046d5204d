//! PostgreSQL implementation of the withdrawal store.
//!
//! Balance reservation and completion touch both `affiliates` and
//! `affiliate_withdrawals`, so each runs in one transaction.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use sqlx::types::Json;
use std::sync::Arc;

use super::rows::{WITHDRAWAL_COLUMNS, WithdrawalRow, convert_all};
use crate::domain::entities::{NewWithdrawal, Withdrawal};
use crate::domain::repositories::WithdrawalRepository;
use crate::error::AppError;

pub struct PgWithdrawalRepository {
    pool: Arc<PgPool>,
}

impl PgWithdrawalRepository {
    pub fn new(pool: Arc<PgPool>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl WithdrawalRepository for PgWithdrawalRepository {
    async fn create_reserved(
        &self,
        new_withdrawal: NewWithdrawal,
    ) -> Result<Option<Withdrawal>, AppError> {
        let mut tx = self.pool.begin().await?;

        // The guard in the WHERE clause is what makes concurrent requests safe:
        // only one of two racing reservations can see enough balance.
        let reserved = sqlx::query(
            r#"
            UPDATE affiliates
            SET available_balance = available_balance - $2,
                last_activity_at = $3,
                updated_at = $3
            WHERE id = $1 AND status = 'ACTIVE' AND available_balance >= $2
            "#,
        )
        .bind(new_withdrawal.affiliate_id)
        .bind(new_withdrawal.amount)
        .bind(new_withdrawal.requested_at)
        .execute(&mut *tx)
        .await?
        .rows_affected();

        if reserved == 0 {
            tx.rollback().await?;
            return Ok(None);
        }

        let sql = format!(
            r#"
            INSERT INTO affiliate_withdrawals
                (reference, affiliate_id, amount, method, processing_fee, net_amount,
                 destination, status, requested_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, 'PENDING', $8)
            RETURNING {WITHDRAWAL_COLUMNS}
            "#
        );
        let withdrawal: Withdrawal = sqlx::query_as::<_, WithdrawalRow>(&sql)
            .bind(&new_withdrawal.reference)
            .bind(new_withdrawal.affiliate_id)
            .bind(new_withdrawal.amount)
            .bind(new_withdrawal.method.as_str())
            .bind(new_withdrawal.processing_fee)
            .bind(new_withdrawal.net_amount)
            .bind(Json(&new_withdrawal.destination))
            .bind(new_withdrawal.requested_at)
            .fetch_one(&mut *tx)
            .await?
            .try_into()?;

        tx.commit().await?;

        Ok(Some(withdrawal))
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<Withdrawal>, AppError> {
        let sql = format!("SELECT {WITHDRAWAL_COLUMNS} FROM affiliate_withdrawals WHERE id = $1");
        sqlx::query_as::<_, WithdrawalRow>(&sql)
            .bind(id)
            .fetch_optional(self.pool.as_ref())
            .await?
            .map(Withdrawal::try_from)
            .transpose()
    }

    async fn list_by_affiliate(&self, affiliate_id: i64) -> Result<Vec<Withdrawal>, AppError> {
        let sql = format!(
            "SELECT {WITHDRAWAL_COLUMNS} FROM affiliate_withdrawals WHERE affiliate_id = $1 \
             ORDER BY requested_at DESC, id DESC"
        );
        let rows = sqlx::query_as::<_, WithdrawalRow>(&sql)
            .bind(affiliate_id)
            .fetch_all(self.pool.as_ref())
            .await?;

        convert_all(rows)
    }

    async fn mark_processing(
        &self,
        id: i64,
        processed_by: i64,
        notes: Option<String>,
        at: DateTime<Utc>,
    ) -> Result<Option<Withdrawal>, AppError> {
        let sql = format!(
            r#"
            UPDATE affiliate_withdrawals
            SET status = 'PROCESSING',
                processed_at = $2,
                processed_by = $3,
                processing_notes = $4
            WHERE id = $1 AND status = 'PENDING'
            RETURNING {WITHDRAWAL_COLUMNS}
            "#
        );
        sqlx::query_as::<_, WithdrawalRow>(&sql)
            .bind(id)
            .bind(at)
            .bind(processed_by)
            .bind(notes)
            .fetch_optional(self.pool.as_ref())
            .await?
            .map(Withdrawal::try_from)
            .transpose()
    }

    async fn mark_completed(
        &self,
        id: i64,
        payment_reference: String,
        at: DateTime<Utc>,
    ) -> Result<Option<Withdrawal>, AppError> {
        let mut tx = self.pool.begin().await?;

        let sql = format!(
            r#"
            UPDATE affiliate_withdrawals
            SET status = 'COMPLETED',
                completed_at = $2,
                payment_reference = $3
            WHERE id = $1 AND status = 'PROCESSING'
            RETURNING {WITHDRAWAL_COLUMNS}
            "#
        );
        let Some(row) = sqlx::query_as::<_, WithdrawalRow>(&sql)
            .bind(id)
            .bind(at)
            .bind(&payment_reference)
            .fetch_optional(&mut *tx)
            .await?
        else {
            tx.rollback().await?;
            return Ok(None);
        };
        let withdrawal = Withdrawal::try_from(row)?;

        sqlx::query(
            r#"
            UPDATE affiliates
            SET total_withdrawn = total_withdrawn + $2,
                updated_at = $3
            WHERE id = $1
            "#,
        )
        .bind(withdrawal.affiliate_id)
        .bind(withdrawal.amount)
        .bind(at)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(Some(withdrawal))
    }
}
