//! PostgreSQL implementation of the link repository.

use async_trait::async_trait;
use sqlx::PgPool;
use std::sync::Arc;

use super::rows::{ClickRow, LINK_COLUMNS, LinkRow, convert_all};
use crate::domain::entities::{AffiliateLink, LinkClick, NewAffiliateLink, NewLinkClick};
use crate::domain::repositories::LinkRepository;
use crate::error::AppError;

/// PostgreSQL repository for tracking links and clicks.
pub struct PgLinkRepository {
    pool: Arc<PgPool>,
}

impl PgLinkRepository {
    /// Creates a new repository with a database connection pool.
    pub fn new(pool: Arc<PgPool>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl LinkRepository for PgLinkRepository {
    async fn create(&self, new_link: NewAffiliateLink) -> Result<AffiliateLink, AppError> {
        let sql = format!(
            r#"
            INSERT INTO affiliate_links
                (affiliate_id, short_code, title, link_type, target_url, tracking_url, expires_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING {LINK_COLUMNS}
            "#
        );

        let row = sqlx::query_as::<_, LinkRow>(&sql)
            .bind(new_link.affiliate_id)
            .bind(&new_link.short_code)
            .bind(&new_link.title)
            .bind(new_link.link_type.as_str())
            .bind(&new_link.target_url)
            .bind(&new_link.tracking_url)
            .bind(new_link.expires_at)
            .fetch_one(self.pool.as_ref())
            .await?;

        row.try_into()
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<AffiliateLink>, AppError> {
        let sql = format!("SELECT {LINK_COLUMNS} FROM affiliate_links WHERE id = $1");
        sqlx::query_as::<_, LinkRow>(&sql)
            .bind(id)
            .fetch_optional(self.pool.as_ref())
            .await?
            .map(AffiliateLink::try_from)
            .transpose()
    }

    async fn find_by_short_code(
        &self,
        short_code: &str,
    ) -> Result<Option<AffiliateLink>, AppError> {
        let sql = format!("SELECT {LINK_COLUMNS} FROM affiliate_links WHERE short_code = $1");
        sqlx::query_as::<_, LinkRow>(&sql)
            .bind(short_code)
            .fetch_optional(self.pool.as_ref())
            .await?
            .map(AffiliateLink::try_from)
            .transpose()
    }

    async fn list_by_affiliate(&self, affiliate_id: i64) -> Result<Vec<AffiliateLink>, AppError> {
        let sql = format!(
            "SELECT {LINK_COLUMNS} FROM affiliate_links WHERE affiliate_id = $1 \
             ORDER BY created_at DESC, id DESC"
        );
        let rows = sqlx::query_as::<_, LinkRow>(&sql)
            .bind(affiliate_id)
            .fetch_all(self.pool.as_ref())
            .await?;

        convert_all(rows)
    }

    async fn record_click(&self, click: NewLinkClick) -> Result<LinkClick, AppError> {
        let mut tx = self.pool.begin().await?;

        let row = sqlx::query_as::<_, ClickRow>(
            r#"
            INSERT INTO affiliate_link_clicks
                (link_id, affiliate_id, ip, user_agent, referer, clicked_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id, link_id, ip, user_agent, referer, clicked_at
            "#,
        )
        .bind(click.link_id)
        .bind(click.affiliate_id)
        .bind(&click.ip)
        .bind(&click.user_agent)
        .bind(&click.referer)
        .bind(click.clicked_at)
        .fetch_one(&mut *tx)
        .await?;

        sqlx::query(
            "UPDATE affiliate_links SET click_count = click_count + 1, last_click_at = $2 \
             WHERE id = $1",
        )
        .bind(click.link_id)
        .bind(click.clicked_at)
        .execute(&mut *tx)
        .await?;

        sqlx::query("UPDATE affiliates SET last_activity_at = $2 WHERE id = $1")
            .bind(click.affiliate_id)
            .bind(click.clicked_at)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        Ok(row.into())
    }

    async fn find_click(&self, id: i64) -> Result<Option<LinkClick>, AppError> {
        let row = sqlx::query_as::<_, ClickRow>(
            "SELECT id, link_id, ip, user_agent, referer, clicked_at \
             FROM affiliate_link_clicks WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(self.pool.as_ref())
        .await?;

        Ok(row.map(LinkClick::from))
    }

    async fn set_active(
        &self,
        id: i64,
        is_active: bool,
    ) -> Result<Option<AffiliateLink>, AppError> {
        let sql = format!(
            "UPDATE affiliate_links SET is_active = $2 WHERE id = $1 RETURNING {LINK_COLUMNS}"
        );
        sqlx::query_as::<_, LinkRow>(&sql)
            .bind(id)
            .bind(is_active)
            .fetch_optional(self.pool.as_ref())
            .await?
            .map(AffiliateLink::try_from)
            .transpose()
    }
}
