use async_trait::async_trait;
use sqlx::PgPool;
use sqlx::types::Json;
use std::sync::Arc;

use super::rows::{ACTIVITY_COLUMNS, ActivityRow, convert_all};
use crate::domain::entities::{Activity, NewActivity};
use crate::domain::repositories::ActivityRepository;
use crate::error::AppError;

pub struct PgActivityRepository {
    pool: Arc<PgPool>,
}

impl PgActivityRepository {
    pub fn new(pool: Arc<PgPool>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ActivityRepository for PgActivityRepository {
    async fn append(&self, activity: NewActivity) -> Result<Activity, AppError> {
        let sql = format!(
            r#"
            INSERT INTO affiliate_activities (affiliate_id, activity_type, description, metadata)
            VALUES ($1, $2, $3, $4)
            RETURNING {ACTIVITY_COLUMNS}
            "#
        );
        sqlx::query_as::<_, ActivityRow>(&sql)
            .bind(activity.affiliate_id)
            .bind(activity.activity_type.as_str())
            .bind(&activity.description)
            .bind(Json(&activity.metadata))
            .fetch_one(self.pool.as_ref())
            .await?
            .try_into()
    }

    async fn list_by_affiliate(
        &self,
        affiliate_id: i64,
        limit: i64,
    ) -> Result<Vec<Activity>, AppError> {
        let sql = format!(
            "SELECT {ACTIVITY_COLUMNS} FROM affiliate_activities WHERE affiliate_id = $1 \
             ORDER BY created_at DESC, id DESC LIMIT $2"
        );
        let rows = sqlx::query_as::<_, ActivityRow>(&sql)
            .bind(affiliate_id)
            .bind(limit)
            .fetch_all(self.pool.as_ref())
            .await?;

        convert_all(rows)
    }
}
