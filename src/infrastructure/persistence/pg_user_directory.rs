use async_trait::async_trait;
use sqlx::PgPool;
use std::sync::Arc;

use super::rows::UserRow;
use crate::domain::entities::UserAccount;
use crate::domain::repositories::UserDirectory;
use crate::error::AppError;

/// Reads user accounts from the platform's `users` table.
pub struct PgUserDirectory {
    pool: Arc<PgPool>,
}

impl PgUserDirectory {
    pub fn new(pool: Arc<PgPool>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserDirectory for PgUserDirectory {
    async fn find_user(&self, id: i64) -> Result<Option<UserAccount>, AppError> {
        let row = sqlx::query_as::<_, UserRow>(
            "SELECT id, email, display_name FROM users WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(self.pool.as_ref())
        .await?;

        Ok(row.map(UserAccount::from))
    }
}
