use async_trait::async_trait;
use serde::Serialize;

use crate::error::AppError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    Welcome,
    Approval,
}

/// A message addressed to the user behind an affiliate account.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Notification {
    pub kind: NotificationKind,
    pub affiliate_id: i64,
    pub user_id: i64,
    pub affiliate_code: String,
    pub display_name: String,
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, notification: Notification) -> Result<(), AppError>;
}
