use async_trait::async_trait;
use tracing::info;

use super::service::{Notification, Notifier};
use crate::error::AppError;

/// Notifier that only records what would have been sent.
///
/// Used when no mail transport is configured.
#[derive(Debug, Default, Clone)]
pub struct LogNotifier;

impl LogNotifier {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Notifier for LogNotifier {
    async fn send(&self, notification: Notification) -> Result<(), AppError> {
        info!(
            kind = ?notification.kind,
            affiliate_id = notification.affiliate_id,
            user_id = notification.user_id,
            affiliate_code = %notification.affiliate_code,
            "Notification dispatched"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::notification::NotificationKind;

    #[tokio::test]
    async fn test_log_notifier_always_succeeds() {
        let notifier = LogNotifier::new();
        let result = notifier
            .send(Notification {
                kind: NotificationKind::Welcome,
                affiliate_id: 1,
                user_id: 10,
                affiliate_code: "janedoe".to_string(),
                display_name: "Jane Doe".to_string(),
            })
            .await;

        assert!(result.is_ok());
    }
}
