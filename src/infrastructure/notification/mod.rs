//! Outbound affiliate notifications.
//!
//! Sending is fire-and-forget from the engine's point of view: services log
//! failures and carry on.
//!
//! - [`Notifier`] - Delivery abstraction
//! - [`LogNotifier`] - Writes notifications to the log instead of sending them

mod log_notifier;
mod service;

pub use log_notifier::LogNotifier;
pub use service::{Notification, NotificationKind, Notifier};

#[cfg(test)]
pub use service::MockNotifier;
