//! Business logic services for the application layer.

pub mod activity_log;
pub mod affiliate_service;
pub mod analytics_service;
pub mod conversion_service;
pub mod link_service;
pub mod settings_service;
pub mod withdrawal_service;

pub use activity_log::ActivityLog;
pub use affiliate_service::{AffiliatePage, AffiliateService};
pub use analytics_service::{AffiliatePerformance, AnalyticsService};
pub use conversion_service::{ConversionRequest, ConversionService};
pub use link_service::{ClickResolution, LinkOptions, LinkService};
pub use settings_service::SettingsService;
pub use withdrawal_service::{WithdrawalRequest, WithdrawalService};
