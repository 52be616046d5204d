//! Repository trait definitions for the domain layer.
//!
//! These traits abstract every read and write the engine performs. Operations
//! that must be atomic (balance reservation, conversion booking, suspension
//! cascade, click counters) are single methods, so each implementation can
//! run them as one transaction.
//!
//! # Available Repositories
//!
//! - [`AffiliateRepository`] - Affiliate accounts and status transitions
//! - [`LinkRepository`] - Tracking links and click recording
//! - [`ReferralRepository`] - Referrals, commissions and conversion booking
//! - [`AttributionRepository`] - Stored referral attributions per user
//! - [`WithdrawalRepository`] - Payout requests with balance reservation
//! - [`ActivityRepository`] - Append-only audit log
//! - [`SettingsRepository`] - Program settings row
//! - [`AnalyticsRepository`] - Read-only performance aggregations
//! - [`UserDirectory`] - External user account lookup
//!
//! Mock implementations are generated with `mockall` for unit tests.

pub mod activity_repository;
pub mod affiliate_repository;
pub mod analytics_repository;
pub mod attribution_repository;
pub mod link_repository;
pub mod referral_repository;
pub mod settings_repository;
pub mod user_directory;
pub mod withdrawal_repository;

pub use activity_repository::ActivityRepository;
pub use affiliate_repository::AffiliateRepository;
pub use analytics_repository::{AnalyticsRepository, ClickSummary, ConversionSummary, DateRange};
pub use attribution_repository::AttributionRepository;
pub use link_repository::LinkRepository;
pub use referral_repository::ReferralRepository;
pub use settings_repository::SettingsRepository;
pub use user_directory::UserDirectory;
pub use withdrawal_repository::WithdrawalRepository;

#[cfg(test)]
pub use activity_repository::MockActivityRepository;
#[cfg(test)]
pub use affiliate_repository::MockAffiliateRepository;
#[cfg(test)]
pub use analytics_repository::MockAnalyticsRepository;
#[cfg(test)]
pub use attribution_repository::MockAttributionRepository;
#[cfg(test)]
pub use link_repository::MockLinkRepository;
#[cfg(test)]
pub use referral_repository::MockReferralRepository;
#[cfg(test)]
pub use settings_repository::MockSettingsRepository;
#[cfg(test)]
pub use user_directory::MockUserDirectory;
#[cfg(test)]
pub use withdrawal_repository::MockWithdrawalRepository;
