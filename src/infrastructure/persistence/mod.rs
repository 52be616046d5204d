//! PostgreSQL repository implementations.
//!
//! Concrete implementations of the domain repository traits using SQLx.
//! Multi-table operations run inside a single transaction; guarded state
//! transitions are conditional `UPDATE ... RETURNING` statements.
//!
//! # Repositories
//!
//! - [`PgAffiliateRepository`] - Affiliate accounts, approval and suspension cascade
//! - [`PgLinkRepository`] - Tracking links and click recording
//! - [`PgReferralRepository`] - Referrals, commissions and conversion booking
//! - [`PgAttributionRepository`] - Stored referral attributions
//! - [`PgWithdrawalRepository`] - Payout requests with balance reservation
//! - [`PgActivityRepository`] - Audit log
//! - [`PgSettingsRepository`] - Program settings row
//! - [`PgAnalyticsRepository`] - Performance aggregations
//! - [`PgUserDirectory`] - Platform user lookup

mod rows;

pub mod pg_activity_repository;
pub mod pg_affiliate_repository;
pub mod pg_analytics_repository;
pub mod pg_attribution_repository;
pub mod pg_link_repository;
pub mod pg_referral_repository;
pub mod pg_settings_repository;
pub mod pg_user_directory;
pub mod pg_withdrawal_repository;

pub use pg_activity_repository::PgActivityRepository;
pub use pg_affiliate_repository::PgAffiliateRepository;
pub use pg_analytics_repository::PgAnalyticsRepository;
pub use pg_attribution_repository::PgAttributionRepository;
pub use pg_link_repository::PgLinkRepository;
pub use pg_referral_repository::PgReferralRepository;
pub use pg_settings_repository::PgSettingsRepository;
pub use pg_user_directory::PgUserDirectory;
pub use pg_withdrawal_repository::PgWithdrawalRepository;
