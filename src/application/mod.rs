//! Application layer services implementing the engine's operations.
//!
//! Services coordinate repository calls, validation and state-transition
//! rules. They depend only on the repository traits and receive the shared
//! [`services::SettingsService`] and [`services::ActivityLog`] at
//! construction.
//!
//! # Available Services
//!
//! - [`services::AffiliateService`] - Registration, approval, suspension and terms
//! - [`services::LinkService`] - Tracking links and click resolution
//! - [`services::ConversionService`] - Attribution, conversions and commissions
//! - [`services::WithdrawalService`] - Payout requests and settlement
//! - [`services::AnalyticsService`] - Per-affiliate performance rollups
//! - [`services::SettingsService`] - Program settings

pub mod services;
