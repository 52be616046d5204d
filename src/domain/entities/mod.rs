//! Core domain entities of the affiliate engine.
//!
//! Entities are plain data structures; state-transition rules live in the
//! application services and atomic persistence in the repositories.
//!
//! # Entity Types
//!
//! - [`Affiliate`] - An affiliate account with its running ledger totals
//! - [`AffiliateLink`] - A tracking link owned by an affiliate
//! - [`LinkClick`] - One resolved click on a tracking link
//! - [`Referral`] / [`Attribution`] - Affiliate-to-user credit and the stored token
//! - [`Commission`] - Money owed for one conversion
//! - [`Withdrawal`] - A payout request with reserved funds
//! - [`Activity`] - Append-only audit event
//! - [`AffiliateSettings`] - Program configuration
//!
//! Creation inputs use separate `New*` structs.

pub mod activity;
pub mod affiliate;
pub mod click;
pub mod commission;
pub mod link;
pub mod referral;
pub mod settings;
pub mod user;
pub mod withdrawal;

pub use activity::{Activity, ActivityMetadata, ActivityType, NewActivity};
pub use affiliate::{
    Affiliate, AffiliateProfile, AffiliateStatus, AffiliateTier, NewAffiliate, Suspension,
};
pub use click::{LinkClick, NewLinkClick, RequestContext};
pub use commission::{
    Commission, CommissionMetadata, CommissionStatus, ConversionEntry, ConversionRecord,
};
pub use link::{AffiliateLink, LinkType, NewAffiliateLink};
pub use referral::{Attribution, NewReferral, Referral, ReferralStatus};
pub use settings::{AffiliateSettings, MAX_WINDOW_DAYS, SettingsPatch, validate_commission_rate};
pub use user::UserAccount;
pub use withdrawal::{
    NewWithdrawal, PayoutDestination, Withdrawal, WithdrawalMethod, WithdrawalStatus,
};

#[cfg(test)]
pub(crate) use affiliate::sample_affiliate;
