//! HTTP request handlers for API endpoints.
//!
//! Each handler module corresponds to a logical grouping of endpoints.

pub mod affiliates;
pub mod conversions;
pub mod health;
pub mod links;
pub mod redirect;
pub mod settings;
pub mod withdrawals;

pub use affiliates::{
    approve_affiliate_handler, get_affiliate_handler, list_activities_handler,
    list_affiliates_handler, performance_handler, register_affiliate_handler,
    suspend_affiliate_handler, update_terms_handler,
};
pub use conversions::{
    approve_commission_handler, attribute_user_handler, list_commissions_handler,
    track_conversion_handler,
};
pub use health::health_handler;
pub use links::{create_link_handler, deactivate_link_handler, list_links_handler};
pub use redirect::referral_redirect_handler;
pub use settings::{get_settings_handler, update_settings_handler};
pub use withdrawals::{
    complete_withdrawal_handler, get_withdrawal_handler, list_withdrawals_handler,
    process_withdrawal_handler, request_withdrawal_handler,
};
