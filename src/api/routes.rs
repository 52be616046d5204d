//! API route configuration.

use crate::api::handlers::{
    approve_affiliate_handler, approve_commission_handler, attribute_user_handler,
    complete_withdrawal_handler, create_link_handler, deactivate_link_handler,
    get_affiliate_handler, get_settings_handler, get_withdrawal_handler, list_activities_handler,
    list_affiliates_handler, list_commissions_handler, list_links_handler,
    list_withdrawals_handler, performance_handler, process_withdrawal_handler,
    register_affiliate_handler, request_withdrawal_handler, suspend_affiliate_handler,
    track_conversion_handler, update_settings_handler, update_terms_handler,
};
use crate::state::AppState;
use axum::{
    Router,
    routing::{delete, get, patch, post},
};

/// Management and integration routes, mounted under `/api`.
///
/// # Endpoints
///
/// - `GET    /affiliates`                          - List affiliates (paginated)
/// - `POST   /affiliates`                          - Register an affiliate
/// - `GET    /affiliates/{id}`                     - Affiliate details
/// - `POST   /affiliates/{id}/approve`             - Approve
/// - `POST   /affiliates/{id}/suspend`             - Suspend and deactivate links
/// - `PATCH  /affiliates/{id}/terms`               - Change tier / commission rate
/// - `GET    /affiliates/{id}/links`               - List tracking links
/// - `POST   /affiliates/{id}/links`               - Generate a tracking link
/// - `DELETE /affiliates/{id}/links/{link_id}`     - Deactivate a tracking link
/// - `GET    /affiliates/{id}/commissions`         - List commissions
/// - `GET    /affiliates/{id}/withdrawals`         - List withdrawals
/// - `POST   /affiliates/{id}/withdrawals`         - Request a withdrawal
/// - `GET    /affiliates/{id}/activities`          - Activity log
/// - `GET    /affiliates/{id}/performance`         - Performance rollup
/// - `POST   /attributions`                        - Capture a referral token for a user
/// - `POST   /conversions`                         - Track a conversion
/// - `POST   /commissions/{id}/approve`            - Approve a commission
/// - `GET    /withdrawals/{id}`                    - Withdrawal details
/// - `POST   /withdrawals/{id}/process`            - Process and settle
/// - `POST   /withdrawals/{id}/complete`           - Complete with a payment reference
/// - `GET    /settings`                            - Program settings
/// - `PATCH  /settings`                            - Update program settings
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/affiliates",
            get(list_affiliates_handler).post(register_affiliate_handler),
        )
        .route("/affiliates/{id}", get(get_affiliate_handler))
        .route("/affiliates/{id}/approve", post(approve_affiliate_handler))
        .route("/affiliates/{id}/suspend", post(suspend_affiliate_handler))
        .route("/affiliates/{id}/terms", patch(update_terms_handler))
        .route(
            "/affiliates/{id}/links",
            get(list_links_handler).post(create_link_handler),
        )
        .route(
            "/affiliates/{id}/links/{link_id}",
            delete(deactivate_link_handler),
        )
        .route(
            "/affiliates/{id}/commissions",
            get(list_commissions_handler),
        )
        .route(
            "/affiliates/{id}/withdrawals",
            get(list_withdrawals_handler).post(request_withdrawal_handler),
        )
        .route("/affiliates/{id}/activities", get(list_activities_handler))
        .route("/affiliates/{id}/performance", get(performance_handler))
        .route("/attributions", post(attribute_user_handler))
        .route("/conversions", post(track_conversion_handler))
        .route("/commissions/{id}/approve", post(approve_commission_handler))
        .route("/withdrawals/{id}", get(get_withdrawal_handler))
        .route(
            "/withdrawals/{id}/process",
            post(process_withdrawal_handler),
        )
        .route(
            "/withdrawals/{id}/complete",
            post(complete_withdrawal_handler),
        )
        .route(
            "/settings",
            get(get_settings_handler).patch(update_settings_handler),
        )
}
