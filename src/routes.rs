//! Top-level router configuration.
//!
//! # Route Structure
//!
//! - `GET  /ref/{short_code}` - Tracking link redirect (public)
//! - `GET  /health`           - Health check (public)
//! - `/api/*`                 - Management and integration API
//!
//! # Middleware
//!
//! - **Tracing** - Structured request/response logging
//! - **Rate limiting** - Per-IP token bucket, proxy-aware when configured
//! - **Path normalization** - Trailing slash handling

use crate::api;
use crate::api::handlers::{health_handler, referral_redirect_handler};
use crate::api::middleware::rate_limit::{self, Quota};
use crate::api::middleware::tracing;
use crate::state::AppState;
use anyhow::Result;
use axum::Router;
use axum::routing::get;
use tower::Layer;
use tower_http::normalize_path::{NormalizePath, NormalizePathLayer};

/// Constructs the application router with all routes and middleware.
///
/// When `state.behind_proxy` is set, rate limiting keys on the client address
/// reported by the proxy instead of the peer socket address.
///
/// # Errors
///
/// Fails if a rate limit quota is invalid.
pub fn app_router(state: AppState) -> Result<NormalizePath<Router>> {
    let behind_proxy = state.behind_proxy;

    let api_router = limited(api::routes::api_routes(), rate_limit::API, behind_proxy)?;
    let public_router = limited(
        Router::new().route("/ref/{short_code}", get(referral_redirect_handler)),
        rate_limit::PUBLIC,
        behind_proxy,
    )?;

    let router = Router::new()
        .merge(public_router)
        .route("/health", get(health_handler))
        .nest("/api", api_router)
        .with_state(state)
        .layer(tracing::layer());

    Ok(NormalizePathLayer::trim_trailing_slash().layer(router))
}

fn limited(
    router: Router<AppState>,
    quota: Quota,
    behind_proxy: bool,
) -> Result<Router<AppState>> {
    Ok(if behind_proxy {
        router.layer(rate_limit::proxied_layer(quota)?)
    } else {
        router.layer(rate_limit::layer(quota)?)
    })
}
