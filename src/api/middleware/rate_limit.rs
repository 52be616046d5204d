//! Rate limiting middleware using token bucket algorithm.

use anyhow::{Context, Result};
use governor::clock::QuantaInstant;
use governor::middleware::NoOpMiddleware;
use std::sync::Arc;
use tower_governor::{
    GovernorLayer,
    governor::GovernorConfigBuilder,
    key_extractor::{PeerIpKeyExtractor, SmartIpKeyExtractor},
};

/// Token bucket quota: one token per `per_millisecond`, up to `burst`.
#[derive(Debug, Clone, Copy)]
pub struct Quota {
    pub per_millisecond: u64,
    pub burst: u32,
}

/// Redirect traffic: 50 requests per second, bursts of 200.
pub const PUBLIC: Quota = Quota {
    per_millisecond: 20,
    burst: 200,
};

/// Management API: 2 requests per second, bursts of 100.
pub const API: Quota = Quota {
    per_millisecond: 500,
    burst: 100,
};

/// Creates a rate limiter keyed by the socket peer address.
///
/// Requests exceeding the limit receive `429 Too Many Requests`.
///
/// # Errors
///
/// Fails if either quota value is zero.
///
/// # Example
///
/// ```rust,ignore
/// let app = Router::new()
///     .route("/ref/{short_code}", get(referral_redirect_handler))
///     .layer(rate_limit::layer(rate_limit::PUBLIC)?);
/// ```
pub fn layer(
    quota: Quota,
) -> Result<GovernorLayer<PeerIpKeyExtractor, NoOpMiddleware<QuantaInstant>, axum::body::Body>> {
    let governor_conf = GovernorConfigBuilder::default()
        .per_millisecond(quota.per_millisecond)
        .burst_size(quota.burst)
        .finish()
        .with_context(|| format!("Invalid rate limit quota: {quota:?}"))?;

    Ok(GovernorLayer::new(Arc::new(governor_conf)))
}

/// Creates a rate limiter keyed by the client address reported by a trusted
/// reverse proxy (`X-Forwarded-For`, `X-Real-IP`, `Forwarded`), falling back
/// to the peer address.
///
/// Enable only when the service runs behind such a proxy; otherwise clients
/// can choose their own key.
///
/// # Errors
///
/// Fails if either quota value is zero.
pub fn proxied_layer(
    quota: Quota,
) -> Result<GovernorLayer<SmartIpKeyExtractor, NoOpMiddleware<QuantaInstant>, axum::body::Body>>
{
    let governor_conf = GovernorConfigBuilder::default()
        .per_millisecond(quota.per_millisecond)
        .burst_size(quota.burst)
        .key_extractor(SmartIpKeyExtractor)
        .finish()
        .with_context(|| format!("Invalid rate limit quota: {quota:?}"))?;

    Ok(GovernorLayer::new(Arc::new(governor_conf)))
}
