//! Handler for tracking link redirects.

use axum::{
    extract::{ConnectInfo, Path, State},
    http::{HeaderMap, StatusCode, header},
    response::IntoResponse,
};
use std::net::SocketAddr;

use crate::domain::entities::RequestContext;
use crate::error::AppError;
use crate::state::AppState;
use crate::utils::client_ip::client_ip;

/// Cookie carrying the referral token until the visitor signs up.
pub const REFERRAL_COOKIE: &str = "aff_ref";

/// Resolves a tracking link and redirects to its target.
///
/// # Endpoint
///
/// `GET /ref/{short_code}`
///
/// # Request Flow
///
/// 1. Look up the active, unexpired link
/// 2. Record the click (best effort)
/// 3. Issue a signed referral token
/// 4. Return 302 Found with the token in the `aff_ref` cookie
///
/// The cookie lives as long as the program's referral window.
///
/// # Errors
///
/// - 404 Not Found if the link does not exist or was deactivated
/// - 409 Conflict (`invalid_state`) if the link has expired
pub async fn referral_redirect_handler(
    Path(short_code): Path<String>,
    State(state): State<AppState>,
    headers: HeaderMap,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
) -> Result<impl IntoResponse, AppError> {
    let context = RequestContext::new(
        Some(client_ip(&headers, addr, state.behind_proxy)),
        headers
            .get(header::USER_AGENT)
            .and_then(|v| v.to_str().ok()),
        headers.get(header::REFERER).and_then(|v| v.to_str().ok()),
    );

    let resolution = state
        .link_service
        .resolve_click(&short_code, context)
        .await?;

    let window = state.settings_service.current().await.referral_window()?;
    let cookie = format!(
        "{REFERRAL_COOKIE}={}; Path=/; Max-Age={}; HttpOnly; SameSite=Lax",
        resolution.referral_token,
        window.num_seconds()
    );

    Ok((
        StatusCode::FOUND,
        [
            (header::LOCATION, resolution.redirect_url),
            (header::SET_COOKIE, cookie),
        ],
    ))
}
