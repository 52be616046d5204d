//! Client address extraction for click tracking.

use axum::http::HeaderMap;
use std::net::{IpAddr, SocketAddr};

const X_FORWARDED_FOR: &str = "x-forwarded-for";

/// Returns the originating client IP of a request.
///
/// Behind a trusted reverse proxy the first hop of `X-Forwarded-For` is used
/// when it parses as an IP address; otherwise, and always when not behind a
/// proxy, the socket peer address is used.
///
/// # Examples
///
/// ```ignore
/// let mut headers = HeaderMap::new();
/// headers.insert("x-forwarded-for", "203.0.113.7, 10.0.0.1".parse().unwrap());
///
/// let ip = client_ip(&headers, "10.0.0.1:443".parse().unwrap(), true);
/// assert_eq!(ip, "203.0.113.7");
/// ```
pub fn client_ip(headers: &HeaderMap, peer: SocketAddr, behind_proxy: bool) -> String {
    if behind_proxy && let Some(ip) = forwarded_for(headers) {
        return ip.to_string();
    }

    peer.ip().to_string()
}

fn forwarded_for(headers: &HeaderMap) -> Option<IpAddr> {
    headers
        .get(X_FORWARDED_FOR)?
        .to_str()
        .ok()?
        .split(',')
        .next()?
        .trim()
        .parse()
        .ok()
}
