//! Click entity representing a single resolved tracking-link visit.

use chrono::{DateTime, Utc};
use serde::Serialize;

/// A click recorded when a tracking link is resolved. Append-only.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LinkClick {
    pub id: i64,
    pub link_id: i64,
    pub ip: Option<String>,
    pub user_agent: Option<String>,
    pub referer: Option<String>,
    pub clicked_at: DateTime<Utc>,
}

/// Client metadata captured from the incoming redirect request.
///
/// All fields are optional to handle missing headers gracefully.
#[derive(Debug, Clone, Default)]
pub struct RequestContext {
    pub ip: Option<String>,
    pub user_agent: Option<String>,
    pub referer: Option<String>,
}

impl RequestContext {
    pub fn new(ip: Option<String>, user_agent: Option<&str>, referer: Option<&str>) -> Self {
        Self {
            ip,
            user_agent: user_agent.map(|s| s.to_string()),
            referer: referer.map(|s| s.to_string()),
        }
    }
}

/// Input data for recording a click.
#[derive(Debug, Clone)]
pub struct NewLinkClick {
    pub link_id: i64,
    pub affiliate_id: i64,
    pub ip: Option<String>,
    pub user_agent: Option<String>,
    pub referer: Option<String>,
    pub clicked_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_context_str_conversion() {
        let ctx = RequestContext::new(
            Some("10.0.0.1".to_string()),
            Some("Mozilla/5.0"),
            Some("https://news.example.com"),
        );

        assert_eq!(ctx.ip.as_deref(), Some("10.0.0.1"));
        assert_eq!(ctx.user_agent.as_deref(), Some("Mozilla/5.0"));
        assert_eq!(ctx.referer.as_deref(), Some("https://news.example.com"));
    }

    #[test]
    fn test_request_context_minimal() {
        let ctx = RequestContext::new(None, None, None);
        assert!(ctx.ip.is_none());
        assert!(ctx.user_agent.is_none());
        assert!(ctx.referer.is_none());
    }
}
