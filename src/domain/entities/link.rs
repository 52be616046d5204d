//! Tracking link entity owned by an affiliate.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::str::FromStr;

use crate::error::AppError;

/// Link classification derived from the target URL path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LinkType {
    Product,
    Category,
    Landing,
    Custom,
}

impl LinkType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Product => "product",
            Self::Category => "category",
            Self::Landing => "landing",
            Self::Custom => "custom",
        }
    }

    /// Classifies a link by inspecting the target path.
    pub fn classify(path: &str) -> Self {
        let path = path.to_ascii_lowercase();
        if path.contains("/product") {
            Self::Product
        } else if path.contains("/category") {
            Self::Category
        } else if path.contains("/landing") {
            Self::Landing
        } else {
            Self::Custom
        }
    }
}

impl FromStr for LinkType {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "product" => Ok(Self::Product),
            "category" => Ok(Self::Category),
            "landing" => Ok(Self::Landing),
            "custom" => Ok(Self::Custom),
            _ => Err(AppError::bad_request("Unknown link type", json!({ "type": s }))),
        }
    }
}

/// A tracking link that redirects through `{base}/ref/{short_code}`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AffiliateLink {
    pub id: i64,
    pub affiliate_id: i64,
    pub short_code: String,
    pub title: Option<String>,
    pub link_type: LinkType,
    /// Destination carrying UTM parameters and the `ref` marker.
    pub target_url: String,
    /// Canonical redirect URL handed out to the affiliate.
    pub tracking_url: String,
    pub is_active: bool,
    pub expires_at: Option<DateTime<Utc>>,
    pub click_count: i64,
    pub conversion_count: i64,
    pub revenue: Decimal,
    pub last_click_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl AffiliateLink {
    /// Returns true if the link has passed its expiry time.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|e| now >= e)
    }
}

/// Input data for creating a new tracking link.
#[derive(Debug, Clone)]
pub struct NewAffiliateLink {
    pub affiliate_id: i64,
    pub short_code: String,
    pub title: Option<String>,
    pub link_type: LinkType,
    pub target_url: String,
    pub tracking_url: String,
    pub expires_at: Option<DateTime<Utc>>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_classify_by_path() {
        assert_eq!(LinkType::classify("/products/42"), LinkType::Product);
        assert_eq!(LinkType::classify("/shop/category/shoes"), LinkType::Category);
        assert_eq!(LinkType::classify("/landing/spring"), LinkType::Landing);
        assert_eq!(LinkType::classify("/"), LinkType::Custom);
        assert_eq!(LinkType::classify("/Product/Case"), LinkType::Product);
    }

    #[test]
    fn test_is_expired_at() {
        let now = Utc::now();
        let mut link = AffiliateLink {
            id: 1,
            affiliate_id: 1,
            short_code: "a1b2c3d4".to_string(),
            title: None,
            link_type: LinkType::Custom,
            target_url: "https://shop.example.com/?ref=abc".to_string(),
            tracking_url: "https://aff.example.com/ref/a1b2c3d4".to_string(),
            is_active: true,
            expires_at: None,
            click_count: 0,
            conversion_count: 0,
            revenue: Decimal::ZERO,
            last_click_at: None,
            created_at: now,
        };

        assert!(!link.is_expired_at(now));

        link.expires_at = Some(now - Duration::seconds(1));
        assert!(link.is_expired_at(now));

        link.expires_at = Some(now + Duration::hours(1));
        assert!(!link.is_expired_at(now));
    }
}
