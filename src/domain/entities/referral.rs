//! Referral and attribution entities.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::str::FromStr;

use crate::error::AppError;

/// Progress of a referral from first attribution to paid conversion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReferralStatus {
    Pending,
    Confirmed,
    Converted,
}

impl ReferralStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::Confirmed => "CONFIRMED",
            Self::Converted => "CONVERTED",
        }
    }

    /// Open referrals can still receive a conversion.
    pub fn is_open(&self) -> bool {
        matches!(self, Self::Pending | Self::Confirmed)
    }
}

impl FromStr for ReferralStatus {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PENDING" => Ok(Self::Pending),
            "CONFIRMED" => Ok(Self::Confirmed),
            "CONVERTED" => Ok(Self::Converted),
            _ => Err(AppError::internal(
                "Unknown referral status in store",
                json!({ "status": s }),
            )),
        }
    }
}

/// One affiliate credited with bringing in one user.
///
/// At most one open (PENDING/CONFIRMED) referral exists per
/// `(affiliate_id, referred_user_id)` pair.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Referral {
    pub id: i64,
    pub affiliate_id: i64,
    pub referred_user_id: i64,
    pub link_id: Option<i64>,
    pub click_id: Option<i64>,
    pub status: ReferralStatus,
    pub conversion_type: Option<String>,
    pub conversion_value: Option<Decimal>,
    pub commission_amount: Option<Decimal>,
    pub converted_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// Input data for opening a referral.
#[derive(Debug, Clone)]
pub struct NewReferral {
    pub affiliate_id: i64,
    pub referred_user_id: i64,
    pub link_id: Option<i64>,
    pub click_id: Option<i64>,
    pub status: ReferralStatus,
}

/// A user's stored referral attribution, written when the referral token is
/// captured and read back when the user converts.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Attribution {
    pub user_id: i64,
    pub affiliate_code: String,
    pub token: String,
    pub click_id: Option<i64>,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl Attribution {
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_open_statuses() {
        assert!(ReferralStatus::Pending.is_open());
        assert!(ReferralStatus::Confirmed.is_open());
        assert!(!ReferralStatus::Converted.is_open());
    }

    #[test]
    fn test_attribution_expiry() {
        let now = Utc::now();
        let attribution = Attribution {
            user_id: 7,
            affiliate_code: "jane1234".to_string(),
            token: "t".to_string(),
            click_id: None,
            expires_at: now + Duration::days(30),
            created_at: now,
        };

        assert!(!attribution.is_expired_at(now));
        assert!(attribution.is_expired_at(now + Duration::days(30)));
    }
}
