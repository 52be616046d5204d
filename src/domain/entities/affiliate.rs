//! Affiliate entity and its status/tier enumerations.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::fmt;
use std::str::FromStr;

use crate::error::AppError;

/// Lifecycle state of an affiliate account.
///
/// `PENDING ⇄ ACTIVE ⇄ SUSPENDED`; suspension is reversed through approval.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AffiliateStatus {
    Pending,
    Active,
    Suspended,
}

impl AffiliateStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::Active => "ACTIVE",
            Self::Suspended => "SUSPENDED",
        }
    }
}

impl fmt::Display for AffiliateStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AffiliateStatus {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "PENDING" => Ok(Self::Pending),
            "ACTIVE" => Ok(Self::Active),
            "SUSPENDED" => Ok(Self::Suspended),
            _ => Err(AppError::bad_request(
                "Unknown affiliate status",
                json!({ "status": s }),
            )),
        }
    }
}

/// Ranked membership level. Higher tiers multiply the base commission rate
/// and unlock a flat bonus rate on every conversion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AffiliateTier {
    Bronze,
    Silver,
    Gold,
    Platinum,
    Diamond,
}

impl AffiliateTier {
    pub const ALL: [AffiliateTier; 5] = [
        Self::Bronze,
        Self::Silver,
        Self::Gold,
        Self::Platinum,
        Self::Diamond,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Bronze => "BRONZE",
            Self::Silver => "SILVER",
            Self::Gold => "GOLD",
            Self::Platinum => "PLATINUM",
            Self::Diamond => "DIAMOND",
        }
    }

    /// Multiplier applied to the affiliate's base commission rate.
    pub fn multiplier(&self) -> Decimal {
        match self {
            Self::Bronze => Decimal::ONE,
            Self::Silver => Decimal::new(110, 2),
            Self::Gold => Decimal::new(125, 2),
            Self::Platinum => Decimal::new(140, 2),
            Self::Diamond => Decimal::new(160, 2),
        }
    }

    /// Flat bonus rate applied to the conversion value.
    pub fn bonus_rate(&self) -> Decimal {
        match self {
            Self::Bronze => Decimal::ZERO,
            Self::Silver => Decimal::new(5, 3),
            Self::Gold => Decimal::new(1, 2),
            Self::Platinum => Decimal::new(2, 2),
            Self::Diamond => Decimal::new(3, 2),
        }
    }
}

impl fmt::Display for AffiliateTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AffiliateTier {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|tier| tier.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| AppError::bad_request("Unknown affiliate tier", json!({ "tier": s })))
    }
}

/// An affiliate account with its running ledger totals.
///
/// `available_balance` never drops below zero and never exceeds
/// `total_earnings - total_withdrawn`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Affiliate {
    pub id: i64,
    pub user_id: i64,
    pub affiliate_code: String,
    pub display_name: String,
    pub website: Option<String>,
    pub status: AffiliateStatus,
    pub tier: AffiliateTier,
    pub commission_rate: Decimal,
    pub total_sales: Decimal,
    pub total_earnings: Decimal,
    pub available_balance: Decimal,
    pub total_withdrawn: Decimal,
    pub referral_count: i64,
    pub approved_at: Option<DateTime<Utc>>,
    pub approved_by: Option<i64>,
    pub approval_notes: Option<String>,
    pub suspended_at: Option<DateTime<Utc>>,
    pub suspended_by: Option<i64>,
    pub suspension_reason: Option<String>,
    pub last_activity_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Affiliate {
    pub fn is_active(&self) -> bool {
        self.status == AffiliateStatus::Active
    }

    /// Fails with [`AppError::InvalidState`] unless the affiliate is active.
    pub fn ensure_active(&self) -> Result<(), AppError> {
        if self.is_active() {
            return Ok(());
        }

        Err(AppError::invalid_state(
            "Affiliate is not active",
            json!({ "affiliate_id": self.id, "status": self.status }),
        ))
    }
}

/// Registration data supplied by the caller.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AffiliateProfile {
    pub display_name: Option<String>,
    pub website: Option<String>,
}

/// Input data for creating a new affiliate record.
#[derive(Debug, Clone)]
pub struct NewAffiliate {
    pub user_id: i64,
    pub affiliate_code: String,
    pub display_name: String,
    pub website: Option<String>,
    pub status: AffiliateStatus,
    pub tier: AffiliateTier,
    pub commission_rate: Decimal,
    pub approved_at: Option<DateTime<Utc>>,
}

/// Result of a suspension, including the cascaded link deactivation.
#[derive(Debug, Clone)]
pub struct Suspension {
    pub affiliate: Affiliate,
    pub links_deactivated: u64,
}

#[cfg(test)]
pub(crate) fn sample_affiliate(id: i64, status: AffiliateStatus) -> Affiliate {
    let now = Utc::now();
    Affiliate {
        id,
        user_id: id * 10,
        affiliate_code: format!("aff{id:03}"),
        display_name: format!("Affiliate {id}"),
        website: None,
        status,
        tier: AffiliateTier::Bronze,
        commission_rate: Decimal::new(5, 2),
        total_sales: Decimal::ZERO,
        total_earnings: Decimal::ZERO,
        available_balance: Decimal::ZERO,
        total_withdrawn: Decimal::ZERO,
        referral_count: 0,
        approved_at: None,
        approved_by: None,
        approval_notes: None,
        suspended_at: None,
        suspended_by: None,
        suspension_reason: None,
        last_activity_at: None,
        created_at: now,
        updated_at: now,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tier_multipliers() {
        assert_eq!(AffiliateTier::Bronze.multiplier(), Decimal::ONE);
        assert_eq!(AffiliateTier::Silver.multiplier().to_string(), "1.10");
        assert_eq!(AffiliateTier::Gold.multiplier().to_string(), "1.25");
        assert_eq!(AffiliateTier::Platinum.multiplier().to_string(), "1.40");
        assert_eq!(AffiliateTier::Diamond.multiplier().to_string(), "1.60");
    }

    #[test]
    fn test_tier_bonus_rates() {
        assert!(AffiliateTier::Bronze.bonus_rate().is_zero());
        assert_eq!(AffiliateTier::Silver.bonus_rate().to_string(), "0.005");
        assert_eq!(AffiliateTier::Gold.bonus_rate().to_string(), "0.01");
        assert_eq!(AffiliateTier::Platinum.bonus_rate().to_string(), "0.02");
        assert_eq!(AffiliateTier::Diamond.bonus_rate().to_string(), "0.03");
    }

    #[test]
    fn test_tier_parse_case_insensitive() {
        assert_eq!("gold".parse::<AffiliateTier>().unwrap(), AffiliateTier::Gold);
        assert_eq!("DIAMOND".parse::<AffiliateTier>().unwrap(), AffiliateTier::Diamond);
        assert!("copper".parse::<AffiliateTier>().is_err());
    }

    #[test]
    fn test_status_round_trip_through_str() {
        for status in [
            AffiliateStatus::Pending,
            AffiliateStatus::Active,
            AffiliateStatus::Suspended,
        ] {
            assert_eq!(status.as_str().parse::<AffiliateStatus>().unwrap(), status);
        }
    }

    #[test]
    fn test_ensure_active() {
        assert!(sample_affiliate(1, AffiliateStatus::Active).ensure_active().is_ok());

        let err = sample_affiliate(1, AffiliateStatus::Suspended)
            .ensure_active()
            .unwrap_err();
        assert!(matches!(err, AppError::InvalidState { .. }));
    }
}
