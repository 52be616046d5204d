//! Commission entity and the conversion ledger entry that creates it.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::str::FromStr;

use super::{Affiliate, AffiliateTier, Referral};
use crate::domain::commission;
use crate::error::AppError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CommissionStatus {
    Pending,
    Approved,
    Paid,
}

impl CommissionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::Approved => "APPROVED",
            Self::Paid => "PAID",
        }
    }
}

impl FromStr for CommissionStatus {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PENDING" => Ok(Self::Pending),
            "APPROVED" => Ok(Self::Approved),
            "PAID" => Ok(Self::Paid),
            _ => Err(AppError::internal(
                "Unknown commission status in store",
                json!({ "status": s }),
            )),
        }
    }
}

/// Fixed set of optional keys attached to a commission.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CommissionMetadata {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub click_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub link_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub product_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub campaign: Option<String>,
    pub effective_rate: Decimal,
    pub base_commission: Decimal,
    pub tier_bonus: Decimal,
    pub performance_bonus_rate: Decimal,
    pub performance_bonus: Decimal,
}

/// A monetary credit owed to an affiliate for one conversion.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Commission {
    pub id: i64,
    pub affiliate_id: i64,
    pub referral_id: i64,
    pub commission_type: String,
    pub amount: Decimal,
    pub rate: Decimal,
    pub base_amount: Decimal,
    pub status: CommissionStatus,
    pub tier: AffiliateTier,
    pub order_id: Option<String>,
    pub metadata: CommissionMetadata,
    pub due_date: DateTime<Utc>,
    pub approved_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// Everything the store needs to book one conversion atomically.
///
/// The commission is priced by the store with [`ConversionEntry::price`]
/// while the affiliate row is locked, so neither the affiliate's terms nor
/// its month-to-date revenue can change underneath the booking.
#[derive(Debug, Clone)]
pub struct ConversionEntry {
    pub affiliate_id: i64,
    pub referred_user_id: i64,
    pub click_id: Option<i64>,
    pub link_id: Option<i64>,
    pub conversion_type: String,
    pub conversion_value: Decimal,
    pub order_id: Option<String>,
    /// Context keys; the breakdown keys are filled in by [`ConversionEntry::price`].
    pub metadata: CommissionMetadata,
    /// Commissions created at or after this instant count towards the
    /// performance bonus.
    pub month_start: DateTime<Utc>,
    pub due_date: DateTime<Utc>,
    pub occurred_at: DateTime<Utc>,
}

/// Commission terms for one entry, fixed against the locked affiliate.
#[derive(Debug, Clone, PartialEq)]
pub struct PricedConversion {
    pub amount: Decimal,
    pub effective_rate: Decimal,
    pub tier: AffiliateTier,
    pub metadata: CommissionMetadata,
}

impl ConversionEntry {
    /// Prices the conversion for `affiliate`, given the base revenue already
    /// booked since [`ConversionEntry::month_start`].
    pub fn price(
        &self,
        affiliate: &Affiliate,
        monthly_revenue: Decimal,
    ) -> Result<PricedConversion, AppError> {
        let breakdown = commission::calculate(
            affiliate.commission_rate,
            affiliate.tier,
            self.conversion_value,
            monthly_revenue,
        )?;

        Ok(PricedConversion {
            amount: breakdown.total,
            effective_rate: breakdown.effective_rate,
            tier: affiliate.tier,
            metadata: CommissionMetadata {
                effective_rate: breakdown.effective_rate,
                base_commission: breakdown.base_commission,
                tier_bonus: breakdown.tier_bonus,
                performance_bonus_rate: breakdown.performance_bonus_rate,
                performance_bonus: breakdown.performance_bonus,
                ..self.metadata.clone()
            },
        })
    }
}

/// Outcome of a booked conversion.
#[derive(Debug, Clone, Serialize)]
pub struct ConversionRecord {
    pub commission: Commission,
    pub referral: Referral,
    pub affiliate: Affiliate,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entities::{AffiliateStatus, sample_affiliate};

    fn entry(value: i64) -> ConversionEntry {
        let now = Utc::now();
        ConversionEntry {
            affiliate_id: 1,
            referred_user_id: 500,
            click_id: Some(9),
            link_id: Some(4),
            conversion_type: "sale".to_string(),
            conversion_value: Decimal::new(value, 0),
            order_id: Some("ORD-1".to_string()),
            metadata: CommissionMetadata {
                order_id: Some("ORD-1".to_string()),
                campaign: Some("spring".to_string()),
                ..Default::default()
            },
            month_start: now,
            due_date: now,
            occurred_at: now,
        }
    }

    fn gold() -> Affiliate {
        let mut affiliate = sample_affiliate(1, AffiliateStatus::Active);
        affiliate.tier = AffiliateTier::Gold;
        affiliate
    }

    #[test]
    fn test_price_uses_affiliate_terms() {
        let priced = entry(1000).price(&gold(), Decimal::ZERO).unwrap();

        assert_eq!(priced.amount, Decimal::new(7250, 2));
        assert_eq!(priced.tier, AffiliateTier::Gold);
        assert_eq!(priced.effective_rate, Decimal::new(625, 4));
        assert_eq!(priced.metadata.campaign.as_deref(), Some("spring"));
        assert_eq!(priced.metadata.tier_bonus, Decimal::new(10, 0));
    }

    #[test]
    fn test_price_includes_month_to_date_revenue() {
        let priced = entry(1000).price(&gold(), Decimal::new(99_500, 0)).unwrap();

        assert_eq!(priced.amount, Decimal::new(12250, 2));
        assert_eq!(priced.metadata.performance_bonus, Decimal::new(50, 0));
        assert_eq!(priced.metadata.order_id.as_deref(), Some("ORD-1"));
    }
}
