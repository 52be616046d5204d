//! Append-only audit events tied to an affiliate.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::str::FromStr;

use super::{AffiliateStatus, AffiliateTier};
use crate::error::AppError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ActivityType {
    Registration,
    Approval,
    Suspension,
    TierChange,
    LinkCreation,
    LinkDeactivated,
    ReferralCaptured,
    CommissionEarned,
    CommissionApproved,
    WithdrawalRequest,
    WithdrawalProcessing,
    WithdrawalCompleted,
}

impl ActivityType {
    pub const ALL: [ActivityType; 12] = [
        Self::Registration,
        Self::Approval,
        Self::Suspension,
        Self::TierChange,
        Self::LinkCreation,
        Self::LinkDeactivated,
        Self::ReferralCaptured,
        Self::CommissionEarned,
        Self::CommissionApproved,
        Self::WithdrawalRequest,
        Self::WithdrawalProcessing,
        Self::WithdrawalCompleted,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Registration => "REGISTRATION",
            Self::Approval => "APPROVAL",
            Self::Suspension => "SUSPENSION",
            Self::TierChange => "TIER_CHANGE",
            Self::LinkCreation => "LINK_CREATION",
            Self::LinkDeactivated => "LINK_DEACTIVATED",
            Self::ReferralCaptured => "REFERRAL_CAPTURED",
            Self::CommissionEarned => "COMMISSION_EARNED",
            Self::CommissionApproved => "COMMISSION_APPROVED",
            Self::WithdrawalRequest => "WITHDRAWAL_REQUEST",
            Self::WithdrawalProcessing => "WITHDRAWAL_PROCESSING",
            Self::WithdrawalCompleted => "WITHDRAWAL_COMPLETED",
        }
    }
}

impl FromStr for ActivityType {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| AppError::internal("Unknown activity type in store", json!({ "type": s })))
    }
}

/// Structured extension data for an activity.
///
/// Every key is optional; which ones are set depends on the activity type:
///
/// | Type | Keys |
/// |---|---|
/// | `REGISTRATION` | `auto_approved` |
/// | `APPROVAL` | `actor_id`, `notes`, `previous_status` |
/// | `SUSPENSION` | `actor_id`, `reason`, `links_deactivated` |
/// | `TIER_CHANGE` | `tier`, `commission_rate` |
/// | `LINK_CREATION`, `LINK_DEACTIVATED` | `link_id`, `short_code` |
/// | `REFERRAL_CAPTURED` | `referral_id`, `click_id`, `user_id` |
/// | `COMMISSION_EARNED`, `COMMISSION_APPROVED` | `commission_id`, `referral_id`, `amount`, `order_id` |
/// | `WITHDRAWAL_*` | `withdrawal_id`, `amount`, `method`, `actor_id`, `payment_reference` |
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ActivityMetadata {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub actor_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub auto_approved: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub previous_status: Option<AffiliateStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub links_deactivated: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tier: Option<AffiliateTier>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub commission_rate: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub link_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub short_code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub referral_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub click_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub commission_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub withdrawal_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub amount: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub method: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payment_reference: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Activity {
    pub id: i64,
    pub affiliate_id: i64,
    pub activity_type: ActivityType,
    pub description: String,
    pub metadata: ActivityMetadata,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewActivity {
    pub affiliate_id: i64,
    pub activity_type: ActivityType,
    pub description: String,
    pub metadata: ActivityMetadata,
}
