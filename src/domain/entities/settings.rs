//! Program-wide affiliate settings.

use chrono::{DateTime, TimeDelta, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::error::AppError;

/// Longest referral window or commission hold the program accepts.
pub const MAX_WINDOW_DAYS: i64 = 3650;

/// Tunable program parameters stored as a single row.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AffiliateSettings {
    pub minimum_payout: Decimal,
    pub currency: String,
    pub default_commission_rate: Decimal,
    pub auto_approve: bool,
    /// How long a captured referral token can still be attributed.
    pub referral_window_days: i64,
    /// Delay between a conversion and its commission `due_date`.
    pub commission_hold_days: i64,
    pub updated_at: DateTime<Utc>,
}

impl Default for AffiliateSettings {
    fn default() -> Self {
        Self {
            minimum_payout: Decimal::new(50, 0),
            currency: "USD".to_string(),
            default_commission_rate: Decimal::new(5, 2),
            auto_approve: false,
            referral_window_days: 30,
            commission_hold_days: 30,
            updated_at: Utc::now(),
        }
    }
}

impl AffiliateSettings {
    /// Applies a partial update, validating the resulting values.
    pub fn apply(&self, patch: SettingsPatch) -> Result<Self, AppError> {
        let mut next = self.clone();

        if let Some(minimum_payout) = patch.minimum_payout {
            if minimum_payout <= Decimal::ZERO {
                return Err(AppError::bad_request(
                    "Minimum payout must be positive",
                    json!({ "minimum_payout": minimum_payout }),
                ));
            }
            next.minimum_payout = minimum_payout;
        }

        if let Some(currency) = patch.currency {
            let currency = currency.trim().to_ascii_uppercase();
            if currency.len() != 3 || !currency.chars().all(|c| c.is_ascii_alphabetic()) {
                return Err(AppError::bad_request(
                    "Currency must be a 3-letter code",
                    json!({ "currency": currency }),
                ));
            }
            next.currency = currency;
        }

        if let Some(rate) = patch.default_commission_rate {
            validate_commission_rate(rate)?;
            next.default_commission_rate = rate;
        }

        if let Some(auto_approve) = patch.auto_approve {
            next.auto_approve = auto_approve;
        }

        if let Some(days) = patch.referral_window_days {
            validate_window_days("referral_window_days", days)?;
            next.referral_window_days = days;
        }

        if let Some(days) = patch.commission_hold_days {
            validate_window_days("commission_hold_days", days)?;
            next.commission_hold_days = days;
        }

        next.updated_at = Utc::now();
        Ok(next)
    }

    pub fn referral_window(&self) -> Result<TimeDelta, AppError> {
        window("referral_window_days", self.referral_window_days)
    }

    pub fn commission_hold(&self) -> Result<TimeDelta, AppError> {
        window("commission_hold_days", self.commission_hold_days)
    }
}

fn validate_window_days(field: &'static str, days: i64) -> Result<(), AppError> {
    if !(1..=MAX_WINDOW_DAYS).contains(&days) {
        return Err(AppError::bad_request(
            format!("{field} must be between 1 and {MAX_WINDOW_DAYS} days"),
            json!({ field: days }),
        ));
    }
    Ok(())
}

/// Converts a day count into a duration, refusing values outside the bounds
/// that [`AffiliateSettings::apply`] enforces.
fn window(field: &'static str, days: i64) -> Result<TimeDelta, AppError> {
    Some(days)
        .filter(|days| (1..=MAX_WINDOW_DAYS).contains(days))
        .and_then(TimeDelta::try_days)
        .ok_or_else(|| {
            AppError::internal(
                "Stored affiliate settings are out of range",
                json!({ field: days }),
            )
        })
}

/// Validates a base commission rate, which must lie in `(0, 1]`.
pub fn validate_commission_rate(rate: Decimal) -> Result<(), AppError> {
    if rate <= Decimal::ZERO || rate > Decimal::ONE {
        return Err(AppError::bad_request(
            "Commission rate must be greater than 0 and at most 1",
            json!({ "commission_rate": rate }),
        ));
    }
    Ok(())
}

/// Partial settings update. `None` fields are left unchanged.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SettingsPatch {
    pub minimum_payout: Option<Decimal>,
    pub currency: Option<String>,
    pub default_commission_rate: Option<Decimal>,
    pub auto_approve: Option<bool>,
    pub referral_window_days: Option<i64>,
    pub commission_hold_days: Option<i64>,
}
