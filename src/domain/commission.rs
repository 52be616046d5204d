//! Commission calculation.
//!
//! A conversion earns three components, all proportional to the conversion
//! value:
//!
//! - base: `value × commission_rate × tier multiplier`
//! - tier bonus: `value × tier bonus rate`
//! - performance bonus: `value × performance rate`, where the performance rate
//!   is picked from the affiliate's month-to-date revenue including this
//!   conversion
//!
//! Amounts are kept exact; no intermediate rounding is applied.

use rust_decimal::Decimal;
use serde::Serialize;
use serde_json::json;

use crate::domain::entities::AffiliateTier;
use crate::error::AppError;

/// Largest conversion value the ledger's `NUMERIC(14,4)` columns can hold.
pub const MAX_CONVERSION_VALUE: Decimal = Decimal::from_parts(276_447_231, 23_283, 0, false, 4);

/// Month-to-date revenue thresholds, highest first.
const PERFORMANCE_THRESHOLDS: [(i64, i64); 4] = [
    // (revenue threshold, rate in hundredths)
    (100_000, 5),
    (50_000, 3),
    (25_000, 2),
    (10_000, 1),
];

/// Itemized commission for a single conversion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CommissionBreakdown {
    pub effective_rate: Decimal,
    pub base_commission: Decimal,
    pub tier_bonus: Decimal,
    pub performance_bonus_rate: Decimal,
    pub performance_bonus: Decimal,
    pub total: Decimal,
}

/// Returns the performance bonus rate for a month-to-date revenue.
///
/// The highest threshold met wins.
pub fn performance_bonus_rate(monthly_revenue: Decimal) -> Decimal {
    PERFORMANCE_THRESHOLDS
        .iter()
        .find(|(threshold, _)| monthly_revenue >= Decimal::from(*threshold))
        .map(|(_, hundredths)| Decimal::new(*hundredths, 2))
        .unwrap_or(Decimal::ZERO)
}

/// Checks that a conversion value is positive and fits the ledger.
pub fn validate_conversion_value(value: Decimal) -> Result<(), AppError> {
    if value <= Decimal::ZERO || value > MAX_CONVERSION_VALUE {
        return Err(AppError::bad_request(
            "Conversion value must be positive and at most 9999999999.9999",
            json!({ "conversion_value": value }),
        ));
    }
    Ok(())
}

/// Computes the commission owed for a conversion.
///
/// `monthly_revenue_to_date` is the base amount already booked this calendar
/// month, excluding `conversion_value`.
///
/// # Errors
///
/// Returns [`AppError::Validation`] if any intermediate amount overflows.
pub fn calculate(
    commission_rate: Decimal,
    tier: AffiliateTier,
    conversion_value: Decimal,
    monthly_revenue_to_date: Decimal,
) -> Result<CommissionBreakdown, AppError> {
    let overflow = || {
        AppError::bad_request(
            "Commission amount out of range",
            json!({
                "conversion_value": conversion_value,
                "monthly_revenue": monthly_revenue_to_date,
            }),
        )
    };

    let effective_rate = commission_rate
        .checked_mul(tier.multiplier())
        .ok_or_else(overflow)?;
    let base_commission = conversion_value
        .checked_mul(effective_rate)
        .ok_or_else(overflow)?;
    let tier_bonus = conversion_value
        .checked_mul(tier.bonus_rate())
        .ok_or_else(overflow)?;
    let month_total = monthly_revenue_to_date
        .checked_add(conversion_value)
        .ok_or_else(overflow)?;
    let performance_bonus_rate = performance_bonus_rate(month_total);
    let performance_bonus = conversion_value
        .checked_mul(performance_bonus_rate)
        .ok_or_else(overflow)?;
    let total = base_commission
        .checked_add(tier_bonus)
        .and_then(|sum| sum.checked_add(performance_bonus))
        .ok_or_else(overflow)?;

    Ok(CommissionBreakdown {
        effective_rate,
        base_commission,
        tier_bonus,
        performance_bonus_rate,
        performance_bonus,
        total,
    })
}
