//! DTOs for withdrawal endpoints.

use rust_decimal::Decimal;
use serde::Deserialize;
use validator::Validate;

use crate::domain::entities::{PayoutDestination, WithdrawalMethod};

/// Request body for `POST /api/affiliates/{id}/withdrawals`.
///
/// ```json
/// {
///   "amount": "500.00",
///   "method": "paypal",
///   "destination": { "method": "paypal", "email": "payouts@example.com" }
/// }
/// ```
#[derive(Debug, Deserialize)]
pub struct RequestWithdrawalRequest {
    pub amount: Decimal,
    pub method: WithdrawalMethod,
    pub destination: PayoutDestination,
}

#[derive(Debug, Deserialize, Validate)]
pub struct ProcessWithdrawalRequest {
    pub processed_by: i64,

    #[validate(length(max = 1000))]
    pub notes: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CompleteWithdrawalRequest {
    #[validate(length(min = 1, max = 200))]
    pub payment_reference: String,
}
