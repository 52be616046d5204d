//! Withdrawal processing fee schedule.

use rust_decimal::{Decimal, RoundingStrategy};

use crate::domain::entities::WithdrawalMethod;

/// How a payout method is charged.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeeRule {
    /// Percentage of the amount, capped at a flat maximum.
    Percentage { rate: Decimal, cap: Decimal },
    Flat(Decimal),
}

pub fn fee_rule(method: WithdrawalMethod) -> FeeRule {
    match method {
        WithdrawalMethod::BankTransfer => FeeRule::Percentage {
            rate: Decimal::new(2, 2),
            cap: Decimal::new(50, 0),
        },
        WithdrawalMethod::Paypal => FeeRule::Percentage {
            rate: Decimal::new(25, 3),
            cap: Decimal::new(100, 0),
        },
        WithdrawalMethod::Crypto => FeeRule::Percentage {
            rate: Decimal::new(1, 2),
            cap: Decimal::new(50, 0),
        },
        WithdrawalMethod::DigitalWallet => FeeRule::Percentage {
            rate: Decimal::new(15, 3),
            cap: Decimal::new(75, 0),
        },
        WithdrawalMethod::Check => FeeRule::Flat(Decimal::new(5, 0)),
        WithdrawalMethod::WireTransfer => FeeRule::Flat(Decimal::new(25, 0)),
    }
}

/// Processing fee for withdrawing `amount` via `method`, in cents.
///
/// The fee never exceeds the amount itself.
pub fn processing_fee(amount: Decimal, method: WithdrawalMethod) -> Decimal {
    let fee = match fee_rule(method) {
        FeeRule::Percentage { rate, cap } => (amount * rate).min(cap),
        FeeRule::Flat(fee) => fee,
    };

    fee.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
        .min(amount)
}

/// Splits `amount` into `(fee, net)` so that `fee + net == amount`.
pub fn split(amount: Decimal, method: WithdrawalMethod) -> (Decimal, Decimal) {
    let fee = processing_fee(amount, method);
    (fee, amount - fee)
}
