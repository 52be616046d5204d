//! Withdrawal entity, payout methods and destination details.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::str::FromStr;

use crate::error::AppError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WithdrawalStatus {
    Pending,
    Processing,
    Completed,
}

impl WithdrawalStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::Processing => "PROCESSING",
            Self::Completed => "COMPLETED",
        }
    }
}

impl FromStr for WithdrawalStatus {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PENDING" => Ok(Self::Pending),
            "PROCESSING" => Ok(Self::Processing),
            "COMPLETED" => Ok(Self::Completed),
            _ => Err(AppError::internal(
                "Unknown withdrawal status in store",
                json!({ "status": s }),
            )),
        }
    }
}

/// Supported payout methods.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WithdrawalMethod {
    BankTransfer,
    Paypal,
    Crypto,
    DigitalWallet,
    Check,
    WireTransfer,
}

impl WithdrawalMethod {
    pub const ALL: [WithdrawalMethod; 6] = [
        Self::BankTransfer,
        Self::Paypal,
        Self::Crypto,
        Self::DigitalWallet,
        Self::Check,
        Self::WireTransfer,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::BankTransfer => "bank_transfer",
            Self::Paypal => "paypal",
            Self::Crypto => "crypto",
            Self::DigitalWallet => "digital_wallet",
            Self::Check => "check",
            Self::WireTransfer => "wire_transfer",
        }
    }
}

impl FromStr for WithdrawalMethod {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|m| m.as_str() == s)
            .ok_or_else(|| {
                AppError::bad_request("Unsupported withdrawal method", json!({ "method": s }))
            })
    }
}

/// Method-specific payout destination.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "method", rename_all = "snake_case")]
pub enum PayoutDestination {
    BankTransfer {
        account_holder: String,
        account_number: String,
        routing_number: String,
        bank_name: Option<String>,
    },
    Paypal {
        email: String,
    },
    Crypto {
        wallet_address: String,
        network: String,
    },
    DigitalWallet {
        provider: String,
        handle: String,
    },
    Check {
        payee_name: String,
        mailing_address: String,
    },
    WireTransfer {
        account_holder: String,
        iban: String,
        swift_code: String,
        bank_name: Option<String>,
    },
}

impl PayoutDestination {
    pub fn method(&self) -> WithdrawalMethod {
        match self {
            Self::BankTransfer { .. } => WithdrawalMethod::BankTransfer,
            Self::Paypal { .. } => WithdrawalMethod::Paypal,
            Self::Crypto { .. } => WithdrawalMethod::Crypto,
            Self::DigitalWallet { .. } => WithdrawalMethod::DigitalWallet,
            Self::Check { .. } => WithdrawalMethod::Check,
            Self::WireTransfer { .. } => WithdrawalMethod::WireTransfer,
        }
    }

    /// Rejects destinations with blank required fields.
    pub fn validate(&self) -> Result<(), AppError> {
        let required: Vec<(&str, &str)> = match self {
            Self::BankTransfer {
                account_holder,
                account_number,
                routing_number,
                ..
            } => vec![
                ("account_holder", account_holder.as_str()),
                ("account_number", account_number.as_str()),
                ("routing_number", routing_number.as_str()),
            ],
            Self::Paypal { email } => vec![("email", email.as_str())],
            Self::Crypto {
                wallet_address,
                network,
            } => vec![("wallet_address", wallet_address.as_str()), ("network", network.as_str())],
            Self::DigitalWallet { provider, handle } => {
                vec![("provider", provider.as_str()), ("handle", handle.as_str())]
            }
            Self::Check {
                payee_name,
                mailing_address,
            } => vec![("payee_name", payee_name.as_str()), ("mailing_address", mailing_address.as_str())],
            Self::WireTransfer {
                account_holder,
                iban,
                swift_code,
                ..
            } => vec![
                ("account_holder", account_holder.as_str()),
                ("iban", iban.as_str()),
                ("swift_code", swift_code.as_str()),
            ],
        };

        if let Some((field, _)) = required.iter().find(|(_, value)| value.trim().is_empty()) {
            return Err(AppError::bad_request(
                "Payout destination is incomplete",
                json!({ "method": self.method(), "field": field }),
            ));
        }

        if let Self::Paypal { email } = self
            && !email.contains('@')
        {
            return Err(AppError::bad_request(
                "PayPal destination requires an email address",
                json!({ "email": email }),
            ));
        }

        Ok(())
    }
}

/// A payout request. Its `amount` was reserved from the affiliate's
/// available balance when the request was accepted.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Withdrawal {
    pub id: i64,
    pub reference: String,
    pub affiliate_id: i64,
    pub amount: Decimal,
    pub method: WithdrawalMethod,
    pub processing_fee: Decimal,
    pub net_amount: Decimal,
    pub destination: PayoutDestination,
    pub status: WithdrawalStatus,
    pub requested_at: DateTime<Utc>,
    pub processed_at: Option<DateTime<Utc>>,
    pub processed_by: Option<i64>,
    pub processing_notes: Option<String>,
    pub completed_at: Option<DateTime<Utc>>,
    pub payment_reference: Option<String>,
}

/// Input data for a reserved withdrawal.
#[derive(Debug, Clone)]
pub struct NewWithdrawal {
    pub reference: String,
    pub affiliate_id: i64,
    pub amount: Decimal,
    pub method: WithdrawalMethod,
    pub processing_fee: Decimal,
    pub net_amount: Decimal,
    pub destination: PayoutDestination,
    pub requested_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_method_parse() {
        assert_eq!(
            "paypal".parse::<WithdrawalMethod>().unwrap(),
            WithdrawalMethod::Paypal
        );
        assert_eq!(
            "wire_transfer".parse::<WithdrawalMethod>().unwrap(),
            WithdrawalMethod::WireTransfer
        );
        assert!("cash".parse::<WithdrawalMethod>().is_err());
    }

    #[test]
    fn test_destination_deserializes_by_method_tag() {
        let json = r#"{"method":"crypto","wallet_address":"0xabc","network":"ethereum"}"#;
        let destination: PayoutDestination = serde_json::from_str(json).unwrap();
        assert_eq!(destination.method(), WithdrawalMethod::Crypto);
    }

    #[test]
    fn test_destination_validate_blank_field() {
        let destination = PayoutDestination::Crypto {
            wallet_address: "  ".to_string(),
            network: "bitcoin".to_string(),
        };
        let err = destination.validate().unwrap_err();
        assert!(matches!(err, AppError::Validation { .. }));
    }

    #[test]
    fn test_destination_validate_paypal_email() {
        let bad = PayoutDestination::Paypal {
            email: "not-an-email".to_string(),
        };
        assert!(bad.validate().is_err());

        let good = PayoutDestination::Paypal {
            email: "payouts@example.com".to_string(),
        };
        assert!(good.validate().is_ok());
    }
}
