//! Withdrawal requests, fee accounting and the payout lifecycle.
//!
//! `PENDING → PROCESSING → COMPLETED`. The requested amount is reserved from
//! the affiliate's available balance when the request is accepted; there is
//! no failure or reversal branch, so a withdrawal whose settlement fails
//! stays PROCESSING with its funds reserved.

use std::sync::Arc;

use chrono::Utc;
use rust_decimal::Decimal;
use serde_json::json;
use tracing::{info, warn};

use super::activity_log::ActivityLog;
use super::settings_service::SettingsService;
use crate::domain::entities::{
    ActivityMetadata, ActivityType, NewWithdrawal, PayoutDestination, Withdrawal,
    WithdrawalMethod, WithdrawalStatus,
};
use crate::domain::fees;
use crate::domain::repositories::{AffiliateRepository, WithdrawalRepository};
use crate::error::AppError;
use crate::infrastructure::settlement::SettlementGateway;
use crate::utils::code_generator::generate_withdrawal_reference;
use crate::utils::retry::retry_on_conflict;

#[derive(Debug, Clone)]
pub struct WithdrawalRequest {
    pub affiliate_id: i64,
    pub amount: Decimal,
    pub method: WithdrawalMethod,
    pub destination: PayoutDestination,
}

pub struct WithdrawalService {
    affiliates: Arc<dyn AffiliateRepository>,
    withdrawals: Arc<dyn WithdrawalRepository>,
    settings: Arc<SettingsService>,
    activity: Arc<ActivityLog>,
    gateway: Arc<dyn SettlementGateway>,
}

impl WithdrawalService {
    pub fn new(
        affiliates: Arc<dyn AffiliateRepository>,
        withdrawals: Arc<dyn WithdrawalRepository>,
        settings: Arc<SettingsService>,
        activity: Arc<ActivityLog>,
        gateway: Arc<dyn SettlementGateway>,
    ) -> Self {
        Self {
            affiliates,
            withdrawals,
            settings,
            activity,
            gateway,
        }
    }

    /// Accepts a payout request and reserves its full amount.
    ///
    /// The balance check and the decrement happen atomically in the store, so
    /// concurrent requests can never jointly overdraw the balance.
    ///
    /// # Errors
    ///
    /// - [`AppError::Validation`] for a non-positive amount or a destination
    ///   that is incomplete or does not match the method
    /// - [`AppError::NotFound`] if the affiliate does not exist
    /// - [`AppError::InvalidState`] if the affiliate is not ACTIVE
    /// - [`AppError::BelowMinimumPayout`] if the amount is under the minimum
    /// - [`AppError::InsufficientBalance`] if the amount exceeds the balance
    pub async fn request(&self, request: WithdrawalRequest) -> Result<Withdrawal, AppError> {
        let WithdrawalRequest {
            affiliate_id,
            amount,
            method,
            destination,
        } = request;

        if amount <= Decimal::ZERO {
            return Err(AppError::bad_request(
                "Withdrawal amount must be positive",
                json!({ "amount": amount }),
            ));
        }
        if destination.method() != method {
            return Err(AppError::bad_request(
                "Payout destination does not match the withdrawal method",
                json!({ "method": method, "destination_method": destination.method() }),
            ));
        }
        destination.validate()?;

        let affiliate = self
            .affiliates
            .find_by_id(affiliate_id)
            .await?
            .ok_or_else(|| {
                AppError::not_found("Affiliate not found", json!({ "affiliate_id": affiliate_id }))
            })?;
        affiliate.ensure_active()?;

        let settings = self.settings.current().await;
        if amount < settings.minimum_payout {
            return Err(AppError::below_minimum_payout(
                "Withdrawal amount is below the minimum payout",
                json!({ "amount": amount, "minimum_payout": settings.minimum_payout }),
            ));
        }
        if amount > affiliate.available_balance {
            return Err(insufficient_balance(amount, affiliate.available_balance));
        }

        let (processing_fee, net_amount) = fees::split(amount, method);
        let now = Utc::now();

        let withdrawals = self.withdrawals.as_ref();
        let reserved = retry_on_conflict("withdrawal reference", || {
            let candidate = generate_withdrawal_reference(now).map(|reference| NewWithdrawal {
                reference,
                affiliate_id,
                amount,
                method,
                processing_fee,
                net_amount,
                destination: destination.clone(),
                requested_at: now,
            });
            async move { withdrawals.create_reserved(candidate?).await }
        })
        .await?;

        let Some(withdrawal) = reserved else {
            // The balance or status changed between the read and the reservation.
            let latest = self.affiliates.find_by_id(affiliate_id).await?.ok_or_else(|| {
                AppError::not_found("Affiliate not found", json!({ "affiliate_id": affiliate_id }))
            })?;
            latest.ensure_active()?;
            return Err(insufficient_balance(amount, latest.available_balance));
        };

        metrics::counter!("affiliate_withdrawals_requested_total").increment(1);
        info!(
            withdrawal_id = withdrawal.id,
            affiliate_id,
            reference = %withdrawal.reference,
            amount = %amount,
            fee = %processing_fee,
            method = method.as_str(),
            "Withdrawal requested"
        );

        self.activity
            .record(
                affiliate_id,
                ActivityType::WithdrawalRequest,
                format!("Requested withdrawal of {amount} via {}", method.as_str()),
                ActivityMetadata {
                    withdrawal_id: Some(withdrawal.id),
                    amount: Some(amount),
                    method: Some(method.as_str().to_string()),
                    ..Default::default()
                },
            )
            .await;

        Ok(withdrawal)
    }

    /// Moves a PENDING withdrawal to PROCESSING, settles it and completes it.
    ///
    /// # Errors
    ///
    /// - [`AppError::NotFound`] if the withdrawal does not exist
    /// - [`AppError::InvalidState`] if it is not PENDING
    /// - any settlement error, in which case the withdrawal stays PROCESSING
    pub async fn process(
        &self,
        withdrawal_id: i64,
        processed_by: i64,
        notes: Option<String>,
    ) -> Result<Withdrawal, AppError> {
        let current = self.get(withdrawal_id).await?;
        ensure_status(&current, WithdrawalStatus::Pending)?;

        let processing = self
            .withdrawals
            .mark_processing(withdrawal_id, processed_by, notes.clone(), Utc::now())
            .await?
            .ok_or_else(|| changed_concurrently(withdrawal_id))?;

        info!(withdrawal_id, processed_by, "Withdrawal processing");

        self.activity
            .record(
                processing.affiliate_id,
                ActivityType::WithdrawalProcessing,
                format!("Withdrawal {} is being processed", processing.reference),
                ActivityMetadata {
                    withdrawal_id: Some(withdrawal_id),
                    actor_id: Some(processed_by),
                    notes,
                    amount: Some(processing.amount),
                    ..Default::default()
                },
            )
            .await;

        let payment_reference = self.gateway.settle(&processing).await.inspect_err(|e| {
            warn!(
                withdrawal_id,
                error = %e,
                "Settlement failed, withdrawal left in processing"
            );
        })?;

        self.complete(withdrawal_id, payment_reference).await
    }

    /// Moves a PROCESSING withdrawal to COMPLETED and adds its full amount to
    /// the affiliate's `total_withdrawn`.
    ///
    /// # Errors
    ///
    /// - [`AppError::NotFound`] if the withdrawal does not exist
    /// - [`AppError::InvalidState`] if it is not PROCESSING
    pub async fn complete(
        &self,
        withdrawal_id: i64,
        payment_reference: String,
    ) -> Result<Withdrawal, AppError> {
        let payment_reference = payment_reference.trim().to_string();
        if payment_reference.is_empty() {
            return Err(AppError::bad_request(
                "Payment reference is required",
                json!({ "withdrawal_id": withdrawal_id }),
            ));
        }

        let current = self.get(withdrawal_id).await?;
        ensure_status(&current, WithdrawalStatus::Processing)?;

        let completed = self
            .withdrawals
            .mark_completed(withdrawal_id, payment_reference.clone(), Utc::now())
            .await?
            .ok_or_else(|| changed_concurrently(withdrawal_id))?;

        metrics::counter!("affiliate_withdrawals_completed_total").increment(1);
        info!(
            withdrawal_id,
            affiliate_id = completed.affiliate_id,
            payment_reference = %payment_reference,
            "Withdrawal completed"
        );

        self.activity
            .record(
                completed.affiliate_id,
                ActivityType::WithdrawalCompleted,
                format!("Withdrawal {} completed", completed.reference),
                ActivityMetadata {
                    withdrawal_id: Some(withdrawal_id),
                    amount: Some(completed.amount),
                    payment_reference: Some(payment_reference),
                    ..Default::default()
                },
            )
            .await;

        Ok(completed)
    }

    pub async fn get(&self, withdrawal_id: i64) -> Result<Withdrawal, AppError> {
        self.withdrawals
            .find_by_id(withdrawal_id)
            .await?
            .ok_or_else(|| {
                AppError::not_found(
                    "Withdrawal not found",
                    json!({ "withdrawal_id": withdrawal_id }),
                )
            })
    }

    pub async fn list(&self, affiliate_id: i64) -> Result<Vec<Withdrawal>, AppError> {
        self.withdrawals.list_by_affiliate(affiliate_id).await
    }
}

fn ensure_status(withdrawal: &Withdrawal, expected: WithdrawalStatus) -> Result<(), AppError> {
    if withdrawal.status == expected {
        return Ok(());
    }

    Err(AppError::invalid_state(
        format!("Withdrawal is not {}", expected.as_str().to_lowercase()),
        json!({ "withdrawal_id": withdrawal.id, "status": withdrawal.status }),
    ))
}

fn changed_concurrently(withdrawal_id: i64) -> AppError {
    AppError::invalid_state(
        "Withdrawal changed state concurrently",
        json!({ "withdrawal_id": withdrawal_id }),
    )
}

fn insufficient_balance(amount: Decimal, available: Decimal) -> AppError {
    AppError::insufficient_balance(
        "Insufficient available balance",
        json!({ "amount": amount, "available_balance": available }),
    )
}
