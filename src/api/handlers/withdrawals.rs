//! Handlers for withdrawal requests and processing.

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use validator::Validate;

use crate::api::dto::withdrawals::{
    CompleteWithdrawalRequest, ProcessWithdrawalRequest, RequestWithdrawalRequest,
};
use crate::application::services::WithdrawalRequest;
use crate::domain::entities::Withdrawal;
use crate::error::AppError;
use crate::state::AppState;

/// Requests a payout and reserves the amount from the available balance.
///
/// # Endpoint
///
/// `POST /api/affiliates/{id}/withdrawals`
///
/// # Errors
///
/// - 400 Bad Request for a bad amount or destination
/// - 404 Not Found if the affiliate does not exist
/// - 409 Conflict (`invalid_state`) if the affiliate is not active
/// - 422 Unprocessable Entity (`below_minimum_payout`, `insufficient_balance`)
pub async fn request_withdrawal_handler(
    State(state): State<AppState>,
    Path(affiliate_id): Path<i64>,
    Json(payload): Json<RequestWithdrawalRequest>,
) -> Result<(StatusCode, Json<Withdrawal>), AppError> {
    let withdrawal = state
        .withdrawal_service
        .request(WithdrawalRequest {
            affiliate_id,
            amount: payload.amount,
            method: payload.method,
            destination: payload.destination,
        })
        .await?;

    Ok((StatusCode::CREATED, Json(withdrawal)))
}

/// `GET /api/affiliates/{id}/withdrawals`
pub async fn list_withdrawals_handler(
    State(state): State<AppState>,
    Path(affiliate_id): Path<i64>,
) -> Result<Json<Vec<Withdrawal>>, AppError> {
    state.affiliate_service.get(affiliate_id).await?;
    Ok(Json(state.withdrawal_service.list(affiliate_id).await?))
}

/// `GET /api/withdrawals/{id}`
pub async fn get_withdrawal_handler(
    State(state): State<AppState>,
    Path(withdrawal_id): Path<i64>,
) -> Result<Json<Withdrawal>, AppError> {
    Ok(Json(state.withdrawal_service.get(withdrawal_id).await?))
}

/// Processes a PENDING withdrawal through settlement to COMPLETED.
///
/// # Endpoint
///
/// `POST /api/withdrawals/{id}/process`
///
/// If settlement fails the withdrawal stays PROCESSING and the error is
/// returned.
pub async fn process_withdrawal_handler(
    State(state): State<AppState>,
    Path(withdrawal_id): Path<i64>,
    Json(payload): Json<ProcessWithdrawalRequest>,
) -> Result<Json<Withdrawal>, AppError> {
    payload.validate()?;

    let withdrawal = state
        .withdrawal_service
        .process(withdrawal_id, payload.processed_by, payload.notes)
        .await?;

    Ok(Json(withdrawal))
}

/// Completes a PROCESSING withdrawal with an externally obtained payment
/// reference.
///
/// # Endpoint
///
/// `POST /api/withdrawals/{id}/complete`
pub async fn complete_withdrawal_handler(
    State(state): State<AppState>,
    Path(withdrawal_id): Path<i64>,
    Json(payload): Json<CompleteWithdrawalRequest>,
) -> Result<Json<Withdrawal>, AppError> {
    payload.validate()?;

    let withdrawal = state
        .withdrawal_service
        .complete(withdrawal_id, payload.payment_reference)
        .await?;

    Ok(Json(withdrawal))
}
