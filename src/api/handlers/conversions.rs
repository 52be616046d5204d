//! Handlers for attribution capture, conversions and commissions.

use axum::{
    Json,
    extract::{Path, State},
};
use validator::Validate;

use crate::api::dto::conversions::{
    AttributeUserRequest, AttributionResponse, ConversionResponse, TrackConversionRequest,
};
use crate::domain::entities::Commission;
use crate::error::AppError;
use crate::state::AppState;

/// Stores the referral attribution carried by a token for a user.
///
/// # Endpoint
///
/// `POST /api/attributions`
///
/// # Request Body
///
/// ```json
/// { "user_id": 500, "referral_token": "eyJhZmZpbGlhdGVfY29kZSI6..." }
/// ```
///
/// # Errors
///
/// Returns 400 Bad Request for a malformed or tampered token.
pub async fn attribute_user_handler(
    State(state): State<AppState>,
    Json(payload): Json<AttributeUserRequest>,
) -> Result<Json<AttributionResponse>, AppError> {
    payload.validate()?;

    let attribution = state
        .conversion_service
        .attribute_user(payload.user_id, &payload.referral_token)
        .await?;

    Ok(Json(AttributionResponse {
        attributed: attribution.is_some(),
        attribution,
    }))
}

/// Books a conversion for the user's attributed affiliate.
///
/// # Endpoint
///
/// `POST /api/conversions`
///
/// # Request Body
///
/// ```json
/// {
///   "user_id": 500,
///   "conversion_type": "sale",
///   "conversion_value": "1000.00",
///   "order_id": "ORD-1001"       // optional
/// }
/// ```
///
/// # Response
///
/// `{"attributed": false}` when the user has no live attribution. Otherwise
/// the booked commission, referral and updated affiliate.
pub async fn track_conversion_handler(
    State(state): State<AppState>,
    Json(payload): Json<TrackConversionRequest>,
) -> Result<Json<ConversionResponse>, AppError> {
    payload.validate()?;

    let record = state
        .conversion_service
        .track_conversion(payload.into())
        .await?;

    Ok(Json(ConversionResponse {
        attributed: record.is_some(),
        record,
    }))
}

/// `GET /api/affiliates/{id}/commissions`
pub async fn list_commissions_handler(
    State(state): State<AppState>,
    Path(affiliate_id): Path<i64>,
) -> Result<Json<Vec<Commission>>, AppError> {
    state.affiliate_service.get(affiliate_id).await?;
    Ok(Json(
        state.conversion_service.list_commissions(affiliate_id).await?,
    ))
}

/// Moves a PENDING commission to APPROVED.
///
/// # Endpoint
///
/// `POST /api/commissions/{id}/approve`
pub async fn approve_commission_handler(
    State(state): State<AppState>,
    Path(commission_id): Path<i64>,
) -> Result<Json<Commission>, AppError> {
    Ok(Json(
        state
            .conversion_service
            .approve_commission(commission_id)
            .await?,
    ))
}
