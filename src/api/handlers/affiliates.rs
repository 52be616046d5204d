//! Handlers for the affiliate lifecycle, activity and performance endpoints.

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use serde_json::json;
use validator::Validate;

use crate::api::dto::affiliates::{
    AffiliateListQuery, AffiliateListResponse, ApproveAffiliateRequest, RegisterAffiliateRequest,
    SuspendAffiliateRequest, UpdateTermsRequest,
};
use crate::api::dto::pagination::{DateFilterParams, LimitParams, PaginationMeta};
use crate::application::services::AffiliatePerformance;
use crate::domain::entities::{Activity, Affiliate};
use crate::error::AppError;
use crate::state::AppState;

const DEFAULT_ACTIVITY_LIMIT: i64 = 50;

/// Registers a platform user as an affiliate.
///
/// # Endpoint
///
/// `POST /api/affiliates`
///
/// # Request Body
///
/// ```json
/// {
///   "user_id": 42,
///   "display_name": "Jane Doe",          // optional
///   "website": "https://jane.example"    // optional
/// }
/// ```
///
/// # Errors
///
/// - 400 Bad Request if validation fails
/// - 404 Not Found if the user does not exist
/// - 409 Conflict (`already_affiliate`) if the user is already registered
pub async fn register_affiliate_handler(
    State(state): State<AppState>,
    Json(payload): Json<RegisterAffiliateRequest>,
) -> Result<(StatusCode, Json<Affiliate>), AppError> {
    payload.validate()?;

    let affiliate = state
        .affiliate_service
        .register(payload.user_id, payload.profile())
        .await?;

    Ok((StatusCode::CREATED, Json(affiliate)))
}

/// Lists affiliates, optionally filtered by status.
///
/// # Endpoint
///
/// `GET /api/affiliates?status=PENDING&page=1&page_size=25`
pub async fn list_affiliates_handler(
    State(state): State<AppState>,
    Query(query): Query<AffiliateListQuery>,
) -> Result<Json<AffiliateListResponse>, AppError> {
    let (page, page_size) = query
        .pagination
        .validate()
        .map_err(|e| AppError::bad_request(e, json!({})))?;

    let result = state
        .affiliate_service
        .list(query.status, i64::from(page), i64::from(page_size))
        .await?;

    Ok(Json(AffiliateListResponse {
        pagination: PaginationMeta::new(page, page_size, result.total),
        items: result.items,
    }))
}

/// `GET /api/affiliates/{id}`
pub async fn get_affiliate_handler(
    State(state): State<AppState>,
    Path(affiliate_id): Path<i64>,
) -> Result<Json<Affiliate>, AppError> {
    Ok(Json(state.affiliate_service.get(affiliate_id).await?))
}

/// Activates a PENDING or SUSPENDED affiliate.
///
/// # Endpoint
///
/// `POST /api/affiliates/{id}/approve`
///
/// # Errors
///
/// Returns 409 Conflict (`invalid_state`) if the affiliate is already active.
pub async fn approve_affiliate_handler(
    State(state): State<AppState>,
    Path(affiliate_id): Path<i64>,
    Json(payload): Json<ApproveAffiliateRequest>,
) -> Result<Json<Affiliate>, AppError> {
    payload.validate()?;

    let affiliate = state
        .affiliate_service
        .approve(affiliate_id, payload.approved_by, payload.notes)
        .await?;

    Ok(Json(affiliate))
}

/// Suspends an affiliate and deactivates all of its links.
///
/// # Endpoint
///
/// `POST /api/affiliates/{id}/suspend`
pub async fn suspend_affiliate_handler(
    State(state): State<AppState>,
    Path(affiliate_id): Path<i64>,
    Json(payload): Json<SuspendAffiliateRequest>,
) -> Result<Json<Affiliate>, AppError> {
    payload.validate()?;

    let affiliate = state
        .affiliate_service
        .suspend(affiliate_id, payload.reason, payload.suspended_by)
        .await?;

    Ok(Json(affiliate))
}

/// Changes an affiliate's tier and/or base commission rate.
///
/// # Endpoint
///
/// `PATCH /api/affiliates/{id}/terms`
///
/// ```json
/// { "tier": "GOLD", "commission_rate": "0.08" }
/// ```
pub async fn update_terms_handler(
    State(state): State<AppState>,
    Path(affiliate_id): Path<i64>,
    Json(payload): Json<UpdateTermsRequest>,
) -> Result<Json<Affiliate>, AppError> {
    let affiliate = state
        .affiliate_service
        .update_terms(affiliate_id, payload.tier, payload.commission_rate)
        .await?;

    Ok(Json(affiliate))
}

/// Most recent activity entries first.
///
/// # Endpoint
///
/// `GET /api/affiliates/{id}/activities?limit=50`
pub async fn list_activities_handler(
    State(state): State<AppState>,
    Path(affiliate_id): Path<i64>,
    Query(params): Query<LimitParams>,
) -> Result<Json<Vec<Activity>>, AppError> {
    state.affiliate_service.get(affiliate_id).await?;

    let activities = state
        .activity_log
        .list(affiliate_id, params.limit.unwrap_or(DEFAULT_ACTIVITY_LIMIT))
        .await?;

    Ok(Json(activities))
}

/// Click, conversion and earnings rollup for one affiliate.
///
/// # Endpoint
///
/// `GET /api/affiliates/{id}/performance?from=...&to=...`
///
/// # Query Parameters
///
/// - `from` (optional): Start date (RFC3339 format)
/// - `to` (optional): End date (RFC3339 format)
///
/// # Response
///
/// ```json
/// {
///   "affiliate_id": 1,
///   "total_clicks": 120,
///   "unique_clicks": 87,
///   "conversions": 6,
///   "conversion_rate": "5.00",
///   "total_sales": "1800.00",
///   "total_commission": "130.50",
///   "available_balance": "90.50",
///   "pending_commission_total": "40.00",
///   "top_links": [ ... ]
/// }
/// ```
pub async fn performance_handler(
    State(state): State<AppState>,
    Path(affiliate_id): Path<i64>,
    Query(params): Query<DateFilterParams>,
) -> Result<Json<AffiliatePerformance>, AppError> {
    let performance = state
        .analytics_service
        .get_performance(affiliate_id, params.into())
        .await?;

    Ok(Json(performance))
}
