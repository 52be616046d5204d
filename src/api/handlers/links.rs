//! Handlers for tracking link management.

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use validator::Validate;

use crate::api::dto::links::CreateLinkRequest;
use crate::domain::entities::AffiliateLink;
use crate::error::AppError;
use crate::state::AppState;

/// Creates a tracking link for an active affiliate.
///
/// # Endpoint
///
/// `POST /api/affiliates/{id}/links`
///
/// # Request Body
///
/// ```json
/// {
///   "target_url": "https://shop.example.com/product/42",   // optional
///   "title": "Spring sale",                                 // optional
///   "campaign": "spring",                                   // optional
///   "custom_params": { "variant": "b" },                    // optional
///   "expires_at": "2026-12-31T23:59:59Z"                    // optional
/// }
/// ```
///
/// # Errors
///
/// - 400 Bad Request for an invalid URL, parameter or past expiry
/// - 404 Not Found if the affiliate does not exist
/// - 409 Conflict (`invalid_state`) if the affiliate is not active
pub async fn create_link_handler(
    State(state): State<AppState>,
    Path(affiliate_id): Path<i64>,
    Json(payload): Json<CreateLinkRequest>,
) -> Result<(StatusCode, Json<AffiliateLink>), AppError> {
    payload.validate()?;

    let link = state
        .link_service
        .generate_link(affiliate_id, payload.into())
        .await?;

    Ok((StatusCode::CREATED, Json(link)))
}

/// `GET /api/affiliates/{id}/links`
pub async fn list_links_handler(
    State(state): State<AppState>,
    Path(affiliate_id): Path<i64>,
) -> Result<Json<Vec<AffiliateLink>>, AppError> {
    state.affiliate_service.get(affiliate_id).await?;
    Ok(Json(state.link_service.list_links(affiliate_id).await?))
}

/// Deactivates one of the affiliate's links. Idempotent.
///
/// # Endpoint
///
/// `DELETE /api/affiliates/{id}/links/{link_id}`
pub async fn deactivate_link_handler(
    State(state): State<AppState>,
    Path((affiliate_id, link_id)): Path<(i64, i64)>,
) -> Result<Json<AffiliateLink>, AppError> {
    let link = state
        .link_service
        .deactivate_link(affiliate_id, link_id)
        .await?;

    Ok(Json(link))
}
