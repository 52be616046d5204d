//! Handlers for program settings.

use axum::{Json, extract::State};

use crate::domain::entities::{AffiliateSettings, SettingsPatch};
use crate::error::AppError;
use crate::state::AppState;

/// `GET /api/settings`
pub async fn get_settings_handler(State(state): State<AppState>) -> Json<AffiliateSettings> {
    Json(state.settings_service.current().await)
}

/// Applies a partial settings update.
///
/// # Endpoint
///
/// `PATCH /api/settings`
///
/// ```json
/// { "minimum_payout": "25.00", "auto_approve": true }
/// ```
pub async fn update_settings_handler(
    State(state): State<AppState>,
    Json(patch): Json<SettingsPatch>,
) -> Result<Json<AffiliateSettings>, AppError> {
    Ok(Json(state.settings_service.update(patch).await?))
}
