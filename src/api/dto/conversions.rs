//! DTOs for attribution, conversion and commission endpoints.

use regex::Regex;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;
use validator::Validate;

use crate::application::services::ConversionRequest;
use crate::domain::entities::{Attribution, ConversionRecord};

/// Conversion labels such as `sale` or `trial_upgrade`; lowercased by the service.
static CONVERSION_TYPE_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9_]+$").unwrap());

/// Request body for `POST /api/attributions`.
#[derive(Debug, Deserialize, Validate)]
pub struct AttributeUserRequest {
    pub user_id: i64,

    #[validate(length(min = 1, max = 2048))]
    pub referral_token: String,
}

/// `attributed` is false when the token was valid but there was nothing to
/// attribute (window elapsed, affiliate inactive).
#[derive(Debug, Serialize)]
pub struct AttributionResponse {
    pub attributed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attribution: Option<Attribution>,
}

/// Request body for `POST /api/conversions`.
#[derive(Debug, Deserialize, Validate)]
pub struct TrackConversionRequest {
    pub user_id: i64,

    #[validate(length(min = 1, max = 32))]
    #[validate(regex(path = "*CONVERSION_TYPE_REGEX"))]
    pub conversion_type: String,

    pub conversion_value: Decimal,

    #[validate(length(min = 1, max = 100))]
    pub order_id: Option<String>,

    #[validate(length(max = 100))]
    pub product_id: Option<String>,

    #[validate(length(max = 100))]
    pub campaign: Option<String>,
}

impl From<TrackConversionRequest> for ConversionRequest {
    fn from(req: TrackConversionRequest) -> Self {
        ConversionRequest {
            user_id: req.user_id,
            conversion_type: req.conversion_type,
            conversion_value: req.conversion_value,
            order_id: req.order_id,
            product_id: req.product_id,
            campaign: req.campaign,
        }
    }
}

/// `attributed` is false when the user had no live attribution; nothing was
/// written in that case.
#[derive(Debug, Serialize)]
pub struct ConversionResponse {
    pub attributed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub record: Option<ConversionRecord>,
}
