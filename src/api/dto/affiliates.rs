//! DTOs for affiliate lifecycle endpoints.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use validator::Validate;

use super::pagination::{PaginationMeta, PaginationParams};
use crate::domain::entities::{Affiliate, AffiliateProfile, AffiliateStatus, AffiliateTier};

/// Request body for `POST /api/affiliates`.
#[derive(Debug, Deserialize, Validate)]
pub struct RegisterAffiliateRequest {
    #[validate(range(min = 1))]
    pub user_id: i64,

    #[validate(length(min = 1, max = 100))]
    pub display_name: Option<String>,

    #[validate(url(message = "Invalid URL format"))]
    pub website: Option<String>,
}

impl RegisterAffiliateRequest {
    pub fn profile(&self) -> AffiliateProfile {
        AffiliateProfile {
            display_name: self.display_name.clone(),
            website: self.website.clone(),
        }
    }
}

#[derive(Debug, Deserialize, Validate)]
pub struct ApproveAffiliateRequest {
    pub approved_by: i64,

    #[validate(length(max = 1000))]
    pub notes: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct SuspendAffiliateRequest {
    pub suspended_by: i64,

    #[validate(length(min = 1, max = 1000))]
    pub reason: String,
}

/// Request body for `PATCH /api/affiliates/{id}/terms`.
#[derive(Debug, Deserialize)]
pub struct UpdateTermsRequest {
    pub tier: Option<AffiliateTier>,
    pub commission_rate: Option<Decimal>,
}

/// Query string for `GET /api/affiliates`.
#[derive(Debug, Deserialize)]
pub struct AffiliateListQuery {
    pub status: Option<AffiliateStatus>,

    #[serde(flatten)]
    pub pagination: PaginationParams,
}

#[derive(Debug, Serialize)]
pub struct AffiliateListResponse {
    pub pagination: PaginationMeta,
    pub items: Vec<Affiliate>,
}
