//! DTOs for tracking link endpoints.

use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::collections::BTreeMap;
use validator::Validate;

use crate::application::services::LinkOptions;

/// Request body for `POST /api/affiliates/{id}/links`.
#[derive(Debug, Default, Deserialize, Validate)]
pub struct CreateLinkRequest {
    /// Destination; the public base URL when absent.
    #[validate(url(message = "Invalid URL format"))]
    pub target_url: Option<String>,

    #[validate(length(max = 200))]
    pub title: Option<String>,

    #[validate(length(min = 1, max = 100))]
    pub campaign: Option<String>,

    #[validate(length(min = 1, max = 100))]
    pub source: Option<String>,

    #[validate(length(min = 1, max = 100))]
    pub medium: Option<String>,

    #[serde(default)]
    pub custom_params: BTreeMap<String, String>,

    pub expires_at: Option<DateTime<Utc>>,
}

impl From<CreateLinkRequest> for LinkOptions {
    fn from(req: CreateLinkRequest) -> Self {
        LinkOptions {
            target_url: req.target_url,
            title: req.title,
            campaign: req.campaign,
            source: req.source,
            medium: req.medium,
            custom_params: req.custom_params,
            expires_at: req.expires_at,
        }
    }
}
