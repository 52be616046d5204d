//! Tracking link generation and click resolution.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde_json::json;
use tracing::{info, warn};

use super::activity_log::ActivityLog;
use crate::domain::entities::{
    ActivityMetadata, ActivityType, AffiliateLink, LinkType, NewAffiliateLink, NewLinkClick,
    RequestContext,
};
use crate::domain::referral_token::{ReferralClaims, ReferralTokenCodec};
use crate::domain::repositories::{AffiliateRepository, LinkRepository};
use crate::error::AppError;
use crate::utils::code_generator::generate_short_code;
use crate::utils::retry::retry_on_conflict;
use crate::utils::url_builder::{parse_target_url, redirect_url, with_query_params};

const DEFAULT_UTM_SOURCE: &str = "affiliate";
const DEFAULT_UTM_MEDIUM: &str = "referral";

/// Query parameter carrying the affiliate code on the target URL.
const REF_PARAM: &str = "ref";

/// Caller-supplied options for a new tracking link.
#[derive(Debug, Clone, Default)]
pub struct LinkOptions {
    /// Destination; defaults to the public base URL.
    pub target_url: Option<String>,
    pub title: Option<String>,
    pub campaign: Option<String>,
    pub source: Option<String>,
    pub medium: Option<String>,
    pub custom_params: BTreeMap<String, String>,
    pub expires_at: Option<DateTime<Utc>>,
}

/// Outcome of resolving a short code.
#[derive(Debug, Clone)]
pub struct ClickResolution {
    /// Where the visitor should be sent.
    pub redirect_url: String,
    pub referral_token: String,
    /// `None` if the click could not be stored.
    pub click_id: Option<i64>,
}

pub struct LinkService {
    affiliates: Arc<dyn AffiliateRepository>,
    links: Arc<dyn LinkRepository>,
    activity: Arc<ActivityLog>,
    tokens: ReferralTokenCodec,
    public_base_url: String,
}

impl LinkService {
    pub fn new(
        affiliates: Arc<dyn AffiliateRepository>,
        links: Arc<dyn LinkRepository>,
        activity: Arc<ActivityLog>,
        tokens: ReferralTokenCodec,
        public_base_url: impl Into<String>,
    ) -> Self {
        Self {
            affiliates,
            links,
            activity,
            tokens,
            public_base_url: public_base_url.into(),
        }
    }

    /// Creates a tracking link for an active affiliate.
    ///
    /// The stored target URL carries `utm_source`, `utm_medium` and
    /// `utm_campaign` (default: the affiliate code), the custom parameters and
    /// a `ref={affiliate_code}` marker. The public link is
    /// `{base}/ref/{short_code}`.
    ///
    /// # Errors
    ///
    /// - [`AppError::NotFound`] if the affiliate does not exist
    /// - [`AppError::InvalidState`] if it is not ACTIVE
    /// - [`AppError::Validation`] for a bad target URL, parameter or expiry
    pub async fn generate_link(
        &self,
        affiliate_id: i64,
        options: LinkOptions,
    ) -> Result<AffiliateLink, AppError> {
        let affiliate = self
            .affiliates
            .find_by_id(affiliate_id)
            .await?
            .ok_or_else(|| {
                AppError::not_found("Affiliate not found", json!({ "affiliate_id": affiliate_id }))
            })?;
        affiliate.ensure_active()?;

        if let Some(expires_at) = options.expires_at
            && expires_at <= Utc::now()
        {
            return Err(AppError::bad_request(
                "Expiry must be in the future",
                json!({ "expires_at": expires_at }),
            ));
        }

        let target = options
            .target_url
            .as_deref()
            .unwrap_or(&self.public_base_url);
        let target = parse_target_url(target).map_err(|e| {
            AppError::bad_request("Invalid target URL", json!({ "reason": e.to_string() }))
        })?;
        let link_type = LinkType::classify(target.path());

        let mut params = vec![
            (
                "utm_source".to_string(),
                options.source.unwrap_or_else(|| DEFAULT_UTM_SOURCE.to_string()),
            ),
            (
                "utm_medium".to_string(),
                options.medium.unwrap_or_else(|| DEFAULT_UTM_MEDIUM.to_string()),
            ),
            (
                "utm_campaign".to_string(),
                options
                    .campaign
                    .unwrap_or_else(|| affiliate.affiliate_code.clone()),
            ),
        ];
        for (key, value) in options.custom_params {
            let key = key.trim().to_string();
            if key.is_empty() || key == REF_PARAM {
                return Err(AppError::bad_request(
                    "Invalid custom parameter name",
                    json!({ "param": key }),
                ));
            }
            params.retain(|(existing, _)| *existing != key);
            params.push((key, value));
        }
        params.push((REF_PARAM.to_string(), affiliate.affiliate_code.clone()));

        let target_url = with_query_params(target, &params).to_string();
        let title = options.title.filter(|t| !t.trim().is_empty());

        let link = retry_on_conflict("short code", || {
            let candidate = generate_short_code().map(|short_code| NewAffiliateLink {
                affiliate_id,
                tracking_url: redirect_url(&self.public_base_url, &short_code),
                short_code,
                title: title.clone(),
                link_type,
                target_url: target_url.clone(),
                expires_at: options.expires_at,
            });
            let links = self.links.as_ref();
            async move { links.create(candidate?).await }
        })
        .await?;

        info!(
            affiliate_id,
            link_id = link.id,
            short_code = %link.short_code,
            link_type = link.link_type.as_str(),
            "Tracking link created"
        );

        self.activity
            .record(
                affiliate_id,
                ActivityType::LinkCreation,
                format!("Created {} link {}", link.link_type.as_str(), link.short_code),
                ActivityMetadata {
                    link_id: Some(link.id),
                    short_code: Some(link.short_code.clone()),
                    ..Default::default()
                },
            )
            .await;

        Ok(link)
    }

    /// Resolves a short code to its target and issues a referral token.
    ///
    /// Storing the click is best-effort: if it fails the visitor is still
    /// redirected, with a token that carries no click id.
    ///
    /// # Errors
    ///
    /// - [`AppError::NotFound`] if the link does not exist or is inactive
    /// - [`AppError::InvalidState`] if the link has expired
    pub async fn resolve_click(
        &self,
        short_code: &str,
        context: RequestContext,
    ) -> Result<ClickResolution, AppError> {
        let link = self
            .links
            .find_by_short_code(short_code)
            .await?
            .filter(|link| link.is_active)
            .ok_or_else(|| {
                AppError::not_found("Link not found", json!({ "short_code": short_code }))
            })?;

        let now = Utc::now();
        if link.is_expired_at(now) {
            return Err(AppError::invalid_state(
                "Link has expired",
                json!({ "short_code": short_code, "expires_at": link.expires_at }),
            ));
        }

        let affiliate = self
            .affiliates
            .find_by_id(link.affiliate_id)
            .await?
            .ok_or_else(|| {
                AppError::not_found(
                    "Affiliate not found",
                    json!({ "affiliate_id": link.affiliate_id }),
                )
            })?;

        let click = NewLinkClick {
            link_id: link.id,
            affiliate_id: link.affiliate_id,
            ip: context.ip,
            user_agent: context.user_agent,
            referer: context.referer,
            clicked_at: now,
        };
        let click_id = match self.links.record_click(click).await {
            Ok(click) => Some(click.id),
            Err(e) => {
                warn!(link_id = link.id, error = %e, "Failed to record click");
                None
            }
        };

        let referral_token = self.tokens.encode(&ReferralClaims {
            affiliate_code: affiliate.affiliate_code,
            click_id,
            timestamp: now.timestamp(),
        })?;

        metrics::counter!("affiliate_clicks_total").increment(1);
        info!(link_id = link.id, short_code, click_id, "Click resolved");

        Ok(ClickResolution {
            redirect_url: link.target_url,
            referral_token,
            click_id,
        })
    }

    /// Deactivates one of the affiliate's links.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::NotFound`] if the link does not exist or belongs to
    /// another affiliate.
    pub async fn deactivate_link(
        &self,
        affiliate_id: i64,
        link_id: i64,
    ) -> Result<AffiliateLink, AppError> {
        let not_found = || {
            AppError::not_found(
                "Link not found",
                json!({ "affiliate_id": affiliate_id, "link_id": link_id }),
            )
        };

        let link = self
            .links
            .find_by_id(link_id)
            .await?
            .filter(|link| link.affiliate_id == affiliate_id)
            .ok_or_else(not_found)?;
        if !link.is_active {
            return Ok(link);
        }

        let link = self
            .links
            .set_active(link_id, false)
            .await?
            .ok_or_else(not_found)?;

        info!(affiliate_id, link_id, "Tracking link deactivated");

        self.activity
            .record(
                affiliate_id,
                ActivityType::LinkDeactivated,
                format!("Deactivated link {}", link.short_code),
                ActivityMetadata {
                    link_id: Some(link.id),
                    short_code: Some(link.short_code.clone()),
                    ..Default::default()
                },
            )
            .await;

        Ok(link)
    }

    /// Lists the affiliate's links, newest first.
    pub async fn list_links(&self, affiliate_id: i64) -> Result<Vec<AffiliateLink>, AppError> {
        self.links.list_by_affiliate(affiliate_id).await
    }
}
