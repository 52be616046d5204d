//! Attribution capture, conversion booking and commission approval.

use std::sync::Arc;

use chrono::{DateTime, Datelike, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde_json::json;
use tracing::{debug, info};

use super::activity_log::ActivityLog;
use super::settings_service::SettingsService;
use crate::domain::commission;
use crate::domain::entities::{
    ActivityMetadata, ActivityType, Affiliate, Attribution, Commission, CommissionMetadata,
    CommissionStatus, ConversionEntry, ConversionRecord, NewReferral, ReferralStatus,
};
use crate::domain::referral_token::ReferralTokenCodec;
use crate::domain::repositories::{
    AffiliateRepository, AttributionRepository, LinkRepository, ReferralRepository,
};
use crate::error::AppError;

/// A conversion reported by the surrounding platform.
#[derive(Debug, Clone)]
pub struct ConversionRequest {
    pub user_id: i64,
    /// Lowercase label such as `sale`, `signup`, `subscription` or `lead`.
    pub conversion_type: String,
    pub conversion_value: Decimal,
    pub order_id: Option<String>,
    pub product_id: Option<String>,
    pub campaign: Option<String>,
}

pub struct ConversionService {
    affiliates: Arc<dyn AffiliateRepository>,
    links: Arc<dyn LinkRepository>,
    referrals: Arc<dyn ReferralRepository>,
    attributions: Arc<dyn AttributionRepository>,
    settings: Arc<SettingsService>,
    activity: Arc<ActivityLog>,
    tokens: ReferralTokenCodec,
}

impl ConversionService {
    pub fn new(
        affiliates: Arc<dyn AffiliateRepository>,
        links: Arc<dyn LinkRepository>,
        referrals: Arc<dyn ReferralRepository>,
        attributions: Arc<dyn AttributionRepository>,
        settings: Arc<SettingsService>,
        activity: Arc<ActivityLog>,
        tokens: ReferralTokenCodec,
    ) -> Self {
        Self {
            affiliates,
            links,
            referrals,
            attributions,
            settings,
            activity,
            tokens,
        }
    }

    /// Stores the referral attribution carried by a token for a user and opens
    /// a PENDING referral for the pair.
    ///
    /// Returns `Ok(None)` when there is nothing to attribute: the token is
    /// older than the referral window, or its affiliate is missing or not
    /// ACTIVE.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Validation`] if the token is malformed or tampered.
    pub async fn attribute_user(
        &self,
        user_id: i64,
        token: &str,
    ) -> Result<Option<Attribution>, AppError> {
        let claims = self.tokens.decode(token)?;
        let issued_at = claims.issued_at().ok_or_else(|| {
            AppError::bad_request(
                "Invalid referral token",
                json!({ "reason": "timestamp out of range" }),
            )
        })?;

        let settings = self.settings.current().await;
        let now = Utc::now();
        let expires_at = issued_at
            .checked_add_signed(settings.referral_window()?)
            .ok_or_else(|| {
                AppError::bad_request(
                    "Invalid referral token",
                    json!({ "reason": "timestamp out of range" }),
                )
            })?;
        if now >= expires_at {
            info!(user_id, affiliate_code = %claims.affiliate_code, "Referral token outside window");
            return Ok(None);
        }

        let Some(affiliate) = self.active_affiliate(&claims.affiliate_code).await? else {
            return Ok(None);
        };

        let link_id = self.link_of_click(claims.click_id).await?;

        let attribution = self
            .attributions
            .save(Attribution {
                user_id,
                affiliate_code: affiliate.affiliate_code.clone(),
                token: token.to_string(),
                click_id: claims.click_id,
                expires_at,
                created_at: now,
            })
            .await?;

        let referral = self
            .referrals
            .open_referral(NewReferral {
                affiliate_id: affiliate.id,
                referred_user_id: user_id,
                link_id,
                click_id: claims.click_id,
                status: ReferralStatus::Pending,
            })
            .await?;

        info!(
            user_id,
            affiliate_id = affiliate.id,
            referral_id = referral.id,
            "Referral attributed"
        );

        self.activity
            .record(
                affiliate.id,
                ActivityType::ReferralCaptured,
                format!("Referred user {user_id}"),
                ActivityMetadata {
                    user_id: Some(user_id),
                    referral_id: Some(referral.id),
                    click_id: claims.click_id,
                    ..Default::default()
                },
            )
            .await;

        Ok(Some(attribution))
    }

    /// Books a conversion for the affiliate the user is attributed to.
    ///
    /// Returns `Ok(None)` without writing anything when the user has no
    /// attribution, the attribution has expired, or its affiliate is missing
    /// or not ACTIVE. The last check is repeated by the store while the
    /// affiliate is locked, which also prices the commission.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Validation`] for a value that is not positive or
    /// exceeds [`commission::MAX_CONVERSION_VALUE`], or for an invalid
    /// conversion type.
    pub async fn track_conversion(
        &self,
        request: ConversionRequest,
    ) -> Result<Option<ConversionRecord>, AppError> {
        commission::validate_conversion_value(request.conversion_value)?;
        let conversion_type = normalize_conversion_type(&request.conversion_type)?;

        let user_id = request.user_id;
        let now = Utc::now();

        let Some(attribution) = self.attributions.find(user_id).await? else {
            debug!(user_id, "No referral attribution, conversion not attributed");
            return Ok(None);
        };
        if attribution.is_expired_at(now) {
            debug!(user_id, expires_at = %attribution.expires_at, "Referral attribution expired");
            return Ok(None);
        }

        let Some(affiliate) = self.active_affiliate(&attribution.affiliate_code).await? else {
            return Ok(None);
        };

        let link_id = self.link_of_click(attribution.click_id).await?;
        let settings = self.settings.current().await;
        let due_date = now
            .checked_add_signed(settings.commission_hold()?)
            .ok_or_else(|| {
                AppError::internal(
                    "Commission due date out of range",
                    json!({ "commission_hold_days": settings.commission_hold_days }),
                )
            })?;

        let entry = ConversionEntry {
            affiliate_id: affiliate.id,
            referred_user_id: user_id,
            click_id: attribution.click_id,
            link_id,
            conversion_type: conversion_type.clone(),
            conversion_value: request.conversion_value,
            order_id: request.order_id.clone(),
            metadata: CommissionMetadata {
                order_id: request.order_id.clone(),
                click_id: attribution.click_id,
                link_id,
                product_id: request.product_id,
                campaign: request.campaign,
                ..Default::default()
            },
            month_start: start_of_month(now),
            due_date,
            occurred_at: now,
        };

        let Some(record) = self.referrals.record_conversion(entry).await? else {
            debug!(affiliate_id = affiliate.id, "Affiliate no longer active, conversion not booked");
            return Ok(None);
        };

        metrics::counter!("affiliate_conversions_total").increment(1);
        info!(
            user_id,
            affiliate_id = affiliate.id,
            commission_id = record.commission.id,
            conversion_type = %conversion_type,
            conversion_value = %request.conversion_value,
            commission = %record.commission.amount,
            "Conversion tracked"
        );

        self.activity
            .record(
                affiliate.id,
                ActivityType::CommissionEarned,
                format!(
                    "Earned {} on {} of {}",
                    record.commission.amount, conversion_type, request.conversion_value
                ),
                ActivityMetadata {
                    commission_id: Some(record.commission.id),
                    referral_id: Some(record.referral.id),
                    amount: Some(record.commission.amount),
                    order_id: request.order_id,
                    ..Default::default()
                },
            )
            .await;

        Ok(Some(record))
    }

    /// Moves a PENDING commission to APPROVED.
    ///
    /// # Errors
    ///
    /// - [`AppError::NotFound`] if the commission does not exist
    /// - [`AppError::InvalidState`] if it is not PENDING
    pub async fn approve_commission(&self, commission_id: i64) -> Result<Commission, AppError> {
        let current = self
            .referrals
            .find_commission(commission_id)
            .await?
            .ok_or_else(|| {
                AppError::not_found(
                    "Commission not found",
                    json!({ "commission_id": commission_id }),
                )
            })?;

        let not_pending = || {
            AppError::invalid_state(
                "Commission is not pending",
                json!({ "commission_id": commission_id, "status": current.status }),
            )
        };
        if current.status != CommissionStatus::Pending {
            return Err(not_pending());
        }

        let approved = self
            .referrals
            .approve_commission(commission_id, Utc::now())
            .await?
            .ok_or_else(not_pending)?;

        info!(commission_id, affiliate_id = approved.affiliate_id, "Commission approved");

        self.activity
            .record(
                approved.affiliate_id,
                ActivityType::CommissionApproved,
                format!("Commission {} approved", approved.id),
                ActivityMetadata {
                    commission_id: Some(approved.id),
                    referral_id: Some(approved.referral_id),
                    amount: Some(approved.amount),
                    order_id: approved.order_id.clone(),
                    ..Default::default()
                },
            )
            .await;

        Ok(approved)
    }

    pub async fn list_commissions(&self, affiliate_id: i64) -> Result<Vec<Commission>, AppError> {
        self.referrals.list_commissions(affiliate_id).await
    }

    async fn active_affiliate(&self, code: &str) -> Result<Option<Affiliate>, AppError> {
        match self.affiliates.find_by_code(code).await? {
            Some(affiliate) if affiliate.is_active() => Ok(Some(affiliate)),
            Some(affiliate) => {
                debug!(affiliate_id = affiliate.id, status = %affiliate.status, "Affiliate not active");
                Ok(None)
            }
            None => {
                debug!(affiliate_code = code, "Affiliate not found");
                Ok(None)
            }
        }
    }

    async fn link_of_click(&self, click_id: Option<i64>) -> Result<Option<i64>, AppError> {
        let Some(click_id) = click_id else {
            return Ok(None);
        };
        Ok(self.links.find_click(click_id).await?.map(|c| c.link_id))
    }
}

fn normalize_conversion_type(raw: &str) -> Result<String, AppError> {
    let label = raw.trim().to_ascii_lowercase();
    let valid = !label.is_empty()
        && label.len() <= 32
        && label
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_');

    if !valid {
        return Err(AppError::bad_request(
            "Invalid conversion type",
            json!({ "conversion_type": raw }),
        ));
    }

    Ok(label)
}

/// Midnight UTC on the first day of `now`'s month.
fn start_of_month(now: DateTime<Utc>) -> DateTime<Utc> {
    NaiveDate::from_ymd_opt(now.year(), now.month(), 1)
        .and_then(|day| day.and_hms_opt(0, 0, 0))
        .map(|midnight| midnight.and_utc())
        .unwrap_or(now)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entities::{
        AffiliateSettings, AffiliateStatus, AffiliateTier, LinkClick, Referral, sample_affiliate,
    };
    use crate::domain::referral_token::ReferralClaims;
    use crate::domain::repositories::{
        MockActivityRepository, MockAffiliateRepository, MockAttributionRepository,
        MockLinkRepository, MockReferralRepository, MockSettingsRepository,
    };
    use chrono::{Duration, TimeZone};

    const SECRET: &str = "test-secret";

    struct Mocks {
        affiliates: MockAffiliateRepository,
        links: MockLinkRepository,
        referrals: MockReferralRepository,
        attributions: MockAttributionRepository,
    }

    impl Mocks {
        fn new() -> Self {
            Self {
                affiliates: MockAffiliateRepository::new(),
                links: MockLinkRepository::new(),
                referrals: MockReferralRepository::new(),
                attributions: MockAttributionRepository::new(),
            }
        }

        async fn into_service(self) -> ConversionService {
            let mut settings = MockSettingsRepository::new();
            settings
                .expect_load()
                .returning(|| Ok(Some(AffiliateSettings::default())));
            let mut activity = MockActivityRepository::new();
            activity
                .expect_append()
                .returning(|_| Err(AppError::internal("unused", json!({}))));

            ConversionService::new(
                Arc::new(self.affiliates),
                Arc::new(self.links),
                Arc::new(self.referrals),
                Arc::new(self.attributions),
                Arc::new(SettingsService::initialize(Arc::new(settings)).await.unwrap()),
                Arc::new(ActivityLog::new(Arc::new(activity))),
                ReferralTokenCodec::new(SECRET),
            )
        }
    }

    fn gold_affiliate() -> Affiliate {
        let mut affiliate = sample_affiliate(1, AffiliateStatus::Active);
        affiliate.tier = AffiliateTier::Gold;
        affiliate
    }

    fn attribution(expires_at: DateTime<Utc>) -> Attribution {
        Attribution {
            user_id: 500,
            affiliate_code: "aff001".to_string(),
            token: "t".to_string(),
            click_id: Some(9),
            expires_at,
            created_at: Utc::now(),
        }
    }

    fn sale(value: i64) -> ConversionRequest {
        ConversionRequest {
            user_id: 500,
            conversion_type: "Sale".to_string(),
            conversion_value: Decimal::new(value, 0),
            order_id: Some("ORD-1".to_string()),
            product_id: None,
            campaign: None,
        }
    }

    fn referral(status: ReferralStatus) -> Referral {
        Referral {
            id: 3,
            affiliate_id: 1,
            referred_user_id: 500,
            link_id: Some(4),
            click_id: Some(9),
            status,
            conversion_type: None,
            conversion_value: None,
            commission_amount: None,
            converted_at: None,
            created_at: Utc::now(),
        }
    }

    fn booked(entry: ConversionEntry) -> ConversionRecord {
        let priced = entry.price(&gold_affiliate(), Decimal::ZERO).unwrap();
        let commission = Commission {
            id: 20,
            affiliate_id: entry.affiliate_id,
            referral_id: 3,
            commission_type: entry.conversion_type.clone(),
            amount: priced.amount,
            rate: priced.effective_rate,
            base_amount: entry.conversion_value,
            status: CommissionStatus::Pending,
            tier: priced.tier,
            order_id: entry.order_id.clone(),
            metadata: priced.metadata,
            due_date: entry.due_date,
            approved_at: None,
            created_at: entry.occurred_at,
        };
        let mut affiliate = gold_affiliate();
        affiliate.available_balance = priced.amount;
        ConversionRecord {
            commission,
            referral: referral(ReferralStatus::Converted),
            affiliate,
        }
    }

    fn click(id: i64) -> LinkClick {
        LinkClick {
            id,
            link_id: 4,
            ip: None,
            user_agent: None,
            referer: None,
            clicked_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_track_conversion_books_entry_for_attributed_affiliate() {
        let mut mocks = Mocks::new();
        mocks
            .attributions
            .expect_find()
            .returning(|_| Ok(Some(attribution(Utc::now() + Duration::days(10)))));
        mocks
            .affiliates
            .expect_find_by_code()
            .returning(|_| Ok(Some(gold_affiliate())));
        mocks
            .links
            .expect_find_click()
            .returning(|id| Ok(Some(click(id))));
        mocks
            .referrals
            .expect_record_conversion()
            .withf(|e| {
                e.affiliate_id == 1
                    && e.conversion_type == "sale"
                    && e.link_id == Some(4)
                    && e.metadata.order_id.as_deref() == Some("ORD-1")
                    && e.month_start == start_of_month(e.occurred_at)
                    && e.due_date - e.occurred_at == Duration::days(30)
            })
            .times(1)
            .returning(|e| Ok(Some(booked(e))));

        let record = mocks
            .into_service()
            .await
            .track_conversion(sale(1000))
            .await
            .unwrap()
            .unwrap();

        assert_eq!(record.commission.amount, Decimal::new(7250, 2));
    }

    #[tokio::test]
    async fn test_track_conversion_when_store_finds_affiliate_inactive_is_noop() {
        let mut mocks = Mocks::new();
        mocks
            .attributions
            .expect_find()
            .returning(|_| Ok(Some(attribution(Utc::now() + Duration::days(10)))));
        mocks
            .affiliates
            .expect_find_by_code()
            .returning(|_| Ok(Some(gold_affiliate())));
        mocks.links.expect_find_click().returning(|_| Ok(None));
        mocks
            .referrals
            .expect_record_conversion()
            .times(1)
            .returning(|_| Ok(None));

        let result = mocks
            .into_service()
            .await
            .track_conversion(sale(1000))
            .await
            .unwrap();

        assert!(result.is_none());
    }

    #[tokio::test]
    async fn test_track_conversion_rejects_value_beyond_ledger() {
        let mut mocks = Mocks::new();
        mocks.attributions.expect_find().times(0);
        mocks.referrals.expect_record_conversion().times(0);

        let mut request = sale(1);
        request.conversion_value = Decimal::MAX;
        let err = mocks
            .into_service()
            .await
            .track_conversion(request)
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::Validation { .. }));
    }

    #[tokio::test]
    async fn test_track_conversion_without_attribution_is_noop() {
        let mut mocks = Mocks::new();
        mocks.attributions.expect_find().returning(|_| Ok(None));
        mocks.referrals.expect_record_conversion().times(0);

        let result = mocks
            .into_service()
            .await
            .track_conversion(sale(1000))
            .await
            .unwrap();

        assert!(result.is_none());
    }

    #[tokio::test]
    async fn test_track_conversion_with_expired_attribution_is_noop() {
        let mut mocks = Mocks::new();
        mocks
            .attributions
            .expect_find()
            .returning(|_| Ok(Some(attribution(Utc::now() - Duration::seconds(1)))));
        mocks.affiliates.expect_find_by_code().times(0);
        mocks.referrals.expect_record_conversion().times(0);

        let result = mocks
            .into_service()
            .await
            .track_conversion(sale(1000))
            .await
            .unwrap();

        assert!(result.is_none());
    }

    #[tokio::test]
    async fn test_track_conversion_for_suspended_affiliate_is_noop() {
        let mut mocks = Mocks::new();
        mocks
            .attributions
            .expect_find()
            .returning(|_| Ok(Some(attribution(Utc::now() + Duration::days(1)))));
        mocks
            .affiliates
            .expect_find_by_code()
            .returning(|_| Ok(Some(sample_affiliate(1, AffiliateStatus::Suspended))));
        mocks.referrals.expect_record_conversion().times(0);

        let result = mocks
            .into_service()
            .await
            .track_conversion(sale(1000))
            .await
            .unwrap();

        assert!(result.is_none());
    }

    #[tokio::test]
    async fn test_track_conversion_rejects_non_positive_value() {
        let mocks = Mocks::new();
        let err = mocks
            .into_service()
            .await
            .track_conversion(sale(0))
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::Validation { .. }));
    }

    #[tokio::test]
    async fn test_attribute_user_stores_attribution_and_opens_referral() {
        let token = ReferralTokenCodec::new(SECRET)
            .encode(&ReferralClaims {
                affiliate_code: "aff001".to_string(),
                click_id: Some(9),
                timestamp: Utc::now().timestamp(),
            })
            .unwrap();

        let mut mocks = Mocks::new();
        mocks
            .affiliates
            .expect_find_by_code()
            .returning(|_| Ok(Some(gold_affiliate())));
        mocks
            .links
            .expect_find_click()
            .returning(|id| Ok(Some(click(id))));
        mocks
            .attributions
            .expect_save()
            .withf(|a| a.user_id == 500 && a.affiliate_code == "aff001" && a.click_id == Some(9))
            .times(1)
            .returning(Ok);
        mocks
            .referrals
            .expect_open_referral()
            .withf(|r| {
                r.status == ReferralStatus::Pending && r.link_id == Some(4) && r.affiliate_id == 1
            })
            .times(1)
            .returning(|_| Ok(referral(ReferralStatus::Pending)));

        let attribution = mocks
            .into_service()
            .await
            .attribute_user(500, &token)
            .await
            .unwrap()
            .unwrap();

        assert_eq!(attribution.token, token);
    }

    #[tokio::test]
    async fn test_attribute_user_outside_window_is_noop() {
        let token = ReferralTokenCodec::new(SECRET)
            .encode(&ReferralClaims {
                affiliate_code: "aff001".to_string(),
                click_id: None,
                timestamp: (Utc::now() - Duration::days(31)).timestamp(),
            })
            .unwrap();

        let mut mocks = Mocks::new();
        mocks.attributions.expect_save().times(0);

        let result = mocks
            .into_service()
            .await
            .attribute_user(500, &token)
            .await
            .unwrap();

        assert!(result.is_none());
    }

    #[tokio::test]
    async fn test_attribute_user_rejects_forged_token() {
        let token = ReferralTokenCodec::new("other-secret")
            .encode(&ReferralClaims {
                affiliate_code: "aff001".to_string(),
                click_id: None,
                timestamp: Utc::now().timestamp(),
            })
            .unwrap();

        let err = Mocks::new()
            .into_service()
            .await
            .attribute_user(500, &token)
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::Validation { .. }));
    }

    #[tokio::test]
    async fn test_approve_commission_requires_pending() {
        let mut mocks = Mocks::new();
        mocks.referrals.expect_find_commission().returning(|_| {
            let mut record = booked(ConversionEntry {
                affiliate_id: 1,
                referred_user_id: 500,
                click_id: None,
                link_id: None,
                conversion_type: "sale".to_string(),
                conversion_value: Decimal::new(100, 0),
                order_id: None,
                metadata: CommissionMetadata::default(),
                month_start: Utc::now(),
                due_date: Utc::now(),
                occurred_at: Utc::now(),
            });
            record.commission.status = CommissionStatus::Approved;
            Ok(Some(record.commission))
        });
        mocks.referrals.expect_approve_commission().times(0);

        let err = mocks
            .into_service()
            .await
            .approve_commission(20)
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::InvalidState { .. }));
    }

    #[test]
    fn test_start_of_month() {
        let now = Utc.with_ymd_and_hms(2026, 10, 19, 15, 30, 0).unwrap();
        assert_eq!(
            start_of_month(now),
            Utc.with_ymd_and_hms(2026, 10, 1, 0, 0, 0).unwrap()
        );
    }

    #[test]
    fn test_normalize_conversion_type() {
        assert_eq!(normalize_conversion_type(" Sale ").unwrap(), "sale");
        assert_eq!(normalize_conversion_type("trial_start").unwrap(), "trial_start");
        assert!(normalize_conversion_type("").is_err());
        assert!(normalize_conversion_type("big sale!").is_err());
    }
}
