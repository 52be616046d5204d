//! Affiliate lifecycle: registration, approval, suspension and terms.

use std::sync::Arc;

use chrono::Utc;
use rust_decimal::Decimal;
use serde_json::json;
use tracing::{info, warn};

use super::activity_log::ActivityLog;
use super::settings_service::SettingsService;
use crate::domain::entities::{
    ActivityMetadata, ActivityType, Affiliate, AffiliateProfile, AffiliateStatus, AffiliateTier,
    NewAffiliate, validate_commission_rate,
};
use crate::domain::repositories::{AffiliateRepository, UserDirectory};
use crate::error::AppError;
use crate::infrastructure::notification::{Notification, NotificationKind, Notifier};
use crate::utils::code_generator::{affiliate_code_base, affiliate_code_candidate};
use crate::utils::retry::retry_on_conflict;
use crate::utils::url_builder::parse_target_url;

/// Largest page size accepted by [`AffiliateService::list`].
pub const MAX_PAGE_SIZE: i64 = 100;

/// One page of affiliates plus the total matching the filter.
#[derive(Debug, Clone)]
pub struct AffiliatePage {
    pub items: Vec<Affiliate>,
    pub total: i64,
}

/// Owns the affiliate's status transitions.
///
/// `PENDING ⇄ ACTIVE ⇄ SUSPENDED`, with suspension reversed through approval.
pub struct AffiliateService {
    affiliates: Arc<dyn AffiliateRepository>,
    users: Arc<dyn UserDirectory>,
    settings: Arc<SettingsService>,
    activity: Arc<ActivityLog>,
    notifier: Arc<dyn Notifier>,
}

impl AffiliateService {
    pub fn new(
        affiliates: Arc<dyn AffiliateRepository>,
        users: Arc<dyn UserDirectory>,
        settings: Arc<SettingsService>,
        activity: Arc<ActivityLog>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            affiliates,
            users,
            settings,
            activity,
            notifier,
        }
    }

    /// Registers a user as an affiliate.
    ///
    /// The affiliate starts PENDING, or ACTIVE when the program auto-approves.
    /// The code is derived from the display name; when that base is taken a
    /// numeric suffix one above the highest in use is appended.
    ///
    /// # Errors
    ///
    /// - [`AppError::NotFound`] if the user does not exist
    /// - [`AppError::AlreadyAffiliate`] if the user already has a record
    /// - [`AppError::Validation`] if the website is not an http(s) URL
    pub async fn register(
        &self,
        user_id: i64,
        profile: AffiliateProfile,
    ) -> Result<Affiliate, AppError> {
        let user = self
            .users
            .find_user(user_id)
            .await?
            .ok_or_else(|| AppError::not_found("User not found", json!({ "user_id": user_id })))?;

        if self.affiliates.find_by_user_id(user_id).await?.is_some() {
            return Err(AppError::already_affiliate(
                "User is already registered as an affiliate",
                json!({ "user_id": user_id }),
            ));
        }

        let website = profile
            .website
            .as_deref()
            .map(str::trim)
            .filter(|w| !w.is_empty())
            .map(|w| {
                parse_target_url(w).map(|url| url.to_string()).map_err(|e| {
                    AppError::bad_request("Invalid website URL", json!({ "reason": e.to_string() }))
                })
            })
            .transpose()?;

        let display_name = profile
            .display_name
            .as_deref()
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .unwrap_or_else(|| user.preferred_name())
            .to_string();

        let settings = self.settings.current().await;
        let now = Utc::now();
        let status = if settings.auto_approve {
            AffiliateStatus::Active
        } else {
            AffiliateStatus::Pending
        };

        let base = affiliate_code_base(&display_name);
        let template = NewAffiliate {
            user_id,
            affiliate_code: base.clone(),
            display_name,
            website,
            status,
            tier: AffiliateTier::Bronze,
            commission_rate: settings.default_commission_rate,
            approved_at: settings.auto_approve.then_some(now),
        };
        // The suffix is re-read on every attempt, so only a concurrent
        // registration with the same base can cause another round.
        let affiliate = retry_on_conflict("affiliate code", || {
            let affiliates = Arc::clone(&self.affiliates);
            let base = base.clone();
            let template = template.clone();
            async move {
                let suffix = affiliates.next_code_suffix(&base).await?;
                affiliates
                    .create(NewAffiliate {
                        affiliate_code: affiliate_code_candidate(&base, suffix),
                        ..template
                    })
                    .await
            }
        })
        .await?;

        metrics::counter!("affiliate_registrations_total").increment(1);
        info!(
            affiliate_id = affiliate.id,
            user_id,
            affiliate_code = %affiliate.affiliate_code,
            status = %affiliate.status,
            "Affiliate registered"
        );

        self.activity
            .record(
                affiliate.id,
                ActivityType::Registration,
                format!("Registered as affiliate {}", affiliate.affiliate_code),
                ActivityMetadata {
                    auto_approved: Some(settings.auto_approve),
                    ..Default::default()
                },
            )
            .await;

        self.notify(NotificationKind::Welcome, &affiliate).await;

        Ok(affiliate)
    }

    /// Activates a PENDING or SUSPENDED affiliate.
    ///
    /// # Errors
    ///
    /// - [`AppError::NotFound`] if the affiliate does not exist
    /// - [`AppError::InvalidState`] if it is already ACTIVE
    pub async fn approve(
        &self,
        affiliate_id: i64,
        approved_by: i64,
        notes: Option<String>,
    ) -> Result<Affiliate, AppError> {
        let current = self.get(affiliate_id).await?;
        if current.is_active() {
            return Err(already_in(&current));
        }

        let affiliate = self
            .affiliates
            .activate(affiliate_id, approved_by, notes.clone(), Utc::now())
            .await?
            .ok_or_else(|| {
                AppError::invalid_state(
                    "Affiliate changed state concurrently",
                    json!({ "affiliate_id": affiliate_id }),
                )
            })?;

        info!(
            affiliate_id,
            approved_by,
            previous_status = %current.status,
            "Affiliate approved"
        );

        self.activity
            .record(
                affiliate_id,
                ActivityType::Approval,
                "Affiliate account approved",
                ActivityMetadata {
                    actor_id: Some(approved_by),
                    notes,
                    previous_status: Some(current.status),
                    ..Default::default()
                },
            )
            .await;

        self.notify(NotificationKind::Approval, &affiliate).await;

        Ok(affiliate)
    }

    /// Suspends an affiliate and deactivates all of its links in one unit.
    ///
    /// # Errors
    ///
    /// - [`AppError::Validation`] if `reason` is blank
    /// - [`AppError::NotFound`] if the affiliate does not exist
    /// - [`AppError::InvalidState`] if it is already SUSPENDED
    pub async fn suspend(
        &self,
        affiliate_id: i64,
        reason: String,
        suspended_by: i64,
    ) -> Result<Affiliate, AppError> {
        let reason = reason.trim().to_string();
        if reason.is_empty() {
            return Err(AppError::bad_request(
                "Suspension reason is required",
                json!({ "affiliate_id": affiliate_id }),
            ));
        }

        let current = self.get(affiliate_id).await?;
        if current.status == AffiliateStatus::Suspended {
            return Err(already_in(&current));
        }

        let suspension = self
            .affiliates
            .suspend(affiliate_id, suspended_by, reason.clone(), Utc::now())
            .await?
            .ok_or_else(|| {
                AppError::invalid_state(
                    "Affiliate changed state concurrently",
                    json!({ "affiliate_id": affiliate_id }),
                )
            })?;

        info!(
            affiliate_id,
            suspended_by,
            links_deactivated = suspension.links_deactivated,
            "Affiliate suspended"
        );

        self.activity
            .record(
                affiliate_id,
                ActivityType::Suspension,
                format!("Affiliate suspended: {reason}"),
                ActivityMetadata {
                    actor_id: Some(suspended_by),
                    reason: Some(reason),
                    links_deactivated: Some(suspension.links_deactivated),
                    ..Default::default()
                },
            )
            .await;

        Ok(suspension.affiliate)
    }

    /// Changes an affiliate's tier and/or base commission rate.
    ///
    /// # Errors
    ///
    /// - [`AppError::Validation`] if nothing is changed or the rate is outside `(0, 1]`
    /// - [`AppError::NotFound`] if the affiliate does not exist
    pub async fn update_terms(
        &self,
        affiliate_id: i64,
        tier: Option<AffiliateTier>,
        commission_rate: Option<Decimal>,
    ) -> Result<Affiliate, AppError> {
        if tier.is_none() && commission_rate.is_none() {
            return Err(AppError::bad_request(
                "Nothing to update",
                json!({ "affiliate_id": affiliate_id }),
            ));
        }
        if let Some(rate) = commission_rate {
            validate_commission_rate(rate)?;
        }

        let affiliate = self
            .affiliates
            .update_terms(affiliate_id, tier, commission_rate)
            .await?
            .ok_or_else(|| affiliate_not_found(affiliate_id))?;

        info!(
            affiliate_id,
            tier = %affiliate.tier,
            commission_rate = %affiliate.commission_rate,
            "Affiliate terms updated"
        );

        self.activity
            .record(
                affiliate_id,
                ActivityType::TierChange,
                format!(
                    "Terms changed to {} at rate {}",
                    affiliate.tier, affiliate.commission_rate
                ),
                ActivityMetadata {
                    tier: Some(affiliate.tier),
                    commission_rate: Some(affiliate.commission_rate),
                    ..Default::default()
                },
            )
            .await;

        Ok(affiliate)
    }

    /// # Errors
    ///
    /// Returns [`AppError::NotFound`] if the affiliate does not exist.
    pub async fn get(&self, affiliate_id: i64) -> Result<Affiliate, AppError> {
        self.affiliates
            .find_by_id(affiliate_id)
            .await?
            .ok_or_else(|| affiliate_not_found(affiliate_id))
    }

    /// Lists affiliates newest first. `page` is 1-indexed.
    pub async fn list(
        &self,
        status: Option<AffiliateStatus>,
        page: i64,
        page_size: i64,
    ) -> Result<AffiliatePage, AppError> {
        let page = page.max(1);
        let page_size = page_size.clamp(1, MAX_PAGE_SIZE);

        let items = self.affiliates.list(status, page, page_size).await?;
        let total = self.affiliates.count(status).await?;

        Ok(AffiliatePage { items, total })
    }

    async fn notify(&self, kind: NotificationKind, affiliate: &Affiliate) {
        let notification = Notification {
            kind,
            affiliate_id: affiliate.id,
            user_id: affiliate.user_id,
            affiliate_code: affiliate.affiliate_code.clone(),
            display_name: affiliate.display_name.clone(),
        };

        if let Err(e) = self.notifier.send(notification).await {
            warn!(
                affiliate_id = affiliate.id,
                kind = ?kind,
                error = %e,
                "Failed to send notification"
            );
        }
    }
}

fn affiliate_not_found(affiliate_id: i64) -> AppError {
    AppError::not_found("Affiliate not found", json!({ "affiliate_id": affiliate_id }))
}

fn already_in(affiliate: &Affiliate) -> AppError {
    AppError::invalid_state(
        format!("Affiliate is already {}", affiliate.status),
        json!({ "affiliate_id": affiliate.id, "status": affiliate.status }),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entities::{AffiliateSettings, Suspension, UserAccount, sample_affiliate};
    use crate::domain::repositories::{
        MockActivityRepository, MockAffiliateRepository, MockSettingsRepository, MockUserDirectory,
    };
    use crate::infrastructure::notification::MockNotifier;
    use mockall::Sequence;

    fn user(id: i64) -> UserAccount {
        UserAccount {
            id,
            email: "jane.doe@example.com".to_string(),
            display_name: Some("Jane Doe".to_string()),
        }
    }

    async fn settings(auto_approve: bool) -> Arc<SettingsService> {
        let mut repo = MockSettingsRepository::new();
        repo.expect_load().returning(move || {
            Ok(Some(AffiliateSettings {
                auto_approve,
                ..Default::default()
            }))
        });
        Arc::new(SettingsService::initialize(Arc::new(repo)).await.unwrap())
    }

    fn activity() -> Arc<ActivityLog> {
        let mut repo = MockActivityRepository::new();
        repo.expect_append()
            .returning(|_| Err(AppError::internal("unused", json!({}))));
        Arc::new(ActivityLog::new(Arc::new(repo)))
    }

    fn quiet_notifier() -> MockNotifier {
        let mut notifier = MockNotifier::new();
        notifier.expect_send().returning(|_| Ok(()));
        notifier
    }

    fn created(new_affiliate: &NewAffiliate) -> Affiliate {
        let mut affiliate = sample_affiliate(1, new_affiliate.status);
        affiliate.user_id = new_affiliate.user_id;
        affiliate.affiliate_code = new_affiliate.affiliate_code.clone();
        affiliate.display_name = new_affiliate.display_name.clone();
        affiliate.commission_rate = new_affiliate.commission_rate;
        affiliate.approved_at = new_affiliate.approved_at;
        affiliate
    }

    async fn service(
        affiliates: MockAffiliateRepository,
        users: MockUserDirectory,
        auto_approve: bool,
        notifier: MockNotifier,
    ) -> AffiliateService {
        AffiliateService::new(
            Arc::new(affiliates),
            Arc::new(users),
            settings(auto_approve).await,
            activity(),
            Arc::new(notifier),
        )
    }

    #[tokio::test]
    async fn test_register_creates_pending_affiliate() {
        let mut users = MockUserDirectory::new();
        users.expect_find_user().returning(|id| Ok(Some(user(id))));

        let mut affiliates = MockAffiliateRepository::new();
        affiliates.expect_find_by_user_id().returning(|_| Ok(None));
        affiliates
            .expect_next_code_suffix()
            .withf(|base| base == "janedoe")
            .returning(|_| Ok(0));
        affiliates
            .expect_create()
            .withf(|n| {
                n.affiliate_code == "janedoe"
                    && n.status == AffiliateStatus::Pending
                    && n.approved_at.is_none()
                    && n.commission_rate == Decimal::new(5, 2)
            })
            .times(1)
            .returning(|n| Ok(created(&n)));

        let mut notifier = MockNotifier::new();
        notifier
            .expect_send()
            .withf(|n| n.kind == NotificationKind::Welcome)
            .times(1)
            .returning(|_| Ok(()));

        let service = service(affiliates, users, false, notifier).await;
        let affiliate = service
            .register(10, AffiliateProfile::default())
            .await
            .unwrap();

        assert_eq!(affiliate.status, AffiliateStatus::Pending);
        assert_eq!(affiliate.display_name, "Jane Doe");
    }

    #[tokio::test]
    async fn test_register_auto_approves() {
        let mut users = MockUserDirectory::new();
        users.expect_find_user().returning(|id| Ok(Some(user(id))));

        let mut affiliates = MockAffiliateRepository::new();
        affiliates.expect_find_by_user_id().returning(|_| Ok(None));
        affiliates.expect_next_code_suffix().returning(|_| Ok(0));
        affiliates
            .expect_create()
            .withf(|n| n.status == AffiliateStatus::Active && n.approved_at.is_some())
            .times(1)
            .returning(|n| Ok(created(&n)));

        let service = service(affiliates, users, true, quiet_notifier()).await;
        let affiliate = service
            .register(10, AffiliateProfile::default())
            .await
            .unwrap();

        assert!(affiliate.is_active());
    }

    #[tokio::test]
    async fn test_register_continues_after_highest_suffix() {
        let mut users = MockUserDirectory::new();
        users.expect_find_user().returning(|id| Ok(Some(user(id))));

        let mut affiliates = MockAffiliateRepository::new();
        affiliates.expect_find_by_user_id().returning(|_| Ok(None));
        affiliates
            .expect_next_code_suffix()
            .times(1)
            .returning(|_| Ok(11));
        affiliates
            .expect_create()
            .withf(|n| n.affiliate_code == "janedoe11")
            .times(1)
            .returning(|n| Ok(created(&n)));

        let service = service(affiliates, users, false, quiet_notifier()).await;
        let affiliate = service
            .register(10, AffiliateProfile::default())
            .await
            .unwrap();

        assert_eq!(affiliate.affiliate_code, "janedoe11");
    }

    #[tokio::test]
    async fn test_register_retries_when_code_taken_concurrently() {
        let mut users = MockUserDirectory::new();
        users.expect_find_user().returning(|id| Ok(Some(user(id))));

        let mut seq = Sequence::new();
        let mut affiliates = MockAffiliateRepository::new();
        affiliates.expect_find_by_user_id().returning(|_| Ok(None));
        affiliates
            .expect_next_code_suffix()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(0));
        affiliates
            .expect_create()
            .withf(|n| n.affiliate_code == "janedoe")
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| {
                Err(AppError::conflict(
                    "dup",
                    json!({ "constraint": "affiliates_affiliate_code_key" }),
                ))
            });
        affiliates
            .expect_next_code_suffix()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(1));
        affiliates
            .expect_create()
            .withf(|n| n.affiliate_code == "janedoe1")
            .times(1)
            .in_sequence(&mut seq)
            .returning(|n| Ok(created(&n)));

        let service = service(affiliates, users, false, quiet_notifier()).await;
        let affiliate = service
            .register(10, AffiliateProfile::default())
            .await
            .unwrap();

        assert_eq!(affiliate.affiliate_code, "janedoe1");
    }

    #[tokio::test]
    async fn test_register_unknown_user() {
        let mut users = MockUserDirectory::new();
        users.expect_find_user().returning(|_| Ok(None));

        let mut affiliates = MockAffiliateRepository::new();
        affiliates.expect_create().times(0);

        let service = service(affiliates, users, false, MockNotifier::new()).await;
        let err = service
            .register(99, AffiliateProfile::default())
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_register_twice_fails() {
        let mut users = MockUserDirectory::new();
        users.expect_find_user().returning(|id| Ok(Some(user(id))));

        let mut affiliates = MockAffiliateRepository::new();
        affiliates
            .expect_find_by_user_id()
            .returning(|_| Ok(Some(sample_affiliate(1, AffiliateStatus::Pending))));
        affiliates.expect_create().times(0);

        let service = service(affiliates, users, false, MockNotifier::new()).await;
        let err = service
            .register(10, AffiliateProfile::default())
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::AlreadyAffiliate { .. }));
    }

    #[tokio::test]
    async fn test_register_survives_notification_failure() {
        let mut users = MockUserDirectory::new();
        users.expect_find_user().returning(|id| Ok(Some(user(id))));

        let mut affiliates = MockAffiliateRepository::new();
        affiliates.expect_find_by_user_id().returning(|_| Ok(None));
        affiliates.expect_next_code_suffix().returning(|_| Ok(0));
        affiliates.expect_create().returning(|n| Ok(created(&n)));

        let mut notifier = MockNotifier::new();
        notifier
            .expect_send()
            .returning(|_| Err(AppError::internal("smtp down", json!({}))));

        let service = service(affiliates, users, false, notifier).await;

        assert!(service.register(10, AffiliateProfile::default()).await.is_ok());
    }

    #[tokio::test]
    async fn test_approve_active_affiliate_fails() {
        let mut affiliates = MockAffiliateRepository::new();
        affiliates
            .expect_find_by_id()
            .returning(|id| Ok(Some(sample_affiliate(id, AffiliateStatus::Active))));
        affiliates.expect_activate().times(0);

        let service = service(affiliates, MockUserDirectory::new(), false, MockNotifier::new()).await;
        let err = service.approve(1, 500, None).await.unwrap_err();

        assert!(matches!(err, AppError::InvalidState { .. }));
    }

    #[tokio::test]
    async fn test_approve_suspended_affiliate() {
        let mut affiliates = MockAffiliateRepository::new();
        affiliates
            .expect_find_by_id()
            .returning(|id| Ok(Some(sample_affiliate(id, AffiliateStatus::Suspended))));
        affiliates
            .expect_activate()
            .withf(|id, by, notes, _| *id == 1 && *by == 500 && notes.as_deref() == Some("ok"))
            .times(1)
            .returning(|id, by, _, at| {
                let mut affiliate = sample_affiliate(id, AffiliateStatus::Active);
                affiliate.approved_by = Some(by);
                affiliate.approved_at = Some(at);
                Ok(Some(affiliate))
            });

        let mut notifier = MockNotifier::new();
        notifier
            .expect_send()
            .withf(|n| n.kind == NotificationKind::Approval)
            .times(1)
            .returning(|_| Ok(()));

        let service = service(affiliates, MockUserDirectory::new(), false, notifier).await;
        let affiliate = service.approve(1, 500, Some("ok".to_string())).await.unwrap();

        assert!(affiliate.is_active());
        assert_eq!(affiliate.approved_by, Some(500));
    }

    #[tokio::test]
    async fn test_suspend_returns_suspended_affiliate() {
        let mut affiliates = MockAffiliateRepository::new();
        affiliates
            .expect_find_by_id()
            .returning(|id| Ok(Some(sample_affiliate(id, AffiliateStatus::Active))));
        affiliates
            .expect_suspend()
            .withf(|_, by, reason, _| *by == 7 && reason == "fraud")
            .times(1)
            .returning(|id, _, _, _| {
                Ok(Some(Suspension {
                    affiliate: sample_affiliate(id, AffiliateStatus::Suspended),
                    links_deactivated: 3,
                }))
            });

        let service = service(affiliates, MockUserDirectory::new(), false, MockNotifier::new()).await;
        let affiliate = service.suspend(1, " fraud ".to_string(), 7).await.unwrap();

        assert_eq!(affiliate.status, AffiliateStatus::Suspended);
    }

    #[tokio::test]
    async fn test_suspend_twice_fails() {
        let mut affiliates = MockAffiliateRepository::new();
        affiliates
            .expect_find_by_id()
            .returning(|id| Ok(Some(sample_affiliate(id, AffiliateStatus::Suspended))));
        affiliates.expect_suspend().times(0);

        let service = service(affiliates, MockUserDirectory::new(), false, MockNotifier::new()).await;
        let err = service.suspend(1, "again".to_string(), 7).await.unwrap_err();

        assert!(matches!(err, AppError::InvalidState { .. }));
    }

    #[tokio::test]
    async fn test_update_terms_validates_rate() {
        let mut affiliates = MockAffiliateRepository::new();
        affiliates.expect_update_terms().times(0);

        let service = service(affiliates, MockUserDirectory::new(), false, MockNotifier::new()).await;

        let err = service
            .update_terms(1, None, Some(Decimal::new(2, 0)))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation { .. }));

        let err = service.update_terms(1, None, None).await.unwrap_err();
        assert!(matches!(err, AppError::Validation { .. }));
    }

    #[tokio::test]
    async fn test_list_clamps_paging() {
        let mut affiliates = MockAffiliateRepository::new();
        affiliates
            .expect_list()
            .withf(|status, page, size| {
                *status == Some(AffiliateStatus::Pending) && *page == 1 && *size == MAX_PAGE_SIZE
            })
            .times(1)
            .returning(|_, _, _| Ok(vec![sample_affiliate(1, AffiliateStatus::Pending)]));
        affiliates.expect_count().returning(|_| Ok(1));

        let service = service(affiliates, MockUserDirectory::new(), false, MockNotifier::new()).await;
        let page = service
            .list(Some(AffiliateStatus::Pending), 0, 1000)
            .await
            .unwrap();

        assert_eq!(page.total, 1);
        assert_eq!(page.items.len(), 1);
    }
}
