//! Shared application state injected into every handler.

use sqlx::PgPool;
use std::sync::Arc;

use crate::application::services::{
    ActivityLog, AffiliateService, AnalyticsService, ConversionService, LinkService,
    SettingsService, WithdrawalService,
};
use crate::domain::referral_token::ReferralTokenCodec;
use crate::domain::repositories::{
    ActivityRepository, AffiliateRepository, AnalyticsRepository, AttributionRepository,
    LinkRepository, ReferralRepository, SettingsRepository, UserDirectory, WithdrawalRepository,
};
use crate::error::AppError;
use crate::infrastructure::memory::MemoryStore;
use crate::infrastructure::notification::Notifier;
use crate::infrastructure::persistence::{
    PgActivityRepository, PgAffiliateRepository, PgAnalyticsRepository, PgAttributionRepository,
    PgLinkRepository, PgReferralRepository, PgSettingsRepository, PgUserDirectory,
    PgWithdrawalRepository,
};
use crate::infrastructure::settlement::SettlementGateway;

/// One handle per repository trait.
#[derive(Clone)]
pub struct Repositories {
    pub affiliates: Arc<dyn AffiliateRepository>,
    pub links: Arc<dyn LinkRepository>,
    pub referrals: Arc<dyn ReferralRepository>,
    pub attributions: Arc<dyn AttributionRepository>,
    pub withdrawals: Arc<dyn WithdrawalRepository>,
    pub activities: Arc<dyn ActivityRepository>,
    pub settings: Arc<dyn SettingsRepository>,
    pub analytics: Arc<dyn AnalyticsRepository>,
    pub users: Arc<dyn UserDirectory>,
}

impl Repositories {
    pub fn postgres(pool: Arc<PgPool>) -> Self {
        Self {
            affiliates: Arc::new(PgAffiliateRepository::new(pool.clone())),
            links: Arc::new(PgLinkRepository::new(pool.clone())),
            referrals: Arc::new(PgReferralRepository::new(pool.clone())),
            attributions: Arc::new(PgAttributionRepository::new(pool.clone())),
            withdrawals: Arc::new(PgWithdrawalRepository::new(pool.clone())),
            activities: Arc::new(PgActivityRepository::new(pool.clone())),
            settings: Arc::new(PgSettingsRepository::new(pool.clone())),
            analytics: Arc::new(PgAnalyticsRepository::new(pool.clone())),
            users: Arc::new(PgUserDirectory::new(pool)),
        }
    }

    pub fn in_memory(store: Arc<MemoryStore>) -> Self {
        Self {
            affiliates: store.clone(),
            links: store.clone(),
            referrals: store.clone(),
            attributions: store.clone(),
            withdrawals: store.clone(),
            activities: store.clone(),
            settings: store.clone(),
            analytics: store.clone(),
            users: store,
        }
    }
}

/// Collaborators and settings the services are built from.
pub struct EngineOptions {
    pub notifier: Arc<dyn Notifier>,
    pub settlement: Arc<dyn SettlementGateway>,
    pub referral_token_secret: String,
    pub public_base_url: String,
    /// Take the client IP from `X-Forwarded-For` when resolving clicks.
    pub behind_proxy: bool,
}

#[derive(Clone)]
pub struct AppState {
    pub affiliate_service: Arc<AffiliateService>,
    pub link_service: Arc<LinkService>,
    pub conversion_service: Arc<ConversionService>,
    pub withdrawal_service: Arc<WithdrawalService>,
    pub analytics_service: Arc<AnalyticsService>,
    pub settings_service: Arc<SettingsService>,
    pub activity_log: Arc<ActivityLog>,
    pub behind_proxy: bool,
}

impl AppState {
    /// Wires every service on top of the given repositories.
    ///
    /// Loads the program settings, saving the defaults on first start.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Internal`] if the settings cannot be loaded.
    pub async fn build(repos: Repositories, options: EngineOptions) -> Result<Self, AppError> {
        let settings_service = Arc::new(SettingsService::initialize(repos.settings.clone()).await?);
        let activity_log = Arc::new(ActivityLog::new(repos.activities.clone()));
        let tokens = ReferralTokenCodec::new(options.referral_token_secret);

        let affiliate_service = Arc::new(AffiliateService::new(
            repos.affiliates.clone(),
            repos.users.clone(),
            settings_service.clone(),
            activity_log.clone(),
            options.notifier,
        ));
        let link_service = Arc::new(LinkService::new(
            repos.affiliates.clone(),
            repos.links.clone(),
            activity_log.clone(),
            tokens.clone(),
            options.public_base_url,
        ));
        let conversion_service = Arc::new(ConversionService::new(
            repos.affiliates.clone(),
            repos.links.clone(),
            repos.referrals.clone(),
            repos.attributions.clone(),
            settings_service.clone(),
            activity_log.clone(),
            tokens,
        ));
        let withdrawal_service = Arc::new(WithdrawalService::new(
            repos.affiliates.clone(),
            repos.withdrawals.clone(),
            settings_service.clone(),
            activity_log.clone(),
            options.settlement,
        ));
        let analytics_service = Arc::new(AnalyticsService::new(
            repos.affiliates.clone(),
            repos.analytics.clone(),
        ));

        Ok(Self {
            affiliate_service,
            link_service,
            conversion_service,
            withdrawal_service,
            analytics_service,
            settings_service,
            activity_log,
            behind_proxy: options.behind_proxy,
        })
    }
}
