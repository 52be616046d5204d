//! Row types read with `sqlx::FromRow` and their conversion into entities.
//!
//! Enumerations are stored as text; an unknown value read back from the
//! store is reported as [`AppError::Internal`].

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::types::Json;

use crate::domain::entities::{
    Activity, ActivityMetadata, Affiliate, AffiliateLink, AffiliateSettings, Attribution,
    Commission, CommissionMetadata, LinkClick, PayoutDestination, Referral, UserAccount,
    Withdrawal,
};
use crate::error::AppError;

pub(crate) const AFFILIATE_COLUMNS: &str = "id, user_id, affiliate_code, display_name, website, \
     status, tier, commission_rate, total_sales, total_earnings, available_balance, \
     total_withdrawn, referral_count, approved_at, approved_by, approval_notes, suspended_at, \
     suspended_by, suspension_reason, last_activity_at, created_at, updated_at";

pub(crate) const LINK_COLUMNS: &str = "id, affiliate_id, short_code, title, link_type, \
     target_url, tracking_url, is_active, expires_at, click_count, conversion_count, revenue, \
     last_click_at, created_at";

pub(crate) const REFERRAL_COLUMNS: &str = "id, affiliate_id, referred_user_id, link_id, \
     click_id, status, conversion_type, conversion_value, commission_amount, converted_at, \
     created_at";

pub(crate) const COMMISSION_COLUMNS: &str = "id, affiliate_id, referral_id, commission_type, \
     amount, rate, base_amount, status, tier, order_id, metadata, due_date, approved_at, \
     created_at";

pub(crate) const WITHDRAWAL_COLUMNS: &str = "id, reference, affiliate_id, amount, method, \
     processing_fee, net_amount, destination, status, requested_at, processed_at, \
     processed_by, processing_notes, completed_at, payment_reference";

pub(crate) const ACTIVITY_COLUMNS: &str =
    "id, affiliate_id, activity_type, description, metadata, created_at";

#[derive(sqlx::FromRow)]
pub(crate) struct AffiliateRow {
    id: i64,
    user_id: i64,
    affiliate_code: String,
    display_name: String,
    website: Option<String>,
    status: String,
    tier: String,
    commission_rate: Decimal,
    total_sales: Decimal,
    total_earnings: Decimal,
    available_balance: Decimal,
    total_withdrawn: Decimal,
    referral_count: i64,
    approved_at: Option<DateTime<Utc>>,
    approved_by: Option<i64>,
    approval_notes: Option<String>,
    suspended_at: Option<DateTime<Utc>>,
    suspended_by: Option<i64>,
    suspension_reason: Option<String>,
    last_activity_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<AffiliateRow> for Affiliate {
    type Error = AppError;

    fn try_from(r: AffiliateRow) -> Result<Self, Self::Error> {
        Ok(Affiliate {
            id: r.id,
            user_id: r.user_id,
            affiliate_code: r.affiliate_code,
            display_name: r.display_name,
            website: r.website,
            status: r.status.parse()?,
            tier: r.tier.parse()?,
            commission_rate: r.commission_rate,
            total_sales: r.total_sales,
            total_earnings: r.total_earnings,
            available_balance: r.available_balance,
            total_withdrawn: r.total_withdrawn,
            referral_count: r.referral_count,
            approved_at: r.approved_at,
            approved_by: r.approved_by,
            approval_notes: r.approval_notes,
            suspended_at: r.suspended_at,
            suspended_by: r.suspended_by,
            suspension_reason: r.suspension_reason,
            last_activity_at: r.last_activity_at,
            created_at: r.created_at,
            updated_at: r.updated_at,
        })
    }
}

#[derive(sqlx::FromRow)]
pub(crate) struct LinkRow {
    id: i64,
    affiliate_id: i64,
    short_code: String,
    title: Option<String>,
    link_type: String,
    target_url: String,
    tracking_url: String,
    is_active: bool,
    expires_at: Option<DateTime<Utc>>,
    click_count: i64,
    conversion_count: i64,
    revenue: Decimal,
    last_click_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
}

impl TryFrom<LinkRow> for AffiliateLink {
    type Error = AppError;

    fn try_from(r: LinkRow) -> Result<Self, Self::Error> {
        Ok(AffiliateLink {
            id: r.id,
            affiliate_id: r.affiliate_id,
            short_code: r.short_code,
            title: r.title,
            link_type: r.link_type.parse()?,
            target_url: r.target_url,
            tracking_url: r.tracking_url,
            is_active: r.is_active,
            expires_at: r.expires_at,
            click_count: r.click_count,
            conversion_count: r.conversion_count,
            revenue: r.revenue,
            last_click_at: r.last_click_at,
            created_at: r.created_at,
        })
    }
}

#[derive(sqlx::FromRow)]
pub(crate) struct ClickRow {
    id: i64,
    link_id: i64,
    ip: Option<String>,
    user_agent: Option<String>,
    referer: Option<String>,
    clicked_at: DateTime<Utc>,
}

impl From<ClickRow> for LinkClick {
    fn from(r: ClickRow) -> Self {
        LinkClick {
            id: r.id,
            link_id: r.link_id,
            ip: r.ip,
            user_agent: r.user_agent,
            referer: r.referer,
            clicked_at: r.clicked_at,
        }
    }
}

#[derive(sqlx::FromRow)]
pub(crate) struct ReferralRow {
    id: i64,
    affiliate_id: i64,
    referred_user_id: i64,
    link_id: Option<i64>,
    click_id: Option<i64>,
    status: String,
    conversion_type: Option<String>,
    conversion_value: Option<Decimal>,
    commission_amount: Option<Decimal>,
    converted_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
}

impl TryFrom<ReferralRow> for Referral {
    type Error = AppError;

    fn try_from(r: ReferralRow) -> Result<Self, Self::Error> {
        Ok(Referral {
            id: r.id,
            affiliate_id: r.affiliate_id,
            referred_user_id: r.referred_user_id,
            link_id: r.link_id,
            click_id: r.click_id,
            status: r.status.parse()?,
            conversion_type: r.conversion_type,
            conversion_value: r.conversion_value,
            commission_amount: r.commission_amount,
            converted_at: r.converted_at,
            created_at: r.created_at,
        })
    }
}

#[derive(sqlx::FromRow)]
pub(crate) struct CommissionRow {
    id: i64,
    affiliate_id: i64,
    referral_id: i64,
    commission_type: String,
    amount: Decimal,
    rate: Decimal,
    base_amount: Decimal,
    status: String,
    tier: String,
    order_id: Option<String>,
    metadata: Json<CommissionMetadata>,
    due_date: DateTime<Utc>,
    approved_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
}

impl TryFrom<CommissionRow> for Commission {
    type Error = AppError;

    fn try_from(r: CommissionRow) -> Result<Self, Self::Error> {
        Ok(Commission {
            id: r.id,
            affiliate_id: r.affiliate_id,
            referral_id: r.referral_id,
            commission_type: r.commission_type,
            amount: r.amount,
            rate: r.rate,
            base_amount: r.base_amount,
            status: r.status.parse()?,
            tier: r.tier.parse()?,
            order_id: r.order_id,
            metadata: r.metadata.0,
            due_date: r.due_date,
            approved_at: r.approved_at,
            created_at: r.created_at,
        })
    }
}

#[derive(sqlx::FromRow)]
pub(crate) struct AttributionRow {
    user_id: i64,
    affiliate_code: String,
    token: String,
    click_id: Option<i64>,
    expires_at: DateTime<Utc>,
    created_at: DateTime<Utc>,
}

impl From<AttributionRow> for Attribution {
    fn from(r: AttributionRow) -> Self {
        Attribution {
            user_id: r.user_id,
            affiliate_code: r.affiliate_code,
            token: r.token,
            click_id: r.click_id,
            expires_at: r.expires_at,
            created_at: r.created_at,
        }
    }
}

#[derive(sqlx::FromRow)]
pub(crate) struct WithdrawalRow {
    id: i64,
    reference: String,
    affiliate_id: i64,
    amount: Decimal,
    method: String,
    processing_fee: Decimal,
    net_amount: Decimal,
    destination: Json<PayoutDestination>,
    status: String,
    requested_at: DateTime<Utc>,
    processed_at: Option<DateTime<Utc>>,
    processed_by: Option<i64>,
    processing_notes: Option<String>,
    completed_at: Option<DateTime<Utc>>,
    payment_reference: Option<String>,
}

impl TryFrom<WithdrawalRow> for Withdrawal {
    type Error = AppError;

    fn try_from(r: WithdrawalRow) -> Result<Self, Self::Error> {
        Ok(Withdrawal {
            id: r.id,
            reference: r.reference,
            affiliate_id: r.affiliate_id,
            amount: r.amount,
            method: r.method.parse()?,
            processing_fee: r.processing_fee,
            net_amount: r.net_amount,
            destination: r.destination.0,
            status: r.status.parse()?,
            requested_at: r.requested_at,
            processed_at: r.processed_at,
            processed_by: r.processed_by,
            processing_notes: r.processing_notes,
            completed_at: r.completed_at,
            payment_reference: r.payment_reference,
        })
    }
}

#[derive(sqlx::FromRow)]
pub(crate) struct ActivityRow {
    id: i64,
    affiliate_id: i64,
    activity_type: String,
    description: String,
    metadata: Json<ActivityMetadata>,
    created_at: DateTime<Utc>,
}

impl TryFrom<ActivityRow> for Activity {
    type Error = AppError;

    fn try_from(r: ActivityRow) -> Result<Self, Self::Error> {
        Ok(Activity {
            id: r.id,
            affiliate_id: r.affiliate_id,
            activity_type: r.activity_type.parse()?,
            description: r.description,
            metadata: r.metadata.0,
            created_at: r.created_at,
        })
    }
}

#[derive(sqlx::FromRow)]
pub(crate) struct SettingsRow {
    minimum_payout: Decimal,
    currency: String,
    default_commission_rate: Decimal,
    auto_approve: bool,
    referral_window_days: i64,
    commission_hold_days: i64,
    updated_at: DateTime<Utc>,
}

impl From<SettingsRow> for AffiliateSettings {
    fn from(r: SettingsRow) -> Self {
        AffiliateSettings {
            minimum_payout: r.minimum_payout,
            currency: r.currency,
            default_commission_rate: r.default_commission_rate,
            auto_approve: r.auto_approve,
            referral_window_days: r.referral_window_days,
            commission_hold_days: r.commission_hold_days,
            updated_at: r.updated_at,
        }
    }
}

#[derive(sqlx::FromRow)]
pub(crate) struct UserRow {
    id: i64,
    email: String,
    display_name: Option<String>,
}

impl From<UserRow> for UserAccount {
    fn from(r: UserRow) -> Self {
        UserAccount {
            id: r.id,
            email: r.email,
            display_name: r.display_name,
        }
    }
}

/// Converts a list of rows, failing on the first unreadable one.
pub(crate) fn convert_all<R, T>(rows: Vec<R>) -> Result<Vec<T>, AppError>
where
    T: TryFrom<R, Error = AppError>,
{
    rows.into_iter().map(T::try_from).collect()
}
