use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde_json::json;
use std::collections::{BTreeMap, HashMap, HashSet};
use tokio::sync::Mutex;

use crate::domain::entities::{
    Activity, Affiliate, AffiliateLink, AffiliateSettings, AffiliateStatus, AffiliateTier,
    Attribution, Commission, CommissionStatus, ConversionEntry, ConversionRecord, LinkClick,
    NewActivity, NewAffiliate, NewAffiliateLink, NewLinkClick, NewReferral, NewWithdrawal,
    Referral, ReferralStatus, Suspension, UserAccount, Withdrawal, WithdrawalStatus,
};
use crate::domain::repositories::{
    ActivityRepository, AffiliateRepository, AnalyticsRepository, AttributionRepository,
    ClickSummary, ConversionSummary, DateRange, LinkRepository, ReferralRepository,
    SettingsRepository, UserDirectory, WithdrawalRepository,
};
use crate::error::{
    AFFILIATE_CODE_CONSTRAINT, AFFILIATE_USER_CONSTRAINT, AppError, LINK_SHORT_CODE_CONSTRAINT,
    WITHDRAWAL_REFERENCE_CONSTRAINT,
};
use crate::utils::code_generator::code_suffix;

#[derive(Default)]
struct Sequences {
    affiliate: i64,
    link: i64,
    click: i64,
    referral: i64,
    commission: i64,
    withdrawal: i64,
    activity: i64,
}

fn next(seq: &mut i64) -> i64 {
    *seq += 1;
    *seq
}

struct StoredClick {
    affiliate_id: i64,
    click: LinkClick,
}

#[derive(Default)]
struct Tables {
    seq: Sequences,
    users: BTreeMap<i64, UserAccount>,
    affiliates: BTreeMap<i64, Affiliate>,
    links: BTreeMap<i64, AffiliateLink>,
    clicks: Vec<StoredClick>,
    referrals: BTreeMap<i64, Referral>,
    commissions: BTreeMap<i64, Commission>,
    attributions: HashMap<i64, Attribution>,
    withdrawals: BTreeMap<i64, Withdrawal>,
    activities: Vec<Activity>,
    settings: Option<AffiliateSettings>,
}

impl Tables {
    fn monthly_base_revenue(&self, affiliate_id: i64, since: DateTime<Utc>) -> Decimal {
        self.commissions
            .values()
            .filter(|c| c.affiliate_id == affiliate_id && c.created_at >= since)
            .map(|c| c.base_amount)
            .sum()
    }

    fn open_referral_id(&self, affiliate_id: i64, user_id: i64) -> Option<i64> {
        self.referrals
            .values()
            .find(|r| {
                r.affiliate_id == affiliate_id && r.referred_user_id == user_id && r.status.is_open()
            })
            .map(|r| r.id)
    }

    fn insert_referral(&mut self, new_referral: NewReferral, at: DateTime<Utc>) -> Referral {
        let referral = Referral {
            id: next(&mut self.seq.referral),
            affiliate_id: new_referral.affiliate_id,
            referred_user_id: new_referral.referred_user_id,
            link_id: new_referral.link_id,
            click_id: new_referral.click_id,
            status: new_referral.status,
            conversion_type: None,
            conversion_value: None,
            commission_amount: None,
            converted_at: None,
            created_at: at,
        };
        self.referrals.insert(referral.id, referral.clone());
        referral
    }
}

/// Repository store kept entirely in memory.
#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces a user in the directory.
    pub async fn insert_user(&self, user: UserAccount) {
        self.tables.lock().await.users.insert(user.id, user);
    }

    /// Number of stored clicks, for inspection in tests and demos.
    pub async fn click_count(&self) -> usize {
        self.tables.lock().await.clicks.len()
    }
}

#[async_trait]
impl UserDirectory for MemoryStore {
    async fn find_user(&self, id: i64) -> Result<Option<UserAccount>, AppError> {
        Ok(self.tables.lock().await.users.get(&id).cloned())
    }
}

#[async_trait]
impl AffiliateRepository for MemoryStore {
    async fn create(&self, new_affiliate: NewAffiliate) -> Result<Affiliate, AppError> {
        let mut tables = self.tables.lock().await;

        if tables
            .affiliates
            .values()
            .any(|a| a.user_id == new_affiliate.user_id)
        {
            return Err(AppError::already_affiliate(
                "User is already registered as an affiliate",
                json!({ "constraint": AFFILIATE_USER_CONSTRAINT }),
            ));
        }
        if tables
            .affiliates
            .values()
            .any(|a| a.affiliate_code == new_affiliate.affiliate_code)
        {
            return Err(AppError::conflict(
                "Unique constraint violation",
                json!({ "constraint": AFFILIATE_CODE_CONSTRAINT }),
            ));
        }

        let now = Utc::now();
        let affiliate = Affiliate {
            id: next(&mut tables.seq.affiliate),
            user_id: new_affiliate.user_id,
            affiliate_code: new_affiliate.affiliate_code,
            display_name: new_affiliate.display_name,
            website: new_affiliate.website,
            status: new_affiliate.status,
            tier: new_affiliate.tier,
            commission_rate: new_affiliate.commission_rate,
            total_sales: Decimal::ZERO,
            total_earnings: Decimal::ZERO,
            available_balance: Decimal::ZERO,
            total_withdrawn: Decimal::ZERO,
            referral_count: 0,
            approved_at: new_affiliate.approved_at,
            approved_by: None,
            approval_notes: None,
            suspended_at: None,
            suspended_by: None,
            suspension_reason: None,
            last_activity_at: None,
            created_at: now,
            updated_at: now,
        };
        tables.affiliates.insert(affiliate.id, affiliate.clone());

        Ok(affiliate)
    }

    async fn next_code_suffix(&self, base: &str) -> Result<u64, AppError> {
        let tables = self.tables.lock().await;
        Ok(tables
            .affiliates
            .values()
            .filter_map(|a| code_suffix(base, &a.affiliate_code))
            .max()
            .map_or(0, |highest| highest + 1))
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<Affiliate>, AppError> {
        Ok(self.tables.lock().await.affiliates.get(&id).cloned())
    }

    async fn find_by_user_id(&self, user_id: i64) -> Result<Option<Affiliate>, AppError> {
        let tables = self.tables.lock().await;
        Ok(tables
            .affiliates
            .values()
            .find(|a| a.user_id == user_id)
            .cloned())
    }

    async fn find_by_code(&self, code: &str) -> Result<Option<Affiliate>, AppError> {
        let tables = self.tables.lock().await;
        Ok(tables
            .affiliates
            .values()
            .find(|a| a.affiliate_code == code)
            .cloned())
    }

    async fn list(
        &self,
        status: Option<AffiliateStatus>,
        page: i64,
        page_size: i64,
    ) -> Result<Vec<Affiliate>, AppError> {
        let offset = ((page - 1) * page_size).max(0) as usize;
        let tables = self.tables.lock().await;

        Ok(tables
            .affiliates
            .values()
            .rev()
            .filter(|a| status.is_none_or(|s| a.status == s))
            .skip(offset)
            .take(page_size.max(0) as usize)
            .cloned()
            .collect())
    }

    async fn count(&self, status: Option<AffiliateStatus>) -> Result<i64, AppError> {
        let tables = self.tables.lock().await;
        Ok(tables
            .affiliates
            .values()
            .filter(|a| status.is_none_or(|s| a.status == s))
            .count() as i64)
    }

    async fn activate(
        &self,
        id: i64,
        approved_by: i64,
        notes: Option<String>,
        at: DateTime<Utc>,
    ) -> Result<Option<Affiliate>, AppError> {
        let mut tables = self.tables.lock().await;
        let Some(affiliate) = tables.affiliates.get_mut(&id) else {
            return Ok(None);
        };
        if affiliate.status == AffiliateStatus::Active {
            return Ok(None);
        }

        affiliate.status = AffiliateStatus::Active;
        affiliate.approved_at = Some(at);
        affiliate.approved_by = Some(approved_by);
        affiliate.approval_notes = notes;
        affiliate.updated_at = at;

        Ok(Some(affiliate.clone()))
    }

    async fn suspend(
        &self,
        id: i64,
        suspended_by: i64,
        reason: String,
        at: DateTime<Utc>,
    ) -> Result<Option<Suspension>, AppError> {
        let mut tables = self.tables.lock().await;
        let Some(affiliate) = tables.affiliates.get_mut(&id) else {
            return Ok(None);
        };
        if affiliate.status == AffiliateStatus::Suspended {
            return Ok(None);
        }

        affiliate.status = AffiliateStatus::Suspended;
        affiliate.suspended_at = Some(at);
        affiliate.suspended_by = Some(suspended_by);
        affiliate.suspension_reason = Some(reason);
        affiliate.updated_at = at;
        let affiliate = affiliate.clone();

        let mut links_deactivated = 0;
        for link in tables
            .links
            .values_mut()
            .filter(|l| l.affiliate_id == id && l.is_active)
        {
            link.is_active = false;
            links_deactivated += 1;
        }

        Ok(Some(Suspension {
            affiliate,
            links_deactivated,
        }))
    }

    async fn update_terms(
        &self,
        id: i64,
        tier: Option<AffiliateTier>,
        commission_rate: Option<Decimal>,
    ) -> Result<Option<Affiliate>, AppError> {
        let mut tables = self.tables.lock().await;
        let Some(affiliate) = tables.affiliates.get_mut(&id) else {
            return Ok(None);
        };

        if let Some(tier) = tier {
            affiliate.tier = tier;
        }
        if let Some(rate) = commission_rate {
            affiliate.commission_rate = rate;
        }
        affiliate.updated_at = Utc::now();

        Ok(Some(affiliate.clone()))
    }
}

#[async_trait]
impl LinkRepository for MemoryStore {
    async fn create(&self, new_link: NewAffiliateLink) -> Result<AffiliateLink, AppError> {
        let mut tables = self.tables.lock().await;

        if tables
            .links
            .values()
            .any(|l| l.short_code == new_link.short_code)
        {
            return Err(AppError::conflict(
                "Unique constraint violation",
                json!({ "constraint": LINK_SHORT_CODE_CONSTRAINT }),
            ));
        }

        let link = AffiliateLink {
            id: next(&mut tables.seq.link),
            affiliate_id: new_link.affiliate_id,
            short_code: new_link.short_code,
            title: new_link.title,
            link_type: new_link.link_type,
            target_url: new_link.target_url,
            tracking_url: new_link.tracking_url,
            is_active: true,
            expires_at: new_link.expires_at,
            click_count: 0,
            conversion_count: 0,
            revenue: Decimal::ZERO,
            last_click_at: None,
            created_at: Utc::now(),
        };
        tables.links.insert(link.id, link.clone());

        Ok(link)
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<AffiliateLink>, AppError> {
        Ok(self.tables.lock().await.links.get(&id).cloned())
    }

    async fn find_by_short_code(
        &self,
        short_code: &str,
    ) -> Result<Option<AffiliateLink>, AppError> {
        let tables = self.tables.lock().await;
        Ok(tables
            .links
            .values()
            .find(|l| l.short_code == short_code)
            .cloned())
    }

    async fn list_by_affiliate(&self, affiliate_id: i64) -> Result<Vec<AffiliateLink>, AppError> {
        let tables = self.tables.lock().await;
        Ok(tables
            .links
            .values()
            .rev()
            .filter(|l| l.affiliate_id == affiliate_id)
            .cloned()
            .collect())
    }

    async fn record_click(&self, click: NewLinkClick) -> Result<LinkClick, AppError> {
        let mut tables = self.tables.lock().await;

        let Some(link) = tables.links.get_mut(&click.link_id) else {
            return Err(AppError::not_found(
                "Link not found",
                json!({ "link_id": click.link_id }),
            ));
        };
        link.click_count += 1;
        link.last_click_at = Some(click.clicked_at);

        if let Some(affiliate) = tables.affiliates.get_mut(&click.affiliate_id) {
            affiliate.last_activity_at = Some(click.clicked_at);
        }

        let stored = LinkClick {
            id: next(&mut tables.seq.click),
            link_id: click.link_id,
            ip: click.ip,
            user_agent: click.user_agent,
            referer: click.referer,
            clicked_at: click.clicked_at,
        };
        tables.clicks.push(StoredClick {
            affiliate_id: click.affiliate_id,
            click: stored.clone(),
        });

        Ok(stored)
    }

    async fn find_click(&self, id: i64) -> Result<Option<LinkClick>, AppError> {
        let tables = self.tables.lock().await;
        Ok(tables
            .clicks
            .iter()
            .find(|c| c.click.id == id)
            .map(|c| c.click.clone()))
    }

    async fn set_active(
        &self,
        id: i64,
        is_active: bool,
    ) -> Result<Option<AffiliateLink>, AppError> {
        let mut tables = self.tables.lock().await;
        Ok(tables.links.get_mut(&id).map(|link| {
            link.is_active = is_active;
            link.clone()
        }))
    }
}

#[async_trait]
impl ReferralRepository for MemoryStore {
    async fn open_referral(&self, new_referral: NewReferral) -> Result<Referral, AppError> {
        let mut tables = self.tables.lock().await;

        if let Some(id) =
            tables.open_referral_id(new_referral.affiliate_id, new_referral.referred_user_id)
            && let Some(existing) = tables.referrals.get(&id)
        {
            return Ok(existing.clone());
        }

        Ok(tables.insert_referral(new_referral, Utc::now()))
    }

    async fn record_conversion(
        &self,
        entry: ConversionEntry,
    ) -> Result<Option<ConversionRecord>, AppError> {
        let mut tables = self.tables.lock().await;
        let at = entry.occurred_at;

        let Some(locked) = tables
            .affiliates
            .get(&entry.affiliate_id)
            .filter(|a| a.is_active())
        else {
            return Ok(None);
        };
        let monthly = tables.monthly_base_revenue(entry.affiliate_id, entry.month_start);
        let priced = entry.price(locked, monthly)?;

        let referral_id = match tables.open_referral_id(entry.affiliate_id, entry.referred_user_id)
        {
            Some(id) => id,
            None => {
                tables
                    .insert_referral(
                        NewReferral {
                            affiliate_id: entry.affiliate_id,
                            referred_user_id: entry.referred_user_id,
                            link_id: entry.link_id,
                            click_id: entry.click_id,
                            status: ReferralStatus::Confirmed,
                        },
                        at,
                    )
                    .id
            }
        };

        let commission = Commission {
            id: next(&mut tables.seq.commission),
            affiliate_id: entry.affiliate_id,
            referral_id,
            commission_type: entry.conversion_type.clone(),
            amount: priced.amount,
            rate: priced.effective_rate,
            base_amount: entry.conversion_value,
            status: CommissionStatus::Pending,
            tier: priced.tier,
            order_id: entry.order_id,
            metadata: priced.metadata,
            due_date: entry.due_date,
            approved_at: None,
            created_at: at,
        };
        tables.commissions.insert(commission.id, commission.clone());

        let referral = tables
            .referrals
            .get_mut(&referral_id)
            .ok_or_else(|| AppError::internal("Referral vanished", json!({ "id": referral_id })))?;
        referral.status = ReferralStatus::Converted;
        referral.conversion_type = Some(entry.conversion_type);
        referral.conversion_value = Some(entry.conversion_value);
        referral.commission_amount = Some(priced.amount);
        referral.converted_at = Some(at);
        let referral = referral.clone();

        let affiliate = tables.affiliates.get_mut(&entry.affiliate_id).ok_or_else(|| {
            AppError::internal("Affiliate vanished", json!({ "id": entry.affiliate_id }))
        })?;
        affiliate.total_sales += entry.conversion_value;
        affiliate.total_earnings += priced.amount;
        affiliate.available_balance += priced.amount;
        affiliate.referral_count += 1;
        affiliate.last_activity_at = Some(at);
        affiliate.updated_at = at;
        let affiliate = affiliate.clone();

        if let Some(link) = referral.link_id.and_then(|id| tables.links.get_mut(&id)) {
            link.conversion_count += 1;
            link.revenue += entry.conversion_value;
        }

        Ok(Some(ConversionRecord {
            commission,
            referral,
            affiliate,
        }))
    }

    async fn find_referral(&self, id: i64) -> Result<Option<Referral>, AppError> {
        Ok(self.tables.lock().await.referrals.get(&id).cloned())
    }

    async fn find_commission(&self, id: i64) -> Result<Option<Commission>, AppError> {
        Ok(self.tables.lock().await.commissions.get(&id).cloned())
    }

    async fn list_commissions(&self, affiliate_id: i64) -> Result<Vec<Commission>, AppError> {
        let tables = self.tables.lock().await;
        Ok(tables
            .commissions
            .values()
            .rev()
            .filter(|c| c.affiliate_id == affiliate_id)
            .cloned()
            .collect())
    }

    async fn approve_commission(
        &self,
        id: i64,
        at: DateTime<Utc>,
    ) -> Result<Option<Commission>, AppError> {
        let mut tables = self.tables.lock().await;
        Ok(tables
            .commissions
            .get_mut(&id)
            .filter(|c| c.status == CommissionStatus::Pending)
            .map(|commission| {
                commission.status = CommissionStatus::Approved;
                commission.approved_at = Some(at);
                commission.clone()
            }))
    }
}

#[async_trait]
impl AttributionRepository for MemoryStore {
    async fn save(&self, attribution: Attribution) -> Result<Attribution, AppError> {
        let mut tables = self.tables.lock().await;
        tables
            .attributions
            .insert(attribution.user_id, attribution.clone());
        Ok(attribution)
    }

    async fn find(&self, user_id: i64) -> Result<Option<Attribution>, AppError> {
        Ok(self.tables.lock().await.attributions.get(&user_id).cloned())
    }
}

#[async_trait]
impl WithdrawalRepository for MemoryStore {
    async fn create_reserved(
        &self,
        new_withdrawal: NewWithdrawal,
    ) -> Result<Option<Withdrawal>, AppError> {
        let mut tables = self.tables.lock().await;

        if tables
            .withdrawals
            .values()
            .any(|w| w.reference == new_withdrawal.reference)
        {
            return Err(AppError::conflict(
                "Unique constraint violation",
                json!({ "constraint": WITHDRAWAL_REFERENCE_CONSTRAINT }),
            ));
        }

        let Some(affiliate) = tables
            .affiliates
            .get_mut(&new_withdrawal.affiliate_id)
            .filter(|a| {
                a.status == AffiliateStatus::Active
                    && a.available_balance >= new_withdrawal.amount
            })
        else {
            return Ok(None);
        };
        affiliate.available_balance -= new_withdrawal.amount;
        affiliate.updated_at = new_withdrawal.requested_at;

        let withdrawal = Withdrawal {
            id: next(&mut tables.seq.withdrawal),
            reference: new_withdrawal.reference,
            affiliate_id: new_withdrawal.affiliate_id,
            amount: new_withdrawal.amount,
            method: new_withdrawal.method,
            processing_fee: new_withdrawal.processing_fee,
            net_amount: new_withdrawal.net_amount,
            destination: new_withdrawal.destination,
            status: WithdrawalStatus::Pending,
            requested_at: new_withdrawal.requested_at,
            processed_at: None,
            processed_by: None,
            processing_notes: None,
            completed_at: None,
            payment_reference: None,
        };
        tables.withdrawals.insert(withdrawal.id, withdrawal.clone());

        Ok(Some(withdrawal))
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<Withdrawal>, AppError> {
        Ok(self.tables.lock().await.withdrawals.get(&id).cloned())
    }

    async fn list_by_affiliate(&self, affiliate_id: i64) -> Result<Vec<Withdrawal>, AppError> {
        let tables = self.tables.lock().await;
        Ok(tables
            .withdrawals
            .values()
            .rev()
            .filter(|w| w.affiliate_id == affiliate_id)
            .cloned()
            .collect())
    }

    async fn mark_processing(
        &self,
        id: i64,
        processed_by: i64,
        notes: Option<String>,
        at: DateTime<Utc>,
    ) -> Result<Option<Withdrawal>, AppError> {
        let mut tables = self.tables.lock().await;
        Ok(tables
            .withdrawals
            .get_mut(&id)
            .filter(|w| w.status == WithdrawalStatus::Pending)
            .map(|withdrawal| {
                withdrawal.status = WithdrawalStatus::Processing;
                withdrawal.processed_at = Some(at);
                withdrawal.processed_by = Some(processed_by);
                withdrawal.processing_notes = notes;
                withdrawal.clone()
            }))
    }

    async fn mark_completed(
        &self,
        id: i64,
        payment_reference: String,
        at: DateTime<Utc>,
    ) -> Result<Option<Withdrawal>, AppError> {
        let mut tables = self.tables.lock().await;

        let Some(withdrawal) = tables
            .withdrawals
            .get_mut(&id)
            .filter(|w| w.status == WithdrawalStatus::Processing)
        else {
            return Ok(None);
        };
        withdrawal.status = WithdrawalStatus::Completed;
        withdrawal.completed_at = Some(at);
        withdrawal.payment_reference = Some(payment_reference);
        let withdrawal = withdrawal.clone();

        if let Some(affiliate) = tables.affiliates.get_mut(&withdrawal.affiliate_id) {
            affiliate.total_withdrawn += withdrawal.amount;
            affiliate.updated_at = at;
        }

        Ok(Some(withdrawal))
    }
}

#[async_trait]
impl ActivityRepository for MemoryStore {
    async fn append(&self, activity: NewActivity) -> Result<Activity, AppError> {
        let mut tables = self.tables.lock().await;
        let activity = Activity {
            id: next(&mut tables.seq.activity),
            affiliate_id: activity.affiliate_id,
            activity_type: activity.activity_type,
            description: activity.description,
            metadata: activity.metadata,
            created_at: Utc::now(),
        };
        tables.activities.push(activity.clone());
        Ok(activity)
    }

    async fn list_by_affiliate(
        &self,
        affiliate_id: i64,
        limit: i64,
    ) -> Result<Vec<Activity>, AppError> {
        let tables = self.tables.lock().await;
        Ok(tables
            .activities
            .iter()
            .rev()
            .filter(|a| a.affiliate_id == affiliate_id)
            .take(limit.max(0) as usize)
            .cloned()
            .collect())
    }
}

#[async_trait]
impl SettingsRepository for MemoryStore {
    async fn load(&self) -> Result<Option<AffiliateSettings>, AppError> {
        Ok(self.tables.lock().await.settings.clone())
    }

    async fn save(&self, settings: AffiliateSettings) -> Result<AffiliateSettings, AppError> {
        self.tables.lock().await.settings = Some(settings.clone());
        Ok(settings)
    }
}

#[async_trait]
impl AnalyticsRepository for MemoryStore {
    async fn click_summary(
        &self,
        affiliate_id: i64,
        range: DateRange,
    ) -> Result<ClickSummary, AppError> {
        let tables = self.tables.lock().await;
        let clicks: Vec<&LinkClick> = tables
            .clicks
            .iter()
            .filter(|c| c.affiliate_id == affiliate_id && range.contains(c.click.clicked_at))
            .map(|c| &c.click)
            .collect();

        let unique_ips: HashSet<&str> = clicks.iter().filter_map(|c| c.ip.as_deref()).collect();

        Ok(ClickSummary {
            total_clicks: clicks.len() as i64,
            unique_clicks: unique_ips.len() as i64,
        })
    }

    async fn conversion_summary(
        &self,
        affiliate_id: i64,
        range: DateRange,
    ) -> Result<ConversionSummary, AppError> {
        let tables = self.tables.lock().await;
        Ok(tables
            .commissions
            .values()
            .filter(|c| c.affiliate_id == affiliate_id && range.contains(c.created_at))
            .fold(ConversionSummary::default(), |mut summary, c| {
                summary.conversions += 1;
                summary.total_sales += c.base_amount;
                summary.total_commission += c.amount;
                summary
            }))
    }

    async fn pending_commission_total(&self, affiliate_id: i64) -> Result<Decimal, AppError> {
        let tables = self.tables.lock().await;
        Ok(tables
            .commissions
            .values()
            .filter(|c| c.affiliate_id == affiliate_id && c.status == CommissionStatus::Pending)
            .map(|c| c.amount)
            .sum())
    }

    async fn top_links(
        &self,
        affiliate_id: i64,
        limit: i64,
    ) -> Result<Vec<AffiliateLink>, AppError> {
        let tables = self.tables.lock().await;
        let mut links: Vec<AffiliateLink> = tables
            .links
            .values()
            .filter(|l| l.affiliate_id == affiliate_id)
            .cloned()
            .collect();

        links.sort_by(|a, b| {
            b.conversion_count
                .cmp(&a.conversion_count)
                .then(b.click_count.cmp(&a.click_count))
                .then(a.id.cmp(&b.id))
        });
        links.truncate(limit.max(0) as usize);

        Ok(links)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entities::{
        CommissionMetadata, LinkType, PayoutDestination, WithdrawalMethod,
    };

    fn new_affiliate(user_id: i64, code: &str) -> NewAffiliate {
        NewAffiliate {
            user_id,
            affiliate_code: code.to_string(),
            display_name: code.to_string(),
            website: None,
            status: AffiliateStatus::Active,
            tier: AffiliateTier::Bronze,
            commission_rate: Decimal::new(5, 2),
            approved_at: None,
        }
    }

    fn new_link(affiliate_id: i64, short_code: &str) -> NewAffiliateLink {
        NewAffiliateLink {
            affiliate_id,
            short_code: short_code.to_string(),
            title: None,
            link_type: LinkType::Custom,
            target_url: "https://shop.example.com/".to_string(),
            tracking_url: format!("https://aff.example.com/ref/{short_code}"),
            expires_at: None,
        }
    }

    #[tokio::test]
    async fn test_create_affiliate_unique_constraints() {
        let store = MemoryStore::new();
        AffiliateRepository::create(&store, new_affiliate(1, "janedoe"))
            .await
            .unwrap();

        let same_user = AffiliateRepository::create(&store, new_affiliate(1, "other01"))
            .await
            .unwrap_err();
        assert!(matches!(same_user, AppError::AlreadyAffiliate { .. }));

        let same_code = AffiliateRepository::create(&store, new_affiliate(2, "janedoe"))
            .await
            .unwrap_err();
        assert_eq!(same_code.constraint(), Some(AFFILIATE_CODE_CONSTRAINT));
    }

    #[tokio::test]
    async fn test_suspend_deactivates_only_own_links() {
        let store = MemoryStore::new();
        let a = AffiliateRepository::create(&store, new_affiliate(1, "aaaaaa"))
            .await
            .unwrap();
        let b = AffiliateRepository::create(&store, new_affiliate(2, "bbbbbb"))
            .await
            .unwrap();
        LinkRepository::create(&store, new_link(a.id, "00000001")).await.unwrap();
        LinkRepository::create(&store, new_link(a.id, "00000002")).await.unwrap();
        LinkRepository::create(&store, new_link(b.id, "00000003")).await.unwrap();

        let suspension = store
            .suspend(a.id, 99, "fraud".to_string(), Utc::now())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(suspension.links_deactivated, 2);

        let a_links = LinkRepository::list_by_affiliate(&store, a.id).await.unwrap();
        assert!(a_links.iter().all(|l| !l.is_active));
        let b_links = LinkRepository::list_by_affiliate(&store, b.id).await.unwrap();
        assert!(b_links.iter().all(|l| l.is_active));

        assert!(
            store
                .suspend(a.id, 99, "again".to_string(), Utc::now())
                .await
                .unwrap()
                .is_none()
        );
    }

    #[tokio::test]
    async fn test_open_referral_is_idempotent() {
        let store = MemoryStore::new();
        let new_referral = || NewReferral {
            affiliate_id: 1,
            referred_user_id: 7,
            link_id: None,
            click_id: None,
            status: ReferralStatus::Pending,
        };

        let first = store.open_referral(new_referral()).await.unwrap();
        let second = store.open_referral(new_referral()).await.unwrap();
        assert_eq!(first.id, second.id);
    }

    #[tokio::test]
    async fn test_create_reserved_refuses_overdraw() {
        let store = MemoryStore::new();
        let affiliate = AffiliateRepository::create(&store, new_affiliate(1, "aaaaaa"))
            .await
            .unwrap();

        let withdrawal = NewWithdrawal {
            reference: "WD-20261019-00000001".to_string(),
            affiliate_id: affiliate.id,
            amount: Decimal::new(100, 0),
            method: WithdrawalMethod::Check,
            processing_fee: Decimal::new(5, 0),
            net_amount: Decimal::new(95, 0),
            destination: PayoutDestination::Check {
                payee_name: "Jane".to_string(),
                mailing_address: "1 Main St".to_string(),
            },
            requested_at: Utc::now(),
        };

        assert!(store.create_reserved(withdrawal).await.unwrap().is_none());
        let affiliate = AffiliateRepository::find_by_id(&store, affiliate.id)
            .await
            .unwrap()
            .unwrap();
        assert!(affiliate.available_balance.is_zero());
    }

    fn conversion(affiliate_id: i64, user_id: i64, value: i64) -> ConversionEntry {
        let now = Utc::now();
        ConversionEntry {
            affiliate_id,
            referred_user_id: user_id,
            click_id: None,
            link_id: None,
            conversion_type: "sale".to_string(),
            conversion_value: Decimal::new(value, 0),
            order_id: None,
            metadata: CommissionMetadata::default(),
            month_start: now - chrono::Duration::days(1),
            due_date: now,
            occurred_at: now,
        }
    }

    #[tokio::test]
    async fn test_record_conversion_prices_against_booked_revenue() {
        let store = MemoryStore::new();
        let affiliate = AffiliateRepository::create(&store, new_affiliate(1, "aaaaaa"))
            .await
            .unwrap();

        let first = store
            .record_conversion(conversion(affiliate.id, 7, 6000))
            .await
            .unwrap()
            .unwrap();
        let second = store
            .record_conversion(conversion(affiliate.id, 8, 6000))
            .await
            .unwrap()
            .unwrap();

        assert!(first.commission.metadata.performance_bonus_rate.is_zero());
        assert_eq!(first.commission.amount, Decimal::new(300, 0));
        assert_eq!(second.commission.metadata.performance_bonus_rate, Decimal::new(1, 2));
        assert_eq!(second.commission.amount, Decimal::new(360, 0));
        assert_eq!(second.affiliate.available_balance, Decimal::new(660, 0));
    }

    #[tokio::test]
    async fn test_record_conversion_skips_inactive_affiliate() {
        let store = MemoryStore::new();
        let affiliate = AffiliateRepository::create(&store, new_affiliate(1, "aaaaaa"))
            .await
            .unwrap();
        store
            .suspend(affiliate.id, 99, "fraud".to_string(), Utc::now())
            .await
            .unwrap();

        let booked = store
            .record_conversion(conversion(affiliate.id, 7, 1000))
            .await
            .unwrap();
        assert!(booked.is_none());
        assert!(store.list_commissions(affiliate.id).await.unwrap().is_empty());
        assert!(store.find_referral(1).await.unwrap().is_none());

        let missing = store.record_conversion(conversion(404, 7, 1000)).await.unwrap();
        assert!(missing.is_none());
    }
}
