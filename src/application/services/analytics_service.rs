//! Read-only performance rollups per affiliate.

use std::sync::Arc;

use rust_decimal::{Decimal, RoundingStrategy};
use serde::Serialize;
use serde_json::json;

use crate::domain::entities::AffiliateLink;
use crate::domain::repositories::{AffiliateRepository, AnalyticsRepository, DateRange};
use crate::error::AppError;

/// Number of links returned in [`AffiliatePerformance::top_links`].
pub const TOP_LINKS: i64 = 5;

/// Aggregated metrics for one affiliate over an optional date range.
#[derive(Debug, Clone, Serialize)]
pub struct AffiliatePerformance {
    pub affiliate_id: i64,
    pub total_clicks: i64,
    /// Clicks from distinct originating IPs.
    pub unique_clicks: i64,
    pub conversions: i64,
    /// Conversions per hundred clicks, two decimals; zero without clicks.
    pub conversion_rate: Decimal,
    pub total_sales: Decimal,
    pub total_commission: Decimal,
    pub available_balance: Decimal,
    pub pending_commission_total: Decimal,
    pub top_links: Vec<AffiliateLink>,
}

pub struct AnalyticsService {
    affiliates: Arc<dyn AffiliateRepository>,
    analytics: Arc<dyn AnalyticsRepository>,
}

impl AnalyticsService {
    pub fn new(
        affiliates: Arc<dyn AffiliateRepository>,
        analytics: Arc<dyn AnalyticsRepository>,
    ) -> Self {
        Self {
            affiliates,
            analytics,
        }
    }

    /// Computes the affiliate's performance. Clicks are filtered by click
    /// time, conversions by commission creation time.
    ///
    /// # Errors
    ///
    /// - [`AppError::Validation`] if the range ends before it starts
    /// - [`AppError::NotFound`] if the affiliate does not exist
    pub async fn get_performance(
        &self,
        affiliate_id: i64,
        range: DateRange,
    ) -> Result<AffiliatePerformance, AppError> {
        if let (Some(start), Some(end)) = (range.start, range.end)
            && start > end
        {
            return Err(AppError::bad_request(
                "Date range ends before it starts",
                json!({ "start": start, "end": end }),
            ));
        }

        let affiliate = self
            .affiliates
            .find_by_id(affiliate_id)
            .await?
            .ok_or_else(|| {
                AppError::not_found("Affiliate not found", json!({ "affiliate_id": affiliate_id }))
            })?;

        let clicks = self.analytics.click_summary(affiliate_id, range).await?;
        let conversions = self.analytics.conversion_summary(affiliate_id, range).await?;
        let pending_commission_total = self.analytics.pending_commission_total(affiliate_id).await?;
        let top_links = self.analytics.top_links(affiliate_id, TOP_LINKS).await?;

        Ok(AffiliatePerformance {
            affiliate_id,
            total_clicks: clicks.total_clicks,
            unique_clicks: clicks.unique_clicks,
            conversions: conversions.conversions,
            conversion_rate: conversion_rate(conversions.conversions, clicks.total_clicks),
            total_sales: conversions.total_sales,
            total_commission: conversions.total_commission,
            available_balance: affiliate.available_balance,
            pending_commission_total,
            top_links,
        })
    }
}

fn conversion_rate(conversions: i64, clicks: i64) -> Decimal {
    if clicks <= 0 {
        return Decimal::ZERO;
    }

    (Decimal::from(conversions) * Decimal::ONE_HUNDRED / Decimal::from(clicks))
        .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entities::{AffiliateStatus, sample_affiliate};
    use crate::domain::repositories::{
        ClickSummary, ConversionSummary, MockAffiliateRepository, MockAnalyticsRepository,
    };
    use chrono::{Duration, Utc};

    #[test]
    fn test_conversion_rate() {
        assert_eq!(conversion_rate(0, 0), Decimal::ZERO);
        assert_eq!(conversion_rate(5, 0), Decimal::ZERO);
        assert_eq!(conversion_rate(1, 3), Decimal::new(3333, 2));
        assert_eq!(conversion_rate(2, 3), Decimal::new(6667, 2));
        assert_eq!(conversion_rate(10, 40), Decimal::new(25, 0));
    }

    #[tokio::test]
    async fn test_get_performance_combines_rollups() {
        let mut affiliates = MockAffiliateRepository::new();
        affiliates.expect_find_by_id().returning(|id| {
            let mut affiliate = sample_affiliate(id, AffiliateStatus::Active);
            affiliate.available_balance = Decimal::new(7250, 2);
            Ok(Some(affiliate))
        });

        let mut analytics = MockAnalyticsRepository::new();
        analytics.expect_click_summary().returning(|_, _| {
            Ok(ClickSummary {
                total_clicks: 8,
                unique_clicks: 5,
            })
        });
        analytics.expect_conversion_summary().returning(|_, _| {
            Ok(ConversionSummary {
                conversions: 2,
                total_sales: Decimal::new(1500, 0),
                total_commission: Decimal::new(75, 0),
            })
        });
        analytics
            .expect_pending_commission_total()
            .returning(|_| Ok(Decimal::new(25, 0)));
        analytics
            .expect_top_links()
            .withf(|_, limit| *limit == TOP_LINKS)
            .returning(|_, _| Ok(Vec::new()));

        let service = AnalyticsService::new(Arc::new(affiliates), Arc::new(analytics));
        let performance = service
            .get_performance(1, DateRange::default())
            .await
            .unwrap();

        assert_eq!(performance.total_clicks, 8);
        assert_eq!(performance.unique_clicks, 5);
        assert_eq!(performance.conversion_rate, Decimal::new(25, 0));
        assert_eq!(performance.available_balance, Decimal::new(7250, 2));
        assert_eq!(performance.pending_commission_total, Decimal::new(25, 0));
    }

    #[tokio::test]
    async fn test_get_performance_rejects_inverted_range() {
        let service = AnalyticsService::new(
            Arc::new(MockAffiliateRepository::new()),
            Arc::new(MockAnalyticsRepository::new()),
        );
        let now = Utc::now();

        let err = service
            .get_performance(
                1,
                DateRange {
                    start: Some(now),
                    end: Some(now - Duration::days(1)),
                },
            )
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::Validation { .. }));
    }

    #[tokio::test]
    async fn test_get_performance_unknown_affiliate() {
        let mut affiliates = MockAffiliateRepository::new();
        affiliates.expect_find_by_id().returning(|_| Ok(None));

        let service =
            AnalyticsService::new(Arc::new(affiliates), Arc::new(MockAnalyticsRepository::new()));
        let err = service
            .get_performance(1, DateRange::default())
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::NotFound { .. }));
    }
}
