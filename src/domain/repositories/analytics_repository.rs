//! Read-only aggregation queries for affiliate performance.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;

use crate::domain::entities::AffiliateLink;
use crate::error::AppError;

/// Optional inclusive date range applied to aggregations.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DateRange {
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
}

impl DateRange {
    pub fn contains(&self, at: DateTime<Utc>) -> bool {
        self.start.is_none_or(|start| at >= start) && self.end.is_none_or(|end| at <= end)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ClickSummary {
    pub total_clicks: i64,
    /// Distinct non-null originating IPs.
    pub unique_clicks: i64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ConversionSummary {
    pub conversions: i64,
    pub total_sales: Decimal,
    pub total_commission: Decimal,
}

/// Aggregations over clicks, commissions and links. Implementations must not
/// write anything.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AnalyticsRepository: Send + Sync {
    /// Clicks on any of the affiliate's links within `range` (by `clicked_at`).
    async fn click_summary(
        &self,
        affiliate_id: i64,
        range: DateRange,
    ) -> Result<ClickSummary, AppError>;

    /// Commissions within `range` (by `created_at`): one per conversion.
    async fn conversion_summary(
        &self,
        affiliate_id: i64,
        range: DateRange,
    ) -> Result<ConversionSummary, AppError>;

    /// Sum of the affiliate's PENDING commission amounts.
    async fn pending_commission_total(&self, affiliate_id: i64) -> Result<Decimal, AppError>;

    /// The affiliate's links ranked by conversion count, then click count.
    async fn top_links(
        &self,
        affiliate_id: i64,
        limit: i64,
    ) -> Result<Vec<AffiliateLink>, AppError>;
}
