//! Pagination and filtering query parameters.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_with::{DisplayFromStr, serde_as};

use crate::domain::repositories::DateRange;

const DEFAULT_PAGE_SIZE: u32 = 25;
const MAX_PAGE_SIZE: u32 = 100;

/// Pagination query parameters.
///
/// Uses `serde_with` to parse page numbers from query strings as integers.
#[serde_as]
#[derive(Debug, Default, Deserialize)]
pub struct PaginationParams {
    #[serde_as(as = "Option<DisplayFromStr>")]
    #[serde(default)]
    pub page: Option<u32>,

    #[serde_as(as = "Option<DisplayFromStr>")]
    #[serde(default)]
    pub page_size: Option<u32>,
}

impl PaginationParams {
    /// Validates the parameters and returns `(page, page_size)`.
    ///
    /// # Defaults
    ///
    /// - `page`: 1
    /// - `page_size`: 25
    ///
    /// # Validation
    ///
    /// - Page must be > 0
    /// - Page size must be between 1 and 100
    pub fn validate(&self) -> Result<(u32, u32), String> {
        let page = self.page.unwrap_or(1);
        let page_size = self.page_size.unwrap_or(DEFAULT_PAGE_SIZE);

        if page == 0 {
            return Err("Page must be greater than 0".to_string());
        }

        if !(1..=MAX_PAGE_SIZE).contains(&page_size) {
            return Err(format!("Page size must be between 1 and {MAX_PAGE_SIZE}"));
        }

        Ok((page, page_size))
    }
}

/// Pagination metadata for responses.
#[derive(Debug, Serialize)]
pub struct PaginationMeta {
    pub page: u32,
    pub page_size: u32,
    pub total_items: i64,
    pub total_pages: u32,
}

impl PaginationMeta {
    pub fn new(page: u32, page_size: u32, total_items: i64) -> Self {
        let total_pages = (total_items.max(0) as u64).div_ceil(u64::from(page_size)) as u32;
        Self {
            page,
            page_size,
            total_items,
            total_pages,
        }
    }
}

/// Date range filtering parameters.
#[derive(Debug, Default, Deserialize)]
pub struct DateFilterParams {
    #[serde(default, with = "optional_rfc3339")]
    pub from: Option<DateTime<Utc>>,

    #[serde(default, with = "optional_rfc3339")]
    pub to: Option<DateTime<Utc>>,
}

impl From<DateFilterParams> for DateRange {
    fn from(params: DateFilterParams) -> Self {
        DateRange {
            start: params.from,
            end: params.to,
        }
    }
}

/// Custom Serde deserializer for RFC3339 datetime strings.
mod optional_rfc3339 {
    use chrono::{DateTime, Utc};
    use serde::{Deserialize, Deserializer};

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let opt: Option<String> = Option::deserialize(deserializer)?;
        match opt {
            None => Ok(None),
            Some(s) => DateTime::parse_from_rfc3339(&s)
                .map(|dt| Some(dt.with_timezone(&Utc)))
                .map_err(serde::de::Error::custom),
        }
    }
}

/// `?limit=` for activity listings.
#[serde_as]
#[derive(Debug, Default, Deserialize)]
pub struct LimitParams {
    #[serde_as(as = "Option<DisplayFromStr>")]
    #[serde(default)]
    pub limit: Option<i64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(page: Option<u32>, page_size: Option<u32>) -> PaginationParams {
        PaginationParams { page, page_size }
    }

    #[test]
    fn test_defaults() {
        assert_eq!(params(None, None).validate().unwrap(), (1, 25));
    }

    #[test]
    fn test_custom_page_and_size() {
        assert_eq!(params(Some(3), Some(50)).validate().unwrap(), (3, 50));
    }

    #[test]
    fn test_page_zero_is_error() {
        assert!(params(Some(0), None).validate().is_err());
    }

    #[test]
    fn test_page_size_bounds() {
        assert!(params(None, Some(0)).validate().is_err());
        assert!(params(None, Some(1)).validate().is_ok());
        assert!(params(None, Some(100)).validate().is_ok());
        assert!(params(None, Some(101)).validate().is_err());
    }

    #[test]
    fn test_pagination_meta_total_pages() {
        assert_eq!(PaginationMeta::new(1, 25, 0).total_pages, 0);
        assert_eq!(PaginationMeta::new(1, 25, 25).total_pages, 1);
        assert_eq!(PaginationMeta::new(1, 25, 26).total_pages, 2);
    }

    #[test]
    fn test_optional_rfc3339_deserializer() {
        let json = r#"{"from": "2026-01-01T00:00:00Z", "to": null}"#;
        let p: DateFilterParams = serde_json::from_str(json).unwrap();
        assert!(p.from.is_some());
        assert!(p.to.is_none());

        let range = DateRange::from(p);
        assert!(range.start.is_some());
        assert!(range.end.is_none());
    }

    #[test]
    fn test_optional_rfc3339_invalid_format_is_error() {
        let json = r#"{"from": "not-a-date"}"#;
        assert!(serde_json::from_str::<DateFilterParams>(json).is_err());
    }
}
