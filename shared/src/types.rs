//! Common types used across the backend

use chrono::{DateTime, Datelike, Duration, FixedOffset, NaiveDate, TimeZone, Utc};
use serde::{Deserialize, Serialize};

/// Pagination parameters
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct Pagination {
    pub page: u32,
    pub limit: u32,
}

impl Default for Pagination {
    fn default() -> Self {
        Self { page: 1, limit: 10 }
    }
}

impl Pagination {
    pub const MAX_LIMIT: u32 = 100;

    /// Clamp user input: page starts at 1, limit within 1..=MAX_LIMIT
    pub fn new(page: Option<u32>, limit: Option<u32>, default_limit: u32) -> Self {
        Self {
            page: page.unwrap_or(1).max(1),
            limit: limit.unwrap_or(default_limit).clamp(1, Self::MAX_LIMIT),
        }
    }

    pub fn offset(&self) -> i64 {
        i64::from(self.page - 1) * i64::from(self.limit)
    }

    pub fn meta(&self, total_items: u64) -> PaginationMeta {
        let limit = u64::from(self.limit);
        PaginationMeta {
            page: self.page,
            limit: self.limit,
            total_items,
            total_pages: total_items.div_ceil(limit) as u32,
        }
    }
}

/// Paginated response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaginatedResponse<T> {
    pub data: Vec<T>,
    pub pagination: PaginationMeta,
}

/// Pagination metadata
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PaginationMeta {
    pub page: u32,
    pub limit: u32,
    pub total_items: u64,
    pub total_pages: u32,
}

/// Half-open instant range `[start, end)`
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct DateRange {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl DateRange {
    /// Whole local days from `from` through `to` inclusive, in the store's offset
    pub fn from_local_days(from: NaiveDate, to: NaiveDate, offset: FixedOffset) -> Self {
        Self {
            start: local_midnight(from, offset),
            end: local_midnight(to + Duration::days(1), offset),
        }
    }
}

/// Reporting window for sales statistics
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum StatsPeriod {
    #[default]
    Today,
    /// Sunday through today
    Week,
    Month,
    Year,
}

impl StatsPeriod {
    /// Range covering the period that contains `now`, in local business days
    pub fn range(&self, now: DateTime<Utc>, offset: FixedOffset) -> DateRange {
        let today = now.with_timezone(&offset).date_naive();
        let (from, to) = match self {
            StatsPeriod::Today => (today, today),
            StatsPeriod::Week => {
                let back = i64::from(today.weekday().num_days_from_sunday());
                (today - Duration::days(back), today)
            }
            StatsPeriod::Month => {
                let first = today.with_day(1).unwrap_or(today);
                (first, last_day_of_month(first))
            }
            StatsPeriod::Year => {
                let first = NaiveDate::from_ymd_opt(today.year(), 1, 1).unwrap_or(today);
                let last = NaiveDate::from_ymd_opt(today.year(), 12, 31).unwrap_or(today);
                (first, last)
            }
        };
        DateRange::from_local_days(from, to, offset)
    }
}

/// Start of a local calendar day as a UTC instant
pub fn local_midnight(day: NaiveDate, offset: FixedOffset) -> DateTime<Utc> {
    let naive = day.and_hms_opt(0, 0, 0).unwrap_or_default();
    offset
        .from_local_datetime(&naive)
        .single()
        .map(|local| local.with_timezone(&Utc))
        .unwrap_or_else(|| Utc.from_utc_datetime(&naive))
}

fn last_day_of_month(first: NaiveDate) -> NaiveDate {
    let (year, month) = if first.month() == 12 {
        (first.year() + 1, 1)
    } else {
        (first.year(), first.month() + 1)
    };
    NaiveDate::from_ymd_opt(year, month, 1)
        .map(|next| next - Duration::days(1))
        .unwrap_or(first)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mexico_city() -> FixedOffset {
        FixedOffset::west_opt(6 * 3600).unwrap()
    }

    #[test]
    fn pagination_clamps_input() {
        let p = Pagination::new(Some(0), Some(1000), 10);
        assert_eq!(p.page, 1);
        assert_eq!(p.limit, Pagination::MAX_LIMIT);
        assert_eq!(p.offset(), 0);

        let p = Pagination::new(Some(3), None, 10);
        assert_eq!(p.offset(), 20);
        assert_eq!(p.meta(21).total_pages, 3);
        assert_eq!(p.meta(0).total_pages, 0);
    }

    #[test]
    fn today_range_follows_store_offset() {
        // 03:00 UTC on the 2nd is still the 1st in UTC-6
        let now = Utc.with_ymd_and_hms(2024, 3, 2, 3, 0, 0).unwrap();
        let range = StatsPeriod::Today.range(now, mexico_city());
        assert_eq!(range.start, Utc.with_ymd_and_hms(2024, 3, 1, 6, 0, 0).unwrap());
        assert_eq!(range.end, Utc.with_ymd_and_hms(2024, 3, 2, 6, 0, 0).unwrap());
        assert!(range.start <= now && now < range.end);
    }

    #[test]
    fn week_starts_on_sunday() {
        // Wednesday 2024-03-06
        let now = Utc.with_ymd_and_hms(2024, 3, 6, 18, 0, 0).unwrap();
        let range = StatsPeriod::Week.range(now, mexico_city());
        assert_eq!(range.start, Utc.with_ymd_and_hms(2024, 3, 3, 6, 0, 0).unwrap());
        assert_eq!(range.end, Utc.with_ymd_and_hms(2024, 3, 7, 6, 0, 0).unwrap());
    }

    #[test]
    fn month_and_year_cover_whole_calendar_span() {
        let now = Utc.with_ymd_and_hms(2024, 2, 10, 18, 0, 0).unwrap();
        let month = StatsPeriod::Month.range(now, mexico_city());
        assert_eq!(month.start, Utc.with_ymd_and_hms(2024, 2, 1, 6, 0, 0).unwrap());
        assert_eq!(month.end, Utc.with_ymd_and_hms(2024, 3, 1, 6, 0, 0).unwrap());

        let year = StatsPeriod::Year.range(now, mexico_city());
        assert_eq!(year.start, Utc.with_ymd_and_hms(2024, 1, 1, 6, 0, 0).unwrap());
        assert_eq!(year.end, Utc.with_ymd_and_hms(2025, 1, 1, 6, 0, 0).unwrap());
    }
}
