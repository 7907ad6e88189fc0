//! # Period Filters
//!
//! Report and ledger screens filter by a named period. Each period resolves
//! to a half-open UTC range `[start, end)` computed from the store's local
//! calendar.
//!
//! ```text
//! today   local midnight today            → local midnight tomorrow
//! week    local midnight six days ago     → local midnight tomorrow
//! month   local midnight on the 1st       → local midnight on the next 1st
//! custom  local midnight on `start`       → local midnight after `end`
//! all     unbounded                       → unbounded
//! ```
//!
//! The HTTP layer receives flat query strings (`?period=custom&start=..`);
//! [`PeriodQuery`] converts them into the tagged [`PeriodFilter`] at the
//! boundary so nothing downstream handles loosely-typed filters.

use chrono::{
    DateTime, Datelike, Days, Duration, FixedOffset, Months, NaiveDate, NaiveTime, TimeZone, Utc,
};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::{ValidationError, ValidationErrors};

// =============================================================================
// Filter
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(tag = "period", rename_all = "lowercase")]
pub enum PeriodFilter {
    Today,
    Week,
    Month,
    Custom {
        #[ts(as = "String")]
        start: NaiveDate,
        #[ts(as = "String")]
        end: NaiveDate,
    },
    #[default]
    All,
}

/// A half-open time range. `None` bounds are open.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct DateRange {
    #[ts(as = "Option<String>")]
    pub start: Option<DateTime<Utc>>,
    #[ts(as = "Option<String>")]
    pub end: Option<DateTime<Utc>>,
}

impl DateRange {
    pub fn unbounded() -> Self {
        DateRange::default()
    }

    pub fn contains(&self, at: DateTime<Utc>) -> bool {
        self.start.map_or(true, |s| at >= s) && self.end.map_or(true, |e| at < e)
    }

    /// UTC calendar days covered by the range, as `[first, last + 1)`.
    pub fn utc_days(&self) -> Option<(NaiveDate, NaiveDate)> {
        let start = self.start?;
        let end = self.end?;
        let last = end.checked_sub_signed(Duration::nanoseconds(1))?.date_naive();
        Some((start.date_naive(), last.succ_opt()?))
    }
}

impl PeriodFilter {
    /// Resolves the filter at `now` for a store whose local time is `offset`.
    pub fn resolve(
        &self,
        now: DateTime<Utc>,
        offset: FixedOffset,
    ) -> Result<DateRange, ValidationError> {
        let today = now.with_timezone(&offset).date_naive();

        let (start, end) = match *self {
            PeriodFilter::All => return Ok(DateRange::unbounded()),
            PeriodFilter::Today => (today, next_day(today)?),
            PeriodFilter::Week => (days_before(today, 6)?, next_day(today)?),
            PeriodFilter::Month => {
                let first = today.with_day0(0).ok_or_else(out_of_range)?;
                let next = first
                    .checked_add_months(Months::new(1))
                    .ok_or_else(out_of_range)?;
                (first, next)
            }
            PeriodFilter::Custom { start, end } => {
                if end < start {
                    return Err(ValidationError::InvalidFormat {
                        field: "end".to_string(),
                        reason: "must not be before start".to_string(),
                    });
                }
                (start, next_day(end)?)
            }
        };

        Ok(DateRange {
            start: Some(local_midnight(start, offset)?),
            end: Some(local_midnight(end, offset)?),
        })
    }
}

/// UTC instant of 00:00 local time on `date`.
///
/// Fails at the edges of the calendar, where the shift to UTC leaves the
/// representable range.
pub fn local_midnight(
    date: NaiveDate,
    offset: FixedOffset,
) -> Result<DateTime<Utc>, ValidationError> {
    let shift = Duration::seconds(i64::from(offset.local_minus_utc()));
    let naive = date
        .and_time(NaiveTime::MIN)
        .checked_sub_signed(shift)
        .ok_or_else(out_of_range)?;
    Ok(Utc.from_utc_datetime(&naive))
}

/// Builds the store offset from minutes east of UTC (WIB = 420).
pub fn offset_from_minutes(minutes: i32) -> Option<FixedOffset> {
    FixedOffset::east_opt(minutes.checked_mul(60)?)
}

fn next_day(date: NaiveDate) -> Result<NaiveDate, ValidationError> {
    date.succ_opt().ok_or_else(out_of_range)
}

fn days_before(date: NaiveDate, days: u64) -> Result<NaiveDate, ValidationError> {
    date.checked_sub_days(Days::new(days))
        .ok_or_else(out_of_range)
}

fn out_of_range() -> ValidationError {
    ValidationError::InvalidFormat {
        field: "period".to_string(),
        reason: "date out of range".to_string(),
    }
}

// =============================================================================
// Query Boundary
// =============================================================================

/// Flat period parameters as they arrive in a query string.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PeriodQuery {
    pub period: Option<String>,
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
}

impl TryFrom<PeriodQuery> for PeriodFilter {
    type Error = ValidationErrors;

    fn try_from(query: PeriodQuery) -> Result<Self, Self::Error> {
        let name = query
            .period
            .as_deref()
            .map(|p| p.trim().to_ascii_lowercase())
            .unwrap_or_else(|| "all".to_string());

        let filter = match name.as_str() {
            "" | "all" => PeriodFilter::All,
            "today" => PeriodFilter::Today,
            "week" => PeriodFilter::Week,
            "month" => PeriodFilter::Month,
            "custom" => {
                let mut errors = ValidationErrors::new();
                if query.start.is_none() {
                    errors.push(ValidationError::Required {
                        field: "start".to_string(),
                    });
                }
                if query.end.is_none() {
                    errors.push(ValidationError::Required {
                        field: "end".to_string(),
                    });
                }
                match (query.start, query.end) {
                    (Some(start), Some(end)) => PeriodFilter::Custom { start, end },
                    _ => return Err(errors),
                }
            }
            _ => {
                return Err(ValidationError::NotAllowed {
                    field: "period".to_string(),
                    allowed: ["today", "week", "month", "custom", "all"]
                        .iter()
                        .map(|s| s.to_string())
                        .collect(),
                }
                .into())
            }
        };
        Ok(filter)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn wib() -> FixedOffset {
        offset_from_minutes(7 * 60).unwrap()
    }

    fn at(rfc3339: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(rfc3339)
            .unwrap()
            .with_timezone(&Utc)
    }

    #[test]
    fn test_today_in_local_time() {
        // 20:00 UTC on the 9th is 03:00 WIB on the 10th
        let range = PeriodFilter::Today
            .resolve(at("2026-03-09T20:00:00Z"), wib())
            .unwrap();
        assert_eq!(range.start, Some(at("2026-03-09T17:00:00Z")));
        assert_eq!(range.end, Some(at("2026-03-10T17:00:00Z")));

        assert!(range.contains(at("2026-03-09T17:00:00Z")));
        assert!(range.contains(at("2026-03-10T16:59:59Z")));
        assert!(!range.contains(at("2026-03-10T17:00:00Z")));
    }

    #[test]
    fn test_week_covers_seven_days() {
        let range = PeriodFilter::Week
            .resolve(at("2026-03-10T05:00:00Z"), FixedOffset::east_opt(0).unwrap())
            .unwrap();
        assert_eq!(range.start, Some(at("2026-03-04T00:00:00Z")));
        assert_eq!(range.end, Some(at("2026-03-11T00:00:00Z")));
    }

    #[test]
    fn test_month_rolls_over_year() {
        let utc = FixedOffset::east_opt(0).unwrap();
        let range = PeriodFilter::Month
            .resolve(at("2026-12-15T05:00:00Z"), utc)
            .unwrap();
        assert_eq!(range.start, Some(at("2026-12-01T00:00:00Z")));
        assert_eq!(range.end, Some(at("2027-01-01T00:00:00Z")));
    }

    #[test]
    fn test_custom_is_end_inclusive_by_day() {
        let filter = PeriodFilter::Custom {
            start: NaiveDate::from_ymd_opt(2026, 3, 1).unwrap(),
            end: NaiveDate::from_ymd_opt(2026, 3, 1).unwrap(),
        };
        let range = filter.resolve(Utc::now(), wib()).unwrap();
        assert_eq!(range.start, Some(at("2026-02-28T17:00:00Z")));
        assert_eq!(range.end, Some(at("2026-03-01T17:00:00Z")));

        let backwards = PeriodFilter::Custom {
            start: NaiveDate::from_ymd_opt(2026, 3, 2).unwrap(),
            end: NaiveDate::from_ymd_opt(2026, 3, 1).unwrap(),
        };
        assert!(backwards.resolve(Utc::now(), wib()).is_err());
    }

    #[test]
    fn test_custom_at_calendar_edges_is_rejected() {
        let filter = PeriodFilter::try_from(PeriodQuery {
            period: Some("custom".to_string()),
            start: Some(NaiveDate::MIN),
            end: NaiveDate::from_ymd_opt(2026, 1, 1),
        })
        .unwrap();
        let err = filter.resolve(Utc::now(), wib()).unwrap_err();
        assert!(matches!(
            err,
            ValidationError::InvalidFormat { ref field, .. } if field == "period"
        ));

        let last = PeriodFilter::Custom {
            start: NaiveDate::from_ymd_opt(2026, 1, 1).unwrap(),
            end: NaiveDate::MAX,
        };
        assert!(last.resolve(Utc::now(), wib()).is_err());
    }

    #[test]
    fn test_local_midnight_shifts_by_offset() {
        let day = NaiveDate::from_ymd_opt(2026, 3, 1).unwrap();
        assert_eq!(local_midnight(day, wib()).unwrap(), at("2026-02-28T17:00:00Z"));
        assert!(local_midnight(NaiveDate::MIN, wib()).is_err());
    }

    #[test]
    fn test_all_is_unbounded() {
        let range = PeriodFilter::All.resolve(Utc::now(), wib()).unwrap();
        assert_eq!(range, DateRange::unbounded());
        assert!(range.contains(at("1999-01-01T00:00:00Z")));
        assert_eq!(range.utc_days(), None);
    }

    #[test]
    fn test_utc_days() {
        let utc = FixedOffset::east_opt(0).unwrap();
        let range = PeriodFilter::Week
            .resolve(at("2026-03-10T05:00:00Z"), utc)
            .unwrap();
        let (first, end) = range.utc_days().unwrap();
        assert_eq!(first.to_string(), "2026-03-04");
        assert_eq!(end.to_string(), "2026-03-11");
    }

    #[test]
    fn test_query_conversion() {
        let filter = PeriodFilter::try_from(PeriodQuery {
            period: Some("Month".to_string()),
            ..Default::default()
        })
        .unwrap();
        assert_eq!(filter, PeriodFilter::Month);

        assert_eq!(
            PeriodFilter::try_from(PeriodQuery::default()).unwrap(),
            PeriodFilter::All
        );

        let err = PeriodFilter::try_from(PeriodQuery {
            period: Some("custom".to_string()),
            ..Default::default()
        })
        .unwrap_err();
        assert_eq!(err.len(), 2);

        assert!(PeriodFilter::try_from(PeriodQuery {
            period: Some("yesterday".to_string()),
            ..Default::default()
        })
        .is_err());
    }

    #[test]
    fn test_filter_serializes_tagged() {
        let json = serde_json::to_string(&PeriodFilter::Custom {
            start: NaiveDate::from_ymd_opt(2026, 3, 1).unwrap(),
            end: NaiveDate::from_ymd_opt(2026, 3, 31).unwrap(),
        })
        .unwrap();
        assert_eq!(
            json,
            r#"{"period":"custom","start":"2026-03-01","end":"2026-03-31"}"#
        );
    }
}
