//! Inclusive date-range filtering over forecast data.

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};

use crate::error::AppError;
use crate::models::ForecastPoint;

/// Optional inclusive bounds on forecast timestamps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DateRange {
    pub start: Option<NaiveDateTime>,
    pub end: Option<NaiveDateTime>,
}

const DATETIME_FORMATS: &[&str] = &["%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M"];

impl DateRange {
    pub fn new(start: Option<NaiveDateTime>, end: Option<NaiveDateTime>) -> Self {
        Self { start, end }
    }

    /// Parses user-supplied bounds and rejects inverted ranges.
    ///
    /// A date-only start covers that day from midnight; a date-only end covers
    /// that day until 23:59:59.
    ///
    /// # Examples
    ///
    /// ```
    /// use drape_core::filter::DateRange;
    ///
    /// let range = DateRange::parse(Some("2024-03-01"), Some("2024-03-02")).unwrap();
    /// assert_eq!(range.end.unwrap().to_string(), "2024-03-02 23:59:59");
    ///
    /// assert!(DateRange::parse(Some("2024-03-05"), Some("2024-03-01")).is_err());
    /// ```
    pub fn parse(start: Option<&str>, end: Option<&str>) -> Result<Self, AppError> {
        let start = start
            .map(|s| parse_bound(s, NaiveTime::MIN))
            .transpose()?;
        let end = end
            .map(|s| parse_bound(s, end_of_day()))
            .transpose()?;

        if let (Some(s), Some(e)) = (start, end) {
            if e < s {
                return Err(AppError::ValidationError(
                    "End date must not be before start date".to_string(),
                ));
            }
        }

        Ok(Self { start, end })
    }

    /// Lower bound, with the earliest representable instant standing in for "none".
    pub fn lower(&self) -> NaiveDateTime {
        self.start.unwrap_or(NaiveDateTime::MIN)
    }

    /// Upper bound, with a far-future sentinel standing in for "none".
    pub fn upper(&self) -> NaiveDateTime {
        self.end.unwrap_or_else(far_future)
    }

    pub fn contains(&self, ts: NaiveDateTime) -> bool {
        ts >= self.lower() && ts <= self.upper()
    }

    /// Keeps the points whose timestamp lies inside the range, preserving order.
    ///
    /// An inverted range yields an empty list rather than an error.
    pub fn filter(&self, points: Vec<ForecastPoint>) -> Vec<ForecastPoint> {
        points
            .into_iter()
            .filter(|point| self.contains(point.timestamp))
            .collect()
    }
}

fn parse_bound(raw: &str, date_only_time: NaiveTime) -> Result<NaiveDateTime, AppError> {
    let raw = raw.trim();
    for format in DATETIME_FORMATS {
        if let Ok(ts) = NaiveDateTime::parse_from_str(raw, format) {
            return Ok(ts);
        }
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .map(|d| d.and_time(date_only_time))
        .map_err(|_| {
            AppError::ValidationError(format!(
                "Invalid date '{}', expected YYYY-MM-DD or YYYY-MM-DDTHH:MM:SS",
                raw
            ))
        })
}

fn end_of_day() -> NaiveTime {
    NaiveTime::from_hms_opt(23, 59, 59).unwrap_or(NaiveTime::MIN)
}

fn far_future() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(3000, 1, 1)
        .map(|d| d.and_time(NaiveTime::MIN))
        .unwrap_or(NaiveDateTime::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ts(s: &str) -> NaiveDateTime {
        NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S").unwrap()
    }

    fn points() -> Vec<ForecastPoint> {
        ["2024-03-01 09:00:00", "2024-03-01 12:00:00", "2024-03-02 00:00:00", "2024-03-03 21:00:00"]
            .iter()
            .map(|t| ForecastPoint {
                timestamp: ts(t),
                temperature_celsius: 12.0,
                weather_description: "rain".to_string(),
            })
            .collect()
    }

    #[test]
    fn test_unbounded_keeps_everything() {
        let filtered = DateRange::default().filter(points());
        assert_eq!(filtered, points());
    }

    #[test]
    fn test_bounds_are_inclusive() {
        let range = DateRange::new(Some(ts("2024-03-01 12:00:00")), Some(ts("2024-03-02 00:00:00")));
        let filtered = range.filter(points());

        assert_eq!(filtered.len(), 2);
        assert_eq!(filtered[0].timestamp, ts("2024-03-01 12:00:00"));
        assert_eq!(filtered[1].timestamp, ts("2024-03-02 00:00:00"));
    }

    #[test]
    fn test_filter_is_idempotent() {
        let range = DateRange::new(Some(ts("2024-03-01 10:00:00")), None);
        let once = range.filter(points());
        let twice = range.filter(once.clone());
        assert_eq!(once, twice);
    }

    #[test]
    fn test_inverted_range_is_empty_not_error() {
        let range = DateRange::new(Some(ts("2024-03-03 00:00:00")), Some(ts("2024-03-01 00:00:00")));
        assert!(range.filter(points()).is_empty());
    }

    #[test]
    fn test_parse_date_only_widens_end() {
        let range = DateRange::parse(Some("2024-03-01"), Some("2024-03-01")).unwrap();
        assert_eq!(range.start, Some(ts("2024-03-01 00:00:00")));
        assert_eq!(range.end, Some(ts("2024-03-01 23:59:59")));
        assert_eq!(range.filter(points()).len(), 2);
    }

    #[test]
    fn test_parse_accepts_datetime_forms() {
        let range = DateRange::parse(Some("2024-03-01T09:30:00"), Some("2024-03-02 06:00:00")).unwrap();
        assert_eq!(range.start, Some(ts("2024-03-01 09:30:00")));
        assert_eq!(range.end, Some(ts("2024-03-02 06:00:00")));
    }

    #[test]
    fn test_parse_rejects_garbage_and_inversion() {
        assert!(matches!(
            DateRange::parse(Some("next tuesday"), None),
            Err(AppError::ValidationError(_))
        ));
        assert!(matches!(
            DateRange::parse(Some("2024-03-02"), Some("2024-03-01")),
            Err(AppError::ValidationError(_))
        ));
    }

    #[test]
    fn test_missing_bounds_use_sentinels() {
        let range = DateRange::default();
        assert_eq!(range.lower(), NaiveDateTime::MIN);
        assert_eq!(range.upper(), ts("3000-01-01 00:00:00"));
    }
}
