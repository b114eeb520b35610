use chrono::{DateTime, Local, NaiveDateTime};

const MS_PER_DAY: i64 = 86_400_000;

const LOCAL_FORMATS: [&str; 4] = [
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%d %H:%M:%S",
];

/// Parses a `datetime-local` style string, or RFC 3339 converted to local time.
pub fn parse_local_datetime(s: &str) -> Option<NaiveDateTime> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Local).naive_local());
    }
    LOCAL_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
}

/// Whole rental days, rounded up. `None` when `end <= start`.
pub fn rental_days(start: NaiveDateTime, end: NaiveDateTime) -> Option<i64> {
    let ms = (end - start).num_milliseconds();
    if ms <= 0 {
        return None;
    }
    Some((ms + MS_PER_DAY - 1) / MS_PER_DAY)
}

/// Sum of daily rates; ids the lookup does not know contribute nothing.
pub fn daily_rate<'a, F>(selected: impl IntoIterator<Item = &'a String>, price_of: F) -> f64
where
    F: Fn(&str) -> Option<f64>,
{
    selected
        .into_iter()
        .map(|id| price_of(id).unwrap_or(0.0))
        .sum()
}

/// `days * rate`, with the day count clamped at zero.
pub fn total_price(days: i64, rate: f64) -> f64 {
    days.max(0) as f64 * rate
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RangeStatus {
    /// One side has not been filled in yet.
    Incomplete,
    /// Unparsable side, or `end <= start`.
    Invalid,
    Valid { days: i64 },
}

impl RangeStatus {
    pub fn evaluate(start: &str, end: &str) -> Self {
        if start.trim().is_empty() || end.trim().is_empty() {
            return RangeStatus::Incomplete;
        }
        let (Some(start), Some(end)) = (parse_local_datetime(start), parse_local_datetime(end))
        else {
            return RangeStatus::Invalid;
        };
        match rental_days(start, end) {
            Some(days) => RangeStatus::Valid { days },
            None => RangeStatus::Invalid,
        }
    }

    pub fn is_invalid(&self) -> bool {
        matches!(self, RangeStatus::Invalid)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn dt(s: &str) -> NaiveDateTime {
        parse_local_datetime(s).unwrap()
    }

    #[test]
    fn test_exactly_one_day() {
        assert_eq!(rental_days(dt("2024-01-01T10:00"), dt("2024-01-02T10:00")), Some(1));
    }

    #[test]
    fn test_partial_day_rounds_up() {
        // 1 day 23h
        assert_eq!(rental_days(dt("2024-01-01T10:00"), dt("2024-01-03T09:00")), Some(2));
        // one minute over a day
        assert_eq!(rental_days(dt("2024-01-01T10:00"), dt("2024-01-02T10:01")), Some(2));
        // an hour
        assert_eq!(rental_days(dt("2024-01-01T10:00"), dt("2024-01-01T11:00")), Some(1));
    }

    #[test]
    fn test_non_positive_range() {
        assert_eq!(rental_days(dt("2024-01-01T10:00"), dt("2024-01-01T10:00")), None);
        assert_eq!(rental_days(dt("2024-01-02T10:00"), dt("2024-01-01T10:00")), None);
    }

    #[test]
    fn test_parse_formats() {
        assert!(parse_local_datetime("2024-01-01T10:00").is_some());
        assert!(parse_local_datetime("2024-01-01T10:00:30").is_some());
        assert!(parse_local_datetime("2024-01-01 10:00").is_some());
        assert!(parse_local_datetime("2024-01-01T03:00:00.000Z").is_some());
        assert!(parse_local_datetime("2024-13-01T10:00").is_none());
        assert!(parse_local_datetime("tomorrow").is_none());
        assert!(parse_local_datetime("").is_none());
    }

    #[test]
    fn test_daily_rate_ignores_unknown_ids() {
        let prices = HashMap::from([("a".to_string(), 100.0), ("b".to_string(), 50.0)]);
        let selected = vec!["a".to_string(), "b".to_string(), "missing".to_string()];
        assert_eq!(daily_rate(&selected, |id| prices.get(id).copied()), 150.0);
        assert_eq!(daily_rate(&Vec::<String>::new(), |id| prices.get(id).copied()), 0.0);
    }

    #[test]
    fn test_total_price_clamps_days() {
        assert_eq!(total_price(2, 100_000.0), 200_000.0);
        assert_eq!(total_price(-3, 100_000.0), 0.0);
        assert_eq!(total_price(5, 0.0), 0.0);
    }

    #[test]
    fn test_range_status() {
        assert_eq!(RangeStatus::evaluate("", "2024-01-01T10:00"), RangeStatus::Incomplete);
        assert_eq!(RangeStatus::evaluate("2024-01-01T10:00", "garbage"), RangeStatus::Invalid);
        assert_eq!(
            RangeStatus::evaluate("2024-01-02T10:00", "2024-01-01T10:00"),
            RangeStatus::Invalid
        );
        assert_eq!(
            RangeStatus::evaluate("2024-01-01T10:00", "2024-01-03T09:00"),
            RangeStatus::Valid { days: 2 }
        );
    }
}
