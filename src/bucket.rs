//! Date bucketing for the x axis.
//!
//! Raw date strings are mapped to a bucket label at the requested
//! granularity, together with a map from label to a numeric sort key. The
//! sort key map is built by stepping through the whole date domain, so it
//! also contains buckets that no row falls into; the chart aggregator uses
//! those to fill gaps with zeroes.

use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime, TimeZone, Timelike, Utc};
use indexmap::IndexMap;
use tracing::debug;

use crate::visualization::DateFormat;

const HOUR_MS: i64 = 60 * 60 * 1000;
const DAY_MS: i64 = 24 * HOUR_MS;

const NAIVE_FORMATS: [&str; 5] = [
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
    "%Y/%m/%d %H:%M:%S",
];

/// Result of bucketing a date column.
#[derive(Debug, Clone, PartialEq)]
pub struct DateBuckets {
    /// Granularity that was applied; never `Auto`.
    pub format: DateFormat,
    /// One label per input value.
    pub labels: Vec<String>,
    /// Bucket label to sort key, in domain order.
    pub sortable: IndexMap<String, f64>,
}

/// Parse a date as UTC milliseconds since the epoch.
pub fn parse_timestamp(raw: &str) -> Option<i64> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.timestamp_millis());
    }
    for fmt in NAIVE_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, fmt) {
            return Some(naive.and_utc().timestamp_millis());
        }
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc().timestamp_millis())
}

/// Bucket `values` at the given granularity.
///
/// Values that do not parse as dates keep their raw text as label and are
/// left out of the domain, so they get no sort key.
pub fn format_dates(values: &[Option<&str>], format: DateFormat, min_values: usize) -> DateBuckets {
    let times: Vec<Option<i64>> = values
        .iter()
        .map(|v| v.and_then(parse_timestamp))
        .collect();
    let observed = observed_domain(&times);

    let format = match format {
        DateFormat::Auto => auto_format(observed, min_values),
        other => other,
    };

    let labels = values
        .iter()
        .zip(&times)
        .map(|(raw, time)| match time.and_then(to_datetime) {
            Some(dt) => bucket_label(format, &dt),
            None => raw.unwrap_or_default().to_string(),
        })
        .collect();

    let domain = cyclic_domain(format).or(observed);
    let sortable = match domain {
        Some((lo, hi)) => walk_domain(format, lo, hi),
        None => IndexMap::new(),
    };

    debug!(?format, buckets = sortable.len(), "bucketed date column");

    DateBuckets { format, labels, sortable }
}

/// Pick a granularity that yields at least roughly `min_values` buckets.
pub fn auto_format(domain: Option<(i64, i64)>, min_values: usize) -> DateFormat {
    let span = domain.map(|(lo, hi)| hi - lo).unwrap_or(0);
    let n = i64::try_from(min_values).unwrap_or(i64::MAX);
    let days = |d: i64| DAY_MS.saturating_mul(d).saturating_mul(n);

    if span > days(365) {
        DateFormat::Year
    } else if span > days(30 * 3) {
        DateFormat::Quarter
    } else if span > days(30) {
        DateFormat::Month
    } else if span > days(1) {
        DateFormat::Day
    } else {
        DateFormat::Hour
    }
}

pub fn bucket_label(format: DateFormat, dt: &DateTime<Utc>) -> String {
    match format {
        DateFormat::Year => dt.year().to_string(),
        DateFormat::Quarter => format!("{}-Q{}", dt.year(), dt.month0() / 3 + 1),
        DateFormat::Month => dt.format("%Y-%b").to_string(),
        DateFormat::Day => dt.format("%Y-%b-%-d").to_string(),
        DateFormat::Hour => format!("{} {}:00", dt.format("%Y-%b-%-d"), dt.hour()),
        DateFormat::MonthCycle => dt.format("%B").to_string(),
        DateFormat::WeekdayCycle => dt.format("%A").to_string(),
        DateFormat::HourCycle => dt.hour().to_string(),
        DateFormat::Auto => dt.to_rfc3339(),
    }
}

/// Step shorter than the shortest bucket of each granularity.
fn step_ms(format: DateFormat) -> Option<i64> {
    match format {
        DateFormat::Year => Some(DAY_MS * 364),
        DateFormat::Quarter => Some(DAY_MS * 28 * 3),
        DateFormat::Month | DateFormat::MonthCycle => Some(DAY_MS * 28),
        DateFormat::Day | DateFormat::WeekdayCycle => Some(DAY_MS),
        DateFormat::Hour | DateFormat::HourCycle => Some(HOUR_MS),
        DateFormat::Auto => None,
    }
}

/// Fixed domains for cyclic formats: any year from January, any week from
/// Monday, any day from midnight.
fn cyclic_domain(format: DateFormat) -> Option<(i64, i64)> {
    let ms = |y, m, d| Utc.with_ymd_and_hms(y, m, d, 0, 0, 0).single().map(|dt| dt.timestamp_millis());
    match format {
        DateFormat::MonthCycle => Some((ms(2000, 1, 1)?, ms(2001, 1, 1)?)),
        DateFormat::WeekdayCycle => Some((ms(2023, 11, 6)?, ms(2023, 11, 13)?)),
        DateFormat::HourCycle => Some((ms(2000, 1, 1)?, ms(2000, 1, 2)?)),
        _ => None,
    }
}

fn walk_domain(format: DateFormat, lo: i64, hi: i64) -> IndexMap<String, f64> {
    let mut sortable = IndexMap::new();
    let Some(step) = step_ms(format) else {
        return sortable;
    };

    let mut record = |t: i64| {
        if let Some(dt) = to_datetime(t) {
            sortable.entry(bucket_label(format, &dt)).or_insert(t as f64);
        }
    };

    let mut t = lo;
    while t <= hi {
        record(t);
        t += step;
    }
    // the fixed step can stop short of the last bucket
    record(hi);

    sortable
}

fn observed_domain(times: &[Option<i64>]) -> Option<(i64, i64)> {
    times.iter().flatten().fold(None, |acc, &t| match acc {
        None => Some((t, t)),
        Some((lo, hi)) => Some((lo.min(t), hi.max(t))),
    })
}

fn to_datetime(ms: i64) -> Option<DateTime<Utc>> {
    DateTime::<Utc>::from_timestamp_millis(ms)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bucket(values: &[&str], format: DateFormat) -> DateBuckets {
        let values: Vec<Option<&str>> = values.iter().map(|v| Some(*v)).collect();
        format_dates(&values, format, 10)
    }

    #[test]
    fn test_parse_variants() {
        let day = parse_timestamp("2023-01-05").unwrap();
        assert_eq!(parse_timestamp("2023-01-05T00:00:00Z"), Some(day));
        assert_eq!(parse_timestamp("2023-01-05 00:00:00"), Some(day));
        assert_eq!(parse_timestamp("2023-01-05T01:00"), Some(day + HOUR_MS));
        assert_eq!(parse_timestamp("2023-01-05T02:00:00+01:00"), Some(day + HOUR_MS));
        assert_eq!(parse_timestamp("yesterday"), None);
    }

    #[test]
    fn test_month_labels_and_order() {
        let b = bucket(&["2023-02-10", "2023-01-05"], DateFormat::Month);
        assert_eq!(b.labels, vec!["2023-Feb", "2023-Jan"]);
        let keys: Vec<&str> = b.sortable.keys().map(|s| s.as_str()).collect();
        assert_eq!(keys, vec!["2023-Jan", "2023-Feb"]);
        assert!(b.sortable["2023-Jan"] < b.sortable["2023-Feb"]);
    }

    #[test]
    fn test_fill_intermediate_buckets() {
        let b = bucket(&["2023-01-15", "2023-05-15"], DateFormat::Month);
        let keys: Vec<&str> = b.sortable.keys().map(|s| s.as_str()).collect();
        assert_eq!(keys, vec!["2023-Jan", "2023-Feb", "2023-Mar", "2023-Apr", "2023-May"]);
    }

    #[test]
    fn test_trailing_year_is_not_skipped() {
        let b = bucket(&["2020-01-01", "2021-06-01"], DateFormat::Year);
        let keys: Vec<&str> = b.sortable.keys().map(|s| s.as_str()).collect();
        assert_eq!(keys, vec!["2020", "2021"]);
    }

    #[test]
    fn test_quarter_day_hour_labels() {
        let b = bucket(&["2023-08-07T14:30:00"], DateFormat::Quarter);
        assert_eq!(b.labels, vec!["2023-Q3"]);
        let b = bucket(&["2023-08-07T14:30:00"], DateFormat::Day);
        assert_eq!(b.labels, vec!["2023-Aug-7"]);
        let b = bucket(&["2023-08-07T14:30:00"], DateFormat::Hour);
        assert_eq!(b.labels, vec!["2023-Aug-7 14:00"]);
    }

    #[test]
    fn test_weekday_cycle() {
        // 2024-03-04 and 2023-01-02 are both Mondays
        let b = bucket(&["2024-03-04", "2023-01-02", "2024-03-10"], DateFormat::WeekdayCycle);
        assert_eq!(b.labels, vec!["Monday", "Monday", "Sunday"]);
        let keys: Vec<&str> = b.sortable.keys().map(|s| s.as_str()).collect();
        assert_eq!(
            keys,
            vec!["Monday", "Tuesday", "Wednesday", "Thursday", "Friday", "Saturday", "Sunday"]
        );
    }

    #[test]
    fn test_month_and_hour_cycles_cover_domain() {
        let b = bucket(&["2019-07-01"], DateFormat::MonthCycle);
        assert_eq!(b.labels, vec!["July"]);
        assert_eq!(b.sortable.len(), 12);
        assert_eq!(b.sortable.keys().next().map(String::as_str), Some("January"));

        let b = bucket(&["2019-07-01T23:59:00"], DateFormat::HourCycle);
        assert_eq!(b.labels, vec!["23"]);
        assert_eq!(b.sortable.len(), 24);
        assert_eq!(b.sortable.keys().next().map(String::as_str), Some("0"));
    }

    #[test]
    fn test_auto_thresholds() {
        let start = parse_timestamp("2023-01-01").unwrap();
        let auto = |span: i64| auto_format(Some((start, start + span)), 10);

        assert_eq!(auto(2 * HOUR_MS), DateFormat::Hour);
        assert_eq!(auto(11 * DAY_MS), DateFormat::Day);
        assert_eq!(auto(400 * DAY_MS), DateFormat::Month);
        assert_eq!(auto(1000 * DAY_MS), DateFormat::Quarter);
        assert_eq!(auto(4000 * DAY_MS), DateFormat::Year);
        assert_eq!(auto_format(None, 10), DateFormat::Hour);
    }

    #[test]
    fn test_auto_with_huge_min_values() {
        let start = parse_timestamp("2000-01-01").unwrap();
        let end = parse_timestamp("2020-01-01").unwrap();
        assert_eq!(auto_format(Some((start, end)), 1_000_000_000_000), DateFormat::Hour);
        assert_eq!(auto_format(Some((start, end)), usize::MAX), DateFormat::Hour);
    }

    #[test]
    fn test_auto_resolves_format() {
        let b = bucket(&["2023-01-01T08:00:00", "2023-01-01T10:00:00"], DateFormat::Auto);
        assert_eq!(b.format, DateFormat::Hour);
        assert_eq!(b.labels, vec!["2023-Jan-1 8:00", "2023-Jan-1 10:00"]);
        assert_eq!(b.sortable.len(), 3);
    }

    #[test]
    fn test_unparseable_values_keep_raw_label() {
        let b = bucket(&["2023-01-05", "not a date"], DateFormat::Month);
        assert_eq!(b.labels, vec!["2023-Jan", "not a date"]);
        assert!(!b.sortable.contains_key("not a date"));
    }

    #[test]
    fn test_no_dates_gives_empty_map() {
        let b = bucket(&["a", "b"], DateFormat::Day);
        assert!(b.sortable.is_empty());
    }
}
