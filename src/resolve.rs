use indexmap::IndexMap;

use crate::bucket::format_dates;
use crate::data::Table;
use crate::error::Result;
use crate::ir::{SeriesKey, SortKey};
use crate::visualization::{AggregationFunction, AggregationGroup, AggregationValue};

// =============================================================================
// X axis
// =============================================================================

/// X labels per row plus, when known, the ordering of every bucket.
#[derive(Debug, Clone)]
pub struct ResolvedX {
    pub labels: Vec<String>,
    /// Bucket label to sort key. `None` when x values are used as is.
    pub sortable: Option<IndexMap<String, f64>>,
}

impl ResolvedX {
    pub fn sort_key(&self, label: &str) -> SortKey {
        let known = self.sortable.as_ref().and_then(|s| s.get(label).copied());
        match known {
            Some(key) => SortKey::Number(key),
            // raw numeric x values still order numerically
            None if self.sortable.is_none() => match label.trim().parse::<f64>() {
                Ok(v) if v.is_finite() => SortKey::Number(v),
                _ => SortKey::Text(label.to_string()),
            },
            None => SortKey::Text(label.to_string()),
        }
    }
}

/// Resolve the x column into bucket labels and sort keys.
///
/// `levels` replaces any date-derived ordering.
pub fn resolve_x(table: &Table, group: &AggregationGroup, min_values: usize) -> Result<ResolvedX> {
    let raw = table.column(&group.column)?;

    let (labels, mut sortable) = match group.date_format {
        Some(format) => {
            let buckets = format_dates(&raw, format, min_values);
            (buckets.labels, Some(buckets.sortable))
        }
        None => (
            raw.iter().map(|v| v.unwrap_or_default().to_string()).collect(),
            None,
        ),
    };

    if let Some(levels) = &group.levels {
        let mut ordinal = IndexMap::with_capacity(levels.len());
        for (i, level) in levels.iter().enumerate() {
            ordinal.insert(level.clone(), i as f64);
        }
        sortable = Some(ordinal);
    }

    Ok(ResolvedX { labels, sortable })
}

// =============================================================================
// Y series
// =============================================================================

/// How a row contributes to its bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Accumulate {
    /// Every row adds one.
    Count,
    /// Every row adds its numeric y value.
    Sum,
}

/// Second pass over a series once all rows are in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Finalize {
    Keep,
    /// Divide by the number of contributing rows in the series.
    Mean,
    /// Percentage of the series' row count.
    PercentOfCount,
    /// Percentage of the series' total.
    PercentOfSum,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Strategy {
    pub accumulate: Accumulate,
    pub finalize: Finalize,
}

impl From<AggregationFunction> for Strategy {
    fn from(f: AggregationFunction) -> Self {
        let (accumulate, finalize) = match f {
            AggregationFunction::Count => (Accumulate::Count, Finalize::Keep),
            AggregationFunction::Sum => (Accumulate::Sum, Finalize::Keep),
            AggregationFunction::Mean => (Accumulate::Sum, Finalize::Mean),
            AggregationFunction::CountPct => (Accumulate::Count, Finalize::PercentOfCount),
            AggregationFunction::Pct => (Accumulate::Sum, Finalize::PercentOfSum),
        };
        Strategy { accumulate, finalize }
    }
}

/// A value spec with its columns looked up and its strategy fixed.
#[derive(Debug, Clone)]
pub struct ResolvedValue<'a> {
    pub spec: &'a AggregationValue,
    pub function: AggregationFunction,
    pub strategy: Strategy,
    pub y: Vec<Option<&'a str>>,
    pub groups: Option<Vec<Option<&'a str>>>,
}

impl<'a> ResolvedValue<'a> {
    pub fn series_key(&self, row: usize) -> SeriesKey {
        match &self.groups {
            Some(groups) => {
                let group = groups.get(row).copied().flatten().unwrap_or_default();
                SeriesKey::grouped(self.spec.column.as_str(), group)
            }
            None => SeriesKey::column(self.spec.column.as_str()),
        }
    }

    /// Distinct group values in row order, over the whole table.
    pub fn group_values(&self) -> Vec<&'a str> {
        let mut seen = IndexMap::new();
        if let Some(groups) = &self.groups {
            for g in groups {
                seen.insert(g.unwrap_or_default(), ());
            }
        }
        seen.into_keys().collect()
    }
}

pub fn resolve_value<'a>(table: &'a Table, spec: &'a AggregationValue) -> Result<ResolvedValue<'a>> {
    let function = spec.aggregate.unwrap_or_default();
    let y = table.column(&spec.column)?;
    let groups = match &spec.group_by {
        Some(col) => Some(table.column(col)?),
        None => None,
    };

    Ok(ResolvedValue {
        spec,
        function,
        strategy: Strategy::from(function),
        y,
        groups,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::tests::make_table;
    use crate::data::COUNT_COLUMN;
    use crate::error::VizError;
    use crate::visualization::DateFormat;

    fn group(column: &str) -> AggregationGroup {
        AggregationGroup {
            column: column.to_string(),
            label: None,
            date_format: None,
            range: None,
            levels: None,
        }
    }

    fn value(column: &str) -> AggregationValue {
        AggregationValue {
            column: column.to_string(),
            label: None,
            aggregate: None,
            group_by: None,
            add_zeroes: false,
        }
    }

    #[test]
    fn test_plain_x_sorts_numbers_numerically() {
        let table = make_table("t", &["x"], &[&["10"], &["9"], &["b"]]);
        let x = resolve_x(&table, &group("x"), 10).unwrap();
        assert_eq!(x.labels, vec!["10", "9", "b"]);
        assert_eq!(x.sort_key("10"), SortKey::Number(10.0));
        assert_eq!(x.sort_key("b"), SortKey::Text("b".to_string()));
    }

    #[test]
    fn test_levels_override_dates() {
        let table = make_table("t", &["d"], &[&["2023-01-05"]]);
        let mut g = group("d");
        g.date_format = Some(DateFormat::Year);
        g.levels = Some(vec!["2024".to_string(), "2023".to_string()]);
        let x = resolve_x(&table, &g, 10).unwrap();
        assert_eq!(x.labels, vec!["2023"]);
        assert_eq!(x.sort_key("2023"), SortKey::Number(1.0));
        assert_eq!(x.sort_key("1999"), SortKey::Text("1999".to_string()));
    }

    #[test]
    fn test_unknown_x_column() {
        let table = make_table("t", &["a"], &[&["1"]]);
        assert!(matches!(
            resolve_x(&table, &group("x"), 10),
            Err(VizError::ColumnNotFound { .. })
        ));
    }

    #[test]
    fn test_strategy_per_function() {
        let s = Strategy::from(AggregationFunction::Pct);
        assert_eq!(s.accumulate, Accumulate::Sum);
        assert_eq!(s.finalize, Finalize::PercentOfSum);
        assert_eq!(Strategy::from(AggregationFunction::CountPct).accumulate, Accumulate::Count);
        assert_eq!(Strategy::from(AggregationFunction::Mean).finalize, Finalize::Mean);
    }

    #[test]
    fn test_grouped_series_keys() {
        let table = make_table("t", &["x", "ch"], &[&["1", "web"], &["2", "app"], &["3", "web"]]);
        let mut spec = value(COUNT_COLUMN);
        spec.group_by = Some("ch".to_string());
        let resolved = resolve_value(&table, &spec).unwrap();
        assert_eq!(resolved.function, AggregationFunction::Count);
        assert_eq!(resolved.series_key(1), SeriesKey::grouped(".COUNT", "app"));
        assert_eq!(resolved.group_values(), vec!["web", "app"]);
    }

    #[test]
    fn test_unknown_group_by_column() {
        let table = make_table("t", &["x"], &[&["1"]]);
        let mut spec = value(COUNT_COLUMN);
        spec.group_by = Some("missing".to_string());
        assert!(resolve_value(&table, &spec).is_err());
    }
}
