use indexmap::IndexMap;
use tracing::debug;

use crate::data::Table;
use crate::error::{parse_number, Result};
use crate::ir::{AxisSettings, ChartPoint, ChartVisualizationData, SeriesKey, SortKey, TickerFormat};
use crate::resolve::{resolve_value, resolve_x, Accumulate, Finalize, ResolvedValue, ResolvedX};
use crate::translate::Label;
use crate::visualization::ChartVisualization;
use crate::PrepareOptions;

/// Main entry point: aggregate a table into chart series
pub fn prepare_chart_data(
    table: &Table,
    visualization: &ChartVisualization,
    options: &PrepareOptions,
) -> Result<ChartVisualizationData> {
    if table.row_count() == 0 {
        return Ok(ChartVisualizationData::empty(visualization.kind));
    }

    // 1. Resolve x buckets and every value spec up front
    let x = resolve_x(table, &visualization.group, options.auto_min_values)?;
    let values = visualization
        .values
        .iter()
        .map(|spec| resolve_value(table, spec))
        .collect::<Result<Vec<_>>>()?;

    // 2. Aggregate
    let buckets = aggregate(table, visualization, &x, &values);

    // 3. Order and round
    let mut data: Vec<ChartPoint> = buckets
        .into_values()
        .map(|b| b.into_point(&visualization.group.column))
        .collect();
    data.sort_by(|a, b| a.sort_by.compare(&b.sort_by));

    debug!(
        table = %table.id,
        buckets = data.len(),
        series = visualization.values.len(),
        "prepared chart data"
    );

    Ok(ChartVisualizationData {
        kind: visualization.kind,
        x_key: visualization.group.column.clone(),
        x_label: visualization.group.label.clone(),
        y_keys: build_y_keys(&values),
        data,
    })
}

/// Series display metadata, in value-spec order.
fn build_y_keys(values: &[ResolvedValue<'_>]) -> IndexMap<SeriesKey, AxisSettings> {
    let mut y_keys = IndexMap::new();

    for value in values {
        let ticker_format = if value.function.is_percentage() {
            TickerFormat::Percent
        } else {
            TickerFormat::Default
        };

        if value.groups.is_some() {
            for group in value.group_values() {
                let id = SeriesKey::grouped(value.spec.column.as_str(), group);
                y_keys.insert(
                    id.clone(),
                    AxisSettings { id, label: Label::from(group), ticker_format },
                );
            }
        } else {
            let id = SeriesKey::column(value.spec.column.as_str());
            let label = value
                .spec
                .label
                .clone()
                .unwrap_or_else(|| Label::from(value.spec.column.as_str()));
            y_keys.insert(id.clone(), AxisSettings { id, label, ticker_format });
        }
    }

    y_keys
}

#[derive(Debug)]
struct Bucket {
    x_value: String,
    sort_by: SortKey,
    values: IndexMap<SeriesKey, f64>,
    row_ids: IndexMap<SeriesKey, Vec<String>>,
}

impl Bucket {
    fn new(x_value: &str, sort_by: SortKey) -> Self {
        Self {
            x_value: x_value.to_string(),
            sort_by,
            values: IndexMap::new(),
            row_ids: IndexMap::new(),
        }
    }

    fn into_point(self, x_key: &str) -> ChartPoint {
        ChartPoint {
            x_key: x_key.to_string(),
            x_value: self.x_value,
            values: self.values.into_iter().map(|(k, v)| (k, round2(v))).collect(),
            row_ids: self.row_ids,
            sort_by: self.sort_by,
        }
    }
}

/// Running totals of one series, used by the second pass.
#[derive(Debug, Default, Clone, Copy)]
struct Summary {
    n: f64,
    sum: f64,
}

fn aggregate(
    table: &Table,
    visualization: &ChartVisualization,
    x: &ResolvedX,
    values: &[ResolvedValue<'_>],
) -> IndexMap<String, Bucket> {
    let mut buckets: IndexMap<String, Bucket> = IndexMap::new();

    // Known buckets exist up front so gaps can be filled with zeroes
    let any_add_zeroes = values.iter().any(|v| v.spec.add_zeroes);
    if any_add_zeroes {
        if let Some(sortable) = &x.sortable {
            for (label, key) in sortable {
                buckets.insert(label.clone(), Bucket::new(label, SortKey::Number(*key)));
            }
        }
    }

    let range = visualization.group.range;

    for value in values {
        let mut summaries: IndexMap<SeriesKey, Summary> = IndexMap::new();

        for (i, row) in table.body.rows.iter().enumerate() {
            let x_value = &x.labels[i];

            // a blank x counts as 0 against the range
            if let Some((lo, hi)) = range {
                if let Ok(v) = parse_number(x_value) {
                    if v < lo || v > hi {
                        continue;
                    }
                }
            }

            let series = value.series_key(i);
            let contribution = match value.strategy.accumulate {
                Accumulate::Count => Some(1.0),
                Accumulate::Sum => {
                    let raw = value.y.get(i).copied().flatten().unwrap_or_default();
                    match parse_number(raw) {
                        Ok(v) => Some(v),
                        Err(e) => {
                            debug!(row = %row.id, error = %e, "skipping y value");
                            None
                        }
                    }
                }
            };

            let bucket = buckets
                .entry(x_value.clone())
                .or_insert_with(|| Bucket::new(x_value, x.sort_key(x_value)));
            bucket.row_ids.entry(series.clone()).or_default().push(row.id.clone());
            let cell = bucket.values.entry(series.clone()).or_insert(0.0);

            let summary = summaries.entry(series).or_default();
            if let Some(c) = contribution {
                *cell += c;
                summary.n += 1.0;
                summary.sum += c;
            }
        }

        finalize(&mut buckets, &summaries, value);
    }

    buckets
}

fn finalize(buckets: &mut IndexMap<String, Bucket>, summaries: &IndexMap<SeriesKey, Summary>, value: &ResolvedValue<'_>) {
    let add_zeroes = value.spec.add_zeroes;
    let finalize = value.strategy.finalize;

    for (series, summary) in summaries {
        for bucket in buckets.values_mut() {
            if !bucket.values.contains_key(series) {
                if !add_zeroes {
                    continue;
                }
                bucket.values.insert(series.clone(), 0.0);
            }
            let Some(cell) = bucket.values.get_mut(series) else {
                continue;
            };

            *cell = match finalize {
                Finalize::Keep => *cell,
                Finalize::Mean => ratio(*cell, summary.n),
                Finalize::PercentOfCount => 100.0 * ratio(*cell, summary.n),
                Finalize::PercentOfSum => 100.0 * ratio(*cell, summary.sum),
            };
        }
    }
}

fn ratio(value: f64, denominator: f64) -> f64 {
    if denominator == 0.0 {
        0.0
    } else {
        value / denominator
    }
}

fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}
