use std::cmp::Ordering;
use std::fmt;

use indexmap::IndexMap;
use serde::ser::{SerializeMap, Serializer};
use serde::Serialize;

use crate::translate::Label;
use crate::visualization::{ChartType, TextType};

/// Separator between value column and group value in serialized series ids.
pub const GROUP_BY_SEPARATOR: &str = ".GROUP_BY.";

// =============================================================================
// Keys
// =============================================================================

/// Identity of one y series: the value column, optionally split by a group value.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SeriesKey {
    pub column: String,
    pub group: Option<String>,
}

impl SeriesKey {
    pub fn column(column: impl Into<String>) -> Self {
        Self { column: column.into(), group: None }
    }

    pub fn grouped(column: impl Into<String>, group: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            group: Some(group.into()),
        }
    }

    /// Inverse of the `Display` encoding. Splits on the first separator.
    pub fn decode(id: &str) -> Self {
        match id.split_once(GROUP_BY_SEPARATOR) {
            Some((column, group)) => Self::grouped(column, group),
            None => Self::column(id),
        }
    }
}

impl fmt::Display for SeriesKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.group {
            Some(group) => write!(f, "{}{}{}", self.column, GROUP_BY_SEPARATOR, group),
            None => f.write_str(&self.column),
        }
    }
}

impl Serialize for SeriesKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Position of a bucket along the x axis.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum SortKey {
    Number(f64),
    Text(String),
}

impl SortKey {
    /// Three-way comparison: numbers before text, numbers by value, text lexically.
    pub fn compare(&self, other: &SortKey) -> Ordering {
        match (self, other) {
            (SortKey::Number(a), SortKey::Number(b)) => a.partial_cmp(b).unwrap_or(Ordering::Equal),
            (SortKey::Number(_), SortKey::Text(_)) => Ordering::Less,
            (SortKey::Text(_), SortKey::Number(_)) => Ordering::Greater,
            (SortKey::Text(a), SortKey::Text(b)) => a.cmp(b),
        }
    }
}

// =============================================================================
// Chart output
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TickerFormat {
    #[default]
    Default,
    Percent,
}

/// Display metadata of one y series.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AxisSettings {
    pub id: SeriesKey,
    pub label: Label,
    pub ticker_format: TickerFormat,
}

/// One aggregated x bucket.
#[derive(Debug, Clone, PartialEq)]
pub struct ChartPoint {
    pub x_key: String,
    pub x_value: String,
    pub values: IndexMap<SeriesKey, f64>,
    pub row_ids: IndexMap<SeriesKey, Vec<String>>,
    pub sort_by: SortKey,
}

impl ChartPoint {
    pub fn value(&self, key: &SeriesKey) -> Option<f64> {
        self.values.get(key).copied()
    }
}

impl Serialize for ChartPoint {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.values.len() + 3))?;
        for (key, value) in &self.values {
            map.serialize_entry(key, value)?;
        }
        map.serialize_entry(&self.x_key, &self.x_value)?;
        map.serialize_entry("__rowIds", &self.row_ids)?;
        map.serialize_entry("__sortBy", &self.sort_by)?;
        map.end()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChartVisualizationData {
    #[serde(rename = "type")]
    pub kind: ChartType,
    pub x_key: String,
    pub x_label: Option<Label>,
    pub y_keys: IndexMap<SeriesKey, AxisSettings>,
    pub data: Vec<ChartPoint>,
}

impl ChartVisualizationData {
    pub fn empty(kind: ChartType) -> Self {
        Self {
            kind,
            x_key: String::new(),
            x_label: None,
            y_keys: IndexMap::new(),
            data: Vec::new(),
        }
    }

    /// Axis format shared by all series, or `Default` when they disagree.
    pub fn ticker_format(&self) -> TickerFormat {
        let mut formats = self.y_keys.values().map(|axis| axis.ticker_format);
        match formats.next() {
            Some(first) if formats.all(|f| f == first) => first,
            _ => TickerFormat::Default,
        }
    }
}

// =============================================================================
// Text output
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoredTerm {
    pub text: String,
    pub value: f64,
    pub importance: f64,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub row_ids: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TextVisualizationData {
    #[serde(rename = "type")]
    pub kind: TextType,
    pub top_terms: Vec<ScoredTerm>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum VisualizationData {
    Chart(ChartVisualizationData),
    Text(TextVisualizationData),
}

impl VisualizationData {
    /// True when there is nothing to draw.
    pub fn is_empty(&self) -> bool {
        match self {
            VisualizationData::Chart(c) => c.data.is_empty(),
            VisualizationData::Text(t) => t.top_terms.is_empty(),
        }
    }
}
