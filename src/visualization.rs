// Visualization specifications as received from the host

use serde::{Deserialize, Serialize};

use crate::data::COUNT_COLUMN;
use crate::translate::Label;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChartType {
    Line,
    Bar,
    Area,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TextType {
    Wordcloud,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AggregationFunction {
    #[default]
    Count,
    Sum,
    Mean,
    Pct,
    CountPct,
}

impl AggregationFunction {
    pub fn is_percentage(self) -> bool {
        matches!(self, AggregationFunction::Pct | AggregationFunction::CountPct)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DateFormat {
    Auto,
    Year,
    Quarter,
    Month,
    Day,
    Hour,
    MonthCycle,
    WeekdayCycle,
    HourCycle,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Extract {
    UrlDomain,
}

/// How rows are bucketed along the x axis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AggregationGroup {
    pub column: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<Label>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_format: Option<DateFormat>,
    /// Inclusive numeric bounds on the x value.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub range: Option<(f64, f64)>,
    /// Explicit x ordering; replaces date-based sort keys.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub levels: Option<Vec<String>>,
}

/// One y series definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AggregationValue {
    #[serde(default = "default_value_column")]
    pub column: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<Label>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aggregate: Option<AggregationFunction>,
    #[serde(default, rename = "group_by", skip_serializing_if = "Option::is_none")]
    pub group_by: Option<String>,
    #[serde(default)]
    pub add_zeroes: bool,
}

fn default_value_column() -> String {
    COUNT_COLUMN.to_string()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartVisualization {
    #[serde(rename = "type")]
    pub kind: ChartType,
    pub title: Label,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<f64>,
    pub group: AggregationGroup,
    pub values: Vec<AggregationValue>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextVisualization {
    #[serde(rename = "type")]
    pub kind: TextType,
    pub title: Label,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<f64>,
    pub text_column: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value_column: Option<String>,
    #[serde(default)]
    pub tokenize: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extract: Option<Extract>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Visualization {
    Chart(ChartVisualization),
    Text(TextVisualization),
}

impl Visualization {
    /// Wire name of the visualization kind.
    pub fn type_name(&self) -> &'static str {
        match self {
            Visualization::Chart(c) => match c.kind {
                ChartType::Line => "line",
                ChartType::Bar => "bar",
                ChartType::Area => "area",
            },
            Visualization::Text(t) => match t.kind {
                TextType::Wordcloud => "wordcloud",
            },
        }
    }

    pub fn title(&self) -> &Label {
        match self {
            Visualization::Chart(c) => &c.title,
            Visualization::Text(t) => &t.title,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_chart_defaults() {
        let viz: Visualization = serde_json::from_value(json!({
            "type": "bar",
            "title": {"en": "Posts per month"},
            "group": {"column": "date", "dateFormat": "month"},
            "values": [{}]
        }))
        .unwrap();

        let Visualization::Chart(chart) = viz else { panic!("expected chart") };
        assert_eq!(chart.kind, ChartType::Bar);
        assert_eq!(chart.group.date_format, Some(DateFormat::Month));
        assert_eq!(chart.values[0].column, COUNT_COLUMN);
        assert_eq!(chart.values[0].aggregate, None);
        assert!(!chart.values[0].add_zeroes);
    }

    #[test]
    fn test_value_wire_names() {
        let value: AggregationValue = serde_json::from_value(json!({
            "column": "amount",
            "aggregate": "count_pct",
            "group_by": "channel",
            "addZeroes": true
        }))
        .unwrap();
        assert_eq!(value.aggregate, Some(AggregationFunction::CountPct));
        assert_eq!(value.group_by.as_deref(), Some("channel"));
        assert!(value.add_zeroes);
    }

    #[test]
    fn test_text_visualization() {
        let viz: Visualization = serde_json::from_value(json!({
            "type": "wordcloud",
            "title": "Searches",
            "textColumn": "query",
            "tokenize": true,
            "extract": "url_domain"
        }))
        .unwrap();
        assert_eq!(viz.type_name(), "wordcloud");
        let Visualization::Text(text) = viz else { panic!("expected text") };
        assert!(text.tokenize);
        assert_eq!(text.extract, Some(Extract::UrlDomain));
        assert_eq!(text.value_column, None);
    }

    #[test]
    fn test_unknown_type_is_rejected() {
        let res: Result<Visualization, _> = serde_json::from_value(json!({
            "type": "pie",
            "title": "x",
            "group": {"column": "a"},
            "values": []
        }));
        assert!(res.is_err());
    }

    #[test]
    fn test_range_as_pair() {
        let group: AggregationGroup =
            serde_json::from_value(json!({"column": "hour", "range": [8, 17]})).unwrap();
        assert_eq!(group.range, Some((8.0, 17.0)));
    }
}
