// Library exports for vizdata

pub mod bucket;
pub mod data;
pub mod error;
pub mod ir;
pub mod resolve;
pub mod terms;
pub mod text;
pub mod transform;
pub mod translate;
pub mod visualization;
pub mod worker;

pub use data::{Row, Table, COUNT_COLUMN};
pub use error::{Result, VizError};
pub use ir::{ChartVisualizationData, SeriesKey, TextVisualizationData, VisualizationData};
pub use terms::prepare_text_data;
pub use transform::prepare_chart_data;
pub use visualization::Visualization;
pub use worker::{create_visualization_data, handle_request, Request, Response, Worker};

use serde::Deserialize;

/// Tuning knobs shared by every request.
#[derive(Debug, Clone, Deserialize)]
pub struct PrepareOptions {
    /// Maximum number of word-cloud terms returned.
    #[serde(default = "default_top_terms")]
    pub top_terms: usize,
    /// Bucket count `auto` date formatting aims for.
    #[serde(default = "default_auto_min_values")]
    pub auto_min_values: usize,
}

fn default_top_terms() -> usize { 200 }
fn default_auto_min_values() -> usize { 10 }

impl Default for PrepareOptions {
    fn default() -> Self {
        Self {
            top_terms: default_top_terms(),
            auto_min_values: default_auto_min_values(),
        }
    }
}
