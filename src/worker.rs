//! Request/response boundary between the host and the aggregation engine.
//!
//! Every request is answered by exactly one [`Response`]. Failures of any
//! kind, panics included, become an error response; they never reach the
//! host as a `Result::Err`.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::time::Duration;

use crossbeam_channel::{unbounded, Receiver, RecvTimeoutError, Sender, TryRecvError};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use crate::data::Table;
use crate::error::{Result, VizError};
use crate::ir::VisualizationData;
use crate::terms::prepare_text_data;
use crate::transform::prepare_chart_data;
use crate::visualization::{ChartVisualization, TextVisualization, Visualization};
use crate::PrepareOptions;

/// Generation number of a request; later requests have larger ids.
pub type RequestId = u64;

/// A request as posted by the host.
///
/// The visualization stays untyped until dispatch so that an unknown
/// `type` is reported as unsupported rather than as malformed.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Request {
    #[serde(default)]
    pub id: RequestId,
    #[serde(default)]
    pub table: Option<Table>,
    #[serde(default)]
    pub visualization: Option<Value>,
}

impl Request {
    pub fn new(table: Table, visualization: &Visualization) -> Self {
        Self {
            id: 0,
            table: Some(table),
            visualization: serde_json::to_value(visualization).ok(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum Response {
    Success {
        id: RequestId,
        #[serde(rename = "visualizationData")]
        visualization_data: VisualizationData,
    },
    Error {
        id: RequestId,
    },
}

impl Response {
    pub fn id(&self) -> RequestId {
        match self {
            Response::Success { id, .. } | Response::Error { id } => *id,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Response::Success { .. })
    }

    pub fn visualization_data(&self) -> Option<&VisualizationData> {
        match self {
            Response::Success { visualization_data, .. } => Some(visualization_data),
            Response::Error { .. } => None,
        }
    }
}

/// Type the raw visualization by its `type` tag.
pub fn parse_visualization(value: &Value) -> Result<Visualization> {
    let kind = value
        .get("type")
        .and_then(Value::as_str)
        .ok_or_else(|| VizError::InvalidRequest("visualization has no type".to_string()))?;

    let invalid = |e: serde_json::Error| VizError::InvalidRequest(format!("{} visualization: {}", kind, e));
    match kind {
        "line" | "bar" | "area" => serde_json::from_value::<ChartVisualization>(value.clone())
            .map(Visualization::Chart)
            .map_err(invalid),
        "wordcloud" => serde_json::from_value::<TextVisualization>(value.clone())
            .map(Visualization::Text)
            .map_err(invalid),
        other => Err(VizError::UnsupportedVisualizationType(other.to_string())),
    }
}

/// Route a table to the chart aggregator or the term scorer.
pub fn create_visualization_data(
    table: Option<&Table>,
    visualization: Option<&Visualization>,
    options: &PrepareOptions,
) -> Result<VisualizationData> {
    let (Some(table), Some(visualization)) = (table, visualization) else {
        return Err(VizError::InvalidRequest("table and visualization are required".to_string()));
    };

    match visualization {
        Visualization::Chart(chart) => prepare_chart_data(table, chart, options).map(VisualizationData::Chart),
        Visualization::Text(text) => prepare_text_data(table, text, options).map(VisualizationData::Text),
    }
}

fn dispatch(request: &Request, options: &PrepareOptions) -> Result<VisualizationData> {
    let visualization = request.visualization.as_ref().map(parse_visualization).transpose()?;
    create_visualization_data(request.table.as_ref(), visualization.as_ref(), options)
}

/// Answer one request. Never fails.
pub fn handle_request(request: &Request, options: &PrepareOptions) -> Response {
    let id = request.id;
    match catch_unwind(AssertUnwindSafe(|| dispatch(request, options))) {
        Ok(Ok(visualization_data)) => Response::Success { id, visualization_data },
        Ok(Err(e)) => {
            warn!(request = id, error = %e, "failed to create visualization data");
            Response::Error { id }
        }
        Err(_) => {
            warn!(request = id, "visualization computation panicked");
            Response::Error { id }
        }
    }
}

/// Runs requests off the calling thread and hands back only the response
/// to the most recent one.
///
/// Each posted request is computed on its own thread; posting again does
/// not wait for or cancel earlier computations. Their responses are dropped
/// when they arrive.
pub struct Worker {
    options: PrepareOptions,
    next_id: RequestId,
    awaiting: Option<RequestId>,
    tx: Sender<Response>,
    rx: Receiver<Response>,
}

impl Worker {
    pub fn new(options: PrepareOptions) -> Self {
        let (tx, rx) = unbounded();
        Self {
            options,
            next_id: 1,
            awaiting: None,
            tx,
            rx,
        }
    }

    /// Start computing `request`; its id is overwritten with a fresh generation.
    pub fn post(&mut self, mut request: Request) -> RequestId {
        let id = self.next_id;
        self.next_id += 1;
        self.awaiting = Some(id);
        request.id = id;

        let tx = self.tx.clone();
        let options = self.options.clone();
        let spawned = std::thread::Builder::new()
            .name(format!("vizdata-request-{}", id))
            .spawn(move || {
                let response = handle_request(&request, &options);
                // receiver is gone when the worker was dropped
                let _ = tx.send(response);
            });

        if let Err(e) = spawned {
            warn!(request = id, error = %e, "failed to spawn worker thread");
            let _ = self.tx.send(Response::Error { id });
        }
        id
    }

    /// Id of the request whose response has not been delivered yet.
    pub fn pending(&self) -> Option<RequestId> {
        self.awaiting
    }

    /// Block until the latest request is answered.
    ///
    /// Returns `None` when there is no outstanding request.
    pub fn recv(&mut self) -> Option<Response> {
        self.awaiting?;
        loop {
            let response = self.rx.recv().ok()?;
            if let Some(response) = self.accept(response) {
                return Some(response);
            }
        }
    }

    pub fn recv_timeout(&mut self, timeout: Duration) -> Option<Response> {
        self.awaiting?;
        let deadline = std::time::Instant::now() + timeout;
        loop {
            match self.rx.recv_deadline(deadline) {
                Ok(response) => {
                    if let Some(response) = self.accept(response) {
                        return Some(response);
                    }
                }
                Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => return None,
            }
        }
    }

    pub fn try_recv(&mut self) -> Option<Response> {
        self.awaiting?;
        loop {
            match self.rx.try_recv() {
                Ok(response) => {
                    if let Some(response) = self.accept(response) {
                        return Some(response);
                    }
                }
                Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => return None,
            }
        }
    }

    fn accept(&mut self, response: Response) -> Option<Response> {
        if Some(response.id()) == self.awaiting {
            self.awaiting = None;
            Some(response)
        } else {
            debug!(request = response.id(), latest = ?self.awaiting, "dropping stale response");
            None
        }
    }
}

impl Default for Worker {
    fn default() -> Self {
        Self::new(PrepareOptions::default())
    }
}
