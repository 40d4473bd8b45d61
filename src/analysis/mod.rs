//! Request lifecycle: submit → fetch → sanitize → replace graph.
//!
//! Only one request is live at a time. Results come back from worker threads
//! tagged with the [`RequestId`] they were started for; anything that doesn't
//! match the live pending request is dropped.

mod backend;

use std::fmt;
use std::sync::Arc;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::thread;
use std::time::{Duration, Instant};

use tracing::{debug, info, warn};

use crate::config::AnalysisConfig;
use crate::graph::{GraphModel, sanitize};
use crate::physics::{ForceSimulator, SimulationHandle, Viewport};

pub use backend::{AnalysisError, AnalysisReply, Analyzer, ChatCompletionsAnalyzer};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RequestId(u64);

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AnalysisStatus {
    Idle,
    Pending,
    Succeeded,
    Failed,
}

#[derive(Debug)]
pub struct AnalysisRequest {
    pub id: RequestId,
    pub query: String,
    pub status: AnalysisStatus,
    pub result_message: Option<String>,
    pub is_rumor: Option<bool>,
    pub graph: Option<GraphModel>,
    submitted_at: Instant,
}

#[derive(Clone, Debug, PartialEq)]
pub enum LifecycleEvent {
    Completed {
        id: RequestId,
        status: AnalysisStatus,
        message: String,
    },
    Discarded {
        id: RequestId,
    },
}

/// What the canvas should show right now.
pub enum GraphDisplay<'a> {
    Placeholder,
    Layout {
        graph: &'a GraphModel,
        simulation: &'a SimulationHandle,
    },
}

type WorkerResult = (RequestId, Result<AnalysisReply, AnalysisError>);

pub struct AnalysisLifecycle {
    config: AnalysisConfig,
    analyzer: Arc<dyn Analyzer>,
    current: Option<AnalysisRequest>,
    next_id: u64,
    results_tx: Sender<WorkerResult>,
    results_rx: Receiver<WorkerResult>,
    simulator: ForceSimulator,
    viewport: Viewport,
}

impl AnalysisLifecycle {
    pub fn new(config: AnalysisConfig, analyzer: Arc<dyn Analyzer>, viewport: Viewport) -> Self {
        let (results_tx, results_rx) = mpsc::channel();
        Self {
            config,
            analyzer,
            current: None,
            next_id: 1,
            results_tx,
            results_rx,
            simulator: ForceSimulator::new(),
            viewport,
        }
    }

    /// Binds the lifecycle to the chat-completions backend described by `config`.
    pub fn from_config(config: AnalysisConfig, viewport: Viewport) -> Result<Self, AnalysisError> {
        let analyzer = ChatCompletionsAnalyzer::new(config.clone())?;
        Ok(Self::new(config, Arc::new(analyzer), viewport))
    }

    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    pub fn analyzer(&self) -> Arc<dyn Analyzer> {
        Arc::clone(&self.analyzer)
    }

    pub fn status(&self) -> AnalysisStatus {
        self.current
            .as_ref()
            .map_or(AnalysisStatus::Idle, |request| request.status)
    }

    pub fn is_pending(&self) -> bool {
        self.status() == AnalysisStatus::Pending
    }

    pub fn current(&self) -> Option<&AnalysisRequest> {
        self.current.as_ref()
    }

    fn pending(&self) -> Option<&AnalysisRequest> {
        self.current
            .as_ref()
            .filter(|request| request.status == AnalysisStatus::Pending)
    }

    pub fn graph(&self) -> Option<&GraphModel> {
        self.current.as_ref().and_then(|request| request.graph.as_ref())
    }

    /// Starts an analysis unless one is already in flight.
    pub fn submit(&mut self, query: &str) -> Option<RequestId> {
        let query = query.trim();
        if query.is_empty() {
            debug!("ignoring empty query");
            return None;
        }
        if let Some(pending) = self.pending() {
            warn!(pending = %pending.id, "analysis already in flight; submission rejected");
            return None;
        }
        Some(self.begin(query))
    }

    /// Starts an analysis, abandoning any request still in flight.
    pub fn supersede(&mut self, query: &str) -> Option<RequestId> {
        let query = query.trim();
        if query.is_empty() {
            debug!("ignoring empty query");
            return None;
        }
        if let Some(pending) = self.pending() {
            info!(superseded = %pending.id, "abandoning in-flight analysis");
        }
        Some(self.begin(query))
    }

    fn begin(&mut self, query: &str) -> RequestId {
        // Cleared now, not on failure, so an old graph never sits next to a new query.
        self.simulator.stop();

        let id = RequestId(self.next_id);
        self.next_id += 1;
        self.current = Some(AnalysisRequest {
            id,
            query: query.to_owned(),
            status: AnalysisStatus::Pending,
            result_message: None,
            is_rumor: None,
            graph: None,
            submitted_at: Instant::now(),
        });

        let analyzer = Arc::clone(&self.analyzer);
        let tx = self.results_tx.clone();
        let query = query.to_owned();
        thread::spawn(move || {
            let outcome = analyzer.analyze(&query);
            let _ = tx.send((id, outcome));
        });

        info!(%id, "analysis submitted");
        id
    }

    /// Applies whatever worker results have arrived and enforces the timeout.
    pub fn poll(&mut self) -> Vec<LifecycleEvent> {
        let mut events = Vec::new();
        while let Ok((id, outcome)) = self.results_rx.try_recv() {
            events.push(self.apply(id, outcome));
        }
        if let Some(event) = self.expire_overdue() {
            events.push(event);
        }
        events
    }

    /// Blocks up to `timeout` for the next worker result, then drains the rest.
    pub fn wait(&mut self, timeout: Duration) -> Vec<LifecycleEvent> {
        let mut events = match self.results_rx.recv_timeout(timeout) {
            Ok((id, outcome)) => vec![self.apply(id, outcome)],
            Err(RecvTimeoutError::Timeout | RecvTimeoutError::Disconnected) => Vec::new(),
        };
        events.extend(self.poll());
        events
    }

    fn expire_overdue(&mut self) -> Option<LifecycleEvent> {
        let request = self.pending()?;
        if request.submitted_at.elapsed() < self.config.timeout() {
            return None;
        }
        let id = request.id;
        let error = AnalysisError::Transport(format!(
            "no reply within {} ms",
            self.config.timeout_ms
        ));
        Some(self.apply(id, Err(error)))
    }

    /// The single transition out of `Pending`.
    pub fn apply(
        &mut self,
        id: RequestId,
        outcome: Result<AnalysisReply, AnalysisError>,
    ) -> LifecycleEvent {
        let Some(request) = self
            .current
            .as_mut()
            .filter(|request| request.id == id && request.status == AnalysisStatus::Pending)
        else {
            debug!(%id, "discarding result for superseded request");
            return LifecycleEvent::Discarded { id };
        };

        match outcome {
            Ok(reply) => {
                let graph = sanitize(&reply.graph_raw);
                if !graph.is_empty() {
                    self.simulator.start(&graph, self.viewport);
                }
                info!(
                    %id,
                    nodes = graph.node_count(),
                    links = graph.link_count(),
                    is_rumor = reply.is_rumor,
                    "analysis succeeded"
                );
                request.status = AnalysisStatus::Succeeded;
                request.is_rumor = Some(reply.is_rumor);
                request.result_message = Some(reply.message);
                request.graph = Some(graph);
            }
            Err(error) => {
                warn!(%id, error = %error, "analysis failed");
                request.status = AnalysisStatus::Failed;
                request.result_message = Some(error.user_message());
                request.graph = None;
            }
        }

        LifecycleEvent::Completed {
            id,
            status: request.status,
            message: request.result_message.clone().unwrap_or_default(),
        }
    }

    /// Back to `Idle`: drops the request, its graph, and the running layout.
    pub fn reset(&mut self) {
        self.simulator.stop();
        self.current = None;
    }

    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    pub fn resize(&mut self, viewport: Viewport) {
        if viewport != self.viewport {
            self.viewport = viewport;
            self.simulator.resize(viewport);
        }
    }

    pub fn tick(&mut self) -> bool {
        self.simulator.tick()
    }

    pub fn simulation(&self) -> Option<&SimulationHandle> {
        self.simulator.active()
    }

    pub fn simulation_mut(&mut self) -> Option<&mut SimulationHandle> {
        self.simulator.active_mut()
    }

    pub fn display(&self) -> GraphDisplay<'_> {
        match (self.graph(), self.simulator.active()) {
            (Some(graph), Some(simulation)) if !graph.is_empty() => {
                GraphDisplay::Layout { graph, simulation }
            }
            _ => GraphDisplay::Placeholder,
        }
    }
}
