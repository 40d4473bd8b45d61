use std::sync::Arc;
use std::sync::mpsc::{self, Receiver, TryRecvError};
use std::thread;

use eframe::egui::{Context, Vec2};
use serde_json::Value;
use tracing::{info, warn};

use truthgraph::analysis::{AnalysisError, AnalysisLifecycle, AnalysisStatus, Analyzer, LifecycleEvent};
use truthgraph::feed::{Headline, default_headlines, sanitize_headlines};
use truthgraph::interaction::InteractionController;
use truthgraph::physics::QuadtreeCell;

mod graph;
mod render_utils;
mod ui;

pub struct TruthGraphApp {
    lifecycle: AnalysisLifecycle,
    view: GraphView,
    chat: ChatState,
    headlines: Vec<Headline>,
    headlines_rx: Option<Receiver<Result<Vec<Headline>, AnalysisError>>>,
    headline_batch: u64,
    ticker_offset: f32,
}

struct GraphView {
    pan: Vec2,
    zoom: f32,
    search: String,
    live_physics: bool,
    show_quadtree_overlay: bool,
    quadtree_cells: Vec<QuadtreeCell>,
    interaction: InteractionController,
}

#[derive(Default)]
struct ChatState {
    input: String,
    transcript: Vec<ChatEntry>,
}

/// Which submit buttons the chat panel enables this frame.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct ChatControls {
    send: bool,
    replace: bool,
}

impl ChatState {
    fn controls(&self, pending: bool) -> ChatControls {
        let has_text = !self.input.trim().is_empty();
        ChatControls {
            send: has_text && !pending,
            replace: has_text && pending,
        }
    }
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum ChatRole {
    User,
    Analyst,
}

struct ChatEntry {
    role: ChatRole,
    text: String,
    verdict: Option<bool>,
    failed: bool,
}

impl TruthGraphApp {
    pub fn new(_cc: &eframe::CreationContext<'_>, lifecycle: AnalysisLifecycle, fetch_headlines: bool) -> Self {
        let mut app = Self::with_lifecycle(lifecycle);
        if fetch_headlines {
            app.refresh_headlines();
        }
        app
    }

    fn with_lifecycle(lifecycle: AnalysisLifecycle) -> Self {
        Self {
            headlines_rx: None,
            headline_batch: 0,
            ticker_offset: 0.0,
            headlines: default_headlines(),
            chat: ChatState::default(),
            view: GraphView {
                pan: Vec2::ZERO,
                zoom: 1.0,
                search: String::new(),
                live_physics: true,
                show_quadtree_overlay: false,
                quadtree_cells: Vec::new(),
                interaction: InteractionController::new(),
            },
            lifecycle,
        }
    }

    fn spawn_headlines(
        analyzer: Arc<dyn Analyzer>,
        batch: u64,
    ) -> Receiver<Result<Vec<Headline>, AnalysisError>> {
        let (tx, rx) = mpsc::channel();

        thread::spawn(move || {
            let result = analyzer
                .fetch_headlines()
                .map(|items| sanitize_headlines(&Value::Array(items), batch));
            let _ = tx.send(result);
        });

        rx
    }

    fn refresh_headlines(&mut self) {
        if self.headlines_rx.is_some() {
            return;
        }
        self.headline_batch += 1;
        self.headlines_rx = Some(Self::spawn_headlines(
            self.lifecycle.analyzer(),
            self.headline_batch,
        ));
    }

    fn poll_headlines(&mut self) {
        let Some(rx) = self.headlines_rx.take() else {
            return;
        };

        match rx.try_recv() {
            Ok(Ok(headlines)) if !headlines.is_empty() => {
                info!(count = headlines.len(), "headline ticker updated");
                self.headlines = headlines;
            }
            Ok(Ok(_)) => info!("headline fetch returned nothing; keeping current items"),
            Ok(Err(error)) => warn!(error = %error, "headline fetch failed"),
            Err(TryRecvError::Empty) => self.headlines_rx = Some(rx),
            Err(TryRecvError::Disconnected) => {
                warn!(error = %AnalysisError::WorkerDisconnected, "headline fetch failed");
            }
        }
    }

    fn send_query(&mut self, replace_pending: bool) {
        let query = self.chat.input.trim().to_owned();
        let submitted = if replace_pending {
            self.lifecycle.supersede(&query)
        } else {
            self.lifecycle.submit(&query)
        };
        if submitted.is_none() {
            return;
        }

        self.view.interaction.cancel();
        self.view.pan = Vec2::ZERO;
        self.view.zoom = 1.0;
        self.chat.input.clear();
        self.chat.transcript.push(ChatEntry {
            role: ChatRole::User,
            text: query,
            verdict: None,
            failed: false,
        });
    }

    fn apply_lifecycle_events(&mut self) {
        for event in self.lifecycle.poll() {
            let LifecycleEvent::Completed { status, message, .. } = event else {
                continue;
            };
            let verdict = self
                .lifecycle
                .current()
                .and_then(|request| request.is_rumor);
            self.chat.transcript.push(ChatEntry {
                role: ChatRole::Analyst,
                text: message,
                verdict,
                failed: status == AnalysisStatus::Failed,
            });
        }
    }
}

impl eframe::App for TruthGraphApp {
    fn update(&mut self, ctx: &Context, _frame: &mut eframe::Frame) {
        self.poll_headlines();
        self.apply_lifecycle_events();

        self.show(ctx);

        if self.lifecycle.is_pending() || self.headlines_rx.is_some() {
            ctx.request_repaint();
        }
    }
}

impl Drop for TruthGraphApp {
    fn drop(&mut self) {
        self.lifecycle.reset();
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;
    use std::sync::mpsc::Sender;

    use truthgraph::analysis::AnalysisReply;
    use truthgraph::config::AnalysisConfig;
    use truthgraph::physics::Viewport;

    use super::*;

    /// Holds every analysis until the test lets it through.
    struct HeldAnalyzer {
        release: Mutex<Receiver<()>>,
    }

    impl Analyzer for HeldAnalyzer {
        fn analyze(&self, _query: &str) -> Result<AnalysisReply, AnalysisError> {
            let _ = self.release.lock().map(|release| release.recv());
            Err(AnalysisError::Transport("released".to_owned()))
        }

        fn fetch_headlines(&self) -> Result<Vec<Value>, AnalysisError> {
            Ok(Vec::new())
        }
    }

    fn held_app() -> (TruthGraphApp, Sender<()>) {
        let (release_tx, release_rx) = mpsc::channel();
        let analyzer = Arc::new(HeldAnalyzer {
            release: Mutex::new(release_rx),
        });
        let lifecycle = AnalysisLifecycle::new(AnalysisConfig::default(), analyzer, Viewport::default());
        (TruthGraphApp::with_lifecycle(lifecycle), release_tx)
    }

    #[test]
    fn controls_follow_input_and_pending_state() {
        let mut chat = ChatState::default();
        assert_eq!(chat.controls(false), ChatControls { send: false, replace: false });

        chat.input = "  claim ".to_owned();
        assert_eq!(chat.controls(false), ChatControls { send: true, replace: false });
        assert_eq!(chat.controls(true), ChatControls { send: false, replace: true });
    }

    #[test]
    fn new_claim_typed_while_pending_can_replace_it() {
        let (mut app, _release) = held_app();

        app.chat.input = "first claim".to_owned();
        app.send_query(false);
        let first = app.lifecycle.current().map(|request| request.id);
        assert!(app.lifecycle.is_pending());
        assert!(app.chat.input.is_empty());

        app.chat.input = "second claim".to_owned();
        let controls = app.chat.controls(app.lifecycle.is_pending());
        assert!(controls.replace);
        assert!(!controls.send);

        app.send_query(true);

        let current = app.lifecycle.current().expect("current request");
        assert_eq!(current.query, "second claim");
        assert_ne!(Some(current.id), first);
        assert!(app.lifecycle.is_pending());
        assert_eq!(app.chat.transcript.len(), 2);
    }

    #[test]
    fn plain_send_while_pending_keeps_the_typed_claim() {
        let (mut app, _release) = held_app();

        app.chat.input = "first claim".to_owned();
        app.send_query(false);
        app.chat.input = "second claim".to_owned();
        app.send_query(false);

        assert_eq!(
            app.lifecycle.current().map(|request| request.query.as_str()),
            Some("first claim")
        );
        assert_eq!(app.chat.input, "second claim");
        assert_eq!(app.chat.transcript.len(), 1);
    }
}
