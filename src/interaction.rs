use eframe::egui::Vec2;
use tracing::debug;

use crate::physics::{DRAG_ALPHA_TARGET, SimulationHandle};

/// Drag-to-pin gestures against a running layout.
///
/// Gestures naming a node the current run does not know are ignored, which
/// covers a drag still in flight when the graph is replaced.
#[derive(Debug, Default)]
pub struct InteractionController {
    dragging: Option<String>,
}

impl InteractionController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn dragging(&self) -> Option<&str> {
        self.dragging.as_deref()
    }

    pub fn on_drag_start(&mut self, simulation: &mut SimulationHandle, node_id: &str) {
        let Some(position) = simulation.position_of(node_id) else {
            debug!(node_id, "drag start on unknown node ignored");
            return;
        };
        simulation.reheat(DRAG_ALPHA_TARGET);
        simulation.pin(node_id, position);
        self.dragging = Some(node_id.to_owned());
    }

    pub fn on_drag_move(&mut self, simulation: &mut SimulationHandle, node_id: &str, position: Vec2) {
        if simulation.index_of(node_id).is_none() {
            return;
        }
        simulation.pin(node_id, position);
    }

    pub fn on_drag_end(&mut self, simulation: &mut SimulationHandle, node_id: &str) {
        if self.dragging.as_deref() == Some(node_id) {
            self.dragging = None;
        }
        if !simulation.unpin(node_id) {
            return;
        }
        simulation.set_alpha_target(0.0);
    }

    /// Forgets any gesture in progress, e.g. when the graph is replaced.
    pub fn cancel(&mut self) {
        self.dragging = None;
    }
}
