use eframe::egui::{self, Pos2, Rect, Ui};

use truthgraph::analysis::AnalysisLifecycle;

use super::super::render_utils::{NODE_RADIUS, screen_to_world, world_to_screen};
use super::super::GraphView;

impl GraphView {
    pub(in crate::app) fn handle_zoom(&mut self, ui: &Ui, rect: Rect, response: &egui::Response) {
        if !response.hovered() {
            return;
        }

        let scroll = ui.input(|input| input.raw_scroll_delta.y);
        if scroll.abs() <= f32::EPSILON {
            return;
        }

        let pointer = ui
            .input(|input| input.pointer.hover_pos())
            .unwrap_or_else(|| rect.center());
        let world_before = screen_to_world(rect, self.pan, self.zoom, pointer);

        let zoom_factor = (1.0 + (scroll * 0.0018)).clamp(0.85, 1.15);
        self.zoom = (self.zoom * zoom_factor).clamp(0.2, 4.0);
        let world_after = world_to_screen(rect, self.pan, self.zoom, world_before);
        self.pan += pointer - world_after;
    }

    pub(in crate::app) fn handle_pan(&mut self, response: &egui::Response) {
        if response.dragged_by(egui::PointerButton::Secondary)
            || response.dragged_by(egui::PointerButton::Middle)
        {
            self.pan += response.drag_delta();
        }
    }

    /// Id of the node under `pointer`, nearest first.
    pub(in crate::app) fn node_at(
        &self,
        lifecycle: &AnalysisLifecycle,
        rect: Rect,
        pointer: Pos2,
    ) -> Option<String> {
        let simulation = lifecycle.simulation()?;
        let radius = NODE_RADIUS * self.zoom;
        simulation
            .nodes()
            .iter()
            .filter_map(|node| {
                let distance = world_to_screen(rect, self.pan, self.zoom, node.position()).distance(pointer);
                (distance <= radius).then_some((node.id(), distance))
            })
            .min_by(|a, b| a.1.total_cmp(&b.1))
            .map(|(id, _)| id.to_owned())
    }

    /// Turns primary-button drags into pin gestures on the running layout.
    pub(in crate::app) fn handle_node_drag(
        &mut self,
        lifecycle: &mut AnalysisLifecycle,
        rect: Rect,
        response: &egui::Response,
    ) {
        let pointer = response.interact_pointer_pos();

        if response.drag_started_by(egui::PointerButton::Primary)
            && let Some(node_id) = pointer.and_then(|pointer| self.node_at(lifecycle, rect, pointer))
            && let Some(simulation) = lifecycle.simulation_mut()
        {
            self.interaction.on_drag_start(simulation, &node_id);
        }

        let Some(node_id) = self.interaction.dragging().map(str::to_owned) else {
            return;
        };
        let Some(simulation) = lifecycle.simulation_mut() else {
            self.interaction.cancel();
            return;
        };

        if response.drag_stopped() {
            self.interaction.on_drag_end(simulation, &node_id);
        } else if response.dragged_by(egui::PointerButton::Primary)
            && let Some(pointer) = pointer
        {
            let world = screen_to_world(rect, self.pan, self.zoom, pointer);
            self.interaction.on_drag_move(simulation, &node_id, world);
        }
    }
}
