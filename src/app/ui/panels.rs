use eframe::egui::{self, Align, Context, Layout};

use truthgraph::analysis::AnalysisStatus;

use super::super::TruthGraphApp;

impl TruthGraphApp {
    pub(in crate::app) fn show(&mut self, ctx: &Context) {
        egui::TopBottomPanel::top("top_bar")
            .resizable(false)
            .show(ctx, |ui| {
                ui.horizontal(|ui| {
                    ui.heading("truthgraph");
                    ui.separator();
                    ui.label(format!("model: {}", self.lifecycle.config().model));
                    ui.label(self.status_text());
                    if let Some(graph) = self.lifecycle.graph() {
                        ui.label(format!("nodes: {}", graph.node_count()));
                        ui.label(format!("links: {}", graph.link_count()));
                    }

                    ui.with_layout(Layout::right_to_left(Align::Center), |ui| {
                        ui.checkbox(&mut self.view.show_quadtree_overlay, "Quadtree");
                        ui.checkbox(&mut self.view.live_physics, "Live physics");
                        ui.add(
                            egui::TextEdit::singleline(&mut self.view.search)
                                .hint_text("Search nodes")
                                .desired_width(180.0),
                        );
                        if ui.button("Reset view").clicked() {
                            self.view.pan = egui::Vec2::ZERO;
                            self.view.zoom = 1.0;
                        }
                    });
                });
            });

        egui::TopBottomPanel::top("ticker")
            .resizable(false)
            .exact_height(34.0)
            .show(ctx, |ui| self.draw_ticker(ui));

        egui::SidePanel::left("chat")
            .resizable(true)
            .default_width(380.0)
            .show(ctx, |ui| self.draw_chat(ui));

        egui::CentralPanel::default()
            .frame(egui::Frame::NONE)
            .show(ctx, |ui| self.draw_graph(ui));
    }

    fn status_text(&self) -> String {
        match (self.lifecycle.status(), self.lifecycle.current()) {
            (AnalysisStatus::Idle, _) | (_, None) => "idle".to_owned(),
            (AnalysisStatus::Pending, Some(request)) => format!("analysing {}", request.id),
            (AnalysisStatus::Succeeded, Some(request)) => format!("ready {}", request.id),
            (AnalysisStatus::Failed, Some(request)) => format!("failed {}", request.id),
        }
    }
}
