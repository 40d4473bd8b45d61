use std::collections::HashSet;

use eframe::egui::{self, Align2, Color32, FontId, Pos2, Rect, Sense, Stroke, Ui, vec2};
use fuzzy_matcher::FuzzyMatcher;
use fuzzy_matcher::skim::SkimMatcherV2;

use truthgraph::analysis::GraphDisplay;
use truthgraph::graph::{GraphModel, NodeGroup};
use truthgraph::physics::{SimulationHandle, Viewport};

use super::super::render_utils::{
    LINK_COLOR, NODE_RADIUS, circle_visible, dim_color, draw_arrow, draw_background, group_color,
    world_to_screen,
};
use super::super::{GraphView, TruthGraphApp};

fn fuzzy_match_score(matcher: &SkimMatcherV2, text: &str, query: &str) -> Option<i64> {
    matcher
        .fuzzy_match(text, query)
        .or_else(|| matcher.fuzzy_match(&text.to_lowercase(), &query.to_lowercase()))
}

fn search_matches(graph: &GraphModel, query: &str) -> Option<HashSet<String>> {
    let query = query.trim();
    if query.is_empty() {
        return None;
    }

    let matcher = SkimMatcherV2::default();
    Some(
        graph
            .nodes()
            .iter()
            .filter(|node| fuzzy_match_score(&matcher, &node.label, query).is_some())
            .map(|node| node.id.clone())
            .collect(),
    )
}

impl TruthGraphApp {
    pub(in crate::app) fn draw_graph(&mut self, ui: &mut Ui) {
        let (rect, response) = ui.allocate_exact_size(ui.available_size(), Sense::click_and_drag());
        let painter = ui.painter_at(rect);

        draw_background(&painter, rect, self.view.pan, self.view.zoom);

        self.lifecycle
            .resize(Viewport::new(rect.width().max(1.0), rect.height().max(1.0)));

        self.view.handle_zoom(ui, rect, &response);
        self.view.handle_pan(&response);
        self.view.handle_node_drag(&mut self.lifecycle, rect, &response);

        if self.view.live_physics && self.lifecycle.tick() {
            ui.ctx().request_repaint();
        }
        if self.view.interaction.dragging().is_some() {
            ui.ctx().request_repaint();
        }

        let pending = self.lifecycle.is_pending();
        match self.lifecycle.display() {
            GraphDisplay::Placeholder => draw_placeholder(ui, &painter, rect, pending),
            GraphDisplay::Layout { graph, simulation } => {
                let hovered = response
                    .hover_pos()
                    .and_then(|pointer| self.view.node_at(&self.lifecycle, rect, pointer));
                if hovered.is_some() {
                    ui.output_mut(|output| output.cursor_icon = egui::CursorIcon::Grab);
                }

                if self.view.show_quadtree_overlay {
                    simulation.quadtree_cells(&mut self.view.quadtree_cells);
                    draw_quadtree_overlay(&painter, rect, &self.view);
                }

                let matches = search_matches(graph, &self.view.search);
                draw_layout(
                    &painter,
                    rect,
                    &self.view,
                    graph,
                    simulation,
                    hovered.as_deref(),
                    matches.as_ref(),
                );
                draw_legend(&painter, rect, Some(graph));
                painter.text(
                    rect.right_bottom() + vec2(-12.0, -10.0),
                    Align2::RIGHT_BOTTOM,
                    "Drag nodes to rearrange",
                    FontId::proportional(12.0),
                    Color32::from_gray(150),
                );

                if pending {
                    draw_pending_overlay(ui, &painter, rect);
                }
            }
        }
    }
}

fn draw_layout(
    painter: &egui::Painter,
    rect: Rect,
    view: &GraphView,
    graph: &GraphModel,
    simulation: &SimulationHandle,
    hovered: Option<&str>,
    matches: Option<&HashSet<String>>,
) {
    let zoom = view.zoom;
    let radius = NODE_RADIUS * zoom;
    let nodes = simulation.nodes();
    let screen = nodes
        .iter()
        .map(|node| world_to_screen(rect, view.pan, zoom, node.position()))
        .collect::<Vec<_>>();

    for link in graph.links() {
        let (Some(source), Some(target)) = (
            simulation.index_of(&link.source_id),
            simulation.index_of(&link.target_id),
        ) else {
            continue;
        };
        let (Some(&start), Some(&end)) = (screen.get(source), screen.get(target)) else {
            continue;
        };
        let width = (1.0 + link.weight.sqrt()).min(6.0) * zoom.sqrt();
        let stroke = Stroke::new(width, LINK_COLOR);

        if source == target {
            let center = start + vec2(radius * 0.9, -radius * 0.9);
            if circle_visible(rect, center, radius) {
                painter.circle_stroke(center, radius * 0.7, stroke);
            }
            continue;
        }
        draw_arrow(painter, start, end, radius, stroke);
    }

    let searching = matches.is_some();
    for (node, &position) in nodes.iter().zip(&screen) {
        if !circle_visible(rect, position, radius * 4.0) {
            continue;
        }
        let Some(model) = graph.node(node.id()) else {
            continue;
        };

        let matched = matches.is_some_and(|matches| matches.contains(node.id()));
        let mut fill = group_color(model.group);
        if searching && !matched {
            fill = dim_color(fill, 0.35);
        }

        let is_hovered = hovered == Some(node.id());
        let outline = if node.pinned().is_some() {
            Stroke::new(3.0, Color32::WHITE)
        } else if matched || is_hovered {
            Stroke::new(2.5, Color32::from_rgb(245, 206, 93))
        } else {
            Stroke::new(1.5, Color32::from_gray(230))
        };
        painter.circle(position, radius, fill, outline);

        let font = FontId::proportional((12.0 * zoom.sqrt()).clamp(9.0, 20.0));
        let label_pos = position + vec2(0.0, radius + 4.0);
        let galley = painter.layout_no_wrap(model.label.clone(), font.clone(), Color32::WHITE);
        let background = Rect::from_center_size(
            label_pos + vec2(0.0, galley.size().y * 0.5),
            galley.size() + vec2(8.0, 4.0),
        );
        painter.rect_filled(background, 4.0, Color32::from_black_alpha(170));
        painter.galley(background.min + vec2(4.0, 2.0), galley, Color32::WHITE);

        if let Some(time) = &model.time {
            painter.text(
                Pos2::new(position.x, background.bottom() + 2.0),
                Align2::CENTER_TOP,
                time,
                FontId::proportional((10.0 * zoom.sqrt()).clamp(8.0, 16.0)),
                Color32::from_gray(170),
            );
        }
    }
}

fn draw_quadtree_overlay(painter: &egui::Painter, rect: Rect, view: &GraphView) {
    for cell in &view.quadtree_cells {
        let min = cell.center - vec2(cell.half_extent, cell.half_extent);
        let max = cell.center + vec2(cell.half_extent, cell.half_extent);
        let top_left = world_to_screen(rect, view.pan, view.zoom, min);
        let bottom_right = world_to_screen(rect, view.pan, view.zoom, max);

        let alpha = if cell.is_leaf { 110 } else { 55 };
        let width = (1.4_f32 - (cell.depth as f32 * 0.09)).clamp(0.45, 1.4);
        painter.rect_stroke(
            Rect::from_two_pos(top_left, bottom_right),
            0.0,
            Stroke::new(width, Color32::from_rgba_unmultiplied(106, 198, 255, alpha)),
            egui::StrokeKind::Middle,
        );
    }
}

fn draw_legend(painter: &egui::Painter, rect: Rect, graph: Option<&GraphModel>) {
    let mut cursor = rect.left_top() + vec2(14.0, 16.0);
    for group in NodeGroup::ALL {
        painter.circle_filled(cursor, 6.0, group_color(group));
        let text = match graph {
            Some(graph) => format!("{} ({})", group.label(), graph.count_by_group(group)),
            None => group.label().to_owned(),
        };
        painter.text(
            cursor + vec2(12.0, 0.0),
            Align2::LEFT_CENTER,
            text,
            FontId::proportional(13.0),
            Color32::from_gray(215),
        );
        cursor.y += 20.0;
    }
}

fn draw_placeholder(ui: &Ui, painter: &egui::Painter, rect: Rect, pending: bool) {
    draw_legend(painter, rect, None);

    let message = if pending {
        "Tracing propagation…"
    } else {
        "Awaiting propagation analysis"
    };
    painter.text(
        rect.center(),
        Align2::CENTER_CENTER,
        message,
        FontId::proportional(18.0),
        Color32::from_gray(170),
    );

    if pending {
        draw_spinner(ui, painter, rect.center() + vec2(0.0, 34.0));
    }
}

fn draw_pending_overlay(ui: &Ui, painter: &egui::Painter, rect: Rect) {
    painter.rect_filled(rect, 0.0, Color32::from_black_alpha(90));
    draw_spinner(ui, painter, rect.center());
}

fn draw_spinner(ui: &Ui, painter: &egui::Painter, center: Pos2) {
    let time = ui.input(|input| input.time) as f32;
    let start = time * 4.0;
    let points = (0..=24)
        .map(|step| {
            let angle = start + (step as f32 / 24.0) * std::f32::consts::PI * 1.5;
            center + vec2(angle.cos(), angle.sin()) * 14.0
        })
        .collect::<Vec<_>>();
    painter.add(egui::Shape::line(
        points,
        Stroke::new(3.0, Color32::from_rgb(59, 130, 246)),
    ));
    ui.ctx().request_repaint();
}
