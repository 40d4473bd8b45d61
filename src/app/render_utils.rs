use eframe::egui::{Color32, Painter, Pos2, Rect, Shape, Stroke, Vec2};

use truthgraph::graph::NodeGroup;

pub(super) const NODE_RADIUS: f32 = 20.0;
pub(super) const LINK_COLOR: Color32 = Color32::from_rgb(203, 213, 225);

pub(super) fn group_color(group: NodeGroup) -> Color32 {
    match group {
        NodeGroup::Origin => Color32::from_rgb(239, 68, 68),
        NodeGroup::Spreader => Color32::from_rgb(245, 158, 11),
        NodeGroup::Authority => Color32::from_rgb(59, 130, 246),
    }
}

pub(super) fn dim_color(color: Color32, factor: f32) -> Color32 {
    let factor = factor.clamp(0.0, 1.0);
    Color32::from_rgba_unmultiplied(
        (color.r() as f32 * factor) as u8,
        (color.g() as f32 * factor) as u8,
        (color.b() as f32 * factor) as u8,
        (color.a() as f32 * (0.45 + (factor * 0.55))) as u8,
    )
}

pub(super) fn draw_background(painter: &Painter, rect: Rect, pan: Vec2, zoom: f32) {
    painter.rect_filled(rect, 0.0, Color32::from_rgb(19, 23, 29));

    let step = (56.0 * zoom.clamp(0.6, 1.8)).max(20.0);
    let stroke = Stroke::new(1.0, Color32::from_rgba_unmultiplied(60, 70, 80, 70));
    let origin = rect.center() + pan;

    let mut x = rect.left() + (origin.x - rect.left()).rem_euclid(step);
    while x < rect.right() {
        painter.line_segment([Pos2::new(x, rect.top()), Pos2::new(x, rect.bottom())], stroke);
        x += step;
    }

    let mut y = rect.top() + (origin.y - rect.top()).rem_euclid(step);
    while y < rect.bottom() {
        painter.line_segment([Pos2::new(rect.left(), y), Pos2::new(rect.right(), y)], stroke);
        y += step;
    }
}

pub(super) fn circle_visible(rect: Rect, position: Pos2, radius: f32) -> bool {
    !(position.x + radius < rect.left()
        || position.x - radius > rect.right()
        || position.y + radius < rect.top()
        || position.y - radius > rect.bottom())
}

/// Layout coordinates are viewport pixels; the view pans and zooms around the
/// middle of the canvas.
pub(super) fn world_to_screen(rect: Rect, pan: Vec2, zoom: f32, world: Vec2) -> Pos2 {
    rect.center() + pan + (world - rect.size() * 0.5) * zoom
}

pub(super) fn screen_to_world(rect: Rect, pan: Vec2, zoom: f32, screen: Pos2) -> Vec2 {
    ((screen - rect.center() - pan) / zoom) + rect.size() * 0.5
}

/// Line from `start` to `end` with a head that stops at the target's rim.
pub(super) fn draw_arrow(painter: &Painter, start: Pos2, end: Pos2, target_radius: f32, stroke: Stroke) {
    let delta = end - start;
    let length = delta.length();
    if length <= target_radius + 1.0 {
        return;
    }

    let direction = delta / length;
    let tip = end - direction * (target_radius + 2.0);
    painter.line_segment([start, tip], stroke);

    let head = 8.0 + stroke.width;
    let normal = Vec2::new(-direction.y, direction.x);
    let base = tip - direction * head;
    painter.add(Shape::convex_polygon(
        vec![tip, base + normal * (head * 0.5), base - normal * (head * 0.5)],
        stroke.color,
        Stroke::NONE,
    ));
}
