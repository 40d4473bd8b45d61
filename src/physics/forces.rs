use std::f32::consts::TAU;

use eframe::egui::{Vec2, vec2};

use super::quadtree::QuadNode;

const DISTANCE_MIN_SQ: f32 = 1.0;

/// Deterministic stand-in for a random nudge when two points coincide.
pub(super) fn jiggle(from: usize, to: usize) -> Vec2 {
    let angle = ((from as f32) * 0.618_034 + (to as f32) * 0.414_214 + 0.11) * TAU;
    vec2(angle.cos(), angle.sin())
}

#[derive(Clone, Copy)]
pub(super) struct SpringLink {
    pub(super) source: usize,
    pub(super) target: usize,
    pub(super) strength: f32,
    /// Share of the correction applied to the target; the rest goes to the source.
    pub(super) bias: f32,
}

/// Spring toward `distance`, evaluated on next-step positions.
pub(super) fn apply_links(
    links: &[SpringLink],
    positions: &[Vec2],
    velocities: &mut [Vec2],
    distance: f32,
    alpha: f32,
) {
    for link in links {
        let mut delta = (positions[link.target] + velocities[link.target])
            - (positions[link.source] + velocities[link.source]);
        if delta.length_sq() <= f32::EPSILON {
            delta = jiggle(link.source, link.target) * 1e-3;
        }

        let length = delta.length();
        let correction = delta * ((length - distance) / length * alpha * link.strength);
        velocities[link.target] -= correction * link.bias;
        velocities[link.source] += correction * (1.0 - link.bias);
    }
}

/// Many-body term for one node; negative `strength` repels.
pub(super) fn accumulate_charge(
    node: &QuadNode,
    index: usize,
    positions: &[Vec2],
    strength: f32,
    theta: f32,
    velocity: &mut Vec2,
) {
    if node.mass <= 0.0 {
        return;
    }

    let point = positions[index];

    if node.is_leaf() {
        for &other in &node.indices {
            if other == index {
                continue;
            }
            let mut delta = positions[other] - point;
            if delta.length_sq() <= f32::EPSILON {
                delta = jiggle(index, other) * 1e-3;
            }
            let distance_sq = delta.length_sq().max(DISTANCE_MIN_SQ);
            *velocity += delta * (strength / distance_sq);
        }
        return;
    }

    let delta = node.center_of_mass - point;
    let distance_sq = delta.length_sq().max(DISTANCE_MIN_SQ);
    let far_enough = !node.bounds.contains(point)
        && node.bounds.side_length() * node.bounds.side_length() < theta * theta * distance_sq;

    if far_enough {
        *velocity += delta * (strength * node.mass / distance_sq);
        return;
    }

    for child in node.children.iter().flatten() {
        accumulate_charge(child, index, positions, strength, theta, velocity);
    }
}

#[derive(Clone, Copy)]
pub(super) struct CollisionParams {
    pub(super) radius: f32,
    pub(super) strength: f32,
}

/// Pushes overlapping discs apart, walking pairs of quadtree cells and
/// skipping cell pairs further apart than two radii.
pub(super) fn accumulate_collisions(
    node_a: &QuadNode,
    node_b: &QuadNode,
    same_node: bool,
    positions: &[Vec2],
    params: CollisionParams,
    velocities: &mut [Vec2],
) {
    let reach = params.radius * 2.0;
    if node_a.bounds.gap_sq(node_b.bounds) > reach * reach {
        return;
    }

    if node_a.is_leaf() && node_b.is_leaf() {
        for (offset, &from) in node_a.indices.iter().enumerate() {
            let partners = if same_node {
                &node_a.indices[offset + 1..]
            } else {
                &node_b.indices[..]
            };
            for &to in partners {
                separate(from, to, positions, params, velocities);
            }
        }
        return;
    }

    if same_node {
        let children = node_a.children.iter().flatten().collect::<Vec<_>>();
        for (offset, child_a) in children.iter().enumerate() {
            accumulate_collisions(child_a, child_a, true, positions, params, velocities);
            for child_b in &children[offset + 1..] {
                accumulate_collisions(child_a, child_b, false, positions, params, velocities);
            }
        }
        return;
    }

    let split_a = !node_a.is_leaf()
        && (node_b.is_leaf() || node_a.bounds.half_extent >= node_b.bounds.half_extent);
    if split_a {
        for child in node_a.children.iter().flatten() {
            accumulate_collisions(child, node_b, false, positions, params, velocities);
        }
    } else {
        for child in node_b.children.iter().flatten() {
            accumulate_collisions(node_a, child, false, positions, params, velocities);
        }
    }
}

fn separate(
    from: usize,
    to: usize,
    positions: &[Vec2],
    params: CollisionParams,
    velocities: &mut [Vec2],
) {
    let min_distance = params.radius * 2.0;
    let mut delta = positions[from] - positions[to];
    if delta.length_sq() <= f32::EPSILON {
        delta = jiggle(from, to) * 1e-3;
    }
    let distance = delta.length();
    if distance >= min_distance {
        return;
    }

    // Equal radii split the push evenly.
    let push = delta * ((min_distance - distance) / distance * params.strength * 0.5);
    velocities[from] += push;
    velocities[to] -= push;
}
