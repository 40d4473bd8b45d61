//! Force-directed layout for propagation graphs.
//!
//! A run combines four forces each tick: springs along links, many-body
//! repulsion (Barnes-Hut approximated), a weak pull of the centroid toward the
//! viewport center, and disc collision. Forces adjust velocities, which are
//! damped and integrated into positions while a global `alpha` decays toward
//! zero.

mod forces;
mod quadtree;

use std::collections::HashMap;
use std::f32::consts::PI;

use eframe::egui::{Vec2, vec2};
use tracing::debug;

use crate::graph::GraphModel;
use forces::{CollisionParams, SpringLink, accumulate_charge, accumulate_collisions, apply_links};
use quadtree::QuadNode;
pub use quadtree::QuadtreeCell;

pub const LINK_DISTANCE: f32 = 140.0;
pub const CHARGE_STRENGTH: f32 = -500.0;
pub const COLLISION_RADIUS: f32 = 60.0;
pub const CENTER_STRENGTH: f32 = 0.1;
pub const ALPHA_MIN: f32 = 0.001;
pub const VELOCITY_DECAY: f32 = 0.4;
pub const DRAG_ALPHA_TARGET: f32 = 0.3;

const BARNES_HUT_THETA: f32 = 0.9;
const COLLISION_STRENGTH: f32 = 1.0;
const SETTLE_TICKS: f32 = 300.0;

fn alpha_decay() -> f32 {
    1.0 - ALPHA_MIN.powf(1.0 / SETTLE_TICKS)
}

/// Size of the rendering surface in layout units.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Viewport {
    pub width: f32,
    pub height: f32,
}

impl Viewport {
    pub fn new(width: f32, height: f32) -> Self {
        Self {
            width: width.max(0.0),
            height: height.max(0.0),
        }
    }

    pub fn center(self) -> Vec2 {
        vec2(self.width * 0.5, self.height * 0.5)
    }
}

impl Default for Viewport {
    fn default() -> Self {
        Self::new(960.0, 640.0)
    }
}

/// Live layout state of one node. Read-only outside the simulator.
#[derive(Clone, Debug)]
pub struct SimNode {
    id: String,
    position: Vec2,
    velocity: Vec2,
    pinned: Option<Vec2>,
}

impl SimNode {
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn position(&self) -> Vec2 {
        self.position
    }

    pub fn velocity(&self) -> Vec2 {
        self.velocity
    }

    pub fn pinned(&self) -> Option<Vec2> {
        self.pinned
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct NodePosition {
    pub id: String,
    pub x: f32,
    pub y: f32,
}

/// What a tick listener sees after each step.
pub struct TickFrame<'a> {
    pub tick: u64,
    pub alpha: f32,
    pub nodes: &'a [SimNode],
}

type TickListener = Box<dyn FnMut(&TickFrame<'_>)>;

#[derive(Default)]
struct Scratch {
    positions: Vec<Vec2>,
    velocities: Vec<Vec2>,
    predicted: Vec<Vec2>,
}

/// One layout run over a snapshot of a graph.
pub struct SimulationHandle {
    nodes: Vec<SimNode>,
    index_by_id: HashMap<String, usize>,
    links: Vec<SpringLink>,
    viewport: Viewport,
    alpha: f32,
    alpha_target: f32,
    alpha_decay: f32,
    ticks: u64,
    running: bool,
    stopped: bool,
    listeners: Vec<TickListener>,
    scratch: Scratch,
}

impl SimulationHandle {
    pub fn new(graph: &GraphModel, viewport: Viewport) -> Self {
        let center = viewport.center();
        let golden_angle = PI * (3.0 - 5.0_f32.sqrt());

        let nodes = graph
            .nodes()
            .iter()
            .enumerate()
            .map(|(index, node)| {
                let radius = 10.0 * (0.5 + index as f32).sqrt();
                let angle = index as f32 * golden_angle;
                let seeded = center + vec2(angle.cos(), angle.sin()) * radius;
                let position = node
                    .pinned
                    .or(node.position)
                    .filter(|position| position.x.is_finite() && position.y.is_finite())
                    .unwrap_or(seeded);
                SimNode {
                    id: node.id.clone(),
                    position,
                    velocity: Vec2::ZERO,
                    pinned: node.pinned.filter(|pin| pin.x.is_finite() && pin.y.is_finite()),
                }
            })
            .collect::<Vec<_>>();

        let index_by_id = nodes
            .iter()
            .enumerate()
            .map(|(index, node)| (node.id.clone(), index))
            .collect::<HashMap<_, _>>();

        let endpoints = graph
            .links()
            .iter()
            .filter(|link| !link.is_self_link())
            .filter_map(|link| {
                Some((
                    *index_by_id.get(&link.source_id)?,
                    *index_by_id.get(&link.target_id)?,
                ))
            })
            .collect::<Vec<_>>();

        let mut degree = vec![0usize; nodes.len()];
        for &(source, target) in &endpoints {
            degree[source] += 1;
            degree[target] += 1;
        }

        let links = endpoints
            .into_iter()
            .map(|(source, target)| {
                let (source_degree, target_degree) = (degree[source] as f32, degree[target] as f32);
                SpringLink {
                    source,
                    target,
                    strength: 1.0 / source_degree.min(target_degree),
                    bias: source_degree / (source_degree + target_degree),
                }
            })
            .collect::<Vec<_>>();

        debug!(
            nodes = nodes.len(),
            links = links.len(),
            width = viewport.width,
            height = viewport.height,
            "starting layout"
        );

        Self {
            running: !nodes.is_empty(),
            nodes,
            index_by_id,
            links,
            viewport,
            alpha: 1.0,
            alpha_target: 0.0,
            alpha_decay: alpha_decay(),
            ticks: 0,
            stopped: false,
            listeners: Vec::new(),
            scratch: Scratch::default(),
        }
    }

    pub fn on_tick(&mut self, listener: impl FnMut(&TickFrame<'_>) + 'static) {
        if !self.stopped {
            self.listeners.push(Box::new(listener));
        }
    }

    /// Ends the run and drops every listener. Safe to call repeatedly.
    pub fn stop(&mut self) {
        if self.stopped {
            return;
        }
        self.stopped = true;
        self.running = false;
        self.listeners.clear();
        debug!(ticks = self.ticks, "layout stopped");
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped
    }

    /// True while the layout still has energy to spend.
    pub fn is_running(&self) -> bool {
        self.running && !self.stopped
    }

    pub fn alpha(&self) -> f32 {
        self.alpha
    }

    pub fn alpha_target(&self) -> f32 {
        self.alpha_target
    }

    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    pub fn nodes(&self) -> &[SimNode] {
        &self.nodes
    }

    pub fn links(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        self.links.iter().map(|link| (link.source, link.target))
    }

    pub fn index_of(&self, id: &str) -> Option<usize> {
        self.index_by_id.get(id).copied()
    }

    pub fn position_of(&self, id: &str) -> Option<Vec2> {
        self.index_of(id).map(|index| self.nodes[index].position)
    }

    pub fn positions(&self) -> Vec<NodePosition> {
        self.nodes
            .iter()
            .map(|node| NodePosition {
                id: node.id.clone(),
                x: node.position.x,
                y: node.position.y,
            })
            .collect()
    }

    /// Keeps `target` as the floor `alpha` decays toward and wakes the run.
    pub fn reheat(&mut self, target: f32) {
        if self.stopped || self.nodes.is_empty() {
            return;
        }
        self.alpha_target = target.max(0.0);
        self.alpha = self.alpha.max(self.alpha_target);
        self.running = true;
    }

    pub fn set_alpha_target(&mut self, target: f32) {
        self.alpha_target = target.max(0.0);
    }

    pub fn pin(&mut self, id: &str, position: Vec2) -> bool {
        let Some(index) = self.index_of(id) else {
            return false;
        };
        let node = &mut self.nodes[index];
        node.pinned = Some(position);
        node.position = position;
        node.velocity = Vec2::ZERO;
        true
    }

    pub fn unpin(&mut self, id: &str) -> bool {
        let Some(index) = self.index_of(id) else {
            return false;
        };
        self.nodes[index].pinned.take().is_some()
    }

    /// Moves the layout to a new surface without restarting it.
    pub fn resize(&mut self, viewport: Viewport) {
        if viewport == self.viewport {
            return;
        }
        let shift = viewport.center() - self.viewport.center();
        for node in &mut self.nodes {
            node.position += shift;
            if let Some(pinned) = node.pinned.as_mut() {
                *pinned += shift;
            }
        }
        self.viewport = viewport;
    }

    /// Advances one step. Returns false once the run is settled or stopped.
    pub fn tick(&mut self) -> bool {
        if !self.is_running() {
            return false;
        }

        self.alpha += (self.alpha_target - self.alpha) * self.alpha_decay;
        self.step();
        self.ticks += 1;

        let frame = TickFrame {
            tick: self.ticks,
            alpha: self.alpha,
            nodes: &self.nodes,
        };
        for listener in &mut self.listeners {
            listener(&frame);
        }

        if self.alpha < ALPHA_MIN {
            self.running = false;
            debug!(ticks = self.ticks, "layout settled");
        }
        true
    }

    /// Ticks until settled, stopped, or `max_ticks` is reached.
    pub fn run_until_settled(&mut self, max_ticks: usize) -> usize {
        let mut count = 0;
        while count < max_ticks && self.tick() {
            count += 1;
        }
        count
    }

    pub fn quadtree_cells(&self, cells: &mut Vec<QuadtreeCell>) {
        cells.clear();
        let positions = self.nodes.iter().map(|node| node.position).collect::<Vec<_>>();
        if let Some(tree) = QuadNode::build(&positions) {
            tree.collect_cells(0, cells);
        }
    }

    fn step(&mut self) {
        let alpha = self.alpha;
        let scratch = &mut self.scratch;
        scratch.positions.clear();
        scratch.velocities.clear();
        for node in &self.nodes {
            scratch.positions.push(node.position);
            scratch.velocities.push(node.velocity);
        }
        let positions = &mut scratch.positions;
        let velocities = &mut scratch.velocities;

        apply_links(&self.links, positions, velocities, LINK_DISTANCE, alpha);

        if let Some(tree) = QuadNode::build(positions) {
            for (index, velocity) in velocities.iter_mut().enumerate() {
                accumulate_charge(
                    &tree,
                    index,
                    positions,
                    CHARGE_STRENGTH * alpha,
                    BARNES_HUT_THETA,
                    velocity,
                );
            }
        }

        let count = positions.len() as f32;
        let centroid = positions.iter().fold(Vec2::ZERO, |sum, point| sum + *point) / count;
        let shift = (self.viewport.center() - centroid) * CENTER_STRENGTH;
        for (position, node) in positions.iter_mut().zip(&self.nodes) {
            if node.pinned.is_none() {
                *position += shift;
            }
        }

        scratch.predicted.clear();
        scratch
            .predicted
            .extend(positions.iter().zip(velocities.iter()).map(|(p, v)| *p + *v));
        if let Some(tree) = QuadNode::build(&scratch.predicted) {
            accumulate_collisions(
                &tree,
                &tree,
                true,
                &scratch.predicted,
                CollisionParams {
                    radius: COLLISION_RADIUS,
                    strength: COLLISION_STRENGTH,
                },
                velocities,
            );
        }

        for ((node, position), velocity) in self.nodes.iter_mut().zip(positions.iter()).zip(velocities.iter())
        {
            if let Some(pinned) = node.pinned {
                node.position = pinned;
                node.velocity = Vec2::ZERO;
                continue;
            }
            node.velocity = *velocity * (1.0 - VELOCITY_DECAY);
            node.position = *position + node.velocity;
        }
    }
}

impl Drop for SimulationHandle {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Owns at most one layout run; starting a new run stops the previous one.
#[derive(Default)]
pub struct ForceSimulator {
    active: Option<SimulationHandle>,
}

impl ForceSimulator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn start(&mut self, graph: &GraphModel, viewport: Viewport) -> &mut SimulationHandle {
        self.stop();
        self.active.insert(SimulationHandle::new(graph, viewport))
    }

    pub fn stop(&mut self) {
        if let Some(mut previous) = self.active.take() {
            previous.stop();
        }
    }

    pub fn active(&self) -> Option<&SimulationHandle> {
        self.active.as_ref()
    }

    pub fn active_mut(&mut self) -> Option<&mut SimulationHandle> {
        self.active.as_mut()
    }

    pub fn resize(&mut self, viewport: Viewport) {
        if let Some(handle) = self.active.as_mut() {
            handle.resize(viewport);
        }
    }

    pub fn tick(&mut self) -> bool {
        self.active.as_mut().is_some_and(SimulationHandle::tick)
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use serde_json::json;

    use super::*;
    use crate::graph::sanitize;

    fn chain_graph() -> GraphModel {
        sanitize(&json!({
            "nodes": [
                { "id": "origin", "label": "Forum post", "group": 1 },
                { "id": "blog", "label": "Blog", "group": 2 },
                { "id": "feed", "label": "Feed", "group": 2 },
                { "id": "paper", "label": "Paper", "group": 2 },
                { "id": "factcheck", "label": "Fact check", "group": 3 }
            ],
            "links": [
                { "source": "origin", "target": "blog" },
                { "source": "blog", "target": "feed" },
                { "source": "blog", "target": "paper" },
                { "source": "factcheck", "target": "origin" }
            ]
        }))
    }

    #[test]
    fn layout_settles_and_stops_ticking() {
        let mut handle = SimulationHandle::new(&chain_graph(), Viewport::new(800.0, 600.0));

        let ticks = handle.run_until_settled(10_000);

        assert!(ticks > 0 && ticks < 10_000);
        assert!(!handle.is_running());
        assert!(handle.alpha() < ALPHA_MIN);
        assert!(!handle.tick());
    }

    #[test]
    fn settled_layout_keeps_nodes_apart_and_near_center() {
        let viewport = Viewport::new(800.0, 600.0);
        let mut handle = SimulationHandle::new(&chain_graph(), viewport);
        handle.run_until_settled(10_000);

        let nodes = handle.nodes();
        for (offset, a) in nodes.iter().enumerate() {
            assert!(a.position().x.is_finite() && a.position().y.is_finite());
            for b in &nodes[offset + 1..] {
                assert!((a.position() - b.position()).length() >= COLLISION_RADIUS);
            }
        }

        let centroid = nodes.iter().fold(Vec2::ZERO, |sum, node| sum + node.position())
            / nodes.len() as f32;
        assert!((centroid - viewport.center()).length() < 50.0);
    }

    #[test]
    fn identical_inputs_produce_identical_layouts() {
        let graph = chain_graph();
        let mut first = SimulationHandle::new(&graph, Viewport::default());
        let mut second = SimulationHandle::new(&graph, Viewport::default());

        first.run_until_settled(200);
        second.run_until_settled(200);

        assert_eq!(first.positions(), second.positions());
    }

    #[test]
    fn pinned_node_holds_position_while_neighbors_move() {
        let mut handle = SimulationHandle::new(&chain_graph(), Viewport::default());
        let anchor = vec2(100.0, 100.0);
        assert!(handle.pin("blog", anchor));
        let feed_before = handle.position_of("feed").expect("feed");

        for _ in 0..60 {
            handle.tick();
            assert_eq!(handle.position_of("blog"), Some(anchor));
        }

        let feed_after = handle.position_of("feed").expect("feed");
        assert!((feed_after - feed_before).length() > 1.0);
    }

    #[test]
    fn released_node_resumes_moving() {
        let mut handle = SimulationHandle::new(&chain_graph(), Viewport::default());
        handle.reheat(DRAG_ALPHA_TARGET);
        let anchor = vec2(-400.0, -400.0);
        handle.pin("feed", anchor);
        for _ in 0..30 {
            handle.tick();
        }

        assert!(handle.unpin("feed"));
        handle.set_alpha_target(0.0);
        for _ in 0..5 {
            handle.tick();
        }

        let position = handle.position_of("feed").expect("feed");
        assert!((position - anchor).length() > 1.0);
    }

    #[test]
    fn listeners_receive_every_tick_until_stopped() {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let mut handle = SimulationHandle::new(&chain_graph(), Viewport::default());
        let sink = Rc::clone(&seen);
        handle.on_tick(move |frame| sink.borrow_mut().push((frame.tick, frame.nodes.len())));

        handle.tick();
        handle.tick();
        handle.stop();
        handle.stop();
        handle.tick();

        assert_eq!(*seen.borrow(), vec![(1, 5), (2, 5)]);
        assert!(handle.is_stopped());
        assert_eq!(Rc::strong_count(&seen), 1);
    }

    #[test]
    fn stop_after_natural_completion_is_harmless() {
        let mut handle = SimulationHandle::new(&chain_graph(), Viewport::default());
        handle.run_until_settled(10_000);

        handle.stop();
        handle.stop();

        assert!(handle.is_stopped());
        handle.reheat(DRAG_ALPHA_TARGET);
        assert!(!handle.is_running());
    }

    #[test]
    fn empty_graph_never_ticks() {
        let mut handle = SimulationHandle::new(&GraphModel::empty(), Viewport::default());

        assert!(!handle.is_running());
        assert!(!handle.tick());
        assert!(handle.positions().is_empty());
    }

    #[test]
    fn resize_recenters_without_restarting() {
        let mut handle = SimulationHandle::new(&chain_graph(), Viewport::new(400.0, 400.0));
        handle.run_until_settled(50);
        let alpha = handle.alpha();
        let before = handle.position_of("origin").expect("origin");

        handle.resize(Viewport::new(600.0, 800.0));

        assert_eq!(handle.alpha(), alpha);
        assert_eq!(handle.ticks(), 50);
        let after = handle.position_of("origin").expect("origin");
        assert!((after - before - vec2(100.0, 200.0)).length() < 1e-3);
    }

    #[test]
    fn starting_a_new_run_stops_the_previous_one() {
        let seen = Rc::new(RefCell::new(0usize));
        let mut simulator = ForceSimulator::new();
        let sink = Rc::clone(&seen);
        simulator
            .start(&chain_graph(), Viewport::default())
            .on_tick(move |_| *sink.borrow_mut() += 1);
        simulator.tick();

        simulator.start(&GraphModel::empty(), Viewport::default());
        simulator.tick();

        assert_eq!(*seen.borrow(), 1);
        assert_eq!(Rc::strong_count(&seen), 1);
        assert!(simulator.active().is_some_and(|handle| handle.nodes().is_empty()));
    }

    #[test]
    fn supplied_positions_seed_the_layout() {
        let graph = sanitize(&json!({
            "nodes": [{ "id": "a", "label": "A", "group": 1, "x": 12.0, "y": 34.0 }]
        }));

        let handle = SimulationHandle::new(&graph, Viewport::default());

        assert_eq!(handle.position_of("a"), Some(vec2(12.0, 34.0)));
    }

    #[test]
    fn oversized_seed_hint_keeps_every_position_finite() {
        let graph = sanitize(&json!({
            "nodes": [
                { "id": "a", "label": "A", "group": 1, "x": 1e39, "y": 0 },
                { "id": "b", "label": "B", "group": 2 },
                { "id": "c", "label": "C", "group": 3 }
            ],
            "links": [{ "source": "b", "target": "c" }]
        }));
        let mut handle = SimulationHandle::new(&graph, Viewport::new(800.0, 600.0));

        handle.run_until_settled(50);

        for node in handle.nodes() {
            let position = node.position();
            assert!(position.x.is_finite() && position.y.is_finite(), "{} -> {position:?}", node.id());
        }
    }

    #[test]
    fn non_finite_seed_falls_back_to_placement() {
        let mut graph = chain_graph();
        let mut nodes = graph.nodes().to_vec();
        nodes[0].position = Some(vec2(f32::INFINITY, 0.0));
        nodes[1].pinned = Some(vec2(f32::NAN, 3.0));
        graph = GraphModel::from_parts(nodes, graph.links().to_vec());
        let mut handle = SimulationHandle::new(&graph, Viewport::new(800.0, 600.0));

        handle.run_until_settled(100);

        assert!(handle.nodes()[1].pinned().is_none());
        assert!(handle.positions().iter().all(|node| node.x.is_finite() && node.y.is_finite()));
    }
}
