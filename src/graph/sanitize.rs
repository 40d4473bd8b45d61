use std::collections::HashSet;

use eframe::egui::vec2;
use serde_json::{Map, Value};
use tracing::debug;

use super::{GraphLink, GraphModel, GraphNode, NodeGroup};

const DEFAULT_LINK_WEIGHT: f32 = 1.0;
/// Seed coordinates further out than this are ignored.
const MAX_HINT_MAGNITUDE: f32 = 100_000.0;

/// Narrows an untrusted payload into a [`GraphModel`].
///
/// Structural problems yield an empty model instead of an error. Invalid node
/// and link entries are dropped individually, so a partially valid payload
/// still produces the part of the graph that validates.
pub fn sanitize(raw: &Value) -> GraphModel {
    let Some(object) = raw.as_object() else {
        debug!("graph payload is not an object");
        return GraphModel::empty();
    };
    let Some(raw_nodes) = object.get("nodes").and_then(Value::as_array) else {
        debug!("graph payload has no nodes array");
        return GraphModel::empty();
    };

    let mut seen = HashSet::with_capacity(raw_nodes.len());
    let mut nodes = Vec::with_capacity(raw_nodes.len());
    let mut rejected_nodes = 0usize;
    for entry in raw_nodes {
        match parse_node(entry) {
            Some(node) if seen.insert(node.id.clone()) => nodes.push(node),
            _ => rejected_nodes += 1,
        }
    }

    let mut links = Vec::new();
    let mut rejected_links = 0usize;
    if let Some(raw_links) = object.get("links").and_then(Value::as_array) {
        for entry in raw_links {
            match parse_link(entry, &seen) {
                Some(link) => links.push(link),
                None => rejected_links += 1,
            }
        }
    }

    debug!(
        nodes = nodes.len(),
        links = links.len(),
        rejected_nodes,
        rejected_links,
        "sanitized graph payload"
    );

    GraphModel::from_parts(nodes, links)
}

fn parse_node(entry: &Value) -> Option<GraphNode> {
    let object = entry.as_object()?;
    let id = non_empty_str(object.get("id"))?;
    let label = non_empty_str(object.get("label"))?;
    let group = object.get("group").and_then(group_from_value)?;

    let time = object
        .get("time")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_owned);

    Some(GraphNode {
        id: id.to_owned(),
        label: label.to_owned(),
        group,
        time,
        position: position_hint(object),
        pinned: None,
    })
}

fn parse_link(entry: &Value, known_ids: &HashSet<String>) -> Option<GraphLink> {
    let object = entry.as_object()?;
    let source_id = endpoint_id(object.get("source")?)?;
    let target_id = endpoint_id(object.get("target")?)?;
    if !known_ids.contains(source_id) || !known_ids.contains(target_id) {
        return None;
    }

    let weight = match object.get("value") {
        None | Some(Value::Null) => DEFAULT_LINK_WEIGHT,
        Some(value) => number_from_value(value)
            .map(|weight| weight as f32)
            .filter(|weight| weight.is_finite() && *weight > 0.0)?,
    };

    Some(GraphLink {
        source_id: source_id.to_owned(),
        target_id: target_id.to_owned(),
        weight,
    })
}

/// Link endpoints arrive either as a bare id or as an already-resolved node.
fn endpoint_id(value: &Value) -> Option<&str> {
    match value {
        Value::String(_) => non_empty_str(Some(value)),
        Value::Object(object) => non_empty_str(object.get("id")),
        _ => None,
    }
}

fn non_empty_str(value: Option<&Value>) -> Option<&str> {
    value
        .and_then(Value::as_str)
        .filter(|text| !text.trim().is_empty())
}

fn group_from_value(value: &Value) -> Option<NodeGroup> {
    let number = number_from_value(value)?;
    if number.fract() != 0.0 {
        return None;
    }
    NodeGroup::from_code(number as i64)
}

fn number_from_value(value: &Value) -> Option<f64> {
    let number = match value {
        Value::Number(number) => number.as_f64()?,
        Value::String(text) => text.trim().parse::<f64>().ok()?,
        _ => return None,
    };
    number.is_finite().then_some(number)
}

fn position_hint(object: &Map<String, Value>) -> Option<eframe::egui::Vec2> {
    let coordinate = |key: &str| {
        object
            .get(key)
            .and_then(Value::as_f64)
            .map(|value| value as f32)
            .filter(|value| value.is_finite() && value.abs() <= MAX_HINT_MAGNITUDE)
    };
    Some(vec2(coordinate("x")?, coordinate("y")?))
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn non_object_payloads_are_empty() {
        assert!(sanitize(&json!(null)).is_empty());
        assert!(sanitize(&json!([1, 2, 3])).is_empty());
        assert!(sanitize(&json!("nodes")).is_empty());
        assert!(sanitize(&json!({ "nodes": "not-a-list" })).is_empty());
        assert!(sanitize(&json!({ "links": [] })).is_empty());
    }

    #[test]
    fn invalid_group_drops_node_and_its_links() {
        let raw = json!({
            "nodes": [
                { "id": "1", "label": "X", "group": 1 },
                { "id": "2", "label": "Y", "group": 9 }
            ],
            "links": [{ "source": "1", "target": "2", "value": 1 }]
        });

        let model = sanitize(&raw);

        assert_eq!(model.node_count(), 1);
        assert_eq!(model.link_count(), 0);
        assert!(model.contains("1"));
    }

    #[test]
    fn nodes_missing_id_or_label_are_skipped_not_defaulted() {
        let raw = json!({
            "nodes": [
                { "label": "no id", "group": 1 },
                { "id": "", "label": "blank id", "group": 1 },
                { "id": "a", "group": 2 },
                { "id": 7, "label": "numeric id", "group": 2 },
                { "id": "b", "label": "kept", "group": "3" }
            ]
        });

        let model = sanitize(&raw);

        assert_eq!(model.node_count(), 1);
        let node = model.node("b").expect("b survives");
        assert_eq!(node.group, NodeGroup::Authority);
        assert_eq!(node.label, "kept");
    }

    #[test]
    fn fractional_group_is_not_coerced() {
        let raw = json!({ "nodes": [{ "id": "a", "label": "A", "group": 1.5 }] });
        assert!(sanitize(&raw).is_empty());

        let raw = json!({ "nodes": [{ "id": "a", "label": "A", "group": 2.0 }] });
        assert_eq!(sanitize(&raw).node_count(), 1);
    }

    #[test]
    fn first_duplicate_wins() {
        let raw = json!({
            "nodes": [
                { "id": "a", "label": "first", "group": 1 },
                { "id": "a", "label": "second", "group": 2 }
            ]
        });

        let model = sanitize(&raw);

        assert_eq!(model.node_count(), 1);
        assert_eq!(model.node("a").map(|node| node.label.as_str()), Some("first"));
    }

    #[test]
    fn links_accept_ids_or_resolved_nodes() {
        let raw = json!({
            "nodes": [
                { "id": "a", "label": "A", "group": 1 },
                { "id": "b", "label": "B", "group": 2 }
            ],
            "links": [
                { "source": { "id": "a", "x": 3.0 }, "target": "b" },
                { "source": "b", "target": { "id": "missing" } },
                { "source": 1, "target": "b" }
            ]
        });

        let model = sanitize(&raw);

        assert_eq!(model.link_count(), 1);
        assert_eq!(model.links()[0].source_id, "a");
        assert_eq!(model.links()[0].target_id, "b");
        assert_eq!(model.links()[0].weight, 1.0);
    }

    #[test]
    fn link_value_must_be_positive_when_present() {
        let raw = json!({
            "nodes": [
                { "id": "a", "label": "A", "group": 1 },
                { "id": "b", "label": "B", "group": 2 }
            ],
            "links": [
                { "source": "a", "target": "b", "value": 0 },
                { "source": "a", "target": "b", "value": -2 },
                { "source": "a", "target": "b", "value": "heavy" },
                { "source": "a", "target": "b", "value": "2.5" },
                { "source": "b", "target": "a", "value": null }
            ]
        });

        let model = sanitize(&raw);

        let weights = model.links().iter().map(|link| link.weight).collect::<Vec<_>>();
        assert_eq!(weights, vec![2.5, 1.0]);
    }

    #[test]
    fn link_values_outside_f32_range_are_dropped() {
        let raw = json!({
            "nodes": [
                { "id": "a", "label": "A", "group": 1 },
                { "id": "b", "label": "B", "group": 2 }
            ],
            "links": [
                { "source": "a", "target": "b", "value": 1e-50 },
                { "source": "a", "target": "b", "value": 1e300 },
                { "source": "a", "target": "b", "value": "1e39" },
                { "source": "b", "target": "a", "value": 3 }
            ]
        });

        let model = sanitize(&raw);

        let weights = model.links().iter().map(|link| link.weight).collect::<Vec<_>>();
        assert_eq!(weights, vec![3.0]);
    }

    #[test]
    fn self_links_are_kept() {
        let raw = json!({
            "nodes": [{ "id": "a", "label": "A", "group": 1 }],
            "links": [{ "source": "a", "target": "a" }]
        });

        let model = sanitize(&raw);

        assert_eq!(model.link_count(), 1);
        assert!(model.links()[0].is_self_link());
    }

    #[test]
    fn optional_time_and_position_hints_are_read() {
        let raw = json!({
            "nodes": [
                { "id": "a", "label": "A", "group": 1, "time": "2024-03-01", "x": 10, "y": 20.5 },
                { "id": "b", "label": "B", "group": 2, "time": 42, "x": 10 }
            ]
        });

        let model = sanitize(&raw);

        let a = model.node("a").expect("a");
        assert_eq!(a.time.as_deref(), Some("2024-03-01"));
        assert_eq!(a.position, Some(vec2(10.0, 20.5)));
        let b = model.node("b").expect("b");
        assert_eq!(b.time, None);
        assert_eq!(b.position, None);
    }

    #[test]
    fn oversized_position_hints_are_ignored() {
        let raw = json!({
            "nodes": [
                { "id": "a", "label": "A", "group": 1, "x": 1e39, "y": 0 },
                { "id": "b", "label": "B", "group": 2, "x": 5, "y": -2e6 },
                { "id": "c", "label": "C", "group": 3, "x": -250, "y": 90000 }
            ]
        });

        let model = sanitize(&raw);

        assert_eq!(model.node_count(), 3);
        assert_eq!(model.node("a").expect("a").position, None);
        assert_eq!(model.node("b").expect("b").position, None);
        assert_eq!(model.node("c").expect("c").position, Some(vec2(-250.0, 90_000.0)));
    }

    #[test]
    fn empty_node_list_is_an_empty_model() {
        let model = sanitize(&json!({ "nodes": [], "links": [] }));
        assert!(model.is_empty());
        assert_eq!(model.link_count(), 0);
    }
}
