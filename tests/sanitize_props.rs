use proptest::prelude::*;
use serde_json::{Value, json};

use truthgraph::graph::{NodeGroup, sanitize};

fn node_entry() -> impl Strategy<Value = Value> {
    (
        prop::option::of("[a-e]{0,2}"),
        prop::option::of("[A-Za-z ]{0,8}"),
        prop_oneof![
            Just(json!(1)),
            Just(json!(2)),
            Just(json!(3)),
            Just(json!(0)),
            Just(json!("2")),
            Just(json!(2.5)),
            Just(Value::Null),
        ],
    )
        .prop_map(|(id, label, group)| {
            let mut entry = serde_json::Map::new();
            if let Some(id) = id {
                entry.insert("id".to_owned(), json!(id));
            }
            if let Some(label) = label {
                entry.insert("label".to_owned(), json!(label));
            }
            entry.insert("group".to_owned(), group);
            Value::Object(entry)
        })
}

fn link_entry() -> impl Strategy<Value = Value> {
    (
        "[a-f]{0,2}",
        "[a-f]{0,2}",
        prop_oneof![
            Just(json!(1)),
            Just(json!(-3)),
            Just(json!(0.5)),
            Just(json!("4")),
            Just(json!(1e-50)),
            Just(json!(1e300)),
            Just(json!("1e39")),
            Just(Value::Null),
        ],
    )
        .prop_map(|(source, target, value)| json!({"source": source, "target": target, "value": value}))
}

fn payload() -> impl Strategy<Value = Value> {
    (
        prop::collection::vec(node_entry(), 0..12),
        prop::collection::vec(link_entry(), 0..20),
    )
        .prop_map(|(nodes, links)| json!({"nodes": nodes, "links": links}))
}

proptest! {
    #[test]
    fn links_only_reference_kept_nodes(raw in payload()) {
        let graph = sanitize(&raw);
        for link in graph.links() {
            prop_assert!(graph.contains(&link.source_id));
            prop_assert!(graph.contains(&link.target_id));
            prop_assert!(link.weight > 0.0);
        }
    }

    #[test]
    fn node_ids_are_unique_and_well_formed(raw in payload()) {
        let graph = sanitize(&raw);
        let mut seen = std::collections::HashSet::new();
        for node in graph.nodes() {
            prop_assert!(!node.id.is_empty());
            prop_assert!(!node.label.is_empty());
            prop_assert!(NodeGroup::ALL.contains(&node.group));
            prop_assert!(seen.insert(node.id.clone()));
        }
    }

    #[test]
    fn sanitizing_is_deterministic(raw in payload()) {
        prop_assert_eq!(sanitize(&raw), sanitize(&raw));
    }

    #[test]
    fn nodes_without_string_id_or_label_yield_an_empty_graph(
        entries in prop::collection::vec(("[a-z]{1,6}", 0..4u8), 0..8),
    ) {
        // Every entry is missing, or mistypes, either its id or its label.
        let nodes = entries
            .iter()
            .map(|(text, shape)| match *shape {
                0 => json!({"label": text, "group": 1}),
                1 => json!({"id": text, "group": 2}),
                2 => json!({"id": 7, "label": text, "group": 3}),
                _ => json!({"id": text, "label": ["not", "text"], "group": 1}),
            })
            .collect::<Vec<_>>();
        let raw = json!({"nodes": nodes, "links": [{"source": "x", "target": "y"}]});

        let graph = sanitize(&raw);

        prop_assert!(graph.is_empty());
        prop_assert_eq!(graph.link_count(), 0);
    }
}
