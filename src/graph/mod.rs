mod sanitize;

use std::collections::HashMap;

use eframe::egui::Vec2;

pub use sanitize::sanitize;

/// Role a node plays in the propagation of a claim.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum NodeGroup {
    Origin = 1,
    Spreader = 2,
    Authority = 3,
}

impl NodeGroup {
    pub fn from_code(code: i64) -> Option<Self> {
        match code {
            1 => Some(Self::Origin),
            2 => Some(Self::Spreader),
            3 => Some(Self::Authority),
            _ => None,
        }
    }

    pub fn code(self) -> i64 {
        self as i64
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Origin => "Origin",
            Self::Spreader => "Spreader",
            Self::Authority => "Authority",
        }
    }

    pub const ALL: [Self; 3] = [Self::Origin, Self::Spreader, Self::Authority];
}

#[derive(Clone, Debug, PartialEq)]
pub struct GraphNode {
    pub id: String,
    pub label: String,
    pub group: NodeGroup,
    pub time: Option<String>,
    /// Seed position supplied by the payload. Once a layout run starts the
    /// simulator owns the live position.
    pub position: Option<Vec2>,
    pub pinned: Option<Vec2>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct GraphLink {
    pub source_id: String,
    pub target_id: String,
    pub weight: f32,
}

impl GraphLink {
    pub fn is_self_link(&self) -> bool {
        self.source_id == self.target_id
    }
}

/// Validated propagation graph. Nodes keep payload order; every link endpoint
/// resolves to a stored node.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct GraphModel {
    nodes: Vec<GraphNode>,
    index_by_id: HashMap<String, usize>,
    links: Vec<GraphLink>,
}

impl GraphModel {
    pub fn empty() -> Self {
        Self::default()
    }

    pub(crate) fn from_parts(nodes: Vec<GraphNode>, links: Vec<GraphLink>) -> Self {
        let index_by_id = nodes
            .iter()
            .enumerate()
            .map(|(index, node)| (node.id.clone(), index))
            .collect::<HashMap<_, _>>();

        let links = links
            .into_iter()
            .filter(|link| {
                index_by_id.contains_key(&link.source_id)
                    && index_by_id.contains_key(&link.target_id)
            })
            .collect();

        Self {
            nodes,
            index_by_id,
            links,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn link_count(&self) -> usize {
        self.links.len()
    }

    pub fn nodes(&self) -> &[GraphNode] {
        &self.nodes
    }

    pub fn links(&self) -> &[GraphLink] {
        &self.links
    }

    pub fn node(&self, id: &str) -> Option<&GraphNode> {
        self.index_of(id).map(|index| &self.nodes[index])
    }

    pub fn contains(&self, id: &str) -> bool {
        self.index_by_id.contains_key(id)
    }

    pub fn index_of(&self, id: &str) -> Option<usize> {
        self.index_by_id.get(id).copied()
    }

    pub fn count_by_group(&self, group: NodeGroup) -> usize {
        self.nodes.iter().filter(|node| node.group == group).count()
    }
}
