use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

use super::map::ScopeId;
use super::pagination::Listable;
use crate::geometry::Point;

/// Value object: Node ID
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NodeId(pub Uuid);

impl NodeId {
    /// Generate a fresh node id
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for NodeId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

/// A named waypoint on a map
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    /// Unique identifier
    pub id: NodeId,

    /// Name, unique within the scope and immutable once set
    pub name: String,

    /// Owning map
    #[serde(rename = "map_id")]
    pub scope: ScopeId,

    /// Position on the map plane
    #[serde(rename = "roi")]
    pub position: Point,

    /// Orientation
    pub angle: f64,

    /// Free text label
    pub comment: String,

    /// Creation timestamp
    pub created_at: DateTime<Utc>,

    /// Last updated timestamp
    pub updated_at: DateTime<Utc>,
}

impl Listable for Node {
    fn list_id(&self) -> String {
        self.id.to_string()
    }

    fn list_name(&self) -> &str {
        &self.name
    }

    fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }
}

/// Criteria for listing or deleting nodes
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NodeFilter {
    /// Restrict to one scope
    pub scope: Option<ScopeId>,
    /// Match any of these ids
    pub ids: Option<Vec<NodeId>>,
    /// Match any of these names
    pub names: Option<Vec<String>>,
}

impl NodeFilter {
    /// Every node of `scope`
    pub fn in_scope(scope: &ScopeId) -> Self {
        Self {
            scope: Some(scope.clone()),
            ..Self::default()
        }
    }

    /// Restrict the filter to `ids`
    pub fn with_ids(mut self, ids: Vec<NodeId>) -> Self {
        self.ids = Some(ids);
        self
    }

    /// Restrict the filter to `names`
    pub fn with_names(mut self, names: Vec<String>) -> Self {
        self.names = Some(names);
        self
    }

    /// Whether `node` satisfies every set criterion
    pub fn matches(&self, node: &Node) -> bool {
        self.scope.as_ref().map_or(true, |scope| node.scope == *scope)
            && self.ids.as_ref().map_or(true, |ids| ids.contains(&node.id))
            && self
                .names
                .as_ref()
                .map_or(true, |names| names.iter().any(|name| *name == node.name))
    }
}

/// Name-keyed lookup over the nodes of one scope.
///
/// Routes reference their endpoints by name, so every graph operation
/// resolves endpoints through this index instead of scanning.
#[derive(Debug, Clone, Default)]
pub struct NodeIndex {
    by_name: HashMap<String, Node>,
}

impl NodeIndex {
    /// Index `nodes` by name
    pub fn new(nodes: impl IntoIterator<Item = Node>) -> Self {
        Self {
            by_name: nodes
                .into_iter()
                .map(|node| (node.name.clone(), node))
                .collect(),
        }
    }

    /// Look up a node by name
    pub fn get(&self, name: &str) -> Option<&Node> {
        self.by_name.get(name)
    }

    /// Position of the named node
    pub fn position(&self, name: &str) -> Option<Point> {
        self.by_name.get(name).map(|node| node.position)
    }

    /// Whether a node with `name` is indexed
    pub fn contains(&self, name: &str) -> bool {
        self.by_name.contains_key(name)
    }

    /// Insert or replace a node
    pub fn insert(&mut self, node: Node) {
        self.by_name.insert(node.name.clone(), node);
    }

    /// Iterate over the indexed names
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.by_name.keys().map(String::as_str)
    }
}
