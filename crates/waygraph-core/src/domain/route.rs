use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use uuid::Uuid;

use super::map::ScopeId;
use super::pagination::Listable;

/// Value object: Route ID
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RouteId(pub Uuid);

impl RouteId {
    /// Generate a fresh route id
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for RouteId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for RouteId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

/// How a route may be traversed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PathRole {
    /// Either direction
    #[default]
    Bidirectional,
    /// Only start to end
    Unidirectional,
}

impl std::fmt::Display for PathRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PathRole::Bidirectional => f.write_str("bidirectional"),
            PathRole::Unidirectional => f.write_str("unidirectional"),
        }
    }
}

impl std::str::FromStr for PathRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "bidirectional" => Ok(PathRole::Bidirectional),
            "unidirectional" => Ok(PathRole::Unidirectional),
            other => Err(format!("unknown path role: {}", other)),
        }
    }
}

/// Derived route name: `"{start}-{end}"`
pub fn route_name(start: &str, end: &str) -> String {
    format!("{}-{}", start, end)
}

/// A segment between two named nodes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Route {
    /// Unique identifier
    pub id: RouteId,

    /// `"{start}-{end}"`, unique within the scope
    pub name: String,

    /// Owning map
    #[serde(rename = "map_id")]
    pub scope: ScopeId,

    /// Name of the start node
    pub start: String,

    /// Name of the end node
    pub end: String,

    /// Traversal rule
    pub path_role: PathRole,

    /// Label for traversal from start to end
    pub start_end: String,

    /// Label for traversal from end to start
    pub end_start: String,

    /// Creation timestamp
    pub created_at: DateTime<Utc>,

    /// Last updated timestamp
    pub updated_at: DateTime<Utc>,
}

impl Route {
    /// Whether either endpoint is the named node
    pub fn touches(&self, node_name: &str) -> bool {
        self.start == node_name || self.end == node_name
    }
}

impl Listable for Route {
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

/// Criteria for listing or deleting routes
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RouteFilter {
    /// Restrict to one scope
    pub scope: Option<ScopeId>,
    /// Match any of these ids
    pub ids: Option<Vec<RouteId>>,
    /// Match an exact route name
    pub name: Option<String>,
    /// Match routes whose start or end is one of these node names
    pub touching: Option<Vec<String>>,
}

impl RouteFilter {
    /// Every route of `scope`
    pub fn in_scope(scope: &ScopeId) -> Self {
        Self {
            scope: Some(scope.clone()),
            ..Self::default()
        }
    }

    /// Restrict the filter to `ids`
    pub fn with_ids(mut self, ids: Vec<RouteId>) -> Self {
        self.ids = Some(ids);
        self
    }

    /// Restrict the filter to one route name
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Restrict the filter to routes incident to any of `names`
    pub fn touching(mut self, names: Vec<String>) -> Self {
        self.touching = Some(names);
        self
    }

    /// Whether `route` satisfies every set criterion
    pub fn matches(&self, route: &Route) -> bool {
        self.scope.as_ref().map_or(true, |scope| route.scope == *scope)
            && self.ids.as_ref().map_or(true, |ids| ids.contains(&route.id))
            && self.name.as_deref().map_or(true, |name| route.name == name)
            && self
                .touching
                .as_ref()
                .map_or(true, |names| names.iter().any(|name| route.touches(name)))
    }
}

/// Names of every node referenced by `routes`
pub fn referenced_node_names<'a>(routes: impl IntoIterator<Item = &'a Route>) -> HashSet<String> {
    routes
        .into_iter()
        .flat_map(|route| [route.start.clone(), route.end.clone()])
        .collect()
}
