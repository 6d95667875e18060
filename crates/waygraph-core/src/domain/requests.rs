//! Create/update payloads and the explicit field mappings onto records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use super::map::{MapRecord, ScopeId};
use super::node::{Node, NodeId};
use super::route::{route_name, PathRole, Route, RouteId};
use crate::geometry::Point;

/// Payload for creating or editing a node
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct NodeRequest {
    /// Existing node to edit; `None` creates a node
    #[serde(default)]
    pub id: Option<NodeId>,

    /// Explicit name for a new node; ignored on edit
    #[serde(default)]
    pub name: Option<String>,

    /// Position on the map plane
    #[serde(rename = "roi")]
    pub position: Point,

    /// Orientation
    #[serde(default)]
    pub angle: f64,

    /// Free text label
    #[serde(default)]
    pub comment: String,
}

impl NodeRequest {
    /// Create request at `position`
    pub fn at(x: f64, y: f64) -> Self {
        Self {
            position: Point::new(x, y),
            ..Self::default()
        }
    }

    /// Give the new node an explicit name
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Turn the request into an edit of `id`
    pub fn editing(mut self, id: NodeId) -> Self {
        self.id = Some(id);
        self
    }

    /// Set the orientation
    pub fn with_angle(mut self, angle: f64) -> Self {
        self.angle = angle;
        self
    }

    /// Set the label
    pub fn with_comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = comment.into();
        self
    }

    /// Build a new node named `name` from this request
    pub fn to_new_node(&self, scope: &ScopeId, name: String, now: DateTime<Utc>) -> Node {
        Node {
            id: NodeId::new(),
            name,
            scope: scope.clone(),
            position: self.position,
            angle: self.angle,
            comment: self.comment.clone(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Copy the editable fields onto `node`. The name is left untouched.
    pub fn apply_to(&self, node: &mut Node, now: DateTime<Utc>) {
        node.position = self.position;
        node.angle = self.angle;
        node.comment = self.comment.clone();
        node.updated_at = now;
    }
}

/// Payload for creating or editing a route, or naming one to validate
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct RouteRequest {
    /// Existing route to edit; `None` creates a route
    #[serde(default)]
    pub id: Option<RouteId>,

    /// Start node name
    pub start: String,

    /// End node name
    pub end: String,

    /// Traversal rule
    #[serde(default)]
    pub path_role: PathRole,

    /// Label for start to end traversal; defaults to the configured label
    #[serde(default)]
    pub start_end: Option<String>,

    /// Label for end to start traversal; defaults to the configured label
    #[serde(default)]
    pub end_start: Option<String>,
}

impl RouteRequest {
    /// Route from `start` to `end` with default role and labels
    pub fn between(start: impl Into<String>, end: impl Into<String>) -> Self {
        Self {
            start: start.into(),
            end: end.into(),
            ..Self::default()
        }
    }

    /// Set the traversal rule
    pub fn with_role(mut self, path_role: PathRole) -> Self {
        self.path_role = path_role;
        self
    }

    /// Turn the request into an edit of `id`
    pub fn editing(mut self, id: RouteId) -> Self {
        self.id = Some(id);
        self
    }

    /// Derived route name
    pub fn name(&self) -> String {
        route_name(&self.start, &self.end)
    }

    /// Build a new route from this request
    pub fn to_new_route(&self, scope: &ScopeId, default_label: &str, now: DateTime<Utc>) -> Route {
        Route {
            id: RouteId::new(),
            name: self.name(),
            scope: scope.clone(),
            start: self.start.clone(),
            end: self.end.clone(),
            path_role: self.path_role,
            start_end: self.start_end.clone().unwrap_or_else(|| default_label.to_string()),
            end_start: self.end_start.clone().unwrap_or_else(|| default_label.to_string()),
            created_at: now,
            updated_at: now,
        }
    }

    /// Copy endpoints, role and labels onto `route`, re-deriving its name
    pub fn apply_to(&self, route: &mut Route, default_label: &str, now: DateTime<Utc>) {
        route.name = self.name();
        route.start = self.start.clone();
        route.end = self.end.clone();
        route.path_role = self.path_role;
        route.start_end = self.start_end.clone().unwrap_or_else(|| default_label.to_string());
        route.end_start = self.end_start.clone().unwrap_or_else(|| default_label.to_string());
        route.updated_at = now;
    }
}

/// Payload for registering or editing a map
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct MapRequest {
    /// Existing map to edit; `None` registers a new map
    #[serde(default)]
    pub id: Option<ScopeId>,

    /// Unique map name
    pub name: String,

    /// Location of the raster image
    #[serde(rename = "map_url")]
    pub image_path: PathBuf,
}

impl MapRequest {
    /// Build a new map record with measured dimensions
    pub fn to_new_map(&self, (width, height): (u32, u32), now: DateTime<Utc>) -> MapRecord {
        MapRecord {
            id: ScopeId::new(),
            name: self.name.clone(),
            image_path: self.image_path.clone(),
            width,
            height,
            created_at: now,
            updated_at: now,
        }
    }

    /// Copy name, image and measured dimensions onto `map`
    pub fn apply_to(&self, map: &mut MapRecord, (width, height): (u32, u32), now: DateTime<Utc>) {
        map.name = self.name.clone();
        map.image_path = self.image_path.clone();
        map.width = width;
        map.height = height;
        map.updated_at = now;
    }
}
