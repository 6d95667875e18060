use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use uuid::Uuid;

use super::pagination::Listable;

/// Value object: id of the map that scopes a waypoint graph
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ScopeId(pub Uuid);

impl ScopeId {
    /// Generate a fresh scope id
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ScopeId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ScopeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

/// A site map: owns a raster image and the graph drawn on top of it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MapRecord {
    /// Unique identifier, also the scope of the map's nodes and routes
    pub id: ScopeId,

    /// Unique map name
    pub name: String,

    /// Location of the raster image
    #[serde(rename = "map_url")]
    pub image_path: PathBuf,

    /// Image width in pixels
    pub width: u32,

    /// Image height in pixels
    pub height: u32,

    /// Creation timestamp
    pub created_at: DateTime<Utc>,

    /// Last updated timestamp
    pub updated_at: DateTime<Utc>,
}

impl Listable for MapRecord {
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

/// Criteria for listing maps
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MapFilter {
    /// Match a single map id
    pub id: Option<ScopeId>,
    /// Match an exact name
    pub name: Option<String>,
}

impl MapFilter {
    /// Whether `map` satisfies every set criterion
    pub fn matches(&self, map: &MapRecord) -> bool {
        self.id.as_ref().map_or(true, |id| map.id == *id)
            && self.name.as_deref().map_or(true, |name| map.name == name)
    }
}
