//! Engine configuration
//!
//! Values come from defaults, overridden by `WAYGRAPH_*` environment variables.

use serde::{Deserialize, Serialize};
use std::env;
use std::str::FromStr;
use tracing::{info, warn};

use crate::error::{GraphError, GraphResult};
use crate::geometry::DEFAULT_SPLIT_THRESHOLD;
use crate::raster::DEFAULT_OCCUPANCY_THRESHOLD;

/// What happens to the end node of a deleted route
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EndNodeCleanup {
    /// Always delete the end node, referenced or not
    #[default]
    Unconditional,
    /// Delete the end node only when no remaining route references it
    WhenUnreferenced,
}

impl FromStr for EndNodeCleanup {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "unconditional" => Ok(EndNodeCleanup::Unconditional),
            "when_unreferenced" => Ok(EndNodeCleanup::WhenUnreferenced),
            other => Err(format!("unknown end node cleanup policy: {}", other)),
        }
    }
}

/// Engine configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphConfig {
    /// Distance under which a new node splits an existing route
    #[serde(default = "default_split_threshold")]
    pub split_threshold: f64,

    /// Grayscale intensity above which a pixel is an obstacle
    #[serde(default = "default_occupancy_threshold")]
    pub occupancy_threshold: u8,

    /// Prefix of auto-generated node names
    #[serde(default = "default_node_prefix")]
    pub node_prefix: String,

    /// Zero-padded width of the numeric suffix
    #[serde(default = "default_node_digits")]
    pub node_digits: usize,

    /// Label used for both traversal directions of generated routes
    #[serde(default = "default_direction_label")]
    pub direction_label: String,

    /// Keep the original route when a node splits it
    #[serde(default = "default_retain_split_origin")]
    pub retain_split_origin_routes: bool,

    /// End node policy for route deletion
    #[serde(default)]
    pub end_node_cleanup: EndNodeCleanup,
}

fn default_split_threshold() -> f64 {
    DEFAULT_SPLIT_THRESHOLD
}

fn default_occupancy_threshold() -> u8 {
    DEFAULT_OCCUPANCY_THRESHOLD
}

fn default_node_prefix() -> String {
    "Site".to_string()
}

fn default_node_digits() -> usize {
    4
}

fn default_direction_label() -> String {
    "forward".to_string()
}

fn default_retain_split_origin() -> bool {
    true
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self {
            split_threshold: default_split_threshold(),
            occupancy_threshold: default_occupancy_threshold(),
            node_prefix: default_node_prefix(),
            node_digits: default_node_digits(),
            direction_label: default_direction_label(),
            retain_split_origin_routes: default_retain_split_origin(),
            end_node_cleanup: EndNodeCleanup::default(),
        }
    }
}

fn parse_override<T: FromStr>(lookup: &impl Fn(&str) -> Option<String>, key: &str, target: &mut T) {
    if let Some(raw) = lookup(key) {
        match raw.trim().parse::<T>() {
            Ok(value) => *target = value,
            Err(_) => warn!("Invalid {} value: {}", key, raw),
        }
    }
}

fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" => Some(true),
        "false" | "0" | "no" => Some(false),
        _ => None,
    }
}

impl GraphConfig {
    /// Load configuration from environment variables
    pub fn load() -> GraphResult<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build a configuration from an arbitrary key lookup.
    ///
    /// Unparsable values are logged and the default is kept.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> GraphResult<Self> {
        let mut config = Self::default();

        parse_override(&lookup, "WAYGRAPH_SPLIT_THRESHOLD", &mut config.split_threshold);
        parse_override(
            &lookup,
            "WAYGRAPH_OCCUPANCY_THRESHOLD",
            &mut config.occupancy_threshold,
        );
        parse_override(&lookup, "WAYGRAPH_NODE_DIGITS", &mut config.node_digits);
        parse_override(
            &lookup,
            "WAYGRAPH_END_NODE_CLEANUP",
            &mut config.end_node_cleanup,
        );

        if let Some(prefix) = lookup("WAYGRAPH_NODE_PREFIX") {
            config.node_prefix = prefix;
        }

        if let Some(label) = lookup("WAYGRAPH_DIRECTION_LABEL") {
            config.direction_label = label;
        }

        if let Some(raw) = lookup("WAYGRAPH_RETAIN_SPLIT_ORIGIN") {
            match parse_flag(&raw) {
                Some(flag) => config.retain_split_origin_routes = flag,
                None => warn!("Invalid WAYGRAPH_RETAIN_SPLIT_ORIGIN value: {}", raw),
            }
        }

        config.validate()?;

        info!(
            split_threshold = config.split_threshold,
            occupancy_threshold = config.occupancy_threshold,
            node_prefix = %config.node_prefix,
            end_node_cleanup = ?config.end_node_cleanup,
            "Graph configuration loaded"
        );

        Ok(config)
    }

    /// Reject settings the engine cannot work with
    pub fn validate(&self) -> GraphResult<()> {
        if !self.split_threshold.is_finite() || self.split_threshold <= 0.0 {
            return Err(GraphError::Configuration(format!(
                "split_threshold must be a positive number, got {}",
                self.split_threshold
            )));
        }
        if self.node_prefix.is_empty() {
            return Err(GraphError::Configuration(
                "node_prefix must not be empty".to_string(),
            ));
        }
        if self.node_prefix.ends_with(|c: char| c.is_ascii_digit()) {
            return Err(GraphError::Configuration(format!(
                "node_prefix must not end with a digit: {}",
                self.node_prefix
            )));
        }
        if self.node_digits == 0 {
            return Err(GraphError::Configuration(
                "node_digits must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}
