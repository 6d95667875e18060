//!
//! Waygraph Core - waypoint graph maintenance and route validation
//!
//! This crate defines the domain model of a waypoint network drawn on a site
//! map, the repository interfaces a store must provide, and the services that
//! mutate the network and validate routes against the map's raster image.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

/// Domain layer - nodes, routes, maps and repository interfaces
pub mod domain;

/// Application services - graph mutation, route validation, map registry
pub mod application;

/// Point and segment math
pub mod geometry;

/// Raster decoding and sampling
pub mod raster;

/// Engine configuration
pub mod config;

/// Error types
pub mod error;

// Re-export key types
pub use config::{EndNodeCleanup, GraphConfig};
pub use error::{GraphError, GraphResult};
pub use geometry::Point;

pub use application::graph_service::{RouteSetOutcome, WaypointGraphService};
pub use application::map_service::MapService;
pub use application::route_validator::RouteValidator;

pub use domain::map::{MapFilter, MapRecord, ScopeId};
pub use domain::node::{Node, NodeFilter, NodeId};
pub use domain::pagination::{OrderBy, Pagination, SortOrder};
pub use domain::repository::{MapMetadataProvider, WaypointStore, WaypointTransaction};
pub use domain::requests::{MapRequest, NodeRequest, RouteRequest};
pub use domain::route::{PathRole, Route, RouteFilter, RouteId};
pub use raster::{ImageCrateDecoder, ImageDecoder, PixelGrid};
