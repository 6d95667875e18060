/// Map records that scope a waypoint graph
pub mod map;

/// Waypoint nodes
pub mod node;

/// Routes between nodes
pub mod route;

/// Incoming create/update payloads and their field mappings
pub mod requests;

/// List filtering, ordering and paging
pub mod pagination;

/// Repository interfaces
pub mod repository;
