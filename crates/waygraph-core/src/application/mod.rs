/// Node and route mutations with splitting and bypass regeneration
pub mod graph_service;

/// Obstacle checks for candidate routes
pub mod route_validator;

/// Map registry
pub mod map_service;

/// Sequential node naming
pub mod naming;

/// Pure planning helpers shared by the graph service
pub mod topology;
