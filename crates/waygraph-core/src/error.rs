use thiserror::Error;

use crate::domain::map::ScopeId;

/// Core error type for the waypoint graph engine
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GraphError {
    /// A referenced scope, node or route does not exist
    #[error("{entity} not found: {key}")]
    NotFound {
        /// Kind of record that was looked up
        entity: &'static str,
        /// Id or name used for the lookup
        key: String,
    },

    /// A name collision inside a scope
    #[error("{entity} already exists in scope {scope}: {name}")]
    AlreadyExists {
        /// Kind of record that collided
        entity: &'static str,
        /// Colliding name
        name: String,
        /// Scope the collision happened in
        scope: ScopeId,
    },

    /// Malformed input (degenerate geometry, unsupported image, empty batch)
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// A candidate route samples an occupied pixel
    #[error("Obstacle detected on route {route} at pixel ({x}, {y})")]
    ObstacleDetected {
        /// Name of the route that failed
        route: String,
        /// Column of the first occupied sample
        x: i64,
        /// Row of the first occupied sample
        y: i64,
    },

    /// Persistence or transaction failure
    #[error("Storage failure during {operation}{}: {message}", scope_suffix(.scope))]
    StorageFailure {
        /// Store operation that failed
        operation: String,
        /// Scope the operation was running against, if any
        scope: Option<ScopeId>,
        /// Underlying error message
        message: String,
    },

    /// The map raster could not be opened or decoded
    #[error("Failed to decode image {path}: {message}")]
    ImageDecodeFailure {
        /// Path of the raster
        path: String,
        /// Decoder message
        message: String,
    },

    /// Configuration error
    #[error("Configuration error: {0}")]
    Configuration(String),
}

fn scope_suffix(scope: &Option<ScopeId>) -> String {
    match scope {
        Some(scope) => format!(" in scope {}", scope),
        None => String::new(),
    }
}

impl GraphError {
    /// Shorthand for a [`GraphError::NotFound`]
    pub fn not_found(entity: &'static str, key: impl ToString) -> Self {
        GraphError::NotFound {
            entity,
            key: key.to_string(),
        }
    }

    /// Shorthand for a [`GraphError::AlreadyExists`]
    pub fn already_exists(entity: &'static str, name: impl Into<String>, scope: &ScopeId) -> Self {
        GraphError::AlreadyExists {
            entity,
            name: name.into(),
            scope: scope.clone(),
        }
    }

    /// Shorthand for a [`GraphError::StorageFailure`]
    pub fn storage(
        operation: impl Into<String>,
        scope: Option<&ScopeId>,
        message: impl ToString,
    ) -> Self {
        GraphError::StorageFailure {
            operation: operation.into(),
            scope: scope.cloned(),
            message: message.to_string(),
        }
    }
}

/// Result alias used across the crate
pub type GraphResult<T> = Result<T, GraphError>;
