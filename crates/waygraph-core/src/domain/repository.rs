//! Repository traits for the waypoint graph
//!
//! This module defines the persistence contract the engine runs against.
//! Every mutation goes through a [`WaypointTransaction`] handle obtained from
//! [`WaypointStore::begin`]; nothing written through the handle is visible to
//! other callers until [`WaypointTransaction::commit`] succeeds. A handle that
//! is dropped without being committed behaves as if it had been rolled back.

use async_trait::async_trait;

use super::map::{MapFilter, MapRecord, ScopeId};
use super::node::{Node, NodeFilter, NodeId};
use super::pagination::Pagination;
use super::route::{Route, RouteFilter, RouteId};
use crate::error::GraphResult;

/// Entry point to the persisted graph
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait WaypointStore: Send + Sync {
    /// Open a transaction
    async fn begin(&self) -> GraphResult<Box<dyn WaypointTransaction>>;

    /// List committed nodes matching `filter`, returning one page and the total
    async fn list_nodes(
        &self,
        filter: &NodeFilter,
        pagination: &Pagination,
    ) -> GraphResult<(Vec<Node>, u64)>;

    /// List committed routes matching `filter`, returning one page and the total
    async fn list_routes(
        &self,
        filter: &RouteFilter,
        pagination: &Pagination,
    ) -> GraphResult<(Vec<Route>, u64)>;

    /// List committed maps matching `filter`, returning one page and the total
    async fn list_maps(
        &self,
        filter: &MapFilter,
        pagination: &Pagination,
    ) -> GraphResult<(Vec<MapRecord>, u64)>;
}

/// A unit of work against the store.
///
/// Reads observe the committed state plus this transaction's own writes.
#[async_trait]
pub trait WaypointTransaction: Send {
    /// Find a map by id
    async fn map_by_id(&mut self, id: &ScopeId) -> GraphResult<Option<MapRecord>>;

    /// Find a map by its unique name
    async fn map_by_name(&mut self, name: &str) -> GraphResult<Option<MapRecord>>;

    /// Insert a new map
    async fn create_map(&mut self, map: MapRecord) -> GraphResult<()>;

    /// Update an existing map
    async fn save_map(&mut self, map: &MapRecord) -> GraphResult<()>;

    /// Delete a map together with every node and route it scopes
    async fn delete_map(&mut self, id: &ScopeId) -> GraphResult<Option<MapRecord>>;

    /// Find a node by id
    async fn node_by_id(&mut self, id: &NodeId) -> GraphResult<Option<Node>>;

    /// Find a node by name within a scope
    async fn node_by_name(&mut self, scope: &ScopeId, name: &str) -> GraphResult<Option<Node>>;

    /// Every node matching `filter`, in insertion order
    async fn find_nodes(&mut self, filter: &NodeFilter) -> GraphResult<Vec<Node>>;

    /// Insert a node; a `(scope, name)` collision is `AlreadyExists`
    async fn create_node(&mut self, node: Node) -> GraphResult<()>;

    /// Insert several nodes in order
    async fn batch_create_nodes(&mut self, nodes: Vec<Node>) -> GraphResult<()> {
        for node in nodes {
            self.create_node(node).await?;
        }
        Ok(())
    }

    /// Update an existing node by id
    async fn save_node(&mut self, node: &Node) -> GraphResult<()>;

    /// Delete every node matching `filter`, returning what was removed
    async fn delete_nodes(&mut self, filter: &NodeFilter) -> GraphResult<Vec<Node>>;

    /// Find a route by id
    async fn route_by_id(&mut self, id: &RouteId) -> GraphResult<Option<Route>>;

    /// Find a route by name within a scope
    async fn route_by_name(&mut self, scope: &ScopeId, name: &str) -> GraphResult<Option<Route>>;

    /// Every route matching `filter`, in insertion order
    async fn find_routes(&mut self, filter: &RouteFilter) -> GraphResult<Vec<Route>>;

    /// Insert a route; a `(scope, name)` collision is `AlreadyExists`
    async fn create_route(&mut self, route: Route) -> GraphResult<()>;

    /// Insert several routes in order
    async fn batch_create_routes(&mut self, routes: Vec<Route>) -> GraphResult<()> {
        for route in routes {
            self.create_route(route).await?;
        }
        Ok(())
    }

    /// Update an existing route by id
    async fn save_route(&mut self, route: &Route) -> GraphResult<()>;

    /// Delete every route matching `filter`, returning what was removed
    async fn delete_routes(&mut self, filter: &RouteFilter) -> GraphResult<Vec<Route>>;

    /// Make every write of this transaction visible
    async fn commit(self: Box<Self>) -> GraphResult<()>;

    /// Discard every write of this transaction
    async fn rollback(self: Box<Self>) -> GraphResult<()>;
}

/// Resolves a scope to the map that owns its raster
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MapMetadataProvider: Send + Sync {
    /// Map record for `scope`, if registered
    async fn map_for_scope(&self, scope: &ScopeId) -> GraphResult<Option<MapRecord>>;
}

/// Finish `tx` according to `result`: commit on success, roll back on error.
///
/// A rollback failure is logged and the original error is returned.
pub async fn finish<T>(
    tx: Box<dyn WaypointTransaction>,
    result: GraphResult<T>,
) -> GraphResult<T> {
    match result {
        Ok(value) => {
            tx.commit().await?;
            Ok(value)
        }
        Err(err) => {
            if let Err(rollback_err) = tx.rollback().await {
                tracing::warn!(error = %rollback_err, "Rollback failed after error: {}", err);
            }
            Err(err)
        }
    }
}
