//! In-memory waypoint store for the waygraph engine
//!
//! This crate implements the repository interfaces defined in waygraph-core
//! on top of a shared in-process snapshot. It is useful for development,
//! testing, and single-process tools where persistence is not required.

use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;

use waygraph_core::{
    domain::{
        map::{MapFilter, MapRecord, ScopeId},
        node::{Node, NodeFilter},
        pagination::Pagination,
        repository::{MapMetadataProvider, WaypointStore, WaypointTransaction},
        route::{Route, RouteFilter},
    },
    GraphResult,
};

pub mod faults;
pub mod state;
pub mod transaction;

pub use faults::FaultInjector;
pub use state::GraphState;
pub use transaction::InMemoryTransaction;

/// Waypoint store kept in process memory
#[derive(Clone, Default)]
pub struct InMemoryWaypointStore {
    // Last committed snapshot
    committed: Arc<RwLock<GraphState>>,

    // Failure triggers for tests
    faults: Arc<FaultInjector>,
}

impl InMemoryWaypointStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Failure triggers shared by every transaction of this store
    pub fn faults(&self) -> &FaultInjector {
        &self.faults
    }

    /// Copy of the committed state
    pub async fn snapshot(&self) -> GraphState {
        self.committed.read().await.clone()
    }
}

#[async_trait]
impl WaypointStore for InMemoryWaypointStore {
    async fn begin(&self) -> GraphResult<Box<dyn WaypointTransaction>> {
        let snapshot = self.committed.read().await.clone();
        Ok(Box::new(InMemoryTransaction::new(
            Arc::clone(&self.committed),
            snapshot,
            Arc::clone(&self.faults),
        )))
    }

    async fn list_nodes(
        &self,
        filter: &NodeFilter,
        pagination: &Pagination,
    ) -> GraphResult<(Vec<Node>, u64)> {
        let matching = self.committed.read().await.nodes_matching(filter);
        debug!(matching = matching.len(), "Listing nodes");
        pagination.apply(matching)
    }

    async fn list_routes(
        &self,
        filter: &RouteFilter,
        pagination: &Pagination,
    ) -> GraphResult<(Vec<Route>, u64)> {
        let matching = self.committed.read().await.routes_matching(filter);
        debug!(matching = matching.len(), "Listing routes");
        pagination.apply(matching)
    }

    async fn list_maps(
        &self,
        filter: &MapFilter,
        pagination: &Pagination,
    ) -> GraphResult<(Vec<MapRecord>, u64)> {
        let matching = self.committed.read().await.maps_matching(filter);
        pagination.apply(matching)
    }
}

#[async_trait]
impl MapMetadataProvider for InMemoryWaypointStore {
    async fn map_for_scope(&self, scope: &ScopeId) -> GraphResult<Option<MapRecord>> {
        let state = self.committed.read().await;
        Ok(state.maps.iter().find(|m| m.id == *scope).cloned())
    }
}
