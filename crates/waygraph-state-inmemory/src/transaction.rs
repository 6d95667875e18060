use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, warn};
use uuid::Uuid;

use waygraph_core::{
    domain::{
        map::{MapFilter, MapRecord, ScopeId},
        node::{Node, NodeFilter, NodeId},
        repository::WaypointTransaction,
        route::{Route, RouteFilter, RouteId},
    },
    GraphError, GraphResult,
};

use crate::faults::FaultInjector;
use crate::state::{GraphState, Mutation};

/// Transaction over an [`InMemoryWaypointStore`](crate::InMemoryWaypointStore).
///
/// Writes go to a private working copy and a mutation log. Commit replays the
/// log onto the latest committed state under the write lock, so uniqueness
/// is checked again against whatever other transactions committed meanwhile.
pub struct InMemoryTransaction {
    id: Uuid,
    committed: Arc<RwLock<GraphState>>,
    working: GraphState,
    log: Vec<Mutation>,
    faults: Arc<FaultInjector>,
    finished: bool,
}

impl InMemoryTransaction {
    pub(crate) fn new(
        committed: Arc<RwLock<GraphState>>,
        snapshot: GraphState,
        faults: Arc<FaultInjector>,
    ) -> Self {
        let id = Uuid::new_v4();
        debug!(tx = %id, "Transaction started");
        Self {
            id,
            committed,
            working: snapshot,
            log: Vec::new(),
            faults,
            finished: false,
        }
    }

    fn record(&mut self, mutation: Mutation) -> GraphResult<crate::state::Removed> {
        let removed = self.working.apply(&mutation)?;
        self.log.push(mutation);
        Ok(removed)
    }
}

#[async_trait]
impl WaypointTransaction for InMemoryTransaction {
    async fn map_by_id(&mut self, id: &ScopeId) -> GraphResult<Option<MapRecord>> {
        Ok(self.working.maps.iter().find(|m| m.id == *id).cloned())
    }

    async fn map_by_name(&mut self, name: &str) -> GraphResult<Option<MapRecord>> {
        let filter = MapFilter {
            name: Some(name.to_string()),
            ..MapFilter::default()
        };
        Ok(self.working.maps_matching(&filter).into_iter().next())
    }

    async fn create_map(&mut self, map: MapRecord) -> GraphResult<()> {
        self.record(Mutation::CreateMap(map)).map(|_| ())
    }

    async fn save_map(&mut self, map: &MapRecord) -> GraphResult<()> {
        self.record(Mutation::SaveMap(map.clone())).map(|_| ())
    }

    async fn delete_map(&mut self, id: &ScopeId) -> GraphResult<Option<MapRecord>> {
        let removed = self.record(Mutation::DeleteMap(id.clone()))?;
        Ok(removed.maps.into_iter().next())
    }

    async fn node_by_id(&mut self, id: &NodeId) -> GraphResult<Option<Node>> {
        Ok(self.working.nodes.iter().find(|n| n.id == *id).cloned())
    }

    async fn node_by_name(&mut self, scope: &ScopeId, name: &str) -> GraphResult<Option<Node>> {
        let filter = NodeFilter::in_scope(scope).with_names(vec![name.to_string()]);
        Ok(self.working.nodes_matching(&filter).into_iter().next())
    }

    async fn find_nodes(&mut self, filter: &NodeFilter) -> GraphResult<Vec<Node>> {
        Ok(self.working.nodes_matching(filter))
    }

    async fn create_node(&mut self, node: Node) -> GraphResult<()> {
        self.record(Mutation::CreateNode(node)).map(|_| ())
    }

    async fn save_node(&mut self, node: &Node) -> GraphResult<()> {
        self.record(Mutation::SaveNode(node.clone())).map(|_| ())
    }

    async fn delete_nodes(&mut self, filter: &NodeFilter) -> GraphResult<Vec<Node>> {
        Ok(self.record(Mutation::DeleteNodes(filter.clone()))?.nodes)
    }

    async fn route_by_id(&mut self, id: &RouteId) -> GraphResult<Option<Route>> {
        Ok(self.working.routes.iter().find(|r| r.id == *id).cloned())
    }

    async fn route_by_name(&mut self, scope: &ScopeId, name: &str) -> GraphResult<Option<Route>> {
        let filter = RouteFilter::in_scope(scope).with_name(name);
        Ok(self.working.routes_matching(&filter).into_iter().next())
    }

    async fn find_routes(&mut self, filter: &RouteFilter) -> GraphResult<Vec<Route>> {
        Ok(self.working.routes_matching(filter))
    }

    async fn create_route(&mut self, route: Route) -> GraphResult<()> {
        if self.faults.trip_route_create() {
            return Err(GraphError::storage(
                "create_route",
                Some(&route.scope),
                format!("injected failure writing {}", route.name),
            ));
        }
        self.record(Mutation::CreateRoute(route)).map(|_| ())
    }

    async fn save_route(&mut self, route: &Route) -> GraphResult<()> {
        self.record(Mutation::SaveRoute(route.clone())).map(|_| ())
    }

    async fn delete_routes(&mut self, filter: &RouteFilter) -> GraphResult<Vec<Route>> {
        Ok(self.record(Mutation::DeleteRoutes(filter.clone()))?.routes)
    }

    async fn commit(mut self: Box<Self>) -> GraphResult<()> {
        self.finished = true;
        if self.faults.trip_commit() {
            return Err(GraphError::storage("commit", None, "injected commit failure"));
        }

        let mut committed = self.committed.write().await;
        let mut next = committed.clone();
        for mutation in &self.log {
            next.apply(mutation)?;
        }
        *committed = next;

        debug!(tx = %self.id, mutations = self.log.len(), "Transaction committed");
        Ok(())
    }

    async fn rollback(mut self: Box<Self>) -> GraphResult<()> {
        self.finished = true;
        debug!(tx = %self.id, mutations = self.log.len(), "Transaction rolled back");
        Ok(())
    }
}

impl Drop for InMemoryTransaction {
    fn drop(&mut self) {
        if !self.finished {
            warn!(
                tx = %self.id,
                mutations = self.log.len(),
                "Transaction dropped without commit, discarding"
            );
        }
    }
}
