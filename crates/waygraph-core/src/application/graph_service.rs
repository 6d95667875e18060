use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info};

use crate::application::naming::NodeNamer;
use crate::application::topology::{
    dedup_adjacent, endpoint_nodes_to_delete, ensure_endpoints_exist, node_bypass_pairs,
    route_bypass_pairs, split_origin_routes_to_delete, split_routes_through, RoutePlan,
};
use crate::config::GraphConfig;
use crate::domain::map::{MapRecord, ScopeId};
use crate::domain::node::{Node, NodeFilter, NodeId, NodeIndex};
use crate::domain::pagination::Pagination;
use crate::domain::repository::{finish, WaypointStore, WaypointTransaction};
use crate::domain::requests::{NodeRequest, RouteRequest};
use crate::domain::route::{referenced_node_names, Route, RouteFilter, RouteId};
use crate::error::{GraphError, GraphResult};

/// Nodes and routes written by [`WaypointGraphService::insert_or_update_route_set`]
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct RouteSetOutcome {
    /// Every processed node, in payload order, at its final position
    pub nodes: Vec<Node>,
    /// Updated routes followed by newly created ones
    pub routes: Vec<Route>,
}

#[derive(Debug)]
struct ProcessedNode {
    node: Node,
    is_new: bool,
}

/// Service for mutating the waypoint graph of a scope.
///
/// Every public operation runs in one transaction and either commits all of
/// its writes or none of them.
pub struct WaypointGraphService {
    /// Backing store
    store: Arc<dyn WaypointStore>,

    /// Engine settings
    config: GraphConfig,
}

async fn require_scope(
    tx: &mut dyn WaypointTransaction,
    scope: &ScopeId,
) -> GraphResult<MapRecord> {
    tx.map_by_id(scope)
        .await?
        .ok_or_else(|| GraphError::not_found("map", scope))
}

fn ensure_node_name(name: &str) -> GraphResult<()> {
    if name.is_empty() {
        return Err(GraphError::InvalidInput(
            "node name must not be empty".to_string(),
        ));
    }
    Ok(())
}

impl WaypointGraphService {
    /// Create a new graph service
    pub fn new(store: Arc<dyn WaypointStore>, config: GraphConfig) -> Self {
        Self { store, config }
    }

    /// Settings in use
    pub fn config(&self) -> &GraphConfig {
        &self.config
    }

    fn namer<'a>(&self, names: impl IntoIterator<Item = &'a str>) -> NodeNamer {
        NodeNamer::from_existing(self.config.node_prefix.as_str(), self.config.node_digits, names)
    }

    /// Create a node, or edit one when `request.id` is set.
    ///
    /// The node snaps onto every route of the scope it lies close to and the
    /// two halves of each such route are created.
    pub async fn insert_or_update_node(
        &self,
        scope: &ScopeId,
        request: NodeRequest,
    ) -> GraphResult<Node> {
        let mut tx = self.store.begin().await?;
        let result = self.insert_node_in(tx.as_mut(), scope, request).await;
        finish(tx, result).await
    }

    async fn insert_node_in(
        &self,
        tx: &mut dyn WaypointTransaction,
        scope: &ScopeId,
        request: NodeRequest,
    ) -> GraphResult<Node> {
        require_scope(tx, scope).await?;
        let now = Utc::now();
        let nodes = tx.find_nodes(&NodeFilter::in_scope(scope)).await?;
        let routes = tx.find_routes(&RouteFilter::in_scope(scope)).await?;

        let (mut node, is_new) = match request.id {
            Some(id) => {
                let mut node = nodes
                    .iter()
                    .find(|node| node.id == id)
                    .cloned()
                    .ok_or_else(|| GraphError::not_found("node", id))?;
                request.apply_to(&mut node, now);
                (node, false)
            }
            None => {
                let name = match &request.name {
                    Some(name) => {
                        ensure_node_name(name)?;
                        if nodes.iter().any(|node| node.name == *name) {
                            return Err(GraphError::already_exists("node", name, scope));
                        }
                        name.clone()
                    }
                    None => self
                        .namer(nodes.iter().map(|node| node.name.as_str()))
                        .next_name(),
                };
                (request.to_new_node(scope, name, now), true)
            }
        };

        let index = NodeIndex::new(nodes);
        let mut plan = RoutePlan::new(
            scope,
            self.config.direction_label.as_str(),
            routes.iter().map(|route| route.name.as_str()),
        );
        let outcome = split_routes_through(
            &node.name,
            node.position,
            &routes,
            &index,
            self.config.split_threshold,
            &mut plan,
            now,
        )?;
        node.position = outcome.position;

        let staged = plan.into_routes();
        let staged_count = staged.len();
        if !staged.is_empty() {
            tx.batch_create_routes(staged).await?;
        }

        let dropped =
            split_origin_routes_to_delete(&outcome.split_routes, self.config.retain_split_origin_routes);
        if !dropped.is_empty() {
            tx.delete_routes(&RouteFilter::in_scope(scope).with_ids(dropped))
                .await?;
        }

        if is_new {
            tx.create_node(node.clone()).await?;
        } else {
            tx.save_node(&node).await?;
        }

        info!(
            scope = %scope,
            node = %node.name,
            created = is_new,
            splits = outcome.split_routes.len(),
            routes_created = staged_count,
            "Node stored"
        );

        Ok(node)
    }

    /// List committed nodes
    pub async fn list_nodes(
        &self,
        filter: &NodeFilter,
        pagination: &Pagination,
    ) -> GraphResult<(Vec<Node>, u64)> {
        pagination.validate()?;
        self.store.list_nodes(filter, pagination).await
    }

    /// Delete a node and its routes, reconnecting its neighbours.
    ///
    /// Every incoming `X -> n` and outgoing `n -> Y` produce a bypass `X -> Y`.
    pub async fn delete_node(&self, scope: &ScopeId, id: NodeId) -> GraphResult<Node> {
        let mut tx = self.store.begin().await?;
        let result = self.delete_node_in(tx.as_mut(), scope, id).await;
        finish(tx, result).await
    }

    async fn delete_node_in(
        &self,
        tx: &mut dyn WaypointTransaction,
        scope: &ScopeId,
        id: NodeId,
    ) -> GraphResult<Node> {
        require_scope(tx, scope).await?;
        let node = tx
            .node_by_id(&id)
            .await?
            .filter(|node| node.scope == *scope)
            .ok_or_else(|| GraphError::not_found("node", id))?;

        tx.delete_nodes(&NodeFilter::in_scope(scope).with_ids(vec![id]))
            .await?;
        let removed = tx
            .delete_routes(&RouteFilter::in_scope(scope).touching(vec![node.name.clone()]))
            .await?;

        let remaining = tx.find_routes(&RouteFilter::in_scope(scope)).await?;
        let mut plan = RoutePlan::new(
            scope,
            self.config.direction_label.as_str(),
            remaining.iter().map(|route| route.name.as_str()),
        );
        let now = Utc::now();
        for (from, to) in node_bypass_pairs(&node.name, &removed) {
            if plan.stage(&from, &to, now) {
                debug!(scope = %scope, from = %from, to = %to, "Staged bypass route");
            }
        }

        let bypasses = plan.into_routes();
        let bypass_count = bypasses.len();
        if !bypasses.is_empty() {
            tx.batch_create_routes(bypasses).await?;
        }

        info!(
            scope = %scope,
            node = %node.name,
            routes_removed = removed.len(),
            bypasses = bypass_count,
            "Node deleted"
        );

        Ok(node)
    }

    /// Create or edit a batch of nodes and the routes between them.
    ///
    /// Without `routes` the nodes are chained in payload order. The whole
    /// batch goes through split detection before anything is written.
    pub async fn insert_or_update_route_set(
        &self,
        scope: &ScopeId,
        nodes: Vec<NodeRequest>,
        routes: Option<Vec<RouteRequest>>,
    ) -> GraphResult<RouteSetOutcome> {
        let mut tx = self.store.begin().await?;
        let result = self.route_set_in(tx.as_mut(), scope, nodes, routes).await;
        finish(tx, result).await
    }

    async fn route_set_in(
        &self,
        tx: &mut dyn WaypointTransaction,
        scope: &ScopeId,
        requests: Vec<NodeRequest>,
        route_requests: Option<Vec<RouteRequest>>,
    ) -> GraphResult<RouteSetOutcome> {
        require_scope(tx, scope).await?;
        let now = Utc::now();
        let existing_nodes = tx.find_nodes(&NodeFilter::in_scope(scope)).await?;
        let existing_routes = tx.find_routes(&RouteFilter::in_scope(scope)).await?;

        let mut namer = self.namer(existing_nodes.iter().map(|node| node.name.as_str()));
        let by_id: HashMap<NodeId, Node> = existing_nodes
            .iter()
            .map(|node| (node.id, node.clone()))
            .collect();
        let mut index = NodeIndex::new(existing_nodes);

        let mut processed: Vec<ProcessedNode> = Vec::new();
        for request in dedup_adjacent(requests, |request| request.position) {
            let entry = match request.id {
                Some(id) => {
                    let mut node = by_id
                        .get(&id)
                        .cloned()
                        .ok_or_else(|| GraphError::not_found("node", id))?;
                    request.apply_to(&mut node, now);
                    ProcessedNode {
                        node,
                        is_new: false,
                    }
                }
                None => {
                    let name = match &request.name {
                        Some(name) => {
                            ensure_node_name(name)?;
                            if index.contains(name) {
                                return Err(GraphError::already_exists("node", name, scope));
                            }
                            namer.observe(name);
                            name.clone()
                        }
                        None => namer.next_name(),
                    };
                    ProcessedNode {
                        node: request.to_new_node(scope, name, now),
                        is_new: true,
                    }
                }
            };
            index.insert(entry.node.clone());
            processed.push(entry);
        }

        let label = self.config.direction_label.as_str();
        let mut plan = RoutePlan::new(
            scope,
            label,
            existing_routes.iter().map(|route| route.name.as_str()),
        );
        let mut route_updates: Vec<Route> = Vec::new();

        match route_requests {
            None => {
                for pair in processed.windows(2) {
                    plan.stage(&pair[0].node.name, &pair[1].node.name, now);
                }
            }
            Some(route_requests) => {
                for request in route_requests {
                    ensure_endpoints_exist(&request, &index)?;
                    let name = request.name();
                    match request.id {
                        Some(id) => {
                            let mut route = existing_routes
                                .iter()
                                .find(|route| route.id == id)
                                .cloned()
                                .ok_or_else(|| GraphError::not_found("route", id))?;
                            if name != route.name && plan.contains(&name) {
                                return Err(GraphError::already_exists("route", name, scope));
                            }
                            request.apply_to(&mut route, label, now);
                            plan.reserve(name);
                            route_updates.push(route);
                        }
                        None => {
                            if !plan.stage_request(&request, now) {
                                return Err(GraphError::already_exists("route", name, scope));
                            }
                        }
                    }
                }
            }
        }

        // Split detection over everything known so far, updates taking precedence
        let mut split_origins: Vec<RouteId> = Vec::new();
        for entry in processed.iter_mut() {
            let known: Vec<Route> = existing_routes
                .iter()
                .map(|route| {
                    route_updates
                        .iter()
                        .find(|update| update.id == route.id)
                        .unwrap_or(route)
                        .clone()
                })
                .chain(plan.staged().iter().cloned())
                .collect();

            let outcome = split_routes_through(
                &entry.node.name,
                entry.node.position,
                &known,
                &index,
                self.config.split_threshold,
                &mut plan,
                now,
            )?;
            if outcome.position != entry.node.position {
                entry.node.position = outcome.position;
                index.insert(entry.node.clone());
            }
            split_origins.extend(outcome.split_routes);
        }

        let dropped =
            split_origin_routes_to_delete(&split_origins, self.config.retain_split_origin_routes);
        plan.discard(&dropped);
        route_updates.retain(|route| !dropped.contains(&route.id));

        let (updated, created): (Vec<&ProcessedNode>, Vec<&ProcessedNode>) =
            processed.iter().partition(|entry| !entry.is_new);
        for entry in &updated {
            tx.save_node(&entry.node).await?;
        }
        if !created.is_empty() {
            tx.batch_create_nodes(created.iter().map(|entry| entry.node.clone()).collect())
                .await?;
        }
        for route in &route_updates {
            tx.save_route(route).await?;
        }
        if !dropped.is_empty() {
            tx.delete_routes(&RouteFilter::in_scope(scope).with_ids(dropped))
                .await?;
        }
        let new_routes = plan.into_routes();
        if !new_routes.is_empty() {
            tx.batch_create_routes(new_routes.clone()).await?;
        }

        info!(
            scope = %scope,
            nodes_updated = updated.len(),
            nodes_created = created.len(),
            routes_updated = route_updates.len(),
            routes_created = new_routes.len(),
            "Route set stored"
        );

        let mut routes = route_updates;
        routes.extend(new_routes);
        Ok(RouteSetOutcome {
            nodes: processed.into_iter().map(|entry| entry.node).collect(),
            routes,
        })
    }

    /// List committed routes
    pub async fn list_routes(
        &self,
        filter: &RouteFilter,
        pagination: &Pagination,
    ) -> GraphResult<(Vec<Route>, u64)> {
        pagination.validate()?;
        self.store.list_routes(filter, pagination).await
    }

    /// Delete a route, clean up its endpoints and bypass its end node.
    ///
    /// Endpoint cleanup only looks at the routes left after the deletion and
    /// follows [`GraphConfig::end_node_cleanup`]. Then, for every remaining
    /// route `end -> Y`, a route `start -> Y` is created.
    pub async fn delete_route(&self, scope: &ScopeId, id: RouteId) -> GraphResult<Route> {
        let mut tx = self.store.begin().await?;
        let result = self.delete_route_in(tx.as_mut(), scope, id).await;
        finish(tx, result).await
    }

    async fn delete_route_in(
        &self,
        tx: &mut dyn WaypointTransaction,
        scope: &ScopeId,
        id: RouteId,
    ) -> GraphResult<Route> {
        require_scope(tx, scope).await?;
        let route = tx
            .route_by_id(&id)
            .await?
            .filter(|route| route.scope == *scope)
            .ok_or_else(|| GraphError::not_found("route", id))?;

        tx.delete_routes(&RouteFilter::in_scope(scope).with_ids(vec![id]))
            .await?;
        let remaining = tx.find_routes(&RouteFilter::in_scope(scope)).await?;

        let referenced = referenced_node_names(remaining.iter());
        let orphaned = endpoint_nodes_to_delete(&route, &referenced, self.config.end_node_cleanup);
        let orphan_count = if orphaned.is_empty() {
            0
        } else {
            tx.delete_nodes(&NodeFilter::in_scope(scope).with_names(orphaned))
                .await?
                .len()
        };

        let mut plan = RoutePlan::new(
            scope,
            self.config.direction_label.as_str(),
            remaining.iter().map(|route| route.name.as_str()),
        );
        let now = Utc::now();
        for (from, to) in route_bypass_pairs(&route, &remaining) {
            if plan.stage(&from, &to, now) {
                debug!(scope = %scope, from = %from, to = %to, "Staged bypass route");
            }
        }

        let bypasses = plan.into_routes();
        let bypass_count = bypasses.len();
        if !bypasses.is_empty() {
            tx.batch_create_routes(bypasses).await?;
        }

        info!(
            scope = %scope,
            route = %route.name,
            nodes_removed = orphan_count,
            bypasses = bypass_count,
            "Route deleted"
        );

        Ok(route)
    }

    /// Delete several nodes and every route touching them, without bypasses
    pub async fn batch_delete_nodes(
        &self,
        scope: &ScopeId,
        ids: Vec<NodeId>,
    ) -> GraphResult<Vec<Node>> {
        if ids.is_empty() {
            return Err(GraphError::InvalidInput(
                "no node ids given for batch delete".to_string(),
            ));
        }

        let mut tx = self.store.begin().await?;
        let result = Self::batch_delete_in(tx.as_mut(), scope, ids).await;
        finish(tx, result).await
    }

    async fn batch_delete_in(
        tx: &mut dyn WaypointTransaction,
        scope: &ScopeId,
        ids: Vec<NodeId>,
    ) -> GraphResult<Vec<Node>> {
        require_scope(tx, scope).await?;
        let key = ids
            .iter()
            .map(NodeId::to_string)
            .collect::<Vec<_>>()
            .join(",");

        let deleted = tx
            .delete_nodes(&NodeFilter::in_scope(scope).with_ids(ids))
            .await?;
        if deleted.is_empty() {
            return Err(GraphError::not_found("node", key));
        }

        let names = deleted.iter().map(|node| node.name.clone()).collect();
        let routes = tx
            .delete_routes(&RouteFilter::in_scope(scope).touching(names))
            .await?;

        info!(
            scope = %scope,
            nodes_removed = deleted.len(),
            routes_removed = routes.len(),
            "Nodes batch deleted"
        );

        Ok(deleted)
    }
}
