//! Snapshot of the stored graph and the mutations a transaction records.

use waygraph_core::{
    domain::{
        map::{MapFilter, MapRecord, ScopeId},
        node::{Node, NodeFilter},
        route::{Route, RouteFilter},
    },
    GraphError, GraphResult,
};

/// Everything the store holds, in insertion order
#[derive(Debug, Clone, Default)]
pub struct GraphState {
    /// Registered maps
    pub maps: Vec<MapRecord>,
    /// Nodes of every scope
    pub nodes: Vec<Node>,
    /// Routes of every scope
    pub routes: Vec<Route>,
}

/// One recorded write, replayed onto the committed state at commit
#[derive(Debug, Clone)]
pub enum Mutation {
    /// Insert a map
    CreateMap(MapRecord),
    /// Replace a map by id
    SaveMap(MapRecord),
    /// Remove a map and its graph
    DeleteMap(ScopeId),
    /// Insert a node
    CreateNode(Node),
    /// Replace a node by id
    SaveNode(Node),
    /// Remove matching nodes
    DeleteNodes(NodeFilter),
    /// Insert a route
    CreateRoute(Route),
    /// Replace a route by id
    SaveRoute(Route),
    /// Remove matching routes
    DeleteRoutes(RouteFilter),
}

fn drain_matching<T>(items: &mut Vec<T>, matches: impl Fn(&T) -> bool) -> Vec<T> {
    let (removed, kept) = std::mem::take(items).into_iter().partition(|item| matches(item));
    *items = kept;
    removed
}

impl GraphState {
    /// Maps matching `filter`
    pub fn maps_matching(&self, filter: &MapFilter) -> Vec<MapRecord> {
        self.maps.iter().filter(|m| filter.matches(m)).cloned().collect()
    }

    /// Nodes matching `filter`
    pub fn nodes_matching(&self, filter: &NodeFilter) -> Vec<Node> {
        self.nodes.iter().filter(|n| filter.matches(n)).cloned().collect()
    }

    /// Routes matching `filter`
    pub fn routes_matching(&self, filter: &RouteFilter) -> Vec<Route> {
        self.routes.iter().filter(|r| filter.matches(r)).cloned().collect()
    }

    fn ensure_unique_map_name(&self, map: &MapRecord) -> GraphResult<()> {
        if self.maps.iter().any(|m| m.name == map.name && m.id != map.id) {
            return Err(GraphError::already_exists("map", &map.name, &map.id));
        }
        Ok(())
    }

    fn ensure_unique_node_name(&self, node: &Node) -> GraphResult<()> {
        if self
            .nodes
            .iter()
            .any(|n| n.scope == node.scope && n.name == node.name && n.id != node.id)
        {
            return Err(GraphError::already_exists("node", &node.name, &node.scope));
        }
        Ok(())
    }

    fn ensure_unique_route_name(&self, route: &Route) -> GraphResult<()> {
        if self
            .routes
            .iter()
            .any(|r| r.scope == route.scope && r.name == route.name && r.id != route.id)
        {
            return Err(GraphError::already_exists("route", &route.name, &route.scope));
        }
        Ok(())
    }

    /// Apply one mutation, enforcing name uniqueness per scope.
    ///
    /// Returns the records a delete removed.
    pub fn apply(&mut self, mutation: &Mutation) -> GraphResult<Removed> {
        match mutation {
            Mutation::CreateMap(map) => {
                self.ensure_unique_map_name(map)?;
                self.maps.push(map.clone());
            }
            Mutation::SaveMap(map) => {
                self.ensure_unique_map_name(map)?;
                let slot = self
                    .maps
                    .iter_mut()
                    .find(|m| m.id == map.id)
                    .ok_or_else(|| GraphError::not_found("map", &map.id))?;
                *slot = map.clone();
            }
            Mutation::DeleteMap(id) => {
                let maps = drain_matching(&mut self.maps, |m| m.id == *id);
                let nodes = drain_matching(&mut self.nodes, |n| n.scope == *id);
                let routes = drain_matching(&mut self.routes, |r| r.scope == *id);
                return Ok(Removed {
                    maps,
                    nodes,
                    routes,
                });
            }
            Mutation::CreateNode(node) => {
                self.ensure_unique_node_name(node)?;
                self.nodes.push(node.clone());
            }
            Mutation::SaveNode(node) => {
                self.ensure_unique_node_name(node)?;
                let slot = self
                    .nodes
                    .iter_mut()
                    .find(|n| n.id == node.id)
                    .ok_or_else(|| GraphError::not_found("node", node.id))?;
                *slot = node.clone();
            }
            Mutation::DeleteNodes(filter) => {
                let nodes = drain_matching(&mut self.nodes, |n| filter.matches(n));
                return Ok(Removed {
                    nodes,
                    ..Removed::default()
                });
            }
            Mutation::CreateRoute(route) => {
                self.ensure_unique_route_name(route)?;
                self.routes.push(route.clone());
            }
            Mutation::SaveRoute(route) => {
                self.ensure_unique_route_name(route)?;
                let slot = self
                    .routes
                    .iter_mut()
                    .find(|r| r.id == route.id)
                    .ok_or_else(|| GraphError::not_found("route", route.id))?;
                *slot = route.clone();
            }
            Mutation::DeleteRoutes(filter) => {
                let routes = drain_matching(&mut self.routes, |r| filter.matches(r));
                return Ok(Removed {
                    routes,
                    ..Removed::default()
                });
            }
        }
        Ok(Removed::default())
    }
}

/// Records removed by a delete mutation
#[derive(Debug, Clone, Default)]
pub struct Removed {
    /// Removed maps
    pub maps: Vec<MapRecord>,
    /// Removed nodes
    pub nodes: Vec<Node>,
    /// Removed routes
    pub routes: Vec<Route>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use std::path::PathBuf;
    use waygraph_core::{NodeRequest, RouteRequest};

    fn map(name: &str) -> MapRecord {
        let now = Utc::now();
        MapRecord {
            id: ScopeId::new(),
            name: name.to_string(),
            image_path: PathBuf::from("floor.png"),
            width: 10,
            height: 10,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_node_names_are_unique_per_scope() {
        let mut state = GraphState::default();
        let first = ScopeId::new();
        let second = ScopeId::new();
        let now = Utc::now();

        let node = NodeRequest::at(0.0, 0.0).to_new_node(&first, "Site0001".to_string(), now);
        state.apply(&Mutation::CreateNode(node)).unwrap();

        let clash = NodeRequest::at(1.0, 1.0).to_new_node(&first, "Site0001".to_string(), now);
        let err = state.apply(&Mutation::CreateNode(clash)).unwrap_err();
        assert!(matches!(err, GraphError::AlreadyExists { entity: "node", .. }));

        let elsewhere = NodeRequest::at(1.0, 1.0).to_new_node(&second, "Site0001".to_string(), now);
        state.apply(&Mutation::CreateNode(elsewhere)).unwrap();
        assert_eq!(state.nodes.len(), 2);
    }

    #[test]
    fn test_save_missing_route_is_not_found() {
        let mut state = GraphState::default();
        let route = RouteRequest::between("A", "B").to_new_route(&ScopeId::new(), "forward", Utc::now());
        let err = state.apply(&Mutation::SaveRoute(route)).unwrap_err();
        assert!(matches!(err, GraphError::NotFound { entity: "route", .. }));
    }

    #[test]
    fn test_delete_map_cascades() {
        let mut state = GraphState::default();
        let kept = map("kept");
        let doomed = map("doomed");
        let now = Utc::now();

        for m in [&kept, &doomed] {
            state.apply(&Mutation::CreateMap(m.clone())).unwrap();
            let node = NodeRequest::at(0.0, 0.0).to_new_node(&m.id, "A".to_string(), now);
            state.apply(&Mutation::CreateNode(node)).unwrap();
            let route = RouteRequest::between("A", "B").to_new_route(&m.id, "forward", now);
            state.apply(&Mutation::CreateRoute(route)).unwrap();
        }

        let removed = state.apply(&Mutation::DeleteMap(doomed.id.clone())).unwrap();
        assert_eq!(removed.maps.len(), 1);
        assert_eq!(removed.nodes.len(), 1);
        assert_eq!(removed.routes.len(), 1);
        assert_eq!(state.maps, vec![kept.clone()]);
        assert!(state.nodes.iter().all(|n| n.scope == kept.id));
        assert!(state.routes.iter().all(|r| r.scope == kept.id));
    }

    #[test]
    fn test_map_names_are_unique() {
        let mut state = GraphState::default();
        state.apply(&Mutation::CreateMap(map("floor"))).unwrap();
        assert!(state.apply(&Mutation::CreateMap(map("floor"))).is_err());
    }
}
