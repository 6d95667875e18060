//! Planning helpers for graph mutations.
//!
//! Everything here is pure: the engine loads the scope, plans with these
//! helpers, then writes the plan through one transaction.

use chrono::{DateTime, Utc};
use std::collections::HashSet;
use tracing::{debug, warn};

use crate::config::EndNodeCleanup;
use crate::domain::map::ScopeId;
use crate::domain::node::NodeIndex;
use crate::domain::requests::RouteRequest;
use crate::domain::route::{route_name, Route, RouteId};
use crate::error::{GraphError, GraphResult};
use crate::geometry::{point_within_split_threshold, Point};

/// New routes staged during one operation.
///
/// A route is staged at most once and never when its name is already
/// persisted in the scope.
#[derive(Debug, Clone)]
pub struct RoutePlan {
    scope: ScopeId,
    label: String,
    known: HashSet<String>,
    staged: Vec<Route>,
}

impl RoutePlan {
    /// Plan against the route names already persisted in `scope`
    pub fn new<'a>(
        scope: &ScopeId,
        label: impl Into<String>,
        existing: impl IntoIterator<Item = &'a str>,
    ) -> Self {
        Self {
            scope: scope.clone(),
            label: label.into(),
            known: existing.into_iter().map(str::to_string).collect(),
            staged: Vec::new(),
        }
    }

    /// Whether `name` is persisted or already staged
    pub fn contains(&self, name: &str) -> bool {
        self.known.contains(name)
    }

    /// Mark a name as taken without staging a route for it
    pub fn reserve(&mut self, name: impl Into<String>) {
        self.known.insert(name.into());
    }

    /// Stage a bidirectional route `start -> end` with the default labels.
    ///
    /// Self-loops and known names are skipped. Returns whether a route was staged.
    pub fn stage(&mut self, start: &str, end: &str, now: DateTime<Utc>) -> bool {
        if start == end {
            return false;
        }
        let request = RouteRequest::between(start, end);
        self.stage_request(&request, now)
    }

    /// Stage a route built from `request`, unless its name is known
    pub fn stage_request(&mut self, request: &RouteRequest, now: DateTime<Utc>) -> bool {
        let name = request.name();
        if self.known.contains(&name) {
            return false;
        }
        self.known.insert(name);
        self.staged
            .push(request.to_new_route(&self.scope, &self.label, now));
        true
    }

    /// Drop staged routes by id and release their names
    pub fn discard(&mut self, ids: &[RouteId]) {
        let known = &mut self.known;
        self.staged.retain(|route| {
            if ids.contains(&route.id) {
                known.remove(&route.name);
                false
            } else {
                true
            }
        });
    }

    /// Routes staged so far
    pub fn staged(&self) -> &[Route] {
        &self.staged
    }

    /// Take the staged routes
    pub fn into_routes(self) -> Vec<Route> {
        self.staged
    }
}

/// Result of running split detection for one node
#[derive(Debug, Clone, PartialEq)]
pub struct SplitOutcome {
    /// Final position after every snap
    pub position: Point,
    /// Routes the node was found to lie on
    pub split_routes: Vec<RouteId>,
}

/// Snap `position` onto every route it lies close to and stage the two halves.
///
/// Routes incident to `node_name` are ignored. Routes are visited in order and
/// each snap moves the position used for the following routes. Routes whose
/// endpoints cannot be resolved, or whose endpoints coincide, are skipped.
pub fn split_routes_through(
    node_name: &str,
    position: Point,
    routes: &[Route],
    nodes: &NodeIndex,
    threshold: f64,
    plan: &mut RoutePlan,
    now: DateTime<Utc>,
) -> GraphResult<SplitOutcome> {
    let mut position = position;
    let mut split_routes = Vec::new();

    for route in routes.iter().filter(|route| !route.touches(node_name)) {
        let (Some(a), Some(b)) = (nodes.position(&route.start), nodes.position(&route.end)) else {
            warn!(route = %route.name, "Skipping route with unresolved endpoint");
            continue;
        };
        if a == b {
            warn!(route = %route.name, "Skipping degenerate route");
            continue;
        }

        if let Some(snapped) = point_within_split_threshold(position, a, b, threshold)? {
            debug!(
                node = %node_name,
                route = %route.name,
                from = %position,
                to = %snapped,
                "Node splits route"
            );
            position = snapped;
            plan.stage(&route.start, node_name, now);
            plan.stage(node_name, &route.end, now);
            split_routes.push(route.id);
        }
    }

    Ok(SplitOutcome {
        position,
        split_routes,
    })
}

/// Routes to delete after a split.
///
/// With retention on (the default), the split route stays in place next to
/// its two halves and nothing is deleted.
pub fn split_origin_routes_to_delete(split_routes: &[RouteId], retain: bool) -> Vec<RouteId> {
    if retain {
        Vec::new()
    } else {
        split_routes.to_vec()
    }
}

/// Bypass pairs `(X, Y)` for removing `node_name`: every incoming `X -> n`
/// crossed with every outgoing `n -> Y`, skipping pairs that would loop.
pub fn node_bypass_pairs(node_name: &str, routes: &[Route]) -> Vec<(String, String)> {
    let incoming: Vec<&str> = routes
        .iter()
        .filter(|route| route.end == node_name && route.start != node_name)
        .map(|route| route.start.as_str())
        .collect();
    let outgoing: Vec<&str> = routes
        .iter()
        .filter(|route| route.start == node_name && route.end != node_name)
        .map(|route| route.end.as_str())
        .collect();

    let mut pairs = Vec::new();
    for from in &incoming {
        for to in &outgoing {
            if from != to {
                pairs.push((from.to_string(), to.to_string()));
            }
        }
    }
    pairs
}

/// Bypass pairs for removing `deleted`: `start -> Y` for every remaining
/// route `end -> Y`.
pub fn route_bypass_pairs(deleted: &Route, remaining: &[Route]) -> Vec<(String, String)> {
    remaining
        .iter()
        .filter(|route| route.start == deleted.end)
        .filter(|route| route.end != deleted.start && route.end != deleted.end)
        .map(|route| (deleted.start.clone(), route.end.clone()))
        .collect()
}

/// Endpoint node names to delete along with `deleted`.
///
/// The start node goes when nothing in `referenced` names it. The end node
/// follows `policy`: always removed under [`EndNodeCleanup::Unconditional`].
pub fn endpoint_nodes_to_delete(
    deleted: &Route,
    referenced: &HashSet<String>,
    policy: EndNodeCleanup,
) -> Vec<String> {
    let mut names = Vec::new();
    if !referenced.contains(&deleted.start) {
        names.push(deleted.start.clone());
    }

    let drop_end = match policy {
        EndNodeCleanup::Unconditional => true,
        EndNodeCleanup::WhenUnreferenced => !referenced.contains(&deleted.end),
    };
    if drop_end && deleted.end != deleted.start {
        names.push(deleted.end.clone());
    }
    names
}

/// Collapse consecutive positions that are exactly equal
pub fn dedup_adjacent<T>(items: Vec<T>, position: impl Fn(&T) -> Point) -> Vec<T> {
    let mut kept: Vec<T> = Vec::with_capacity(items.len());
    for item in items {
        if let Some(last) = kept.last() {
            if position(last) == position(&item) {
                continue;
            }
        }
        kept.push(item);
    }
    kept
}

/// Check both endpoints of `request` are known node names
pub fn ensure_endpoints_exist(request: &RouteRequest, nodes: &NodeIndex) -> GraphResult<()> {
    for endpoint in [&request.start, &request.end] {
        if !nodes.contains(endpoint) {
            return Err(GraphError::not_found("node", endpoint));
        }
    }
    if request.start == request.end {
        return Err(GraphError::InvalidInput(format!(
            "route {} starts and ends at the same node",
            route_name(&request.start, &request.end)
        )));
    }
    Ok(())
}
