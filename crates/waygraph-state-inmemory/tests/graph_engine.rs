mod common;

use chrono::Utc;
use pretty_assertions::assert_eq;

use common::{blank_map, harness, harness_with, strings, Harness};
use waygraph_core::{
    EndNodeCleanup, GraphConfig, GraphError, NodeFilter, NodeId, NodeRequest, OrderBy,
    Pagination, PathRole, Point, RouteFilter, RouteRequest, ScopeId, SortOrder, WaypointStore,
};

/// A(0,0) and B(10,0) joined by A-B
async fn straight_route(h: &Harness) {
    h.graph
        .insert_or_update_route_set(
            &h.scope,
            vec![
                NodeRequest::at(0.0, 0.0).named("A"),
                NodeRequest::at(10.0, 0.0).named("B"),
            ],
            None,
        )
        .await
        .unwrap();
}

/// A(0,0) -> B(10,10) -> C(20,0)
async fn bent_chain(h: &Harness) {
    h.graph
        .insert_or_update_route_set(
            &h.scope,
            vec![
                NodeRequest::at(0.0, 0.0).named("A"),
                NodeRequest::at(10.0, 10.0).named("B"),
                NodeRequest::at(20.0, 0.0).named("C"),
            ],
            None,
        )
        .await
        .unwrap();
}

async fn node_id(h: &Harness, name: &str) -> NodeId {
    let (nodes, _) = h
        .graph
        .list_nodes(
            &NodeFilter::in_scope(&h.scope).with_names(vec![name.to_string()]),
            &Pagination::unpaged(),
        )
        .await
        .unwrap();
    nodes[0].id
}

#[tokio::test]
async fn test_node_splits_route_it_lies_on() {
    let h = harness().await;
    straight_route(&h).await;

    let node = h
        .graph
        .insert_or_update_node(&h.scope, NodeRequest::at(5.0, 1.0).named("NewNode"))
        .await
        .unwrap();

    assert_eq!(node.position, Point::new(5.0, 0.0));
    assert_eq!(h.route_names().await, strings(&["A-B", "A-NewNode", "NewNode-B"]));

    let (routes, _) = h
        .graph
        .list_routes(
            &RouteFilter::in_scope(&h.scope).with_name("A-NewNode"),
            &Pagination::unpaged(),
        )
        .await
        .unwrap();
    assert_eq!(routes[0].path_role, PathRole::Bidirectional);
    assert_eq!(routes[0].start_end, "forward");
    assert_eq!(routes[0].end_start, "forward");
}

#[tokio::test]
async fn test_far_node_does_not_split() {
    let h = harness().await;
    straight_route(&h).await;

    let node = h
        .graph
        .insert_or_update_node(&h.scope, NodeRequest::at(5.0, 4.0))
        .await
        .unwrap();

    assert_eq!(node.position, Point::new(5.0, 4.0));
    assert_eq!(h.route_names().await, strings(&["A-B"]));
}

#[tokio::test]
async fn test_split_origin_can_be_dropped() {
    let config = GraphConfig {
        retain_split_origin_routes: false,
        ..GraphConfig::default()
    };
    let h = harness_with(config, blank_map()).await;
    straight_route(&h).await;

    h.graph
        .insert_or_update_node(&h.scope, NodeRequest::at(5.0, 1.0).named("N"))
        .await
        .unwrap();

    assert_eq!(h.route_names().await, strings(&["A-N", "N-B"]));
}

#[tokio::test]
async fn test_auto_naming_continues_after_highest() {
    let h = harness().await;
    let mut names = Vec::new();
    for i in 0..3 {
        let node = h
            .graph
            .insert_or_update_node(&h.scope, NodeRequest::at(i as f64 * 10.0, i as f64 * 7.0))
            .await
            .unwrap();
        names.push(node.name);
    }
    assert_eq!(names, strings(&["Site0001", "Site0002", "Site0003"]));

    let middle = node_id(&h, "Site0002").await;
    h.graph.delete_node(&h.scope, middle).await.unwrap();

    let next = h
        .graph
        .insert_or_update_node(&h.scope, NodeRequest::at(30.0, 35.0))
        .await
        .unwrap();
    assert_eq!(next.name, "Site0004");
}

#[tokio::test]
async fn test_node_name_is_immutable() {
    let h = harness().await;
    let node = h
        .graph
        .insert_or_update_node(&h.scope, NodeRequest::at(1.0, 1.0))
        .await
        .unwrap();

    let edited = h
        .graph
        .insert_or_update_node(
            &h.scope,
            NodeRequest::at(3.0, 2.0)
                .named("Renamed")
                .editing(node.id)
                .with_comment("charger"),
        )
        .await
        .unwrap();

    assert_eq!(edited.id, node.id);
    assert_eq!(edited.name, "Site0001");
    assert_eq!(edited.position, Point::new(3.0, 2.0));
    assert_eq!(edited.comment, "charger");
    assert!(edited.updated_at >= node.updated_at);
    assert_eq!(h.node_names().await, strings(&["Site0001"]));
}

#[tokio::test]
async fn test_duplicate_explicit_name_is_rejected() {
    let h = harness().await;
    h.graph
        .insert_or_update_node(&h.scope, NodeRequest::at(1.0, 1.0).named("Dock"))
        .await
        .unwrap();

    let err = h
        .graph
        .insert_or_update_node(&h.scope, NodeRequest::at(9.0, 9.0).named("Dock"))
        .await
        .unwrap_err();
    assert!(matches!(err, GraphError::AlreadyExists { entity: "node", .. }));
    assert_eq!(h.node_names().await, strings(&["Dock"]));
}

#[tokio::test]
async fn test_unknown_scope_and_node() {
    let h = harness().await;

    let err = h
        .graph
        .insert_or_update_node(&ScopeId::new(), NodeRequest::at(1.0, 1.0))
        .await
        .unwrap_err();
    assert!(matches!(err, GraphError::NotFound { entity: "map", .. }));

    let err = h
        .graph
        .insert_or_update_node(&h.scope, NodeRequest::at(1.0, 1.0).editing(NodeId::new()))
        .await
        .unwrap_err();
    assert!(matches!(err, GraphError::NotFound { entity: "node", .. }));

    let err = h.graph.delete_node(&h.scope, NodeId::new()).await.unwrap_err();
    assert!(matches!(err, GraphError::NotFound { entity: "node", .. }));
}

#[tokio::test]
async fn test_delete_node_regenerates_bypass() {
    let h = harness().await;
    bent_chain(&h).await;
    assert_eq!(h.route_names().await, strings(&["A-B", "B-C"]));

    let b = node_id(&h, "B").await;
    let deleted = h.graph.delete_node(&h.scope, b).await.unwrap();

    assert_eq!(deleted.name, "B");
    assert_eq!(h.node_names().await, strings(&["A", "C"]));
    assert_eq!(h.route_names().await, strings(&["A-C"]));
}

#[tokio::test]
async fn test_delete_node_skips_self_loop_bypass() {
    let h = harness().await;
    h.graph
        .insert_or_update_route_set(
            &h.scope,
            vec![
                NodeRequest::at(0.0, 0.0).named("A"),
                NodeRequest::at(10.0, 10.0).named("B"),
            ],
            Some(vec![RouteRequest::between("A", "B"), RouteRequest::between("B", "A")]),
        )
        .await
        .unwrap();

    let b = node_id(&h, "B").await;
    h.graph.delete_node(&h.scope, b).await.unwrap();

    assert!(h.route_names().await.is_empty());
}

#[tokio::test]
async fn test_delete_route_bypasses_and_drops_end_node() {
    let h = harness().await;
    bent_chain(&h).await;

    let (routes, _) = h
        .graph
        .list_routes(
            &RouteFilter::in_scope(&h.scope).with_name("A-B"),
            &Pagination::unpaged(),
        )
        .await
        .unwrap();
    let deleted = h.graph.delete_route(&h.scope, routes[0].id).await.unwrap();

    assert_eq!(deleted.name, "A-B");
    // Only B-C remains, so A is unreferenced; B goes unconditionally
    assert_eq!(h.node_names().await, strings(&["C"]));
    assert_eq!(h.route_names().await, strings(&["A-C", "B-C"]));
}

#[tokio::test]
async fn test_delete_route_keeps_referenced_end_node_when_configured() {
    let config = GraphConfig {
        end_node_cleanup: EndNodeCleanup::WhenUnreferenced,
        ..GraphConfig::default()
    };
    let h = harness_with(config, blank_map()).await;
    bent_chain(&h).await;

    let (routes, _) = h
        .graph
        .list_routes(
            &RouteFilter::in_scope(&h.scope).with_name("A-B"),
            &Pagination::unpaged(),
        )
        .await
        .unwrap();
    h.graph.delete_route(&h.scope, routes[0].id).await.unwrap();

    assert_eq!(h.node_names().await, strings(&["B", "C"]));
    assert_eq!(h.route_names().await, strings(&["A-C", "B-C"]));
}

#[tokio::test]
async fn test_delete_last_route_removes_both_endpoints() {
    let h = harness().await;
    straight_route(&h).await;

    let (routes, _) = h
        .graph
        .list_routes(&RouteFilter::in_scope(&h.scope), &Pagination::unpaged())
        .await
        .unwrap();
    h.graph.delete_route(&h.scope, routes[0].id).await.unwrap();

    assert!(h.node_names().await.is_empty());
    assert!(h.route_names().await.is_empty());
}

#[tokio::test]
async fn test_batch_delete_has_no_bypass() {
    let h = harness().await;
    bent_chain(&h).await;

    let b = node_id(&h, "B").await;
    let deleted = h.graph.batch_delete_nodes(&h.scope, vec![b]).await.unwrap();

    assert_eq!(deleted.len(), 1);
    assert_eq!(h.node_names().await, strings(&["A", "C"]));
    assert!(h.route_names().await.is_empty());
}

#[tokio::test]
async fn test_batch_delete_rejects_empty_and_unknown() {
    let h = harness().await;
    bent_chain(&h).await;

    let err = h.graph.batch_delete_nodes(&h.scope, vec![]).await.unwrap_err();
    assert!(matches!(err, GraphError::InvalidInput(_)));

    let err = h
        .graph
        .batch_delete_nodes(&h.scope, vec![NodeId::new()])
        .await
        .unwrap_err();
    assert!(matches!(err, GraphError::NotFound { entity: "node", .. }));
    assert_eq!(h.node_names().await, strings(&["A", "B", "C"]));
}

#[tokio::test]
async fn test_failed_route_write_rolls_back_everything() {
    let h = harness().await;
    straight_route(&h).await;

    // The split stages two routes; the second write fails
    h.store.faults().fail_route_create_after(1);
    let err = h
        .graph
        .insert_or_update_node(&h.scope, NodeRequest::at(5.0, 1.0).named("N"))
        .await
        .unwrap_err();
    assert!(matches!(err, GraphError::StorageFailure { .. }));

    assert_eq!(h.node_names().await, strings(&["A", "B"]));
    assert_eq!(h.route_names().await, strings(&["A-B"]));

    h.store.faults().clear();
    h.graph
        .insert_or_update_node(&h.scope, NodeRequest::at(5.0, 1.0).named("N"))
        .await
        .unwrap();
    assert_eq!(h.route_names().await, strings(&["A-B", "A-N", "N-B"]));
}

#[tokio::test]
async fn test_failed_commit_leaves_state_untouched() {
    let h = harness().await;
    h.store.faults().fail_commit_after(0);

    let err = h
        .graph
        .insert_or_update_node(&h.scope, NodeRequest::at(1.0, 1.0))
        .await
        .unwrap_err();
    assert!(matches!(err, GraphError::StorageFailure { .. }));
    assert!(h.node_names().await.is_empty());
}

#[tokio::test]
async fn test_concurrent_name_race_fails_at_commit() {
    let h = harness().await;
    let now = Utc::now();

    // A writer that checked Site0001 was free before the service claimed it
    let mut racing = h.store.begin().await.unwrap();
    racing
        .create_node(NodeRequest::at(30.0, 30.0).to_new_node(&h.scope, "Site0001".to_string(), now))
        .await
        .unwrap();

    let node = h
        .graph
        .insert_or_update_node(&h.scope, NodeRequest::at(1.0, 1.0))
        .await
        .unwrap();
    assert_eq!(node.name, "Site0001");

    let err = racing.commit().await.unwrap_err();
    assert!(matches!(err, GraphError::AlreadyExists { entity: "node", .. }));
    assert_eq!(h.node_names().await, strings(&["Site0001"]));
}

#[tokio::test]
async fn test_route_set_chains_auto_named_nodes() {
    let h = harness().await;

    let outcome = h
        .graph
        .insert_or_update_route_set(
            &h.scope,
            vec![
                NodeRequest::at(0.0, 0.0),
                NodeRequest::at(0.0, 0.0),
                NodeRequest::at(10.0, 10.0),
                NodeRequest::at(20.0, 0.0),
            ],
            None,
        )
        .await
        .unwrap();

    let names: Vec<&str> = outcome.nodes.iter().map(|n| n.name.as_str()).collect();
    assert_eq!(names, vec!["Site0001", "Site0002", "Site0003"]);
    assert_eq!(
        h.route_names().await,
        strings(&["Site0001-Site0002", "Site0002-Site0003"])
    );
}

#[tokio::test]
async fn test_route_set_explicit_routes_replace_chain() {
    let h = harness().await;

    h.graph
        .insert_or_update_route_set(
            &h.scope,
            vec![
                NodeRequest::at(0.0, 0.0).named("A"),
                NodeRequest::at(10.0, 10.0).named("B"),
                NodeRequest::at(20.0, 0.0).named("C"),
            ],
            Some(vec![
                RouteRequest::between("A", "C").with_role(PathRole::Unidirectional),
            ]),
        )
        .await
        .unwrap();

    assert_eq!(h.route_names().await, strings(&["A-C"]));
    let (routes, _) = h
        .graph
        .list_routes(&RouteFilter::in_scope(&h.scope), &Pagination::unpaged())
        .await
        .unwrap();
    assert_eq!(routes[0].path_role, PathRole::Unidirectional);
}

#[tokio::test]
async fn test_route_set_rejects_missing_endpoint_atomically() {
    let h = harness().await;

    let err = h
        .graph
        .insert_or_update_route_set(
            &h.scope,
            vec![NodeRequest::at(0.0, 0.0).named("A")],
            Some(vec![RouteRequest::between("A", "Ghost")]),
        )
        .await
        .unwrap_err();

    assert_eq!(err, GraphError::not_found("node", "Ghost"));
    assert!(h.node_names().await.is_empty());
}

#[tokio::test]
async fn test_route_set_rejects_existing_route_name() {
    let h = harness().await;
    bent_chain(&h).await;

    let err = h
        .graph
        .insert_or_update_route_set(&h.scope, vec![], Some(vec![RouteRequest::between("A", "B")]))
        .await
        .unwrap_err();
    assert!(matches!(err, GraphError::AlreadyExists { entity: "route", .. }));
}

#[tokio::test]
async fn test_route_set_updates_existing_route() {
    let h = harness().await;
    bent_chain(&h).await;

    let (routes, _) = h
        .graph
        .list_routes(
            &RouteFilter::in_scope(&h.scope).with_name("B-C"),
            &Pagination::unpaged(),
        )
        .await
        .unwrap();
    let update = RouteRequest {
        end_start: Some("reverse".to_string()),
        ..RouteRequest::between("B", "C").editing(routes[0].id)
    };

    let outcome = h
        .graph
        .insert_or_update_route_set(&h.scope, vec![], Some(vec![update]))
        .await
        .unwrap();

    assert_eq!(outcome.routes.len(), 1);
    assert_eq!(outcome.routes[0].id, routes[0].id);
    assert_eq!(outcome.routes[0].end_start, "reverse");
    assert_eq!(outcome.routes[0].start_end, "forward");
    assert_eq!(h.route_names().await, strings(&["A-B", "B-C"]));
}

#[tokio::test]
async fn test_route_set_splits_existing_route() {
    let h = harness().await;
    straight_route(&h).await;

    let outcome = h
        .graph
        .insert_or_update_route_set(
            &h.scope,
            vec![
                NodeRequest::at(4.0, 2.0).named("M"),
                NodeRequest::at(4.0, 30.0).named("Far"),
            ],
            None,
        )
        .await
        .unwrap();

    assert_eq!(outcome.nodes[0].position, Point::new(4.0, 0.0));
    assert_eq!(
        h.route_names().await,
        strings(&["A-B", "A-M", "M-B", "M-Far"])
    );
}

#[tokio::test]
async fn test_list_nodes_pages_and_orders() {
    let h = harness().await;
    for (name, x) in [("C", 0.0), ("A", 10.0), ("B", 20.0)] {
        h.graph
            .insert_or_update_node(&h.scope, NodeRequest::at(x, x + 5.0).named(name))
            .await
            .unwrap();
    }

    let (page, total) = h
        .graph
        .list_nodes(
            &NodeFilter::in_scope(&h.scope),
            &Pagination::page(1, 2).ordered_by(OrderBy::Name, SortOrder::Asc),
        )
        .await
        .unwrap();
    assert_eq!(total, 3);
    let names: Vec<&str> = page.iter().map(|n| n.name.as_str()).collect();
    assert_eq!(names, vec!["A", "B"]);

    let err = h
        .graph
        .list_nodes(&NodeFilter::in_scope(&h.scope), &Pagination::page(0, 2))
        .await
        .unwrap_err();
    assert!(matches!(err, GraphError::InvalidInput(_)));
}

#[tokio::test]
async fn test_route_set_updates_existing_node_in_place() {
    let h = harness().await;
    straight_route(&h).await;
    let parked = h
        .graph
        .insert_or_update_node(&h.scope, NodeRequest::at(50.0, 50.0).named("M"))
        .await
        .unwrap();

    let outcome = h
        .graph
        .insert_or_update_route_set(
            &h.scope,
            vec![
                NodeRequest::at(5.0, 1.0)
                    .named("Renamed")
                    .editing(parked.id)
                    .with_comment("charger"),
                NodeRequest::at(5.0, 10.0).named("Z"),
            ],
            None,
        )
        .await
        .unwrap();

    let moved = &outcome.nodes[0];
    assert_eq!(moved.id, parked.id);
    assert_eq!(moved.name, "M");
    assert_eq!(moved.position, Point::new(5.0, 0.0));
    assert_eq!(moved.comment, "charger");

    let (stored, _) = h
        .graph
        .list_nodes(
            &NodeFilter::in_scope(&h.scope).with_names(vec!["M".to_string()]),
            &Pagination::unpaged(),
        )
        .await
        .unwrap();
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].position, Point::new(5.0, 0.0));

    assert_eq!(h.node_names().await, strings(&["A", "B", "M", "Z"]));
    assert_eq!(
        h.route_names().await,
        strings(&["A-B", "A-M", "M-B", "M-Z"])
    );
}

#[tokio::test]
async fn test_route_set_unknown_node_id_writes_nothing() {
    let h = harness().await;
    straight_route(&h).await;

    let missing = NodeId::new();
    let err = h
        .graph
        .insert_or_update_route_set(
            &h.scope,
            vec![
                NodeRequest::at(5.0, 1.0).named("Fresh"),
                NodeRequest::at(7.0, 7.0).editing(missing),
            ],
            None,
        )
        .await
        .unwrap_err();

    assert_eq!(err, GraphError::not_found("node", missing));
    assert_eq!(h.node_names().await, strings(&["A", "B"]));
    assert_eq!(h.route_names().await, strings(&["A-B"]));
}

#[tokio::test]
async fn test_route_set_rejects_empty_node_name() {
    let h = harness().await;

    let err = h
        .graph
        .insert_or_update_route_set(
            &h.scope,
            vec![NodeRequest::at(0.0, 0.0), NodeRequest::at(5.0, 5.0).named("")],
            None,
        )
        .await
        .unwrap_err();

    assert!(matches!(err, GraphError::InvalidInput(_)));

    let err = h
        .graph
        .insert_or_update_node(&h.scope, NodeRequest::at(0.0, 0.0).named(""))
        .await
        .unwrap_err();
    assert!(matches!(err, GraphError::InvalidInput(_)));
    assert!(h.node_names().await.is_empty());
}
