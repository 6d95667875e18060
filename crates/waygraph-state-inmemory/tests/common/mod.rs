#![allow(dead_code)]

use image::{GrayImage, Luma};
use std::sync::Arc;
use tempfile::TempDir;

use waygraph_core::{
    GraphConfig, ImageCrateDecoder, MapRequest, MapService, NodeFilter, Pagination,
    RouteFilter, RouteValidator, ScopeId, WaypointGraphService,
};
use waygraph_state_inmemory::InMemoryWaypointStore;

/// Install a test-writer subscriber once per test binary
pub fn init_test_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Services wired to one in-memory store with a single registered map
pub struct Harness {
    pub store: Arc<InMemoryWaypointStore>,
    pub graph: WaypointGraphService,
    pub maps: MapService,
    pub validator: RouteValidator,
    pub scope: ScopeId,
    pub dir: TempDir,
}

/// 40x40 map with every pixel free
pub fn blank_map() -> GrayImage {
    GrayImage::from_pixel(40, 40, Luma([0]))
}

pub async fn harness() -> Harness {
    harness_with(GraphConfig::default(), blank_map()).await
}

pub async fn harness_with(config: GraphConfig, image: GrayImage) -> Harness {
    init_test_tracing();

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("floor.png");
    image.save(&path).unwrap();

    let store = Arc::new(InMemoryWaypointStore::new());
    let decoder = Arc::new(ImageCrateDecoder);
    let graph = WaypointGraphService::new(store.clone(), config.clone());
    let maps = MapService::new(store.clone(), decoder.clone());
    let validator = RouteValidator::new(store.clone(), store.clone(), decoder, config);

    let map = maps
        .create_or_update_map(MapRequest {
            id: None,
            name: "floor".to_string(),
            image_path: path,
        })
        .await
        .unwrap();

    Harness {
        store,
        graph,
        maps,
        validator,
        scope: map.id,
        dir,
    }
}

impl Harness {
    /// Committed node names of the scope, sorted
    pub async fn node_names(&self) -> Vec<String> {
        let (nodes, _) = self
            .graph
            .list_nodes(&NodeFilter::in_scope(&self.scope), &Pagination::unpaged())
            .await
            .unwrap();
        let mut names: Vec<String> = nodes.into_iter().map(|node| node.name).collect();
        names.sort();
        names
    }

    /// Committed route names of the scope, sorted
    pub async fn route_names(&self) -> Vec<String> {
        let (routes, _) = self
            .graph
            .list_routes(&RouteFilter::in_scope(&self.scope), &Pagination::unpaged())
            .await
            .unwrap();
        let mut names: Vec<String> = routes.into_iter().map(|route| route.name).collect();
        names.sort();
        names
    }
}

pub fn strings(names: &[&str]) -> Vec<String> {
    names.iter().map(|name| name.to_string()).collect()
}
