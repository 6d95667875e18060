use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;

use waygraph_core::{
    GraphConfig, ImageCrateDecoder, MapRequest, MapService, Node, NodeRequest, Route,
    RouteRequest, RouteValidator, WaypointGraphService,
};
use waygraph_monitoring::{init_logging, LogExt, MonitoringConfig};
use waygraph_state_inmemory::InMemoryWaypointStore;

const USAGE: &str = "usage: waygraph <graph.json>";

/// Map section of a graph document
#[derive(Debug, Deserialize)]
struct MapSection {
    name: String,
    /// Relative paths resolve against the document's directory
    map_url: PathBuf,
}

/// A graph document: one map, its nodes, and optionally explicit routes
#[derive(Debug, Deserialize)]
struct GraphDocument {
    map: MapSection,
    nodes: Vec<NodeRequest>,
    #[serde(default)]
    routes: Option<Vec<RouteRequest>>,
    /// Routes to validate; every stored route when absent
    #[serde(default)]
    check: Option<Vec<RouteRequest>>,
}

#[derive(Debug, Serialize)]
struct Report {
    map: String,
    nodes: Vec<Node>,
    routes: Vec<Route>,
    checked: usize,
}

fn resolve(base: &Path, path: PathBuf) -> PathBuf {
    if path.is_absolute() {
        path
    } else {
        base.join(path)
    }
}

async fn run(document_path: &Path) -> Result<Report> {
    let config = GraphConfig::load().context("Failed to load graph configuration")?;

    let raw = tokio::fs::read_to_string(document_path)
        .await
        .with_context(|| format!("Failed to read {}", document_path.display()))?;
    let document: GraphDocument = serde_json::from_str(&raw)
        .with_context(|| format!("Failed to parse {}", document_path.display()))?;
    let base = document_path.parent().unwrap_or_else(|| Path::new("."));

    let store = Arc::new(InMemoryWaypointStore::new());
    let decoder = Arc::new(ImageCrateDecoder);
    let maps = MapService::new(store.clone(), decoder.clone());
    let graph = WaypointGraphService::new(store.clone(), config.clone());
    let validator = RouteValidator::new(store.clone(), store.clone(), decoder, config);

    let map = maps
        .create_or_update_map(MapRequest {
            id: None,
            name: document.map.name,
            image_path: resolve(base, document.map.map_url),
        })
        .await
        .log_err("Failed to register map")?;

    let outcome = graph
        .insert_or_update_route_set(&map.id, document.nodes, document.routes)
        .await
        .log_err("Failed to build graph")?;

    let candidates = match document.check {
        Some(candidates) => candidates,
        None => store
            .snapshot()
            .await
            .routes
            .iter()
            .map(|route| RouteRequest::between(route.start.as_str(), route.end.as_str()))
            .collect(),
    };

    validator
        .check_route(&map.id, &candidates)
        .await
        .log_err("Route check failed")?;

    let snapshot = store.snapshot().await;
    info!(
        map = %map.name,
        nodes = outcome.nodes.len(),
        routes = snapshot.routes.len(),
        checked = candidates.len(),
        "Graph validated"
    );

    Ok(Report {
        map: map.name,
        nodes: snapshot.nodes,
        routes: snapshot.routes,
        checked: candidates.len(),
    })
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();

    let monitoring_config = MonitoringConfig::from_env("waygraph");
    init_logging(&monitoring_config).context("Failed to initialize logging")?;

    let mut args = std::env::args().skip(1);
    let document_path = match (args.next(), args.next()) {
        (Some(path), None) => PathBuf::from(path),
        _ => bail!(USAGE),
    };

    let report = run(&document_path).await?;
    println!(
        "{}",
        serde_json::to_string_pretty(&report).context("Failed to render report")?
    );

    Ok(())
}
