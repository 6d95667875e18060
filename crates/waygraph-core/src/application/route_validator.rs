use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info};

use crate::config::GraphConfig;
use crate::domain::map::ScopeId;
use crate::domain::node::{NodeFilter, NodeIndex};
use crate::domain::pagination::Pagination;
use crate::domain::repository::{MapMetadataProvider, WaypointStore};
use crate::domain::requests::RouteRequest;
use crate::domain::route::RouteFilter;
use crate::error::{GraphError, GraphResult};
use crate::geometry::rasterize_segment;
use crate::raster::{ensure_supported_image, first_occupied, ImageDecoder, PixelGrid};

/// Checks candidate routes against the obstacle raster of their map
pub struct RouteValidator {
    /// Scope to map lookup
    maps: Arc<dyn MapMetadataProvider>,

    /// Node and route lookup
    store: Arc<dyn WaypointStore>,

    /// Raster decoder
    decoder: Arc<dyn ImageDecoder>,

    /// Engine settings
    config: GraphConfig,
}

impl RouteValidator {
    /// Create a new route validator
    pub fn new(
        maps: Arc<dyn MapMetadataProvider>,
        store: Arc<dyn WaypointStore>,
        decoder: Arc<dyn ImageDecoder>,
        config: GraphConfig,
    ) -> Self {
        Self {
            maps,
            store,
            decoder,
            config,
        }
    }

    async fn decode(&self, path: PathBuf) -> GraphResult<Box<dyn PixelGrid>> {
        let decoder = Arc::clone(&self.decoder);
        let display = path.display().to_string();
        tokio::task::spawn_blocking(move || decoder.decode(&path))
            .await
            .map_err(|e| GraphError::ImageDecodeFailure {
                path: display,
                message: e.to_string(),
            })?
    }

    /// Check that no candidate crosses an occupied pixel.
    ///
    /// Candidates are checked in order and the first hit fails the whole call
    /// with [`GraphError::ObstacleDetected`].
    pub async fn check_route(&self, scope: &ScopeId, candidates: &[RouteRequest]) -> GraphResult<()> {
        let map = self
            .maps
            .map_for_scope(scope)
            .await?
            .ok_or_else(|| GraphError::not_found("map", scope))?;
        ensure_supported_image(&map.image_path)?;
        let grid = self.decode(map.image_path.clone()).await?;

        for candidate in candidates {
            let name = candidate.name();
            let (routes, _) = self
                .store
                .list_routes(
                    &RouteFilter::in_scope(scope).with_name(name.as_str()),
                    &Pagination::unpaged(),
                )
                .await?;
            let route = routes
                .into_iter()
                .next()
                .ok_or_else(|| GraphError::not_found("route", &name))?;

            let (nodes, _) = self
                .store
                .list_nodes(
                    &NodeFilter::in_scope(scope)
                        .with_names(vec![route.start.clone(), route.end.clone()]),
                    &Pagination::unpaged(),
                )
                .await?;
            let index = NodeIndex::new(nodes);
            let start = index
                .position(&route.start)
                .ok_or_else(|| GraphError::not_found("node", &route.start))?;
            let end = index
                .position(&route.end)
                .ok_or_else(|| GraphError::not_found("node", &route.end))?;

            let (width, height) = grid.dimensions();
            let samples = rasterize_segment(start, end).clipped_to(width, height);
            debug!(route = %route.name, samples = samples.len(), "Sampling route");
            if let Some((x, y)) =
                first_occupied(grid.as_ref(), samples, self.config.occupancy_threshold)
            {
                info!(scope = %scope, route = %route.name, x, y, "Route blocked by obstacle");
                return Err(GraphError::ObstacleDetected {
                    route: route.name,
                    x,
                    y,
                });
            }
        }

        info!(scope = %scope, routes = candidates.len(), "Routes passed obstacle check");
        Ok(())
    }
}
