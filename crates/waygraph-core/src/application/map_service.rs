use chrono::Utc;
use std::sync::Arc;
use tracing::info;

use crate::domain::map::{MapFilter, MapRecord, ScopeId};
use crate::domain::pagination::Pagination;
use crate::domain::repository::{finish, WaypointStore, WaypointTransaction};
use crate::domain::requests::MapRequest;
use crate::error::{GraphError, GraphResult};
use crate::raster::{ensure_supported_image, ImageDecoder};

/// Service for registering the maps that scope waypoint graphs
pub struct MapService {
    /// Backing store
    store: Arc<dyn WaypointStore>,

    /// Used to measure map images
    decoder: Arc<dyn ImageDecoder>,
}

impl MapService {
    /// Create a new map service
    pub fn new(store: Arc<dyn WaypointStore>, decoder: Arc<dyn ImageDecoder>) -> Self {
        Self { store, decoder }
    }

    async fn measure(&self, request: &MapRequest) -> GraphResult<(u32, u32)> {
        let path = request.image_path.clone();
        if !tokio::fs::try_exists(&path).await.unwrap_or(false) {
            return Err(GraphError::not_found("map image", path.display()));
        }
        ensure_supported_image(&path)?;

        let decoder = Arc::clone(&self.decoder);
        let display = path.display().to_string();
        let grid = tokio::task::spawn_blocking(move || decoder.decode(&path))
            .await
            .map_err(|e| GraphError::ImageDecodeFailure {
                path: display,
                message: e.to_string(),
            })??;
        Ok(grid.dimensions())
    }

    /// Register a map, or edit one when `request.id` is set.
    ///
    /// The image must exist and decode; its dimensions are recorded.
    pub async fn create_or_update_map(&self, request: MapRequest) -> GraphResult<MapRecord> {
        if request.name.trim().is_empty() {
            return Err(GraphError::InvalidInput(
                "map name must not be empty".to_string(),
            ));
        }
        let dimensions = self.measure(&request).await?;

        let mut tx = self.store.begin().await?;
        let result = Self::store_map_in(tx.as_mut(), request, dimensions).await;
        finish(tx, result).await
    }

    async fn store_map_in(
        tx: &mut dyn WaypointTransaction,
        request: MapRequest,
        dimensions: (u32, u32),
    ) -> GraphResult<MapRecord> {
        let now = Utc::now();
        let holder = tx.map_by_name(&request.name).await?;

        let map = match &request.id {
            Some(id) => {
                let mut map = tx
                    .map_by_id(id)
                    .await?
                    .ok_or_else(|| GraphError::not_found("map", id))?;
                if holder.is_some_and(|other| other.id != map.id) {
                    return Err(GraphError::already_exists("map", &request.name, &map.id));
                }
                request.apply_to(&mut map, dimensions, now);
                tx.save_map(&map).await?;
                map
            }
            None => {
                if let Some(other) = holder {
                    return Err(GraphError::already_exists("map", &request.name, &other.id));
                }
                let map = request.to_new_map(dimensions, now);
                tx.create_map(map.clone()).await?;
                map
            }
        };

        info!(
            map = %map.id,
            name = %map.name,
            width = map.width,
            height = map.height,
            "Map stored"
        );
        Ok(map)
    }

    /// List committed maps
    pub async fn list_maps(
        &self,
        filter: &MapFilter,
        pagination: &Pagination,
    ) -> GraphResult<(Vec<MapRecord>, u64)> {
        pagination.validate()?;
        self.store.list_maps(filter, pagination).await
    }

    /// Delete a map with every node and route it scopes
    pub async fn delete_map(&self, id: &ScopeId) -> GraphResult<MapRecord> {
        let mut tx = self.store.begin().await?;
        let result = match tx.delete_map(id).await {
            Ok(Some(map)) => Ok(map),
            Ok(None) => Err(GraphError::not_found("map", id)),
            Err(e) => Err(e),
        };
        let map = finish(tx, result).await?;
        info!(map = %map.id, name = %map.name, "Map deleted");
        Ok(map)
    }
}
