//! Raster sampling for route validation.
//!
//! A decoded map image is exposed to the engine as a [`PixelGrid`]: a
//! grayscale lookup by pixel coordinate. Decoding itself sits behind the
//! [`ImageDecoder`] seam so callers can swap the `image` crate for anything
//! else that yields luma values.

use std::path::Path;

use image::GrayImage;

use crate::error::{GraphError, GraphResult};
use crate::geometry::Sample;

/// Default grayscale intensity above which a pixel counts as an obstacle
pub const DEFAULT_OCCUPANCY_THRESHOLD: u8 = 150;

/// File extensions the route validator accepts for map rasters
pub const SUPPORTED_IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg"];

/// Decoded raster with grayscale access
pub trait PixelGrid: Send + Sync {
    /// Width and height in pixels
    fn dimensions(&self) -> (u32, u32);

    /// Grayscale intensity at `(x, y)`, `None` outside the image
    fn luma_at(&self, x: i64, y: i64) -> Option<u8>;
}

impl PixelGrid for GrayImage {
    fn dimensions(&self) -> (u32, u32) {
        GrayImage::dimensions(self)
    }

    fn luma_at(&self, x: i64, y: i64) -> Option<u8> {
        let x = u32::try_from(x).ok()?;
        let y = u32::try_from(y).ok()?;
        self.get_pixel_checked(x, y).map(|pixel| pixel.0[0])
    }
}

/// Turns a raster file into a [`PixelGrid`]
#[cfg_attr(test, mockall::automock)]
pub trait ImageDecoder: Send + Sync {
    /// Decode the file at `path`
    fn decode(&self, path: &Path) -> GraphResult<Box<dyn PixelGrid>>;
}

/// [`ImageDecoder`] backed by the `image` crate (PNG and JPEG)
#[derive(Debug, Default, Clone, Copy)]
pub struct ImageCrateDecoder;

impl ImageDecoder for ImageCrateDecoder {
    fn decode(&self, path: &Path) -> GraphResult<Box<dyn PixelGrid>> {
        let decoded = image::open(path).map_err(|e| GraphError::ImageDecodeFailure {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        Ok(Box::new(decoded.to_luma8()))
    }
}

/// Reject map files whose extension the validator cannot decode.
pub fn ensure_supported_image(path: &Path) -> GraphResult<()> {
    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase());

    match extension {
        Some(ext) if SUPPORTED_IMAGE_EXTENSIONS.contains(&ext.as_str()) => Ok(()),
        _ => Err(GraphError::InvalidInput(format!(
            "unsupported map image format: {}",
            path.display()
        ))),
    }
}

/// First sample whose intensity is strictly above `threshold`.
///
/// Samples outside the grid are treated as free space.
pub fn first_occupied<I>(grid: &dyn PixelGrid, samples: I, threshold: u8) -> Option<Sample>
where
    I: IntoIterator<Item = Sample>,
{
    samples
        .into_iter()
        .find(|&(x, y)| matches!(grid.luma_at(x, y), Some(luma) if luma > threshold))
}
