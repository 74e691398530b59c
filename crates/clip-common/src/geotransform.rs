//! Affine georeferencing and pixel window computation.

use crate::bbox::BoundingBox;
use crate::error::{ClipError, ClipResult};
use serde::{Deserialize, Serialize};

/// North-up affine georeferencing for a raster.
///
/// Maps pixel (col, row) to the coordinate of the pixel's upper-left
/// corner. `pixel_height` is negative for the usual row-0-at-top layout.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoTransform {
    pub origin_x: f64,
    pub pixel_width: f64,
    pub origin_y: f64,
    pub pixel_height: f64,
}

impl GeoTransform {
    /// The map coordinate of pixel (col, row)'s upper-left corner.
    pub fn xy(&self, col: f64, row: f64) -> (f64, f64) {
        (
            self.origin_x + col * self.pixel_width,
            self.origin_y + row * self.pixel_height,
        )
    }

    /// The full extent of a raster with this transform and the given
    /// pixel dimensions.
    pub fn extent(&self, width: u32, height: u32) -> BoundingBox {
        let (x0, y0) = self.xy(0.0, 0.0);
        let (x1, y1) = self.xy(width as f64, height as f64);
        BoundingBox::new(x0.min(x1), y0.min(y1), x0.max(x1), y0.max(y1))
    }

    /// Compute the pixel window covering `bounds`, expanded outward to
    /// whole pixels and clamped to the raster dimensions.
    pub fn window_from_bounds(
        &self,
        bounds: &BoundingBox,
        raster_width: u32,
        raster_height: u32,
    ) -> ClipResult<PixelWindow> {
        if self.pixel_width <= 0.0 || self.pixel_height >= 0.0 {
            return Err(ClipError::InvalidRaster(format!(
                "unsupported geotransform orientation: pixel_width={}, pixel_height={}",
                self.pixel_width, self.pixel_height
            )));
        }

        let col_min = (bounds.min_x - self.origin_x) / self.pixel_width;
        let col_max = (bounds.max_x - self.origin_x) / self.pixel_width;
        // pixel_height < 0: max_y maps to the smaller row index
        let row_min = (bounds.max_y - self.origin_y) / self.pixel_height;
        let row_max = (bounds.min_y - self.origin_y) / self.pixel_height;

        let col_off = col_min.floor().max(0.0) as u32;
        let row_off = row_min.floor().max(0.0) as u32;
        let col_end = (col_max.ceil() as i64).clamp(0, raster_width as i64) as u32;
        let row_end = (row_max.ceil() as i64).clamp(0, raster_height as i64) as u32;

        Ok(PixelWindow {
            col_off,
            row_off,
            width: col_end.saturating_sub(col_off),
            height: row_end.saturating_sub(row_off),
        })
    }

    /// The geotransform of a sub-window of this raster.
    pub fn window_transform(&self, window: &PixelWindow) -> GeoTransform {
        let (origin_x, origin_y) = self.xy(window.col_off as f64, window.row_off as f64);
        GeoTransform {
            origin_x,
            pixel_width: self.pixel_width,
            origin_y,
            pixel_height: self.pixel_height,
        }
    }
}

/// A rectangular pixel region within a raster.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PixelWindow {
    pub col_off: u32,
    pub row_off: u32,
    pub width: u32,
    pub height: u32,
}

impl PixelWindow {
    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}
