//! Common types and utilities shared across the sentinel-clip workspace.

pub mod bbox;
pub mod crs;
pub mod error;
pub mod geotransform;
pub mod region;
pub mod time;
pub mod transform;

pub use bbox::BoundingBox;
pub use crs::{Crs, WGS84};
pub use error::{ClipError, ClipResult};
pub use geotransform::{GeoTransform, PixelWindow};
pub use region::QueryRegion;
pub use time::TimeRange;
pub use transform::{to_wgs84_geojson, to_wgs84_polygon, transform_bounds, transform_point};
