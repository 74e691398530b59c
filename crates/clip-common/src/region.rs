//! Validated query region: bounds plus the CRS they are expressed in.

use crate::bbox::BoundingBox;
use crate::crs::Crs;
use crate::error::{ClipError, ClipResult};
use serde::{Deserialize, Serialize};

/// A rectangular area of interest in a caller-specified CRS.
///
/// Construction validates that the bounds are strictly ordered on both
/// axes; a degenerate or inverted region is rejected up front rather than
/// producing empty search results downstream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryRegion {
    pub bounds: BoundingBox,
    pub crs: Crs,
}

impl QueryRegion {
    /// Create a validated query region.
    pub fn new(bounds: BoundingBox, crs: Crs) -> ClipResult<Self> {
        if !(bounds.min_x < bounds.max_x) || !(bounds.min_y < bounds.max_y) {
            return Err(ClipError::DegenerateRegion(format!(
                "bounds {bounds} must satisfy min_x < max_x and min_y < max_y"
            )));
        }
        Ok(Self { bounds, crs })
    }
}
