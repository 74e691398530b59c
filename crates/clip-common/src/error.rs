//! Error types shared across the sentinel-clip workspace.

use thiserror::Error;

/// Result type alias using ClipError.
pub type ClipResult<T> = Result<T, ClipError>;

/// Primary error type for the acquisition selection and clipping pipeline.
///
/// Variants split into two propagation classes. Configuration-class errors
/// (`InvalidCrs`, `DegenerateRegion`, `UnknownAsset`, `CatalogUnavailable`,
/// `InvalidGeometry`) always propagate to the caller. The per-acquisition
/// I/O class (`BoundsOutsideExtent`, `RemoteIo`, `InvalidRaster`) is caught
/// at the clipping-engine boundary, logged, and surfaced as "no result" so
/// a single bad acquisition cannot abort a batch run.
#[derive(Debug, Error)]
pub enum ClipError {
    // === Input validation ===
    #[error("invalid CRS: {0}")]
    InvalidCrs(String),

    #[error("degenerate query region: {0}")]
    DegenerateRegion(String),

    // === Catalog errors ===
    #[error("catalog unavailable: {0}")]
    CatalogUnavailable(String),

    #[error("invalid acquisition footprint: {0}")]
    InvalidGeometry(String),

    // === Clipping errors ===
    #[error("asset '{0}' not present in acquisition asset mapping")]
    UnknownAsset(String),

    #[error("requested bounds {requested} do not intersect raster extent {extent}")]
    BoundsOutsideExtent { requested: String, extent: String },

    #[error("remote I/O failure: {0}")]
    RemoteIo(String),

    #[error("invalid raster: {0}")]
    InvalidRaster(String),

    // === Infrastructure passthrough ===
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl ClipError {
    /// Whether this error must abort the run instead of being downgraded
    /// to a per-acquisition "no result".
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            ClipError::InvalidCrs(_)
                | ClipError::DegenerateRegion(_)
                | ClipError::CatalogUnavailable(_)
                | ClipError::InvalidGeometry(_)
                | ClipError::UnknownAsset(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fatality_split() {
        assert!(ClipError::UnknownAsset("visual".into()).is_fatal());
        assert!(ClipError::CatalogUnavailable("timeout".into()).is_fatal());
        assert!(!ClipError::RemoteIo("connection reset".into()).is_fatal());
        assert!(!ClipError::BoundsOutsideExtent {
            requested: "(0,0,1,1)".into(),
            extent: "(5,5,9,9)".into()
        }
        .is_fatal());
    }
}
