//! Common test fixtures for sentinel-clip tests.
//!
//! This module provides pre-built STAC items and in-memory stand-ins for
//! the catalog and signer collaborators.

use std::sync::Mutex;

use clip_common::{BoundingBox, ClipError, ClipResult};
use stac_client::{AssetSigner, Catalog, SearchParams, StacItem};

/// Build a STAC item with a rectangular WGS84 footprint.
///
/// `assets` maps asset names to hrefs.
pub fn item_with_footprint(
    id: &str,
    footprint: BoundingBox,
    assets: &[(&str, &str)],
) -> StacItem {
    let asset_map: serde_json::Map<String, serde_json::Value> = assets
        .iter()
        .map(|(name, href)| {
            (
                name.to_string(),
                serde_json::json!({ "href": href, "type": "image/tiff" }),
            )
        })
        .collect();

    serde_json::from_value(serde_json::json!({
        "id": id,
        "collection": "sentinel-2-l2a",
        "geometry": {
            "type": "Polygon",
            "coordinates": [[
                [footprint.min_x, footprint.min_y],
                [footprint.max_x, footprint.min_y],
                [footprint.max_x, footprint.max_y],
                [footprint.min_x, footprint.max_y],
                [footprint.min_x, footprint.min_y],
            ]]
        },
        "properties": { "datetime": "2023-01-07T14:37:51Z" },
        "assets": asset_map,
    }))
    .unwrap()
}

/// In-memory catalog returning a fixed item list.
///
/// Records each search's datetime parameter so tests can assert on the
/// query the pipeline issued.
pub struct MockCatalog {
    items: Vec<StacItem>,
    pub searches: Mutex<Vec<String>>,
    fail: bool,
}

impl MockCatalog {
    pub fn new(items: Vec<StacItem>) -> Self {
        Self {
            items,
            searches: Mutex::new(Vec::new()),
            fail: false,
        }
    }

    /// A catalog whose every search fails, for error-path tests.
    pub fn unavailable() -> Self {
        Self {
            items: Vec::new(),
            searches: Mutex::new(Vec::new()),
            fail: true,
        }
    }
}

impl Catalog for MockCatalog {
    fn search(&self, params: &SearchParams) -> ClipResult<Vec<StacItem>> {
        if self.fail {
            return Err(ClipError::CatalogUnavailable("mock outage".to_string()));
        }
        self.searches
            .lock()
            .unwrap()
            .push(params.datetime.clone());
        Ok(self.items.clone())
    }
}

/// Signer appending a recognizable fake token.
pub struct MockSigner;

impl AssetSigner for MockSigner {
    fn sign(&self, href: &str, _collection: &str) -> ClipResult<String> {
        let separator = if href.contains('?') { '&' } else { '?' };
        Ok(format!("{href}{separator}sig=test"))
    }
}

/// Signer whose every request fails, for non-fatal error-path tests.
pub struct FailingSigner;

impl AssetSigner for FailingSigner {
    fn sign(&self, _href: &str, _collection: &str) -> ClipResult<String> {
        Err(ClipError::RemoteIo("mock token service outage".to_string()))
    }
}

