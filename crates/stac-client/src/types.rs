//! STAC item and asset representations.
//!
//! Only the fields the pipeline consumes are modeled; everything else in
//! `properties` rides along as raw JSON so provenance tags can quote it.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A single asset (file) belonging to a STAC item.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StacAsset {
    pub href: String,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub media_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
}

/// One acquisition returned by a catalog search.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StacItem {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub collection: Option<String>,
    pub geometry: geojson::Geometry,
    #[serde(default)]
    pub properties: serde_json::Value,
    #[serde(default)]
    pub assets: HashMap<String, StacAsset>,
}

impl StacItem {
    /// The acquisition timestamp from item properties, when present.
    pub fn datetime(&self) -> Option<&str> {
        self.properties.get("datetime").and_then(|v| v.as_str())
    }

    /// The capture token used in output filenames.
    ///
    /// Sentinel-2 item ids look like `S2A_MSIL2A_20230107T143751_...`;
    /// the third underscore-separated field is the capture timestamp.
    /// Ids without a third field yield `None`.
    pub fn capture_token(&self) -> Option<&str> {
        self.id.split('_').nth(2)
    }
}

/// A hypermedia link in a STAC search response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StacLink {
    pub rel: String,
    pub href: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub method: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<serde_json::Value>,
}

/// One page of a STAC item search.
#[derive(Debug, Clone, Deserialize)]
pub struct SearchResponse {
    pub features: Vec<StacItem>,
    #[serde(default)]
    pub links: Vec<StacLink>,
}

impl SearchResponse {
    /// The pagination link for the next page, if the catalog provided one.
    pub fn next_link(&self) -> Option<&StacLink> {
        self.links.iter().find(|l| l.rel == "next")
    }
}
