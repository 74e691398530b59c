//! STAC API search client.

use std::time::Duration;

use clip_common::{ClipError, ClipResult};
use tracing::{debug, info};

use crate::types::{SearchResponse, StacItem, StacLink};

/// Default public catalog endpoint (Microsoft Planetary Computer).
pub const DEFAULT_STAC_URL: &str = "https://planetarycomputer.microsoft.com/api/stac/v1";

/// Default collection queried when the caller does not specify one.
pub const DEFAULT_COLLECTION: &str = "sentinel-2-l2a";

/// Page size requested per search call.
const PAGE_LIMIT: usize = 100;

/// Safety cap on pagination; a catalog that keeps emitting next links
/// past this point is misbehaving.
const MAX_PAGES: usize = 100;

/// An item search source.
///
/// The production implementation talks to a STAC API over HTTP; tests
/// substitute an in-memory catalog.
pub trait Catalog {
    fn search(&self, params: &SearchParams) -> ClipResult<Vec<StacItem>>;
}

/// Parameters for a catalog item search.
#[derive(Debug, Clone)]
pub struct SearchParams {
    pub collection: String,
    /// Search geometry in WGS84.
    pub intersects: geojson::Geometry,
    /// STAC datetime interval, e.g. "2023-01-01/2023-01-31".
    pub datetime: String,
}

/// Blocking STAC API client with next-link pagination.
pub struct StacApiClient {
    client: reqwest::blocking::Client,
    base_url: String,
}

impl StacApiClient {
    /// Create a client for the given STAC API root URL.
    pub fn new(base_url: impl Into<String>) -> ClipResult<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(60))
            .connect_timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| ClipError::CatalogUnavailable(format!("HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    fn post_search(&self, url: &str, body: &serde_json::Value) -> ClipResult<SearchResponse> {
        let response = self
            .client
            .post(url)
            .json(body)
            .send()
            .map_err(|e| ClipError::CatalogUnavailable(format!("{url}: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ClipError::CatalogUnavailable(format!(
                "{url}: HTTP {status}"
            )));
        }

        response
            .json()
            .map_err(|e| ClipError::CatalogUnavailable(format!("{url}: invalid response: {e}")))
    }

    fn get_page(&self, url: &str) -> ClipResult<SearchResponse> {
        let response = self
            .client
            .get(url)
            .send()
            .map_err(|e| ClipError::CatalogUnavailable(format!("{url}: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ClipError::CatalogUnavailable(format!(
                "{url}: HTTP {status}"
            )));
        }

        response
            .json()
            .map_err(|e| ClipError::CatalogUnavailable(format!("{url}: invalid response: {e}")))
    }

    /// Fetch the page referenced by a pagination link.
    ///
    /// STAC APIs either carry a POST body in the link (Planetary Computer
    /// style, with a continuation token) or a plain GET href.
    fn follow_link(&self, link: &StacLink) -> ClipResult<SearchResponse> {
        match (&link.method, &link.body) {
            (Some(method), Some(body)) if method.eq_ignore_ascii_case("POST") => {
                self.post_search(&link.href, body)
            }
            (_, Some(body)) => self.post_search(&link.href, body),
            _ => self.get_page(&link.href),
        }
    }
}

impl Catalog for StacApiClient {
    fn search(&self, params: &SearchParams) -> ClipResult<Vec<StacItem>> {
        let search_url = format!("{}/search", self.base_url);
        let body = serde_json::json!({
            "collections": [&params.collection],
            "intersects": &params.intersects,
            "datetime": &params.datetime,
            "limit": PAGE_LIMIT,
        });

        debug!(
            url = %search_url,
            collection = %params.collection,
            datetime = %params.datetime,
            "Searching catalog"
        );

        let mut page = self.post_search(&search_url, &body)?;
        let mut items = Vec::new();
        let mut pages = 1;

        loop {
            items.extend(page.features.drain(..));

            let Some(next) = page.next_link().cloned() else {
                break;
            };
            if pages >= MAX_PAGES {
                return Err(ClipError::CatalogUnavailable(format!(
                    "pagination exceeded {MAX_PAGES} pages"
                )));
            }

            page = self.follow_link(&next)?;
            pages += 1;
        }

        info!(
            collection = %params.collection,
            items = items.len(),
            pages = pages,
            "Catalog search complete"
        );

        Ok(items)
    }
}
