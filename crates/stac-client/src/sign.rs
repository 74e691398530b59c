//! Asset href signing.
//!
//! Planetary Computer assets live in private blob storage; reading them
//! requires a shared-access signature appended to the href as a query
//! string. Tokens are scoped per collection and expire, so the signer
//! caches one token per collection and refreshes shortly before expiry.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use chrono::{DateTime, Utc};
use clip_common::{ClipError, ClipResult};
use serde::Deserialize;
use tracing::debug;

/// Default token endpoint (Microsoft Planetary Computer).
pub const DEFAULT_SAS_URL: &str = "https://planetarycomputer.microsoft.com/api/sas/v1";

/// Refresh margin before token expiry.
const EXPIRY_SLACK_SECS: i64 = 60;

/// Rewrites asset hrefs so they are readable by the raster layer.
pub trait AssetSigner {
    fn sign(&self, href: &str, collection: &str) -> ClipResult<String>;
}

/// Pass-through signer for catalogs whose assets are publicly readable.
pub struct NoopSigner;

impl AssetSigner for NoopSigner {
    fn sign(&self, href: &str, _collection: &str) -> ClipResult<String> {
        Ok(href.to_string())
    }
}

#[derive(Debug, Deserialize)]
struct SasTokenResponse {
    token: String,
    #[serde(rename = "msft:expiry")]
    expiry: DateTime<Utc>,
}

/// Signer backed by the Planetary Computer SAS token service.
pub struct PlanetaryComputerSigner {
    client: reqwest::blocking::Client,
    token_url: String,
    cache: Mutex<HashMap<String, SasTokenResponse>>,
}

impl PlanetaryComputerSigner {
    pub fn new(token_url: impl Into<String>) -> ClipResult<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| ClipError::RemoteIo(format!("HTTP client: {e}")))?;

        Ok(Self {
            client,
            token_url: token_url.into().trim_end_matches('/').to_string(),
            cache: Mutex::new(HashMap::new()),
        })
    }

    fn fetch_token(&self, collection: &str) -> ClipResult<SasTokenResponse> {
        let url = format!("{}/token/{}", self.token_url, collection);
        debug!(url = %url, "Fetching SAS token");

        let response = self
            .client
            .get(&url)
            .send()
            .map_err(|e| ClipError::RemoteIo(format!("{url}: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ClipError::RemoteIo(format!("{url}: HTTP {status}")));
        }

        response
            .json()
            .map_err(|e| ClipError::RemoteIo(format!("{url}: invalid token response: {e}")))
    }

    fn current_token(&self, collection: &str) -> ClipResult<String> {
        let mut cache = self
            .cache
            .lock()
            .map_err(|_| ClipError::RemoteIo("token cache poisoned".to_string()))?;

        let fresh_until = Utc::now() + chrono::Duration::seconds(EXPIRY_SLACK_SECS);
        if let Some(cached) = cache.get(collection) {
            if cached.expiry > fresh_until {
                return Ok(cached.token.clone());
            }
        }

        let token = self.fetch_token(collection)?;
        let value = token.token.clone();
        cache.insert(collection.to_string(), token);
        Ok(value)
    }
}

impl AssetSigner for PlanetaryComputerSigner {
    fn sign(&self, href: &str, collection: &str) -> ClipResult<String> {
        let token = self.current_token(collection)?;
        let separator = if href.contains('?') { '&' } else { '?' };
        Ok(format!("{href}{separator}{token}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_noop_signer_passthrough() {
        let signer = NoopSigner;
        let href = "https://example.blob.core.windows.net/tile.tif";
        assert_eq!(signer.sign(href, "sentinel-2-l2a").unwrap(), href);
    }

    #[test]
    fn test_token_response_deserializes() {
        let parsed: SasTokenResponse = serde_json::from_value(serde_json::json!({
            "token": "se=2023-01-08T00%3A00%3A00Z&sig=abc",
            "msft:expiry": "2023-01-08T00:00:00Z"
        }))
        .unwrap();
        assert!(parsed.token.starts_with("se="));
    }
}
