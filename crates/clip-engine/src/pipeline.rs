//! End-to-end acquisition selection and clipping.
//!
//! Search the catalog for everything touching the query region, keep the
//! acquisitions whose footprint fully contains it, admit them through the
//! cloud filter, then clip every requested asset to disk.

use std::collections::BTreeMap;
use std::path::PathBuf;

use clip_common::{to_wgs84_geojson, to_wgs84_polygon, ClipResult, QueryRegion, TimeRange};
use serde::Serialize;
use stac_client::{filter_by_containment, Catalog, SearchParams, StacItem};
use tracing::{info, warn};

use crate::cloud::{cloud_fraction, SCL_ASSET};
use crate::engine::ClipEngine;

/// Everything one pipeline run needs.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub region: QueryRegion,
    pub time_range: TimeRange,
    pub collection: String,
    /// Asset names to clip for each admitted acquisition.
    pub assets: Vec<String>,
    /// Output file prefix, also the name of the run's output directory.
    pub prefix: String,
    pub output_dir: PathBuf,
    /// Maximum admissible cloud percentage over the query region.
    /// `None` disables cloud filtering entirely.
    pub max_cloud_pct: Option<f64>,
}

/// Counters reported at the end of a run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PipelineStats {
    /// Acquisitions whose footprint contains the query region.
    pub total_images: usize,
    /// Acquisitions rejected by the cloud filter.
    pub cloud_filtered: usize,
    /// Clips successfully written, per asset name.
    pub asset_counts: BTreeMap<String, usize>,
}

/// Run the full pipeline and return its counters.
pub fn run_pipeline(
    catalog: &dyn Catalog,
    engine: &ClipEngine,
    config: &PipelineConfig,
) -> ClipResult<PipelineStats> {
    let intersects = to_wgs84_geojson(&config.region.crs, &config.region.bounds)?;
    let query_polygon = to_wgs84_polygon(&config.region.crs, &config.region.bounds)?;

    let items = catalog.search(&SearchParams {
        collection: config.collection.clone(),
        intersects,
        datetime: config.time_range.as_stac_datetime(),
    })?;
    let found = items.len();

    let contained = filter_by_containment(items, &query_polygon)?;
    info!(
        found = found,
        contained = contained.len(),
        "Catalog results after containment filter"
    );

    let mut stats = PipelineStats {
        total_images: contained.len(),
        ..PipelineStats::default()
    };
    for asset in &config.assets {
        stats.asset_counts.insert(asset.clone(), 0);
        std::fs::create_dir_all(config.output_dir.join(&config.prefix).join(asset))?;
    }

    for item in &contained {
        if let Some(max_pct) = config.max_cloud_pct {
            match evaluate_cloud_pct(engine, item, &config.region)? {
                Some(pct) if pct > max_pct => {
                    info!(item = %item.id, cloud_pct = pct, "Rejected by cloud filter");
                    stats.cloud_filtered += 1;
                    continue;
                }
                Some(pct) => {
                    info!(item = %item.id, cloud_pct = pct, "Admitted");
                }
                // Fail open: without a usable classification layer the
                // acquisition is admitted rather than silently dropped.
                None => {
                    warn!(item = %item.id, "No usable classification layer, admitting");
                }
            }
        }

        let Some(token) = item.capture_token() else {
            warn!(item = %item.id, "Cannot derive capture token from id, skipping clips");
            continue;
        };

        for asset in &config.assets {
            let dir = config.output_dir.join(&config.prefix).join(asset);
            let path = dir.join(format!("{}_{}_{}.tif", config.prefix, asset, token));

            if engine.clip_to_file(item, asset, &config.region, &path)?.is_some() {
                if let Some(count) = stats.asset_counts.get_mut(asset) {
                    *count += 1;
                }
            }
        }
    }

    info!(
        total_images = stats.total_images,
        cloud_filtered = stats.cloud_filtered,
        "Pipeline run complete"
    );
    Ok(stats)
}

/// Cloud percentage of the query region for one acquisition.
///
/// `None` means the classification layer is missing or unreadable; the
/// caller admits the acquisition in that case.
fn evaluate_cloud_pct(
    engine: &ClipEngine,
    item: &StacItem,
    region: &QueryRegion,
) -> ClipResult<Option<f64>> {
    if !item.assets.contains_key(SCL_ASSET) {
        return Ok(None);
    }

    match engine.clip(item, SCL_ASSET, region)? {
        Some(clip) => Ok(cloud_fraction(&clip.data)),
        None => Ok(None),
    }
}
