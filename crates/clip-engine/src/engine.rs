//! Windowed clipping of catalog assets.

use std::path::{Path, PathBuf};

use clip_common::{transform_bounds, ClipError, ClipResult, Crs, GeoTransform, QueryRegion};
use stac_client::client::DEFAULT_COLLECTION;
use stac_client::{AssetSigner, StacItem};
use tracing::{debug, warn};

use crate::raster::{writer, BandData, RasterOpener};

/// A clipped raster window with everything needed to write it out.
#[derive(Debug, Clone)]
pub struct ClipData {
    pub data: BandData,
    pub bands: u16,
    pub width: u32,
    pub height: u32,
    pub transform: GeoTransform,
    pub crs: Crs,
    /// Provenance tags carried into the output file.
    pub tags: Vec<(String, String)>,
}

/// Clips pixel windows out of acquisition assets.
///
/// A missing asset name is a configuration mistake and propagates as an
/// error; everything that can go wrong with one particular acquisition
/// (transport failures, bounds outside the scene, a corrupt file) is
/// logged and reported as "no result" so batch runs survive it.
pub struct ClipEngine {
    opener: Box<dyn RasterOpener>,
    signer: Box<dyn AssetSigner>,
}

impl ClipEngine {
    pub fn new(
        opener: impl RasterOpener + 'static,
        signer: impl AssetSigner + 'static,
    ) -> Self {
        Self {
            opener: Box::new(opener),
            signer: Box::new(signer),
        }
    }

    /// Clip one asset of one acquisition to the query region.
    ///
    /// Returns `Ok(None)` when this acquisition cannot be clipped for a
    /// per-acquisition reason; see [`ClipError::is_fatal`].
    pub fn clip(
        &self,
        item: &StacItem,
        asset: &str,
        region: &QueryRegion,
    ) -> ClipResult<Option<ClipData>> {
        match self.clip_inner(item, asset, region) {
            Ok(data) => Ok(Some(data)),
            Err(e) if e.is_fatal() => Err(e),
            Err(e) => {
                warn!(item = %item.id, asset = %asset, error = %e, "Skipping asset");
                Ok(None)
            }
        }
    }

    /// Clip one asset and write the result to `path`.
    pub fn clip_to_file(
        &self,
        item: &StacItem,
        asset: &str,
        region: &QueryRegion,
        path: &Path,
    ) -> ClipResult<Option<PathBuf>> {
        let Some(clip) = self.clip(item, asset, region)? else {
            return Ok(None);
        };

        writer::write_geotiff_file(
            path,
            &clip.data,
            clip.bands,
            clip.width,
            clip.height,
            &clip.transform,
            &clip.crs,
            &clip.tags,
        )?;

        debug!(
            item = %item.id,
            asset = %asset,
            path = %path.display(),
            width = clip.width,
            height = clip.height,
            "Wrote clip"
        );
        Ok(Some(path.to_path_buf()))
    }

    fn clip_inner(
        &self,
        item: &StacItem,
        asset: &str,
        region: &QueryRegion,
    ) -> ClipResult<ClipData> {
        let href = item
            .assets
            .get(asset)
            .map(|a| a.href.clone())
            .ok_or_else(|| ClipError::UnknownAsset(asset.to_string()))?;

        let collection = item.collection.as_deref().unwrap_or(DEFAULT_COLLECTION);
        let signed = self.signer.sign(&href, collection)?;

        let mut dataset = self.opener.open(&signed)?;

        let dataset_crs = dataset
            .crs()
            .ok_or_else(|| ClipError::InvalidRaster(format!("{href}: no CRS declared")))?;
        // A CRS the raster declares but we cannot resolve is that
        // raster's problem, not the caller's.
        dataset_crs
            .resolve()
            .map_err(|e| ClipError::InvalidRaster(format!("{href}: {e}")))?;

        let target_bounds = transform_bounds(&region.crs, &dataset_crs, &region.bounds)?;
        let extent = dataset.transform().extent(dataset.width(), dataset.height());

        if !target_bounds.intersects(&extent) {
            return Err(ClipError::BoundsOutsideExtent {
                requested: target_bounds.to_string(),
                extent: extent.to_string(),
            });
        }

        // intersects() just passed, so the intersection is non-empty
        let clipped = target_bounds.intersection(&extent).unwrap_or(target_bounds);
        let window =
            dataset
                .transform()
                .window_from_bounds(&clipped, dataset.width(), dataset.height())?;
        if window.is_empty() {
            return Err(ClipError::BoundsOutsideExtent {
                requested: target_bounds.to_string(),
                extent: extent.to_string(),
            });
        }

        let data = dataset.read_window(&window)?;
        let transform = dataset.transform().window_transform(&window);

        let mut tags = vec![(
            "description".to_string(),
            format!("{asset} clipped from {}", item.id),
        )];
        if let Some(datetime) = item.datetime() {
            tags.push(("creation_date".to_string(), datetime.to_string()));
        }
        tags.push(("source".to_string(), "Sentinel-2".to_string()));
        tags.push(("href".to_string(), href));

        Ok(ClipData {
            data,
            bands: dataset.band_count(),
            width: window.width,
            height: window.height,
            transform,
            crs: dataset_crs,
            tags,
        })
    }
}
