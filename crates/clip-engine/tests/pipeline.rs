//! End-to-end pipeline tests over an in-memory catalog and raster store.

use std::collections::HashMap;
use std::io::Cursor;
use std::path::Path;

use clip_common::{BoundingBox, ClipError, ClipResult, Crs, GeoTransform, QueryRegion, TimeRange};
use clip_engine::{
    run_pipeline, ClipEngine, GeoTiffDataset, PipelineConfig, RasterDataset, RasterOpener,
};
use test_utils::{gradient_u16, gray16_geotiff, item_with_footprint, rgb8_geotiff, scl_geotiff,
    MockCatalog, MockSigner};

struct MapOpener {
    store: HashMap<String, Vec<u8>>,
}

impl RasterOpener for MapOpener {
    fn open(&self, href: &str) -> ClipResult<Box<dyn RasterDataset>> {
        let key = href.split('?').next().unwrap_or(href);
        let bytes = self
            .store
            .get(key)
            .cloned()
            .ok_or_else(|| ClipError::RemoteIo(format!("{key}: not found")))?;
        Ok(Box::new(GeoTiffDataset::open(Cursor::new(bytes))?))
    }
}

/// The reference query region: PSAD56 / UTM 19S coordinates.
fn reference_region() -> QueryRegion {
    QueryRegion::new(
        BoundingBox::new(407500.0, 7494500.0, 415200.0, 7505700.0),
        Crs::Epsg(24879),
    )
    .unwrap()
}

fn january_2023() -> TimeRange {
    TimeRange::new(
        chrono::NaiveDate::from_ymd_opt(2023, 1, 1).unwrap(),
        Some(chrono::NaiveDate::from_ymd_opt(2023, 1, 31).unwrap()),
    )
}

/// Scene-sized footprint that fully contains the reference region.
fn scene_footprint() -> BoundingBox {
    BoundingBox::new(-70.0, -23.5, -68.0, -21.5)
}

/// 100 m rasters in WGS84 / UTM 19S covering x 400000..440000,
/// y 7480000..7520000, comfortably around the reference region even
/// after the PSAD56 datum shift.
fn scene_transform() -> GeoTransform {
    GeoTransform {
        origin_x: 400000.0,
        pixel_width: 100.0,
        origin_y: 7520000.0,
        pixel_height: -100.0,
    }
}

fn band_raster() -> Vec<u8> {
    gray16_geotiff(400, 400, &gradient_u16(400, 400), &scene_transform(), 32719)
}

fn visual_raster() -> Vec<u8> {
    let mut rgb = Vec::with_capacity(400 * 400 * 3);
    for row in 0..400u32 {
        for col in 0..400u32 {
            rgb.extend_from_slice(&[(col % 256) as u8, (row % 256) as u8, 128]);
        }
    }
    rgb8_geotiff(400, 400, &rgb, &scene_transform(), 32719)
}

fn scl_raster(cloudy: usize) -> Vec<u8> {
    scl_geotiff(400, 400, cloudy, &scene_transform(), 32719)
}

struct Scene {
    id: &'static str,
    cloudy_pixels: usize,
}

fn build_fixtures(scenes: &[Scene]) -> (MockCatalog, ClipEngine) {
    let mut store = HashMap::new();
    let mut items = Vec::new();

    for scene in scenes {
        let visual_href = format!("https://example.blob/{}/visual.tif", scene.id);
        let b04_href = format!("https://example.blob/{}/B04.tif", scene.id);
        let scl_href = format!("https://example.blob/{}/SCL.tif", scene.id);

        store.insert(visual_href.clone(), visual_raster());
        store.insert(b04_href.clone(), band_raster());
        store.insert(scl_href.clone(), scl_raster(scene.cloudy_pixels));

        items.push(item_with_footprint(
            scene.id,
            scene_footprint(),
            &[
                ("visual", visual_href.as_str()),
                ("B04", b04_href.as_str()),
                ("SCL", scl_href.as_str()),
            ],
        ));
    }

    let catalog = MockCatalog::new(items);
    let engine = ClipEngine::new(MapOpener { store }, MockSigner);
    (catalog, engine)
}

fn config(output_dir: &Path, max_cloud_pct: Option<f64>) -> PipelineConfig {
    PipelineConfig {
        region: reference_region(),
        time_range: january_2023(),
        collection: "sentinel-2-l2a".to_string(),
        assets: vec!["visual".to_string(), "B04".to_string()],
        prefix: "timelapse".to_string(),
        output_dir: output_dir.to_path_buf(),
        max_cloud_pct,
    }
}

#[test]
fn clear_scenes_are_clipped_per_asset() {
    let (catalog, engine) = build_fixtures(&[
        Scene {
            id: "S2A_MSIL2A_20230107T143751_N0509_R096_T19KCP_20230107T183130",
            cloudy_pixels: 0,
        },
        Scene {
            id: "S2B_MSIL2A_20230112T143749_N0509_R096_T19KCP_20230112T174057",
            cloudy_pixels: 0,
        },
    ]);

    let dir = tempfile::tempdir().unwrap();
    let stats = run_pipeline(&catalog, &engine, &config(dir.path(), Some(10.0))).unwrap();

    assert_eq!(stats.total_images, 2);
    assert_eq!(stats.cloud_filtered, 0);
    assert_eq!(stats.asset_counts.get("visual"), Some(&2));
    assert_eq!(stats.asset_counts.get("B04"), Some(&2));

    let visual = dir
        .path()
        .join("timelapse/visual/timelapse_visual_20230107T143751.tif");
    let b04 = dir
        .path()
        .join("timelapse/B04/timelapse_B04_20230112T143749.tif");
    assert!(visual.exists());
    assert!(b04.exists());

    // outputs are readable GeoTIFF headers
    let bytes = std::fs::read(&visual).unwrap();
    assert_eq!(&bytes[..4], &[0x49, 0x49, 0x2A, 0x00]);
}

#[test]
fn cloudy_scene_is_filtered_out() {
    // every classification pixel in the second scene is cloud
    let (catalog, engine) = build_fixtures(&[
        Scene {
            id: "S2A_MSIL2A_20230107T143751_N0509_R096_T19KCP_20230107T183130",
            cloudy_pixels: 0,
        },
        Scene {
            id: "S2B_MSIL2A_20230112T143749_N0509_R096_T19KCP_20230112T174057",
            cloudy_pixels: 160_000,
        },
    ]);

    let dir = tempfile::tempdir().unwrap();
    let stats = run_pipeline(&catalog, &engine, &config(dir.path(), Some(10.0))).unwrap();

    // both acquisitions count as found; only one survives the filter
    assert_eq!(stats.total_images, 2);
    assert_eq!(stats.cloud_filtered, 1);
    assert_eq!(stats.asset_counts.get("visual"), Some(&1));
    assert_eq!(stats.asset_counts.get("B04"), Some(&1));
}

#[test]
fn all_cloudy_run_keeps_found_count_and_directories() {
    let (catalog, engine) = build_fixtures(&[
        Scene {
            id: "S2A_MSIL2A_20230107T143751_N0509_R096_T19KCP_20230107T183130",
            cloudy_pixels: 160_000,
        },
        Scene {
            id: "S2B_MSIL2A_20230112T143749_N0509_R096_T19KCP_20230112T174057",
            cloudy_pixels: 160_000,
        },
    ]);

    let dir = tempfile::tempdir().unwrap();
    let stats = run_pipeline(&catalog, &engine, &config(dir.path(), Some(10.0))).unwrap();

    assert_eq!(stats.total_images, 2);
    assert_eq!(stats.cloud_filtered, 2);
    assert_eq!(stats.asset_counts.get("visual"), Some(&0));
    assert_eq!(stats.asset_counts.get("B04"), Some(&0));

    // the output skeleton exists even though nothing was written
    assert!(dir.path().join("timelapse/visual").is_dir());
    assert!(dir.path().join("timelapse/B04").is_dir());
}

#[test]
fn cloud_filter_disabled_admits_everything() {
    let (catalog, engine) = build_fixtures(&[Scene {
        id: "S2B_MSIL2A_20230112T143749_N0509_R096_T19KCP_20230112T174057",
        cloudy_pixels: 160_000,
    }]);

    let dir = tempfile::tempdir().unwrap();
    let stats = run_pipeline(&catalog, &engine, &config(dir.path(), None)).unwrap();

    assert_eq!(stats.total_images, 1);
    assert_eq!(stats.cloud_filtered, 0);
}

#[test]
fn missing_scl_fails_open() {
    // item advertises no SCL asset at all
    let visual_href = "https://example.blob/noscl/visual.tif";
    let b04_href = "https://example.blob/noscl/B04.tif";
    let mut store = HashMap::new();
    store.insert(visual_href.to_string(), visual_raster());
    store.insert(b04_href.to_string(), band_raster());

    let item = item_with_footprint(
        "S2A_MSIL2A_20230107T143751_N0509_R096_T19KCP_20230107T183130",
        scene_footprint(),
        &[("visual", visual_href), ("B04", b04_href)],
    );

    let catalog = MockCatalog::new(vec![item]);
    let engine = ClipEngine::new(MapOpener { store }, MockSigner);

    let dir = tempfile::tempdir().unwrap();
    let stats = run_pipeline(&catalog, &engine, &config(dir.path(), Some(10.0))).unwrap();

    assert_eq!(stats.total_images, 1);
    assert_eq!(stats.cloud_filtered, 0);
}

#[test]
fn partial_footprint_is_dropped_by_containment() {
    let (_, engine) = build_fixtures(&[]);

    // footprint too small to contain the query region
    let item = item_with_footprint(
        "S2A_MSIL2A_20230107T143751_N0509_R096_T19KCP_20230107T183130",
        BoundingBox::new(-68.85, -22.62, -68.84, -22.61),
        &[],
    );
    let catalog = MockCatalog::new(vec![item]);

    let dir = tempfile::tempdir().unwrap();
    let stats = run_pipeline(&catalog, &engine, &config(dir.path(), Some(10.0))).unwrap();

    assert_eq!(stats.total_images, 0);
    assert_eq!(stats.asset_counts.get("visual"), Some(&0));
}

#[test]
fn rerun_overwrites_instead_of_duplicating() {
    let (catalog, engine) = build_fixtures(&[Scene {
        id: "S2A_MSIL2A_20230107T143751_N0509_R096_T19KCP_20230107T183130",
        cloudy_pixels: 0,
    }]);

    let dir = tempfile::tempdir().unwrap();
    let first = run_pipeline(&catalog, &engine, &config(dir.path(), Some(10.0))).unwrap();
    let second = run_pipeline(&catalog, &engine, &config(dir.path(), Some(10.0))).unwrap();

    assert_eq!(first, second);

    let visual_dir = dir.path().join("timelapse/visual");
    let files: Vec<_> = std::fs::read_dir(&visual_dir).unwrap().collect();
    assert_eq!(files.len(), 1);
}

#[test]
fn catalog_outage_is_fatal() {
    let (_, engine) = build_fixtures(&[]);
    let catalog = MockCatalog::unavailable();

    let dir = tempfile::tempdir().unwrap();
    let err = run_pipeline(&catalog, &engine, &config(dir.path(), Some(10.0))).unwrap_err();
    assert!(matches!(err, ClipError::CatalogUnavailable(_)));
}

#[test]
fn search_uses_requested_interval() {
    let (catalog, engine) = build_fixtures(&[]);
    let dir = tempfile::tempdir().unwrap();
    run_pipeline(&catalog, &engine, &config(dir.path(), None)).unwrap();

    let searches = catalog.searches.lock().unwrap();
    assert_eq!(searches.as_slice(), ["2023-01-01/2023-01-31"]);
}
