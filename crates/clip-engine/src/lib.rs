//! Acquisition clipping: raster access, cloud admission, windowed
//! extraction, and the end-to-end selection pipeline.

pub mod cloud;
pub mod engine;
pub mod pipeline;
pub mod raster;

pub use cloud::{cloud_fraction, SCL_ASSET};
pub use engine::{ClipData, ClipEngine};
pub use pipeline::{run_pipeline, PipelineConfig, PipelineStats};
pub use raster::{BandData, DefaultOpener, GeoTiffDataset, RasterDataset, RasterOpener};
