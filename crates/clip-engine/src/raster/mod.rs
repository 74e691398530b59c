//! Raster dataset access.
//!
//! Datasets are addressed by href and read through the [`RasterDataset`]
//! trait so the clipping engine never cares whether pixels come from a
//! remote object store or a local file. The only concrete format is
//! GeoTIFF, which covers every Sentinel-2 asset.

mod geotiff;
mod http;
pub mod writer;

pub use geotiff::GeoTiffDataset;
pub use http::HttpRangeReader;

use std::fs::File;
use std::io::BufReader;

use clip_common::{ClipError, ClipResult, Crs, GeoTransform, PixelWindow};

/// Pixel-interleaved window data in the dataset's native sample type.
#[derive(Debug, Clone, PartialEq)]
pub enum BandData {
    U8(Vec<u8>),
    U16(Vec<u16>),
    F32(Vec<f32>),
}

impl BandData {
    /// Total sample count (pixels x bands).
    pub fn len(&self) -> usize {
        match self {
            BandData::U8(v) => v.len(),
            BandData::U16(v) => v.len(),
            BandData::F32(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Bits per sample for the TIFF header.
    pub fn bits_per_sample(&self) -> u16 {
        match self {
            BandData::U8(_) => 8,
            BandData::U16(_) => 16,
            BandData::F32(_) => 32,
        }
    }

    /// TIFF SampleFormat code: 1 = unsigned integer, 3 = IEEE float.
    pub fn sample_format(&self) -> u16 {
        match self {
            BandData::U8(_) | BandData::U16(_) => 1,
            BandData::F32(_) => 3,
        }
    }
}

/// An open georeferenced raster.
pub trait RasterDataset {
    fn width(&self) -> u32;
    fn height(&self) -> u32;
    fn band_count(&self) -> u16;
    /// Affine georeferencing of the full raster.
    fn transform(&self) -> GeoTransform;
    /// The raster's CRS, when the file declares one.
    fn crs(&self) -> Option<Crs>;
    /// Read a pixel window as interleaved samples.
    fn read_window(&mut self, window: &PixelWindow) -> ClipResult<BandData>;
}

/// Opens rasters by href.
pub trait RasterOpener {
    fn open(&self, href: &str) -> ClipResult<Box<dyn RasterDataset>>;
}

/// Opener dispatching on href scheme: HTTP(S) hrefs are read with ranged
/// requests, anything else is treated as a local path.
pub struct DefaultOpener;

impl RasterOpener for DefaultOpener {
    fn open(&self, href: &str) -> ClipResult<Box<dyn RasterDataset>> {
        if href.starts_with("http://") || href.starts_with("https://") {
            let reader = HttpRangeReader::open(href)?;
            Ok(Box::new(GeoTiffDataset::open(reader)?))
        } else {
            let file = File::open(href).map_err(|e| {
                ClipError::RemoteIo(format!("{href}: {e}"))
            })?;
            Ok(Box::new(GeoTiffDataset::open(BufReader::new(file))?))
        }
    }
}
