//! GeoTIFF dataset reader.
//!
//! Reads georeferencing from the ModelPixelScale/ModelTiepoint tag pair
//! and the CRS from the GeoKeyDirectory, then serves pixel windows by
//! assembling the overlapping strips or tiles. Sentinel-2 cloud-optimized
//! GeoTIFFs are tiled with pixel-interleaved samples; that is the only
//! planar layout supported here.

use std::io::{Read, Seek};

use clip_common::{ClipError, ClipResult, Crs, GeoTransform, PixelWindow};
use tiff::decoder::{Decoder, DecodingResult};
use tiff::tags::Tag;

use super::{BandData, RasterDataset};

const GEOGRAPHIC_TYPE_KEY: u16 = 2048;
const PROJECTED_CS_TYPE_KEY: u16 = 3072;

/// An open GeoTIFF backed by any seekable byte source.
#[derive(Debug)]
pub struct GeoTiffDataset<R: Read + Seek> {
    decoder: Decoder<R>,
    width: u32,
    height: u32,
    bands: u16,
    transform: GeoTransform,
    crs: Option<Crs>,
}

impl<R: Read + Seek> GeoTiffDataset<R> {
    /// Open a dataset and parse its georeferencing.
    pub fn open(reader: R) -> ClipResult<Self> {
        let mut decoder = Decoder::new(reader)
            .map_err(|e| ClipError::InvalidRaster(format!("not a TIFF: {e}")))?;

        let (width, height) = decoder
            .dimensions()
            .map_err(|e| ClipError::InvalidRaster(format!("dimensions: {e}")))?;

        let bands = match decoder.find_tag(Tag::SamplesPerPixel) {
            Ok(Some(v)) => v
                .into_u16()
                .map_err(|e| ClipError::InvalidRaster(format!("SamplesPerPixel: {e}")))?,
            _ => 1,
        };

        // Band-separate layout never occurs in the assets this reads.
        if let Ok(Some(planar)) = decoder.find_tag(Tag::PlanarConfiguration) {
            let planar = planar
                .into_u16()
                .map_err(|e| ClipError::InvalidRaster(format!("PlanarConfiguration: {e}")))?;
            if planar != 1 {
                return Err(ClipError::InvalidRaster(format!(
                    "unsupported planar configuration {planar}"
                )));
            }
        }

        let transform = read_geotransform(&mut decoder)?;
        let crs = read_crs(&mut decoder);

        Ok(Self {
            decoder,
            width,
            height,
            bands,
            transform,
            crs,
        })
    }
}

fn read_geotransform<R: Read + Seek>(decoder: &mut Decoder<R>) -> ClipResult<GeoTransform> {
    let scale = decoder
        .find_tag(Tag::ModelPixelScaleTag)
        .ok()
        .flatten()
        .ok_or_else(|| ClipError::InvalidRaster("missing ModelPixelScale".to_string()))?
        .into_f64_vec()
        .map_err(|e| ClipError::InvalidRaster(format!("ModelPixelScale: {e}")))?;

    let tiepoint = decoder
        .find_tag(Tag::ModelTiepointTag)
        .ok()
        .flatten()
        .ok_or_else(|| ClipError::InvalidRaster("missing ModelTiepoint".to_string()))?
        .into_f64_vec()
        .map_err(|e| ClipError::InvalidRaster(format!("ModelTiepoint: {e}")))?;

    if scale.len() < 2 || tiepoint.len() < 6 {
        return Err(ClipError::InvalidRaster(
            "truncated georeferencing tags".to_string(),
        ));
    }

    // Tiepoint ties raster (I, J) to model (X, Y); Sentinel assets always
    // tie pixel (0, 0) to the upper-left corner.
    if tiepoint[0] != 0.0 || tiepoint[1] != 0.0 {
        return Err(ClipError::InvalidRaster(format!(
            "unsupported tiepoint at pixel ({}, {})",
            tiepoint[0], tiepoint[1]
        )));
    }

    Ok(GeoTransform {
        origin_x: tiepoint[3],
        pixel_width: scale[0],
        origin_y: tiepoint[4],
        pixel_height: -scale[1],
    })
}

fn read_crs<R: Read + Seek>(decoder: &mut Decoder<R>) -> Option<Crs> {
    let keys = decoder
        .find_tag(Tag::GeoKeyDirectoryTag)
        .ok()
        .flatten()?
        .into_u16_vec()
        .ok()?;

    // [version, revision, minor, count, then 4-u16 key entries]
    if keys.len() < 4 {
        return None;
    }
    let count = keys[3] as usize;
    for entry in keys[4..].chunks_exact(4).take(count) {
        let (key_id, location, value) = (entry[0], entry[1], entry[3]);
        if location == 0 && (key_id == PROJECTED_CS_TYPE_KEY || key_id == GEOGRAPHIC_TYPE_KEY) {
            return Some(Crs::Epsg(value as u32));
        }
    }
    None
}

impl<R: Read + Seek> RasterDataset for GeoTiffDataset<R> {
    fn width(&self) -> u32 {
        self.width
    }

    fn height(&self) -> u32 {
        self.height
    }

    fn band_count(&self) -> u16 {
        self.bands
    }

    fn transform(&self) -> GeoTransform {
        self.transform
    }

    fn crs(&self) -> Option<Crs> {
        self.crs.clone()
    }

    fn read_window(&mut self, window: &PixelWindow) -> ClipResult<BandData> {
        if window.is_empty() {
            return Err(ClipError::InvalidRaster("empty read window".to_string()));
        }
        if window.col_off + window.width > self.width
            || window.row_off + window.height > self.height
        {
            return Err(ClipError::InvalidRaster(format!(
                "window {window:?} exceeds raster {}x{}",
                self.width, self.height
            )));
        }

        let bands = self.bands as usize;
        let samples = (window.width as usize) * (window.height as usize) * bands;

        let (chunk_w, chunk_h) = self.decoder.chunk_dimensions();
        let chunks_across = self.width.div_ceil(chunk_w);

        let first_chunk_col = window.col_off / chunk_w;
        let last_chunk_col = (window.col_off + window.width - 1) / chunk_w;
        let first_chunk_row = window.row_off / chunk_h;
        let last_chunk_row = (window.row_off + window.height - 1) / chunk_h;

        let mut out: Option<BandData> = None;

        for chunk_row in first_chunk_row..=last_chunk_row {
            for chunk_col in first_chunk_col..=last_chunk_col {
                let index = chunk_row * chunks_across + chunk_col;
                let (data_w, data_h) = self.decoder.chunk_data_dimensions(index);
                let chunk = self
                    .decoder
                    .read_chunk(index)
                    .map_err(|e| ClipError::InvalidRaster(format!("chunk {index}: {e}")))?;

                let dst = out.get_or_insert_with(|| match &chunk {
                    DecodingResult::U8(_) => BandData::U8(vec![0; samples]),
                    DecodingResult::U16(_) => BandData::U16(vec![0; samples]),
                    _ => BandData::F32(vec![0.0; samples]),
                });

                copy_chunk_into_window(
                    &chunk,
                    dst,
                    window,
                    chunk_col * chunk_w,
                    chunk_row * chunk_h,
                    data_w,
                    data_h,
                    bands,
                )?;
            }
        }

        out.ok_or_else(|| ClipError::InvalidRaster("no chunks overlapped window".to_string()))
    }
}

/// Copy the overlapping part of one decoded chunk into the output window.
#[allow(clippy::too_many_arguments)]
fn copy_chunk_into_window(
    chunk: &DecodingResult,
    dst: &mut BandData,
    window: &PixelWindow,
    chunk_x0: u32,
    chunk_y0: u32,
    chunk_w: u32,
    chunk_h: u32,
    bands: usize,
) -> ClipResult<()> {
    let win_x0 = window.col_off;
    let win_y0 = window.row_off;
    let win_x1 = window.col_off + window.width;
    let win_y1 = window.row_off + window.height;

    let x0 = win_x0.max(chunk_x0);
    let y0 = win_y0.max(chunk_y0);
    let x1 = win_x1.min(chunk_x0 + chunk_w);
    let y1 = win_y1.min(chunk_y0 + chunk_h);
    if x0 >= x1 || y0 >= y1 {
        return Ok(());
    }

    let run = (x1 - x0) as usize * bands;
    for y in y0..y1 {
        let src_start = ((y - chunk_y0) as usize * chunk_w as usize + (x0 - chunk_x0) as usize)
            * bands;
        let dst_start = ((y - win_y0) as usize * window.width as usize + (x0 - win_x0) as usize)
            * bands;

        match (chunk, &mut *dst) {
            (DecodingResult::U8(src), BandData::U8(out)) => {
                out[dst_start..dst_start + run].copy_from_slice(&src[src_start..src_start + run]);
            }
            (DecodingResult::U16(src), BandData::U16(out)) => {
                out[dst_start..dst_start + run].copy_from_slice(&src[src_start..src_start + run]);
            }
            (DecodingResult::F32(src), BandData::F32(out)) => {
                out[dst_start..dst_start + run].copy_from_slice(&src[src_start..src_start + run]);
            }
            _ => {
                return Err(ClipError::InvalidRaster(
                    "mixed or unsupported sample types across chunks".to_string(),
                ));
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;
    use test_utils::{gradient_u16, gradient_u8, gray16_geotiff, gray8_geotiff, rgb8_geotiff};

    fn transform_10m() -> GeoTransform {
        GeoTransform {
            origin_x: 400000.0,
            pixel_width: 10.0,
            origin_y: 7510000.0,
            pixel_height: -10.0,
        }
    }

    #[test]
    fn test_open_reads_georeferencing() {
        let gt = transform_10m();
        let bytes = gray8_geotiff(64, 32, &gradient_u8(64, 32), &gt, 32719);
        let dataset = GeoTiffDataset::open(Cursor::new(bytes)).unwrap();

        assert_eq!(dataset.width(), 64);
        assert_eq!(dataset.height(), 32);
        assert_eq!(dataset.band_count(), 1);
        assert_eq!(dataset.transform(), gt);
        assert_eq!(dataset.crs(), Some(Crs::Epsg(32719)));
    }

    #[test]
    fn test_read_window_u8() {
        let gt = transform_10m();
        let data = gradient_u8(64, 32);
        let bytes = gray8_geotiff(64, 32, &data, &gt, 32719);
        let mut dataset = GeoTiffDataset::open(Cursor::new(bytes)).unwrap();

        let window = PixelWindow {
            col_off: 10,
            row_off: 5,
            width: 8,
            height: 4,
        };
        let BandData::U8(out) = dataset.read_window(&window).unwrap() else {
            panic!("expected u8 samples");
        };

        assert_eq!(out.len(), 32);
        for row in 0..4u32 {
            for col in 0..8u32 {
                let expected = data[((row + 5) * 64 + col + 10) as usize];
                assert_eq!(out[(row * 8 + col) as usize], expected);
            }
        }
    }

    #[test]
    fn test_read_window_u16_full_extent() {
        let gt = transform_10m();
        let data = gradient_u16(16, 16);
        let bytes = gray16_geotiff(16, 16, &data, &gt, 32719);
        let mut dataset = GeoTiffDataset::open(Cursor::new(bytes)).unwrap();

        let window = PixelWindow {
            col_off: 0,
            row_off: 0,
            width: 16,
            height: 16,
        };
        let BandData::U16(out) = dataset.read_window(&window).unwrap() else {
            panic!("expected u16 samples");
        };
        assert_eq!(out, data);
    }

    #[test]
    fn test_read_window_rgb_interleaved() {
        let gt = transform_10m();
        let mut data = Vec::new();
        for row in 0..8u32 {
            for col in 0..8u32 {
                data.extend_from_slice(&[col as u8, row as u8, 200]);
            }
        }
        let bytes = rgb8_geotiff(8, 8, &data, &gt, 32719);
        let mut dataset = GeoTiffDataset::open(Cursor::new(bytes)).unwrap();
        assert_eq!(dataset.band_count(), 3);

        let window = PixelWindow {
            col_off: 2,
            row_off: 3,
            width: 2,
            height: 1,
        };
        let BandData::U8(out) = dataset.read_window(&window).unwrap() else {
            panic!("expected u8 samples");
        };
        assert_eq!(out, vec![2, 3, 200, 3, 3, 200]);
    }

    #[test]
    fn test_window_exceeding_raster_rejected() {
        let gt = transform_10m();
        let bytes = gray8_geotiff(8, 8, &gradient_u8(8, 8), &gt, 32719);
        let mut dataset = GeoTiffDataset::open(Cursor::new(bytes)).unwrap();

        let window = PixelWindow {
            col_off: 4,
            row_off: 4,
            width: 8,
            height: 8,
        };
        assert!(matches!(
            dataset.read_window(&window).unwrap_err(),
            ClipError::InvalidRaster(_)
        ));
    }

    #[test]
    fn test_non_tiff_rejected() {
        let result = GeoTiffDataset::open(Cursor::new(b"not a tiff at all".to_vec()));
        assert!(matches!(result.unwrap_err(), ClipError::InvalidRaster(_)));
    }
}
