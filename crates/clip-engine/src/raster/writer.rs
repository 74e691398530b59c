//! GeoTIFF output.
//!
//! Clipped windows are written as tiled, deflate-compressed,
//! band-separated GeoTIFFs: one zlib tile per band, georeferencing via
//! the ModelPixelScale/ModelTiepoint pair and a GeoKeyDirectory, and
//! provenance strings in GDAL's metadata tag so downstream tooling can
//! trace every file back to its source acquisition.

use std::fs::File;
use std::io::{BufWriter, Seek, Write};
use std::path::Path;

use clip_common::{ClipError, ClipResult, Crs, GeoTransform};
use flate2::write::ZlibEncoder;
use flate2::Compression;
use tiff::encoder::{DirectoryEncoder, TiffEncoder, TiffKind};
use tiff::tags::Tag;

use super::BandData;

const MODEL_PIXEL_SCALE: u16 = 33550;
const MODEL_TIEPOINT: u16 = 33922;
const GEO_KEY_DIRECTORY: u16 = 34735;
const GEO_ASCII_PARAMS: u16 = 34737;
const GDAL_METADATA: u16 = 42112;

const GT_MODEL_TYPE: u16 = 1024;
const GT_RASTER_TYPE: u16 = 1025;
const GT_CITATION: u16 = 1026;
const GEOGRAPHIC_TYPE: u16 = 2048;
const PROJECTED_CS_TYPE: u16 = 3072;

const MODEL_TYPE_PROJECTED: u16 = 1;
const MODEL_TYPE_GEOGRAPHIC: u16 = 2;
const RASTER_PIXEL_IS_AREA: u16 = 1;

/// ADOBE_DEFLATE: zlib streams per tile.
const COMPRESSION_DEFLATE: u16 = 8;

/// TIFF requires tile dimensions in multiples of 16.
const TILE_ALIGN: u32 = 16;

/// Write a clipped raster to a file.
#[allow(clippy::too_many_arguments)]
pub fn write_geotiff_file<P: AsRef<Path>>(
    path: P,
    data: &BandData,
    bands: u16,
    width: u32,
    height: u32,
    transform: &GeoTransform,
    crs: &Crs,
    tags: &[(String, String)],
) -> ClipResult<()> {
    let file = File::create(path.as_ref())?;
    write_geotiff(
        BufWriter::new(file),
        data,
        bands,
        width,
        height,
        transform,
        crs,
        tags,
    )
}

/// Write a clipped raster to any seekable sink.
#[allow(clippy::too_many_arguments)]
pub fn write_geotiff<W: Write + Seek>(
    writer: W,
    data: &BandData,
    bands: u16,
    width: u32,
    height: u32,
    transform: &GeoTransform,
    crs: &Crs,
    tags: &[(String, String)],
) -> ClipResult<()> {
    let pixels = (width as usize) * (height as usize);
    if bands == 0 || pixels == 0 {
        return Err(ClipError::InvalidRaster(
            "cannot write empty raster".to_string(),
        ));
    }
    if data.len() != pixels * bands as usize {
        return Err(ClipError::InvalidRaster(format!(
            "sample count {} does not match {width}x{height}x{bands}",
            data.len()
        )));
    }

    let mut encoder = TiffEncoder::new(writer)
        .map_err(|e| ClipError::InvalidRaster(format!("TIFF encoder: {e}")))?;
    let mut dir = encoder
        .new_directory()
        .map_err(|e| ClipError::InvalidRaster(format!("TIFF directory: {e}")))?;

    write_image_tags(&mut dir, data, bands, width, height)?;
    write_geo_tags(&mut dir, transform, crs)?;
    write_metadata_tags(&mut dir, tags)?;
    write_band_tiles(&mut dir, data, bands, width, height)?;

    dir.finish()
        .map_err(|e| ClipError::InvalidRaster(format!("TIFF finish: {e}")))?;
    Ok(())
}

fn write_image_tags<W: Write + Seek, K: TiffKind>(
    dir: &mut DirectoryEncoder<W, K>,
    data: &BandData,
    bands: u16,
    width: u32,
    height: u32,
) -> ClipResult<()> {
    let enc = |e: tiff::TiffError| ClipError::InvalidRaster(format!("TIFF tag: {e}"));

    dir.write_tag(Tag::ImageWidth, width).map_err(enc)?;
    dir.write_tag(Tag::ImageLength, height).map_err(enc)?;

    let bits: Vec<u16> = vec![data.bits_per_sample(); bands as usize];
    dir.write_tag(Tag::BitsPerSample, bits.as_slice())
        .map_err(enc)?;

    dir.write_tag(Tag::Compression, COMPRESSION_DEFLATE)
        .map_err(enc)?;

    // RGB for 3-band byte imagery (the "visual" asset), BlackIsZero
    // otherwise.
    let photometric: u16 = if bands == 3 && data.bits_per_sample() == 8 {
        2
    } else {
        1
    };
    dir.write_tag(Tag::PhotometricInterpretation, photometric)
        .map_err(enc)?;

    dir.write_tag(Tag::SamplesPerPixel, bands).map_err(enc)?;

    let formats: Vec<u16> = vec![data.sample_format(); bands as usize];
    dir.write_tag(Tag::SampleFormat, formats.as_slice())
        .map_err(enc)?;

    // Band-separate planes, one image-covering padded tile per band.
    dir.write_tag(Tag::PlanarConfiguration, 2u16).map_err(enc)?;
    dir.write_tag(Tag::TileWidth, tile_dim(width)).map_err(enc)?;
    dir.write_tag(Tag::TileLength, tile_dim(height)).map_err(enc)?;

    if photometric == 1 && bands > 1 {
        let extra: Vec<u16> = vec![0; bands as usize - 1];
        dir.write_tag(Tag::ExtraSamples, extra.as_slice())
            .map_err(enc)?;
    }

    Ok(())
}

fn write_geo_tags<W: Write + Seek, K: TiffKind>(
    dir: &mut DirectoryEncoder<W, K>,
    transform: &GeoTransform,
    crs: &Crs,
) -> ClipResult<()> {
    let enc = |e: tiff::TiffError| ClipError::InvalidRaster(format!("TIFF geo tag: {e}"));

    let pixel_scale = [transform.pixel_width, -transform.pixel_height, 0.0];
    dir.write_tag(Tag::Unknown(MODEL_PIXEL_SCALE), pixel_scale.as_slice())
        .map_err(enc)?;

    // Ties pixel (0, 0) to the window's upper-left corner.
    let tiepoint = [0.0, 0.0, 0.0, transform.origin_x, transform.origin_y, 0.0];
    dir.write_tag(Tag::Unknown(MODEL_TIEPOINT), tiepoint.as_slice())
        .map_err(enc)?;

    let citation = format!("{}|", crs.proj_string().unwrap_or_else(|_| crs.to_string()));

    let mut keys: Vec<u16> = Vec::new();
    let mut key_count = 0u16;
    let geographic = crs.is_geographic();

    keys.extend_from_slice(&[
        GT_MODEL_TYPE,
        0,
        1,
        if geographic {
            MODEL_TYPE_GEOGRAPHIC
        } else {
            MODEL_TYPE_PROJECTED
        },
    ]);
    key_count += 1;

    keys.extend_from_slice(&[GT_RASTER_TYPE, 0, 1, RASTER_PIXEL_IS_AREA]);
    key_count += 1;

    keys.extend_from_slice(&[GT_CITATION, GEO_ASCII_PARAMS, citation.len() as u16, 0]);
    key_count += 1;

    if let Some(code) = crs.epsg_code() {
        let key = if geographic {
            GEOGRAPHIC_TYPE
        } else {
            PROJECTED_CS_TYPE
        };
        keys.extend_from_slice(&[key, 0, 1, code as u16]);
        key_count += 1;
    }

    let mut directory = vec![1, 1, 0, key_count];
    directory.extend_from_slice(&keys);
    dir.write_tag(Tag::Unknown(GEO_KEY_DIRECTORY), directory.as_slice())
        .map_err(enc)?;

    dir.write_tag(Tag::Unknown(GEO_ASCII_PARAMS), citation.as_str())
        .map_err(enc)?;

    Ok(())
}

fn write_metadata_tags<W: Write + Seek, K: TiffKind>(
    dir: &mut DirectoryEncoder<W, K>,
    tags: &[(String, String)],
) -> ClipResult<()> {
    if tags.is_empty() {
        return Ok(());
    }
    let enc = |e: tiff::TiffError| ClipError::InvalidRaster(format!("TIFF metadata: {e}"));

    if let Some((_, description)) = tags.iter().find(|(k, _)| k == "description") {
        dir.write_tag(Tag::ImageDescription, description.as_str())
            .map_err(enc)?;
    }

    let mut xml = String::from("<GDALMetadata>\n");
    for (name, value) in tags {
        xml.push_str(&format!(
            "  <Item name=\"{}\">{}</Item>\n",
            escape_xml(name),
            escape_xml(value)
        ));
    }
    xml.push_str("</GDALMetadata>\n");
    dir.write_tag(Tag::Unknown(GDAL_METADATA), xml.as_str())
        .map_err(enc)?;

    Ok(())
}

fn tile_dim(image_dim: u32) -> u32 {
    image_dim.div_ceil(TILE_ALIGN) * TILE_ALIGN
}

fn write_band_tiles<W: Write + Seek, K: TiffKind>(
    dir: &mut DirectoryEncoder<W, K>,
    data: &BandData,
    bands: u16,
    width: u32,
    height: u32,
) -> ClipResult<()> {
    let enc = |e: tiff::TiffError| ClipError::InvalidRaster(format!("TIFF tile: {e}"));

    let pixels = (width as usize) * (height as usize);
    let sample_bytes = data.bits_per_sample() as usize / 8;
    let row_bytes = width as usize * sample_bytes;
    let tile_row_bytes = tile_dim(width) as usize * sample_bytes;
    let tile_rows = tile_dim(height) as usize;

    let mut offsets: Vec<u32> = Vec::with_capacity(bands as usize);
    let mut counts: Vec<u32> = Vec::with_capacity(bands as usize);

    for band in 0..bands as usize {
        let plane = deinterleave_band(data, band, bands as usize, pixels);

        // right/bottom padding up to the aligned tile size
        let mut tile = vec![0u8; tile_row_bytes * tile_rows];
        for row in 0..height as usize {
            tile[row * tile_row_bytes..row * tile_row_bytes + row_bytes]
                .copy_from_slice(&plane[row * row_bytes..(row + 1) * row_bytes]);
        }

        let mut compressor = ZlibEncoder::new(Vec::new(), Compression::default());
        compressor.write_all(&tile)?;
        let compressed = compressor.finish()?;

        let offset = dir.write_data(compressed.as_slice()).map_err(enc)?;
        offsets.push(offset as u32);
        counts.push(compressed.len() as u32);
    }

    dir.write_tag(Tag::TileOffsets, offsets.as_slice())
        .map_err(enc)?;
    dir.write_tag(Tag::TileByteCounts, counts.as_slice())
        .map_err(enc)?;

    Ok(())
}

/// Extract one band's samples as little-endian bytes.
fn deinterleave_band(data: &BandData, band: usize, bands: usize, pixels: usize) -> Vec<u8> {
    match data {
        BandData::U8(samples) => {
            let mut plane = Vec::with_capacity(pixels);
            for i in 0..pixels {
                plane.push(samples[i * bands + band]);
            }
            plane
        }
        BandData::U16(samples) => {
            let mut plane = Vec::with_capacity(pixels * 2);
            for i in 0..pixels {
                plane.extend_from_slice(&samples[i * bands + band].to_le_bytes());
            }
            plane
        }
        BandData::F32(samples) => {
            let mut plane = Vec::with_capacity(pixels * 4);
            for i in 0..pixels {
                plane.extend_from_slice(&samples[i * bands + band].to_le_bytes());
            }
            plane
        }
    }
}

fn escape_xml(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}
