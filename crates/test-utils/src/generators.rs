//! Synthetic GeoTIFF generators.
//!
//! These build small, fully-valid GeoTIFF byte streams in memory so raster
//! tests never depend on external files. Pixel patterns are predictable:
//! `col * 10 + row` style values that can be asserted cell by cell.

use std::io::Cursor;

use clip_common::GeoTransform;
use tiff::encoder::colortype::{Gray16, Gray8, RGB8};
use tiff::encoder::{DirectoryEncoder, TiffEncoder, TiffKind};
use tiff::tags::Tag;

const MODEL_PIXEL_SCALE: u16 = 33550;
const MODEL_TIEPOINT: u16 = 33922;
const GEO_KEY_DIRECTORY: u16 = 34735;

const GT_MODEL_TYPE: u16 = 1024;
const GT_RASTER_TYPE: u16 = 1025;
const GEOGRAPHIC_TYPE: u16 = 2048;
const PROJECTED_CS_TYPE: u16 = 3072;

fn write_geo_tags<W: std::io::Write + std::io::Seek, K: TiffKind>(
    dir: &mut DirectoryEncoder<W, K>,
    transform: &GeoTransform,
    epsg: u16,
    geographic: bool,
) {
    let pixel_scale = [transform.pixel_width, -transform.pixel_height, 0.0];
    dir.write_tag(Tag::Unknown(MODEL_PIXEL_SCALE), pixel_scale.as_slice())
        .unwrap();

    let tiepoint = [0.0, 0.0, 0.0, transform.origin_x, transform.origin_y, 0.0];
    dir.write_tag(Tag::Unknown(MODEL_TIEPOINT), tiepoint.as_slice())
        .unwrap();

    let (model_type, crs_key) = if geographic {
        (2u16, GEOGRAPHIC_TYPE)
    } else {
        (1u16, PROJECTED_CS_TYPE)
    };
    let geokeys: Vec<u16> = vec![
        1, 1, 0, 3, // header: version, revision, minor, key count
        GT_MODEL_TYPE, 0, 1, model_type,
        GT_RASTER_TYPE, 0, 1, 1, // PixelIsArea
        crs_key, 0, 1, epsg,
    ];
    dir.write_tag(Tag::Unknown(GEO_KEY_DIRECTORY), geokeys.as_slice())
        .unwrap();
}

/// Single-band 8-bit GeoTIFF in a projected CRS.
pub fn gray8_geotiff(
    width: u32,
    height: u32,
    data: &[u8],
    transform: &GeoTransform,
    epsg: u16,
) -> Vec<u8> {
    assert_eq!(data.len(), (width * height) as usize);
    let mut cursor = Cursor::new(Vec::new());
    {
        let mut tiff = TiffEncoder::new(&mut cursor).unwrap();
        let mut image = tiff.new_image::<Gray8>(width, height).unwrap();
        write_geo_tags(image.encoder(), transform, epsg, false);
        image.write_data(data).unwrap();
    }
    cursor.into_inner()
}

/// Single-band 16-bit GeoTIFF in a projected CRS.
pub fn gray16_geotiff(
    width: u32,
    height: u32,
    data: &[u16],
    transform: &GeoTransform,
    epsg: u16,
) -> Vec<u8> {
    assert_eq!(data.len(), (width * height) as usize);
    let mut cursor = Cursor::new(Vec::new());
    {
        let mut tiff = TiffEncoder::new(&mut cursor).unwrap();
        let mut image = tiff.new_image::<Gray16>(width, height).unwrap();
        write_geo_tags(image.encoder(), transform, epsg, false);
        image.write_data(data).unwrap();
    }
    cursor.into_inner()
}

/// Three-band interleaved 8-bit GeoTIFF, the shape of a Sentinel-2
/// "visual" asset.
pub fn rgb8_geotiff(
    width: u32,
    height: u32,
    data: &[u8],
    transform: &GeoTransform,
    epsg: u16,
) -> Vec<u8> {
    assert_eq!(data.len(), (width * height * 3) as usize);
    let mut cursor = Cursor::new(Vec::new());
    {
        let mut tiff = TiffEncoder::new(&mut cursor).unwrap();
        let mut image = tiff.new_image::<RGB8>(width, height).unwrap();
        write_geo_tags(image.encoder(), transform, epsg, false);
        image.write_data(data).unwrap();
    }
    cursor.into_inner()
}

/// Scene-classification raster with a fixed count of cloudy pixels.
///
/// Classes 8+ are cloud; the first `cloudy` pixels get class 9
/// (cloud, high probability) and the rest class 4 (vegetation).
pub fn scl_geotiff(
    width: u32,
    height: u32,
    cloudy: usize,
    transform: &GeoTransform,
    epsg: u16,
) -> Vec<u8> {
    let total = (width * height) as usize;
    assert!(cloudy <= total);
    let mut data = vec![4u8; total];
    for v in data.iter_mut().take(cloudy) {
        *v = 9;
    }
    gray8_geotiff(width, height, &data, transform, epsg)
}

/// A predictable gradient for band assertions: `(col * 10 + row) % 256`.
pub fn gradient_u8(width: u32, height: u32) -> Vec<u8> {
    let mut data = Vec::with_capacity((width * height) as usize);
    for row in 0..height {
        for col in 0..width {
            data.push(((col * 10 + row) % 256) as u8);
        }
    }
    data
}

/// A predictable 16-bit gradient: `col * 100 + row`.
pub fn gradient_u16(width: u32, height: u32) -> Vec<u16> {
    let mut data = Vec::with_capacity((width * height) as usize);
    for row in 0..height {
        for col in 0..width {
            data.push((col * 100 + row) as u16);
        }
    }
    data
}
