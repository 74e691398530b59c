//! Coordinate transformation between reference systems.
//!
//! All transforms run through proj4rs. Geographic systems operate in
//! radians inside proj4rs, so degree conversion happens at the edges of
//! each transform call.

use crate::bbox::BoundingBox;
use crate::crs::{Crs, WGS84};
use crate::error::{ClipError, ClipResult};
use geo::{polygon, Polygon};

/// Points inserted along each bbox edge when reprojecting bounds.
///
/// Curvature between CRS means the extreme of a reprojected rectangle can
/// fall mid-edge rather than at a corner, so edges are sampled densely
/// before taking the envelope.
const DENSIFY_POINTS: usize = 21;

/// Transform a single point between two CRS.
pub fn transform_point(src: &Crs, dst: &Crs, x: f64, y: f64) -> ClipResult<(f64, f64)> {
    let src_proj = src.resolve()?;
    let dst_proj = dst.resolve()?;

    let mut point = if src.is_geographic() {
        (x.to_radians(), y.to_radians(), 0.0)
    } else {
        (x, y, 0.0)
    };

    proj4rs::transform::transform(&src_proj, &dst_proj, &mut point)
        .map_err(|e| ClipError::InvalidCrs(format!("transform {src} -> {dst}: {e:?}")))?;

    if dst.is_geographic() {
        Ok((point.0.to_degrees(), point.1.to_degrees()))
    } else {
        Ok((point.0, point.1))
    }
}

/// Reproject a bounding box by densifying its edges and taking the
/// envelope of the transformed samples.
pub fn transform_bounds(src: &Crs, dst: &Crs, bounds: &BoundingBox) -> ClipResult<BoundingBox> {
    if src == dst {
        return Ok(*bounds);
    }

    let src_proj = src.resolve()?;
    let dst_proj = dst.resolve()?;
    let src_geographic = src.is_geographic();
    let dst_geographic = dst.is_geographic();

    let mut min_x = f64::INFINITY;
    let mut min_y = f64::INFINITY;
    let mut max_x = f64::NEG_INFINITY;
    let mut max_y = f64::NEG_INFINITY;

    let step_x = bounds.width() / (DENSIFY_POINTS - 1) as f64;
    let step_y = bounds.height() / (DENSIFY_POINTS - 1) as f64;

    for i in 0..DENSIFY_POINTS {
        let x = bounds.min_x + step_x * i as f64;
        let y = bounds.min_y + step_y * i as f64;

        // one sample per edge at this parameter value
        for (px, py) in [
            (x, bounds.min_y),
            (x, bounds.max_y),
            (bounds.min_x, y),
            (bounds.max_x, y),
        ] {
            let mut point = if src_geographic {
                (px.to_radians(), py.to_radians(), 0.0)
            } else {
                (px, py, 0.0)
            };

            proj4rs::transform::transform(&src_proj, &dst_proj, &mut point)
                .map_err(|e| ClipError::InvalidCrs(format!("transform {src} -> {dst}: {e:?}")))?;

            let (tx, ty) = if dst_geographic {
                (point.0.to_degrees(), point.1.to_degrees())
            } else {
                (point.0, point.1)
            };

            min_x = min_x.min(tx);
            min_y = min_y.min(ty);
            max_x = max_x.max(tx);
            max_y = max_y.max(ty);
        }
    }

    Ok(BoundingBox::new(min_x, min_y, max_x, max_y))
}

/// Build a WGS84 polygon from a bounding box in an arbitrary CRS.
///
/// Only the four corners are transformed; the result is the quadrilateral
/// they span, closed back to the first corner. This is the search geometry
/// handed to the catalog, where corner fidelity is what matters.
pub fn to_wgs84_polygon(region_crs: &Crs, bounds: &BoundingBox) -> ClipResult<Polygon<f64>> {
    let mut ring = Vec::with_capacity(5);
    for (x, y) in bounds.corners() {
        ring.push(transform_point(region_crs, &WGS84, x, y)?);
    }

    Ok(polygon![
        (x: ring[0].0, y: ring[0].1),
        (x: ring[1].0, y: ring[1].1),
        (x: ring[2].0, y: ring[2].1),
        (x: ring[3].0, y: ring[3].1),
    ])
}

/// Build a WGS84 GeoJSON geometry from a bounding box, suitable for a
/// STAC `intersects` search parameter.
pub fn to_wgs84_geojson(region_crs: &Crs, bounds: &BoundingBox) -> ClipResult<geojson::Geometry> {
    let poly = to_wgs84_polygon(region_crs, bounds)?;
    Ok(geojson::Geometry::new(geojson::Value::from(&poly)))
}
