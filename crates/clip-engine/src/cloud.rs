//! Cloud admission via the scene classification layer.
//!
//! Sentinel-2 L2A ships a per-pixel scene classification (SCL) asset.
//! Classes 8 and above mark cloud medium/high probability, thin cirrus,
//! and snow; everything below is ground, vegetation, water, or shadow.

use crate::raster::BandData;

/// Asset name of the scene classification layer.
pub const SCL_ASSET: &str = "SCL";

/// First SCL class treated as cloud.
pub const CLOUD_CLASS_MIN: u16 = 8;

/// Cloud percentage of a classification window: 100 x cloudy / valid.
///
/// Valid pixels are those with a non-negative class value; float-encoded
/// windows can carry negative nodata fills, which count toward neither
/// side. Returns `None` when no valid pixels remain.
pub fn cloud_fraction(scl: &BandData) -> Option<f64> {
    let (cloudy, total) = match scl {
        BandData::U8(values) => (
            values.iter().filter(|&&v| v as u16 >= CLOUD_CLASS_MIN).count(),
            values.len(),
        ),
        BandData::U16(values) => (
            values.iter().filter(|&&v| v >= CLOUD_CLASS_MIN).count(),
            values.len(),
        ),
        BandData::F32(values) => (
            values.iter().filter(|&&v| v >= CLOUD_CLASS_MIN as f32).count(),
            values.iter().filter(|&&v| v >= 0.0).count(),
        ),
    };

    if total == 0 {
        return None;
    }
    Some(100.0 * cloudy as f64 / total as f64)
}
