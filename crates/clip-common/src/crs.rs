//! Coordinate Reference System identification and resolution.
//!
//! CRS resolution is pure Rust: EPSG codes are looked up in the
//! crs-definitions proj4 database and handed to proj4rs. No native
//! geospatial runtime has to be initialized, so resolution is idempotent
//! and safe to invoke repeatedly from any component.

use crate::error::{ClipError, ClipResult};
use proj4rs::proj::Proj;
use serde::{Deserialize, Serialize};
use std::fmt;

/// The global reference system used for catalog search geometries.
pub const WGS84: Crs = Crs::Epsg(4326);

/// A coordinate reference system identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Crs {
    /// A numeric EPSG code, e.g. 4326 or 32719.
    Epsg(u32),
    /// A raw proj definition string for CRS not covered by an EPSG code.
    Proj4(String),
}

impl Crs {
    /// Parse a CRS argument string.
    ///
    /// Accepts formats like:
    /// - "EPSG:24879" (any case)
    /// - "24879" (bare numeric code)
    /// - "+proj=utm +zone=19 +south ..." (proj definition string)
    pub fn parse(s: &str) -> ClipResult<Self> {
        let trimmed = s.trim();

        if let Some(code) = trimmed
            .to_uppercase()
            .strip_prefix("EPSG:")
            .map(str::to_string)
        {
            let code: u32 = code
                .parse()
                .map_err(|_| ClipError::InvalidCrs(s.to_string()))?;
            return Ok(Crs::Epsg(code));
        }

        if let Ok(code) = trimmed.parse::<u32>() {
            return Ok(Crs::Epsg(code));
        }

        if trimmed.starts_with("+proj") {
            return Ok(Crs::Proj4(trimmed.to_string()));
        }

        Err(ClipError::InvalidCrs(s.to_string()))
    }

    /// The proj definition string for this CRS.
    pub fn proj_string(&self) -> ClipResult<String> {
        match self {
            Crs::Epsg(code) => {
                let short = u16::try_from(*code)
                    .map_err(|_| ClipError::InvalidCrs(format!("EPSG:{code}")))?;
                crs_definitions::from_code(short)
                    .map(|def| def.proj4.to_string())
                    .ok_or_else(|| {
                        ClipError::InvalidCrs(format!("EPSG:{code} not in CRS database"))
                    })
            }
            Crs::Proj4(s) => Ok(s.clone()),
        }
    }

    /// Resolve this CRS into a proj4rs projection.
    pub fn resolve(&self) -> ClipResult<Proj> {
        let proj_str = self.proj_string()?;
        Proj::from_proj_string(&proj_str)
            .map_err(|e| ClipError::InvalidCrs(format!("{self}: {e:?}")))
    }

    /// Check if this is a geographic (lon/lat degree) CRS.
    ///
    /// proj4rs works in radians for geographic systems, so callers need
    /// this to know when to convert degrees on the way in and out.
    pub fn is_geographic(&self) -> bool {
        self.proj_string()
            .map(|s| s.contains("+proj=longlat"))
            .unwrap_or(false)
    }

    /// The EPSG code, when this CRS is EPSG-identified.
    pub fn epsg_code(&self) -> Option<u32> {
        match self {
            Crs::Epsg(code) => Some(*code),
            Crs::Proj4(_) => None,
        }
    }
}

impl fmt::Display for Crs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Crs::Epsg(code) => write!(f, "EPSG:{code}"),
            Crs::Proj4(s) => write!(f, "{s}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_crs() {
        assert_eq!(Crs::parse("EPSG:4326").unwrap(), Crs::Epsg(4326));
        assert_eq!(Crs::parse("epsg:24879").unwrap(), Crs::Epsg(24879));
        assert_eq!(Crs::parse("32719").unwrap(), Crs::Epsg(32719));
        assert!(matches!(
            Crs::parse("+proj=utm +zone=19 +south +datum=WGS84 +units=m +no_defs").unwrap(),
            Crs::Proj4(_)
        ));
        assert!(Crs::parse("not-a-crs").is_err());
    }

    #[test]
    fn test_resolve_known_codes() {
        assert!(Crs::Epsg(4326).resolve().is_ok());
        assert!(Crs::Epsg(32719).resolve().is_ok());
        // PSAD56 / UTM 19S, the reference region's CRS
        assert!(Crs::Epsg(24879).resolve().is_ok());
    }

    #[test]
    fn test_resolve_unknown_code() {
        let err = Crs::Epsg(999_999).resolve().unwrap_err();
        assert!(matches!(err, ClipError::InvalidCrs(_)));
    }

    #[test]
    fn test_is_geographic() {
        assert!(Crs::Epsg(4326).is_geographic());
        assert!(!Crs::Epsg(32719).is_geographic());
        assert!(!Crs::Epsg(3857).is_geographic());
    }
}
