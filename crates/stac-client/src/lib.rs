//! STAC catalog access: search, asset signing, and containment filtering.

pub mod client;
pub mod filter;
pub mod sign;
pub mod types;

pub use client::{Catalog, SearchParams, StacApiClient};
pub use filter::filter_by_containment;
pub use sign::{AssetSigner, NoopSigner, PlanetaryComputerSigner};
pub use types::{StacAsset, StacItem};
