//! Satellite acquisition clipping service.
//!
//! Searches a STAC catalog for acquisitions covering a query region,
//! filters them by footprint containment and cloud cover, and clips the
//! requested assets to GeoTIFF files on disk.

use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::Parser;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use clip_common::{BoundingBox, Crs, QueryRegion, TimeRange};
use clip_engine::{run_pipeline, ClipEngine, DefaultOpener, PipelineConfig};
use stac_client::client::{DEFAULT_COLLECTION, DEFAULT_STAC_URL};
use stac_client::sign::DEFAULT_SAS_URL;
use stac_client::{NoopSigner, PlanetaryComputerSigner, StacApiClient};

#[derive(Parser, Debug)]
#[command(name = "clipper")]
#[command(about = "Clip satellite imagery acquisitions to a query region")]
struct Args {
    /// Query region bounds: minx,miny,maxx,maxy
    #[arg(long)]
    bounds: String,

    /// CRS of the query region bounds (EPSG code or proj string)
    #[arg(long, default_value = "EPSG:4326")]
    crs: String,

    /// Asset names to clip (repeatable)
    #[arg(long = "asset", default_values_t = vec!["visual".to_string()])]
    assets: Vec<String>,

    /// Output file prefix and run directory name
    #[arg(long, default_value = "clip")]
    prefix: String,

    /// Root directory for clipped output
    #[arg(long, default_value = "output")]
    output_dir: PathBuf,

    /// First acquisition date (YYYY-MM-DD, default: start of the
    /// Sentinel-2 record)
    #[arg(long, default_value = "2015-06-23")]
    start_date: NaiveDate,

    /// Last acquisition date (YYYY-MM-DD, default today)
    #[arg(long)]
    end_date: Option<NaiveDate>,

    /// Maximum cloud percentage over the query region; omit to disable
    /// cloud filtering
    #[arg(long)]
    max_cloud_pct: Option<f64>,

    /// STAC collection to search
    #[arg(long, default_value = DEFAULT_COLLECTION)]
    collection: String,

    /// STAC API root URL
    #[arg(long, env = "STAC_URL", default_value = DEFAULT_STAC_URL)]
    stac_url: String,

    /// SAS token service URL for asset signing
    #[arg(long, env = "SAS_URL", default_value = DEFAULT_SAS_URL)]
    sign_url: String,

    /// Skip asset signing (for catalogs with public assets)
    #[arg(long)]
    no_sign: bool,

    /// Log level
    #[arg(long, default_value = "info")]
    log_level: String,
}

fn main() -> Result<()> {
    // Load environment from .env file if present
    dotenvy::dotenv().ok();

    let args = Args::parse();

    // Initialize tracing
    let level = match args.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(true)
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;

    info!("Starting acquisition clipper");

    let bounds = BoundingBox::from_arg_string(&args.bounds)
        .with_context(|| format!("parsing --bounds {}", args.bounds))?;
    let crs = Crs::parse(&args.crs).with_context(|| format!("parsing --crs {}", args.crs))?;
    let region = QueryRegion::new(bounds, crs)?;
    let time_range = TimeRange::new(args.start_date, args.end_date);

    let catalog = StacApiClient::new(&args.stac_url)?;
    let engine = if args.no_sign {
        ClipEngine::new(DefaultOpener, NoopSigner)
    } else {
        ClipEngine::new(DefaultOpener, PlanetaryComputerSigner::new(&args.sign_url)?)
    };

    let config = PipelineConfig {
        region,
        time_range,
        collection: args.collection,
        assets: args.assets,
        prefix: args.prefix,
        output_dir: args.output_dir,
        max_cloud_pct: args.max_cloud_pct,
    };

    info!(
        bounds = %config.region.bounds,
        crs = %config.region.crs,
        datetime = %config.time_range.as_stac_datetime(),
        collection = %config.collection,
        assets = ?config.assets,
        "Running pipeline"
    );

    let stats = run_pipeline(&catalog, &engine, &config)?;

    info!(
        total_images = stats.total_images,
        cloud_filtered = stats.cloud_filtered,
        "Run complete"
    );
    println!("{}", serde_json::to_string_pretty(&stats)?);

    Ok(())
}
