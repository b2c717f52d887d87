use clap::{Parser, Subcommand};
use geoinv_core::{InventoryParams, TileFilter};
use std::path::PathBuf;

/// geoinv - inventory and batch processing for tiled imagery archives
#[derive(Parser, Debug)]
#[command(name = "geoinv")]
#[command(about = "Inventory and batch processing for tiled imagery archives", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Output results in JSON format
    #[arg(long, global = true)]
    pub json: bool,

    /// Configuration file (TOML)
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Archive root directory (overrides config file and environment)
    #[arg(long, global = true, value_name = "DIR")]
    pub archive_root: Option<PathBuf>,

    /// Dataset driver to operate on
    #[arg(long, global = true, default_value = "aod")]
    pub dataset: String,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// File loose source granules into the archive layout
    Archive(ArchiveArgs),

    /// Show what the archive holds for a query
    Inventory(InventoryCmdArgs),

    /// Generate requested products tile by tile
    Process(ProcessArgs),

    /// Assemble per-date project outputs
    Project(ProjectArgs),
}

/// Query arguments shared by the inventory-driven subcommands
#[derive(Parser, Debug, Clone)]
pub struct QueryArgs {
    /// Region-of-interest vector file (GeoJSON)
    #[arg(short, long, value_name = "FILE")]
    pub site: Option<PathBuf>,

    /// Explicit tile identifiers (overrides --site for tile selection)
    #[arg(short, long, num_args = 1.., value_name = "TILE")]
    pub tiles: Option<Vec<String>>,

    /// Date range as "start,end" (YYYY-MM-DD or bare years)
    #[arg(short, long, value_name = "RANGE")]
    pub dates: Option<String>,

    /// Day-of-year range as "d1,d2"
    #[arg(long, value_name = "RANGE")]
    pub days: Option<String>,

    /// Only accept tiles observed by these sensors
    #[arg(long, num_args = 1.., value_name = "SENSOR")]
    pub sensors: Option<Vec<String>>,

    /// Fetch missing assets from the remote source before resolving
    #[arg(long)]
    pub fetch: bool,

    /// Products to request
    #[arg(short, long, num_args = 1.., value_name = "PRODUCT")]
    pub products: Vec<String>,

    /// Minimum percent of the site a tile must cover
    #[arg(long, default_value_t = 0.0, value_name = "PERCENT")]
    pub pcov: f64,

    /// Minimum percent of a tile the site must use
    #[arg(long, default_value_t = 0.0, value_name = "PERCENT")]
    pub ptile: f64,
}

impl QueryArgs {
    pub fn to_params(&self) -> InventoryParams {
        InventoryParams {
            site: self.site.clone(),
            tiles: self.tiles.clone(),
            dates: self.dates.clone(),
            days: self.days.clone(),
            products: self.products.clone(),
            fetch: self.fetch,
            filter: TileFilter {
                sensors: self
                    .sensors
                    .as_ref()
                    .map(|s| s.iter().cloned().collect()),
                max_cloud_cover: None,
                min_site_coverage: self.pcov,
                min_tile_usage: self.ptile,
            },
        }
    }
}

#[derive(Parser, Debug)]
pub struct ArchiveArgs {
    /// Directory holding the files to ingest (defaults to the driver's
    /// staging directory)
    pub path: Option<PathBuf>,

    /// Descend into subdirectories
    #[arg(long)]
    pub recursive: bool,

    /// Copy files into the archive instead of moving them
    #[arg(long)]
    pub keep: bool,
}

#[derive(Parser, Debug)]
pub struct InventoryCmdArgs {
    #[command(flatten)]
    pub query: QueryArgs,

    /// Print dates as month-day instead of day-of-year
    #[arg(long)]
    pub md: bool,

    /// One line of colored dates per year
    #[arg(long)]
    pub compact: bool,

    /// List the driver's products and exit
    #[arg(long)]
    pub list_products: bool,
}

#[derive(Parser, Debug)]
pub struct ProcessArgs {
    #[command(flatten)]
    pub query: QueryArgs,

    /// Regenerate products that already exist
    #[arg(long)]
    pub overwrite: bool,
}

#[derive(Parser, Debug)]
pub struct ProjectArgs {
    #[command(flatten)]
    pub query: QueryArgs,

    /// Output resolution (defaults to the driver's resolution)
    #[arg(long, num_args = 2, value_names = ["X", "Y"])]
    pub res: Option<Vec<f64>>,

    /// Destination directory for project outputs
    #[arg(long, value_name = "DIR")]
    pub datadir: Option<PathBuf>,

    /// Product applied as a validity mask to the other outputs
    #[arg(long, value_name = "PRODUCT")]
    pub mask: Option<String>,

    /// Mosaic without reprojection (inputs must share one projection)
    #[arg(long)]
    pub nowarp: bool,
}
