//! Core inventory and batch-processing engine for tiled imagery archives
//!
//! The crate models an archive as tiles observed on dates, each holding
//! raw assets from which products are derived. An [`Inventory`] reconciles
//! a spatial extent and a temporal window against the data actually on
//! disk, and batch operations (process, project) walk it date by date,
//! tolerating per-tile and per-date failures.
//!
//! Dataset policy (archive layout, filename parsing, product generation)
//! and raster work live behind the ports in [`ports`]; the core itself
//! never reads pixels.

pub mod archive;
pub mod asset;
pub mod config;
pub mod coverage;
pub mod engine;
pub mod error;
pub mod inventory;
pub mod ports;
pub mod products;
pub mod region;
pub mod temporal;

pub use archive::{archive_assets, ArchiveReport};
pub use asset::{Asset, AssetDef, ProductInfo, SensorInfo};
pub use config::{CliConfigOverrides, ConfigSource, ConfigValue, LayeredConfig};
pub use coverage::TileCoverage;
pub use engine::ShellEngine;
pub use error::{GeoinvError, Result};
pub use inventory::{
    Inventory, InventoryParams, ProjectOptions, SensorColor, SensorEntry, SkippedDate,
    SkippedTile, Tile, TileSet,
};
pub use ports::{
    product_filename, Dataset, ProcessContext, RasterEngine, Repository, TileFilter,
};
pub use products::{ProductRequest, ProductSpec};
pub use region::Region;
pub use temporal::DateWindow;
