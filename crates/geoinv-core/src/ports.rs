//! Port definitions for external collaborators
//!
//! The core never touches raster pixels, coordinate systems, or remote
//! archives directly; it drives them through these traits. Dataset
//! drivers supply the repository layout and file-naming policy, and a
//! raster engine supplies the warping/masking primitives.

use crate::asset::{Asset, AssetDef, ProductInfo, SensorInfo};
use crate::coverage::TileCoverage;
use crate::error::{GeoinvError, Result};
use crate::products::ProductSpec;
use crate::region::Region;
use crate::temporal::DateWindow;
use chrono::NaiveDate;
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

/// Port for locating data within an archive's spatial/temporal layout
pub trait Repository: Send + Sync {
    /// Directory holding data for a tile, optionally narrowed to a date
    fn path(&self, tile: &str, date: Option<NaiveDate>) -> PathBuf;

    /// All tiles known to the archive
    fn find_tiles(&self) -> Result<Vec<String>>;

    /// All dates with any data for a tile
    fn find_dates(&self, tile: &str) -> Result<Vec<NaiveDate>>;

    /// Tiles overlapping a region, with coverage fractions
    fn region_to_tiles(&self, region: &Region) -> Result<BTreeMap<String, TileCoverage>>;

    /// Directory for derived archive-wide composites of a category
    fn archive_path(&self, category: &str) -> PathBuf;

    /// Staging directory that newly fetched files land in before archival
    fn stage_path(&self) -> PathBuf;
}

/// Acceptance criteria applied to each tile's discovered assets before it
/// joins an inventory.
#[derive(Debug, Clone, Default)]
pub struct TileFilter {
    /// Only accept tiles observed by one of these sensors
    pub sensors: Option<BTreeSet<String>>,

    /// Driver-interpreted quality threshold (e.g. cloud cover percent)
    pub max_cloud_cover: Option<f64>,

    /// Minimum percent of the region a tile must cover (`--pcov`)
    pub min_site_coverage: f64,

    /// Minimum percent of the tile the region must use (`--ptile`)
    pub min_tile_usage: f64,
}

/// Everything a driver needs to generate one product for one tile/date.
pub struct ProcessContext<'a> {
    pub tile: &'a str,
    pub date: NaiveDate,
    pub sensor: &'a str,
    pub assets: &'a BTreeMap<String, Asset>,

    /// Path the generated product must be written to
    pub output: &'a Path,
}

/// Port for dataset-specific policy: archive layout, filename parsing,
/// quality filtering and product generation.
pub trait Dataset: Send + Sync {
    /// Short identifier used on the command line and in output paths
    fn name(&self) -> &str;

    /// Human-readable description
    fn description(&self) -> &str;

    fn repository(&self) -> &dyn Repository;

    /// Declared asset types
    fn assets(&self) -> &BTreeMap<String, AssetDef>;

    /// Declared sensors
    fn sensors(&self) -> &BTreeMap<String, SensorInfo>;

    /// Declared products
    fn products(&self) -> &BTreeMap<String, ProductInfo>;

    /// Extract asset metadata (date, sensor, sub-product locators) from a
    /// matched filename
    fn parse_asset(&self, path: &Path, asset_type: &str) -> Result<Asset>;

    /// Dataset-specific acceptance rule over a tile's discovered assets.
    /// The default accepts everything.
    fn accept(&self, assets: &BTreeMap<String, Asset>, filter: &TileFilter) -> Result<()> {
        let _ = (assets, filter);
        Ok(())
    }

    /// Products already materialized on disk for a tile/date
    fn find_products(&self, tile: &str, date: NaiveDate) -> Result<BTreeMap<String, PathBuf>>;

    /// Generate one product, writing it to `ctx.output`
    fn process_product(
        &self,
        ctx: &ProcessContext<'_>,
        spec: &ProductSpec,
        engine: &dyn RasterEngine,
    ) -> Result<()>;

    /// Request missing assets from the dataset's remote source into the
    /// staging directory. Drivers without a remote source keep the
    /// default, which reports the attempt as failed (the inventory treats
    /// this as non-fatal and proceeds with local data).
    fn fetch(
        &self,
        products: &[String],
        tiles: &BTreeMap<String, TileCoverage>,
        window: &DateWindow,
    ) -> Result<()> {
        let _ = (products, tiles, window);
        Err(GeoinvError::FetchFailed {
            reason: format!("dataset '{}' has no fetch support", self.name()),
        })
    }

    /// Rebuild any archive-wide composites affected by newly archived
    /// dates. Drivers without derived composites keep the default no-op.
    fn update_composites(&self, dates: &[NaiveDate], engine: &dyn RasterEngine) -> Result<()> {
        let _ = (dates, engine);
        Ok(())
    }

    /// Output resolution used when `--res` is not given
    fn default_resolution(&self) -> (f64, f64);
}

/// Port for the external raster engine. All calls are synchronous and
/// block until the underlying tool finishes.
pub trait RasterEngine: Send + Sync {
    /// Spatial reference of a raster, in a comparable text form
    fn projection(&self, raster: &Path) -> Result<String>;

    /// Declared no-data value of a raster's first band
    fn nodata(&self, raster: &Path) -> Result<Option<f64>>;

    /// Extract a dataset locator (e.g. a container sub-dataset) to a
    /// standalone raster
    fn translate(&self, locator: &str, output: &Path) -> Result<()>;

    /// Merge same-projection inputs into one raster clipped to `bounds`,
    /// without reprojection
    fn mosaic(
        &self,
        inputs: &[PathBuf],
        output: &Path,
        bounds: geo::Rect<f64>,
        nodata: Option<f64>,
    ) -> Result<()>;

    /// Burn the region into a byte mask raster aligned with `like`
    fn rasterize(&self, region: &Region, like: &Path, output: &Path) -> Result<()>;

    /// Reproject-and-clip inputs to the region boundary at the target
    /// resolution ("cookie cutting")
    fn cookie_cut(
        &self,
        inputs: &[PathBuf],
        output: &Path,
        region: &Region,
        resolution: (f64, f64),
    ) -> Result<()>;

    /// Mask out pixels of `raster` where `mask` is zero/nodata, in place
    fn apply_mask(&self, raster: &Path, mask: &Path) -> Result<()>;

    /// Per-pixel mean (band 1) and variance (band 2) across a stack
    fn mean_stack(&self, inputs: &[PathBuf], output: &Path) -> Result<()>;

    /// Read a pixel window from band 1; `None` marks no-data pixels.
    /// `col`/`row` address the window's upper-left corner.
    fn sample_window(
        &self,
        raster: &Path,
        col: i64,
        row: i64,
        width: usize,
        height: usize,
    ) -> Result<Vec<Option<f64>>>;
}

/// Canonical output filename for a tile-level product. Empty components
/// (tile-less datasets, unknown sensor) are omitted.
pub fn product_filename(tile: &str, date: NaiveDate, sensor: &str, product: &str) -> String {
    let date = date.format("%Y%j").to_string();
    let parts: Vec<&str> = [tile, date.as_str(), sensor, product]
        .into_iter()
        .filter(|p| !p.is_empty())
        .collect();
    format!("{}.tif", parts.join("_"))
}
