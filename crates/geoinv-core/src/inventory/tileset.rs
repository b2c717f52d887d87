//! All tiles for a single date, and project assembly for that date

use crate::coverage::TileCoverage;
use crate::error::{GeoinvError, Result};
use crate::inventory::tile::Tile;
use crate::ports::{Dataset, RasterEngine, TileFilter};
use crate::products::ProductRequest;
use crate::region::Region;
use chrono::NaiveDate;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

/// A tile that failed to resolve, with the reason it was skipped.
/// Collected instead of silently dropped so callers can report why a
/// date is thinner than expected.
#[derive(Debug, Clone)]
pub struct SkippedTile {
    pub tile: String,
    pub reason: String,
}

/// Options for project assembly
#[derive(Debug, Clone, Default)]
pub struct ProjectOptions {
    /// Output resolution; defaults to the driver's resolution
    pub resolution: Option<(f64, f64)>,

    /// Destination directory for assembled outputs
    pub datadir: PathBuf,

    /// Output key of a product applied as a validity mask to the others
    pub mask: Option<String>,

    /// Mosaic without reprojection; all inputs must share one projection
    pub no_warp: bool,
}

/// The tiles resolved for one date.
pub struct TileSet {
    pub date: NaiveDate,

    /// Sensor of the last successfully constructed tile. Tiles on one
    /// date are expected to share a sensor family; this is recorded, not
    /// enforced.
    pub sensor: String,

    /// All candidate tiles with their coverage, resolved or not
    pub tile_coverage: BTreeMap<String, TileCoverage>,

    /// Successfully constructed tiles
    pub tiles: BTreeMap<String, Tile>,

    /// Candidates that failed to resolve
    pub skipped: Vec<SkippedTile>,

    /// Assembled project outputs, populated by [`TileSet::project`]
    pub products: BTreeMap<String, PathBuf>,

    region: Option<Arc<Region>>,
    requested: ProductRequest,
    dataset: Arc<dyn Dataset>,
}

impl TileSet {
    /// Resolve every candidate tile for a date. Individual tile failures
    /// are recorded and tolerated; only a date with zero resolvable tiles
    /// fails, with [`GeoinvError::NoDataFound`].
    pub fn build(
        dataset: Arc<dyn Dataset>,
        region: Option<Arc<Region>>,
        tile_coverage: BTreeMap<String, TileCoverage>,
        date: NaiveDate,
        requested: ProductRequest,
        filter: &TileFilter,
    ) -> Result<Self> {
        debug!(%date, candidates = tile_coverage.len(), "resolving tiles");
        let mut tiles = BTreeMap::new();
        let mut skipped = Vec::new();
        let mut sensor = String::new();

        for (id, coverage) in &tile_coverage {
            match Tile::build(dataset.clone(), id, date, *coverage, filter) {
                Ok(tile) => {
                    sensor = tile.sensor.clone();
                    tiles.insert(id.clone(), tile);
                }
                Err(e) => {
                    debug!(tile = %id, %date, reason = %e, "tile skipped");
                    skipped.push(SkippedTile {
                        tile: id.clone(),
                        reason: e.to_string(),
                    });
                }
            }
        }

        if tiles.is_empty() {
            return Err(GeoinvError::NoDataFound { date });
        }

        Ok(Self {
            date,
            sensor,
            tile_coverage,
            tiles,
            skipped,
            products: BTreeMap::new(),
            region,
            requested,
            dataset,
        })
    }

    /// Percent coverage of the query for each declared asset type.
    ///
    /// With a region the per-tile area fractions are already weighted by
    /// the region's area; with an explicit tile list every candidate tile
    /// weighs `1/N`.
    pub fn coverage(&self) -> BTreeMap<String, f64> {
        let norm = if self.region.is_some() {
            1.0
        } else {
            self.tile_coverage.len() as f64
        };
        let mut asset_coverage = BTreeMap::new();
        for asset_type in self.dataset.assets().keys() {
            let mut cov = 0.0;
            for tile in self.tiles.values() {
                if tile.assets.contains_key(asset_type) {
                    cov += tile.coverage.area_fraction / norm;
                }
            }
            asset_coverage.insert(asset_type.clone(), cov * 100.0);
        }
        asset_coverage
    }

    /// All product names materialized by any tile on this date.
    pub fn tile_products(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .tiles
            .values()
            .flat_map(|t| t.products.keys().cloned())
            .collect();
        names.sort();
        names.dedup();
        names
    }

    /// Generate missing products tile by tile. Each tile computes its own
    /// delta, so tiles with different pre-existing products do different
    /// work.
    pub fn process(&mut self, engine: &dyn RasterEngine, overwrite: bool) -> Result<()> {
        for (id, tile) in self.tiles.iter_mut() {
            let todo: Vec<String> = tile
                .needed(&self.requested, overwrite)
                .keys()
                .map(|k| (*k).clone())
                .collect();
            if !todo.is_empty() {
                info!(tile = %id, date = %self.date, products = %todo.join(" "), "processing");
                tile.process(&self.requested, engine, overwrite)?;
            }
        }
        Ok(())
    }

    /// Assemble one output per requested product for this date.
    ///
    /// Without a region each tile's products are linked individually into
    /// the destination. With a region the tiles are mosaicked (`no_warp`)
    /// or cookie-cut to the region boundary; assembly is idempotent per
    /// output file. A mask product, when set, is applied to every other
    /// assembled product.
    pub fn project(&mut self, engine: &dyn RasterEngine, opts: &ProjectOptions) -> Result<()> {
        self.process(engine, false)?;
        fs::create_dir_all(&opts.datadir)?;
        let resolution = opts
            .resolution
            .unwrap_or_else(|| self.dataset.default_resolution());

        match self.region.clone() {
            None => self.link_tiles(engine, opts)?,
            Some(region) => self.assemble(engine, &region, resolution, opts)?,
        }
        info!(date = %self.date, tiles = self.tiles.len(), "created project files");
        Ok(())
    }

    fn link_tiles(&mut self, engine: &dyn RasterEngine, opts: &ProjectOptions) -> Result<()> {
        let keys: Vec<String> = self.requested.keys().cloned().collect();
        for tile in self.tiles.values_mut() {
            let keys_ref: Vec<&String> = keys.iter().collect();
            // Masking mutates pixels, so masked outputs must be copies
            tile.link(&keys_ref, &opts.datadir, opts.mask.is_some())?;
            if let Some(mask_key) = &opts.mask {
                let mask_file = tile.products.get(mask_key).cloned().ok_or_else(|| {
                    GeoinvError::MissingProduct {
                        tile: tile.id.clone(),
                        product: mask_key.clone(),
                    }
                })?;
                for key in &keys {
                    if key == mask_key {
                        continue;
                    }
                    if let Some(file) = tile.products.get(key) {
                        engine.apply_mask(file, &mask_file)?;
                    }
                }
            }
        }
        Ok(())
    }

    fn assemble(
        &mut self,
        engine: &dyn RasterEngine,
        region: &Region,
        resolution: (f64, f64),
        opts: &ProjectOptions,
    ) -> Result<()> {
        let stem = format!("{}_{}", region.name(), self.date.format("%Y%j"));
        let keys: Vec<String> = self.requested.keys().cloned().collect();

        for key in &keys {
            let filename = if self.sensor.is_empty() {
                format!("{stem}_{key}.tif")
            } else {
                format!("{stem}_{}_{key}.tif", self.sensor)
            };
            let output = opts.datadir.join(filename);
            if !output.exists() {
                let inputs: Vec<PathBuf> = self
                    .tiles
                    .values()
                    .map(|t| {
                        t.products.get(key).cloned().ok_or_else(|| {
                            GeoinvError::MissingProduct {
                                tile: t.id.clone(),
                                product: key.clone(),
                            }
                        })
                    })
                    .collect::<Result<_>>()?;
                if opts.no_warp {
                    self.mosaic(engine, region, &inputs, &output)?;
                } else {
                    engine.cookie_cut(&inputs, &output, region, resolution)?;
                }
            }
            self.products.insert(key.clone(), output);
        }

        if let Some(mask_key) = &opts.mask {
            let mask_file = self.products.get(mask_key).cloned().ok_or_else(|| {
                GeoinvError::MissingProduct {
                    tile: "<project>".to_string(),
                    product: mask_key.clone(),
                }
            })?;
            for (key, file) in &self.products {
                if key != mask_key {
                    engine.apply_mask(file, &mask_file)?;
                }
            }
        }
        Ok(())
    }

    /// Mosaic without reprojection. All inputs must share one projection;
    /// the check runs before any output is written. Pixels outside the
    /// region geometry are masked via a rasterized vector mask built in a
    /// scoped working directory that is removed when assembly finishes,
    /// successfully or not.
    fn mosaic(
        &self,
        engine: &dyn RasterEngine,
        region: &Region,
        inputs: &[PathBuf],
        output: &Path,
    ) -> Result<()> {
        let first = inputs.first().ok_or(GeoinvError::NoDataFound { date: self.date })?;
        let srs = engine.projection(first)?;
        for input in &inputs[1..] {
            let found = engine.projection(input)?;
            if found != srs {
                return Err(GeoinvError::ProjectionMismatch {
                    expected: srs,
                    found,
                    path: input.clone(),
                });
            }
        }

        let nodata = engine.nodata(first)?;
        let bounds = region.bounds()?;
        engine.mosaic(inputs, output, bounds, nodata)?;

        // TempDir removes the intermediates on drop, including on the
        // error paths below
        let workdir = tempfile::Builder::new().prefix("geoinv-mosaic").tempdir()?;
        let mask = workdir.path().join("region_mask.tif");
        engine.rasterize(region, output, &mask)?;
        engine.apply_mask(output, &mask)?;
        Ok(())
    }
}

impl std::fmt::Debug for TileSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TileSet")
            .field("date", &self.date)
            .field("sensor", &self.sensor)
            .field("tiles", &self.tiles.keys().collect::<Vec<_>>())
            .field("skipped", &self.skipped.len())
            .finish()
    }
}
