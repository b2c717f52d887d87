//! The top-level inventory coordinator
//!
//! An inventory reconciles a requested spatial extent (region geometry,
//! explicit tile list, or the whole archive) and a temporal window
//! against the dates that actually hold data, building one [`TileSet`]
//! per resolvable date. Batch operations then walk the dates in order.

pub mod tile;
pub mod tileset;

pub use tile::Tile;
pub use tileset::{ProjectOptions, SkippedTile, TileSet};

use crate::archive;
use crate::coverage::TileCoverage;
use crate::error::{GeoinvError, Result};
use crate::ports::{Dataset, RasterEngine, TileFilter};
use crate::products::ProductRequest;
use crate::region::Region;
use crate::temporal::DateWindow;
use chrono::NaiveDate;
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Display colors assigned to sensors, cycled in first-seen order. The
/// CLI maps these onto terminal colors; the core only fixes the order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SensorColor {
    Purple,
    Red,
    Green,
    Blue,
}

const PALETTE: [SensorColor; 4] = [
    SensorColor::Purple,
    SensorColor::Red,
    SensorColor::Green,
    SensorColor::Blue,
];

/// A sensor observed in the inventory, with its display assignment
#[derive(Debug, Clone)]
pub struct SensorEntry {
    pub code: String,
    pub description: String,
    pub color: SensorColor,
}

/// A candidate date that resolved zero tiles and was dropped
#[derive(Debug, Clone)]
pub struct SkippedDate {
    pub date: NaiveDate,
    pub reason: String,
}

/// Query parameters for building an inventory
#[derive(Debug, Clone, Default)]
pub struct InventoryParams {
    /// Region-of-interest vector file
    pub site: Option<PathBuf>,

    /// Explicit tile list; overrides the region for tile resolution
    pub tiles: Option<Vec<String>>,

    /// `"start,end"` calendar range
    pub dates: Option<String>,

    /// `"d1,d2"` day-of-year range
    pub days: Option<String>,

    /// Requested product names
    pub products: Vec<String>,

    /// Ask the driver to fetch missing assets before resolution
    pub fetch: bool,

    pub filter: TileFilter,
}

pub struct Inventory {
    dataset: Arc<dyn Dataset>,
    region: Option<Arc<Region>>,

    pub window: DateWindow,

    /// Resolved tile set with coverage fractions
    pub tiles: BTreeMap<String, TileCoverage>,

    /// One TileSet per date that resolved at least one tile
    pub data: BTreeMap<NaiveDate, TileSet>,

    /// Candidate dates that resolved nothing
    pub skipped_dates: Vec<SkippedDate>,

    pub requested: ProductRequest,

    /// Sensors observed across all dates, in first-seen order
    pub sensors: Vec<SensorEntry>,

    /// Total tile count across all dates
    pub numfiles: usize,
}

impl Inventory {
    pub fn build(dataset: Arc<dyn Dataset>, params: &InventoryParams) -> Result<Self> {
        let window = DateWindow::parse(params.dates.as_deref(), params.days.as_deref())?;

        let region = match &params.site {
            Some(path) if params.tiles.is_none() => Some(Arc::new(Region::open(path)?)),
            _ => None,
        };
        let tiles = resolve_tiles(&*dataset, region.as_deref(), params)?;
        let requested = ProductRequest::resolve(&params.products, &*dataset)?;

        if params.fetch {
            fetch_and_archive(&*dataset, &requested, &tiles, &window);
        }

        let candidates = candidate_dates(&*dataset, &tiles, &window);
        info!(
            dataset = dataset.name(),
            tiles = tiles.len(),
            dates = candidates.len(),
            "resolved inventory extent"
        );

        let mut data = BTreeMap::new();
        let mut skipped_dates = Vec::new();
        let mut numfiles = 0;
        for date in candidates {
            match TileSet::build(
                dataset.clone(),
                region.clone(),
                tiles.clone(),
                date,
                requested.clone(),
                &params.filter,
            ) {
                Ok(set) => {
                    numfiles += set.tiles.len();
                    data.insert(date, set);
                }
                Err(e) => {
                    debug!(%date, reason = %e, "date skipped");
                    skipped_dates.push(SkippedDate {
                        date,
                        reason: e.to_string(),
                    });
                }
            }
        }

        let sensors = assign_sensors(&*dataset, &data);

        Ok(Self {
            dataset,
            region,
            window,
            tiles,
            data,
            skipped_dates,
            requested,
            sensors,
            numfiles,
        })
    }

    /// Dates with data, ascending
    pub fn dates(&self) -> Vec<NaiveDate> {
        self.data.keys().copied().collect()
    }

    pub fn get(&self, date: NaiveDate) -> Option<&TileSet> {
        self.data.get(&date)
    }

    pub fn dataset(&self) -> &dyn Dataset {
        &*self.dataset
    }

    pub fn region(&self) -> Option<&Region> {
        self.region.as_deref()
    }

    pub fn sensor(&self, code: &str) -> Option<&SensorEntry> {
        self.sensors.iter().find(|s| s.code == code)
    }

    /// Generate missing products across every date.
    pub fn process(&mut self, engine: &dyn RasterEngine, overwrite: bool) -> Result<()> {
        if self.requested.is_empty() {
            return Err(GeoinvError::NoProductsRequested);
        }
        let keys: Vec<String> = self.requested.keys().cloned().collect();
        info!(
            products = %keys.join(" "),
            files = self.numfiles,
            "processing requested products"
        );
        for set in self.data.values_mut() {
            set.process(engine, overwrite)?;
        }
        Ok(())
    }

    /// Assemble project outputs for every date.
    pub fn project(&mut self, engine: &dyn RasterEngine, opts: &ProjectOptions) -> Result<()> {
        if self.requested.is_empty() {
            return Err(GeoinvError::NoProductsRequested);
        }
        let dates = self.dates();
        if let (Some(first), Some(last)) = (dates.first(), dates.last()) {
            info!(dates = dates.len(), %first, %last, "creating project files");
        }
        for set in self.data.values_mut() {
            set.project(engine, opts)?;
        }
        Ok(())
    }
}

impl std::fmt::Debug for Inventory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Inventory")
            .field("dataset", &self.dataset.name())
            .field("window", &self.window)
            .field("tiles", &self.tiles.keys().collect::<Vec<_>>())
            .field("dates", &self.data.len())
            .field("skipped_dates", &self.skipped_dates.len())
            .finish()
    }
}

/// Resolve the tile set: an explicit list gets uniform full coverage, a
/// region goes through the repository's grid mapping (with the `--pcov`
/// and `--ptile` thresholds applied), and neither defaults to the whole
/// archive.
fn resolve_tiles(
    dataset: &dyn Dataset,
    region: Option<&Region>,
    params: &InventoryParams,
) -> Result<BTreeMap<String, TileCoverage>> {
    if let Some(tiles) = &params.tiles {
        return Ok(tiles
            .iter()
            .map(|t| (t.clone(), TileCoverage::FULL))
            .collect());
    }
    if let Some(region) = region {
        let mapped = dataset.repository().region_to_tiles(region)?;
        return Ok(mapped
            .into_iter()
            .filter(|(_, cov)| {
                cov.area_percent() >= params.filter.min_site_coverage
                    && cov.tile_percent() >= params.filter.min_tile_usage
            })
            .collect());
    }
    Ok(dataset
        .repository()
        .find_tiles()?
        .into_iter()
        .map(|t| (t, TileCoverage::FULL))
        .collect())
}

/// Fetch is best effort: a failed fetch or archival leaves the inventory
/// to proceed with whatever exists locally.
fn fetch_and_archive(
    dataset: &dyn Dataset,
    requested: &ProductRequest,
    tiles: &BTreeMap<String, TileCoverage>,
    window: &DateWindow,
) {
    let products = requested.base_products();
    if let Err(e) = dataset.fetch(&products, tiles, window) {
        warn!(error = %e, "fetch failed; continuing with local data");
    }
    let stage = dataset.repository().stage_path();
    if stage.is_dir() {
        match archive::archive_assets(dataset, &stage, true, false) {
            Ok(report) => {
                if !report.archived.is_empty() {
                    info!(count = report.archived.len(), "archived fetched assets");
                }
            }
            Err(e) => warn!(error = %e, "archival of fetched assets failed"),
        }
    }
}

/// Union of each tile's available dates, filtered by the window,
/// deduplicated and sorted. Per-tile enumeration errors are logged and
/// skipped.
fn candidate_dates(
    dataset: &dyn Dataset,
    tiles: &BTreeMap<String, TileCoverage>,
    window: &DateWindow,
) -> Vec<NaiveDate> {
    let mut dates = Vec::new();
    for tile in tiles.keys() {
        match dataset.repository().find_dates(tile) {
            Ok(found) => {
                dates.extend(found.into_iter().filter(|d| window.contains(*d)));
            }
            Err(e) => {
                warn!(tile = %tile, error = %e, "could not enumerate dates");
            }
        }
    }
    dates.sort();
    dates.dedup();
    dates
}

/// Collect distinct sensors in first-seen (date) order and assign each a
/// palette color.
fn assign_sensors(dataset: &dyn Dataset, data: &BTreeMap<NaiveDate, TileSet>) -> Vec<SensorEntry> {
    let mut sensors: Vec<SensorEntry> = Vec::new();
    for set in data.values() {
        if sensors.iter().any(|s| s.code == set.sensor) {
            continue;
        }
        let description = dataset
            .sensors()
            .get(&set.sensor)
            .map(|s| s.description.clone())
            .unwrap_or_default();
        let color = PALETTE[sensors.len() % PALETTE.len()];
        sensors.push(SensorEntry {
            code: set.sensor.clone(),
            description,
            color,
        });
    }
    sensors
}
