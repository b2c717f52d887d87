//! Long-term aerosol climatology composites and point sampling
//!
//! Composites average the daily `aero` product across all archived years,
//! either per day of year (`aerolta_<doy>.tif`) or over every day
//! (`aerolta.tif`). Point sampling walks a fixed fallback chain so a
//! caller always gets a usable optical depth: the day's own product,
//! then the day-of-year average, then the all-time average, then a
//! climatological constant.

use crate::aerosol::AerosolDataset;
use chrono::{Datelike, NaiveDate};
use geoinv_core::{GeoinvError, Inventory, InventoryParams, RasterEngine, Result};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};

/// Continental-average aerosol optical depth, used when no archived data
/// covers the requested point
pub const DEFAULT_AOT: f64 = 0.17;

/// Outcome of a full climatology build
#[derive(Debug, Default)]
pub struct ClimatologyReport {
    /// Composites written (or already present), per day of year
    pub built: Vec<PathBuf>,

    /// Days of year with no archived data
    pub empty_days: Vec<u32>,

    /// All-time composite, when at least one daily composite exists
    pub lta: Option<PathBuf>,
}

/// Build the long-term average composite for one day of year across all
/// archived years. Returns `None` when no year holds data for that day.
/// An existing composite is reused unless `overwrite` is set.
pub fn process_daily_lta(
    dataset: &Arc<AerosolDataset>,
    engine: &dyn RasterEngine,
    doy: u32,
    overwrite: bool,
) -> Result<Option<PathBuf>> {
    let output = dataset.daily_lta_path(doy);
    if output.is_file() && !overwrite {
        return Ok(Some(output));
    }

    let params = InventoryParams {
        days: Some(format!("{doy},{doy}")),
        products: vec!["aero".to_string()],
        ..Default::default()
    };
    let driver: Arc<dyn geoinv_core::Dataset> = dataset.clone();
    let mut inventory = Inventory::build(driver, &params)?;
    if inventory.data.is_empty() {
        return Ok(None);
    }
    inventory.process(engine, false)?;

    let inputs: Vec<PathBuf> = inventory
        .data
        .values()
        .flat_map(|set| set.tiles.values())
        .filter_map(|tile| tile.products.get("aero").cloned())
        .collect();
    if inputs.is_empty() {
        return Ok(None);
    }

    if let Some(parent) = output.parent() {
        fs::create_dir_all(parent)?;
    }
    info!(doy, years = inputs.len(), "building daily long-term average");
    engine.mean_stack(&inputs, &output)?;
    Ok(Some(output))
}

/// Build the all-time composite from the existing daily composites.
pub fn process_lta_all(
    dataset: &AerosolDataset,
    engine: &dyn RasterEngine,
    overwrite: bool,
) -> Result<Option<PathBuf>> {
    let output = dataset.lta_path();
    if output.is_file() && !overwrite {
        return Ok(Some(output));
    }

    let mut inputs: Vec<PathBuf> = (1..=366)
        .map(|doy| dataset.daily_lta_path(doy))
        .filter(|p| p.is_file())
        .collect();
    inputs.sort();
    if inputs.is_empty() {
        return Ok(None);
    }

    if let Some(parent) = output.parent() {
        fs::create_dir_all(parent)?;
    }
    info!(days = inputs.len(), "building all-time long-term average");
    engine.mean_stack(&inputs, &output)?;
    Ok(Some(output))
}

/// Build the complete climatology: every day of year, then the all-time
/// composite. Days that fail accumulate in the report instead of
/// aborting the run.
pub fn process_lta(
    dataset: &Arc<AerosolDataset>,
    engine: &dyn RasterEngine,
    overwrite: bool,
) -> Result<ClimatologyReport> {
    let mut report = ClimatologyReport::default();
    for doy in 1..=366 {
        match process_daily_lta(dataset, engine, doy, overwrite) {
            Ok(Some(path)) => report.built.push(path),
            Ok(None) => report.empty_days.push(doy),
            Err(e) => {
                warn!(doy, error = %e, "daily composite failed");
                report.empty_days.push(doy);
            }
        }
    }
    report.lta = process_lta_all(dataset, engine, overwrite)?;
    Ok(report)
}

/// Sample aerosol optical depth at a geographic point for a date.
///
/// Sources are tried in order: the date's own `aero` product, the daily
/// long-term average for its day of year, the all-time average, and
/// finally [`DEFAULT_AOT`]. Within each raster the pixel itself wins;
/// a no-data pixel falls back to the mean of its valid 3x3 neighbors.
pub fn sample_aot(
    dataset: &AerosolDataset,
    engine: &dyn RasterEngine,
    lat: f64,
    lon: f64,
    date: NaiveDate,
) -> Result<f64> {
    if !(-90.0..=90.0).contains(&lat) || !(-180.0..=180.0).contains(&lon) {
        return Err(GeoinvError::ConfigInvalid {
            key: "point".to_string(),
            reason: format!("({lat}, {lon}) is not a geographic coordinate"),
        });
    }
    // One degree global grid with the origin at (180W, 90N). Longitude
    // wraps across the antimeridian; latitude clamps at the poles.
    let col = ((lon + 179.5).round() as i64).rem_euclid(360);
    let row = ((89.5 - lat).round() as i64).clamp(0, 179);

    let mut candidates: Vec<PathBuf> = Vec::new();
    if let Some(daily) = geoinv_core::Dataset::find_products(dataset, "", date)?.remove("aero") {
        candidates.push(daily);
    }
    let daily_lta = dataset.daily_lta_path(date.ordinal());
    if daily_lta.is_file() {
        candidates.push(daily_lta);
    }
    let lta = dataset.lta_path();
    if lta.is_file() {
        candidates.push(lta);
    }

    for raster in &candidates {
        if let Some(value) = sample_point(engine, raster, col, row)? {
            return Ok(value);
        }
    }
    warn!(lat, lon, %date, "no aerosol data covers the point; using default");
    Ok(DEFAULT_AOT)
}

/// Read the pixel at (col, row), falling back to the mean of the valid
/// pixels in its 3x3 neighborhood.
fn sample_point(
    engine: &dyn RasterEngine,
    raster: &Path,
    col: i64,
    row: i64,
) -> Result<Option<f64>> {
    let window = engine.sample_window(raster, col - 1, row - 1, 3, 3)?;
    if let Some(center) = window.get(4).copied().flatten() {
        return Ok(Some(center));
    }
    let valid: Vec<f64> = window.into_iter().flatten().collect();
    if valid.is_empty() {
        Ok(None)
    } else {
        Ok(Some(valid.iter().sum::<f64>() / valid.len() as f64))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use geoinv_core::Region;
    use std::collections::BTreeMap;
    use std::sync::Mutex;

    /// Engine stub: records mean-stack and sampling calls and serves
    /// configured pixel windows keyed by raster filename.
    #[derive(Default)]
    struct StubEngine {
        windows: BTreeMap<String, Vec<Option<f64>>>,
        stacked: Mutex<Vec<(usize, PathBuf)>>,
        sampled: Mutex<Vec<(i64, i64)>>,
    }

    impl StubEngine {
        fn with_window(mut self, filename: &str, window: Vec<Option<f64>>) -> Self {
            self.windows.insert(filename.to_string(), window);
            self
        }
    }

    impl RasterEngine for StubEngine {
        fn projection(&self, _raster: &Path) -> Result<String> {
            Ok("EPSG:4326".to_string())
        }

        fn nodata(&self, _raster: &Path) -> Result<Option<f64>> {
            Ok(Some(-9999.0))
        }

        fn translate(&self, _locator: &str, output: &Path) -> Result<()> {
            fs::write(output, "raster")?;
            Ok(())
        }

        fn mosaic(
            &self,
            _inputs: &[PathBuf],
            output: &Path,
            _bounds: geo::Rect<f64>,
            _nodata: Option<f64>,
        ) -> Result<()> {
            fs::write(output, "raster")?;
            Ok(())
        }

        fn rasterize(&self, _region: &Region, _like: &Path, output: &Path) -> Result<()> {
            fs::write(output, "raster")?;
            Ok(())
        }

        fn cookie_cut(
            &self,
            _inputs: &[PathBuf],
            output: &Path,
            _region: &Region,
            _resolution: (f64, f64),
        ) -> Result<()> {
            fs::write(output, "raster")?;
            Ok(())
        }

        fn apply_mask(&self, _raster: &Path, _mask: &Path) -> Result<()> {
            Ok(())
        }

        fn mean_stack(&self, inputs: &[PathBuf], output: &Path) -> Result<()> {
            self.stacked
                .lock()
                .unwrap()
                .push((inputs.len(), output.to_path_buf()));
            fs::write(output, "raster")?;
            Ok(())
        }

        fn sample_window(
            &self,
            raster: &Path,
            col: i64,
            row: i64,
            width: usize,
            height: usize,
        ) -> Result<Vec<Option<f64>>> {
            self.sampled.lock().unwrap().push((col, row));
            let name = raster.file_name().and_then(|n| n.to_str()).unwrap_or("");
            Ok(self
                .windows
                .get(name)
                .cloned()
                .unwrap_or_else(|| vec![None; width * height]))
        }
    }

    fn seed_granule(archive: &Path, year: i32, doy: u32) {
        let dir = archive
            .join("mod08/tiles")
            .join(format!("{year:04}"))
            .join(format!("{doy:03}"));
        fs::create_dir_all(&dir).unwrap();
        let name = format!("MOD08_D3.A{year:04}{doy:03}.061.2017310140249.hdf");
        fs::write(dir.join(name), "granule").unwrap();
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn daily_lta_averages_across_years() {
        let archive = tempfile::tempdir().unwrap();
        seed_granule(archive.path(), 2011, 204);
        seed_granule(archive.path(), 2012, 204);
        let dataset = Arc::new(AerosolDataset::new(archive.path()));
        let engine = StubEngine::default();

        let output = process_daily_lta(&dataset, &engine, 204, false)
            .unwrap()
            .unwrap();
        assert_eq!(output, dataset.daily_lta_path(204));
        assert!(output.is_file());
        let stacked = engine.stacked.lock().unwrap();
        assert_eq!(stacked.len(), 1);
        assert_eq!(stacked[0].0, 2);
    }

    #[test]
    fn daily_lta_is_none_for_empty_days() {
        let archive = tempfile::tempdir().unwrap();
        seed_granule(archive.path(), 2012, 204);
        let dataset = Arc::new(AerosolDataset::new(archive.path()));
        let engine = StubEngine::default();

        assert!(process_daily_lta(&dataset, &engine, 100, false)
            .unwrap()
            .is_none());
    }

    #[test]
    fn existing_daily_lta_is_reused() {
        let archive = tempfile::tempdir().unwrap();
        let dataset = Arc::new(AerosolDataset::new(archive.path()));
        let existing = dataset.daily_lta_path(204);
        fs::create_dir_all(existing.parent().unwrap()).unwrap();
        fs::write(&existing, "raster").unwrap();

        let engine = StubEngine::default();
        let output = process_daily_lta(&dataset, &engine, 204, false)
            .unwrap()
            .unwrap();
        assert_eq!(output, existing);
        assert!(engine.stacked.lock().unwrap().is_empty());
    }

    #[test]
    fn all_time_lta_stacks_daily_composites() {
        let archive = tempfile::tempdir().unwrap();
        let dataset = Arc::new(AerosolDataset::new(archive.path()));
        for doy in [10, 20, 30] {
            let daily = dataset.daily_lta_path(doy);
            fs::create_dir_all(daily.parent().unwrap()).unwrap();
            fs::write(&daily, "raster").unwrap();
        }

        let engine = StubEngine::default();
        let output = process_lta_all(&dataset, &engine, false).unwrap().unwrap();
        assert_eq!(output, dataset.lta_path());
        let stacked = engine.stacked.lock().unwrap();
        assert_eq!(stacked[0].0, 3);
    }

    #[test]
    fn composite_refresh_makes_aerolta_producible() {
        let archive = tempfile::tempdir().unwrap();
        seed_granule(archive.path(), 2011, 204);
        seed_granule(archive.path(), 2012, 204);
        let dataset = Arc::new(AerosolDataset::new(archive.path()));
        let engine = StubEngine::default();

        // Archiving day 204 of 2012 rebuilds that day's composite
        geoinv_core::Dataset::update_composites(
            &*dataset,
            &[NaiveDate::from_yo_opt(2012, 204).unwrap()],
            &engine,
        )
        .unwrap();
        assert!(dataset.daily_lta_path(204).is_file());
        assert_eq!(engine.stacked.lock().unwrap()[0].0, 2);

        let driver: Arc<dyn geoinv_core::Dataset> = dataset.clone();
        let params = InventoryParams {
            products: vec!["aerolta".to_string()],
            ..Default::default()
        };
        let mut inventory = Inventory::build(driver, &params).unwrap();
        inventory.process(&engine, false).unwrap();
        let produced = inventory
            .data
            .values()
            .flat_map(|set| set.tiles.values())
            .filter(|tile| tile.products.contains_key("aerolta"))
            .count();
        assert_eq!(produced, 2);
    }

    #[test]
    fn sampling_prefers_the_dates_own_product() {
        let archive = tempfile::tempdir().unwrap();
        let dataset = Arc::new(AerosolDataset::new(archive.path()));
        let d = date(2012, 7, 22);

        let dir = archive.path().join("mod08/tiles/2012/204");
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join("2012204_MOD_aero.tif"), "raster").unwrap();

        let mut window = vec![None; 9];
        window[4] = Some(0.31);
        let engine = StubEngine::default().with_window("2012204_MOD_aero.tif", window);

        let aot = sample_aot(&dataset, &engine, 42.0, -71.0, d).unwrap();
        assert!((aot - 0.31).abs() < 1e-9);
    }

    #[test]
    fn nodata_center_falls_back_to_neighbor_mean() {
        let archive = tempfile::tempdir().unwrap();
        let dataset = Arc::new(AerosolDataset::new(archive.path()));
        let d = date(2012, 7, 22);

        let dir = archive.path().join("mod08/tiles/2012/204");
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join("2012204_MOD_aero.tif"), "raster").unwrap();

        let mut window = vec![None; 9];
        window[0] = Some(0.2);
        window[8] = Some(0.4);
        let engine = StubEngine::default().with_window("2012204_MOD_aero.tif", window);

        let aot = sample_aot(&dataset, &engine, 42.0, -71.0, d).unwrap();
        assert!((aot - 0.3).abs() < 1e-9);
    }

    #[test]
    fn empty_product_falls_through_to_long_term_averages() {
        let archive = tempfile::tempdir().unwrap();
        let dataset = Arc::new(AerosolDataset::new(archive.path()));
        let d = date(2012, 7, 22);

        // Per-date product exists but holds no valid pixels near the point
        let dir = archive.path().join("mod08/tiles/2012/204");
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join("2012204_MOD_aero.tif"), "raster").unwrap();

        let lta = dataset.lta_path();
        fs::create_dir_all(lta.parent().unwrap()).unwrap();
        fs::write(&lta, "raster").unwrap();

        let mut window = vec![None; 9];
        window[4] = Some(0.25);
        let engine = StubEngine::default().with_window("aerolta.tif", window);

        let aot = sample_aot(&dataset, &engine, 42.0, -71.0, d).unwrap();
        assert!((aot - 0.25).abs() < 1e-9);
    }

    #[test]
    fn no_data_anywhere_yields_the_default() {
        let archive = tempfile::tempdir().unwrap();
        let dataset = Arc::new(AerosolDataset::new(archive.path()));
        let engine = StubEngine::default();

        let aot = sample_aot(&dataset, &engine, 42.0, -71.0, date(2012, 7, 22)).unwrap();
        assert!((aot - DEFAULT_AOT).abs() < 1e-9);
    }

    #[test]
    fn antimeridian_and_pole_points_stay_on_the_grid() {
        let archive = tempfile::tempdir().unwrap();
        let dataset = Arc::new(AerosolDataset::new(archive.path()));
        let d = date(2012, 7, 22);

        let dir = archive.path().join("mod08/tiles/2012/204");
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join("2012204_MOD_aero.tif"), "raster").unwrap();

        let mut window = vec![None; 9];
        window[4] = Some(0.4);
        let engine = StubEngine::default().with_window("2012204_MOD_aero.tif", window);

        let aot = sample_aot(&dataset, &engine, -90.0, -180.0, d).unwrap();
        assert!((aot - 0.4).abs() < 1e-9);
        // Longitude -180 wraps to column 359, latitude -90 clamps to the
        // last row; the 3x3 window starts one pixel up and left of those.
        let sampled = engine.sampled.lock().unwrap();
        assert_eq!(sampled.as_slice(), &[(358, 178)]);
    }

    #[test]
    fn rejects_non_geographic_points() {
        let archive = tempfile::tempdir().unwrap();
        let dataset = Arc::new(AerosolDataset::new(archive.path()));
        let engine = StubEngine::default();

        assert!(sample_aot(&dataset, &engine, 120.0, -71.0, date(2012, 7, 22)).is_err());
    }
}
