//! MODIS daily aerosol driver (MOD08/MYD08 level-3 atmosphere grids)
//!
//! The archive is tile-less: each day is a single global grid at one
//! degree resolution, filed under `tiles/<year>/<doy>/`. Terra (MOD) and
//! Aqua (MYD) granules are separate asset types; the `aero` product
//! extracts the optical depth sub-dataset from whichever granule is
//! present.

use chrono::{Datelike, NaiveDate};
use geoinv_core::{
    Asset, AssetDef, Dataset, GeoinvError, ProcessContext, ProductInfo, ProductSpec,
    RasterEngine, Region, Repository, Result, SensorInfo, TileCoverage,
};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;

/// Directory name under the archive root
const ROOT_DIR: &str = "mod08";

/// Sub-dataset holding aerosol optical depth inside a granule
const AOD_SUBDATASET: &str = "Optical_Depth_Land_And_Ocean_Mean";

/// Composite category for per-day-of-year long-term averages
pub const LTA_DAILY_CATEGORY: &str = "lta-daily";

/// Composite category for the all-time long-term average
pub const LTA_CATEGORY: &str = "lta";

pub struct AerosolRepository {
    root: PathBuf,
}

impl AerosolRepository {
    pub fn new(archive_root: &Path) -> Self {
        Self {
            root: archive_root.join(ROOT_DIR),
        }
    }
}

impl Repository for AerosolRepository {
    fn path(&self, _tile: &str, date: Option<NaiveDate>) -> PathBuf {
        let tiles = self.root.join("tiles");
        match date {
            Some(d) => tiles
                .join(format!("{:04}", d.year()))
                .join(format!("{:03}", d.ordinal())),
            None => tiles,
        }
    }

    /// The archive has a single global tile, identified by the empty
    /// string so that output filenames carry no tile component.
    fn find_tiles(&self) -> Result<Vec<String>> {
        Ok(vec![String::new()])
    }

    fn find_dates(&self, _tile: &str) -> Result<Vec<NaiveDate>> {
        let mut dates = Vec::new();
        let tiles = self.root.join("tiles");
        if !tiles.is_dir() {
            return Ok(dates);
        }
        for year_entry in fs::read_dir(tiles)? {
            let year_dir = year_entry?.path();
            let Some(year) = year_dir
                .file_name()
                .and_then(|n| n.to_str())
                .and_then(|n| n.parse::<i32>().ok())
            else {
                continue;
            };
            if !year_dir.is_dir() {
                continue;
            }
            for doy_entry in fs::read_dir(year_dir)? {
                let Some(doy) = doy_entry?
                    .file_name()
                    .to_str()
                    .and_then(|n| n.parse::<u32>().ok())
                else {
                    continue;
                };
                if let Some(date) = NaiveDate::from_yo_opt(year, doy) {
                    dates.push(date);
                }
            }
        }
        dates.sort();
        Ok(dates)
    }

    /// Every region falls inside the global grid.
    fn region_to_tiles(&self, _region: &Region) -> Result<BTreeMap<String, TileCoverage>> {
        Ok([(String::new(), TileCoverage::FULL)].into_iter().collect())
    }

    fn archive_path(&self, category: &str) -> PathBuf {
        self.root.join("composites").join(category)
    }

    fn stage_path(&self) -> PathBuf {
        self.root.join("stage")
    }
}

pub struct AerosolDataset {
    archive_root: PathBuf,
    repository: AerosolRepository,
    assets: BTreeMap<String, AssetDef>,
    sensors: BTreeMap<String, SensorInfo>,
    products: BTreeMap<String, ProductInfo>,
}

impl AerosolDataset {
    pub fn new(archive_root: &Path) -> Self {
        let mut assets = BTreeMap::new();
        assets.insert(
            "MOD08".to_string(),
            AssetDef {
                pattern: "MOD08_D3*.hdf".to_string(),
                url: "https://ladsweb.modaps.eosdis.nasa.gov/archive/allData/61/MOD08_D3"
                    .to_string(),
            },
        );
        assets.insert(
            "MYD08".to_string(),
            AssetDef {
                pattern: "MYD08_D3*.hdf".to_string(),
                url: "https://ladsweb.modaps.eosdis.nasa.gov/archive/allData/61/MYD08_D3"
                    .to_string(),
            },
        );

        let mut sensors = BTreeMap::new();
        sensors.insert(
            "MOD".to_string(),
            SensorInfo {
                description: "Terra MODIS".to_string(),
            },
        );
        sensors.insert(
            "MYD".to_string(),
            SensorInfo {
                description: "Aqua MODIS".to_string(),
            },
        );

        let mut products = BTreeMap::new();
        products.insert(
            "aero".to_string(),
            ProductInfo {
                description: "Daily aerosol optical thickness".to_string(),
                assets: vec!["MOD08".to_string(), "MYD08".to_string()],
            },
        );
        products.insert(
            "aerolta".to_string(),
            ProductInfo {
                description: "Long-term average aerosol optical thickness for the day of year"
                    .to_string(),
                assets: vec!["MOD08".to_string(), "MYD08".to_string()],
            },
        );

        Self {
            archive_root: archive_root.to_path_buf(),
            repository: AerosolRepository::new(archive_root),
            assets,
            sensors,
            products,
        }
    }

    /// Path of the per-day-of-year long-term average composite
    pub fn daily_lta_path(&self, doy: u32) -> PathBuf {
        self.repository
            .archive_path(LTA_DAILY_CATEGORY)
            .join(format!("aerolta_{doy:03}.tif"))
    }

    /// Path of the all-time long-term average composite
    pub fn lta_path(&self) -> PathBuf {
        self.repository.archive_path(LTA_CATEGORY).join("aerolta.tif")
    }
}

impl Dataset for AerosolDataset {
    fn name(&self) -> &str {
        "aod"
    }

    fn description(&self) -> &str {
        "MODIS daily global aerosol (MOD08/MYD08 atmosphere grids)"
    }

    fn repository(&self) -> &dyn Repository {
        &self.repository
    }

    fn assets(&self) -> &BTreeMap<String, AssetDef> {
        &self.assets
    }

    fn sensors(&self) -> &BTreeMap<String, SensorInfo> {
        &self.sensors
    }

    fn products(&self) -> &BTreeMap<String, ProductInfo> {
        &self.products
    }

    /// Granule names look like `MOD08_D3.A2012204.061.<production>.hdf`:
    /// sensor in the first three characters, acquisition year and day of
    /// year after the `.A` marker.
    fn parse_asset(&self, path: &Path, asset_type: &str) -> Result<Asset> {
        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or_default()
            .to_string();
        let unrecognized = |reason: &str| GeoinvError::UnrecognizedAsset {
            name: name.clone(),
            reason: reason.to_string(),
        };

        if name.get(8..10) != Some(".A") {
            return Err(unrecognized("missing '.A' acquisition marker"));
        }
        let year: i32 = name
            .get(10..14)
            .and_then(|s| s.parse().ok())
            .ok_or_else(|| unrecognized("unparseable year"))?;
        let doy: u32 = name
            .get(14..17)
            .and_then(|s| s.parse().ok())
            .ok_or_else(|| unrecognized("unparseable day of year"))?;
        let date = NaiveDate::from_yo_opt(year, doy)
            .ok_or_else(|| unrecognized("day of year out of range"))?;
        let sensor = name
            .get(0..3)
            .ok_or_else(|| unrecognized("name too short"))?
            .to_string();

        let locator = format!(
            "HDF4_EOS:EOS_GRID:\"{}\":mod08:{AOD_SUBDATASET}",
            path.display()
        );
        let mut products = BTreeMap::new();
        products.insert("aero".to_string(), locator);

        Ok(Asset {
            path: path.to_path_buf(),
            asset_type: asset_type.to_string(),
            tile: String::new(),
            sensor,
            date,
            products,
        })
    }

    fn find_products(&self, tile: &str, date: NaiveDate) -> Result<BTreeMap<String, PathBuf>> {
        let dir = self.repository.path(tile, Some(date));
        let mut found = BTreeMap::new();
        for product in self.products.keys() {
            let pattern = dir.join(format!("*_{product}.tif"));
            let Some(pattern) = pattern.to_str() else {
                continue;
            };
            if let Ok(paths) = glob::glob(pattern) {
                // Lexically last wins when reprocessing left several
                if let Some(path) = paths.filter_map(|p| p.ok()).max() {
                    found.insert(product.clone(), path);
                }
            }
        }
        Ok(found)
    }

    fn process_product(
        &self,
        ctx: &ProcessContext<'_>,
        spec: &ProductSpec,
        engine: &dyn RasterEngine,
    ) -> Result<()> {
        match spec.product.as_str() {
            "aero" => {
                let locator = ctx
                    .assets
                    .values()
                    .find_map(|a| a.products.get("aero"))
                    .ok_or(GeoinvError::AssetNotFound {
                        tile: ctx.tile.to_string(),
                        date: ctx.date,
                    })?;
                debug!(locator = %locator, output = %ctx.output.display(), "extracting optical depth");
                engine.translate(locator, ctx.output)
            }
            "aerolta" => {
                let doy = ctx.date.ordinal();
                let source = self.daily_lta_path(doy);
                if !source.is_file() {
                    return Err(GeoinvError::MissingProduct {
                        tile: LTA_DAILY_CATEGORY.to_string(),
                        product: format!("aerolta_{doy:03}"),
                    });
                }
                fs::copy(&source, ctx.output)?;
                Ok(())
            }
            other => Err(GeoinvError::UnknownProduct {
                name: other.to_string(),
                available: self
                    .products
                    .keys()
                    .cloned()
                    .collect::<Vec<_>>()
                    .join(", "),
            }),
        }
    }

    /// Newly archived granules invalidate the day-of-year composites the
    /// `aerolta` product is cut from, so rebuild one per affected day.
    fn update_composites(&self, dates: &[NaiveDate], engine: &dyn RasterEngine) -> Result<()> {
        let driver = Arc::new(AerosolDataset::new(&self.archive_root));
        let mut days: Vec<u32> = dates.iter().map(|d| d.ordinal()).collect();
        days.sort_unstable();
        days.dedup();
        for doy in days {
            crate::climatology::process_daily_lta(&driver, engine, doy, true)?;
        }
        Ok(())
    }

    /// One degree grid
    fn default_resolution(&self) -> (f64, f64) {
        (1.0, 1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_terra_granule_name() {
        let dataset = AerosolDataset::new(Path::new("/data/archive"));
        let path = Path::new("/stage/MOD08_D3.A2012204.061.2017310140249.hdf");
        let asset = dataset.parse_asset(path, "MOD08").unwrap();
        assert_eq!(asset.sensor, "MOD");
        assert_eq!(asset.date, NaiveDate::from_ymd_opt(2012, 7, 22).unwrap());
        assert_eq!(asset.tile, "");
        let locator = &asset.products["aero"];
        assert!(locator.starts_with("HDF4_EOS:EOS_GRID:"));
        assert!(locator.ends_with(AOD_SUBDATASET));
    }

    #[test]
    fn parses_aqua_granule_name() {
        let dataset = AerosolDataset::new(Path::new("/data/archive"));
        let path = Path::new("MYD08_D3.A2000001.061.2017276150000.hdf");
        let asset = dataset.parse_asset(path, "MYD08").unwrap();
        assert_eq!(asset.sensor, "MYD");
        assert_eq!(asset.date, NaiveDate::from_ymd_opt(2000, 1, 1).unwrap());
    }

    #[test]
    fn rejects_malformed_granule_names() {
        let dataset = AerosolDataset::new(Path::new("/data/archive"));
        for name in ["MOD08_D3.hdf", "MOD08_D3.A20122.hdf", "notagranule.hdf"] {
            let err = dataset.parse_asset(Path::new(name), "MOD08").unwrap_err();
            assert!(matches!(err, GeoinvError::UnrecognizedAsset { .. }), "{name}");
        }
    }

    #[test]
    fn rejects_out_of_range_day_of_year() {
        let dataset = AerosolDataset::new(Path::new("/data/archive"));
        let err = dataset
            .parse_asset(Path::new("MOD08_D3.A2011366.061.x.hdf"), "MOD08")
            .unwrap_err();
        assert!(matches!(err, GeoinvError::UnrecognizedAsset { .. }));
    }

    #[test]
    fn repository_paths_follow_year_doy_layout() {
        let repo = AerosolRepository::new(Path::new("/data/archive"));
        let date = NaiveDate::from_ymd_opt(2012, 7, 22).unwrap();
        assert_eq!(
            repo.path("", Some(date)),
            PathBuf::from("/data/archive/mod08/tiles/2012/204")
        );
        assert_eq!(
            repo.archive_path(LTA_DAILY_CATEGORY),
            PathBuf::from("/data/archive/mod08/composites/lta-daily")
        );
    }

    #[test]
    fn find_dates_scans_year_and_doy_directories() {
        let dir = tempfile::tempdir().unwrap();
        let repo = AerosolRepository::new(dir.path());
        for (year, doy) in [(2011, 365), (2012, 1), (2012, 204)] {
            fs::create_dir_all(
                dir.path()
                    .join(ROOT_DIR)
                    .join("tiles")
                    .join(format!("{year:04}"))
                    .join(format!("{doy:03}")),
            )
            .unwrap();
        }
        // Stray non-numeric entries are ignored
        fs::create_dir_all(dir.path().join(ROOT_DIR).join("tiles").join("scratch")).unwrap();

        let dates = repo.find_dates("").unwrap();
        assert_eq!(
            dates,
            vec![
                NaiveDate::from_yo_opt(2011, 365).unwrap(),
                NaiveDate::from_yo_opt(2012, 1).unwrap(),
                NaiveDate::from_yo_opt(2012, 204).unwrap(),
            ]
        );
    }

    #[test]
    fn daily_lta_path_is_zero_padded() {
        let dataset = AerosolDataset::new(Path::new("/data/archive"));
        assert_eq!(
            dataset.daily_lta_path(7),
            PathBuf::from("/data/archive/mod08/composites/lta-daily/aerolta_007.tif")
        );
        assert_eq!(
            dataset.lta_path(),
            PathBuf::from("/data/archive/mod08/composites/lta/aerolta.tif")
        );
    }
}
