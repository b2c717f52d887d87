//! Raw source assets and their discovery
//!
//! An asset is a single as-delivered file for one (tile, date, asset-type).
//! Discovery scans the repository directory for that tile and date against
//! each declared filename pattern; metadata extraction from the matched
//! filename is dataset policy and delegated to the driver.

use crate::error::{GeoinvError, Result};
use crate::ports::Dataset;
use chrono::NaiveDate;
use std::collections::BTreeMap;
use std::path::PathBuf;
use tracing::warn;

/// Declaration of one asset type: how its files are named and where they
/// are fetched from.
#[derive(Debug, Clone)]
pub struct AssetDef {
    /// Glob pattern matched against filenames in the repository directory
    pub pattern: String,

    /// Remote source the asset is fetched from (informational; fetching is
    /// a driver concern)
    pub url: String,
}

/// Sensor metadata declared by a dataset driver
#[derive(Debug, Clone)]
pub struct SensorInfo {
    pub description: String,
}

/// Product metadata declared by a dataset driver
#[derive(Debug, Clone)]
pub struct ProductInfo {
    pub description: String,

    /// Asset types this product is derived from
    pub assets: Vec<String>,
}

/// A discovered raw source file. Immutable once discovered.
#[derive(Debug, Clone)]
pub struct Asset {
    pub path: PathBuf,
    pub asset_type: String,
    pub tile: String,
    pub sensor: String,
    pub date: NaiveDate,

    /// Logical sub-product name to internal dataset locator (e.g. a
    /// sub-dataset reference inside a container file)
    pub products: BTreeMap<String, String>,
}

/// Discover the assets present for one tile and date.
///
/// Fails with [`GeoinvError::AssetNotFound`] only when zero files match
/// across all declared asset types. Files that match a pattern but fail
/// the driver's filename parsing are logged and skipped. When several
/// files match one asset type the lexically last wins, matching archive
/// reprocessing conventions where later versions sort higher.
pub fn discover(
    dataset: &dyn Dataset,
    tile: &str,
    date: NaiveDate,
) -> Result<BTreeMap<String, Asset>> {
    let dir = dataset.repository().path(tile, Some(date));
    let mut found = BTreeMap::new();

    for (asset_type, def) in dataset.assets() {
        let pattern = dir.join(&def.pattern);
        let Some(pattern) = pattern.to_str() else {
            warn!(?pattern, "skipping non-UTF-8 search path");
            continue;
        };
        let paths = match glob::glob(pattern) {
            Ok(paths) => paths,
            Err(e) => {
                warn!(asset_type, pattern, error = %e, "invalid asset pattern");
                continue;
            }
        };
        for entry in paths {
            let path = match entry {
                Ok(path) => path,
                Err(e) => {
                    warn!(asset_type, error = %e, "unreadable path during discovery");
                    continue;
                }
            };
            match dataset.parse_asset(&path, asset_type) {
                Ok(asset) => {
                    found.insert(asset_type.clone(), asset);
                }
                Err(e) => {
                    warn!(asset_type, path = %path.display(), error = %e, "skipping unparseable asset");
                }
            }
        }
    }

    if found.is_empty() {
        return Err(GeoinvError::AssetNotFound {
            tile: tile.to_string(),
            date,
        });
    }
    Ok(found)
}
