//! One tile on one date: discovered assets and derived products

use crate::asset::{self, Asset};
use crate::coverage::TileCoverage;
use crate::error::{GeoinvError, Result};
use crate::ports::{product_filename, Dataset, ProcessContext, RasterEngine, TileFilter};
use crate::products::{ProductRequest, ProductSpec};
use chrono::NaiveDate;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, warn};

/// A single tile/date with at least one accepted asset.
///
/// Construction fails if discovery finds nothing, the driver's filter
/// rejects the assets, or the sensor is not in the requested set; callers
/// record the failure and move on to the next tile.
pub struct Tile {
    pub id: String,
    pub date: NaiveDate,
    pub sensor: String,
    pub coverage: TileCoverage,
    pub assets: BTreeMap<String, Asset>,
    pub products: BTreeMap<String, PathBuf>,
    dataset: Arc<dyn Dataset>,
}

impl Tile {
    pub fn build(
        dataset: Arc<dyn Dataset>,
        id: &str,
        date: NaiveDate,
        coverage: TileCoverage,
        filter: &TileFilter,
    ) -> Result<Self> {
        let assets = asset::discover(&*dataset, id, date)?;

        let sensor = assets
            .values()
            .next()
            .map(|a| a.sensor.clone())
            .unwrap_or_default();
        if let Some(allowed) = &filter.sensors {
            if !allowed.contains(&sensor) {
                return Err(GeoinvError::TileRejected {
                    tile: id.to_string(),
                    date,
                    reason: format!("sensor '{sensor}' not in requested set"),
                });
            }
        }
        dataset.accept(&assets, filter).map_err(|e| GeoinvError::TileRejected {
            tile: id.to_string(),
            date,
            reason: e.to_string(),
        })?;

        let products = dataset.find_products(id, date)?;
        debug!(
            tile = id,
            %date,
            assets = assets.len(),
            products = products.len(),
            "resolved tile"
        );

        Ok(Self {
            id: id.to_string(),
            date,
            sensor,
            coverage,
            assets,
            products,
            dataset,
        })
    }

    /// Requested products that still need generating. A product already
    /// recorded on disk is skipped unless `overwrite` is set.
    pub fn needed<'r>(
        &self,
        requested: &'r ProductRequest,
        overwrite: bool,
    ) -> BTreeMap<&'r String, &'r ProductSpec> {
        requested
            .iter()
            .filter(|(key, _)| overwrite || !self.products.contains_key(*key))
            .collect()
    }

    /// Generate the missing requested products. A failure in one product
    /// is logged and does not abort the others; successful outputs are
    /// recorded in `products`.
    pub fn process(
        &mut self,
        requested: &ProductRequest,
        engine: &dyn RasterEngine,
        overwrite: bool,
    ) -> Result<()> {
        let todo: Vec<(String, ProductSpec)> = self
            .needed(requested, overwrite)
            .into_iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        if todo.is_empty() {
            return Ok(());
        }

        let dir = self.dataset.repository().path(&self.id, Some(self.date));
        fs::create_dir_all(&dir)?;

        for (key, spec) in todo {
            let output = dir.join(product_filename(&self.id, self.date, &self.sensor, &key));
            let ctx = ProcessContext {
                tile: &self.id,
                date: self.date,
                sensor: &self.sensor,
                assets: &self.assets,
                output: &output,
            };
            match self.dataset.process_product(&ctx, &spec, engine) {
                Ok(()) => {
                    self.products.insert(key, output);
                }
                Err(e) => {
                    warn!(tile = %self.id, date = %self.date, product = %key, error = %e,
                        "product generation failed");
                }
            }
        }
        Ok(())
    }

    /// Materialize this tile's products into a destination directory under
    /// the canonical naming scheme, by symlink or copy.
    pub fn link(&mut self, products: &[&String], dest: &Path, copy: bool) -> Result<()> {
        fs::create_dir_all(dest)?;
        for key in products {
            let source = self.products.get(*key).ok_or_else(|| GeoinvError::MissingProduct {
                tile: self.id.clone(),
                product: (*key).clone(),
            })?;
            let target = dest.join(product_filename(&self.id, self.date, &self.sensor, key));
            if target.exists() {
                fs::remove_file(&target)?;
            }
            if copy {
                fs::copy(source, &target)?;
            } else {
                #[cfg(unix)]
                std::os::unix::fs::symlink(source, &target)?;
                #[cfg(not(unix))]
                fs::copy(source, &target)?;
            }
            self.products.insert((*key).clone(), target);
        }
        Ok(())
    }
}
