//! Driver registry
//!
//! Drivers are registered under their dataset name and validated at
//! registration time, so a broken driver declaration fails when the
//! process starts rather than mid-batch.

use geoinv_core::{Dataset, GeoinvError, Result};
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use crate::aerosol::AerosolDataset;

#[derive(Default)]
pub struct DriverRegistry {
    drivers: BTreeMap<String, Arc<dyn Dataset>>,
}

impl DriverRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a driver after validating its declarations.
    pub fn register(&mut self, dataset: Arc<dyn Dataset>) -> Result<()> {
        validate(&*dataset)?;
        self.drivers.insert(dataset.name().to_string(), dataset);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Result<Arc<dyn Dataset>> {
        self.drivers
            .get(name)
            .cloned()
            .ok_or_else(|| GeoinvError::UnknownDataset {
                name: name.to_string(),
                available: self.names().join(", "),
            })
    }

    pub fn names(&self) -> Vec<String> {
        self.drivers.keys().cloned().collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Arc<dyn Dataset>)> {
        self.drivers.iter()
    }
}

/// Check a driver's static declarations: it must define at least one
/// product, every product must reference declared asset types, and every
/// asset pattern must be a valid glob.
fn validate(dataset: &dyn Dataset) -> Result<()> {
    let invalid = |key: &str, reason: String| GeoinvError::ConfigInvalid {
        key: format!("{}.{key}", dataset.name()),
        reason,
    };

    if dataset.products().is_empty() {
        return Err(invalid("products", "driver defines no products".to_string()));
    }
    for (name, product) in dataset.products() {
        for asset_type in &product.assets {
            if !dataset.assets().contains_key(asset_type) {
                return Err(invalid(
                    name,
                    format!("product references undeclared asset type '{asset_type}'"),
                ));
            }
        }
    }
    for (asset_type, def) in dataset.assets() {
        glob::Pattern::new(&def.pattern)
            .map_err(|e| invalid(asset_type, format!("invalid pattern '{}': {e}", def.pattern)))?;
    }
    Ok(())
}

/// Registry holding every built-in driver, rooted at the archive.
pub fn default_registry(archive_root: &Path) -> Result<DriverRegistry> {
    let mut registry = DriverRegistry::new();
    registry.register(Arc::new(AerosolDataset::new(archive_root)))?;
    Ok(registry)
}
