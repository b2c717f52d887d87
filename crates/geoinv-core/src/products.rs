//! Requested-product resolution
//!
//! Product requests arrive as plain names like `aero` or parameterized
//! names like `ref_toa`, where the leading component selects a product
//! defined by the dataset driver and the remainder becomes its argument
//! list. Requests are validated against the driver's product table up
//! front so that a typo fails before any resolution work starts.

use crate::error::{GeoinvError, Result};
use crate::ports::Dataset;
use std::collections::BTreeMap;

/// One requested product: the base product to generate plus its arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProductSpec {
    pub product: String,
    pub args: Vec<String>,
}

impl ProductSpec {
    pub fn bare(product: &str) -> Self {
        Self {
            product: product.to_string(),
            args: Vec::new(),
        }
    }
}

/// Validated mapping from output key to product spec. The output key is
/// the full requested name (base plus arguments) and names the product
/// entry in tile and project output maps.
#[derive(Debug, Clone, Default)]
pub struct ProductRequest {
    specs: BTreeMap<String, ProductSpec>,
}

impl ProductRequest {
    /// Resolve a list of requested names against the driver's product
    /// table. An empty list defaults to the driver's sole product when it
    /// defines exactly one; otherwise the request stays empty and batch
    /// operations will refuse to run.
    pub fn resolve(names: &[String], dataset: &dyn Dataset) -> Result<Self> {
        let defined = dataset.products();

        if names.is_empty() {
            let mut specs = BTreeMap::new();
            if defined.len() == 1 {
                if let Some(name) = defined.keys().next() {
                    specs.insert(name.clone(), ProductSpec::bare(name));
                }
            }
            return Ok(Self { specs });
        }

        let mut specs = BTreeMap::new();
        for name in names {
            let spec = parse_spec(name, dataset)?;
            specs.insert(name.clone(), spec);
        }
        Ok(Self { specs })
    }

    /// Use a pre-built mapping, still validating base products against the
    /// driver.
    pub fn from_map(map: BTreeMap<String, ProductSpec>, dataset: &dyn Dataset) -> Result<Self> {
        for spec in map.values() {
            if !dataset.products().contains_key(&spec.product) {
                return Err(unknown(&spec.product, dataset));
            }
        }
        Ok(Self { specs: map })
    }

    pub fn is_empty(&self) -> bool {
        self.specs.is_empty()
    }

    pub fn len(&self) -> usize {
        self.specs.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &ProductSpec)> {
        self.specs.iter()
    }

    pub fn keys(&self) -> impl Iterator<Item = &String> {
        self.specs.keys()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.specs.contains_key(key)
    }

    /// Distinct base products, as handed to a driver's fetch routine.
    pub fn base_products(&self) -> Vec<String> {
        let mut bases: Vec<String> = self.specs.values().map(|s| s.product.clone()).collect();
        bases.sort();
        bases.dedup();
        bases
    }
}

/// The base product is the longest leading underscore-delimited prefix
/// that names a defined product; the remaining components are arguments.
fn parse_spec(name: &str, dataset: &dyn Dataset) -> Result<ProductSpec> {
    let defined = dataset.products();
    let parts: Vec<&str> = name.split('_').collect();
    for split in (1..=parts.len()).rev() {
        let base = parts[..split].join("_");
        if defined.contains_key(&base) {
            return Ok(ProductSpec {
                product: base,
                args: parts[split..].iter().map(|s| s.to_string()).collect(),
            });
        }
    }
    Err(unknown(name, dataset))
}

fn unknown(name: &str, dataset: &dyn Dataset) -> GeoinvError {
    GeoinvError::UnknownProduct {
        name: name.to_string(),
        available: dataset
            .products()
            .keys()
            .cloned()
            .collect::<Vec<_>>()
            .join(", "),
    }
}
