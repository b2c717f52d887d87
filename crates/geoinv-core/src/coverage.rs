//! Spatial coverage fractions for a tile against a requested region

use serde::{Deserialize, Serialize};

/// How much of the requested region a tile covers, and how much of the
/// tile the region uses. Both fractions are in [0, 1].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TileCoverage {
    /// Fraction of the requested region covered by this tile
    pub area_fraction: f64,

    /// Fraction of this tile covered by the region
    pub tile_fraction: f64,
}

impl TileCoverage {
    /// Coverage used for explicitly listed tiles, where no region is
    /// available to weight against.
    pub const FULL: TileCoverage = TileCoverage {
        area_fraction: 1.0,
        tile_fraction: 1.0,
    };

    pub fn new(area_fraction: f64, tile_fraction: f64) -> Self {
        Self {
            area_fraction,
            tile_fraction,
        }
    }

    pub fn area_percent(&self) -> f64 {
        self.area_fraction * 100.0
    }

    pub fn tile_percent(&self) -> f64 {
        self.tile_fraction * 100.0
    }
}
