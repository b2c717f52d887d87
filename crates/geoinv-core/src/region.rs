//! Region of interest loaded from a GeoJSON vector file

use crate::error::{GeoinvError, Result};
use geo::algorithm::bounding_rect::BoundingRect;
use geo::{Geometry as GeoGeometry, MultiPolygon, Rect};
use geojson::GeoJson;
use std::fs;
use std::path::{Path, PathBuf};

/// A polygonal region of interest. The geometry is the collection of all
/// polygonal features in the source file; non-polygonal features are
/// ignored.
#[derive(Debug, Clone)]
pub struct Region {
    path: PathBuf,
    name: String,
    geometry: MultiPolygon<f64>,
}

impl Region {
    /// Load a region from a GeoJSON file.
    pub fn open(path: &Path) -> Result<Self> {
        let invalid = |reason: String| GeoinvError::InvalidRegion {
            path: path.to_path_buf(),
            reason,
        };

        let content = fs::read_to_string(path)
            .map_err(|e| invalid(format!("failed to read file: {e}")))?;
        let geojson: GeoJson = content
            .parse()
            .map_err(|e| invalid(format!("failed to parse GeoJSON: {e}")))?;
        let collection = geojson::quick_collection(&geojson)
            .map_err(|e| invalid(format!("failed to convert geometry: {e}")))?;

        let mut polygons = Vec::new();
        for geometry in collection {
            match geometry {
                GeoGeometry::Polygon(p) => polygons.push(p),
                GeoGeometry::MultiPolygon(mp) => polygons.extend(mp.0),
                _ => {}
            }
        }
        if polygons.is_empty() {
            return Err(invalid("no polygonal features found".to_string()));
        }

        let name = path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("region")
            .to_string();

        Ok(Self {
            path: path.to_path_buf(),
            name,
            geometry: MultiPolygon(polygons),
        })
    }

    /// Source file path
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Basename of the source file, used as the prefix of assembled
    /// project outputs.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn geometry(&self) -> &MultiPolygon<f64> {
        &self.geometry
    }

    /// Bounding rectangle of all polygons.
    pub fn bounds(&self) -> Result<Rect<f64>> {
        self.geometry.bounding_rect().ok_or_else(|| GeoinvError::InvalidRegion {
            path: self.path.clone(),
            reason: "region has no extent".to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const SQUARE: &str = r#"{
        "type": "FeatureCollection",
        "features": [{
            "type": "Feature",
            "properties": {},
            "geometry": {
                "type": "Polygon",
                "coordinates": [[[0.0, 0.0], [10.0, 0.0], [10.0, 5.0], [0.0, 5.0], [0.0, 0.0]]]
            }
        }]
    }"#;

    fn write_region(content: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(".geojson").tempfile().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn loads_polygon_and_bounds() {
        let file = write_region(SQUARE);
        let region = Region::open(file.path()).unwrap();
        let bounds = region.bounds().unwrap();
        assert_eq!(bounds.min().x, 0.0);
        assert_eq!(bounds.max().x, 10.0);
        assert_eq!(bounds.max().y, 5.0);
        assert_eq!(region.geometry().0.len(), 1);
    }

    #[test]
    fn name_is_file_stem() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("study_area.geojson");
        fs::write(&path, SQUARE).unwrap();
        let region = Region::open(&path).unwrap();
        assert_eq!(region.name(), "study_area");
    }

    #[test]
    fn rejects_non_polygonal_files() {
        let file = write_region(r#"{"type": "Point", "coordinates": [1.0, 2.0]}"#);
        assert!(matches!(
            Region::open(file.path()),
            Err(GeoinvError::InvalidRegion { .. })
        ));
    }

    #[test]
    fn rejects_malformed_files() {
        let file = write_region("not geojson");
        assert!(Region::open(file.path()).is_err());
    }
}
