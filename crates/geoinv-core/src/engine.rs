//! Raster engine adapter shelling out to the GDAL command-line tools
//!
//! The core treats raster work as opaque synchronous calls; this adapter
//! maps each [`RasterEngine`] operation onto the corresponding GDAL
//! utility. Calls block with no timeout, matching the batch/offline
//! execution model.

use crate::error::{GeoinvError, Result};
use crate::ports::RasterEngine;
use crate::region::Region;
use std::path::{Path, PathBuf};
use std::process::Command;
use tracing::debug;

/// Fallback no-data value when an input declares none
const DEFAULT_NODATA: f64 = -32768.0;

#[derive(Debug, Default)]
pub struct ShellEngine;

impl ShellEngine {
    pub fn new() -> Self {
        Self
    }

    fn run(&self, tool: &str, args: &[String]) -> Result<String> {
        debug!(tool, ?args, "invoking raster tool");
        let output = Command::new(tool).args(args).output()?;
        if !output.status.success() {
            return Err(GeoinvError::EngineFailure {
                tool: tool.to_string(),
                status: output.status.code().unwrap_or(-1),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

fn arg(path: &Path) -> String {
    path.display().to_string()
}

impl RasterEngine for ShellEngine {
    fn projection(&self, raster: &Path) -> Result<String> {
        let wkt = self.run(
            "gdalsrsinfo",
            &["-o".into(), "wkt1".into(), "--single-line".into(), arg(raster)],
        )?;
        Ok(wkt.trim().to_string())
    }

    fn nodata(&self, raster: &Path) -> Result<Option<f64>> {
        let info = self.run("gdalinfo", &[arg(raster)])?;
        for line in info.lines() {
            if let Some(value) = line.trim().strip_prefix("NoData Value=") {
                return Ok(value.trim().parse().ok());
            }
        }
        Ok(None)
    }

    fn translate(&self, locator: &str, output: &Path) -> Result<()> {
        self.run("gdal_translate", &[locator.to_string(), arg(output)])?;
        Ok(())
    }

    fn mosaic(
        &self,
        inputs: &[PathBuf],
        output: &Path,
        bounds: geo::Rect<f64>,
        nodata: Option<f64>,
    ) -> Result<()> {
        let nd = nodata.unwrap_or(DEFAULT_NODATA);
        let mut args = vec![
            "-o".into(),
            arg(output),
            "-ul_lr".into(),
            bounds.min().x.to_string(),
            bounds.max().y.to_string(),
            bounds.max().x.to_string(),
            bounds.min().y.to_string(),
            "-n".into(),
            nd.to_string(),
            "-a_nodata".into(),
            nd.to_string(),
            "-init".into(),
            nd.to_string(),
        ];
        args.extend(inputs.iter().map(|p| arg(p)));
        self.run("gdal_merge.py", &args)?;
        Ok(())
    }

    fn rasterize(&self, region: &Region, like: &Path, output: &Path) -> Result<()> {
        // Zeroed byte template on the target grid, then burn the region
        self.run(
            "gdal_calc.py",
            &[
                "-A".into(),
                arg(like),
                "--calc".into(),
                "0".into(),
                "--type".into(),
                "Byte".into(),
                "--outfile".into(),
                arg(output),
            ],
        )?;
        // The region geometry must be in the raster's spatial reference
        // before burning
        let srs = self.projection(like)?;
        let workdir = tempfile::Builder::new().prefix("geoinv-cutline").tempdir()?;
        let cutline = workdir.path().join("cutline.geojson");
        self.run(
            "ogr2ogr",
            &[
                "-t_srs".into(),
                srs,
                "-f".into(),
                "GeoJSON".into(),
                arg(&cutline),
                arg(region.path()),
            ],
        )?;
        self.run(
            "gdal_rasterize",
            &[
                "-at".into(),
                "-burn".into(),
                "1".into(),
                arg(&cutline),
                arg(output),
            ],
        )?;
        Ok(())
    }

    fn cookie_cut(
        &self,
        inputs: &[PathBuf],
        output: &Path,
        region: &Region,
        resolution: (f64, f64),
    ) -> Result<()> {
        let mut args = vec![
            "-cutline".into(),
            arg(region.path()),
            "-crop_to_cutline".into(),
            "-tr".into(),
            resolution.0.to_string(),
            resolution.1.to_string(),
            "-overwrite".into(),
        ];
        args.extend(inputs.iter().map(|p| arg(p)));
        args.push(arg(output));
        self.run("gdalwarp", &args)?;
        Ok(())
    }

    fn apply_mask(&self, raster: &Path, mask: &Path) -> Result<()> {
        let nd = self.nodata(raster)?.unwrap_or(DEFAULT_NODATA);
        let workdir = tempfile::Builder::new().prefix("geoinv-mask").tempdir()?;
        let masked = workdir.path().join("masked.tif");
        self.run(
            "gdal_calc.py",
            &[
                "-A".into(),
                arg(raster),
                "-B".into(),
                arg(mask),
                "--calc".into(),
                format!("where(B>0,A,{nd})"),
                "--NoDataValue".into(),
                nd.to_string(),
                "--outfile".into(),
                arg(&masked),
            ],
        )?;
        std::fs::copy(&masked, raster)?;
        Ok(())
    }

    fn mean_stack(&self, inputs: &[PathBuf], output: &Path) -> Result<()> {
        let workdir = tempfile::Builder::new().prefix("geoinv-mean").tempdir()?;
        let mean = workdir.path().join("mean.tif");
        let variance = workdir.path().join("variance.tif");

        // Repeated -A entries stack the inputs along axis 0
        let mut stack_args = Vec::new();
        for input in inputs {
            stack_args.push("-A".to_string());
            stack_args.push(arg(input));
        }

        let mut args = stack_args.clone();
        args.extend([
            "--calc".into(),
            "average(A,axis=0)".into(),
            "--type".into(),
            "Float32".into(),
            "--NoDataValue".into(),
            DEFAULT_NODATA.to_string(),
            "--outfile".into(),
            arg(&mean),
        ]);
        self.run("gdal_calc.py", &args)?;

        let mut args = stack_args;
        args.extend([
            "--calc".into(),
            "average((A-average(A,axis=0))**2,axis=0)".into(),
            "--type".into(),
            "Float32".into(),
            "--NoDataValue".into(),
            DEFAULT_NODATA.to_string(),
            "--outfile".into(),
            arg(&variance),
        ]);
        self.run("gdal_calc.py", &args)?;

        self.run(
            "gdal_merge.py",
            &[
                "-separate".into(),
                "-o".into(),
                arg(output),
                arg(&mean),
                arg(&variance),
            ],
        )?;
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
        let nodata = self.nodata(raster)?;
        let mut values = Vec::with_capacity(width * height);
        for dy in 0..height as i64 {
            for dx in 0..width as i64 {
                let out = self.run(
                    "gdallocationinfo",
                    &[
                        "-valonly".into(),
                        arg(raster),
                        (col + dx).to_string(),
                        (row + dy).to_string(),
                    ],
                );
                let value = match out {
                    Ok(text) => text.trim().parse::<f64>().ok(),
                    // Off-raster pixels make the tool fail; treat as no-data
                    Err(_) => None,
                };
                values.push(value.filter(|v| Some(*v) != nodata));
            }
        }
        Ok(values)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    const SQUARE_GEOJSON: &str = r#"{
        "type": "FeatureCollection",
        "features": [{
            "type": "Feature",
            "properties": {},
            "geometry": {
                "type": "Polygon",
                "coordinates": [[[0.0, 0.0], [1.0, 0.0], [1.0, 1.0], [0.0, 1.0], [0.0, 0.0]]]
            }
        }]
    }"#;

    /// Shell script standing in for a GDAL utility: appends its name and
    /// arguments to `log`, then runs `body`.
    #[cfg(unix)]
    fn fake_tool(dir: &Path, name: &str, log: &Path, body: &str) {
        use std::os::unix::fs::PermissionsExt;
        let path = dir.join(name);
        let script = format!("#!/bin/sh\necho \"{name} $@\" >> {}\n{body}\n", log.display());
        fs::write(&path, script).unwrap();
        let mut perms = fs::metadata(&path).unwrap().permissions();
        perms.set_mode(0o755);
        fs::set_permissions(&path, perms).unwrap();
    }

    #[test]
    #[cfg(unix)]
    fn rasterize_reprojects_the_cutline_into_the_raster_srs() {
        let tools = tempfile::tempdir().unwrap();
        let log = tools.path().join("calls.log");
        fake_tool(tools.path(), "gdal_calc.py", &log, "");
        fake_tool(tools.path(), "gdal_rasterize", &log, "");
        fake_tool(tools.path(), "ogr2ogr", &log, "");
        fake_tool(tools.path(), "gdalsrsinfo", &log, "echo PROJCS_FAKE");

        let data = tempfile::tempdir().unwrap();
        let site = data.path().join("study_area.geojson");
        fs::write(&site, SQUARE_GEOJSON).unwrap();
        let region = Region::open(&site).unwrap();

        let old_path = std::env::var("PATH").unwrap_or_default();
        std::env::set_var("PATH", format!("{}:{old_path}", tools.path().display()));
        let engine = ShellEngine::new();
        let result = engine.rasterize(
            &region,
            &data.path().join("like.tif"),
            &data.path().join("mask.tif"),
        );
        std::env::set_var("PATH", old_path);
        result.unwrap();

        let calls = fs::read_to_string(&log).unwrap();
        let lines: Vec<&str> = calls.lines().collect();
        let reproject = lines.iter().position(|l| l.starts_with("ogr2ogr")).unwrap();
        let burn = lines
            .iter()
            .position(|l| l.starts_with("gdal_rasterize"))
            .unwrap();
        assert!(reproject < burn);
        assert!(lines[reproject].contains("-t_srs PROJCS_FAKE"));
        // The burn consumes the reprojected copy, not the source vector
        assert!(lines[burn].contains("cutline.geojson"));
        assert!(!lines[burn].contains("study_area.geojson"));
    }

    #[test]
    fn nonzero_exit_surfaces_engine_failure() {
        let engine = ShellEngine::new();
        let err = engine
            .run("sh", &["-c".into(), "echo boom >&2; exit 3".into()])
            .unwrap_err();
        match err {
            GeoinvError::EngineFailure { tool, status, stderr } => {
                assert_eq!(tool, "sh");
                assert_eq!(status, 3);
                assert_eq!(stderr, "boom");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn stdout_is_captured() {
        let engine = ShellEngine::new();
        let out = engine.run("sh", &["-c".into(), "echo hello".into()]).unwrap();
        assert_eq!(out.trim(), "hello");
    }
}
