//! Archive ingestion: move staged files into the repository layout
//!
//! Files land in a staging area (by hand or via a driver's fetch) and are
//! filed under the repository's tile/date directory derived from their
//! parsed metadata. Per-file failures accumulate in the report rather
//! than aborting the run.

use crate::asset::Asset;
use crate::error::{GeoinvError, Result};
use crate::ports::Dataset;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Outcome of an archive run
#[derive(Debug, Default)]
pub struct ArchiveReport {
    pub archived: Vec<Asset>,
    pub failed: Vec<(PathBuf, String)>,
}

/// Ingest every file under `source` that matches a declared asset
/// pattern. Matched files are moved (or copied when `keep` is set) to
/// `repository.path(tile, date)` for their parsed tile and date.
pub fn archive_assets(
    dataset: &dyn Dataset,
    source: &Path,
    recursive: bool,
    keep: bool,
) -> Result<ArchiveReport> {
    let patterns: Vec<(String, glob::Pattern)> = dataset
        .assets()
        .iter()
        .filter_map(|(atype, def)| match glob::Pattern::new(&def.pattern) {
            Ok(p) => Some((atype.clone(), p)),
            Err(e) => {
                warn!(asset_type = %atype, pattern = %def.pattern, error = %e, "invalid pattern");
                None
            }
        })
        .collect();

    let mut report = ArchiveReport::default();
    ingest_dir(dataset, source, recursive, keep, &patterns, &mut report)?;
    info!(
        archived = report.archived.len(),
        failed = report.failed.len(),
        "archive run complete"
    );
    Ok(report)
}

fn ingest_dir(
    dataset: &dyn Dataset,
    dir: &Path,
    recursive: bool,
    keep: bool,
    patterns: &[(String, glob::Pattern)],
    report: &mut ArchiveReport,
) -> Result<()> {
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_dir() {
            if recursive {
                ingest_dir(dataset, &path, recursive, keep, patterns, report)?;
            }
            continue;
        }
        let Some(filename) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        let Some((asset_type, _)) = patterns.iter().find(|(_, p)| p.matches(filename)) else {
            debug!(file = %path.display(), "no asset pattern matched; ignoring");
            continue;
        };
        match ingest_file(dataset, &path, asset_type, keep) {
            Ok(asset) => report.archived.push(asset),
            Err(e) => {
                warn!(file = %path.display(), error = %e, "failed to archive file");
                report.failed.push((path, e.to_string()));
            }
        }
    }
    Ok(())
}

fn ingest_file(dataset: &dyn Dataset, path: &Path, asset_type: &str, keep: bool) -> Result<Asset> {
    let parsed = dataset.parse_asset(path, asset_type)?;
    let Some(filename) = path.file_name() else {
        return Err(GeoinvError::UnrecognizedAsset {
            name: path.display().to_string(),
            reason: "path has no filename".to_string(),
        });
    };
    let dest_dir = dataset.repository().path(&parsed.tile, Some(parsed.date));
    fs::create_dir_all(&dest_dir)?;
    let dest = dest_dir.join(filename);

    if keep {
        fs::copy(path, &dest)?;
    } else {
        // rename first; fall back to copy+remove across filesystems
        if fs::rename(path, &dest).is_err() {
            fs::copy(path, &dest)?;
            fs::remove_file(path)?;
        }
    }
    debug!(from = %path.display(), to = %dest.display(), "archived");
    dataset.parse_asset(&dest, asset_type)
}
