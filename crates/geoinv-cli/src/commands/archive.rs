//! Archive command implementation

use crate::cli::ArchiveArgs;
use crate::output::OutputWriter;
use anyhow::{ensure, Result};
use chrono::NaiveDate;
use geoinv_core::{archive_assets, Dataset, ShellEngine};
use serde::Serialize;
use std::sync::Arc;
use tabled::Tabled;

#[derive(Tabled)]
struct ArchivedRow {
    #[tabled(rename = "File")]
    file: String,
    #[tabled(rename = "Sensor")]
    sensor: String,
    #[tabled(rename = "Date")]
    date: String,
    #[tabled(rename = "Type")]
    asset_type: String,
}

#[derive(Serialize)]
struct ArchiveSummary {
    archived: usize,
    failed: usize,
}

pub fn execute(args: ArchiveArgs, dataset: Arc<dyn Dataset>, output: &OutputWriter) -> Result<()> {
    let source = args
        .path
        .clone()
        .unwrap_or_else(|| dataset.repository().stage_path());
    ensure!(
        source.is_dir(),
        "source directory {} does not exist",
        source.display()
    );

    let report = archive_assets(&*dataset, &source, args.recursive, args.keep)?;

    for (path, reason) in &report.failed {
        output.warning(format!("{}: {reason}", path.display()));
    }

    // Refresh driver composites for the newly ingested dates
    if !report.archived.is_empty() {
        let mut dates: Vec<NaiveDate> = report.archived.iter().map(|a| a.date).collect();
        dates.sort();
        dates.dedup();
        let engine = ShellEngine::new();
        if let Err(e) = dataset.update_composites(&dates, &engine) {
            output.warning(format!("composite refresh failed: {e}"));
        }
    }

    if output.is_json() {
        output.result(ArchiveSummary {
            archived: report.archived.len(),
            failed: report.failed.len(),
        })?;
    } else {
        let rows: Vec<ArchivedRow> = report
            .archived
            .iter()
            .map(|asset| ArchivedRow {
                file: asset
                    .path
                    .file_name()
                    .and_then(|n| n.to_str())
                    .unwrap_or_default()
                    .to_string(),
                sensor: asset.sensor.clone(),
                date: asset.date.to_string(),
                asset_type: asset.asset_type.clone(),
            })
            .collect();
        output.table(rows);
        output.success(format!(
            "Archived {} files ({} failed)",
            report.archived.len(),
            report.failed.len()
        ));
    }
    Ok(())
}
