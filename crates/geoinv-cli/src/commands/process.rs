//! Process command implementation

use crate::cli::ProcessArgs;
use crate::output::OutputWriter;
use anyhow::Result;
use geoinv_core::{Dataset, Inventory, ShellEngine};
use serde::Serialize;
use std::sync::Arc;

#[derive(Serialize)]
struct ProcessSummary {
    products: Vec<String>,
    dates: usize,
    files: usize,
}

pub fn execute(args: ProcessArgs, dataset: Arc<dyn Dataset>, output: &OutputWriter) -> Result<()> {
    let mut inventory = Inventory::build(dataset, &args.query.to_params())?;
    let engine = ShellEngine::new();
    inventory.process(&engine, args.overwrite)?;

    let summary = ProcessSummary {
        products: inventory.requested.keys().cloned().collect(),
        dates: inventory.data.len(),
        files: inventory.numfiles,
    };
    if output.is_json() {
        output.result(summary)?;
    } else {
        output.success(format!(
            "Processed {} across {} dates ({} tiles)",
            summary.products.join(" "),
            summary.dates,
            summary.files
        ));
    }
    Ok(())
}
