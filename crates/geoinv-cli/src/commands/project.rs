//! Project command implementation

use crate::cli::ProjectArgs;
use crate::output::OutputWriter;
use anyhow::Result;
use geoinv_core::{Dataset, Inventory, InventoryParams, LayeredConfig, ProjectOptions, ShellEngine};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Serialize)]
struct ProjectSummary {
    datadir: PathBuf,
    dates: usize,
    outputs: Vec<PathBuf>,
}

/// The mask is a product like any other: it has to be generated and
/// assembled before it can be applied, so it joins the request.
fn request_with_mask(mut params: InventoryParams, mask: Option<&str>) -> InventoryParams {
    if let Some(mask) = mask {
        if !params.products.iter().any(|p| p == mask) {
            params.products.push(mask.to_string());
        }
    }
    params
}

pub fn execute(
    args: ProjectArgs,
    dataset: Arc<dyn Dataset>,
    config: &LayeredConfig,
    output: &OutputWriter,
) -> Result<()> {
    let params = request_with_mask(args.query.to_params(), args.mask.as_deref());
    let mut inventory = Inventory::build(dataset, &params)?;

    let opts = ProjectOptions {
        resolution: args.res.as_ref().map(|r| (r[0], r[1])),
        datadir: args
            .datadir
            .clone()
            .unwrap_or_else(|| config.datadir.value.clone()),
        mask: args.mask.clone(),
        no_warp: args.nowarp,
    };
    let engine = ShellEngine::new();
    inventory.project(&engine, &opts)?;

    // Region assemblies record their outputs on the tileset; per-tile
    // links land on the tiles themselves
    let mut outputs: Vec<PathBuf> = Vec::new();
    for set in inventory.data.values() {
        if set.products.is_empty() {
            outputs.extend(
                set.tiles
                    .values()
                    .flat_map(|t| t.products.values().cloned())
                    .filter(|p| p.starts_with(&opts.datadir)),
            );
        } else {
            outputs.extend(set.products.values().cloned());
        }
    }
    outputs.sort();

    if output.is_json() {
        output.result(ProjectSummary {
            datadir: opts.datadir.clone(),
            dates: inventory.data.len(),
            outputs,
        })?;
    } else {
        output.success(format!(
            "Wrote {} project files for {} dates to {}",
            outputs.len(),
            inventory.data.len(),
            opts.datadir.display()
        ));
    }
    Ok(())
}
