//! Command implementations

mod archive;
mod inventory;
mod process;
mod project;

use crate::cli::{Cli, Commands};
use crate::output::OutputWriter;
use anyhow::{Context, Result};
use geoinv_core::{CliConfigOverrides, LayeredConfig};
use geoinv_datasets::default_registry;

/// Execute a CLI command
pub fn execute(cli: Cli) -> Result<()> {
    let output = OutputWriter::new(cli.json);

    let mut config = LayeredConfig::with_defaults();
    if let Some(path) = &cli.config {
        config = config
            .load_from_file(path)
            .with_context(|| format!("loading configuration from {}", path.display()))?;
    }
    let mut config = config.load_from_env();
    config.update_from_cli(CliConfigOverrides {
        archive_root: cli.archive_root.clone(),
        datadir: None,
    });

    tracing::debug!(
        archive_root = %config.archive_root.value.display(),
        source = ?config.archive_root.source,
        "resolved configuration"
    );
    let registry = default_registry(&config.archive_root.value)?;
    let dataset = registry.get(&cli.dataset)?;

    match cli.command {
        Commands::Archive(args) => archive::execute(args, dataset, &output),
        Commands::Inventory(args) => inventory::execute(args, dataset, &output),
        Commands::Process(args) => process::execute(args, dataset, &output),
        Commands::Project(args) => project::execute(args, dataset, &config, &output),
    }
}
