//! Inventory command: render what the archive holds for a query

use crate::cli::InventoryCmdArgs;
use crate::output::{sensor_color, OutputWriter};
use anyhow::Result;
use chrono::{Datelike, NaiveDate};
use console::style;
use geoinv_core::{Dataset, Inventory};
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use tabled::Tabled;

#[derive(Tabled)]
struct ProductRow {
    #[tabled(rename = "Product")]
    name: String,
    #[tabled(rename = "Description")]
    description: String,
    #[tabled(rename = "Assets")]
    assets: String,
}

#[derive(Tabled)]
struct CoverageRow {
    #[tabled(rename = "Tile")]
    tile: String,
    #[tabled(rename = "% Site")]
    site: String,
    #[tabled(rename = "% Tile Used")]
    used: String,
}

#[derive(Serialize)]
struct DateSummary {
    date: NaiveDate,
    sensor: String,
    tiles: usize,
    skipped: usize,
    coverage: BTreeMap<String, f64>,
}

#[derive(Serialize)]
struct InventorySummary {
    dataset: String,
    tiles: usize,
    files: usize,
    dates: Vec<DateSummary>,
    skipped_dates: usize,
}

pub fn execute(
    args: InventoryCmdArgs,
    dataset: Arc<dyn Dataset>,
    output: &OutputWriter,
) -> Result<()> {
    if args.list_products {
        return list_products(&*dataset, output);
    }

    let inventory = Inventory::build(dataset, &args.query.to_params())?;

    if output.is_json() {
        let summary = InventorySummary {
            dataset: inventory.dataset().name().to_string(),
            tiles: inventory.tiles.len(),
            files: inventory.numfiles,
            dates: inventory
                .data
                .iter()
                .map(|(date, set)| DateSummary {
                    date: *date,
                    sensor: set.sensor.clone(),
                    tiles: set.tiles.len(),
                    skipped: set.skipped.len(),
                    coverage: set.coverage(),
                })
                .collect(),
            skipped_dates: inventory.skipped_dates.len(),
        };
        return output.result(summary);
    }

    if inventory.region().is_some() && args.query.tiles.is_none() {
        print_tile_coverage(&inventory, output);
    }
    print_calendar(&inventory, args.md, args.compact);
    print_legend(&inventory, output);

    println!(
        "\n{} files on {} dates",
        style(inventory.numfiles).bold(),
        style(inventory.data.len()).bold()
    );
    if !inventory.skipped_dates.is_empty() {
        output.info(format!(
            "{} candidate dates held no usable data (-v for reasons)",
            inventory.skipped_dates.len()
        ));
    }
    Ok(())
}

fn list_products(dataset: &dyn Dataset, output: &OutputWriter) -> Result<()> {
    if output.is_json() {
        let products: BTreeMap<&String, &String> = dataset
            .products()
            .iter()
            .map(|(name, info)| (name, &info.description))
            .collect();
        return output.result(products);
    }
    output.section(format!("{} products", dataset.name()));
    let rows: Vec<ProductRow> = dataset
        .products()
        .iter()
        .map(|(name, info)| ProductRow {
            name: name.clone(),
            description: info.description.clone(),
            assets: info.assets.join(", "),
        })
        .collect();
    output.table(rows);
    Ok(())
}

fn print_tile_coverage(inventory: &Inventory, output: &OutputWriter) {
    output.section("Tile coverage");
    let rows: Vec<CoverageRow> = inventory
        .tiles
        .iter()
        .map(|(tile, cov)| CoverageRow {
            tile: tile.clone(),
            site: format!("{:.1}", cov.area_percent()),
            used: format!("{:.1}", cov.tile_percent()),
        })
        .collect();
    output.table(rows);
}

/// Calendar listing, one section per year. Dates are colored by the
/// sensor that observed them.
fn print_calendar(inventory: &Inventory, md: bool, compact: bool) {
    let mut current_year = None;
    let mut line = String::new();

    for (date, set) in &inventory.data {
        if current_year != Some(date.year()) {
            if compact && !line.is_empty() {
                println!("  {line}");
                line.clear();
            }
            current_year = Some(date.year());
            println!("\n{}", style(date.year()).bold());
        }

        let label = if md {
            date.format("%m-%d").to_string()
        } else {
            format!("{:03}", date.ordinal())
        };
        let color = inventory
            .sensor(&set.sensor)
            .map(|s| sensor_color(s.color))
            .unwrap_or(console::Color::White);

        if compact {
            line.push_str(&format!("{} ", style(&label).fg(color)));
        } else {
            let coverage = set
                .coverage()
                .iter()
                .map(|(asset, pct)| format!("{asset} {pct:5.1}%"))
                .collect::<Vec<_>>()
                .join("  ");
            let skipped = if set.skipped.is_empty() {
                String::new()
            } else {
                format!("  ({} tiles skipped)", set.skipped.len())
            };
            println!(
                "  {} {}  {coverage}{skipped}",
                style(&label).fg(color).bold(),
                style(&set.sensor).fg(color)
            );
        }
    }
    if compact && !line.is_empty() {
        println!("  {line}");
    }
}

fn print_legend(inventory: &Inventory, output: &OutputWriter) {
    if inventory.sensors.is_empty() {
        return;
    }
    output.section("Sensors");
    for sensor in &inventory.sensors {
        let color = sensor_color(sensor.color);
        println!(
            "  {} {}",
            style(&sensor.code).fg(color).bold(),
            sensor.description
        );
    }
}
