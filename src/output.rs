use anyhow::{Context, Result};
use log::info;
use serde::{Deserialize, Serialize};
use simulation_common::{OutputConfig, OutputFormat, Snapshot};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

/// One row of the tabular output: a cell at a recorded time step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableRow {
    pub step: u32,
    pub cell: usize,
    pub x: f64,
    pub y: f64,
    pub radius: f64,
    pub axis_length: f64,
    pub axis_angle: f64,
    pub growth_rate: f64,
    pub cell_type: u32,
}

/// Expands a snapshot series into table rows, cells numbered in recorded order.
pub fn table_rows(snapshots: &[Snapshot]) -> Vec<TableRow> {
    snapshots
        .iter()
        .flat_map(|snapshot| {
            snapshot.cells.iter().enumerate().map(move |(cell, c)| TableRow {
                step: snapshot.time_step,
                cell,
                x: c.x,
                y: c.y,
                radius: c.radius,
                axis_length: c.axis_length,
                axis_angle: c.axis_angle,
                growth_rate: c.growth_rate,
                cell_type: c.cell_type,
            })
        })
        .collect()
}

pub fn write_table_csv<P: AsRef<Path>>(path: P, rows: &[TableRow]) -> Result<()> {
    let path = path.as_ref();
    let mut writer = csv::Writer::from_path(path)
        .with_context(|| format!("Failed to create table file '{}'", path.display()))?;
    for row in rows {
        writer.serialize(row)?;
    }
    writer.flush()?;
    Ok(())
}

pub fn write_snapshots<P: AsRef<Path>>(path: P, snapshots: &[Snapshot], format: OutputFormat) -> Result<()> {
    let path = path.as_ref();
    let file = File::create(path)
        .with_context(|| format!("Failed to create snapshot file '{}'", path.display()))?;
    let mut writer = BufWriter::new(file);
    match format {
        OutputFormat::Json => serde_json::to_writer(&mut writer, snapshots)
            .context("Error serializing snapshots to JSON")?,
        OutputFormat::Bincode => bincode::serialize_into(&mut writer, snapshots)
            .context("Error serializing snapshots to bincode")?,
        OutputFormat::Messagepack => rmp_serde::encode::write(&mut writer, snapshots)
            .context("Error serializing snapshots to MessagePack")?,
    }
    writer.flush()?;
    Ok(())
}

fn extension(format: OutputFormat) -> &'static str {
    match format {
        OutputFormat::Json => "json",
        OutputFormat::Bincode => "bin",
        OutputFormat::Messagepack => "msgpack",
    }
}

/// Base path for a replicate; a `_rep{n}` suffix is added only when there are several.
fn replicate_base(config: &OutputConfig, replicate: u32, replicates: u32) -> String {
    if replicates > 1 {
        format!("{}_rep{}", config.base_filename, replicate)
    } else {
        config.base_filename.clone()
    }
}

pub fn snapshot_path(config: &OutputConfig, replicate: u32, replicates: u32) -> PathBuf {
    PathBuf::from(format!(
        "{}_snapshots.{}",
        replicate_base(config, replicate, replicates),
        extension(config.format)
    ))
}

pub fn table_path(config: &OutputConfig, replicate: u32, replicates: u32) -> PathBuf {
    PathBuf::from(format!("{}_cells.csv", replicate_base(config, replicate, replicates)))
}

/// Writes whatever `config` asks for and returns the files written.
pub fn save_outputs(
    config: &OutputConfig,
    replicate: u32,
    replicates: u32,
    snapshots: &[Snapshot],
) -> Result<Vec<PathBuf>> {
    let mut written = Vec::new();
    if config.save_snapshots {
        let path = snapshot_path(config, replicate, replicates);
        write_snapshots(&path, snapshots, config.format)?;
        info!("{} snapshots saved to {}", snapshots.len(), path.display());
        written.push(path);
    } else {
        info!("Skipping saving snapshots as per config (save_snapshots is false).");
    }
    if config.save_table {
        let path = table_path(config, replicate, replicates);
        let rows = table_rows(snapshots);
        write_table_csv(&path, &rows)?;
        info!("{} table rows saved to {}", rows.len(), path.display());
        written.push(path);
    }
    Ok(written)
}
