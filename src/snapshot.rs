//! Column state checkpointing.
//!
//! A failed step leaves no meaningful partial state to resume from, so the
//! external caller periodically captures a [`ColumnSnapshot`] and rebuilds
//! the column from it after a failure. Snapshots serialize to JSON.

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;

use crate::column::SoilColumn;

/// The mutable per-step state of a [`SoilColumn`], detached from its static
/// geometry and parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ColumnSnapshot {
    /// Simulation time the snapshot was taken at [s].
    pub time: f64,
    pub temperature: Vec<f64>,
    pub temperature_prev: Vec<f64>,
    pub moisture_content: Vec<f64>,
    pub liquid_content: Vec<f64>,
    pub ice_content: Vec<f64>,
    pub ground_heat_flux: f64,
    pub bottom_heat_flux: f64,
    pub energy_balance_error: f64,
}

impl SoilColumn {
    /// Captures the current mutable state.
    pub fn snapshot(&self) -> ColumnSnapshot {
        ColumnSnapshot {
            time: self.time,
            temperature: self.temperature.clone(),
            temperature_prev: self.temperature_prev.clone(),
            moisture_content: self.moisture_content.clone(),
            liquid_content: self.liquid_content.clone(),
            ice_content: self.ice_content.clone(),
            ground_heat_flux: self.ground_heat_flux,
            bottom_heat_flux: self.bottom_heat_flux,
            energy_balance_error: self.energy_balance_error,
        }
    }

    /// Restores state previously captured from a column with the same
    /// layer geometry.
    pub fn restore(&mut self, snapshot: &ColumnSnapshot) -> Result<()> {
        let n = self.num_layers();
        if snapshot.temperature.len() != n
            || snapshot.temperature_prev.len() != n
            || snapshot.moisture_content.len() != n
            || snapshot.liquid_content.len() != n
            || snapshot.ice_content.len() != n
        {
            bail!(
                "snapshot does not match the column: expected {n} layers, got {}",
                snapshot.temperature.len()
            );
        }
        self.time = snapshot.time;
        self.temperature.copy_from_slice(&snapshot.temperature);
        self.temperature_prev
            .copy_from_slice(&snapshot.temperature_prev);
        self.moisture_content
            .copy_from_slice(&snapshot.moisture_content);
        self.liquid_content.copy_from_slice(&snapshot.liquid_content);
        self.ice_content.copy_from_slice(&snapshot.ice_content);
        self.ground_heat_flux = snapshot.ground_heat_flux;
        self.bottom_heat_flux = snapshot.bottom_heat_flux;
        self.energy_balance_error = snapshot.energy_balance_error;
        Ok(())
    }
}

/// Writes a snapshot to a JSON file.
pub fn write_snapshot(path: &Path, snapshot: &ColumnSnapshot) -> Result<()> {
    let file = File::create(path)
        .with_context(|| format!("Failed to create file: {}", path.display()))?;
    let writer = BufWriter::new(file);
    serde_json::to_writer_pretty(writer, snapshot)
        .with_context(|| format!("Failed to serialize snapshot to: {}", path.display()))?;
    Ok(())
}

/// Reads a snapshot from a JSON file.
pub fn read_snapshot(path: &Path) -> Result<ColumnSnapshot> {
    let file = File::open(path)
        .with_context(|| format!("Failed to open file: {}", path.display()))?;
    let reader = BufReader::new(file);
    let snapshot: ColumnSnapshot = serde_json::from_reader(reader)
        .with_context(|| format!("Failed to deserialize snapshot from: {}", path.display()))?;
    Ok(snapshot)
}

/// Serializes a snapshot to a JSON string.
pub fn to_snapshot_string(snapshot: &ColumnSnapshot) -> Result<String> {
    serde_json::to_string_pretty(snapshot).context("Failed to serialize snapshot to string")
}

/// Deserializes a snapshot from a JSON string.
pub fn from_snapshot_string(json: &str) -> Result<ColumnSnapshot> {
    serde_json::from_str(json).context("Failed to deserialize snapshot from string")
}
