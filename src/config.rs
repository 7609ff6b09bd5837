use anyhow::{bail, Context, Result};
use std::path::Path;

use crate::boundary::{BottomBoundary, RunoffScheme, TopBoundary};

/// Soil column configuration.
///
/// Usually parsed from a `key=value[unit]` config file with
/// [`SoilConfig::from_file`], but drivers and tests may also fill the fields
/// directly. Validation against the column invariants happens in
/// [`SoilColumn::new`](crate::SoilColumn::new).
#[derive(Debug, Clone)]
pub struct SoilConfig {
    /// End of the simulation [s].
    pub end_time: f64,
    /// Timestep [s].
    pub timestep: f64,
    /// Depth of each layer's lower face [m], strictly increasing.
    pub depth: Vec<f64>,
    /// Porosity (maximum volumetric moisture content) [-].
    pub porosity: f64,
    /// Clapp-Hornberger pore-size distribution exponent [-].
    pub clapp_hornberger_b: f64,
    /// Quartz fraction of the soil solids [-].
    pub quartz_fraction: f64,
    /// Saturated soil matric potential [m].
    pub saturated_matric_potential: f64,
    /// Initial layer temperatures [K].
    pub temperature: Vec<f64>,
    /// Initial total volumetric moisture content [-].
    pub moisture_content: Vec<f64>,
    /// Initial liquid volumetric content [-].
    pub liquid_content: Vec<f64>,
    /// Surface-runoff ice fraction scheme.
    pub runoff_scheme: Option<RunoffScheme>,
    pub top_boundary: TopBoundary,
    pub bottom_boundary: BottomBoundary,
    /// When true, moisture content is supplied by an external model before
    /// each step; the initial moisture/liquid arrays are allocated as zero.
    pub moisture_driven: bool,
}

impl SoilConfig {
    /// Reads and parses a config file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        Self::parse(&content).with_context(|| format!("Invalid config file: {}", path.display()))
    }

    /// Parses config file content.
    ///
    /// Format: one `key=value` pair per line, with an optional trailing
    /// `[unit]` (recognized for `end_time` and `dt`: seconds `[s]`/`[sec]`,
    /// hours `[h]`/`[hr]` (the default), days `[d]`/`[day]`). Per-layer
    /// arrays are comma-separated. Unknown keys are ignored.
    pub fn parse(content: &str) -> Result<Self> {
        let mut end_time = None;
        let mut timestep = None;
        let mut depth: Option<Vec<f64>> = None;
        let mut porosity = None;
        let mut b = None;
        let mut quartz = None;
        let mut satpsi = None;
        let mut temperature: Option<Vec<f64>> = None;
        let mut moisture: Option<Vec<f64>> = None;
        let mut liquid: Option<Vec<f64>> = None;
        let mut scheme = None;
        let mut bottom_temp = None;
        let mut top_temp = None;
        let mut moisture_driven = false;

        for raw in content.lines() {
            let line = raw.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let Some((key, rest)) = line.split_once('=') else {
                continue;
            };
            let key = key.trim();
            let (value, unit) = split_unit(rest);

            match key {
                "soil_moisture_bmi" => moisture_driven = true,
                "end_time" => {
                    let v: f64 = value.parse().context("Invalid end_time")?;
                    end_time = Some(to_seconds(v, unit).context("Invalid end_time unit")?);
                }
                "dt" => {
                    let v: f64 = value.parse().context("Invalid dt")?;
                    timestep = Some(to_seconds(v, unit).context("Invalid dt unit")?);
                }
                "soil_z" => depth = Some(parse_vector(value).context("Invalid soil_z")?),
                "soil_params.smcmax" => {
                    porosity = Some(value.parse().context("Invalid soil_params.smcmax")?)
                }
                "soil_params.b" => b = Some(value.parse().context("Invalid soil_params.b")?),
                "soil_params.quartz" => {
                    quartz = Some(value.parse().context("Invalid soil_params.quartz")?)
                }
                "soil_params.satpsi" => {
                    satpsi = Some(value.parse().context("Invalid soil_params.satpsi")?)
                }
                "soil_temperature" => {
                    temperature = Some(parse_vector(value).context("Invalid soil_temperature")?)
                }
                "soil_moisture_content" => {
                    moisture = Some(parse_vector(value).context("Invalid soil_moisture_content")?)
                }
                "soil_liquid_content" => {
                    liquid = Some(parse_vector(value).context("Invalid soil_liquid_content")?)
                }
                "ice_fraction_scheme" => {
                    scheme = Some(match value {
                        "Schaake" => RunoffScheme::Schaake,
                        "Xinanjiang" => RunoffScheme::Xinanjiang,
                        other => bail!(
                            "ice_fraction_scheme: unknown scheme `{other}`, options: Schaake or Xinanjiang"
                        ),
                    });
                }
                "bottom_boundary_temp" => {
                    bottom_temp = Some(value.parse::<f64>().context("Invalid bottom_boundary_temp")?)
                }
                "top_boundary_temp" => {
                    top_temp = Some(value.parse::<f64>().context("Invalid top_boundary_temp")?)
                }
                _ => {}
            }
        }

        let Some(end_time) = end_time else {
            bail!("end_time not set in the config file");
        };
        let Some(timestep) = timestep else {
            bail!("dt not set in the config file");
        };
        let Some(depth) = depth else {
            bail!("soil_z not set in the config file");
        };
        let Some(porosity) = porosity else {
            bail!("soil_params.smcmax not set in the config file");
        };
        let Some(clapp_hornberger_b) = b else {
            bail!("soil_params.b not set in the config file");
        };
        let Some(quartz_fraction) = quartz else {
            bail!("soil_params.quartz not set in the config file");
        };
        let Some(saturated_matric_potential) = satpsi else {
            bail!("soil_params.satpsi not set in the config file");
        };
        let Some(temperature) = temperature else {
            bail!("soil_temperature not set in the config file");
        };

        // Under external moisture coupling the split starts at zero and is
        // reconciled each step; otherwise both arrays are required.
        let (moisture_content, liquid_content) = if moisture_driven {
            (vec![0.0; depth.len()], vec![0.0; depth.len()])
        } else {
            let Some(moisture) = moisture else {
                bail!("soil_moisture_content not set in the config file");
            };
            let Some(liquid) = liquid else {
                bail!("soil_liquid_content not set in the config file");
            };
            (moisture, liquid)
        };

        if scheme.is_none() {
            bail!("ice_fraction_scheme not set in the config file");
        }

        let top_boundary = match top_temp {
            Some(temperature) => TopBoundary::ConstantTemperature { temperature },
            None => TopBoundary::CoupledSurfaceTemperature,
        };
        let bottom_boundary = match bottom_temp {
            Some(temperature) => BottomBoundary::ConstantTemperature { temperature },
            None => BottomBoundary::ZeroFlux,
        };

        Ok(Self {
            end_time,
            timestep,
            depth,
            porosity,
            clapp_hornberger_b,
            quartz_fraction,
            saturated_matric_potential,
            temperature,
            moisture_content,
            liquid_content,
            runoff_scheme: scheme,
            top_boundary,
            bottom_boundary,
            moisture_driven,
        })
    }
}

/// Splits the value part of a config line into the value itself and an
/// optional `[unit]` suffix.
fn split_unit(rest: &str) -> (&str, &str) {
    match rest.find('[') {
        Some(pos) => {
            let unit = rest[pos + 1..].trim().trim_end_matches(']');
            (rest[..pos].trim(), unit)
        }
        None => (rest.trim(), ""),
    }
}

/// Converts a time value with a config-file unit suffix to seconds.
/// The default unit is hours.
fn to_seconds(value: f64, unit: &str) -> Result<f64> {
    match unit {
        "s" | "sec" => Ok(value),
        "" | "h" | "hr" => Ok(value * 3600.0),
        "d" | "day" => Ok(value * 86400.0),
        other => bail!("unrecognized time unit [{other}]"),
    }
}

/// Parses a comma-separated list of floats.
fn parse_vector(value: &str) -> Result<Vec<f64>> {
    value
        .split(',')
        .map(|v| {
            v.trim()
                .parse::<f64>()
                .with_context(|| format!("Invalid number: {v}"))
        })
        .collect()
}
