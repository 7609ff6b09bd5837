use anyhow::{bail, Result};

use crate::boundary::{BottomBoundary, RunoffScheme, TopBoundary};
use crate::config::SoilConfig;
use crate::properties::LATENT_HEAT_FUSION;

/// Vertically discretized soil column.
///
/// Owns all per-layer state arrays plus the static layer geometry. Layers are
/// indexed 0 (surface) to N-1 (bottom); geometry is fixed at construction and
/// no array is ever resized afterwards.
///
/// One column is advanced by exactly one caller at a time; see
/// [`SoilColumn::advance`].
#[derive(Debug)]
pub struct SoilColumn {
    /// Cumulative depth of each layer's lower face from the surface [m],
    /// strictly increasing.
    pub(crate) depth: Vec<f64>,
    /// Layer thickness [m], derived once from `depth`.
    pub(crate) thickness: Vec<f64>,
    /// Depth of the bottom face of the deepest layer [m].
    pub(crate) soil_depth: f64,

    /// Current layer temperature [K].
    pub(crate) temperature: Vec<f64>,
    /// Layer temperature at the start of the current step [K].
    pub(crate) temperature_prev: Vec<f64>,
    /// Total volumetric water content, liquid + ice [-].
    pub(crate) moisture_content: Vec<f64>,
    /// Liquid volumetric water content [-].
    pub(crate) liquid_content: Vec<f64>,
    /// Ice volumetric content [-], kept equal to `moisture - liquid`.
    pub(crate) ice_content: Vec<f64>,

    /// Bulk thermal conductivity [W/(m*K)], refreshed each step.
    pub(crate) thermal_conductivity: Vec<f64>,
    /// Volumetric heat capacity [J/(m^3*K)], refreshed each step.
    pub(crate) heat_capacity: Vec<f64>,

    /// Porosity, the maximum volumetric moisture content [-].
    pub(crate) porosity: f64,
    /// Clapp-Hornberger pore-size distribution exponent [-].
    pub(crate) clapp_hornberger_b: f64,
    /// Quartz fraction of the soil solids [-].
    pub(crate) quartz_fraction: f64,
    /// Saturated soil matric potential [m].
    pub(crate) saturated_matric_potential: f64,
    /// Latent heat of fusion [J/kg].
    pub(crate) latent_heat_fusion: f64,

    /// Timestep [s].
    pub(crate) dt: f64,
    /// Simulation clock [s].
    pub(crate) time: f64,
    /// Configured end of the simulation [s].
    pub(crate) end_time: f64,

    pub(crate) top_boundary: TopBoundary,
    pub(crate) bottom_boundary: BottomBoundary,
    /// Surface temperature [K] used when the top boundary is coupled.
    pub(crate) surface_temperature: f64,
    /// When true, `moisture_content` is overwritten by an external model
    /// before each step and `liquid_content` is reconciled against the
    /// current ice content at the start of [`SoilColumn::advance`].
    pub(crate) moisture_driven: bool,
    pub(crate) runoff_scheme: Option<RunoffScheme>,

    /// Conductive flux entering the column at the surface [W/m^2].
    pub(crate) ground_heat_flux: f64,
    /// Conductive flux entering the column at the bottom [W/m^2].
    pub(crate) bottom_heat_flux: f64,
    /// Energy consumed (+) or released (-) by phase change this step [W/m^2].
    pub(crate) energy_consumed: f64,
    /// Energy balance error accumulated over the column lifetime [W/m^2].
    pub(crate) energy_balance_error: f64,

    /// Depth-integrated frozen water volume [m] (Schaake scheme).
    pub(crate) ice_fraction_schaake: f64,
    /// Frozen-area fraction from the top-layer ice saturation [-]
    /// (Xinanjiang scheme).
    pub(crate) ice_fraction_xinanjiang: f64,
    /// Ratio of depth-integrated ice mass to depth-integrated moisture
    /// mass [-].
    pub(crate) soil_ice_fraction: f64,

    pub(crate) workspace: Workspace,
}

/// Per-column scratch buffers, sized to N once and reused every step so the
/// hot path does not allocate.
#[derive(Debug)]
pub(crate) struct Workspace {
    // Tridiagonal system assembly.
    pub sub_diag: Vec<f64>,
    pub diag: Vec<f64>,
    pub super_diag: Vec<f64>,
    pub rhs: Vec<f64>,
    pub increment: Vec<f64>,
    pub flux: Vec<f64>,
    pub lambda: Vec<f64>,
    pub denom: Vec<f64>,
    pub dtdz: Vec<f64>,
    // Thomas sweep factors.
    pub p: Vec<f64>,
    pub q: Vec<f64>,
    // Phase-change scratch, all in mass per unit area [kg/m^2].
    pub supercooled: Vec<f64>,
    pub mass_ice: Vec<f64>,
    pub mass_ice_prev: Vec<f64>,
    pub mass_liq: Vec<f64>,
    pub mass_total: Vec<f64>,
    pub heat_energy: Vec<f64>,
    pub mass_change: Vec<f64>,
    pub phase: Vec<PhaseEvent>,
}

/// Phase-change classification of a layer for the current step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum PhaseEvent {
    None,
    Melting,
    Freezing,
}

impl Workspace {
    fn new(n: usize) -> Self {
        Self {
            sub_diag: vec![0.0; n],
            diag: vec![0.0; n],
            super_diag: vec![0.0; n],
            rhs: vec![0.0; n],
            increment: vec![0.0; n],
            flux: vec![0.0; n],
            lambda: vec![0.0; n],
            denom: vec![0.0; n],
            dtdz: vec![0.0; n],
            p: vec![0.0; n],
            q: vec![0.0; n],
            supercooled: vec![0.0; n],
            mass_ice: vec![0.0; n],
            mass_ice_prev: vec![0.0; n],
            mass_liq: vec![0.0; n],
            mass_total: vec![0.0; n],
            heat_energy: vec![0.0; n],
            mass_change: vec![0.0; n],
            phase: vec![PhaseEvent::None; n],
        }
    }
}

impl SoilColumn {
    /// Builds a column from a validated configuration.
    ///
    /// All per-layer arrays must have the same length as `depth`; the depth
    /// profile must be strictly increasing with `depth[0] > 0`. Violations
    /// are configuration errors reported with the offending parameter name.
    pub fn new(config: SoilConfig) -> Result<Self> {
        let SoilConfig {
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
            runoff_scheme,
            top_boundary,
            bottom_boundary,
            moisture_driven,
        } = config;

        let n = depth.len();
        if n == 0 {
            bail!("soil_z: at least one soil layer is required");
        }
        if depth[0] <= 0.0 {
            bail!("soil_z: first layer depth must be positive, got {}", depth[0]);
        }
        for i in 1..n {
            if depth[i] <= depth[i - 1] {
                bail!(
                    "soil_z: depths must be strictly increasing, got {} after {} at layer {i}",
                    depth[i],
                    depth[i - 1]
                );
            }
        }
        if temperature.len() != n {
            bail!(
                "soil_temperature: expected {n} values to match soil_z, got {}",
                temperature.len()
            );
        }
        if moisture_content.len() != n {
            bail!(
                "soil_moisture_content: expected {n} values to match soil_z, got {}",
                moisture_content.len()
            );
        }
        if liquid_content.len() != n {
            bail!(
                "soil_liquid_content: expected {n} values to match soil_z, got {}",
                liquid_content.len()
            );
        }
        if timestep <= 0.0 {
            bail!("dt: timestep must be positive, got {timestep}");
        }
        if !(porosity > 0.0 && porosity <= 1.0) {
            bail!("soil_params.smcmax: porosity must be in (0, 1], got {porosity}");
        }
        if clapp_hornberger_b <= 0.0 {
            bail!("soil_params.b: must be positive, got {clapp_hornberger_b}");
        }
        if quartz_fraction <= 0.0 {
            bail!("soil_params.quartz: must be positive, got {quartz_fraction}");
        }
        if saturated_matric_potential <= 0.0 {
            bail!("soil_params.satpsi: must be positive, got {saturated_matric_potential}");
        }
        for i in 0..n {
            if moisture_content[i] < 0.0 || moisture_content[i] > porosity {
                bail!(
                    "soil_moisture_content: layer {i} value {} outside [0, porosity={porosity}]",
                    moisture_content[i]
                );
            }
            if liquid_content[i] < 0.0 || liquid_content[i] > moisture_content[i] {
                bail!(
                    "soil_liquid_content: layer {i} value {} outside [0, moisture={}]",
                    liquid_content[i],
                    moisture_content[i]
                );
            }
        }

        let mut thickness = vec![0.0; n];
        thickness[0] = depth[0];
        for i in 1..n {
            thickness[i] = depth[i] - depth[i - 1];
        }

        let ice_content: Vec<f64> = moisture_content
            .iter()
            .zip(&liquid_content)
            .map(|(m, l)| m - l)
            .collect();

        // At t = 0 the previous and current temperature states coincide.
        let temperature_prev = temperature.clone();
        let soil_depth = depth[n - 1];

        Ok(Self {
            soil_depth,
            thickness,
            depth,
            temperature_prev,
            temperature,
            moisture_content,
            liquid_content,
            ice_content,
            thermal_conductivity: vec![0.0; n],
            heat_capacity: vec![0.0; n],
            porosity,
            clapp_hornberger_b,
            quartz_fraction,
            saturated_matric_potential,
            latent_heat_fusion: LATENT_HEAT_FUSION,
            dt: timestep,
            time: 0.0,
            end_time,
            top_boundary,
            bottom_boundary,
            surface_temperature: crate::properties::FREEZING_POINT,
            moisture_driven,
            runoff_scheme,
            ground_heat_flux: 0.0,
            bottom_heat_flux: 0.0,
            energy_consumed: 0.0,
            energy_balance_error: 0.0,
            ice_fraction_schaake: 0.0,
            ice_fraction_xinanjiang: 0.0,
            soil_ice_fraction: 0.0,
            workspace: Workspace::new(n),
        })
    }

    /// Number of soil layers.
    pub fn num_layers(&self) -> usize {
        self.temperature.len()
    }

    /// Configured timestep [s], for driving loops to schedule calls.
    pub fn timestep(&self) -> f64 {
        self.dt
    }

    /// Current simulation time [s].
    pub fn time(&self) -> f64 {
        self.time
    }

    /// Configured end of the simulation [s].
    pub fn end_time(&self) -> f64 {
        self.end_time
    }

    /// Depth of the bottom face of the deepest layer [m].
    pub fn soil_depth(&self) -> f64 {
        self.soil_depth
    }

    /// Layer thicknesses [m].
    pub fn thickness(&self) -> &[f64] {
        &self.thickness
    }

    /// Current layer temperatures [K].
    pub fn temperature(&self) -> &[f64] {
        &self.temperature
    }

    /// Total volumetric moisture content per layer [-].
    pub fn moisture_content(&self) -> &[f64] {
        &self.moisture_content
    }

    /// Liquid volumetric content per layer [-].
    pub fn liquid_content(&self) -> &[f64] {
        &self.liquid_content
    }

    /// Ice volumetric content per layer [-].
    pub fn ice_content(&self) -> &[f64] {
        &self.ice_content
    }

    /// Bulk thermal conductivity per layer [W/(m*K)] as of the last step.
    pub fn thermal_conductivity(&self) -> &[f64] {
        &self.thermal_conductivity
    }

    /// Volumetric heat capacity per layer [J/(m^3*K)] as of the last step.
    pub fn heat_capacity(&self) -> &[f64] {
        &self.heat_capacity
    }

    /// Conductive flux through the ground surface [W/m^2], positive into
    /// the soil.
    pub fn ground_heat_flux(&self) -> f64 {
        self.ground_heat_flux
    }

    /// Conductive flux through the bottom boundary [W/m^2], positive into
    /// the soil.
    pub fn bottom_heat_flux(&self) -> f64 {
        self.bottom_heat_flux
    }

    /// Energy consumed (+) or released (-) by phase change during the last
    /// step [W/m^2].
    pub fn energy_consumed_by_phase_change(&self) -> f64 {
        self.energy_consumed
    }

    /// Energy balance error accumulated since construction (or the last
    /// [`SoilColumn::reset_energy_balance_error`]) [W/m^2].
    pub fn energy_balance_error(&self) -> f64 {
        self.energy_balance_error
    }

    /// Depth-integrated frozen water volume [m] (Schaake scheme output).
    pub fn ice_fraction_schaake(&self) -> f64 {
        self.ice_fraction_schaake
    }

    /// Frozen-area fraction from the top-layer ice saturation [-]
    /// (Xinanjiang scheme output).
    pub fn ice_fraction_xinanjiang(&self) -> f64 {
        self.ice_fraction_xinanjiang
    }

    /// Fraction of the column's moisture mass that is frozen [-].
    pub fn soil_ice_fraction(&self) -> f64 {
        self.soil_ice_fraction
    }

    /// Whether moisture content is overwritten externally before each step.
    pub fn is_moisture_driven(&self) -> bool {
        self.moisture_driven
    }

    /// Sets the surface temperature [K] used when the top boundary is
    /// [`TopBoundary::CoupledSurfaceTemperature`]. Ignored by the solver
    /// under a constant-temperature top boundary.
    pub fn set_surface_temperature(&mut self, temperature: f64) {
        self.surface_temperature = temperature;
    }

    /// Overwrites the total moisture content from an external model.
    ///
    /// The liquid/ice split is reconciled against the current ice content at
    /// the start of the next [`SoilColumn::advance`] call when the column is
    /// moisture-driven.
    pub fn set_moisture_content(&mut self, moisture: &[f64]) -> Result<()> {
        if moisture.len() != self.moisture_content.len() {
            bail!(
                "soil_moisture_content: expected {} values, got {}",
                self.moisture_content.len(),
                moisture.len()
            );
        }
        self.moisture_content.copy_from_slice(moisture);
        Ok(())
    }

    /// Selects the surface-runoff ice fraction scheme. Overrides any scheme
    /// chosen at configuration time.
    pub fn set_runoff_scheme(&mut self, scheme: RunoffScheme) {
        self.runoff_scheme = Some(scheme);
    }

    /// Clears the accumulated energy balance error, e.g. between test runs.
    pub fn reset_energy_balance_error(&mut self) {
        self.energy_balance_error = 0.0;
    }
}
