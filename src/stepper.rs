//! Timestep orchestration.
//!
//! One call to [`SoilColumn::advance`] runs exactly one fixed-size step:
//!
//! ```text
//! snapshot previous temperature
//!   -> reconcile externally driven moisture (optional)
//!   -> thermal conductivity -> heat capacity
//!   -> implicit diffusion solve
//!   -> phase change partitioning
//!   -> clock += dt
//!   -> ice fraction outputs
//!   -> energy balance audit
//! ```
//!
//! There are no partial steps and no retries: on error the column state is
//! not trustworthy and the caller must rebuild it from a checkpoint instead
//! of advancing further.

use anyhow::Result;

use crate::column::SoilColumn;
use crate::{conductivity, diffusion, energy_balance, heat_capacity, ice_fraction, phase_change};

impl SoilColumn {
    /// Advances the column by one timestep.
    ///
    /// Must not be called concurrently on the same column; the column has no
    /// internal locking and callers serialize access.
    pub fn advance(&mut self) -> Result<()> {
        // Store the current state before advancing.
        self.temperature_prev.copy_from_slice(&self.temperature);

        // An external model sets only the total moisture content, so the
        // liquid share is recovered from the previous ice content.
        if self.moisture_driven {
            for i in 0..self.num_layers() {
                self.liquid_content[i] =
                    (self.moisture_content[i] - self.ice_content[i]).max(0.0);
            }
        }

        conductivity::update(self);
        heat_capacity::update(self);
        diffusion::solve(self)?;
        phase_change::apply(self);

        self.time += self.dt;

        ice_fraction::update(self)?;

        if log::log_enabled!(log::Level::Debug) {
            for i in 0..self.num_layers() {
                log::debug!(
                    "layer {i}: T {:.3} -> {:.3} K, moisture (total/liquid/ice) {:.4}/{:.4}/{:.4}",
                    self.temperature_prev[i],
                    self.temperature[i],
                    self.moisture_content[i],
                    self.liquid_content[i],
                    self.ice_content[i],
                );
            }
        }

        energy_balance::check(self)?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::boundary::{BottomBoundary, RunoffScheme, TopBoundary};
    use crate::column::SoilColumn;
    use crate::config::SoilConfig;

    fn config() -> SoilConfig {
        SoilConfig {
            end_time: 86400.0,
            timestep: 3600.0,
            depth: vec![0.1, 0.4, 1.0, 2.0],
            porosity: 0.439,
            clapp_hornberger_b: 4.05,
            quartz_fraction: 0.35,
            saturated_matric_potential: 0.355,
            temperature: vec![280.0; 4],
            moisture_content: vec![0.3; 4],
            liquid_content: vec![0.3; 4],
            runoff_scheme: Some(RunoffScheme::Schaake),
            top_boundary: TopBoundary::ConstantTemperature { temperature: 275.0 },
            bottom_boundary: BottomBoundary::ZeroFlux,
            moisture_driven: false,
        }
    }

    #[test]
    fn test_advance_moves_clock_and_snapshots_previous_state() {
        let mut col = SoilColumn::new(config()).unwrap();
        col.advance().unwrap();
        assert!((col.time() - 3600.0).abs() < 1e-9);
        for i in 0..4 {
            assert!((col.temperature_prev[i] - 280.0).abs() < 1e-12);
        }
        col.advance().unwrap();
        assert!((col.time() - 7200.0).abs() < 1e-9);
        // prev now reflects the state after the first step, not the initial
        // condition.
        assert!(col.temperature_prev[0] < 280.0);
    }

    #[test]
    fn test_moisture_driven_reconciles_liquid_from_ice() {
        let mut cfg = config();
        cfg.moisture_driven = true;
        cfg.moisture_content = vec![0.0; 4];
        cfg.liquid_content = vec![0.0; 4];
        let mut col = SoilColumn::new(cfg).unwrap();

        col.set_moisture_content(&[0.25, 0.25, 0.25, 0.25]).unwrap();
        col.advance().unwrap();
        // No ice yet, so the whole injected moisture is liquid.
        for i in 0..4 {
            assert!((col.liquid_content()[i] - 0.25).abs() < 1e-12);
        }
    }

    #[test]
    fn test_advance_fails_without_runoff_scheme() {
        let mut cfg = config();
        cfg.runoff_scheme = None;
        let mut col = SoilColumn::new(cfg).unwrap();
        assert!(col.advance().is_err());
    }

    #[test]
    fn test_driving_loop_uses_timestep_accessor() {
        let mut col = SoilColumn::new(config()).unwrap();
        let mut t = 0.0;
        while t < col.end_time() {
            col.advance().unwrap();
            t += col.timestep();
        }
        assert!((col.time() - col.end_time()).abs() < 1e-6);
    }
}
