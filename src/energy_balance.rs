//! Step-wise energy conservation audit.
//!
//! The change in stored heat across a step must equal the net boundary flux
//! minus the energy consumed by phase change. The residual of that balance
//! is accumulated over the column lifetime and treated as a hard assertion:
//! drift beyond the tolerance means the solver or the material model is
//! wrong, and the simulation must not continue.

use anyhow::{bail, Result};

use crate::column::SoilColumn;
use crate::properties::FREEZING_POINT;

/// Accumulated energy-balance drift beyond which the simulation aborts
/// [W/m^2].
const TOLERANCE: f64 = 1.0e-4;

/// Audits the step that just completed and accumulates the balance error.
pub fn check(column: &mut SoilColumn) -> Result<()> {
    let n = column.num_layers();
    let dt = column.dt;
    let net_flux = column.ground_heat_flux + column.bottom_heat_flux;

    // Stored heat relative to the freezing point, before and after the step.
    let mut energy_previous = 0.0;
    let mut energy_current = 0.0;
    for i in 0..n {
        let scale = column.heat_capacity[i] * column.thickness[i] / dt;
        energy_previous += scale * (column.temperature_prev[i] - FREEZING_POINT);
        energy_current += scale * (column.temperature[i] - FREEZING_POINT);
    }

    let energy_residual = energy_current - energy_previous;
    let step_error = (energy_residual + column.energy_consumed) - net_flux;
    column.energy_balance_error += step_error;

    log::debug!(
        "energy balance: stored {energy_residual:.6} + phase change {:.6} - net flux {net_flux:.6} = {step_error:.4e} W/m^2 (accumulated {:.4e})",
        column.energy_consumed,
        column.energy_balance_error,
    );

    if column.energy_balance_error.abs() > TOLERANCE {
        bail!(
            "soil energy balance violated:\n\
             Energy (previous timestep)     [W/m^2] = {energy_previous:.6}\n\
             Energy (current timestep)      [W/m^2] = {energy_current:.6}\n\
             Energy gain (+) or loss (-)    [W/m^2] = {energy_residual:.6}\n\
             Surface flux (in (+), out (-)) [W/m^2] = {:.6}\n\
             Bottom flux  (in (+), out (-)) [W/m^2] = {:.6}\n\
             Netflux (in (+) or out (-))    [W/m^2] = {net_flux:.6}\n\
             Energy (phase change)          [W/m^2] = {:.6}\n\
             Energy balance error (local)   [W/m^2] = {step_error:.4e}\n\
             Energy balance error (global)  [W/m^2] = {:.4e}",
            column.ground_heat_flux,
            column.bottom_heat_flux,
            column.energy_consumed,
            column.energy_balance_error,
        );
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::boundary::{BottomBoundary, RunoffScheme, TopBoundary};
    use crate::config::SoilConfig;
    use crate::heat_capacity;

    fn column() -> SoilColumn {
        let mut col = SoilColumn::new(SoilConfig {
            end_time: 86400.0,
            timestep: 3600.0,
            depth: vec![0.5, 1.0],
            porosity: 0.439,
            clapp_hornberger_b: 4.05,
            quartz_fraction: 0.35,
            saturated_matric_potential: 0.355,
            temperature: vec![280.0, 280.0],
            moisture_content: vec![0.3, 0.3],
            liquid_content: vec![0.3, 0.3],
            runoff_scheme: Some(RunoffScheme::Schaake),
            top_boundary: TopBoundary::ConstantTemperature { temperature: 280.0 },
            bottom_boundary: BottomBoundary::ZeroFlux,
            moisture_driven: false,
        })
        .unwrap();
        heat_capacity::update(&mut col);
        col
    }

    #[test]
    fn test_balanced_step_passes() {
        let mut col = column();
        // Nothing moved, no fluxes, no phase change.
        check(&mut col).unwrap();
        assert_eq!(col.energy_balance_error(), 0.0);
    }

    #[test]
    fn test_consistent_temperature_change_passes() {
        let mut col = column();
        // Warm the top layer and report exactly the flux that explains it.
        let hc = col.heat_capacity()[0];
        col.temperature[0] += 0.1;
        col.ground_heat_flux = hc * 0.1 * 0.5 / 3600.0;
        check(&mut col).unwrap();
        assert!(col.energy_balance_error().abs() < 1e-9);
    }

    #[test]
    fn test_unexplained_temperature_change_fails() {
        let mut col = column();
        // Temperature rose with no flux and no phase change to pay for it.
        col.temperature[0] += 0.1;
        let err = check(&mut col).unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("energy balance"), "{msg}");
        // The diagnostic breakdown must be part of the report.
        assert!(msg.contains("Netflux"), "{msg}");
        assert!(msg.contains("phase change"), "{msg}");
    }

    #[test]
    fn test_error_accumulates_across_steps() {
        let mut col = column();
        // A per-step error below tolerance must still trip the audit once
        // the accumulated drift crosses it.
        let hc = col.heat_capacity()[0];
        let drift = 0.4e-4; // W/m^2 per step
        let dt_temp = drift * 3600.0 / (hc * 0.5);

        col.temperature[0] += dt_temp;
        col.temperature_prev[0] = 280.0;
        check(&mut col).unwrap();

        col.temperature_prev[0] = col.temperature[0];
        col.temperature[0] += dt_temp;
        check(&mut col).unwrap();

        col.temperature_prev[0] = col.temperature[0];
        col.temperature[0] += dt_temp;
        assert!(check(&mut col).is_err(), "third step should cross 1e-4 W/m^2");

        // Resetting clears the accumulator for reuse in tests.
        col.reset_energy_balance_error();
        assert_eq!(col.energy_balance_error(), 0.0);
    }
}
