//! Partitioning of soil moisture between liquid water and ice.
//!
//! Works in mass per unit area [kg/m^2]. The freezing-point depression
//! relation (Clapp-Hornberger soil water retention) gives the maximum liquid
//! water that can coexist below freezing; layers holding more liquid freeze,
//! layers holding ice above freezing melt. The energy driving either
//! transition is taken from the layer's sensible heat, and whatever the
//! bounded mass change cannot absorb is returned to the layer as a
//! temperature correction.

use crate::column::{PhaseEvent, SoilColumn};
use crate::properties::{FREEZING_POINT, GRAVITY, WATER_DENSITY};

/// Repartitions moisture into ice and liquid for every layer, adjusts the
/// layer temperatures for the latent-heat residual, and records the energy
/// consumed by phase change for the energy balance check.
pub fn apply(column: &mut SoilColumn) {
    let n = column.num_layers();
    let dt = column.dt;
    let latent_heat = column.latent_heat_fusion;
    let ws = &mut column.workspace;

    column.energy_consumed = 0.0;

    // Mass of ice and liquid per unit area.
    for i in 0..n {
        ws.mass_ice[i] = (column.moisture_content[i] - column.liquid_content[i])
            * column.thickness[i]
            * WATER_DENSITY;
        ws.mass_liq[i] = column.liquid_content[i] * column.thickness[i] * WATER_DENSITY;
        ws.mass_ice_prev[i] = ws.mass_ice[i];
        ws.mass_total[i] = ws.mass_ice[i] + ws.mass_liq[i];
        ws.phase[i] = PhaseEvent::None;
        ws.heat_energy[i] = 0.0;
    }

    // Maximum liquid water that can exist below the freezing point, from
    // the Clapp-Hornberger freezing-point depression relation.
    let lam = -1.0 / column.clapp_hornberger_b;
    for i in 0..n {
        ws.supercooled[i] = if column.temperature[i] < FREEZING_POINT {
            let matric_potential = latent_heat / (GRAVITY * column.temperature[i])
                * (FREEZING_POINT - column.temperature[i]);
            let vol = column.porosity
                * (matric_potential / column.saturated_matric_potential).powf(lam);
            vol * column.thickness[i] * WATER_DENSITY
        } else {
            0.0
        };
    }

    // Melting/freezing classification.
    for i in 0..n {
        if ws.mass_ice[i] > 0.0 && column.temperature[i] > FREEZING_POINT {
            ws.phase[i] = PhaseEvent::Melting;
        } else if ws.mass_liq[i] > ws.supercooled[i] && column.temperature[i] <= FREEZING_POINT {
            ws.phase[i] = PhaseEvent::Freezing;
        }
    }

    // Excess (melting) or deficit (freezing) of sensible heat relative to
    // the freezing point, in W/m^2. The layer temperature is clamped to the
    // freezing point; it only departs from it again through the residual
    // correction below. A classification whose energy has the wrong sign is
    // cancelled after the energy was already booked, matching the
    // accounting the energy balance check expects.
    for i in 0..n {
        if ws.phase[i] != PhaseEvent::None {
            ws.heat_energy[i] = (column.temperature[i] - FREEZING_POINT)
                * column.heat_capacity[i]
                * column.thickness[i]
                / dt;
            column.temperature[i] = FREEZING_POINT;
            column.energy_consumed += ws.heat_energy[i];
        }

        if ws.phase[i] == PhaseEvent::Melting && ws.heat_energy[i] < 0.0 {
            ws.heat_energy[i] = 0.0;
            ws.phase[i] = PhaseEvent::None;
        }
        if ws.phase[i] == PhaseEvent::Freezing && ws.heat_energy[i] > 0.0 {
            ws.heat_energy[i] = 0.0;
            ws.phase[i] = PhaseEvent::None;
        }

        // Water mass that the available energy can melt (+) or freeze (-).
        ws.mass_change[i] = ws.heat_energy[i] * dt / latent_heat;
    }

    // Apply the mass change within physical bounds, then convert the
    // unabsorbed energy back into a temperature correction.
    for i in 0..n {
        if ws.phase[i] == PhaseEvent::None || ws.heat_energy[i].abs() == 0.0 {
            continue;
        }

        if ws.mass_change[i] > 0.0 {
            // Melting cannot consume more ice than the layer holds.
            ws.mass_ice[i] = (ws.mass_ice_prev[i] - ws.mass_change[i]).max(0.0);
        } else if ws.mass_change[i] < 0.0 {
            // Freezing cannot push the liquid below the supercooled limit.
            if ws.mass_total[i] < ws.supercooled[i] {
                ws.mass_ice[i] = 0.0;
            } else {
                ws.mass_ice[i] = (ws.mass_total[i] - ws.supercooled[i])
                    .min(ws.mass_ice_prev[i] - ws.mass_change[i])
                    .max(0.0);
            }
        }

        // Energy not absorbed by the actual (possibly clamped) mass change
        // becomes sensible heat again.
        let residual =
            ws.heat_energy[i] - latent_heat * (ws.mass_ice_prev[i] - ws.mass_ice[i]) / dt;
        ws.mass_liq[i] = (ws.mass_total[i] - ws.mass_ice[i]).max(0.0);

        column.energy_consumed -= residual;
        if residual.abs() > 0.0 {
            let f = dt / (column.heat_capacity[i] * column.thickness[i]);
            column.temperature[i] += f * residual;
        }
    }

    // Back to volumetric fractions.
    for i in 0..n {
        let mass_to_vol = WATER_DENSITY * column.thickness[i];
        column.liquid_content[i] = ws.mass_liq[i] / mass_to_vol;
        column.moisture_content[i] = (ws.mass_liq[i] + ws.mass_ice[i]) / mass_to_vol;
        column.ice_content[i] =
            (column.moisture_content[i] - column.liquid_content[i]).max(0.0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::boundary::{BottomBoundary, RunoffScheme, TopBoundary};
    use crate::config::SoilConfig;
    use crate::heat_capacity;
    use crate::properties::LATENT_HEAT_FUSION;

    fn column(temperature: Vec<f64>, moisture: Vec<f64>, liquid: Vec<f64>) -> SoilColumn {
        let n = temperature.len();
        let depth: Vec<f64> = (1..=n).map(|i| i as f64 * 0.5).collect();
        let mut col = SoilColumn::new(SoilConfig {
            end_time: 86400.0,
            timestep: 3600.0,
            depth,
            porosity: 0.439,
            clapp_hornberger_b: 4.05,
            quartz_fraction: 0.35,
            saturated_matric_potential: 0.355,
            temperature,
            moisture_content: moisture,
            liquid_content: liquid,
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
    fn test_no_phase_change_above_freezing_without_ice() {
        let mut col = column(vec![280.0], vec![0.3], vec![0.3]);
        apply(&mut col);
        assert_eq!(col.ice_content()[0], 0.0);
        assert!((col.temperature()[0] - 280.0).abs() < 1e-12);
        assert_eq!(col.energy_consumed_by_phase_change(), 0.0);
    }

    #[test]
    fn test_freezing_below_freezing_point() {
        let mut col = column(vec![270.0], vec![0.3], vec![0.3]);
        let hc = col.heat_capacity()[0];
        apply(&mut col);

        // Liquid above the supercooled limit at 270 K freezes until the
        // deficit energy is consumed; the temperature is pulled up to the
        // freezing point.
        assert!(col.ice_content()[0] > 0.0, "no ice formed");
        assert!(
            (col.temperature()[0] - FREEZING_POINT).abs() < 1e-9,
            "temperature {} should sit at the freezing point",
            col.temperature()[0]
        );

        // The frozen mass matches the sensible-heat deficit exactly when no
        // clamp applies: m = (Tfrz - T) * C * dz / Lf.
        let expected_ice =
            (FREEZING_POINT - 270.0) * hc * 0.5 / LATENT_HEAT_FUSION / (WATER_DENSITY * 0.5);
        assert!(
            (col.ice_content()[0] - expected_ice).abs() < 1e-9,
            "ice {} vs expected {expected_ice}",
            col.ice_content()[0]
        );
    }

    #[test]
    fn test_melting_above_freezing_point() {
        // 0.05 ice at 275 K melts; the melt consumes sensible heat and the
        // temperature drops back toward the freezing point.
        let mut col = column(vec![275.0], vec![0.3], vec![0.25]);
        apply(&mut col);

        assert!(col.ice_content()[0] < 0.05, "ice should have melted");
        assert!(col.liquid_content()[0] > 0.25);
        assert!(col.temperature()[0] <= 275.0);
        assert!(col.temperature()[0] >= FREEZING_POINT - 1e-9);
    }

    #[test]
    fn test_small_melt_energy_leaves_residual_free() {
        // Barely above freezing with lots of ice: all available energy goes
        // into melting, the temperature stays clamped at the freezing point
        // and the melted mass follows the energy exactly.
        let mut col = column(vec![273.2], vec![0.3], vec![0.1]);
        let hc = col.heat_capacity()[0];
        apply(&mut col);

        let heat_energy = (273.2 - FREEZING_POINT) * hc * 0.5 / 3600.0;
        let melted = heat_energy * 3600.0 / LATENT_HEAT_FUSION / (WATER_DENSITY * 0.5);
        assert!((col.temperature()[0] - FREEZING_POINT).abs() < 1e-9);
        assert!((col.ice_content()[0] - (0.2 - melted)).abs() < 1e-9);
    }

    #[test]
    fn test_total_melt_clamps_at_zero_ice_and_returns_residual() {
        // Warm layer with a trace of ice: the melt exhausts the ice and the
        // leftover energy returns as sensible heat, so the temperature ends
        // above freezing but below its starting value.
        let mut col = column(vec![278.0], vec![0.3], vec![0.299]);
        apply(&mut col);

        assert_eq!(col.ice_content()[0], 0.0);
        assert!(col.temperature()[0] > FREEZING_POINT);
        assert!(col.temperature()[0] < 278.0);

        // Energy bookkeeping: booked clamp energy minus returned residual
        // equals the latent heat actually spent.
        let spent = LATENT_HEAT_FUSION * 0.001 * WATER_DENSITY * 0.5 / 3600.0;
        assert!(
            (col.energy_consumed_by_phase_change() - spent).abs() < 1e-6,
            "phase change energy {} vs latent spend {spent}",
            col.energy_consumed_by_phase_change()
        );
    }

    #[test]
    fn test_supercooled_limit_keeps_liquid_below_freezing() {
        // Deeply frozen soil retains some unfrozen water.
        let mut col = column(vec![263.15], vec![0.3], vec![0.3]);
        apply(&mut col);

        assert!(col.liquid_content()[0] > 0.0, "all liquid froze");
        assert!(col.ice_content()[0] > 0.0);

        // The remaining liquid cannot exceed the supercooled limit at the
        // (corrected) layer temperature by more than the clamp allows.
        let t = col.temperature()[0];
        if t < FREEZING_POINT {
            let matric_potential =
                LATENT_HEAT_FUSION / (GRAVITY * 263.15) * (FREEZING_POINT - 263.15);
            let limit = 0.439 * (matric_potential / 0.355).powf(-1.0 / 4.05);
            assert!(
                col.liquid_content()[0] <= limit + 1e-9,
                "liquid {} above supercooled limit {limit}",
                col.liquid_content()[0]
            );
        }
    }

    #[test]
    fn test_partition_invariants_hold_across_layer_states() {
        // Mixed column: melting, freezing, and inert layers at once.
        let mut col = column(
            vec![275.0, 270.0, 273.15, 280.0],
            vec![0.3, 0.3, 0.25, 0.2],
            vec![0.2, 0.3, 0.25, 0.2],
        );
        apply(&mut col);

        for i in 0..4 {
            let liquid = col.liquid_content()[i];
            let moisture = col.moisture_content()[i];
            let ice = col.ice_content()[i];
            assert!(liquid >= 0.0, "layer {i}: negative liquid {liquid}");
            assert!(
                liquid <= moisture + 1e-12,
                "layer {i}: liquid {liquid} above moisture {moisture}"
            );
            assert!(ice >= 0.0, "layer {i}: negative ice {ice}");
            assert!(
                (ice - (moisture - liquid)).abs() < 1e-12,
                "layer {i}: ice {ice} is not moisture - liquid"
            );
        }
    }

    #[test]
    fn test_energy_bookkeeping_matches_temperature_change() {
        // For any layer, the booked phase-change energy plus the net
        // sensible-heat change reproduces the pre-clamp state exactly.
        let mut col = column(vec![270.0], vec![0.3], vec![0.3]);
        let hc = col.heat_capacity()[0];
        apply(&mut col);

        let dt = col.timestep();
        let sensible = (col.temperature()[0] - 270.0) * hc * 0.5 / dt;
        let total = sensible + col.energy_consumed_by_phase_change();
        assert!(
            total.abs() < 1e-9,
            "clamp energy and booked phase-change energy diverge: {total}"
        );
    }
}
