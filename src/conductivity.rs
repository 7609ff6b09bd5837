//! Bulk soil thermal conductivity following the Peters-Lidard
//! parameterization: a Kersten-number blend between the dry and the
//! saturated conductivity, with the saturated value built from the
//! geometric mean of the solid, ice and water conductivities.

use crate::column::SoilColumn;

/// Thermal conductivity of quartz [W/(m*K)].
const TC_QUARTZ: f64 = 7.7;
/// Thermal conductivity of liquid water [W/(m*K)].
const TC_WATER: f64 = 0.57;
/// Thermal conductivity of ice [W/(m*K)].
const TC_ICE: f64 = 2.2;

/// Recomputes `thermal_conductivity` for every layer from the current
/// moisture/liquid state. Pure function of the column state; all divisions
/// are guarded.
pub fn update(column: &mut SoilColumn) {
    let n = column.num_layers();
    let porosity = column.porosity;
    let quartz = column.quartz_fraction;

    // Conductivity of the non-quartz minerals.
    let tc_mineral: f64 = if quartz > 0.2 { 2.0 } else { 3.0 };
    let tc_solid = TC_QUARTZ.powf(quartz) * tc_mineral.powf(1.0 - quartz);

    // Dry conductivity from the dry bulk density.
    let gammd = (1.0 - porosity) * 2700.0;
    let tc_dry = (0.135 * gammd + 64.7) / (2700.0 - 0.947 * gammd);

    for i in 0..n {
        let moisture = column.moisture_content[i];
        let liquid = column.liquid_content[i];
        let sat_ratio = moisture / porosity;

        // Unfrozen fraction of the pore water; 1.0 when the layer holds no
        // moisture to avoid a zero division.
        let x_unfrozen = if moisture > 0.0 { liquid / moisture } else { 1.0 };
        let xu = x_unfrozen * porosity;
        let tc_sat =
            tc_solid.powf(1.0 - porosity) * TC_ICE.powf(porosity - xu) * TC_WATER.powf(xu);

        // Kersten number: linear in saturation for partially frozen soil,
        // logarithmic in saturation otherwise.
        let kn = if liquid + 0.0005 < moisture {
            sat_ratio
        } else if sat_ratio > 0.1 {
            sat_ratio.log10() + 1.0
        } else if sat_ratio > 0.05 {
            0.7 * sat_ratio.log10() + 1.0
        } else {
            0.0
        };

        column.thermal_conductivity[i] = kn * (tc_sat - tc_dry) + tc_dry;
    }
}
