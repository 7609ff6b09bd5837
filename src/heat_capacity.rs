//! Effective volumetric heat capacity from the volume fractions of the
//! soil constituents (liquid water, ice, minerals, air).

use crate::column::SoilColumn;
use crate::properties::{
    HEAT_CAPACITY_AIR, HEAT_CAPACITY_ICE, HEAT_CAPACITY_SOIL, HEAT_CAPACITY_WATER,
};

/// Recomputes `heat_capacity` for every layer from the current
/// moisture/liquid state.
pub fn update(column: &mut SoilColumn) {
    let n = column.num_layers();
    let porosity = column.porosity;

    for i in 0..n {
        let liquid = column.liquid_content[i];
        let sice = column.moisture_content[i] - liquid;
        column.heat_capacity[i] = liquid * HEAT_CAPACITY_WATER
            + sice * HEAT_CAPACITY_ICE
            + (1.0 - porosity) * HEAT_CAPACITY_SOIL
            + (porosity - column.moisture_content[i]) * HEAT_CAPACITY_AIR;
    }
}
