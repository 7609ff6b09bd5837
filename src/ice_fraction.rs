//! Ice-fraction outputs for surface-runoff schemes.
//!
//! These reduce the column's ice state to the scalars consumed by
//! rainfall-runoff models (matching the NOAH-MP conventions); nothing here
//! feeds back into the freeze-thaw state itself.

use anyhow::{bail, Result};

use crate::boundary::RunoffScheme;
use crate::column::SoilColumn;

/// Shape parameter of the Xinanjiang frozen-area curve.
const XINANJIANG_A: f64 = 4.0;

/// Ice mass threshold below which the bulk soil ice fraction is left at
/// zero [m of water equivalent].
const MIN_ICE_VOLUME: f64 = 1e-6;

/// Recomputes the scheme-specific ice fraction plus the bulk soil ice
/// fraction. Fails if no runoff scheme was configured or supplied
/// externally.
pub fn update(column: &mut SoilColumn) -> Result<()> {
    let n = column.num_layers();

    column.ice_fraction_schaake = 0.0;
    column.ice_fraction_xinanjiang = 0.0;
    column.soil_ice_fraction = 0.0;

    let Some(scheme) = column.runoff_scheme else {
        bail!("ice fraction scheme not configured and not supplied externally; options: Schaake or Xinanjiang");
    };

    match scheme {
        RunoffScheme::Schaake => {
            // Depth-integrated frozen water volume [m].
            let mut val = 0.0;
            for i in 0..n {
                val += column.ice_content[i] * column.thickness[i];
            }
            column.ice_fraction_schaake = val;
        }
        RunoffScheme::Xinanjiang => {
            // Frozen-area fraction from the top-layer ice saturation.
            let fice = (column.ice_content[0] / column.porosity).min(1.0);
            let fcr = ((-XINANJIANG_A * (1.0 - fice)).exp() - (-XINANJIANG_A).exp()).max(0.0)
                / (1.0 - (-XINANJIANG_A).exp());
            column.ice_fraction_xinanjiang = fcr;
        }
    }

    // Bulk fraction of the moisture mass that is frozen.
    let mut ice_volume = 0.0;
    let mut moisture_volume = 0.0;
    for i in 0..n {
        moisture_volume += column.moisture_content[i] * column.thickness[i];
        ice_volume += column.ice_content[i] * column.thickness[i];
    }
    if moisture_volume > 0.0 && ice_volume > MIN_ICE_VOLUME {
        column.soil_ice_fraction = ice_volume / moisture_volume;
    }

    Ok(())
}
