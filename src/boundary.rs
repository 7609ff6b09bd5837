/// Boundary condition applied at the top (ground surface) of the column.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TopBoundary {
    /// Fixed surface temperature [K].
    ConstantTemperature { temperature: f64 },
    /// Surface temperature supplied each step by a coupled model (or read
    /// from a forcing file by the driver) via
    /// [`SoilColumn::set_surface_temperature`](crate::SoilColumn::set_surface_temperature).
    CoupledSurfaceTemperature,
}

/// Boundary condition applied at the bottom of the column.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BottomBoundary {
    /// Fixed temperature [K] below the deepest layer.
    ConstantTemperature { temperature: f64 },
    /// Zero geothermal flux (insulated bottom).
    ZeroFlux,
}

/// Surface-runoff scheme used to reduce the ice state to the scalar
/// fractions consumed by rainfall-runoff models.
///
/// Both schemes are outputs only; neither feeds back into the freeze-thaw
/// state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunoffScheme {
    /// Depth-integrated frozen water volume [m].
    Schaake,
    /// Exponential function of the top-layer ice saturation.
    Xinanjiang,
}
