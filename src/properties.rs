//! Physical constants shared by the thermal and phase-change modules.
//!
//! These are process-wide, read-only values; modules refer to them directly
//! rather than carrying them around in per-call state.

/// Volumetric heat capacity of liquid water [J/(m^3*K)].
pub const HEAT_CAPACITY_WATER: f64 = 4.188e6;

/// Volumetric heat capacity of ice [J/(m^3*K)].
pub const HEAT_CAPACITY_ICE: f64 = 2.094e6;

/// Volumetric heat capacity of air [J/(m^3*K)].
pub const HEAT_CAPACITY_AIR: f64 = 1004.64;

/// Volumetric heat capacity of soil minerals [J/(m^3*K)].
pub const HEAT_CAPACITY_SOIL: f64 = 2.00e6;

/// Gravitational acceleration used by the freezing-point depression
/// relation [m/s^2].
pub const GRAVITY: f64 = 9.86;

/// Freezing point of water [K]; also the reference temperature for the
/// energy balance check.
pub const FREEZING_POINT: f64 = 273.15;

/// Density of liquid water [kg/m^3].
pub const WATER_DENSITY: f64 = 1000.0;

/// Latent heat of fusion of water [J/kg].
pub const LATENT_HEAT_FUSION: f64 = 0.3336e6;
