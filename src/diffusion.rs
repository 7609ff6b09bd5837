//! Implicit heat-diffusion solve for the soil column.
//!
//! Builds a flux-based tridiagonal system in which each layer couples to its
//! neighbors through conductivity-weighted temperature gradients, then runs
//! a Thomas (TDMA) sweep. The solution is a temperature *increment* added to
//! the current profile, not an absolute new value; the right-hand side
//! carries the explicit flux divergence scaled by
//! `lambda = dt / (thickness * heat_capacity)`.

use anyhow::{bail, Result};

use crate::boundary::{BottomBoundary, TopBoundary};
use crate::column::SoilColumn;

/// Pivot magnitude below which the tridiagonal system is treated as
/// numerically singular.
const PIVOT_EPS: f64 = 1e-20;

/// Advances `temperature` by one implicit timestep using the current
/// conductivity, heat capacity and boundary settings. Records
/// `ground_heat_flux` and `bottom_heat_flux` as side effects.
///
/// Fails if the tridiagonal system is numerically singular; the step must
/// not proceed past such a failure.
pub fn solve(column: &mut SoilColumn) -> Result<()> {
    let n = column.num_layers();
    let dt = column.dt;

    let surface_temp = match column.top_boundary {
        TopBoundary::ConstantTemperature { temperature } => temperature,
        TopBoundary::CoupledSurfaceTemperature => column.surface_temperature,
    };
    // Top boundary flux over half the top layer thickness.
    column.ground_heat_flux = -column.thermal_conductivity[0]
        * (column.temperature[0] - surface_temp)
        / (0.5 * column.depth[0]);

    column.bottom_heat_flux = match column.bottom_boundary {
        BottomBoundary::ConstantTemperature { temperature } => {
            -column.thermal_conductivity[n - 1] * (column.temperature[n - 1] - temperature)
                / column.thickness[n - 1]
        }
        BottomBoundary::ZeroFlux => 0.0,
    };

    let ws = &mut column.workspace;

    if n == 1 {
        // The lone layer exchanges heat with both boundaries directly.
        ws.lambda[0] = dt / (column.depth[0] * column.heat_capacity[0]);
        ws.flux[0] = column.ground_heat_flux + column.bottom_heat_flux;
        ws.sub_diag[0] = 0.0;
        ws.super_diag[0] = 0.0;
        ws.diag[0] = 1.0;
        ws.rhs[0] = ws.lambda[0] * ws.flux[0];
    } else {
        // Thermal fluxes and per-layer scale factors.
        for i in 0..n {
            if i == 0 {
                let h1 = column.depth[0];
                let h2 = column.depth[1];
                ws.lambda[0] = dt / (h1 * column.heat_capacity[0]);
                ws.denom[0] = 2.0 / h2;
                ws.dtdz[0] = 2.0 * (column.temperature[1] - column.temperature[0]) / h2;
                ws.flux[0] =
                    column.thermal_conductivity[0] * ws.dtdz[0] + column.ground_heat_flux;
            } else if i < n - 1 {
                let h1 = column.depth[i] - column.depth[i - 1];
                let h2 = column.depth[i + 1] - column.depth[i - 1];
                ws.lambda[i] = dt / (h1 * column.heat_capacity[i]);
                ws.denom[i] = 2.0 / h2;
                ws.dtdz[i] = 2.0 * (column.temperature[i + 1] - column.temperature[i]) / h2;
                ws.flux[i] = column.thermal_conductivity[i] * ws.dtdz[i]
                    - column.thermal_conductivity[i - 1] * ws.dtdz[i - 1];
            } else {
                let h1 = column.depth[i] - column.depth[i - 1];
                ws.lambda[i] = dt / (h1 * column.heat_capacity[i]);
                ws.flux[i] = column.bottom_heat_flux
                    - column.thermal_conductivity[i - 1] * ws.dtdz[i - 1];
            }
        }

        // Coefficient rows: a_i X_{i-1} + b_i X_i + c_i X_{i+1} = d_i.
        for i in 0..n {
            if i == 0 {
                ws.sub_diag[0] = 0.0;
                ws.super_diag[0] =
                    -ws.lambda[0] * column.thermal_conductivity[0] * ws.denom[0];
                ws.diag[0] = 1.0 - ws.super_diag[0];
            } else if i < n - 1 {
                ws.sub_diag[i] =
                    -ws.lambda[i] * column.thermal_conductivity[i - 1] * ws.denom[i - 1];
                ws.super_diag[i] =
                    -ws.lambda[i] * column.thermal_conductivity[i] * ws.denom[i];
                ws.diag[i] = 1.0 - ws.sub_diag[i] - ws.super_diag[i];
            } else {
                ws.sub_diag[i] =
                    -ws.lambda[i] * column.thermal_conductivity[i - 1] * ws.denom[i - 1];
                ws.super_diag[i] = 0.0;
                ws.diag[i] = 1.0 - ws.sub_diag[i];
            }
            ws.rhs[i] = ws.lambda[i] * ws.flux[i];
        }
    }

    solve_tdma(
        &ws.sub_diag,
        &ws.diag,
        &ws.super_diag,
        &ws.rhs,
        &mut ws.p,
        &mut ws.q,
        &mut ws.increment,
    )?;

    for i in 0..n {
        column.temperature[i] += ws.increment[i];
    }

    Ok(())
}

/// Thomas algorithm for `a_i x_{i-1} + b_i x_i + c_i x_{i+1} = d_i`,
/// `i = 0..n-1`; `a[0]` and `c[n-1]` are unused.
///
/// The forward sweep builds the factors `p`/`q`; the backward substitution
/// writes the solution into `x`. A pivot `b[i] + a[i]*p[i-1]` smaller than
/// [`PIVOT_EPS`] in magnitude reports a singular system instead of
/// returning a result.
fn solve_tdma(
    a: &[f64],
    b: &[f64],
    c: &[f64],
    d: &[f64],
    p: &mut [f64],
    q: &mut [f64],
    x: &mut [f64],
) -> Result<()> {
    let n = d.len();

    let mut denominator = b[0];
    if denominator.abs() < PIVOT_EPS {
        bail!("tridiagonal solve failed: singular pivot at row 0");
    }
    p[0] = -c[0] / denominator;
    q[0] = d[0] / denominator;

    for i in 1..n {
        denominator = b[i] + a[i] * p[i - 1];
        if denominator.abs() < PIVOT_EPS {
            bail!("tridiagonal solve failed: singular pivot at row {i}");
        }
        p[i] = -c[i] / denominator;
        q[i] = (d[i] - a[i] * q[i - 1]) / denominator;
    }

    x[n - 1] = q[n - 1];
    for i in (0..n - 1).rev() {
        x[i] = p[i] * x[i + 1] + q[i];
    }

    Ok(())
}
