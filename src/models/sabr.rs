//! SABR smile: Hagan asymptotic volatility, parameter derivatives, and the
//! per-(expiry, tenor) parameter surface.
//!
//! References: Hagan et al. (2002), "Managing Smile Risk"; the asymptotic
//! formula is the standard lognormal expansion with the series guard around
//! z = 0.
//!
//! Numerical considerations: parameters are clamped to their admissible
//! ranges before evaluation; strikes far below the forward are floored at a
//! small moneyness cutoff (logged) to keep the replication integrand finite.

use serde::{Deserialize, Serialize};

/// Minimum strike as a fraction of the forward; below it the smile formula
/// is evaluated at the cutoff.
const CUTOFF_MONEYNESS: f64 = 1.0e-6;

/// SABR parameters at one (expiry, tenor) coordinate.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SabrParameters {
    pub alpha: f64,
    pub beta: f64,
    pub rho: f64,
    pub nu: f64,
}

/// Smile volatility and its derivatives with respect to the inputs and the
/// four SABR parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SabrVolatilityAdjoint {
    pub vol: f64,
    pub d_forward: f64,
    pub d_strike: f64,
    pub d_alpha: f64,
    pub d_beta: f64,
    pub d_rho: f64,
    pub d_nu: f64,
}

impl SabrParameters {
    /// Hagan lognormal implied volatility at strike `k` for forward `f` and
    /// expiry `t`.
    pub fn volatility(&self, f: f64, k: f64, t: f64) -> f64 {
        if t <= 0.0 || f <= 0.0 {
            return 0.0;
        }

        let cutoff = f * CUTOFF_MONEYNESS;
        let k = if k < cutoff {
            log::debug!("strike {k} below cutoff {cutoff}; evaluating smile at the cutoff");
            cutoff
        } else {
            k
        };

        let alpha = self.alpha.max(1e-12);
        let beta = self.beta.clamp(0.0, 1.0);
        let rho = self.rho.clamp(-0.999, 0.999);
        let nu = self.nu.max(0.0);

        let one_minus_beta = 1.0 - beta;

        let time_factor = |fk_pow: f64| {
            1.0 + (((one_minus_beta * one_minus_beta) / 24.0) * (alpha * alpha) / fk_pow
                + (rho * beta * nu * alpha) / (4.0 * fk_pow.sqrt())
                + ((2.0 - 3.0 * rho * rho) / 24.0) * (nu * nu))
                * t
        };

        if (f - k).abs() <= 1e-14 {
            let f_pow = f.powf(one_minus_beta);
            let fk_pow = f.powf(2.0 * one_minus_beta);
            return (alpha / f_pow) * time_factor(fk_pow);
        }

        let fk = f * k;
        let fk_pow_half = fk.powf(0.5 * one_minus_beta);
        let fk_pow = fk.powf(one_minus_beta);
        let log_fk = (f / k).ln();
        let log_fk2 = log_fk * log_fk;
        let log_fk4 = log_fk2 * log_fk2;

        let z = if alpha > 1e-14 {
            (nu / alpha) * fk_pow_half * log_fk
        } else {
            0.0
        };
        let z_over_xz = z_over_xz(z, rho);

        let denominator = fk_pow_half
            * (1.0
                + (one_minus_beta * one_minus_beta / 24.0) * log_fk2
                + (one_minus_beta.powi(4) / 1920.0) * log_fk4);

        let vol = (alpha / denominator) * z_over_xz * time_factor(fk_pow);
        if vol.is_finite() { vol.max(0.0) } else { 0.0 }
    }

    /// Volatility with central-difference derivatives in forward, strike and
    /// each SABR parameter.
    pub fn volatility_adjoint(&self, f: f64, k: f64, t: f64) -> SabrVolatilityAdjoint {
        let vol = self.volatility(f, k, t);

        let eps_f = (f.abs() * 1e-5).max(1e-7);
        let eps_k = (k.abs() * 1e-5).max(1e-7);
        let eps_alpha = (self.alpha.abs() * 1e-5).max(1e-7);
        let eps_beta = 1e-5;
        let eps_rho = 1e-5;
        let eps_nu = (self.nu.abs() * 1e-5).max(1e-7);

        let d_forward =
            (self.volatility(f + eps_f, k, t) - self.volatility(f - eps_f, k, t)) / (2.0 * eps_f);
        let d_strike =
            (self.volatility(f, k + eps_k, t) - self.volatility(f, k - eps_k, t)) / (2.0 * eps_k);

        let with = |alpha: f64, beta: f64, rho: f64, nu: f64| Self { alpha, beta, rho, nu };
        let d_alpha = (with(self.alpha + eps_alpha, self.beta, self.rho, self.nu).volatility(f, k, t)
            - with(self.alpha - eps_alpha, self.beta, self.rho, self.nu).volatility(f, k, t))
            / (2.0 * eps_alpha);
        let d_beta = (with(self.alpha, self.beta + eps_beta, self.rho, self.nu).volatility(f, k, t)
            - with(self.alpha, self.beta - eps_beta, self.rho, self.nu).volatility(f, k, t))
            / (2.0 * eps_beta);
        let d_rho = (with(self.alpha, self.beta, self.rho + eps_rho, self.nu).volatility(f, k, t)
            - with(self.alpha, self.beta, self.rho - eps_rho, self.nu).volatility(f, k, t))
            / (2.0 * eps_rho);
        let d_nu = (with(self.alpha, self.beta, self.rho, self.nu + eps_nu).volatility(f, k, t)
            - with(self.alpha, self.beta, self.rho, self.nu - eps_nu).volatility(f, k, t))
            / (2.0 * eps_nu);

        SabrVolatilityAdjoint {
            vol,
            d_forward,
            d_strike,
            d_alpha,
            d_beta,
            d_rho,
            d_nu,
        }
    }

    /// Volatility with first and second central-difference strike
    /// derivatives, used by the tail-extrapolation fit.
    pub fn strike_derivatives(&self, f: f64, k: f64, t: f64) -> (f64, f64, f64) {
        let eps = (k.abs() * 1e-4).max(1e-6);
        let vol = self.volatility(f, k, t);
        let up = self.volatility(f, k + eps, t);
        let dn = self.volatility(f, k - eps, t);
        let first = (up - dn) / (2.0 * eps);
        let second = (up - 2.0 * vol + dn) / (eps * eps);
        (vol, first, second)
    }
}

fn z_over_xz(z: f64, rho: f64) -> f64 {
    if z.abs() < 1e-8 {
        // Series expansion around z=0.
        1.0 - 0.5 * rho * z + ((2.0 - 3.0 * rho * rho) / 12.0) * z * z
    } else {
        let num = (1.0 - 2.0 * rho * z + z * z).sqrt() + z - rho;
        let den = 1.0 - rho;
        let xz = (num / den).ln();
        if xz.abs() > 1e-14 { z / xz } else { 1.0 }
    }
}

/// SABR parameters on a rectangular (expiry, underlying-tenor) grid with
/// bilinear interpolation and flat extrapolation at the edges.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SabrSurface {
    expiries: Vec<f64>,
    tenors: Vec<f64>,
    /// `params[i][j]` holds the parameters at `(expiries[i], tenors[j])`.
    params: Vec<Vec<SabrParameters>>,
}

impl SabrSurface {
    pub fn new(expiries: Vec<f64>, tenors: Vec<f64>, params: Vec<Vec<SabrParameters>>) -> Self {
        assert!(!expiries.is_empty() && !tenors.is_empty(), "empty surface grid");
        assert!(
            expiries.windows(2).all(|w| w[1] > w[0]),
            "expiries must be strictly increasing"
        );
        assert!(
            tenors.windows(2).all(|w| w[1] > w[0]),
            "tenors must be strictly increasing"
        );
        assert!(
            params.len() == expiries.len() && params.iter().all(|row| row.len() == tenors.len()),
            "parameter grid dimensions do not match axes"
        );
        Self {
            expiries,
            tenors,
            params,
        }
    }

    /// Surface with the same parameters everywhere; convenient in tests.
    pub fn flat(params: SabrParameters) -> Self {
        Self::new(vec![1.0], vec![1.0], vec![vec![params]])
    }

    /// Interpolated parameters at an (expiry, tenor) coordinate.
    pub fn parameters(&self, expiry: f64, tenor: f64) -> SabrParameters {
        let (i0, i1, wx) = axis_weights(&self.expiries, expiry);
        let (j0, j1, wy) = axis_weights(&self.tenors, tenor);

        let blend = |f: fn(&SabrParameters) -> f64| {
            let v00 = f(&self.params[i0][j0]);
            let v01 = f(&self.params[i0][j1]);
            let v10 = f(&self.params[i1][j0]);
            let v11 = f(&self.params[i1][j1]);
            (1.0 - wx) * ((1.0 - wy) * v00 + wy * v01) + wx * ((1.0 - wy) * v10 + wy * v11)
        };

        SabrParameters {
            alpha: blend(|p| p.alpha),
            beta: blend(|p| p.beta),
            rho: blend(|p| p.rho),
            nu: blend(|p| p.nu),
        }
    }
}

fn axis_weights(axis: &[f64], x: f64) -> (usize, usize, f64) {
    let n = axis.len();
    if x <= axis[0] || n == 1 {
        return (0, 0, 0.0);
    }
    if x >= axis[n - 1] {
        return (n - 1, n - 1, 0.0);
    }
    let i = axis.partition_point(|&a| a < x);
    let w = (x - axis[i - 1]) / (axis[i] - axis[i - 1]);
    (i - 1, i, w)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn hagan_reference_case_matches_expected_values() {
        let params = SabrParameters {
            alpha: 0.3,
            beta: 0.5,
            rho: -0.4,
            nu: 0.8,
        };
        let forward = 0.04;
        let t = 5.0;

        let strikes = [
            0.01, 0.015, 0.02, 0.025, 0.03, 0.035, 0.04, 0.045, 0.05, 0.06, 0.08,
        ];
        let expected = [
            2.380257906011173,
            2.107269276162069,
            1.925_635_528_505_62,
            1.791378193429727,
            1.686220961919487,
            1.600827072338926,
            1.529_781_25,
            1.469656043231035,
            1.418137287693584,
            1.334774783651072,
            1.221122758700629,
        ];

        for (k, exp) in strikes.iter().zip(expected.iter()) {
            let vol = params.volatility(forward, *k, t);
            assert_relative_eq!(vol, *exp, epsilon = 1e-12);
        }
    }

    #[test]
    fn atm_and_near_atm_are_consistent() {
        let params = SabrParameters {
            alpha: 0.3,
            beta: 0.5,
            rho: -0.4,
            nu: 0.8,
        };
        let f = 0.04;
        let atm = params.volatility(f, f, 5.0);
        let near = params.volatility(f, f * (1.0 + 1e-10), 5.0);
        assert_relative_eq!(atm, near, epsilon = 1e-8);
    }

    #[test]
    fn volatility_adjoint_signs_and_consistency() {
        let params = SabrParameters {
            alpha: 0.05,
            beta: 0.5,
            rho: -0.25,
            nu: 0.5,
        };
        let (f, k, t) = (0.04, 0.05, 5.0);
        let adj = params.volatility_adjoint(f, k, t);

        assert_relative_eq!(adj.vol, params.volatility(f, k, t), epsilon = 1e-14);
        // Vol scales with alpha and, out of the money, with nu.
        assert!(adj.d_alpha > 0.0);
        assert!(adj.d_nu > 0.0);
        // Downward-sloping smile to the right of the forward here.
        assert!(adj.d_strike < 0.0);
        assert!(adj.d_forward.is_finite() && adj.d_beta.is_finite() && adj.d_rho.is_finite());
    }

    #[test]
    fn strike_derivatives_match_direct_differences() {
        let params = SabrParameters {
            alpha: 0.05,
            beta: 0.5,
            rho: -0.25,
            nu: 0.5,
        };
        let (f, t) = (0.04, 5.0);
        let (vol, first, second) = params.strike_derivatives(f, 0.06, t);
        assert_relative_eq!(vol, params.volatility(f, 0.06, t), epsilon = 1e-14);
        // Smile slopes downward to the right of the money here.
        assert!(first < 0.0);
        assert!(second.is_finite());
    }

    #[test]
    fn surface_interpolates_and_extrapolates_flat() {
        let p_short = SabrParameters {
            alpha: 0.04,
            beta: 0.5,
            rho: -0.2,
            nu: 0.4,
        };
        let p_long = SabrParameters {
            alpha: 0.06,
            beta: 0.5,
            rho: -0.3,
            nu: 0.5,
        };
        let surface = SabrSurface::new(
            vec![1.0, 10.0],
            vec![2.0, 10.0],
            vec![vec![p_short, p_short], vec![p_long, p_long]],
        );

        let mid = surface.parameters(5.5, 5.0);
        assert_relative_eq!(mid.alpha, 0.05, epsilon = 1e-12);
        assert_relative_eq!(mid.rho, -0.25, epsilon = 1e-12);

        let beyond = surface.parameters(50.0, 50.0);
        assert_relative_eq!(beyond.alpha, 0.06, epsilon = 1e-12);
    }
}
