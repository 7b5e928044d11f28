//! Displaced-diffusion LIBOR market model parameters.
//!
//! Each forward rate `L_i` on the tenor grid follows lognormal dynamics in
//! the displaced variable `L_i + a` with its own volatility; cross-forward
//! correlation decays exponentially with tenor distance at the
//! `mean_reversion` rate. Validation mirrors the defensive checks the MC
//! engine relies on.

use serde::{Deserialize, Serialize};

use crate::core::PricingError;

/// LMM displaced-diffusion parameter set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LmmDisplacedDiffusion {
    /// Tenor grid `T_0, ..., T_n` in years, strictly increasing.
    pub tenor_times: Vec<f64>,
    /// Volatility of each displaced forward (one per grid period).
    pub volatilities: Vec<f64>,
    /// Displacement `a >= 0`; zero recovers the lognormal LMM.
    pub displacement: f64,
    /// Correlation decay: `rho_ij = exp(-mean_reversion * |T_i - T_j|)`.
    pub mean_reversion: f64,
}

impl LmmDisplacedDiffusion {
    pub fn new(
        tenor_times: Vec<f64>,
        volatilities: Vec<f64>,
        displacement: f64,
        mean_reversion: f64,
    ) -> Result<Self, PricingError> {
        let model = Self {
            tenor_times,
            volatilities,
            displacement,
            mean_reversion,
        };
        model.validate()?;
        Ok(model)
    }

    pub fn validate(&self) -> Result<(), PricingError> {
        if self.volatilities.is_empty() {
            return Err(PricingError::InvalidInput(
                "volatilities cannot be empty".to_string(),
            ));
        }
        if self.tenor_times.len() != self.volatilities.len() + 1 {
            return Err(PricingError::InvalidInput(
                "tenor grid length must equal volatilities length + 1".to_string(),
            ));
        }
        if self
            .volatilities
            .iter()
            .any(|v| !v.is_finite() || *v < 0.0)
        {
            return Err(PricingError::InvalidInput(
                "volatilities must be finite and >= 0".to_string(),
            ));
        }
        for w in self.tenor_times.windows(2) {
            if !w[0].is_finite() || !w[1].is_finite() || w[1] <= w[0] {
                return Err(PricingError::InvalidInput(
                    "tenor times must be finite and strictly increasing".to_string(),
                ));
            }
        }
        if !self.displacement.is_finite() || self.displacement < 0.0 {
            return Err(PricingError::InvalidInput(
                "displacement must be finite and >= 0".to_string(),
            ));
        }
        if !self.mean_reversion.is_finite() || self.mean_reversion < 0.0 {
            return Err(PricingError::InvalidInput(
                "mean reversion must be finite and >= 0".to_string(),
            ));
        }
        Ok(())
    }

    /// Accrual fraction of each grid period.
    pub fn taus(&self) -> Vec<f64> {
        self.tenor_times.windows(2).map(|w| w[1] - w[0]).collect()
    }

    /// Number of modeled forwards.
    pub fn dimension(&self) -> usize {
        self.volatilities.len()
    }

    /// Exponential-decay correlation matrix across forwards.
    pub fn correlation(&self) -> Vec<Vec<f64>> {
        let n = self.dimension();
        (0..n)
            .map(|i| {
                (0..n)
                    .map(|j| {
                        (-self.mean_reversion * (self.tenor_times[i] - self.tenor_times[j]).abs())
                            .exp()
                    })
                    .collect()
            })
            .collect()
    }

    /// Index of the grid period containing `t` in `[T_i, T_{i+1})`.
    pub fn period_index(&self, t: f64) -> Option<usize> {
        if t < self.tenor_times[0] {
            return None;
        }
        let i = self.tenor_times.partition_point(|&ti| ti <= t);
        if i == 0 || i > self.dimension() {
            None
        } else {
            Some(i - 1)
        }
    }
}

/// Lower Cholesky factor of a correlation matrix; `None` when the matrix is
/// not positive semidefinite.
pub(crate) fn cholesky_lower(matrix: &[Vec<f64>]) -> Option<Vec<Vec<f64>>> {
    let n = matrix.len();
    if n == 0 || matrix.iter().any(|row| row.len() != n) {
        return None;
    }

    let mut l = vec![vec![0.0_f64; n]; n];
    let tol = 1.0e-12;

    for i in 0..n {
        for j in 0..=i {
            let mut sum = matrix[i][j];
            for k in 0..j {
                sum -= l[i][k] * l[j][k];
            }

            if i == j {
                if sum < -tol {
                    return None;
                }
                l[i][j] = sum.max(tol).sqrt();
            } else if l[j][j].abs() > tol {
                l[i][j] = sum / l[j][j];
            } else {
                l[i][j] = 0.0;
            }
        }
    }

    Some(l)
}
