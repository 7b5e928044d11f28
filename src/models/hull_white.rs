//! Hull-White one-factor model with piecewise-constant volatility.
//!
//! The model is `dr = (theta(t) - a r) dt + sigma(t) dW` with mean reversion
//! `a` and `sigma` constant on the intervals of a switch-time grid. Pricing
//! only ever consumes the re-based bond volatility [`HullWhiteOneFactor::alpha`],
//! so theta never needs to be materialized here.
//!
//! Reference: Hull and White (1990); the alpha function follows the
//! piecewise-constant integration in closed form.

use serde::{Deserialize, Serialize};

/// Hull-White one-factor parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HullWhiteOneFactor {
    mean_reversion: f64,
    /// Volatility on each interval of the switch grid.
    volatility: Vec<f64>,
    /// Interior switch times; `volatility[i]` applies on
    /// `[switch_times[i-1], switch_times[i])` with 0 and +inf at the ends.
    switch_times: Vec<f64>,
}

impl HullWhiteOneFactor {
    pub fn new(mean_reversion: f64, volatility: Vec<f64>, switch_times: Vec<f64>) -> Self {
        assert!(mean_reversion > 0.0, "mean reversion must be positive");
        assert!(!volatility.is_empty(), "at least one volatility bucket required");
        assert_eq!(
            switch_times.len(),
            volatility.len() - 1,
            "switch times must be one fewer than volatility buckets"
        );
        assert!(
            switch_times.windows(2).all(|w| w[1] > w[0]),
            "switch times must be strictly increasing"
        );
        assert!(
            switch_times.first().map_or(true, |&t| t > 0.0),
            "switch times must be positive"
        );
        assert!(
            volatility.iter().all(|&v| v > 0.0),
            "volatilities must be positive"
        );
        Self {
            mean_reversion,
            volatility,
            switch_times,
        }
    }

    /// Constant-volatility model.
    pub fn constant(mean_reversion: f64, volatility: f64) -> Self {
        Self::new(mean_reversion, vec![volatility], Vec::new())
    }

    pub fn mean_reversion(&self) -> f64 {
        self.mean_reversion
    }

    pub fn volatility(&self) -> &[f64] {
        &self.volatility
    }

    /// Re-based zero-coupon bond volatility over the expiry period
    /// `[start_expiry, end_expiry]` for a bond maturing at `bond_maturity`
    /// under the `numeraire_time`-forward measure:
    ///
    /// `alpha^2 = (e^{-a tn} - e^{-a tm})^2 / (2 a^3) *
    ///            int_{start}^{end} sigma(s)^2 e^{2 a s} ds`.
    pub fn alpha(
        &self,
        start_expiry: f64,
        end_expiry: f64,
        numeraire_time: f64,
        bond_maturity: f64,
    ) -> f64 {
        self.alpha_impl(start_expiry, end_expiry, numeraire_time, bond_maturity, None)
    }

    /// Alpha and its derivative with respect to each volatility bucket
    /// (adjoint sweep of the piecewise integral).
    pub fn alpha_with_derivatives(
        &self,
        start_expiry: f64,
        end_expiry: f64,
        numeraire_time: f64,
        bond_maturity: f64,
    ) -> (f64, Vec<f64>) {
        let mut derivatives = vec![0.0; self.volatility.len()];
        let alpha = self.alpha_impl(
            start_expiry,
            end_expiry,
            numeraire_time,
            bond_maturity,
            Some(&mut derivatives),
        );
        (alpha, derivatives)
    }

    fn alpha_impl(
        &self,
        start_expiry: f64,
        end_expiry: f64,
        numeraire_time: f64,
        bond_maturity: f64,
        derivatives: Option<&mut Vec<f64>>,
    ) -> f64 {
        assert!(end_expiry >= start_expiry, "expiry period must be ordered");
        let a = self.mean_reversion;
        let factor1 = (-a * numeraire_time).exp() - (-a * bond_maturity).exp();
        let numerator = 2.0 * a * a * a;

        // Integration grid: expiry bounds plus the switch times in between.
        let first_bucket = self.bucket_index(start_expiry);
        let mut grid = vec![start_expiry];
        let mut buckets = vec![first_bucket];
        for (i, &s) in self.switch_times.iter().enumerate() {
            if s > start_expiry && s < end_expiry {
                grid.push(s);
                buckets.push(i + 1);
            }
        }
        grid.push(end_expiry);

        let mut factor2 = 0.0;
        let mut contributions = vec![0.0; buckets.len()];
        for (j, &bucket) in buckets.iter().enumerate() {
            let sigma = self.volatility[bucket];
            let piece = (2.0 * a * grid[j + 1]).exp() - (2.0 * a * grid[j]).exp();
            contributions[j] = piece;
            factor2 += sigma * sigma * piece;
        }

        let sqrt_factor = (factor2 / numerator).sqrt();
        let alpha = factor1 * sqrt_factor;

        if let Some(derivatives) = derivatives {
            if sqrt_factor > 0.0 {
                let factor2_bar = factor1 / sqrt_factor / 2.0 / numerator;
                for (j, &bucket) in buckets.iter().enumerate() {
                    derivatives[bucket] +=
                        2.0 * self.volatility[bucket] * contributions[j] * factor2_bar;
                }
            }
        }

        alpha
    }

    fn bucket_index(&self, t: f64) -> usize {
        self.switch_times.partition_point(|&s| s <= t)
    }
}
