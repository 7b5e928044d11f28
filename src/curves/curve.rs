//! Zero-rate term structure with linear interpolation and flat extrapolation.

use serde::{Deserialize, Serialize};

/// Continuously compounded zero-rate curve keyed by time in years from the
/// valuation date.
///
/// Interpolation is linear in the zero rate between nodes; beyond the first
/// and last node the rate is held flat. `discount_factor(0) == 1` always.
/// The curve is immutable after construction: bumping a node returns a new
/// curve, which is what the bump-and-reprice sensitivity path relies on.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ZeroRateCurve {
    name: String,
    times: Vec<f64>,
    rates: Vec<f64>,
}

impl ZeroRateCurve {
    /// Creates a curve from `(time, zero_rate)` nodes.
    ///
    /// Nodes are sorted by time; non-positive times are rejected.
    pub fn new(name: impl Into<String>, mut nodes: Vec<(f64, f64)>) -> Self {
        assert!(!nodes.is_empty(), "curve requires at least one node");
        nodes.sort_by(|a, b| a.0.total_cmp(&b.0));
        assert!(nodes[0].0 > 0.0, "node times must be positive");
        for w in nodes.windows(2) {
            assert!(w[1].0 > w[0].0, "node times must be strictly increasing");
        }
        let (times, rates) = nodes.into_iter().unzip();
        Self {
            name: name.into(),
            times,
            rates,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn node_count(&self) -> usize {
        self.times.len()
    }

    pub fn node_times(&self) -> &[f64] {
        &self.times
    }

    pub fn node_rates(&self) -> &[f64] {
        &self.rates
    }

    /// Interpolated zero rate at time `t`.
    pub fn zero_rate(&self, t: f64) -> f64 {
        let n = self.times.len();
        if t <= self.times[0] {
            return self.rates[0];
        }
        if t >= self.times[n - 1] {
            return self.rates[n - 1];
        }
        let i = self.upper_index(t);
        let (t0, t1) = (self.times[i - 1], self.times[i]);
        let w = (t - t0) / (t1 - t0);
        self.rates[i - 1] * (1.0 - w) + self.rates[i] * w
    }

    /// Discount factor `exp(-r(t) * t)`; exactly 1 at or before time zero.
    pub fn discount_factor(&self, t: f64) -> f64 {
        if t <= 0.0 {
            return 1.0;
        }
        (-self.zero_rate(t) * t).exp()
    }

    /// Interpolation weights `dr(t)/dr_i`, aligned with the node order.
    ///
    /// At most two entries are non-zero; under flat extrapolation the
    /// boundary node carries weight one.
    pub fn node_weights(&self, t: f64) -> Vec<f64> {
        let n = self.times.len();
        let mut weights = vec![0.0; n];
        if t <= self.times[0] {
            weights[0] = 1.0;
            return weights;
        }
        if t >= self.times[n - 1] {
            weights[n - 1] = 1.0;
            return weights;
        }
        let i = self.upper_index(t);
        let (t0, t1) = (self.times[i - 1], self.times[i]);
        let w = (t - t0) / (t1 - t0);
        weights[i - 1] = 1.0 - w;
        weights[i] = w;
        weights
    }

    /// Structurally new curve with node `index` shifted by `shift` in rate.
    pub fn bumped_node(&self, index: usize, shift: f64) -> Self {
        assert!(index < self.rates.len(), "node index out of range");
        let mut rates = self.rates.clone();
        rates[index] += shift;
        Self {
            name: self.name.clone(),
            times: self.times.clone(),
            rates,
        }
    }

    fn upper_index(&self, t: f64) -> usize {
        // First node strictly above t; callers guarantee interior t.
        self.times.partition_point(|&ti| ti < t)
    }
}
