//! Multi-curve provider: the immutable discount/forward curve container.
//!
//! Separates discounting (one curve per currency) from forwarding (one curve
//! per rate index), following the post-2008 multi-curve framework.
//!
//! References:
//! - Henrard, "Interest Rate Modelling in the Multi-Curve Framework" (2014)
//! - Ametrano, Bianchetti, "Everything You Always Wanted to Know About
//!   Multiple Interest Rate Curve Bootstrapping" (2013)

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::core::{Currency, PricingError};
use crate::curves::{FxMatrix, ZeroRateCurve};

/// Forward-curve key: an Ibor tenor or an overnight index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RateIndex {
    Ibor { currency: Currency, tenor_months: u32 },
    Overnight { currency: Currency },
}

impl RateIndex {
    pub fn currency(&self) -> Currency {
        match self {
            Self::Ibor { currency, .. } | Self::Overnight { currency } => *currency,
        }
    }
}

impl std::fmt::Display for RateIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Ibor {
                currency,
                tenor_months,
            } => write!(f, "{currency}-IBOR-{tenor_months}M"),
            Self::Overnight { currency } => write!(f, "{currency}-ON"),
        }
    }
}

/// Immutable mapping {currency -> discount curve} and {index -> forward curve}
/// plus the FX matrix for cross-currency aggregation.
///
/// Built once per valuation by an external calibration step, read-only
/// afterwards; `with_*` methods return a structurally new provider so
/// bump-and-reprice never mutates the original.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct MulticurveProvider {
    discount: HashMap<Currency, ZeroRateCurve>,
    forward: HashMap<RateIndex, ZeroRateCurve>,
    fx: FxMatrix,
}

impl MulticurveProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_fx(mut self, fx: FxMatrix) -> Self {
        self.fx = fx;
        self
    }

    /// Registers (or replaces) the discount curve for a currency.
    pub fn with_discount_curve(mut self, currency: Currency, curve: ZeroRateCurve) -> Self {
        self.discount.insert(currency, curve);
        self
    }

    /// Registers (or replaces) the forward curve for a rate index.
    pub fn with_forward_curve(mut self, index: RateIndex, curve: ZeroRateCurve) -> Self {
        self.forward.insert(index, curve);
        self
    }

    pub fn fx(&self) -> &FxMatrix {
        &self.fx
    }

    pub fn discount_curve(&self, currency: Currency) -> Result<&ZeroRateCurve, PricingError> {
        self.discount
            .get(&currency)
            .ok_or_else(|| PricingError::MissingCurve(format!("no discount curve for {currency}")))
    }

    pub fn forward_curve(&self, index: RateIndex) -> Result<&ZeroRateCurve, PricingError> {
        self.forward
            .get(&index)
            .ok_or_else(|| PricingError::MissingCurve(format!("no forward curve for {index}")))
    }

    pub fn discount_factor(&self, currency: Currency, t: f64) -> Result<f64, PricingError> {
        Ok(self.discount_curve(currency)?.discount_factor(t))
    }

    /// Simply compounded forward rate `(P(t0)/P(t1) - 1) / accrual` from the
    /// index's forward curve.
    pub fn forward_rate(
        &self,
        index: RateIndex,
        t0: f64,
        t1: f64,
        accrual: f64,
    ) -> Result<f64, PricingError> {
        if !(t1 > t0) || accrual <= 0.0 {
            return Err(PricingError::InvalidInput(format!(
                "forward period must be ordered with positive accrual: t0={t0}, t1={t1}, accrual={accrual}"
            )));
        }
        let curve = self.forward_curve(index)?;
        Ok((curve.discount_factor(t0) / curve.discount_factor(t1) - 1.0) / accrual)
    }

    /// Name of the discount curve for `currency`, used to label sensitivity
    /// buckets.
    pub fn name(&self, currency: Currency) -> Result<&str, PricingError> {
        Ok(self.discount_curve(currency)?.name())
    }

    /// Name of the forward curve for `index`.
    pub fn forward_name(&self, index: RateIndex) -> Result<&str, PricingError> {
        Ok(self.forward_curve(index)?.name())
    }

    /// Looks a curve up by its registered name, searching discount curves
    /// first.
    pub fn curve_by_name(&self, name: &str) -> Option<&ZeroRateCurve> {
        self.discount
            .values()
            .find(|c| c.name() == name)
            .or_else(|| self.forward.values().find(|c| c.name() == name))
    }

    /// Structural copy with the curve of the given name replaced.
    ///
    /// The replacement applies wherever the name is registered (a curve may
    /// serve both discounting and forwarding).
    pub fn with_replaced_curve(
        &self,
        name: &str,
        curve: ZeroRateCurve,
    ) -> Result<Self, PricingError> {
        let mut out = self.clone();
        let mut found = false;
        for existing in out.discount.values_mut() {
            if existing.name() == name {
                *existing = curve.clone();
                found = true;
            }
        }
        for existing in out.forward.values_mut() {
            if existing.name() == name {
                *existing = curve.clone();
                found = true;
            }
        }
        if !found {
            return Err(PricingError::MissingCurve(format!(
                "no curve named {name} to replace"
            )));
        }
        Ok(out)
    }

    /// Registered curve names, deduplicated and sorted for deterministic
    /// iteration (bump engines walk this list).
    pub fn curve_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .discount
            .values()
            .chain(self.forward.values())
            .map(|c| c.name().to_string())
            .collect();
        names.sort();
        names.dedup();
        names
    }
}
