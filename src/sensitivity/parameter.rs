//! Bucketed parameter sensitivity: one value per curve node.
//!
//! Point sensitivities are projected onto curve nodes through the exact
//! interpolation weights, giving the PV01-style vectors risk systems consume.

use std::collections::BTreeMap;

use crate::core::{Currency, PricingError};
use crate::curves::{FxMatrix, MulticurveProvider};
use crate::sensitivity::curve::MultiCurrencyCurveSensitivity;

/// Per-node sensitivities keyed by (curve name, payment currency).
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ParameterSensitivity {
    sensitivities: BTreeMap<(String, Currency), Vec<f64>>,
}

impl ParameterSensitivity {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn of(name: impl Into<String>, currency: Currency, values: Vec<f64>) -> Self {
        let mut out = Self::new();
        out.sensitivities.insert((name.into(), currency), values);
        out
    }

    /// Projects point sensitivities onto the nodes of the named curves.
    pub fn from_curve_sensitivity(
        point: &MultiCurrencyCurveSensitivity,
        provider: &MulticurveProvider,
    ) -> Result<Self, PricingError> {
        let mut out = Self::new();
        for (currency, block) in point.iter() {
            for (name, points) in block.iter() {
                let curve = provider.curve_by_name(name).ok_or_else(|| {
                    PricingError::MissingCurve(format!("no curve named {name} in provider"))
                })?;
                let entry = out
                    .sensitivities
                    .entry((name.to_string(), currency))
                    .or_insert_with(|| vec![0.0; curve.node_count()]);
                for (t, v) in points {
                    let weights = curve.node_weights(*t);
                    for (slot, w) in entry.iter_mut().zip(weights.iter()) {
                        *slot += v * w;
                    }
                }
            }
        }
        Ok(out)
    }

    pub fn insert(&mut self, name: impl Into<String>, currency: Currency, values: Vec<f64>) {
        self.sensitivities.insert((name.into(), currency), values);
    }

    pub fn get(&self, name: &str, currency: Currency) -> Option<&[f64]> {
        self.sensitivities
            .get(&(name.to_string(), currency))
            .map(|v| v.as_slice())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, Currency, &[f64])> {
        self.sensitivities
            .iter()
            .map(|((name, ccy), values)| (name.as_str(), *ccy, values.as_slice()))
    }

    pub fn plus(&self, other: &Self) -> Self {
        let mut out = self.clone();
        for (key, values) in &other.sensitivities {
            match out.sensitivities.get_mut(key) {
                Some(existing) => {
                    assert_eq!(existing.len(), values.len(), "node count mismatch");
                    for (slot, v) in existing.iter_mut().zip(values.iter()) {
                        *slot += v;
                    }
                }
                None => {
                    out.sensitivities.insert(key.clone(), values.clone());
                }
            }
        }
        out
    }

    pub fn multiplied_by(&self, factor: f64) -> Self {
        Self {
            sensitivities: self
                .sensitivities
                .iter()
                .map(|(key, values)| (key.clone(), values.iter().map(|v| v * factor).collect()))
                .collect(),
        }
    }

    pub fn negated(&self) -> Self {
        self.multiplied_by(-1.0)
    }

    /// Re-expresses every block in one settlement currency.
    pub fn converted_into(
        &self,
        fx: &FxMatrix,
        settlement: Currency,
    ) -> Result<Self, PricingError> {
        let mut out = Self::new();
        for ((name, ccy), values) in &self.sensitivities {
            let factor = fx.rate(*ccy, settlement)?;
            let scaled: Vec<f64> = values.iter().map(|v| v * factor).collect();
            let converted = Self::of(name.clone(), settlement, scaled);
            out = out.plus(&converted);
        }
        Ok(out)
    }

    /// Largest absolute element-wise difference against another sensitivity,
    /// used by the analytic-vs-finite-difference checks.
    pub fn max_absolute_difference(&self, other: &Self) -> f64 {
        let mut max = 0.0_f64;
        let keys: std::collections::BTreeSet<_> = self
            .sensitivities
            .keys()
            .chain(other.sensitivities.keys())
            .cloned()
            .collect();
        for key in keys {
            let zero: Vec<f64> = Vec::new();
            let a = self.sensitivities.get(&key).unwrap_or(&zero);
            let b = other.sensitivities.get(&key).unwrap_or(&zero);
            let n = a.len().max(b.len());
            for i in 0..n {
                let av = a.get(i).copied().unwrap_or(0.0);
                let bv = b.get(i).copied().unwrap_or(0.0);
                max = max.max((av - bv).abs());
            }
        }
        max
    }
}
