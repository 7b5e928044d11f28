//! Point curve sensitivities: the raw output of analytic pricing adjoints.
//!
//! A sensitivity maps a curve name to `(time, dPV/dZeroRate)` pairs. Entries
//! accumulate freely during pricing; `cleaned` sorts by time and merges
//! duplicates, which is the canonical form tests compare on.

use std::collections::BTreeMap;

use crate::core::{Currency, PricingError};
use crate::curves::FxMatrix;

/// Sensitivity of one value (in one implicit currency) to every curve it
/// touches, keyed by curve name.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CurveSensitivity {
    sensitivities: BTreeMap<String, Vec<(f64, f64)>>,
}

impl CurveSensitivity {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn of(name: impl Into<String>, points: Vec<(f64, f64)>) -> Self {
        let mut out = Self::new();
        out.sensitivities.insert(name.into(), points);
        out
    }

    pub fn add_point(&mut self, name: &str, time: f64, value: f64) {
        self.sensitivities
            .entry(name.to_string())
            .or_default()
            .push((time, value));
    }

    pub fn plus(&self, other: &Self) -> Self {
        let mut out = self.clone();
        for (name, points) in &other.sensitivities {
            out.sensitivities
                .entry(name.clone())
                .or_default()
                .extend_from_slice(points);
        }
        out
    }

    pub fn multiplied_by(&self, factor: f64) -> Self {
        Self {
            sensitivities: self
                .sensitivities
                .iter()
                .map(|(name, points)| {
                    (
                        name.clone(),
                        points.iter().map(|(t, v)| (*t, v * factor)).collect(),
                    )
                })
                .collect(),
        }
    }

    /// Canonical form: per curve, points sorted by time with duplicate times
    /// summed into one entry.
    pub fn cleaned(&self) -> Self {
        let sensitivities = self
            .sensitivities
            .iter()
            .map(|(name, points)| {
                let mut sorted = points.clone();
                sorted.sort_by(|a, b| a.0.total_cmp(&b.0));
                let mut merged: Vec<(f64, f64)> = Vec::with_capacity(sorted.len());
                for (t, v) in sorted {
                    match merged.last_mut() {
                        Some((last_t, last_v)) if (*last_t - t).abs() <= 1.0e-12 => *last_v += v,
                        _ => merged.push((t, v)),
                    }
                }
                (name.clone(), merged)
            })
            .collect();
        Self { sensitivities }
    }

    pub fn get(&self, name: &str) -> Option<&[(f64, f64)]> {
        self.sensitivities.get(name).map(|v| v.as_slice())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[(f64, f64)])> {
        self.sensitivities
            .iter()
            .map(|(name, points)| (name.as_str(), points.as_slice()))
    }

    pub fn is_empty(&self) -> bool {
        self.sensitivities.is_empty()
    }
}

/// Curve sensitivities of a multi-currency value, one block per payment
/// currency, convertible into a single settlement currency via FX rates.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct MultiCurrencyCurveSensitivity {
    blocks: BTreeMap<Currency, CurveSensitivity>,
}

impl MultiCurrencyCurveSensitivity {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn of(currency: Currency, sensitivity: CurveSensitivity) -> Self {
        let mut out = Self::new();
        out.blocks.insert(currency, sensitivity);
        out
    }

    pub fn add(&mut self, currency: Currency, sensitivity: &CurveSensitivity) {
        let entry = self.blocks.entry(currency).or_default();
        *entry = entry.plus(sensitivity);
    }

    pub fn plus(&self, other: &Self) -> Self {
        let mut out = self.clone();
        for (ccy, block) in &other.blocks {
            out.add(*ccy, block);
        }
        out
    }

    pub fn multiplied_by(&self, factor: f64) -> Self {
        Self {
            blocks: self
                .blocks
                .iter()
                .map(|(ccy, block)| (*ccy, block.multiplied_by(factor)))
                .collect(),
        }
    }

    pub fn cleaned(&self) -> Self {
        Self {
            blocks: self
                .blocks
                .iter()
                .map(|(ccy, block)| (*ccy, block.cleaned()))
                .collect(),
        }
    }

    pub fn get(&self, currency: Currency) -> Option<&CurveSensitivity> {
        self.blocks.get(&currency)
    }

    pub fn iter(&self) -> impl Iterator<Item = (Currency, &CurveSensitivity)> {
        self.blocks.iter().map(|(ccy, block)| (*ccy, block))
    }

    /// Collapses all blocks into one settlement currency.
    pub fn converted_into(
        &self,
        fx: &FxMatrix,
        settlement: Currency,
    ) -> Result<CurveSensitivity, PricingError> {
        let mut total = CurveSensitivity::new();
        for (ccy, block) in &self.blocks {
            let factor = fx.rate(*ccy, settlement)?;
            total = total.plus(&block.multiplied_by(factor));
        }
        Ok(total)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn cleaned_merges_duplicate_times_and_sorts() {
        let mut cs = CurveSensitivity::new();
        cs.add_point("DSC", 2.0, 10.0);
        cs.add_point("DSC", 1.0, 5.0);
        cs.add_point("DSC", 2.0, -4.0);

        let cleaned = cs.cleaned();
        let points = cleaned.get("DSC").unwrap();
        assert_eq!(points.len(), 2);
        assert_relative_eq!(points[0].0, 1.0);
        assert_relative_eq!(points[1].1, 6.0);
    }

    #[test]
    fn plus_and_scale_are_pointwise() {
        let a = CurveSensitivity::of("DSC", vec![(1.0, 2.0)]);
        let b = CurveSensitivity::of("FWD", vec![(1.0, 3.0)]);
        let sum = a.plus(&b).multiplied_by(2.0);
        assert_eq!(sum.get("DSC").unwrap()[0].1, 4.0);
        assert_eq!(sum.get("FWD").unwrap()[0].1, 6.0);
    }

    #[test]
    fn conversion_scales_by_fx_rate() {
        let fx = FxMatrix::new().with_rate(Currency::Eur, Currency::Usd, 1.25);
        let mc = MultiCurrencyCurveSensitivity::of(
            Currency::Eur,
            CurveSensitivity::of("EUR-DSC", vec![(1.0, 100.0)]),
        );
        let usd = mc.converted_into(&fx, Currency::Usd).unwrap();
        assert_relative_eq!(usd.get("EUR-DSC").unwrap()[0].1, 125.0);
    }
}
