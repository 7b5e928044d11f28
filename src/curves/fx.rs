//! FX rate matrix used to express composite prices in one settlement currency.

use std::collections::HashMap;

use crate::core::{Currency, CurrencyAmount, MultiCurrencyAmount, PricingError};

/// Immutable matrix of FX rates.
///
/// A quote `(base, quote, rate)` means one unit of `base` is worth `rate`
/// units of `quote`. Both directions are stored; a missing pair is a hard
/// error, never a silent 1.0.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FxMatrix {
    rates: HashMap<(Currency, Currency), f64>,
}

impl FxMatrix {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a quote in both directions.
    pub fn with_rate(mut self, base: Currency, quote: Currency, rate: f64) -> Self {
        assert!(rate > 0.0, "fx rate must be positive");
        self.rates.insert((base, quote), rate);
        self.rates.insert((quote, base), 1.0 / rate);
        self
    }

    /// Conversion factor from `from` into `to`.
    pub fn rate(&self, from: Currency, to: Currency) -> Result<f64, PricingError> {
        if from == to {
            return Ok(1.0);
        }
        self.rates
            .get(&(from, to))
            .copied()
            .ok_or_else(|| PricingError::MissingFxRate(format!("{from}/{to}")))
    }

    pub fn convert(
        &self,
        amount: CurrencyAmount,
        to: Currency,
    ) -> Result<CurrencyAmount, PricingError> {
        let factor = self.rate(amount.currency, to)?;
        Ok(CurrencyAmount::new(to, amount.amount * factor))
    }

    /// Collapses a multi-currency amount into a single settlement currency.
    pub fn convert_multi(
        &self,
        amounts: &MultiCurrencyAmount,
        to: Currency,
    ) -> Result<CurrencyAmount, PricingError> {
        let mut total = 0.0;
        for (ccy, amount) in amounts.iter() {
            total += amount * self.rate(ccy, to)?;
        }
        Ok(CurrencyAmount::new(to, total))
    }
}
