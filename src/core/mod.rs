//! Common domain value types and the library-wide error taxonomy.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// ISO-style currency identifier for the closed set supported by the library.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Currency {
    Usd,
    Eur,
    Gbp,
    Jpy,
    Chf,
    Aud,
}

impl Currency {
    /// Three-letter code.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Usd => "USD",
            Self::Eur => "EUR",
            Self::Gbp => "GBP",
            Self::Jpy => "JPY",
            Self::Chf => "CHF",
            Self::Aud => "AUD",
        }
    }
}

impl std::fmt::Display for Currency {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.code())
    }
}

/// An amount in a single currency.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CurrencyAmount {
    pub currency: Currency,
    pub amount: f64,
}

impl CurrencyAmount {
    pub fn new(currency: Currency, amount: f64) -> Self {
        Self { currency, amount }
    }

    pub fn scaled_by(&self, factor: f64) -> Self {
        Self::new(self.currency, self.amount * factor)
    }

    pub fn negated(&self) -> Self {
        self.scaled_by(-1.0)
    }
}

/// Amounts keyed by currency; composite instruments accumulate one entry per
/// leg currency and convert at the end through an FX matrix.
///
/// Backed by an ordered map so iteration and summation order are deterministic.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct MultiCurrencyAmount {
    amounts: BTreeMap<Currency, f64>,
}

impl MultiCurrencyAmount {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn of(currency: Currency, amount: f64) -> Self {
        let mut amounts = BTreeMap::new();
        amounts.insert(currency, amount);
        Self { amounts }
    }

    /// Amount in `currency`, zero when absent.
    pub fn amount(&self, currency: Currency) -> f64 {
        self.amounts.get(&currency).copied().unwrap_or(0.0)
    }

    pub fn add_amount(&mut self, currency: Currency, amount: f64) {
        *self.amounts.entry(currency).or_insert(0.0) += amount;
    }

    pub fn plus(&self, other: &Self) -> Self {
        let mut out = self.clone();
        for (ccy, amount) in &other.amounts {
            out.add_amount(*ccy, *amount);
        }
        out
    }

    pub fn scaled_by(&self, factor: f64) -> Self {
        Self {
            amounts: self
                .amounts
                .iter()
                .map(|(ccy, amount)| (*ccy, amount * factor))
                .collect(),
        }
    }

    pub fn negated(&self) -> Self {
        self.scaled_by(-1.0)
    }

    pub fn iter(&self) -> impl Iterator<Item = (Currency, f64)> + '_ {
        self.amounts.iter().map(|(ccy, amount)| (*ccy, *amount))
    }

    pub fn currencies(&self) -> impl Iterator<Item = Currency> + '_ {
        self.amounts.keys().copied()
    }
}

/// Errors surfaced by pricing and sensitivity routines.
#[derive(Debug, Clone, PartialEq)]
pub enum PricingError {
    /// No curve registered for the requested currency or index. Never
    /// defaulted to a flat or zero curve.
    MissingCurve(String),
    /// FX rate pair absent from the matrix.
    MissingFxRate(String),
    /// The instrument variant has no pricing routine under the active model.
    UnsupportedInstrument(String),
    /// Input validation failure.
    InvalidInput(String),
    /// Iterative algorithm failed to converge within its budget.
    NonConvergence(String),
}

impl std::fmt::Display for PricingError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingCurve(msg) => write!(f, "missing curve: {msg}"),
            Self::MissingFxRate(msg) => write!(f, "missing fx rate: {msg}"),
            Self::UnsupportedInstrument(msg) => write!(f, "unsupported instrument: {msg}"),
            Self::InvalidInput(msg) => write!(f, "invalid input: {msg}"),
            Self::NonConvergence(msg) => write!(f, "non-convergence: {msg}"),
        }
    }
}

impl std::error::Error for PricingError {}
