//! Curve-parameter sensitivity subsystem: point sensitivities from the
//! analytic pricing adjoints, node bucketing, market-quote transforms, and
//! the finite-difference validation engine.

pub mod curve;
pub mod finite_difference;
pub mod market_quote;
pub mod parameter;
pub mod sabr;

pub use curve::{CurveSensitivity, MultiCurrencyCurveSensitivity};
pub use market_quote::market_quote_sensitivity;
pub use parameter::ParameterSensitivity;
pub use sabr::{SabrSensitivity, SmilePoint};
