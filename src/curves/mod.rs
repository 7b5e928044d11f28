//! Curve primitives: zero-rate curves, the FX matrix, and the multi-curve
//! provider consumed by every pricing routine.

pub mod curve;
pub mod fx;
pub mod provider;

pub use curve::ZeroRateCurve;
pub use fx::FxMatrix;
pub use provider::{MulticurveProvider, RateIndex};
