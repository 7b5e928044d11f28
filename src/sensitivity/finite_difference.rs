//! Finite-difference cross-check for curve sensitivities.
//!
//! Bumps one curve node at a time through the provider's structural
//! copy-with-replacement, reprices, and divides by the shift. Validation
//! only: the analytic path is the production one, this engine exists so
//! tests can compare the two.

use crate::core::{Currency, PricingError};
use crate::curves::MulticurveProvider;
use crate::sensitivity::parameter::ParameterSensitivity;

/// Symmetric-difference parameter sensitivity of `pricer` (a PV in
/// `settlement` currency) with respect to every node of every curve.
pub fn parameter_sensitivity<F>(
    pricer: F,
    provider: &MulticurveProvider,
    settlement: Currency,
    shift: f64,
) -> Result<ParameterSensitivity, PricingError>
where
    F: Fn(&MulticurveProvider) -> Result<f64, PricingError>,
{
    if shift <= 0.0 {
        return Err(PricingError::InvalidInput(
            "finite-difference shift must be positive".to_string(),
        ));
    }

    let mut out = ParameterSensitivity::new();
    for name in provider.curve_names() {
        let curve = provider
            .curve_by_name(&name)
            .ok_or_else(|| PricingError::MissingCurve(name.clone()))?
            .clone();
        let mut values = vec![0.0; curve.node_count()];
        for (i, slot) in values.iter_mut().enumerate() {
            let up = provider.with_replaced_curve(&name, curve.bumped_node(i, shift))?;
            let dn = provider.with_replaced_curve(&name, curve.bumped_node(i, -shift))?;
            *slot = (pricer(&up)? - pricer(&dn)?) / (2.0 * shift);
        }
        out.insert(name, settlement, values);
    }
    Ok(out)
}
