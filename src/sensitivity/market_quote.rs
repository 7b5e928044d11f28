//! Market-quote sensitivity: node buckets mapped back onto the calibration
//! instruments through the externally supplied transition Jacobians.

use std::collections::HashMap;

use nalgebra::{DMatrix, DVector};

use crate::core::PricingError;
use crate::sensitivity::parameter::ParameterSensitivity;

/// Converts node-parameter sensitivities into sensitivities versus the
/// market quotes the curves were built from.
///
/// `jacobians[name][(i, j)]` is the derivative of node `i` of curve `name`
/// with respect to market quote `j`; these matrices come from the (external)
/// calibration engine. The quote sensitivity is the chain rule
/// `dPV/dq_j = sum_i dPV/dnode_i * dnode_i/dq_j`, i.e. `J^T * p` per curve.
pub fn market_quote_sensitivity(
    parameter: &ParameterSensitivity,
    jacobians: &HashMap<String, DMatrix<f64>>,
) -> Result<ParameterSensitivity, PricingError> {
    let mut out = ParameterSensitivity::new();
    for (name, currency, values) in parameter.iter() {
        let jacobian = jacobians.get(name).ok_or_else(|| {
            PricingError::InvalidInput(format!("no calibration jacobian for curve {name}"))
        })?;
        if jacobian.nrows() != values.len() {
            return Err(PricingError::InvalidInput(format!(
                "jacobian for {name} has {} rows, curve has {} nodes",
                jacobian.nrows(),
                values.len()
            )));
        }
        let node_vector = DVector::from_column_slice(values);
        let quote_vector = jacobian.transpose() * node_vector;
        out.insert(name, currency, quote_vector.iter().copied().collect());
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Currency;
    use approx::assert_relative_eq;

    #[test]
    fn identity_jacobian_is_a_no_op() {
        let param = ParameterSensitivity::of("DSC", Currency::Usd, vec![3.0, -1.0]);
        let mut jacobians = HashMap::new();
        jacobians.insert("DSC".to_string(), DMatrix::identity(2, 2));

        let quotes = market_quote_sensitivity(&param, &jacobians).unwrap();
        assert_eq!(quotes.get("DSC", Currency::Usd).unwrap(), &[3.0, -1.0]);
    }

    #[test]
    fn jacobian_mixes_nodes_into_quotes() {
        let param = ParameterSensitivity::of("DSC", Currency::Usd, vec![1.0, 2.0]);
        let mut jacobians = HashMap::new();
        // node_0 = q0, node_1 = 0.5 q0 + q1
        jacobians.insert(
            "DSC".to_string(),
            DMatrix::from_row_slice(2, 2, &[1.0, 0.0, 0.5, 1.0]),
        );

        let quotes = market_quote_sensitivity(&param, &jacobians).unwrap();
        let values = quotes.get("DSC", Currency::Usd).unwrap();
        assert_relative_eq!(values[0], 2.0, epsilon = 1e-14);
        assert_relative_eq!(values[1], 2.0, epsilon = 1e-14);
    }

    #[test]
    fn missing_jacobian_is_an_error() {
        let param = ParameterSensitivity::of("DSC", Currency::Usd, vec![1.0]);
        let jacobians = HashMap::new();
        assert!(market_quote_sensitivity(&param, &jacobians).is_err());
    }
}
