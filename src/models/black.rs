//! Black (1976) formula with first- and second-order derivatives.
//!
//! All prices are quoted with an explicit numeraire factor; the replication
//! engine calls these with numeraire 1 and applies discounting outside.

use crate::math::{normal_cdf, normal_pdf};

/// Black price and the derivatives consumed by the smile-extrapolation fit
/// and the sensitivity engine.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BlackDerivatives {
    pub price: f64,
    pub d_forward: f64,
    pub d_strike: f64,
    pub d_vol: f64,
    pub d_strike2: f64,
    pub d_strike_vol: f64,
    pub d_vol2: f64,
}

/// Black option price.
///
/// Degenerate inputs (non-positive vol or expiry, non-positive strike) price
/// at intrinsic value, mirroring the zero-vol limit.
pub fn price(forward: f64, strike: f64, numeraire: f64, expiry: f64, vol: f64, is_call: bool) -> f64 {
    if strike <= 0.0 {
        // The option is certain to finish in (calls) or out (puts).
        return if is_call {
            numeraire * (forward - strike)
        } else {
            0.0
        };
    }
    if vol <= 0.0 || expiry <= 0.0 {
        let intrinsic = if is_call {
            (forward - strike).max(0.0)
        } else {
            (strike - forward).max(0.0)
        };
        return numeraire * intrinsic;
    }

    let sig_sqrt_t = vol * expiry.sqrt();
    let d1 = ((forward / strike).ln() + 0.5 * vol * vol * expiry) / sig_sqrt_t;
    let d2 = d1 - sig_sqrt_t;

    if is_call {
        numeraire * (forward * normal_cdf(d1) - strike * normal_cdf(d2))
    } else {
        numeraire * (strike * normal_cdf(-d2) - forward * normal_cdf(-d1))
    }
}

/// Black price with analytic first/second-order derivatives in forward,
/// strike and volatility.
pub fn derivatives(
    forward: f64,
    strike: f64,
    numeraire: f64,
    expiry: f64,
    vol: f64,
    is_call: bool,
) -> BlackDerivatives {
    if strike <= 0.0 || vol <= 0.0 || expiry <= 0.0 {
        let value = price(forward, strike, numeraire, expiry, vol, is_call);
        let in_the_money = if is_call { forward > strike } else { strike > forward };
        let indicator = if in_the_money { 1.0 } else { 0.0 };
        return BlackDerivatives {
            price: value,
            d_forward: if is_call { numeraire * indicator } else { -numeraire * indicator },
            d_strike: if is_call { -numeraire * indicator } else { numeraire * indicator },
            d_vol: 0.0,
            d_strike2: 0.0,
            d_strike_vol: 0.0,
            d_vol2: 0.0,
        };
    }

    let sqrt_t = expiry.sqrt();
    let sig_sqrt_t = vol * sqrt_t;
    let d1 = ((forward / strike).ln() + 0.5 * vol * vol * expiry) / sig_sqrt_t;
    let d2 = d1 - sig_sqrt_t;

    let (value, d_forward, d_strike) = if is_call {
        (
            numeraire * (forward * normal_cdf(d1) - strike * normal_cdf(d2)),
            numeraire * normal_cdf(d1),
            -numeraire * normal_cdf(d2),
        )
    } else {
        (
            numeraire * (strike * normal_cdf(-d2) - forward * normal_cdf(-d1)),
            -numeraire * normal_cdf(-d1),
            numeraire * normal_cdf(-d2),
        )
    };

    // Vega and the second-order block are call/put symmetric.
    let d_vol = numeraire * forward * normal_pdf(d1) * sqrt_t;
    let d_strike2 = numeraire * normal_pdf(d2) / (strike * sig_sqrt_t);
    let d_strike_vol = numeraire * normal_pdf(d2) * d1 / vol;
    let d_vol2 = d_vol * d1 * d2 / vol;

    BlackDerivatives {
        price: value,
        d_forward,
        d_strike,
        d_vol,
        d_strike2,
        d_strike_vol,
        d_vol2,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn call_put_parity_holds() {
        let (f, k, n, t, vol) = (0.04, 0.035, 0.97, 2.0, 0.25);
        let call = price(f, k, n, t, vol, true);
        let put = price(f, k, n, t, vol, false);
        assert_relative_eq!(call - put, n * (f - k), epsilon = 1e-14);
    }

    #[test]
    fn zero_vol_prices_at_intrinsic() {
        assert_relative_eq!(price(0.05, 0.03, 1.0, 1.0, 0.0, true), 0.02, epsilon = 1e-16);
        assert_relative_eq!(price(0.05, 0.03, 1.0, 1.0, 0.0, false), 0.0, epsilon = 1e-16);
    }

    #[test]
    fn strike_zero_call_is_forward() {
        assert_relative_eq!(price(0.05, 0.0, 0.9, 1.0, 0.2, true), 0.045, epsilon = 1e-16);
    }

    #[test]
    fn derivatives_match_finite_differences() {
        let (f, k, n, t, vol) = (0.04, 0.05, 1.0, 5.0, 0.3);
        let d = derivatives(f, k, n, t, vol, true);
        let eps = 1e-6;

        let fd_forward =
            (price(f + eps, k, n, t, vol, true) - price(f - eps, k, n, t, vol, true)) / (2.0 * eps);
        let fd_strike =
            (price(f, k + eps, n, t, vol, true) - price(f, k - eps, n, t, vol, true)) / (2.0 * eps);
        let fd_vol =
            (price(f, k, n, t, vol + eps, true) - price(f, k, n, t, vol - eps, true)) / (2.0 * eps);
        let fd_strike2 = (price(f, k + eps, n, t, vol, true) - 2.0 * price(f, k, n, t, vol, true)
            + price(f, k - eps, n, t, vol, true))
            / (eps * eps);

        assert_relative_eq!(d.price, price(f, k, n, t, vol, true), epsilon = 1e-15);
        assert_relative_eq!(d.d_forward, fd_forward, epsilon = 1e-6);
        assert_relative_eq!(d.d_strike, fd_strike, epsilon = 1e-6);
        assert_relative_eq!(d.d_vol, fd_vol, epsilon = 1e-6);
        assert_relative_eq!(d.d_strike2, fd_strike2, epsilon = 1e-4);
    }

    #[test]
    fn put_derivatives_match_finite_differences() {
        let (f, k, n, t, vol) = (0.04, 0.03, 0.95, 2.0, 0.22);
        let d = derivatives(f, k, n, t, vol, false);
        let eps = 1e-6;

        let fd_forward = (price(f + eps, k, n, t, vol, false) - price(f - eps, k, n, t, vol, false))
            / (2.0 * eps);
        let fd_strike = (price(f, k + eps, n, t, vol, false) - price(f, k - eps, n, t, vol, false))
            / (2.0 * eps);

        assert_relative_eq!(d.d_forward, fd_forward, epsilon = 1e-6);
        assert_relative_eq!(d.d_strike, fd_strike, epsilon = 1e-6);
    }
}
