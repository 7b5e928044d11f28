//! Shared numerical kernels: Gaussian density/distribution and adaptive
//! quadrature for the replication integrals.

pub mod integration;

pub use integration::{integrate_adaptive, Quadrature};

/// Standard normal density.
pub fn normal_pdf(x: f64) -> f64 {
    const INV_SQRT_2PI: f64 = 0.398_942_280_401_432_7;
    INV_SQRT_2PI * (-0.5 * x * x).exp()
}

/// Standard normal cumulative distribution, Abramowitz & Stegun 7.1.26.
///
/// Absolute error below 7.5e-8, symmetric by construction so
/// `normal_cdf(-x) == 1 - normal_cdf(x)` exactly.
pub fn normal_cdf(x: f64) -> f64 {
    let z = x.abs();
    let t = 1.0 / (1.0 + 0.231_641_9 * z);
    let poly = t
        * (0.319_381_530
            + t * (-0.356_563_782
                + t * (1.781_477_937 + t * (-1.821_255_978 + t * 1.330_274_429))));
    let approx = 1.0 - normal_pdf(z) * poly;
    if x >= 0.0 { approx } else { 1.0 - approx }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn normal_pdf_and_cdf_sanity() {
        assert_relative_eq!(normal_pdf(0.0), 0.398_942_280_401_432_7, epsilon = 1e-12);
        assert_relative_eq!(normal_cdf(0.0), 0.5, epsilon = 1e-9);
        assert_relative_eq!(normal_cdf(1.0), 0.841_344_746, epsilon = 2e-5);
        assert_relative_eq!(normal_cdf(-1.0), 1.0 - normal_cdf(1.0), epsilon = 1e-14);
    }

    #[test]
    fn normal_cdf_tails_are_bounded() {
        assert!(normal_cdf(-10.0) >= 0.0);
        assert!(normal_cdf(10.0) <= 1.0);
        assert!(normal_cdf(8.0) > 0.999_999);
    }
}
