//! SABR-model pricing dispatch: caps/floors on the Hagan smile (optionally
//! with right-tail extrapolation), CMS products by static replication,
//! in-arrears coupons by an additional replication layer, and CMS spread
//! options by correlated-lognormal Monte Carlo on convexity-adjusted rates.

use rand_distr::{Distribution, StandardNormal};

use crate::core::{CurrencyAmount, MultiCurrencyAmount, PricingError};
use crate::curves::MulticurveProvider;
use crate::instruments::{CapFloorCmsSpread, CapFloorIbor, CouponIbor, Instrument};
use crate::math::integration::integrate_adaptive;
use crate::models::black;
use crate::models::sabr::{SabrParameters, SabrSurface};
use crate::models::sabr_extrapolation::{SabrExtrapolationParameters, SabrExtrapolationRight};
use crate::pricing::{cms_replication, discounting, mc};
use crate::sensitivity::MultiCurrencyCurveSensitivity;

/// Default path count for the CMS-spread Monte Carlo used by the generic
/// dispatch; call [`cms_spread_present_value`] directly to control it.
pub const DEFAULT_SPREAD_PATHS: usize = 20_000;
/// Default seed for the CMS-spread Monte Carlo.
pub const DEFAULT_SPREAD_SEED: u64 = 42;

/// Curves plus SABR swaption parameters, with optional tail extrapolation.
#[derive(Debug, Clone)]
pub struct SabrBundle<'a> {
    pub curves: &'a MulticurveProvider,
    pub sabr: &'a SabrSurface,
    /// When set, smile prices beyond the cut-off strike use the controlled
    /// right-tail extrapolation.
    pub extrapolation: Option<SabrExtrapolationParameters>,
    /// Correlation between the two rates of a CMS spread option.
    pub cms_spread_correlation: f64,
}

impl<'a> SabrBundle<'a> {
    pub fn new(curves: &'a MulticurveProvider, sabr: &'a SabrSurface) -> Self {
        Self {
            curves,
            sabr,
            extrapolation: None,
            cms_spread_correlation: 0.8,
        }
    }

    pub fn with_extrapolation(mut self, extrapolation: SabrExtrapolationParameters) -> Self {
        self.extrapolation = Some(extrapolation);
        self
    }

    pub fn with_cms_spread_correlation(mut self, correlation: f64) -> Self {
        assert!(correlation.abs() <= 1.0, "correlation must be in [-1, 1]");
        self.cms_spread_correlation = correlation;
        self
    }
}

/// Undiscounted (numeraire 1) smile option pricer at one (forward, expiry,
/// tenor) coordinate: plain Hagan/Black below the cut-off, extrapolated tail
/// beyond it when configured.
#[derive(Debug, Clone)]
pub(crate) struct SmilePricer {
    forward: f64,
    expiry: f64,
    params: SabrParameters,
    extrapolated: Option<SabrExtrapolationRight>,
}

impl SmilePricer {
    pub(crate) fn new(bundle: &SabrBundle, forward: f64, expiry: f64, tenor: f64) -> Self {
        let params = bundle.sabr.parameters(expiry, tenor);
        Self::with_params(params, bundle.extrapolation, forward, expiry)
    }

    pub(crate) fn with_params(
        params: SabrParameters,
        extrapolation: Option<SabrExtrapolationParameters>,
        forward: f64,
        expiry: f64,
    ) -> Self {
        let extrapolated =
            extrapolation.map(|e| SabrExtrapolationRight::new(forward, expiry, params, e));
        Self {
            forward,
            expiry,
            params,
            extrapolated,
        }
    }

    pub(crate) fn forward(&self) -> f64 {
        self.forward
    }

    /// Option price with numeraire 1.
    pub(crate) fn price_unit(&self, strike: f64, is_call: bool) -> f64 {
        match &self.extrapolated {
            Some(ext) => ext.price(strike, is_call),
            None => {
                let vol = self.params.volatility(self.forward, strike, self.expiry);
                black::price(self.forward, strike, 1.0, self.expiry, vol, is_call)
            }
        }
    }
}

/// Present value under the SABR bundle.
///
/// Linear variants fall through to plain discounting; optional variants are
/// routed to their smile routine.
pub fn present_value(
    instrument: &Instrument,
    bundle: &SabrBundle,
) -> Result<MultiCurrencyAmount, PricingError> {
    match instrument {
        Instrument::CapFloorIbor(cap) => {
            let pv = cap_floor_ibor_present_value(cap, bundle)?;
            Ok(MultiCurrencyAmount::of(pv.currency, pv.amount))
        }
        Instrument::CapFloorIborInArrears(cap) => {
            let pv = cap_floor_ibor_in_arrears_present_value(cap, bundle)?;
            Ok(MultiCurrencyAmount::of(pv.currency, pv.amount))
        }
        Instrument::CouponIborInArrears(coupon) => {
            let pv = coupon_ibor_in_arrears_present_value(coupon, bundle)?;
            Ok(MultiCurrencyAmount::of(pv.currency, pv.amount))
        }
        Instrument::CouponCms(coupon) => {
            let pv = cms_replication::coupon_present_value(coupon, bundle)?;
            Ok(MultiCurrencyAmount::of(pv.currency, pv.amount))
        }
        Instrument::CapFloorCms(cap) => {
            let pv = cms_replication::cap_floor_present_value(cap, bundle)?;
            Ok(MultiCurrencyAmount::of(pv.currency, pv.amount))
        }
        Instrument::CapFloorCmsSpread(spread) => {
            let result = cms_spread_present_value(
                spread,
                bundle,
                DEFAULT_SPREAD_PATHS,
                DEFAULT_SPREAD_SEED,
            )?;
            Ok(MultiCurrencyAmount::of(result.value.currency, result.value.amount))
        }
        Instrument::Leg(leg) => {
            let mut total = MultiCurrencyAmount::new();
            for coupon in &leg.coupons {
                total = total.plus(&present_value(coupon, bundle)?);
            }
            Ok(total)
        }
        Instrument::Swap(swap) => {
            let mut total = MultiCurrencyAmount::new();
            for leg in [&swap.first_leg, &swap.second_leg] {
                for coupon in &leg.coupons {
                    total = total.plus(&present_value(coupon, bundle)?);
                }
            }
            Ok(total)
        }
        Instrument::SwapMultileg(swap) => {
            let mut total = MultiCurrencyAmount::new();
            for leg in &swap.legs {
                for coupon in &leg.coupons {
                    total = total.plus(&present_value(coupon, bundle)?);
                }
            }
            Ok(total)
        }
        linear => discounting::present_value(linear, bundle.curves),
    }
}

/// Curve sensitivity under the SABR bundle; linear variants use the
/// discounting adjoints, CMS products the replication delta.
pub fn curve_sensitivity(
    instrument: &Instrument,
    bundle: &SabrBundle,
) -> Result<MultiCurrencyCurveSensitivity, PricingError> {
    match instrument {
        Instrument::CapFloorIbor(cap) => cap_floor_ibor_curve_sensitivity(cap, bundle),
        Instrument::CouponCms(coupon) => cms_replication::coupon_curve_sensitivity(coupon, bundle),
        Instrument::CapFloorCms(cap) => cms_replication::cap_floor_curve_sensitivity(cap, bundle),
        Instrument::Leg(leg) => {
            let mut total = MultiCurrencyCurveSensitivity::new();
            for coupon in &leg.coupons {
                total = total.plus(&curve_sensitivity(coupon, bundle)?);
            }
            Ok(total)
        }
        Instrument::Swap(swap) => {
            let mut total = MultiCurrencyCurveSensitivity::new();
            for leg in [&swap.first_leg, &swap.second_leg] {
                for coupon in &leg.coupons {
                    total = total.plus(&curve_sensitivity(coupon, bundle)?);
                }
            }
            Ok(total)
        }
        linear => discounting::curve_sensitivity(linear, bundle.curves),
    }
}

/// Black caplet/floorlet on the SABR smile volatility at the option's
/// (expiry, underlying tenor) coordinate.
pub fn cap_floor_ibor_present_value(
    cap: &CapFloorIbor,
    bundle: &SabrBundle,
) -> Result<CurrencyAmount, PricingError> {
    let forward = bundle.curves.forward_rate(
        cap.fixing.index,
        cap.fixing.period_start,
        cap.fixing.period_end,
        cap.fixing.period_accrual,
    )?;
    let df = bundle.curves.discount_factor(cap.currency, cap.payment_time)?;
    let pricer = SmilePricer::new(bundle, forward, cap.fixing_time, cap.fixing.tenor());
    let unit = pricer.price_unit(cap.strike, cap.is_cap);
    Ok(CurrencyAmount::new(
        cap.currency,
        cap.notional * cap.accrual * df * unit,
    ))
}

fn cap_floor_ibor_curve_sensitivity(
    cap: &CapFloorIbor,
    bundle: &SabrBundle,
) -> Result<MultiCurrencyCurveSensitivity, PricingError> {
    use crate::sensitivity::CurveSensitivity;

    let forward = bundle.curves.forward_rate(
        cap.fixing.index,
        cap.fixing.period_start,
        cap.fixing.period_end,
        cap.fixing.period_accrual,
    )?;
    let df = bundle.curves.discount_factor(cap.currency, cap.payment_time)?;
    let pricer = SmilePricer::new(bundle, forward, cap.fixing_time, cap.fixing.tenor());
    let unit = pricer.price_unit(cap.strike, cap.is_cap);
    let scale = cap.notional * cap.accrual;
    let pv = scale * df * unit;

    // dPV/dF by symmetric difference on the smile price (the tail refit is
    // part of the derivative).
    let eps = (forward.abs() * 1.0e-5).max(1.0e-8);
    let up = SmilePricer::new(bundle, forward + eps, cap.fixing_time, cap.fixing.tenor());
    let dn = SmilePricer::new(bundle, forward - eps, cap.fixing_time, cap.fixing.tenor());
    let d_forward = (up.price_unit(cap.strike, cap.is_cap) - dn.price_unit(cap.strike, cap.is_cap))
        / (2.0 * eps);

    let mut cs = CurveSensitivity::new();
    cs.add_point(
        bundle.curves.name(cap.currency)?,
        cap.payment_time,
        -cap.payment_time * pv,
    );

    let fwd_curve = bundle.curves.forward_curve(cap.fixing.index)?;
    let ratio = fwd_curve.discount_factor(cap.fixing.period_start)
        / fwd_curve.discount_factor(cap.fixing.period_end);
    let factor = scale * df * d_forward * ratio / cap.fixing.period_accrual;
    let fwd_name = bundle.curves.forward_name(cap.fixing.index)?;
    cs.add_point(fwd_name, cap.fixing.period_start, -cap.fixing.period_start * factor);
    cs.add_point(fwd_name, cap.fixing.period_end, cap.fixing.period_end * factor);

    Ok(MultiCurrencyCurveSensitivity::of(cap.currency, cs))
}

const IN_ARREARS_INTEGRATION_RANGE: f64 = 1.0;
const IN_ARREARS_MAX_REFINEMENTS: usize = 10_000;

/// In-arrears caplet/floorlet by replication on standard optionlets:
///
/// `cap_arrears(K)  = (1 + df*K) * C(K) + 2 df * int_K^inf C(x) dx`
/// `floor_arrears(K) = (1 + df*K) * P(K) - 2 df * int_0^K P(x) dx`
///
/// where `C`/`P` are standard optionlets paying at the end of the fixing
/// period. The timing mismatch (fixing at payment) is exactly the measure
/// change captured by the `(1 + df*L)` weight.
pub fn cap_floor_ibor_in_arrears_present_value(
    cap: &CapFloorIbor,
    bundle: &SabrBundle,
) -> Result<CurrencyAmount, PricingError> {
    let forward = bundle.curves.forward_rate(
        cap.fixing.index,
        cap.fixing.period_start,
        cap.fixing.period_end,
        cap.fixing.period_accrual,
    )?;
    let df_end = bundle
        .curves
        .discount_factor(cap.currency, cap.fixing.period_end)?;
    let pricer = SmilePricer::new(bundle, forward, cap.fixing_time, cap.fixing.tenor());
    let delta_f = cap.fixing.period_accrual;
    let strike = cap.strike;

    let optionlet = |x: f64| df_end * pricer.price_unit(x, cap.is_cap);

    let abs_tol = 1.0e-10;
    let rel_tol = 1.0e-8;
    let unit = if cap.is_cap {
        let tail = integrate_adaptive(
            optionlet,
            strike,
            strike + IN_ARREARS_INTEGRATION_RANGE,
            abs_tol,
            rel_tol,
            IN_ARREARS_MAX_REFINEMENTS,
        );
        (1.0 + delta_f * strike) * optionlet(strike) + 2.0 * delta_f * tail.value
    } else {
        let body = integrate_adaptive(optionlet, 0.0, strike, abs_tol, rel_tol, IN_ARREARS_MAX_REFINEMENTS);
        (1.0 + delta_f * strike) * optionlet(strike) - 2.0 * delta_f * body.value
    };

    Ok(CurrencyAmount::new(
        cap.currency,
        cap.notional * cap.accrual * unit,
    ))
}

/// In-arrears Ibor coupon: the rate part replicates as an in-arrears cap at
/// strike zero (rates are non-negative under the SABR smile); gearing scales
/// the rate part, the spread discounts as a plain fixed flow.
pub fn coupon_ibor_in_arrears_present_value(
    coupon: &CouponIbor,
    bundle: &SabrBundle,
) -> Result<CurrencyAmount, PricingError> {
    let forward = bundle.curves.forward_rate(
        coupon.fixing.index,
        coupon.fixing.period_start,
        coupon.fixing.period_end,
        coupon.fixing.period_accrual,
    )?;
    let df_end = bundle
        .curves
        .discount_factor(coupon.currency, coupon.fixing.period_end)?;
    let pricer = SmilePricer::new(bundle, forward, coupon.fixing_time, coupon.fixing.tenor());
    let delta_f = coupon.fixing.period_accrual;

    let optionlet = |x: f64| df_end * pricer.price_unit(x, true);
    let tail = integrate_adaptive(
        &optionlet,
        0.0,
        IN_ARREARS_INTEGRATION_RANGE,
        1.0e-10,
        1.0e-8,
        IN_ARREARS_MAX_REFINEMENTS,
    );
    let rate_unit = optionlet(0.0) + 2.0 * delta_f * tail.value;

    let df_pay = bundle
        .curves
        .discount_factor(coupon.currency, coupon.payment_time)?;
    let pv = coupon.notional
        * coupon.accrual
        * (coupon.gearing * rate_unit + coupon.spread * df_pay);
    Ok(CurrencyAmount::new(coupon.currency, pv))
}

/// Sensitivity of a smile caplet/floorlet to the SABR alpha/rho/nu
/// parameters at its (expiry, tenor) coordinate, by symmetric differences on
/// the smile price (tail refit included when extrapolation is configured).
pub fn cap_floor_ibor_sabr_sensitivity(
    cap: &CapFloorIbor,
    bundle: &SabrBundle,
) -> Result<crate::sensitivity::SabrSensitivity, PricingError> {
    use crate::sensitivity::{SabrSensitivity, SmilePoint};

    let forward = bundle.curves.forward_rate(
        cap.fixing.index,
        cap.fixing.period_start,
        cap.fixing.period_end,
        cap.fixing.period_accrual,
    )?;
    let df = bundle.curves.discount_factor(cap.currency, cap.payment_time)?;
    let expiry = cap.fixing_time;
    let tenor = cap.fixing.tenor();
    let base = bundle.sabr.parameters(expiry, tenor);
    let scale = cap.notional * cap.accrual * df;

    let value_with = |params: SabrParameters| {
        SmilePricer::with_params(params, bundle.extrapolation, forward, expiry)
            .price_unit(cap.strike, cap.is_cap)
            * scale
    };
    let central = |bump: fn(SabrParameters, f64) -> SabrParameters, eps: f64| {
        (value_with(bump(base, eps)) - value_with(bump(base, -eps))) / (2.0 * eps)
    };

    let eps_alpha = (base.alpha.abs() * 1.0e-5).max(1.0e-7);
    let eps_rho = 1.0e-5;
    let eps_nu = (base.nu.abs() * 1.0e-5).max(1.0e-7);

    let point = SmilePoint {
        expiry,
        maturity: tenor,
    };
    let mut out = SabrSensitivity::new();
    out.add_alpha(
        point,
        central(
            |mut p, e| {
                p.alpha += e;
                p
            },
            eps_alpha,
        ),
    );
    out.add_rho(
        point,
        central(
            |mut p, e| {
                p.rho += e;
                p
            },
            eps_rho,
        ),
    );
    out.add_nu(
        point,
        central(
            |mut p, e| {
                p.nu += e;
                p
            },
            eps_nu,
        ),
    );
    Ok(out)
}

/// Monte-Carlo estimate with its statistical error.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MonteCarloResult {
    pub value: CurrencyAmount,
    pub standard_error: f64,
    pub paths: usize,
}

/// CMS spread cap/floor by correlated-lognormal Monte Carlo.
///
/// Each CMS rate is centered on its replication-adjusted expected rate (the
/// convexity adjustment comes from the CMS coupon replication itself), with
/// ATM smile volatilities and the bundle's spread correlation.
pub fn cms_spread_present_value(
    spread: &CapFloorCmsSpread,
    bundle: &SabrBundle,
    paths: usize,
    seed: u64,
) -> Result<MonteCarloResult, PricingError> {
    if paths == 0 {
        return Err(PricingError::InvalidInput("paths must be > 0".to_string()));
    }
    let rho = bundle.cms_spread_correlation;
    if rho.abs() > 1.0 {
        return Err(PricingError::InvalidInput(
            "spread correlation must be in [-1, 1]".to_string(),
        ));
    }
    let expiry = spread.fixing_time;
    if expiry <= 0.0 {
        return Err(PricingError::InvalidInput(
            "spread option must have positive expiry".to_string(),
        ));
    }

    let df = bundle
        .curves
        .discount_factor(spread.currency, spread.payment_time)?;

    // Convexity-adjusted expected rates from the replication engine, probed
    // at the book's own notional so the integration error budget scales.
    let probe_notional = spread.notional.abs().max(1.0);
    let adjusted_rate = |underlying: &crate::instruments::SwapFixedIbor| -> Result<f64, PricingError> {
        let coupon = crate::instruments::CouponCms::new(
            spread.currency,
            spread.payment_time,
            spread.accrual,
            probe_notional,
            spread.fixing_time,
            spread.settlement_time,
            underlying.clone(),
        );
        let pv = cms_replication::coupon_present_value(&coupon, bundle)?;
        Ok(pv.amount / (probe_notional * spread.accrual * df))
    };

    let adj1 = adjusted_rate(&spread.first)?;
    let adj2 = adjusted_rate(&spread.second)?;

    let maturity1 = spread.first.last_fixed_payment_time() - spread.settlement_time;
    let maturity2 = spread.second.last_fixed_payment_time() - spread.settlement_time;
    let s1 = discounting::par_rate(&spread.first, bundle.curves)?;
    let s2 = discounting::par_rate(&spread.second, bundle.curves)?;
    let vol1 = bundle.sabr.parameters(expiry, maturity1).volatility(s1, s1, expiry);
    let vol2 = bundle.sabr.parameters(expiry, maturity2).volatility(s2, s2, expiry);
    if vol1 <= 0.0 || vol2 <= 0.0 {
        return Err(PricingError::InvalidInput(
            "ATM smile volatilities must be positive".to_string(),
        ));
    }

    let rho_complement = (1.0 - rho * rho).sqrt();
    let sqrt_t = expiry.sqrt();

    let (mean, standard_error) = mc::sample_mean(paths, seed, |rng| {
        let z1: f64 = StandardNormal.sample(rng);
        let z2: f64 = StandardNormal.sample(rng);
        let w2 = rho * z1 + rho_complement * z2;

        let r1 = adj1 * (-0.5 * vol1 * vol1 * expiry + vol1 * sqrt_t * z1).exp();
        let r2 = adj2 * (-0.5 * vol2 * vol2 * expiry + vol2 * sqrt_t * w2).exp();

        let intrinsic = if spread.is_cap {
            (r1 - r2 - spread.strike).max(0.0)
        } else {
            (spread.strike - (r1 - r2)).max(0.0)
        };
        spread.notional * spread.accrual * df * intrinsic
    });

    Ok(MonteCarloResult {
        value: CurrencyAmount::new(spread.currency, mean),
        standard_error,
        paths,
    })
}
