//! Plain multi-curve discounting: present value, par rate/spread, and the
//! analytic curve sensitivities for every linear instrument variant.
//!
//! The coupon rule is `pv = notional * accrual * rate * P_d(t_pay)` with the
//! rate read from the relevant forward curve; composites sum their children
//! per payment currency and convert at the edges through the FX matrix.
//! Par quantities are closed-form ratios (`pv(float) / pvbp(fixed)`), never
//! root-finding.

use crate::core::{Currency, CurrencyAmount, MultiCurrencyAmount, PricingError};
use crate::curves::MulticurveProvider;
use crate::instruments::{
    CouponCms, CouponFixed, CouponIbor, CouponOis, FixedPayment, Instrument, Leg, SwapFixedIbor,
};
use crate::sensitivity::{CurveSensitivity, MultiCurrencyCurveSensitivity};

/// Present value of any linear instrument, one amount per payment currency.
///
/// Optional variants (caps/floors) have no discounting routine and surface
/// `UnsupportedInstrument`; CMS coupons price *without* convexity adjustment,
/// which is the documented comparison floor for the replication methods.
pub fn present_value(
    instrument: &Instrument,
    provider: &MulticurveProvider,
) -> Result<MultiCurrencyAmount, PricingError> {
    match instrument {
        Instrument::FixedPayment(payment) => fixed_payment_pv(payment, provider),
        Instrument::CouponFixed(coupon) => coupon_fixed_pv(coupon, provider),
        Instrument::CouponIbor(coupon) | Instrument::CouponIborInArrears(coupon) => {
            coupon_ibor_pv(coupon, provider)
        }
        Instrument::CouponOis(coupon) => coupon_ois_pv(coupon, provider),
        Instrument::CouponCms(coupon) => coupon_cms_pv(coupon, provider),
        Instrument::Leg(leg) => leg_pv(leg, provider),
        Instrument::Swap(swap) => {
            Ok(leg_pv(&swap.first_leg, provider)?.plus(&leg_pv(&swap.second_leg, provider)?))
        }
        Instrument::SwapMultileg(swap) => {
            let mut total = MultiCurrencyAmount::new();
            for leg in &swap.legs {
                total = total.plus(&leg_pv(leg, provider)?);
            }
            Ok(total)
        }
        other => Err(PricingError::UnsupportedInstrument(format!(
            "{} under the discounting model",
            other.kind()
        ))),
    }
}

/// Present value collapsed into one settlement currency via the provider's
/// FX matrix.
pub fn present_value_in(
    instrument: &Instrument,
    provider: &MulticurveProvider,
    settlement: Currency,
) -> Result<CurrencyAmount, PricingError> {
    let pv = present_value(instrument, provider)?;
    provider.fx().convert_multi(&pv, settlement)
}

fn fixed_payment_pv(
    payment: &FixedPayment,
    provider: &MulticurveProvider,
) -> Result<MultiCurrencyAmount, PricingError> {
    let df = provider.discount_factor(payment.currency, payment.payment_time)?;
    Ok(MultiCurrencyAmount::of(payment.currency, payment.amount * df))
}

fn coupon_fixed_pv(
    coupon: &CouponFixed,
    provider: &MulticurveProvider,
) -> Result<MultiCurrencyAmount, PricingError> {
    let df = provider.discount_factor(coupon.currency, coupon.payment_time)?;
    Ok(MultiCurrencyAmount::of(coupon.currency, coupon.amount() * df))
}

fn coupon_ibor_pv(
    coupon: &CouponIbor,
    provider: &MulticurveProvider,
) -> Result<MultiCurrencyAmount, PricingError> {
    let forward = provider.forward_rate(
        coupon.fixing.index,
        coupon.fixing.period_start,
        coupon.fixing.period_end,
        coupon.fixing.period_accrual,
    )?;
    let rate = coupon.gearing * forward + coupon.spread;
    let df = provider.discount_factor(coupon.currency, coupon.payment_time)?;
    Ok(MultiCurrencyAmount::of(
        coupon.currency,
        coupon.notional * coupon.accrual * rate * df,
    ))
}

fn coupon_ois_pv(
    coupon: &CouponOis,
    provider: &MulticurveProvider,
) -> Result<MultiCurrencyAmount, PricingError> {
    let curve = provider.forward_curve(coupon.index)?;
    let ratio = curve.discount_factor(coupon.fixing_start) / curve.discount_factor(coupon.fixing_end);
    let df = provider.discount_factor(coupon.currency, coupon.payment_time)?;
    Ok(MultiCurrencyAmount::of(
        coupon.currency,
        (coupon.notional_accrued * ratio - coupon.notional) * df,
    ))
}

fn coupon_cms_pv(
    coupon: &CouponCms,
    provider: &MulticurveProvider,
) -> Result<MultiCurrencyAmount, PricingError> {
    // No convexity adjustment under pure discounting.
    let swap_rate = par_rate(&coupon.underlying, provider)?;
    let df = provider.discount_factor(coupon.currency, coupon.payment_time)?;
    Ok(MultiCurrencyAmount::of(
        coupon.currency,
        coupon.notional * coupon.accrual * swap_rate * df,
    ))
}

fn leg_pv(
    leg: &Leg,
    provider: &MulticurveProvider,
) -> Result<MultiCurrencyAmount, PricingError> {
    let mut total = MultiCurrencyAmount::new();
    for coupon in &leg.coupons {
        total = total.plus(&present_value(coupon, provider)?);
    }
    Ok(total)
}

/// Annuity of the fixed leg per unit of rate, on absolute notionals:
/// `sum |N_i| * accrual_i * P_d(t_i)`.
pub fn present_value_basis_point(
    swap: &SwapFixedIbor,
    provider: &MulticurveProvider,
) -> Result<f64, PricingError> {
    let mut annuity = 0.0;
    for coupon in &swap.fixed_leg {
        let df = provider.discount_factor(coupon.currency, coupon.payment_time)?;
        annuity += coupon.notional.abs() * coupon.accrual * df;
    }
    Ok(annuity)
}

/// Floating-leg present value on absolute notionals (forward rates only,
/// spreads excluded), the numerator of the par rate.
fn floating_pv_unsigned(
    swap: &SwapFixedIbor,
    provider: &MulticurveProvider,
) -> Result<f64, PricingError> {
    let mut pv = 0.0;
    for coupon in &swap.ibor_leg {
        let forward = provider.forward_rate(
            coupon.fixing.index,
            coupon.fixing.period_start,
            coupon.fixing.period_end,
            coupon.fixing.period_accrual,
        )?;
        let df = provider.discount_factor(coupon.currency, coupon.payment_time)?;
        pv += coupon.notional.abs() * coupon.accrual * coupon.gearing * forward * df;
    }
    Ok(pv)
}

/// Par rate of a fixed-vs-Ibor swap: the closed form
/// `pv(floating leg) / pvbp(fixed leg)`.
pub fn par_rate(
    swap: &SwapFixedIbor,
    provider: &MulticurveProvider,
) -> Result<f64, PricingError> {
    let annuity = present_value_basis_point(swap, provider)?;
    if annuity <= 0.0 {
        return Err(PricingError::InvalidInput(
            "fixed-leg annuity must be positive for a par rate".to_string(),
        ));
    }
    Ok(floating_pv_unsigned(swap, provider)? / annuity)
}

/// Spread on the floating leg that zeroes the swap value:
/// `(pvbp(fixed) * fixed_rate_pv - pv(float)) / pvbp(float)` expressed on
/// absolute notionals, so the sign convention is receiver-of-float.
pub fn par_spread(
    swap: &SwapFixedIbor,
    provider: &MulticurveProvider,
) -> Result<f64, PricingError> {
    let mut fixed_pv = 0.0;
    for coupon in &swap.fixed_leg {
        let df = provider.discount_factor(coupon.currency, coupon.payment_time)?;
        fixed_pv += coupon.notional.abs() * coupon.accrual * coupon.rate * df;
    }
    let mut float_pvbp = 0.0;
    for coupon in &swap.ibor_leg {
        let df = provider.discount_factor(coupon.currency, coupon.payment_time)?;
        float_pvbp += coupon.notional.abs() * coupon.accrual * df;
    }
    if float_pvbp <= 0.0 {
        return Err(PricingError::InvalidInput(
            "floating-leg annuity must be positive for a par spread".to_string(),
        ));
    }
    Ok((fixed_pv - floating_pv_unsigned(swap, provider)?) / float_pvbp)
}

/// Analytic curve sensitivity (zero-rate deltas) of any linear instrument.
pub fn curve_sensitivity(
    instrument: &Instrument,
    provider: &MulticurveProvider,
) -> Result<MultiCurrencyCurveSensitivity, PricingError> {
    match instrument {
        Instrument::FixedPayment(payment) => {
            let df = provider.discount_factor(payment.currency, payment.payment_time)?;
            let mut cs = CurveSensitivity::new();
            cs.add_point(
                provider.name(payment.currency)?,
                payment.payment_time,
                -payment.payment_time * payment.amount * df,
            );
            Ok(MultiCurrencyCurveSensitivity::of(payment.currency, cs))
        }
        Instrument::CouponFixed(coupon) => {
            let df = provider.discount_factor(coupon.currency, coupon.payment_time)?;
            let mut cs = CurveSensitivity::new();
            cs.add_point(
                provider.name(coupon.currency)?,
                coupon.payment_time,
                -coupon.payment_time * coupon.amount() * df,
            );
            Ok(MultiCurrencyCurveSensitivity::of(coupon.currency, cs))
        }
        Instrument::CouponIbor(coupon) | Instrument::CouponIborInArrears(coupon) => {
            coupon_ibor_sensitivity(coupon, provider)
        }
        Instrument::CouponOis(coupon) => coupon_ois_sensitivity(coupon, provider),
        Instrument::CouponCms(coupon) => coupon_cms_sensitivity(coupon, provider),
        Instrument::Leg(leg) => leg_sensitivity(leg, provider),
        Instrument::Swap(swap) => Ok(leg_sensitivity(&swap.first_leg, provider)?
            .plus(&leg_sensitivity(&swap.second_leg, provider)?)),
        Instrument::SwapMultileg(swap) => {
            let mut total = MultiCurrencyCurveSensitivity::new();
            for leg in &swap.legs {
                total = total.plus(&leg_sensitivity(leg, provider)?);
            }
            Ok(total)
        }
        other => Err(PricingError::UnsupportedInstrument(format!(
            "{} curve sensitivity under the discounting model",
            other.kind()
        ))),
    }
}

fn coupon_ibor_sensitivity(
    coupon: &CouponIbor,
    provider: &MulticurveProvider,
) -> Result<MultiCurrencyCurveSensitivity, PricingError> {
    let forward = provider.forward_rate(
        coupon.fixing.index,
        coupon.fixing.period_start,
        coupon.fixing.period_end,
        coupon.fixing.period_accrual,
    )?;
    let rate = coupon.gearing * forward + coupon.spread;
    let df = provider.discount_factor(coupon.currency, coupon.payment_time)?;
    let pv = coupon.notional * coupon.accrual * rate * df;

    let mut cs = CurveSensitivity::new();
    cs.add_point(
        provider.name(coupon.currency)?,
        coupon.payment_time,
        -coupon.payment_time * pv,
    );

    // Forward-curve part: F = (Pf(s)/Pf(e) - 1)/delta_f, so the zero-rate
    // deltas at the two pillars are -s*ratio/delta_f and +e*ratio/delta_f.
    let fwd_curve = provider.forward_curve(coupon.fixing.index)?;
    let ratio = fwd_curve.discount_factor(coupon.fixing.period_start)
        / fwd_curve.discount_factor(coupon.fixing.period_end);
    let factor = coupon.notional * coupon.accrual * coupon.gearing * df;
    let fwd_name = provider.forward_name(coupon.fixing.index)?;
    cs.add_point(
        fwd_name,
        coupon.fixing.period_start,
        factor * (-coupon.fixing.period_start) * ratio / coupon.fixing.period_accrual,
    );
    cs.add_point(
        fwd_name,
        coupon.fixing.period_end,
        factor * coupon.fixing.period_end * ratio / coupon.fixing.period_accrual,
    );

    Ok(MultiCurrencyCurveSensitivity::of(coupon.currency, cs))
}

fn coupon_ois_sensitivity(
    coupon: &CouponOis,
    provider: &MulticurveProvider,
) -> Result<MultiCurrencyCurveSensitivity, PricingError> {
    let curve = provider.forward_curve(coupon.index)?;
    let ratio = curve.discount_factor(coupon.fixing_start) / curve.discount_factor(coupon.fixing_end);
    let df = provider.discount_factor(coupon.currency, coupon.payment_time)?;
    let pv = (coupon.notional_accrued * ratio - coupon.notional) * df;

    let mut cs = CurveSensitivity::new();
    cs.add_point(
        provider.name(coupon.currency)?,
        coupon.payment_time,
        -coupon.payment_time * pv,
    );

    let fwd_name = provider.forward_name(coupon.index)?;
    let factor = coupon.notional_accrued * df * ratio;
    cs.add_point(fwd_name, coupon.fixing_start, -coupon.fixing_start * factor);
    cs.add_point(fwd_name, coupon.fixing_end, coupon.fixing_end * factor);

    Ok(MultiCurrencyCurveSensitivity::of(coupon.currency, cs))
}

fn coupon_cms_sensitivity(
    coupon: &CouponCms,
    provider: &MulticurveProvider,
) -> Result<MultiCurrencyCurveSensitivity, PricingError> {
    let swap_rate = par_rate(&coupon.underlying, provider)?;
    let df = provider.discount_factor(coupon.currency, coupon.payment_time)?;
    let scale = coupon.notional * coupon.accrual;

    let mut cs = CurveSensitivity::new();
    cs.add_point(
        provider.name(coupon.currency)?,
        coupon.payment_time,
        -coupon.payment_time * scale * swap_rate * df,
    );
    let rate_part = par_rate_curve_sensitivity(&coupon.underlying, provider)?
        .multiplied_by(scale * df);
    Ok(MultiCurrencyCurveSensitivity::of(
        coupon.currency,
        cs.plus(&rate_part),
    ))
}

fn leg_sensitivity(
    leg: &Leg,
    provider: &MulticurveProvider,
) -> Result<MultiCurrencyCurveSensitivity, PricingError> {
    let mut total = MultiCurrencyCurveSensitivity::new();
    for coupon in &leg.coupons {
        total = total.plus(&curve_sensitivity(coupon, provider)?);
    }
    Ok(total)
}

/// Analytic curve sensitivity of the par rate `S = pv(float)/A`:
/// `dS = d(pv_float)/A - S * dA/A`.
pub fn par_rate_curve_sensitivity(
    swap: &SwapFixedIbor,
    provider: &MulticurveProvider,
) -> Result<CurveSensitivity, PricingError> {
    let annuity = present_value_basis_point(swap, provider)?;
    if annuity <= 0.0 {
        return Err(PricingError::InvalidInput(
            "fixed-leg annuity must be positive for a par rate".to_string(),
        ));
    }
    let swap_rate = floating_pv_unsigned(swap, provider)? / annuity;

    // d(pv_float): discount and forward parts per Ibor coupon.
    let mut d_float = CurveSensitivity::new();
    for coupon in &swap.ibor_leg {
        let forward = provider.forward_rate(
            coupon.fixing.index,
            coupon.fixing.period_start,
            coupon.fixing.period_end,
            coupon.fixing.period_accrual,
        )?;
        let df = provider.discount_factor(coupon.currency, coupon.payment_time)?;
        let weight = coupon.notional.abs() * coupon.accrual * coupon.gearing;
        d_float.add_point(
            provider.name(coupon.currency)?,
            coupon.payment_time,
            -coupon.payment_time * weight * forward * df,
        );

        let fwd_curve = provider.forward_curve(coupon.fixing.index)?;
        let ratio = fwd_curve.discount_factor(coupon.fixing.period_start)
            / fwd_curve.discount_factor(coupon.fixing.period_end);
        let fwd_name = provider.forward_name(coupon.fixing.index)?;
        let factor = weight * df * ratio / coupon.fixing.period_accrual;
        d_float.add_point(
            fwd_name,
            coupon.fixing.period_start,
            -coupon.fixing.period_start * factor,
        );
        d_float.add_point(fwd_name, coupon.fixing.period_end, coupon.fixing.period_end * factor);
    }

    // dA: discount part per fixed coupon.
    let mut d_annuity = CurveSensitivity::new();
    for coupon in &swap.fixed_leg {
        let df = provider.discount_factor(coupon.currency, coupon.payment_time)?;
        d_annuity.add_point(
            provider.name(coupon.currency)?,
            coupon.payment_time,
            -coupon.payment_time * coupon.notional.abs() * coupon.accrual * df,
        );
    }

    Ok(d_float
        .multiplied_by(1.0 / annuity)
        .plus(&d_annuity.multiplied_by(-swap_rate / annuity)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::curves::{RateIndex, ZeroRateCurve};
    use crate::instruments::vanilla_swap_fixed_ibor;
    use approx::assert_relative_eq;

    fn usd_index() -> RateIndex {
        RateIndex::Ibor {
            currency: Currency::Usd,
            tenor_months: 3,
        }
    }

    fn flat_provider(dsc_rate: f64, fwd_rate: f64) -> MulticurveProvider {
        let nodes = |r: f64| (1..=40).map(|i| (i as f64 * 0.5, r)).collect::<Vec<_>>();
        MulticurveProvider::new()
            .with_discount_curve(Currency::Usd, ZeroRateCurve::new("USD-DSC", nodes(dsc_rate)))
            .with_forward_curve(usd_index(), ZeroRateCurve::new("USD-L3M", nodes(fwd_rate)))
    }

    #[test]
    fn fixed_coupon_discounts_at_payment_time() {
        let provider = flat_provider(0.03, 0.035);
        let coupon = Instrument::CouponFixed(CouponFixed::new(Currency::Usd, 2.0, 0.5, 1.0e6, 0.04));
        let pv = present_value(&coupon, &provider).unwrap();
        assert_relative_eq!(
            pv.amount(Currency::Usd),
            1.0e6 * 0.5 * 0.04 * (-0.03_f64 * 2.0).exp(),
            epsilon = 1e-6
        );
    }

    #[test]
    fn gearing_and_spread_enter_the_coupon_rate() {
        let provider = flat_provider(0.03, 0.035);
        let fixing = crate::instruments::IborFixing::new(usd_index(), 1.0, 1.25, 0.25);
        let plain = CouponIbor::new(Currency::Usd, 1.25, 0.25, 1.0e6, 1.0, fixing);
        let geared = CouponIbor::with_gearing_spread(
            Currency::Usd,
            1.25,
            0.25,
            1.0e6,
            1.0,
            fixing,
            2.0,
            0.01,
        );

        let forward = provider.forward_rate(usd_index(), 1.0, 1.25, 0.25).unwrap();
        let df = provider.discount_factor(Currency::Usd, 1.25).unwrap();
        let pv_plain = present_value(&Instrument::CouponIbor(plain), &provider).unwrap();
        let pv_geared = present_value(&Instrument::CouponIbor(geared), &provider).unwrap();

        assert_relative_eq!(
            pv_plain.amount(Currency::Usd),
            1.0e6 * 0.25 * forward * df,
            epsilon = 1e-8
        );
        assert_relative_eq!(
            pv_geared.amount(Currency::Usd),
            1.0e6 * 0.25 * (2.0 * forward + 0.01) * df,
            epsilon = 1e-8
        );
    }

    #[test]
    fn ois_coupon_compounds_realized_and_forward_portions() {
        let provider = flat_provider(0.03, 0.028);
        // Period started: realized fixings folded into the accrued notional.
        let coupon = CouponOis::new(
            Currency::Usd,
            0.75,
            1.0,
            1.0e6,
            1.0e6 * 1.0071,
            usd_index(),
            0.0,
            0.75,
        );
        let pv = present_value(&Instrument::CouponOis(coupon), &provider).unwrap();

        let curve = provider.forward_curve(usd_index()).unwrap();
        let ratio = curve.discount_factor(0.0) / curve.discount_factor(0.75);
        let df = provider.discount_factor(Currency::Usd, 0.75).unwrap();
        assert_relative_eq!(
            pv.amount(Currency::Usd),
            (1.0e6 * 1.0071 * ratio - 1.0e6) * df,
            epsilon = 1e-8
        );
    }

    #[test]
    fn cap_floor_is_unsupported_under_discounting() {
        let provider = flat_provider(0.03, 0.035);
        let fixing = crate::instruments::IborFixing::new(usd_index(), 1.0, 1.25, 0.25);
        let cap = Instrument::CapFloorIbor(crate::instruments::CapFloorIbor::new(
            Currency::Usd,
            1.25,
            0.25,
            1.0e6,
            1.0,
            fixing,
            0.03,
            true,
        ));
        assert!(matches!(
            present_value(&cap, &provider),
            Err(PricingError::UnsupportedInstrument(_))
        ));
    }

    #[test]
    fn par_rate_zeroes_the_swap_value() {
        let provider = flat_provider(0.0295, 0.0325);
        let swap = vanilla_swap_fixed_ibor(
            Currency::Usd,
            usd_index(),
            0.0,
            10.0,
            0.5,
            0.25,
            1.0e8,
            0.0,
        );
        let par = par_rate(&swap, &provider).unwrap();
        let annuity = present_value_basis_point(&swap, &provider).unwrap();

        // Receiver-float swap at the par fixed rate must be worth zero.
        let mut float_pv = 0.0;
        for c in &swap.ibor_leg {
            let f = provider
                .forward_rate(
                    c.fixing.index,
                    c.fixing.period_start,
                    c.fixing.period_end,
                    c.fixing.period_accrual,
                )
                .unwrap();
            let df = provider.discount_factor(Currency::Usd, c.payment_time).unwrap();
            float_pv += c.notional.abs() * c.accrual * f * df;
        }
        assert_relative_eq!(float_pv - par * annuity, 0.0, epsilon = 1e-6);
    }

    #[test]
    fn par_rate_sensitivity_matches_finite_difference() {
        let provider = flat_provider(0.0295, 0.0325);
        let swap = vanilla_swap_fixed_ibor(
            Currency::Usd,
            usd_index(),
            0.0,
            5.0,
            0.5,
            0.25,
            1.0e8,
            0.0,
        );
        let analytic = par_rate_curve_sensitivity(&swap, &provider).unwrap().cleaned();

        let shift = 1.0e-7;
        for name in provider.curve_names() {
            let curve = provider.curve_by_name(&name).unwrap().clone();
            let points = analytic.get(&name).map(|p| p.to_vec()).unwrap_or_default();
            // Project analytic points onto node 4 and compare with a bump.
            let node = 4;
            let up = provider
                .with_replaced_curve(&name, curve.bumped_node(node, shift))
                .unwrap();
            let dn = provider
                .with_replaced_curve(&name, curve.bumped_node(node, -shift))
                .unwrap();
            let fd = (par_rate(&swap, &up).unwrap() - par_rate(&swap, &dn).unwrap()) / (2.0 * shift);

            let mut projected = 0.0;
            for (t, v) in points {
                projected += v * curve.node_weights(t)[node];
            }
            assert_relative_eq!(projected, fd, epsilon = 1e-6);
        }
    }

    #[test]
    fn long_short_swap_mirror_negates_value() {
        let provider = flat_provider(0.0295, 0.0325);
        let long = vanilla_swap_fixed_ibor(
            Currency::Usd,
            usd_index(),
            0.0,
            10.0,
            0.5,
            0.25,
            1.0e8,
            0.015,
        );
        let short = vanilla_swap_fixed_ibor(
            Currency::Usd,
            usd_index(),
            0.0,
            10.0,
            0.5,
            0.25,
            -1.0e8,
            0.015,
        );

        // Receiver-fixed view: fixed leg as-is, floating leg with flipped sign.
        let legs = |s: &SwapFixedIbor| {
            let fixed: Vec<Instrument> =
                s.fixed_leg.iter().map(|c| Instrument::CouponFixed(*c)).collect();
            let float: Vec<Instrument> = s
                .ibor_leg
                .iter()
                .map(|c| {
                    let mut c = *c;
                    c.notional = -c.notional;
                    Instrument::CouponIbor(c)
                })
                .collect();
            Instrument::Swap(crate::instruments::Swap::new(Leg::new(fixed), Leg::new(float)))
        };

        let pv_long = present_value(&legs(&long), &provider).unwrap();
        let pv_short = present_value(&legs(&short), &provider).unwrap();
        assert_relative_eq!(
            pv_long.amount(Currency::Usd),
            -pv_short.amount(Currency::Usd),
            epsilon = 1e-6
        );
    }
}
