//! Sensitivity engine checks: analytic curve adjoints against the
//! finite-difference bump engine, bucketing, market-quote transforms, FX
//! conversion, and the SABR parameter sensitivities.

use std::collections::HashMap;

use approx::assert_relative_eq;
use nalgebra::DMatrix;

use multicurve::core::Currency;
use multicurve::curves::{FxMatrix, MulticurveProvider, RateIndex, ZeroRateCurve};
use multicurve::instruments::{
    vanilla_swap_fixed_ibor, CapFloorCms, CapFloorIbor, CouponCms, CouponFixed, IborFixing,
    Instrument, Leg, Swap,
};
use multicurve::models::sabr::{SabrParameters, SabrSurface};
use multicurve::models::SabrExtrapolationParameters;
use multicurve::pricing::{self, discounting, sabr::SabrBundle, Model};
use multicurve::sensitivity::{
    finite_difference, market_quote_sensitivity, ParameterSensitivity,
};

const NOTIONAL: f64 = 1.0e8;

fn usd_index() -> RateIndex {
    RateIndex::Ibor {
        currency: Currency::Usd,
        tenor_months: 3,
    }
}

fn provider() -> MulticurveProvider {
    let dsc_nodes = vec![
        (0.5, 0.0012),
        (1.0, 0.0018),
        (2.0, 0.0042),
        (5.0, 0.0150),
        (10.0, 0.0255),
        (20.0, 0.0300),
    ];
    let fwd_nodes = vec![
        (0.5, 0.0028),
        (1.0, 0.0035),
        (2.0, 0.0061),
        (5.0, 0.0175),
        (10.0, 0.0278),
        (20.0, 0.0322),
    ];
    MulticurveProvider::new()
        .with_discount_curve(Currency::Usd, ZeroRateCurve::new("USD-OIS", dsc_nodes))
        .with_forward_curve(usd_index(), ZeroRateCurve::new("USD-LIBOR3M", fwd_nodes))
}

fn payer_fixed_swap() -> Instrument {
    let swap = vanilla_swap_fixed_ibor(
        Currency::Usd,
        usd_index(),
        0.0,
        10.0,
        0.5,
        0.25,
        NOTIONAL,
        0.015,
    );
    let fixed: Vec<Instrument> = swap
        .fixed_leg
        .iter()
        .map(|c| {
            Instrument::CouponFixed(CouponFixed::new(
                c.currency,
                c.payment_time,
                c.accrual,
                -c.notional,
                c.rate,
            ))
        })
        .collect();
    let float: Vec<Instrument> =
        swap.ibor_leg.iter().map(|c| Instrument::CouponIbor(*c)).collect();
    Instrument::Swap(Swap::new(Leg::new(fixed), Leg::new(float)))
}

#[test]
fn swap_analytic_sensitivity_matches_finite_difference_per_node() {
    let provider = provider();
    let swap = payer_fixed_swap();
    let model = Model::Discounting(&provider);

    let analytic = pricing::parameter_sensitivity(&swap, &model).unwrap();

    let shift = 1.0e-6;
    let bumped = finite_difference::parameter_sensitivity(
        |p| {
            Ok(discounting::present_value(&swap, p)?
                .amount(Currency::Usd))
        },
        &provider,
        Currency::Usd,
        shift,
    )
    .unwrap();

    // 1e-6 shift on a 1e8 notional book: absolute tolerance of order 1e2.
    assert!(analytic.max_absolute_difference(&bumped) < 1.0e2);

    // And the agreement is actually much tighter in relative terms.
    for (name, ccy, values) in analytic.iter() {
        let fd = bumped.get(name, ccy).unwrap();
        for (a, b) in values.iter().zip(fd.iter()) {
            assert_relative_eq!(*a, *b, max_relative = 1.0e-4, epsilon = 1.0);
        }
    }
}

#[test]
fn sabr_caplet_sensitivity_matches_finite_difference() {
    let provider = provider();
    let surface = SabrSurface::flat(SabrParameters {
        alpha: 0.05,
        beta: 0.5,
        rho: -0.25,
        nu: 0.5,
    });
    let bundle = SabrBundle::new(&provider, &surface);
    let cap = Instrument::CapFloorIbor(CapFloorIbor::new(
        Currency::Usd,
        2.25,
        0.25,
        NOTIONAL,
        2.0,
        IborFixing::new(usd_index(), 2.0, 2.25, 0.25),
        0.03,
        true,
    ));

    let model = Model::Sabr(&bundle);
    let analytic = pricing::parameter_sensitivity(&cap, &model).unwrap();

    let bumped = finite_difference::parameter_sensitivity(
        |p| {
            let b = SabrBundle::new(p, &surface);
            Ok(pricing::sabr::present_value(&cap, &b)?.amount(Currency::Usd))
        },
        &provider,
        Currency::Usd,
        1.0e-6,
    )
    .unwrap();

    assert!(analytic.max_absolute_difference(&bumped) < 1.0e2);
}

#[test]
fn cms_cap_sensitivity_matches_finite_difference() {
    let provider = provider();
    let surface = SabrSurface::flat(SabrParameters {
        alpha: 0.05,
        beta: 0.5,
        rho: -0.25,
        nu: 0.5,
    });
    let bundle = SabrBundle::new(&provider, &surface).with_extrapolation(
        SabrExtrapolationParameters {
            cutoff_strike: 0.10,
            tail_order_mu: 2.5,
        },
    );

    let underlying =
        vanilla_swap_fixed_ibor(Currency::Usd, usd_index(), 5.0, 5.0, 0.5, 0.25, 1.0, 0.0);
    let cap = Instrument::CapFloorCms(CapFloorCms::new(
        CouponCms::new(Currency::Usd, 5.5, 0.5, 1.0e6, 5.0, 5.0, underlying),
        0.04,
        true,
    ));

    let model = Model::Sabr(&bundle);
    let analytic = pricing::parameter_sensitivity(&cap, &model).unwrap();

    let bumped = finite_difference::parameter_sensitivity(
        |p| {
            let b = SabrBundle::new(p, &surface).with_extrapolation(
                SabrExtrapolationParameters {
                    cutoff_strike: 0.10,
                    tail_order_mu: 2.5,
                },
            );
            Ok(pricing::sabr::present_value(&cap, &b)?.amount(Currency::Usd))
        },
        &provider,
        Currency::Usd,
        1.0e-5,
    )
    .unwrap();

    // The CMS delta chains a numerical forward derivative into the exact
    // par-rate adjoints, and both sides carry residual quadrature noise;
    // tolerance follows the 1e-5 shift on the 1e6 notional.
    assert!(analytic.max_absolute_difference(&bumped) < 4.0e2);
}

#[test]
fn market_quote_transform_applies_the_calibration_jacobian() {
    let provider = provider();
    let swap = payer_fixed_swap();
    let model = Model::Discounting(&provider);
    let nodes = pricing::parameter_sensitivity(&swap, &model).unwrap();

    // Identity on the forward curve, an aggregation matrix on the discount
    // curve (e.g. quotes that each move a prefix of the nodes).
    let n_dsc = provider.curve_by_name("USD-OIS").unwrap().node_count();
    let n_fwd = provider.curve_by_name("USD-LIBOR3M").unwrap().node_count();
    let mut lower = DMatrix::zeros(n_dsc, n_dsc);
    for i in 0..n_dsc {
        for j in 0..=i {
            lower[(i, j)] = 1.0;
        }
    }
    let mut jacobians = HashMap::new();
    jacobians.insert("USD-OIS".to_string(), lower);
    jacobians.insert("USD-LIBOR3M".to_string(), DMatrix::identity(n_fwd, n_fwd));

    let quotes = market_quote_sensitivity(&nodes, &jacobians).unwrap();

    // Quote j on the discount curve aggregates node sensitivities i >= j.
    let node_values = nodes.get("USD-OIS", Currency::Usd).unwrap();
    let quote_values = quotes.get("USD-OIS", Currency::Usd).unwrap();
    for j in 0..n_dsc {
        let expected: f64 = node_values[j..].iter().sum();
        assert_relative_eq!(quote_values[j], expected, epsilon = 1.0e-6);
    }
    // Identity leaves the forward block untouched.
    assert_eq!(
        quotes.get("USD-LIBOR3M", Currency::Usd).unwrap(),
        nodes.get("USD-LIBOR3M", Currency::Usd).unwrap()
    );
}

#[test]
fn sensitivities_convert_across_currencies() {
    let fx = FxMatrix::new().with_rate(Currency::Eur, Currency::Usd, 1.25);
    let usd = ParameterSensitivity::of("BOOK", Currency::Usd, vec![100.0, -40.0]);
    let eur = ParameterSensitivity::of("BOOK", Currency::Eur, vec![80.0, 80.0]);

    let total = usd.plus(&eur).converted_into(&fx, Currency::Usd).unwrap();
    let values = total.get("BOOK", Currency::Usd).unwrap();
    assert_relative_eq!(values[0], 200.0, epsilon = 1.0e-12);
    assert_relative_eq!(values[1], 60.0, epsilon = 1.0e-12);
}

#[test]
fn sabr_sensitivity_long_short_parity() {
    let provider = provider();
    let surface = SabrSurface::flat(SabrParameters {
        alpha: 0.05,
        beta: 0.5,
        rho: -0.25,
        nu: 0.5,
    });
    let bundle = SabrBundle::new(&provider, &surface);

    let caplet = |notional: f64| {
        Instrument::CapFloorIbor(CapFloorIbor::new(
            Currency::Usd,
            2.25,
            0.25,
            notional,
            2.0,
            IborFixing::new(usd_index(), 2.0, 2.25, 0.25),
            0.03,
            true,
        ))
    };

    let long = pricing::sabr_sensitivity(&caplet(NOTIONAL), &bundle).unwrap();
    let short = pricing::sabr_sensitivity(&caplet(-NOTIONAL), &bundle).unwrap();
    assert_relative_eq!(long.alpha[0].1, -short.alpha[0].1, max_relative = 1.0e-9);
    assert_relative_eq!(long.nu[0].1, -short.nu[0].1, max_relative = 1.0e-9);
    assert!(long.alpha[0].1 > 0.0);
}
