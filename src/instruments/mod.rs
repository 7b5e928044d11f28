//! Cash-flow-level instrument representation.
//!
//! Every instrument is a time-anchored "derivative": all dates are expressed
//! as year-fractions from the valuation date, accrual factors are supplied by
//! external day-count utilities, and values are immutable after construction.
//! Changing a trade parameter means rebuilding the instrument.
//!
//! The variant set is closed on purpose: pricing routines dispatch by pattern
//! matching on [`Instrument`], and an unhandled (variant, model) pair is a
//! hard `UnsupportedInstrument` error rather than a silent fallback.

use serde::{Deserialize, Serialize};

use crate::core::Currency;
use crate::curves::RateIndex;

/// A single known cash amount paid at `payment_time`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FixedPayment {
    pub currency: Currency,
    pub payment_time: f64,
    pub amount: f64,
}

impl FixedPayment {
    pub fn new(currency: Currency, payment_time: f64, amount: f64) -> Self {
        assert!(payment_time >= 0.0, "payment time must be non-negative");
        Self {
            currency,
            payment_time,
            amount,
        }
    }
}

/// Fixed-rate coupon paying `notional * accrual * rate`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CouponFixed {
    pub currency: Currency,
    pub payment_time: f64,
    /// Payment-period accrual factor from the day-count convention.
    pub accrual: f64,
    pub notional: f64,
    pub rate: f64,
}

impl CouponFixed {
    pub fn new(currency: Currency, payment_time: f64, accrual: f64, notional: f64, rate: f64) -> Self {
        assert!(payment_time >= 0.0, "payment time must be non-negative");
        assert!(accrual > 0.0, "accrual factor must be positive");
        Self {
            currency,
            payment_time,
            accrual,
            notional,
            rate,
        }
    }

    /// The coupon cash amount.
    pub fn amount(&self) -> f64 {
        self.notional * self.accrual * self.rate
    }
}

/// Reference period of an Ibor fixing.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct IborFixing {
    pub index: RateIndex,
    /// Start of the fixing (deposit) period.
    pub period_start: f64,
    /// End of the fixing period.
    pub period_end: f64,
    /// Accrual factor of the fixing period.
    pub period_accrual: f64,
}

impl IborFixing {
    pub fn new(index: RateIndex, period_start: f64, period_end: f64, period_accrual: f64) -> Self {
        assert!(period_end > period_start, "fixing period must be ordered");
        assert!(period_accrual > 0.0, "fixing accrual must be positive");
        Self {
            index,
            period_start,
            period_end,
            period_accrual,
        }
    }

    /// Underlying deposit tenor in years.
    pub fn tenor(&self) -> f64 {
        self.period_end - self.period_start
    }
}

/// Ibor coupon with optional gearing and spread:
/// `rate = gearing * forward + spread`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CouponIbor {
    pub currency: Currency,
    pub payment_time: f64,
    pub accrual: f64,
    pub notional: f64,
    /// Time of the rate fixing (option expiry for capped variants).
    pub fixing_time: f64,
    pub fixing: IborFixing,
    pub gearing: f64,
    pub spread: f64,
}

impl CouponIbor {
    pub fn new(
        currency: Currency,
        payment_time: f64,
        accrual: f64,
        notional: f64,
        fixing_time: f64,
        fixing: IborFixing,
    ) -> Self {
        Self::with_gearing_spread(currency, payment_time, accrual, notional, fixing_time, fixing, 1.0, 0.0)
    }

    #[allow(clippy::too_many_arguments)]
    pub fn with_gearing_spread(
        currency: Currency,
        payment_time: f64,
        accrual: f64,
        notional: f64,
        fixing_time: f64,
        fixing: IborFixing,
        gearing: f64,
        spread: f64,
    ) -> Self {
        assert!(payment_time >= 0.0, "payment time must be non-negative");
        assert!(accrual > 0.0, "accrual factor must be positive");
        assert!(fixing_time >= 0.0, "fixing time must be non-negative");
        Self {
            currency,
            payment_time,
            accrual,
            notional,
            fixing_time,
            fixing,
            gearing,
            spread,
        }
    }
}

/// Overnight-indexed coupon paying the compounded overnight rate over
/// `[fixing_start, fixing_end]`.
///
/// For periods that have already started, the realized fixings are folded
/// into `notional_accrued` (notional times the compounded realized factor);
/// the remaining unfixed portion compounds from the forward-curve ratio.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CouponOis {
    pub currency: Currency,
    pub payment_time: f64,
    pub accrual: f64,
    pub notional: f64,
    /// Notional with the realized compounding accrued so far; equals
    /// `notional` for periods that have not started.
    pub notional_accrued: f64,
    pub index: RateIndex,
    pub fixing_start: f64,
    pub fixing_end: f64,
}

impl CouponOis {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        currency: Currency,
        payment_time: f64,
        accrual: f64,
        notional: f64,
        notional_accrued: f64,
        index: RateIndex,
        fixing_start: f64,
        fixing_end: f64,
    ) -> Self {
        assert!(accrual > 0.0, "accrual factor must be positive");
        assert!(fixing_end > fixing_start, "fixing period must be ordered");
        Self {
            currency,
            payment_time,
            accrual,
            notional,
            notional_accrued,
            index,
            fixing_start,
            fixing_end,
        }
    }
}

/// Fixed-vs-Ibor swap in leg form, the underlying of CMS products and the
/// carrier of par-rate computations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SwapFixedIbor {
    pub fixed_leg: Vec<CouponFixed>,
    pub ibor_leg: Vec<CouponIbor>,
}

impl SwapFixedIbor {
    pub fn new(fixed_leg: Vec<CouponFixed>, ibor_leg: Vec<CouponIbor>) -> Self {
        assert!(!fixed_leg.is_empty(), "fixed leg cannot be empty");
        assert!(!ibor_leg.is_empty(), "ibor leg cannot be empty");
        Self { fixed_leg, ibor_leg }
    }

    pub fn currency(&self) -> Currency {
        self.fixed_leg[0].currency
    }

    /// Payment time of the last fixed coupon.
    pub fn last_fixed_payment_time(&self) -> f64 {
        self.fixed_leg
            .iter()
            .map(|c| c.payment_time)
            .fold(f64::MIN, f64::max)
    }
}

/// CMS coupon: pays the swap rate observed at `fixing_time` on the underlying
/// swap, requiring a convexity adjustment to price correctly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CouponCms {
    pub currency: Currency,
    pub payment_time: f64,
    pub accrual: f64,
    pub notional: f64,
    pub fixing_time: f64,
    /// Settlement (start) time of the underlying swap.
    pub settlement_time: f64,
    pub underlying: SwapFixedIbor,
}

impl CouponCms {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        currency: Currency,
        payment_time: f64,
        accrual: f64,
        notional: f64,
        fixing_time: f64,
        settlement_time: f64,
        underlying: SwapFixedIbor,
    ) -> Self {
        assert!(accrual > 0.0, "accrual factor must be positive");
        assert!(fixing_time >= 0.0, "fixing time must be non-negative");
        assert!(settlement_time >= fixing_time, "settlement cannot precede fixing");
        Self {
            currency,
            payment_time,
            accrual,
            notional,
            fixing_time,
            settlement_time,
            underlying,
        }
    }
}

/// Cap or floor on an Ibor rate.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CapFloorIbor {
    pub currency: Currency,
    pub payment_time: f64,
    pub accrual: f64,
    pub notional: f64,
    pub fixing_time: f64,
    pub fixing: IborFixing,
    pub strike: f64,
    pub is_cap: bool,
}

impl CapFloorIbor {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        currency: Currency,
        payment_time: f64,
        accrual: f64,
        notional: f64,
        fixing_time: f64,
        fixing: IborFixing,
        strike: f64,
        is_cap: bool,
    ) -> Self {
        assert!(accrual > 0.0, "accrual factor must be positive");
        assert!(fixing_time >= 0.0, "fixing time must be non-negative");
        Self {
            currency,
            payment_time,
            accrual,
            notional,
            fixing_time,
            fixing,
            strike,
            is_cap,
        }
    }

    /// The payoff sign: +1 for caps, -1 for floors.
    pub fn omega(&self) -> f64 {
        if self.is_cap { 1.0 } else { -1.0 }
    }
}

/// Cap or floor on a CMS rate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CapFloorCms {
    pub coupon: CouponCms,
    pub strike: f64,
    pub is_cap: bool,
}

impl CapFloorCms {
    pub fn new(coupon: CouponCms, strike: f64, is_cap: bool) -> Self {
        assert!(strike >= 0.0, "strike must be non-negative");
        Self {
            coupon,
            strike,
            is_cap,
        }
    }
}

/// Cap or floor on the difference of two CMS rates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CapFloorCmsSpread {
    pub currency: Currency,
    pub payment_time: f64,
    pub accrual: f64,
    pub notional: f64,
    pub fixing_time: f64,
    pub settlement_time: f64,
    /// Underlying of the first (long) CMS rate.
    pub first: SwapFixedIbor,
    /// Underlying of the second (short) CMS rate.
    pub second: SwapFixedIbor,
    pub strike: f64,
    pub is_cap: bool,
}

/// Ordered sequence of coupons; composites sum their children.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Leg {
    pub coupons: Vec<Instrument>,
}

impl Leg {
    pub fn new(coupons: Vec<Instrument>) -> Self {
        Self { coupons }
    }
}

/// Two-leg swap.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Swap {
    pub first_leg: Leg,
    pub second_leg: Leg,
}

impl Swap {
    pub fn new(first_leg: Leg, second_leg: Leg) -> Self {
        Self {
            first_leg,
            second_leg,
        }
    }
}

/// Swap with two or more legs, possibly in different currencies.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SwapMultileg {
    pub legs: Vec<Leg>,
}

impl SwapMultileg {
    pub fn new(legs: Vec<Leg>) -> Self {
        assert!(legs.len() >= 2, "multileg swap requires at least two legs");
        Self { legs }
    }
}

/// The closed instrument variant set routed by the pricing dispatch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Instrument {
    FixedPayment(FixedPayment),
    CouponFixed(CouponFixed),
    CouponIbor(CouponIbor),
    /// Ibor coupon fixing at (or near) its own payment date; needs a timing
    /// adjustment under a smile model.
    CouponIborInArrears(CouponIbor),
    CouponOis(CouponOis),
    CouponCms(CouponCms),
    CapFloorIbor(CapFloorIbor),
    CapFloorIborInArrears(CapFloorIbor),
    CapFloorCms(CapFloorCms),
    CapFloorCmsSpread(CapFloorCmsSpread),
    Leg(Leg),
    Swap(Swap),
    SwapMultileg(SwapMultileg),
}

impl Instrument {
    /// Short variant tag for diagnostics and error messages.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::FixedPayment(_) => "FixedPayment",
            Self::CouponFixed(_) => "CouponFixed",
            Self::CouponIbor(_) => "CouponIbor",
            Self::CouponIborInArrears(_) => "CouponIborInArrears",
            Self::CouponOis(_) => "CouponOis",
            Self::CouponCms(_) => "CouponCms",
            Self::CapFloorIbor(_) => "CapFloorIbor",
            Self::CapFloorIborInArrears(_) => "CapFloorIborInArrears",
            Self::CapFloorCms(_) => "CapFloorCms",
            Self::CapFloorCmsSpread(_) => "CapFloorCmsSpread",
            Self::Leg(_) => "Leg",
            Self::Swap(_) => "Swap",
            Self::SwapMultileg(_) => "SwapMultileg",
        }
    }
}

/// Builds a spot-starting fixed-vs-Ibor swap on a regular schedule.
///
/// Convenience for tests and CMS underlyings: `fixed_period` years between
/// fixed coupons, `float_period` years between Ibor coupons, accruals taken
/// equal to the period lengths.
pub fn vanilla_swap_fixed_ibor(
    currency: Currency,
    index: RateIndex,
    settlement_time: f64,
    tenor_years: f64,
    fixed_period: f64,
    float_period: f64,
    notional: f64,
    fixed_rate: f64,
) -> SwapFixedIbor {
    assert!(tenor_years > 0.0 && fixed_period > 0.0 && float_period > 0.0);

    let n_fixed = (tenor_years / fixed_period).round() as usize;
    let fixed_leg = (1..=n_fixed)
        .map(|i| {
            CouponFixed::new(
                currency,
                settlement_time + i as f64 * fixed_period,
                fixed_period,
                notional,
                fixed_rate,
            )
        })
        .collect();

    let n_float = (tenor_years / float_period).round() as usize;
    let ibor_leg = (1..=n_float)
        .map(|i| {
            let start = settlement_time + (i - 1) as f64 * float_period;
            let end = settlement_time + i as f64 * float_period;
            CouponIbor::new(
                currency,
                end,
                float_period,
                notional,
                start.max(0.0),
                IborFixing::new(index, start, end, float_period),
            )
        })
        .collect();

    SwapFixedIbor::new(fixed_leg, ibor_leg)
}
