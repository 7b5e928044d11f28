//! Present-value sensitivity to SABR smile parameters, keyed by the
//! (expiry, underlying maturity) coordinate the parameters were read at.

/// One smile coordinate.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SmilePoint {
    pub expiry: f64,
    pub maturity: f64,
}

impl SmilePoint {
    fn close_to(&self, other: &SmilePoint) -> bool {
        (self.expiry - other.expiry).abs() <= 1.0e-12
            && (self.maturity - other.maturity).abs() <= 1.0e-12
    }
}

/// PV derivatives with respect to alpha, rho and nu, accumulated per smile
/// coordinate.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SabrSensitivity {
    pub alpha: Vec<(SmilePoint, f64)>,
    pub rho: Vec<(SmilePoint, f64)>,
    pub nu: Vec<(SmilePoint, f64)>,
}

fn add_entry(entries: &mut Vec<(SmilePoint, f64)>, point: SmilePoint, value: f64) {
    for (existing, total) in entries.iter_mut() {
        if existing.close_to(&point) {
            *total += value;
            return;
        }
    }
    entries.push((point, value));
}

impl SabrSensitivity {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_alpha(&mut self, point: SmilePoint, value: f64) {
        add_entry(&mut self.alpha, point, value);
    }

    pub fn add_rho(&mut self, point: SmilePoint, value: f64) {
        add_entry(&mut self.rho, point, value);
    }

    pub fn add_nu(&mut self, point: SmilePoint, value: f64) {
        add_entry(&mut self.nu, point, value);
    }

    pub fn multiplied_by(&self, factor: f64) -> Self {
        let scale = |entries: &[(SmilePoint, f64)]| {
            entries
                .iter()
                .map(|(p, v)| (*p, v * factor))
                .collect::<Vec<_>>()
        };
        Self {
            alpha: scale(&self.alpha),
            rho: scale(&self.rho),
            nu: scale(&self.nu),
        }
    }

    pub fn plus(&self, other: &Self) -> Self {
        let mut out = self.clone();
        for (p, v) in &other.alpha {
            out.add_alpha(*p, *v);
        }
        for (p, v) in &other.rho {
            out.add_rho(*p, *v);
        }
        for (p, v) in &other.nu {
            out.add_nu(*p, *v);
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entries_merge_on_the_same_coordinate() {
        let mut s = SabrSensitivity::new();
        let point = SmilePoint {
            expiry: 5.0,
            maturity: 10.0,
        };
        s.add_alpha(point, 100.0);
        s.add_alpha(point, 50.0);
        assert_eq!(s.alpha.len(), 1);
        assert_eq!(s.alpha[0].1, 150.0);
    }

    #[test]
    fn scaling_flips_sign_for_short_positions() {
        let mut s = SabrSensitivity::new();
        s.add_rho(
            SmilePoint {
                expiry: 1.0,
                maturity: 5.0,
            },
            20.0,
        );
        let short = s.multiplied_by(-1.0);
        assert_eq!(short.rho[0].1, -20.0);
    }
}
