//
// RustQ Binomial - library for pricing options on binomial lattices in Rust
// Copyright (c) 2016 by Albert Pang <albert.pang@me.com>
// All rights reserved.
//
// This file is a part of RustQ Binomial
//
// RustQ Binomial is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// RustQ Binomial is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License
// along with this program.  If not, see <http://www.gnu.org/licenses/>.
//
use log::debug;

use crate::error::{LatticeError, LatticeResult};

/// The family of up/down multipliers used to build the lattice
#[allow(clippy::upper_case_acronyms)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TreeType {
    /// Cox-Ross-Rubinstein: d = 1/u, p solves the martingale condition
    CRR,
    /// Rendleman-Bartter: p = 0.5, u and d carry the drift
    RB,
}

/// How the size of an up move is specified.  Exactly one of the two must be
/// given, which the enum enforces
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Movement {
    /// The up multiplier u itself
    Up(f64),
    /// Implied volatility p.a., from which u is derived
    Volatility(f64),
}

/// Discounting convention over one step
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Compounding {
    /// exp(-r dt)
    #[default]
    Continuous,
    /// 1 / (1 + r dt)
    Simple,
}

impl Compounding {
    /// Discount factor for a period of length dt at rate r
    pub fn discount(&self, r: f64, dt: f64) -> f64 {
        match *self {
            Compounding::Continuous => (-r*dt).exp(),
            Compounding::Simple => 1.0/(1.0 + r*dt),
        }
    }
}

/// Per-step parameters of a recombining binomial tree.
///
/// # Fields
/// * `tree_type` - CRR or RB (user-supplied)
/// * `r` - interest rate (user-supplied)
/// * `t` - time to expiry in years (user-supplied)
/// * `steps` - number of periods N (user-supplied)
/// * `compounding` - discounting convention (user-supplied)
/// * `dt` - duration of one period, t/N (calculated)
/// * `up` - up move factor u (user-supplied or calculated)
/// * `down` - down move factor d (calculated)
/// * `p` - risk-neutral probability of an up move (calculated)
/// * `implied_vol` - volatility p.a. consistent with u (user-supplied or
///   calculated)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LatticeParameters {
    tree_type: TreeType,
    r: f64,
    t: f64,
    steps: usize,
    compounding: Compounding,
    dt: f64,
    up: f64,
    down: f64,
    p: f64,
    implied_vol: f64,
}

fn require_finite(name: &'static str, x: f64) -> LatticeResult<f64> {
    if x.is_finite() {
        Ok(x)
    } else {
        Err(LatticeError::invalid(name, x, "must be a finite number"))
    }
}

impl LatticeParameters {
    /// Derives (u, d, p, dt) with continuous discounting.
    ///
    /// # Arguments
    /// * `tree_type` - CRR or RB
    /// * `movement` - either the up factor u or the implied volatility
    /// * `r` - interest rate
    /// * `t` - time to expiry in years
    /// * `steps` - number of periods
    ///
    /// # Example
    /// ```
    /// use rustq_binomial::params::*;
    ///
    /// let params = LatticeParameters::new(TreeType::CRR,
    ///     Movement::Volatility(0.3), 0.08, 0.3333, 4).unwrap();
    /// assert!((params.up() - 1.09046).abs() < 1e-5);
    /// ```
    pub fn new(tree_type: TreeType, movement: Movement, r: f64, t: f64,
        steps: usize) -> LatticeResult<LatticeParameters> {
        LatticeParameters::with_compounding(tree_type, movement, r, t, steps,
            Compounding::Continuous)
    }

    /// Same as new() but with an explicit discounting convention
    pub fn with_compounding(tree_type: TreeType, movement: Movement, r: f64,
        t: f64, steps: usize, compounding: Compounding)
        -> LatticeResult<LatticeParameters> {
        if steps < 1 {
            return Err(LatticeError::invalid("steps", steps,
                "must be at least 1"));
        }
        let r = require_finite("r", r)?;
        if !(require_finite("t", t)? > 0.0) {
            return Err(LatticeError::invalid("t", t, "must be positive"));
        }
        if compounding == Compounding::Simple && !(r * t / steps as f64 > -1.0) {
            return Err(LatticeError::invalid("r", r,
                "simple discounting requires 1 + r dt > 0"));
        }

        let dt = t/steps as f64;
        let (up, implied_vol) = match movement {
            Movement::Volatility(v) => {
                let v = require_finite("sigma", v)?;
                if v < 0.0 {
                    return Err(LatticeError::invalid("sigma", v,
                        "volatility cannot be negative"));
                }
                (LatticeParameters::up_from_vol(tree_type, v, r, dt), v)
            },
            Movement::Up(u) => {
                let u = require_finite("u", u)?;
                if u <= 0.0 {
                    return Err(LatticeError::invalid("u", u,
                        "cannot be zero or negative"));
                }
                (u, LatticeParameters::implied_vol_from_up(tree_type, u, r, dt)?)
            },
        };

        let down = match tree_type {
            TreeType::CRR => 1.0/up,
            TreeType::RB => {
                let sd = implied_vol * dt.sqrt();
                ((r - 0.5*implied_vol*implied_vol)*dt - sd).exp()
            }
        };
        if !(up > down) {
            return Err(LatticeError::invalid("u", up,
                format!("up factor must exceed the down factor {}", down)));
        }

        let growth = 1.0/compounding.discount(r, dt);
        let p = match tree_type {
            TreeType::CRR => (growth - down)/(up - down),
            TreeType::RB => 0.5,
        };
        if !(0.0..=1.0).contains(&p) {
            return Err(LatticeError::invalid("p", p,
                format!("risk-neutral probability outside [0, 1] \
                    (u = {}, d = {}, growth = {}), arbitrage violated",
                    up, down, growth)));
        }

        debug!("{:?} parameters: u = {}, d = {}, p = {}, dt = {}, vol = {}",
            tree_type, up, down, p, dt, implied_vol);

        Ok(LatticeParameters {
            tree_type: tree_type, r: r, t: t, steps: steps,
            compounding: compounding, dt: dt, up: up, down: down, p: p,
            implied_vol: implied_vol,
        })
    }

    /// Up factor implied by a volatility
    pub fn up_from_vol(tree_type: TreeType, v: f64, r: f64, dt: f64) -> f64 {
        match tree_type {
            TreeType::CRR => (v*dt.sqrt()).exp(),
            TreeType::RB => ((r - 0.5*v*v)*dt + v*dt.sqrt()).exp(),
        }
    }

    /// Volatility consistent with an up factor.  For CRR this is
    /// ln(u)/sqrt(dt).  For RB it is the smaller root of
    ///
    /// ln(u) = (r - v^2/2) dt + v sqrt(dt)
    ///
    /// which only exists for exp(r dt) <= u <= exp(r dt + 1/2)
    pub fn implied_vol_from_up(tree_type: TreeType, u: f64, r: f64, dt: f64)
        -> LatticeResult<f64> {
        match tree_type {
            TreeType::CRR => Ok(u.ln()/dt.sqrt()),
            TreeType::RB => {
                let x = u.ln() - r*dt;
                let discriminant = 1.0 - 2.0*x;
                if discriminant < 0.0 {
                    return Err(LatticeError::invalid("u", u,
                        format!("too large for a Rendleman-Bartter tree, \
                            must not exceed {}", (r*dt + 0.5).exp())));
                }
                let v = (1.0 - discriminant.sqrt())/dt.sqrt();
                if v < 0.0 {
                    return Err(LatticeError::invalid("u", u,
                        format!("implies a negative volatility, must be at \
                            least {}", (r*dt).exp())));
                }
                Ok(v)
            }
        }
    }

    /// Smallest up factor that still yields an arbitrage-free tree.  For CRR
    /// p in [0, 1] requires 1/u <= growth <= u; for RB the implied volatility
    /// must be positive, i.e. u > exp(r dt)
    pub fn min_up(tree_type: TreeType, r: f64, dt: f64,
        compounding: Compounding) -> f64 {
        match tree_type {
            TreeType::CRR => {
                let growth = 1.0/compounding.discount(r, dt);
                growth.max(1.0/growth)
            },
            TreeType::RB => (r*dt).exp(),
        }
    }

    pub fn tree_type(&self) -> TreeType { self.tree_type }
    pub fn rate(&self) -> f64 { self.r }
    pub fn time_to_expiry(&self) -> f64 { self.t }
    pub fn steps(&self) -> usize { self.steps }
    pub fn compounding(&self) -> Compounding { self.compounding }
    pub fn dt(&self) -> f64 { self.dt }
    pub fn up(&self) -> f64 { self.up }
    pub fn down(&self) -> f64 { self.down }
    pub fn p(&self) -> f64 { self.p }
    pub fn implied_vol(&self) -> f64 { self.implied_vol }

    /// Discount factor over one period
    pub fn discount(&self) -> f64 {
        self.compounding.discount(self.r, self.dt)
    }

    /// Discount factor from expiry back to time 0
    pub fn total_discount(&self) -> f64 {
        self.discount().powi(self.steps as i32)
    }
}

#[cfg(test)]
mod test {
    use rand::{Rng, SeedableRng};
    use rand::rngs::StdRng;

    use crate::error::LatticeError;
    use crate::params::*;
    use crate::util::equal_within;

    fn invalid_name(e: LatticeError) -> &'static str {
        match e {
            LatticeError::InvalidParameter { name, .. } => name,
            other => panic!("unexpected error {:?}", other),
        }
    }

    #[test]
    fn crr_from_volatility() {
        let params = LatticeParameters::new(TreeType::CRR,
            Movement::Volatility(0.3), 0.08, 0.3333, 4).unwrap();
        assert!(equal_within(params.dt(), 0.083325, 1e-12));
        assert!(equal_within(params.up(), 1.0904584565402229, 1e-12));
        assert!(equal_within(params.down(), 1.0/params.up(), 1e-15));
        assert!(equal_within(params.p(), 0.5169324028684026, 1e-12));
        assert!(equal_within(params.implied_vol(), 0.3, 1e-15));
    }

    #[test]
    fn crr_martingale_condition() {
        let params = LatticeParameters::new(TreeType::CRR,
            Movement::Up(1.1), 0.05, 1.0, 10).unwrap();
        let expected_growth = params.p()*params.up() +
            (1.0 - params.p())*params.down();
        assert!(equal_within(expected_growth, (0.05*0.1f64).exp(), 1e-14));
        assert!(equal_within(params.implied_vol(),
            1.1f64.ln()/0.1f64.sqrt(), 1e-14));
    }

    #[test]
    fn rb_from_volatility() {
        let (r, v, t, n) = (0.05, 0.2, 1.0, 8);
        let params = LatticeParameters::new(TreeType::RB,
            Movement::Volatility(v), r, t, n).unwrap();
        let dt = t/n as f64;
        assert_eq!(params.p(), 0.5);
        assert!(equal_within(params.up(),
            ((r - 0.5*v*v)*dt + v*dt.sqrt()).exp(), 1e-15));
        assert!(equal_within(params.down(),
            ((r - 0.5*v*v)*dt - v*dt.sqrt()).exp(), 1e-15));
    }

    #[test]
    fn rb_implied_vol_inverts_up_factor() {
        let (r, v, t, n) = (0.03, 0.35, 0.5, 20);
        let dt = t/n as f64;
        let u = LatticeParameters::up_from_vol(TreeType::RB, v, r, dt);
        let params = LatticeParameters::new(TreeType::RB, Movement::Up(u),
            r, t, n).unwrap();
        assert!(equal_within(params.implied_vol(), v, 1e-12));
        let from_vol = LatticeParameters::new(TreeType::RB,
            Movement::Volatility(v), r, t, n).unwrap();
        assert!(equal_within(params.down(), from_vol.down(), 1e-14));
    }

    #[test]
    fn rb_rejects_up_factor_out_of_range() {
        let too_small = LatticeParameters::new(TreeType::RB, Movement::Up(1.0),
            0.05, 1.0, 4).unwrap_err();
        assert_eq!(invalid_name(too_small), "u");
        let too_large = LatticeParameters::new(TreeType::RB, Movement::Up(3.0),
            0.05, 1.0, 4).unwrap_err();
        assert_eq!(invalid_name(too_large), "u");
    }

    #[test]
    fn invalid_inputs() {
        let e = LatticeParameters::new(TreeType::CRR, Movement::Volatility(0.3),
            0.05, 1.0, 0).unwrap_err();
        assert_eq!(invalid_name(e), "steps");
        let e = LatticeParameters::new(TreeType::CRR, Movement::Volatility(-0.1),
            0.05, 1.0, 4).unwrap_err();
        assert_eq!(invalid_name(e), "sigma");
        let e = LatticeParameters::new(TreeType::CRR, Movement::Up(-1.1),
            0.05, 1.0, 4).unwrap_err();
        assert_eq!(invalid_name(e), "u");
        let e = LatticeParameters::new(TreeType::CRR, Movement::Volatility(0.3),
            0.05, 0.0, 4).unwrap_err();
        assert_eq!(invalid_name(e), "t");
        let e = LatticeParameters::new(TreeType::CRR, Movement::Volatility(0.3),
            f64::NAN, 1.0, 4).unwrap_err();
        assert_eq!(invalid_name(e), "r");
    }

    #[test]
    fn arbitrage_violation_is_rejected() {
        // growth over one step exceeds u, so p > 1
        let e = LatticeParameters::new(TreeType::CRR, Movement::Up(1.0001),
            0.08, 1.0, 4).unwrap_err();
        assert_eq!(invalid_name(e), "p");
        // u below one behaves like a down move
        let e = LatticeParameters::new(TreeType::CRR, Movement::Up(0.9),
            0.0, 1.0, 4).unwrap_err();
        assert_eq!(invalid_name(e), "u");
    }

    #[test]
    fn zero_volatility_is_degenerate() {
        assert!(LatticeParameters::new(TreeType::CRR, Movement::Volatility(0.0),
            0.05, 1.0, 4).is_err());
        assert!(LatticeParameters::new(TreeType::RB, Movement::Volatility(0.0),
            0.05, 1.0, 4).is_err());
    }

    #[test]
    fn simple_compounding() {
        let params = LatticeParameters::with_compounding(TreeType::CRR,
            Movement::Volatility(0.3), 0.08, 1.0, 4, Compounding::Simple)
            .unwrap();
        assert!(equal_within(params.discount(), 1.0/1.02, 1e-15));
        let growth = params.p()*params.up() + (1.0 - params.p())*params.down();
        assert!(equal_within(growth, 1.02, 1e-14));
        assert!(equal_within(params.total_discount(), 1.02f64.powi(-4), 1e-15));
    }

    #[test]
    fn min_up_is_admissible() {
        let (r, t, n) = (0.08, 0.3333, 4);
        let dt = t/n as f64;
        for &tree_type in &[TreeType::CRR, TreeType::RB] {
            let u = LatticeParameters::min_up(tree_type, r, dt,
                Compounding::Continuous) * (1.0 + 1e-6);
            assert!(LatticeParameters::new(tree_type, Movement::Up(u), r, t, n)
                .is_ok());
        }
    }

    #[test]
    fn crr_probability_always_in_unit_interval() {
        let mut rng = StdRng::seed_from_u64(42);
        for _ in 0..2000 {
            let u: f64 = rng.gen_range(0.5..3.0);
            let r: f64 = rng.gen_range(-0.05..0.3);
            let t: f64 = rng.gen_range(0.01..5.0);
            let n: usize = rng.gen_range(1..200);
            match LatticeParameters::new(TreeType::CRR, Movement::Up(u), r, t, n) {
                Ok(params) => {
                    assert!(params.p() >= 0.0 && params.p() <= 1.0);
                    let growth = (r*params.dt()).exp();
                    assert!(params.down() <= growth && growth <= params.up());
                },
                Err(e) => {
                    let name = invalid_name(e);
                    assert!(name == "p" || name == "u");
                    let growth = (r*t/n as f64).exp();
                    assert!(u <= 1.0 || growth > u || growth < 1.0/u);
                }
            }
        }
    }
}
