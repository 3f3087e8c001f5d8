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
use probability::distribution::{Distribution, Gaussian};

use crate::error::{LatticeError, LatticeResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OptionType {
    Call,
    Put
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExerciseType {
    European,
    American
}

/// Terms of a vanilla option
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OptionContract {
    pub strike: f64,
    pub exercise: ExerciseType,
    pub opt_type: OptionType,
}

impl OptionContract {
    /// Creates a contract, rejecting a strike that is not positive
    pub fn new(strike: f64, exercise: ExerciseType, opt_type: OptionType)
        -> LatticeResult<OptionContract> {
        if !strike.is_finite() || strike <= 0.0 {
            return Err(LatticeError::invalid("strike", strike,
                "must be positive"));
        }
        Ok(OptionContract { strike: strike, exercise: exercise,
            opt_type: opt_type })
    }

    pub fn european(strike: f64, opt_type: OptionType)
        -> LatticeResult<OptionContract> {
        OptionContract::new(strike, ExerciseType::European, opt_type)
    }

    pub fn american(strike: f64, opt_type: OptionType)
        -> LatticeResult<OptionContract> {
        OptionContract::new(strike, ExerciseType::American, opt_type)
    }

    /// The same strike and option type with another exercise style
    pub fn with_exercise(&self, exercise: ExerciseType) -> OptionContract {
        OptionContract { exercise: exercise, ..*self }
    }

    /// Value of exercising immediately at the given underlying price
    pub fn intrinsic(&self, underlying_price: f64) -> f64 {
        intrinsic(self.opt_type, underlying_price, self.strike)
    }
}

/// Payoff of a vanilla call or put, never negative
pub fn intrinsic(opt_type: OptionType, underlying_price: f64, strike: f64)
    -> f64 {
    let intrinsic = underlying_price - strike;
    match opt_type {
        OptionType::Call => intrinsic.max(0.0),
        OptionType::Put => (-intrinsic).max(0.0)
    }
}

/// Calculate vanilla option price using the Black-Scholes equation
/// #Argument
/// * `s0` - initial stock price at time 0
/// * `r` - interest rate
/// * `q` - convenience yield (absorbs any cost or yield of holding the asset)
/// * `v` - volatility e.g. 0.4 is 40 vol points (per annum)
/// * `t` - number of years e.g. 0.25 is quarter of a year
/// * `opt_type` - option type
/// * `k` - strike price
///
/// #Example
/// ```
/// let call = rustq_binomial::option::black_scholes( 100.0, 0.02, 0.0, 0.4,
///     0.25, rustq_binomial::option::OptionType::Call, 100.0);
/// println!( "price: {}", call);
/// ```
pub fn black_scholes(s0:f64, r:f64, q:f64, v: f64, t:f64, opt_type:OptionType,
    k:f64) -> f64 {
    let normal = Gaussian::new(0.0, 1.0);
    let f = s0 * ((r-q)*t).exp();
    let d1 = 1.0 / v / t.sqrt() * ( (s0/k).ln() + (r-q+0.5*v*v)*t);
    let d2 = d1 - v*t.sqrt();
    match opt_type {
        OptionType::Call =>
            (-r*t).exp()*(f*normal.distribution(d1)-k*normal.distribution(d2)),
        OptionType::Put =>
            (-r*t).exp()*(k*normal.distribution(-d2)-f*normal.distribution(-d1))
    }
}

#[cfg(test)]
mod test {
    use crate::option::*;
    use crate::util::equal_within;

    #[test]
    fn put_call_parity() {
        let s0 = 100.0;
        let r = 0.02;
        let q = 0.01;
        let v = 0.4;
        let t = 0.25;
        let k = s0;
        let call = black_scholes(s0, r, q, v, t, OptionType::Call, k);
        let put = black_scholes(s0, r, q, v, t, OptionType::Put, k);
        assert!(equal_within(put + s0 * (-q*t as f64).exp(),
            call + k * (-r*t as f64).exp(), 0.0000001));
    }

    #[test]
    fn known_value() {
        // 300 spot, 250 strike, 1y, 3%, 15% vol
        let call = black_scholes(300.0, 0.03, 0.0, 0.15, 1.0, OptionType::Call,
            250.0);
        assert!(equal_within(call, 58.8197, 1e-4));
    }

    #[test]
    fn intrinsic_values() {
        let call = OptionContract::european(100.0, OptionType::Call).unwrap();
        let put = call.with_exercise(ExerciseType::American);
        assert_eq!(put.exercise, ExerciseType::American);
        assert_eq!(call.intrinsic(120.0), 20.0);
        assert_eq!(call.intrinsic(80.0), 0.0);
        assert_eq!(intrinsic(OptionType::Put, 80.0, 100.0), 20.0);
        assert_eq!(intrinsic(OptionType::Put, 120.0, 100.0), 0.0);
    }

    #[test]
    fn strike_must_be_positive() {
        assert!(OptionContract::american(0.0, OptionType::Put).is_err());
        assert!(OptionContract::american(f64::NAN, OptionType::Put).is_err());
    }
}
