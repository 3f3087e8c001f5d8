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
//! DeAmericanization: the European price equivalent to an observed American
//! price.
//!
//! The American quote is calibrated to an up factor, the lattice is rebuilt
//! with that up factor and the same dividend treatment, and the European
//! option of the same strike and side is valued on it.  The early exercise
//! premium is the American market price less that European value.
use log::{debug, warn};

use crate::builder::LatticeBuilder;
use crate::calibration::{CalibrationResult, Calibrator, MarketQuote};
use crate::error::{LatticeError, LatticeResult};
use crate::lattice::UnderlyingLattice;
use crate::option::ExerciseType;
use crate::params::Movement;
use crate::solver::{Brent, RootFinder};
use crate::valuation::{AmericanOption, EuropeanOption};

/// Result of deAmericanizing a quote
#[derive(Debug, Clone, PartialEq)]
pub struct DeAmericanization {
    pub calibration: CalibrationResult,
    /// The observed American price
    pub american_price: f64,
    /// Model value of the American option at the calibrated u
    pub american_value: f64,
    /// Pseudo-European price
    pub european_value: f64,
    /// American market price less the European value.  Not sign-checked:
    /// dividends can make it negative
    pub early_exercise_premium: f64,
    /// Lattice rebuilt with the calibrated u
    pub lattice: UnderlyingLattice,
}

/// Converts American quotes into European prices
#[derive(Debug, Clone, Default)]
pub struct DeAmericanizer<S: RootFinder = Brent> {
    calibrator: Calibrator<S>,
}

impl DeAmericanizer<Brent> {
    pub fn new() -> DeAmericanizer<Brent> {
        DeAmericanizer::default()
    }
}

impl<S: RootFinder> DeAmericanizer<S> {
    pub fn with_calibrator(calibrator: Calibrator<S>) -> DeAmericanizer<S> {
        DeAmericanizer { calibrator: calibrator }
    }

    pub fn calibrator(&self) -> &Calibrator<S> { &self.calibrator }

    /// # Example
    /// ```
    /// use rustq_binomial::builder::LatticeBuilder;
    /// use rustq_binomial::calibration::MarketQuote;
    /// use rustq_binomial::deamerican::DeAmericanizer;
    /// use rustq_binomial::option::*;
    ///
    /// let template = LatticeBuilder::years(300.0, 0.08, 0.3333).steps(4);
    /// let contract = OptionContract::american(300.0, OptionType::Put).unwrap();
    /// let result = DeAmericanizer::new()
    ///     .deamericanize(&MarketQuote::new(16.870619315536985, contract),
    ///         &template)
    ///     .unwrap();
    /// assert!((result.european_value - 15.4844).abs() < 1e-4);
    /// assert!(result.early_exercise_premium > 0.0);
    /// ```
    pub fn deamericanize(&self, quote: &MarketQuote, template: &LatticeBuilder)
        -> LatticeResult<DeAmericanization> {
        if quote.contract.exercise != ExerciseType::American {
            return Err(LatticeError::unsupported(
                "deAmericanization of a European quote"));
        }
        let calibration = self.calibrator.calibrate(quote, template)?;
        let lattice = template.resolve()?
            .lattice(Movement::Up(calibration.optimal_u))?;

        let strike = quote.contract.strike;
        let opt_type = quote.contract.opt_type;
        let european_value = EuropeanOption::new(&lattice, strike)?
            .fast_put_call().value(opt_type);
        let (american_value, _) = AmericanOption::new(&lattice, strike)?
            .value_with_boundary(opt_type);
        let early_exercise_premium = quote.price - european_value;

        debug!("DeAmericanized {:?} K = {} at {}: European {}, model American \
            {}", opt_type, strike, quote.price, european_value, american_value);
        if early_exercise_premium < 0.0 {
            warn!("Negative early exercise premium {} for {:?} K = {}: \
                American price {} below European value {}",
                early_exercise_premium, opt_type, strike, quote.price,
                european_value);
        }

        Ok(DeAmericanization {
            calibration: calibration,
            american_price: quote.price,
            american_value: american_value,
            european_value: european_value,
            early_exercise_premium: early_exercise_premium,
            lattice: lattice,
        })
    }
}

/// DeAmericanizes a quote with the default calibrator
pub fn deamericanize(quote: &MarketQuote, template: &LatticeBuilder)
    -> LatticeResult<DeAmericanization> {
    DeAmericanizer::new().deamericanize(quote, template)
}

#[cfg(test)]
mod test {
    use crate::deamerican::*;
    use crate::option::{OptionContract, OptionType};
    use crate::util::equal_within;

    #[test]
    fn reference_put() {
        let template = LatticeBuilder::years(300.0, 0.08, 0.3333).steps(4);
        let contract = OptionContract::american(300.0, OptionType::Put).unwrap();
        let result = deamericanize(
            &MarketQuote::new(16.870619315536985, contract), &template).unwrap();
        assert!(equal_within(result.calibration.optimal_u, 1.0904584565402229,
            1e-6));
        assert!(equal_within(result.european_value, 15.484427768048148, 1e-6));
        assert!(equal_within(result.early_exercise_premium,
            16.870619315536985 - 15.484427768048148, 1e-6));
        assert_eq!(result.lattice.steps(), 4);
    }

    #[test]
    fn premium_is_american_less_european_on_calibrated_lattice() {
        let template = LatticeBuilder::years(50.0, 0.06, 1.0).steps(20)
            .dividend(1.0, 10);
        // near the largest admissible u the snapped nodes jump between
        // prices, keep the search where the value is smooth
        let deamericanizer = DeAmericanizer::with_calibrator(
            Calibrator::new().with_bracket(1.02, 1.15));
        for &(price, opt_type, strike) in [
            (4.5, OptionType::Put, 52.0),
            (3.2, OptionType::Call, 50.0),
            (7.8, OptionType::Put, 55.0),
        ].iter() {
            let contract = OptionContract::american(strike, opt_type).unwrap();
            let result = deamericanizer.deamericanize(
                &MarketQuote::new(price, contract), &template).unwrap();
            let european = EuropeanOption::new(&result.lattice, strike).unwrap();
            let american = AmericanOption::new(&result.lattice, strike).unwrap();
            let (e, a) = match opt_type {
                OptionType::Call => (european.call(), american.call()),
                OptionType::Put => (european.put(), american.put()),
            };
            assert!(equal_within(result.european_value, e, 1e-9));
            assert!(equal_within(result.american_value, a, 1e-9));
            assert!(equal_within(result.american_value, price, 1e-6));
            assert!(equal_within(result.early_exercise_premium, a - e, 1e-6));
            assert!(result.early_exercise_premium >= -1e-8);
        }
    }

    #[test]
    fn dollar_dividend_with_default_bracket() {
        let template = LatticeBuilder::years(300.0, 0.08, 0.3333).steps(4)
            .dividend(5.0, 2);
        let contract = OptionContract::american(300.0, OptionType::Put).unwrap();
        let result = deamericanize(
            &MarketQuote::new(19.990572311697875, contract), &template).unwrap();
        assert!(equal_within(result.calibration.optimal_u, 1.0904584565402229,
            1e-6));
        assert!(equal_within(result.european_value, 18.40846648071235, 1e-6));
        assert!(equal_within(result.early_exercise_premium,
            19.990572311697875 - 18.40846648071235, 1e-6));
        assert_eq!(result.lattice.dividend(),
            Some(crate::lattice::Dividend::Discrete { amount: 5.0,
                ex_div_step: 2 }));
    }

    #[test]
    fn yield_is_kept_on_rebuild() {
        let template = LatticeBuilder::years(100.0, 0.03, 0.75).steps(40)
            .dividend_yield(0.04);
        let contract = OptionContract::american(100.0, OptionType::Call).unwrap();
        let result = DeAmericanizer::new()
            .deamericanize(&MarketQuote::new(7.0, contract), &template).unwrap();
        assert_eq!(result.lattice.dividend(),
            Some(crate::lattice::Dividend::Yield { rate: 0.04 }));
        assert!(result.early_exercise_premium > 0.0);
    }

    #[test]
    fn european_quote_is_unsupported() {
        let template = LatticeBuilder::years(300.0, 0.08, 0.3333);
        let contract = OptionContract::european(300.0, OptionType::Put).unwrap();
        match deamericanize(&MarketQuote::new(15.0, contract), &template) {
            Err(LatticeError::UnsupportedOperation(_)) => (),
            other => panic!("unexpected result {:?}", other),
        }
    }

    #[test]
    fn calibration_failure_propagates() {
        let template = LatticeBuilder::years(300.0, 0.08, 0.3333);
        let contract = OptionContract::american(300.0, OptionType::Put).unwrap();
        let result = DeAmericanizer::with_calibrator(
            Calibrator::new().with_bracket(1.2, 1.3))
            .deamericanize(&MarketQuote::new(16.87, contract), &template);
        assert!(matches!(result, Err(LatticeError::CalibrationFailure { .. })));
    }
}
