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
//! Calibration of the up factor u to an observed option price.
//!
//! The objective f(u) = value(u) - market price is handed to a bracketing
//! root finder.  Every evaluation rebuilds the parameters and the lattice
//! from scratch; nothing is mutated between iterations.
use std::cell::RefCell;
use std::thread;

use log::{debug, info, trace};

use crate::builder::{LatticeBuilder, ResolvedInputs};
use crate::error::{LatticeError, LatticeResult};
use crate::lattice::{DividendSpec, UnderlyingLattice};
use crate::option::{ExerciseType, OptionContract, OptionType};
use crate::params::{LatticeParameters, Movement, TreeType};
use crate::solver::{Brent, RootFinder, SolverConfig};
use crate::valuation::{AmericanOption, EuropeanOption};

/// Lower end of the default brackets
pub const DEFAULT_LOWER_U: f64 = 1.0001;
/// Upper end of the default CRR bracket
pub const DEFAULT_UPPER_U_CRR: f64 = 10.0;
/// Upper end of the default RB bracket.  RB up and down factors are closer
/// together and a wider bracket tends to lose the sign change
pub const DEFAULT_UPPER_U_RB: f64 = 1.05;

/// Relative margin kept above the smallest arbitrage-free u, and above the
/// dividend at the ex-dividend step
const MIN_UP_MARGIN: f64 = 1e-6;

/// Halvings used to locate the largest u admissible with a dollar dividend
const MAX_CAP_BISECTIONS: u32 = 100;

/// An observed option price and the terms of the option
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MarketQuote {
    pub price: f64,
    pub contract: OptionContract,
}

impl MarketQuote {
    pub fn new(price: f64, contract: OptionContract) -> MarketQuote {
        MarketQuote { price: price, contract: contract }
    }
}

/// Outcome of a calibration.  A failed calibration is an error, so
/// `converged` is always true on a returned result
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CalibrationResult {
    pub optimal_u: f64,
    pub implied_vol: f64,
    pub converged: bool,
    pub iterations: u32,
    /// Model value minus market price at optimal_u
    pub residual: f64,
    /// Lattice parameters at optimal_u
    pub parameters: LatticeParameters,
}

/// Finds the u that reproduces a market price.
///
/// # Example
/// ```
/// use rustq_binomial::builder::LatticeBuilder;
/// use rustq_binomial::calibration::*;
/// use rustq_binomial::option::*;
///
/// let template = LatticeBuilder::years(300.0, 0.08, 0.3333).steps(4);
/// let contract = OptionContract::european(300.0, OptionType::Call).unwrap();
/// let result = Calibrator::new()
///     .calibrate(&MarketQuote::new(23.377924012466625, contract), &template)
///     .unwrap();
/// assert!((result.implied_vol - 0.3).abs() < 1e-8);
/// ```
#[derive(Debug, Clone, Default)]
pub struct Calibrator<S: RootFinder = Brent> {
    solver: S,
    config: SolverConfig,
    bracket: Option<(f64, f64)>,
}

impl Calibrator<Brent> {
    pub fn new() -> Calibrator<Brent> {
        Calibrator::default()
    }
}

impl<S: RootFinder> Calibrator<S> {
    /// Searches u on [lo, hi] instead of the default bracket
    pub fn with_bracket(mut self, lo: f64, hi: f64) -> Calibrator<S> {
        self.bracket = Some((lo, hi));
        self
    }

    pub fn with_config(mut self, config: SolverConfig) -> Calibrator<S> {
        self.config = config;
        self
    }

    pub fn with_solver<T: RootFinder>(self, solver: T) -> Calibrator<T> {
        Calibrator { solver: solver, config: self.config, bracket: self.bracket }
    }

    pub fn config(&self) -> &SolverConfig { &self.config }

    /// [1.0001, 10] for CRR and [1.0001, 1.05] for RB
    pub fn default_bracket(tree_type: TreeType) -> (f64, f64) {
        match tree_type {
            TreeType::CRR => (DEFAULT_LOWER_U, DEFAULT_UPPER_U_CRR),
            TreeType::RB => (DEFAULT_LOWER_U, DEFAULT_UPPER_U_RB),
        }
    }

    /// The bracket searched for a lattice.  A user bracket is taken as is.
    /// The lower end of the default bracket is raised above the smallest
    /// arbitrage-free u when it falls below it; with a dollar dividend the
    /// upper end is lowered until the lowest price at the ex-dividend step
    /// stays above the dividend
    pub fn bracket_for(&self, inputs: &ResolvedInputs) -> (f64, f64) {
        if let Some(bracket) = self.bracket {
            return bracket;
        }
        let (lo, hi) = Calibrator::<S>::default_bracket(inputs.tree_type);
        let dt = inputs.t / inputs.steps as f64;
        let min_up = LatticeParameters::min_up(inputs.tree_type, inputs.r, dt,
            inputs.compounding) * (1.0 + MIN_UP_MARGIN);
        let lo = lo.max(min_up);
        (lo, max_up_with_dividend(inputs, lo, hi))
    }

    /// Calibrates u so that the lattice described by `template` (whose
    /// movement, if any, is ignored) prices the quoted option at the market
    /// price.  European options are valued with the terminal shortcut,
    /// American options by backward induction
    pub fn calibrate(&self, quote: &MarketQuote, template: &LatticeBuilder)
        -> LatticeResult<CalibrationResult> {
        let inputs = template.resolve()?;
        let (lo, hi) = self.bracket_for(&inputs);
        let objective = |u: f64| -> LatticeResult<f64> {
            let lattice = inputs.lattice(Movement::Up(u))?;
            let value = model_value(&lattice, &quote.contract)?;
            trace!("Calibration objective: u = {}, value = {}, market = {}",
                u, value, quote.price);
            Ok(value - quote.price)
        };

        let end_point = |u: f64| objective(u).map_err(|e| LatticeError::calibration(
            format!("objective undefined at bracket end u = {}: {}", u, e), 0));
        let f_lo = end_point(lo)?;
        let f_hi = end_point(hi)?;
        if !(f_lo * f_hi <= 0.0) {
            return Err(LatticeError::calibration(format!(
                "no sign change on [{}, {}]: value - market = {} and {}, \
                market price {} is out of reach", lo, hi, f_lo, f_hi,
                quote.price), 0));
        }

        let failure = RefCell::new(None);
        let solved = self.solver.solve(|u| {
            match objective(u) {
                Ok(diff) => diff,
                Err(e) => {
                    failure.borrow_mut().get_or_insert(e);
                    f64::NAN
                },
            }
        }, lo, hi, &self.config);
        if let Some(e) = failure.into_inner() {
            return Err(LatticeError::calibration(format!(
                "objective undefined inside [{}, {}]: {}", lo, hi, e), 0));
        }
        let solved = solved?;

        let parameters = inputs.parameters(Movement::Up(solved.root))?;
        info!("Calibrated {:?} {:?} {:?} K = {} to {}: u = {}, vol = {} after \
            {} iterations ({})", parameters.tree_type(),
            quote.contract.exercise, quote.contract.opt_type,
            quote.contract.strike, quote.price, solved.root,
            parameters.implied_vol(), solved.iterations, self.solver.name());
        Ok(CalibrationResult {
            optimal_u: solved.root,
            implied_vol: parameters.implied_vol(),
            converged: true,
            iterations: solved.iterations,
            residual: solved.residual,
            parameters: parameters,
        })
    }
}

impl<S: RootFinder + Sync> Calibrator<S> {
    /// Runs independent calibrations on scoped threads, one chunk of jobs per
    /// CPU.  Results come back in the order of the jobs
    pub fn calibrate_batch(&self, jobs: &[(MarketQuote, LatticeBuilder)])
        -> Vec<LatticeResult<CalibrationResult>> {
        if jobs.is_empty() {
            return Vec::new();
        }
        let chunk_size = (jobs.len() + num_cpus::get() - 1) / num_cpus::get();
        thread::scope(|scope| {
            let handles: Vec<_> = jobs.chunks(chunk_size.max(1)).map(|chunk| {
                (chunk.len(), scope.spawn(move || {
                    chunk.iter()
                        .map(|(quote, template)| self.calibrate(quote, template))
                        .collect::<Vec<_>>()
                }))
            }).collect();
            handles.into_iter().flat_map(|(len, handle)| {
                handle.join().unwrap_or_else(|_| vec![Err(LatticeError::calibration(
                    "calibration thread panicked", 0)); len])
            }).collect()
        })
    }
}

/// Largest u in [lo, hi] for which the lowest price at the ex-dividend
/// step, s0 * d^k, exceeds the dollar dividend D.  For CRR this is just below
/// (s0/D)^(1/k); the search bisects on the lattice parameters so that RB,
/// whose d also depends on the implied volatility, is covered too.  Returns
/// hi when it is admissible, when there is no dollar dividend or when even
/// lo is not admissible, leaving the failure to the bracket end evaluation
fn max_up_with_dividend(inputs: &ResolvedInputs, lo: f64, hi: f64) -> f64 {
    let (amount, step) = match inputs.dividend {
        Some(DividendSpec { amount: Some(amount), ex_div_step: Some(step), .. })
            if amount > 0.0 => (amount, step),
        _ => return hi,
    };
    let admissible = |u: f64| match inputs.parameters(Movement::Up(u)) {
        Ok(params) => inputs.s0 * params.down().powi(step as i32)
            > amount * (1.0 + MIN_UP_MARGIN),
        Err(_) => false,
    };
    if admissible(hi) || !admissible(lo) {
        return hi;
    }
    let (mut good, mut bad) = (lo, hi);
    for _ in 0..MAX_CAP_BISECTIONS {
        let mid = 0.5 * (good + bad);
        if admissible(mid) { good = mid; } else { bad = mid; }
    }
    debug!("Upper end of the bracket lowered from {} to {} for a dividend of \
        {} at step {}", hi, good, amount, step);
    good
}

/// Value of the quoted side of a contract on a lattice
fn model_value(lattice: &UnderlyingLattice, contract: &OptionContract)
    -> LatticeResult<f64> {
    Ok(match contract.exercise {
        ExerciseType::European => EuropeanOption::new(lattice, contract.strike)?
            .fast_put_call().value(contract.opt_type),
        ExerciseType::American => {
            let option = AmericanOption::new(lattice, contract.strike)?;
            match contract.opt_type {
                OptionType::Call => option.call(),
                OptionType::Put => option.put(),
            }
        },
    })
}
