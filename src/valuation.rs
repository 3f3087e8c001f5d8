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
//! Option values on an underlying lattice.
//!
//! European options are valued either by full backward induction, which
//! materializes the tree of option values, or by the terminal shortcut
//! (`fast_put_call`) which discounts the risk-neutral expectation of the
//! terminal call payoffs directly and obtains the put through put-call
//! parity.  American options always need backward induction because the
//! early exercise decision is taken at every node.
use std::cell::OnceCell;

use crate::error::{LatticeError, LatticeResult};
use crate::lattice::UnderlyingLattice;
use crate::option::{intrinsic, ExerciseType, OptionContract, OptionType};
use crate::util::terminal_probabilities;

/// The node value function decides the value of a node given its intrinsic
/// value and its induced value, i.e. the discounted risk-neutral expectation
/// of the values of its up node and down node.  It returns the node value
/// and whether the option is exercised at that node.  This is where an
/// early exercise policy is specified
pub type NodeValueFunc = Box<dyn Fn(f64, f64) -> (f64, bool)>;

/// Node value function of an option which can only be exercised at expiry:
/// the node value is simply the induced value
pub fn hold_to_expiry() -> NodeValueFunc {
    Box::new(|_, induced_value| (induced_value, false))
}

/// Node value function of an option which can be exercised at any node:
/// the node value is the larger of the intrinsic and the induced value, and
/// the node is an exercise node whenever exercising is worth something and
/// at least as much as holding on
pub fn early_exercise() -> NodeValueFunc {
    Box::new(|intrinsic, induced_value| {
        if intrinsic > 0.0 && intrinsic >= induced_value {
            (intrinsic, true)
        } else {
            (induced_value, false)
        }
    })
}

/// Option values of every node of a lattice, stored in the same order as
/// the asset prices of `UnderlyingLattice`, together with the nodes at which
/// the option is exercised
#[derive(Debug, Clone, PartialEq)]
pub struct OptionTree {
    steps: usize,
    values: Vec<f64>,
    exercised: Vec<bool>,
}

impl OptionTree {
    /// Values the option on the lattice by backward induction.  The terminal
    /// nodes take the payoff (and count as exercised when in the money);
    /// each earlier node takes whatever the node value function makes of
    ///
    /// V(i, j) = disc * [ p * V(i+1, j) + (1-p) * V(i+1, j+1) ]
    pub fn induce(lattice: &UnderlyingLattice, strike: f64,
        opt_type: OptionType, node_value: &NodeValueFunc) -> OptionTree {
        let n = lattice.steps();
        let p = lattice.params().p();
        let discount = lattice.params().discount();
        let num_nodes = UnderlyingLattice::calc_num_nodes(n);
        let mut values = vec![0.0; num_nodes];
        let mut exercised = vec![false; num_nodes];

        let terminal = UnderlyingLattice::to_index(n, 0);
        for (j, &price) in lattice.terminal_prices().iter().enumerate() {
            let payoff = intrinsic(opt_type, price, strike);
            values[terminal + j] = payoff;
            exercised[terminal + j] = payoff > 0.0;
        }

        // (0..n).rev() runs from n-1 down to 0 inclusive
        for i in (0..n).rev() {
            // nodes of the same period are consecutive, so walk the index
            // instead of calling to_index for every node
            let mut index = UnderlyingLattice::to_index(i, 0);
            for j in 0..(i+1) {
                let up_index = index + i + 1;
                let down_index = up_index + 1;
                let induced_value = discount *
                    (p * values[up_index] + (1.0 - p) * values[down_index]);
                let payoff =
                    intrinsic(opt_type, lattice.get_asset_price(i, j), strike);
                let (value, exercise) = node_value(payoff, induced_value);
                values[index] = value;
                exercised[index] = exercise;
                index += 1;
            }
        }

        OptionTree { steps: n, values: values, exercised: exercised }
    }

    pub fn steps(&self) -> usize { self.steps }

    /// Option value at node (i, j)
    pub fn value(&self, i: usize, j: usize) -> f64 {
        self.values[UnderlyingLattice::to_index(i, j)]
    }

    /// Whether the option is exercised at node (i, j)
    pub fn is_exercised(&self, i: usize, j: usize) -> bool {
        self.exercised[UnderlyingLattice::to_index(i, j)]
    }

    /// Option value at time 0
    pub fn root_value(&self) -> f64 {
        self.values[0]
    }

    /// (N+1) x (N+1) snapshot for rendering, row i holding period i
    pub fn to_grid(&self) -> Vec<Vec<f64>> {
        (0..(self.steps+1)).map(|i| {
            let start = UnderlyingLattice::to_index(i, 0);
            let mut row = vec![0.0; self.steps+1];
            row[..(i+1)].copy_from_slice(&self.values[start..(start+i+1)]);
            row
        }).collect()
    }
}

/// Per-period price level separating the exercise region from the hold
/// region of an American option.  For a call it is the lowest price at which
/// the option is exercised, for a put the highest.  A period without any
/// exercise node has no level.  Monotonicity across periods is not enforced.
#[derive(Debug, Clone, PartialEq)]
pub struct ExerciseBoundary {
    levels: Vec<Option<f64>>,
}

impl ExerciseBoundary {
    /// Reads the boundary off an induced option tree
    pub fn from_tree(lattice: &UnderlyingLattice, tree: &OptionTree,
        opt_type: OptionType) -> ExerciseBoundary {
        let levels = (0..(tree.steps()+1)).map(|i| {
            let prices = lattice.period_prices(i).iter().enumerate()
                .filter(|&(j, _)| tree.is_exercised(i, j))
                .map(|(_, &price)| price);
            match opt_type {
                OptionType::Call => prices.fold(None, |acc: Option<f64>, s| {
                    Some(acc.map_or(s, |a| a.min(s)))
                }),
                OptionType::Put => prices.fold(None, |acc: Option<f64>, s| {
                    Some(acc.map_or(s, |a| a.max(s)))
                }),
            }
        }).collect();
        ExerciseBoundary { levels: levels }
    }

    /// Boundary level in period i
    pub fn level(&self, i: usize) -> Option<f64> {
        self.levels.get(i).cloned().flatten()
    }

    pub fn levels(&self) -> &[Option<f64>] {
        &self.levels
    }

    /// The earliest period containing an exercise node
    pub fn first_exercise_step(&self) -> Option<usize> {
        self.levels.iter().position(|level| level.is_some())
    }
}

/// Exercise boundaries of the call and the put of an American valuation
#[derive(Debug, Clone, PartialEq)]
pub struct ExerciseBoundaries {
    pub call: ExerciseBoundary,
    pub put: ExerciseBoundary,
}

/// Call and put values of a contract's strike on one lattice
#[derive(Debug, Clone, PartialEq)]
pub struct ValuationResult {
    pub call_value: f64,
    pub put_value: f64,
    /// Only present for American options
    pub exercise_boundary: Option<ExerciseBoundaries>,
}

impl ValuationResult {
    pub fn value(&self, opt_type: OptionType) -> f64 {
        match opt_type {
            OptionType::Call => self.call_value,
            OptionType::Put => self.put_value,
        }
    }
}

fn check_strike(strike: f64) -> LatticeResult<f64> {
    if !strike.is_finite() || strike <= 0.0 {
        return Err(LatticeError::invalid("strike", strike, "must be positive"));
    }
    Ok(strike)
}

/// European call and put with a common strike on a lattice
#[derive(Debug, Clone, Copy)]
pub struct EuropeanOption<'a> {
    lattice: &'a UnderlyingLattice,
    strike: f64,
}

impl<'a> EuropeanOption<'a> {
    /// # Example
    /// ```
    /// use rustq_binomial::params::*;
    /// use rustq_binomial::lattice::*;
    /// use rustq_binomial::valuation::*;
    ///
    /// let params = LatticeParameters::new(TreeType::CRR,
    ///     Movement::Volatility(0.3), 0.08, 0.3333, 4).unwrap();
    /// let lattice = UnderlyingLattice::new(300.0, params, None).unwrap();
    /// let result = EuropeanOption::new(&lattice, 300.0).unwrap()
    ///     .fast_put_call();
    /// assert!((result.call_value - 23.3779).abs() < 1e-4);
    /// assert!((result.put_value - 15.4844).abs() < 1e-4);
    /// ```
    pub fn new(lattice: &'a UnderlyingLattice, strike: f64)
        -> LatticeResult<EuropeanOption<'a>> {
        Ok(EuropeanOption { lattice: lattice, strike: check_strike(strike)? })
    }

    pub fn strike(&self) -> f64 { self.strike }

    /// Full backward induction of the call
    pub fn call_tree(&self) -> OptionTree {
        OptionTree::induce(self.lattice, self.strike, OptionType::Call,
            &hold_to_expiry())
    }

    /// Full backward induction of the put
    pub fn put_tree(&self) -> OptionTree {
        OptionTree::induce(self.lattice, self.strike, OptionType::Put,
            &hold_to_expiry())
    }

    pub fn call(&self) -> f64 {
        self.call_tree().root_value()
    }

    pub fn put(&self) -> f64 {
        self.put_tree().root_value()
    }

    /// Both values by full backward induction
    pub fn induce_put_call(&self) -> ValuationResult {
        ValuationResult {
            call_value: self.call(),
            put_value: self.put(),
            exercise_boundary: None,
        }
    }

    /// Both values without building the option tree.  The call is the
    /// discounted expectation of the terminal payoffs,
    ///
    /// C = disc^N * sum_j C(N, j) p^(N-j) (1-p)^j max(S(N, j) - K, 0)
    ///
    /// and the put follows from put-call parity
    pub fn fast_put_call(&self) -> ValuationResult {
        let params = self.lattice.params();
        let probs = terminal_probabilities(params.steps(), params.p());
        let expected_payoff: f64 = probs.iter()
            .zip(self.lattice.terminal_prices().iter())
            .map(|(prob, &price)|
                prob * intrinsic(OptionType::Call, price, self.strike))
            .sum();
        let call_value = expected_payoff * params.total_discount();
        ValuationResult {
            call_value: call_value,
            put_value: self.put_from_call(call_value),
            exercise_boundary: None,
        }
    }

    /// Put-call parity on the lattice:
    ///
    /// P = C - F + K * disc^N
    ///
    /// where F is the discounted expected terminal asset price, which is s0
    /// on an undiminished CRR tree and s0 * exp(-qT) with a yield.  Rounding
    /// can leave a worthless put a few ulps below zero, so the result is
    /// floored at zero
    pub fn put_from_call(&self, call_value: f64) -> f64 {
        let params = self.lattice.params();
        (call_value - self.lattice.discounted_forward() +
            self.strike * params.total_discount()).max(0.0)
    }

    /// The inverse of put_from_call(), floored at zero likewise
    pub fn call_from_put(&self, put_value: f64) -> f64 {
        let params = self.lattice.params();
        (put_value + self.lattice.discounted_forward() -
            self.strike * params.total_discount()).max(0.0)
    }
}

/// American call and put with a common strike on a lattice.  Each needs its
/// own backward pass
#[derive(Debug, Clone, Copy)]
pub struct AmericanOption<'a> {
    lattice: &'a UnderlyingLattice,
    strike: f64,
}

impl<'a> AmericanOption<'a> {
    pub fn new(lattice: &'a UnderlyingLattice, strike: f64)
        -> LatticeResult<AmericanOption<'a>> {
        Ok(AmericanOption { lattice: lattice, strike: check_strike(strike)? })
    }

    pub fn strike(&self) -> f64 { self.strike }

    pub fn call_tree(&self) -> OptionTree {
        OptionTree::induce(self.lattice, self.strike, OptionType::Call,
            &early_exercise())
    }

    pub fn put_tree(&self) -> OptionTree {
        OptionTree::induce(self.lattice, self.strike, OptionType::Put,
            &early_exercise())
    }

    pub fn call(&self) -> f64 {
        self.call_tree().root_value()
    }

    pub fn put(&self) -> f64 {
        self.put_tree().root_value()
    }

    /// Value and exercise boundary of one side
    pub fn value_with_boundary(&self, opt_type: OptionType)
        -> (f64, ExerciseBoundary) {
        let tree = match opt_type {
            OptionType::Call => self.call_tree(),
            OptionType::Put => self.put_tree(),
        };
        let boundary = ExerciseBoundary::from_tree(self.lattice, &tree, opt_type);
        (tree.root_value(), boundary)
    }

    /// Both values and both boundaries
    pub fn value(&self) -> ValuationResult {
        let (call_value, call) = self.value_with_boundary(OptionType::Call);
        let (put_value, put) = self.value_with_boundary(OptionType::Put);
        ValuationResult {
            call_value: call_value,
            put_value: put_value,
            exercise_boundary: Some(ExerciseBoundaries { call: call, put: put }),
        }
    }
}

/// How to value a European option
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EuropeanMethod {
    BackwardInduction,
    #[default]
    Shortcut,
}

/// Values a European contract.  American contracts are rejected since
/// neither method accounts for early exercise
pub fn value_european(lattice: &UnderlyingLattice, contract: &OptionContract,
    method: EuropeanMethod) -> LatticeResult<ValuationResult> {
    if contract.exercise != ExerciseType::European {
        return Err(LatticeError::unsupported(format!(
            "{:?} valuation of an American option, use backward induction \
            with early exercise", method)));
    }
    let option = EuropeanOption::new(lattice, contract.strike)?;
    Ok(match method {
        EuropeanMethod::BackwardInduction => option.induce_put_call(),
        EuropeanMethod::Shortcut => option.fast_put_call(),
    })
}

/// The terminal shortcut for a European contract
pub fn fast_put_call(lattice: &UnderlyingLattice, contract: &OptionContract)
    -> LatticeResult<ValuationResult> {
    value_european(lattice, contract, EuropeanMethod::Shortcut)
}

/// Values an American contract by backward induction with early exercise
pub fn value_american(lattice: &UnderlyingLattice, contract: &OptionContract)
    -> LatticeResult<ValuationResult> {
    if contract.exercise != ExerciseType::American {
        return Err(LatticeError::unsupported(
            "early exercise valuation of a European option"));
    }
    Ok(AmericanOption::new(lattice, contract.strike)?.value())
}

/// Values a contract with the method its exercise style calls for: the
/// shortcut for European options, backward induction for American ones
pub fn value(lattice: &UnderlyingLattice, contract: &OptionContract)
    -> LatticeResult<ValuationResult> {
    match contract.exercise {
        ExerciseType::European => fast_put_call(lattice, contract),
        ExerciseType::American => value_american(lattice, contract),
    }
}

/// A contract priced on a lattice, remembering its valuation.  Both inputs
/// are immutable, so the result is computed at most once; changing the
/// strike or the lattice produces a new, unpriced, PricedOption
#[derive(Debug, Clone)]
pub struct PricedOption<'a> {
    lattice: &'a UnderlyingLattice,
    contract: OptionContract,
    result: OnceCell<ValuationResult>,
}

impl<'a> PricedOption<'a> {
    pub fn new(lattice: &'a UnderlyingLattice, contract: OptionContract)
        -> PricedOption<'a> {
        PricedOption { lattice: lattice, contract: contract,
            result: OnceCell::new() }
    }

    pub fn contract(&self) -> &OptionContract { &self.contract }
    pub fn lattice(&self) -> &'a UnderlyingLattice { self.lattice }

    /// Whether the valuation has been computed already
    pub fn is_priced(&self) -> bool {
        self.result.get().is_some()
    }

    /// Call and put values, computed on first use
    pub fn valuation(&self) -> LatticeResult<&ValuationResult> {
        if let Some(result) = self.result.get() {
            return Ok(result);
        }
        let result = value(self.lattice, &self.contract)?;
        Ok(self.result.get_or_init(|| result))
    }

    /// Value of the side named by the contract
    pub fn value(&self) -> LatticeResult<f64> {
        Ok(self.valuation()?.value(self.contract.opt_type))
    }

    /// Same lattice, different strike
    pub fn with_strike(&self, strike: f64) -> LatticeResult<PricedOption<'a>> {
        let contract = OptionContract::new(strike, self.contract.exercise,
            self.contract.opt_type)?;
        Ok(PricedOption::new(self.lattice, contract))
    }

    /// Same contract, different lattice
    pub fn with_lattice<'b>(&self, lattice: &'b UnderlyingLattice)
        -> PricedOption<'b> {
        PricedOption::new(lattice, self.contract)
    }
}
