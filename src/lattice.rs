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
use std::fmt;

use log::{debug, warn};

use crate::error::{LatticeError, LatticeResult};
use crate::params::LatticeParameters;
use crate::util::terminal_probabilities;

/// Dividend input as supplied by the caller.  A dollar amount and a
/// continuous yield are mutually exclusive; setting both is rejected when the
/// lattice is built.
///
/// # Fields
/// * `amount` - known dollar dividend
/// * `yield_rate` - continuous dividend yield p.a.
/// * `ex_div_step` - the step at which the dollar dividend goes ex
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct DividendSpec {
    pub amount: Option<f64>,
    pub yield_rate: Option<f64>,
    pub ex_div_step: Option<usize>,
}

impl DividendSpec {
    /// A known dollar dividend going ex at step `ex_div_step`
    pub fn discrete(amount: f64, ex_div_step: usize) -> DividendSpec {
        DividendSpec {
            amount: Some(amount), yield_rate: None,
            ex_div_step: Some(ex_div_step),
        }
    }

    /// A continuous dividend yield
    pub fn continuous(yield_rate: f64) -> DividendSpec {
        DividendSpec {
            amount: None, yield_rate: Some(yield_rate), ex_div_step: None,
        }
    }

    /// Validates the dividend inputs against an N-step tree
    pub fn resolve(&self, steps: usize) -> LatticeResult<Option<Dividend>> {
        match (self.amount, self.yield_rate) {
            (Some(amount), Some(q)) => Err(LatticeError::invalid("yield_rate", q,
                format!("a dollar dividend of {} is already set, the two are \
                    mutually exclusive", amount))),
            (Some(amount), None) => {
                if !amount.is_finite() || amount < 0.0 {
                    return Err(LatticeError::invalid("amount", amount,
                        "must be a finite non-negative number"));
                }
                let step = match self.ex_div_step {
                    Some(step) => step,
                    None => return Err(LatticeError::invalid("ex_div_step",
                        "None", "a dollar dividend needs an ex-dividend step")),
                };
                if step == 0 || step >= steps {
                    return Err(LatticeError::invalid("ex_div_step", step,
                        format!("must lie strictly between 0 and {}", steps)));
                }
                Ok(Some(Dividend::Discrete { amount: amount, ex_div_step: step }))
            },
            (None, Some(q)) => {
                if !q.is_finite() || q < 0.0 {
                    return Err(LatticeError::invalid("yield_rate", q,
                        "must be a finite non-negative number"));
                }
                Ok(Some(Dividend::Yield { rate: q }))
            },
            (None, None) => Ok(None),
        }
    }
}

/// A validated dividend treatment
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Dividend {
    Discrete { amount: f64, ex_div_step: usize },
    Yield { rate: f64 },
}

/// Recombining binomial tree of the underlying asset price.  Node (i, j) is
/// the node in the i-th period after j down moves, so period i holds the
/// nodes (i, 0), (i, 1), ..., (i, i) ordered from the highest price to the
/// lowest.  The prices are stored period by period in one vector, the index
/// of node (i, j) being i(i+1)/2 + j.
///
/// # Fields
/// * `s0` - initial asset price at node 0 (user-supplied)
/// * `params` - per-step parameters of the tree (user-supplied)
/// * `dividend` - validated dividend treatment (user-supplied)
/// * `asset_prices` - price at each node (calculated)
#[derive(Debug, Clone, PartialEq)]
pub struct UnderlyingLattice {
    s0: f64,
    params: LatticeParameters,
    dividend: Option<Dividend>,
    asset_prices: Vec<f64>,
}

impl UnderlyingLattice {
    /// Calculates the number of nodes in the recombining tree given the
    /// number of periods.  A 1-period tree has 3 nodes, the initial node
    /// leading to an up node and a down node
    pub fn calc_num_nodes(period: usize) -> usize {
        (period+1)*(period+2)/2
    }

    /// Converts node index (i, j) to the index in the vector storing the
    /// node prices
    pub fn to_index(i: usize, j: usize) -> usize {
        i*(i+1)/2 + j
    }

    /// Iterates through the node indices (i, j) of the periods start to end
    /// (inclusive) in storage order, passing each to a mutable closure
    pub fn iter_nodes<F>(start: usize, end: usize, f: &mut F)
    where F: FnMut((usize, usize))
    {
        for i in start..(end+1) {
            for j in 0..(i+1) {
                f((i, j));
            }
        }
    }

    /// Builds the price tree.
    ///
    /// * Without dividend, price(i, j) = s0 * u^(i-j) * d^j
    /// * A continuous yield q scales every price in period i by
    ///   exp(-q dt i)
    /// * A dollar dividend D going ex at step k leaves the periods before k
    ///   untouched and lowers every price in period k by D.  Beyond k the
    ///   tree would no longer recombine, so each later node is snapped to
    ///   the nearest price of a recombining tree rooted at the spot less the
    ///   present value of the dividend
    ///
    /// # Example
    /// ```
    /// use rustq_binomial::params::*;
    /// use rustq_binomial::lattice::*;
    ///
    /// let params = LatticeParameters::new(TreeType::CRR,
    ///     Movement::Volatility(0.3), 0.08, 0.3333, 4).unwrap();
    /// let lattice = UnderlyingLattice::new(300.0, params, None).unwrap();
    /// assert!((lattice.get_asset_price(4, 0) - 424.187).abs() < 1e-3);
    /// ```
    pub fn new(s0: f64, params: LatticeParameters,
        dividend: Option<DividendSpec>) -> LatticeResult<UnderlyingLattice> {
        if !s0.is_finite() || s0 <= 0.0 {
            return Err(LatticeError::invalid("s0", s0, "must be positive"));
        }
        let dividend = match dividend {
            Some(spec) => spec.resolve(params.steps())?,
            None => None,
        };
        let mut lattice = UnderlyingLattice {
            s0: s0, params: params, dividend: dividend,
            asset_prices: Vec::with_capacity(
                UnderlyingLattice::calc_num_nodes(params.steps())),
        };
        lattice.build()?;
        Ok(lattice)
    }

    fn build(&mut self) -> LatticeResult<()> {
        let n = self.params.steps();
        let up = self.params.up();
        let down = self.params.down();
        let s0 = self.s0;
        let undiminished = |i: usize, j: usize| {
            s0 * up.powi((i-j) as i32) * down.powi(j as i32)
        };

        match self.dividend {
            None => {
                let prices = &mut self.asset_prices;
                UnderlyingLattice::iter_nodes(0, n, &mut |(i, j)| {
                    prices.push(undiminished(i, j));
                });
            },
            Some(Dividend::Yield { rate }) => {
                let dt = self.params.dt();
                let prices = &mut self.asset_prices;
                UnderlyingLattice::iter_nodes(0, n, &mut |(i, j)| {
                    prices.push(undiminished(i, j) * (-rate*dt*i as f64).exp());
                });
            },
            Some(Dividend::Discrete { amount, ex_div_step }) => {
                let k = ex_div_step;
                let lowest = undiminished(k, k) - amount;
                if lowest <= 0.0 {
                    return Err(LatticeError::invalid("amount", amount,
                        format!("exceeds the lowest price {} at the \
                            ex-dividend step", undiminished(k, k))));
                }
                let anchor = s0 - amount * self.params.discount().powi(k as i32);
                if anchor <= 0.0 {
                    return Err(LatticeError::invalid("amount", amount,
                        "present value exceeds the spot price"));
                }
                let regenerated = |i: usize, m: usize| {
                    anchor * up.powi((i-m) as i32) * down.powi(m as i32)
                };
                // index of the regenerated price in period i closest to x
                let nearest = |i: usize, x: f64| -> usize {
                    if x <= 0.0 {
                        return i;
                    }
                    let guess = ((anchor.ln() + i as f64 * up.ln() - x.ln())
                        / (up.ln() - down.ln())).round();
                    let guess = guess.max(0.0).min(i as f64) as usize;
                    let lo = guess.saturating_sub(1);
                    let hi = (guess+1).min(i);
                    (lo..(hi+1)).fold(guess, |best, m| {
                        if (regenerated(i, m) - x).abs()
                            < (regenerated(i, best) - x).abs() { m } else { best }
                    })
                };

                let mut collapsed = 0;
                let prices = &mut self.asset_prices;
                UnderlyingLattice::iter_nodes(0, n, &mut |(i, j)| {
                    let price = if i < k {
                        undiminished(i, j)
                    } else if i == k {
                        undiminished(i, j) - amount
                    } else {
                        // the dividend grows along the path which takes as
                        // many of its down moves as possible before step k
                        let b = j.saturating_sub(k);
                        let a = (i-k) - b;
                        let natural = undiminished(i, j) -
                            amount * up.powi(a as i32) * down.powi(b as i32);
                        let m = nearest(i, natural);
                        if j > 0 && prices.last() == Some(&regenerated(i, m)) {
                            collapsed += 1;
                        }
                        regenerated(i, m)
                    };
                    prices.push(price);
                });

                debug!("Dollar dividend {} at step {} snapped onto a tree \
                    rooted at {}", amount, k, anchor);
                if collapsed > 0 {
                    warn!("Forced recombination collapsed {} post-dividend \
                        nodes onto a neighbouring price", collapsed);
                }
            },
        }

        debug!("Built {:?} lattice: s0 = {}, steps = {}, nodes = {}",
            self.params.tree_type(), self.s0, n, self.asset_prices.len());
        Ok(())
    }

    /// Returns the underlying asset price at node (i, j)
    pub fn get_asset_price(&self, i: usize, j: usize) -> f64 {
        self.asset_prices[UnderlyingLattice::to_index(i, j)]
    }

    /// The prices of the period i nodes, ordered by number of down moves
    pub fn period_prices(&self, i: usize) -> &[f64] {
        let start = UnderlyingLattice::to_index(i, 0);
        &self.asset_prices[start..(start+i+1)]
    }

    /// The prices of the nodes at expiry
    pub fn terminal_prices(&self) -> &[f64] {
        self.period_prices(self.params.steps())
    }

    pub fn spot(&self) -> f64 { self.s0 }
    pub fn params(&self) -> &LatticeParameters { &self.params }
    pub fn steps(&self) -> usize { self.params.steps() }
    pub fn dividend(&self) -> Option<Dividend> { self.dividend }
    pub fn num_nodes(&self) -> usize { self.asset_prices.len() }

    /// Expected asset price at expiry under the risk-neutral probability of
    /// the tree, discounted to time 0.  Equals s0 for an undiminished CRR
    /// tree and s0 * exp(-qT) with a continuous yield
    pub fn discounted_forward(&self) -> f64 {
        let probs = terminal_probabilities(self.steps(), self.params.p());
        let expected: f64 = probs.iter().zip(self.terminal_prices().iter())
            .map(|(p, s)| p * s)
            .sum();
        expected * self.params.total_discount()
    }

    /// (N+1) x (N+1) snapshot of the tree for rendering, row i holding the
    /// prices of period i and zero in the unused cells
    pub fn to_grid(&self) -> Vec<Vec<f64>> {
        let n = self.steps();
        (0..(n+1)).map(|i| {
            let mut row = vec![0.0; n+1];
            row[..(i+1)].copy_from_slice(self.period_prices(i));
            row
        }).collect()
    }
}

impl fmt::Display for UnderlyingLattice {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        writeln!(f, "UNDERLYING ASSET SUMMARY")?;
        writeln!(f, "+--------------------------------+")?;
        writeln!(f, "Spot price:      ${:.2}", self.s0)?;
        writeln!(f, "Time to expiry:  {:.4} years", self.params.time_to_expiry())?;
        writeln!(f, "Interest rate:   {:.2}%", self.params.rate()*100.0)?;
        writeln!(f, "Implied vol:     {:.2}%", self.params.implied_vol()*100.0)?;
        writeln!(f, "Tree:            {:?}, {} steps", self.params.tree_type(),
            self.steps())?;
        match self.dividend {
            Some(Dividend::Discrete { amount, ex_div_step }) =>
                write!(f, "Dollar dividend: ${:.2} at step {}", amount,
                    ex_div_step),
            Some(Dividend::Yield { rate }) =>
                write!(f, "Dividend yield:  {:.2}%", rate*100.0),
            None => write!(f,
                "No dividend payment expected during the course of the contract."),
        }
    }
}
