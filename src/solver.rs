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
//! Bracketing root finders.  The calibration routines only rely on the
//! `RootFinder` contract: given a continuous scalar function and an interval
//! on whose end points it changes sign, return a root or fail.
use thiserror::Error;

/// Default tolerance for root finding
pub const DEFAULT_TOLERANCE: f64 = 1e-10;

/// Default iteration budget for root finding
pub const DEFAULT_MAX_ITERATIONS: u32 = 100;

/// Errors raised by the root finders
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SolverError {
    #[error("Invalid bracket: f({a}) = {fa:.2e} and f({b}) = {fb:.2e} have same sign")]
    InvalidBracket { a: f64, b: f64, fa: f64, fb: f64 },

    #[error("Convergence failed after {iterations} iterations (residual: {residual:.2e})")]
    ConvergenceFailed { iterations: u32, residual: f64 },
}

/// Tolerance and iteration budget of a root finder
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SolverConfig {
    pub tolerance: f64,
    pub max_iterations: u32,
}

impl Default for SolverConfig {
    fn default() -> Self {
        SolverConfig {
            tolerance: DEFAULT_TOLERANCE,
            max_iterations: DEFAULT_MAX_ITERATIONS,
        }
    }
}

impl SolverConfig {
    pub fn new(tolerance: f64, max_iterations: u32) -> SolverConfig {
        SolverConfig { tolerance: tolerance, max_iterations: max_iterations }
    }

    pub fn with_tolerance(mut self, tolerance: f64) -> SolverConfig {
        self.tolerance = tolerance;
        self
    }

    pub fn with_max_iterations(mut self, max_iterations: u32) -> SolverConfig {
        self.max_iterations = max_iterations;
        self
    }
}

/// Root found by a solver together with the iterations it took
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SolverResult {
    pub root: f64,
    pub iterations: u32,
    pub residual: f64,
}

/// Bracketing root finder.  `f(lo)` and `f(hi)` must have opposite signs (or
/// one of them must be zero).
pub trait RootFinder {
    fn solve<F>(&self, f: F, lo: f64, hi: f64, config: &SolverConfig)
        -> Result<SolverResult, SolverError>
    where F: FnMut(f64) -> f64;

    fn name(&self) -> &'static str;
}

/// Brent's method: inverse quadratic interpolation and secant steps,
/// falling back to bisection whenever the interpolated point is not
/// acceptable
#[derive(Debug, Clone, Copy, Default)]
pub struct Brent;

/// Plain bisection
#[derive(Debug, Clone, Copy, Default)]
pub struct Bisection;

fn check_bracket(a: f64, b: f64, fa: f64, fb: f64) -> Result<(), SolverError> {
    if !(fa * fb <= 0.0) {
        return Err(SolverError::InvalidBracket { a: a, b: b, fa: fa, fb: fb });
    }
    Ok(())
}

impl RootFinder for Brent {
    #[allow(clippy::many_single_char_names)]
    fn solve<F>(&self, mut f: F, lo: f64, hi: f64, config: &SolverConfig)
        -> Result<SolverResult, SolverError>
    where F: FnMut(f64) -> f64
    {
        let mut a = lo;
        let mut b = hi;
        let mut fa = f(a);
        let mut fb = f(b);
        check_bracket(a, b, fa, fb)?;

        if fa.abs() < fb.abs() {
            std::mem::swap(&mut a, &mut b);
            std::mem::swap(&mut fa, &mut fb);
        }

        let mut c = a;
        let mut fc = fa;
        let mut d = b - a;
        let mut e = d;

        for iteration in 0..config.max_iterations {
            if fb.abs() < config.tolerance || (b - a).abs() < config.tolerance {
                return Ok(SolverResult {
                    root: b, iterations: iteration, residual: fb });
            }

            let mut use_bisection = true;
            let mut s = 0.0;
            let m = 0.5 * (a + b);

            if (fa - fc).abs() > 1e-15 && (fb - fc).abs() > 1e-15 {
                // inverse quadratic interpolation
                let r = fb / fc;
                let p = fa / fc;
                let q = fa / fb;
                s = b - (q * (q - r) * (b - a) + (1.0 - r) * (b - c) * p)
                    / ((q - 1.0) * (r - 1.0) * (p - 1.0));
            } else if (fb - fa).abs() > 1e-15 {
                s = b - fb * (b - a) / (fb - fa);
            }
            if s > m.min(b) && s < m.max(b) && (s - b).abs() < e.abs() / 2.0 {
                use_bisection = false;
            }

            if use_bisection {
                s = m;
                e = b - a;
                d = e;
            } else {
                e = d;
                d = s - b;
            }

            c = b;
            fc = fb;

            let fs = f(s);
            if fa * fs < 0.0 {
                b = s;
                fb = fs;
            } else {
                a = s;
                fa = fs;
            }

            if fa.abs() < fb.abs() {
                std::mem::swap(&mut a, &mut b);
                std::mem::swap(&mut fa, &mut fb);
            }
        }

        Err(SolverError::ConvergenceFailed {
            iterations: config.max_iterations, residual: fb.abs() })
    }

    fn name(&self) -> &'static str {
        "Brent"
    }
}

impl RootFinder for Bisection {
    fn solve<F>(&self, mut f: F, lo: f64, hi: f64, config: &SolverConfig)
        -> Result<SolverResult, SolverError>
    where F: FnMut(f64) -> f64
    {
        let mut a = lo;
        let mut b = hi;
        let mut fa = f(a);
        let fb = f(b);
        check_bracket(a, b, fa, fb)?;
        if fa == 0.0 {
            return Ok(SolverResult { root: a, iterations: 0, residual: fa });
        }
        if fb == 0.0 {
            return Ok(SolverResult { root: b, iterations: 0, residual: fb });
        }

        for iteration in 0..config.max_iterations {
            let m = 0.5 * (a + b);
            let fm = f(m);
            if fm.abs() < config.tolerance || 0.5 * (b - a).abs() < config.tolerance {
                return Ok(SolverResult {
                    root: m, iterations: iteration + 1, residual: fm });
            }
            if fa * fm < 0.0 {
                b = m;
            } else {
                a = m;
                fa = fm;
            }
        }

        Err(SolverError::ConvergenceFailed {
            iterations: config.max_iterations, residual: fa.abs() })
    }

    fn name(&self) -> &'static str {
        "Bisection"
    }
}

#[cfg(test)]
mod test {
    use crate::solver::*;
    use crate::util::equal_within;

    #[test]
    fn brent_sqrt_2() {
        let result = Brent.solve(|x| x * x - 2.0, 1.0, 2.0,
            &SolverConfig::default()).unwrap();
        assert!(equal_within(result.root, 2f64.sqrt(), 1e-10));
        assert!(result.iterations < 20);
    }

    #[test]
    fn brent_reversed_bracket() {
        let result = Brent.solve(|x| x.sin(), 4.0, 3.0,
            &SolverConfig::default()).unwrap();
        assert!(equal_within(result.root, std::f64::consts::PI, 1e-10));
    }

    #[test]
    fn brent_counts_its_evaluations_through_fnmut() {
        let mut calls = 0;
        let result = Brent.solve(|x| { calls += 1; x * x * x - x - 2.0 },
            1.0, 2.0, &SolverConfig::default()).unwrap();
        assert!(equal_within(result.root, 1.521_379_706_804_568, 1e-9));
        assert!(calls >= 2);
    }

    #[test]
    fn invalid_bracket() {
        let result = Brent.solve(|x| x * x - 2.0, 2.0, 3.0,
            &SolverConfig::default());
        match result {
            Err(SolverError::InvalidBracket { a, b, .. }) => {
                assert_eq!(a, 2.0);
                assert_eq!(b, 3.0);
            },
            other => panic!("unexpected result {:?}", other),
        }
        assert!(Bisection.solve(|x| x * x - 2.0, 2.0, 3.0,
            &SolverConfig::default()).is_err());
    }

    #[test]
    fn nan_objective_is_not_a_bracket() {
        let result = Brent.solve(|_| f64::NAN, 0.0, 1.0,
            &SolverConfig::default());
        assert!(result.is_err());
    }

    #[test]
    fn iteration_budget_exhausted() {
        let config = SolverConfig::default().with_max_iterations(3)
            .with_tolerance(1e-15);
        let result = Bisection.solve(|x| x - 0.3, 0.0, 1.0, &config);
        assert_eq!(result, Err(SolverError::ConvergenceFailed {
            iterations: 3, residual: (0.25f64 - 0.3).abs() }));
    }

    #[test]
    fn bisection_converges() {
        let result = Bisection.solve(|x| x * x - 2.0, 1.0, 2.0,
            &SolverConfig::default()).unwrap();
        assert!(equal_within(result.root, 2f64.sqrt(), 1e-9));
        assert_eq!(Bisection.name(), "Bisection");
        assert_eq!(Brent.name(), "Brent");
    }
}
