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
use thiserror::Error;

use crate::solver::SolverError;

/// Result type used throughout the crate
pub type LatticeResult<T> = Result<T, LatticeError>;

/// Errors raised while building lattices, valuing options on them or
/// calibrating them to market prices.  Nothing is retried internally; the
/// caller gets the error together with the offending input.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum LatticeError {
    /// Malformed or contradictory lattice, dividend or contract input
    #[error("Invalid parameter `{name}` = {value}: {reason}")]
    InvalidParameter {
        /// Name of the offending parameter
        name: &'static str,
        /// The rejected value, formatted
        value: String,
        /// Why it was rejected
        reason: String,
    },

    /// The requested method does not apply to the contract, e.g. the
    /// terminal shortcut on an American option
    #[error("Unsupported operation: {0}")]
    UnsupportedOperation(String),

    /// The calibration objective has no sign change on the bracket, or the
    /// root finder ran out of iterations
    #[error("Calibration failed after {iterations} iterations: {reason}")]
    CalibrationFailure {
        /// What went wrong
        reason: String,
        /// Iterations spent before giving up
        iterations: u32,
    },
}

impl LatticeError {
    /// Shorthand for an `InvalidParameter` error
    pub fn invalid<V: ToString>(name: &'static str, value: V,
        reason: impl Into<String>) -> LatticeError {
        LatticeError::InvalidParameter {
            name,
            value: value.to_string(),
            reason: reason.into(),
        }
    }

    /// Shorthand for an `UnsupportedOperation` error
    pub fn unsupported(what: impl Into<String>) -> LatticeError {
        LatticeError::UnsupportedOperation(what.into())
    }

    /// Shorthand for a `CalibrationFailure` error
    pub fn calibration(reason: impl Into<String>, iterations: u32)
        -> LatticeError {
        LatticeError::CalibrationFailure {
            reason: reason.into(),
            iterations,
        }
    }
}

impl From<SolverError> for LatticeError {
    fn from(e: SolverError) -> LatticeError {
        let iterations = match e {
            SolverError::ConvergenceFailed { iterations, .. } => iterations,
            SolverError::InvalidBracket { .. } => 0,
        };
        LatticeError::calibration(e.to_string(), iterations)
    }
}
