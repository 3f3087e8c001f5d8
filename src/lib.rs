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
//! Option pricing on recombining binomial lattices: Cox-Ross-Rubinstein and
//! Rendleman-Bartter trees with a dollar dividend or a continuous yield,
//! European and American valuation, calibration of the up factor to market
//! prices and deAmericanization of American quotes.
pub mod error;
pub mod util;
pub mod params;
pub mod lattice;
pub mod option;
pub mod valuation;
pub mod solver;
pub mod calibration;
pub mod deamerican;
pub mod calendar;
pub mod builder;
