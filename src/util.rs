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
pub fn equal_within(x: f64, y:f64, e: f64) -> bool {
    (x-y).abs() < e
}

/// Relative comparison, falling back to an absolute one near zero
pub fn relative_equal_within(x: f64, y: f64, e: f64) -> bool {
    let scale = x.abs().max(y.abs()).max(1.0);
    (x-y).abs() <= e * scale
}

/// Returns the probability of ending at each terminal node of an n-period
/// recombining tree, ordered by the number of down moves j = 0..n, i.e.
///
/// C(n, j) * p^(n-j) * (1-p)^j
///
/// The binomial coefficients are accumulated in log space so that large n
/// does not overflow.  A zero exponent always contributes a factor of one,
/// which keeps the degenerate cases p = 0 and p = 1 well defined.
pub fn terminal_probabilities(n: usize, p: f64) -> Vec<f64> {
    let ln_p = p.ln();
    let ln_q = (1.0-p).ln();
    let ln_pow = |count: usize, ln_x: f64| {
        if count == 0 { 0.0 } else { count as f64 * ln_x }
    };
    let mut ln_choose = 0.0;
    let mut probs = Vec::with_capacity(n+1);
    for j in 0..(n+1) {
        if j > 0 {
            ln_choose += ((n - j + 1) as f64).ln() - (j as f64).ln();
        }
        probs.push((ln_choose + ln_pow(n-j, ln_p) + ln_pow(j, ln_q)).exp());
    }
    probs
}
