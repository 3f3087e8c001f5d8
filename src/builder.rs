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
//! Assembles a lattice from market inputs, in particular from dates: the
//! expiry and the ex-dividend event may be given as calendar dates which are
//! turned into a year fraction and a step by counting trading days.
use time::Date;

use crate::calendar::{parse_date, TradingCalendar, TRADING_DAYS_PER_YEAR};
use crate::error::{LatticeError, LatticeResult};
use crate::lattice::{DividendSpec, UnderlyingLattice};
use crate::params::{Compounding, LatticeParameters, Movement, TreeType};

/// Number of steps when none is given
pub const DEFAULT_STEPS: usize = 4;

/// Time to expiry
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Expiry {
    /// Year fraction
    Years(f64),
    /// Spot and expiry dates, T being the trading days in between over 252
    Dates { spot: Date, expiry: Date },
}

/// How the number of steps is chosen
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepPolicy {
    Fixed(usize),
    /// One step per trading day, only with a date expiry
    TradingDays,
}

/// Everything about a lattice except its up factor, with dates resolved
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedInputs {
    pub s0: f64,
    pub r: f64,
    pub t: f64,
    pub steps: usize,
    pub tree_type: TreeType,
    pub compounding: Compounding,
    pub dividend: Option<DividendSpec>,
}

impl ResolvedInputs {
    /// Lattice parameters for a movement
    pub fn parameters(&self, movement: Movement)
        -> LatticeResult<LatticeParameters> {
        LatticeParameters::with_compounding(self.tree_type, movement, self.r,
            self.t, self.steps, self.compounding)
    }

    /// The lattice for a movement
    pub fn lattice(&self, movement: Movement)
        -> LatticeResult<UnderlyingLattice> {
        UnderlyingLattice::new(self.s0, self.parameters(movement)?,
            self.dividend)
    }
}

/// Step of an event `days` trading days after the spot date on a tree of
/// `steps` steps spanning `total_days` trading days.  With one step per
/// trading day this is `days` itself
fn ex_div_step(days: usize, total_days: usize, steps: usize) -> usize {
    if steps == total_days {
        return days;
    }
    (days as f64 * steps as f64 / total_days as f64).round() as usize
}

/// Builder of an `UnderlyingLattice`.
///
/// # Example
/// ```
/// use rustq_binomial::builder::*;
/// use rustq_binomial::calendar::TradingCalendar;
///
/// let calendar = TradingCalendar::parse(
///     vec!["24-12-2020", "25-12-2020", "31-12-2020", "01-01-2021"], true)
///     .unwrap();
/// let lattice = LatticeBuilder::from_date_strings(100.0, 0.05, "01-12-2020",
///     "10-01-2021", true).unwrap()
///     .calendar(calendar)
///     .trading_day_steps()
///     .volatility(0.25)
///     .build()
///     .unwrap();
/// assert_eq!(lattice.steps(), 25);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct LatticeBuilder {
    s0: f64,
    r: f64,
    expiry: Expiry,
    steps: StepPolicy,
    up: Option<f64>,
    volatility: Option<f64>,
    tree_type: TreeType,
    compounding: Compounding,
    dividend: DividendSpec,
    ex_div_date: Option<Date>,
    calendar: TradingCalendar,
}

impl LatticeBuilder {
    pub fn new(s0: f64, r: f64, expiry: Expiry) -> LatticeBuilder {
        LatticeBuilder {
            s0: s0, r: r, expiry: expiry,
            steps: StepPolicy::Fixed(DEFAULT_STEPS),
            up: None, volatility: None,
            tree_type: TreeType::CRR,
            compounding: Compounding::Continuous,
            dividend: DividendSpec::default(),
            ex_div_date: None,
            calendar: TradingCalendar::weekends_only(),
        }
    }

    /// Expiry as a year fraction
    pub fn years(s0: f64, r: f64, t: f64) -> LatticeBuilder {
        LatticeBuilder::new(s0, r, Expiry::Years(t))
    }

    /// Expiry as dates
    pub fn dates(s0: f64, r: f64, spot: Date, expiry: Date) -> LatticeBuilder {
        LatticeBuilder::new(s0, r, Expiry::Dates { spot: spot, expiry: expiry })
    }

    /// Expiry as date strings, `dd-mm-yyyy` when `day_first`, otherwise
    /// `mm-dd-yyyy`
    pub fn from_date_strings(s0: f64, r: f64, spot: &str, expiry: &str,
        day_first: bool) -> LatticeResult<LatticeBuilder> {
        Ok(LatticeBuilder::dates(s0, r, parse_date(spot, day_first)?,
            parse_date(expiry, day_first)?))
    }

    pub fn steps(mut self, steps: usize) -> LatticeBuilder {
        self.steps = StepPolicy::Fixed(steps);
        self
    }

    pub fn trading_day_steps(mut self) -> LatticeBuilder {
        self.steps = StepPolicy::TradingDays;
        self
    }

    pub fn up(mut self, u: f64) -> LatticeBuilder {
        self.up = Some(u);
        self
    }

    pub fn volatility(mut self, v: f64) -> LatticeBuilder {
        self.volatility = Some(v);
        self
    }

    pub fn tree_type(mut self, tree_type: TreeType) -> LatticeBuilder {
        self.tree_type = tree_type;
        self
    }

    pub fn compounding(mut self, compounding: Compounding) -> LatticeBuilder {
        self.compounding = compounding;
        self
    }

    /// Dollar dividend going ex at a step
    pub fn dividend(mut self, amount: f64, ex_div_step: usize) -> LatticeBuilder {
        self.dividend.amount = Some(amount);
        self.dividend.ex_div_step = Some(ex_div_step);
        self
    }

    /// Dollar dividend going ex on a date.  The trading days from the spot
    /// date are scaled to the step count, so the dividend keeps its place in
    /// time whatever the step policy; a date that rounds onto the first or
    /// the last step is rejected
    pub fn dividend_on(mut self, amount: f64, ex_div_date: Date) -> LatticeBuilder {
        self.dividend.amount = Some(amount);
        self.ex_div_date = Some(ex_div_date);
        self
    }

    /// Continuous dividend yield
    pub fn dividend_yield(mut self, q: f64) -> LatticeBuilder {
        self.dividend.yield_rate = Some(q);
        self
    }

    pub fn calendar(mut self, calendar: TradingCalendar) -> LatticeBuilder {
        self.calendar = calendar;
        self
    }

    pub fn get_tree_type(&self) -> TreeType { self.tree_type }
    pub fn get_expiry(&self) -> Expiry { self.expiry }

    /// The movement given to the builder, u or the volatility but not both
    pub fn movement(&self) -> LatticeResult<Movement> {
        match (self.up, self.volatility) {
            (Some(u), None) => Ok(Movement::Up(u)),
            (None, Some(v)) => Ok(Movement::Volatility(v)),
            (Some(u), Some(v)) => Err(LatticeError::invalid("u", u,
                format!("volatility {} is also given, set exactly one", v))),
            (None, None) => Err(LatticeError::invalid("u", "None",
                "either u or the volatility must be given")),
        }
    }

    /// Turns dates into a year fraction and steps and checks the dividend
    /// inputs, leaving out the movement
    pub fn resolve(&self) -> LatticeResult<ResolvedInputs> {
        let (t, trading_days) = match self.expiry {
            Expiry::Years(t) => (t, None),
            Expiry::Dates { spot, expiry } => {
                let days = self.calendar.trading_days(spot, expiry)?;
                (days as f64 / TRADING_DAYS_PER_YEAR, Some(days))
            },
        };
        let steps = match (self.steps, trading_days) {
            (StepPolicy::Fixed(n), _) => n,
            (StepPolicy::TradingDays, Some(days)) => days,
            (StepPolicy::TradingDays, None) => return Err(LatticeError::invalid(
                "steps", "TradingDays",
                "one step per trading day needs spot and expiry dates")),
        };

        let mut dividend = self.dividend;
        if let Some(date) = self.ex_div_date {
            if let Some(step) = dividend.ex_div_step {
                return Err(LatticeError::invalid("ex_div_date", date,
                    format!("ex-dividend step {} is also given, set exactly \
                        one", step)));
            }
            let (spot, expiry, total_days) = match (self.expiry, trading_days) {
                (Expiry::Dates { spot, expiry }, Some(days)) =>
                    (spot, expiry, days),
                _ => return Err(LatticeError::invalid("ex_div_date", date,
                    "an ex-dividend date needs a spot date")),
            };
            if date <= spot || date >= expiry {
                return Err(LatticeError::invalid("ex_div_date", date,
                    format!("must fall strictly between the spot date {} and \
                        the expiry date {}", spot, expiry)));
            }
            let days = self.calendar.trading_days(spot, date)
                .map_err(|e| LatticeError::invalid("ex_div_date", date,
                    format!("no trading day since the spot date {}: {}",
                        spot, e)))?;
            dividend.ex_div_step = Some(ex_div_step(days, total_days, steps));
        }
        let dividend = if dividend == DividendSpec::default() {
            None
        } else {
            Some(dividend)
        };

        Ok(ResolvedInputs {
            s0: self.s0, r: self.r, t: t, steps: steps,
            tree_type: self.tree_type, compounding: self.compounding,
            dividend: dividend,
        })
    }

    pub fn parameters(&self) -> LatticeResult<LatticeParameters> {
        self.resolve()?.parameters(self.movement()?)
    }

    pub fn build(&self) -> LatticeResult<UnderlyingLattice> {
        let movement = self.movement()?;
        self.resolve()?.lattice(movement)
    }
}

#[cfg(test)]
mod test {
    use time::macros::date;

    use crate::builder::*;
    use crate::error::LatticeError;
    use crate::lattice::Dividend;
    use crate::util::equal_within;

    fn invalid_name(e: LatticeError) -> &'static str {
        match e {
            LatticeError::InvalidParameter { name, .. } => name,
            other => panic!("unexpected error {:?}", other),
        }
    }

    fn christmas() -> TradingCalendar {
        TradingCalendar::new(vec![date!(2020-12-24), date!(2020-12-25),
            date!(2020-12-31), date!(2021-01-01)])
    }

    #[test]
    fn defaults() {
        let lattice = LatticeBuilder::years(300.0, 0.08, 0.3333)
            .volatility(0.3).build().unwrap();
        assert_eq!(lattice.steps(), DEFAULT_STEPS);
        assert_eq!(lattice.params().tree_type(), TreeType::CRR);
        assert_eq!(lattice.params().compounding(), Compounding::Continuous);
        assert_eq!(lattice.dividend(), None);
        assert!(equal_within(lattice.get_asset_price(4, 0), 424.18739003572085,
            1e-9));
    }

    #[test]
    fn date_expiry_counts_trading_days() {
        let builder = LatticeBuilder::dates(100.0, 0.05, date!(2020-12-01),
            date!(2021-01-10)).calendar(christmas()).volatility(0.2);
        let fixed = builder.clone().steps(10).build().unwrap();
        assert_eq!(fixed.steps(), 10);
        assert!(equal_within(fixed.params().time_to_expiry(), 25.0/252.0,
            1e-15));
        let daily = builder.trading_day_steps().build().unwrap();
        assert_eq!(daily.steps(), 25);
        assert!(equal_within(daily.params().dt(), 1.0/252.0, 1e-15));
    }

    #[test]
    fn month_first_strings() {
        let builder = LatticeBuilder::from_date_strings(100.0, 0.05,
            "12-01-2020", "01-10-2021", false).unwrap();
        assert_eq!(builder.get_expiry(), Expiry::Dates {
            spot: date!(2020-12-01), expiry: date!(2021-01-10) });
    }

    #[test]
    fn trading_day_steps_need_dates() {
        let e = LatticeBuilder::years(100.0, 0.05, 1.0).trading_day_steps()
            .volatility(0.2).build().unwrap_err();
        assert_eq!(invalid_name(e), "steps");
    }

    #[test]
    fn exactly_one_movement() {
        let builder = LatticeBuilder::years(100.0, 0.05, 1.0);
        assert_eq!(invalid_name(builder.clone().build().unwrap_err()), "u");
        assert_eq!(invalid_name(builder.clone().up(1.1).volatility(0.2)
            .build().unwrap_err()), "u");
        assert_eq!(builder.up(1.1).movement().unwrap(), Movement::Up(1.1));
    }

    #[test]
    fn ex_dividend_date_resolves_to_step() {
        let lattice = LatticeBuilder::dates(100.0, 0.05, date!(2020-12-01),
            date!(2021-01-10)).calendar(christmas()).trading_day_steps()
            .volatility(0.2).dividend_on(1.0, date!(2020-12-08)).build()
            .unwrap();
        assert_eq!(lattice.dividend(),
            Some(Dividend::Discrete { amount: 1.0, ex_div_step: 5 }));
    }

    #[test]
    fn ex_dividend_date_keeps_its_place_with_fixed_steps() {
        let builder = LatticeBuilder::dates(100.0, 0.05, date!(2020-12-01),
            date!(2021-01-05)).volatility(0.2)
            .dividend_on(1.0, date!(2020-12-22));
        let step = |builder: LatticeBuilder| match builder.build().unwrap()
            .dividend() {
            Some(Dividend::Discrete { ex_div_step, .. }) => ex_div_step,
            other => panic!("unexpected dividend {:?}", other),
        };
        // 15 of 25 trading days
        assert_eq!(step(builder.clone().trading_day_steps()), 15);
        assert_eq!(step(builder.clone().steps(50)), 30);
        assert_eq!(step(builder.clone().steps(5)), 3);
        // rounds onto expiry
        assert_eq!(invalid_name(builder.steps(1).build().unwrap_err()),
            "ex_div_step");
    }

    #[test]
    fn ex_dividend_date_outside_the_contract() {
        let builder = LatticeBuilder::dates(100.0, 0.05, date!(2020-12-01),
            date!(2021-01-05)).volatility(0.2).trading_day_steps();
        for &date in [date!(2020-12-01), date!(2020-11-20), date!(2021-01-05),
            date!(2021-02-01)].iter() {
            let e = builder.clone().dividend_on(1.0, date).build().unwrap_err();
            assert_eq!(invalid_name(e), "ex_div_date");
        }
        // a weekend right after the spot date holds no trading day
        let e = LatticeBuilder::dates(100.0, 0.05, date!(2020-12-05),
            date!(2021-01-05)).volatility(0.2).trading_day_steps()
            .dividend_on(1.0, date!(2020-12-06)).build().unwrap_err();
        assert_eq!(invalid_name(e), "ex_div_date");
    }

    #[test]
    fn ex_dividend_step_and_date_conflict() {
        let builder = LatticeBuilder::dates(100.0, 0.05, date!(2020-12-01),
            date!(2021-01-10)).volatility(0.2).steps(20)
            .dividend(1.0, 3).dividend_on(1.0, date!(2020-12-08));
        assert_eq!(invalid_name(builder.build().unwrap_err()), "ex_div_date");

        let e = LatticeBuilder::years(100.0, 0.05, 1.0).volatility(0.2)
            .dividend_on(1.0, date!(2020-12-08)).build().unwrap_err();
        assert_eq!(invalid_name(e), "ex_div_date");
    }

    #[test]
    fn yield_and_amount_conflict() {
        let e = LatticeBuilder::years(100.0, 0.05, 1.0).volatility(0.2)
            .dividend(1.0, 2).dividend_yield(0.02).build().unwrap_err();
        assert_eq!(invalid_name(e), "yield_rate");
    }

    #[test]
    fn resolved_inputs_rebuild_for_any_movement() {
        let resolved = LatticeBuilder::years(300.0, 0.08, 0.3333)
            .dividend_yield(0.05).resolve().unwrap();
        let a = resolved.lattice(Movement::Up(1.1)).unwrap();
        let b = resolved.lattice(Movement::Up(1.2)).unwrap();
        assert!(a.get_asset_price(1, 0) < b.get_asset_price(1, 0));
        assert_eq!(a.dividend(), Some(Dividend::Yield { rate: 0.05 }));
    }
}
