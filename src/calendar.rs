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
//! Trading-day counting used when expiry and ex-dividend events are given
//! as dates rather than as a year fraction and a step.
use std::collections::BTreeSet;

use time::macros::format_description;
use time::{Date, Weekday};

use crate::error::{LatticeError, LatticeResult};

/// Trading days in a year, converting a trading-day count to years
pub const TRADING_DAYS_PER_YEAR: f64 = 252.0;

/// Parses a `dd-mm-yyyy` date, or `mm-dd-yyyy` when `day_first` is false
pub fn parse_date(s: &str, day_first: bool) -> LatticeResult<Date> {
    let parsed = if day_first {
        Date::parse(s.trim(), format_description!("[day]-[month]-[year]"))
    } else {
        Date::parse(s.trim(), format_description!("[month]-[day]-[year]"))
    };
    parsed.map_err(|e| LatticeError::invalid("date", s,
        format!("expected {}: {}",
            if day_first { "dd-mm-yyyy" } else { "mm-dd-yyyy" }, e)))
}

/// Weekdays are trading days unless listed as holidays
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TradingCalendar {
    holidays: BTreeSet<Date>,
}

impl TradingCalendar {
    pub fn new<I: IntoIterator<Item = Date>>(holidays: I) -> TradingCalendar {
        TradingCalendar { holidays: holidays.into_iter().collect() }
    }

    /// No holidays, only weekends are skipped
    pub fn weekends_only() -> TradingCalendar {
        TradingCalendar::default()
    }

    /// Builds a calendar from holiday date strings
    pub fn parse<'a, I>(holidays: I, day_first: bool)
        -> LatticeResult<TradingCalendar>
    where I: IntoIterator<Item = &'a str>
    {
        let holidays = holidays.into_iter()
            .map(|s| parse_date(s, day_first))
            .collect::<LatticeResult<BTreeSet<Date>>>()?;
        Ok(TradingCalendar { holidays: holidays })
    }

    pub fn holidays(&self) -> impl Iterator<Item = &Date> {
        self.holidays.iter()
    }

    pub fn is_trading_day(&self, date: Date) -> bool {
        !matches!(date.weekday(), Weekday::Saturday | Weekday::Sunday)
            && !self.holidays.contains(&date)
    }

    /// Number of trading days in [start, end).  The end date must be later
    /// than the start date and the span must hold at least one trading day
    pub fn trading_days(&self, start: Date, end: Date) -> LatticeResult<usize> {
        if end <= start {
            return Err(LatticeError::invalid("end_date", end,
                format!("must be later than the start date {}", start)));
        }
        let mut count = 0;
        let mut current = start;
        while current < end {
            if self.is_trading_day(current) {
                count += 1;
            }
            current = match current.next_day() {
                Some(next) => next,
                None => break,
            };
        }
        if count == 0 {
            return Err(LatticeError::invalid("end_date", end,
                format!("no trading day between {} and {}", start, end)));
        }
        Ok(count)
    }

    /// Trading days in [start, end) as a fraction of a trading year
    pub fn year_fraction(&self, start: Date, end: Date) -> LatticeResult<f64> {
        Ok(self.trading_days(start, end)? as f64 / TRADING_DAYS_PER_YEAR)
    }
}

#[cfg(test)]
mod test {
    use time::macros::date;

    use crate::calendar::*;
    use crate::util::equal_within;

    #[test]
    fn parse_day_and_month_first() {
        assert_eq!(parse_date("01-12-2020", true).unwrap(), date!(2020-12-01));
        assert_eq!(parse_date("12-01-2020", false).unwrap(), date!(2020-12-01));
        assert!(parse_date("31-12-2020", false).is_err());
        assert!(parse_date("2020/12/01", true).is_err());
    }

    #[test]
    fn weekends_are_skipped() {
        let calendar = TradingCalendar::weekends_only();
        assert!(!calendar.is_trading_day(date!(2020-12-05)));
        assert!(!calendar.is_trading_day(date!(2020-12-06)));
        assert!(calendar.is_trading_day(date!(2020-12-07)));
        // Monday to the next Monday
        assert_eq!(calendar.trading_days(date!(2020-12-07),
            date!(2020-12-14)).unwrap(), 5);
    }

    #[test]
    fn holidays_are_excluded() {
        let calendar = TradingCalendar::parse(
            vec!["24-12-2020", "25-12-2020", "31-12-2020", "01-01-2021"], true)
            .unwrap();
        let start = parse_date("01-12-2020", true).unwrap();
        let end = parse_date("10-01-2021", true).unwrap();
        assert_eq!(TradingCalendar::weekends_only().trading_days(start, end)
            .unwrap(), 29);
        assert_eq!(calendar.trading_days(start, end).unwrap(), 25);
        assert!(equal_within(calendar.year_fraction(start, end).unwrap(),
            25.0/252.0, 1e-15));
    }

    #[test]
    fn end_must_follow_start() {
        let calendar = TradingCalendar::weekends_only();
        assert!(calendar.trading_days(date!(2021-01-10), date!(2020-12-01))
            .is_err());
        assert!(calendar.trading_days(date!(2020-12-01), date!(2020-12-01))
            .is_err());
        // Saturday to Monday holds no trading day
        assert!(calendar.trading_days(date!(2020-12-05), date!(2020-12-07))
            .is_err());
    }
}
