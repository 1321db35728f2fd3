use std::fmt;

use chrono::{Datelike, Local, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::data_models::WorkPeriod;

/// Source of "now" for ongoing work periods.
pub trait Clock: Send + Sync {
    fn now(&self) -> NaiveDateTime;
}

/// Local wall clock. Tenure of ongoing jobs changes from run to run.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> NaiveDateTime {
        Local::now().naive_local()
    }
}

#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub NaiveDateTime);

impl Clock for FixedClock {
    fn now(&self) -> NaiveDateTime {
        self.0
    }
}

/// Total work experience in whole years and remaining months.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Tenure {
    pub years: i64,
    pub months: i64,
}

impl Tenure {
    pub fn from_months(total_months: i64) -> Self {
        Self {
            years: total_months.div_euclid(12),
            months: total_months.rem_euclid(12),
        }
    }

    pub fn total_months(&self) -> i64 {
        self.years * 12 + self.months
    }
}

/// Renders `"Y years and M months"`. The platforms themselves show this in
/// Ukrainian ("Y років і M місяців"); output records use the English form.
impl fmt::Display for Tenure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} years and {} months", self.years, self.months)
    }
}

/// Calendar months between two instants, ignoring the day of month.
/// Negative when `end` falls in an earlier month than `start`.
pub fn months_between(start: NaiveDateTime, end: NaiveDateTime) -> i64 {
    (end.year() as i64 - start.year() as i64) * 12 + (end.month() as i64 - start.month() as i64)
}

/// Sums the coarse month span of every period. Periods without an end run
/// until `clock.now()`. Malformed periods contribute negatively, nothing is
/// clamped.
pub fn total(periods: &[WorkPeriod], clock: &dyn Clock) -> Tenure {
    let mut now = None;
    let total_months: i64 = periods
        .iter()
        .map(|p| {
            let end = p.end.unwrap_or_else(|| *now.get_or_insert_with(|| clock.now()));
            months_between(p.start, end)
        })
        .sum();
    Tenure::from_months(total_months)
}
