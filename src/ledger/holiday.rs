use std::collections::BTreeSet;

use chrono::NaiveDate;

use super::period::BillingPeriod;

/// Session-local set of "no delivery" dates used when billing customers.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HolidayRegister {
    dates: BTreeSet<NaiveDate>,
}

impl HolidayRegister {
    pub fn new() -> Self {
        Self::default()
    }

    /// Marks a date, returning whether it was newly added.
    pub fn mark(&mut self, date: NaiveDate) -> bool {
        self.dates.insert(date)
    }

    /// Unmarks a date, returning whether it was present.
    pub fn unmark(&mut self, date: NaiveDate) -> bool {
        self.dates.remove(&date)
    }

    /// Flips a date and reports whether it is now marked.
    pub fn toggle(&mut self, date: NaiveDate) -> bool {
        if self.dates.remove(&date) {
            false
        } else {
            self.dates.insert(date);
            true
        }
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.dates.contains(&date)
    }

    pub fn clear(&mut self) {
        self.dates.clear();
    }

    pub fn len(&self) -> usize {
        self.dates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dates.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = NaiveDate> + '_ {
        self.dates.iter().copied()
    }

    /// Holidays inside the period, in date order.
    pub fn within<'a>(&'a self, period: &BillingPeriod) -> impl Iterator<Item = NaiveDate> + 'a {
        self.dates.range(period.start()..=period.end()).copied()
    }

    pub fn count_within(&self, period: &BillingPeriod) -> usize {
        self.within(period).count()
    }
}

impl FromIterator<NaiveDate> for HolidayRegister {
    fn from_iter<I: IntoIterator<Item = NaiveDate>>(iter: I) -> Self {
        Self {
            dates: iter.into_iter().collect(),
        }
    }
}
