use chrono::{Days, NaiveDate};
use tracing::debug;

use super::entry::{EntryDetail, NewEntry};
use crate::errors::{BillingError, Result};

pub const MIN_REPEAT_DAYS: u32 = 1;
pub const MAX_REPEAT_DAYS: u32 = 31;

/// Expands a "repeat for N days" template into concrete dated entries.
pub struct EntryExpander;

impl EntryExpander {
    /// Bounds a requested repeat count to `[MIN_REPEAT_DAYS, MAX_REPEAT_DAYS]`.
    pub fn clamp_repeat(requested: u32) -> u32 {
        requested.clamp(MIN_REPEAT_DAYS, MAX_REPEAT_DAYS)
    }

    /// Builds one entry per consecutive calendar day starting at `start`. Only describes
    /// the entries; persisting them is up to the caller.
    pub fn expand(template: &EntryDetail, start: NaiveDate, repeat: u32) -> Result<Vec<NewEntry>> {
        let count = Self::clamp_repeat(repeat);
        if count != repeat {
            debug!(requested = repeat, clamped = count, "repeat count clamped");
        }
        let mut entries = Vec::with_capacity(count as usize);
        for offset in 0..u64::from(count) {
            let date = start.checked_add_days(Days::new(offset)).ok_or_else(|| {
                BillingError::DateOutOfRange(format!("{start} plus {offset} day(s)"))
            })?;
            entries.push(NewEntry::new(date, template.clone()));
        }
        Ok(entries)
    }
}
