use chrono::{Datelike, Duration, Months, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::errors::{BillingError, Result};

/// Last day of the first half of a month under fortnightly billing.
pub const FORTNIGHT_SPLIT_DAY: u32 = 15;

/// Sortable calendar-day key format used for store queries and bill headers.
pub const DATE_KEY_FORMAT: &str = "%Y-%m-%d";

const MONTH_ABBREVIATIONS: [&str; 12] = [
    "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
];

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "snake_case")]
pub enum PeriodKind {
    #[default]
    Monthly,
    Fortnightly,
    Custom,
}

/// A billing period choice as made by the user.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PeriodSelection {
    #[default]
    Monthly,
    Fortnightly,
    Custom { start: NaiveDate, end: NaiveDate },
}

impl PeriodSelection {
    /// Builds a selection from loose form input. Custom periods need both bounds.
    pub fn from_parts(
        kind: PeriodKind,
        start: Option<NaiveDate>,
        end: Option<NaiveDate>,
    ) -> Result<Self> {
        match kind {
            PeriodKind::Monthly => Ok(PeriodSelection::Monthly),
            PeriodKind::Fortnightly => Ok(PeriodSelection::Fortnightly),
            PeriodKind::Custom => match (start, end) {
                (Some(start), Some(end)) => Ok(PeriodSelection::Custom { start, end }),
                _ => Err(BillingError::MissingCustomBounds),
            },
        }
    }

    pub fn kind(&self) -> PeriodKind {
        match self {
            PeriodSelection::Monthly => PeriodKind::Monthly,
            PeriodSelection::Fortnightly => PeriodKind::Fortnightly,
            PeriodSelection::Custom { .. } => PeriodKind::Custom,
        }
    }
}

/// An inclusive `[start, end]` range of calendar days with `start <= end`.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq, Hash)]
pub struct BillingPeriod {
    start: NaiveDate,
    end: NaiveDate,
    kind: PeriodKind,
}

impl BillingPeriod {
    /// Explicit bounds, treated as a custom period.
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self> {
        if end < start {
            return Err(BillingError::InvalidRange { start, end });
        }
        Ok(Self {
            start,
            end,
            kind: PeriodKind::Custom,
        })
    }

    pub fn start(&self) -> NaiveDate {
        self.start
    }

    pub fn end(&self) -> NaiveDate {
        self.end
    }

    /// Selection kind the period was resolved from.
    pub fn kind(&self) -> PeriodKind {
        self.kind
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        date >= self.start && date <= self.end
    }

    /// Number of calendar days covered, both ends included.
    pub fn day_count(&self) -> i64 {
        (self.end - self.start).num_days() + 1
    }

    pub fn days(&self) -> impl Iterator<Item = NaiveDate> {
        let end = self.end;
        self.start.iter_days().take_while(move |day| *day <= end)
    }

    pub fn start_key(&self) -> String {
        self.start.format(DATE_KEY_FORMAT).to_string()
    }

    pub fn end_key(&self) -> String {
        self.end.format(DATE_KEY_FORMAT).to_string()
    }

    /// True when the period is exactly one calendar month.
    pub fn is_whole_month(&self) -> bool {
        let (first, last) = month_bounds(self.start);
        self.start == first && self.end == last
    }

    /// Short header: `Feb 2024` for monthly periods, `16 Jan - 31 Jan 2024` otherwise,
    /// even when a custom range spans a whole month.
    pub fn label(&self) -> String {
        if self.kind == PeriodKind::Monthly {
            return format!("{} {}", month_abbreviation(self.start), self.start.year());
        }
        format!(
            "{} {} - {} {} {}",
            self.start.day(),
            month_abbreviation(self.start),
            self.end.day(),
            month_abbreviation(self.end),
            self.end.year()
        )
    }
}

impl std::fmt::Display for BillingPeriod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}..={}", self.start_key(), self.end_key())
    }
}

impl<'de> Deserialize<'de> for BillingPeriod {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        #[derive(Deserialize)]
        struct Bounds {
            start: NaiveDate,
            end: NaiveDate,
            #[serde(default = "custom_kind")]
            kind: PeriodKind,
        }

        fn custom_kind() -> PeriodKind {
            PeriodKind::Custom
        }

        let bounds = Bounds::deserialize(deserializer)?;
        let period =
            BillingPeriod::new(bounds.start, bounds.end).map_err(serde::de::Error::custom)?;
        Ok(BillingPeriod {
            kind: bounds.kind,
            ..period
        })
    }
}

/// Turns a period selection into concrete calendar bounds.
pub struct PeriodResolver;

impl PeriodResolver {
    pub fn resolve(selection: &PeriodSelection, reference: NaiveDate) -> Result<BillingPeriod> {
        match selection {
            PeriodSelection::Monthly => Ok(Self::monthly(reference)),
            PeriodSelection::Fortnightly => Ok(Self::fortnightly(reference)),
            PeriodSelection::Custom { start, end } => Self::custom(*start, *end),
        }
    }

    /// First through last day of the reference month.
    pub fn monthly(reference: NaiveDate) -> BillingPeriod {
        let (start, end) = month_bounds(reference);
        BillingPeriod {
            start,
            end,
            kind: PeriodKind::Monthly,
        }
    }

    /// Days 1-15 when the reference falls in the first half, else day 16 to month end.
    pub fn fortnightly(reference: NaiveDate) -> BillingPeriod {
        let (first, last) = month_bounds(reference);
        let split = first + Duration::days(i64::from(FORTNIGHT_SPLIT_DAY) - 1);
        if reference.day() <= FORTNIGHT_SPLIT_DAY {
            BillingPeriod {
                start: first,
                end: split,
                kind: PeriodKind::Fortnightly,
            }
        } else {
            BillingPeriod {
                start: split + Duration::days(1),
                end: last,
                kind: PeriodKind::Fortnightly,
            }
        }
    }

    /// User-chosen bounds, taken verbatim. An inverted range is rejected, never swapped.
    pub fn custom(start: NaiveDate, end: NaiveDate) -> Result<BillingPeriod> {
        BillingPeriod::new(start, end)
    }
}

fn month_bounds(reference: NaiveDate) -> (NaiveDate, NaiveDate) {
    let first = reference - Duration::days(i64::from(reference.day0()));
    let last = first
        .checked_add_months(Months::new(1))
        .and_then(|next| next.pred_opt())
        .unwrap_or(NaiveDate::MAX);
    (first, last)
}

fn month_abbreviation(date: NaiveDate) -> &'static str {
    MONTH_ABBREVIATIONS[date.month0() as usize]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn monthly_period_in_leap_february() {
        let period = PeriodResolver::monthly(date(2024, 2, 10));
        assert_eq!(period.start(), date(2024, 2, 1));
        assert_eq!(period.end(), date(2024, 2, 29));
        assert_eq!(period.start_key(), "2024-02-01");
        assert_eq!(period.end_key(), "2024-02-29");
    }

    #[test]
    fn monthly_period_in_common_february() {
        let period = PeriodResolver::monthly(date(2023, 2, 28));
        assert_eq!(period.end(), date(2023, 2, 28));
        assert_eq!(period.day_count(), 28);
    }

    #[test]
    fn monthly_period_on_month_edges_stays_in_month() {
        let first = PeriodResolver::monthly(date(2024, 12, 1));
        let last = PeriodResolver::monthly(date(2024, 12, 31));
        assert_eq!(first, last);
        assert_eq!(first.start(), date(2024, 12, 1));
        assert_eq!(first.end(), date(2024, 12, 31));
    }

    #[test]
    fn fortnight_second_half_runs_to_month_end() {
        let period = PeriodResolver::fortnightly(date(2024, 1, 16));
        assert_eq!(period.start(), date(2024, 1, 16));
        assert_eq!(period.end(), date(2024, 1, 31));

        let april = PeriodResolver::fortnightly(date(2024, 4, 30));
        assert_eq!(april.end(), date(2024, 4, 30));
    }

    #[test]
    fn fortnight_first_half_ends_on_fifteenth() {
        let period = PeriodResolver::fortnightly(date(2024, 1, 15));
        assert_eq!(period.start(), date(2024, 1, 1));
        assert_eq!(period.end(), date(2024, 1, 15));
    }

    #[test]
    fn custom_period_rejects_inverted_bounds() {
        let err = PeriodResolver::custom(date(2024, 3, 10), date(2024, 3, 9)).unwrap_err();
        assert_eq!(
            err,
            BillingError::InvalidRange {
                start: date(2024, 3, 10),
                end: date(2024, 3, 9),
            }
        );
        let single = PeriodResolver::custom(date(2024, 3, 9), date(2024, 3, 9)).unwrap();
        assert_eq!(single.day_count(), 1);
    }

    #[test]
    fn selection_requires_custom_bounds() {
        let err = PeriodSelection::from_parts(PeriodKind::Custom, Some(date(2024, 1, 1)), None)
            .unwrap_err();
        assert_eq!(err, BillingError::MissingCustomBounds);
        let monthly = PeriodSelection::from_parts(PeriodKind::Monthly, None, None).unwrap();
        assert_eq!(monthly.kind(), PeriodKind::Monthly);
    }

    #[test]
    fn labels_follow_the_period_kind() {
        assert_eq!(PeriodResolver::monthly(date(2024, 2, 3)).label(), "Feb 2024");
        assert_eq!(
            PeriodResolver::fortnightly(date(2024, 1, 20)).label(),
            "16 Jan - 31 Jan 2024"
        );
        let custom = PeriodResolver::custom(date(2023, 12, 25), date(2024, 1, 5)).unwrap();
        assert_eq!(custom.label(), "25 Dec - 5 Jan 2024");

        let whole_february = PeriodResolver::custom(date(2024, 2, 1), date(2024, 2, 29)).unwrap();
        assert!(whole_february.is_whole_month());
        assert_eq!(whole_february.label(), "1 Feb - 29 Feb 2024");
    }

    #[test]
    fn days_iterates_inclusive_range() {
        let period = PeriodResolver::custom(date(2024, 2, 27), date(2024, 3, 1)).unwrap();
        let days: Vec<_> = period.days().collect();
        assert_eq!(
            days,
            vec![
                date(2024, 2, 27),
                date(2024, 2, 28),
                date(2024, 2, 29),
                date(2024, 3, 1)
            ]
        );
    }

    #[test]
    fn deserializing_rejects_inverted_period() {
        let ok: BillingPeriod =
            serde_json::from_str(r#"{"start":"2024-01-01","end":"2024-01-15"}"#).unwrap();
        assert_eq!(ok.end(), date(2024, 1, 15));
        assert_eq!(ok.kind(), PeriodKind::Custom);
        let bad = serde_json::from_str::<BillingPeriod>(
            r#"{"start":"2024-01-15","end":"2024-01-01"}"#,
        );
        assert!(bad.is_err());
    }
}
