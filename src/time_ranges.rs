//! Named time windows and their resolution against a batch's date bounds.
//!
//! Every descriptor is a pure function of the earliest and latest transaction dates.
//! The built-in catalog holds rolling month windows, year-to-date, whole calendar
//! year windows that end the year before the latest transaction, and a literal
//! table of fixed historical ranges. Catalogs can also be loaded from JSON.

use crate::error::{Result, RollupError};
use crate::utils::{
    first_day_of_year, last_day_of_year, shift_months, years_between, years_covered,
};
use chrono::{Datelike, NaiveDate};
use log::debug;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RangeKind {
    #[schemars(description = "Ends on the latest transaction date and starts the given number of months earlier.")]
    RollingMonths { months: u32 },

    #[schemars(description = "From January 1st of the latest transaction's year up to the latest transaction date.")]
    YearToDate,

    #[schemars(
        description = "Whole calendar years ending December 31st of the year before the latest transaction, spanning the given number of years."
    )]
    TrailingYears { years: u32 },

    #[schemars(description = "Literal start and end dates, independent of the data.")]
    Fixed { start: NaiveDate, end: NaiveDate },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct TimeRangeDescriptor {
    #[schemars(description = "Stable identifier, e.g. 'last-12-months'")]
    pub id: String,

    #[schemars(description = "Human readable label, e.g. 'Last 12 Months'")]
    pub label: String,

    #[serde(flatten)]
    pub kind: RangeKind,
}

impl TimeRangeDescriptor {
    pub fn new(id: impl Into<String>, label: impl Into<String>, kind: RangeKind) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
            kind,
        }
    }

    /// Resolves to a concrete `(start, end)` pair. `earliest` is part of the contract
    /// for every descriptor even though the built-in kinds only look at `latest`.
    pub fn resolve(&self, _earliest: NaiveDate, latest: NaiveDate) -> Result<(NaiveDate, NaiveDate)> {
        match &self.kind {
            RangeKind::RollingMonths { months } => {
                let back = i32::try_from(*months)
                    .ok()
                    .and_then(i32::checked_neg)
                    .ok_or_else(|| self.out_of_range(format!("{} months", months)))?;
                let start = shift_months(latest, back)?;
                Ok((start, latest))
            }
            RangeKind::YearToDate => Ok((first_day_of_year(latest.year())?, latest)),
            RangeKind::TrailingYears { years } => {
                let end_year = latest.year() - 1;
                let start_year = i32::try_from(*years)
                    .ok()
                    .and_then(|n| n.checked_sub(1))
                    .and_then(|span| end_year.checked_sub(span))
                    .ok_or_else(|| self.out_of_range(format!("{} years", years)))?;
                Ok((first_day_of_year(start_year)?, last_day_of_year(end_year)?))
            }
            RangeKind::Fixed { start, end } => Ok((*start, *end)),
        }
    }

    fn out_of_range(&self, span: String) -> RollupError {
        RollupError::DateError(format!(
            "Time range '{}' spans {}, which is out of range",
            self.id, span
        ))
    }

    fn validate(&self) -> Result<()> {
        let invalid = |details: String| RollupError::InvalidRange {
            id: self.id.clone(),
            details,
        };

        if self.id.trim().is_empty() {
            return Err(invalid("id must not be empty".to_string()));
        }

        match &self.kind {
            RangeKind::RollingMonths { months: 0 } => {
                Err(invalid("rolling window must span at least one month".to_string()))
            }
            RangeKind::TrailingYears { years: 0 } => {
                Err(invalid("trailing window must span at least one year".to_string()))
            }
            RangeKind::Fixed { start, end } if end < start => Err(invalid(format!(
                "end date {} is before start date {}",
                end, start
            ))),
            _ => Ok(()),
        }
    }
}

/// A resolved time range, ready for bucketing and display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedRange {
    pub id: String,
    pub label: String,
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl ResolvedRange {
    pub fn years_covered(&self) -> Vec<String> {
        years_covered(self.start, self.end)
    }

    /// Length of the range in years, rounded to two decimals.
    pub fn span_years(&self) -> f64 {
        years_between(self.start, self.end)
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        date >= self.start && date <= self.end
    }
}

const fn ymd(year: i32, month: u32, day: u32) -> NaiveDate {
    match NaiveDate::from_ymd_opt(year, month, day) {
        Some(date) => date,
        None => panic!("invalid date in fixed range table"),
    }
}

/// Literal table of fixed historical ranges: (id, label, start, end).
const FIXED_RANGES: &[(&str, &str, NaiveDate, NaiveDate)] = &[
    ("since-las-vegas", "Since Las Vegas Only Home", ymd(2021, 1, 1), ymd(2025, 3, 31)),
    ("since-both-medicare", "Since Both Medicare", ymd(2022, 10, 1), ymd(2025, 3, 31)),
    ("since-retired", "Since Retired", ymd(2010, 8, 14), ymd(2025, 3, 31)),
    (
        "since-ret-till-both-non-medicare",
        "Since Ret Till Both Non Medicare",
        ymd(2010, 8, 14),
        ymd(2021, 8, 31),
    ),
    ("all-haverhill", "All Haverhill Only Home", ymd(1997, 1, 1), ymd(2011, 10, 12)),
    ("till-retired", "Till Retired", ymd(1997, 1, 1), ymd(2010, 8, 13)),
    ("till-2-homes", "Till 2 homes", ymd(2011, 10, 13), ymd(2020, 12, 31)),
    ("covid-period", "COVID inflationary period", ymd(2020, 3, 1), ymd(2023, 2, 28)),
];

const ROLLING_MONTHS: &[u32] = &[12, 24, 36, 48, 60];

const TRAILING_YEARS: &[u32] = &[1, 2, 3, 4, 5];

pub const DEFAULT_RANGE_ID: &str = "last-12-months";

/// JSON shape of a catalog.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CatalogConfig {
    #[schemars(description = "Time ranges in display order. Ids must be unique.")]
    pub ranges: Vec<TimeRangeDescriptor>,
}

/// Ordered registry of time ranges. Order matters for display only.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimeRangeCatalog {
    ranges: Vec<TimeRangeDescriptor>,
}

impl Default for TimeRangeCatalog {
    fn default() -> Self {
        Self::builtin()
    }
}

impl TimeRangeCatalog {
    pub fn builtin() -> Self {
        let mut ranges = Vec::new();

        for &months in ROLLING_MONTHS {
            ranges.push(TimeRangeDescriptor::new(
                format!("last-{}-months", months),
                format!("Last {} Months", months),
                RangeKind::RollingMonths { months },
            ));
        }

        ranges.push(TimeRangeDescriptor::new("ytd", "YTD", RangeKind::YearToDate));

        for &years in TRAILING_YEARS {
            let (id, label) = if years == 1 {
                ("last-year".to_string(), "Last Year".to_string())
            } else {
                (
                    format!("last-{}-years", years),
                    format!("Last {} Years", years),
                )
            };
            ranges.push(TimeRangeDescriptor::new(
                id,
                label,
                RangeKind::TrailingYears { years },
            ));
        }

        for &(id, label, start, end) in FIXED_RANGES {
            ranges.push(TimeRangeDescriptor::new(
                id,
                label,
                RangeKind::Fixed { start, end },
            ));
        }

        Self { ranges }
    }

    pub fn from_config(config: CatalogConfig) -> Result<Self> {
        let mut seen = HashSet::new();

        for range in &config.ranges {
            range.validate()?;
            if !seen.insert(range.id.as_str()) {
                return Err(RollupError::InvalidRange {
                    id: range.id.clone(),
                    details: "duplicate id".to_string(),
                });
            }
        }

        Ok(Self {
            ranges: config.ranges,
        })
    }

    pub fn from_json(json: &str) -> Result<Self> {
        let config: CatalogConfig = serde_json::from_str(json)?;
        Self::from_config(config)
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    pub fn to_config(&self) -> CatalogConfig {
        CatalogConfig {
            ranges: self.ranges.clone(),
        }
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(&self.to_config())?)
    }

    pub fn schema_as_json() -> Result<String> {
        let schema = schemars::schema_for!(CatalogConfig);
        Ok(serde_json::to_string_pretty(&schema)?)
    }

    pub fn iter(&self) -> impl Iterator<Item = &TimeRangeDescriptor> {
        self.ranges.iter()
    }

    pub fn len(&self) -> usize {
        self.ranges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ranges.is_empty()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.ranges.iter().any(|r| r.id == id)
    }

    pub fn get(&self, id: &str) -> Result<&TimeRangeDescriptor> {
        self.ranges
            .iter()
            .find(|r| r.id == id)
            .ok_or_else(|| RollupError::UnknownRange(id.to_string()))
    }

    pub fn resolve(
        &self,
        id: &str,
        earliest: NaiveDate,
        latest: NaiveDate,
    ) -> Result<(NaiveDate, NaiveDate)> {
        let (start, end) = self.get(id)?.resolve(earliest, latest)?;
        debug!("Resolved time range '{}' to {} .. {}", id, start, end);
        Ok((start, end))
    }

    pub fn resolve_range(
        &self,
        id: &str,
        earliest: NaiveDate,
        latest: NaiveDate,
    ) -> Result<ResolvedRange> {
        let descriptor = self.get(id)?;
        let (start, end) = descriptor.resolve(earliest, latest)?;
        debug!("Resolved time range '{}' to {} .. {}", id, start, end);
        Ok(ResolvedRange {
            id: descriptor.id.clone(),
            label: descriptor.label.clone(),
            start,
            end,
        })
    }
}
