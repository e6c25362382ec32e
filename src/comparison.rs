//! Period-over-period comparison between two named time ranges.
//!
//! Each period is aggregated over the whole category and group universe of the
//! store, independent of the current selection. Only the transactions dated
//! inside the resolved range are counted, bucketed by the calendar years the
//! range covers.

use crate::engine::{aggregate_between, grand_total};
use crate::error::{Result, RollupError};
use crate::rollup::rollup;
use crate::schema::{CategoryAggregates, GroupAggregates};
use crate::store::TransactionStore;
use crate::time_ranges::{ResolvedRange, TimeRangeCatalog};
use log::{debug, info};
use serde::{Serialize, Serializer};
use std::fmt;

/// Relative change from a baseline, or `NotApplicable` for a zero baseline.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PercentDifference {
    NotApplicable,
    Change(f64),
}

impl PercentDifference {
    pub fn value(&self) -> Option<f64> {
        match self {
            PercentDifference::NotApplicable => None,
            PercentDifference::Change(pct) => Some(*pct),
        }
    }
}

impl fmt::Display for PercentDifference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PercentDifference::NotApplicable => write!(f, "N/A"),
            PercentDifference::Change(pct) if *pct >= 0.0 => write!(f, "+{:.1}%", pct),
            PercentDifference::Change(pct) => write!(f, "{:.1}%", pct),
        }
    }
}

impl Serialize for PercentDifference {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// `(b - a) / |a| * 100`, `NotApplicable` when `a` is zero.
pub fn percent_difference(a: f64, b: f64) -> PercentDifference {
    if a == 0.0 {
        return PercentDifference::NotApplicable;
    }
    let pct = (b - a) / a.abs() * 100.0;
    if pct.is_finite() {
        PercentDifference::Change(pct)
    } else {
        PercentDifference::NotApplicable
    }
}

/// One aggregation run scoped to one time range.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ComparisonPeriod {
    pub range: ResolvedRange,
    pub years: Vec<String>,
    pub categories: CategoryAggregates,
    pub groups: GroupAggregates,
    /// Sum of annual totals over every category of the period
    pub total: f64,
}

impl ComparisonPeriod {
    pub fn category_average(&self, category: &str) -> f64 {
        self.categories
            .get(category)
            .map(|c| c.average.annual())
            .unwrap_or(0.0)
    }

    pub fn group_average(&self, group: &str) -> f64 {
        self.groups
            .get(group)
            .map(|g| g.average.metric.annual())
            .unwrap_or(0.0)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Comparison {
    pub first: ComparisonPeriod,
    pub second: ComparisonPeriod,
}

impl Comparison {
    pub fn total_difference(&self) -> PercentDifference {
        percent_difference(self.first.total, self.second.total)
    }

    /// Difference of the category's average annual figure between the periods.
    pub fn category_difference(&self, category: &str) -> PercentDifference {
        percent_difference(
            self.first.category_average(category),
            self.second.category_average(category),
        )
    }

    pub fn group_difference(&self, group: &str) -> PercentDifference {
        percent_difference(
            self.first.group_average(group),
            self.second.group_average(group),
        )
    }
}

pub struct ComparisonEngine<'a> {
    store: &'a TransactionStore,
    catalog: &'a TimeRangeCatalog,
}

impl<'a> ComparisonEngine<'a> {
    pub fn new(store: &'a TransactionStore, catalog: &'a TimeRangeCatalog) -> Self {
        Self { store, catalog }
    }

    pub fn period(&self, range_id: &str) -> Result<ComparisonPeriod> {
        let (earliest, latest) = self.store.bounds().ok_or(RollupError::EmptyBatch)?;
        let range = self.catalog.resolve_range(range_id, earliest, latest)?;
        let years = range.years_covered();

        let categories = aggregate_between(
            self.store.transactions(),
            self.store.categories(),
            &years,
            range.start,
            range.end,
        );
        let groups = rollup(
            &categories,
            self.store.groups(),
            &years,
            self.store.membership(),
        );
        let total = grand_total(&categories);

        debug!(
            "Period '{}' ({} .. {}) totals {:.2} over {} years",
            range.id,
            range.start,
            range.end,
            total,
            years.len()
        );

        Ok(ComparisonPeriod {
            range,
            years,
            categories,
            groups,
            total,
        })
    }

    pub fn compare(&self, first: &str, second: &str) -> Result<Comparison> {
        info!("Comparing time range '{}' against '{}'", first, second);
        Ok(Comparison {
            first: self.period(first)?,
            second: self.period(second)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::Transaction;
    use chrono::NaiveDate;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn store() -> TransactionStore {
        TransactionStore::new(vec![
            Transaction::new(date(2023, 1, 1), "Groceries", 1000.0).with_group("Household"),
            Transaction::new(date(2023, 6, 1), "Groceries", 1400.0).with_group("Household"),
            Transaction::new(date(2024, 2, 1), "Groceries", 3000.0).with_group("Household"),
            Transaction::new(date(2024, 5, 1), "Fuel", 520.0).with_group("Transport"),
            Transaction::new(date(2025, 3, 31), "Fuel", 260.0).with_group("Transport"),
            Transaction::new(date(2024, 8, 8), "Gifts", 100.0),
        ])
    }

    #[test]
    fn test_percent_difference() {
        assert_eq!(percent_difference(0.0, 125.0), PercentDifference::NotApplicable);
        assert_eq!(percent_difference(0.0, 0.0).to_string(), "N/A");
        assert_eq!(percent_difference(80.0, 80.0).to_string(), "+0.0%");
        assert_eq!(percent_difference(200.0, 250.0).to_string(), "+25.0%");
        assert_eq!(percent_difference(200.0, 150.0).to_string(), "-25.0%");
        // Negative baselines keep the direction of change
        assert_eq!(percent_difference(-100.0, -50.0).to_string(), "+50.0%");
        assert_eq!(percent_difference(3.0, 4.0).value().map(|v| v.round()), Some(33.0));
    }

    #[test]
    fn test_period_counts_only_dates_in_range() {
        let store = store();
        let catalog = TimeRangeCatalog::builtin();
        let engine = ComparisonEngine::new(&store, &catalog);

        // 2024-03-31 .. 2025-03-31: the February 2024 groceries fall outside
        let period = engine.period("last-12-months").unwrap();
        assert_eq!(period.years, vec!["2024", "2025"]);
        assert_eq!(period.categories.len(), store.categories().len());
        assert_eq!(period.categories["Groceries"].year("2024").annual(), 0.0);
        assert_eq!(period.categories["Fuel"].year("2024").annual(), 520.0);
        assert_eq!(period.categories["Fuel"].year("2025").annual(), 260.0);
        assert_eq!(period.total, 520.0 + 260.0 + 100.0);
        assert_eq!(period.group_average("Transport"), 390.0);
        assert_eq!(period.groups["Household"].categories(), &["Groceries"]);
    }

    #[test]
    fn test_compare_two_ranges() {
        let store = store();
        let catalog = TimeRangeCatalog::builtin();
        let engine = ComparisonEngine::new(&store, &catalog);

        let comparison = engine.compare("last-2-years", "last-year").unwrap();
        assert_eq!(comparison.first.years, vec!["2023", "2024"]);
        assert_eq!(comparison.second.years, vec!["2024"]);

        // Groceries: (2400 + 3000) / 2 = 2700 against 3000
        assert_eq!(comparison.first.category_average("Groceries"), 2700.0);
        assert_eq!(comparison.second.category_average("Groceries"), 3000.0);
        assert_eq!(comparison.category_difference("Groceries").to_string(), "+11.1%");
        assert_eq!(comparison.category_difference("Unknown"), PercentDifference::NotApplicable);

        assert_eq!(comparison.first.total, 2400.0 + 3000.0 + 520.0 + 100.0);
        assert_eq!(comparison.second.total, 3000.0 + 520.0 + 100.0);
        assert_eq!(comparison.group_difference("Transport").to_string(), "+100.0%");
    }

    #[test]
    fn test_unknown_range_and_empty_store() {
        let store = store();
        let catalog = TimeRangeCatalog::builtin();
        let engine = ComparisonEngine::new(&store, &catalog);

        assert!(matches!(
            engine.compare("last-year", "bogus"),
            Err(RollupError::UnknownRange(id)) if id == "bogus"
        ));
        // A failed resolution does not disturb other periods
        assert!(engine.period("last-year").is_ok());

        let empty = TransactionStore::new(Vec::new());
        let engine = ComparisonEngine::new(&empty, &catalog);
        assert!(matches!(engine.period("ytd"), Err(RollupError::EmptyBatch)));
    }
}
