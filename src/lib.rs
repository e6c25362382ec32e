//! # Expense Rollup
//!
//! Aggregation and time-range resolution for categorized expense transactions.
//!
//! ## Core Concepts
//!
//! - **Transaction Store**: One loaded batch, with its date bounds, categories, years and
//!   category to group membership derived once at load time
//! - **Time Ranges**: Named windows (rolling months, year to date, trailing years, fixed
//!   spans) resolved against the latest transaction date
//! - **Aggregation**: Category × year totals with annual, monthly and weekly figures and
//!   an average over the selected years
//! - **Group Rollup**: Category figures summed into their groups
//! - **Comparison**: Two time ranges aggregated side by side with percent differences
//!
//! ## Example
//!
//! ```rust
//! use expense_rollup::*;
//! use chrono::NaiveDate;
//!
//! let day = |y, m, d| NaiveDate::from_ymd_opt(y, m, d).unwrap();
//!
//! let mut analyzer = ExpenseAnalyzer::default();
//! analyzer.load(vec![
//!     Transaction::new(day(2024, 1, 15), "Rent", 12000.0).with_group("Household"),
//!     Transaction::new(day(2024, 6, 1), "Groceries", 2400.0).with_group("Household"),
//!     Transaction::new(day(2025, 3, 31), "Fuel", 520.0).with_group("Transport"),
//! ]);
//!
//! // Freshly loaded: last 12 months, every group selected
//! assert_eq!(analyzer.selected_years().unwrap(), vec!["2024", "2025"]);
//!
//! let groups = analyzer.group_aggregates().unwrap();
//! assert_eq!(groups["Household"].year("2024").monthly(), 1200.0);
//!
//! let comparison = analyzer.compare("last-2-years", "last-year").unwrap();
//! assert_eq!(comparison.total_difference().to_string(), "+0.0%");
//! ```

pub mod comparison;
pub mod engine;
pub mod error;
pub mod report;
pub mod rollup;
pub mod schema;
pub mod selection;
pub mod store;
pub mod time_ranges;
pub mod utils;

pub use comparison::{percent_difference, Comparison, ComparisonEngine, ComparisonPeriod, PercentDifference};
pub use engine::{aggregate, aggregate_between, grand_total, selection_total, sum_categories};
pub use error::{Result, RollupError};
pub use report::{ComparisonReport, ReportOptions, SummaryReport};
pub use rollup::rollup;
pub use schema::*;
pub use selection::{SelectionResolver, YearSelection};
pub use store::{Membership, MembershipConflict, TransactionStore};
pub use time_ranges::{
    CatalogConfig, RangeKind, ResolvedRange, TimeRangeCatalog, TimeRangeDescriptor, DEFAULT_RANGE_ID,
};
pub use utils::*;

use log::info;

/// Owns one loaded batch, the time range catalog and the current selection.
///
/// Aggregates are computed on demand from the current state and never cached, so
/// they always reflect the selection at the time of the call.
#[derive(Debug, Clone, Default)]
pub struct ExpenseAnalyzer {
    catalog: TimeRangeCatalog,
    store: TransactionStore,
    selection: SelectionResolver,
}

impl ExpenseAnalyzer {
    pub fn new(catalog: TimeRangeCatalog) -> Self {
        Self {
            catalog,
            store: TransactionStore::default(),
            selection: SelectionResolver::new(),
        }
    }

    /// Replaces the loaded batch and resets the selection to its defaults. A catalog
    /// without the default range starts with no years selected.
    pub fn load(&mut self, transactions: Vec<Transaction>) {
        let store = TransactionStore::new(transactions);
        let mut selection = SelectionResolver::for_store(&store);
        if selection
            .time_range()
            .is_some_and(|id| !self.catalog.contains(id))
        {
            selection.clear_time_range();
        }
        self.store = store;
        self.selection = selection;
        info!(
            "Batch replaced: {} transactions, time range {:?}",
            self.store.len(),
            self.selection.time_range()
        );
    }

    pub fn load_raw(&mut self, rows: &[RawTransaction]) {
        self.load(rows.iter().map(RawTransaction::normalize).collect());
    }

    pub fn catalog(&self) -> &TimeRangeCatalog {
        &self.catalog
    }

    pub fn store(&self) -> &TransactionStore {
        &self.store
    }

    pub fn selection(&self) -> &SelectionResolver {
        &self.selection
    }

    /// Direct access for edits that need neither the store nor the catalog.
    pub fn selection_mut(&mut self) -> &mut SelectionResolver {
        &mut self.selection
    }

    pub fn select_time_range(&mut self, id: &str) -> Result<()> {
        self.selection.select_time_range(id, &self.catalog)
    }

    pub fn toggle_year(&mut self, year: &str) -> Result<()> {
        self.selection.toggle_year(year, &self.catalog, &self.store)
    }

    pub fn select_all_years(&mut self) {
        self.selection.select_all_years(&self.store);
    }

    pub fn clear_years(&mut self) {
        self.selection.clear_years();
    }

    pub fn toggle_group(&mut self, group: &str) {
        self.selection.toggle_group(group, &self.store);
    }

    pub fn select_all_groups(&mut self) {
        self.selection.select_all_groups(&self.store);
    }

    pub fn clear_groups(&mut self) {
        self.selection.clear_groups(&self.store);
    }

    pub fn toggle_category(&mut self, category: &str) {
        self.selection.toggle_category(category);
    }

    pub fn select_all_categories(&mut self) {
        self.selection.select_all_categories(&self.store);
    }

    pub fn selected_years(&self) -> Result<Vec<String>> {
        self.selection.years(&self.catalog, &self.store)
    }

    /// Selected categories × selected years.
    pub fn category_aggregates(&self) -> Result<CategoryAggregates> {
        let years = self.selected_years()?;
        Ok(aggregate(
            self.store.transactions(),
            self.selection.categories(),
            &years,
        ))
    }

    /// Rollup of the selected categories into every group of the batch.
    pub fn group_aggregates(&self) -> Result<GroupAggregates> {
        let years = self.selected_years()?;
        let categories = aggregate(
            self.store.transactions(),
            self.selection.categories(),
            &years,
        );
        Ok(rollup(
            &categories,
            self.store.groups(),
            &years,
            self.store.membership(),
        ))
    }

    /// Sum over every transaction matching the selected categories and years. An
    /// empty selection on either axis does not filter that axis.
    pub fn selection_total(&self) -> Result<f64> {
        let years = self.selected_years()?;
        Ok(selection_total(
            self.store.transactions(),
            self.selection.categories(),
            &years,
        ))
    }

    pub fn report(&self, options: ReportOptions) -> Result<SummaryReport> {
        let years = self.selected_years()?;
        let categories = aggregate(
            self.store.transactions(),
            self.selection.categories(),
            &years,
        );
        let groups = rollup(
            &categories,
            self.store.groups(),
            &years,
            self.store.membership(),
        );
        Ok(SummaryReport::build(
            &categories,
            &groups,
            self.store.groups(),
            &years,
            options,
        ))
    }

    pub fn compare(&self, first: &str, second: &str) -> Result<Comparison> {
        ComparisonEngine::new(&self.store, &self.catalog).compare(first, second)
    }

    pub fn comparison_report(
        &self,
        first: &str,
        second: &str,
        options: ReportOptions,
    ) -> Result<ComparisonReport> {
        let comparison = self.compare(first, second)?;
        Ok(ComparisonReport::build(
            &comparison,
            self.store.categories(),
            self.store.groups(),
            options,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn transactions() -> Vec<Transaction> {
        vec![
            Transaction::new(date(2023, 3, 1), "Groceries", 1800.0).with_group("Household"),
            Transaction::new(date(2024, 1, 15), "Rent", 12000.0).with_group("Household"),
            Transaction::new(date(2024, 6, 1), "Groceries", 2400.0).with_group("Household"),
            Transaction::new(date(2024, 8, 1), "Fuel", 520.0).with_group("Transport"),
            Transaction::new(date(2025, 3, 31), "Fuel", 260.0).with_group("Transport"),
            Transaction::new(date(2024, 12, 24), "Gifts", 300.0),
        ]
    }

    #[test]
    fn test_load_sets_defaults() {
        let mut analyzer = ExpenseAnalyzer::default();
        analyzer.load(transactions());

        assert_eq!(analyzer.selection().time_range(), Some(DEFAULT_RANGE_ID));
        assert_eq!(analyzer.selection().groups(), &["Household", "Transport"]);
        assert_eq!(analyzer.selected_years().unwrap(), vec!["2024", "2025"]);

        let categories = analyzer.category_aggregates().unwrap();
        assert_eq!(
            categories.keys().collect::<Vec<_>>(),
            vec!["Groceries", "Rent", "Fuel"]
        );
        // Gifts has no group so it is not selected by default
        assert!(!categories.contains_key("Gifts"));
        assert_eq!(categories["Groceries"].average.annual(), 1200.0);
    }

    #[test]
    fn test_reload_replaces_everything() {
        let mut analyzer = ExpenseAnalyzer::default();
        analyzer.load(transactions());
        analyzer.toggle_group("Household");
        analyzer.select_time_range("last-year").unwrap();

        analyzer.load(vec![
            Transaction::new(date(2020, 5, 5), "Books", 40.0).with_group("Leisure"),
        ]);

        assert_eq!(analyzer.store().len(), 1);
        assert_eq!(analyzer.selection().groups(), &["Leisure"]);
        assert_eq!(analyzer.selection().time_range(), Some(DEFAULT_RANGE_ID));
        assert_eq!(analyzer.selected_years().unwrap(), vec!["2019", "2020"]);

        analyzer.load(Vec::new());
        assert!(analyzer.selected_years().unwrap().is_empty());
        assert!(analyzer.category_aggregates().unwrap().is_empty());
        assert!(matches!(
            analyzer.compare("ytd", "last-year"),
            Err(RollupError::EmptyBatch)
        ));
    }

    #[test]
    fn test_group_aggregates_follow_selection() {
        let mut analyzer = ExpenseAnalyzer::default();
        analyzer.load(transactions());
        analyzer.toggle_group("Transport");

        let groups = analyzer.group_aggregates().unwrap();
        assert_eq!(groups.len(), 2);
        assert!(groups["Transport"].average.metric.is_zero());
        assert_eq!(groups["Household"].year("2024").annual(), 14400.0);
    }

    #[test]
    fn test_selection_total_and_report() {
        let mut analyzer = ExpenseAnalyzer::default();
        analyzer.load(transactions());
        analyzer.select_all_years();

        assert_eq!(
            analyzer.selection_total().unwrap(),
            1800.0 + 12000.0 + 2400.0 + 520.0 + 260.0
        );

        analyzer.selection_mut().toggle_category("Gifts");
        let report = analyzer
            .report(ReportOptions {
                hide_zero_categories: true,
            })
            .unwrap();
        assert_eq!(report.years, vec!["2023", "2024", "2025"]);
        assert_eq!(report.sections.len(), 2);
        let expected = (1800.0 + 12000.0 + 2400.0 + 520.0 + 260.0 + 300.0) / 3.0;
        assert!((report.total.average.annual() - expected).abs() < 1e-9);
    }

    #[test]
    fn test_unknown_range_is_reported() {
        let mut analyzer = ExpenseAnalyzer::default();
        analyzer.load(transactions());

        assert!(matches!(
            analyzer.select_time_range("last-decade"),
            Err(RollupError::UnknownRange(_))
        ));
        assert_eq!(analyzer.selection().time_range(), Some(DEFAULT_RANGE_ID));
    }
}
