//! Selection state over a loaded batch.
//!
//! Years come either from a named time range or from an explicit set, never both.
//! Categories always follow the selected groups: any group change recomputes them
//! from scratch and drops earlier manual category edits.

use crate::error::{Result, RollupError};
use crate::store::TransactionStore;
use crate::time_ranges::{TimeRangeCatalog, DEFAULT_RANGE_ID};
use crate::utils::years_covered;
use indexmap::IndexSet;
use log::debug;
use serde::Serialize;
use std::collections::BTreeSet;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "mode", content = "value", rename_all = "snake_case")]
pub enum YearSelection {
    ByTimeRange(String),
    Explicit(BTreeSet<String>),
}

impl Default for YearSelection {
    fn default() -> Self {
        YearSelection::Explicit(BTreeSet::new())
    }
}

impl YearSelection {
    pub fn time_range(&self) -> Option<&str> {
        match self {
            YearSelection::ByTimeRange(id) => Some(id.as_str()),
            YearSelection::Explicit(_) => None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SelectionResolver {
    years: YearSelection,
    groups: Vec<String>,
    categories: Vec<String>,
}

impl SelectionResolver {
    /// Nothing selected, no time range.
    pub fn new() -> Self {
        Self::default()
    }

    /// Default selection for a freshly loaded batch: the last 12 months and every
    /// group. An empty batch gets an empty selection.
    pub fn for_store(store: &TransactionStore) -> Self {
        let mut resolver = Self::new();
        if store.is_empty() || store.bounds().is_none() {
            return resolver;
        }

        resolver.years = YearSelection::ByTimeRange(DEFAULT_RANGE_ID.to_string());
        resolver.groups = store.groups().to_vec();
        resolver.sync_categories(store);
        resolver
    }

    pub fn year_selection(&self) -> &YearSelection {
        &self.years
    }

    pub fn time_range(&self) -> Option<&str> {
        self.years.time_range()
    }

    pub fn groups(&self) -> &[String] {
        &self.groups
    }

    pub fn categories(&self) -> &[String] {
        &self.categories
    }

    /// Effective year labels, ascending. A time range is resolved against the
    /// store's date bounds; an empty or undated store selects no years.
    pub fn years(&self, catalog: &TimeRangeCatalog, store: &TransactionStore) -> Result<Vec<String>> {
        match &self.years {
            YearSelection::Explicit(years) => Ok(years.iter().cloned().collect()),
            YearSelection::ByTimeRange(id) => {
                let Some((earliest, latest)) = store.bounds() else {
                    return Ok(Vec::new());
                };
                let (start, end) = catalog.resolve(id, earliest, latest)?;
                Ok(years_covered(start, end))
            }
        }
    }

    /// Switches to a time range. Picking the active range again deselects it and
    /// leaves no years selected.
    pub fn select_time_range(&mut self, id: &str, catalog: &TimeRangeCatalog) -> Result<()> {
        if !catalog.contains(id) {
            return Err(RollupError::UnknownRange(id.to_string()));
        }

        if self.time_range() == Some(id) {
            debug!("Time range '{}' deselected", id);
            self.years = YearSelection::default();
        } else {
            debug!("Time range '{}' selected", id);
            self.years = YearSelection::ByTimeRange(id.to_string());
        }
        Ok(())
    }

    pub fn clear_time_range(&mut self) {
        self.years = YearSelection::default();
    }

    /// Toggles one year. Leaves time-range mode, starting from the years the range
    /// currently covers.
    pub fn toggle_year(
        &mut self,
        year: &str,
        catalog: &TimeRangeCatalog,
        store: &TransactionStore,
    ) -> Result<()> {
        let mut years: BTreeSet<String> = self.years(catalog, store)?.into_iter().collect();

        if !years.remove(year) {
            years.insert(year.to_string());
        }

        self.years = YearSelection::Explicit(years);
        Ok(())
    }

    pub fn select_all_years(&mut self, store: &TransactionStore) {
        self.years = YearSelection::Explicit(store.years().iter().cloned().collect());
    }

    pub fn clear_years(&mut self) {
        self.years = YearSelection::default();
    }

    pub fn toggle_group(&mut self, group: &str, store: &TransactionStore) {
        if let Some(pos) = self.groups.iter().position(|g| g == group) {
            self.groups.remove(pos);
        } else {
            self.groups.push(group.to_string());
        }
        self.sync_categories(store);
    }

    pub fn select_all_groups(&mut self, store: &TransactionStore) {
        self.groups = store.groups().to_vec();
        self.sync_categories(store);
    }

    pub fn clear_groups(&mut self, store: &TransactionStore) {
        self.groups.clear();
        self.sync_categories(store);
    }

    /// Manual category edit. Lasts only until the next group change.
    pub fn toggle_category(&mut self, category: &str) {
        if let Some(pos) = self.categories.iter().position(|c| c == category) {
            self.categories.remove(pos);
        } else {
            self.categories.push(category.to_string());
        }
    }

    pub fn select_all_categories(&mut self, store: &TransactionStore) {
        self.categories = store.categories().to_vec();
    }

    pub fn clear_categories(&mut self) {
        self.categories.clear();
    }

    fn sync_categories(&mut self, store: &TransactionStore) {
        let membership = store.membership();
        let categories: IndexSet<&String> = self
            .groups
            .iter()
            .flat_map(|group| membership.members(group))
            .collect();

        self.categories = categories.into_iter().cloned().collect();
        debug!(
            "{} groups selected, {} categories follow",
            self.groups.len(),
            self.categories.len()
        );
    }
}
