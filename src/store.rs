use crate::schema::{RawTransaction, Transaction};
use chrono::NaiveDate;
use log::{debug, info, warn};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};

/// A category seen under a second group after it was already assigned to a first one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MembershipConflict {
    pub category: String,
    pub kept_group: String,
    pub dropped_group: String,
}

/// Category to group membership, built with first write wins.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Membership {
    category_group: BTreeMap<String, String>,
    group_members: BTreeMap<String, Vec<String>>,
    conflicts: Vec<MembershipConflict>,
}

impl Membership {
    /// Folds transactions in order. A category is attached to the group of the first
    /// row that carries both a group and a category and is never reassigned.
    pub fn from_transactions<'a>(transactions: impl IntoIterator<Item = &'a Transaction>) -> Self {
        let mut membership = Membership::default();

        for tx in transactions {
            let Some(group) = tx.group.as_deref() else {
                continue;
            };
            if tx.category.is_empty() {
                continue;
            }
            membership.assign(&tx.category, group);
        }

        membership
    }

    fn assign(&mut self, category: &str, group: &str) {
        self.group_members.entry(group.to_string()).or_default();

        match self.category_group.get(category) {
            Some(kept) if kept == group => {}
            Some(kept) => {
                let already_reported = self
                    .conflicts
                    .iter()
                    .any(|c| c.category == category && c.dropped_group == group);
                if !already_reported {
                    warn!(
                        "Category '{}' also appears under group '{}', keeping '{}'",
                        category, group, kept
                    );
                    self.conflicts.push(MembershipConflict {
                        category: category.to_string(),
                        kept_group: kept.clone(),
                        dropped_group: group.to_string(),
                    });
                }
            }
            None => {
                self.category_group
                    .insert(category.to_string(), group.to_string());
                self.group_members
                    .entry(group.to_string())
                    .or_default()
                    .push(category.to_string());
            }
        }
    }

    pub fn group_of(&self, category: &str) -> Option<&str> {
        self.category_group.get(category).map(String::as_str)
    }

    /// Member categories of a group, in first-seen order.
    pub fn members(&self, group: &str) -> &[String] {
        self.group_members
            .get(group)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Every group name, sorted. Includes groups that lost all their categories
    /// to an earlier assignment.
    pub fn groups(&self) -> impl Iterator<Item = &str> {
        self.group_members.keys().map(String::as_str)
    }

    pub fn conflicts(&self) -> &[MembershipConflict] {
        &self.conflicts
    }

    pub fn is_empty(&self) -> bool {
        self.group_members.is_empty()
    }
}

/// One loaded batch of transactions and everything derived from it at load time.
///
/// The store is never mutated after construction. Loading new data means building
/// a new store.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TransactionStore {
    transactions: Vec<Transaction>,
    bounds: Option<(NaiveDate, NaiveDate)>,
    categories: Vec<String>,
    years: Vec<String>,
    groups: Vec<String>,
    membership: Membership,
}

impl TransactionStore {
    pub fn new(transactions: Vec<Transaction>) -> Self {
        if transactions.is_empty() {
            debug!("Building an empty transaction store");
            return Self::default();
        }

        let bounds = transactions
            .iter()
            .filter_map(|tx| tx.date)
            .fold(None, |acc: Option<(NaiveDate, NaiveDate)>, date| match acc {
                None => Some((date, date)),
                Some((first, last)) => Some((first.min(date), last.max(date))),
            });

        let categories: Vec<String> = transactions
            .iter()
            .map(|tx| tx.category.clone())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();

        let years: Vec<String> = transactions
            .iter()
            .filter_map(|tx| tx.year())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .map(|y| y.to_string())
            .collect();

        let membership = Membership::from_transactions(&transactions);
        let groups: Vec<String> = membership.groups().map(str::to_string).collect();

        let undated = transactions.iter().filter(|tx| tx.date.is_none()).count();
        if undated > 0 {
            warn!(
                "{} transactions have no usable date and are excluded from date bounds and year totals",
                undated
            );
        }

        info!(
            "Loaded {} transactions: {} categories, {} groups, {} years",
            transactions.len(),
            categories.len(),
            groups.len(),
            years.len()
        );
        if let Some((first, last)) = bounds {
            debug!("Transaction dates span {} .. {}", first, last);
        }

        Self {
            transactions,
            bounds,
            categories,
            years,
            groups,
            membership,
        }
    }

    pub fn from_raw(rows: &[RawTransaction]) -> Self {
        Self::new(rows.iter().map(RawTransaction::normalize).collect())
    }

    pub fn transactions(&self) -> &[Transaction] {
        &self.transactions
    }

    pub fn len(&self) -> usize {
        self.transactions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.transactions.is_empty()
    }

    /// Earliest and latest transaction dates, `None` when no row has a usable date.
    pub fn bounds(&self) -> Option<(NaiveDate, NaiveDate)> {
        self.bounds
    }

    pub fn earliest_date(&self) -> Option<NaiveDate> {
        self.bounds.map(|(first, _)| first)
    }

    pub fn latest_date(&self) -> Option<NaiveDate> {
        self.bounds.map(|(_, last)| last)
    }

    /// Distinct categories, sorted.
    pub fn categories(&self) -> &[String] {
        &self.categories
    }

    /// Distinct year labels, ascending.
    pub fn years(&self) -> &[String] {
        &self.years
    }

    /// Distinct groups, sorted.
    pub fn groups(&self) -> &[String] {
        &self.groups
    }

    pub fn membership(&self) -> &Membership {
        &self.membership
    }

    pub fn membership_conflicts(&self) -> &[MembershipConflict] {
        self.membership.conflicts()
    }

    pub fn undated_count(&self) -> usize {
        self.transactions.iter().filter(|tx| tx.date.is_none()).count()
    }

    pub fn unparsable_amount_count(&self) -> usize {
        self.transactions
            .iter()
            .filter(|tx| tx.amount.is_none())
            .count()
    }
}
