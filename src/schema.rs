use crate::error::Result;
use crate::utils::{
    date_from_serial, parse_amount, parse_us_date, year_label, MONTHS_PER_YEAR, WEEKS_PER_YEAR,
};
use chrono::{Datelike, NaiveDate};
use indexmap::IndexMap;
use log::warn;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::ops::{Add, AddAssign};

/// Date cell as exported from a spreadsheet: either text or a serial day number.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(untagged)]
pub enum RawDate {
    #[schemars(description = "Date written as M/D/YYYY, e.g. 3/31/2025")]
    Text(String),

    #[schemars(description = "Spreadsheet serial day number, e.g. 45747 for 2025-03-31")]
    Serial(f64),
}

/// Amount cell: either currency formatted text or a plain number.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(untagged)]
pub enum RawAmount {
    #[schemars(description = "Currency formatted text, may contain '$' and ',' (e.g. -$1,234.56)")]
    Text(String),

    #[schemars(description = "Plain numeric amount")]
    Number(f64),
}

/// One row of the transaction report, before normalization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "PascalCase")]
pub struct RawTransaction {
    #[serde(default)]
    pub date: Option<RawDate>,

    #[serde(default)]
    pub payee: String,

    #[serde(default)]
    pub category: String,

    #[serde(default)]
    pub amount: Option<RawAmount>,

    #[serde(default)]
    pub tag: String,

    #[serde(default)]
    #[schemars(description = "Group the category belongs to. Empty leaves the category ungrouped.")]
    pub group: String,
}

impl RawTransaction {
    /// Normalizes a raw row. Bad dates and amounts never reject the row: they
    /// become `None` and the row is kept.
    pub fn normalize(&self) -> Transaction {
        let date = match &self.date {
            Some(raw) => match raw.resolve() {
                Ok(date) => Some(date),
                Err(e) => {
                    warn!("Keeping transaction for '{}' without a date: {}", self.payee, e);
                    None
                }
            },
            None => None,
        };

        let amount = match &self.amount {
            Some(RawAmount::Text(text)) => parse_amount(text),
            Some(RawAmount::Number(value)) => Some(*value).filter(|v| v.is_finite()),
            None => None,
        };

        let group = Some(self.group.trim())
            .filter(|g| !g.is_empty())
            .map(str::to_string);

        Transaction {
            date,
            payee: self.payee.clone(),
            category: self.category.clone(),
            amount,
            tag: self.tag.clone(),
            group,
        }
    }
}

impl RawDate {
    pub fn resolve(&self) -> Result<NaiveDate> {
        match self {
            RawDate::Text(text) => parse_us_date(text),
            RawDate::Serial(serial) => date_from_serial(*serial),
        }
    }
}

/// A normalized transaction. Immutable once loaded into a store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    /// `None` when the source date could not be read
    pub date: Option<NaiveDate>,
    pub payee: String,
    pub category: String,
    /// `None` when the source amount could not be parsed; such rows add nothing to sums
    pub amount: Option<f64>,
    pub tag: String,
    pub group: Option<String>,
}

impl Transaction {
    pub fn new(date: NaiveDate, category: impl Into<String>, amount: f64) -> Self {
        Self {
            date: Some(date),
            payee: String::new(),
            category: category.into(),
            amount: Some(amount).filter(|v| v.is_finite()),
            tag: String::new(),
            group: None,
        }
    }

    pub fn with_group(mut self, group: impl Into<String>) -> Self {
        let group = group.into();
        self.group = if group.is_empty() { None } else { Some(group) };
        self
    }

    pub fn with_payee(mut self, payee: impl Into<String>) -> Self {
        self.payee = payee.into();
        self
    }

    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tag = tag.into();
        self
    }

    pub fn year(&self) -> Option<i32> {
        self.date.map(|d| d.year())
    }

    pub fn year_label(&self) -> Option<String> {
        self.date.map(year_label)
    }

    /// Amount as it contributes to sums: unparsable amounts count as zero.
    pub fn contribution(&self) -> f64 {
        self.amount.unwrap_or(0.0)
    }
}

/// Annual figure with its monthly (/12) and weekly (/52) derivations.
///
/// The derived fields can only be produced from `annual`, so they never drift.
/// Adding two metrics adds component-wise, which keeps the relation intact.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct PeriodMetric {
    annual: f64,
    monthly: f64,
    weekly: f64,
}

impl PeriodMetric {
    pub const ZERO: PeriodMetric = PeriodMetric {
        annual: 0.0,
        monthly: 0.0,
        weekly: 0.0,
    };

    pub fn from_annual(annual: f64) -> Self {
        Self {
            annual,
            monthly: annual / MONTHS_PER_YEAR,
            weekly: annual / WEEKS_PER_YEAR,
        }
    }

    pub fn annual(&self) -> f64 {
        self.annual
    }

    pub fn monthly(&self) -> f64 {
        self.monthly
    }

    pub fn weekly(&self) -> f64 {
        self.weekly
    }

    pub fn is_zero(&self) -> bool {
        self.annual == 0.0
    }
}

impl Add for PeriodMetric {
    type Output = PeriodMetric;

    fn add(self, rhs: PeriodMetric) -> PeriodMetric {
        PeriodMetric {
            annual: self.annual + rhs.annual,
            monthly: self.monthly + rhs.monthly,
            weekly: self.weekly + rhs.weekly,
        }
    }
}

impl AddAssign for PeriodMetric {
    fn add_assign(&mut self, rhs: PeriodMetric) {
        *self = *self + rhs;
    }
}

/// Totals of one category, per year label plus the cross-year average.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CategoryAggregate {
    pub years: IndexMap<String, PeriodMetric>,
    pub average: PeriodMetric,
}

impl CategoryAggregate {
    /// Metric for a year, zero when the year was not part of the aggregation.
    pub fn year(&self, year: &str) -> PeriodMetric {
        self.years.get(year).copied().unwrap_or_default()
    }

    /// True when no year and not the average carries a positive annual total.
    pub fn is_non_positive(&self) -> bool {
        self.average.annual() <= 0.0 && self.years.values().all(|m| m.annual() <= 0.0)
    }
}

/// A group's metric for one period, with the categories summed into it.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct GroupMetric {
    #[serde(flatten)]
    pub metric: PeriodMetric,
    pub categories: Vec<String>,
}

impl GroupMetric {
    pub fn absorb(&mut self, category: &str, metric: PeriodMetric) {
        self.categories.push(category.to_string());
        self.metric += metric;
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct GroupAggregate {
    pub years: IndexMap<String, GroupMetric>,
    pub average: GroupMetric,
}

impl GroupAggregate {
    pub fn year(&self, year: &str) -> PeriodMetric {
        self.years.get(year).map(|g| g.metric).unwrap_or_default()
    }

    pub fn categories(&self) -> &[String] {
        &self.average.categories
    }

    pub fn contains(&self, category: &str) -> bool {
        self.average.categories.iter().any(|c| c == category)
    }
}

/// Category aggregates in the order the categories were requested.
pub type CategoryAggregates = IndexMap<String, CategoryAggregate>;

/// Group aggregates in the order the groups were requested.
pub type GroupAggregates = IndexMap<String, GroupAggregate>;
