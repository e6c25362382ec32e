use crate::schema::{CategoryAggregate, CategoryAggregates, PeriodMetric, Transaction};
use chrono::NaiveDate;
use indexmap::{IndexMap, IndexSet};
use log::debug;
use std::collections::HashSet;

/// Folds transactions into category × year totals.
///
/// Every requested category is seeded with every requested year at zero, so the
/// result always has the full grid. Only transactions whose category and year are
/// both requested are added. An empty year or category selection yields an empty
/// map.
pub fn aggregate<'a>(
    transactions: impl IntoIterator<Item = &'a Transaction>,
    categories: &[String],
    years: &[String],
) -> CategoryAggregates {
    let categories: IndexSet<&str> = categories.iter().map(String::as_str).collect();
    let years: IndexSet<&str> = years.iter().map(String::as_str).collect();

    if categories.is_empty() || years.is_empty() {
        debug!(
            "Nothing to aggregate: {} categories, {} years selected",
            categories.len(),
            years.len()
        );
        return CategoryAggregates::new();
    }

    let mut annuals: IndexMap<&str, IndexMap<&str, f64>> = categories
        .iter()
        .map(|category| (*category, years.iter().map(|year| (*year, 0.0)).collect()))
        .collect();

    let mut counted = 0usize;
    for tx in transactions {
        let Some(year) = tx.year_label() else {
            continue;
        };
        let Some(per_year) = annuals.get_mut(tx.category.as_str()) else {
            continue;
        };
        if let Some(total) = per_year.get_mut(year.as_str()) {
            *total += tx.contribution();
            counted += 1;
        }
    }

    debug!(
        "Aggregated {} transactions into {} categories over {} years",
        counted,
        categories.len(),
        years.len()
    );

    let year_count = years.len() as f64;

    annuals
        .into_iter()
        .map(|(category, per_year)| {
            let sum: f64 = per_year.values().sum();
            let aggregate = CategoryAggregate {
                years: per_year
                    .into_iter()
                    .map(|(year, annual)| (year.to_string(), PeriodMetric::from_annual(annual)))
                    .collect(),
                average: PeriodMetric::from_annual(sum / year_count),
            };
            (category.to_string(), aggregate)
        })
        .collect()
}

/// Like [`aggregate`], restricted to transactions dated within `start..=end`.
pub fn aggregate_between<'a>(
    transactions: impl IntoIterator<Item = &'a Transaction>,
    categories: &[String],
    years: &[String],
    start: NaiveDate,
    end: NaiveDate,
) -> CategoryAggregates {
    aggregate(
        transactions
            .into_iter()
            .filter(|tx| tx.date.is_some_and(|d| d >= start && d <= end)),
        categories,
        years,
    )
}

/// Sums the annual total of every category in the map, averages excluded.
pub fn grand_total(aggregates: &CategoryAggregates) -> f64 {
    aggregates
        .values()
        .flat_map(|aggregate| aggregate.years.values())
        .map(PeriodMetric::annual)
        .sum()
}

/// Adds up the named categories into one total row, per year and for the average.
/// Categories missing from the map count as zero.
pub fn sum_categories<'a>(
    aggregates: &CategoryAggregates,
    categories: impl IntoIterator<Item = &'a String>,
    years: &[String],
) -> CategoryAggregate {
    let mut total = CategoryAggregate {
        years: years
            .iter()
            .map(|year| (year.clone(), PeriodMetric::ZERO))
            .collect(),
        average: PeriodMetric::ZERO,
    };

    for category in categories {
        let Some(aggregate) = aggregates.get(category) else {
            continue;
        };
        total.average += aggregate.average;
        for (year, metric) in total.years.iter_mut() {
            *metric += aggregate.year(year);
        }
    }

    total
}

/// Sum of parseable amounts passing the filters. An empty filter does not filter.
pub fn selection_total<'a>(
    transactions: impl IntoIterator<Item = &'a Transaction>,
    categories: &[String],
    years: &[String],
) -> f64 {
    let categories: HashSet<&str> = categories.iter().map(String::as_str).collect();
    let years: HashSet<&str> = years.iter().map(String::as_str).collect();

    transactions
        .into_iter()
        .filter(|tx| categories.is_empty() || categories.contains(tx.category.as_str()))
        .filter(|tx| {
            years.is_empty()
                || tx
                    .year_label()
                    .is_some_and(|year| years.contains(year.as_str()))
        })
        .map(Transaction::contribution)
        .sum()
}
