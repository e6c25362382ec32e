use crate::schema::{CategoryAggregates, GroupAggregate, GroupAggregates, GroupMetric};
use crate::store::Membership;
use log::debug;

/// Rolls category aggregates up into their groups.
///
/// Every requested group is seeded with zeroed entries for each year and for the
/// average. Categories are then visited in the map's order; a category whose group
/// is known and requested is appended to that group's category lists and its
/// metrics are added in. Ungrouped categories contribute to no group.
pub fn rollup(
    categories: &CategoryAggregates,
    groups: &[String],
    years: &[String],
    membership: &Membership,
) -> GroupAggregates {
    let mut result: GroupAggregates = groups
        .iter()
        .map(|group| {
            let aggregate = GroupAggregate {
                years: years
                    .iter()
                    .map(|year| (year.clone(), GroupMetric::default()))
                    .collect(),
                average: GroupMetric::default(),
            };
            (group.clone(), aggregate)
        })
        .collect();

    let mut ungrouped = 0usize;

    for (category, aggregate) in categories {
        let Some(group) = membership
            .group_of(category)
            .and_then(|group| result.get_mut(group))
        else {
            ungrouped += 1;
            continue;
        };

        group.average.absorb(category, aggregate.average);
        for (year, metric) in group.years.iter_mut() {
            metric.absorb(category, aggregate.year(year));
        }
    }

    debug!(
        "Rolled {} categories into {} groups ({} without a selected group)",
        categories.len() - ungrouped,
        result.len(),
        ungrouped
    );

    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::aggregate;
    use crate::schema::Transaction;
    use chrono::NaiveDate;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn strings(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| v.to_string()).collect()
    }

    fn sample() -> Vec<Transaction> {
        vec![
            Transaction::new(date(2023, 5, 1), "Groceries", 2400.0).with_group("Household"),
            Transaction::new(date(2024, 5, 1), "Groceries", 3600.0).with_group("Household"),
            Transaction::new(date(2024, 1, 1), "Rent", 12000.0).with_group("Household"),
            Transaction::new(date(2024, 2, 1), "Fuel", 520.0).with_group("Transport"),
            Transaction::new(date(2023, 2, 1), "Gifts", 300.0),
        ]
    }

    #[test]
    fn test_group_sums_match_categories() {
        let transactions = sample();
        let membership = Membership::from_transactions(&transactions);
        let years = strings(&["2023", "2024"]);
        let categories = aggregate(
            &transactions,
            &strings(&["Fuel", "Gifts", "Groceries", "Rent"]),
            &years,
        );

        let groups = rollup(
            &categories,
            &strings(&["Household", "Transport"]),
            &years,
            &membership,
        );

        let household = &groups["Household"];
        assert_eq!(household.categories(), &["Groceries", "Rent"]);
        assert_eq!(household.years["2023"].categories, vec!["Groceries", "Rent"]);
        assert_eq!(household.year("2023").annual(), 2400.0);
        assert_eq!(household.year("2024").annual(), 15600.0);

        for (group, aggregate) in &groups {
            let expected: f64 = aggregate
                .categories()
                .iter()
                .map(|c| categories[c].average.annual())
                .sum();
            assert!(
                (aggregate.average.metric.annual() - expected).abs() < 1e-9,
                "group {} average mismatch",
                group
            );
        }

        assert_eq!(groups["Transport"].average.metric.annual(), 260.0);
        assert_eq!(groups["Transport"].average.metric.weekly(), 5.0);
    }

    #[test]
    fn test_ungrouped_category_is_left_out() {
        let transactions = sample();
        let membership = Membership::from_transactions(&transactions);
        let years = strings(&["2023"]);
        let categories = aggregate(&transactions, &strings(&["Gifts"]), &years);

        let groups = rollup(
            &categories,
            &strings(&["Household", "Transport"]),
            &years,
            &membership,
        );

        assert_eq!(categories["Gifts"].year("2023").annual(), 300.0);
        assert!(groups.values().all(|g| !g.contains("Gifts")));
        assert!(groups.values().all(|g| g.average.metric.is_zero()));
    }

    #[test]
    fn test_unrequested_group_is_skipped() {
        let transactions = sample();
        let membership = Membership::from_transactions(&transactions);
        let years = strings(&["2024"]);
        let categories = aggregate(&transactions, &strings(&["Fuel", "Rent"]), &years);

        let groups = rollup(&categories, &strings(&["Transport"]), &years, &membership);

        assert_eq!(groups.len(), 1);
        assert_eq!(groups["Transport"].categories(), &["Fuel"]);
    }

    #[test]
    fn test_categories_follow_aggregate_order() {
        let transactions = sample();
        let membership = Membership::from_transactions(&transactions);
        let years = strings(&["2024"]);
        let categories = aggregate(&transactions, &strings(&["Rent", "Groceries"]), &years);

        let groups = rollup(&categories, &strings(&["Household"]), &years, &membership);
        assert_eq!(groups["Household"].categories(), &["Rent", "Groceries"]);
    }
}
