use crate::comparison::{percent_difference, Comparison, PercentDifference};
use crate::engine::sum_categories;
use crate::schema::{CategoryAggregate, CategoryAggregates, GroupAggregates, PeriodMetric};
use indexmap::IndexMap;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct ReportOptions {
    #[serde(default)]
    #[schemars(description = "Leave out categories with no positive total in any displayed period")]
    pub hide_zero_categories: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportRow {
    pub label: String,
    pub average: PeriodMetric,
    pub years: IndexMap<String, PeriodMetric>,
}

impl ReportRow {
    fn from_aggregate(label: impl Into<String>, aggregate: &CategoryAggregate, years: &[String]) -> Self {
        Self {
            label: label.into(),
            average: aggregate.average,
            years: years
                .iter()
                .map(|year| (year.clone(), aggregate.year(year)))
                .collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupSection {
    pub group: String,
    /// 1-based position of the group among all groups, skipped groups included
    pub position: usize,
    pub categories: Vec<ReportRow>,
    pub subtotal: ReportRow,
}

/// Category and group rollup laid out as a table: a grand total, then each group
/// with its displayed categories and a subtotal.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SummaryReport {
    pub years: Vec<String>,
    pub total: ReportRow,
    pub sections: Vec<GroupSection>,
}

impl SummaryReport {
    /// `group_order` lists every group in display order. Categories are displayed
    /// sorted; a group without displayed categories gets no section. The grand
    /// total covers every displayed category, grouped or not.
    pub fn build(
        categories: &CategoryAggregates,
        groups: &GroupAggregates,
        group_order: &[String],
        years: &[String],
        options: ReportOptions,
    ) -> Self {
        let mut displayed: Vec<&String> = categories
            .iter()
            .filter(|(_, aggregate)| !options.hide_zero_categories || !aggregate.is_non_positive())
            .map(|(category, _)| category)
            .collect();
        displayed.sort();

        let total = ReportRow::from_aggregate(
            "Total",
            &sum_categories(categories, displayed.iter().copied(), years),
            years,
        );

        let mut sections = Vec::new();
        for (index, group) in group_order.iter().enumerate() {
            let Some(group_aggregate) = groups.get(group) else {
                continue;
            };

            let rows: Vec<ReportRow> = displayed
                .iter()
                .filter(|category| group_aggregate.contains(category))
                .filter_map(|category| {
                    categories
                        .get(*category)
                        .map(|aggregate| ReportRow::from_aggregate(*category, aggregate, years))
                })
                .collect();

            if rows.is_empty() {
                continue;
            }

            let subtotal = ReportRow {
                label: format!("SUB TOTAL {} - {}", index + 1, group),
                average: group_aggregate.average.metric,
                years: years
                    .iter()
                    .map(|year| (year.clone(), group_aggregate.year(year)))
                    .collect(),
            };

            sections.push(GroupSection {
                group: group.clone(),
                position: index + 1,
                categories: rows,
                subtotal,
            });
        }

        Self {
            years: years.to_vec(),
            total,
            sections,
        }
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    pub fn to_csv(&self) -> String {
        let mut output = String::new();

        output.push_str("Section,Row,Average Annual,Average Monthly,Average Weekly");
        for year in &self.years {
            output.push_str(&format!(",{0} Annual,{0} Monthly,{0} Weekly", year));
        }
        output.push('\n');

        push_csv_row(&mut output, "Total", &self.total, &self.years);
        for section in &self.sections {
            for row in &section.categories {
                push_csv_row(&mut output, &section.group, row, &self.years);
            }
            push_csv_row(&mut output, &section.group, &section.subtotal, &self.years);
        }

        output
    }
}

fn push_csv_row(output: &mut String, section: &str, row: &ReportRow, years: &[String]) {
    output.push_str(&format!(
        "{},{},{}",
        csv_field(section),
        csv_field(&row.label),
        metric_cells(&row.average)
    ));
    for year in years {
        let metric = row.years.get(year).copied().unwrap_or_default();
        output.push_str(&format!(",{}", metric_cells(&metric)));
    }
    output.push('\n');
}

fn metric_cells(metric: &PeriodMetric) -> String {
    format!(
        "{:.2},{:.2},{:.2}",
        metric.annual(),
        metric.monthly(),
        metric.weekly()
    )
}

fn csv_field(value: &str) -> String {
    if value.contains(',') || value.contains('"') || value.contains('\n') {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ComparisonRow {
    pub label: String,
    pub first: PeriodMetric,
    pub second: PeriodMetric,
    pub difference: PercentDifference,
}

impl ComparisonRow {
    fn new(label: impl Into<String>, first: PeriodMetric, second: PeriodMetric) -> Self {
        Self {
            label: label.into(),
            first,
            second,
            difference: percent_difference(first.annual(), second.annual()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ComparisonSection {
    pub group: String,
    pub position: usize,
    pub categories: Vec<ComparisonRow>,
    pub subtotal: ComparisonRow,
}

/// Side-by-side averages of two periods with percent differences.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ComparisonReport {
    pub first_label: String,
    pub second_label: String,
    /// Period totals (not averages), with their monthly and weekly derivations
    pub total: ComparisonRow,
    pub sections: Vec<ComparisonSection>,
}

impl ComparisonReport {
    /// `categories` and `group_order` give display order. With
    /// `hide_zero_categories`, a category stays when either period's average is
    /// positive.
    pub fn build(
        comparison: &Comparison,
        categories: &[String],
        group_order: &[String],
        options: ReportOptions,
    ) -> Self {
        let first = &comparison.first;
        let second = &comparison.second;

        let displayed: Vec<&String> = categories
            .iter()
            .filter(|category| {
                !options.hide_zero_categories
                    || first.category_average(category) > 0.0
                    || second.category_average(category) > 0.0
            })
            .collect();

        let mut sections = Vec::new();
        for (index, group) in group_order.iter().enumerate() {
            let Some(first_group) = first.groups.get(group) else {
                continue;
            };

            let rows: Vec<ComparisonRow> = displayed
                .iter()
                .filter(|category| first_group.contains(category))
                .map(|category| {
                    ComparisonRow::new(
                        category.as_str(),
                        average_of(&first.categories, category),
                        average_of(&second.categories, category),
                    )
                })
                .collect();

            if rows.is_empty() {
                continue;
            }

            let second_average = second
                .groups
                .get(group)
                .map(|g| g.average.metric)
                .unwrap_or_default();

            sections.push(ComparisonSection {
                group: group.clone(),
                position: index + 1,
                categories: rows,
                subtotal: ComparisonRow::new(
                    format!("SUB TOTAL {} - {}", index + 1, group),
                    first_group.average.metric,
                    second_average,
                ),
            });
        }

        Self {
            first_label: first.range.label.clone(),
            second_label: second.range.label.clone(),
            total: ComparisonRow::new(
                "Total",
                PeriodMetric::from_annual(first.total),
                PeriodMetric::from_annual(second.total),
            ),
            sections,
        }
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

fn average_of(categories: &CategoryAggregates, category: &str) -> PeriodMetric {
    categories
        .get(category)
        .map(|c| c.average)
        .unwrap_or_default()
}
