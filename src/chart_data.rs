// SPDX-FileCopyrightText: 2025 Joost van der Laan <joost@fashionunited.com>
//
// SPDX-License-Identifier: AGPL-3.0-only

//! Rendering-independent aggregations behind each chart.
//!
//! Every preparation returns an empty structure when its columns are
//! unbound or the dataset has no rows.

use crate::columns::{ResolvedColumns, Role};
use crate::models::{Dataset, Value};
use chrono::{Datelike, NaiveDate};
use serde::Serialize;
use std::collections::BTreeMap;

pub const TOP_CATEGORY_LIMIT: usize = 10;
pub const HISTOGRAM_BINS: usize = 50;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ChartKind {
    SalesTrend,
    TopCategories,
    Distribution,
    Monthly,
}

impl ChartKind {
    /// Fixed report order.
    pub const ALL: [ChartKind; 4] = [
        ChartKind::SalesTrend,
        ChartKind::TopCategories,
        ChartKind::Distribution,
        ChartKind::Monthly,
    ];

    /// Roles that must be bound for the chart to exist at all.
    pub fn required_roles(&self) -> &'static [Role] {
        match self {
            ChartKind::SalesTrend | ChartKind::Monthly => &[Role::Date, Role::Amount],
            ChartKind::TopCategories => &[Role::Category, Role::Amount],
            ChartKind::Distribution => &[Role::Amount],
        }
    }

    pub fn is_available(&self, roles: &ResolvedColumns) -> bool {
        roles.all_bound(self.required_roles())
    }

    pub fn file_stem(&self) -> &'static str {
        match self {
            ChartKind::SalesTrend => "sales_trend",
            ChartKind::TopCategories => "top_categories",
            ChartKind::Distribution => "sales_distribution",
            ChartKind::Monthly => "monthly_sales",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrendPoint {
    pub date: NaiveDate,
    pub sales: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryTotal {
    pub category: String,
    pub revenue: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonthTotal {
    pub year: i32,
    pub month: u32,
    pub sales: f64,
}

impl MonthTotal {
    /// `YYYY-MM`
    pub fn label(&self) -> String {
        format!("{:04}-{:02}", self.year, self.month)
    }
}

/// Equal-width histogram; `edges.len() == counts.len() + 1` unless empty.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Histogram {
    pub edges: Vec<f64>,
    pub counts: Vec<usize>,
}

impl Histogram {
    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }
}

/// All four chart inputs for one pass.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ChartData {
    pub trend: Vec<TrendPoint>,
    pub top_categories: Vec<CategoryTotal>,
    pub distribution: Histogram,
    pub monthly: Vec<MonthTotal>,
}

impl ChartData {
    pub fn prepare(dataset: &Dataset, roles: &ResolvedColumns) -> Self {
        Self {
            trend: sales_trend(dataset, roles),
            top_categories: top_categories(dataset, roles, TOP_CATEGORY_LIMIT),
            distribution: distribution(dataset, roles, HISTOGRAM_BINS),
            monthly: monthly_sales(dataset, roles),
        }
    }
}

/// (date-ish cell, amount) pairs for rows where both are present.
fn dated_amounts<'a>(
    dataset: &'a Dataset,
    date_column: &str,
    amount_column: &str,
) -> impl Iterator<Item = (NaiveDate, f64)> + 'a {
    let date_idx = dataset.column_index(date_column);
    let amount_idx = dataset.column_index(amount_column);
    dataset.rows().iter().filter_map(move |row| {
        let date = row.get(date_idx?)?.as_datetime()?.date();
        let amount = row.get(amount_idx?)?.as_f64().filter(|a| a.is_finite())?;
        Some((date, amount))
    })
}

/// Daily totals, ascending by date. No gap filling.
pub fn sales_trend(dataset: &Dataset, roles: &ResolvedColumns) -> Vec<TrendPoint> {
    let (Some(date_col), Some(amount_col)) = (roles.date.as_deref(), roles.amount.as_deref()) else {
        return Vec::new();
    };

    let mut daily: BTreeMap<NaiveDate, f64> = BTreeMap::new();
    for (date, amount) in dated_amounts(dataset, date_col, amount_col) {
        *daily.entry(date).or_insert(0.0) += amount;
    }
    daily
        .into_iter()
        .map(|(date, sales)| TrendPoint { date, sales })
        .collect()
}

/// Revenue per category, highest first, at most `limit` entries.
///
/// Groups are visited in sorted key order and the sort is stable, so equal
/// revenues keep that order.
pub fn top_categories(dataset: &Dataset, roles: &ResolvedColumns, limit: usize) -> Vec<CategoryTotal> {
    let (Some(cat_col), Some(amount_col)) = (roles.category.as_deref(), roles.amount.as_deref()) else {
        return Vec::new();
    };
    let (Some(cat_idx), Some(amount_idx)) = (dataset.column_index(cat_col), dataset.column_index(amount_col)) else {
        return Vec::new();
    };

    let mut grouped: BTreeMap<String, f64> = BTreeMap::new();
    for row in dataset.rows() {
        let category = match row.get(cat_idx) {
            Some(Value::Missing) | None => continue,
            Some(value) => value.to_string(),
        };
        let amount = row
            .get(amount_idx)
            .and_then(Value::as_f64)
            .filter(|a| a.is_finite())
            .unwrap_or(0.0);
        *grouped.entry(category).or_insert(0.0) += amount;
    }

    let mut totals: Vec<CategoryTotal> = grouped
        .into_iter()
        .map(|(category, revenue)| CategoryTotal { category, revenue })
        .collect();
    totals.sort_by(|a, b| b.revenue.total_cmp(&a.revenue));
    totals.truncate(limit);
    totals
}

/// `bins` equal-width buckets over the observed min..max of the amount column.
///
/// The last bucket is closed on the right. A column holding a single distinct
/// value is spread over `value - 0.5 .. value + 0.5`.
pub fn distribution(dataset: &Dataset, roles: &ResolvedColumns, bins: usize) -> Histogram {
    let Some(amount_col) = roles.amount.as_deref() else {
        return Histogram::default();
    };
    let values = dataset.numbers(amount_col);
    if values.is_empty() || bins == 0 {
        return Histogram::default();
    }

    let (mut lo, mut hi) = values
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| (lo.min(*v), hi.max(*v)));
    if lo == hi {
        lo -= 0.5;
        hi += 0.5;
    }

    let width = (hi - lo) / bins as f64;
    let edges: Vec<f64> = (0..=bins).map(|i| lo + width * i as f64).collect();
    let mut counts = vec![0usize; bins];
    for v in values {
        let idx = (((v - lo) / width).floor() as usize).min(bins - 1);
        counts[idx] += 1;
    }

    Histogram { edges, counts }
}

/// Monthly totals in chronological order.
pub fn monthly_sales(dataset: &Dataset, roles: &ResolvedColumns) -> Vec<MonthTotal> {
    let (Some(date_col), Some(amount_col)) = (roles.date.as_deref(), roles.amount.as_deref()) else {
        return Vec::new();
    };

    let mut months: BTreeMap<(i32, u32), f64> = BTreeMap::new();
    for (date, amount) in dated_amounts(dataset, date_col, amount_col) {
        *months.entry((date.year(), date.month())).or_insert(0.0) += amount;
    }
    months
        .into_iter()
        .map(|((year, month), sales)| MonthTotal { year, month, sales })
        .collect()
}
