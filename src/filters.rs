// SPDX-FileCopyrightText: 2025 Joost van der Laan <joost@fashionunited.com>
//
// SPDX-License-Identifier: AGPL-3.0-only

use crate::columns::ResolvedColumns;
use crate::models::{Dataset, Value};
use crate::utils::format_count;
use chrono::NaiveDate;
use serde::Serialize;
use std::borrow::Cow;
use std::collections::BTreeSet;

/// Sentinel entry of the category picker meaning "no constraint".
pub const ALL_CATEGORIES: &str = "All";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum CategorySelection {
    #[default]
    All,
    Only(String),
}

impl CategorySelection {
    pub fn from_choice(choice: &str) -> Self {
        if choice == ALL_CATEGORIES {
            CategorySelection::All
        } else {
            CategorySelection::Only(choice.to_string())
        }
    }

    pub fn label(&self) -> &str {
        match self {
            CategorySelection::All => ALL_CATEGORIES,
            CategorySelection::Only(c) => c,
        }
    }
}

/// What the user asked for. The date filter only applies with exactly two endpoints.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterRequest {
    pub date_endpoints: Vec<NaiveDate>,
    pub category: CategorySelection,
}

impl FilterRequest {
    pub fn new(from: Option<NaiveDate>, to: Option<NaiveDate>, category: CategorySelection) -> Self {
        Self {
            date_endpoints: from.into_iter().chain(to).collect(),
            category,
        }
    }
}

/// Filters that took effect, plus the wording echoed on the report cover.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FilterCriteria {
    pub date_range: Option<(NaiveDate, NaiveDate)>,
    pub category: Option<String>,
    /// `None` when the dataset has no date column.
    pub date_description: Option<String>,
    /// `None` when the dataset has no category column.
    pub category_description: Option<String>,
    pub total_records: usize,
}

impl FilterCriteria {
    pub fn date_label(&self) -> &str {
        self.date_description.as_deref().unwrap_or("All Dates")
    }

    pub fn category_label(&self) -> &str {
        self.category_description.as_deref().unwrap_or("All Categories")
    }

    pub fn records_label(&self) -> String {
        format_count(self.total_records)
    }
}

#[derive(Debug, Clone)]
pub struct Filtered<'a> {
    pub dataset: Cow<'a, Dataset>,
    pub criteria: FilterCriteria,
}

fn date_in_range(row: &[Value], idx: usize, start: NaiveDate, end: NaiveDate) -> bool {
    row.get(idx)
        .and_then(Value::as_datetime)
        .map(|dt| dt.date() >= start && dt.date() <= end)
        .unwrap_or(false)
}

fn category_matches(row: &[Value], idx: usize, wanted: &str) -> bool {
    match row.get(idx) {
        Some(Value::Missing) | None => false,
        Some(value) => value.to_string() == wanted,
    }
}

/// Narrow `dataset` by the requested date range, then by category.
///
/// Returns the source dataset borrowed when no filter takes effect.
pub fn apply_filters<'a>(
    dataset: &'a Dataset,
    roles: &ResolvedColumns,
    request: &FilterRequest,
) -> Filtered<'a> {
    let mut current: Cow<'a, Dataset> = Cow::Borrowed(dataset);
    let mut date_range = None;
    let mut date_description = None;
    let mut category = None;
    let mut category_description = None;

    if let Some(idx) = roles.date.as_deref().and_then(|c| dataset.column_index(c)) {
        match request.date_endpoints.as_slice() {
            [start, end] => {
                let (start, end) = (*start, *end);
                current = Cow::Owned(current.retain_rows(|row| date_in_range(row, idx, start, end)));
                date_range = Some((start, end));
                date_description = Some(format!("{} to {}", start, end));
            }
            endpoints => {
                tracing::debug!(count = endpoints.len(), "date filter needs two endpoints, skipped");
                date_description = Some("All Dates".to_string());
            }
        }
    }

    if let Some(idx) = roles.category.as_deref().and_then(|c| dataset.column_index(c)) {
        if let CategorySelection::Only(wanted) = &request.category {
            current = Cow::Owned(current.retain_rows(|row| category_matches(row, idx, wanted)));
            category = Some(wanted.clone());
        }
        category_description = Some(request.category.label().to_string());
    }

    tracing::debug!(before = dataset.len(), after = current.len(), "filters applied");
    let total_records = current.len();
    Filtered {
        dataset: current,
        criteria: FilterCriteria {
            date_range,
            category,
            date_description,
            category_description,
            total_records,
        },
    }
}

/// Picker entries: the "All" sentinel followed by the sorted distinct categories.
pub fn category_options(dataset: &Dataset, roles: &ResolvedColumns) -> Vec<String> {
    let Some(column) = roles.category.as_deref() else {
        return Vec::new();
    };
    let distinct: BTreeSet<String> = dataset
        .column_values(column)
        .filter(|v| !v.is_missing())
        .map(Value::to_string)
        .collect();

    std::iter::once(ALL_CATEGORIES.to_string())
        .chain(distinct)
        .collect()
}

/// Earliest and latest calendar date in the date column.
pub fn date_bounds(dataset: &Dataset, roles: &ResolvedColumns) -> Option<(NaiveDate, NaiveDate)> {
    let column = roles.date.as_deref()?;
    let dates = dataset
        .column_values(column)
        .filter_map(Value::as_datetime)
        .map(|dt| dt.date());
    dates.fold(None, |acc, d| match acc {
        None => Some((d, d)),
        Some((lo, hi)) => Some((lo.min(d), hi.max(d))),
    })
}
