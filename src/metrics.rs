// SPDX-FileCopyrightText: 2025 Joost van der Laan <joost@fashionunited.com>
//
// SPDX-License-Identifier: AGPL-3.0-only

use crate::columns::ResolvedColumns;
use crate::error::DashboardError;
use crate::models::Dataset;
use crate::utils::{format_count, format_currency, format_thousands};
use serde::Serialize;
use std::collections::BTreeMap;

/// Placeholder shown for a metric that cannot be computed.
pub const NOT_AVAILABLE: &str = "N/A";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MetricKey {
    TotalSales,
    AvgOrderValue,
    TotalOrders,
    TotalUnits,
}

impl MetricKey {
    /// Tile order, row by row.
    pub const ALL: [MetricKey; 4] = [
        MetricKey::TotalSales,
        MetricKey::AvgOrderValue,
        MetricKey::TotalOrders,
        MetricKey::TotalUnits,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            MetricKey::TotalSales => "TOTAL SALES",
            MetricKey::AvgOrderValue => "AVG ORDER VALUE",
            MetricKey::TotalOrders => "TOTAL ORDERS",
            MetricKey::TotalUnits => "TOTAL UNITS SOLD",
        }
    }
}

/// Raw summary numbers. `None` where the backing column is unbound.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Metrics {
    pub total_sales: Option<f64>,
    pub avg_order_value: Option<f64>,
    pub total_orders: usize,
    pub total_units: Option<f64>,
}

/// Sums and counts only; never fails. `avg_order_value` is left `None`.
pub fn compute_totals(dataset: &Dataset, roles: &ResolvedColumns) -> Metrics {
    let sum_of = |column: Option<&str>| column.map(|c| dataset.numbers(c).iter().sum::<f64>());
    Metrics {
        total_sales: sum_of(roles.amount.as_deref()),
        avg_order_value: None,
        total_orders: dataset.len(),
        total_units: sum_of(roles.quantity.as_deref()),
    }
}

/// Arithmetic mean of the amount column. An empty selection is an error, not zero.
pub fn average_order_value(dataset: &Dataset, amount_column: &str) -> Result<f64, DashboardError> {
    let amounts = dataset.numbers(amount_column);
    if amounts.is_empty() {
        return Err(DashboardError::EmptySelection {
            column: amount_column.to_string(),
        });
    }
    Ok(amounts.iter().sum::<f64>() / amounts.len() as f64)
}

/// Totals plus the average order value when an amount column is bound.
pub fn compute_metrics(dataset: &Dataset, roles: &ResolvedColumns) -> Result<Metrics, DashboardError> {
    let mut metrics = compute_totals(dataset, roles);
    if let Some(amount) = roles.amount.as_deref() {
        metrics.avg_order_value = Some(average_order_value(dataset, amount)?);
    }
    Ok(metrics)
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricEntry {
    pub display: String,
    pub raw: Option<f64>,
}

/// Display-ready metrics keyed by tile.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MetricsBundle {
    entries: BTreeMap<MetricKey, MetricEntry>,
}

impl MetricsBundle {
    pub fn from_metrics(metrics: &Metrics, roles: &ResolvedColumns) -> Self {
        let mut entries = BTreeMap::new();

        if roles.amount.is_some() {
            if let Some(total) = metrics.total_sales {
                entries.insert(MetricKey::TotalSales, MetricEntry { display: format_currency(total), raw: Some(total) });
            }
            if let Some(avg) = metrics.avg_order_value {
                entries.insert(MetricKey::AvgOrderValue, MetricEntry { display: format_currency(avg), raw: Some(avg) });
            }
        }

        entries.insert(
            MetricKey::TotalOrders,
            MetricEntry {
                display: format_count(metrics.total_orders),
                raw: Some(metrics.total_orders as f64),
            },
        );

        // The units tile always exists; without a quantity column it carries the marker and no number.
        let units = match (roles.quantity.as_ref(), metrics.total_units) {
            (Some(_), Some(units)) => MetricEntry { display: format_thousands(units, 0), raw: Some(units) },
            _ => MetricEntry { display: NOT_AVAILABLE.to_string(), raw: None },
        };
        entries.insert(MetricKey::TotalUnits, units);

        Self { entries }
    }

    pub fn get(&self, key: MetricKey) -> Option<&MetricEntry> {
        self.entries.get(&key)
    }

    pub fn display(&self, key: MetricKey) -> &str {
        self.get(key).map(|e| e.display.as_str()).unwrap_or(NOT_AVAILABLE)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&MetricKey, &MetricEntry)> {
        self.entries.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::columns::ColumnCandidates;
    use crate::filters::{apply_filters, CategorySelection, FilterRequest};
    use anyhow::Result;
    use approx::assert_relative_eq;

    fn load(csv: &str) -> Result<(Dataset, ResolvedColumns)> {
        Dataset::from_reader(csv.as_bytes(), &ColumnCandidates::default())
    }

    #[test]
    fn test_three_rows_without_quantity() -> Result<()> {
        let (ds, roles) = load("Date,Amount\n2024-01-01,10\n2024-01-02,20\n2024-01-03,30\n")?;
        let metrics = compute_metrics(&ds, &roles)?;
        let bundle = MetricsBundle::from_metrics(&metrics, &roles);

        assert_eq!(bundle.display(MetricKey::TotalSales), "$60.00");
        assert_eq!(bundle.display(MetricKey::AvgOrderValue), "$20.00");
        assert_eq!(bundle.display(MetricKey::TotalOrders), "3");
        assert_eq!(bundle.display(MetricKey::TotalUnits), "N/A");
        assert_eq!(bundle.get(MetricKey::TotalUnits).unwrap().raw, None);
        Ok(())
    }

    #[test]
    fn test_units_and_large_values_are_grouped() -> Result<()> {
        let (ds, roles) = load("Amount,Qty\n1000000.126,1200\n2500.5,300\n")?;
        let metrics = compute_metrics(&ds, &roles)?;
        assert_relative_eq!(metrics.total_sales.unwrap(), 1_002_500.626, epsilon = 1e-6);
        assert_relative_eq!(metrics.avg_order_value.unwrap(), 501_250.313, epsilon = 1e-6);

        let bundle = MetricsBundle::from_metrics(&metrics, &roles);
        assert_eq!(bundle.display(MetricKey::TotalSales), "$1,002,500.63");
        assert_eq!(bundle.display(MetricKey::TotalUnits), "1,500");
        Ok(())
    }

    #[test]
    fn test_no_amount_column_leaves_sales_tiles_out() -> Result<()> {
        let (ds, roles) = load("Category,Qty\nShoes,1\n")?;
        let bundle = MetricsBundle::from_metrics(&compute_metrics(&ds, &roles)?, &roles);
        assert!(bundle.get(MetricKey::TotalSales).is_none());
        assert!(bundle.get(MetricKey::AvgOrderValue).is_none());
        assert_eq!(bundle.display(MetricKey::TotalSales), NOT_AVAILABLE);
        assert_eq!(bundle.display(MetricKey::TotalOrders), "1");
        Ok(())
    }

    #[test]
    fn test_average_of_empty_selection_is_an_error() -> Result<()> {
        let (ds, roles) = load("Category,Amount\nShoes,10\n")?;
        let request = FilterRequest::new(None, None, CategorySelection::from_choice("Hats"));
        let filtered = apply_filters(&ds, &roles, &request);

        let err = compute_metrics(&filtered.dataset, &roles).unwrap_err();
        assert!(matches!(err, DashboardError::EmptySelection { .. }));

        let totals = compute_totals(&filtered.dataset, &roles);
        assert_eq!(totals.total_orders, 0);
        assert_eq!(totals.total_sales, Some(0.0));
        Ok(())
    }

    #[test]
    fn test_total_orders_tracks_row_count() -> Result<()> {
        let (ds, roles) = load("Date,Category,Amount\n2024-01-01,A,1\n2024-01-02,B,2\n2024-01-03,A,3\n")?;
        for choice in ["All", "A", "B"] {
            let request = FilterRequest::new(None, None, CategorySelection::from_choice(choice));
            let filtered = apply_filters(&ds, &roles, &request);
            let totals = compute_totals(&filtered.dataset, &roles);
            assert_eq!(totals.total_orders, filtered.dataset.len());
        }
        Ok(())
    }
}
