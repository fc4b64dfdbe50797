// SPDX-FileCopyrightText: 2025 Joost van der Laan <joost@fashionunited.com>
//
// SPDX-License-Identifier: AGPL-3.0-only

use crate::chart_data::ChartData;
use crate::columns::{ResolvedColumns, Role};
use crate::config::Config;
use crate::error::DashboardError;
use crate::filters::{apply_filters, category_options, date_bounds, CategorySelection, FilterRequest, Filtered};
use crate::metrics::{compute_metrics, compute_totals, MetricEntry, Metrics, MetricsBundle};
use crate::models::Dataset;
use crate::pdf::render_pdf;
use crate::report::{assemble_report, Branding, ReportInputs};
use crate::utils::{format_count, truncate_chars};
use comfy_table::Table;
use crate::visualizations::render_available;
use anyhow::Result;
use chrono::{NaiveDate, NaiveDateTime};
use indicatif::ProgressBar;
use serde::Serialize;
use std::collections::BTreeMap;

const PREVIEW_CELL_CHARS: usize = 30;

/// A loaded dataset and the columns bound to each role.
#[derive(Debug, Clone)]
pub struct Session {
    pub dataset: Dataset,
    pub roles: ResolvedColumns,
}

impl Session {
    pub fn open(config: &Config) -> Result<Self> {
        let (dataset, roles) = Dataset::from_path(&config.data_path, &config.columns)?;
        if dataset.is_empty() {
            tracing::warn!(path = %config.data_path.display(), "dataset has no rows");
        }
        for role in Role::ALL {
            if !roles.is_bound(role) {
                tracing::warn!(%role, "no column found for role");
            }
        }
        Ok(Self { dataset, roles })
    }

    /// Picker entries for the categories present inside the requested date range.
    pub fn category_options(&self, request: &FilterRequest) -> Vec<String> {
        let dated = FilterRequest {
            date_endpoints: request.date_endpoints.clone(),
            category: CategorySelection::All,
        };
        category_options(&self.filter(&dated).dataset, &self.roles)
    }

    pub fn date_bounds(&self) -> Option<(NaiveDate, NaiveDate)> {
        date_bounds(&self.dataset, &self.roles)
    }

    pub fn filter(&self, request: &FilterRequest) -> Filtered<'_> {
        apply_filters(&self.dataset, &self.roles, request)
    }

    /// Filter, compute metrics and prepare chart data for one interaction.
    pub fn view(&self, request: &FilterRequest) -> Result<DashboardView<'_>> {
        let filtered = self.filter(request);
        let metrics = compute_metrics(&filtered.dataset, &self.roles)?;
        let charts = ChartData::prepare(&filtered.dataset, &self.roles);
        Ok(DashboardView {
            roles: &self.roles,
            metrics: MetricsBundle::from_metrics(&metrics, &self.roles),
            filtered,
            charts,
        })
    }

    /// Render charts, assemble the proposal and lay it out as PDF bytes.
    ///
    /// An empty selection still exports; its average tile reads "N/A".
    pub fn export_pdf(
        &self,
        request: &FilterRequest,
        branding: &Branding,
        generated_at: NaiveDateTime,
        progress: &ProgressBar,
    ) -> Result<Vec<u8>> {
        progress.set_message("Filtering data...");
        let filtered = self.filter(request);
        let metrics = export_metrics(&filtered.dataset, &self.roles)?;
        let bundle = MetricsBundle::from_metrics(&metrics, &self.roles);
        progress.inc(1);

        progress.set_message("Rendering charts...");
        let chart_data = ChartData::prepare(&filtered.dataset, &self.roles);
        let charts = render_available(&chart_data, &self.roles)?;
        progress.inc(1);

        progress.set_message("Assembling report...");
        let document = assemble_report(ReportInputs {
            dataset: &filtered.dataset,
            roles: &self.roles,
            metrics: &bundle,
            criteria: &filtered.criteria,
            charts,
            branding,
            generated_at,
        });
        progress.inc(1);

        progress.set_message("Writing PDF...");
        let bytes = render_pdf(&document)?;
        progress.inc(1);
        Ok(bytes)
    }
}

/// Number of progress steps `Session::export_pdf` reports.
pub const EXPORT_STEPS: u64 = 4;

fn export_metrics(dataset: &Dataset, roles: &ResolvedColumns) -> Result<Metrics> {
    match compute_metrics(dataset, roles) {
        Ok(metrics) => Ok(metrics),
        Err(DashboardError::EmptySelection { column }) => {
            tracing::warn!(%column, "empty selection, exporting totals only");
            Ok(compute_totals(dataset, roles))
        }
        Err(e) => Err(e.into()),
    }
}

/// Everything one dashboard interaction shows.
#[derive(Debug, Clone)]
pub struct DashboardView<'a> {
    pub roles: &'a ResolvedColumns,
    pub filtered: Filtered<'a>,
    pub metrics: MetricsBundle,
    pub charts: ChartData,
}

#[derive(Debug, Serialize)]
pub struct Summary {
    pub date_range: String,
    pub category: String,
    pub records: usize,
    pub metrics: BTreeMap<String, MetricEntry>,
}

impl DashboardView<'_> {
    pub fn summary(&self) -> Summary {
        Summary {
            date_range: self.filtered.criteria.date_label().to_string(),
            category: self.filtered.criteria.category_label().to_string(),
            records: self.filtered.criteria.total_records,
            metrics: self
                .metrics
                .iter()
                .map(|(key, entry)| (key.label().to_string(), entry.clone()))
                .collect(),
        }
    }
}

/// Table of the first `max_rows` rows, long cells cut to 30 characters.
pub fn render_preview(dataset: &Dataset, max_rows: usize) -> String {
    let mut table = Table::new();
    table.set_header(dataset.columns());
    for row in dataset.rows().iter().take(max_rows) {
        table.add_row(row.iter().map(|v| truncate_chars(&v.to_string(), PREVIEW_CELL_CHARS)));
    }

    format!(
        "{}\nShowing {} of {} rows\n",
        table,
        format_count(dataset.len().min(max_rows)),
        format_count(dataset.len())
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::columns::ColumnCandidates;
    use crate::metrics::{MetricKey, NOT_AVAILABLE};

    const ORDERS: &str = "\
Date,Category,Amount,Quantity
2024-01-01,Shoes,10,1
2024-01-15,Bags,20,2
2024-02-01,Shoes,30,3
";

    fn session() -> Session {
        let (dataset, roles) = Dataset::from_reader(ORDERS.as_bytes(), &ColumnCandidates::default()).unwrap();
        Session { dataset, roles }
    }

    fn stamp() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 6, 1).unwrap().and_hms_opt(9, 30, 0).unwrap()
    }

    #[test]
    fn test_view_applies_filters_and_metrics() -> Result<()> {
        let session = session();
        let request = FilterRequest::new(
            NaiveDate::from_ymd_opt(2024, 1, 1),
            NaiveDate::from_ymd_opt(2024, 1, 31),
            CategorySelection::All,
        );
        let view = session.view(&request)?;

        assert_eq!(view.filtered.dataset.len(), 2);
        assert_eq!(view.metrics.display(MetricKey::TotalSales), "$30.00");
        assert_eq!(view.metrics.display(MetricKey::AvgOrderValue), "$15.00");
        assert_eq!(view.charts.trend.len(), 2);

        let summary = view.summary();
        assert_eq!(summary.date_range, "2024-01-01 to 2024-01-31");
        assert_eq!(summary.category, "All");
        assert_eq!(summary.records, 2);
        Ok(())
    }

    #[test]
    fn test_summary_and_chart_data_serialize() -> Result<()> {
        let session = session();
        let view = session.view(&FilterRequest::default())?;

        let summary = serde_json::to_value(view.summary())?;
        assert_eq!(summary["records"], 3);
        assert_eq!(summary["metrics"]["TOTAL SALES"]["display"], "$60.00");

        let charts = serde_json::to_value(&view.charts)?;
        assert_eq!(charts["trend"][0]["date"], "2024-01-01");
        let criteria = serde_json::to_value(&view.filtered.criteria)?;
        assert_eq!(criteria["total_records"], 3);
        Ok(())
    }

    #[test]
    fn test_empty_selection_view_is_an_error() {
        let session = session();
        let request = FilterRequest::new(None, None, CategorySelection::from_choice("Hats"));
        let err = session.view(&request).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<DashboardError>(),
            Some(DashboardError::EmptySelection { .. })
        ));
    }

    #[test]
    fn test_empty_selection_still_exports_pdf() -> Result<()> {
        let session = session();
        let request = FilterRequest::new(None, None, CategorySelection::from_choice("Hats"));
        let bytes = session.export_pdf(&request, &Branding::default(), stamp(), &ProgressBar::hidden())?;
        assert!(bytes.starts_with(b"%PDF"));

        let filtered = session.filter(&request);
        let metrics = export_metrics(&filtered.dataset, &session.roles)?;
        let bundle = MetricsBundle::from_metrics(&metrics, &session.roles);
        assert_eq!(bundle.display(MetricKey::AvgOrderValue), NOT_AVAILABLE);
        assert_eq!(bundle.display(MetricKey::TotalOrders), "0");
        Ok(())
    }

    #[test]
    fn test_full_export_produces_pdf() -> Result<()> {
        let session = session();
        let progress = ProgressBar::hidden();
        let bytes = session.export_pdf(&FilterRequest::default(), &Branding::default(), stamp(), &progress)?;
        assert!(bytes.starts_with(b"%PDF"));
        assert_eq!(progress.position(), EXPORT_STEPS);
        Ok(())
    }

    #[test]
    fn test_options_and_bounds() {
        let session = session();
        assert_eq!(session.category_options(&FilterRequest::default()), vec!["All", "Bags", "Shoes"]);
        assert_eq!(
            session.date_bounds(),
            Some((
                NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
                NaiveDate::from_ymd_opt(2024, 2, 1).unwrap()
            ))
        );
    }

    #[test]
    fn test_options_follow_date_range_only() {
        let csv = "Date,Category,Amount\n2024-01-01,Shoes,10\n2024-06-01,Hats,20\n";
        let (dataset, roles) = Dataset::from_reader(csv.as_bytes(), &ColumnCandidates::default()).unwrap();
        let session = Session { dataset, roles };

        let january = FilterRequest::new(
            NaiveDate::from_ymd_opt(2024, 1, 1),
            NaiveDate::from_ymd_opt(2024, 1, 31),
            CategorySelection::from_choice("Hats"),
        );
        assert_eq!(session.category_options(&january), vec!["All", "Shoes"]);

        let open_ended = FilterRequest::new(NaiveDate::from_ymd_opt(2024, 1, 1), None, CategorySelection::All);
        assert_eq!(session.category_options(&open_ended), vec!["All", "Hats", "Shoes"]);
    }

    #[test]
    fn test_preview_limits_rows() {
        let session = session();
        let text = render_preview(&session.dataset, 2);

        for header in ["Date", "Category", "Amount", "Quantity"] {
            assert!(text.contains(header));
        }
        assert!(text.contains("2024-01-01"));
        assert!(text.contains("2024-01-15"));
        assert!(!text.contains("2024-02-01"));
        assert!(text.ends_with("Showing 2 of 3 rows\n"));
    }

    #[test]
    fn test_preview_truncates_long_cells() {
        let long = "x".repeat(45);
        let csv = format!("Category,Amount\n{},1\n", long);
        let (dataset, _) = Dataset::from_reader(csv.as_bytes(), &ColumnCandidates::default()).unwrap();
        let text = render_preview(&dataset, 100);

        assert!(text.contains(&"x".repeat(30)));
        assert!(!text.contains(&"x".repeat(31)));
        assert!(text.ends_with("Showing 1 of 1 rows\n"));
    }
}
