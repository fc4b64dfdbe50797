// SPDX-FileCopyrightText: 2025 Joost van der Laan <joost@fashionunited.com>
//
// SPDX-License-Identifier: AGPL-3.0-only

//! Arranges metrics, chart images and the category breakdown into an ordered
//! section list. No I/O happens here; `pdf` turns the result into pages.

use crate::chart_data::{top_categories, ChartKind, TOP_CATEGORY_LIMIT};
use crate::columns::{ResolvedColumns, Role};
use crate::filters::FilterCriteria;
use crate::metrics::{MetricKey, MetricsBundle};
use crate::models::Dataset;
use crate::utils::{format_currency, truncate_chars};
use crate::visualizations::ChartImage;
use chrono::{Datelike, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

const CATEGORY_NAME_LIMIT: usize = 40;

const METHODOLOGY: [(&str, &[&str]); 6] = [
    (
        "Data Source & Quality",
        &[
            "All data is sourced from the company's e-commerce transaction database",
            "Data has been validated and cleaned for accuracy",
            "Missing or incomplete records have been excluded from analysis",
        ],
    ),
    (
        "Date Range & Filtering",
        &[
            "Analysis covers the selected date range as specified in filters",
            "Category filtering applied where specified",
            "All monetary values are in USD ($)",
        ],
    ),
    (
        "Calculation Methodology",
        &[
            "Total Sales: Sum of all transaction amounts in the filtered dataset",
            "Average Order Value: Mean transaction amount across all orders",
            "Total Orders: Count of unique transactions in the period",
            "Total Units Sold: Sum of all quantity values (where applicable)",
        ],
    ),
    (
        "Visualization Standards",
        &[
            "Charts display top 10 categories by default for clarity",
            "Time-series data aggregated daily or monthly as appropriate",
            "Color coding maintained consistently across all visualizations",
        ],
    ),
    (
        "Report Limitations",
        &[
            "Analysis reflects only the filtered data subset",
            "Future projections not included in this report",
            "External market factors not accounted for in metrics",
        ],
    ),
    (
        "Geographic Considerations",
        &[
            "Sales data may include multiple geographic regions",
            "Currency conversions applied where applicable",
            "Regional performance variations reflected in category analysis",
        ],
    ),
];

/// Names printed on the cover and footer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Branding {
    pub banner: String,
    pub title: String,
    pub subtitle: String,
    pub product_name: String,
    pub organisation: String,
    pub contact_line: String,
}

impl Default for Branding {
    fn default() -> Self {
        Self {
            banner: "E-COMMERCE ANALYTICS".to_string(),
            title: "Sales Performance Proposal".to_string(),
            subtitle: "Comprehensive Analytics Report".to_string(),
            product_name: "E-commerce Analytics Dashboard".to_string(),
            organisation: "E-commerce Analytics".to_string(),
            contact_line: "For questions or clarifications, please contact the analytics team".to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextStyle {
    Banner,
    Title,
    Subtitle,
    SectionHeading,
    SubHeading,
    Bullet,
    Footer,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableStyle {
    /// Label column on grey, values on white.
    Metadata,
    /// Alternating label and value rows.
    KpiGrid,
    /// Coloured header row, banded body.
    Ranking,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    pub style: TableStyle,
    pub column_widths_in: Vec<f32>,
    pub header: Option<Vec<String>>,
    pub rows: Vec<Vec<String>>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Section {
    Heading { text: String, style: TextStyle },
    Paragraph { text: String, style: TextStyle },
    Table(Table),
    /// Refers to an entry of `ReportDocument::images`.
    Image { chart: ChartKind, width_in: f32, height_in: f32 },
    PageBreak,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ReportDocument {
    pub title: String,
    pub sections: Vec<Section>,
    pub images: BTreeMap<ChartKind, ChartImage>,
}

impl ReportDocument {
    pub fn page_breaks(&self) -> usize {
        self.sections.iter().filter(|s| matches!(s, Section::PageBreak)).count()
    }

    #[cfg(test)]
    pub fn tables(&self, style: TableStyle) -> impl Iterator<Item = &Table> {
        self.sections.iter().filter_map(move |s| match s {
            Section::Table(t) if t.style == style => Some(t),
            _ => None,
        })
    }
}

/// Everything the assembler reads. Charts are moved into the document.
pub struct ReportInputs<'a> {
    pub dataset: &'a Dataset,
    pub roles: &'a ResolvedColumns,
    pub metrics: &'a MetricsBundle,
    pub criteria: &'a FilterCriteria,
    pub charts: BTreeMap<ChartKind, ChartImage>,
    pub branding: &'a Branding,
    pub generated_at: NaiveDateTime,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BreakdownRow {
    pub rank: usize,
    pub category: String,
    pub revenue: f64,
    /// Share of the listed top-N subtotal, not of the grand total.
    pub share_pct: f64,
}

/// Ranked top categories with their share of the top-N subtotal.
pub fn category_breakdown(dataset: &Dataset, roles: &ResolvedColumns) -> Vec<BreakdownRow> {
    let top = top_categories(dataset, roles, TOP_CATEGORY_LIMIT);
    let subtotal: f64 = top.iter().map(|t| t.revenue).sum();
    top.into_iter()
        .enumerate()
        .map(|(i, t)| BreakdownRow {
            rank: i + 1,
            share_pct: if subtotal > 0.0 { t.revenue / subtotal * 100.0 } else { 0.0 },
            category: t.category,
            revenue: t.revenue,
        })
        .collect()
}

fn heading(text: impl Into<String>, style: TextStyle) -> Section {
    Section::Heading { text: text.into(), style }
}

fn paragraph(text: impl Into<String>, style: TextStyle) -> Section {
    Section::Paragraph { text: text.into(), style }
}

fn chart_heading(kind: ChartKind) -> &'static str {
    match kind {
        ChartKind::SalesTrend => "Sales Trend Analysis",
        ChartKind::TopCategories => "Top Categories Performance",
        ChartKind::Distribution => "Sales Distribution",
        ChartKind::Monthly => "Monthly Comparison",
    }
}

fn chart_height_in(kind: ChartKind) -> f32 {
    match kind {
        ChartKind::TopCategories => 3.5,
        _ => 3.0,
    }
}

fn cover(inputs: &ReportInputs<'_>) -> Vec<Section> {
    let b = inputs.branding;
    let metadata = Table {
        style: TableStyle::Metadata,
        column_widths_in: vec![2.0, 4.0],
        header: None,
        rows: vec![
            vec![
                "Report Generated:".to_string(),
                inputs.generated_at.format("%B %d, %Y at %H:%M").to_string(),
            ],
            vec!["Date Range:".to_string(), inputs.criteria.date_label().to_string()],
            vec!["Category Filter:".to_string(), inputs.criteria.category_label().to_string()],
            vec!["Total Records:".to_string(), inputs.criteria.records_label()],
        ],
    };
    vec![
        heading(&b.banner, TextStyle::Banner),
        heading(&b.title, TextStyle::Title),
        paragraph(&b.subtitle, TextStyle::Subtitle),
        Section::Table(metadata),
        Section::PageBreak,
    ]
}

fn methodology() -> Vec<Section> {
    let mut sections = vec![heading("Key Assumptions & Methodology", TextStyle::SectionHeading)];
    for (group, bullets) in METHODOLOGY {
        sections.push(heading(group, TextStyle::SubHeading));
        sections.extend(bullets.iter().map(|b| paragraph(*b, TextStyle::Bullet)));
    }
    sections.push(Section::PageBreak);
    sections
}

fn kpi_summary(metrics: &MetricsBundle) -> Vec<Section> {
    let rows = MetricKey::ALL
        .chunks(2)
        .flat_map(|pair| {
            let labels: Vec<String> = pair.iter().map(|k| k.label().to_string()).collect();
            let values: Vec<String> = pair.iter().map(|k| metrics.display(*k).to_string()).collect();
            [labels, values]
        })
        .collect();
    vec![
        heading("Executive Summary - Key Performance Indicators", TextStyle::SectionHeading),
        Section::Table(Table {
            style: TableStyle::KpiGrid,
            column_widths_in: vec![3.25, 3.25],
            header: None,
            rows,
        }),
        Section::PageBreak,
    ]
}

fn chart_pages(roles: &ResolvedColumns, charts: &BTreeMap<ChartKind, ChartImage>) -> Vec<Section> {
    let mut sections = Vec::new();
    for kind in ChartKind::ALL.into_iter().filter(|k| k.is_available(roles)) {
        sections.push(heading(chart_heading(kind), TextStyle::SectionHeading));
        if charts.contains_key(&kind) {
            sections.push(Section::Image {
                chart: kind,
                width_in: 6.5,
                height_in: chart_height_in(kind),
            });
        }
        sections.push(Section::PageBreak);
    }
    sections
}

fn detail_table(dataset: &Dataset, roles: &ResolvedColumns) -> Vec<Section> {
    let mut sections = vec![heading("Top 10 Categories - Detailed Breakdown", TextStyle::SectionHeading)];
    if roles.all_bound(&[Role::Category, Role::Amount]) {
        let rows = category_breakdown(dataset, roles)
            .into_iter()
            .map(|row| {
                vec![
                    row.rank.to_string(),
                    truncate_chars(&row.category, CATEGORY_NAME_LIMIT),
                    format_currency(row.revenue),
                    format!("{:.1}%", row.share_pct),
                ]
            })
            .collect();
        sections.push(Section::Table(Table {
            style: TableStyle::Ranking,
            column_widths_in: vec![0.6, 3.0, 1.8, 1.1],
            header: Some(["Rank", "Category", "Revenue", "% of Total"].map(String::from).to_vec()),
            rows,
        }));
    }
    sections
}

fn footer(branding: &Branding, year: i32) -> Vec<Section> {
    [
        branding.product_name.clone(),
        "This report is generated automatically based on filtered data".to_string(),
        branding.contact_line.clone(),
        format!("(c) {} {}. All rights reserved.", year, branding.organisation),
    ]
    .into_iter()
    .map(|line| paragraph(line, TextStyle::Footer))
    .collect()
}

/// Build the report: cover, methodology, KPIs, chart pages, breakdown, footer.
pub fn assemble_report(inputs: ReportInputs<'_>) -> ReportDocument {
    let mut sections = cover(&inputs);
    sections.extend(methodology());
    sections.extend(kpi_summary(inputs.metrics));
    sections.extend(chart_pages(inputs.roles, &inputs.charts));
    sections.extend(detail_table(inputs.dataset, inputs.roles));
    sections.extend(footer(inputs.branding, inputs.generated_at.year()));

    let document = ReportDocument {
        title: inputs.branding.title.clone(),
        sections,
        images: inputs.charts,
    };
    tracing::debug!(
        sections = document.sections.len(),
        pages = document.page_breaks() + 1,
        charts = document.images.len(),
        "report assembled"
    );
    document
}
