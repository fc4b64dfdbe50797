// SPDX-FileCopyrightText: 2025 Joost van der Laan <joost@fashionunited.com>
//
// SPDX-License-Identifier: AGPL-3.0-only

use crate::chart_data::{CategoryTotal, ChartData, ChartKind, Histogram, MonthTotal, TrendPoint};
use crate::columns::ResolvedColumns;
use crate::utils::{format_currency_whole, truncate_chars};
use anyhow::{Context, Result};
use chrono::Duration;
use image::codecs::png::PngEncoder;
use image::{ColorType, ImageEncoder};
use plotters::coord::Shift;
use plotters::prelude::*;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

const COLOR_TREND: RGBColor = RGBColor(31, 119, 180);
const COLOR_CATEGORIES: RGBColor = RGBColor(255, 127, 14);
const COLOR_DISTRIBUTION: RGBColor = RGBColor(44, 160, 44);
const COLOR_MONTHLY: RGBColor = RGBColor(214, 39, 40);
const COLOR_GRID: RGBColor = RGBColor(220, 220, 220);

type Canvas<'a> = DrawingArea<BitMapBackend<'a>, Shift>;

/// A rasterised chart, PNG encoded.
#[derive(Debug, Clone, PartialEq)]
pub struct ChartImage {
    pub kind: ChartKind,
    pub width: u32,
    pub height: u32,
    pub png: Vec<u8>,
}

fn canvas_size(kind: ChartKind) -> (u32, u32) {
    match kind {
        ChartKind::TopCategories => (1500, 750),
        _ => (1500, 600),
    }
}

fn title(kind: ChartKind) -> &'static str {
    match kind {
        ChartKind::SalesTrend => "Daily Sales Trend",
        ChartKind::TopCategories => "Top 10 Categories by Revenue",
        ChartKind::Distribution => "Distribution of Order Values",
        ChartKind::Monthly => "Sales by Month",
    }
}

/// Render one chart into an in-memory PNG.
pub fn render_chart(kind: ChartKind, data: &ChartData) -> Result<ChartImage> {
    let (width, height) = canvas_size(kind);
    let mut buffer = vec![0u8; (width * height * 3) as usize];
    {
        let root = BitMapBackend::with_buffer(&mut buffer, (width, height)).into_drawing_area();
        root.fill(&WHITE)?;
        match kind {
            ChartKind::SalesTrend => draw_sales_trend(&root, &data.trend)?,
            ChartKind::TopCategories => draw_top_categories(&root, &data.top_categories)?,
            ChartKind::Distribution => draw_distribution(&root, &data.distribution)?,
            ChartKind::Monthly => draw_monthly(&root, &data.monthly)?,
        }
        root.present()?;
    }

    let mut png = Vec::new();
    PngEncoder::new(&mut png)
        .write_image(&buffer, width, height, ColorType::Rgb8)
        .with_context(|| format!("Failed to encode {} chart", kind.file_stem()))?;
    tracing::debug!(chart = kind.file_stem(), bytes = png.len(), "chart rendered");

    Ok(ChartImage { kind, width, height, png })
}

/// Render every chart whose columns are bound, keyed by kind.
pub fn render_available(data: &ChartData, roles: &ResolvedColumns) -> Result<BTreeMap<ChartKind, ChartImage>> {
    ChartKind::ALL
        .into_iter()
        .filter(|kind| kind.is_available(roles))
        .map(|kind| render_chart(kind, data).map(|img| (kind, img)))
        .collect()
}

/// Write the images as `<stem>.png` files into `dir`.
pub fn save_images(images: &BTreeMap<ChartKind, ChartImage>, dir: &Path) -> Result<Vec<PathBuf>> {
    fs::create_dir_all(dir)?;
    images
        .values()
        .map(|img| {
            let path = dir.join(format!("{}.png", img.kind.file_stem()));
            fs::write(&path, &img.png).with_context(|| format!("Failed to write {}", path.display()))?;
            Ok(path)
        })
        .collect()
}

fn draw_no_data(root: &Canvas<'_>, kind: ChartKind) -> Result<()> {
    let (w, h) = root.dim_in_pixel();
    root.draw_text(
        title(kind),
        &TextStyle::from(("sans-serif", 30).into_font()).color(&BLACK),
        (40, 30),
    )?;
    root.draw_text(
        "No data",
        &TextStyle::from(("sans-serif", 24).into_font()).color(&COLOR_GRID),
        (w as i32 / 2 - 50, h as i32 / 2),
    )?;
    Ok(())
}

/// Axis range that always has some height and includes zero.
fn value_range(values: impl Iterator<Item = f64>) -> std::ops::Range<f64> {
    let (lo, hi) = values.fold((0.0f64, 0.0f64), |(lo, hi), v| (lo.min(v), hi.max(v)));
    let hi = if hi > lo { hi * 1.1 } else { lo + 1.0 };
    lo..hi
}

fn draw_sales_trend(root: &Canvas<'_>, points: &[TrendPoint]) -> Result<()> {
    let Some(first) = points.first().map(|p| p.date) else {
        return draw_no_data(root, ChartKind::SalesTrend);
    };
    let span = points.last().map(|p| (p.date - first).num_days() as i32).unwrap_or(0).max(1);

    let mut chart = ChartBuilder::on(root)
        .margin(20)
        .caption(title(ChartKind::SalesTrend), ("sans-serif", 30))
        .set_label_area_size(LabelAreaPosition::Left, 90)
        .set_label_area_size(LabelAreaPosition::Bottom, 60)
        .build_cartesian_2d(0i32..span, value_range(points.iter().map(|p| p.sales)))?;

    chart
        .configure_mesh()
        .light_line_style(&COLOR_GRID)
        .x_desc("Date")
        .y_desc("Total Sales ($)")
        .x_labels(8)
        .x_label_formatter(&|x| (first + Duration::days(*x as i64)).format("%Y-%m-%d").to_string())
        .y_label_formatter(&|y| format_currency_whole(*y))
        .draw()?;

    chart.draw_series(LineSeries::new(
        points.iter().map(|p| ((p.date - first).num_days() as i32, p.sales)),
        COLOR_TREND.stroke_width(2),
    ))?;
    Ok(())
}

fn draw_top_categories(root: &Canvas<'_>, totals: &[CategoryTotal]) -> Result<()> {
    if totals.is_empty() {
        return draw_no_data(root, ChartKind::TopCategories);
    }
    let n = totals.len() as i32;
    // Highest revenue on top
    let names: Vec<String> = totals.iter().rev().map(|t| truncate_chars(&t.category, 24)).collect();
    let x_range = value_range(totals.iter().map(|t| t.revenue));
    let x_max = x_range.end * 1.05;

    let mut chart = ChartBuilder::on(root)
        .margin(20)
        .caption(title(ChartKind::TopCategories), ("sans-serif", 30))
        .set_label_area_size(LabelAreaPosition::Left, 220)
        .set_label_area_size(LabelAreaPosition::Bottom, 50)
        .build_cartesian_2d(x_range.start..x_max, (0i32..n).into_segmented())?;

    chart
        .configure_mesh()
        .disable_y_mesh()
        .light_line_style(&COLOR_GRID)
        .x_desc("Revenue ($)")
        .y_labels(n as usize)
        .x_label_formatter(&|x| format_currency_whole(*x))
        .y_label_formatter(&|y| match y {
            SegmentValue::CenterOf(i) => names.get(*i as usize).cloned().unwrap_or_default(),
            _ => String::new(),
        })
        .draw()?;

    for (rank, total) in totals.iter().enumerate() {
        let i = n - 1 - rank as i32;
        chart.draw_series(std::iter::once(Rectangle::new(
            [(0.0, SegmentValue::Exact(i)), (total.revenue, SegmentValue::Exact(i + 1))],
            COLOR_CATEGORIES.filled(),
        )))?;
        chart.draw_series(std::iter::once(Text::new(
            format!(" {}", format_currency_whole(total.revenue)),
            (total.revenue, SegmentValue::CenterOf(i)),
            ("sans-serif", 15).into_font(),
        )))?;
    }
    Ok(())
}

fn draw_distribution(root: &Canvas<'_>, hist: &Histogram) -> Result<()> {
    if hist.is_empty() {
        return draw_no_data(root, ChartKind::Distribution);
    }
    let lo = hist.edges[0];
    let hi = hist.edges[hist.edges.len() - 1];
    let y_range = value_range(hist.counts.iter().map(|c| *c as f64));

    let mut chart = ChartBuilder::on(root)
        .margin(20)
        .caption(title(ChartKind::Distribution), ("sans-serif", 30))
        .set_label_area_size(LabelAreaPosition::Left, 70)
        .set_label_area_size(LabelAreaPosition::Bottom, 60)
        .build_cartesian_2d(lo..hi, y_range)?;

    chart
        .configure_mesh()
        .disable_x_mesh()
        .light_line_style(&COLOR_GRID)
        .x_desc("Order Amount ($)")
        .y_desc("Frequency")
        .x_label_formatter(&|x| format_currency_whole(*x))
        .y_label_formatter(&|y| format!("{:.0}", y))
        .draw()?;

    chart.draw_series(hist.counts.iter().enumerate().map(|(i, count)| {
        Rectangle::new(
            [(hist.edges[i], 0.0), (hist.edges[i + 1], *count as f64)],
            COLOR_DISTRIBUTION.mix(0.7).filled(),
        )
    }))?;
    chart.draw_series(hist.counts.iter().enumerate().map(|(i, count)| {
        Rectangle::new([(hist.edges[i], 0.0), (hist.edges[i + 1], *count as f64)], BLACK.stroke_width(1))
    }))?;
    Ok(())
}

fn draw_monthly(root: &Canvas<'_>, months: &[MonthTotal]) -> Result<()> {
    if months.is_empty() {
        return draw_no_data(root, ChartKind::Monthly);
    }
    let n = months.len() as i32;
    let labels: Vec<String> = months.iter().map(MonthTotal::label).collect();

    let mut chart = ChartBuilder::on(root)
        .margin(20)
        .caption(title(ChartKind::Monthly), ("sans-serif", 30))
        .set_label_area_size(LabelAreaPosition::Left, 90)
        .set_label_area_size(LabelAreaPosition::Bottom, 60)
        .build_cartesian_2d((0i32..n).into_segmented(), value_range(months.iter().map(|m| m.sales)))?;

    chart
        .configure_mesh()
        .disable_x_mesh()
        .light_line_style(&COLOR_GRID)
        .y_desc("Total Sales ($)")
        .x_labels(n as usize)
        .x_label_formatter(&|x| match x {
            SegmentValue::CenterOf(i) => labels.get(*i as usize).cloned().unwrap_or_default(),
            _ => String::new(),
        })
        .y_label_formatter(&|y| format_currency_whole(*y))
        .draw()?;

    for (i, month) in months.iter().enumerate() {
        let i = i as i32;
        chart.draw_series(std::iter::once(Rectangle::new(
            [(SegmentValue::Exact(i), 0.0), (SegmentValue::Exact(i + 1), month.sales)],
            COLOR_MONTHLY.mix(0.7).filled(),
        )))?;
        chart.draw_series(std::iter::once(Text::new(
            format_currency_whole(month.sales),
            (SegmentValue::CenterOf(i), month.sales),
            ("sans-serif", 13).into_font(),
        )))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::columns::ColumnCandidates;
    use crate::models::Dataset;

    const PNG_MAGIC: [u8; 8] = [0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];

    const ORDERS: &str = "\
Date,Category,Amount
2024-01-10,Bags,5
2024-02-03,Shoes,10
2024-02-03,Bags,15
2024-03-01,Hats,100
";

    #[test]
    fn test_render_available_skips_unbound_charts() -> Result<()> {
        let (ds, roles) = Dataset::from_reader("Amount\n10\n20\n".as_bytes(), &ColumnCandidates::default())?;
        let data = ChartData::prepare(&ds, &roles);
        let images = render_available(&data, &roles)?;
        assert_eq!(images.keys().copied().collect::<Vec<_>>(), vec![ChartKind::Distribution]);
        Ok(())
    }

    #[test]
    fn test_render_all_kinds_to_png() -> Result<()> {
        let (ds, roles) = Dataset::from_reader(ORDERS.as_bytes(), &ColumnCandidates::default())?;
        let data = ChartData::prepare(&ds, &roles);
        let images = render_available(&data, &roles)?;
        assert_eq!(images.len(), 4);
        for img in images.values() {
            assert_eq!(&img.png[..8], &PNG_MAGIC);
            assert_eq!((img.width, img.height), canvas_size(img.kind));
        }
        Ok(())
    }

    #[test]
    fn test_empty_chart_data_still_renders() -> Result<()> {
        let img = render_chart(ChartKind::Monthly, &ChartData::default())?;
        assert_eq!(&img.png[..8], &PNG_MAGIC);
        Ok(())
    }

    #[test]
    fn test_save_images_writes_pngs() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let mut images = BTreeMap::new();
        images.insert(ChartKind::Distribution, render_chart(ChartKind::Distribution, &ChartData::default())?);
        let paths = save_images(&images, dir.path())?;
        assert_eq!(paths, vec![dir.path().join("sales_distribution.png")]);
        assert!(paths[0].exists());
        Ok(())
    }
}
