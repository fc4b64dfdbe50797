// SPDX-FileCopyrightText: 2025 Joost van der Laan <joost@fashionunited.com>
//
// SPDX-License-Identifier: AGPL-3.0-only

mod chart_data;
mod columns;
mod config;
mod dashboard;
mod error;
mod export;
mod filters;
mod metrics;
mod models;
mod pdf;
mod report;
mod utils;
mod visualizations;

use anyhow::{bail, Result};
use chrono::{Local, NaiveDate};
use clap::{Parser, Subcommand};
use dashboard::{Session, EXPORT_STEPS};
use error::DashboardError;
use filters::{CategorySelection, FilterRequest};
use indicatif::{ProgressBar, ProgressStyle};
use metrics::MetricKey;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "sales-dash", version, about = "E-commerce sales dashboard and PDF proposal generator")]
struct Cli {
    /// Configuration file
    #[arg(long, global = true, default_value = config::DEFAULT_CONFIG_FILE)]
    config: PathBuf,

    /// Sales CSV, overrides `data_path` from the configuration
    #[arg(long, global = true)]
    data: Option<PathBuf>,

    /// First day of the date range (YYYY-MM-DD)
    #[arg(long, global = true)]
    from: Option<NaiveDate>,

    /// Last day of the date range (YYYY-MM-DD)
    #[arg(long, global = true)]
    to: Option<NaiveDate>,

    /// Category to keep, or "All"
    #[arg(long, global = true, default_value = filters::ALL_CATEGORIES)]
    category: String,

    /// Debug logging on stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Show the KPI tiles for the current filters
    Summary {
        #[arg(long)]
        json: bool,
    },
    /// List the category picker entries and the date range of the data
    Categories,
    /// Print the first rows of the filtered data
    Preview {
        #[arg(long)]
        rows: Option<usize>,
    },
    /// Render the available charts as PNG files
    Charts,
    /// Export the filtered data as CSV
    ExportCsv,
    /// Generate the PDF sales proposal
    ExportPdf,
    /// Write a configuration file with the default settings
    InitConfig {
        #[arg(long)]
        force: bool,
    },
}

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match run(cli) {
        Ok(code) => code,
        Err(e) => {
            report_error(&e);
            ExitCode::FAILURE
        }
    }
}

fn report_error(e: &anyhow::Error) {
    match e.downcast_ref::<DashboardError>() {
        Some(DashboardError::DatasetNotFound { path }) => {
            eprintln!("⚠️  Dataset not found: {}", path.display());
            eprintln!("To use this dashboard:");
            eprintln!("  1. Download the dataset");
            eprintln!("  2. Place the CSV file next to the configuration file");
            eprintln!("  3. Point `data_path` in the configuration (or --data) at it if needed");
        }
        _ => {
            eprintln!("❌ An error occurred: {:#}", e);
            eprintln!("Please check your data file and column names.");
        }
    }
}

fn run(cli: Cli) -> Result<ExitCode> {
    if let Commands::InitConfig { force } = cli.command {
        if cli.config.exists() && !force {
            bail!("{} already exists, use --force to overwrite it", cli.config.display());
        }
        config::save_config(&config::Config::default(), &cli.config)?;
        println!("✅ Configuration written to {}", cli.config.display());
        return Ok(ExitCode::SUCCESS);
    }

    let mut config = config::load_config(&cli.config)?;
    if let Some(data) = cli.data {
        config.data_path = data;
    }

    println!("Loading {} ⌛️", config.data_path.display());
    let session = Session::open(&config)?;
    let request = FilterRequest::new(cli.from, cli.to, CategorySelection::from_choice(&cli.category));

    match cli.command {
        Commands::Summary { json } => {
            let view = session.view(&request)?;
            let summary = view.summary();
            if json {
                println!("{}", serde_json::to_string_pretty(&summary)?);
            } else {
                println!("Date range: {}", summary.date_range);
                println!("Category:   {}", summary.category);
                println!("Records:    {}", view.filtered.criteria.records_label());
                println!("---");
                for key in MetricKey::ALL {
                    println!("{:<18} {}", key.label(), view.metrics.display(key));
                }
                let charts: Vec<&str> = chart_data::ChartKind::ALL
                    .into_iter()
                    .filter(|kind| kind.is_available(view.roles))
                    .map(|kind| kind.file_stem())
                    .collect();
                println!("---");
                println!("Charts:     {}", charts.join(", "));
                println!("Sales days: {}", view.charts.trend.len());
                println!("Months:     {}", view.charts.monthly.len());
            }
        }
        Commands::Categories => {
            for option in session.category_options(&request) {
                println!("{}", option);
            }
            if let Some((first, last)) = session.date_bounds() {
                println!("---");
                println!("Dates: {} to {}", first, last);
            }
        }
        Commands::Preview { rows } => {
            let filtered = session.filter(&request);
            print!("{}", dashboard::render_preview(&filtered.dataset, rows.unwrap_or(config.preview_rows)));
        }
        Commands::Charts => {
            let filtered = session.filter(&request);
            let data = chart_data::ChartData::prepare(&filtered.dataset, &session.roles);
            let images = visualizations::render_available(&data, &session.roles)?;
            if images.is_empty() {
                println!("⚠️  No chart has the columns it needs");
            }
            for path in visualizations::save_images(&images, &config.output_dir)? {
                println!("📊 Chart saved: {}", path.display());
            }
        }
        Commands::ExportCsv => {
            let filtered = session.filter(&request);
            let bytes = export::csv_bytes(&filtered.dataset)?;
            let name = export::timestamped_name("sales_data", "csv", Local::now().naive_local());
            let path = export::save_export(&config.output_dir, &name, &bytes)?;
            println!("📁 CSV file created: {}", path.display());
        }
        Commands::ExportPdf => return export_pdf(&session, &request, &config),
        Commands::InitConfig { .. } => unreachable!("handled before loading the dataset"),
    }

    Ok(ExitCode::SUCCESS)
}

fn export_pdf(session: &Session, request: &FilterRequest, config: &config::Config) -> Result<ExitCode> {
    let progress = ProgressBar::new(EXPORT_STEPS);
    progress.set_style(
        ProgressStyle::default_bar()
            .template("[{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} {msg}")?
            .progress_chars("=>-"),
    );

    let generated_at = Local::now().naive_local();
    let result = session
        .export_pdf(request, &config.branding, generated_at, &progress)
        .and_then(|bytes| {
            let name = export::timestamped_name("sales_proposal", "pdf", generated_at);
            export::save_export(&config.output_dir, &name, &bytes)
        });

    match result {
        Ok(path) => {
            progress.finish_with_message("done");
            println!("✅ PDF generated successfully: {}", path.display());
            Ok(ExitCode::SUCCESS)
        }
        Err(e) => {
            progress.abandon_with_message("failed");
            tracing::error!(error = %e, "pdf export failed");
            eprintln!("❌ Error generating PDF: {:#}", e);
            eprintln!("Charts need a system sans-serif font and the output directory must be writable.");
            Ok(ExitCode::FAILURE)
        }
    }
}
