use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use colored::*;
use okrdeck_core::analysis::{self, AchievementStatus};
use okrdeck_core::dataset::{AnnualMetric, MetricTotals, MonthlyMetric};
use okrdeck_core::{Dataset, RagStatus, load_dataset};
use serde::Serialize;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "okrstats")]
#[command(about = "Dataset and trend summary for OKR dashboard workbooks")]
#[command(version)]
struct Cli {
    /// Path to the Excel/ODS file
    #[arg(value_name = "FILE")]
    file: PathBuf,

    /// Output format
    #[arg(short, long, value_enum, default_value = "human")]
    format: OutputFormat,
}

#[derive(Clone, ValueEnum)]
enum OutputFormat {
    /// Human-readable output
    Human,
    /// JSON output
    Json,
}

/// Forecast figures for one monthly series
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SeriesTrend {
    name: &'static str,
    reported_months: usize,
    total_months: usize,
    slope: f64,
    year_end_forecast: f64,
    forecast_percentage: f64,
}

/// JSON output: the dataset fields plus the trend figures
#[derive(Serialize)]
struct StatsReport<'a> {
    #[serde(flatten)]
    dataset: &'a Dataset,
    trends: Vec<SeriesTrend>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let dataset = load_dataset(&cli.file)
        .with_context(|| format!("Failed to read file: {}", cli.file.display()))?;

    match cli.format {
        OutputFormat::Human => print_human(&dataset),
        OutputFormat::Json => print_json(&dataset)?,
    }

    Ok(())
}

fn series_trend(name: &'static str, months: &[MonthlyMetric]) -> SeriesTrend {
    let reported: Vec<f64> = months.iter().filter_map(|m| m.achievement).collect();
    let total_target: f64 = months.iter().map(|m| m.target).sum();
    let year_end_forecast = analysis::predict_year_end(months, months.len());

    SeriesTrend {
        name,
        reported_months: reported.len(),
        total_months: months.len(),
        slope: analysis::linear_regression(&reported).slope,
        year_end_forecast,
        forecast_percentage: if total_target > 0.0 {
            year_end_forecast / total_target
        } else {
            0.0
        },
    }
}

fn series_trends(dataset: &Dataset) -> Vec<SeriesTrend> {
    [
        ("On-Time Billing", dataset.monthly_billing.as_deref()),
        ("On-Time Collection", dataset.monthly_collection.as_deref()),
    ]
    .into_iter()
    .filter_map(|(name, months)| months.map(|m| series_trend(name, m)))
    .collect()
}

fn status_label(percentage: Option<f64>) -> ColoredString {
    let status = AchievementStatus::from_percentage(percentage);
    match status {
        AchievementStatus::OnTrack => status.as_str().green(),
        AchievementStatus::AtRisk => status.as_str().yellow(),
        AchievementStatus::Behind => status.as_str().red(),
        AchievementStatus::NoData => status.as_str().dimmed(),
    }
}

fn print_totals(title: &str, totals: Option<&MetricTotals>) {
    let Some(totals) = totals else {
        println!("  {}: {}", title, "sheet missing".dimmed());
        return;
    };
    println!(
        "  {}: {:.2} / {:.2} ({:.1}%) {}",
        title,
        totals.total_achievement,
        totals.total_target,
        totals.achievement_percentage * 100.0,
        status_label(Some(totals.achievement_percentage))
    );
}

fn print_annual(key: &str, metric: Option<&AnnualMetric>) {
    let Some(metric) = metric else {
        return;
    };
    let percentage = (metric.target_fy != 0.0)
        .then(|| metric.achievement_till_date / metric.target_fy);
    println!(
        "  {} ({}): {} of {} {} {}",
        metric.label,
        key,
        metric.achievement_till_date,
        metric.target_fy,
        metric.unit,
        status_label(percentage)
    );
}

fn print_human(dataset: &Dataset) {
    println!("{}", "Totals:".bold());
    print_totals("On-Time Billing", dataset.billing_totals.as_ref());
    print_totals("On-Time Collection", dataset.collection_totals.as_ref());

    println!("\n{}", "Annual Metrics:".bold());
    let annual = &dataset.annual_metrics;
    print_annual("ndr", annual.ndr.as_ref());
    print_annual("gdr", annual.gdr.as_ref());
    print_annual("nps", annual.nps.as_ref());
    print_annual("arr", annual.arr.as_ref());
    print_annual("serviceRev", annual.service_rev.as_ref());

    let pipeline = &dataset.pipeline_coverage;
    println!("\n{}", "Pipeline Coverage:".bold());
    println!("  Open Pipeline: {:.2}", pipeline.open_pipeline);
    println!("  Remaining ARR Target: {:.2}", pipeline.remaining_target);
    println!("  Coverage: {:.2}x", pipeline.coverage);

    if let Some(total) = dataset.weight_total() {
        let line = format!("  Weightages Total: {}", total);
        if (total - 100.0).abs() > f64::EPSILON {
            println!("\n{}", line.yellow());
        } else {
            println!("\n{}", line);
        }
    }

    let trends = series_trends(dataset);
    if !trends.is_empty() {
        println!("\n{}", "Trends:".bold());
        for trend in &trends {
            println!(
                "  {}: {} of {} months reported, slope {:+.2}/month, year-end forecast {:.2} ({:.1}%)",
                trend.name,
                trend.reported_months,
                trend.total_months,
                trend.slope,
                trend.year_end_forecast,
                trend.forecast_percentage * 100.0
            );
        }
    }

    if let Some(rag) = dataset.rag_metrics.as_deref() {
        println!("\n{}", "RAG Metrics:".bold());
        for metric in rag {
            let status = match metric.status {
                RagStatus::Red => metric.status.as_str().red(),
                RagStatus::Amber => metric.status.as_str().yellow(),
                RagStatus::Green => metric.status.as_str().green(),
            };
            println!("  {}: {}", metric.label, status);
        }
    }
}

fn print_json(dataset: &Dataset) -> Result<()> {
    let report = StatsReport {
        dataset,
        trends: series_trends(dataset),
    };
    let json = serde_json::to_string_pretty(&report)?;
    println!("{}", json);
    Ok(())
}
