use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use okrdeck_core::checks::registry;
use okrdeck_core::config::DEFAULT_CONFIG_FILE;
use okrdeck_core::{Checker, DashboardConfig, Severity};
use std::path::PathBuf;

mod formatter;

#[derive(Parser)]
#[command(name = "okrlint")]
#[command(about = "Layout checker for OKR dashboard workbooks", long_about = None)]
#[command(version)]
struct Cli {
    /// Path to the Excel/ODS file to check
    #[arg(value_name = "FILE")]
    file: PathBuf,

    /// Path to configuration file (TOML)
    #[arg(short, long, value_name = "CONFIG")]
    config: Option<PathBuf>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "human")]
    format: OutputFormat,

    /// Show only errors (hide warnings and info)
    #[arg(short, long)]
    errors_only: bool,
}

#[derive(Clone, ValueEnum)]
enum OutputFormat {
    /// Human-readable colored output
    Human,
    /// JSON output for CI/CD integration
    Json,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = if let Some(config_path) = &cli.config {
        DashboardConfig::from_file(config_path)
            .with_context(|| format!("Failed to load config from {}", config_path.display()))?
    } else {
        DashboardConfig::load_default()
            .with_context(|| format!("Failed to load config from {}", DEFAULT_CONFIG_FILE))?
    };

    let valid_tokens = registry::get_all_valid_tokens();
    config
        .validate(&valid_tokens)
        .context("Invalid configuration")?;

    let checker = Checker::with_config(&config.checks);

    let violations = checker
        .check_file(&cli.file)
        .with_context(|| format!("Failed to check file: {}", cli.file.display()))?;

    let violations: Vec<_> = if cli.errors_only {
        violations
            .into_iter()
            .filter(|v| v.severity == Severity::Error)
            .collect()
    } else {
        violations
    };

    match cli.format {
        OutputFormat::Human => {
            formatter::print_human(&cli.file, &violations);
        }
        OutputFormat::Json => {
            formatter::print_json(&cli.file, &violations)?;
        }
    }

    // Warnings and info still exit 0
    if violations.iter().any(|v| v.severity == Severity::Error) {
        std::process::exit(1);
    }

    Ok(())
}
