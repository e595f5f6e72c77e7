use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use okrdeck_core::config::DEFAULT_CONFIG_FILE;
use okrdeck_core::template::{self, SAMPLE_FISCAL_YEAR};
use okrdeck_core::{DashboardConfig, DatasetKey, RagStatus, RefreshOutcome, Refresher, logging, writer};
use std::path::PathBuf;
use tracing::info;

#[derive(Parser)]
#[command(name = "okrcli")]
#[command(about = "CLI tools for OKR dashboard workbooks", long_about = None)]
#[command(version)]
struct Cli {
    /// Path to configuration file (TOML)
    #[arg(short, long, value_name = "CONFIG", global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Write an input workbook template
    Template {
        /// Business function (e.g. KAM); a lone FYnn argument is taken as the fiscal year
        #[arg(value_name = "FUNCTION")]
        function: Option<String>,

        /// Fiscal year (e.g. FY26)
        #[arg(value_name = "FY")]
        fiscal_year: Option<String>,

        /// Output directory (defaults to the configured data directory)
        #[arg(short, long, value_name = "DIR")]
        output: Option<PathBuf>,
    },

    /// Set the status of one RAG metric in a workbook
    Rag {
        /// Path to the workbook
        #[arg(value_name = "FILE")]
        file: PathBuf,

        /// Metric key (e.g. capabilityAI)
        #[arg(short, long)]
        key: String,

        /// New status: red, amber or green
        #[arg(short, long)]
        value: RagStatus,
    },

    /// Load every workbook of a directory and keep reloading changed files
    Watch {
        /// Data directory (defaults to the configured one)
        #[arg(value_name = "DIR")]
        dir: Option<PathBuf>,

        /// Load once, print the result and exit
        #[arg(long)]
        once: bool,

        /// Output format
        #[arg(short, long, value_enum, default_value = "human")]
        format: OutputFormat,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum OutputFormat {
    /// Human-readable output
    Human,
    /// JSON output
    Json,
}

const DEFAULT_FUNCTION: &str = "KAM";

fn main() -> Result<()> {
    logging::init();
    let cli = Cli::parse();

    let config = if let Some(config_path) = &cli.config {
        DashboardConfig::from_file(config_path)
            .with_context(|| format!("Failed to load config from {}", config_path.display()))?
    } else {
        DashboardConfig::load_default()
            .with_context(|| format!("Failed to load config from {}", DEFAULT_CONFIG_FILE))?
    };

    match cli.command {
        Command::Template {
            function,
            fiscal_year,
            output,
        } => {
            let (function, fiscal_year) = template_args(function, fiscal_year);
            let dir = output.unwrap_or_else(|| config.data_dir.clone());
            let path = template::write_template(&dir, &function, &fiscal_year)
                .context("Failed to create template")?;
            println!("✓ Template created: {}", path.display());
        }
        Command::Rag { file, key, value } => {
            writer::set_rag_status(&file, &key, value)
                .with_context(|| format!("Failed to update {}", file.display()))?;
            println!("✓ {} set to {} in {}", key, value, file.display());
        }
        Command::Watch { dir, once, format } => {
            let mut config = config;
            if let Some(dir) = dir {
                config.data_dir = dir;
            }
            watch(config, once, format)?;
        }
    }

    Ok(())
}

/// Resolve the optional positionals: `[FUNCTION] [FY]`, or a lone `FY`
fn template_args(function: Option<String>, fiscal_year: Option<String>) -> (String, String) {
    let default_year = format!("FY{:02}", SAMPLE_FISCAL_YEAR);
    match (function, fiscal_year) {
        (Some(first), None) if template::parse_fiscal_year(&first).is_ok() => {
            (DEFAULT_FUNCTION.to_string(), first)
        }
        (function, fiscal_year) => (
            function.unwrap_or_else(|| DEFAULT_FUNCTION.to_string()),
            fiscal_year.unwrap_or(default_year),
        ),
    }
}

fn watch(config: DashboardConfig, once: bool, format: OutputFormat) -> Result<()> {
    let data_dir = config.data_dir.clone();
    let refresher = Refresher::with_config(config);

    let outcomes = refresher
        .load_all()
        .with_context(|| format!("Failed to scan {}", data_dir.display()))?;

    match format {
        OutputFormat::Human => print_human(&refresher, &outcomes),
        OutputFormat::Json => print_json(&refresher, &outcomes, once)?,
    }

    if once {
        return Ok(());
    }

    info!(
        dir = %data_dir.display(),
        interval_ms = refresher.config().refresh.poll_interval_ms,
        "watching for changes"
    );
    refresher
        .watch(|outcomes| match format {
            OutputFormat::Human => print_outcomes(outcomes),
            OutputFormat::Json => {
                for (key, outcome) in outcomes {
                    println!("{}", outcome_json(key, outcome));
                }
            }
        })
        .with_context(|| format!("Failed to scan {}", data_dir.display()))
}

/// `{"key": "KAM/FY26", "outcome": "updated", ...}`
fn outcome_json(key: &DatasetKey, outcome: &RefreshOutcome) -> serde_json::Value {
    let mut value = serde_json::to_value(outcome).unwrap_or_default();
    if let Some(fields) = value.as_object_mut() {
        fields.insert("key".to_string(), key.to_string().into());
    }
    value
}

fn print_outcomes(outcomes: &[(DatasetKey, RefreshOutcome)]) {
    for (key, outcome) in outcomes {
        match outcome {
            RefreshOutcome::Updated => println!("  {}: updated", key),
            RefreshOutcome::Removed => println!("  {}: removed", key),
            RefreshOutcome::Retained { stale, reason } => {
                let kept = if *stale { "previous data kept" } else { "no data" };
                println!("  {}: load failed ({}): {}", key, kept, reason);
            }
        }
    }
}

fn print_human(refresher: &Refresher, outcomes: &[(DatasetKey, RefreshOutcome)]) {
    println!("Data directory: {}", refresher.config().data_dir.display());
    if outcomes.is_empty() {
        println!("No dashboard workbooks found");
        return;
    }
    print_outcomes(outcomes);

    let store = refresher.store();
    println!("\nDatasets: {}", store.len());
    for function in store.functions() {
        println!("  {}: {}", function, store.years(&function).join(", "));
    }
    if let Some(function) = store.default_function() {
        let year = store.default_year(&function).unwrap_or_default();
        println!("Default: {} {}", function, year);
    }
}

fn print_json(
    refresher: &Refresher,
    outcomes: &[(DatasetKey, RefreshOutcome)],
    with_datasets: bool,
) -> Result<()> {
    let store = refresher.store();
    let default_function = store.default_function();
    let default_year = default_function
        .as_deref()
        .and_then(|function| store.default_year(function));

    let mut output = serde_json::json!({
        "dataDir": refresher.config().data_dir.display().to_string(),
        "outcomes": outcomes
            .iter()
            .map(|(key, outcome)| outcome_json(key, outcome))
            .collect::<Vec<_>>(),
        "defaultFunction": default_function,
        "defaultYear": default_year,
    });

    if with_datasets {
        let datasets: serde_json::Map<String, serde_json::Value> = store
            .keys()
            .into_iter()
            .filter_map(|key| {
                let dataset = store.get(&key)?;
                let value = serde_json::to_value(dataset.as_ref()).ok()?;
                Some((key.to_string(), value))
            })
            .collect();
        output["datasets"] = serde_json::Value::Object(datasets);
    }

    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(function: Option<&str>, fiscal_year: Option<&str>) -> (String, String) {
        template_args(function.map(String::from), fiscal_year.map(String::from))
    }

    #[test]
    fn test_template_args() {
        assert_eq!(args(None, None), ("KAM".to_string(), "FY26".to_string()));
        assert_eq!(args(Some("FY27"), None), ("KAM".to_string(), "FY27".to_string()));
        assert_eq!(args(Some("kam"), None), ("kam".to_string(), "FY26".to_string()));
        assert_eq!(
            args(Some("KAM"), Some("FY28")),
            ("KAM".to_string(), "FY28".to_string())
        );
    }

    #[test]
    fn test_cli_parses_rag_value() {
        let cli = Cli::try_parse_from([
            "okrcli", "rag", "KAM_Dashboard_FY26.xlsx", "--key", "capabilityAI", "--value", "green",
        ])
        .unwrap();
        match cli.command {
            Command::Rag { key, value, .. } => {
                assert_eq!(key, "capabilityAI");
                assert_eq!(value, RagStatus::Green);
            }
            _ => panic!("expected rag command"),
        }

        assert!(Cli::try_parse_from(["okrcli", "rag", "f.xlsx", "--key", "k", "--value", "blue"]).is_err());
    }

    #[test]
    fn test_outcome_json() {
        let key = DatasetKey::new("kam", "FY26");
        let value = outcome_json(
            &key,
            &RefreshOutcome::Retained {
                stale: true,
                reason: "locked".to_string(),
            },
        );
        assert_eq!(value["key"], "KAM/FY26");
        assert_eq!(value["outcome"], "retained");
        assert_eq!(value["stale"], true);
        assert_eq!(outcome_json(&key, &RefreshOutcome::Updated)["outcome"], "updated");
    }
}
