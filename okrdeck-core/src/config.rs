//! Configuration: data directory, file discovery, refresh policy and layout checks

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Default configuration file looked up in the working directory
pub const DEFAULT_CONFIG_FILE: &str = "okrdeck.toml";

/// Main configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DashboardConfig {
    /// Directory holding `{Function}_Dashboard_FY{NN}.xlsx` files
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
    #[serde(default)]
    pub discovery: DiscoveryConfig,
    #[serde(default)]
    pub refresh: RefreshConfig,
    #[serde(default)]
    pub checks: CheckConfig,
}

impl DashboardConfig {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        let config: DashboardConfig = toml::from_str(&content)?;
        Ok(config)
    }

    /// Load `okrdeck.toml` from the working directory if present, defaults otherwise
    pub fn load_default() -> Result<Self> {
        let path = PathBuf::from(DEFAULT_CONFIG_FILE);
        if path.exists() {
            Self::from_file(path)
        } else {
            Ok(Self::default())
        }
    }

    /// Validate check selectors against a set of valid tokens
    pub fn validate(&self, valid_tokens: &HashSet<String>) -> Result<()> {
        for check in &self.checks.disabled {
            if check == "ALL" {
                anyhow::bail!("Configuration error: 'ALL' is not allowed in checks.disabled");
            }
            if !valid_tokens.contains(check) {
                anyhow::bail!(
                    "Configuration error: Unknown check '{}' in checks.disabled",
                    check
                );
            }
        }

        for check in &self.checks.enabled {
            if !valid_tokens.contains(check) {
                anyhow::bail!(
                    "Configuration error: Unknown check '{}' in checks.enabled",
                    check
                );
            }
        }

        if self.refresh.poll_interval_ms == 0 {
            anyhow::bail!("Configuration error: refresh.poll_interval_ms must be positive");
        }

        Ok(())
    }
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            discovery: DiscoveryConfig::default(),
            refresh: RefreshConfig::default(),
            checks: CheckConfig::default(),
        }
    }
}

fn default_data_dir() -> PathBuf {
    PathBuf::from(".")
}

/// How input workbooks are found and keyed
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DiscoveryConfig {
    /// Legacy single-file name used when no patterned file exists
    pub fallback_file: String,
    pub fallback_function: String,
    pub fallback_fiscal_year: String,
    /// Function listed first and chosen as default
    pub preferred_function: String,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            fallback_file: "KAM_Dashboard_Input.xlsx".to_string(),
            fallback_function: "KAM".to_string(),
            fallback_fiscal_year: "FY26".to_string(),
            preferred_function: "KAM".to_string(),
        }
    }
}

/// Retry and polling behaviour of the refresher
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RefreshConfig {
    /// Extra attempts after the first failed load
    pub max_retries: u32,
    /// Base delay; attempt `n` waits `n * retry_delay_ms`
    pub retry_delay_ms: u64,
    pub poll_interval_ms: u64,
}

impl RefreshConfig {
    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

impl Default for RefreshConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            retry_delay_ms: 1000,
            poll_interval_ms: 1500,
        }
    }
}

/// Layout check selection
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CheckConfig {
    /// Enabled checks (empty means all enabled)
    pub enabled: HashSet<String>,
    pub disabled: HashSet<String>,
    /// Expected sum of the Weightages sheet
    pub weight_total: f64,
}

impl CheckConfig {
    /// Check if a check is enabled
    pub fn is_enabled(&self, check_id: &str) -> bool {
        if self
            .disabled
            .iter()
            .any(|selector| matches_check_selector(selector, check_id))
        {
            return false;
        }

        if self.enabled.is_empty() {
            return true;
        }

        self.enabled
            .iter()
            .any(|selector| matches_check_selector(selector, check_id))
    }
}

impl Default for CheckConfig {
    fn default() -> Self {
        Self {
            enabled: HashSet::new(),
            disabled: HashSet::new(),
            weight_total: 100.0,
        }
    }
}

fn matches_check_selector(selector: &str, check_id: &str) -> bool {
    if selector == "ALL" {
        return true;
    }
    check_id == selector || check_id.starts_with(selector)
}
