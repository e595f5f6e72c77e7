//! Layout checks: how far a workbook strays from the fixed dashboard layout.
//!
//! Ingestion tolerates every finding reported here; the checks only make the
//! silent fallbacks (omitted fields, zeroed cells, ignored rows) visible.

pub mod registry;

pub mod chk001_missing_sheet;
pub mod chk002_weight_total;
pub mod chk003_non_numeric_cell;
pub mod chk004_unknown_annual_label;
pub mod chk005_duplicate_weight_key;

use crate::config::CheckConfig;
use crate::reader::{self, Workbook};
use crate::violation::Violation;
use anyhow::Result;
use std::path::Path;

/// Trait that all layout checks implement
pub trait LayoutCheck: Send + Sync {
    /// Unique check identifier (e.g., "CHK001")
    fn id(&self) -> &str;

    /// Human-readable check name
    fn name(&self) -> &str;

    /// Check the workbook for violations
    fn check(&self, workbook: &Workbook) -> Result<Vec<Violation>>;
}

/// Runs the enabled checks against workbooks
pub struct Checker {
    checks: Vec<Box<dyn LayoutCheck>>,
}

impl Checker {
    /// Checker with every check enabled
    pub fn new() -> Self {
        Self::with_config(&CheckConfig::default())
    }

    pub fn with_config(config: &CheckConfig) -> Self {
        Self {
            checks: registry::create_enabled_checks(config),
        }
    }

    /// IDs of the checks this checker runs
    pub fn check_ids(&self) -> Vec<&str> {
        self.checks.iter().map(|c| c.id()).collect()
    }

    pub fn check_workbook(&self, workbook: &Workbook) -> Result<Vec<Violation>> {
        let mut violations = Vec::new();
        for check in &self.checks {
            violations.extend(check.check(workbook)?);
        }

        // Hierarchical order for reporting
        violations.sort();
        Ok(violations)
    }

    pub fn check_file<P: AsRef<Path>>(&self, path: P) -> Result<Vec<Violation>> {
        let workbook = reader::read_workbook(path)?;
        self.check_workbook(&workbook)
    }
}

impl Default for Checker {
    fn default() -> Self {
        Self::new()
    }
}
