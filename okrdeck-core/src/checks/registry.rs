//! Check registry for managing and creating check instances

use super::*;
use std::collections::HashSet;

/// Prefix shared by every check ID
pub const CHECK_PREFIX: &str = "CHK";

/// All valid configuration tokens (check IDs, the "CHK" prefix, "ALL")
pub fn get_all_valid_tokens() -> HashSet<String> {
    let mut tokens = HashSet::new();
    tokens.insert("ALL".to_string());
    tokens.insert(CHECK_PREFIX.to_string());

    for check in create_all_checks(&CheckConfig::default()) {
        tokens.insert(check.id().to_string());
    }

    tokens
}

/// Create the checks enabled by `config`
pub fn create_enabled_checks(config: &CheckConfig) -> Vec<Box<dyn LayoutCheck>> {
    create_all_checks(config)
        .into_iter()
        .filter(|check| config.is_enabled(check.id()))
        .collect()
}

fn create_all_checks(config: &CheckConfig) -> Vec<Box<dyn LayoutCheck>> {
    vec![
        Box::new(chk001_missing_sheet::MissingSheetCheck),
        Box::new(chk002_weight_total::WeightTotalCheck::new(config)),
        Box::new(chk003_non_numeric_cell::NonNumericCellCheck),
        Box::new(chk004_unknown_annual_label::UnknownAnnualLabelCheck),
        Box::new(chk005_duplicate_weight_key::DuplicateWeightKeyCheck),
    ]
}
