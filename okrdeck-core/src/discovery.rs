//! Input file discovery: `{Function}_Dashboard_FY{NN}.xlsx` names map to dataset keys

use crate::config::DiscoveryConfig;
use crate::store::DatasetKey;
use regex::Regex;
use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

fn file_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"(?i)^(\w+)_Dashboard_FY(\d+)\.xlsx$").expect("file pattern is valid")
    })
}

/// File name for a dataset key, e.g. `KAM_Dashboard_FY26.xlsx`
pub fn file_name_for(key: &DatasetKey) -> String {
    format!("{}_Dashboard_{}.xlsx", key.function, key.fiscal_year)
}

/// Dataset key encoded in a file name, if it follows the naming pattern or is
/// the configured fallback file
pub fn key_for_path<P: AsRef<Path>>(path: P, config: &DiscoveryConfig) -> Option<DatasetKey> {
    let file_name = path.as_ref().file_name()?.to_str()?;

    if let Some(caps) = file_pattern().captures(file_name) {
        return Some(DatasetKey::new(&caps[1], format!("FY{}", &caps[2])));
    }

    if file_name.eq_ignore_ascii_case(&config.fallback_file) {
        return Some(DatasetKey::new(
            &config.fallback_function,
            config.fallback_fiscal_year.clone(),
        ));
    }

    None
}

/// All input workbooks in `dir`. The fallback file only counts when no
/// patterned file exists.
pub fn discover<P: AsRef<Path>>(
    dir: P,
    config: &DiscoveryConfig,
) -> io::Result<BTreeMap<DatasetKey, PathBuf>> {
    let dir = dir.as_ref();
    let mut files = BTreeMap::new();

    let mut names: Vec<String> = fs::read_dir(dir)?
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().map(|t| t.is_file()).unwrap_or(false))
        .filter_map(|entry| entry.file_name().into_string().ok())
        .collect();
    // Stable choice when two names differ only by case
    names.sort();

    for name in &names {
        if let Some(caps) = file_pattern().captures(name) {
            let key = DatasetKey::new(&caps[1], format!("FY{}", &caps[2]));
            files.entry(key).or_insert_with(|| dir.join(name));
        }
    }

    if files.is_empty() {
        if let Some(name) = names
            .iter()
            .find(|name| name.eq_ignore_ascii_case(&config.fallback_file))
        {
            files.insert(
                DatasetKey::new(
                    &config.fallback_function,
                    config.fallback_fiscal_year.clone(),
                ),
                dir.join(name),
            );
        }
    }

    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;

    #[test]
    fn test_key_for_path() {
        let config = DiscoveryConfig::default();
        assert_eq!(
            key_for_path("/data/Sales_Dashboard_FY27.xlsx", &config),
            Some(DatasetKey::new("SALES", "FY27"))
        );
        assert_eq!(
            key_for_path("kam_dashboard_fy26.XLSX", &config),
            Some(DatasetKey::new("KAM", "FY26"))
        );
        assert_eq!(
            key_for_path("KAM_Dashboard_Input.xlsx", &config),
            Some(DatasetKey::new("KAM", "FY26"))
        );
        assert_eq!(key_for_path("KAM_Dashboard_FY26.xlsx.bak", &config), None);
        assert_eq!(key_for_path("notes.xlsx", &config), None);
    }

    #[test]
    fn test_file_name_round_trip() {
        let key = DatasetKey::new("Finance", "FY28");
        let config = DiscoveryConfig::default();
        assert_eq!(file_name_for(&key), "FINANCE_Dashboard_FY28.xlsx");
        assert_eq!(key_for_path(file_name_for(&key), &config), Some(key));
    }

    #[test]
    fn test_discover_prefers_patterned_files() {
        let dir = tempfile::tempdir().unwrap();
        for name in [
            "KAM_Dashboard_FY26.xlsx",
            "KAM_Dashboard_FY27.xlsx",
            "Sales_Dashboard_FY26.xlsx",
            "KAM_Dashboard_Input.xlsx",
            "readme.txt",
        ] {
            File::create(dir.path().join(name)).unwrap();
        }

        let files = discover(dir.path(), &DiscoveryConfig::default()).unwrap();
        let keys: Vec<String> = files.keys().map(ToString::to_string).collect();
        assert_eq!(keys, vec!["KAM/FY26", "KAM/FY27", "SALES/FY26"]);
    }

    #[test]
    fn test_discover_uses_fallback_file_alone() {
        let dir = tempfile::tempdir().unwrap();
        File::create(dir.path().join("KAM_Dashboard_Input.xlsx")).unwrap();

        let files = discover(dir.path(), &DiscoveryConfig::default()).unwrap();
        assert_eq!(files.len(), 1);
        assert!(files.contains_key(&DatasetKey::new("KAM", "FY26")));
    }
}
