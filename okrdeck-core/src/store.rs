//! Dataset store keyed by (business function, fiscal year)

use crate::dataset::Dataset;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Arc, PoisonError, RwLock};

/// Identifies one workbook's worth of data
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DatasetKey {
    /// Business function, upper-cased
    pub function: String,
    pub fiscal_year: String,
}

impl DatasetKey {
    pub fn new(function: impl AsRef<str>, fiscal_year: impl Into<String>) -> Self {
        Self {
            function: function.as_ref().to_uppercase(),
            fiscal_year: fiscal_year.into(),
        }
    }
}

impl fmt::Display for DatasetKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.function, self.fiscal_year)
    }
}

/// Numeric part of a fiscal year label ("FY27" -> 27)
pub fn fiscal_year_number(fiscal_year: &str) -> u32 {
    fiscal_year
        .chars()
        .filter(char::is_ascii_digit)
        .collect::<String>()
        .parse()
        .unwrap_or(0)
}

type Slots = BTreeMap<String, BTreeMap<String, Arc<Dataset>>>;

/// Latest good dataset per key.
///
/// Entries are replaced whole; readers get a shared immutable `Arc` and never
/// observe a half-updated dataset.
#[derive(Debug, Default)]
pub struct DatasetStore {
    slots: RwLock<Slots>,
    preferred_function: Option<String>,
}

impl DatasetStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store that lists `function` first in [`DatasetStore::functions`]
    pub fn with_preferred_function(function: impl AsRef<str>) -> Self {
        Self {
            slots: RwLock::default(),
            preferred_function: Some(function.as_ref().to_uppercase()),
        }
    }

    pub fn get(&self, key: &DatasetKey) -> Option<Arc<Dataset>> {
        let slots = self.slots.read().unwrap_or_else(PoisonError::into_inner);
        slots
            .get(&key.function)
            .and_then(|years| years.get(&key.fiscal_year))
            .cloned()
    }

    /// Replace the entry for `key`, returning the previous dataset
    pub fn set(&self, key: DatasetKey, dataset: Dataset) -> Option<Arc<Dataset>> {
        let dataset = Arc::new(dataset);
        let mut slots = self.slots.write().unwrap_or_else(PoisonError::into_inner);
        slots
            .entry(key.function)
            .or_default()
            .insert(key.fiscal_year, dataset)
    }

    /// Drop the entry for `key`; a function without years disappears too
    pub fn invalidate(&self, key: &DatasetKey) -> Option<Arc<Dataset>> {
        let mut slots = self.slots.write().unwrap_or_else(PoisonError::into_inner);
        let years = slots.get_mut(&key.function)?;
        let removed = years.remove(&key.fiscal_year);
        if years.is_empty() {
            slots.remove(&key.function);
        }
        removed
    }

    /// Functions with at least one dataset: preferred function first, then alphabetical
    pub fn functions(&self) -> Vec<String> {
        let slots = self.slots.read().unwrap_or_else(PoisonError::into_inner);
        let mut functions: Vec<String> = slots
            .iter()
            .filter(|(_, years)| !years.is_empty())
            .map(|(function, _)| function.clone())
            .collect();

        if let Some(preferred) = &self.preferred_function {
            functions.sort_by_key(|f| (f != preferred, f.clone()));
        }
        functions
    }

    pub fn default_function(&self) -> Option<String> {
        self.functions().into_iter().next()
    }

    /// Fiscal years of `function`, oldest first
    pub fn years(&self, function: &str) -> Vec<String> {
        let slots = self.slots.read().unwrap_or_else(PoisonError::into_inner);
        let mut years: Vec<String> = slots
            .get(&function.to_uppercase())
            .map(|years| years.keys().cloned().collect())
            .unwrap_or_default();
        years.sort_by_key(|fy| fiscal_year_number(fy));
        years
    }

    /// Most recent fiscal year of `function`
    pub fn default_year(&self, function: &str) -> Option<String> {
        self.years(function).pop()
    }

    /// All keys currently held
    pub fn keys(&self) -> Vec<DatasetKey> {
        let slots = self.slots.read().unwrap_or_else(PoisonError::into_inner);
        slots
            .iter()
            .flat_map(|(function, years)| {
                years.keys().map(move |fy| DatasetKey {
                    function: function.clone(),
                    fiscal_year: fy.clone(),
                })
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        let slots = self.slots.read().unwrap_or_else(PoisonError::into_inner);
        slots.values().map(BTreeMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::PipelineCoverage;
    use std::thread;

    fn dataset_with_pipeline(open_pipeline: f64) -> Dataset {
        Dataset {
            pipeline_coverage: PipelineCoverage {
                open_pipeline,
                ..Default::default()
            },
            ..Default::default()
        }
    }

    #[test]
    fn test_key_function_is_uppercased() {
        let key = DatasetKey::new("sales", "FY27");
        assert_eq!(key.function, "SALES");
        assert_eq!(key.to_string(), "SALES/FY27");
    }

    #[test]
    fn test_set_replaces_whole_entry() {
        let store = DatasetStore::new();
        let key = DatasetKey::new("KAM", "FY26");

        assert!(store.set(key.clone(), dataset_with_pipeline(1.0)).is_none());
        let before = store.get(&key).unwrap();

        let previous = store.set(key.clone(), dataset_with_pipeline(2.0)).unwrap();
        assert!(Arc::ptr_eq(&before, &previous));

        // Earlier readers keep their snapshot
        assert_eq!(before.pipeline_coverage.open_pipeline, 1.0);
        assert_eq!(store.get(&key).unwrap().pipeline_coverage.open_pipeline, 2.0);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_invalidate_drops_empty_function() {
        let store = DatasetStore::new();
        let key = DatasetKey::new("SALES", "FY26");
        store.set(key.clone(), Dataset::default());

        assert!(store.invalidate(&key).is_some());
        assert!(store.get(&key).is_none());
        assert!(store.functions().is_empty());
        assert!(store.invalidate(&key).is_none());
    }

    #[test]
    fn test_function_and_year_ordering() {
        let store = DatasetStore::with_preferred_function("kam");
        store.set(DatasetKey::new("SALES", "FY26"), Dataset::default());
        store.set(DatasetKey::new("FINANCE", "FY26"), Dataset::default());
        store.set(DatasetKey::new("KAM", "FY9"), Dataset::default());
        store.set(DatasetKey::new("KAM", "FY27"), Dataset::default());
        store.set(DatasetKey::new("KAM", "FY26"), Dataset::default());

        assert_eq!(store.functions(), vec!["KAM", "FINANCE", "SALES"]);
        assert_eq!(store.default_function().as_deref(), Some("KAM"));
        assert_eq!(store.years("kam"), vec!["FY9", "FY26", "FY27"]);
        assert_eq!(store.default_year("KAM").as_deref(), Some("FY27"));
        assert!(store.years("HR").is_empty());
        assert_eq!(store.keys().len(), 5);
    }

    #[test]
    fn test_independent_keys_refresh_concurrently() {
        let store = Arc::new(DatasetStore::new());
        let handles: Vec<_> = ["KAM", "SALES", "FINANCE", "HR"]
            .into_iter()
            .map(|function| {
                let store = Arc::clone(&store);
                thread::spawn(move || {
                    for i in 0..50 {
                        store.set(DatasetKey::new(function, "FY26"), dataset_with_pipeline(i as f64));
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(store.len(), 4);
        let last = store.get(&DatasetKey::new("HR", "FY26")).unwrap();
        assert_eq!(last.pipeline_coverage.open_pipeline, 49.0);
    }
}
