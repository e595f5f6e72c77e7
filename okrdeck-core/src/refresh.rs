//! Refresh policy: load workbooks into the store, retry transient failures,
//! keep the last good dataset when a load fails.

use crate::aggregate::build_dataset;
use crate::config::{DashboardConfig, RefreshConfig};
use crate::dataset::Dataset;
use crate::discovery;
use crate::error::{IngestError, IngestResult};
use crate::reader;
use crate::store::{DatasetKey, DatasetStore};
use rayon::prelude::*;
use serde::Serialize;
use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread;
use std::time::{Duration, SystemTime};
use tracing::{debug, info, warn};

/// Read and aggregate one workbook
pub fn load_dataset<P: AsRef<Path>>(path: P) -> IngestResult<Dataset> {
    let path = path.as_ref();
    let workbook = reader::read_workbook(path)?;
    let dataset = build_dataset(&workbook);
    debug!(path = %path.display(), sheets = workbook.sheets.len(), "workbook parsed");
    Ok(dataset)
}

/// Bounded retry with linear backoff: retry `n` waits `n * delay`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub delay: Duration,
}

impl RetryPolicy {
    pub fn new(max_retries: u32, delay: Duration) -> Self {
        Self { max_retries, delay }
    }

    pub fn from_config(config: &RefreshConfig) -> Self {
        Self::new(config.max_retries, config.retry_delay())
    }

    pub fn delay_for(&self, retry: u32) -> Duration {
        self.delay * retry
    }

    /// Run `op` until it succeeds, fails permanently, or retries run out.
    /// `op` receives the zero-based attempt number.
    pub fn run<T, F>(&self, mut op: F) -> IngestResult<T>
    where
        F: FnMut(u32) -> IngestResult<T>,
    {
        let mut attempt = 0;
        loop {
            match op(attempt) {
                Ok(value) => return Ok(value),
                Err(err) if !err.is_retryable() || attempt >= self.max_retries => return Err(err),
                Err(err) => {
                    attempt += 1;
                    warn!(
                        attempt,
                        max_retries = self.max_retries,
                        error = %err,
                        "load failed, retrying"
                    );
                    thread::sleep(self.delay_for(attempt));
                }
            }
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_config(&RefreshConfig::default())
    }
}

/// Result of refreshing one key
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "lowercase")]
pub enum RefreshOutcome {
    /// A freshly parsed dataset replaced the entry
    Updated,
    /// Loading failed; `stale` tells whether a previous dataset is still served
    Retained { stale: bool, reason: String },
    /// The file is gone and the entry was dropped
    Removed,
}

impl RefreshOutcome {
    pub fn is_updated(&self) -> bool {
        matches!(self, RefreshOutcome::Updated)
    }
}

/// Keeps a [`DatasetStore`] in sync with the workbooks of a directory
pub struct Refresher {
    store: Arc<DatasetStore>,
    config: DashboardConfig,
    policy: RetryPolicy,
    /// Modification time of each file at its last load
    seen: Mutex<HashMap<PathBuf, (DatasetKey, Option<SystemTime>)>>,
}

impl Refresher {
    pub fn new(store: Arc<DatasetStore>, config: DashboardConfig) -> Self {
        let policy = RetryPolicy::from_config(&config.refresh);
        Self {
            store,
            config,
            policy,
            seen: Mutex::new(HashMap::new()),
        }
    }

    /// Refresher with a fresh store ordered by the configured preferred function
    pub fn with_config(config: DashboardConfig) -> Self {
        let store = Arc::new(DatasetStore::with_preferred_function(
            &config.discovery.preferred_function,
        ));
        Self::new(store, config)
    }

    pub fn store(&self) -> &Arc<DatasetStore> {
        &self.store
    }

    pub fn config(&self) -> &DashboardConfig {
        &self.config
    }

    pub fn policy(&self) -> RetryPolicy {
        self.policy
    }

    /// Load `path` into the entry for `key`.
    ///
    /// Never fails: errors are logged and reported in the outcome, and the
    /// previous dataset stays in place. The entry is dropped only when the
    /// file is still missing once the retries are spent.
    pub fn refresh(&self, key: &DatasetKey, path: &Path) -> RefreshOutcome {
        match self.policy.run(|_| load_dataset(path)) {
            Ok(dataset) => {
                self.store.set(key.clone(), dataset);
                info!(%key, path = %path.display(), "dataset updated");
                RefreshOutcome::Updated
            }
            Err(IngestError::NotFound(_)) => {
                self.store.invalidate(key);
                info!(%key, path = %path.display(), "workbook removed, dataset dropped");
                RefreshOutcome::Removed
            }
            Err(err) => {
                let stale = self.store.get(key).is_some();
                warn!(%key, error = %err, stale, "refresh failed, keeping previous dataset");
                RefreshOutcome::Retained {
                    stale,
                    reason: err.to_string(),
                }
            }
        }
    }

    /// Discover every workbook in the data directory and load them in parallel
    pub fn load_all(&self) -> io::Result<Vec<(DatasetKey, RefreshOutcome)>> {
        let files = discovery::discover(&self.config.data_dir, &self.config.discovery)?;
        info!(
            dir = %self.config.data_dir.display(),
            files = files.len(),
            "loading workbooks"
        );

        let stamped: Vec<(DatasetKey, PathBuf, Option<SystemTime>)> = files
            .into_iter()
            .map(|(key, path)| {
                let modified = modified_time(&path);
                (key, path, modified)
            })
            .collect();

        Ok(self.refresh_many(stamped))
    }

    /// Re-ingest files that are new or changed since their last load and drop
    /// keys whose file disappeared
    pub fn poll(&self) -> io::Result<Vec<(DatasetKey, RefreshOutcome)>> {
        let files = discovery::discover(&self.config.data_dir, &self.config.discovery)?;

        let (changed, vanished) = {
            let seen = self.seen.lock().unwrap_or_else(PoisonError::into_inner);

            let changed: Vec<(DatasetKey, PathBuf, Option<SystemTime>)> = files
                .iter()
                .filter_map(|(key, path)| {
                    let modified = modified_time(path);
                    match seen.get(path) {
                        Some((_, last)) if *last == modified => None,
                        _ => Some((key.clone(), path.clone(), modified)),
                    }
                })
                .collect();

            let vanished: Vec<(PathBuf, DatasetKey)> = seen
                .iter()
                .filter(|(path, (key, _))| files.get(key) != Some(*path))
                .map(|(path, (key, _))| (path.clone(), key.clone()))
                .collect();

            (changed, vanished)
        };

        // Vanished files get the same retry window as any other load
        let mut pending = changed;
        {
            let mut seen = self.seen.lock().unwrap_or_else(PoisonError::into_inner);
            for (path, key) in vanished {
                seen.remove(&path);
                if files.contains_key(&key) {
                    // Another file now provides this key; it is in `changed`
                    continue;
                }
                let modified = modified_time(&path);
                pending.push((key, path, modified));
            }
        }

        if !pending.is_empty() {
            debug!(files = pending.len(), "changed workbooks detected");
        }
        Ok(self.refresh_many(pending))
    }

    /// Poll forever at the configured interval, handing each non-empty batch
    /// of outcomes to `on_change`
    pub fn watch<F>(&self, mut on_change: F) -> io::Result<()>
    where
        F: FnMut(&[(DatasetKey, RefreshOutcome)]),
    {
        loop {
            let outcomes = self.poll()?;
            if !outcomes.is_empty() {
                on_change(&outcomes);
            }
            thread::sleep(self.config.refresh.poll_interval());
        }
    }

    fn refresh_many(
        &self,
        files: Vec<(DatasetKey, PathBuf, Option<SystemTime>)>,
    ) -> Vec<(DatasetKey, RefreshOutcome)> {
        let outcomes: Vec<(DatasetKey, PathBuf, Option<SystemTime>, RefreshOutcome)> = files
            .into_par_iter()
            .map(|(key, path, modified)| {
                let outcome = self.refresh(&key, &path);
                (key, path, modified, outcome)
            })
            .collect();

        let mut seen = self.seen.lock().unwrap_or_else(PoisonError::into_inner);
        outcomes
            .into_iter()
            .map(|(key, path, modified, outcome)| {
                if outcome == RefreshOutcome::Removed {
                    seen.remove(&path);
                } else {
                    // A failed load is not retried until the file changes again
                    seen.insert(path, (key.clone(), modified));
                }
                (key, outcome)
            })
            .collect()
    }
}

fn modified_time(path: &Path) -> Option<SystemTime> {
    fs::metadata(path).and_then(|m| m.modified()).ok()
}
