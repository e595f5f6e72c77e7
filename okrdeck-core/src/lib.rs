//! okrdeck-core: Core library for OKR dashboard workbooks
//!
//! Reads business-metrics workbooks in a fixed sheet layout, turns each into
//! one composite [`Dataset`], and keeps the latest good dataset per
//! (function, fiscal year) while the files change underneath.

pub mod aggregate;
pub mod analysis;
pub mod checks;
pub mod config;
pub mod dataset;
pub mod discovery;
pub mod error;
pub mod logging;
pub mod parse;
pub mod reader;
pub mod refresh;
pub mod store;
pub mod template;
pub mod violation;
pub mod writer;

pub use aggregate::build_dataset;
pub use checks::{Checker, LayoutCheck};
pub use config::DashboardConfig;
pub use dataset::{Dataset, RagStatus, SheetKind};
pub use error::{IngestError, IngestResult};
pub use refresh::{RefreshOutcome, Refresher, RetryPolicy, load_dataset};
pub use store::{DatasetKey, DatasetStore};
pub use violation::{Severity, Violation, ViolationScope};
