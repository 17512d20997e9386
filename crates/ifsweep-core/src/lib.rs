//! ifsweep core library
//!
//! Domain types, file layout, configuration and the two best-effort
//! housekeeping components of a benchmark sweep: corpus cleaning and model
//! cache reclamation.

pub mod cache;
pub mod cleaner;
pub mod config;
pub mod domain;
pub mod layout;
pub mod telemetry;

pub use cache::{scan_cache_dir, CacheReclaim, CacheReclaimer, CachedRepo, RepoKind};
pub use cleaner::{CleanReport, DataCleaner};
pub use config::{SweepConfig, DEFAULT_KILL_LIST, DEFAULT_MODELS, DEFAULT_SCORER_COMMAND};
pub use domain::{
    extract_prompt, CorpusRecord, ModelDescriptor, ResponseRecord, Result, SafeName, SweepError,
};
pub use layout::DataLayout;
pub use telemetry::{format_elapsed, init_tracing};

/// ifsweep version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
