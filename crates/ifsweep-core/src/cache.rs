//! Best-effort reclamation of locally cached model repositories.
//!
//! Understands the hub cache layout, where each repository lives in a
//! directory named `<kind>s--<namespace>--<name>`:
//!
//! ```text
//! <cache>/models--Qwen--Qwen2.5-7B-Instruct/{blobs,refs,snapshots}
//! <cache>/datasets--org--corpus/...
//! ```

use crate::domain::ModelDescriptor;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Kind of cached repository, from its directory prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RepoKind {
    Model,
    Dataset,
    Space,
}

impl RepoKind {
    fn from_prefix(prefix: &str) -> Option<Self> {
        match prefix {
            "models" => Some(Self::Model),
            "datasets" => Some(Self::Dataset),
            "spaces" => Some(Self::Space),
            _ => None,
        }
    }
}

/// One repository found in the cache.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachedRepo {
    pub repo_id: String,
    pub kind: RepoKind,
    pub path: PathBuf,
}

/// Parse a cache directory name into `(kind, repo_id)`.
fn parse_repo_dir(name: &str) -> Option<(RepoKind, String)> {
    let (prefix, rest) = name.split_once("--")?;
    let kind = RepoKind::from_prefix(prefix)?;
    if rest.is_empty() {
        return None;
    }
    Some((kind, rest.replace("--", "/")))
}

/// Enumerate repositories under `cache_dir`. Unrecognised entries are skipped.
pub fn scan_cache_dir(cache_dir: &Path) -> io::Result<Vec<CachedRepo>> {
    let mut repos = Vec::new();
    for entry in fs::read_dir(cache_dir)? {
        let entry = entry?;
        if !entry.file_type()?.is_dir() {
            continue;
        }
        let name = entry.file_name();
        let Some(name) = name.to_str() else {
            continue;
        };
        match parse_repo_dir(name) {
            Some((kind, repo_id)) => repos.push(CachedRepo {
                repo_id,
                kind,
                path: entry.path(),
            }),
            None => debug!(entry = %name, "Skipping unrecognised cache entry"),
        }
    }
    Ok(repos)
}

/// Frees on-disk artifacts of a model once it has been benchmarked.
///
/// Never fails: errors are logged and the count of removed repositories is
/// returned.
pub trait CacheReclaim: Send + Sync {
    fn reclaim(&self, model: &ModelDescriptor) -> usize;
}

/// [`CacheReclaim`] over a hub-layout cache directory.
#[derive(Debug, Clone)]
pub struct CacheReclaimer {
    cache_dir: PathBuf,
}

impl CacheReclaimer {
    pub fn new(cache_dir: impl Into<PathBuf>) -> Self {
        Self {
            cache_dir: cache_dir.into(),
        }
    }

    pub fn cache_dir(&self) -> &Path {
        &self.cache_dir
    }
}

impl CacheReclaim for CacheReclaimer {
    fn reclaim(&self, model: &ModelDescriptor) -> usize {
        info!(model = %model, cache = %self.cache_dir.display(), "Reclaiming model cache");

        let repos = match scan_cache_dir(&self.cache_dir) {
            Ok(repos) => repos,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                info!(model = %model, "No model cache present, nothing to remove");
                return 0;
            }
            Err(e) => {
                warn!(model = %model, error = %e, "Non-fatal error scanning model cache");
                return 0;
            }
        };

        let mut removed = 0;
        for repo in repos.iter().filter(|r| r.repo_id == model.as_str()) {
            match fs::remove_dir_all(&repo.path) {
                Ok(()) => {
                    debug!(path = %repo.path.display(), "Removed cached repository");
                    removed += 1;
                }
                Err(e) => warn!(
                    model = %model,
                    path = %repo.path.display(),
                    error = %e,
                    "Non-fatal error removing cached repository"
                ),
            }
        }

        if removed > 0 {
            info!(model = %model, removed, "Cache removed");
        } else {
            info!(model = %model, "Nothing in cache to remove");
        }
        removed
    }
}
