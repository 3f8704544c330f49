//! Store configuration.
//!
//! # Responsibility
//! - Resolve the well-known on-disk location of a store file.
//! - Carry tunables for connection bootstrap and timestamping.
//!
//! # Invariants
//! - The store file is always `<data_dir>/<model_name>.db`.
//! - Model names never contain path separators.

use crate::clock::{Clock, SystemClock};
use crate::db::DEFAULT_BUSY_TIMEOUT;
use std::fmt::{Debug, Formatter};
use std::path::{Path, PathBuf};
use std::rc::Rc;
use std::time::Duration;

/// Data-model identifier used when the host does not name one.
pub const DEFAULT_MODEL_NAME: &str = "Notes";
/// Extension of the store file.
pub const STORE_FILE_EXTENSION: &str = "db";

/// Per-application location of a store file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreLocation {
    pub data_dir: PathBuf,
    pub model_name: String,
}

impl StoreLocation {
    /// Builds a location, rejecting empty or path-like model names.
    pub fn new(data_dir: impl Into<PathBuf>, model_name: &str) -> Result<Self, String> {
        let trimmed = model_name.trim();
        if trimmed.is_empty() {
            return Err("model_name cannot be empty".to_string());
        }
        if trimmed.contains(['/', '\\']) || trimmed == "." || trimmed == ".." {
            return Err(format!("model_name must be a plain name, got `{trimmed}`"));
        }
        Ok(Self {
            data_dir: data_dir.into(),
            model_name: trimmed.to_string(),
        })
    }

    /// Location using `DEFAULT_MODEL_NAME`.
    pub fn in_dir(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
            model_name: DEFAULT_MODEL_NAME.to_string(),
        }
    }

    /// Full path of the store file.
    pub fn store_path(&self) -> PathBuf {
        self.data_dir
            .join(format!("{}.{STORE_FILE_EXTENSION}", self.model_name))
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }
}

/// Tunables applied when a store is opened.
#[derive(Clone)]
pub struct StoreOptions {
    /// How long a write waits on a locked database before failing.
    pub busy_timeout: Duration,
    /// Source of `created_at` / `updated_at` values.
    pub clock: Rc<dyn Clock>,
}

impl Default for StoreOptions {
    fn default() -> Self {
        Self {
            busy_timeout: DEFAULT_BUSY_TIMEOUT,
            clock: Rc::new(SystemClock),
        }
    }
}

impl StoreOptions {
    pub fn with_clock(mut self, clock: Rc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_busy_timeout(mut self, busy_timeout: Duration) -> Self {
        self.busy_timeout = busy_timeout;
        self
    }
}

impl Debug for StoreOptions {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StoreOptions")
            .field("busy_timeout", &self.busy_timeout)
            .finish_non_exhaustive()
    }
}
