//! Store configuration.

use std::path::PathBuf;

/// Environment variable naming the task file.
pub const TASKS_FILE_ENV: &str = "TASKS_FILE";

/// Directory under the home directory holding the default task file.
const DEFAULT_DIR: &str = ".taskdeps";

/// Default task file name.
const DEFAULT_FILE: &str = "tasks.txt";

/// Default number of snapshots buffered per change-stream subscriber.
const DEFAULT_HISTORY_CAPACITY: usize = 64;

/// Configuration for a store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreConfig {
    /// File the store is loaded from and flushed to
    pub path: PathBuf,

    /// Snapshots buffered for a subscriber before it starts skipping
    pub history_capacity: usize,
}

impl StoreConfig {
    /// Create config for the given file with default settings.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            history_capacity: DEFAULT_HISTORY_CAPACITY,
        }
    }

    /// Config for the file named by `TASKS_FILE`, or the default file.
    pub fn from_env() -> Self {
        let path = std::env::var_os(TASKS_FILE_ENV)
            .filter(|value| !value.is_empty())
            .map(PathBuf::from)
            .unwrap_or_else(default_path);
        Self::new(path)
    }

    /// Set how many snapshots a subscriber may fall behind.
    pub fn history_capacity(mut self, capacity: usize) -> Self {
        self.history_capacity = capacity;
        self
    }
}

/// `~/.taskdeps/tasks.txt`, or relative to the working directory if there is
/// no home directory.
pub fn default_path() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(DEFAULT_DIR)
        .join(DEFAULT_FILE)
}
