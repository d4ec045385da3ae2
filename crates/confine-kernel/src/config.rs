//! Engine configuration.
//!
//! An [`FsConfig`] is built once and threaded into [`crate::ConfinedFs`]; no
//! component reads ambient global state. Configuration files are TOML with
//! every field optional:
//!
//! ```toml
//! read_max_bytes = 65536
//! workers = 4
//! lock_timeout_ms = 3000
//! ```

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Hard ceiling for the worker pool, whatever the configuration says.
pub const WORKER_CEILING: usize = 64;

/// Tunables for every operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FsConfig {
    /// Default `read` window.
    pub read_max_bytes: u64,
    /// Default `peek` window.
    pub peek_max_bytes: u64,
    pub list_max_entries: usize,
    pub glob_max_results: usize,
    pub search_max_results: usize,

    /// Files above this size get no content hash.
    pub hash_max_bytes: u64,
    /// Bytes sampled for MIME detection.
    pub sniff_max_bytes: u64,
    /// Largest payload a write may produce.
    pub max_file_size: u64,

    /// Scan worker count; 0 picks the available parallelism.
    pub workers: usize,
    /// Cap applied to auto-detected parallelism.
    pub max_workers: usize,
    /// Capacity of the traversal -> worker queue.
    pub queue_capacity: usize,

    pub lock_timeout_ms: u64,
    /// Sentinels older than this are treated as abandoned.
    pub stale_lock_age_ms: u64,
    pub lock_backoff_initial_ms: u64,
    pub lock_backoff_max_ms: u64,

    /// Search skips files larger than this.
    pub search_skip_file_size: u64,
    /// Search abandons a file after this many lines (likely binary).
    pub search_max_lines: usize,
    /// Matching lines longer than this are truncated in results.
    pub search_line_display_max: usize,

    /// `create_dirs` value for writes that leave it unset.
    pub create_dirs_default: bool,
}

impl Default for FsConfig {
    fn default() -> Self {
        Self {
            read_max_bytes: 64 * 1024,
            peek_max_bytes: 4 * 1024,
            list_max_entries: 1000,
            glob_max_results: 1000,
            search_max_results: 100,
            hash_max_bytes: 32 << 20,
            sniff_max_bytes: 1 << 20,
            max_file_size: 1 << 30,
            workers: 0,
            max_workers: 8,
            queue_capacity: 64,
            lock_timeout_ms: 3_000,
            stale_lock_age_ms: 5 * 60 * 1000,
            lock_backoff_initial_ms: 10,
            lock_backoff_max_ms: 500,
            search_skip_file_size: 100 << 20,
            search_max_lines: 1_000_000,
            search_line_display_max: 500,
            create_dirs_default: false,
        }
    }
}

/// Errors loading or validating configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },

    #[error("config parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

impl FsConfig {
    /// Parse a TOML document and validate it.
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        let config: FsConfig = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    /// Check that the values make sense together.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_workers == 0 || self.max_workers > WORKER_CEILING {
            return Err(ConfigError::Invalid(format!(
                "max_workers must be between 1 and {WORKER_CEILING}"
            )));
        }
        if self.workers > self.max_workers {
            return Err(ConfigError::Invalid(format!(
                "workers ({}) exceeds max_workers ({})",
                self.workers, self.max_workers
            )));
        }
        if self.max_file_size < 1024 {
            return Err(ConfigError::Invalid(
                "max_file_size must be at least 1 KiB".into(),
            ));
        }
        if self.lock_timeout_ms == 0 {
            return Err(ConfigError::Invalid("lock_timeout_ms must be positive".into()));
        }
        if self.queue_capacity == 0 {
            return Err(ConfigError::Invalid("queue_capacity must be positive".into()));
        }
        if self.lock_backoff_initial_ms == 0 || self.lock_backoff_max_ms < self.lock_backoff_initial_ms
        {
            return Err(ConfigError::Invalid(
                "lock backoff must be positive and max >= initial".into(),
            ));
        }
        Ok(())
    }

    /// Worker count for scans.
    pub fn effective_workers(&self) -> usize {
        if self.workers > 0 {
            return self.workers.min(WORKER_CEILING);
        }
        std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1)
            .min(self.max_workers)
            .max(1)
    }

    pub fn lock_timeout(&self) -> Duration {
        Duration::from_millis(self.lock_timeout_ms)
    }

    pub fn stale_lock_age(&self) -> Duration {
        Duration::from_millis(self.stale_lock_age_ms)
    }

    /// Builder-style override of the lock timeout.
    pub fn with_lock_timeout(mut self, timeout: Duration) -> Self {
        self.lock_timeout_ms = timeout.as_millis() as u64;
        self
    }

    /// Builder-style override of the worker count.
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = FsConfig::default();
        config.validate().unwrap();
        assert_eq!(config.read_max_bytes, 65536);
        assert_eq!(config.search_max_results, 100);
        assert_eq!(config.hash_max_bytes, 32 * 1024 * 1024);
        assert!(!config.create_dirs_default);
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = FsConfig::from_toml_str("workers = 2\nlock_timeout_ms = 750\n").unwrap();
        assert_eq!(config.workers, 2);
        assert_eq!(config.lock_timeout(), Duration::from_millis(750));
        assert_eq!(config.peek_max_bytes, 4096);
        assert_eq!(config.effective_workers(), 2);
    }

    #[test]
    fn test_invalid_values_rejected() {
        assert!(FsConfig::from_toml_str("max_workers = 0").is_err());
        assert!(FsConfig::from_toml_str("workers = 9\nmax_workers = 8").is_err());
        assert!(FsConfig::from_toml_str("max_file_size = 10").is_err());
        assert!(FsConfig::from_toml_str("lock_timeout_ms = 0").is_err());
        assert!(matches!(
            FsConfig::from_toml_str("workers = \"many\""),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn test_auto_workers_capped() {
        let config = FsConfig {
            max_workers: 1,
            ..FsConfig::default()
        };
        assert_eq!(config.effective_workers(), 1);
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("confine.toml");
        std::fs::write(&path, "search_max_results = 7\n").unwrap();
        let config = FsConfig::load(&path).unwrap();
        assert_eq!(config.search_max_results, 7);

        let missing = FsConfig::load(dir.path().join("nope.toml"));
        assert!(matches!(missing, Err(ConfigError::Read { .. })));
    }
}
