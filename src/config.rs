//! Configuration record for an analysis run (spec §6 External Interfaces).
//!
//! Loading from TOML is provided for convenience and tests; the CLI front-end
//! that would normally own config discovery is out of scope for this crate.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Top-level configuration for a single analysis run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisConfig {
    pub project_root: PathBuf,

    #[serde(default)]
    pub include_patterns: Vec<String>,
    #[serde(default)]
    pub exclude_patterns: Vec<String>,

    #[serde(default = "default_max_file_size")]
    pub max_file_size: u64,

    #[serde(default)]
    pub max_concurrency: Option<usize>,

    #[serde(default = "default_true")]
    pub enable_dependency: bool,
    #[serde(default = "default_true")]
    pub enable_component_map: bool,
    #[serde(default = "default_true")]
    pub enable_performance_optimization: bool,

    #[serde(default)]
    pub error_handler: ErrorHandlerConfig,
    #[serde(default)]
    pub performance: PerformanceConfig,
}

impl AnalysisConfig {
    pub fn new(project_root: PathBuf) -> Self {
        Self {
            project_root,
            include_patterns: Vec::new(),
            exclude_patterns: Vec::new(),
            max_file_size: default_max_file_size(),
            max_concurrency: None,
            enable_dependency: true,
            enable_component_map: true,
            enable_performance_optimization: true,
            error_handler: ErrorHandlerConfig::default(),
            performance: PerformanceConfig::default(),
        }
    }

    /// Best-effort TOML load. Warns to stderr and falls back to
    /// `AnalysisConfig::new(project_root)` on any failure rather than
    /// aborting the run over a bad config file.
    pub fn load_from_path(path: &std::path::Path, project_root: PathBuf) -> Self {
        match std::fs::read_to_string(path) {
            Ok(contents) => match toml::from_str(&contents) {
                Ok(cfg) => cfg,
                Err(err) => {
                    eprintln!("[repomap][warn] failed to parse config {path:?}: {err}");
                    Self::new(project_root)
                }
            },
            Err(err) => {
                eprintln!("[repomap][warn] failed to read config {path:?}: {err}");
                Self::new(project_root)
            }
        }
    }

    /// Number of workers to spawn, honoring `max_concurrency` if set.
    pub fn worker_count(&self) -> usize {
        let available = num_cpus::get().max(1);
        match self.max_concurrency {
            Some(n) if n > 0 => n.min(available.max(n)),
            _ => available,
        }
    }
}

fn default_max_file_size() -> u64 {
    10 * 1024 * 1024
}

fn default_true() -> bool {
    true
}

/// Options for the Error Classifier (spec §4.1) and run-halting behavior.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorHandlerConfig {
    #[serde(default = "default_max_errors")]
    pub max_errors: u64,
    #[serde(default = "default_error_threshold")]
    pub error_threshold: f64,
    #[serde(default = "default_true")]
    pub enable_recovery: bool,
    #[serde(default = "default_true")]
    pub enable_partial_parse: bool,
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for ErrorHandlerConfig {
    fn default() -> Self {
        Self {
            max_errors: default_max_errors(),
            error_threshold: default_error_threshold(),
            enable_recovery: true,
            enable_partial_parse: true,
            log_level: default_log_level(),
        }
    }
}

fn default_max_errors() -> u64 {
    100
}
fn default_error_threshold() -> f64 {
    0.5
}
fn default_log_level() -> String {
    "info".to_string()
}

/// Options for the worker pool, memory monitor, and timeout manager (spec §5).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PerformanceConfig {
    #[serde(default)]
    pub max_workers: Option<usize>,
    #[serde(default = "default_worker_pool_size")]
    pub worker_pool_size: usize,
    #[serde(default = "default_memory_limit_bytes")]
    pub memory_limit_bytes: u64,
    #[serde(default = "default_memory_check_interval_secs")]
    pub memory_check_interval_secs: u64,
    #[serde(default = "default_gc_threshold")]
    pub gc_threshold: f64,
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    #[serde(default = "default_max_batches")]
    pub max_batches: usize,
    #[serde(default = "default_stream_threshold")]
    pub stream_threshold: usize,
    #[serde(default = "default_parse_timeout_secs")]
    pub parse_timeout_secs: u64,
    #[serde(default = "default_total_timeout_secs")]
    pub total_timeout_secs: u64,
    #[serde(default = "default_progress_interval_secs")]
    pub progress_interval_secs: u64,
}

impl Default for PerformanceConfig {
    fn default() -> Self {
        Self {
            max_workers: None,
            worker_pool_size: default_worker_pool_size(),
            memory_limit_bytes: default_memory_limit_bytes(),
            memory_check_interval_secs: default_memory_check_interval_secs(),
            gc_threshold: default_gc_threshold(),
            batch_size: default_batch_size(),
            max_batches: default_max_batches(),
            stream_threshold: default_stream_threshold(),
            parse_timeout_secs: default_parse_timeout_secs(),
            total_timeout_secs: default_total_timeout_secs(),
            progress_interval_secs: default_progress_interval_secs(),
        }
    }
}

fn default_worker_pool_size() -> usize {
    num_cpus::get().max(1)
}
fn default_memory_limit_bytes() -> u64 {
    1024 * 1024 * 1024
}
fn default_memory_check_interval_secs() -> u64 {
    1
}
fn default_gc_threshold() -> f64 {
    0.85
}
fn default_batch_size() -> usize {
    100
}
fn default_max_batches() -> usize {
    10
}
fn default_stream_threshold() -> usize {
    1000
}
fn default_parse_timeout_secs() -> u64 {
    30
}
fn default_total_timeout_secs() -> u64 {
    3600
}
fn default_progress_interval_secs() -> u64 {
    5
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn defaults_match_spec() {
        let cfg = AnalysisConfig::new(PathBuf::from("/tmp/proj"));
        assert_eq!(cfg.max_file_size, 10 * 1024 * 1024);
        assert_eq!(cfg.error_handler.max_errors, 100);
        assert_eq!(cfg.error_handler.error_threshold, 0.5);
        assert_eq!(cfg.performance.batch_size, 100);
        assert_eq!(cfg.performance.max_batches, 10);
        assert_eq!(cfg.performance.stream_threshold, 1000);
        assert_eq!(cfg.performance.parse_timeout_secs, 30);
        assert_eq!(cfg.performance.total_timeout_secs, 3600);
        assert_eq!(cfg.performance.progress_interval_secs, 5);
    }

    #[test]
    fn load_from_path_falls_back_on_missing_file() {
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("nope.toml");
        let cfg = AnalysisConfig::load_from_path(&missing, dir.path().to_path_buf());
        assert_eq!(cfg.project_root, dir.path());
        assert_eq!(cfg.max_file_size, default_max_file_size());
    }

    #[test]
    fn load_from_path_parses_partial_overrides() {
        let dir = TempDir::new().unwrap();
        let toml_path = dir.path().join("repomap.toml");
        std::fs::write(
            &toml_path,
            format!(
                "project_root = {:?}\nmax_file_size = 2048\n",
                dir.path().to_string_lossy()
            ),
        )
        .unwrap();
        let cfg = AnalysisConfig::load_from_path(&toml_path, dir.path().to_path_buf());
        assert_eq!(cfg.max_file_size, 2048);
        assert!(cfg.enable_dependency);
    }
}
