//! # repomap
//!
//! Static analysis engine for JavaScript/TypeScript repositories: a resilient
//! incremental parser, a concurrent repository analyzer with a bounded
//! worker pool, and a dependency resolver that builds a weighted module
//! graph and an architectural component map.
//!
//! Output serialization, config discovery, and diagram/doc generation are
//! left to external collaborators; this crate's public surface is the single
//! [`analyze`] entry point plus the data model it produces.
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use repomap::config::AnalysisConfig;
//! use std::path::PathBuf;
//!
//! let config = AnalysisConfig::new(PathBuf::from("."));
//! let report = repomap::analyze(config).unwrap();
//! println!("{} files analyzed", report.summary.file_count);
//! ```

pub mod analyzer;
pub mod component;
pub mod concurrency;
pub mod config;
pub mod dependency;
pub mod error;
pub mod grammar;
pub mod model;
pub mod parser;

use analyzer::RepositoryAnalyzer;
use config::AnalysisConfig;
use error::AnalyzeResult;
use model::AnalysisReport;

/// Run a full analysis over `config.project_root`: discover source files,
/// parse them with tree-sitter (falling back to partial regex extraction),
/// resolve the dependency graph, and roll files up into components.
pub fn analyze(config: AnalysisConfig) -> AnalyzeResult<AnalysisReport> {
    RepositoryAnalyzer::new(config).analyze()
}
