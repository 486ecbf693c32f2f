//! Repository Analyzer (spec §4.6): discovery, dispatch strategy selection,
//! the per-file worker contract, aggregation, and progress reporting.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::mpsc::{sync_channel, Receiver};
use std::sync::Arc;
use std::time::{Duration, Instant};

use dashmap::DashMap;
use globset::{Glob, GlobSet, GlobSetBuilder};
use parking_lot::Mutex;

use crate::component;
use crate::concurrency::memory::MemoryMonitor;
use crate::concurrency::pool::{dispatch_batched, dispatch_streaming, CancelToken};
use crate::concurrency::timeout::TimeoutManager;
use crate::config::AnalysisConfig;
use crate::dependency::DependencyTracker;
use crate::error::{AnalyzeError, AnalyzeResult};
use crate::model::{AnalysisReport, Language, ParseResult, ProgressUpdate, Summary};
use crate::parser::errors::ErrorClassifier;
use crate::parser::parse_file;

const EXCLUDED_DIRS: &[&str] = &[
    "node_modules",
    ".git",
    ".vscode",
    "dist",
    "build",
    "coverage",
    ".nyc_output",
];
const EXCLUDED_FILE_SUFFIXES: &[&str] = &[".min.js", ".bundle.js"];
const ALLOWED_EXTENSIONS: &[&str] = &["js", "jsx", "ts", "tsx"];
const HARD_SIZE_CAP_BYTES: u64 = 50 * 1024 * 1024;

/// Orchestrates discovery, dispatch, and aggregation over a project root.
pub struct RepositoryAnalyzer {
    config: AnalysisConfig,
}

impl RepositoryAnalyzer {
    pub fn new(config: AnalysisConfig) -> Self {
        Self { config }
    }

    pub fn analyze(&self) -> AnalyzeResult<AnalysisReport> {
        let root = &self.config.project_root;
        if !root.is_dir() {
            return Err(AnalyzeError::InvalidRoot { path: root.clone() });
        }

        let excludes = build_globset(&self.config.exclude_patterns)
            .map_err(|e| AnalyzeError::Config(e.to_string()))?;
        let includes = if self.config.include_patterns.is_empty() {
            None
        } else {
            Some(build_globset(&self.config.include_patterns).map_err(|e| AnalyzeError::Config(e.to_string()))?)
        };

        let results: Arc<DashMap<String, ParseResult>> = Arc::new(DashMap::new());
        let classifier = Arc::new(ErrorClassifier::new(
            self.config.error_handler.max_errors,
            self.config.error_handler.error_threshold,
            self.config.error_handler.enable_recovery,
        ));

        let files = discover(
            root,
            &excludes,
            includes.as_ref(),
            self.config.max_file_size,
            &classifier,
        );
        let timeout_manager = Arc::new(TimeoutManager::new(Duration::from_secs(
            self.config.performance.parse_timeout_secs,
        )));
        let memory_monitor = MemoryMonitor::start(
            self.config.performance.memory_limit_bytes,
            self.config.performance.gc_threshold,
            Duration::from_secs(self.config.performance.memory_check_interval_secs.max(1)),
        );

        let progress = ProgressReporter::start(
            files.len(),
            Duration::from_secs(self.config.performance.progress_interval_secs.max(1)),
            Arc::clone(&memory_monitor),
        );

        let worker_count = self.config.worker_count();
        let cancel = CancelToken::new();
        let enable_partial_parse = self.config.error_handler.enable_partial_parse;
        let file_timeout_secs = self.config.performance.parse_timeout_secs;

        let root_for_workers = root.clone();
        let work_results = Arc::clone(&results);
        let work_classifier = Arc::clone(&classifier);
        let work_timeouts = Arc::clone(&timeout_manager);
        let work_monitor = Arc::clone(&memory_monitor);
        let work_progress = progress.clone();

        let worker = move |path: PathBuf| {
            if work_monitor.is_under_pressure() {
                std::thread::sleep(Duration::from_millis(10));
            }

            let rel = path
                .strip_prefix(&root_for_workers)
                .unwrap_or(&path)
                .to_string_lossy()
                .replace('\\', "/");

            let Ok(contents) = std::fs::read(&path) else {
                work_classifier.observe_failure();
                work_progress.record_failure();
                return;
            };
            if contents.len() as u64 > HARD_SIZE_CAP_BYTES {
                work_classifier.observe_failure();
                work_progress.record_failure();
                return;
            }

            let Some(language) = path
                .extension()
                .and_then(|e| e.to_str())
                .and_then(Language::from_extension)
            else {
                work_classifier.observe_failure();
                work_progress.record_failure();
                return;
            };

            let mut grammar = match crate::grammar::for_language(language) {
                Ok(g) => g,
                Err(_) => {
                    work_classifier.observe_failure();
                    work_progress.record_failure();
                    return;
                }
            };

            let handle = work_timeouts.start_file(&rel, monotonic_timestamp());
            let deadline = Instant::now() + Duration::from_secs(file_timeout_secs.max(1));
            let result = parse_file(
                grammar.as_mut(),
                &work_classifier,
                Path::new(&rel),
                &contents,
                language,
                deadline,
                enable_partial_parse,
            );
            work_timeouts.complete(&handle);

            work_results.insert(rel, result);
            work_progress.record_processed();
        };

        if self.config.enable_performance_optimization
            && files.len() > self.config.performance.stream_threshold
        {
            dispatch_streaming(files, worker_count, worker_count * 4, cancel, worker);
        } else {
            dispatch_batched(
                files,
                self.config.performance.batch_size,
                self.config.performance.max_batches,
                worker_count,
                cancel,
                worker,
            );
        }

        progress.stop();
        memory_monitor.stop();
        timeout_manager.stop();
        let error_summary = classifier.summary();

        let results_map: std::collections::HashMap<String, ParseResult> =
            Arc::try_unwrap(results)
                .map(|m| m.into_iter().collect())
                .unwrap_or_else(|arc| arc.iter().map(|e| (e.key().clone(), e.value().clone())).collect());

        let mut tracker = DependencyTracker::new();
        let mut graph = None;
        if self.config.enable_dependency {
            for result in results_map.values() {
                tracker.ingest(result);
            }
            let keys: HashSet<String> = results_map.keys().cloned().collect();
            tracker.resolve(&keys);
            graph = Some(tracker.build_graph(&results_map));
        }

        let components = if self.config.enable_component_map {
            Some(component::build_components(&results_map))
        } else {
            None
        };

        let summary = build_summary(&results_map);

        Ok(AnalysisReport {
            project_path: root.display().to_string(),
            results: results_map,
            graph,
            components,
            external_packages: tracker.external_packages,
            summary,
            error_summary,
        })
    }
}

fn monotonic_timestamp() -> u64 {
    static COUNTER: AtomicU64 = AtomicU64::new(0);
    COUNTER.fetch_add(1, Ordering::Relaxed)
}

fn build_globset(patterns: &[String]) -> Result<GlobSet, globset::Error> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        builder.add(Glob::new(pattern)?);
    }
    for dir in EXCLUDED_DIRS {
        builder.add(Glob::new(&format!("**/{dir}/**")).unwrap());
    }
    builder.build()
}

/// Walk `root`, skipping excluded directories/files, accepting allowed
/// extensions within `max_file_size` (spec §4.6 Discovery). An oversized
/// file is left out of the returned list, but still produces a `ParseError`
/// of kind `Io` through `classifier` (spec §8 boundary scenario 7) rather
/// than vanishing without a trace.
fn discover(
    root: &Path,
    excludes: &GlobSet,
    includes: Option<&GlobSet>,
    max_file_size: u64,
    classifier: &ErrorClassifier,
) -> Vec<PathBuf> {
    let mut out = Vec::new();
    walk(root, root, excludes, includes, max_file_size, classifier, &mut out);
    out.sort();
    out
}

fn walk(
    root: &Path,
    dir: &Path,
    excludes: &GlobSet,
    includes: Option<&GlobSet>,
    max_file_size: u64,
    classifier: &ErrorClassifier,
    out: &mut Vec<PathBuf>,
) {
    let Ok(entries) = std::fs::read_dir(dir) else {
        return;
    };
    for entry in entries.flatten() {
        let path = entry.path();
        let rel = path.strip_prefix(root).unwrap_or(&path);

        if path.is_dir() {
            if EXCLUDED_DIRS.iter().any(|d| path.file_name().map(|n| n == *d).unwrap_or(false)) {
                continue;
            }
            if excludes.is_match(rel) {
                continue;
            }
            walk(root, &path, excludes, includes, max_file_size, classifier, out);
            continue;
        }

        let Some(ext) = path.extension().and_then(|e| e.to_str()) else {
            continue;
        };
        if !ALLOWED_EXTENSIONS.contains(&ext) {
            continue;
        }
        let name = path.file_name().and_then(|n| n.to_str()).unwrap_or("");
        if EXCLUDED_FILE_SUFFIXES.iter().any(|s| name.ends_with(s)) {
            continue;
        }
        if excludes.is_match(rel) {
            continue;
        }
        if let Some(includes) = includes {
            if !includes.is_match(rel) {
                continue;
            }
        }
        if let Ok(meta) = std::fs::metadata(&path) {
            if meta.len() > max_file_size {
                classifier.classify(
                    &format!("file size {} exceeds max_file_size {max_file_size}", meta.len()),
                    &path,
                    &[],
                );
                classifier.observe_failure();
                continue;
            }
        }
        out.push(path);
    }
}

fn build_summary(results: &std::collections::HashMap<String, ParseResult>) -> Summary {
    let mut summary = Summary {
        file_count: results.len(),
        ..Default::default()
    };
    for result in results.values() {
        summary.total_functions += result.functions.len();
        summary.total_classes += result.classes.len();
        summary.total_interfaces += result.interfaces.len();
        summary.total_variables += result.variables.len();
        let lang = format!("{:?}", result.language).to_lowercase();
        *summary.language_histogram.entry(lang).or_insert(0) += 1;
    }
    summary
}

/// Fire-and-forget progress reporting (spec §4.6 Progress, §9 "drops on
/// backpressure"): a background thread samples shared atomics on an
/// interval and tries to send a `ProgressUpdate`, dropping it if the
/// channel is full rather than blocking a worker.
#[derive(Clone)]
pub struct ProgressReporter {
    processed: Arc<AtomicUsize>,
    failed: Arc<AtomicUsize>,
    total: usize,
    stop: Arc<std::sync::atomic::AtomicBool>,
    updates: Arc<Mutex<Receiver<ProgressUpdate>>>,
}

impl ProgressReporter {
    fn start(total: usize, interval: Duration, memory_monitor: Arc<MemoryMonitor>) -> Self {
        let processed = Arc::new(AtomicUsize::new(0));
        let failed = Arc::new(AtomicUsize::new(0));
        let stop = Arc::new(std::sync::atomic::AtomicBool::new(false));

        let (tx, rx) = sync_channel::<ProgressUpdate>(1);

        let reporter = Self {
            processed: Arc::clone(&processed),
            failed: Arc::clone(&failed),
            total,
            stop: Arc::clone(&stop),
            updates: Arc::new(Mutex::new(rx)),
        };

        let thread_processed = processed;
        let thread_failed = failed;
        let thread_stop = stop;
        let started_at = Instant::now();
        std::thread::spawn(move || {
            while !thread_stop.load(Ordering::Relaxed) {
                std::thread::sleep(interval);
                let processed = thread_processed.load(Ordering::Relaxed);
                let failed = thread_failed.load(Ordering::Relaxed);
                let elapsed = started_at.elapsed().as_secs_f64().max(0.001);
                let throughput = processed as f64 / elapsed;
                let remaining = total.saturating_sub(processed);
                let update = ProgressUpdate {
                    processed,
                    failed,
                    total,
                    current_batch: None,
                    memory_bytes: memory_monitor.current_bytes(),
                    throughput_files_per_sec: throughput,
                    estimated_remaining_secs: if throughput > 0.0 {
                        remaining as f64 / throughput
                    } else {
                        0.0
                    },
                };
                let _ = tx.try_send(update); // drop on backpressure
            }
        });

        reporter
    }

    fn record_processed(&self) {
        self.processed.fetch_add(1, Ordering::Relaxed);
    }

    fn record_failure(&self) {
        self.failed.fetch_add(1, Ordering::Relaxed);
        self.processed.fetch_add(1, Ordering::Relaxed);
    }

    fn stop(&self) {
        self.stop.store(true, Ordering::Relaxed);
    }

    /// Drain the next buffered update, if any. The external caller that owns
    /// a `RepositoryAnalyzer` run polls this; nothing in this crate consumes
    /// it, since rendering progress is the CLI front-end's job.
    pub fn try_recv(&self) -> Option<ProgressUpdate> {
        self.updates.lock().try_recv().ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;

    fn write_file(dir: &Path, rel: &str, contents: &str) {
        let path = dir.join(rel);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        let mut f = std::fs::File::create(path).unwrap();
        f.write_all(contents.as_bytes()).unwrap();
    }

    #[test]
    fn discovery_applies_exclusion_filters() {
        let dir = TempDir::new().unwrap();
        write_file(dir.path(), "src/main.js", "export const x = 1;");
        write_file(dir.path(), "src/utils.ts", "export const y = 1;");
        write_file(dir.path(), "node_modules/react/index.js", "module.exports = {};");
        write_file(dir.path(), "dist/bundle.js", "");
        write_file(dir.path(), "x.min.js", "");
        write_file(dir.path(), ".git/config", "");

        let excludes = build_globset(&[]).unwrap();
        let classifier = ErrorClassifier::new(100, 0.5, true);
        let files = discover(dir.path(), &excludes, None, 10 * 1024 * 1024, &classifier);
        let rels: Vec<String> = files
            .iter()
            .map(|p| p.strip_prefix(dir.path()).unwrap().to_string_lossy().replace('\\', "/"))
            .collect();

        assert_eq!(rels.len(), 2, "got {rels:?}");
        assert!(rels.contains(&"src/main.js".to_string()));
        assert!(rels.contains(&"src/utils.ts".to_string()));
    }

    #[test]
    fn oversized_file_is_skipped_at_discovery() {
        let dir = TempDir::new().unwrap();
        write_file(dir.path(), "big.js", &"x".repeat(1024));
        let excludes = build_globset(&[]).unwrap();
        let classifier = ErrorClassifier::new(100, 0.5, true);
        let files = discover(dir.path(), &excludes, None, 512, &classifier);
        assert!(files.is_empty());

        let summary = classifier.summary();
        assert_eq!(summary.kind_counts.get(&crate::model::ParseErrorKind::Io), Some(&1));
    }

    #[test]
    fn end_to_end_analysis_produces_graph_and_summary() {
        let dir = TempDir::new().unwrap();
        write_file(
            dir.path(),
            "src/main.js",
            "import { helper } from './utils/helper';\nfunction main() { helper(); }\n",
        );
        write_file(dir.path(), "src/utils/helper.js", "export function helper() {}\n");

        let mut config = AnalysisConfig::new(dir.path().to_path_buf());
        config.performance.progress_interval_secs = 1;
        let analyzer = RepositoryAnalyzer::new(config);
        let report = analyzer.analyze().expect("analysis succeeds");

        assert_eq!(report.summary.file_count, 2);
        let graph = report.graph.expect("dependency graph enabled");
        assert!(graph.edges.iter().any(|e| e.weight >= 1));
    }
}
