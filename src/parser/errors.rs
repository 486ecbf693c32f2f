//! Error Classifier (spec §4.1): turns an arbitrary failure into a typed
//! `ParseError`, drives recovery attempts, and governs whether the run
//! should keep going.

use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;

use crate::model::{ErrorSummary, OverallStatus, ParseError, ParseErrorKind, Severity};

fn overall_status_from_ratio(ratio: f64) -> OverallStatus {
    if ratio <= 0.0 {
        OverallStatus::Success
    } else if ratio <= 0.10 {
        OverallStatus::Warning
    } else if ratio <= 0.50 {
        OverallStatus::Error
    } else {
        OverallStatus::Critical
    }
}

/// Classifies raw failures into `ParseError`s and tracks per-run rates.
pub struct ErrorClassifier {
    max_errors: u64,
    error_threshold: f64,
    enable_recovery: bool,

    files_observed: AtomicU64,
    files_succeeded: AtomicU64,
    files_failed: AtomicU64,
    files_partial: AtomicU64,
    total_errors: AtomicU64,
    recovery_attempts: AtomicU64,
    recovery_successes: AtomicU64,
    kind_counts: Mutex<HashMap<ParseErrorKind, u64>>,
}

impl ErrorClassifier {
    pub fn new(max_errors: u64, error_threshold: f64, enable_recovery: bool) -> Self {
        Self {
            max_errors,
            error_threshold,
            enable_recovery,
            files_observed: AtomicU64::new(0),
            files_succeeded: AtomicU64::new(0),
            files_failed: AtomicU64::new(0),
            files_partial: AtomicU64::new(0),
            total_errors: AtomicU64::new(0),
            recovery_attempts: AtomicU64::new(0),
            recovery_successes: AtomicU64::new(0),
            kind_counts: Mutex::new(HashMap::new()),
        }
    }

    /// Classify a raw error message against a file, returning a populated
    /// `ParseError` with kind, recoverability, and initial suggestions set.
    pub fn classify(&self, message: &str, path: &Path, contents: &[u8]) -> ParseError {
        let lower = message.to_lowercase();
        let kind = if lower.contains("out of memory") || lower.contains("memory") {
            ParseErrorKind::Memory
        } else if lower.contains("timeout") {
            ParseErrorKind::Timeout
        } else if lower.contains("no such file")
            || lower.contains("permission")
            || lower.contains("exceeds max_file_size")
            || lower.contains("file size")
        {
            ParseErrorKind::Io
        } else if lower.contains("encoding") || lower.contains("utf") {
            ParseErrorKind::Encoding
        } else if lower.contains("syntax") {
            ParseErrorKind::Syntax
        } else {
            ParseErrorKind::Unknown
        };

        let recoverable = matches!(kind, ParseErrorKind::Syntax | ParseErrorKind::Encoding);

        let mut error = ParseError::new(kind, Severity::Error, message.to_string());
        error.file_path = Some(path.display().to_string());
        error.recoverable = recoverable;
        error.suggestions = initial_suggestions(kind);
        error
            .metadata
            .insert("extension".to_string(), extension_of(path));
        error
            .metadata
            .insert("file_size".to_string(), contents.len().to_string());

        if kind == ParseErrorKind::Syntax {
            if let Some((line, col, context)) = find_unbalanced(contents) {
                error.line = Some(line);
                error.column = Some(col);
                error.snippet = Some(context);
            }
        }

        if recoverable && self.enable_recovery {
            self.attempt_recovery(&mut error, contents);
        }

        self.record(&error);
        error
    }

    fn attempt_recovery(&self, error: &mut ParseError, contents: &[u8]) {
        self.recovery_attempts.fetch_add(1, Ordering::Relaxed);
        match error.kind {
            ParseErrorKind::Syntax => {
                let (open_braces, open_parens) = count_unbalanced(contents);
                if open_braces > 0 {
                    error
                        .suggestions
                        .push(format!("add {open_braces} closing braces"));
                    self.recovery_successes.fetch_add(1, Ordering::Relaxed);
                }
                if open_parens > 0 {
                    error
                        .suggestions
                        .push(format!("add {open_parens} closing parentheses"));
                    self.recovery_successes.fetch_add(1, Ordering::Relaxed);
                }
            }
            ParseErrorKind::Encoding => {
                if std::str::from_utf8(contents).is_err() {
                    error
                        .suggestions
                        .push("convert file to valid UTF-8".to_string());
                    self.recovery_successes.fetch_add(1, Ordering::Relaxed);
                }
            }
            _ => {}
        }
    }

    fn record(&self, error: &ParseError) {
        self.total_errors.fetch_add(1, Ordering::Relaxed);
        *self.kind_counts.lock().entry(error.kind).or_insert(0) += 1;
    }

    pub fn observe_success(&self) {
        self.files_observed.fetch_add(1, Ordering::Relaxed);
        self.files_succeeded.fetch_add(1, Ordering::Relaxed);
    }

    pub fn observe_partial(&self) {
        self.files_observed.fetch_add(1, Ordering::Relaxed);
        self.files_partial.fetch_add(1, Ordering::Relaxed);
    }

    pub fn observe_failure(&self) {
        self.files_observed.fetch_add(1, Ordering::Relaxed);
        self.files_failed.fetch_add(1, Ordering::Relaxed);
    }

    /// `should_continue()` — spec §4.1: false once total errors ≥ MaxErrors
    /// or failed/total > ErrorThreshold. Monotone true→false within a run.
    pub fn should_continue(&self) -> bool {
        let total_errors = self.total_errors.load(Ordering::Relaxed);
        if total_errors >= self.max_errors {
            return false;
        }
        let observed = self.files_observed.load(Ordering::Relaxed);
        if observed == 0 {
            return true;
        }
        let failed = self.files_failed.load(Ordering::Relaxed);
        (failed as f64 / observed as f64) <= self.error_threshold
    }

    pub fn overall_status(&self) -> OverallStatus {
        let observed = self.files_observed.load(Ordering::Relaxed);
        if observed == 0 {
            return OverallStatus::Success;
        }
        let failed = self.files_failed.load(Ordering::Relaxed);
        overall_status_from_ratio(failed as f64 / observed as f64)
    }

    pub fn kind_counts(&self) -> HashMap<ParseErrorKind, u64> {
        self.kind_counts.lock().clone()
    }

    pub fn recovery_rate(&self) -> f64 {
        let attempts = self.recovery_attempts.load(Ordering::Relaxed);
        if attempts == 0 {
            return 0.0;
        }
        self.recovery_successes.load(Ordering::Relaxed) as f64 / attempts as f64
    }

    /// Rolls per-kind counts, recovery rate, and overall status into the
    /// report-facing summary (spec §7: "per-kind counts, recovery rate,
    /// overall status label, and an aggregated recommendation list").
    pub fn summary(&self) -> ErrorSummary {
        let kind_counts = self.kind_counts();
        let recovery_rate = self.recovery_rate();
        let overall_status = self.overall_status();
        let recommendations = build_recommendations(&kind_counts, recovery_rate, overall_status);
        ErrorSummary {
            kind_counts,
            recovery_rate,
            overall_status,
            recommendations,
        }
    }
}

fn build_recommendations(
    kind_counts: &HashMap<ParseErrorKind, u64>,
    recovery_rate: f64,
    overall_status: OverallStatus,
) -> Vec<String> {
    let mut out = Vec::new();

    if let Some(&syntax) = kind_counts.get(&ParseErrorKind::Syntax) {
        if syntax > 0 {
            out.push(format!(
                "{syntax} file(s) had syntax errors; run a formatter/linter before analysis"
            ));
        }
    }
    if let Some(&timeout) = kind_counts.get(&ParseErrorKind::Timeout) {
        if timeout > 0 {
            out.push(format!(
                "{timeout} file(s) hit the parse timeout; consider raising parse_timeout_secs"
            ));
        }
    }
    if let Some(&memory) = kind_counts.get(&ParseErrorKind::Memory) {
        if memory > 0 {
            out.push(format!(
                "{memory} file(s) failed under memory pressure; raise memory_limit_bytes or lower worker_pool_size"
            ));
        }
    }
    if let Some(&io) = kind_counts.get(&ParseErrorKind::Io) {
        if io > 0 {
            out.push(format!("{io} file(s) could not be read; check permissions and paths"));
        }
    }
    if let Some(&encoding) = kind_counts.get(&ParseErrorKind::Encoding) {
        if encoding > 0 {
            out.push(format!("{encoding} file(s) were not valid UTF-8; re-encode before analysis"));
        }
    }

    if matches!(overall_status, OverallStatus::Error | OverallStatus::Critical) {
        out.push(format!(
            "overall status is {overall_status:?}; recovery succeeded for {:.0}% of recoverable errors",
            recovery_rate * 100.0
        ));
    }

    out
}

fn initial_suggestions(kind: ParseErrorKind) -> Vec<String> {
    match kind {
        ParseErrorKind::Syntax => vec!["check for unbalanced brackets or braces".to_string()],
        ParseErrorKind::Timeout => vec!["file may be too large or deeply nested".to_string()],
        ParseErrorKind::Memory => vec!["reduce file size or increase memory limit".to_string()],
        ParseErrorKind::Io => vec!["verify the file exists and is readable".to_string()],
        ParseErrorKind::Encoding => vec!["ensure the file is valid UTF-8".to_string()],
        ParseErrorKind::Unknown => Vec::new(),
    }
}

fn extension_of(path: &Path) -> String {
    path.extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_string()
}

/// Scans balancing `()`, `[]`, `{}` and returns the first unmatched closer's
/// (line, column, two-line context). If every closer matches but openers
/// remain on the stack at EOF, falls back to the earliest unclosed opener
/// instead of returning None (spec §4.1: unclosed-opener-only inputs still
/// get a positioned error).
fn find_unbalanced(contents: &[u8]) -> Option<(u32, u32, String)> {
    let text = String::from_utf8_lossy(contents);
    let mut stack: Vec<(char, u32, u32)> = Vec::new();
    let mut line = 1u32;
    let mut col = 1u32;
    let lines: Vec<&str> = text.lines().collect();

    for ch in text.chars() {
        match ch {
            '(' | '[' | '{' => stack.push((ch, line, col)),
            ')' | ']' | '}' => {
                let expected = matching_open(ch);
                match stack.pop() {
                    Some((open, _, _)) if open == expected => {}
                    _ => {
                        let context = context_lines(&lines, line);
                        return Some((line, col, context));
                    }
                }
            }
            _ => {}
        }
        if ch == '\n' {
            line += 1;
            col = 1;
        } else {
            col += 1;
        }
    }

    stack.first().map(|(_, open_line, open_col)| {
        let context = context_lines(&lines, *open_line);
        (*open_line, *open_col, context)
    })
}

fn matching_open(close: char) -> char {
    match close {
        ')' => '(',
        ']' => '[',
        '}' => '{',
        _ => unreachable!(),
    }
}

fn context_lines(lines: &[&str], line: u32) -> String {
    let idx = line.saturating_sub(1) as usize;
    let start = idx.saturating_sub(1);
    lines[start..=idx.min(lines.len().saturating_sub(1))].join("\n")
}

/// Counts unmatched opening `{` and `(` across the whole file (spec §4.1
/// recovery attempt: "count unbalanced `{` and `(`").
fn count_unbalanced(contents: &[u8]) -> (u32, u32) {
    let text = String::from_utf8_lossy(contents);
    let mut braces = 0i64;
    let mut parens = 0i64;
    for ch in text.chars() {
        match ch {
            '{' => braces += 1,
            '}' => braces -= 1,
            '(' => parens += 1,
            ')' => parens -= 1,
            _ => {}
        }
    }
    (braces.max(0) as u32, parens.max(0) as u32)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    #[test]
    fn classifies_syntax_errors_as_recoverable() {
        let classifier = ErrorClassifier::new(100, 0.5, true);
        let err = classifier.classify("Unexpected syntax token", Path::new("a.js"), b"function f() {");
        assert_eq!(err.kind, ParseErrorKind::Syntax);
        assert!(err.recoverable);
        assert!(err.suggestions.iter().any(|s| s.contains("closing brace")));
    }

    #[test]
    fn classifies_io_errors_as_unrecoverable() {
        let classifier = ErrorClassifier::new(100, 0.5, true);
        let err = classifier.classify("no such file or directory", Path::new("a.js"), b"");
        assert_eq!(err.kind, ParseErrorKind::Io);
        assert!(!err.recoverable);
    }

    #[test]
    fn should_continue_halts_after_max_errors() {
        let classifier = ErrorClassifier::new(2, 0.99, false);
        classifier.classify("syntax error one", Path::new("a.js"), b"");
        assert!(classifier.should_continue());
        classifier.classify("syntax error two", Path::new("b.js"), b"");
        assert!(!classifier.should_continue());
    }

    #[test]
    fn should_continue_halts_past_error_threshold() {
        let classifier = ErrorClassifier::new(1000, 0.5, false);
        classifier.observe_success();
        classifier.observe_failure();
        classifier.observe_failure();
        assert!(!classifier.should_continue());
    }

    #[test]
    fn overall_status_thresholds() {
        let classifier = ErrorClassifier::new(1000, 1.0, false);
        for _ in 0..10 {
            classifier.observe_success();
        }
        assert_eq!(classifier.overall_status(), OverallStatus::Success);
    }
}
