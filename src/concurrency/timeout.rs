//! Timeout Manager (spec §4.5): scoped cancellation handles with deadlines
//! for file and batch operations, plus duration histograms.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use parking_lot::RwLock;

/// `short | medium | long`, by completed-operation duration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DurationBucket {
    Short,
    Medium,
    Long,
}

impl DurationBucket {
    fn classify(d: Duration) -> Self {
        if d < Duration::from_secs(5) {
            DurationBucket::Short
        } else if d < Duration::from_secs(30) {
            DurationBucket::Medium
        } else {
            DurationBucket::Long
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeoutKind {
    File,
    Batch,
}

struct ActiveHandle {
    start: Instant,
    duration: Duration,
    kind: TimeoutKind,
}

/// Scoped cancellation handle for a single file or batch operation.
pub struct TimeoutHandle {
    id: String,
    deadline: Instant,
}

impl TimeoutHandle {
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn deadline(&self) -> Instant {
        self.deadline
    }

    pub fn is_expired(&self) -> bool {
        Instant::now() >= self.deadline
    }
}

/// Tracks active and completed timeout-scoped operations.
pub struct TimeoutManager {
    file_timeout: Duration,
    active: RwLock<HashMap<String, ActiveHandle>>,
    histogram: RwLock<HashMap<DurationBucket, u64>>,
    total_operations: AtomicU64,
    total_timeouts: AtomicU64,
    file_timeouts: AtomicU64,
    batch_timeouts: AtomicU64,
    total_completed_secs: RwLock<f64>,
    longest_completed: RwLock<Duration>,
    shortest_completed: RwLock<Option<Duration>>,
}

impl TimeoutManager {
    pub fn new(file_timeout: Duration) -> Self {
        Self {
            file_timeout,
            active: RwLock::new(HashMap::new()),
            histogram: RwLock::new(HashMap::new()),
            total_operations: AtomicU64::new(0),
            total_timeouts: AtomicU64::new(0),
            file_timeouts: AtomicU64::new(0),
            batch_timeouts: AtomicU64::new(0),
            total_completed_secs: RwLock::new(0.0),
            longest_completed: RwLock::new(Duration::ZERO),
            shortest_completed: RwLock::new(None),
        }
    }

    pub fn file_budget(&self) -> Duration {
        self.file_timeout
    }

    pub fn batch_budget(&self) -> Duration {
        self.file_timeout * 10
    }

    /// Create and register a file-scoped timeout handle.
    pub fn start_file(&self, path: &str, timestamp: u64) -> TimeoutHandle {
        self.start(
            format!("file_{path}_{timestamp}"),
            self.file_budget(),
            TimeoutKind::File,
        )
    }

    /// Create and register a batch-scoped timeout handle (10x file budget).
    pub fn start_batch(&self, batch_id: &str, timestamp: u64) -> TimeoutHandle {
        self.start(
            format!("batch_{batch_id}_{timestamp}"),
            self.batch_budget(),
            TimeoutKind::Batch,
        )
    }

    fn start(&self, id: String, duration: Duration, kind: TimeoutKind) -> TimeoutHandle {
        self.total_operations.fetch_add(1, Ordering::Relaxed);
        let start = Instant::now();
        self.active.write().insert(
            id.clone(),
            ActiveHandle {
                start,
                duration,
                kind,
            },
        );
        TimeoutHandle {
            id,
            deadline: start + duration,
        }
    }

    /// Mark an operation complete: records its duration in the histogram and
    /// removes it from the active map. Call whether it succeeded or expired.
    pub fn complete(&self, handle: &TimeoutHandle) {
        let removed = self.active.write().remove(&handle.id);
        let Some(active) = removed else { return };
        let elapsed = active.start.elapsed();

        if handle.is_expired() {
            self.total_timeouts.fetch_add(1, Ordering::Relaxed);
            match active.kind {
                TimeoutKind::File => {
                    self.file_timeouts.fetch_add(1, Ordering::Relaxed);
                }
                TimeoutKind::Batch => {
                    self.batch_timeouts.fetch_add(1, Ordering::Relaxed);
                }
            }
        }

        let rounded = elapsed.max(Duration::from_secs(1));
        *self.histogram.write().entry(DurationBucket::classify(rounded)).or_insert(0) += 1;

        *self.total_completed_secs.write() += rounded.as_secs_f64();
        let mut longest = self.longest_completed.write();
        if rounded > *longest {
            *longest = rounded;
        }
        let mut shortest = self.shortest_completed.write();
        *shortest = Some(shortest.map_or(rounded, |s| s.min(rounded)));
    }

    pub fn active_count(&self) -> usize {
        self.active.read().len()
    }

    pub fn longest_active(&self) -> Option<Duration> {
        self.active
            .read()
            .values()
            .map(|h| h.start.elapsed())
            .max()
    }

    pub fn total_operations(&self) -> u64 {
        self.total_operations.load(Ordering::Relaxed)
    }

    pub fn total_timeouts(&self) -> u64 {
        self.total_timeouts.load(Ordering::Relaxed)
    }

    /// `is_healthy()` — spec §4.5: true iff timeout rate < 10%.
    pub fn is_healthy(&self) -> bool {
        let total = self.total_operations.load(Ordering::Relaxed);
        if total == 0 {
            return true;
        }
        (self.total_timeouts.load(Ordering::Relaxed) as f64 / total as f64) < 0.10
    }

    /// Clears all active handles. Subsequent `start_*` calls still succeed.
    pub fn stop(&self) {
        self.active.write().clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn batch_budget_is_ten_times_file_budget() {
        let mgr = TimeoutManager::new(Duration::from_secs(30));
        assert_eq!(mgr.batch_budget(), Duration::from_secs(300));
    }

    #[test]
    fn complete_drains_active_handle() {
        let mgr = TimeoutManager::new(Duration::from_secs(30));
        let handle = mgr.start_file("a.js", 1);
        assert_eq!(mgr.active_count(), 1);
        mgr.complete(&handle);
        assert_eq!(mgr.active_count(), 0);
    }

    #[test]
    fn is_healthy_below_ten_percent_timeout_rate() {
        let mgr = TimeoutManager::new(Duration::from_millis(1));
        for i in 0..9 {
            let h = mgr.start_file("ok.js", i);
            mgr.complete(&h);
        }
        let h = mgr.start_file("slow.js", 99);
        std::thread::sleep(Duration::from_millis(5));
        mgr.complete(&h);
        assert!(mgr.is_healthy());
    }

    #[test]
    fn stop_clears_active_but_allows_new_starts() {
        let mgr = TimeoutManager::new(Duration::from_secs(30));
        let _handle = mgr.start_file("a.js", 1);
        mgr.stop();
        assert_eq!(mgr.active_count(), 0);
        let _second = mgr.start_file("b.js", 2);
        assert_eq!(mgr.active_count(), 1);
    }
}
