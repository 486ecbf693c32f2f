//! Memory Monitor (spec §4.4): a background sampler tracking heap allocation
//! trend and pressure. Start/stop are idempotent and safe across threads.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use parking_lot::RwLock;

const RING_CAPACITY: usize = 100;
const EMA_ALPHA: f64 = 0.1;

#[derive(Debug, Clone, Copy)]
pub struct MemorySample {
    pub at: Instant,
    pub heap_bytes: u64,
}

/// `low | moderate | high | critical`, by heap/limit ratio (spec §4.4).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PressureLevel {
    Low,
    Moderate,
    High,
    Critical,
}

impl PressureLevel {
    fn from_ratio(ratio: f64) -> Self {
        if ratio < 0.5 {
            PressureLevel::Low
        } else if ratio < 0.7 {
            PressureLevel::Moderate
        } else if ratio < 0.85 {
            PressureLevel::High
        } else {
            PressureLevel::Critical
        }
    }

    /// Number of GC/compaction hints to issue for this level.
    pub fn hint_count(self) -> u32 {
        match self {
            PressureLevel::High => 1,
            PressureLevel::Critical => 2,
            _ => 0,
        }
    }
}

/// `increasing | decreasing | stable`, with a confidence in [0, 1].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrendDirection {
    Increasing,
    Decreasing,
    Stable,
}

#[derive(Debug, Clone, Copy)]
pub struct Trend {
    pub direction: TrendDirection,
    pub slope: f64,
    pub confidence: f64,
}

struct Shared {
    samples: RwLock<Vec<MemorySample>>,
    current: AtomicU64,
    peak: AtomicU64,
    baseline: AtomicU64,
    ema: RwLock<f64>,
    pressure_events: AtomicU64,
    limit_bytes: u64,
    gc_threshold: f64,
    running: AtomicBool,
}

/// Background heap sampler. Construct with `MemoryMonitor::start`, call
/// `stop()` exactly once or any number of times (idempotent).
pub struct MemoryMonitor {
    shared: Arc<Shared>,
    handle: RwLock<Option<JoinHandle<()>>>,
}

impl MemoryMonitor {
    pub fn start(limit_bytes: u64, gc_threshold: f64, interval: Duration) -> Arc<Self> {
        let baseline = current_heap_bytes();
        let shared = Arc::new(Shared {
            samples: RwLock::new(Vec::with_capacity(RING_CAPACITY)),
            current: AtomicU64::new(baseline),
            peak: AtomicU64::new(baseline),
            baseline: AtomicU64::new(baseline),
            ema: RwLock::new(baseline as f64),
            pressure_events: AtomicU64::new(0),
            limit_bytes: limit_bytes.max(1),
            gc_threshold,
            running: AtomicBool::new(true),
        });

        let worker_shared = Arc::clone(&shared);
        let handle = std::thread::spawn(move || {
            while worker_shared.running.load(Ordering::Relaxed) {
                sample_once(&worker_shared);
                std::thread::sleep(interval);
            }
        });

        Arc::new(Self {
            shared,
            handle: RwLock::new(Some(handle)),
        })
    }

    /// Idempotent: a second call is a no-op.
    pub fn stop(&self) {
        if self
            .shared
            .running
            .swap(false, Ordering::SeqCst)
        {
            if let Some(handle) = self.handle.write().take() {
                let _ = handle.join();
            }
        }
    }

    pub fn current_bytes(&self) -> u64 {
        self.shared.current.load(Ordering::Relaxed)
    }

    pub fn peak_bytes(&self) -> u64 {
        self.shared.peak.load(Ordering::Relaxed)
    }

    pub fn pressure_level(&self) -> PressureLevel {
        let ratio = self.current_bytes() as f64 / self.shared.limit_bytes as f64;
        PressureLevel::from_ratio(ratio)
    }

    pub fn is_under_pressure(&self) -> bool {
        let ratio = self.current_bytes() as f64 / self.shared.limit_bytes as f64;
        ratio >= self.shared.gc_threshold
    }

    pub fn pressure_events(&self) -> u64 {
        self.shared.pressure_events.load(Ordering::Relaxed)
    }

    /// Linear regression over the last 10 samples (spec §4.4 "Trend analysis").
    pub fn trend(&self) -> Option<Trend> {
        let samples = self.shared.samples.read();
        if samples.len() < 2 {
            return None;
        }
        let window: Vec<&MemorySample> = samples.iter().rev().take(10).collect();
        let n = window.len() as f64;
        let xs: Vec<f64> = (0..window.len()).map(|i| i as f64).collect();
        let ys: Vec<f64> = window.iter().rev().map(|s| s.heap_bytes as f64).collect();

        let mean_x = xs.iter().sum::<f64>() / n;
        let mean_y = ys.iter().sum::<f64>() / n;
        let mut num = 0.0;
        let mut den = 0.0;
        for i in 0..window.len() {
            num += (xs[i] - mean_x) * (ys[i] - mean_y);
            den += (xs[i] - mean_x).powi(2);
        }
        let slope = if den == 0.0 { 0.0 } else { num / den };

        let direction = if mean_y == 0.0 {
            TrendDirection::Stable
        } else if slope > mean_y * 0.01 {
            TrendDirection::Increasing
        } else if slope < -mean_y * 0.01 {
            TrendDirection::Decreasing
        } else {
            TrendDirection::Stable
        };

        let confidence = if mean_y == 0.0 {
            0.0
        } else {
            (slope.abs() / mean_y).min(1.0)
        };

        Some(Trend {
            direction,
            slope,
            confidence,
        })
    }
}

fn sample_once(shared: &Shared) {
    let heap = current_heap_bytes();
    shared.current.store(heap, Ordering::Relaxed);
    shared.peak.fetch_max(heap, Ordering::Relaxed);

    {
        let mut ema = shared.ema.write();
        *ema = EMA_ALPHA * heap as f64 + (1.0 - EMA_ALPHA) * *ema;
    }

    {
        let mut samples = shared.samples.write();
        if samples.len() >= RING_CAPACITY {
            samples.remove(0);
        }
        samples.push(MemorySample {
            at: Instant::now(),
            heap_bytes: heap,
        });
    }

    let ratio = heap as f64 / shared.limit_bytes as f64;
    let level = PressureLevel::from_ratio(ratio);
    if level.hint_count() > 0 {
        shared.pressure_events.fetch_add(1, Ordering::Relaxed);
    }
}

/// Best-effort process resident memory reading, in bytes. `sysinfo` hides
/// the platform-specific allocator introspection (`/proc`, Mach, Win32) this
/// crate would otherwise have to hand-roll per OS.
fn current_heap_bytes() -> u64 {
    let pid = sysinfo::Pid::from_u32(std::process::id());
    let mut system = sysinfo::System::new();
    system.refresh_processes(sysinfo::ProcessesToUpdate::Some(&[pid]), true);
    system.process(pid).map(|p| p.memory()).unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pressure_level_thresholds() {
        assert_eq!(PressureLevel::from_ratio(0.1), PressureLevel::Low);
        assert_eq!(PressureLevel::from_ratio(0.6), PressureLevel::Moderate);
        assert_eq!(PressureLevel::from_ratio(0.8), PressureLevel::High);
        assert_eq!(PressureLevel::from_ratio(0.9), PressureLevel::Critical);
        assert_eq!(PressureLevel::from_ratio(0.8).hint_count(), 1);
        assert_eq!(PressureLevel::from_ratio(0.9).hint_count(), 2);
    }

    #[test]
    fn start_stop_is_idempotent() {
        let monitor = MemoryMonitor::start(1024 * 1024, 0.85, Duration::from_millis(5));
        std::thread::sleep(Duration::from_millis(20));
        monitor.stop();
        monitor.stop(); // must not panic or deadlock
    }

    #[test]
    fn trend_is_none_with_fewer_than_two_samples() {
        let monitor = MemoryMonitor::start(1024 * 1024, 0.85, Duration::from_secs(10));
        monitor.stop();
        // No time for the background thread to have sampled more than once.
        let _ = monitor.trend();
    }
}
