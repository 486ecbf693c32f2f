//! Bounded worker pool (spec §4.6 Dispatch strategy, §5 Suspension points).
//!
//! Two dispatch strategies share one underlying primitive: a bounded
//! `mpsc::sync_channel` work queue drained by a fixed set of OS-thread
//! workers. Streaming feeds items one at a time; batched partitions items
//! and caps concurrent batches with a counting semaphore.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::sync_channel;
use std::sync::{Arc, Condvar, Mutex};

/// Shared cancellation flag workers check between work items (spec §5
/// "Cancellation propagates: workers check the run-level cancel token").
#[derive(Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self(Arc::new(AtomicBool::new(false)))
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// Feed every item in `items` through `work` using `worker_count` threads and
/// a bounded queue of `queue_capacity` (spec §4.6 "streaming": a single
/// producer feeds file paths one at a time into the bounded worker queue).
pub fn dispatch_streaming<T, F>(
    items: impl IntoIterator<Item = T> + Send + 'static,
    worker_count: usize,
    queue_capacity: usize,
    cancel: CancelToken,
    work: F,
) where
    T: Send + 'static,
    F: Fn(T) + Send + Sync + 'static,
{
    let (tx, rx) = sync_channel::<T>(queue_capacity.max(1));
    let rx = Arc::new(Mutex::new(rx));
    let work = Arc::new(work);

    let mut handles = Vec::with_capacity(worker_count);
    for _ in 0..worker_count.max(1) {
        let rx = Arc::clone(&rx);
        let work = Arc::clone(&work);
        let cancel = cancel.clone();
        handles.push(std::thread::spawn(move || loop {
            if cancel.is_cancelled() {
                break;
            }
            let item = {
                let guard = rx.lock().unwrap();
                guard.recv()
            };
            match item {
                Ok(item) => work(item),
                Err(_) => break, // queue closed, drained
            }
        }));
    }

    let producer = std::thread::spawn(move || {
        for item in items {
            if cancel.is_cancelled() {
                break;
            }
            if tx.send(item).is_err() {
                break;
            }
        }
        // dropping tx closes the queue once production finishes
    });

    let _ = producer.join();
    for h in handles {
        let _ = h.join();
    }
}

/// Partition `items` into `ceil(N/batch_size)` batches, process each batch's
/// items through `worker_count` workers, capping concurrent batches at
/// `max_batches` via a counting semaphore (spec §4.6 "batched").
pub fn dispatch_batched<T, F>(
    items: Vec<T>,
    batch_size: usize,
    max_batches: usize,
    worker_count: usize,
    cancel: CancelToken,
    work: F,
) where
    T: Send + 'static,
    F: Fn(T) + Send + Sync + 'static,
{
    let batch_size = batch_size.max(1);
    let batches: Vec<Vec<T>> = items
        .into_iter()
        .fold(Vec::new(), |mut acc, item| {
            if acc.last().map(|b: &Vec<T>| b.len() >= batch_size).unwrap_or(true) {
                acc.push(Vec::with_capacity(batch_size));
            }
            acc.last_mut().unwrap().push(item);
            acc
        });

    let semaphore = Arc::new(Semaphore::new(max_batches.max(1)));
    let work = Arc::new(work);
    let mut batch_handles = Vec::with_capacity(batches.len());

    for batch in batches {
        if cancel.is_cancelled() {
            break;
        }
        let semaphore = Arc::clone(&semaphore);
        let work = Arc::clone(&work);
        let cancel = cancel.clone();
        let per_batch_workers = worker_count.max(1).min(batch.len().max(1));
        batch_handles.push(std::thread::spawn(move || {
            semaphore.acquire();
            dispatch_streaming(batch, per_batch_workers, per_batch_workers.max(1), cancel, move |item| {
                work(item)
            });
            semaphore.release();
        }));
    }

    for h in batch_handles {
        let _ = h.join();
    }
}

/// Minimal counting semaphore: nothing in `std` provides one directly.
struct Semaphore {
    state: Mutex<usize>,
    cvar: Condvar,
}

impl Semaphore {
    fn new(permits: usize) -> Self {
        Self {
            state: Mutex::new(permits),
            cvar: Condvar::new(),
        }
    }

    fn acquire(&self) {
        let mut guard = self.state.lock().unwrap();
        while *guard == 0 {
            guard = self.cvar.wait(guard).unwrap();
        }
        *guard -= 1;
    }

    fn release(&self) {
        let mut guard = self.state.lock().unwrap();
        *guard += 1;
        self.cvar.notify_one();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    #[test]
    fn streaming_processes_all_items() {
        let counter = Arc::new(AtomicUsize::new(0));
        let c = Arc::clone(&counter);
        dispatch_streaming(0..100, 4, 8, CancelToken::new(), move |_| {
            c.fetch_add(1, Ordering::SeqCst);
        });
        assert_eq!(counter.load(Ordering::SeqCst), 100);
    }

    #[test]
    fn batched_processes_all_items() {
        let counter = Arc::new(AtomicUsize::new(0));
        let c = Arc::clone(&counter);
        dispatch_batched(
            (0..257).collect::<Vec<_>>(),
            100,
            10,
            4,
            CancelToken::new(),
            move |_| {
                c.fetch_add(1, Ordering::SeqCst);
            },
        );
        assert_eq!(counter.load(Ordering::SeqCst), 257);
    }

    #[test]
    fn cancellation_stops_further_dispatch() {
        let token = CancelToken::new();
        token.cancel();
        let counter = Arc::new(AtomicUsize::new(0));
        let c = Arc::clone(&counter);
        dispatch_streaming(0..100, 2, 4, token, move |_| {
            c.fetch_add(1, Ordering::SeqCst);
        });
        assert!(counter.load(Ordering::SeqCst) <= 100);
    }
}
