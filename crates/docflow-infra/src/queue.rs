//! Serial request queue
//!
//! The automation engine behind the gateway cannot absorb bursts: webhook
//! executions that start too close together contend for the same workflow
//! state. The queue spaces dispatches by a fixed delay and caps how many
//! requests are in flight at once, while letting urgent work jump ahead via
//! priorities.

use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot, Semaphore};

type Job = Box<dyn FnOnce() -> Pin<Box<dyn Future<Output = ()> + Send>> + Send>;

/// Queue tuning knobs.
#[derive(Debug, Clone, Copy)]
pub struct QueueConfig {
    /// Minimum spacing between consecutive dispatches.
    pub dispatch_delay: Duration,
    /// Maximum number of jobs in flight at once.
    pub max_concurrent: usize,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            dispatch_delay: Duration::from_millis(docflow_core::config::QUEUE_DISPATCH_DELAY_MS),
            max_concurrent: docflow_core::config::QUEUE_MAX_CONCURRENT,
        }
    }
}

struct QueuedJob {
    priority: i32,
    seq: u64,
    job: Job,
}

impl PartialEq for QueuedJob {
    fn eq(&self, other: &Self) -> bool {
        self.priority == other.priority && self.seq == other.seq
    }
}

impl Eq for QueuedJob {}

impl PartialOrd for QueuedJob {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for QueuedJob {
    // Max-heap: higher priority wins; equal priorities dispatch in
    // enqueue order (lower seq first).
    fn cmp(&self, other: &Self) -> Ordering {
        self.priority
            .cmp(&other.priority)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

/// Priority queue that dispatches async jobs with a fixed inter-dispatch
/// delay and a concurrency cap.
///
/// Constructed once at startup; cheap to clone. Dropping every clone stops
/// the dispatcher after it drains the jobs already accepted.
#[derive(Clone)]
pub struct SerialRequestQueue {
    tx: mpsc::UnboundedSender<QueuedJob>,
    seq: Arc<AtomicU64>,
}

impl SerialRequestQueue {
    pub fn new(config: QueueConfig) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        tokio::spawn(dispatcher_loop(rx, config));
        Self {
            tx,
            seq: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Enqueue a job. Higher priority dispatches first; jobs of equal
    /// priority run in enqueue order. The returned receiver yields the
    /// job's output, or an error if the queue shut down before running it.
    pub fn enqueue<T, F, Fut>(&self, priority: i32, f: F) -> oneshot::Receiver<T>
    where
        T: Send + 'static,
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = T> + Send + 'static,
    {
        let (result_tx, result_rx) = oneshot::channel();
        let job: Job = Box::new(move || {
            Box::pin(async move {
                let output = f().await;
                // Receiver may have been dropped; the job still ran.
                let _ = result_tx.send(output);
            })
        });

        let queued = QueuedJob {
            priority,
            seq: self.seq.fetch_add(1, AtomicOrdering::Relaxed),
            job,
        };
        if self.tx.send(queued).is_err() {
            tracing::warn!(priority, "Queue dispatcher is gone; job dropped");
        }
        result_rx
    }
}

async fn dispatcher_loop(mut rx: mpsc::UnboundedReceiver<QueuedJob>, config: QueueConfig) {
    let semaphore = Arc::new(Semaphore::new(config.max_concurrent.max(1)));
    let mut heap: BinaryHeap<QueuedJob> = BinaryHeap::new();

    tracing::debug!(
        dispatch_delay_ms = config.dispatch_delay.as_millis() as u64,
        max_concurrent = config.max_concurrent,
        "Serial request queue started"
    );

    loop {
        // Pull everything that arrived since the last dispatch so priorities
        // compete before the next pop.
        while let Ok(job) = rx.try_recv() {
            heap.push(job);
        }

        let Some(next) = heap.pop() else {
            match rx.recv().await {
                Some(job) => {
                    heap.push(job);
                    continue;
                }
                // All senders dropped and nothing left to run.
                None => break,
            }
        };

        let permit = match semaphore.clone().acquire_owned().await {
            Ok(permit) => permit,
            Err(_) => break,
        };

        tracing::trace!(priority = next.priority, seq = next.seq, "Dispatching queued job");
        tokio::spawn(async move {
            (next.job)().await;
            drop(permit);
        });

        tokio::time::sleep(config.dispatch_delay).await;
    }

    tracing::debug!("Serial request queue stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    fn test_queue(delay_ms: u64, max_concurrent: usize) -> SerialRequestQueue {
        SerialRequestQueue::new(QueueConfig {
            dispatch_delay: Duration::from_millis(delay_ms),
            max_concurrent,
        })
    }

    #[tokio::test(start_paused = true)]
    async fn test_delivers_job_output() {
        let queue = test_queue(10, 1);
        let rx = queue.enqueue(0, || async { 41 + 1 });
        assert_eq!(rx.await.unwrap(), 42);
    }

    #[tokio::test(start_paused = true)]
    async fn test_higher_priority_dispatches_first() {
        let queue = test_queue(10, 1);
        let order = Arc::new(Mutex::new(Vec::new()));

        // All three are enqueued before the dispatcher task first runs, so
        // they compete in one heap.
        let mut receivers = Vec::new();
        for (priority, label) in [(0, "low"), (10, "high"), (5, "mid")] {
            let order = order.clone();
            receivers.push(queue.enqueue(priority, move || async move {
                order.lock().unwrap().push(label);
            }));
        }
        for rx in receivers {
            rx.await.unwrap();
        }

        assert_eq!(*order.lock().unwrap(), vec!["high", "mid", "low"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_equal_priority_is_fifo() {
        let queue = test_queue(10, 1);
        let order = Arc::new(Mutex::new(Vec::new()));

        let mut receivers = Vec::new();
        for label in ["first", "second", "third"] {
            let order = order.clone();
            receivers.push(queue.enqueue(0, move || async move {
                order.lock().unwrap().push(label);
            }));
        }
        for rx in receivers {
            rx.await.unwrap();
        }

        assert_eq!(*order.lock().unwrap(), vec!["first", "second", "third"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_dispatches_are_spaced_by_delay() {
        let queue = test_queue(1_000, 4);
        let stamps = Arc::new(Mutex::new(Vec::new()));

        let mut receivers = Vec::new();
        for _ in 0..3 {
            let stamps = stamps.clone();
            receivers.push(queue.enqueue(0, move || async move {
                stamps.lock().unwrap().push(tokio::time::Instant::now());
            }));
        }
        for rx in receivers {
            rx.await.unwrap();
        }

        let stamps = stamps.lock().unwrap();
        assert_eq!(stamps.len(), 3);
        for pair in stamps.windows(2) {
            assert!(pair[1] - pair[0] >= Duration::from_millis(1_000));
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrency_cap_holds_back_dispatch() {
        // One slot and a slow job: the second job cannot start until the
        // first releases its permit even though the delay already elapsed.
        let queue = test_queue(10, 1);
        let running = Arc::new(Mutex::new(0usize));
        let max_seen = Arc::new(Mutex::new(0usize));

        let mut receivers = Vec::new();
        for _ in 0..3 {
            let running = running.clone();
            let max_seen = max_seen.clone();
            receivers.push(queue.enqueue(0, move || async move {
                {
                    let mut r = running.lock().unwrap();
                    *r += 1;
                    let mut m = max_seen.lock().unwrap();
                    *m = (*m).max(*r);
                }
                tokio::time::sleep(Duration::from_millis(500)).await;
                *running.lock().unwrap() -= 1;
            }));
        }
        for rx in receivers {
            rx.await.unwrap();
        }

        assert_eq!(*max_seen.lock().unwrap(), 1);
    }
}
