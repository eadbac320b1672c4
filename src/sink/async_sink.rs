//! Bounded-queue async wrapper around a downstream `Sink`.
//!
//! The worker is a plain `std::thread::JoinHandle` draining a shared
//! bounded deque on a background thread, extended here with batching, an
//! overflow strategy and metrics. The queue itself is a
//! `parking_lot::Mutex` + `Condvar` pair rather than a channel:
//! `DropOldest` needs the producer to evict the queue's own head to make
//! room for an incoming event, which a channel's `Receiver` (owned
//! exclusively by the worker thread) can't support, while a shared deque
//! lets both sides reach the same storage under one lock.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicI64, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};

use crate::errors::{LogCoreError, Result};
use crate::event::LogEvent;
use crate::selflog;

use super::Sink;

/// What to do when the bounded queue is full at enqueue time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverflowStrategy {
    /// Wait for a slot to free (or the queue to close) before returning.
    Block,
    /// Discard the new event and count it as dropped.
    Drop,
    /// Evict the oldest already-queued event to make room for the new
    /// one, so the caller never blocks and the freshest events survive.
    DropOldest,
}

#[derive(Default)]
pub struct AsyncSinkMetrics {
    processed: AtomicU64,
    dropped: AtomicU64,
    errors: AtomicU64,
    buffer_size: AtomicI64,
}

impl AsyncSinkMetrics {
    pub fn processed(&self) -> u64 {
        self.processed.load(Ordering::Relaxed)
    }
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }
    pub fn errors(&self) -> u64 {
        self.errors.load(Ordering::Relaxed)
    }
    pub fn buffer_size(&self) -> i64 {
        self.buffer_size.load(Ordering::Relaxed)
    }
}

pub struct AsyncSinkConfig {
    pub buffer_size: usize,
    pub batch_size: usize,
    pub flush_interval: Duration,
    pub overflow_strategy: OverflowStrategy,
    pub shutdown_timeout: Duration,
}

impl Default for AsyncSinkConfig {
    fn default() -> AsyncSinkConfig {
        AsyncSinkConfig {
            buffer_size: 1024,
            batch_size: 64,
            flush_interval: Duration::from_millis(100),
            overflow_strategy: OverflowStrategy::Block,
            shutdown_timeout: Duration::from_secs(5),
        }
    }
}

/// The shared bounded deque: the only thing producer and worker both
/// touch. `not_empty` wakes the worker when an event arrives (or the
/// queue closes); `not_full` wakes a `Block`-strategy producer once the
/// worker has made room.
struct Queue {
    events: Mutex<VecDeque<LogEvent>>,
    not_empty: Condvar,
    not_full: Condvar,
    capacity: usize,
    closed: AtomicBool,
}

impl Queue {
    fn new(capacity: usize) -> Queue {
        Queue {
            events: Mutex::new(VecDeque::with_capacity(capacity)),
            not_empty: Condvar::new(),
            not_full: Condvar::new(),
            capacity,
            closed: AtomicBool::new(false),
        }
    }

    fn close(&self) {
        self.closed.store(true, Ordering::Release);
        self.not_empty.notify_all();
        self.not_full.notify_all();
    }

    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }
}

pub struct AsyncSink {
    queue: Arc<Queue>,
    worker: Mutex<Option<JoinHandle<()>>>,
    metrics: Arc<AsyncSinkMetrics>,
    shutdown_timeout: Duration,
}

impl AsyncSink {
    pub fn new(downstream: Arc<dyn Sink>, config: AsyncSinkConfig) -> AsyncSink {
        Self::with_error_hook(downstream, config, |_err| {})
    }

    pub fn with_error_hook(
        downstream: Arc<dyn Sink>,
        config: AsyncSinkConfig,
        on_error: impl Fn(&str) + Send + Sync + 'static,
    ) -> AsyncSink {
        let queue = Arc::new(Queue::new(config.buffer_size.max(1)));
        let metrics = Arc::new(AsyncSinkMetrics::default());
        let worker_metrics = metrics.clone();
        let worker_queue = queue.clone();
        let batch_size = config.batch_size.max(1);
        let flush_interval = config.flush_interval;

        let handle = thread::spawn(move || {
            let mut batch: VecDeque<LogEvent> = VecDeque::with_capacity(batch_size);
            let mut batch_started_at = Instant::now();

            loop {
                let popped = {
                    let mut guard = worker_queue.events.lock();
                    if guard.is_empty() && !worker_queue.is_closed() {
                        worker_queue.not_empty.wait_for(&mut guard, flush_interval);
                    }
                    let popped = guard.pop_front();
                    drop(guard);
                    popped
                };

                match popped {
                    Some(event) => {
                        worker_queue.not_full.notify_one();
                        worker_metrics.buffer_size.fetch_sub(1, Ordering::Relaxed);
                        if batch.is_empty() {
                            batch_started_at = Instant::now();
                        }
                        batch.push_back(event);
                        if batch.len() >= batch_size {
                            flush_batch(&downstream, &mut batch, &worker_metrics, &on_error);
                        }
                    }
                    None => {
                        if !batch.is_empty() && batch_started_at.elapsed() >= flush_interval {
                            flush_batch(&downstream, &mut batch, &worker_metrics, &on_error);
                        }
                        if worker_queue.is_closed() && worker_queue.events.lock().is_empty() {
                            break;
                        }
                    }
                }
            }
            if !batch.is_empty() {
                flush_batch(&downstream, &mut batch, &worker_metrics, &on_error);
            }
            let _ = downstream.close();
        });

        AsyncSink {
            queue,
            worker: Mutex::new(Some(handle)),
            metrics,
            shutdown_timeout: config.shutdown_timeout,
        }
    }

    pub fn metrics(&self) -> &AsyncSinkMetrics {
        &self.metrics
    }

    pub fn buffer_capacity(&self) -> usize {
        self.queue.capacity
    }

    fn enqueue(&self, event: LogEvent, strategy: OverflowStrategy) {
        if self.queue.is_closed() {
            self.metrics.dropped.fetch_add(1, Ordering::Relaxed);
            selflog::emit("async_sink", "enqueue after close: event dropped");
            return;
        }

        match strategy {
            OverflowStrategy::Block => {
                let mut guard = self.queue.events.lock();
                while guard.len() >= self.queue.capacity && !self.queue.is_closed() {
                    self.queue.not_full.wait(&mut guard);
                }
                if self.queue.is_closed() {
                    drop(guard);
                    self.metrics.dropped.fetch_add(1, Ordering::Relaxed);
                    selflog::emit("async_sink", "queue closed while a caller was blocked on enqueue");
                    return;
                }
                guard.push_back(event);
                drop(guard);
                self.metrics.buffer_size.fetch_add(1, Ordering::Relaxed);
                self.queue.not_empty.notify_one();
            }
            OverflowStrategy::Drop => {
                let mut guard = self.queue.events.lock();
                if guard.len() >= self.queue.capacity {
                    drop(guard);
                    self.metrics.dropped.fetch_add(1, Ordering::Relaxed);
                    return;
                }
                guard.push_back(event);
                drop(guard);
                self.metrics.buffer_size.fetch_add(1, Ordering::Relaxed);
                self.queue.not_empty.notify_one();
            }
            OverflowStrategy::DropOldest => {
                let mut guard = self.queue.events.lock();
                if guard.len() >= self.queue.capacity {
                    guard.pop_front();
                    self.metrics.dropped.fetch_add(1, Ordering::Relaxed);
                    self.metrics.buffer_size.fetch_sub(1, Ordering::Relaxed);
                }
                guard.push_back(event);
                drop(guard);
                self.metrics.buffer_size.fetch_add(1, Ordering::Relaxed);
                self.queue.not_empty.notify_one();
            }
        }
    }
}

fn flush_batch(
    downstream: &Arc<dyn Sink>,
    batch: &mut VecDeque<LogEvent>,
    metrics: &Arc<AsyncSinkMetrics>,
    on_error: &(impl Fn(&str) + Send + Sync),
) {
    let events: Vec<LogEvent> = batch.drain(..).collect();
    let outcome = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
        for event in &events {
            downstream.emit(event);
        }
    }));
    match outcome {
        Ok(()) => {
            metrics.processed.fetch_add(events.len() as u64, Ordering::Relaxed);
        }
        Err(_) => {
            metrics.errors.fetch_add(1, Ordering::Relaxed);
            let message = "downstream sink panicked while emitting a batch";
            on_error(message);
            selflog::emit("async_sink", message);
        }
    }
}

impl Sink for AsyncSink {
    fn emit(&self, event: &LogEvent) {
        self.enqueue(event.clone(), OverflowStrategy::Block);
    }

    fn close(&self) -> Result<()> {
        let handle = self.worker.lock().take();
        self.queue.close();
        if let Some(handle) = handle {
            let start = Instant::now();
            while !handle.is_finished() && start.elapsed() < self.shutdown_timeout {
                thread::sleep(Duration::from_millis(5));
            }
            if handle.is_finished() {
                let _ = handle.join();
                Ok(())
            } else {
                Err(LogCoreError::Sink(
                    "async sink worker did not exit within shutdown_timeout".to_string(),
                ))
            }
        } else {
            Ok(())
        }
    }
}

/// A variant of `emit` that honours a non-`Block` overflow strategy. Kept
/// separate from the `Sink` trait (whose `emit` signature carries no
/// strategy parameter) for callers that configure `Drop`/`DropOldest`.
pub struct AsyncSinkHandle<'a> {
    sink: &'a AsyncSink,
    strategy: OverflowStrategy,
}

impl AsyncSink {
    pub fn with_strategy(&self, strategy: OverflowStrategy) -> AsyncSinkHandle<'_> {
        AsyncSinkHandle {
            sink: self,
            strategy,
        }
    }
}

impl AsyncSinkHandle<'_> {
    pub fn emit(&self, event: LogEvent) {
        self.sink.enqueue(event, self.strategy);
    }
}
