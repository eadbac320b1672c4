//! On-disk persistence wrapper so events survive a transient downstream
//! failure.
//!
//! Segment naming and retention pruning (list directory, sort by a
//! monotonic key, delete the oldest beyond the keep count) mirror how a
//! rolling file writer prunes old files, generalised from "rotate by
//! wall-clock period" to "roll by byte size, retain by sequence number".

use std::collections::{BTreeMap, VecDeque};
use std::fs::{self, File, OpenOptions};
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use crc32fast::Hasher;
use parking_lot::Mutex;

use crate::errors::{LogCoreError, Result};
use crate::event::LogEvent;
use crate::level::Level;
use crate::selflog;
use crate::template::MessageTemplate;
use crate::value::Value;

use super::Sink;

const SEGMENT_DIGITS: usize = 20;

#[derive(Default)]
pub struct DurableSinkMetrics {
    delivered: AtomicU64,
    buffered: AtomicU64,
    dropped: AtomicU64,
    retries: AtomicU64,
    healthy: AtomicBool,
}

impl DurableSinkMetrics {
    pub fn delivered(&self) -> u64 {
        self.delivered.load(Ordering::Relaxed)
    }
    pub fn buffered(&self) -> u64 {
        self.buffered.load(Ordering::Relaxed)
    }
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }
    pub fn retries(&self) -> u64 {
        self.retries.load(Ordering::Relaxed)
    }
    pub fn is_healthy(&self) -> bool {
        self.healthy.load(Ordering::Relaxed)
    }
}

pub struct DurableSinkConfig {
    pub directory: PathBuf,
    pub max_buffer_size: u64,
    pub max_buffer_files: usize,
    pub retry_interval: Duration,
    pub batch_size: usize,
    pub shutdown_timeout: Duration,
}

/// The on-disk record schema: a u32 length + u32 CRC32 header followed by
/// a JSON payload (`ts`, `level`, `template`, `props`).
fn encode_record(event: &LogEvent) -> Vec<u8> {
    #[derive(serde::Serialize)]
    struct Record<'a> {
        ts: i64,
        level: u8,
        template: &'a str,
        props: &'a BTreeMap<String, Value>,
    }
    let record = Record {
        ts: event.timestamp.timestamp_nanos_opt().unwrap_or_default(),
        level: event.level as u8,
        template: &event.message_template.raw,
        props: &event.properties,
    };
    let payload = serde_json::to_vec(&record).expect("Value is always JSON-serialisable");

    let mut hasher = Hasher::new();
    hasher.update(&payload);
    let crc = hasher.finalize();

    let mut buf = Vec::with_capacity(8 + payload.len());
    buf.extend_from_slice(&(payload.len() as u32).to_le_bytes());
    buf.extend_from_slice(&crc.to_le_bytes());
    buf.extend_from_slice(&payload);
    buf
}

#[derive(serde::Deserialize)]
struct DecodedRecord {
    ts: i64,
    level: u8,
    template: String,
    props: BTreeMap<String, Value>,
}

fn level_from_u8(tag: u8) -> Level {
    match tag {
        0 => Level::Verbose,
        1 => Level::Debug,
        2 => Level::Information,
        3 => Level::Warning,
        4 => Level::Error,
        _ => Level::Fatal,
    }
}

fn decode_record(payload: &[u8]) -> Option<LogEvent> {
    let decoded: DecodedRecord = serde_json::from_slice(payload).ok()?;
    let timestamp: DateTime<Utc> = DateTime::from_timestamp_nanos(decoded.ts);
    let (template, _) = MessageTemplate::parse(&decoded.template);
    Some(LogEvent {
        timestamp,
        level: level_from_u8(decoded.level),
        message_template: Arc::new(template),
        properties: decoded.props,
    })
}

/// Reads every well-formed record out of a segment file, in file order.
/// Corrupt records (short read, bad CRC, unparseable payload) are skipped
/// with a self-log warning rather than aborting the whole replay.
fn replay_segment(path: &Path) -> io::Result<Vec<LogEvent>> {
    let mut file = File::open(path)?;
    let mut bytes = Vec::new();
    file.read_to_end(&mut bytes)?;

    let mut events = Vec::new();
    let mut offset = 0usize;
    while offset + 8 <= bytes.len() {
        let len = u32::from_le_bytes(bytes[offset..offset + 4].try_into().unwrap()) as usize;
        let expected_crc = u32::from_le_bytes(bytes[offset + 4..offset + 8].try_into().unwrap());
        let payload_start = offset + 8;
        let payload_end = payload_start + len;
        if payload_end > bytes.len() {
            selflog::emit(
                "durable_sink",
                &format!("{}: truncated record, stopping replay", path.display()),
            );
            break;
        }
        let payload = &bytes[payload_start..payload_end];
        let mut hasher = Hasher::new();
        hasher.update(payload);
        if hasher.finalize() != expected_crc {
            selflog::emit("durable_sink", &format!("{}: CRC mismatch, discarding record", path.display()));
            offset = payload_end;
            continue;
        }
        match decode_record(payload) {
            Some(event) => events.push(event),
            None => selflog::emit(
                "durable_sink",
                &format!("{}: unreadable record schema, discarding", path.display()),
            ),
        }
        offset = payload_end;
    }
    Ok(events)
}

fn segment_name(sequence: u64) -> String {
    format!("{sequence:0width$}", width = SEGMENT_DIGITS)
}

fn segment_path(dir: &Path, sequence: u64) -> PathBuf {
    dir.join(segment_name(sequence))
}

fn open_segment_file(dir: &Path, sequence: u64) -> io::Result<File> {
    fs::create_dir_all(dir)?;
    OpenOptions::new().create(true).append(true).open(segment_path(dir, sequence))
}

fn list_segments(dir: &Path) -> io::Result<Vec<(u64, PathBuf)>> {
    let mut segments = Vec::new();
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        if !path.is_file() {
            continue;
        }
        if let Some(name) = path.file_name().and_then(|n| n.to_str()) {
            if let Ok(sequence) = name.parse::<u64>() {
                segments.push((sequence, path));
            }
        }
    }
    segments.sort_by_key(|(sequence, _)| *sequence);
    Ok(segments)
}

/// The single active append-only file. Only ever touched under its own
/// mutex, shared between `emit`'s persist path and the retry worker's
/// `rotate` — so a segment is never read or deleted while still open for
/// writing.
struct SegmentWriter {
    dir: PathBuf,
    sequence: u64,
    file: File,
    size: u64,
}

impl SegmentWriter {
    fn open(dir: &Path, sequence: u64) -> io::Result<SegmentWriter> {
        let file = open_segment_file(dir, sequence)?;
        let size = file.metadata()?.len();
        Ok(SegmentWriter {
            dir: dir.to_path_buf(),
            sequence,
            file,
            size,
        })
    }

    fn append(&mut self, record: &[u8], max_buffer_size: u64) -> io::Result<()> {
        if self.size > 0 && self.size + record.len() as u64 > max_buffer_size {
            self.roll()?;
        }
        self.file.write_all(record)?;
        self.file.flush()?;
        self.size += record.len() as u64;
        Ok(())
    }

    fn roll(&mut self) -> io::Result<()> {
        self.sequence += 1;
        self.file = open_segment_file(&self.dir, self.sequence)?;
        self.size = 0;
        Ok(())
    }

    /// Closes the current segment (by rolling to a fresh one) and returns
    /// the sequence number of the now-closed, safe-to-read file, if it had
    /// any content.
    fn rotate_if_nonempty(&mut self) -> io::Result<Option<u64>> {
        if self.size == 0 {
            return Ok(None);
        }
        let closed = self.sequence;
        self.roll()?;
        Ok(Some(closed))
    }
}

/// Wraps a downstream sink with an on-disk buffer that absorbs transient
/// downstream failures. `emit` passes through directly while the
/// downstream is healthy and nothing is queued; otherwise it persists to
/// disk and a background worker retries delivery.
pub struct DurableSink {
    downstream: Arc<dyn Sink>,
    directory: PathBuf,
    max_buffer_size: u64,
    max_buffer_files: usize,
    writer: Arc<Mutex<SegmentWriter>>,
    metrics: Arc<DurableSinkMetrics>,
    worker: Mutex<Option<JoinHandle<()>>>,
    stop: Arc<AtomicBool>,
    shutdown_timeout: Duration,
}

impl DurableSink {
    /// Opens `config.directory`, replaying and re-persisting any records
    /// left over from a prior process, then starts the retry worker.
    pub fn open(downstream: Arc<dyn Sink>, config: DurableSinkConfig) -> io::Result<DurableSink> {
        fs::create_dir_all(&config.directory)?;
        let segments = list_segments(&config.directory)?;
        let next_sequence = segments.last().map(|(s, _)| s + 1).unwrap_or(0);

        let mut recovered: VecDeque<LogEvent> = VecDeque::new();
        for (_, path) in &segments {
            recovered.extend(replay_segment(path)?);
            fs::remove_file(path)?;
        }

        let metrics = Arc::new(DurableSinkMetrics::default());
        metrics.healthy.store(true, Ordering::Relaxed);
        metrics.buffered.fetch_add(recovered.len() as u64, Ordering::Relaxed);

        let writer = Arc::new(Mutex::new(SegmentWriter::open(&config.directory, next_sequence)?));
        let pending = Arc::new(Mutex::new(recovered));
        let stop = Arc::new(AtomicBool::new(false));

        let worker_downstream = downstream.clone();
        let worker_metrics = metrics.clone();
        let worker_stop = stop.clone();
        let worker_dir = config.directory.clone();
        let worker_writer = writer.clone();
        let worker_pending = pending.clone();
        let retry_interval = config.retry_interval;
        let batch_size = config.batch_size.max(1);

        let handle = thread::spawn(move || {
            retry_loop(
                worker_downstream,
                worker_dir,
                worker_writer,
                worker_pending,
                worker_metrics,
                worker_stop,
                retry_interval,
                batch_size,
            );
        });

        Ok(DurableSink {
            downstream,
            directory: config.directory,
            max_buffer_size: config.max_buffer_size.max(1),
            max_buffer_files: config.max_buffer_files.max(1),
            writer,
            metrics,
            worker: Mutex::new(Some(handle)),
            stop,
            shutdown_timeout: config.shutdown_timeout,
        })
    }

    pub fn metrics(&self) -> &DurableSinkMetrics {
        &self.metrics
    }

    fn persist(&self, event: &LogEvent) {
        let record = encode_record(event);
        let mut writer = self.writer.lock();
        if let Err(err) = writer.append(&record, self.max_buffer_size) {
            selflog::emit("durable_sink", &format!("failed to persist record: {err}"));
            self.metrics.dropped.fetch_add(1, Ordering::Relaxed);
            return;
        }
        self.metrics.buffered.fetch_add(1, Ordering::Relaxed);

        if let Ok(segments) = list_segments(&self.directory) {
            let active = segment_path(&self.directory, writer.sequence);
            let closed: Vec<_> = segments.into_iter().filter(|(_, p)| *p != active).collect();
            if closed.len() > self.max_buffer_files {
                let overflow = closed.len() - self.max_buffer_files;
                for (_, path) in closed.into_iter().take(overflow) {
                    if fs::remove_file(&path).is_ok() {
                        self.metrics.dropped.fetch_add(1, Ordering::Relaxed);
                    }
                }
            }
        }
    }
}

#[allow(clippy::too_many_arguments)]
fn retry_loop(
    downstream: Arc<dyn Sink>,
    directory: PathBuf,
    writer: Arc<Mutex<SegmentWriter>>,
    pending: Arc<Mutex<VecDeque<LogEvent>>>,
    metrics: Arc<DurableSinkMetrics>,
    stop: Arc<AtomicBool>,
    retry_interval: Duration,
    batch_size: usize,
) {
    loop {
        if stop.load(Ordering::Relaxed) {
            break;
        }

        // Close the current segment (if it has content) so its bytes are
        // final, then fold every closed segment on disk into the
        // in-memory FIFO queue.
        let closed_sequence = writer.lock().rotate_if_nonempty().ok().flatten();
        if let Some(closed_sequence) = closed_sequence {
            if let Ok(segments) = list_segments(&directory) {
                for (sequence, path) in segments {
                    if sequence > closed_sequence {
                        continue;
                    }
                    match replay_segment(&path) {
                        Ok(events) => pending.lock().extend(events),
                        Err(err) => selflog::emit(
                            "durable_sink",
                            &format!("failed to read {}: {err}", path.display()),
                        ),
                    }
                    let _ = fs::remove_file(path);
                }
            }
        }

        let batch: Vec<LogEvent> = {
            let mut pending = pending.lock();
            let take = pending.len().min(batch_size);
            pending.drain(..take).collect()
        };

        if batch.is_empty() {
            metrics.healthy.store(true, Ordering::Relaxed);
            thread::sleep(retry_interval);
            continue;
        }

        metrics.retries.fetch_add(1, Ordering::Relaxed);
        let outcome = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            for event in &batch {
                downstream.emit(event);
            }
        }));

        match outcome {
            Ok(()) => {
                metrics.healthy.store(true, Ordering::Relaxed);
                metrics.delivered.fetch_add(batch.len() as u64, Ordering::Relaxed);
                metrics.buffered.fetch_sub(batch.len() as u64, Ordering::Relaxed);
            }
            Err(_) => {
                metrics.healthy.store(false, Ordering::Relaxed);
                selflog::emit("durable_sink", "downstream still unhealthy, requeuing batch");
                let mut pending = pending.lock();
                for event in batch.into_iter().rev() {
                    pending.push_front(event);
                }
                drop(pending);
                thread::sleep(retry_interval);
            }
        }
    }
}

impl Sink for DurableSink {
    fn emit(&self, event: &LogEvent) {
        if self.metrics.is_healthy() && self.metrics.buffered() == 0 {
            let outcome = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
                self.downstream.emit(event);
            }));
            if outcome.is_ok() {
                self.metrics.delivered.fetch_add(1, Ordering::Relaxed);
                return;
            }
            self.metrics.healthy.store(false, Ordering::Relaxed);
            selflog::emit("durable_sink", "downstream emit panicked, buffering to disk");
        }
        self.persist(event);
    }

    fn close(&self) -> Result<()> {
        self.stop.store(true, Ordering::Relaxed);
        let handle = self.worker.lock().take();
        if let Some(handle) = handle {
            let start = Instant::now();
            while !handle.is_finished() && start.elapsed() < self.shutdown_timeout {
                thread::sleep(Duration::from_millis(5));
            }
            if handle.is_finished() {
                let _ = handle.join();
                Ok(())
            } else {
                Err(LogCoreError::Durable(
                    "retry worker did not exit within shutdown_timeout".to_string(),
                ))
            }
        } else {
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sink::MemorySink;
    use crate::template::MessageTemplate;
    use std::sync::atomic::AtomicBool as StdAtomicBool;
    use tempfile::tempdir;

    fn event(n: i64) -> LogEvent {
        let (tmpl, _) = MessageTemplate::parse("seq {N}");
        let mut e = LogEvent::new(Level::Information, Arc::new(tmpl));
        e.set_property("N", n);
        e
    }

    fn wait_until(mut cond: impl FnMut() -> bool, timeout: Duration) {
        let start = Instant::now();
        while !cond() && start.elapsed() < timeout {
            thread::sleep(Duration::from_millis(5));
        }
    }

    /// A downstream sink that fails every emit until `healthy` flips true.
    struct Flaky {
        healthy: Arc<StdAtomicBool>,
        inner: Arc<MemorySink>,
    }

    impl Sink for Flaky {
        fn emit(&self, event: &LogEvent) {
            if !self.healthy.load(Ordering::Relaxed) {
                panic!("downstream unavailable");
            }
            self.inner.emit(event);
        }
    }

    fn config(dir: &Path) -> DurableSinkConfig {
        DurableSinkConfig {
            directory: dir.to_path_buf(),
            max_buffer_size: 1 << 20,
            max_buffer_files: 8,
            retry_interval: Duration::from_millis(20),
            batch_size: 16,
            shutdown_timeout: Duration::from_secs(2),
        }
    }

    #[test]
    fn healthy_downstream_passes_through_without_touching_disk() {
        let dir = tempdir().unwrap();
        let memory = Arc::new(MemorySink::new());
        let sink = DurableSink::open(memory.clone(), config(dir.path())).unwrap();
        sink.emit(&event(1));
        assert_eq!(memory.len(), 1);
        assert_eq!(sink.metrics().delivered(), 1);
        sink.close().unwrap();
    }

    #[test]
    fn buffers_and_redelivers_after_downstream_recovers() {
        let dir = tempdir().unwrap();
        let memory = Arc::new(MemorySink::new());
        let healthy = Arc::new(StdAtomicBool::new(false));
        let flaky = Arc::new(Flaky {
            healthy: healthy.clone(),
            inner: memory.clone(),
        });
        let sink = DurableSink::open(flaky, config(dir.path())).unwrap();

        for n in 0..5 {
            sink.emit(&event(n));
        }
        assert_eq!(memory.len(), 0, "downstream unhealthy, nothing delivered yet");
        assert!(sink.metrics().buffered() > 0);

        healthy.store(true, Ordering::Relaxed);
        wait_until(|| memory.len() == 5, Duration::from_secs(2));
        assert_eq!(memory.len(), 5);
        assert!(sink.metrics().is_healthy());
        sink.close().unwrap();
    }

    #[test]
    fn recovers_persisted_records_from_a_prior_process() {
        let dir = tempdir().unwrap();
        {
            let memory = Arc::new(MemorySink::new());
            let healthy = Arc::new(StdAtomicBool::new(false));
            let flaky = Arc::new(Flaky {
                healthy: healthy.clone(),
                inner: memory.clone(),
            });
            let mut cfg = config(dir.path());
            cfg.shutdown_timeout = Duration::from_millis(50);
            let sink = DurableSink::open(flaky, cfg).unwrap();
            sink.emit(&event(1));
            sink.emit(&event(2));
            // Intentionally closes without the downstream ever recovering;
            // records stay on disk for the next `open` to replay.
            let _ = sink.close();
        }

        let memory = Arc::new(MemorySink::new());
        let sink = DurableSink::open(memory.clone(), config(dir.path())).unwrap();
        wait_until(|| memory.len() == 2, Duration::from_secs(2));
        assert_eq!(memory.len(), 2);
        sink.close().unwrap();
    }
}
