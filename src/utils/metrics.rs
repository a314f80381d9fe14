//! Observability and Metrics
//!
//! Counters for fragmentation, reassembly and session lifecycle.
//!
//! Uses atomic counters for thread-safe metrics collection.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;
use tracing::{debug, info};

/// Global metrics collector for protocol operations
#[derive(Debug)]
pub struct Metrics {
    /// Frames produced by fragmentation
    pub frames_encoded: AtomicU64,
    /// Frames successfully decoded on receive
    pub frames_decoded: AtomicU64,
    /// Frames dropped because they failed to decode
    pub frames_malformed: AtomicU64,
    /// Well-formed frames a session refused (index out of range, etc.)
    pub frames_rejected: AtomicU64,
    /// Messages split into frames
    pub messages_fragmented: AtomicU64,
    /// Messages rebuilt from frames
    pub messages_reassembled: AtomicU64,
    /// Header + payload bytes fragmented
    pub bytes_fragmented: AtomicU64,
    /// Header + payload bytes reassembled
    pub bytes_reassembled: AtomicU64,
    /// Reassembly sessions opened
    pub sessions_created: AtomicU64,
    /// Sessions that completed and were delivered
    pub sessions_completed: AtomicU64,
    /// Sessions dropped by idle timeout or capacity pressure
    pub sessions_evicted: AtomicU64,
    /// Start time for uptime calculation
    start_time: Instant,
}

impl Metrics {
    /// Create a new metrics collector
    pub fn new() -> Self {
        Self {
            frames_encoded: AtomicU64::new(0),
            frames_decoded: AtomicU64::new(0),
            frames_malformed: AtomicU64::new(0),
            frames_rejected: AtomicU64::new(0),
            messages_fragmented: AtomicU64::new(0),
            messages_reassembled: AtomicU64::new(0),
            bytes_fragmented: AtomicU64::new(0),
            bytes_reassembled: AtomicU64::new(0),
            sessions_created: AtomicU64::new(0),
            sessions_completed: AtomicU64::new(0),
            sessions_evicted: AtomicU64::new(0),
            start_time: Instant::now(),
        }
    }

    /// Record frames produced by the fragmenter
    pub fn frames_encoded(&self, count: u64) {
        self.frames_encoded.fetch_add(count, Ordering::Relaxed);
    }

    /// Record frames decoded from the wire
    pub fn frames_decoded(&self, count: u64) {
        self.frames_decoded.fetch_add(count, Ordering::Relaxed);
    }

    /// Record a frame that failed to decode
    pub fn frame_malformed(&self) {
        self.frames_malformed.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a frame refused by its session
    pub fn frame_rejected(&self) {
        self.frames_rejected.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a fragmented message
    pub fn message_fragmented(&self, byte_count: u64) {
        self.messages_fragmented.fetch_add(1, Ordering::Relaxed);
        self.bytes_fragmented.fetch_add(byte_count, Ordering::Relaxed);
    }

    /// Record a newly opened session
    pub fn session_created(&self) {
        self.sessions_created.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a completed session and the message it produced
    pub fn session_completed(&self, byte_count: u64) {
        self.sessions_completed.fetch_add(1, Ordering::Relaxed);
        self.messages_reassembled.fetch_add(1, Ordering::Relaxed);
        self.bytes_reassembled.fetch_add(byte_count, Ordering::Relaxed);
    }

    /// Record evicted sessions
    pub fn sessions_evicted(&self, count: u64) {
        self.sessions_evicted.fetch_add(count, Ordering::Relaxed);
    }

    /// Get current metrics snapshot
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            frames_encoded: self.frames_encoded.load(Ordering::Relaxed),
            frames_decoded: self.frames_decoded.load(Ordering::Relaxed),
            frames_malformed: self.frames_malformed.load(Ordering::Relaxed),
            frames_rejected: self.frames_rejected.load(Ordering::Relaxed),
            messages_fragmented: self.messages_fragmented.load(Ordering::Relaxed),
            messages_reassembled: self.messages_reassembled.load(Ordering::Relaxed),
            bytes_fragmented: self.bytes_fragmented.load(Ordering::Relaxed),
            bytes_reassembled: self.bytes_reassembled.load(Ordering::Relaxed),
            sessions_created: self.sessions_created.load(Ordering::Relaxed),
            sessions_completed: self.sessions_completed.load(Ordering::Relaxed),
            sessions_evicted: self.sessions_evicted.load(Ordering::Relaxed),
            uptime_seconds: self.start_time.elapsed().as_secs(),
        }
    }

    /// Log current metrics
    pub fn log_metrics(&self) {
        let snapshot = self.snapshot();
        info!(
            frames_encoded = snapshot.frames_encoded,
            frames_decoded = snapshot.frames_decoded,
            frames_malformed = snapshot.frames_malformed,
            frames_rejected = snapshot.frames_rejected,
            messages_fragmented = snapshot.messages_fragmented,
            messages_reassembled = snapshot.messages_reassembled,
            bytes_fragmented = snapshot.bytes_fragmented,
            bytes_reassembled = snapshot.bytes_reassembled,
            sessions_created = snapshot.sessions_created,
            sessions_completed = snapshot.sessions_completed,
            sessions_evicted = snapshot.sessions_evicted,
            uptime_seconds = snapshot.uptime_seconds,
            "Protocol metrics snapshot"
        );
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Snapshot of metrics at a point in time
#[derive(Debug, Clone)]
pub struct MetricsSnapshot {
    pub frames_encoded: u64,
    pub frames_decoded: u64,
    pub frames_malformed: u64,
    pub frames_rejected: u64,
    pub messages_fragmented: u64,
    pub messages_reassembled: u64,
    pub bytes_fragmented: u64,
    pub bytes_reassembled: u64,
    pub sessions_created: u64,
    pub sessions_completed: u64,
    pub sessions_evicted: u64,
    pub uptime_seconds: u64,
}

static METRICS: once_cell::sync::Lazy<Metrics> = once_cell::sync::Lazy::new(Metrics::new);

/// Get the global metrics instance
pub fn global_metrics() -> &'static Metrics {
    &METRICS
}

/// Timer for measuring operation duration
pub struct Timer {
    start: Instant,
    operation: &'static str,
}

impl Timer {
    /// Start timing an operation
    pub fn start(operation: &'static str) -> Self {
        Self {
            start: Instant::now(),
            operation,
        }
    }
}

impl Drop for Timer {
    fn drop(&mut self) {
        let duration = self.start.elapsed();
        debug!(
            operation = self.operation,
            duration_us = duration.as_micros() as u64,
            "Operation completed"
        );
    }
}
