//! # Session Table
//!
//! Multiplexes in-flight inbound sessions keyed by `(endpoint, session_id)`.
//!
//! ## Features
//! - **Thread-safe**: one mutex guards the table, so every key sees a linear
//!   history of `dispatch` and eviction calls
//! - **Idle eviction**: `evict_stale` drops sessions whose terminating frames
//!   never arrived
//! - **Memory-bounded**: a configurable session cap evicts the least recently
//!   touched session when a new one arrives at capacity
//!
//! ## Usage
//! ```rust
//! use segment_protocol::protocol::session_table::SessionTable;
//! use std::time::Duration;
//!
//! let table: SessionTable<u32> = SessionTable::default();
//! let frames = table.create_tx_session(b"hdr", b"payload", 7, 56).unwrap();
//!
//! let mut delivered = None;
//! for frame in &frames {
//!     delivered = table.dispatch(&42, &frame.to_bytes()).unwrap();
//! }
//! assert_eq!(&delivered.unwrap().payload()[..], b"payload");
//!
//! table.evict_stale(Duration::from_secs(30)).unwrap();
//! ```

use crate::config::SessionConfig;
use crate::core::frame::Frame;
use crate::error::constants::ERR_SESSION_TABLE_LOCK;
use crate::error::{ProtocolError, Result};
use crate::protocol::fragmenter::Fragmenter;
use crate::protocol::message::Message;
use crate::protocol::reassembler::{Completion, Reassembler};
use crate::utils::metrics::global_metrics;
use bytes::Bytes;
use std::collections::HashMap;
use std::fmt::Debug;
use std::hash::Hash;
use std::sync::{Mutex, MutexGuard};
use std::time::{Duration, Instant};
use tracing::{debug, error, warn};

/// Composite key identifying one inbound session.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SessionKey<E> {
    pub endpoint: E,
    pub session_id: u8,
}

impl<E> SessionKey<E> {
    pub fn new(endpoint: E, session_id: u8) -> Self {
        Self {
            endpoint,
            session_id,
        }
    }
}

#[derive(Debug)]
struct SessionEntry {
    reassembler: Reassembler,
    created_at: Instant,
    last_touched: Instant,
}

impl SessionEntry {
    fn is_stale(&self, now: Instant, max_age: Duration) -> bool {
        now.saturating_duration_since(self.last_touched) > max_age
    }
}

/// Reassembly sessions for every remote endpoint.
///
/// `E` is whatever identifies a remote radio: a node id, a `SocketAddr`, etc.
#[derive(Debug)]
pub struct SessionTable<E> {
    sessions: Mutex<HashMap<SessionKey<E>, SessionEntry>>,
    max_frame_index: u16,
    max_sessions: usize,
}

impl<E> Default for SessionTable<E>
where
    E: Eq + Hash + Clone + Debug,
{
    fn default() -> Self {
        Self::new(&SessionConfig::default())
    }
}

impl<E> SessionTable<E>
where
    E: Eq + Hash + Clone + Debug,
{
    pub fn new(config: &SessionConfig) -> Self {
        Self::with_limits(config.max_frame_index, config.max_sessions)
    }

    pub fn with_limits(max_frame_index: u16, max_sessions: usize) -> Self {
        Self {
            sessions: Mutex::new(HashMap::new()),
            max_frame_index,
            max_sessions: max_sessions.max(1),
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, HashMap<SessionKey<E>, SessionEntry>>> {
        self.sessions.lock().map_err(|_| {
            error!("{}", ERR_SESSION_TABLE_LOCK);
            ProtocolError::LockPoisoned
        })
    }

    /// Decode a raw frame from `endpoint` and feed it to its session.
    ///
    /// Returns the reconstructed message once the session completes; the
    /// session is then removed. Malformed frames are logged, counted and
    /// returned as errors without affecting any session.
    ///
    /// A completed session leaves nothing behind, so a late duplicate of one
    /// of its frames opens a new session under the same key. A duplicated
    /// single-frame message is delivered twice. Callers on links that can
    /// replay frames must deduplicate delivered messages themselves.
    pub fn dispatch(&self, endpoint: &E, data: &[u8]) -> Result<Option<Message>> {
        self.dispatch_bytes(endpoint, Bytes::copy_from_slice(data))
    }

    /// Like [`SessionTable::dispatch`] but takes ownership of the datagram.
    pub fn dispatch_bytes(&self, endpoint: &E, data: Bytes) -> Result<Option<Message>> {
        let frame = Frame::decode(data).inspect_err(|e| {
            global_metrics().frame_malformed();
            warn!(?endpoint, error = %e, "Dropping malformed frame");
        })?;
        global_metrics().frames_decoded(1);
        self.dispatch_frame(endpoint, frame)
    }

    /// Feed an already decoded frame to its session.
    pub fn dispatch_frame(&self, endpoint: &E, frame: Frame) -> Result<Option<Message>> {
        self.dispatch_frame_at(endpoint, frame, Instant::now())
    }

    fn dispatch_frame_at(
        &self,
        endpoint: &E,
        frame: Frame,
        now: Instant,
    ) -> Result<Option<Message>> {
        let key = SessionKey::new(endpoint.clone(), frame.session_id);
        let mut sessions = self.lock()?;

        if !sessions.contains_key(&key) {
            if frame.frame_index > self.max_frame_index {
                global_metrics().frame_rejected();
                warn!(
                    ?endpoint,
                    session_id = key.session_id,
                    index = frame.frame_index,
                    "Frame rejected before opening a session"
                );
                return Err(ProtocolError::FrameIndexOutOfRange {
                    index: frame.frame_index,
                    max: self.max_frame_index,
                });
            }
            if sessions.len() >= self.max_sessions {
                Self::evict_least_recent(&mut sessions);
            }
            sessions.insert(
                key.clone(),
                SessionEntry {
                    reassembler: Reassembler::with_max_frame_index(self.max_frame_index),
                    created_at: now,
                    last_touched: now,
                },
            );
            global_metrics().session_created();
            debug!(?endpoint, session_id = key.session_id, "Session created");
        }

        let Some(entry) = sessions.get_mut(&key) else {
            return Ok(None);
        };

        let completion = match entry.reassembler.add(frame) {
            Ok(completion) => completion,
            Err(e) => {
                global_metrics().frame_rejected();
                warn!(?endpoint, session_id = key.session_id, error = %e, "Frame rejected");
                if entry.reassembler.frames_received() == 0 {
                    sessions.remove(&key);
                }
                return Err(e);
            }
        };

        match completion {
            Completion::Pending => {
                entry.last_touched = now;
                Ok(None)
            }
            Completion::Complete => {
                let result = entry.reassembler.finalize();
                let age = now.saturating_duration_since(entry.created_at);
                sessions.remove(&key);

                let message = result.inspect_err(|e| {
                    warn!(
                        ?endpoint,
                        session_id = key.session_id,
                        error = %e,
                        "Session dropped on finalize"
                    );
                })?;
                global_metrics().session_completed(message.len() as u64);
                debug!(
                    ?endpoint,
                    session_id = key.session_id,
                    bytes = message.len(),
                    age_ms = age.as_millis() as u64,
                    "Session complete"
                );
                Ok(Some(message))
            }
        }
    }

    /// Split an outbound message into frames. Holds no table state: there is
    /// nothing to reassemble on the transmit side.
    pub fn create_tx_session(
        &self,
        header: &[u8],
        payload: &[u8],
        session_id: u8,
        frame_size: usize,
    ) -> Result<Vec<Frame>> {
        Fragmenter::new(frame_size)?.fragment(header, payload, session_id)
    }

    /// Remove every session idle for longer than `max_age`.
    ///
    /// Driven by an external scheduler; returns how many sessions were dropped.
    pub fn evict_stale(&self, max_age: Duration) -> Result<usize> {
        self.evict_stale_at(Instant::now(), max_age)
    }

    /// Eviction against an explicit clock reading.
    pub fn evict_stale_at(&self, now: Instant, max_age: Duration) -> Result<usize> {
        let mut sessions = self.lock()?;
        let before = sessions.len();

        sessions.retain(|key, entry| {
            let stale = entry.is_stale(now, max_age);
            if stale {
                debug!(
                    endpoint = ?key.endpoint,
                    session_id = key.session_id,
                    frames = entry.reassembler.frames_received(),
                    "Evicting stale session"
                );
            }
            !stale
        });

        let removed = before - sessions.len();
        if removed > 0 {
            global_metrics().sessions_evicted(removed as u64);
            debug!(
                removed_count = removed,
                remaining_count = sessions.len(),
                "Stale sessions evicted"
            );
        }
        Ok(removed)
    }

    fn evict_least_recent(sessions: &mut HashMap<SessionKey<E>, SessionEntry>) {
        if let Some(oldest) = sessions
            .iter()
            .min_by_key(|(_, entry)| entry.last_touched)
            .map(|(key, _)| key.clone())
        {
            sessions.remove(&oldest);
            global_metrics().sessions_evicted(1);
            debug!(
                endpoint = ?oldest.endpoint,
                session_id = oldest.session_id,
                "Session table full, evicted least recently touched session"
            );
        }
    }

    /// Number of in-flight sessions.
    pub fn len(&self) -> Result<usize> {
        Ok(self.lock()?.len())
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.lock()?.is_empty())
    }

    pub fn contains(&self, endpoint: &E, session_id: u8) -> Result<bool> {
        let key = SessionKey::new(endpoint.clone(), session_id);
        Ok(self.lock()?.contains_key(&key))
    }

    /// Drop every in-flight session.
    pub fn clear(&self) -> Result<()> {
        let mut sessions = self.lock()?;
        let count = sessions.len();
        sessions.clear();
        debug!(cleared_count = count, "Session table cleared");
        Ok(())
    }

    /// Current table statistics.
    pub fn stats(&self) -> Result<SessionTableStats> {
        let sessions = self.lock()?;
        Ok(SessionTableStats {
            active_sessions: sessions.len(),
            buffered_bytes: sessions
                .values()
                .map(|entry| entry.reassembler.buffered_bytes())
                .sum(),
            max_sessions: self.max_sessions,
        })
    }
}

/// Statistics about the session table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionTableStats {
    /// Sessions awaiting more frames
    pub active_sessions: usize,
    /// Chunk bytes held across all sessions
    pub buffered_bytes: usize,
    /// Capacity before least-recent eviction kicks in
    pub max_sessions: usize,
}
