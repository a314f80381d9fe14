//! # Transport Layer
//!
//! Adapters between the protocol core and a packet transport.
//!
//! The core itself never touches I/O: a transport hands `(endpoint, bytes)`
//! pairs to `SessionTable::dispatch` and sends whatever the fragmenter
//! produces. This module provides a UDP adapter and the periodic eviction
//! task any transport can reuse.
//!
//! ## Components
//! - **UDP**: One frame per datagram via `UdpFramed<FrameCodec>`
//! - **Eviction task**: Background sweep of stale reassembly sessions

pub mod udp;

use crate::protocol::session_table::SessionTable;
use std::fmt::Debug;
use std::hash::Hash;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error};

/// Spawn a task that calls `evict_stale(max_age)` every `every`.
///
/// The task ends when the table is poisoned or when aborted through the
/// returned handle.
pub fn spawn_eviction_task<E>(
    table: Arc<SessionTable<E>>,
    every: Duration,
    max_age: Duration,
) -> JoinHandle<()>
where
    E: Eq + Hash + Clone + Debug + Send + 'static,
{
    tokio::spawn(async move {
        let mut sweep = tokio::time::interval(every.max(Duration::from_millis(1)));
        sweep.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            sweep.tick().await;
            match table.evict_stale(max_age) {
                Ok(0) => {}
                Ok(removed) => debug!(removed, "Eviction sweep"),
                Err(e) => {
                    error!(error = %e, "Eviction task stopping");
                    return;
                }
            }
        }
    })
}
