//! # Protocol Layer
//!
//! Fragmentation, reassembly and session multiplexing.
//!
//! ## Components
//! - **Message**: Header + payload pair exchanged with the upper layer
//! - **Fragmenter**: Splits a message into frames no larger than `frame_size`
//! - **Reassembler**: Rebuilds one session's message from frames in any order
//! - **SessionTable**: Per-endpoint session multiplexing with idle eviction
//! - **SessionIdGenerator**: Wrapping outbound session id allocator
//!
//! ## Guarantees
//! - A session completes only when every index from 0 through END is held,
//!   never merely because the END frame arrived
//! - Frames for different `(endpoint, session_id)` keys never mix
//! - Abandoned sessions are reclaimed by `SessionTable::evict_stale`

pub mod fragmenter;
pub mod message;
pub mod reassembler;
pub mod session_id;
pub mod session_table;
