//! # Segment Protocol
//!
//! Segmented message transport for links with a hard per-packet ceiling of
//! tens of bytes, such as LoRa-class radios.
//!
//! A logical message (an optional header plus a payload) is split into small
//! frames that can be sent independently, then rebuilt on the far side even
//! when frames arrive out of order. Loss is detected, not repaired: a session
//! missing a frame never completes and is eventually evicted.
//!
//! ## Layers
//! - [`core`]: frame wire format and datagram codec
//! - [`protocol`]: fragmenter, reassembler and the session table
//! - [`transport`]: UDP adapter and background eviction
//! - [`config`], [`error`], [`utils`]: ambient concerns
//!
//! ## Example
//! ```rust
//! use segment_protocol::{Fragmenter, SessionTable};
//!
//! let fragmenter = Fragmenter::new(16).unwrap();
//! let frames = fragmenter.fragment(b"topic/a", b"a payload longer than one frame", 3).unwrap();
//!
//! let table: SessionTable<&str> = SessionTable::default();
//! let mut delivered = None;
//! for frame in frames.iter().rev() {
//!     delivered = table.dispatch(&"node-1", &frame.to_bytes()).unwrap();
//! }
//!
//! let message = delivered.unwrap();
//! assert_eq!(&message.header()[..], b"topic/a");
//! assert_eq!(&message.payload()[..], b"a payload longer than one frame");
//! ```

pub mod config;
pub mod core;
pub mod error;
pub mod protocol;
pub mod transport;
pub mod utils;

pub use crate::core::codec::FrameCodec;
pub use crate::core::frame::{Frame, MessageType};
pub use config::ProtocolConfig;
pub use error::{ProtocolError, Result};
pub use protocol::fragmenter::Fragmenter;
pub use protocol::message::Message;
pub use protocol::reassembler::{Completion, Reassembler};
pub use protocol::session_id::SessionIdGenerator;
pub use protocol::session_table::{SessionKey, SessionTable, SessionTableStats};
pub use transport::udp::{OutboundMessage, UdpTransport};
