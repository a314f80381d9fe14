//! # Core Protocol Components
//!
//! Low-level frame handling and the datagram codec.
//!
//! ## Components
//! - **Frame**: Binary frame format with START/END flags
//! - **Codec**: Tokio codec treating each datagram as exactly one frame
//!
//! ## Wire Format
//! ```text
//! [Type(1)] [SessionId(1)] [FrameIndex(2)] [HeaderLength(4), START only] [Chunk(N)]
//! ```
//!
//! All integers are big-endian. A frame with both START and END set carries a
//! whole message.

pub mod codec;
pub mod frame;
