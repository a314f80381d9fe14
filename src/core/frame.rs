use crate::error::constants::{
    ERR_FIRST_NOT_START, ERR_FRAME_TOO_SHORT, ERR_START_FRAME_TOO_SHORT, ERR_START_NOT_FIRST,
    ERR_UNKNOWN_TYPE_BITS,
};
use crate::error::{ProtocolError, Result};
use bytes::{Buf, BufMut, Bytes, BytesMut};
use std::fmt;
use std::ops::BitOr;

/// Length of the fixed prefix carried by every frame: type, session id, frame index.
pub const FIXED_PREFIX_LEN: usize = 4;

/// Length of the header-length field carried only by START frames.
pub const HEADER_LENGTH_FIELD_LEN: usize = 4;

/// Worst-case per-frame overhead (a START frame).
pub const START_FRAME_OVERHEAD: usize = FIXED_PREFIX_LEN + HEADER_LENGTH_FIELD_LEN;

/// START/END bitset carried in the first byte of every frame.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Default)]
pub struct MessageType(u8);

impl MessageType {
    /// Neither START nor END: a middle frame.
    pub const CONTINUATION: MessageType = MessageType(0);
    /// First frame of a message.
    pub const START: MessageType = MessageType(0b01);
    /// Last frame of a message.
    pub const END: MessageType = MessageType(0b10);
    /// A message that fits in one frame.
    pub const SINGLE: MessageType = MessageType(0b11);

    const KNOWN_BITS: u8 = 0b11;

    /// Parse the raw type byte, rejecting bits outside START/END.
    pub fn from_bits(bits: u8) -> Option<Self> {
        if bits & !Self::KNOWN_BITS == 0 {
            Some(MessageType(bits))
        } else {
            None
        }
    }

    #[inline]
    pub fn bits(self) -> u8 {
        self.0
    }

    #[inline]
    pub fn contains(self, other: MessageType) -> bool {
        self.0 & other.0 == other.0
    }

    #[inline]
    pub fn is_start(self) -> bool {
        self.contains(Self::START)
    }

    #[inline]
    pub fn is_end(self) -> bool {
        self.contains(Self::END)
    }
}

impl BitOr for MessageType {
    type Output = MessageType;

    fn bitor(self, rhs: MessageType) -> MessageType {
        MessageType(self.0 | rhs.0)
    }
}

impl fmt::Debug for MessageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.is_start(), self.is_end()) {
            (true, true) => f.write_str("START|END"),
            (true, false) => f.write_str("START"),
            (false, true) => f.write_str("END"),
            (false, false) => f.write_str("CONTINUATION"),
        }
    }
}

/// One wire unit of a segmented message.
///
/// ```text
/// [type(1)] [session_id(1)] [frame_index(2)] [header_length(4), START only] [chunk(N)]
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub message_type: MessageType,
    pub session_id: u8,
    pub frame_index: u16,
    /// Present exactly when `message_type` has START set.
    pub header_length: Option<u32>,
    pub chunk: Bytes,
}

impl Frame {
    /// Build a frame, deriving the header-length slot from the START bit.
    ///
    /// A START frame without an explicit header length carries zero.
    pub fn new(
        message_type: MessageType,
        session_id: u8,
        frame_index: u16,
        header_length: Option<u32>,
        chunk: Bytes,
    ) -> Self {
        let header_length = if message_type.is_start() {
            Some(header_length.unwrap_or(0))
        } else {
            None
        };
        Self {
            message_type,
            session_id,
            frame_index,
            header_length,
            chunk,
        }
    }

    /// Number of bytes this frame occupies on the wire.
    #[inline]
    pub fn encoded_len(&self) -> usize {
        let prefix = if self.message_type.is_start() {
            START_FRAME_OVERHEAD
        } else {
            FIXED_PREFIX_LEN
        };
        prefix + self.chunk.len()
    }

    /// Append the wire representation to `dst`.
    pub fn write_to(&self, dst: &mut BytesMut) {
        dst.reserve(self.encoded_len());
        dst.put_u8(self.message_type.bits());
        dst.put_u8(self.session_id);
        dst.put_u16(self.frame_index);
        if self.message_type.is_start() {
            dst.put_u32(self.header_length.unwrap_or(0));
        }
        dst.extend_from_slice(&self.chunk);
    }

    /// Serialize to an owned buffer.
    pub fn to_bytes(&self) -> Bytes {
        let mut buf = BytesMut::with_capacity(self.encoded_len());
        self.write_to(&mut buf);
        buf.freeze()
    }

    /// Parse one frame from a complete datagram.
    ///
    /// # Errors
    /// Returns `ProtocolError::MalformedFrame` when the buffer is shorter than
    /// the fixed prefix (or the START prefix), carries unknown type bits, or
    /// places START anywhere but frame index 0.
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        Self::decode(Bytes::copy_from_slice(data))
    }

    /// Zero-copy variant of [`Frame::from_bytes`]: the chunk shares `data`'s storage.
    pub fn decode(mut data: Bytes) -> Result<Self> {
        if data.len() < FIXED_PREFIX_LEN {
            return Err(ProtocolError::MalformedFrame(ERR_FRAME_TOO_SHORT));
        }

        let message_type = MessageType::from_bits(data[0])
            .ok_or(ProtocolError::MalformedFrame(ERR_UNKNOWN_TYPE_BITS))?;

        if message_type.is_start() && data.len() < START_FRAME_OVERHEAD {
            return Err(ProtocolError::MalformedFrame(ERR_START_FRAME_TOO_SHORT));
        }

        data.advance(1);
        let session_id = data.get_u8();
        let frame_index = data.get_u16();

        match (message_type.is_start(), frame_index) {
            (true, 0) | (false, 1..) => {}
            (true, _) => return Err(ProtocolError::MalformedFrame(ERR_START_NOT_FIRST)),
            (false, 0) => return Err(ProtocolError::MalformedFrame(ERR_FIRST_NOT_START)),
        }

        let header_length = if message_type.is_start() {
            Some(data.get_u32())
        } else {
            None
        };

        Ok(Self {
            message_type,
            session_id,
            frame_index,
            header_length,
            chunk: data,
        })
    }

    /// Read just the session id without decoding the rest of the frame.
    #[inline]
    pub fn peek_session_id(data: &[u8]) -> Option<u8> {
        if data.len() < FIXED_PREFIX_LEN {
            None
        } else {
            Some(data[1])
        }
    }
}
