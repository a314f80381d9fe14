//! Receive side: rebuild one session's message from frames in any order.

use crate::core::frame::Frame;
use crate::error::constants::ERR_HEADER_LENGTH_OVERFLOW;
use crate::error::{ProtocolError, Result};
use crate::protocol::message::Message;
use bytes::{Bytes, BytesMut};
use std::collections::BTreeMap;
use tracing::trace;

/// Default ceiling on accepted frame indices.
pub const DEFAULT_MAX_FRAME_INDEX: u16 = 4095;

/// Outcome of adding a frame to a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Completion {
    /// More frames are needed.
    Pending,
    /// Every frame from 0 through END is buffered; call `finalize`.
    Complete,
}

/// Reassembly state for one inbound session.
#[derive(Debug)]
pub struct Reassembler {
    chunks: BTreeMap<u16, Bytes>,
    header_length: Option<u32>,
    end_index: Option<u16>,
    max_frame_index: u16,
    buffered_bytes: usize,
    finalized: bool,
}

impl Default for Reassembler {
    fn default() -> Self {
        Self::new()
    }
}

impl Reassembler {
    pub fn new() -> Self {
        Self::with_max_frame_index(DEFAULT_MAX_FRAME_INDEX)
    }

    /// Frames indexed above `max_frame_index` are rejected to bound memory.
    pub fn with_max_frame_index(max_frame_index: u16) -> Self {
        Self {
            chunks: BTreeMap::new(),
            header_length: None,
            end_index: None,
            max_frame_index,
            buffered_bytes: 0,
            finalized: false,
        }
    }

    /// Buffer a frame and report whether the session is now complete.
    ///
    /// A repeated frame index replaces the earlier chunk. Rejected frames
    /// leave the session unchanged.
    ///
    /// # Errors
    /// - `SessionAlreadyComplete` once the session has been finalized
    /// - `FrameIndexOutOfRange` above the configured ceiling or past END
    pub fn add(&mut self, frame: Frame) -> Result<Completion> {
        if self.finalized {
            return Err(ProtocolError::SessionAlreadyComplete);
        }

        let index = frame.frame_index;
        if index > self.max_frame_index {
            return Err(ProtocolError::FrameIndexOutOfRange {
                index,
                max: self.max_frame_index,
            });
        }
        let end = if frame.message_type.is_end() {
            Some(index)
        } else {
            self.end_index
        };
        if let Some(end) = end {
            if index > end {
                return Err(ProtocolError::FrameIndexOutOfRange { index, max: end });
            }
        }

        if frame.message_type.is_start() {
            self.header_length = frame.header_length;
        }
        if frame.message_type.is_end() {
            self.end_index = Some(index);
            // A corrected END makes anything past it unreachable.
            let stale = self.chunks.split_off(&index.saturating_add(1));
            self.buffered_bytes -= stale.values().map(Bytes::len).sum::<usize>();
        }

        self.buffered_bytes += frame.chunk.len();
        if let Some(previous) = self.chunks.insert(index, frame.chunk) {
            self.buffered_bytes -= previous.len();
        }

        trace!(
            frame_index = index,
            buffered = self.chunks.len(),
            end_index = ?self.end_index,
            "Frame buffered"
        );

        Ok(self.completion())
    }

    /// `Complete` iff END is known and every index `0..=end` is buffered.
    pub fn completion(&self) -> Completion {
        match self.end_index {
            Some(end)
                if !self.finalized && self.chunks.range(..=end).count() == end as usize + 1 =>
            {
                Completion::Complete
            }
            _ => Completion::Pending,
        }
    }

    #[inline]
    pub fn is_complete(&self) -> bool {
        self.completion() == Completion::Complete
    }

    /// Concatenate the buffered chunks and split off the header.
    ///
    /// # Errors
    /// - `IncompleteSession` if frames are still missing
    /// - `SessionAlreadyComplete` on a second call
    /// - `MalformedFrame` if the recorded header length exceeds the stream
    pub fn finalize(&mut self) -> Result<Message> {
        if self.finalized {
            return Err(ProtocolError::SessionAlreadyComplete);
        }
        if !self.is_complete() {
            return Err(ProtocolError::IncompleteSession);
        }

        let header_length = self.header_length.unwrap_or(0) as usize;
        if header_length > self.buffered_bytes {
            return Err(ProtocolError::MalformedFrame(ERR_HEADER_LENGTH_OVERFLOW));
        }

        let message = if self.chunks.len() == 1 {
            // Single frame: slice without copying.
            let data = self.chunks.values().next().cloned().unwrap_or_default();
            Message::new(data.slice(..header_length), data.slice(header_length..))
        } else {
            let mut data = BytesMut::with_capacity(self.buffered_bytes);
            for chunk in self.chunks.values() {
                data.extend_from_slice(chunk);
            }
            let mut data = data.freeze();
            let header = data.split_to(header_length);
            Message::new(header, data)
        };

        self.finalized = true;
        self.chunks.clear();
        self.buffered_bytes = 0;
        Ok(message)
    }

    pub fn is_finalized(&self) -> bool {
        self.finalized
    }

    /// Number of distinct frame indices buffered.
    pub fn frames_received(&self) -> usize {
        self.chunks.len()
    }

    /// Chunk bytes currently held in memory.
    pub fn buffered_bytes(&self) -> usize {
        self.buffered_bytes
    }

    pub fn end_index(&self) -> Option<u16> {
        self.end_index
    }

    pub fn header_length(&self) -> Option<u32> {
        self.header_length
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::fragmenter::Fragmenter;

    fn frames(header: &[u8], payload: &[u8], frame_size: usize) -> Vec<Frame> {
        Fragmenter::new(frame_size)
            .unwrap()
            .fragment(header, payload, 1)
            .unwrap()
    }

    #[test]
    fn test_single_frame_completes_immediately() {
        let mut reassembler = Reassembler::new();
        let frame = frames(b"header", b"0123456789", 60).remove(0);

        assert_eq!(reassembler.add(frame).unwrap(), Completion::Complete);
        let message = reassembler.finalize().unwrap();
        assert_eq!(&message.header()[..], b"header");
        assert_eq!(&message.payload()[..], b"0123456789");
    }

    #[test]
    fn test_end_first_is_not_complete() {
        let payload: Vec<u8> = (0..100).collect();
        let mut parts = frames(b"", &payload, 60);
        let mut reassembler = Reassembler::new();

        let end = parts.pop().unwrap();
        assert_eq!(reassembler.add(end).unwrap(), Completion::Pending);
        assert_eq!(reassembler.end_index(), Some(1));

        let start = parts.pop().unwrap();
        assert_eq!(reassembler.add(start).unwrap(), Completion::Complete);
        assert_eq!(&reassembler.finalize().unwrap().payload()[..], &payload[..]);
    }

    #[test]
    fn test_gap_keeps_session_pending() {
        let parts = frames(b"", &[1u8; 30], 10);
        let mut reassembler = Reassembler::new();

        assert_eq!(reassembler.add(parts[0].clone()).unwrap(), Completion::Pending);
        assert_eq!(reassembler.add(parts[2].clone()).unwrap(), Completion::Pending);
        assert!(matches!(
            reassembler.finalize(),
            Err(ProtocolError::IncompleteSession)
        ));
        assert_eq!(reassembler.add(parts[1].clone()).unwrap(), Completion::Complete);
    }

    #[test]
    fn test_duplicate_overwrites() {
        let parts = frames(b"", b"abcdefgh", 4);
        let mut reassembler = Reassembler::new();

        reassembler.add(parts[0].clone()).unwrap();
        reassembler.add(parts[0].clone()).unwrap();
        assert_eq!(reassembler.frames_received(), 1);
        assert_eq!(reassembler.buffered_bytes(), 4);

        assert_eq!(reassembler.add(parts[1].clone()).unwrap(), Completion::Complete);
        assert_eq!(&reassembler.finalize().unwrap().payload()[..], b"abcdefgh");
    }

    #[test]
    fn test_add_after_finalize_rejected() {
        let frame = frames(b"", b"x", 8).remove(0);
        let mut reassembler = Reassembler::new();
        reassembler.add(frame.clone()).unwrap();
        reassembler.finalize().unwrap();

        assert!(reassembler.is_finalized());
        assert!(matches!(
            reassembler.add(frame),
            Err(ProtocolError::SessionAlreadyComplete)
        ));
        assert!(matches!(
            reassembler.finalize(),
            Err(ProtocolError::SessionAlreadyComplete)
        ));
    }

    #[test]
    fn test_index_ceiling_leaves_session_untouched() {
        let mut reassembler = Reassembler::with_max_frame_index(8);
        let frame = Frame::new(
            crate::core::frame::MessageType::CONTINUATION,
            1,
            9,
            None,
            Bytes::from_static(b"zz"),
        );

        assert!(matches!(
            reassembler.add(frame),
            Err(ProtocolError::FrameIndexOutOfRange { index: 9, max: 8 })
        ));
        assert_eq!(reassembler.frames_received(), 0);
        assert_eq!(reassembler.buffered_bytes(), 0);
    }

    #[test]
    fn test_index_past_end_rejected() {
        let parts = frames(b"", &[0u8; 20], 10);
        let mut reassembler = Reassembler::new();
        reassembler.add(parts[1].clone()).unwrap();

        let beyond = Frame::new(
            crate::core::frame::MessageType::CONTINUATION,
            1,
            5,
            None,
            Bytes::from_static(b"late"),
        );
        assert!(matches!(
            reassembler.add(beyond),
            Err(ProtocolError::FrameIndexOutOfRange { index: 5, max: 1 })
        ));
    }

    #[test]
    fn test_header_length_overflow_is_malformed() {
        let frame = Frame::new(
            crate::core::frame::MessageType::SINGLE,
            1,
            0,
            Some(100),
            Bytes::from_static(b"short"),
        );
        let mut reassembler = Reassembler::new();
        assert_eq!(reassembler.add(frame).unwrap(), Completion::Complete);
        assert!(matches!(
            reassembler.finalize(),
            Err(ProtocolError::MalformedFrame(ERR_HEADER_LENGTH_OVERFLOW))
        ));
    }
}
