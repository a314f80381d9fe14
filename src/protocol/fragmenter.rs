//! Transmit side: split a header and payload into an ordered run of frames.

use crate::core::frame::{Frame, MessageType, START_FRAME_OVERHEAD};
use crate::error::{ProtocolError, Result};
use crate::utils::metrics::global_metrics;
use bytes::{Bytes, BytesMut};
use tracing::trace;

/// Largest number of frames a single session can index.
pub const MAX_FRAMES_PER_MESSAGE: usize = u16::MAX as usize + 1;

/// Stateless splitter bound to a chunk capacity.
#[derive(Debug, Clone, Copy)]
pub struct Fragmenter {
    frame_size: usize,
}

impl Fragmenter {
    /// `frame_size` is the chunk capacity per frame, excluding frame overhead.
    ///
    /// # Errors
    /// Returns `ProtocolError::InvalidFrameSize` for a zero capacity.
    pub fn new(frame_size: usize) -> Result<Self> {
        if frame_size == 0 {
            return Err(ProtocolError::InvalidFrameSize(frame_size));
        }
        Ok(Self { frame_size })
    }

    /// Derive the chunk capacity from the link's hard packet ceiling, leaving
    /// room for the larger START prefix.
    pub fn for_packet_size(max_packet_size: usize) -> Result<Self> {
        let frame_size = max_packet_size
            .checked_sub(START_FRAME_OVERHEAD)
            .ok_or(ProtocolError::InvalidFrameSize(max_packet_size))?;
        Self::new(frame_size)
    }

    pub fn frame_size(&self) -> usize {
        self.frame_size
    }

    /// Number of frames a stream of `len` bytes needs. Never zero.
    #[inline]
    pub fn frame_count(&self, len: usize) -> usize {
        len.div_ceil(self.frame_size).max(1)
    }

    /// Split `header ++ payload` into frames for `session_id`.
    ///
    /// Frame 0 carries START and the header length, the last frame carries
    /// END. An empty message still yields one START|END frame.
    ///
    /// # Errors
    /// Returns `ProtocolError::MessageTooLarge` if the header does not fit a
    /// `u32` or the stream needs more frames than a `u16` index can address.
    pub fn fragment(&self, header: &[u8], payload: &[u8], session_id: u8) -> Result<Vec<Frame>> {
        let total = header.len() + payload.len();
        let header_length =
            u32::try_from(header.len()).map_err(|_| ProtocolError::MessageTooLarge(total))?;

        let count = self.frame_count(total);
        if count > MAX_FRAMES_PER_MESSAGE {
            return Err(ProtocolError::MessageTooLarge(total));
        }

        let mut data = BytesMut::with_capacity(total);
        data.extend_from_slice(header);
        data.extend_from_slice(payload);
        let data: Bytes = data.freeze();

        let last = count - 1;
        let mut frames = Vec::with_capacity(count);
        for i in 0..count {
            let mut message_type = MessageType::CONTINUATION;
            if i == 0 {
                message_type = message_type | MessageType::START;
            }
            if i == last {
                message_type = message_type | MessageType::END;
            }

            let begin = i * self.frame_size;
            let end = total.min(begin + self.frame_size);
            frames.push(Frame::new(
                message_type,
                session_id,
                i as u16,
                (i == 0).then_some(header_length),
                data.slice(begin..end),
            ));
        }

        trace!(
            session_id,
            frames = count,
            bytes = total,
            frame_size = self.frame_size,
            "Message fragmented"
        );
        let metrics = global_metrics();
        metrics.message_fragmented(total as u64);
        metrics.frames_encoded(count as u64);

        Ok(frames)
    }

    /// Fragment and serialize in one step, ready for the transport.
    pub fn fragment_encoded(
        &self,
        header: &[u8],
        payload: &[u8],
        session_id: u8,
    ) -> Result<Vec<Bytes>> {
        Ok(self
            .fragment(header, payload, session_id)?
            .iter()
            .map(Frame::to_bytes)
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_frame_size_rejected() {
        assert!(matches!(
            Fragmenter::new(0),
            Err(ProtocolError::InvalidFrameSize(0))
        ));
        assert!(Fragmenter::for_packet_size(8).is_err());
        assert_eq!(Fragmenter::for_packet_size(64).unwrap().frame_size(), 56);
    }

    #[test]
    fn test_single_frame_flags() {
        let frames = Fragmenter::new(60)
            .unwrap()
            .fragment(b"", b"0123456789", 3)
            .unwrap();

        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].message_type, MessageType::SINGLE);
        assert_eq!(frames[0].header_length, Some(0));
        assert_eq!(frames[0].session_id, 3);
        assert_eq!(&frames[0].chunk[..], b"0123456789");
    }

    #[test]
    fn test_empty_message_still_one_frame() {
        let frames = Fragmenter::new(60).unwrap().fragment(b"", b"", 0).unwrap();
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].message_type, MessageType::SINGLE);
        assert!(frames[0].chunk.is_empty());
    }

    #[test]
    fn test_multi_frame_split() {
        let payload: Vec<u8> = (0..100).collect();
        let frames = Fragmenter::new(60)
            .unwrap()
            .fragment(b"", &payload, 1)
            .unwrap();

        assert_eq!(frames.len(), 2);
        assert_eq!(frames[0].message_type, MessageType::START);
        assert_eq!(frames[1].message_type, MessageType::END);
        assert_eq!(frames[0].chunk.len(), 60);
        assert_eq!(frames[1].chunk.len(), 40);
        assert_eq!(frames[1].header_length, None);
        assert_eq!(frames[1].frame_index, 1);
    }

    #[test]
    fn test_header_spans_frames() {
        let frames = Fragmenter::new(4)
            .unwrap()
            .fragment(b"headerXY", b"pay", 9)
            .unwrap();

        assert_eq!(frames.len(), 3);
        assert_eq!(frames[0].header_length, Some(8));
        assert_eq!(&frames[0].chunk[..], b"head");
        assert_eq!(&frames[1].chunk[..], b"erXY");
        assert_eq!(&frames[2].chunk[..], b"pay");
        assert_eq!(frames[1].message_type, MessageType::CONTINUATION);
    }

    #[test]
    fn test_exact_multiple_has_no_trailing_empty_frame() {
        let frames = Fragmenter::new(5)
            .unwrap()
            .fragment(b"", &[7u8; 10], 0)
            .unwrap();
        assert_eq!(frames.len(), 2);
        assert!(frames[1].message_type.is_end());
        assert_eq!(frames[1].chunk.len(), 5);
    }

    #[test]
    fn test_too_many_frames_rejected() {
        let payload = vec![0u8; MAX_FRAMES_PER_MESSAGE + 1];
        let result = Fragmenter::new(1).unwrap().fragment(b"", &payload, 0);
        assert!(matches!(result, Err(ProtocolError::MessageTooLarge(_))));
    }

    #[test]
    fn test_encoded_frames_respect_packet_ceiling() {
        let fragmenter = Fragmenter::for_packet_size(32).unwrap();
        let encoded = fragmenter
            .fragment_encoded(b"hdr", &[0xAB; 200], 5)
            .unwrap();

        assert!(encoded.iter().all(|packet| packet.len() <= 32));
        assert_eq!(encoded[0].len(), 32);
    }
}
