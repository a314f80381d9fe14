use crate::core::frame::Frame;
use crate::error::{ProtocolError, Result};
use bytes::BytesMut;
use tokio_util::codec::{Decoder, Encoder};

/// Datagram codec for [`Frame`]s.
///
/// The radio link delivers whole packets, so one buffer is one frame. The
/// decoder always consumes the buffer it is handed, including on error, which
/// lets a `UdpFramed` stream carry on after a malformed packet.
#[derive(Debug, Clone, Copy, Default)]
pub struct FrameCodec {
    max_packet_size: Option<usize>,
}

impl FrameCodec {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reject frames whose encoded size exceeds the link's packet ceiling.
    pub fn with_max_packet_size(max_packet_size: usize) -> Self {
        Self {
            max_packet_size: Some(max_packet_size),
        }
    }

    pub fn max_packet_size(&self) -> Option<usize> {
        self.max_packet_size
    }
}

impl Decoder for FrameCodec {
    type Item = Frame;
    type Error = ProtocolError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Frame>> {
        if src.is_empty() {
            return Ok(None);
        }

        let datagram = src.split().freeze();
        if let Some(max) = self.max_packet_size {
            if datagram.len() > max {
                return Err(ProtocolError::OversizedPacket(datagram.len()));
            }
        }

        Frame::decode(datagram).map(Some)
    }
}

impl Encoder<Frame> for FrameCodec {
    type Error = ProtocolError;

    fn encode(&mut self, frame: Frame, dst: &mut BytesMut) -> Result<()> {
        <Self as Encoder<&Frame>>::encode(self, &frame, dst)
    }
}

impl Encoder<&Frame> for FrameCodec {
    type Error = ProtocolError;

    fn encode(&mut self, frame: &Frame, dst: &mut BytesMut) -> Result<()> {
        let len = frame.encoded_len();
        if let Some(max) = self.max_packet_size {
            if len > max {
                return Err(ProtocolError::OversizedPacket(len));
            }
        }

        frame.write_to(dst);
        Ok(())
    }
}
