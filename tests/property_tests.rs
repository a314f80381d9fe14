//! Property-based tests using proptest
//!
//! These tests validate fragmentation and reassembly invariants across a wide
//! range of randomly generated messages, frame sizes and arrival orders.

#![allow(clippy::expect_used, clippy::unwrap_used)]

use segment_protocol::core::frame::Frame;
use segment_protocol::protocol::fragmenter::Fragmenter;
use segment_protocol::protocol::reassembler::{Completion, Reassembler};
use segment_protocol::protocol::session_table::SessionTable;
use proptest::prelude::*;

// Property: every frame respects the chunk capacity and the flag layout
proptest! {
    #[test]
    fn prop_fragment_shape(
        header in prop::collection::vec(any::<u8>(), 0..200),
        payload in prop::collection::vec(any::<u8>(), 0..2000),
        frame_size in 1usize..128,
        session_id in any::<u8>(),
    ) {
        let frames = Fragmenter::new(frame_size).unwrap()
            .fragment(&header, &payload, session_id).unwrap();
        let total = header.len() + payload.len();

        prop_assert_eq!(frames.len(), total.div_ceil(frame_size).max(1));
        prop_assert_eq!(frames.iter().map(|f| f.chunk.len()).sum::<usize>(), total);

        let last = frames.len() - 1;
        for (i, frame) in frames.iter().enumerate() {
            prop_assert!(frame.chunk.len() <= frame_size);
            prop_assert_eq!(frame.frame_index as usize, i);
            prop_assert_eq!(frame.session_id, session_id);
            prop_assert_eq!(frame.message_type.is_start(), i == 0);
            prop_assert_eq!(frame.message_type.is_end(), i == last);
        }
        prop_assert_eq!(frames[0].header_length, Some(header.len() as u32));
    }
}

/// A message together with its frames in an arbitrary arrival order.
fn shuffled_message() -> impl Strategy<Value = (Vec<u8>, Vec<u8>, Vec<Frame>)> {
    (
        prop::collection::vec(any::<u8>(), 0..64),
        prop::collection::vec(any::<u8>(), 0..1000),
        1usize..64,
    )
        .prop_flat_map(|(header, payload, frame_size)| {
            let frames = Fragmenter::new(frame_size)
                .unwrap()
                .fragment(&header, &payload, 1)
                .unwrap();
            (Just(header), Just(payload), Just(frames).prop_shuffle())
        })
}

// Property: any arrival order reconstructs the original message exactly
proptest! {
    #[test]
    fn prop_any_order_roundtrip((header, payload, frames) in shuffled_message()) {
        let mut reassembler = Reassembler::with_max_frame_index(u16::MAX);
        let count = frames.len();
        for (n, frame) in frames.into_iter().enumerate() {
            let wire = Frame::from_bytes(&frame.to_bytes()).unwrap();
            let completion = reassembler.add(wire).unwrap();
            if n + 1 < count {
                prop_assert_eq!(completion, Completion::Pending);
            } else {
                prop_assert_eq!(completion, Completion::Complete);
            }
        }

        let message = reassembler.finalize().unwrap();
        prop_assert_eq!(&message.header()[..], &header[..]);
        prop_assert_eq!(&message.payload()[..], &payload[..]);
    }
}

// Property: decoding arbitrary bytes never panics
proptest! {
    #[test]
    fn prop_decode_never_panics(data in prop::collection::vec(any::<u8>(), 0..64)) {
        let _ = Frame::from_bytes(&data);
    }
}

// Property: dispatching arbitrary bytes never panics and never delivers
// a message whose header is longer than what was buffered
proptest! {
    #[test]
    fn prop_dispatch_garbage_is_contained(
        datagrams in prop::collection::vec(prop::collection::vec(any::<u8>(), 0..24), 0..50)
    ) {
        let table = SessionTable::<u8>::with_limits(64, 16);
        for datagram in &datagrams {
            if let Ok(Some(message)) = table.dispatch(&0, datagram) {
                prop_assert!(message.len() <= datagrams.iter().map(Vec::len).sum::<usize>());
            }
        }
        prop_assert!(table.len().unwrap() <= 16);
    }
}

// Property: encoding is deterministic and decode inverts it
proptest! {
    #[test]
    fn prop_encoded_frames_decode_to_themselves(
        payload in prop::collection::vec(any::<u8>(), 0..300),
        frame_size in 1usize..40,
    ) {
        let frames = Fragmenter::new(frame_size).unwrap()
            .fragment(b"hdr", &payload, 42).unwrap();
        for frame in frames {
            let bytes = frame.to_bytes();
            prop_assert_eq!(bytes.len(), frame.encoded_len());
            prop_assert_eq!(Frame::from_bytes(&bytes).unwrap(), frame);
        }
    }
}
