#![no_main]

use libfuzzer_sys::fuzz_target;
use segment_protocol::Frame;

fuzz_target!(|data: &[u8]| {
    // Decoding must never panic; whatever decodes must re-encode identically
    if let Ok(frame) = Frame::from_bytes(data) {
        assert_eq!(&frame.to_bytes()[..], data);
    }
});
