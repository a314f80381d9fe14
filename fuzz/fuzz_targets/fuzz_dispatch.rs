#![no_main]

use libfuzzer_sys::fuzz_target;
use segment_protocol::SessionTable;

fuzz_target!(|data: &[u8]| {
    // First byte picks the datagram length, the rest is a stream of datagrams
    let Some((&len, rest)) = data.split_first() else {
        return;
    };
    let len = usize::from(len.max(1));
    let table = SessionTable::<u8>::with_limits(256, 32);

    for (i, datagram) in rest.chunks(len).enumerate() {
        let _ = table.dispatch(&((i % 3) as u8), datagram);
    }
    assert!(table.len().unwrap() <= 32);
});
