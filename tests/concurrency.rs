#![allow(clippy::unwrap_used, clippy::expect_used)]
//! Concurrent dispatch into one shared session table

use segment_protocol::protocol::fragmenter::Fragmenter;
use segment_protocol::protocol::session_table::SessionTable;
use std::sync::Arc;

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn concurrent_dispatch_many_endpoints() {
    use tokio::task::JoinSet;

    let table = Arc::new(SessionTable::<u32>::with_limits(4095, 10_000));
    let fragmenter = Fragmenter::new(24).unwrap();
    let messages_per_endpoint = 200usize;

    let mut tasks = JoinSet::new();
    for endpoint in 0..16u32 {
        let table = table.clone();
        tasks.spawn(async move {
            let mut delivered = 0usize;
            for i in 0..messages_per_endpoint {
                let session_id = (i % 256) as u8;
                let payload = vec![(endpoint as u8) ^ (i as u8); 10 + (i % 90)];
                let header = format!("ep{endpoint}-msg{i}");
                let frames = fragmenter
                    .fragment(header.as_bytes(), &payload, session_id)
                    .unwrap();

                for frame in frames.iter().rev() {
                    if let Some(message) = table.dispatch(&endpoint, &frame.to_bytes()).unwrap() {
                        assert_eq!(&message.header()[..], header.as_bytes());
                        assert_eq!(&message.payload()[..], &payload[..]);
                        delivered += 1;
                    }
                }
            }
            delivered
        });
    }

    let mut total = 0;
    while let Some(res) = tasks.join_next().await {
        total += res.unwrap();
    }

    assert_eq!(total, 16 * messages_per_endpoint);
    assert!(table.is_empty().unwrap());
}

#[test]
fn concurrent_interleaved_sessions_same_endpoint() {
    let table = Arc::new(SessionTable::<u8>::default());
    let fragmenter = Fragmenter::new(8).unwrap();

    let handles: Vec<_> = (0..8u8)
        .map(|session_id| {
            let table = table.clone();
            std::thread::spawn(move || {
                let payload = vec![session_id; 300];
                let frames = fragmenter.fragment(b"", &payload, session_id).unwrap();
                let mut result = None;
                for frame in &frames {
                    if let Some(message) = table.dispatch(&1, &frame.to_bytes()).unwrap() {
                        result = Some(message);
                    }
                }
                let message = result.expect("session should complete");
                assert!(message.payload().iter().all(|b| *b == session_id));
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }
    assert!(table.is_empty().unwrap());
}
