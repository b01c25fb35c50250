use std::time::Duration;

use coap_core::option::number;
use coap_core::{BlockInfo, EngineConfig, Method, ResponseCode};

use crate::*;

// ══════════════════════════════════════════════════════════════════════════════
//  End-to-end upload scenarios (64-byte blocks)
// ══════════════════════════════════════════════════════════════════════════════

/// Three blocks, the last one short. Every block is acknowledged with its
/// own BLOCK1 option; the final one completes the upload.
#[tokio::test]
async fn three_block_upload_completes() {
    let (endpoint, recording) = start(&EngineConfig::default(), Behavior::default()).await;

    let first = send(&endpoint, block(Method::Put, 0, true, 64)).await;
    assert_eq!(first.code(), ResponseCode::CONTINUE);
    assert_eq!(
        BlockInfo::from_options(first.options(), number::BLOCK1),
        Some(BlockInfo::new(0, true, 64))
    );

    let second = send(&endpoint, block(Method::Put, 64, true, 64)).await;
    assert_eq!(second.code(), ResponseCode::CONTINUE);

    let last = send(&endpoint, block(Method::Put, 128, false, 50)).await;
    assert_eq!(last.code(), ResponseCode::CHANGED);
    assert_eq!(
        BlockInfo::from_options(last.options(), number::BLOCK1),
        Some(BlockInfo::new(128, false, 64))
    );

    assert_eq!(
        recording.events(),
        [
            Event::Start,
            Event::Data(64),
            Event::Data(64),
            Event::Data(50),
            Event::End(true),
        ]
    );
    assert_eq!(recording.completed(), [payload(178)]);
}

/// A retransmitted block is acknowledged again but not delivered twice.
#[tokio::test]
async fn retransmitted_block_is_delivered_once() {
    let (endpoint, recording) = start(&EngineConfig::default(), Behavior::default()).await;

    send(&endpoint, block(Method::Put, 0, true, 64)).await;
    send(&endpoint, block(Method::Put, 64, true, 64)).await;
    let again = send(&endpoint, block(Method::Put, 64, true, 64)).await;

    assert_eq!(again.code(), ResponseCode::CONTINUE);
    assert_eq!(recording.data_calls(), 2);

    let last = send(&endpoint, block(Method::Put, 128, false, 10)).await;
    assert_eq!(last.code(), ResponseCode::CHANGED);
    assert_eq!(recording.completed(), [payload(138)]);
}

/// Skipping ahead aborts the upload with 4.02 Bad Option.
#[tokio::test]
async fn gap_aborts_upload() {
    let (endpoint, recording) = start(&EngineConfig::default(), Behavior::default()).await;

    send(&endpoint, block(Method::Put, 0, true, 64)).await;
    let response = send(&endpoint, block(Method::Put, 192, true, 64)).await;

    assert_eq!(response.code(), ResponseCode::BAD_OPTION);
    assert!(response.options().find(number::BLOCK1).is_none());
    assert_eq!(
        recording.events(),
        [Event::Start, Event::Data(64), Event::End(false)]
    );

    // The next block of the old transfer is out of order too.
    let response = send(&endpoint, block(Method::Put, 64, true, 64)).await;
    assert_eq!(response.code(), ResponseCode::BAD_OPTION);
    assert!(recording.completed().is_empty());
}

/// A stalled upload is ended after three minutes; a new one starts cleanly.
#[tokio::test(start_paused = true)]
async fn stalled_upload_times_out() {
    let (endpoint, recording) = start(&EngineConfig::default(), Behavior::default()).await;

    send(&endpoint, block(Method::Put, 0, true, 64)).await;
    tokio::time::sleep(Duration::from_secs(170)).await;
    assert_eq!(recording.ends(), Vec::<bool>::new());

    tokio::time::sleep(Duration::from_secs(11)).await;
    assert_eq!(recording.ends(), [false]);

    tokio::time::sleep(Duration::from_secs(600)).await;
    assert_eq!(recording.ends(), [false]);

    send(&endpoint, block(Method::Put, 0, true, 64)).await;
    let last = send(&endpoint, block(Method::Put, 64, false, 1)).await;
    assert_eq!(last.code(), ResponseCode::CHANGED);
    assert_eq!(recording.completed(), [payload(65)]);
}

/// Each accepted block restarts the timeout.
#[tokio::test(start_paused = true)]
async fn steady_upload_never_times_out() {
    let mut config = EngineConfig::default();
    config.block1.transfer_timeout_secs = 10;
    let (endpoint, recording) = start(&config, Behavior::default()).await;

    for i in 0..5u64 {
        send(&endpoint, block(Method::Put, i * 64, true, 64)).await;
        tokio::time::sleep(Duration::from_secs(8)).await;
    }
    send(&endpoint, block(Method::Put, 5 * 64, false, 64)).await;

    assert_eq!(recording.ends(), [true]);
    assert_eq!(recording.completed(), [payload(384)]);
}
