use coap_core::config::Block1Settings;
use coap_core::{EngineConfig, Method, Request, Response, ResponseBuilder, ResponseCode};
use coap_services::{BlockwiseHandler, ResourceHandler, TimerBinding};

use crate::*;

// ══════════════════════════════════════════════════════════════════════════════
//  Transfer state properties, observed on a handler driven directly
// ══════════════════════════════════════════════════════════════════════════════

fn handler(behavior: Behavior) -> (BlockwiseHandler<RecordingServer>, Recording) {
    init_tracing();
    let (server, recording) = recording(behavior);
    (
        BlockwiseHandler::put(server, &Block1Settings::default()),
        recording,
    )
}

async fn push(handler: &mut BlockwiseHandler<RecordingServer>, request: Request) -> Response {
    handler
        .handle(&request, ResponseBuilder::new())
        .await
        .expect("blockwise handlers answer every request")
}

#[tokio::test]
async fn offsets_stay_ordered_while_active() {
    let (mut handler, _recording) = handler(Behavior::default());

    let mut total = 0u64;
    for i in 0..8u64 {
        push(&mut handler, block(Method::Put, i * 64, true, 64)).await;
        total += 64;

        let state = handler.processor().state();
        assert!(state.is_started());
        assert_eq!(state.current_offset(), i * 64);
        assert_eq!(state.expected_next_offset(), total);
        assert!(state.current_offset() < state.expected_next_offset());
    }
}

/// Only non-first blocks can repeat; a repeated first block restarts.
#[tokio::test]
async fn duplicates_never_reach_on_data() {
    let (mut handler, recording) = handler(Behavior::default());

    push(&mut handler, block(Method::Put, 0, true, 64)).await;
    for offset in [64u64, 128] {
        push(&mut handler, block(Method::Put, offset, true, 64)).await;
        for _ in 0..5 {
            let again = push(&mut handler, block(Method::Put, offset, true, 64)).await;
            assert!(again.autogenerate_blockwise());
        }
    }

    assert_eq!(recording.data_calls(), 3);
    assert!(recording.ends().is_empty());
    assert_eq!(handler.processor().state().current_offset(), 128);
    assert_eq!(handler.processor().state().expected_next_offset(), 192);
}

/// Re-sending the first block of the current transfer is a restart, not a
/// duplicate: the first block always begins a new transfer.
#[tokio::test]
async fn restart_ends_previous_transfer_first() {
    let (mut handler, recording) = handler(Behavior::default());

    push(&mut handler, block(Method::Put, 0, true, 64)).await;
    push(&mut handler, block(Method::Put, 64, true, 64)).await;
    push(&mut handler, block(Method::Put, 0, true, 64)).await;
    push(&mut handler, block(Method::Put, 64, false, 8)).await;

    assert_eq!(
        recording.events(),
        [
            Event::Start,
            Event::Data(64),
            Event::Data(64),
            Event::End(false),
            Event::Start,
            Event::Data(64),
            Event::Data(8),
            Event::End(true),
        ]
    );
    assert_eq!(recording.completed(), [payload(72)]);
}

#[tokio::test]
async fn any_unexpected_offset_aborts() {
    for bad in [128u64, 192, 1024, 4096] {
        let (mut handler, recording) = handler(Behavior::default());

        push(&mut handler, block(Method::Put, 0, true, 64)).await;
        push(&mut handler, block(Method::Put, 64, true, 64)).await;
        let response = push(&mut handler, block(Method::Put, bad + 64, true, 64)).await;

        assert_eq!(response.code(), ResponseCode::BAD_OPTION, "offset {}", bad + 64);
        assert_eq!(recording.ends(), [false]);
        let state = handler.processor().state();
        assert!(!state.is_started());
        assert_eq!(state.current_offset(), 0);
        assert_eq!(state.expected_next_offset(), 0);
        assert!(!state.is_timer_armed());
    }
}

/// With 16-byte blocks, an offset inside the last accepted block is
/// neither new nor a repeat.
#[tokio::test]
async fn offset_behind_current_block_aborts() {
    let (mut handler, recording) = handler(Behavior::default());

    for i in 0..4u64 {
        push(&mut handler, block_sized(Method::Put, i * 16, true, 16, 16)).await;
    }
    let response = push(&mut handler, block_sized(Method::Put, 16, true, 16, 16)).await;

    assert_eq!(response.code(), ResponseCode::BAD_OPTION);
    assert_eq!(recording.ends(), [false]);
}

#[tokio::test]
async fn single_block_upload() {
    let (mut handler, recording) = handler(Behavior::default());

    let response = push(&mut handler, block(Method::Put, 0, false, 12)).await;

    assert!(response.autogenerate_blockwise());
    assert_eq!(
        recording.events(),
        [Event::Start, Event::Data(12), Event::End(true)]
    );
    assert_eq!(recording.completed(), [payload(12)]);
}

#[tokio::test]
async fn expiry_after_completion_is_ignored() {
    let (mut handler, recording) = handler(Behavior::default());
    let (binding, _expiries) = TimerBinding::channel(0);
    handler.bind_timer(binding);

    push(&mut handler, block(Method::Put, 0, true, 64)).await;
    let armed = handler.processor().state().generation();
    push(&mut handler, block(Method::Put, 64, false, 64)).await;

    handler.on_timer(armed).await;

    assert_eq!(recording.ends(), [true]);
    assert!(!handler.processor().state().is_started());
}

#[tokio::test(start_paused = true)]
async fn expiry_for_replaced_timer_is_ignored() {
    let settings = EngineConfig::default().block1;
    let (server, recording) = recording(Behavior::default());
    let mut handler = BlockwiseHandler::put(server, &settings);
    let (binding, mut expiries) = TimerBinding::channel(0);
    handler.bind_timer(binding);

    push(&mut handler, block(Method::Put, 0, true, 64)).await;
    let stale = handler.processor().state().generation();
    push(&mut handler, block(Method::Put, 64, true, 64)).await;

    handler.on_timer(stale).await;
    assert!(recording.ends().is_empty());
    assert!(handler.processor().state().is_started());

    // The live timer still works.
    let armed_at = tokio::time::Instant::now();
    let expired = expiries.recv().await.expect("timer fires");
    assert!(expired.generation > stale);
    assert!(armed_at.elapsed() >= settings.transfer_timeout());
    handler.on_timer(expired.generation).await;
    assert_eq!(recording.ends(), [false]);
}

#[tokio::test]
async fn error_response_from_on_data_is_forwarded() {
    let (mut handler, recording) = handler(Behavior {
        data_response: Some(ResponseCode::REQUEST_ENTITY_TOO_LARGE),
        ..Default::default()
    });

    let response = push(&mut handler, block(Method::Put, 0, true, 64)).await;

    assert_eq!(response.code(), ResponseCode::REQUEST_ENTITY_TOO_LARGE);
    assert!(!handler.processor().state().is_started());
    assert_eq!(recording.events(), [Event::Start, Event::Data(64)]);
}

#[tokio::test]
async fn failing_callback_aborts_with_server_error() {
    let (mut handler, recording) = handler(Behavior {
        fail_data: true,
        ..Default::default()
    });

    let response = push(&mut handler, block(Method::Put, 0, true, 64)).await;

    assert_eq!(response.code(), ResponseCode::INTERNAL_SERVER_ERROR);
    assert_eq!(recording.ends(), [false]);
    assert!(!handler.processor().state().is_started());
}

#[tokio::test]
async fn failing_callback_answers_with_end_response() {
    let (mut handler, recording) = handler(Behavior {
        fail_data: true,
        end_response: Some(ResponseCode::REQUEST_ENTITY_INCOMPLETE),
        ..Default::default()
    });

    let response = push(&mut handler, block(Method::Put, 0, true, 64)).await;

    assert_eq!(response.code(), ResponseCode::REQUEST_ENTITY_INCOMPLETE);
    assert_eq!(
        recording.events(),
        [Event::Start, Event::Data(64), Event::End(false)]
    );
    assert!(!handler.processor().state().is_started());
}

#[tokio::test]
async fn restart_response_from_on_end_is_kept() {
    let (mut handler, recording) = handler(Behavior {
        end_response: Some(ResponseCode::REQUEST_ENTITY_INCOMPLETE),
        ..Default::default()
    });

    push(&mut handler, block(Method::Put, 0, true, 64)).await;
    let response = push(&mut handler, block(Method::Put, 0, true, 64)).await;

    // The abnormal end's error answer wins and also ends the new transfer.
    assert_eq!(response.code(), ResponseCode::REQUEST_ENTITY_INCOMPLETE);
    assert_eq!(recording.ends(), [false]);
    assert!(!handler.processor().state().is_started());
}
