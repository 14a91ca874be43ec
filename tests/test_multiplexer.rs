//! Integration tests for the subscription multiplexer: channel-set
//! bookkeeping, debounced connection rebuilds, event fan-out, and disposal
//! semantics. All tests run against the scripted in-memory transport under a
//! paused tokio clock, so timing assertions are exact.

use pulse_link::{ConnectionOptions, ConnectionState, EventHandlers, RealtimeClient};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::sleep;

mod common;
use common::MockTransport;

fn build_client(transport: &Arc<MockTransport>) -> RealtimeClient {
    RealtimeClient::builder()
        .endpoint("http://pulse.test")
        .project("proj")
        .transport(transport.clone())
        .build()
        .expect("client must build")
}

fn counting_callback(
    hits: &Arc<AtomicU32>,
) -> impl Fn(pulse_link::RealtimeEvent) + Send + Sync + 'static {
    let hits = hits.clone();
    move |_| {
        hits.fetch_add(1, Ordering::SeqCst);
    }
}

/// Let the paused clock run past the debounce window and any queued work.
async fn settle() {
    sleep(Duration::from_millis(50)).await;
}

#[tokio::test(start_paused = true)]
async fn test_single_subscription_connects_with_its_channel() {
    let transport = MockTransport::new();
    let client = build_client(&transport);

    let _sub = client.subscribe(["orders"], |_| {});
    settle().await;

    assert_eq!(transport.open_count(), 1);
    let url = transport.last_url().unwrap();
    assert!(url.starts_with("ws://pulse.test/v1/realtime?project=proj"));
    assert!(url.contains("channels%5B%5D=orders"));
    assert_eq!(client.state(), ConnectionState::Connected);
}

#[tokio::test(start_paused = true)]
async fn test_burst_of_subscribes_coalesces_into_one_connect() {
    let transport = MockTransport::new();
    let client = build_client(&transport);

    let _subs: Vec<_> = (0..5)
        .map(|i| client.subscribe([format!("topic-{}", i)], |_| {}))
        .collect();
    settle().await;

    assert_eq!(
        transport.open_count(),
        1,
        "five registrations in one burst must produce one connect"
    );
    let url = transport.last_url().unwrap();
    for i in 0..5 {
        assert!(url.contains(&format!("channels%5B%5D=topic-{}", i)));
    }
}

#[tokio::test(start_paused = true)]
async fn test_matching_event_reaches_callback_with_payload() {
    let transport = MockTransport::new();
    let client = build_client(&transport);

    let seen: Arc<Mutex<Vec<serde_json::Value>>> = Arc::new(Mutex::new(Vec::new()));
    let seen_clone = seen.clone();
    let _sub = client.subscribe(["orders"], move |event| {
        seen_clone.lock().unwrap().push(event.payload.clone());
    });
    settle().await;

    transport
        .handle(0)
        .send_event(&["orders"], serde_json::json!({"total": 42}));
    settle().await;

    let seen = seen.lock().unwrap();
    assert_eq!(seen.len(), 1, "callback invoked exactly once");
    assert_eq!(seen[0]["total"], 42);
}

#[tokio::test(start_paused = true)]
async fn test_shared_topic_delivers_once_per_subscription() {
    let transport = MockTransport::new();
    let client = build_client(&transport);

    let hits_a = Arc::new(AtomicU32::new(0));
    let hits_b = Arc::new(AtomicU32::new(0));
    let _a = client.subscribe(["shared"], counting_callback(&hits_a));
    let _b = client.subscribe(["shared", "other"], counting_callback(&hits_b));
    settle().await;

    transport.handle(0).send_event(&["shared"], serde_json::json!(null));
    settle().await;

    assert_eq!(hits_a.load(Ordering::SeqCst), 1);
    assert_eq!(hits_b.load(Ordering::SeqCst), 1);
}

#[tokio::test(start_paused = true)]
async fn test_channel_set_tracks_live_subscriptions() {
    let transport = MockTransport::new();
    let client = build_client(&transport);

    let mut a = client.subscribe(["orders", "users"], |_| {});
    let b = client.subscribe(["orders"], |_| {});
    let mut channels = client.active_channels();
    channels.sort();
    assert_eq!(channels, vec!["orders", "users"]);

    // "orders" survives because b still references it.
    a.close();
    assert_eq!(client.active_channels(), vec!["orders"]);
    assert_eq!(client.subscription_count(), 1);

    drop(b);
    assert!(client.active_channels().is_empty());
    assert_eq!(client.subscription_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_queued_event_never_reaches_disposed_subscription() {
    let transport = MockTransport::new();
    let client = build_client(&transport);

    let hits_a = Arc::new(AtomicU32::new(0));
    let hits_b = Arc::new(AtomicU32::new(0));
    let mut sub_a = client.subscribe(["a"], counting_callback(&hits_a));
    let _sub_b = client.subscribe(["b"], counting_callback(&hits_b));
    settle().await;
    assert_eq!(transport.open_count(), 1);

    // Dispose "a", then deliver an "a" event before the rebuild completes.
    sub_a.close();
    assert_eq!(client.active_channels(), vec!["b"]);
    transport.handle(0).send_event(&["a"], serde_json::json!(1));
    settle().await;

    assert_eq!(
        hits_a.load(Ordering::SeqCst),
        0,
        "disposed subscription must not see queued events"
    );

    // The rebuild reconnected with only "b".
    assert_eq!(transport.open_count(), 2);
    let url = transport.last_url().unwrap();
    assert!(url.contains("channels%5B%5D=b"));
    assert!(!url.contains("channels%5B%5D=a"));
}

#[tokio::test(start_paused = true)]
async fn test_disposing_last_subscription_closes_connection() {
    let transport = MockTransport::new();
    let client = build_client(&transport);

    let mut sub = client.subscribe(["orders"], |_| {});
    settle().await;
    assert_eq!(client.state(), ConnectionState::Connected);

    sub.close();
    settle().await;

    assert_eq!(client.state(), ConnectionState::Disconnected);
    assert_eq!(transport.open_count(), 1, "no reconnect after teardown");
    assert_eq!(transport.close_codes(), vec![1008]);
}

#[tokio::test(start_paused = true)]
async fn test_server_error_frame_is_surfaced_and_non_fatal() {
    let transport = MockTransport::new();
    let protocol_errors = Arc::new(AtomicU32::new(0));
    let protocol_errors_clone = protocol_errors.clone();
    let client = RealtimeClient::builder()
        .endpoint("http://pulse.test")
        .project("proj")
        .transport(transport.clone())
        .event_handlers(EventHandlers::new().on_protocol_error(move |signal| {
            assert_eq!(signal.code(), Some(1003));
            protocol_errors_clone.fetch_add(1, Ordering::SeqCst);
        }))
        .build()
        .unwrap();

    let hits = Arc::new(AtomicU32::new(0));
    let _sub = client.subscribe(["orders"], counting_callback(&hits));
    settle().await;

    transport.handle(0).send_error(1003, "missing permission");
    transport.handle(0).send_event(&["orders"], serde_json::json!(null));
    settle().await;

    assert_eq!(protocol_errors.load(Ordering::SeqCst), 1);
    assert_eq!(
        hits.load(Ordering::SeqCst),
        1,
        "events after an error frame still flow"
    );
    assert_eq!(client.state(), ConnectionState::Connected);
    assert_eq!(transport.open_count(), 1, "error frame must not reconnect");
}

#[tokio::test(start_paused = true)]
async fn test_panicking_callback_does_not_stop_sibling_delivery() {
    let transport = MockTransport::new();
    let client = build_client(&transport);

    let hits = Arc::new(AtomicU32::new(0));
    let _bad = client.subscribe(["orders"], |_| panic!("subscriber bug"));
    let _good = client.subscribe(["orders"], counting_callback(&hits));
    settle().await;

    transport.handle(0).send_event(&["orders"], serde_json::json!(null));
    transport.handle(0).send_event(&["orders"], serde_json::json!(null));
    settle().await;

    assert_eq!(
        hits.load(Ordering::SeqCst),
        2,
        "healthy subscription keeps receiving despite sibling panics"
    );
}

#[tokio::test(start_paused = true)]
async fn test_subscribing_more_topics_while_connected_rebuilds() {
    let transport = MockTransport::new();
    let client = build_client(&transport);

    let _a = client.subscribe(["a"], |_| {});
    settle().await;
    assert_eq!(transport.open_count(), 1);

    let _b = client.subscribe(["b"], |_| {});
    settle().await;

    assert_eq!(transport.open_count(), 2, "topic change forces a reconnect");
    let url = transport.last_url().unwrap();
    assert!(url.contains("channels%5B%5D=a"));
    assert!(url.contains("channels%5B%5D=b"));
    // The superseded stream was closed deliberately.
    assert_eq!(transport.close_codes(), vec![1008]);
}

#[tokio::test(start_paused = true)]
async fn test_connection_options_are_respected_for_debounce() {
    let transport = MockTransport::new();
    let client = RealtimeClient::builder()
        .endpoint("http://pulse.test")
        .project("proj")
        .transport(transport.clone())
        .connection_options(
            ConnectionOptions::new().with_debounce_window(Duration::from_millis(100)),
        )
        .build()
        .unwrap();

    let _a = client.subscribe(["a"], |_| {});
    sleep(Duration::from_millis(50)).await;
    assert_eq!(transport.open_count(), 0, "still inside the debounce window");

    // A second registration resets the quiescence timer.
    let _b = client.subscribe(["b"], |_| {});
    sleep(Duration::from_millis(60)).await;
    assert_eq!(transport.open_count(), 0);

    sleep(Duration::from_millis(60)).await;
    assert_eq!(transport.open_count(), 1);
}
