//! Live channel against a local tokio-tungstenite server.
//!
//! Runs on the real clock with short reconnect delays.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use futures_util::stream::Stream;
use futures_util::{SinkExt, StreamExt};
use serde_json::{json, Value};
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio::time::timeout;
use tokio_tungstenite::accept_async;
use tokio_tungstenite::tungstenite::Message;

use market_sync::error::ChannelError;
use market_sync::shared::Topic;
use market_sync::ws::native::LiveChannel;
use market_sync::ws::{ChannelConfig, ChannelEvent, ConnectionState};

const TEST_TIMEOUT: Duration = Duration::from_secs(5);

fn fast_config(url: &str) -> ChannelConfig {
    ChannelConfig {
        base_reconnect_delay_ms: 10,
        max_reconnect_delay_ms: 50,
        reconnect_jitter_ms: 0,
        connect_timeout_ms: 2_000,
        ..ChannelConfig::new(url)
    }
}

// ─── Test server ─────────────────────────────────────────────────────────────

/// Accepts websocket connections, records every text frame as
/// `(connection index, json)` and lets the test push frames to a connection.
struct WsServer {
    url: String,
    inbox: mpsc::UnboundedReceiver<(usize, Value)>,
    conns: Arc<Mutex<Vec<mpsc::UnboundedSender<Message>>>>,
    accepted: Arc<AtomicUsize>,
}

impl WsServer {
    async fn start() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = format!("ws://{}", listener.local_addr().unwrap());
        let (inbox_tx, inbox) = mpsc::unbounded_channel();
        let conns: Arc<Mutex<Vec<mpsc::UnboundedSender<Message>>>> = Arc::default();
        let accepted = Arc::new(AtomicUsize::new(0));

        let conns_task = conns.clone();
        let accepted_task = accepted.clone();
        tokio::spawn(async move {
            while let Ok((stream, _)) = listener.accept().await {
                let Ok(ws) = accept_async(stream).await else {
                    continue;
                };
                let idx = accepted_task.fetch_add(1, Ordering::SeqCst);
                let (out_tx, out_rx) = mpsc::unbounded_channel();
                conns_task.lock().unwrap().push(out_tx);
                tokio::spawn(serve_conn(idx, ws, inbox_tx.clone(), out_rx));
            }
        });

        Self {
            url,
            inbox,
            conns,
            accepted,
        }
    }

    fn accepted(&self) -> usize {
        self.accepted.load(Ordering::SeqCst)
    }

    fn push(&self, conn: usize, frame: Message) {
        let conns = self.conns.lock().unwrap();
        conns[conn].send(frame).unwrap();
    }

    fn push_json(&self, conn: usize, value: Value) {
        self.push(conn, Message::Text(value.to_string().into()));
    }

    async fn recv(&mut self) -> (usize, Value) {
        timeout(TEST_TIMEOUT, self.inbox.recv())
            .await
            .expect("timed out waiting for a client frame")
            .expect("server inbox closed")
    }

    /// Assert nothing else arrives within a short quiet period.
    async fn assert_quiet(&mut self) {
        tokio::time::sleep(Duration::from_millis(150)).await;
        assert!(self.inbox.try_recv().is_err(), "unexpected extra frame");
    }
}

async fn serve_conn(
    idx: usize,
    ws: tokio_tungstenite::WebSocketStream<tokio::net::TcpStream>,
    inbox: mpsc::UnboundedSender<(usize, Value)>,
    mut out: mpsc::UnboundedReceiver<Message>,
) {
    let (mut sink, mut source) = ws.split();
    loop {
        tokio::select! {
            msg = source.next() => match msg {
                Some(Ok(Message::Text(text))) => {
                    let value: Value = serde_json::from_str(text.as_str()).unwrap();
                    let _ = inbox.send((idx, value));
                }
                Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                Some(Ok(_)) => {}
            },
            frame = out.recv() => match frame {
                Some(frame) => {
                    let closing = matches!(frame, Message::Close(_));
                    if sink.send(frame).await.is_err() || closing {
                        break;
                    }
                }
                None => break,
            },
        }
    }
}

fn subscribe_frame(topic: &str) -> Value {
    json!({"type": "subscribe", "topic": topic})
}

/// Accepts TCP connections and holds them open without ever answering the
/// websocket handshake.
async fn silent_listener() -> (String, Arc<AtomicUsize>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let url = format!("ws://{}", listener.local_addr().unwrap());
    let accepted = Arc::new(AtomicUsize::new(0));
    let counter = accepted.clone();
    tokio::spawn(async move {
        let mut held = Vec::new();
        while let Ok((stream, _)) = listener.accept().await {
            counter.fetch_add(1, Ordering::SeqCst);
            held.push(stream);
        }
    });
    (url, accepted)
}

/// Accepts TCP connections and hangs up right away.
async fn hangup_listener() -> (String, Arc<AtomicUsize>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let url = format!("ws://{}", listener.local_addr().unwrap());
    let accepted = Arc::new(AtomicUsize::new(0));
    let counter = accepted.clone();
    tokio::spawn(async move {
        while let Ok((stream, _)) = listener.accept().await {
            counter.fetch_add(1, Ordering::SeqCst);
            drop(stream);
        }
    });
    (url, accepted)
}

// ─── Event helpers ───────────────────────────────────────────────────────────

async fn next_matching<S>(events: &mut S, predicate: impl Fn(&ChannelEvent) -> bool) -> ChannelEvent
where
    S: Stream<Item = ChannelEvent> + Unpin,
{
    timeout(TEST_TIMEOUT, async {
        while let Some(ev) = events.next().await {
            if predicate(&ev) {
                return ev;
            }
        }
        panic!("event stream ended without a matching event");
    })
    .await
    .expect("timed out waiting for matching event")
}

async fn wait_for_state<S>(events: &mut S, state: ConnectionState)
where
    S: Stream<Item = ChannelEvent> + Unpin,
{
    next_matching(events, |ev| *ev == ChannelEvent::StateChanged(state)).await;
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[tokio::test]
async fn replays_subscriptions_in_order_exactly_once() {
    let mut server = WsServer::start().await;
    let mut channel = LiveChannel::new(fast_config(&server.url));
    channel.subscribe("a");
    channel.subscribe("b");
    channel.subscribe("a");

    channel.connect().await.unwrap();

    assert_eq!(server.recv().await, (0, subscribe_frame("a")));
    assert_eq!(server.recv().await, (0, subscribe_frame("b")));
    server.assert_quiet().await;
    assert!(channel.is_connected());

    channel.disconnect().await.unwrap();
}

#[tokio::test]
async fn subscribe_while_connected_is_sent_immediately() {
    let mut server = WsServer::start().await;
    let mut channel = LiveChannel::new(fast_config(&server.url));
    let mut events = channel.events();

    channel.connect().await.unwrap();
    wait_for_state(&mut events, ConnectionState::Connected).await;

    assert!(channel.subscribe("dominance"));
    assert!(!channel.subscribe("dominance"));
    assert_eq!(server.recv().await, (0, subscribe_frame("dominance")));
    server.assert_quiet().await;

    assert!(channel.unsubscribe("dominance"));
    assert_eq!(
        server.recv().await,
        (0, json!({"type": "unsubscribe", "topic": "dominance"}))
    );

    channel.disconnect().await.unwrap();
}

#[tokio::test]
async fn only_subscribed_topics_are_delivered() {
    let mut server = WsServer::start().await;
    let mut channel = LiveChannel::new(fast_config(&server.url));
    let mut events = channel.events();
    channel.subscribe("altcoin-season");

    channel.connect().await.unwrap();
    assert_eq!(server.recv().await, (0, subscribe_frame("altcoin-season")));

    server.push_json(0, json!({"type": "dominance", "payload": {"btc": 52.4}}));
    server.push_json(0, json!({"type": "altcoin-season", "data": {"value": 42}}));

    let ev = next_matching(&mut events, |ev| matches!(ev, ChannelEvent::Message { .. })).await;
    assert_eq!(
        ev,
        ChannelEvent::Message {
            topic: Topic::new("altcoin-season"),
            payload: json!({"value": 42}),
        }
    );

    channel.disconnect().await.unwrap();
}

#[tokio::test]
async fn malformed_frames_surface_protocol_errors() {
    let mut server = WsServer::start().await;
    let mut channel = LiveChannel::new(fast_config(&server.url));
    let mut events = channel.events();
    channel.subscribe("a");

    channel.connect().await.unwrap();
    server.recv().await;

    server.push(0, Message::Text("not json".into()));
    let ev = next_matching(&mut events, |ev| matches!(ev, ChannelEvent::Error(_))).await;
    assert!(matches!(ev, ChannelEvent::Error(ChannelError::ProtocolError(_))));
    assert!(channel.is_connected());

    channel.disconnect().await.unwrap();
}

#[tokio::test]
async fn gives_up_after_five_failed_attempts() {
    let (url, attempts) = hangup_listener().await;

    let mut channel = LiveChannel::new(fast_config(&url));
    let mut events = channel.events();
    channel.connect().await.unwrap();

    let ev = next_matching(&mut events, |ev| {
        matches!(ev, ChannelEvent::Error(ChannelError::MaxRetriesExceeded { .. }))
    })
    .await;
    assert_eq!(
        ev,
        ChannelEvent::Error(ChannelError::MaxRetriesExceeded { attempts: 5 })
    );
    assert_eq!(attempts.load(Ordering::SeqCst), 5);
    assert_eq!(channel.state(), ConnectionState::Disconnected);

    tokio::time::sleep(Duration::from_millis(200)).await;
    assert_eq!(attempts.load(Ordering::SeqCst), 5);

    // A fresh connect starts a new lifecycle with the counter reset.
    channel.connect().await.unwrap();
    next_matching(&mut events, |ev| {
        matches!(ev, ChannelEvent::Error(ChannelError::MaxRetriesExceeded { .. }))
    })
    .await;
    assert_eq!(attempts.load(Ordering::SeqCst), 10);
}

#[tokio::test]
async fn connect_and_disconnect_are_idempotent() {
    let mut server = WsServer::start().await;
    let mut channel = LiveChannel::new(fast_config(&server.url));
    let mut events = channel.events();
    channel.subscribe("a");

    channel.connect().await.unwrap();
    channel.connect().await.unwrap();
    wait_for_state(&mut events, ConnectionState::Connected).await;
    channel.connect().await.unwrap();

    assert_eq!(server.recv().await, (0, subscribe_frame("a")));
    server.assert_quiet().await;
    assert_eq!(server.accepted(), 1);

    channel.disconnect().await.unwrap();
    channel.disconnect().await.unwrap();
    assert_eq!(channel.state(), ConnectionState::Disconnected);
}

#[tokio::test]
async fn server_close_triggers_reconnect_and_replay() {
    let mut server = WsServer::start().await;
    let mut channel = LiveChannel::new(fast_config(&server.url));
    let mut events = channel.events();
    channel.subscribe("a");
    channel.subscribe("b");

    channel.connect().await.unwrap();
    assert_eq!(server.recv().await, (0, subscribe_frame("a")));
    assert_eq!(server.recv().await, (0, subscribe_frame("b")));

    server.push(0, Message::Close(None));
    let ev = next_matching(&mut events, |ev| matches!(ev, ChannelEvent::Closed { .. })).await;
    assert!(matches!(ev, ChannelEvent::Closed { .. }));

    assert_eq!(server.recv().await, (1, subscribe_frame("a")));
    assert_eq!(server.recv().await, (1, subscribe_frame("b")));
    server.assert_quiet().await;
    assert_eq!(server.accepted(), 2);

    channel.disconnect().await.unwrap();
}

#[tokio::test]
async fn subscriptions_survive_manual_disconnect() {
    let mut server = WsServer::start().await;
    let mut channel = LiveChannel::new(fast_config(&server.url));
    channel.subscribe("a");

    channel.connect().await.unwrap();
    assert_eq!(server.recv().await, (0, subscribe_frame("a")));

    channel.disconnect().await.unwrap();
    assert_eq!(channel.state(), ConnectionState::Disconnected);

    // Deferred while disconnected.
    channel.subscribe("b");
    server.assert_quiet().await;
    assert_eq!(channel.subscriptions(), vec![Topic::new("a"), Topic::new("b")]);

    channel.connect().await.unwrap();
    assert_eq!(server.recv().await, (1, subscribe_frame("a")));
    assert_eq!(server.recv().await, (1, subscribe_frame("b")));
    server.assert_quiet().await;

    channel.disconnect().await.unwrap();
}

#[tokio::test]
async fn stalled_handshake_counts_as_failed_attempt() {
    let (url, accepted) = silent_listener().await;
    let mut channel = LiveChannel::new(ChannelConfig {
        connect_timeout_ms: 100,
        ..fast_config(&url)
    });
    let mut events = channel.events();
    channel.connect().await.unwrap();

    let ev = next_matching(&mut events, |ev| matches!(ev, ChannelEvent::Error(_))).await;
    assert_eq!(
        ev,
        ChannelEvent::Error(ChannelError::ConnectionFailed("Connection timeout".into()))
    );

    let ev = next_matching(&mut events, |ev| {
        matches!(ev, ChannelEvent::Error(ChannelError::MaxRetriesExceeded { .. }))
    })
    .await;
    assert_eq!(
        ev,
        ChannelEvent::Error(ChannelError::MaxRetriesExceeded { attempts: 5 })
    );
    assert_eq!(accepted.load(Ordering::SeqCst), 5);
    assert_eq!(channel.state(), ConnectionState::Disconnected);
}

#[tokio::test]
async fn disconnect_cancels_pending_backoff() {
    let (url, accepted) = hangup_listener().await;
    let mut channel = LiveChannel::new(ChannelConfig {
        base_reconnect_delay_ms: 60_000,
        max_reconnect_delay_ms: 60_000,
        ..fast_config(&url)
    });
    let mut events = channel.events();
    channel.connect().await.unwrap();

    wait_for_state(&mut events, ConnectionState::Reconnecting).await;
    assert_eq!(accepted.load(Ordering::SeqCst), 1);

    timeout(Duration::from_secs(1), channel.disconnect())
        .await
        .expect("disconnect waited on the backoff timer")
        .unwrap();
    assert_eq!(channel.state(), ConnectionState::Disconnected);

    tokio::time::sleep(Duration::from_millis(200)).await;
    assert_eq!(accepted.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn give_up_event_survives_a_full_event_buffer() {
    let (url, accepted) = hangup_listener().await;
    let mut channel = LiveChannel::new(ChannelConfig {
        event_capacity: 1,
        ..fast_config(&url)
    });
    channel.connect().await.unwrap();

    // Nobody reads while the five attempts run, so intermediate events overflow.
    timeout(TEST_TIMEOUT, async {
        while accepted.load(Ordering::SeqCst) < 5 || channel.state() != ConnectionState::Disconnected {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("channel never gave up");

    let mut events = channel.events();
    let ev = next_matching(&mut events, |ev| {
        matches!(ev, ChannelEvent::Error(ChannelError::MaxRetriesExceeded { .. }))
    })
    .await;
    assert_eq!(
        ev,
        ChannelEvent::Error(ChannelError::MaxRetriesExceeded { attempts: 5 })
    );

    // A blocked final event does not keep the next lifecycle from starting.
    channel.connect().await.unwrap();
    timeout(TEST_TIMEOUT, async {
        while accepted.load(Ordering::SeqCst) < 6 {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("reconnect after give-up did not start a new lifecycle");
    channel.disconnect().await.unwrap();
}
