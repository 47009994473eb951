//! Native live channel: `tokio-tungstenite`.
//!
//! - Background tokio task driven by the [`Lifecycle`] state machine
//! - Time-bounded connect attempts, exponential backoff with jitter
//! - Ordered subscription replay on every successful connect
//! - Inbound filtering against the active subscription set
//! - Stream-based event delivery to consumer

use std::collections::HashSet;
use std::pin::Pin;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use futures_util::stream::{SplitSink, SplitStream, Stream};
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

use crate::error::ChannelError;
use crate::shared::Topic;
use crate::ws::{
    Action, ChannelConfig, ChannelEvent, ConnectionState, Input, Lifecycle, MessageIn,
    MessageOut, SubscriptionSet,
};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;
type WsSink = SplitSink<WsStream, Message>;
type WsSource = SplitStream<WsStream>;

type SharedSubscriptions = Arc<Mutex<SubscriptionSet>>;

fn lock(subs: &SharedSubscriptions) -> MutexGuard<'_, SubscriptionSet> {
    subs.lock().unwrap_or_else(PoisonError::into_inner)
}

// ─── Commands from public API to background task ─────────────────────────────

enum Command {
    Subscribe(Topic),
    Unsubscribe(Topic),
    Disconnect,
}

enum Attempt {
    Opened(WsStream),
    Failed(String),
    Cancelled,
}

// ─── Background task state ───────────────────────────────────────────────────

struct TaskState {
    config: ChannelConfig,
    lifecycle: Lifecycle,
    event_tx: mpsc::Sender<ChannelEvent>,
    cmd_rx: mpsc::UnboundedReceiver<Command>,
    subscriptions: SharedSubscriptions,
    state: Arc<AtomicU8>,
}

impl TaskState {
    fn emit(&self, event: ChannelEvent) {
        let _ = self.event_tx.try_send(event);
    }

    /// Waits for buffer space; the last event of a lifecycle must not be dropped.
    async fn emit_final(&self, event: ChannelEvent) {
        let _ = self.event_tx.send(event).await;
    }

    fn apply(&mut self, input: Input) -> Action {
        let before = self.lifecycle.state();
        let action = self.lifecycle.apply(input);
        let after = self.lifecycle.state();
        if after != before {
            self.state.store(after as u8, Ordering::SeqCst);
            tracing::debug!(from = %before, to = %after, "Live channel state change");
            self.emit(ChannelEvent::StateChanged(after));
        }
        action
    }

    fn is_subscribed(&self, topic: &Topic) -> bool {
        lock(&self.subscriptions).contains(topic)
    }
}

// ─── Public LiveChannel ──────────────────────────────────────────────────────

/// Persistent live-update channel.
///
/// A background tokio task owns the socket; the public API talks to it over
/// channels. Subscriptions live outside the task, so they survive
/// `disconnect()` and are replayed by the next `connect()`.
pub struct LiveChannel {
    config: ChannelConfig,
    subscriptions: SharedSubscriptions,
    state: Arc<AtomicU8>,
    cmd_tx: Option<mpsc::UnboundedSender<Command>>,
    task_handle: Option<JoinHandle<()>>,
    event_tx: mpsc::Sender<ChannelEvent>,
    event_rx: Arc<tokio::sync::Mutex<mpsc::Receiver<ChannelEvent>>>,
}

impl LiveChannel {
    /// Create a new channel. Does not connect yet.
    pub fn new(config: ChannelConfig) -> Self {
        let (event_tx, event_rx) = mpsc::channel(config.event_capacity.max(1));
        Self {
            config,
            subscriptions: Arc::new(Mutex::new(SubscriptionSet::new())),
            state: Arc::new(AtomicU8::new(ConnectionState::Disconnected as u8)),
            cmd_tx: None,
            task_handle: None,
            event_tx,
            event_rx: Arc::new(tokio::sync::Mutex::new(event_rx)),
        }
    }

    pub fn config(&self) -> &ChannelConfig {
        &self.config
    }

    /// Start the connection lifecycle.
    ///
    /// No-op while a lifecycle is running (connecting, connected or
    /// reconnecting). After a give-up or a `disconnect()` this starts a fresh
    /// one with the attempt counter reset.
    pub async fn connect(&mut self) -> Result<(), ChannelError> {
        if let Some(handle) = self.task_handle.take() {
            if !handle.is_finished() {
                if self.state() != ConnectionState::Disconnected {
                    self.task_handle = Some(handle);
                    return Ok(());
                }
                // Lifecycle is over; the task may still be parked on its final event.
                handle.abort();
            }
        }

        let (cmd_tx, cmd_rx) = mpsc::unbounded_channel();
        self.cmd_tx = Some(cmd_tx);

        let state = TaskState {
            config: self.config.clone(),
            lifecycle: Lifecycle::new(self.config.max_reconnect_attempts),
            event_tx: self.event_tx.clone(),
            cmd_rx,
            subscriptions: Arc::clone(&self.subscriptions),
            state: Arc::clone(&self.state),
        };

        self.state
            .store(ConnectionState::Connecting as u8, Ordering::SeqCst);
        self.task_handle = Some(tokio::spawn(run_task(state)));
        Ok(())
    }

    /// Close the socket and end the lifecycle.
    ///
    /// No-op when already disconnected. Cancels any pending backoff timer;
    /// the subscription set is kept.
    pub async fn disconnect(&mut self) -> Result<(), ChannelError> {
        let Some(mut handle) = self.task_handle.take() else {
            return Ok(());
        };
        if self.state() == ConnectionState::Disconnected {
            handle.abort();
            return Ok(());
        }

        if let Some(tx) = self.cmd_tx.take() {
            let _ = tx.send(Command::Disconnect);
        }

        if tokio::time::timeout(Duration::from_secs(5), &mut handle)
            .await
            .is_err()
        {
            tracing::warn!("Live channel task did not stop in time, aborting");
            handle.abort();
        }

        self.state
            .store(ConnectionState::Disconnected as u8, Ordering::SeqCst);
        Ok(())
    }

    /// Add a topic. Sent right away when connected, otherwise on the next
    /// successful connect. Returns `false` if it was already subscribed.
    pub fn subscribe(&self, topic: impl Into<Topic>) -> bool {
        let topic = topic.into();
        if !lock(&self.subscriptions).insert(topic.clone()) {
            return false;
        }
        if let Some(tx) = &self.cmd_tx {
            let _ = tx.send(Command::Subscribe(topic));
        }
        true
    }

    /// Remove a topic. Messages for it are dropped from now on.
    pub fn unsubscribe(&self, topic: impl Into<Topic>) -> bool {
        let topic = topic.into();
        if !lock(&self.subscriptions).remove(&topic) {
            return false;
        }
        if let Some(tx) = &self.cmd_tx {
            let _ = tx.send(Command::Unsubscribe(topic));
        }
        true
    }

    /// Active topics in subscribe order.
    pub fn subscriptions(&self) -> Vec<Topic> {
        lock(&self.subscriptions).to_vec()
    }

    pub fn state(&self) -> ConnectionState {
        ConnectionState::from(self.state.load(Ordering::SeqCst))
    }

    pub fn is_connected(&self) -> bool {
        self.state() == ConnectionState::Connected
    }

    /// Stream of channel events.
    ///
    /// Events are shared by every stream handed out: each event goes to
    /// whichever stream polls first.
    pub fn events(&self) -> Pin<Box<dyn Stream<Item = ChannelEvent> + Send + 'static>> {
        let rx = Arc::clone(&self.event_rx);
        Box::pin(async_stream::stream! {
            loop {
                let event = rx.lock().await.recv().await;
                match event {
                    Some(event) => yield event,
                    None => break,
                }
            }
        })
    }
}

impl Drop for LiveChannel {
    fn drop(&mut self) {
        if let Some(handle) = self.task_handle.take() {
            handle.abort();
        }
    }
}

// ─── Background task ─────────────────────────────────────────────────────────

async fn run_task(mut state: TaskState) {
    let mut socket: Option<WsStream> = None;
    let mut action = state.apply(Input::Connect);

    loop {
        action = match action {
            Action::OpenSocket => match open_socket(&mut state).await {
                Attempt::Opened(ws) => {
                    socket = Some(ws);
                    state.apply(Input::Opened)
                }
                Attempt::Failed(reason) => {
                    tracing::warn!(url = %state.config.url, "Live channel connect failed: {}", reason);
                    state.emit(ChannelEvent::Error(ChannelError::ConnectionFailed(reason)));
                    state.apply(Input::Failed)
                }
                Attempt::Cancelled => state.apply(Input::Disconnect),
            },

            Action::ReplaySubscriptions => match socket.take() {
                Some(ws) => {
                    let (mut sink, mut stream) = ws.split();
                    let input = run_connected(&mut state, &mut sink, &mut stream).await;
                    if input == Input::Disconnect {
                        if let Ok(ws) = sink.reunite(stream) {
                            socket = Some(ws);
                        }
                    }
                    state.apply(input)
                }
                None => state.apply(Input::Closed),
            },

            Action::ScheduleReconnect { failures } => {
                let delay = state.config.reconnect_delay(failures);
                tracing::info!(
                    failures,
                    max = state.config.max_reconnect_attempts,
                    delay_ms = delay.as_millis() as u64,
                    "Live channel reconnecting"
                );
                if backoff(&mut state, delay).await {
                    state.apply(Input::BackoffElapsed)
                } else {
                    state.apply(Input::Disconnect)
                }
            }

            Action::CloseSocket => {
                if let Some(mut ws) = socket.take() {
                    let _ = ws
                        .close(Some(CloseFrame {
                            code: CloseCode::Normal,
                            reason: "Client disconnect".into(),
                        }))
                        .await;
                }
                return;
            }

            Action::GiveUp { attempts } => {
                tracing::error!(attempts, url = %state.config.url, "Live channel gave up reconnecting");
                state
                    .emit_final(ChannelEvent::Error(ChannelError::MaxRetriesExceeded { attempts }))
                    .await;
                return;
            }

            Action::None => return,
        };
    }
}

/// One time-bounded connect attempt. A disconnect request cancels it.
async fn open_socket(state: &mut TaskState) -> Attempt {
    let url = state.config.url.clone();
    let timeout = Duration::from_millis(state.config.connect_timeout_ms);
    let connect = tokio::time::timeout(timeout, connect_async(url));
    tokio::pin!(connect);

    loop {
        tokio::select! {
            res = &mut connect => {
                return match res {
                    Ok(Ok((ws, _))) => Attempt::Opened(ws),
                    Ok(Err(e)) => Attempt::Failed(e.to_string()),
                    Err(_) => Attempt::Failed("Connection timeout".into()),
                };
            }
            cmd = state.cmd_rx.recv() => {
                match cmd {
                    Some(Command::Disconnect) | None => return Attempt::Cancelled,
                    // The set already holds it; replay covers it.
                    Some(Command::Subscribe(_)) | Some(Command::Unsubscribe(_)) => {}
                }
            }
        }
    }
}

/// Sleep out a reconnect delay. Returns `false` if a disconnect cut it short.
async fn backoff(state: &mut TaskState, delay: Duration) -> bool {
    let sleep = tokio::time::sleep(delay);
    tokio::pin!(sleep);

    loop {
        tokio::select! {
            () = &mut sleep => return true,
            cmd = state.cmd_rx.recv() => {
                match cmd {
                    Some(Command::Disconnect) | None => return false,
                    Some(Command::Subscribe(_)) | Some(Command::Unsubscribe(_)) => {}
                }
            }
        }
    }
}

/// The connected loop: replay, then serve until the socket breaks or a
/// disconnect arrives.
async fn run_connected(state: &mut TaskState, sink: &mut WsSink, stream: &mut WsSource) -> Input {
    // Topics sent on this socket, so each goes out once per connection.
    let mut sent: HashSet<Topic> = HashSet::new();

    let replay = lock(&state.subscriptions).to_vec();
    if !replay.is_empty() {
        tracing::info!(count = replay.len(), "Replaying subscriptions");
    }
    for topic in replay {
        if let Err(e) = send_msg(sink, &MessageOut::Subscribe { topic: topic.clone() }).await {
            state.emit(ChannelEvent::Error(ChannelError::SendFailed(e)));
            return Input::Closed;
        }
        sent.insert(topic);
    }

    loop {
        tokio::select! {
            msg = stream.next() => {
                match msg {
                    Some(Ok(Message::Text(text))) => {
                        let text_str: &str = text.as_ref();
                        handle_text(state, text_str);
                    }
                    Some(Ok(Message::Ping(data))) => {
                        let _ = sink.send(Message::Pong(data)).await;
                    }
                    Some(Ok(Message::Close(frame))) => {
                        let (code, reason) = extract_close(frame.as_ref());
                        tracing::info!(code, reason = %reason, "Live channel closed by server");
                        state.emit(ChannelEvent::Closed { code: Some(code), reason });
                        return Input::Closed;
                    }
                    Some(Ok(_)) => {} // Binary, Pong, Frame
                    Some(Err(e)) => {
                        let reason = e.to_string();
                        tracing::warn!("Live channel socket error: {}", reason);
                        state.emit(ChannelEvent::Closed { code: None, reason });
                        return Input::Closed;
                    }
                    None => {
                        state.emit(ChannelEvent::Closed {
                            code: None,
                            reason: "Stream ended".into(),
                        });
                        return Input::Closed;
                    }
                }
            }

            cmd = state.cmd_rx.recv() => {
                match cmd {
                    Some(Command::Subscribe(topic)) => {
                        if state.is_subscribed(&topic) && sent.insert(topic.clone()) {
                            if let Err(e) = send_msg(sink, &MessageOut::Subscribe { topic }).await {
                                state.emit(ChannelEvent::Error(ChannelError::SendFailed(e)));
                                return Input::Closed;
                            }
                        }
                    }
                    Some(Command::Unsubscribe(topic)) => {
                        if !state.is_subscribed(&topic) && sent.remove(&topic) {
                            if let Err(e) = send_msg(sink, &MessageOut::Unsubscribe { topic }).await {
                                state.emit(ChannelEvent::Error(ChannelError::SendFailed(e)));
                                return Input::Closed;
                            }
                        }
                    }
                    Some(Command::Disconnect) | None => return Input::Disconnect,
                }
            }
        }
    }
}

fn handle_text(state: &TaskState, text: &str) {
    match serde_json::from_str::<MessageIn>(text) {
        Ok(msg) => {
            if state.is_subscribed(&msg.topic) {
                state.emit(ChannelEvent::Message {
                    topic: msg.topic,
                    payload: msg.payload,
                });
            } else {
                tracing::trace!(topic = %msg.topic, "Dropping message for inactive topic");
            }
        }
        Err(e) => {
            tracing::warn!("Live channel deserialization error: {}, raw: {}", e, text);
            state.emit(ChannelEvent::Error(ChannelError::ProtocolError(e.to_string())));
        }
    }
}

// ─── Helpers ─────────────────────────────────────────────────────────────────

/// Serialize and send a MessageOut over the sink.
async fn send_msg(sink: &mut WsSink, msg: &MessageOut) -> Result<(), String> {
    let json = serde_json::to_string(msg).map_err(|e| e.to_string())?;
    sink.send(Message::Text(json.into()))
        .await
        .map_err(|e| e.to_string())
}

/// Extract close code and reason from an optional CloseFrame.
fn extract_close(frame: Option<&CloseFrame>) -> (u16, String) {
    match frame {
        Some(f) => (f.code.into(), f.reason.to_string()),
        None => (1006, "No close frame".into()),
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────
