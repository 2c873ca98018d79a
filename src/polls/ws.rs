use axum::{
    extract::{
        State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    response::IntoResponse,
};
use futures_util::{SinkExt, StreamExt, stream::SplitSink, stream::SplitStream};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::time::Instant;
use tracing::{debug, info, warn};
use uuid::Uuid;
use voting_common::RealtimeEvent;

use super::api::SharedState;

/// How often to send WebSocket Ping frames.
const PING_INTERVAL: Duration = Duration::from_secs(30);

/// How long to wait for a Pong response before considering the connection dead.
const PONG_TIMEOUT: Duration = Duration::from_secs(60);

// ── Wire frames ──────────────────────────────────────────────────────

/// Frames pushed to subscribers.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "event", content = "data")]
pub enum ServerMessage {
    /// Sent once, right after the upgrade.
    #[serde(rename = "connected")]
    Connected {
        #[serde(rename = "connectionId")]
        connection_id: String,
    },
    #[serde(rename = "message")]
    Message(RealtimeEvent),
}

// ── Notifier ─────────────────────────────────────────────────────────

/// Fan-out of change events to every connected subscriber.
///
/// Delivery is best-effort: subscribers that connect later miss earlier
/// events, and a subscriber that falls more than the channel capacity
/// behind skips ahead.
#[derive(Debug, Clone)]
pub struct Notifier {
    tx: broadcast::Sender<String>,
}

impl Notifier {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<String> {
        self.tx.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }

    /// Serialize and send `event` to all current subscribers.
    /// Returns the number of subscribers it reached.
    pub fn publish(&self, event: RealtimeEvent) -> usize {
        let frame = ServerMessage::Message(event);
        match serde_json::to_string(&frame) {
            Ok(json) => self.tx.send(json).unwrap_or(0),
            Err(e) => {
                warn!(error = %e, "failed to serialize realtime event");
                0
            }
        }
    }
}

// ── WebSocket handler ────────────────────────────────────────────────

pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<SharedState>,
) -> impl IntoResponse {
    let notifier = state.notifier().clone();
    ws.on_upgrade(move |socket| handle_socket(socket, notifier))
}

async fn handle_socket(socket: WebSocket, notifier: Notifier) {
    // Subscribe before the greeting so nothing published after it is missed.
    let rx = notifier.subscribe();
    let connection_id = Uuid::new_v4().to_string();
    let (mut sender, receiver) = socket.split();

    info!(%connection_id, "realtime client connected");

    let reason = match greet(&mut sender, &connection_id).await {
        Ok(()) => run_socket_loop(sender, receiver, rx, &connection_id).await,
        Err(reason) => reason,
    };
    info!(%connection_id, ?reason, "realtime client disconnected");
}

async fn greet(
    sender: &mut SplitSink<WebSocket, Message>,
    connection_id: &str,
) -> Result<(), CloseReason> {
    let greeting = ServerMessage::Connected {
        connection_id: connection_id.to_string(),
    };
    match serde_json::to_string(&greeting) {
        Ok(json) => sender
            .send(Message::Text(json.into()))
            .await
            .map_err(|_| CloseReason::SendFailed),
        Err(e) => {
            warn!(connection_id, error = %e, "failed to serialize greeting");
            Ok(())
        }
    }
}

/// Why a realtime connection ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CloseReason {
    ClientClosed,
    PongTimeout,
    SendFailed,
    ReceiveFailed,
    NotifierClosed,
}

/// Pong bookkeeping for one connection. The deadline is armed by the first
/// unanswered ping and cleared by any pong.
#[derive(Debug, Default)]
struct Keepalive {
    pong_deadline: Option<Instant>,
}

impl Keepalive {
    fn ping_sent(&mut self, now: Instant) {
        self.pong_deadline.get_or_insert(now + PONG_TIMEOUT);
    }

    fn pong_received(&mut self) {
        self.pong_deadline = None;
    }

    fn expired(&self, now: Instant) -> bool {
        self.pong_deadline.is_some_and(|deadline| now >= deadline)
    }
}

/// Pump notifier frames to one client until it leaves, stops answering
/// pings, or the notifier shuts down.
async fn run_socket_loop(
    mut sender: SplitSink<WebSocket, Message>,
    mut receiver: SplitStream<WebSocket>,
    mut rx: broadcast::Receiver<String>,
    connection_id: &str,
) -> CloseReason {
    let mut pings = tokio::time::interval_at(Instant::now() + PING_INTERVAL, PING_INTERVAL);
    let mut keepalive = Keepalive::default();

    let reason = loop {
        tokio::select! {
            tick = pings.tick() => {
                if keepalive.expired(tick) {
                    break CloseReason::PongTimeout;
                }
                if sender.send(Message::Ping(Default::default())).await.is_err() {
                    break CloseReason::SendFailed;
                }
                keepalive.ping_sent(tick);
            }

            frame = rx.recv() => match frame {
                Ok(frame) => {
                    if sender.send(Message::Text(frame.into())).await.is_err() {
                        break CloseReason::SendFailed;
                    }
                }
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!(connection_id, skipped, "subscriber lagged, skipping events");
                }
                Err(broadcast::error::RecvError::Closed) => break CloseReason::NotifierClosed,
            },

            inbound = receiver.next() => match inbound {
                Some(Ok(Message::Pong(_))) => keepalive.pong_received(),
                Some(Ok(Message::Close(_))) | None => break CloseReason::ClientClosed,
                // Clients have nothing to say on this channel.
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    debug!(connection_id, error = %e, "socket receive error");
                    break CloseReason::ReceiveFailed;
                }
            },
        }
    };

    if reason != CloseReason::SendFailed {
        let _ = sender.send(Message::Close(None)).await;
    }
    reason
}
