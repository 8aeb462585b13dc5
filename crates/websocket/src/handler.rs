use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::IntoResponse;
use futures_util::stream::SplitSink;
use futures_util::{SinkExt, StreamExt};
use showrunner_core::Caller;
use tokio::sync::broadcast;
use tokio::time::interval;

use events::EventBus;

use crate::messages::{
    ClientMessage, IntentOutcome, MutationIntent, ServerMessage, SubscriptionFilter,
};

pub const DEFAULT_HEARTBEAT_INTERVAL: Duration = Duration::from_secs(30);
const CLIENT_TIMEOUT: Duration = Duration::from_secs(10);

/// Applies mutation intents received over a socket.
#[async_trait]
pub trait IntentHandler: Send + Sync {
    async fn handle(&self, caller: Caller, intent: MutationIntent) -> IntentOutcome;
}

/// Per-connection state, built by the route before upgrading.
#[derive(Clone)]
pub struct WsState {
    pub event_bus: EventBus,
    pub intents: Arc<dyn IntentHandler>,
    pub caller: Caller,
    pub heartbeat: Duration,
}

impl WsState {
    pub fn new(event_bus: EventBus, intents: Arc<dyn IntentHandler>, caller: Caller) -> Self {
        Self {
            event_bus,
            intents,
            caller,
            heartbeat: DEFAULT_HEARTBEAT_INTERVAL,
        }
    }

    pub fn with_heartbeat(mut self, heartbeat: Duration) -> Self {
        self.heartbeat = heartbeat;
        self
    }
}

pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<WsState>>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

type Sender = SplitSink<WebSocket, Message>;

fn encode(msg: &ServerMessage) -> Message {
    let json = serde_json::to_string(msg).unwrap_or_else(|e| {
        tracing::error!(error = %e, "Failed to encode server message");
        r#"{"type":"error","message":"encoding failed"}"#.to_string()
    });
    Message::Text(json.into())
}

async fn send(sender: &mut Sender, msg: &ServerMessage) -> bool {
    sender.send(encode(msg)).await.is_ok()
}

async fn handle_socket(socket: WebSocket, state: Arc<WsState>) {
    let (mut sender, mut receiver) = socket.split();

    let mut event_rx = state.event_bus.subscribe();
    let mut filter: Option<SubscriptionFilter> = None;
    let mut subscribed = false;

    let mut heartbeat = interval(state.heartbeat);
    heartbeat.reset();

    loop {
        tokio::select! {
            _ = heartbeat.tick() => {
                if !send(&mut sender, &ServerMessage::Pong).await {
                    break;
                }
            }

            event_result = event_rx.recv() => {
                match event_result {
                    Ok(envelope) => {
                        if subscribed {
                            let should_send = filter.as_ref()
                                .map(|f| f.matches(&envelope))
                                .unwrap_or(true);

                            if should_send && !send(&mut sender, &ServerMessage::Event { envelope }).await {
                                break;
                            }
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        tracing::warn!("WebSocket client lagged, missed {} events", n);
                        let notice = ServerMessage::Error {
                            message: format!("missed {} events, reload state", n),
                        };
                        if !send(&mut sender, &notice).await {
                            break;
                        }
                    }
                    Err(broadcast::error::RecvError::Closed) => {
                        break;
                    }
                }
            }

            msg = tokio::time::timeout(CLIENT_TIMEOUT + state.heartbeat, receiver.next()) => {
                match msg {
                    Ok(Some(Ok(Message::Text(text)))) => {
                        let reply = match serde_json::from_str::<ClientMessage>(&text) {
                            Ok(ClientMessage::Subscribe { filter: new_filter, since }) => {
                                let (replayed, truncated) = match since {
                                    Some(mut since) => {
                                        if let Some(f) = new_filter.as_ref() {
                                            since.retain(|id, _| f.includes(*id));
                                        }
                                        let replay = state.event_bus.subscribe_since(&since);
                                        event_rx = replay.receiver;

                                        let count = replay.missed.len();
                                        let mut delivered = true;
                                        for envelope in replay.missed {
                                            if !send(&mut sender, &ServerMessage::Event { envelope }).await {
                                                delivered = false;
                                                break;
                                            }
                                        }
                                        if !delivered {
                                            break;
                                        }
                                        (count, replay.truncated)
                                    }
                                    None => (0, false),
                                };

                                filter = new_filter.clone();
                                subscribed = true;
                                ServerMessage::Subscribed { filter: new_filter, replayed, truncated }
                            }
                            Ok(ClientMessage::Unsubscribe) => {
                                subscribed = false;
                                filter = None;
                                ServerMessage::Unsubscribed
                            }
                            Ok(ClientMessage::Ping) => ServerMessage::Pong,
                            Ok(ClientMessage::Intent { request_id, intent }) => {
                                tracing::debug!(request_id = %request_id, ?intent, "Socket intent");
                                let outcome = state.intents.handle(state.caller, intent).await;
                                ServerMessage::intent_result(request_id, outcome)
                            }
                            Err(e) => ServerMessage::Error {
                                message: format!("Invalid message: {}", e),
                            },
                        };

                        if !send(&mut sender, &reply).await {
                            break;
                        }
                    }
                    Ok(Some(Ok(Message::Close(_)))) => {
                        break;
                    }
                    Ok(Some(Ok(Message::Ping(data)))) => {
                        if sender.send(Message::Pong(data)).await.is_err() {
                            break;
                        }
                    }
                    Ok(Some(Ok(_))) => {}
                    Ok(Some(Err(_))) => {
                        break;
                    }
                    Ok(None) => {
                        break;
                    }
                    Err(_) => {
                        tracing::debug!("WebSocket client idle past timeout");
                    }
                }
            }
        }
    }

    tracing::debug!("WebSocket connection closed");
}
