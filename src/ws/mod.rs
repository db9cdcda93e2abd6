pub mod handlers;

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        Query, State,
    },
    response::IntoResponse,
};
use futures::{sink::SinkExt, stream::StreamExt};
use serde::Deserialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;

use crate::protocol::{ClientMessage, ServerMessage};
use crate::state::{paths, sort_inbox, AppState};
use crate::store::Actor;
use crate::types::{InboxMessage, PlayerId, PrivateReveal, RoomId, RoomView};

#[derive(Debug, Deserialize)]
pub struct WsQuery {
    /// Reattach to an existing identity; absent means a fresh anonymous one
    pub token: Option<String>,
    pub name: Option<String>,
}

/// WebSocket upgrade handler
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    Query(params): Query<WsQuery>,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, params, state))
}

fn room_view_from(snapshot: &Value) -> RoomView {
    if snapshot.is_null() {
        return RoomView::default();
    }
    serde_json::from_value(snapshot.clone()).unwrap_or_default()
}

fn inbox_from(snapshot: &Value) -> Vec<InboxMessage> {
    if snapshot.is_null() {
        return Vec::new();
    }
    let map: BTreeMap<String, InboxMessage> =
        serde_json::from_value(snapshot.clone()).unwrap_or_default();
    sort_inbox(map)
}

fn reveals_from(snapshot: &Value) -> BTreeMap<PlayerId, PrivateReveal> {
    if snapshot.is_null() {
        return BTreeMap::new();
    }
    serde_json::from_value(snapshot.clone()).unwrap_or_default()
}

/// Handle one connected client: resolve identity, attach the five store
/// subscriptions the client view is rebuilt from, then multiplex snapshots
/// and intents until the socket closes.
async fn handle_socket(socket: WebSocket, params: WsQuery, state: Arc<AppState>) {
    let (mut sender, mut receiver) = socket.split();

    let (token, identity) = match params.token {
        Some(token) => match state.sessions.lookup(&token).await {
            Some(identity) => (token, identity),
            None => {
                let err = ServerMessage::Error {
                    code: "UNAUTHORIZED".to_string(),
                    msg: "unknown session token".to_string(),
                };
                if let Ok(json) = serde_json::to_string(&err) {
                    let _ = sender.send(Message::Text(json.into())).await;
                }
                return;
            }
        },
        None => {
            state
                .sessions
                .register(params.name.as_deref().unwrap_or(""))
                .await
        }
    };

    tracing::info!("connected: {} ({})", identity.display_name, identity.uid);

    let welcome = ServerMessage::Welcome {
        uid: identity.uid.clone(),
        display_name: identity.display_name.clone(),
        session_token: token,
        server_now: chrono::Utc::now().to_rfc3339(),
    };
    if let Ok(json) = serde_json::to_string(&welcome) {
        if sender.send(Message::Text(json.into())).await.is_err() {
            return;
        }
    }

    let me = Actor::player(identity.uid.clone());
    let room_a_path = paths::room_root(RoomId::RoomA);
    let room_b_path = paths::room_root(RoomId::RoomB);
    let inbox_path = paths::inbox(&identity.uid);
    let reveals_path = paths::reveals(&identity.uid);
    let subs = tokio::try_join!(
        state.store.subscribe(&me, &room_a_path),
        state.store.subscribe(&me, &room_b_path),
        state.store.subscribe(&me, paths::ROUND),
        state.store.subscribe(&me, &inbox_path),
        state.store.subscribe(&me, &reveals_path),
    );
    let (mut room_a, mut room_b, mut round, mut inbox, mut reveals) = match subs {
        Ok(subs) => subs,
        Err(e) => {
            tracing::error!("subscription setup failed: {}", e);
            return;
        }
    };

    loop {
        let outgoing = tokio::select! {
            snap = room_a.next() => match snap {
                Some(v) => Some(ServerMessage::RoomUpdate {
                    room: RoomId::RoomA,
                    view: room_view_from(&v),
                }),
                None => break,
            },
            snap = room_b.next() => match snap {
                Some(v) => Some(ServerMessage::RoomUpdate {
                    room: RoomId::RoomB,
                    view: room_view_from(&v),
                }),
                None => break,
            },
            snap = round.next() => match snap {
                Some(v) => Some(ServerMessage::RoundUpdate {
                    clock: AppState::clock_from_snapshot(&v),
                }),
                None => break,
            },
            snap = inbox.next() => match snap {
                Some(v) => Some(ServerMessage::Inbox { messages: inbox_from(&v) }),
                None => break,
            },
            snap = reveals.next() => match snap {
                Some(v) => Some(ServerMessage::Reveals { reveals: reveals_from(&v) }),
                None => break,
            },

            ws_msg = receiver.next() => {
                match ws_msg {
                    Some(Ok(Message::Text(text))) => {
                        match serde_json::from_str::<ClientMessage>(&text) {
                            Ok(client_msg) => {
                                handlers::handle_message(client_msg, &identity, &state).await
                            }
                            Err(e) => {
                                tracing::debug!("unparseable client message: {}", e);
                                Some(ServerMessage::Error {
                                    code: "BAD_MESSAGE".to_string(),
                                    msg: format!("invalid message format: {}", e),
                                })
                            }
                        }
                    }
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Ok(Message::Ping(data))) => {
                        if sender.send(Message::Pong(data)).await.is_err() {
                            break;
                        }
                        None
                    }
                    Some(Ok(_)) => None,
                    Some(Err(e)) => {
                        tracing::debug!("websocket error: {}", e);
                        break;
                    }
                }
            }
        };

        if let Some(msg) = outgoing {
            match serde_json::to_string(&msg) {
                Ok(json) => {
                    if sender.send(Message::Text(json.into())).await.is_err() {
                        break;
                    }
                }
                Err(e) => tracing::error!("failed to encode server message: {}", e),
            }
        }
    }

    tracing::info!("disconnected: {}", identity.uid);
}
