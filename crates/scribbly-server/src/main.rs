//! Scribbly WebSocket Relay Server
//!
//! Fans broadcast messages out to every other member of a room. The relay
//! holds no game authority: it parses relay frames, forwards payloads and
//! remembers the latest game state of each room for late joiners.
//!
//! ## Protocol
//!
//! ```json
//! { "type": "join", "room": "room-id" }
//! { "type": "publish", "message": { "type": "clear-canvas" } }
//! { "type": "leave" }
//! ```

mod config;
mod state;

use axum::{
    Router,
    extract::{
        State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    response::IntoResponse,
    routing::get,
};
use config::ServerConfig;
use futures_util::{SinkExt, StreamExt, stream::SplitSink};
use scribbly_core::protocol::{ClientFrame, ServerFrame};
use state::{AppState, Envelope};
use std::sync::Arc;
use tokio::sync::broadcast::{self, error::RecvError};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{debug, info, warn};
use uuid::Uuid;

#[tokio::main]
async fn main() -> std::io::Result<()> {
    let config = ServerConfig::from_env();

    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::new(&config.log_filter))
        .init();

    let state = Arc::new(AppState::new(config.room_channel_capacity));

    let app = Router::new()
        .route("/", get(index))
        .route("/ws", get(ws_handler))
        .route("/health", get(health))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    let addr = config.addr();
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("Scribbly relay listening on {}", addr);
    info!("WebSocket endpoint: ws://{}/ws", addr);

    axum::serve(listener, app).await
}

async fn index() -> &'static str {
    "Scribbly Relay Server - Connect via WebSocket at /ws"
}

async fn health() -> &'static str {
    "ok"
}

async fn ws_handler(ws: WebSocketUpgrade, State(state): State<Arc<AppState>>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

type Sender = SplitSink<WebSocket, Message>;

async fn send_frame(sender: &mut Sender, frame: &ServerFrame) -> bool {
    match serde_json::to_string(frame) {
        Ok(json) => sender.send(Message::Text(json.into())).await.is_ok(),
        Err(e) => {
            warn!("Failed to encode frame: {}", e);
            true
        }
    }
}

fn leave(state: &AppState, room: &str, peer_id: &str) {
    state.leave_room(room, peer_id);
    state.announce(
        room,
        peer_id,
        ServerFrame::PeerLeft {
            peer_id: peer_id.to_string(),
        },
    );
    info!("Peer {} left room {} ({} remaining)", peer_id, room, state.peer_count(room));
}

async fn handle_socket(socket: WebSocket, state: Arc<AppState>) {
    let peer_id = Uuid::new_v4().to_string();
    info!("New connection: {}", peer_id);

    let (mut sender, mut receiver) = socket.split();
    let mut current_room: Option<String> = None;
    let mut room_rx: Option<broadcast::Receiver<Envelope>> = None;

    loop {
        tokio::select! {
            msg = receiver.next() => {
                let text = match msg {
                    Some(Ok(Message::Text(text))) => text,
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Ok(_)) => continue,
                    Some(Err(e)) => {
                        warn!("WebSocket error for {}: {}", peer_id, e);
                        break;
                    }
                };

                let frame = match serde_json::from_str::<ClientFrame>(&text) {
                    Ok(frame) => frame,
                    Err(e) => {
                        warn!("Invalid frame from {}: {}", peer_id, e);
                        let err = ServerFrame::Error { message: format!("Invalid message: {}", e) };
                        if !send_frame(&mut sender, &err).await {
                            break;
                        }
                        continue;
                    }
                };

                match frame {
                    ClientFrame::Join { room } => {
                        let room = room.trim().to_string();
                        if room.is_empty() {
                            let err = ServerFrame::Error { message: "Room id must not be empty".into() };
                            if !send_frame(&mut sender, &err).await {
                                break;
                            }
                            continue;
                        }
                        if let Some(old) = current_room.take() {
                            leave(&state, &old, &peer_id);
                        }

                        let joined = state.join_room(&room, &peer_id);
                        room_rx = Some(joined.rx);
                        current_room = Some(room.clone());

                        let confirm = ServerFrame::Joined {
                            room: room.clone(),
                            peer_count: joined.peer_count,
                            last_state: joined.last_state,
                        };
                        if !send_frame(&mut sender, &confirm).await {
                            break;
                        }
                        state.announce(&room, &peer_id, ServerFrame::PeerJoined { peer_id: peer_id.clone() });
                        info!("Peer {} joined room {} ({} peers)", peer_id, room, joined.peer_count);
                    }
                    ClientFrame::Leave => {
                        if let Some(room) = current_room.take() {
                            leave(&state, &room, &peer_id);
                        }
                        room_rx = None;
                    }
                    ClientFrame::Publish { message } => match &current_room {
                        Some(room) => {
                            debug!("Peer {} published {} to {}", peer_id, message.kind(), room);
                            state.publish(room, &peer_id, message);
                        }
                        None => {
                            let err = ServerFrame::Error { message: "Join a room before publishing".into() };
                            if !send_frame(&mut sender, &err).await {
                                break;
                            }
                        }
                    },
                }
            }

            msg = async {
                match &mut room_rx {
                    Some(rx) => Some(rx.recv().await),
                    None => std::future::pending::<Option<Result<Envelope, RecvError>>>().await,
                }
            } => {
                match msg {
                    Some(Ok((from, frame))) => {
                        // Don't echo back to sender
                        if from != peer_id && !send_frame(&mut sender, &frame).await {
                            break;
                        }
                    }
                    Some(Err(RecvError::Lagged(skipped))) => {
                        warn!("Peer {} lagged, {} messages skipped", peer_id, skipped);
                    }
                    Some(Err(RecvError::Closed)) | None => room_rx = None,
                }
            }
        }
    }

    if let Some(room) = current_room {
        leave(&state, &room, &peer_id);
    }
    info!("Connection closed: {} ({} active rooms)", peer_id, state.room_count());
}
