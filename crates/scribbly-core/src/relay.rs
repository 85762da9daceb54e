//! WebSocket client for the room relay.
//!
//! The socket lives on a background thread; the peer's loop sends frames
//! through a command channel and drains incoming events with
//! [`RelayClient::poll_events`], so nothing here ever blocks the caller.

use crate::channel::{Broadcast, TransportError};
use crate::game::Session;
use crate::model::RoomId;
use crate::protocol::{BroadcastMessage, ClientFrame, ServerFrame};
use std::sync::mpsc::{Receiver, Sender, TryRecvError, channel};
use std::thread::{self, JoinHandle};
use std::time::Duration;
use thiserror::Error;
use tungstenite::{Message, connect};
use url::Url;

/// Connection state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
    Error,
}

/// Events from the relay connection.
#[derive(Debug, Clone)]
pub enum RelayEvent {
    Connected,
    Disconnected,
    JoinedRoom {
        room: RoomId,
        peer_count: usize,
        last_state: Option<Session>,
    },
    PeerJoined { peer_id: String },
    PeerLeft { peer_id: String },
    /// A broadcast message from another member of the room.
    Message { from: String, message: BroadcastMessage },
    Error { message: String },
}

#[derive(Debug, Error)]
pub enum RelayError {
    #[error("already connected")]
    AlreadyConnected,
    #[error("invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
    #[error("invalid WebSocket URL scheme: {0}")]
    InvalidScheme(String),
    #[error("not connected")]
    NotConnected,
    #[error("encoding failed: {0}")]
    Encode(#[from] serde_json::Error),
    #[error("send failed: {0}")]
    Send(String),
}

enum Command {
    Send(String),
    Close,
}

/// Client side of the relay for one peer.
pub struct RelayClient {
    state: ConnectionState,
    events: Vec<RelayEvent>,
    cmd_tx: Option<Sender<Command>>,
    event_rx: Option<Receiver<RelayEvent>>,
    _thread: Option<JoinHandle<()>>,
}

impl RelayClient {
    pub fn new() -> Self {
        Self {
            state: ConnectionState::Disconnected,
            events: Vec::new(),
            cmd_tx: None,
            event_rx: None,
            _thread: None,
        }
    }

    /// Open a connection to the relay at `url` (`ws://` or `wss://`).
    pub fn connect(&mut self, url: &str) -> Result<(), RelayError> {
        if self.cmd_tx.is_some() {
            return Err(RelayError::AlreadyConnected);
        }
        let parsed = Url::parse(url)?;
        if parsed.scheme() != "ws" && parsed.scheme() != "wss" {
            return Err(RelayError::InvalidScheme(parsed.scheme().to_string()));
        }

        self.state = ConnectionState::Connecting;
        let (cmd_tx, cmd_rx) = channel::<Command>();
        let (event_tx, event_rx) = channel::<RelayEvent>();
        let url = url.to_string();

        let handle = thread::spawn(move || run_socket(&url, cmd_rx, event_tx));

        self.cmd_tx = Some(cmd_tx);
        self.event_rx = Some(event_rx);
        self._thread = Some(handle);
        Ok(())
    }

    pub fn disconnect(&mut self) {
        if let Some(tx) = self.cmd_tx.take() {
            let _ = tx.send(Command::Close);
        }
        self.event_rx = None;
        self._thread = None;
        self.state = ConnectionState::Disconnected;
    }

    /// Join a room. Messages published afterwards go to its members.
    pub fn join(&self, room: &RoomId) -> Result<(), RelayError> {
        self.send_frame(&ClientFrame::Join {
            room: room.to_string(),
        })
    }

    pub fn leave(&self) -> Result<(), RelayError> {
        self.send_frame(&ClientFrame::Leave)
    }

    fn send_frame(&self, frame: &ClientFrame) -> Result<(), RelayError> {
        let text = serde_json::to_string(frame)?;
        let tx = self.cmd_tx.as_ref().ok_or(RelayError::NotConnected)?;
        tx.send(Command::Send(text))
            .map_err(|e| RelayError::Send(e.to_string()))
    }

    /// Drain pending events (non-blocking).
    pub fn poll_events(&mut self) -> Vec<RelayEvent> {
        if let Some(rx) = &self.event_rx {
            while let Ok(event) = rx.try_recv() {
                match &event {
                    RelayEvent::Connected => self.state = ConnectionState::Connected,
                    RelayEvent::Disconnected => self.state = ConnectionState::Disconnected,
                    RelayEvent::Error { .. } => self.state = ConnectionState::Error,
                    _ => {}
                }
                self.events.push(event);
            }
        }
        std::mem::take(&mut self.events)
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn is_connected(&self) -> bool {
        self.state == ConnectionState::Connected
    }
}

impl Default for RelayClient {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for RelayClient {
    fn drop(&mut self) {
        self.disconnect();
    }
}

impl Broadcast for RelayClient {
    fn publish(&mut self, message: &BroadcastMessage) -> Result<(), TransportError> {
        let frame = ClientFrame::Publish {
            message: message.clone(),
        };
        self.send_frame(&frame).map_err(|e| match e {
            RelayError::NotConnected => TransportError::NotConnected,
            other => TransportError::Send(other.to_string()),
        })
    }
}

/// Map a server frame to a client event. Frames that carry nothing for the
/// peer yield `None`.
fn frame_to_event(frame: ServerFrame) -> Option<RelayEvent> {
    let event = match frame {
        ServerFrame::Joined {
            room,
            peer_count,
            last_state,
        } => RelayEvent::JoinedRoom {
            room: RoomId::new(room),
            peer_count,
            last_state,
        },
        ServerFrame::PeerJoined { peer_id } => RelayEvent::PeerJoined { peer_id },
        ServerFrame::PeerLeft { peer_id } => RelayEvent::PeerLeft { peer_id },
        ServerFrame::Message { from, message } => {
            if let Err(e) = message.validate() {
                log::warn!("Dropping {} from {}: {}", message.kind(), from, e);
                return None;
            }
            RelayEvent::Message { from, message }
        }
        ServerFrame::Error { message } => RelayEvent::Error { message },
    };
    Some(event)
}

fn run_socket(url: &str, cmd_rx: Receiver<Command>, event_tx: Sender<RelayEvent>) {
    log::info!("Relay thread: connecting to {}", url);
    let (mut socket, response) = match connect(url) {
        Ok(connected) => connected,
        Err(e) => {
            log::error!("Relay connection failed: {}", e);
            let _ = event_tx.send(RelayEvent::Error {
                message: format!("Connection failed: {}", e),
            });
            return;
        }
    };
    log::info!("Relay connected, status: {}", response.status());
    let _ = event_tx.send(RelayEvent::Connected);

    // Short read timeout so outgoing commands are not starved.
    match socket.get_mut() {
        tungstenite::stream::MaybeTlsStream::Plain(tcp) => {
            let _ = tcp.set_read_timeout(Some(Duration::from_millis(50)));
            let _ = tcp.set_write_timeout(Some(Duration::from_secs(5)));
        }
        #[allow(unreachable_patterns)]
        _ => log::debug!("Non-plain stream, using default timeouts"),
    }

    loop {
        match cmd_rx.try_recv() {
            Ok(Command::Send(text)) => {
                if let Err(e) = socket.send(Message::Text(text)) {
                    log::error!("Relay send error: {}", e);
                    break;
                }
            }
            Ok(Command::Close) => {
                let _ = socket.close(None);
                break;
            }
            Err(TryRecvError::Disconnected) => break,
            Err(TryRecvError::Empty) => {}
        }

        match socket.read() {
            Ok(Message::Text(text)) => match serde_json::from_str::<ServerFrame>(&text) {
                Ok(frame) => {
                    if let Some(event) = frame_to_event(frame) {
                        let _ = event_tx.send(event);
                    }
                }
                Err(e) => log::warn!("Failed to parse relay frame: {}", e),
            },
            Ok(Message::Ping(data)) => {
                let _ = socket.send(Message::Pong(data));
            }
            Ok(Message::Close(_)) => {
                log::info!("Relay closed the connection");
                break;
            }
            Ok(_) => {}
            Err(tungstenite::Error::Io(ref e))
                if e.kind() == std::io::ErrorKind::WouldBlock
                    || e.kind() == std::io::ErrorKind::TimedOut => {}
            Err(e) => {
                log::error!("Relay read error: {}", e);
                break;
            }
        }
    }

    log::info!("Relay thread exiting");
    let _ = event_tx.send(RelayEvent::Disconnected);
}
