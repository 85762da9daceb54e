//! Room membership and fan-out.

use dashmap::DashMap;
use scribbly_core::game::Session;
use scribbly_core::protocol::{BroadcastMessage, ServerFrame};
use std::collections::HashSet;
use tokio::sync::broadcast;

/// A frame tagged with the peer that caused it, so receivers can skip
/// their own.
pub type Envelope = (String, ServerFrame);

struct Room {
    tx: broadcast::Sender<Envelope>,
    peers: HashSet<String>,
    /// Latest game state published in the room, handed to new joiners.
    last_state: Option<Session>,
}

impl Room {
    fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self {
            tx,
            peers: HashSet::new(),
            last_state: None,
        }
    }
}

/// What a peer gets back when it joins a room.
pub struct Joined {
    pub rx: broadcast::Receiver<Envelope>,
    pub peer_count: usize,
    pub last_state: Option<Session>,
}

/// Shared relay state.
pub struct AppState {
    rooms: DashMap<String, Room>,
    capacity: usize,
}

impl AppState {
    pub fn new(capacity: usize) -> Self {
        Self {
            rooms: DashMap::new(),
            capacity,
        }
    }

    /// Add a peer to a room, creating it if needed.
    pub fn join_room(&self, room_id: &str, peer_id: &str) -> Joined {
        let mut room = self
            .rooms
            .entry(room_id.to_string())
            .or_insert_with(|| Room::new(self.capacity));
        room.peers.insert(peer_id.to_string());
        Joined {
            rx: room.tx.subscribe(),
            peer_count: room.peers.len(),
            last_state: room.last_state.clone(),
        }
    }

    /// Remove a peer. Empty rooms are dropped along with their last state.
    pub fn leave_room(&self, room_id: &str, peer_id: &str) {
        let empty = match self.rooms.get_mut(room_id) {
            Some(mut room) => {
                room.peers.remove(peer_id);
                room.peers.is_empty()
            }
            None => false,
        };
        if empty {
            self.rooms.remove(room_id);
        }
    }

    /// Fan a peer's message out to the rest of the room.
    pub fn publish(&self, room_id: &str, from: &str, message: BroadcastMessage) {
        if let Some(mut room) = self.rooms.get_mut(room_id) {
            if let BroadcastMessage::GameStateUpdate(session) = &message {
                room.last_state = Some(session.clone());
            }
            let frame = ServerFrame::Message {
                from: from.to_string(),
                message,
            };
            let _ = room.tx.send((from.to_string(), frame));
        }
    }

    /// Send a membership frame to the room.
    pub fn announce(&self, room_id: &str, from: &str, frame: ServerFrame) {
        if let Some(room) = self.rooms.get(room_id) {
            let _ = room.tx.send((from.to_string(), frame));
        }
    }

    pub fn room_count(&self) -> usize {
        self.rooms.len()
    }

    pub fn peer_count(&self, room_id: &str) -> usize {
        self.rooms.get(room_id).map(|r| r.peers.len()).unwrap_or(0)
    }
}
