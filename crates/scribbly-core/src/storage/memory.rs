//! In-memory store.

use super::{BoxFuture, ChangeEvent, ChangeKind, SessionStore, StorageError, StorageResult};
use crate::game::SessionRow;
use crate::model::{Player, PlayerId, RoomId, Topic};
use crate::roster::RosterDelta;
use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

#[derive(Default)]
struct Tables {
    sessions: HashMap<RoomId, SessionRow>,
    players: HashMap<RoomId, Vec<Player>>,
    topics: Vec<Topic>,
    feed: HashMap<RoomId, Vec<ChangeEvent>>,
}

impl Tables {
    fn emit(&mut self, room: &RoomId, event: ChangeEvent) {
        self.feed.entry(room.clone()).or_default().push(event);
    }
}

/// In-memory store for tests and single-process hosts.
///
/// Every successful write is appended to the room's change feed, including
/// writes made by the peer that will later drain it.
#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store seeded with a topic pool.
    pub fn with_topics(topics: Vec<Topic>) -> Self {
        Self {
            tables: RwLock::new(Tables {
                topics,
                ..Tables::default()
            }),
        }
    }

    fn read(&self) -> StorageResult<RwLockReadGuard<'_, Tables>> {
        self.tables
            .read()
            .map_err(|e| StorageError::Other(format!("Lock error: {}", e)))
    }

    fn write(&self) -> StorageResult<RwLockWriteGuard<'_, Tables>> {
        self.tables
            .write()
            .map_err(|e| StorageError::Other(format!("Lock error: {}", e)))
    }
}

impl SessionStore for MemoryStore {
    fn load_session(&self, room: &RoomId) -> BoxFuture<'_, StorageResult<Option<SessionRow>>> {
        let room = room.clone();
        Box::pin(async move { Ok(self.read()?.sessions.get(&room).cloned()) })
    }

    fn insert_session(&self, room: &RoomId, row: &SessionRow) -> BoxFuture<'_, StorageResult<()>> {
        let room = room.clone();
        let row = row.clone();
        Box::pin(async move {
            let mut tables = self.write()?;
            if tables.sessions.contains_key(&room) {
                return Err(StorageError::AlreadyExists(room.to_string()));
            }
            tables.sessions.insert(room.clone(), row.clone());
            tables.emit(&room, ChangeEvent::Session { kind: ChangeKind::Insert, row });
            Ok(())
        })
    }

    fn update_session(&self, room: &RoomId, row: &SessionRow) -> BoxFuture<'_, StorageResult<()>> {
        let room = room.clone();
        let row = row.clone();
        Box::pin(async move {
            let mut tables = self.write()?;
            let Some(stored) = tables.sessions.get_mut(&room) else {
                return Err(StorageError::NotFound(room.to_string()));
            };
            *stored = row.clone();
            tables.emit(&room, ChangeEvent::Session { kind: ChangeKind::Update, row });
            Ok(())
        })
    }

    fn load_players(&self, room: &RoomId) -> BoxFuture<'_, StorageResult<Vec<Player>>> {
        let room = room.clone();
        Box::pin(async move { Ok(self.read()?.players.get(&room).cloned().unwrap_or_default()) })
    }

    fn insert_player(&self, room: &RoomId, player: &Player) -> BoxFuture<'_, StorageResult<()>> {
        let room = room.clone();
        let player = player.clone();
        Box::pin(async move {
            let mut tables = self.write()?;
            let players = tables.players.entry(room.clone()).or_default();
            if players.iter().any(|p| p.id == player.id) {
                return Err(StorageError::AlreadyExists(player.id));
            }
            players.push(player.clone());
            tables.emit(&room, ChangeEvent::Player { delta: RosterDelta::Insert { player } });
            Ok(())
        })
    }

    fn update_player(&self, room: &RoomId, player: &Player) -> BoxFuture<'_, StorageResult<()>> {
        let room = room.clone();
        let player = player.clone();
        Box::pin(async move {
            let mut tables = self.write()?;
            let stored = tables
                .players
                .get_mut(&room)
                .and_then(|players| players.iter_mut().find(|p| p.id == player.id));
            let Some(stored) = stored else {
                return Err(StorageError::NotFound(player.id));
            };
            *stored = player.clone();
            tables.emit(&room, ChangeEvent::Player { delta: RosterDelta::Update { player } });
            Ok(())
        })
    }

    fn delete_player(&self, room: &RoomId, id: &PlayerId) -> BoxFuture<'_, StorageResult<()>> {
        let room = room.clone();
        let id = id.clone();
        Box::pin(async move {
            let mut tables = self.write()?;
            if let Some(players) = tables.players.get_mut(&room) {
                players.retain(|p| p.id != id);
            }
            tables.emit(&room, ChangeEvent::Player { delta: RosterDelta::Delete { id } });
            Ok(())
        })
    }

    fn load_topics(&self) -> BoxFuture<'_, StorageResult<Vec<Topic>>> {
        Box::pin(async move { Ok(self.read()?.topics.clone()) })
    }

    fn take_changes(&self, room: &RoomId) -> Vec<ChangeEvent> {
        match self.tables.write() {
            Ok(mut tables) => tables.feed.remove(room).unwrap_or_default(),
            Err(e) => {
                log::warn!("Change feed for room {} unavailable: {}", room, e);
                Vec::new()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::{Session, SessionStatus};
    use crate::storage::{PersistenceWrite, apply_write, block_on, load_initial};

    fn room() -> RoomId {
        RoomId::new("room-1")
    }

    #[test]
    fn test_load_initial_on_empty_room() {
        let store = MemoryStore::with_topics(vec![Topic::new("t1", "Cat", "")]);
        let data = block_on(load_initial(&store, &room())).unwrap();
        assert!(data.session.is_none());
        assert!(data.players.is_empty());
        assert_eq!(data.topics.len(), 1);
    }

    #[test]
    fn test_insert_session_twice_fails() {
        let store = MemoryStore::new();
        let row = Session::default().to_row();
        block_on(store.insert_session(&room(), &row)).unwrap();
        let result = block_on(store.insert_session(&room(), &row));
        assert!(matches!(result, Err(StorageError::AlreadyExists(_))));
    }

    #[test]
    fn test_update_missing_session_not_found() {
        let store = MemoryStore::new();
        let result = block_on(store.update_session(&room(), &Session::default().to_row()));
        assert!(matches!(result, Err(StorageError::NotFound(_))));
    }

    #[test]
    fn test_writes_appear_on_change_feed() {
        let store = MemoryStore::new();
        let mut row = Session::default().to_row();
        block_on(store.insert_session(&room(), &row)).unwrap();
        block_on(store.insert_player(&room(), &Player::new("a", "Ada"))).unwrap();
        row.status = SessionStatus::Idle;
        block_on(apply_write(&store, &PersistenceWrite::UpdateSession { room: room(), row: row.clone() }))
            .unwrap();
        block_on(store.delete_player(&room(), &"a".to_string())).unwrap();

        let changes = store.take_changes(&room());
        assert_eq!(changes.len(), 4);
        assert!(matches!(changes[0], ChangeEvent::Session { kind: ChangeKind::Insert, .. }));
        assert_eq!(
            changes[2],
            ChangeEvent::Session { kind: ChangeKind::Update, row: row.clone() }
        );
        assert_eq!(
            changes[3],
            ChangeEvent::Player { delta: RosterDelta::Delete { id: "a".into() } }
        );
        assert!(store.take_changes(&room()).is_empty());
        assert_eq!(block_on(store.load_session(&room())).unwrap(), Some(row));
    }

    #[test]
    fn test_rooms_are_isolated() {
        let store = MemoryStore::new();
        block_on(store.insert_player(&room(), &Player::new("a", "Ada"))).unwrap();
        let other = RoomId::new("room-2");
        assert!(block_on(store.load_players(&other)).unwrap().is_empty());
        assert!(store.take_changes(&other).is_empty());
    }

    #[test]
    fn test_update_player_persists_score() {
        let store = MemoryStore::new();
        block_on(store.insert_player(&room(), &Player::new("a", "Ada"))).unwrap();
        let mut ada = Player::new("a", "Ada");
        ada.score = 15;
        block_on(apply_write(&store, &PersistenceWrite::UpdatePlayer { room: room(), player: ada })).unwrap();
        let players = block_on(store.load_players(&room())).unwrap();
        assert_eq!(players[0].score, 15);
    }
}
