//! Persistence store abstraction.
//!
//! The store is the system of record for session rows and player rosters.
//! It also exposes a change feed that reports every insert, update and
//! delete regardless of which peer made it.

mod memory;

pub use memory::MemoryStore;

use crate::game::SessionRow;
use crate::model::{Player, PlayerId, RoomId, Topic};
use crate::roster::RosterDelta;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::pin::Pin;
use thiserror::Error;

/// Storage errors.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Already exists: {0}")]
    AlreadyExists(String),
    #[error("Storage error: {0}")]
    Other(String),
}

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Boxed future for async operations (compatible with WASM).
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + 'a>>;

/// Thread-safety bound for store implementations. Relaxed on WASM, which is
/// single-threaded.
#[cfg(not(target_arch = "wasm32"))]
pub trait MaybeSync: Send + Sync {}
#[cfg(not(target_arch = "wasm32"))]
impl<T: Send + Sync> MaybeSync for T {}

#[cfg(target_arch = "wasm32")]
pub trait MaybeSync {}
#[cfg(target_arch = "wasm32")]
impl<T> MaybeSync for T {}

/// Kind of row change reported by the feed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeKind {
    Insert,
    Update,
    Delete,
}

/// One entry of the change feed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "table", rename_all = "snake_case")]
pub enum ChangeEvent {
    Session { kind: ChangeKind, row: SessionRow },
    Player { delta: RosterDelta },
}

/// Row-oriented store for sessions, players and topics.
pub trait SessionStore: MaybeSync {
    /// Read the session row of a room.
    fn load_session(&self, room: &RoomId) -> BoxFuture<'_, StorageResult<Option<SessionRow>>>;

    /// Create the session row of a room.
    fn insert_session(&self, room: &RoomId, row: &SessionRow) -> BoxFuture<'_, StorageResult<()>>;

    /// Overwrite the session row of a room.
    fn update_session(&self, room: &RoomId, row: &SessionRow) -> BoxFuture<'_, StorageResult<()>>;

    /// All players of a room in insertion order.
    fn load_players(&self, room: &RoomId) -> BoxFuture<'_, StorageResult<Vec<Player>>>;

    fn insert_player(&self, room: &RoomId, player: &Player) -> BoxFuture<'_, StorageResult<()>>;

    fn update_player(&self, room: &RoomId, player: &Player) -> BoxFuture<'_, StorageResult<()>>;

    fn delete_player(&self, room: &RoomId, id: &PlayerId) -> BoxFuture<'_, StorageResult<()>>;

    /// The topic pool.
    fn load_topics(&self) -> BoxFuture<'_, StorageResult<Vec<Topic>>>;

    /// Drain pending change-feed entries for a room.
    fn take_changes(&self, room: &RoomId) -> Vec<ChangeEvent>;
}

/// Everything a peer needs to leave `loading`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InitialData {
    pub session: Option<SessionRow>,
    pub players: Vec<Player>,
    pub topics: Vec<Topic>,
}

/// Load the baseline for a room.
pub async fn load_initial<S: SessionStore + ?Sized>(
    store: &S,
    room: &RoomId,
) -> StorageResult<InitialData> {
    let session = store.load_session(room).await?;
    let players = store.load_players(room).await?;
    let topics = store.load_topics().await?;
    log::info!(
        "Loaded room {}: {} players, {} topics, session row {}",
        room,
        players.len(),
        topics.len(),
        if session.is_some() { "present" } else { "missing" }
    );
    Ok(InitialData {
        session,
        players,
        topics,
    })
}

/// A write queued by a peer for the host to perform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PersistenceWrite {
    UpdateSession { room: RoomId, row: SessionRow },
    UpdatePlayer { room: RoomId, player: Player },
}

/// Perform a queued write.
pub async fn apply_write<S: SessionStore + ?Sized>(store: &S, write: &PersistenceWrite) -> StorageResult<()> {
    match write {
        PersistenceWrite::UpdateSession { room, row } => store.update_session(room, row).await,
        PersistenceWrite::UpdatePlayer { room, player } => store.update_player(room, player).await,
    }
}

#[cfg(test)]
pub(crate) fn block_on<F: std::future::Future>(f: F) -> F::Output {
    // Simple blocking executor for tests
    use std::task::{Context, Poll, RawWaker, RawWakerVTable, Waker};

    fn dummy_raw_waker() -> RawWaker {
        fn no_op(_: *const ()) {}
        fn clone(_: *const ()) -> RawWaker {
            dummy_raw_waker()
        }
        static VTABLE: RawWakerVTable = RawWakerVTable::new(clone, no_op, no_op, no_op);
        RawWaker::new(std::ptr::null(), &VTABLE)
    }

    let waker = unsafe { Waker::from_raw(dummy_raw_waker()) };
    let mut cx = Context::from_waker(&waker);
    let mut f = std::pin::pin!(f);

    loop {
        if let Poll::Ready(result) = f.as_mut().poll(&mut cx) {
            return result;
        }
    }
}
