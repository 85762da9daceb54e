//! Scribbly Core Library
//!
//! Realtime synchronization engine for a collaborative drawing and guessing
//! game: shared raster surface, replicated undo history and the turn-based
//! round state machine, kept in sync between peers of a room.

pub mod channel;
pub mod config;
pub mod game;
pub mod history;
pub mod model;
pub mod normalize;
pub mod peer;
pub mod protocol;
pub mod reconcile;
#[cfg(not(target_arch = "wasm32"))]
pub mod relay;
pub mod roster;
pub mod snapshot;
pub mod storage;
pub mod surface;
pub mod timer;

pub use channel::{Broadcast, DrawingSyncChannel, Origin, RecordingBroadcast, TransportError};
pub use config::{GameConfig, PeerConfig};
pub use game::{GameError, GameEvent, GameSession, Session, SessionRow, SessionStatus, Winner};
pub use history::UndoHistory;
pub use model::{Player, PlayerId, RoomId, Topic, TopicId};
pub use peer::{Notification, Peer, PeerEvent};
pub use protocol::{BroadcastMessage, DrawingOperation, ProtocolError};
pub use reconcile::SessionReconciler;
#[cfg(not(target_arch = "wasm32"))]
pub use relay::{ConnectionState, RelayClient, RelayEvent};
pub use roster::{RosterDelta, RosterReconciler};
pub use snapshot::SurfaceSnapshot;
pub use storage::{MemoryStore, PersistenceWrite, SessionStore};
pub use surface::{RasterSurface, Surface};
