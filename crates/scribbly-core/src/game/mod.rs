//! Turn-based game session.
//!
//! [`Session`] is the shared state of a room; [`GameSession`] owns it while
//! this peer drives transitions. Drawer references are materialized from
//! the roster by id and never own the player.

mod machine;
mod session;

pub use machine::{GameError, GameEvent, GameSession, Transition, Winner, NO_WINNER};
pub use session::{Session, SessionRow, SessionStatus};
