//! Merging remotely observed session changes into the local session.
//!
//! Remote changes replace the local session wholesale; there is no field
//! level merge. Before comparing, drawer ids are resolved against the local
//! roster so the incoming value has the same shape as the local one. An
//! incoming value equal to the local one is dropped, which is what stops a
//! peer's own optimistic update from being re-applied when the persistence
//! feed echoes it back.

use crate::game::{Session, SessionRow};
use crate::model::RoomId;
use crate::roster::RosterReconciler;

/// Outcome of reconciling one incoming session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reconciled {
    /// The incoming session differs; the caller must install it.
    Replace(Session),
    /// Structurally identical to the local session.
    Unchanged,
}

/// Applies remote session-row changes for one room.
#[derive(Debug, Clone)]
pub struct SessionReconciler {
    room: RoomId,
    replaced: u64,
    skipped: u64,
}

impl SessionReconciler {
    pub fn new(room: RoomId) -> Self {
        Self {
            room,
            replaced: 0,
            skipped: 0,
        }
    }

    /// Reconcile a persisted row against the local session.
    pub fn reconcile_row(
        &mut self,
        row: &SessionRow,
        roster: &RosterReconciler,
        local: &Session,
    ) -> Reconciled {
        let incoming = row.resolve(roster);
        if incoming == *local {
            self.skipped += 1;
            log::debug!("Room {}: session change identical, skipped", self.room);
            return Reconciled::Unchanged;
        }

        self.replaced += 1;
        log::debug!(
            "Room {}: session replaced ({} -> {})",
            self.room,
            local.status,
            incoming.status
        );
        Reconciled::Replace(incoming)
    }

    /// Reconcile a session broadcast by another peer.
    ///
    /// The embedded drawer copies may be stale relative to our roster, so
    /// they are reduced to ids and resolved again.
    pub fn reconcile_session(
        &mut self,
        session: &Session,
        roster: &RosterReconciler,
        local: &Session,
    ) -> Reconciled {
        self.reconcile_row(&session.to_row(), roster, local)
    }

    /// Number of replacements performed so far.
    pub fn replaced(&self) -> u64 {
        self.replaced
    }

    /// Number of identical updates skipped so far.
    pub fn skipped(&self) -> u64 {
        self.skipped
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::SessionStatus;
    use crate::model::Player;

    fn roster() -> RosterReconciler {
        let mut roster = RosterReconciler::new();
        roster.load_baseline(vec![Player::new("a", "Ada"), Player::new("b", "Bob")]);
        roster
    }

    fn drawing_row() -> SessionRow {
        SessionRow {
            status: SessionStatus::Drawing,
            current_drawer_id: Some("a".into()),
            next_drawer_id: None,
            played_rounds: 0,
            current_round_duration: 60,
            time_left: 60,
            current_topic: Some("t1".into()),
            past_topics: vec!["t1".into()],
        }
    }

    #[test]
    fn test_echo_of_local_state_is_skipped() {
        let roster = roster();
        let local = drawing_row().resolve(&roster);
        let mut reconciler = SessionReconciler::new(RoomId::new("r"));

        assert_eq!(reconciler.reconcile_row(&drawing_row(), &roster, &local), Reconciled::Unchanged);
        assert_eq!(reconciler.skipped(), 1);
        assert_eq!(reconciler.replaced(), 0);
    }

    #[test]
    fn test_different_row_replaces_wholesale() {
        let roster = roster();
        let local = Session::default();
        let mut reconciler = SessionReconciler::new(RoomId::new("r"));

        match reconciler.reconcile_row(&drawing_row(), &roster, &local) {
            Reconciled::Replace(session) => {
                assert_eq!(session.status, SessionStatus::Drawing);
                assert_eq!(session.current_drawer.unwrap().name, "Ada");
                assert_eq!(session.past_topics, vec!["t1".to_string()]);
            }
            Reconciled::Unchanged => panic!("expected replacement"),
        }
    }

    #[test]
    fn test_unknown_drawer_resolves_to_none() {
        let roster = roster();
        let mut row = drawing_row();
        row.current_drawer_id = Some("gone".into());
        let mut reconciler = SessionReconciler::new(RoomId::new("r"));

        let Reconciled::Replace(session) = reconciler.reconcile_row(&row, &roster, &Session::default()) else {
            panic!("expected replacement");
        };
        assert!(session.current_drawer.is_none());
        assert_eq!(session.status, SessionStatus::Drawing);
    }

    #[test]
    fn test_broadcast_with_stale_drawer_copy_matches_local() {
        let mut roster = roster();
        let local = drawing_row().resolve(&roster);

        // Remote peer saw Ada before her score changed.
        let mut remote = local.clone();
        roster.get_mut("a").unwrap().score = 0;
        remote.current_drawer.as_mut().unwrap().name = "Old name".into();

        let mut reconciler = SessionReconciler::new(RoomId::new("r"));
        assert_eq!(
            reconciler.reconcile_session(&remote, &roster, &local),
            Reconciled::Unchanged
        );
    }
}
