//! Local mirror of a room's players.
//!
//! Deltas come from the persistence change feed with no ordering promise
//! and possibly more than once, so every delta is applied idempotently.
//! Deltas that show up before the baseline load are held back and replayed
//! once the baseline is installed.

use crate::model::{Player, PlayerId};
use serde::{Deserialize, Serialize};

/// A single change to the player collection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RosterDelta {
    Insert { player: Player },
    Update { player: Player },
    Delete { id: PlayerId },
}

/// What applying a delta did to the mirror.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RosterChange {
    Inserted,
    Updated,
    Removed,
    /// The delta matched what was already there.
    Unchanged,
    /// Held until the baseline load completes.
    Buffered,
}

impl RosterChange {
    /// True if the visible player list changed.
    pub fn is_change(self) -> bool {
        matches!(self, RosterChange::Inserted | RosterChange::Updated | RosterChange::Removed)
    }
}

/// Applies roster deltas onto a locally held player list.
#[derive(Debug, Clone, Default)]
pub struct RosterReconciler {
    players: Vec<Player>,
    baseline_loaded: bool,
    pending: Vec<RosterDelta>,
}

impl RosterReconciler {
    /// An empty mirror waiting for its baseline.
    pub fn new() -> Self {
        Self::default()
    }

    /// True once the baseline has been installed.
    pub fn is_loaded(&self) -> bool {
        self.baseline_loaded
    }

    /// Number of deltas waiting for the baseline.
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    /// Install the full player list, then replay buffered deltas in arrival
    /// order. Returns how many buffered deltas changed the mirror.
    pub fn load_baseline(&mut self, players: Vec<Player>) -> usize {
        self.players = Vec::with_capacity(players.len());
        for player in players {
            self.upsert(player);
        }
        self.baseline_loaded = true;

        let pending = std::mem::take(&mut self.pending);
        if !pending.is_empty() {
            log::debug!("Replaying {} buffered roster deltas", pending.len());
        }
        pending
            .into_iter()
            .filter(|delta| self.apply_now(delta.clone()).is_change())
            .count()
    }

    /// Apply a delta, or buffer it if the baseline has not arrived.
    pub fn apply(&mut self, delta: RosterDelta) -> RosterChange {
        if !self.baseline_loaded {
            self.pending.push(delta);
            return RosterChange::Buffered;
        }
        self.apply_now(delta)
    }

    fn apply_now(&mut self, delta: RosterDelta) -> RosterChange {
        match delta {
            // An insert for a known id is a duplicate delivery; treat it as
            // an update so the latest data still wins.
            RosterDelta::Insert { player } | RosterDelta::Update { player } => self.upsert(player),
            RosterDelta::Delete { id } => {
                let before = self.players.len();
                self.players.retain(|p| p.id != id);
                if self.players.len() < before {
                    RosterChange::Removed
                } else {
                    RosterChange::Unchanged
                }
            }
        }
    }

    fn upsert(&mut self, player: Player) -> RosterChange {
        match self.players.iter_mut().find(|p| p.id == player.id) {
            Some(existing) if *existing == player => RosterChange::Unchanged,
            Some(existing) => {
                *existing = player;
                RosterChange::Updated
            }
            None => {
                self.players.push(player);
                RosterChange::Inserted
            }
        }
    }

    /// Players in roster order.
    pub fn players(&self) -> &[Player] {
        &self.players
    }

    pub fn len(&self) -> usize {
        self.players.len()
    }

    pub fn is_empty(&self) -> bool {
        self.players.is_empty()
    }

    /// Look a player up by id.
    pub fn get(&self, id: &str) -> Option<&Player> {
        self.players.iter().find(|p| p.id == id)
    }

    pub(crate) fn get_mut(&mut self, id: &str) -> Option<&mut Player> {
        self.players.iter_mut().find(|p| p.id == id)
    }

    pub(crate) fn players_mut(&mut self) -> impl Iterator<Item = &mut Player> {
        self.players.iter_mut()
    }
}
