//! Session state shared by every peer of a room.

use crate::model::{Player, PlayerId, TopicId};
use crate::roster::RosterReconciler;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Where a room is in the round lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub enum SessionStatus {
    /// Initial data has not arrived yet.
    #[default]
    Loading,
    Idle,
    ShowTopic,
    Drawing,
    WaitingForWinner,
    /// Transient: evaluated and left within the same transition.
    CheckGameStatus,
    Over,
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SessionStatus::Loading => "loading",
            SessionStatus::Idle => "idle",
            SessionStatus::ShowTopic => "showTopic",
            SessionStatus::Drawing => "drawing",
            SessionStatus::WaitingForWinner => "waitingForWinner",
            SessionStatus::CheckGameStatus => "checkGameStatus",
            SessionStatus::Over => "over",
        };
        f.write_str(name)
    }
}

/// Full game state of a room with drawer references materialized.
///
/// `current_drawer` and `next_drawer` are copies looked up by id in the
/// roster; the roster stays the source of truth for scores. Equality is
/// structural over every field, which is what the reconciler relies on to
/// skip redundant replacements.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub status: SessionStatus,
    pub current_drawer: Option<Player>,
    pub next_drawer: Option<Player>,
    pub played_rounds: u32,
    pub current_round_duration: u32,
    pub time_left: u32,
    pub current_topic: Option<TopicId>,
    pub past_topics: Vec<TopicId>,
}

impl Session {
    /// A session waiting for its initial load.
    pub fn new(round_duration: u32) -> Self {
        Self {
            status: SessionStatus::Loading,
            current_drawer: None,
            next_drawer: None,
            played_rounds: 0,
            current_round_duration: round_duration,
            time_left: round_duration,
            current_topic: None,
            past_topics: Vec::new(),
        }
    }

    /// Id of the player currently drawing.
    pub fn current_drawer_id(&self) -> Option<&str> {
        self.current_drawer.as_ref().map(|p| p.id.as_str())
    }

    /// Id of the player designated to draw next.
    pub fn next_drawer_id(&self) -> Option<&str> {
        self.next_drawer.as_ref().map(|p| p.id.as_str())
    }

    /// Record a topic as used, keeping `past_topics` free of duplicates.
    pub fn mark_topic_used(&mut self, topic: &TopicId) {
        if !self.past_topics.contains(topic) {
            self.past_topics.push(topic.clone());
        }
    }

    /// The persisted form, with drawer references reduced to ids.
    pub fn to_row(&self) -> SessionRow {
        SessionRow {
            status: self.status,
            current_drawer_id: self.current_drawer.as_ref().map(|p| p.id.clone()),
            next_drawer_id: self.next_drawer.as_ref().map(|p| p.id.clone()),
            played_rounds: self.played_rounds,
            current_round_duration: self.current_round_duration,
            time_left: self.time_left,
            current_topic: self.current_topic.clone(),
            past_topics: self.past_topics.clone(),
        }
    }

    /// Re-resolve both drawer references against the roster.
    ///
    /// Ids that are no longer in the roster resolve to `None`.
    pub fn refresh_references(&mut self, roster: &RosterReconciler) {
        self.current_drawer = resolve(roster, self.current_drawer_id());
        self.next_drawer = resolve(roster, self.next_drawer_id());
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new(crate::config::DEFAULT_ROUND_DURATION_SECS)
    }
}

/// Session as stored in the persistence row: drawers are plain ids.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionRow {
    pub status: SessionStatus,
    pub current_drawer_id: Option<PlayerId>,
    pub next_drawer_id: Option<PlayerId>,
    pub played_rounds: u32,
    pub current_round_duration: u32,
    pub time_left: u32,
    pub current_topic: Option<TopicId>,
    #[serde(default)]
    pub past_topics: Vec<TopicId>,
}

impl SessionRow {
    /// Materialize a [`Session`] by looking drawer ids up in the roster.
    pub fn resolve(&self, roster: &RosterReconciler) -> Session {
        let mut past_topics: Vec<TopicId> = Vec::with_capacity(self.past_topics.len());
        for topic in &self.past_topics {
            if !past_topics.contains(topic) {
                past_topics.push(topic.clone());
            }
        }

        Session {
            status: self.status,
            current_drawer: resolve(roster, self.current_drawer_id.as_deref()),
            next_drawer: resolve(roster, self.next_drawer_id.as_deref()),
            played_rounds: self.played_rounds,
            current_round_duration: self.current_round_duration,
            time_left: self.time_left,
            current_topic: self.current_topic.clone(),
            past_topics,
        }
    }
}

fn resolve(roster: &RosterReconciler, id: Option<&str>) -> Option<Player> {
    let id = id?;
    let found = roster.get(id).cloned();
    if found.is_none() {
        log::debug!("Drawer {} not in roster, reference cleared", id);
    }
    found
}
