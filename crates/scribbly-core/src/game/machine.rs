//! The turn-based round state machine.
//!
//! ```text
//! loading ─▶ idle ─START_GAME─▶ showTopic ─START_DRAWING─▶ drawing
//!              ▲                    ▲                          │
//!          NEW_GAME                 │ (more rounds)      END_DRAWING
//!              │                    │                          ▼
//!            over ◀─(all played)─ checkGameStatus ◀─SELECT_WINNER─ waitingForWinner
//! ```
//!
//! `checkGameStatus` never rests: it is entered and left inside the
//! SELECT_WINNER transition.

use super::session::{Session, SessionStatus};
use crate::config::GameConfig;
use crate::model::{Player, PlayerId, RoomId, Topic, TopicId};
use crate::roster::RosterReconciler;
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Wire value meaning "nobody guessed the topic".
pub const NO_WINNER: &str = "none";

/// Who guessed the topic at the end of a round.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Winner {
    Nobody,
    Player(PlayerId),
}

impl From<String> for Winner {
    fn from(id: String) -> Self {
        if id == NO_WINNER || id.is_empty() {
            Winner::Nobody
        } else {
            Winner::Player(id)
        }
    }
}

impl From<Winner> for String {
    fn from(winner: Winner) -> Self {
        match winner {
            Winner::Nobody => NO_WINNER.to_string(),
            Winner::Player(id) => id,
        }
    }
}

/// Events that drive the state machine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GameEvent {
    StartGame,
    SetTimer { seconds: u32 },
    StartDrawing,
    EndDrawing { time_left: u32 },
    SelectWinner { winner: Winner },
    NewGame,
}

impl GameEvent {
    /// Short name used in logs and errors.
    pub fn name(&self) -> &'static str {
        match self {
            GameEvent::StartGame => "START_GAME",
            GameEvent::SetTimer { .. } => "SET_TIMER",
            GameEvent::StartDrawing => "START_DRAWING",
            GameEvent::EndDrawing { .. } => "END_DRAWING",
            GameEvent::SelectWinner { .. } => "SELECT_WINNER",
            GameEvent::NewGame => "NEW_GAME",
        }
    }
}

/// A refused transition. The session is left exactly as it was.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GameError {
    #[error("{event} is not accepted while {state}")]
    InvalidTransition {
        state: SessionStatus,
        event: &'static str,
    },
    #[error("need at least {required} players to start, have {actual}")]
    NotEnoughPlayers { required: usize, actual: usize },
    #[error("topic pool is empty")]
    NoTopics,
}

/// What a successful transition did, for the caller to act on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transition {
    pub from: SessionStatus,
    pub to: SessionStatus,
    /// Players whose score or played flag changed.
    pub updated_players: Vec<PlayerId>,
    /// The drawing surface must be wiped.
    pub reset_surface: bool,
}

impl Transition {
    fn new(from: SessionStatus, to: SessionStatus) -> Self {
        Self {
            from,
            to,
            updated_players: Vec::new(),
            reset_surface: false,
        }
    }

    pub fn entered(&self, status: SessionStatus) -> bool {
        self.to == status && self.from != status
    }
}

/// Owns the session of one room while this peer drives transitions.
pub struct GameSession {
    room: RoomId,
    config: GameConfig,
    session: Session,
    topics: Vec<Topic>,
    rng: StdRng,
}

impl GameSession {
    /// A session in `loading`, waiting for [`GameSession::load`].
    pub fn new(room: RoomId, config: GameConfig) -> Self {
        let session = Session::new(config.default_round_duration);
        Self {
            room,
            config,
            session,
            topics: Vec::new(),
            rng: StdRng::from_entropy(),
        }
    }

    /// Use a specific random source (seeded in tests).
    pub fn with_rng(mut self, rng: StdRng) -> Self {
        self.rng = rng;
        self
    }

    pub fn room(&self) -> &RoomId {
        &self.room
    }

    pub fn config(&self) -> &GameConfig {
        &self.config
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn status(&self) -> SessionStatus {
        self.session.status
    }

    pub fn topics(&self) -> &[Topic] {
        &self.topics
    }

    /// The topic being drawn this round.
    pub fn current_topic(&self) -> Option<&Topic> {
        let id = self.session.current_topic.as_ref()?;
        self.topics.iter().find(|t| &t.id == id)
    }

    /// Finish loading: install the stored session and topic pool.
    ///
    /// A stored session still marked `loading` is a fresh row and moves to
    /// `idle`; anything else is a game already in progress and is kept.
    pub fn load(&mut self, session: Session, topics: Vec<Topic>) -> Transition {
        let from = self.session.status;
        self.session = session;
        self.topics = topics;
        if self.session.status == SessionStatus::Loading {
            self.session.status = SessionStatus::Idle;
        }
        log::info!(
            "Room {} loaded: status {}, {} topics",
            self.room,
            self.session.status,
            self.topics.len()
        );
        Transition::new(from, self.session.status)
    }

    /// Replace the whole session with one observed remotely.
    pub fn replace_session(&mut self, session: Session) {
        self.session = session;
    }

    /// Re-resolve drawer references after the roster changed.
    pub fn refresh_references(&mut self, roster: &RosterReconciler) {
        self.session.refresh_references(roster);
    }

    /// Countdown update while drawing.
    pub fn set_time_left(&mut self, seconds: u32) {
        self.session.time_left = seconds.min(self.session.current_round_duration);
    }

    /// Apply one event. On error nothing is modified.
    pub fn handle(
        &mut self,
        event: GameEvent,
        roster: &mut RosterReconciler,
    ) -> Result<Transition, GameError> {
        let from = self.session.status;
        let name = event.name();
        let refused = || GameError::InvalidTransition { state: from, event: name };

        let transition = match (from, event) {
            (SessionStatus::Idle, GameEvent::StartGame) => self.start_game(roster)?,
            (SessionStatus::Idle, GameEvent::SetTimer { seconds }) => {
                self.session.current_round_duration = seconds;
                self.session.time_left = seconds;
                Transition::new(from, SessionStatus::Idle)
            }
            (SessionStatus::ShowTopic, GameEvent::StartDrawing) => {
                self.session.time_left = self.session.current_round_duration;
                self.session.status = SessionStatus::Drawing;
                let mut t = Transition::new(from, SessionStatus::Drawing);
                t.reset_surface = true;
                t
            }
            (SessionStatus::Drawing, GameEvent::EndDrawing { time_left }) => {
                self.end_drawing(time_left, roster)
            }
            (SessionStatus::WaitingForWinner, GameEvent::SelectWinner { winner }) => {
                self.select_winner(winner, roster)
            }
            (SessionStatus::Over, GameEvent::NewGame) => self.new_game(roster),
            _ => return Err(refused()),
        };

        self.session.refresh_references(roster);
        log::info!(
            "Room {}: {} {} -> {}",
            self.room,
            name,
            transition.from,
            transition.to
        );
        Ok(transition)
    }

    fn start_game(&mut self, roster: &RosterReconciler) -> Result<Transition, GameError> {
        if roster.len() < self.config.min_players {
            return Err(GameError::NotEnoughPlayers {
                required: self.config.min_players,
                actual: roster.len(),
            });
        }
        if self.topics.is_empty() {
            return Err(GameError::NoTopics);
        }

        let designated = self
            .session
            .next_drawer_id()
            .and_then(|id| roster.get(id))
            .filter(|p| !p.has_played);
        let drawer = designated
            .or_else(|| roster.players().iter().find(|p| !p.has_played))
            .or_else(|| roster.players().first())
            .cloned();

        self.session.current_drawer = drawer;
        self.session.next_drawer = None;
        self.session.time_left = self.session.current_round_duration;
        self.pick_topic();
        self.session.status = SessionStatus::ShowTopic;
        Ok(Transition::new(SessionStatus::Idle, SessionStatus::ShowTopic))
    }

    fn end_drawing(&mut self, time_left: u32, roster: &mut RosterReconciler) -> Transition {
        let mut transition = Transition::new(SessionStatus::Drawing, SessionStatus::WaitingForWinner);
        let points = self.round_points(time_left);
        let drawer_id = self.session.current_drawer_id().map(str::to_string);

        if let Some(id) = &drawer_id {
            if let Some(drawer) = roster.get_mut(id) {
                drawer.score += points;
                drawer.has_played = true;
                transition.updated_players.push(id.clone());
                log::debug!("Drawer {} scored {} points", id, points);
            }
        }

        let candidates: Vec<_> = roster
            .players()
            .iter()
            .filter(|p| !p.has_played && Some(&p.id) != drawer_id.as_ref())
            .collect();
        self.session.next_drawer = candidates.choose(&mut self.rng).map(|p| (*p).clone());

        self.session.time_left = time_left.min(self.session.current_round_duration);
        self.session.played_rounds += 1;
        self.session.status = SessionStatus::WaitingForWinner;
        transition
    }

    /// `round(time_left / duration × max_round_points)`, clamped to the round.
    pub fn round_points(&self, time_left: u32) -> u32 {
        let duration = self.session.current_round_duration;
        if duration == 0 {
            return 0;
        }
        let fraction = time_left.min(duration) as f64 / duration as f64;
        (fraction * self.config.max_round_points as f64).round() as u32
    }

    fn select_winner(&mut self, winner: Winner, roster: &mut RosterReconciler) -> Transition {
        let mut updated_players = Vec::new();
        if let Winner::Player(id) = winner {
            match roster.get_mut(&id) {
                Some(player) => {
                    player.score += self.config.guess_bonus;
                    updated_players.push(id);
                }
                None => log::debug!("Winner {} not in roster, no bonus", id),
            }
        }

        self.session.status = SessionStatus::CheckGameStatus;
        let mut transition = self.check_game_status(roster);
        transition.from = SessionStatus::WaitingForWinner;
        transition.updated_players = updated_players;
        transition
    }

    fn check_game_status(&mut self, roster: &RosterReconciler) -> Transition {
        let from = SessionStatus::CheckGameStatus;
        let designated = self
            .session
            .next_drawer_id()
            .and_then(|id| roster.get(id))
            .cloned();
        // The designated drawer may have left since END_DRAWING.
        let next = designated.or_else(|| self.repick_next_drawer(roster));

        if self.session.played_rounds as usize >= roster.len() || next.is_none() {
            self.session.status = SessionStatus::Over;
            return Transition::new(from, SessionStatus::Over);
        }

        self.session.current_drawer = next;
        self.session.next_drawer = None;
        self.session.time_left = self.session.current_round_duration;
        self.pick_topic();
        self.session.status = SessionStatus::ShowTopic;
        Transition::new(from, SessionStatus::ShowTopic)
    }

    fn repick_next_drawer(&mut self, roster: &RosterReconciler) -> Option<Player> {
        let current = self.session.current_drawer_id();
        let candidates: Vec<_> = roster
            .players()
            .iter()
            .filter(|p| !p.has_played && Some(p.id.as_str()) != current)
            .collect();
        let picked = candidates.choose(&mut self.rng).map(|p| (*p).clone());
        if let Some(player) = &picked {
            log::debug!("Room {}: next drawer gone, picked {}", self.room, player.id);
        }
        picked
    }

    fn new_game(&mut self, roster: &mut RosterReconciler) -> Transition {
        let mut transition = Transition::new(SessionStatus::Over, SessionStatus::Idle);
        for player in roster.players_mut() {
            if player.score != 0 || player.has_played {
                player.score = 0;
                player.has_played = false;
                transition.updated_players.push(player.id.clone());
            }
        }

        self.session.played_rounds = 0;
        self.session.current_drawer = None;
        self.session.next_drawer = None;
        self.session.current_topic = None;
        self.session.time_left = self.session.current_round_duration;
        self.session.status = SessionStatus::Idle;
        transition
    }

    /// Choose an unused topic at random and mark it used.
    ///
    /// Once every topic has been used the used set is reset and the whole
    /// pool is eligible again.
    fn pick_topic(&mut self) -> Option<TopicId> {
        let mut candidates: Vec<&Topic> = self
            .topics
            .iter()
            .filter(|t| !self.session.past_topics.contains(&t.id))
            .collect();

        if candidates.is_empty() && !self.topics.is_empty() {
            log::info!("Room {}: topic pool exhausted, reusing topics", self.room);
            self.session.past_topics.clear();
            candidates = self.topics.iter().collect();
        }

        let picked = candidates.choose(&mut self.rng).map(|t| t.id.clone());
        match &picked {
            Some(id) => self.session.mark_topic_used(id),
            None => log::warn!("Room {}: no topic available", self.room),
        }
        self.session.current_topic = picked.clone();
        picked
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::roster::RosterDelta;

    fn topics(n: usize) -> Vec<Topic> {
        (0..n)
            .map(|i| Topic::new(format!("t{i}"), format!("Topic {i}"), ""))
            .collect()
    }

    fn setup(players: &[&str], topic_count: usize) -> (GameSession, RosterReconciler) {
        let mut roster = RosterReconciler::new();
        roster.load_baseline(players.iter().map(|id| Player::new(*id, id.to_uppercase())).collect());
        let mut game = GameSession::new(RoomId::new("room"), GameConfig::default())
            .with_rng(StdRng::seed_from_u64(7));
        game.load(Session::default(), topics(topic_count));
        (game, roster)
    }

    fn play_round(game: &mut GameSession, roster: &mut RosterReconciler, time_left: u32, winner: Winner) -> Transition {
        game.handle(GameEvent::StartDrawing, roster).unwrap();
        game.handle(GameEvent::EndDrawing { time_left }, roster).unwrap();
        game.handle(GameEvent::SelectWinner { winner }, roster).unwrap()
    }

    #[test]
    fn test_load_moves_to_idle() {
        let (game, _) = setup(&["a", "b"], 3);
        assert_eq!(game.status(), SessionStatus::Idle);
    }

    #[test]
    fn test_start_game_needs_two_players() {
        let (mut game, mut roster) = setup(&["a"], 3);
        let before = game.session().clone();
        let err = game.handle(GameEvent::StartGame, &mut roster).unwrap_err();
        assert_eq!(err, GameError::NotEnoughPlayers { required: 2, actual: 1 });
        assert_eq!(game.session(), &before);
    }

    #[test]
    fn test_start_game_picks_drawer_and_unused_topic() {
        let (mut game, mut roster) = setup(&["a", "b"], 3);
        game.session.past_topics = vec!["t0".into(), "t1".into()];

        let t = game.handle(GameEvent::StartGame, &mut roster).unwrap();
        assert_eq!(t.to, SessionStatus::ShowTopic);
        assert_eq!(game.session().current_drawer_id(), Some("a"));
        assert_eq!(game.session().current_topic.as_deref(), Some("t2"));
        assert!(game.session().past_topics.contains(&"t2".to_string()));
        assert_eq!(game.current_topic().unwrap().title, "Topic 2");
    }

    #[test]
    fn test_start_game_prefers_designated_next_drawer() {
        let (mut game, mut roster) = setup(&["a", "b", "c"], 3);
        game.session.next_drawer = roster.get("c").cloned();
        game.handle(GameEvent::StartGame, &mut roster).unwrap();
        assert_eq!(game.session().current_drawer_id(), Some("c"));
    }

    #[test]
    fn test_start_game_refused_without_topics() {
        let (mut game, mut roster) = setup(&["a", "b"], 0);
        assert_eq!(game.handle(GameEvent::StartGame, &mut roster), Err(GameError::NoTopics));
        assert_eq!(game.status(), SessionStatus::Idle);
    }

    #[test]
    fn test_set_timer_only_in_idle() {
        let (mut game, mut roster) = setup(&["a", "b"], 3);
        game.handle(GameEvent::SetTimer { seconds: 90 }, &mut roster).unwrap();
        assert_eq!(game.session().current_round_duration, 90);
        assert_eq!(game.session().time_left, 90);

        game.handle(GameEvent::StartGame, &mut roster).unwrap();
        let err = game.handle(GameEvent::SetTimer { seconds: 10 }, &mut roster).unwrap_err();
        assert!(matches!(err, GameError::InvalidTransition { state: SessionStatus::ShowTopic, .. }));
    }

    #[test]
    fn test_start_drawing_resets_surface() {
        let (mut game, mut roster) = setup(&["a", "b"], 3);
        game.handle(GameEvent::StartGame, &mut roster).unwrap();
        let t = game.handle(GameEvent::StartDrawing, &mut roster).unwrap();
        assert!(t.reset_surface);
        assert!(t.entered(SessionStatus::Drawing));
    }

    #[test]
    fn test_instant_guess_awards_full_points() {
        let (mut game, mut roster) = setup(&["a", "b"], 3);
        game.handle(GameEvent::StartGame, &mut roster).unwrap();
        game.handle(GameEvent::StartDrawing, &mut roster).unwrap();
        let t = game.handle(GameEvent::EndDrawing { time_left: 60 }, &mut roster).unwrap();

        assert_eq!(t.to, SessionStatus::WaitingForWinner);
        assert_eq!(t.updated_players, vec!["a".to_string()]);
        let drawer = roster.get("a").unwrap();
        assert_eq!(drawer.score, 20);
        assert!(drawer.has_played);
        assert_eq!(game.session().played_rounds, 1);
        assert_eq!(game.session().next_drawer_id(), Some("b"));
        assert_eq!(game.session().current_drawer.as_ref().unwrap().score, 20);
    }

    #[test]
    fn test_timeout_awards_nothing() {
        let (mut game, mut roster) = setup(&["a", "b"], 3);
        game.handle(GameEvent::StartGame, &mut roster).unwrap();
        game.handle(GameEvent::StartDrawing, &mut roster).unwrap();
        game.handle(GameEvent::EndDrawing { time_left: 0 }, &mut roster).unwrap();
        assert_eq!(roster.get("a").unwrap().score, 0);
    }

    #[test]
    fn test_round_points_rounding() {
        let (game, _) = setup(&["a", "b"], 1);
        assert_eq!(game.round_points(30), 10);
        assert_eq!(game.round_points(45), 15);
        // 20 * 40 / 60 = 13.33
        assert_eq!(game.round_points(40), 13);
        assert_eq!(game.round_points(500), 20);
    }

    #[test]
    fn test_no_winner_leaves_scores() {
        let (mut game, mut roster) = setup(&["a", "b", "c"], 5);
        game.handle(GameEvent::StartGame, &mut roster).unwrap();
        game.handle(GameEvent::StartDrawing, &mut roster).unwrap();
        game.handle(GameEvent::EndDrawing { time_left: 0 }, &mut roster).unwrap();
        let before: Vec<u32> = roster.players().iter().map(|p| p.score).collect();

        let t = game
            .handle(GameEvent::SelectWinner { winner: Winner::Nobody }, &mut roster)
            .unwrap();
        assert!(t.updated_players.is_empty());
        let after: Vec<u32> = roster.players().iter().map(|p| p.score).collect();
        assert_eq!(before, after);
    }

    #[test]
    fn test_unknown_winner_leaves_scores() {
        let (mut game, mut roster) = setup(&["a", "b"], 5);
        game.handle(GameEvent::StartGame, &mut roster).unwrap();
        game.handle(GameEvent::StartDrawing, &mut roster).unwrap();
        game.handle(GameEvent::EndDrawing { time_left: 0 }, &mut roster).unwrap();
        game.handle(
            GameEvent::SelectWinner { winner: Winner::Player("ghost".into()) },
            &mut roster,
        )
        .unwrap();
        assert!(roster.players().iter().all(|p| p.score == 0));
    }

    #[test]
    fn test_winner_gets_bonus_and_next_round_starts() {
        let (mut game, mut roster) = setup(&["a", "b"], 5);
        game.handle(GameEvent::StartGame, &mut roster).unwrap();
        let t = play_round(&mut game, &mut roster, 30, Winner::Player("b".into()));

        assert_eq!(t.from, SessionStatus::WaitingForWinner);
        assert_eq!(t.to, SessionStatus::ShowTopic);
        assert_eq!(t.updated_players, vec!["b".to_string()]);
        assert_eq!(roster.get("b").unwrap().score, 5);
        assert_eq!(game.session().current_drawer_id(), Some("b"));
        assert_eq!(game.session().past_topics.len(), 2);
    }

    #[test]
    fn test_game_over_after_every_player_drew() {
        let (mut game, mut roster) = setup(&["a", "b", "c"], 5);
        game.handle(GameEvent::StartGame, &mut roster).unwrap();

        let mut drawers = Vec::new();
        let mut last = None;
        for _ in 0..3 {
            drawers.push(game.session().current_drawer_id().unwrap().to_string());
            last = Some(play_round(&mut game, &mut roster, 60, Winner::Nobody));
        }

        assert_eq!(last.unwrap().to, SessionStatus::Over);
        assert_eq!(game.session().played_rounds, 3);
        drawers.sort();
        assert_eq!(drawers, vec!["a", "b", "c"]);
        assert!(roster.players().iter().all(|p| p.score == 20 && p.has_played));
    }

    #[test]
    fn test_check_game_status_over_iff_rounds_reach_players() {
        for (played, expected) in [(1, SessionStatus::ShowTopic), (2, SessionStatus::Over), (3, SessionStatus::Over)] {
            let (mut game, roster) = setup(&["a", "b"], 5);
            game.session.status = SessionStatus::CheckGameStatus;
            game.session.played_rounds = played;
            game.session.next_drawer = roster.get("b").cloned();
            let t = game.check_game_status(&roster);
            assert_eq!(t.to, expected, "played_rounds = {played}");
        }
    }

    #[test]
    fn test_no_unplayed_candidate_ends_game() {
        let (mut game, mut roster) = setup(&["a", "b", "c"], 5);
        for player in roster.players_mut() {
            player.has_played = true;
        }
        game.session.status = SessionStatus::CheckGameStatus;
        game.session.played_rounds = 1;
        game.session.next_drawer = None;
        assert_eq!(game.check_game_status(&roster).to, SessionStatus::Over);
    }

    #[test]
    fn test_departed_next_drawer_is_replaced() {
        let (mut game, mut roster) = setup(&["a", "b", "c"], 5);
        game.handle(GameEvent::StartGame, &mut roster).unwrap();
        game.handle(GameEvent::StartDrawing, &mut roster).unwrap();
        game.handle(GameEvent::EndDrawing { time_left: 30 }, &mut roster).unwrap();

        let drawer = game.session().current_drawer_id().unwrap().to_string();
        let leaving = game.session().next_drawer_id().unwrap().to_string();
        roster.apply(RosterDelta::Delete { id: leaving.clone() });
        let remaining = roster
            .players()
            .iter()
            .find(|p| p.id != drawer)
            .map(|p| p.id.clone())
            .unwrap();

        let t = game
            .handle(GameEvent::SelectWinner { winner: Winner::Nobody }, &mut roster)
            .unwrap();
        assert_eq!(t.to, SessionStatus::ShowTopic);
        assert_eq!(game.session().played_rounds, 1);
        assert_eq!(game.session().current_drawer_id(), Some(remaining.as_str()));
        assert!(game.session().next_drawer.is_none());
    }

    #[test]
    fn test_new_game_resets_players_keeps_duration() {
        let (mut game, mut roster) = setup(&["a", "b"], 5);
        game.handle(GameEvent::SetTimer { seconds: 30 }, &mut roster).unwrap();
        game.handle(GameEvent::StartGame, &mut roster).unwrap();
        play_round(&mut game, &mut roster, 30, Winner::Player("b".into()));
        play_round(&mut game, &mut roster, 30, Winner::Player("a".into()));
        assert_eq!(game.status(), SessionStatus::Over);

        let t = game.handle(GameEvent::NewGame, &mut roster).unwrap();
        assert_eq!(t.to, SessionStatus::Idle);
        assert_eq!(t.updated_players.len(), 2);
        assert!(roster.players().iter().all(|p| p.score == 0 && !p.has_played));
        assert_eq!(game.session().played_rounds, 0);
        assert_eq!(game.session().current_round_duration, 30);
    }

    #[test]
    fn test_topic_pool_exhaustion_resets_used_topics() {
        let (mut game, mut roster) = setup(&["a", "b", "c"], 1);
        game.handle(GameEvent::StartGame, &mut roster).unwrap();
        assert_eq!(game.session().current_topic.as_deref(), Some("t0"));

        play_round(&mut game, &mut roster, 10, Winner::Nobody);
        assert_eq!(game.status(), SessionStatus::ShowTopic);
        assert_eq!(game.session().current_topic.as_deref(), Some("t0"));
        assert_eq!(game.session().past_topics, vec!["t0".to_string()]);
    }

    #[test]
    fn test_events_refused_while_loading() {
        let mut roster = RosterReconciler::new();
        let mut game = GameSession::new(RoomId::new("room"), GameConfig::default());
        let err = game.handle(GameEvent::StartGame, &mut roster).unwrap_err();
        assert!(matches!(err, GameError::InvalidTransition { state: SessionStatus::Loading, .. }));
    }

    #[test]
    fn test_event_wire_format() {
        let json = r#"{"type":"SELECT_WINNER","winner":"none"}"#;
        let event: GameEvent = serde_json::from_str(json).unwrap();
        assert_eq!(event, GameEvent::SelectWinner { winner: Winner::Nobody });

        let json = serde_json::to_string(&GameEvent::EndDrawing { time_left: 12 }).unwrap();
        assert_eq!(json, r#"{"type":"END_DRAWING","time_left":12}"#);
    }
}
