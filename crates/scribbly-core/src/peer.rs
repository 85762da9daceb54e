//! One peer's event loop.
//!
//! A [`Peer`] owns everything a participant holds locally: its surface, undo
//! history, roster mirror, game session and round countdown. Every input
//! (pointer events, game events, broadcast messages, change-feed entries,
//! clock ticks) goes through one FIFO queue and is handled to completion
//! before the next one starts.
//!
//! The peer never blocks. Writes for the persistence store are queued and
//! drained by the host with [`Peer::take_pending_writes`]; things the UI
//! should react to are drained with [`Peer::take_notifications`].

use crate::channel::{Broadcast, DrawingSyncChannel, Origin};
use crate::config::PeerConfig;
use crate::game::{GameError, GameEvent, GameSession, Session, SessionRow, SessionStatus, Transition};
use crate::history::UndoHistory;
use crate::model::RoomId;
use crate::protocol::{BroadcastMessage, DrawingOperation};
use crate::reconcile::{Reconciled, SessionReconciler};
use crate::roster::RosterReconciler;
use crate::storage::{ChangeEvent, ChangeKind, InitialData, PersistenceWrite};
use crate::surface::Surface;
use crate::timer::{CountdownEvent, Instant, RoundCountdown};
use kurbo::Point;
use rand::rngs::StdRng;
use std::collections::VecDeque;

/// Inputs to the event loop.
#[derive(Debug, Clone)]
pub enum PeerEvent {
    /// Initial load finished.
    Loaded(InitialData),
    /// Pen down on the local surface.
    PointerDown {
        point: Point,
        erasing: bool,
        line_size: f64,
    },
    PointerMove { point: Point },
    /// Pen up. Completes the stroke and records it in the undo history.
    PointerUp,
    Undo,
    ClearCanvas,
    /// A local game action.
    Game(GameEvent),
    /// A message received from the broadcast channel.
    Remote(BroadcastMessage),
    /// An entry of the persistence change feed.
    Change(ChangeEvent),
    /// Clock tick driving the round countdown.
    Tick(Instant),
}

/// Things the host may want to react to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notification {
    SessionChanged,
    RosterChanged,
    CanvasChanged,
    /// A local game event was refused; nothing changed.
    Refused(GameError),
    /// A received undo history had entries that failed to decode.
    HistoryRejected { rejected: usize },
}

#[derive(Debug, Clone, Copy)]
struct Stroke {
    erasing: bool,
    line_size: f64,
}

/// A participant of one room.
pub struct Peer<S: Surface, B: Broadcast> {
    room: RoomId,
    surface: S,
    transport: B,
    channel: DrawingSyncChannel,
    history: UndoHistory,
    roster: RosterReconciler,
    game: GameSession,
    reconciler: SessionReconciler,
    countdown: RoundCountdown,
    queue: VecDeque<PeerEvent>,
    stroke: Option<Stroke>,
    loaded: bool,
    /// Latest session row seen before the initial load.
    early_session: Option<SessionRow>,
    discarded: u64,
    writes: Vec<PersistenceWrite>,
    notifications: Vec<Notification>,
}

impl<S: Surface, B: Broadcast> Peer<S, B> {
    pub fn new(config: PeerConfig, surface: S, transport: B) -> Self {
        let room = config.room;
        Self {
            channel: DrawingSyncChannel::new(room.clone()),
            game: GameSession::new(room.clone(), config.game),
            reconciler: SessionReconciler::new(room.clone()),
            room,
            surface,
            transport,
            history: UndoHistory::new(),
            roster: RosterReconciler::new(),
            countdown: RoundCountdown::new(),
            queue: VecDeque::new(),
            stroke: None,
            loaded: false,
            early_session: None,
            discarded: 0,
            writes: Vec::new(),
            notifications: Vec::new(),
        }
    }

    /// Use a specific random source for drawer and topic selection.
    pub fn with_rng(mut self, rng: StdRng) -> Self {
        self.game = self.game.with_rng(rng);
        self
    }

    pub fn room(&self) -> &RoomId {
        &self.room
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }

    /// Mutable access for the host, e.g. to resize the surface.
    pub fn surface_mut(&mut self) -> &mut S {
        &mut self.surface
    }

    pub fn transport(&self) -> &B {
        &self.transport
    }

    pub fn transport_mut(&mut self) -> &mut B {
        &mut self.transport
    }

    pub fn history(&self) -> &UndoHistory {
        &self.history
    }

    pub fn roster(&self) -> &RosterReconciler {
        &self.roster
    }

    pub fn game(&self) -> &GameSession {
        &self.game
    }

    pub fn session(&self) -> &Session {
        self.game.session()
    }

    pub fn status(&self) -> SessionStatus {
        self.game.status()
    }

    pub fn is_loaded(&self) -> bool {
        self.loaded
    }

    /// True while the round countdown is armed.
    pub fn countdown_running(&self) -> bool {
        self.countdown.is_running()
    }

    /// Broadcast messages dropped as malformed or invalid.
    pub fn discarded(&self) -> u64 {
        self.discarded
    }

    pub fn channel(&self) -> &DrawingSyncChannel {
        &self.channel
    }

    /// Drain writes the host must perform against the persistence store.
    pub fn take_pending_writes(&mut self) -> Vec<PersistenceWrite> {
        std::mem::take(&mut self.writes)
    }

    pub fn take_notifications(&mut self) -> Vec<Notification> {
        std::mem::take(&mut self.notifications)
    }

    /// Queue an event and run the loop until the queue is empty.
    pub fn dispatch(&mut self, event: PeerEvent) {
        self.queue.push_back(event);
        while let Some(event) = self.queue.pop_front() {
            self.handle(event);
        }
    }

    /// Decode a raw broadcast payload and dispatch it. Malformed payloads
    /// are logged and discarded.
    pub fn dispatch_raw(&mut self, json: &str) {
        match BroadcastMessage::decode(json) {
            Ok(message) => self.dispatch(PeerEvent::Remote(message)),
            Err(e) => {
                self.discarded += 1;
                log::warn!("Room {}: discarded broadcast: {}", self.room, e);
            }
        }
    }

    fn handle(&mut self, event: PeerEvent) {
        match event {
            PeerEvent::Loaded(data) => self.on_loaded(data),
            PeerEvent::PointerDown {
                point,
                erasing,
                line_size,
            } => {
                self.stroke = Some(Stroke { erasing, line_size });
                let op = DrawingOperation::pen_down(point, erasing, line_size);
                self.channel.emit(op, &mut self.surface, &mut self.transport);
                self.notify(Notification::CanvasChanged);
            }
            PeerEvent::PointerMove { point } => {
                let Some(stroke) = self.stroke else {
                    return;
                };
                let op = DrawingOperation::pen_move(point, stroke.erasing, stroke.line_size);
                self.channel.emit(op, &mut self.surface, &mut self.transport);
                self.notify(Notification::CanvasChanged);
            }
            PeerEvent::PointerUp => {
                if self.stroke.take().is_some() {
                    if let Err(e) = self.history.record(&self.surface) {
                        log::warn!("Room {}: failed to record stroke: {}", self.room, e);
                    }
                }
            }
            PeerEvent::Undo => {
                if let Some(history) = self.history.undo(&mut self.surface) {
                    self.channel.publish_history(history, &mut self.transport);
                    self.notify(Notification::CanvasChanged);
                }
            }
            PeerEvent::ClearCanvas => self.clear_canvas(Origin::Local),
            PeerEvent::Game(event) => self.on_game_event(event),
            PeerEvent::Remote(message) => self.on_remote(message),
            PeerEvent::Change(change) => self.on_change(change),
            PeerEvent::Tick(now) => self.on_tick(now),
        }
    }

    fn on_loaded(&mut self, data: InitialData) {
        let replayed = self.roster.load_baseline(data.players);
        log::debug!("Room {}: roster baseline loaded, {} buffered deltas applied", self.room, replayed);

        let session = match &data.session {
            Some(row) => row.resolve(&self.roster),
            None => Session::new(self.game.config().default_round_duration),
        };
        let transition = self.game.load(session, data.topics);
        self.loaded = true;

        if let Some(row) = &data.session {
            if row.status != self.game.status() {
                self.queue_session_write();
            }
        }

        self.notify(Notification::RosterChanged);
        self.notify(Notification::SessionChanged);
        self.sync_countdown(transition.from);

        if let Some(row) = self.early_session.take() {
            self.apply_remote_row(&row);
        }
    }

    fn on_game_event(&mut self, event: GameEvent) {
        let name = event.name();
        match self.game.handle(event, &mut self.roster) {
            Ok(transition) => self.after_transition(transition),
            Err(e) => {
                log::info!("Room {}: {} refused: {}", self.room, name, e);
                self.notify(Notification::Refused(e));
            }
        }
    }

    fn after_transition(&mut self, transition: Transition) {
        if transition.reset_surface {
            self.clear_canvas(Origin::Local);
        }
        self.sync_countdown(transition.from);

        for id in &transition.updated_players {
            if let Some(player) = self.roster.get(id) {
                self.writes.push(PersistenceWrite::UpdatePlayer {
                    room: self.room.clone(),
                    player: player.clone(),
                });
            }
        }
        if !transition.updated_players.is_empty() {
            self.notify(Notification::RosterChanged);
        }

        self.queue_session_write();
        self.channel.publish_state(self.game.session(), &mut self.transport);
        self.notify(Notification::SessionChanged);
    }

    fn on_remote(&mut self, message: BroadcastMessage) {
        if let Err(e) = message.validate() {
            self.discarded += 1;
            log::warn!("Room {}: discarded {}: {}", self.room, message.kind(), e);
            return;
        }

        match message {
            BroadcastMessage::DrawLine(op) => match self.channel.on_remote_op(&op, &mut self.surface) {
                Ok(()) => self.notify(Notification::CanvasChanged),
                Err(e) => {
                    self.discarded += 1;
                    log::warn!("Room {}: discarded draw-line: {}", self.room, e);
                }
            },
            BroadcastMessage::ClearCanvas => self.clear_canvas(Origin::Remote),
            BroadcastMessage::UndoDrawing { history } => {
                let report = self.history.replace_from_remote(history, &mut self.surface);
                if report.rejected > 0 {
                    self.notify(Notification::HistoryRejected {
                        rejected: report.rejected,
                    });
                }
                self.notify(Notification::CanvasChanged);
            }
            BroadcastMessage::GameStateUpdate(session) => self.on_remote_row(session.to_row()),
        }
    }

    fn on_change(&mut self, change: ChangeEvent) {
        match change {
            ChangeEvent::Session {
                kind: ChangeKind::Delete,
                ..
            } => {
                log::warn!("Room {}: session row deleted, keeping local session", self.room);
            }
            ChangeEvent::Session { row, .. } => self.on_remote_row(row),
            ChangeEvent::Player { delta } => {
                if !self.roster.apply(delta).is_change() {
                    return;
                }
                self.notify(Notification::RosterChanged);
                let before = self.game.session().clone();
                self.game.refresh_references(&self.roster);
                if *self.game.session() != before {
                    self.notify(Notification::SessionChanged);
                }
            }
        }
    }

    fn on_remote_row(&mut self, row: SessionRow) {
        if self.loaded {
            self.apply_remote_row(&row);
        } else {
            log::debug!("Room {}: session change before load, held", self.room);
            self.early_session = Some(row);
        }
    }

    fn apply_remote_row(&mut self, row: &SessionRow) {
        let incoming = self.reconciler.reconcile_row(row, &self.roster, self.game.session());
        if let Reconciled::Replace(session) = incoming {
            let from = self.game.status();
            self.game.replace_session(session);
            self.sync_countdown(from);
            self.notify(Notification::SessionChanged);
        }
    }

    fn on_tick(&mut self, now: Instant) {
        if self.game.status() != SessionStatus::Drawing {
            self.countdown.cancel();
            return;
        }
        match self.countdown.poll(now) {
            Some(CountdownEvent::Tick { time_left }) => {
                self.game.set_time_left(time_left);
                self.notify(Notification::SessionChanged);
            }
            Some(CountdownEvent::Expired) => {
                log::debug!("Room {}: round timed out", self.room);
                self.game.set_time_left(0);
                self.queue
                    .push_back(PeerEvent::Game(GameEvent::EndDrawing { time_left: 0 }));
            }
            None => {}
        }
    }

    /// Arm the countdown when `drawing` was just entered, cancel it when
    /// anything else is current.
    fn sync_countdown(&mut self, from: SessionStatus) {
        let to = self.game.status();
        if to != SessionStatus::Drawing {
            self.countdown.cancel();
        } else if from != SessionStatus::Drawing || !self.countdown.is_running() {
            self.countdown.start(self.game.session().time_left, Instant::now());
        }
    }

    fn clear_canvas(&mut self, origin: Origin) {
        self.stroke = None;
        self.history.clear(&mut self.surface);
        self.channel.clear(origin, &mut self.surface, &mut self.transport);
        self.notify(Notification::CanvasChanged);
    }

    fn queue_session_write(&mut self) {
        self.writes.push(PersistenceWrite::UpdateSession {
            room: self.room.clone(),
            row: self.game.session().to_row(),
        });
    }

    fn notify(&mut self, notification: Notification) {
        if !self.notifications.contains(&notification) {
            self.notifications.push(notification);
        }
    }
}
