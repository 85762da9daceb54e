//! Wire protocol.
//!
//! Peers exchange [`BroadcastMessage`]s, a tagged union discriminated by its
//! `type` field. The relay server wraps them in [`ClientFrame`] and
//! [`ServerFrame`] for room membership and fan-out.
//!
//! ```json
//! { "type": "draw-line", "x": 10, "y": 20, "isDrawing": true, "isErasing": false,
//!   "lineSize": 4, "sourceWidth": 800, "sourceHeight": 600 }
//! { "type": "clear-canvas" }
//! { "type": "undo-drawing", "history": ["data:image/png;base64,..."] }
//! { "type": "game-state-update", "status": "drawing", ... }
//! ```

use crate::game::Session;
use crate::snapshot::SurfaceSnapshot;
use kurbo::{Point, Size};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A single point-level drawing step.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DrawingOperation {
    /// Position in the emitting peer's surface pixels.
    pub x: f64,
    pub y: f64,
    /// `false` starts a new path at this point, `true` extends the path.
    pub is_drawing: bool,
    pub is_erasing: bool,
    pub line_size: f64,
    /// Emitting peer's surface dimensions.
    pub source_width: u32,
    pub source_height: u32,
}

impl DrawingOperation {
    /// A pen-down step that starts a new path.
    pub fn pen_down(point: Point, is_erasing: bool, line_size: f64) -> Self {
        Self {
            x: point.x,
            y: point.y,
            is_drawing: false,
            is_erasing,
            line_size,
            source_width: 0,
            source_height: 0,
        }
    }

    /// A pen-move step that extends the current path.
    pub fn pen_move(point: Point, is_erasing: bool, line_size: f64) -> Self {
        Self {
            is_drawing: true,
            ..Self::pen_down(point, is_erasing, line_size)
        }
    }

    /// Stamp the emitting surface's dimensions.
    pub fn with_source(mut self, (width, height): (u32, u32)) -> Self {
        self.source_width = width;
        self.source_height = height;
        self
    }

    pub fn point(&self) -> Point {
        Point::new(self.x, self.y)
    }

    pub fn source_size(&self) -> Size {
        Size::new(self.source_width as f64, self.source_height as f64)
    }

    /// Reject operations that cannot be applied safely.
    pub fn validate(&self) -> Result<(), ProtocolError> {
        if self.source_width == 0 || self.source_height == 0 {
            return Err(ProtocolError::Invalid("zero-sized source surface"));
        }
        if !self.x.is_finite() || !self.y.is_finite() {
            return Err(ProtocolError::Invalid("non-finite coordinates"));
        }
        if !self.line_size.is_finite() || self.line_size < 0.0 {
            return Err(ProtocolError::Invalid("invalid line size"));
        }
        Ok(())
    }
}

/// Messages peers publish on the room broadcast channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum BroadcastMessage {
    DrawLine(DrawingOperation),
    ClearCanvas,
    UndoDrawing { history: Vec<SurfaceSnapshot> },
    GameStateUpdate(Session),
}

impl BroadcastMessage {
    /// The `type` tag, for logs.
    pub fn kind(&self) -> &'static str {
        match self {
            BroadcastMessage::DrawLine(_) => "draw-line",
            BroadcastMessage::ClearCanvas => "clear-canvas",
            BroadcastMessage::UndoDrawing { .. } => "undo-drawing",
            BroadcastMessage::GameStateUpdate(_) => "game-state-update",
        }
    }

    /// Structural checks applied on receipt, before dispatch.
    pub fn validate(&self) -> Result<(), ProtocolError> {
        match self {
            BroadcastMessage::DrawLine(op) => op.validate(),
            BroadcastMessage::ClearCanvas | BroadcastMessage::UndoDrawing { .. } => Ok(()),
            BroadcastMessage::GameStateUpdate(session) => {
                let mut seen = std::collections::HashSet::new();
                if session.past_topics.iter().all(|t| seen.insert(t)) {
                    Ok(())
                } else {
                    Err(ProtocolError::Invalid("duplicate past topics"))
                }
            }
        }
    }

    /// Parse and validate a JSON message.
    pub fn decode(json: &str) -> Result<Self, ProtocolError> {
        let message: Self = serde_json::from_str(json)?;
        message.validate()?;
        Ok(message)
    }

    pub fn encode(&self) -> Result<String, ProtocolError> {
        Ok(serde_json::to_string(self)?)
    }
}

/// Malformed or invalid messages.
#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("malformed message: {0}")]
    Malformed(#[from] serde_json::Error),
    #[error("invalid message: {0}")]
    Invalid(&'static str),
}

/// Frames a peer sends to the relay server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientFrame {
    /// Join a room, leaving any previous one.
    Join { room: String },
    Leave,
    /// Fan a message out to every other member of the room.
    Publish { message: BroadcastMessage },
}

/// Frames the relay server sends to a peer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerFrame {
    /// Join confirmed.
    Joined {
        room: String,
        peer_count: usize,
        /// Latest game state published in the room, for late joiners.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        last_state: Option<Session>,
    },
    PeerJoined { peer_id: String },
    PeerLeft { peer_id: String },
    /// A message published by another member.
    Message { from: String, message: BroadcastMessage },
    Error { message: String },
}
