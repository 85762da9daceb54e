//! Drawing synchronization over the room broadcast channel.
//!
//! Local operations are painted first and published second. Remote
//! operations are remapped to the local surface size and painted, and are
//! never published again: every peer publishes only what it drew itself.

use crate::game::Session;
use crate::normalize::normalize;
use crate::protocol::{BroadcastMessage, DrawingOperation, ProtocolError};
use crate::snapshot::SurfaceSnapshot;
use crate::surface::{CompositeMode, Surface};
use crate::model::RoomId;
use thiserror::Error;

/// Publishing to the broadcast channel failed.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("not connected")]
    NotConnected,
    #[error("encoding failed: {0}")]
    Encode(#[from] ProtocolError),
    #[error("send failed: {0}")]
    Send(String),
}

/// Fire-and-forget publisher for one room.
///
/// Delivery is at-least-once and unordered, and the publisher may or may not
/// receive its own messages back.
pub trait Broadcast {
    fn publish(&mut self, message: &BroadcastMessage) -> Result<(), TransportError>;
}

impl<B: Broadcast + ?Sized> Broadcast for &mut B {
    fn publish(&mut self, message: &BroadcastMessage) -> Result<(), TransportError> {
        (**self).publish(message)
    }
}

/// Where an operation came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Origin {
    /// Produced by this peer's input; painted then published.
    Local,
    /// Received from the channel; painted only.
    Remote,
}

/// Point-level drawing sync for one room.
#[derive(Debug, Clone)]
pub struct DrawingSyncChannel {
    room: RoomId,
    published: u64,
    dropped: u64,
}

impl DrawingSyncChannel {
    pub fn new(room: RoomId) -> Self {
        Self {
            room,
            published: 0,
            dropped: 0,
        }
    }

    /// Messages published successfully.
    pub fn published(&self) -> u64 {
        self.published
    }

    /// Messages the transport refused.
    pub fn dropped(&self) -> u64 {
        self.dropped
    }

    /// Paint a local operation and publish it with our surface dimensions.
    pub fn emit<S, B>(&mut self, op: DrawingOperation, surface: &mut S, transport: &mut B)
    where
        S: Surface + ?Sized,
        B: Broadcast + ?Sized,
    {
        let op = op.with_source(surface.dimensions());
        self.apply(&op, Origin::Local, surface);
        self.publish(transport, &BroadcastMessage::DrawLine(op));
    }

    /// Paint an operation received from another peer.
    pub fn on_remote_op<S: Surface + ?Sized>(
        &mut self,
        op: &DrawingOperation,
        surface: &mut S,
    ) -> Result<(), ProtocolError> {
        op.validate()?;
        self.apply(op, Origin::Remote, surface);
        Ok(())
    }

    /// Paint an operation. Remote operations are remapped from their source
    /// dimensions to the surface's current size first.
    pub fn apply<S: Surface + ?Sized>(&self, op: &DrawingOperation, origin: Origin, surface: &mut S) {
        let (point, line_width) = match origin {
            Origin::Local => (op.point(), op.line_size),
            Origin::Remote => {
                let n = normalize(op.point(), op.source_size(), surface.size());
                (n.point, n.line_width(op.line_size))
            }
        };

        surface.set_composite_mode(if op.is_erasing {
            CompositeMode::Erase
        } else {
            CompositeMode::PaintOver
        });
        surface.set_line_width(line_width);

        if op.is_drawing {
            surface.line_to(point);
            surface.stroke();
        } else {
            surface.begin_path();
            surface.move_to(point);
        }
    }

    /// Wipe the surface. Local clears are announced to the room.
    pub fn clear<S, B>(&mut self, origin: Origin, surface: &mut S, transport: &mut B)
    where
        S: Surface + ?Sized,
        B: Broadcast + ?Sized,
    {
        surface.clear();
        if origin == Origin::Local {
            self.publish(transport, &BroadcastMessage::ClearCanvas);
        }
    }

    /// Publish the full undo history after a local undo.
    pub fn publish_history<B: Broadcast + ?Sized>(&mut self, history: Vec<SurfaceSnapshot>, transport: &mut B) {
        self.publish(transport, &BroadcastMessage::UndoDrawing { history });
    }

    /// Publish this peer's view of the session.
    pub fn publish_state<B: Broadcast + ?Sized>(&mut self, session: &Session, transport: &mut B) {
        self.publish(transport, &BroadcastMessage::GameStateUpdate(session.clone()));
    }

    fn publish<B: Broadcast + ?Sized>(&mut self, transport: &mut B, message: &BroadcastMessage) {
        match transport.publish(message) {
            Ok(()) => self.published += 1,
            Err(e) => {
                self.dropped += 1;
                log::warn!("Room {}: dropped {} message: {}", self.room, message.kind(), e);
            }
        }
    }
}

/// A transport that records what was published. Useful for headless peers
/// and tests.
#[derive(Debug, Default, Clone)]
pub struct RecordingBroadcast {
    pub sent: Vec<BroadcastMessage>,
}

impl RecordingBroadcast {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drain everything published so far.
    pub fn take(&mut self) -> Vec<BroadcastMessage> {
        std::mem::take(&mut self.sent)
    }
}

impl Broadcast for RecordingBroadcast {
    fn publish(&mut self, message: &BroadcastMessage) -> Result<(), TransportError> {
        self.sent.push(message.clone());
        Ok(())
    }
}
