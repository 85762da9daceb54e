//! Players, topics and identifiers shared by every component.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier of a room (one game session shared by its peers).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RoomId(String);

impl RoomId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into().trim().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RoomId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for RoomId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

/// Opaque player identifier assigned by the roster store.
pub type PlayerId = String;

/// Opaque topic identifier.
pub type TopicId = String;

/// A participant in a room.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Player {
    pub id: PlayerId,
    pub name: String,
    pub score: u32,
    pub has_played: bool,
}

impl Player {
    /// A fresh player with no score who has not drawn yet.
    pub fn new(id: impl Into<PlayerId>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            score: 0,
            has_played: false,
        }
    }
}

/// Something to draw. Loaded once and never modified.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Topic {
    pub id: TopicId,
    pub title: String,
    pub description: String,
}

impl Topic {
    pub fn new(id: impl Into<TopicId>, title: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            description: description.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_room_id_trims() {
        assert_eq!(RoomId::new("  lobby ").as_str(), "lobby");
        assert_eq!(RoomId::from("lobby"), RoomId::new("lobby"));
    }

    #[test]
    fn test_player_wire_names() {
        let json = serde_json::to_string(&Player::new("p1", "Ada")).unwrap();
        assert!(json.contains("\"hasPlayed\":false"));
        let back: Player = serde_json::from_str(&json).unwrap();
        assert_eq!(back.name, "Ada");
    }
}
