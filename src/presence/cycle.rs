//! The presences shown by the bot and the fixed cycle they rotate through.

use std::fmt::Display;

use serde::Deserialize;
use serde::Serialize;

use crate::serenity;

/// What the bot claims to be doing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[allow(clippy::missing_docs_in_private_items)]
pub enum ActivityKind {
    Playing,
    Watching,
    Listening,
    Competing,
    Custom,
}

/// Online status displayed next to the activity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[allow(clippy::missing_docs_in_private_items)]
pub enum Status {
    Online,
    Idle,
    #[default]
    Dnd,
    Invisible,
}

impl From<Status> for serenity::OnlineStatus {
    fn from(val: Status) -> Self {
        match val {
            Status::Online => serenity::OnlineStatus::Online,
            Status::Idle => serenity::OnlineStatus::Idle,
            Status::Dnd => serenity::OnlineStatus::DoNotDisturb,
            Status::Invisible => serenity::OnlineStatus::Invisible,
        }
    }
}

/// A single presence entry, e.g. "Watching n!help".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PresenceDescriptor {
    /// Kind of activity.
    pub kind: ActivityKind,
    /// Text shown after the kind.
    pub label: String,
}

impl PresenceDescriptor {
    pub fn new(kind: ActivityKind, label: impl Into<String>) -> Self {
        Self {
            kind,
            label: label.into(),
        }
    }

    /// Convert into the gateway representation.
    pub fn to_activity(&self) -> serenity::ActivityData {
        let label = self.label.clone();
        match self.kind {
            ActivityKind::Playing => serenity::ActivityData::playing(label),
            ActivityKind::Watching => serenity::ActivityData::watching(label),
            ActivityKind::Listening => serenity::ActivityData::listening(label),
            ActivityKind::Competing => serenity::ActivityData::competing(label),
            ActivityKind::Custom => serenity::ActivityData::custom(label),
        }
    }
}

impl Display for PresenceDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let kind = match self.kind {
            ActivityKind::Playing => "Playing",
            ActivityKind::Watching => "Watching",
            ActivityKind::Listening => "Listening to",
            ActivityKind::Competing => "Competing in",
            ActivityKind::Custom => return write!(f, "{}", self.label),
        };
        write!(f, "{kind} {}", self.label)
    }
}

/// An immutable sequence of presences and a position in it.
/// Advancing past the end wraps around to the start.
#[derive(Debug, Clone)]
pub struct PresenceCycle {
    #[allow(clippy::missing_docs_in_private_items)]
    entries: Vec<PresenceDescriptor>,
    #[allow(clippy::missing_docs_in_private_items)]
    position: usize,
}

impl PresenceCycle {
    /// Returns `None` if there is nothing to cycle through.
    pub fn new(entries: Vec<PresenceDescriptor>) -> Option<Self> {
        if entries.is_empty() {
            None
        } else {
            Some(Self {
                entries,
                position: 0,
            })
        }
    }

    /// The presence that the next tick applies.
    pub fn current(&self) -> &PresenceDescriptor {
        &self.entries[self.position]
    }

    pub fn position(&self) -> usize {
        self.position
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Move to the next presence.
    pub fn advance(&mut self) {
        self.position = (self.position + 1) % self.entries.len();
    }
}
