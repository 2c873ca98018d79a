use serde::{Deserialize, Serialize};

use crate::poll::{Poll, Vote};

/// Which entity a realtime event concerns.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
    /// The poll collection (a poll was added).
    Polls,
    /// A single poll.
    Poll,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum EventAction {
    Create,
    Vote,
}

/// Change notification fanned out to realtime subscribers.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RealtimeEvent {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub poll_id: Option<String>,
    pub key: EntityKind,
    pub action: EventAction,
    pub data: serde_json::Value,
}

impl RealtimeEvent {
    pub fn poll_created(poll: &Poll) -> Result<Self, serde_json::Error> {
        Ok(Self {
            poll_id: None,
            key: EntityKind::Polls,
            action: EventAction::Create,
            data: serde_json::to_value(poll)?,
        })
    }

    /// Carries the full updated vote list, not just the appended vote.
    pub fn vote_recorded(poll_id: &str, votes: &[Vote]) -> Result<Self, serde_json::Error> {
        let mut data = serde_json::Map::new();
        data.insert("id".to_string(), serde_json::Value::String(poll_id.to_string()));
        data.insert("votes".to_string(), serde_json::to_value(votes)?);
        Ok(Self {
            poll_id: Some(poll_id.to_string()),
            key: EntityKind::Poll,
            action: EventAction::Vote,
            data: serde_json::Value::Object(data),
        })
    }
}
