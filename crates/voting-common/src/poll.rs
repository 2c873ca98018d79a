use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::time::now_iso8601;

/// A question with a fixed set of options, accumulating votes over time.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Poll {
    pub id: String,
    pub question: String,
    pub options: Vec<PollOption>,
    pub votes: Vec<Vote>,
    pub created_by: String,
    pub created_at: String,
    pub updated_at: String,
}

impl Poll {
    /// Build a fresh poll: new id, empty vote list, `created_at == updated_at`.
    pub fn new(question: String, options: Vec<PollOption>, created_by: String) -> Self {
        let now = now_iso8601();
        Self {
            id: Uuid::new_v4().to_string(),
            question,
            options,
            votes: Vec::new(),
            created_by,
            created_at: now.clone(),
            updated_at: now,
        }
    }

    pub fn option(&self, option_id: &str) -> Option<&PollOption> {
        self.options.iter().find(|o| o.id == option_id)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PollOption {
    pub id: String,
    pub text: String,
}

impl PollOption {
    /// Option with a generated id.
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            text: text.into(),
        }
    }

    pub fn with_id(id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            text: text.into(),
        }
    }
}

/// A recorded vote.
///
/// `option` carries the display text as submitted. Records written before
/// option ids were tracked have no `option_id`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Vote {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub option_id: Option<String>,
    pub option: String,
    pub user: String,
    pub created_at: String,
}

impl Vote {
    pub fn from_submission(submitted: &SubmittedVote, created_at: String) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            option_id: Some(submitted.option_id.clone()),
            option: submitted.option_text.clone(),
            user: submitted.user_id.clone(),
            created_at,
        }
    }
}

/// Vote as sent by a client.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SubmittedVote {
    pub user_id: String,
    pub option_id: String,
    pub option_text: String,
}
