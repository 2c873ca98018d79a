//! Request schema checks.
//!
//! Request bodies deserialize into structs whose fields are all optional so a
//! missing field reports `"body.<field> is Required"` instead of a decoder
//! error. Field paths start with the request part they were read from
//! (`body` or `params`).
//! The same `check_*` helpers are reused by the domain operations, which never
//! trust that a handler validated first.

use std::collections::HashSet;

use serde::Deserialize;
use voting_common::{SubmittedVote, Vote};

use crate::errors::{FieldIssue, PollError};

pub const MIN_OPTIONS: usize = 2;
pub const MAX_OPTIONS: usize = 5;

pub const BODY_POLL_ID: &str = "body.pollId";
pub const PARAMS_POLL_ID: &str = "params.pollId";

const REQUIRED: &str = "Required";
const EMPTY: &str = "empty";

// ── Validated values ─────────────────────────────────────────────────

/// Option text with an optional caller-chosen id.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct OptionDraft {
    #[serde(default)]
    pub id: Option<String>,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PollDraft {
    pub question: String,
    pub options: Vec<OptionDraft>,
    pub created_by: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct VoteSubmission {
    pub poll_id: String,
    pub known_votes: Vec<Vote>,
    pub vote: SubmittedVote,
}

// ── Request bodies ───────────────────────────────────────────────────

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatePollRequest {
    pub question: Option<String>,
    pub options: Option<Vec<OptionDraft>>,
    pub votes: Option<Vec<Vote>>,
    pub created_by: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmittedVoteBody {
    pub user_id: Option<String>,
    pub option_id: Option<String>,
    pub option_text: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitVoteRequest {
    pub poll_id: Option<String>,
    pub votes: Option<Vec<Vote>>,
    pub submitted_vote: Option<SubmittedVoteBody>,
}

impl CreatePollRequest {
    pub fn into_draft(self) -> Result<PollDraft, PollError> {
        let mut issues = Vec::new();
        if self.question.is_none() {
            issues.push(FieldIssue::new("body.question", REQUIRED));
        }
        if self.options.is_none() {
            issues.push(FieldIssue::new("body.options", REQUIRED));
        }
        if self.created_by.is_none() {
            issues.push(FieldIssue::new("body.createdBy", REQUIRED));
        }
        if self.votes.as_ref().is_some_and(|v| !v.is_empty()) {
            issues.push(FieldIssue::new("body.votes", "Expected empty array"));
        }

        let draft = PollDraft {
            question: self.question.unwrap_or_default(),
            options: self.options.unwrap_or_default(),
            created_by: self.created_by.unwrap_or_default(),
        };
        if issues.is_empty() {
            check_poll_draft(&draft)?;
            Ok(draft)
        } else {
            Err(PollError::Validation(issues))
        }
    }
}

impl SubmitVoteRequest {
    pub fn into_submission(self) -> Result<VoteSubmission, PollError> {
        let mut issues = Vec::new();
        if self.poll_id.is_none() {
            issues.push(FieldIssue::new(BODY_POLL_ID, REQUIRED));
        }
        if self.votes.is_none() {
            issues.push(FieldIssue::new("body.votes", REQUIRED));
        }
        let body = match self.submitted_vote {
            Some(body) => body,
            None => {
                issues.push(FieldIssue::new("body.submittedVote", REQUIRED));
                SubmittedVoteBody::default()
            }
        };
        if issues.is_empty() {
            for (path, value) in [
                ("body.submittedVote.userId", &body.user_id),
                ("body.submittedVote.optionId", &body.option_id),
                ("body.submittedVote.optionText", &body.option_text),
            ] {
                if value.is_none() {
                    issues.push(FieldIssue::new(path, REQUIRED));
                }
            }
        }
        if !issues.is_empty() {
            return Err(PollError::Validation(issues));
        }

        let submission = VoteSubmission {
            poll_id: self.poll_id.unwrap_or_default(),
            known_votes: self.votes.unwrap_or_default(),
            vote: SubmittedVote {
                user_id: body.user_id.unwrap_or_default(),
                option_id: body.option_id.unwrap_or_default(),
                option_text: body.option_text.unwrap_or_default(),
            },
        };
        check_poll_id(BODY_POLL_ID, &submission.poll_id)?;
        check_submitted_vote(&submission.vote)?;
        Ok(submission)
    }
}

// ── Checks ───────────────────────────────────────────────────────────

pub fn check_poll_draft(draft: &PollDraft) -> Result<(), PollError> {
    let mut issues = Vec::new();

    if draft.question.trim().is_empty() {
        issues.push(FieldIssue::new("body.question", EMPTY));
    }
    if draft.created_by.trim().is_empty() {
        issues.push(FieldIssue::new("body.createdBy", EMPTY));
    }

    let count = draft.options.len();
    if count < MIN_OPTIONS {
        issues.push(FieldIssue::new("body.options", "At least two options are required"));
    } else if count > MAX_OPTIONS {
        issues.push(FieldIssue::new("body.options", "At most 5 options are allowed"));
    }

    let mut seen_ids = HashSet::new();
    for (index, option) in draft.options.iter().enumerate() {
        if option.text.trim().is_empty() {
            issues.push(FieldIssue::new(&format!("body.options.{}.text", index), EMPTY));
        }
        if let Some(id) = &option.id {
            if id.trim().is_empty() {
                issues.push(FieldIssue::new(&format!("body.options.{}.id", index), EMPTY));
            } else if !seen_ids.insert(id.as_str()) {
                issues.push(FieldIssue::new(&format!("body.options.{}.id", index), "duplicated"));
            }
        }
    }

    if issues.is_empty() {
        Ok(())
    } else {
        Err(PollError::Validation(issues))
    }
}

/// `path` names where the id came from: [`PARAMS_POLL_ID`] or [`BODY_POLL_ID`].
pub fn check_poll_id(path: &str, poll_id: &str) -> Result<(), PollError> {
    if poll_id.trim().is_empty() {
        return Err(PollError::invalid(path, EMPTY));
    }
    Ok(())
}

pub fn check_submitted_vote(vote: &SubmittedVote) -> Result<(), PollError> {
    let issues: Vec<FieldIssue> = [
        ("body.submittedVote.userId", &vote.user_id),
        ("body.submittedVote.optionId", &vote.option_id),
        ("body.submittedVote.optionText", &vote.option_text),
    ]
    .into_iter()
    .filter(|(_, value)| value.trim().is_empty())
    .map(|(path, _)| FieldIssue::new(path, EMPTY))
    .collect();

    if issues.is_empty() {
        Ok(())
    } else {
        Err(PollError::Validation(issues))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn messages(err: PollError) -> Vec<String> {
        match err {
            PollError::Validation(issues) => issues.into_iter().map(|i| i.message).collect(),
            other => panic!("Expected Validation, got {:?}", other),
        }
    }

    fn options(texts: &[&str]) -> Vec<OptionDraft> {
        texts
            .iter()
            .map(|t| OptionDraft {
                id: None,
                text: t.to_string(),
            })
            .collect()
    }

    fn draft(question: &str, texts: &[&str]) -> PollDraft {
        PollDraft {
            question: question.to_string(),
            options: options(texts),
            created_by: "alice".to_string(),
        }
    }

    #[test]
    fn test_valid_draft_passes() {
        assert!(check_poll_draft(&draft("Favorite color?", &["Red", "Blue"])).is_ok());
        assert!(check_poll_draft(&draft("Pick", &["a", "b", "c", "d", "e"])).is_ok());
    }

    #[test]
    fn test_option_count_bounds() {
        let too_few: [&[&str]; 2] = [&[], &["only"]];
        for texts in too_few {
            let msgs = messages(check_poll_draft(&draft("Q?", texts)).unwrap_err());
            assert_eq!(msgs, vec!["body.options is At least two options are required"]);
        }
        let msgs =
            messages(check_poll_draft(&draft("Q?", &["1", "2", "3", "4", "5", "6"])).unwrap_err());
        assert_eq!(msgs, vec!["body.options is At most 5 options are allowed"]);
    }

    #[test]
    fn test_blank_question_rejected() {
        let msgs = messages(check_poll_draft(&draft("   ", &["a", "b"])).unwrap_err());
        assert_eq!(msgs, vec!["body.question is empty"]);
    }

    #[test]
    fn test_blank_option_text_names_index() {
        let msgs = messages(check_poll_draft(&draft("Q?", &["a", "  "])).unwrap_err());
        assert_eq!(msgs, vec!["body.options.1.text is empty"]);
    }

    #[test]
    fn test_duplicate_option_ids_rejected() {
        let mut d = draft("Q?", &["a", "b", "c"]);
        d.options[0].id = Some("x".into());
        d.options[2].id = Some("x".into());
        let msgs = messages(check_poll_draft(&d).unwrap_err());
        assert_eq!(msgs, vec!["body.options.2.id is duplicated"]);
    }

    #[test]
    fn test_create_request_reports_missing_fields() {
        let req: CreatePollRequest = serde_json::from_str("{}").unwrap();
        let msgs = messages(req.into_draft().unwrap_err());
        assert_eq!(
            msgs,
            vec![
                "body.question is Required",
                "body.options is Required",
                "body.createdBy is Required"
            ]
        );
    }

    #[test]
    fn test_create_request_rejects_preloaded_votes() {
        let req: CreatePollRequest = serde_json::from_value(serde_json::json!({
            "question": "Q?",
            "options": [{"text": "a"}, {"text": "b"}],
            "votes": [{"id": "1", "option": "a", "user": "u", "createdAt": "2024-01-01T00:00:00.000Z"}],
            "createdBy": "alice"
        }))
        .unwrap();
        let msgs = messages(req.into_draft().unwrap_err());
        assert_eq!(msgs, vec!["body.votes is Expected empty array"]);
    }

    #[test]
    fn test_create_request_accepts_supplied_ids() {
        let req: CreatePollRequest = serde_json::from_value(serde_json::json!({
            "question": "What is your favorite car brand?",
            "options": [{"id": "1", "text": "Toyota"}, {"id": "2", "text": "Ford"}],
            "votes": [],
            "createdBy": "Jane Doe"
        }))
        .unwrap();
        let draft = req.into_draft().unwrap();
        assert_eq!(draft.options[0].id.as_deref(), Some("1"));
        assert_eq!(draft.created_by, "Jane Doe");
    }

    #[test]
    fn test_submit_request_reports_missing_nested_fields() {
        let req: SubmitVoteRequest = serde_json::from_value(serde_json::json!({
            "pollId": "p1",
            "votes": [],
            "submittedVote": {"userId": "bob"}
        }))
        .unwrap();
        let msgs = messages(req.into_submission().unwrap_err());
        assert_eq!(
            msgs,
            vec![
                "body.submittedVote.optionId is Required",
                "body.submittedVote.optionText is Required"
            ]
        );
    }

    #[test]
    fn test_submit_request_missing_top_level() {
        let req: SubmitVoteRequest = serde_json::from_str("{}").unwrap();
        let msgs = messages(req.into_submission().unwrap_err());
        assert_eq!(
            msgs,
            vec![
                "body.pollId is Required",
                "body.votes is Required",
                "body.submittedVote is Required"
            ]
        );
    }

    #[test]
    fn test_submit_request_blank_values() {
        let req: SubmitVoteRequest = serde_json::from_value(serde_json::json!({
            "pollId": "p1",
            "votes": [],
            "submittedVote": {"userId": " ", "optionId": "o1", "optionText": "Red"}
        }))
        .unwrap();
        let msgs = messages(req.into_submission().unwrap_err());
        assert_eq!(msgs, vec!["body.submittedVote.userId is empty"]);
    }

    #[test]
    fn test_check_poll_id_names_its_location() {
        assert!(check_poll_id(PARAMS_POLL_ID, "abc").is_ok());
        assert_eq!(
            messages(check_poll_id(PARAMS_POLL_ID, " ").unwrap_err()),
            vec!["params.pollId is empty"]
        );
        assert_eq!(
            messages(check_poll_id(BODY_POLL_ID, "").unwrap_err()),
            vec!["body.pollId is empty"]
        );
    }
}
