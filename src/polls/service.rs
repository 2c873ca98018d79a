//! Poll operations.
//!
//! `PollService` owns the store handle and the notifier. Every operation
//! re-validates its input, so callers other than the HTTP handlers get the
//! same guarantees.

use std::sync::Arc;

use tracing::{debug, info, warn};
use voting_common::time::now_not_before;
use voting_common::{Poll, PollOption, RealtimeEvent, SubmittedVote, Vote};

use super::store::PollStore;
use super::validate::{
    BODY_POLL_ID, PARAMS_POLL_ID, PollDraft, check_poll_draft, check_poll_id, check_submitted_vote,
};
use super::ws::Notifier;
use crate::errors::PollError;

/// How many times a vote is stamped and written before a lost race with a
/// newer `updated_at` is reported as [`PollError::Conflict`].
pub const STAMP_ATTEMPTS: usize = 3;

/// Outcome of a vote: the vote as recorded and the stored list after it.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedVote {
    pub vote: Vote,
    pub votes: Vec<Vote>,
}

#[derive(Clone)]
pub struct PollService {
    store: Arc<dyn PollStore>,
    notifier: Notifier,
}

impl PollService {
    pub fn new(store: Arc<dyn PollStore>, notifier: Notifier) -> Self {
        Self { store, notifier }
    }

    pub fn notifier(&self) -> &Notifier {
        &self.notifier
    }

    pub async fn list_polls(&self) -> Result<Vec<Poll>, PollError> {
        self.store.scan().await
    }

    pub async fn get_poll(&self, poll_id: &str) -> Result<Poll, PollError> {
        check_poll_id(PARAMS_POLL_ID, poll_id)?;
        self.fetch(poll_id).await
    }

    async fn fetch(&self, poll_id: &str) -> Result<Poll, PollError> {
        self.store
            .get(poll_id)
            .await?
            .ok_or_else(|| PollError::NotFound {
                id: poll_id.to_string(),
            })
    }

    /// Persist a new poll built from `draft`. Options without an id get one.
    ///
    /// Does not announce the poll; see [`PollService::announce_created`].
    pub async fn create_poll(&self, draft: PollDraft) -> Result<Poll, PollError> {
        check_poll_draft(&draft)?;

        let options = draft
            .options
            .into_iter()
            .map(|option| match option.id {
                Some(id) => PollOption::with_id(id, option.text),
                None => PollOption::new(option.text),
            })
            .collect();
        let poll = Poll::new(draft.question, options, draft.created_by);

        self.store.put_if_absent(&poll).await?;
        info!(poll_id = %poll.id, options = poll.options.len(), "poll created");
        Ok(poll)
    }

    /// Tell realtime subscribers about a newly created poll.
    pub fn announce_created(&self, poll: &Poll) -> usize {
        match RealtimeEvent::poll_created(poll) {
            Ok(event) => self.notifier.publish(event),
            Err(e) => {
                warn!(poll_id = %poll.id, error = %e, "failed to build create event");
                0
            }
        }
    }

    /// Record one vote and broadcast the resulting vote list.
    ///
    /// `known_votes` is the caller's view of the list. It never overwrites
    /// stored votes; the new vote is appended to whatever is stored. The
    /// broadcast happens only after the write is confirmed.
    ///
    /// The vote is stamped from a fresh read of the poll. If another write
    /// moved `updated_at` past that stamp before ours landed, the store
    /// rejects it and the vote is re-stamped, up to [`STAMP_ATTEMPTS`] times.
    pub async fn append_vote(
        &self,
        poll_id: &str,
        known_votes: &[Vote],
        submitted: &SubmittedVote,
    ) -> Result<RecordedVote, PollError> {
        check_poll_id(BODY_POLL_ID, poll_id)?;
        check_submitted_vote(submitted)?;

        let mut attempt = 1;
        let (vote, votes) = loop {
            let poll = self.fetch(poll_id).await?;
            if poll.option(&submitted.option_id).is_none() {
                return Err(PollError::invalid(
                    "body.submittedVote.optionId",
                    "unknown option",
                ));
            }

            let stamp = now_not_before(&poll.updated_at);
            let vote = Vote::from_submission(submitted, stamp.clone());
            match self.store.append_vote(poll_id, &vote, &stamp).await {
                Ok(votes) => break (vote, votes),
                Err(PollError::Conflict { .. }) if attempt < STAMP_ATTEMPTS => {
                    debug!(poll_id, attempt, "vote stamp overtaken, re-stamping");
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        };

        if known_votes.len() + 1 != votes.len() {
            debug!(
                poll_id,
                known = known_votes.len(),
                stored = votes.len(),
                "client vote list was stale"
            );
        }
        info!(poll_id, vote_id = %vote.id, total = votes.len(), "vote recorded");

        match RealtimeEvent::vote_recorded(poll_id, &votes) {
            Ok(event) => {
                self.notifier.publish(event);
            }
            Err(e) => warn!(poll_id, error = %e, "failed to build vote event"),
        }
        Ok(RecordedVote { vote, votes })
    }
}
