use async_trait::async_trait;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use voting_common::{Poll, Vote};

use crate::errors::PollError;

/// Key-value access to poll records, one item per poll keyed by its id.
///
/// Writes are conditional: `put_if_absent` requires the key to be new and
/// `append_vote` requires it to exist. No operation spans more than one key.
#[async_trait]
pub trait PollStore: Send + Sync {
    /// Every stored poll, ordered by `created_at` then `id`.
    async fn scan(&self) -> Result<Vec<Poll>, PollError>;

    async fn get(&self, poll_id: &str) -> Result<Option<Poll>, PollError>;

    /// Fails with [`PollError::Conflict`] if a poll with the same id exists.
    async fn put_if_absent(&self, poll: &Poll) -> Result<(), PollError>;

    /// Atomically append `vote` to the stored list and set `updated_at`.
    /// Returns the list as stored after the append. Fails with
    /// [`PollError::NotFound`] if the poll does not exist, and with
    /// [`PollError::Conflict`] without writing anything if the stored
    /// `updated_at` is already later than `updated_at`.
    async fn append_vote(
        &self,
        poll_id: &str,
        vote: &Vote,
        updated_at: &str,
    ) -> Result<Vec<Vote>, PollError>;
}

pub(crate) fn sort_polls(polls: &mut [Poll]) {
    polls.sort_by(|a, b| {
        a.created_at
            .cmp(&b.created_at)
            .then_with(|| a.id.cmp(&b.id))
    });
}

/// In-process store. Preconditions hold per key because every write goes
/// through the map's entry lock.
#[derive(Default)]
pub struct MemoryPollStore {
    polls: DashMap<String, Poll>,
}

impl MemoryPollStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.polls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.polls.is_empty()
    }
}

#[async_trait]
impl PollStore for MemoryPollStore {
    async fn scan(&self) -> Result<Vec<Poll>, PollError> {
        let mut polls: Vec<Poll> = self.polls.iter().map(|entry| entry.value().clone()).collect();
        sort_polls(&mut polls);
        Ok(polls)
    }

    async fn get(&self, poll_id: &str) -> Result<Option<Poll>, PollError> {
        Ok(self.polls.get(poll_id).map(|entry| entry.value().clone()))
    }

    async fn put_if_absent(&self, poll: &Poll) -> Result<(), PollError> {
        match self.polls.entry(poll.id.clone()) {
            Entry::Occupied(_) => Err(PollError::Conflict {
                id: poll.id.clone(),
            }),
            Entry::Vacant(slot) => {
                slot.insert(poll.clone());
                Ok(())
            }
        }
    }

    async fn append_vote(
        &self,
        poll_id: &str,
        vote: &Vote,
        updated_at: &str,
    ) -> Result<Vec<Vote>, PollError> {
        let mut entry = self.polls.get_mut(poll_id).ok_or_else(|| PollError::NotFound {
            id: poll_id.to_string(),
        })?;
        if entry.updated_at.as_str() > updated_at {
            return Err(PollError::Conflict {
                id: poll_id.to_string(),
            });
        }
        entry.votes.push(vote.clone());
        entry.updated_at = updated_at.to_string();
        Ok(entry.votes.clone())
    }
}
