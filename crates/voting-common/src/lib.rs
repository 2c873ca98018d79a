//! Shared domain types for the voting API.
//!
//! Both the HTTP layer and the persistence gateways speak in terms of these
//! types. Field names serialize as camelCase, which is also the attribute
//! naming used in the backing table.

pub mod event;
pub mod poll;
pub mod time;

pub use event::{EntityKind, EventAction, RealtimeEvent};
pub use poll::{Poll, PollOption, SubmittedVote, Vote};
