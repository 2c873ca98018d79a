use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Path, State, rejection::JsonRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde::Serialize;
use tracing::{error, warn};
use voting_common::Vote;

use super::service::PollService;
use super::store::PollStore;
use super::validate::{CreatePollRequest, SubmitVoteRequest};
use super::ws::Notifier;
use crate::errors::{FieldIssue, PollError, render_issues};

const LIST_FAILED: &str = "Error fetching table data";
const GET_FAILED: &str = "Error fetching poll data by id";
const CREATE_FAILED: &str = "Error creating poll";
const VOTE_FAILED: &str = "Error submitting vote";
const POLL_MISSING: &str = "Poll not found";

// ── Shared application state ──────────────────────────────────────────

pub struct AppState {
    service: PollService,
}

pub type SharedState = Arc<AppState>;

impl AppState {
    pub fn builder() -> AppStateBuilder {
        AppStateBuilder::default()
    }

    pub fn service(&self) -> &PollService {
        &self.service
    }

    pub fn notifier(&self) -> &Notifier {
        self.service.notifier()
    }
}

/// Collects the parts of [`AppState`]. Both the store and the notifier are
/// required; `build` fails with [`PollError::Uninitialized`] otherwise.
#[derive(Default)]
pub struct AppStateBuilder {
    store: Option<Arc<dyn PollStore>>,
    notifier: Option<Notifier>,
}

impl AppStateBuilder {
    pub fn store(mut self, store: Arc<dyn PollStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn notifier(mut self, notifier: Notifier) -> Self {
        self.notifier = Some(notifier);
        self
    }

    pub fn build(self) -> Result<SharedState, PollError> {
        let store = self.store.ok_or(PollError::Uninitialized("poll store"))?;
        let notifier = self.notifier.ok_or(PollError::Uninitialized("notifier"))?;
        Ok(Arc::new(AppState {
            service: PollService::new(store, notifier),
        }))
    }
}

// ── Response payload types ────────────────────────────────────────────

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VoteReceipt {
    pub poll_id: String,
    pub vote: Vote,
    pub votes: Vec<Vote>,
}

// ── Error handling ────────────────────────────────────────────────────

#[derive(Debug)]
pub enum ApiError {
    NotFound(String),
    BadRequest(String),
}

impl ApiError {
    /// Validation errors keep their itemized message; everything else is
    /// replaced by the operation's fixed message.
    fn from_poll_error(err: PollError, fallback: &'static str) -> Self {
        match err {
            PollError::Validation(issues) => ApiError::BadRequest(render_issues(&issues)),
            other => {
                error!(error = %other, "{}", fallback);
                ApiError::BadRequest(fallback.to_string())
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
        };
        (
            status,
            Json(serde_json::json!({"status": status.as_u16(), "message": message})),
        )
            .into_response()
    }
}

fn rejected_body(rejection: JsonRejection) -> ApiError {
    warn!(error = %rejection.body_text(), "rejected request body");
    ApiError::BadRequest(render_issues(&[FieldIssue::new(
        "body",
        &rejection.body_text(),
    )]))
}

// ── Router ────────────────────────────────────────────────────────────

pub fn api_router() -> Router<SharedState> {
    Router::new()
        .route("/polls", get(list_polls))
        .route("/polls/{poll_id}", get(get_poll))
        .route("/create-poll", post(create_poll))
        .route("/submit-vote", post(submit_vote))
        .route("/health", get(health_check))
}

// ── Handlers ──────────────────────────────────────────────────────────

async fn health_check() -> &'static str {
    "ok"
}

async fn list_polls(State(state): State<SharedState>) -> Result<impl IntoResponse, ApiError> {
    let polls = state.service().list_polls().await.map_err(|e| {
        error!(error = %e, "{}", LIST_FAILED);
        ApiError::NotFound(LIST_FAILED.to_string())
    })?;
    Ok(Json(polls))
}

async fn get_poll(
    State(state): State<SharedState>,
    Path(poll_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let poll = state.service().get_poll(&poll_id).await.map_err(|e| {
        error!(%poll_id, error = %e, "{}", GET_FAILED);
        ApiError::NotFound(GET_FAILED.to_string())
    })?;
    Ok(Json(poll))
}

async fn create_poll(
    State(state): State<SharedState>,
    body: Result<Json<CreatePollRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(req) = body.map_err(rejected_body)?;
    let draft = req
        .into_draft()
        .map_err(|e| ApiError::from_poll_error(e, CREATE_FAILED))?;

    let service = state.service();
    let poll = service
        .create_poll(draft)
        .await
        .map_err(|e| ApiError::from_poll_error(e, CREATE_FAILED))?;
    service.announce_created(&poll);

    Ok((StatusCode::CREATED, Json(poll)))
}

async fn submit_vote(
    State(state): State<SharedState>,
    body: Result<Json<SubmitVoteRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(req) = body.map_err(rejected_body)?;
    let submission = req
        .into_submission()
        .map_err(|e| ApiError::from_poll_error(e, VOTE_FAILED))?;

    let recorded = state
        .service()
        .append_vote(&submission.poll_id, &submission.known_votes, &submission.vote)
        .await
        .map_err(|e| match e {
            PollError::NotFound { id } => {
                warn!(poll_id = %id, "vote for unknown poll");
                ApiError::NotFound(POLL_MISSING.to_string())
            }
            other => ApiError::from_poll_error(other, VOTE_FAILED),
        })?;

    Ok(Json(VoteReceipt {
        poll_id: submission.poll_id,
        vote: recorded.vote,
        votes: recorded.votes,
    }))
}

// ── Tests ─────────────────────────────────────────────────────────────
