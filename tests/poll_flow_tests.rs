//! End-to-end poll flows through the full router with the in-memory store.

use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use http_body_util::BodyExt;
use serde_json::{Value, json};
use tokio::sync::broadcast;
use tower::ServiceExt;

use voting_api::polls::api::{AppState, SharedState};
use voting_api::polls::server::build_router;
use voting_api::polls::store::MemoryPollStore;
use voting_api::polls::ws::Notifier;

struct Harness {
    app: Router,
    state: SharedState,
}

impl Harness {
    fn new() -> Self {
        let state = AppState::builder()
            .store(Arc::new(MemoryPollStore::new()))
            .notifier(Notifier::new(64))
            .build()
            .unwrap();
        Self {
            app: build_router(state.clone()),
            state,
        }
    }

    fn subscribe(&self) -> broadcast::Receiver<String> {
        self.state.notifier().subscribe()
    }

    async fn send(&self, request: Request<Body>) -> (StatusCode, Value) {
        let response = self.app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, body)
    }

    async fn post(&self, uri: &str, body: Value) -> (StatusCode, Value) {
        let request = Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap();
        self.send(request).await
    }

    async fn get(&self, uri: &str) -> (StatusCode, Value) {
        let request = Request::builder().uri(uri).body(Body::empty()).unwrap();
        self.send(request).await
    }
}

fn next_frame(rx: &mut broadcast::Receiver<String>) -> Value {
    let frame = rx.try_recv().expect("expected a realtime frame");
    serde_json::from_str(&frame).unwrap()
}

fn assert_no_frame(rx: &mut broadcast::Receiver<String>) {
    assert!(matches!(
        rx.try_recv(),
        Err(broadcast::error::TryRecvError::Empty)
    ));
}

fn favorite_color() -> Value {
    json!({
        "question": "Favorite color?",
        "options": [{"text": "Red"}, {"text": "Blue"}],
        "votes": [],
        "createdBy": "alice"
    })
}

#[tokio::test]
async fn test_favorite_color_scenario() {
    let harness = Harness::new();
    let mut rx = harness.subscribe();

    let (status, poll) = harness.post("/create-poll", favorite_color()).await;
    assert_eq!(status, StatusCode::CREATED);
    assert!(poll["id"].as_str().is_some_and(|id| !id.is_empty()));
    assert_eq!(poll["createdAt"], poll["updatedAt"]);
    assert_eq!(poll["votes"], json!([]));

    let created = next_frame(&mut rx);
    assert_eq!(created["event"], "message");
    assert_eq!(created["data"]["key"], "polls");
    assert_eq!(created["data"]["action"], "create");
    assert_eq!(created["data"]["data"]["id"], poll["id"]);

    let poll_id = poll["id"].as_str().unwrap();
    let red_id = poll["options"][0]["id"].as_str().unwrap();
    let (status, receipt) = harness
        .post(
            "/submit-vote",
            json!({
                "pollId": poll_id,
                "votes": [],
                "submittedVote": {"userId": "bob", "optionId": red_id, "optionText": "Red"}
            }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(receipt["pollId"], poll_id);
    assert_eq!(receipt["vote"]["user"], "bob");

    let voted = next_frame(&mut rx);
    assert_eq!(voted["data"]["pollId"], poll_id);
    assert_eq!(voted["data"]["key"], "poll");
    assert_eq!(voted["data"]["action"], "vote");
    let votes = voted["data"]["data"]["votes"].as_array().unwrap();
    assert_eq!(votes.len(), 1);
    assert_eq!(votes[0]["user"], "bob");
    assert_eq!(votes[0]["option"], "Red");
    assert_eq!(votes[0]["optionId"], red_id);
    assert_no_frame(&mut rx);

    let (status, stored) = harness.get(&format!("/polls/{}", poll_id)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(stored["votes"], voted["data"]["data"]["votes"]);
    assert_eq!(stored["createdAt"], poll["createdAt"]);
    assert!(stored["updatedAt"].as_str().unwrap() >= poll["updatedAt"].as_str().unwrap());
}

#[tokio::test]
async fn test_created_poll_appears_in_listing() {
    let harness = Harness::new();
    let (_, first) = harness.post("/create-poll", favorite_color()).await;
    let (_, second) = harness
        .post(
            "/create-poll",
            json!({
                "question": "Tabs or spaces?",
                "options": [{"text": "Tabs"}, {"text": "Spaces"}, {"text": "Both"}],
                "votes": [],
                "createdBy": "carol"
            }),
        )
        .await;

    let (status, list) = harness.get("/polls").await;
    assert_eq!(status, StatusCode::OK);
    let ids: Vec<&Value> = list.as_array().unwrap().iter().map(|p| &p["id"]).collect();
    assert_eq!(ids.len(), 2);
    assert!(ids.contains(&&first["id"]));
    assert!(ids.contains(&&second["id"]));
}

#[tokio::test]
async fn test_get_unknown_poll_message() {
    let harness = Harness::new();
    let (status, body) = harness.get("/polls/unknown-id").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body, json!({"status": 404, "message": "Error fetching poll data by id"}));
}

#[tokio::test]
async fn test_invalid_option_is_rejected_without_broadcast() {
    let harness = Harness::new();
    let (_, poll) = harness.post("/create-poll", favorite_color()).await;
    let mut rx = harness.subscribe();

    let (status, body) = harness
        .post(
            "/submit-vote",
            json!({
                "pollId": poll["id"],
                "votes": [],
                "submittedVote": {"userId": "bob", "optionId": "green", "optionText": "Green"}
            }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(
        body["message"]
            .as_str()
            .unwrap()
            .contains("body.submittedVote.optionId is unknown option")
    );
    assert_no_frame(&mut rx);

    let (_, stored) = harness.get(&format!("/polls/{}", poll["id"].as_str().unwrap())).await;
    assert_eq!(stored["votes"], json!([]));
}

#[tokio::test]
async fn test_concurrent_voters_are_all_recorded() {
    let harness = Arc::new(Harness::new());
    let (_, poll) = harness.post("/create-poll", favorite_color()).await;
    let poll_id = poll["id"].as_str().unwrap().to_string();
    let blue_id = poll["options"][1]["id"].as_str().unwrap().to_string();

    let mut handles = Vec::new();
    for i in 0..16 {
        let harness = Arc::clone(&harness);
        let poll_id = poll_id.clone();
        let blue_id = blue_id.clone();
        handles.push(tokio::spawn(async move {
            // Every voter sends the stale empty list.
            let (status, _) = harness
                .post(
                    "/submit-vote",
                    json!({
                        "pollId": poll_id,
                        "votes": [],
                        "submittedVote": {
                            "userId": format!("voter-{}", i),
                            "optionId": blue_id,
                            "optionText": "Blue"
                        }
                    }),
                )
                .await;
            assert_eq!(status, StatusCode::OK);
        }));
    }
    for handle in handles {
        handle.await.unwrap();
    }

    let (_, stored) = harness.get(&format!("/polls/{}", poll_id)).await;
    assert_eq!(stored["votes"].as_array().unwrap().len(), 16);
}

#[tokio::test]
async fn test_vote_for_missing_poll() {
    let harness = Harness::new();
    let mut rx = harness.subscribe();
    let (status, body) = harness
        .post(
            "/submit-vote",
            json!({
                "pollId": "missing",
                "votes": [],
                "submittedVote": {"userId": "bob", "optionId": "1", "optionText": "Red"}
            }),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["message"], "Poll not found");
    assert_no_frame(&mut rx);
}
