//! Polls service: HTTP API, realtime fan-out and persistence.
//!
//! ## Module Map
//!
//! ```text
//! ┌──────────┐   HTTP   ┌──────────────────────────────────────────────────┐
//! │  Client  │ ───────> │  server.rs  (axum Router, middleware, shutdown)  │
//! │          │ <─────── │    └─ api.rs  (route handlers, AppState)         │
//! └──────────┘ WebSocket│         │                                        │
//!      ^                │         │ validate.rs: request body → draft      │
//!      │                │         v                                        │
//!      │                │  service.rs  (PollService)                       │
//!      │                │         │                   │                    │
//!      │                │         │ PollStore         │ Notifier::publish  │
//!      │                │         v                   v                    │
//!      │                │  store.rs / dynamo.rs      ws.rs                 │
//!      └────────────────┼──────────────────────────────┘                   │
//!                       └──────────────────────────────────────────────────┘
//! ```
//!
//! ## Supporting Modules
//!
//! | Module     | Responsibility                                              |
//! |------------|-------------------------------------------------------------|
//! | `validate` | Request bodies and field checks, itemized messages          |
//! | `store`    | `PollStore` trait, in-memory backend                        |
//! | `dynamo`   | DynamoDB backend, item conversion, table creation           |
//! | `ws`       | `Notifier`, wire frames, socket loop with ping/pong         |

pub mod api;
pub mod dynamo;
pub mod server;
pub mod service;
pub mod store;
pub mod validate;
pub mod ws;
