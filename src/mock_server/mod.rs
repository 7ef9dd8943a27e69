//! HTTP front end for the mock engine, for end-to-end testing.
//!
//! Unlike wiremock, which mocks at the HTTP level per test, this server keeps
//! state across requests, so a client under test can run realistic
//! workflows: create a user, add identities, open tickets, page through
//! searches.
//!
//! # Example
//!
//! ```ignore
//! use deskmock::mock_server::MockServer;
//!
//! #[tokio::test]
//! async fn test_workflow() {
//!     let server = MockServer::start().await.unwrap();
//!     let users: serde_json::Value = reqwest::get(format!("{}users.json", server.url()))
//!         .await
//!         .unwrap()
//!         .json()
//!         .await
//!         .unwrap();
//!     assert_eq!(users["count"], 3);
//!     server.shutdown().await;
//! }
//! ```

mod handlers;
mod routes;
mod server;

pub use routes::{resolve, Route, Target};
pub use server::MockServer;
