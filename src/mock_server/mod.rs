//! Mock Klocwork API server for E2E testing.
//!
//! This module provides an in-memory mock of the `/review/api` endpoint
//! for integration and end-to-end testing. Unlike wiremock, which mocks at
//! the HTTP level per-test, this server keeps state across requests, so a
//! view created in one call shows up in the next `views` listing.
//!
//! # Example
//!
//! ```ignore
//! use kwapi::mock_server::MockServer;
//! use kwapi::Server;
//!
//! #[tokio::test]
//! async fn test_workflow() {
//!     let mock = MockServer::start().await;
//!     let mut server = Server::from_credentials(&mock.credentials("alice")).unwrap();
//!
//!     // Server comes with default fixtures
//!     let project = server.project("demo").await.unwrap().unwrap();
//!     assert_eq!(project.creator, "alice");
//!
//!     mock.shutdown().await;
//! }
//! ```

mod fixtures;
mod handlers;
mod server;
mod state;

pub use fixtures::Fixtures;
pub use server::MockServer;
pub use state::{MockProject, MockState};
