//! Klocwork review API client library.
//!
//! A Rust library for the Klocwork `/review/api` endpoint: it finds the
//! login token written by `kwauth`, sends form-encoded actions, and decodes
//! the line-delimited JSON answers into typed entities that can make their
//! own follow-up requests.
//!
//! # Quick Start
//!
//! ```no_run
//! use kwapi::{IssueUpdate, SearchQuery, Server, ServerConfig};
//!
//! #[tokio::main]
//! async fn main() -> kwapi::Result<()> {
//!     // Host, port and user default to the first matching token store record
//!     let mut server = Server::new(ServerConfig::from_env()?)?;
//!     println!("{server}");
//!
//!     let Some(project) = server.project("demo").await? else {
//!         return Ok(());
//!     };
//!
//!     // Search within a saved view
//!     let found = project
//!         .search(&SearchQuery::new().view("critical").limit(100))
//!         .await?;
//!     if !found.success {
//!         eprintln!("search failed: {:?}", found.error);
//!     }
//!
//!     // Writes report success explicitly
//!     let ids: Vec<u64> = found.items.iter().map(|i| i.id).collect();
//!     let sent = project
//!         .update_issues(ids, &IssueUpdate::new().status("Analyze"))
//!         .await?;
//!     assert!(sent.success);
//!
//!     Ok(())
//! }
//! ```
//!
//! # Architecture
//!
//! - [`KwClient`] sends one POST per action. Read actions return
//!   [`Fetched`], write actions [`Sent`]; HTTP failures are captured in
//!   them rather than returned as errors.
//! - [`Hydrate`] is implemented once per entity kind and turns one response
//!   line into that entity, wiring in its owner.
//! - [`Project`] translates domain calls into actions and caches builds,
//!   views and modules on first access.
//! - [`Server`] resolves credentials at construction and caches projects,
//!   users and the server version.
//!
//! Nothing here spawns tasks. To fetch from many projects at once, clone the
//! projects and drive their futures concurrently yourself.
//!
//! # Configuration
//!
//! [`ServerConfig::from_env`] reads:
//!
//! - `KLOCWORK_HOST`, `KLOCWORK_PORT`, `KLOCWORK_USER` (optional) - narrow the token lookup
//! - `KLOCWORK_LTOKEN` (optional) - token store path (defaults to `~/.klocwork/ltoken`)

mod client;
mod config;
mod credentials;
mod error;
mod hydrate;
mod models;
mod server;

#[cfg(feature = "test-server")]
pub mod mock_server;

// Re-export core types
pub use client::{Fetched, KwClient, Params, Sent};
pub use config::ServerConfig;
pub use credentials::{
    CredentialQuery, CredentialRecord, CredentialStore, Credentials, DnsResolver, HostResolver,
};
pub use error::{KwError, Result, TransportError};
pub use hydrate::{hydrate_lines, Hydrate, JsonObject};
pub use server::{Server, ServerVersion};

// Re-export models
pub use models::{
    format_epoch_millis,
    // Builds
    Build,
    // Issues
    Issue,
    IssueDetails,
    IssueHistoryEntry,
    IssueIds,
    IssueUpdate,
    // Metrics
    Metric,
    MetricsQuery,
    MetricsStatistics,
    // Modules
    Module,
    Named,
    // Projects
    Project,
    ProjectRef,
    ProjectUpdate,
    ReportQuery,
    SearchQuery,
    // Users
    User,
    UserRole,
    // Views
    View,
    ViewDefinition,
    CTIME_FORMAT,
    DEFAULT_VIEW,
    PROJECT_ADMIN_ROLE,
};
