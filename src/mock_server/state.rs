//! Mock server state management.
//!
//! Entities are stored as wire-format JSON so the mock answers exactly
//! what a real server would put on each response line.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use serde_json::{json, Value};
use tokio::sync::RwLock;

/// One project and everything scoped to it.
#[derive(Debug, Clone, Default)]
pub struct MockProject {
    /// The `projects` line for this project.
    pub record: Value,
    pub issues: Vec<Value>,
    pub builds: Vec<Value>,
    pub views: Vec<Value>,
    pub modules: Vec<Value>,
    pub metrics: Vec<Value>,
    pub statistics: Vec<Value>,
    /// History entries per issue id, appended by `update_status`.
    pub history: HashMap<u64, Vec<Value>>,
    /// Canned lines for pass-through actions such as `taxonomies`.
    pub canned: HashMap<String, Vec<Value>>,
}

impl MockProject {
    pub fn new(name: &str) -> Self {
        Self {
            record: json!({
                "id": name,
                "name": name,
                "creator": "",
                "description": "",
                "tags": [],
            }),
            ..Default::default()
        }
    }

    pub fn name(&self) -> &str {
        self.record["name"].as_str().unwrap_or_default()
    }

    pub fn with_issue(mut self, issue: Value) -> Self {
        self.issues.push(issue);
        self
    }

    pub fn with_build(mut self, build: Value) -> Self {
        self.builds.push(build);
        self
    }

    pub fn with_view(mut self, view: Value) -> Self {
        self.views.push(view);
        self
    }

    pub fn with_module(mut self, module: Value) -> Self {
        self.modules.push(module);
        self
    }

    pub fn with_metric(mut self, metric: Value) -> Self {
        self.metrics.push(metric);
        self
    }

    pub fn with_statistics(mut self, statistics: Value) -> Self {
        self.statistics.push(statistics);
        self
    }

    /// Lines returned verbatim for `action`.
    pub fn with_canned(mut self, action: &str, lines: Vec<Value>) -> Self {
        self.canned.insert(action.to_string(), lines);
        self
    }

    pub fn issue_mut(&mut self, id: u64) -> Option<&mut Value> {
        self.issues
            .iter_mut()
            .find(|i| i["id"].as_u64() == Some(id))
    }

    pub fn view_mut(&mut self, name: &str) -> Option<&mut Value> {
        self.views.iter_mut().find(|v| v["name"] == name)
    }

    pub fn module_mut(&mut self, name: &str) -> Option<&mut Value> {
        self.modules.iter_mut().find(|m| m["name"] == name)
    }
}

/// Shared state for the mock server.
///
/// Wrapped in `Arc<RwLock<_>>` for concurrent access by handlers and tests.
#[derive(Debug, Default)]
pub struct MockState {
    /// Projects indexed by name.
    pub projects: BTreeMap<String, MockProject>,

    /// `users` lines.
    pub users: Vec<Value>,

    /// `(major, minor)` reported by `version`.
    pub version: (String, String),

    /// Optional authentication token. If set, requests must carry it as `ltoken`.
    pub required_token: Option<String>,

    /// Every form received, in arrival order.
    pub requests: Vec<HashMap<String, String>>,
}

impl MockState {
    /// Create a new empty state.
    pub fn new() -> Self {
        Self {
            version: ("20".to_string(), "2".to_string()),
            ..Default::default()
        }
    }

    /// Create state wrapped in Arc<RwLock> for sharing.
    pub fn shared(self) -> Arc<RwLock<Self>> {
        Arc::new(RwLock::new(self))
    }

    pub fn with_project(mut self, project: MockProject) -> Self {
        self.projects.insert(project.name().to_string(), project);
        self
    }

    pub fn with_user(mut self, user: Value) -> Self {
        self.users.push(user);
        self
    }

    pub fn with_version(mut self, major: &str, minor: &str) -> Self {
        self.version = (major.to_string(), minor.to_string());
        self
    }

    /// Set the required authentication token.
    pub fn with_required_token(mut self, token: &str) -> Self {
        self.required_token = Some(token.to_string());
        self
    }

    pub fn project(&self, name: &str) -> Option<&MockProject> {
        self.projects.get(name)
    }

    /// How many requests carried `action`.
    pub fn count_action(&self, action: &str) -> usize {
        self.requests
            .iter()
            .filter(|r| r.get("action").map(String::as_str) == Some(action))
            .count()
    }
}
