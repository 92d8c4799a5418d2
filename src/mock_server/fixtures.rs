//! Test fixtures for the mock server.
//!
//! Every builder returns the wire JSON a Klocwork server would emit on one
//! response line.

use serde_json::{json, Value};

use super::state::{MockProject, MockState};

/// 2020-06-01 12:00:00 UTC in epoch milliseconds.
pub const BASE_MILLIS: i64 = 1_591_012_800_000;

/// Factory for creating test fixtures.
pub struct Fixtures;

impl Fixtures {
    /// An issue in `state` with the remaining fields filled in from `id`.
    pub fn issue(id: u64, state: &str) -> Value {
        json!({
            "id": id,
            "message": format!("Possible null pointer dereference {id}"),
            "file": format!("/src/module_{}.c", id % 3),
            "method": "main",
            "code": "NPD.FUNC.MUST",
            "severity": "Critical",
            "severityCode": 1,
            "state": state,
            "status": "Analyze",
            "owner": "unowned",
            "title": "Null pointer may be dereferenced",
            "taxonomyName": "C and C++",
            "url": format!("http://127.0.0.1/review/insight-review.html#issuedetails_goto:problemid={id}"),
            "dateOriginated": BASE_MILLIS + id as i64 * 1000,
        })
    }

    pub fn build(id: u64, name: &str) -> Value {
        json!({
            "id": id,
            "name": name,
            "date": BASE_MILLIS + id as i64 * 86_400_000,
            "keepit": false,
        })
    }

    pub fn view(id: u64, name: &str, query: &str) -> Value {
        json!({
            "id": id,
            "name": name,
            "query": query,
            "creator": "alice",
            "is_public": true,
            "tags": [],
        })
    }

    pub fn module(name: &str, paths: &[&str]) -> Value {
        json!({
            "name": name,
            "paths": paths,
        })
    }

    pub fn metric(file: &str, tag: &str, value: f64) -> Value {
        json!({
            "filePath": file,
            "entity": "File",
            "entity_id": 1,
            "tag": tag,
            "metricValue": value,
        })
    }

    pub fn statistics(tag: &str, sum: f64, min: f64, max: f64, entries: u64) -> Value {
        json!({
            "tag": tag,
            "sum": sum,
            "min": min,
            "max": max,
            "entries": entries,
        })
    }

    /// A user holding `Project admin` on each of `admin_of`.
    pub fn user(name: &str, admin_of: &[&str]) -> Value {
        let roles: Vec<Value> = admin_of
            .iter()
            .map(|p| json!({"name": "Project admin", "projectId": p, "allProjects": false}))
            .chain(std::iter::once(json!({"name": "Developer", "allProjects": true})))
            .collect();
        json!({
            "name": name,
            "readonly": false,
            "roles": roles,
            "groups": ["developers"],
        })
    }

    /// A project with a default view and no other data.
    pub fn minimal_project(name: &str, creator: &str) -> MockProject {
        let mut project = MockProject::new(name)
            .with_view(Self::view(1, crate::DEFAULT_VIEW, ""));
        project.record["creator"] = json!(creator);
        project
    }

    /// The standard scenario used by most tests.
    ///
    /// - `demo`: three issues (New, Existing, Fixed), two builds, a
    ///   `critical` view, a `core` module, metrics and canned reports
    /// - `tools`: empty apart from its default view
    /// - users `alice` (admin of demo) and `bob`
    pub fn default_scenario() -> MockState {
        let mut demo = Self::minimal_project("demo", "alice")
            .with_issue(Self::issue(1, "New"))
            .with_issue(Self::issue(2, "Existing"))
            .with_issue(Self::issue(3, "Fixed"))
            .with_build(Self::build(1, "build_1"))
            .with_build(Self::build(2, "build_2"))
            .with_view(Self::view(2, "critical", "severity:1-2"))
            .with_module(Self::module("core", &["**/src/core/**"]))
            .with_metric(Self::metric("/src/module_0.c", "LOC_FILE", 120.0))
            .with_metric(Self::metric("/src/module_1.c", "LOC_FILE", 80.0))
            .with_statistics(Self::statistics("LOC_FILE", 200.0, 80.0, 120.0, 2))
            .with_canned(
                "project_configuration",
                vec![json!({"build": "build_2", "tables": ["NPD.FUNC.MUST"]})],
            )
            .with_canned(
                "taxonomies",
                vec![json!({"name": "C and C++", "is_custom": false})],
            )
            .with_canned(
                "defect_types",
                vec![json!({"code": "NPD.FUNC.MUST", "name": "Null pointer may be dereferenced", "enabled": true, "severity": 1})],
            )
            .with_canned(
                "report",
                vec![json!({"rows": [{"id": 1, "name": "Critical"}], "columns": [{"id": 1, "name": "C and C++"}], "data": [[2]]})],
            )
            .with_canned("fchurns", vec![json!({"file": "/src/module_0.c", "churns": 3})]);
        demo.record["description"] = json!("Demo project");
        demo.record["tags"] = json!(["nightly"]);

        MockState::new()
            .with_project(demo)
            .with_project(Self::minimal_project("tools", "bob"))
            .with_user(Self::user("alice", &["demo"]))
            .with_user(Self::user("bob", &[]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_issue_fixture_fields() {
        let issue = Fixtures::issue(5, "New");
        assert_eq!(issue["id"], 5);
        assert_eq!(issue["state"], "New");
        assert!(issue["dateOriginated"].as_i64().unwrap() > BASE_MILLIS);
    }

    #[test]
    fn test_default_scenario() {
        let state = Fixtures::default_scenario();
        let demo = state.project("demo").unwrap();
        assert_eq!(demo.issues.len(), 3);
        assert_eq!(demo.views.len(), 2);
        assert_eq!(demo.views[0]["name"], crate::DEFAULT_VIEW);
        assert!(state.project("tools").is_some());
        assert_eq!(state.users.len(), 2);
    }

    #[test]
    fn test_user_roles() {
        let user = Fixtures::user("carol", &["a", "b"]);
        assert_eq!(user["roles"].as_array().unwrap().len(), 3);
        assert_eq!(user["roles"][0]["projectId"], "a");
    }
}
