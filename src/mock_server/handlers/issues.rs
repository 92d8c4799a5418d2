//! Issue action handlers.

use axum::{http::StatusCode, response::Response};
use serde_json::json;

use super::{api_error, json_lines, limit, ok, ApiForm};
use crate::mock_server::fixtures::BASE_MILLIS;
use crate::mock_server::state::MockProject;

/// States named by a `state:` term of the query, if there is one.
fn state_filter(query: &str) -> Option<Vec<&str>> {
    query
        .split_whitespace()
        .find_map(|term| term.strip_prefix("state:"))
        .map(|states| states.split(',').collect())
}

/// action=search
pub fn search(project: &MockProject, form: &ApiForm) -> Response {
    if let Some(view) = form.get("view") {
        if !project.views.iter().any(|v| v["name"] == view.as_str()) {
            return api_error(StatusCode::BAD_REQUEST, format!("No such view: {view}"));
        }
    }

    let query = form.get("query").map(String::as_str).unwrap_or_default();
    let states = state_filter(query);
    let matches = project
        .issues
        .iter()
        .filter(|issue| match &states {
            Some(states) => issue["state"]
                .as_str()
                .is_some_and(|state| states.contains(&state)),
            None => true,
        })
        .take(limit(form));
    json_lines(matches)
}

/// action=update_status
pub fn update_status(project: &mut MockProject, form: &ApiForm) -> Response {
    let Some(raw) = form.get("ids") else {
        return api_error(StatusCode::BAD_REQUEST, "ids is required");
    };
    let ids: Vec<u64> = match raw.split(',').map(|id| id.trim().parse()).collect() {
        Ok(ids) => ids,
        Err(_) => return api_error(StatusCode::BAD_REQUEST, format!("Invalid ids: {raw}")),
    };
    if let Some(missing) = ids
        .iter()
        .find(|id| !project.issues.iter().any(|i| i["id"].as_u64() == Some(**id)))
    {
        return api_error(StatusCode::NOT_FOUND, format!("No such issue: {missing}"));
    }

    for id in ids {
        if let Some(issue) = project.issue_mut(id) {
            if let Some(status) = form.get("status") {
                issue["status"] = json!(status);
            }
            if let Some(owner) = form.get("owner") {
                issue["owner"] = json!(owner);
            }
        }
        project.history.entry(id).or_default().push(json!({
            "date": BASE_MILLIS,
            "userid": form.get("user"),
            "comment": form.get("comment"),
            "status": form.get("status"),
        }));
    }
    ok()
}

/// action=issue_details
pub fn issue_details(project: &MockProject, form: &ApiForm) -> Response {
    let Some(id) = form.get("id").and_then(|id| id.parse::<u64>().ok()) else {
        return api_error(StatusCode::BAD_REQUEST, "id is required");
    };
    let Some(issue) = project.issues.iter().find(|i| i["id"].as_u64() == Some(id)) else {
        return api_error(StatusCode::NOT_FOUND, format!("No such issue: {id}"));
    };

    let history = project.history.get(&id).cloned().unwrap_or_default();
    let last_build = project.builds.last().map(|b| b["name"].clone());
    json_lines([&json!({
        "id": id,
        "code": issue["code"],
        "name": issue["title"],
        "location": issue["file"],
        "build": last_build,
        "severity": issue["severity"],
        "owner": issue["owner"],
        "state": issue["state"],
        "status": issue["status"],
        "history": history,
    })])
}
