//! Project action handlers.

use axum::{http::StatusCode, response::Response};
use serde_json::json;

use super::{api_error, json_lines, limit, ok, split_list, ApiForm};
use crate::mock_server::state::{MockProject, MockState};

/// action=update_project
///
/// Renaming moves the project to its new key.
pub fn update_project(state: &mut MockState, form: &ApiForm) -> Response {
    let Some(name) = form.get("project") else {
        return api_error(StatusCode::BAD_REQUEST, "project is required");
    };
    if let Some(newname) = form.get("newname") {
        if newname != name && state.projects.contains_key(newname) {
            return api_error(
                StatusCode::BAD_REQUEST,
                format!("Project already exists: {newname}"),
            );
        }
    }
    let Some(mut project) = state.projects.remove(name) else {
        return api_error(StatusCode::NOT_FOUND, format!("No such project: {name}"));
    };

    if let Some(description) = form.get("description") {
        project.record["description"] = json!(description);
    }
    if let Some(tags) = form.get("tags") {
        project.record["tags"] = json!(split_list(tags));
    }
    let key = match form.get("newname") {
        Some(newname) => {
            project.record["name"] = json!(newname);
            newname.clone()
        }
        None => name.clone(),
    };
    state.projects.insert(key, project);
    ok()
}

/// action=delete_project
pub fn delete_project(state: &mut MockState, form: &ApiForm) -> Response {
    let Some(name) = form.get("project") else {
        return api_error(StatusCode::BAD_REQUEST, "project is required");
    };
    match state.projects.remove(name) {
        Some(_) => ok(),
        None => api_error(StatusCode::NOT_FOUND, format!("No such project: {name}")),
    }
}

/// action=metrics
///
/// `aggregate=true` answers with per-tag statistics instead of raw values.
pub fn metrics(project: &MockProject, form: &ApiForm) -> Response {
    if form.get("aggregate").map(String::as_str) == Some("true") {
        json_lines(&project.statistics)
    } else {
        json_lines(project.metrics.iter().take(limit(form)))
    }
}
