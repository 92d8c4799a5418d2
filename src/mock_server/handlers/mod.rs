//! HTTP request handlers for the mock server.
//!
//! Klocwork has a single endpoint; [`api`] dispatches on the `action` form
//! field to the per-entity handlers.

pub mod issues;
pub mod projects;
pub mod views;

use std::collections::HashMap;
use std::sync::Arc;

use axum::{
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Form, Json,
};
use serde_json::{json, Value};
use tokio::sync::RwLock;

use crate::mock_server::state::{MockProject, MockState};

/// Decoded request form.
pub type ApiForm = HashMap<String, String>;

/// POST /review/api
pub async fn api(
    State(state): State<Arc<RwLock<MockState>>>,
    Form(form): Form<ApiForm>,
) -> Response {
    let mut guard = state.write().await;
    let state = &mut *guard;
    state.requests.push(form.clone());

    if let Some(required) = state.required_token.as_deref() {
        if form.get("ltoken").map(String::as_str) != Some(required) {
            return api_error(StatusCode::UNAUTHORIZED, "Authentication failed");
        }
    }

    let action = form.get("action").map(String::as_str).unwrap_or_default();
    match action {
        "" => api_error(StatusCode::BAD_REQUEST, "action is required"),
        "version" => json_lines([&json!({
            "majorVersion": state.version.0,
            "minorVersion": state.version.1,
        })]),
        "projects" => json_lines(state.projects.values().map(|p| &p.record)),
        "users" => json_lines(&state.users),
        "update_project" => projects::update_project(state, &form),
        "delete_project" => projects::delete_project(state, &form),
        _ => {
            let Some(name) = form.get("project") else {
                return api_error(StatusCode::BAD_REQUEST, "project is required");
            };
            match state.projects.get_mut(name) {
                Some(project) => project_action(project, action, &form),
                None => api_error(StatusCode::NOT_FOUND, format!("No such project: {name}")),
            }
        }
    }
}

fn project_action(project: &mut MockProject, action: &str, form: &ApiForm) -> Response {
    match action {
        "search" => issues::search(project, form),
        "update_status" => issues::update_status(project, form),
        "issue_details" => issues::issue_details(project, form),
        "builds" => json_lines(&project.builds),
        "views" => json_lines(&project.views),
        "modules" => json_lines(&project.modules),
        "metrics" => projects::metrics(project, form),
        "create_view" => views::create_view(project, form),
        "update_view" => views::update_view(project, form),
        "delete_view" => views::delete_view(project, form),
        "create_module" => views::create_module(project, form),
        "update_module" => views::update_module(project, form),
        "delete_module" => views::delete_module(project, form),
        other => match project.canned.get(other) {
            Some(lines) => json_lines(lines),
            None => api_error(StatusCode::BAD_REQUEST, format!("Unknown action: {other}")),
        },
    }
}

/// One JSON document per line, newline terminated.
pub(crate) fn json_lines<'a>(lines: impl IntoIterator<Item = &'a Value>) -> Response {
    let mut body = String::new();
    for line in lines {
        body.push_str(&line.to_string());
        body.push('\n');
    }
    (StatusCode::OK, [(header::CONTENT_TYPE, "application/json")], body).into_response()
}

pub(crate) fn api_error(status: StatusCode, message: impl Into<String>) -> Response {
    (
        status,
        Json(json!({
            "status": status.as_u16(),
            "message": message.into(),
        })),
    )
        .into_response()
}

/// Empty 200, the answer to a successful write.
pub(crate) fn ok() -> Response {
    StatusCode::OK.into_response()
}

/// Split a comma-separated form value, dropping empty items.
pub(crate) fn split_list(value: &str) -> Vec<&str> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect()
}

pub(crate) fn limit(form: &ApiForm) -> usize {
    form.get("limit")
        .and_then(|l| l.parse().ok())
        .unwrap_or(usize::MAX)
}
