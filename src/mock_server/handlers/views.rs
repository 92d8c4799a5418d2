//! View and module action handlers.

use axum::{http::StatusCode, response::Response};
use serde_json::json;

use super::{api_error, ok, split_list, ApiForm};
use crate::mock_server::state::MockProject;
use crate::DEFAULT_VIEW;

fn required<'a>(form: &'a ApiForm, key: &str) -> Result<&'a str, Response> {
    form.get(key)
        .map(String::as_str)
        .ok_or_else(|| api_error(StatusCode::BAD_REQUEST, format!("{key} is required")))
}

/// action=create_view
pub fn create_view(project: &mut MockProject, form: &ApiForm) -> Response {
    let name = match required(form, "name") {
        Ok(name) => name,
        Err(response) => return response,
    };
    if project.view_mut(name).is_some() {
        return api_error(StatusCode::BAD_REQUEST, format!("View already exists: {name}"));
    }

    let id = project
        .views
        .iter()
        .filter_map(|v| v["id"].as_u64())
        .max()
        .unwrap_or(0)
        + 1;
    let tags = form.get("tags").map(|t| split_list(t)).unwrap_or_default();
    project.views.push(json!({
        "id": id,
        "name": name,
        "query": form.get("query").map(String::as_str).unwrap_or_default(),
        "creator": form.get("user").map(String::as_str).unwrap_or_default(),
        "is_public": form.get("is_public").map(String::as_str) == Some("true"),
        "tags": tags,
    }));
    ok()
}

/// action=update_view
pub fn update_view(project: &mut MockProject, form: &ApiForm) -> Response {
    let name = match required(form, "name") {
        Ok(name) => name,
        Err(response) => return response,
    };
    if name == DEFAULT_VIEW {
        return api_error(StatusCode::FORBIDDEN, "The default view cannot be changed");
    }
    let Some(view) = project.view_mut(name) else {
        return api_error(StatusCode::NOT_FOUND, format!("No such view: {name}"));
    };

    if let Some(query) = form.get("query") {
        view["query"] = json!(query);
    }
    if let Some(is_public) = form.get("is_public") {
        view["is_public"] = json!(is_public == "true");
    }
    if let Some(tags) = form.get("tags") {
        view["tags"] = json!(split_list(tags));
    }
    ok()
}

/// action=delete_view
pub fn delete_view(project: &mut MockProject, form: &ApiForm) -> Response {
    let name = match required(form, "name") {
        Ok(name) => name,
        Err(response) => return response,
    };
    if name == DEFAULT_VIEW {
        return api_error(StatusCode::FORBIDDEN, "The default view cannot be deleted");
    }
    let before = project.views.len();
    project.views.retain(|v| v["name"] != name);
    if project.views.len() == before {
        return api_error(StatusCode::NOT_FOUND, format!("No such view: {name}"));
    }
    ok()
}

/// action=create_module
pub fn create_module(project: &mut MockProject, form: &ApiForm) -> Response {
    let name = match required(form, "name") {
        Ok(name) => name,
        Err(response) => return response,
    };
    if project.module_mut(name).is_some() {
        return api_error(StatusCode::BAD_REQUEST, format!("Module already exists: {name}"));
    }
    let paths = form.get("paths").map(|p| split_list(p)).unwrap_or_default();
    project.modules.push(json!({"name": name, "paths": paths}));
    ok()
}

/// action=update_module
pub fn update_module(project: &mut MockProject, form: &ApiForm) -> Response {
    let name = match required(form, "name") {
        Ok(name) => name,
        Err(response) => return response,
    };
    let Some(module) = project.module_mut(name) else {
        return api_error(StatusCode::NOT_FOUND, format!("No such module: {name}"));
    };
    if let Some(paths) = form.get("paths") {
        module["paths"] = json!(split_list(paths));
    }
    ok()
}

/// action=delete_module
pub fn delete_module(project: &mut MockProject, form: &ApiForm) -> Response {
    let name = match required(form, "name") {
        Ok(name) => name,
        Err(response) => return response,
    };
    let before = project.modules.len();
    project.modules.retain(|m| m["name"] != name);
    if project.modules.len() == before {
        return api_error(StatusCode::NOT_FOUND, format!("No such module: {name}"));
    }
    ok()
}
