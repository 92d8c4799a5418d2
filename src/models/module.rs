//! Module model.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::project::ProjectRef;
use super::Named;
use crate::client::{Params, Sent};
use crate::hydrate::{Hydrate, JsonObject};

/// A named group of path patterns.
///
/// `paths` can be edited locally; nothing reaches the server until
/// [`Module::create`] or [`Module::update`] is called.
#[derive(Debug, Clone, Serialize)]
pub struct Module {
    #[serde(skip)]
    project: ProjectRef,
    pub name: String,
    pub paths: Vec<String>,
}

#[derive(Deserialize)]
struct ModuleWire {
    name: String,
    #[serde(default)]
    paths: Vec<String>,
}

impl Hydrate for Module {
    type Owner = ProjectRef;
    const KIND: &'static str = "module";

    fn hydrate(owner: &ProjectRef, object: JsonObject) -> serde_json::Result<Self> {
        let wire: ModuleWire = serde_json::from_value(Value::Object(object))?;
        Ok(Self::new(owner.clone(), wire.name, wire.paths))
    }
}

impl Module {
    /// A module that exists only locally until pushed.
    pub fn new<I, S>(project: ProjectRef, name: impl Into<String>, paths: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            project,
            name: name.into(),
            paths: paths.into_iter().map(Into::into).collect(),
        }
    }

    pub fn project(&self) -> &ProjectRef {
        &self.project
    }

    /// Add `path` unless it is already present.
    pub fn add_path(&mut self, path: impl Into<String>) {
        let path = path.into();
        if !self.paths.contains(&path) {
            self.paths.push(path);
        }
    }

    pub fn remove_path(&mut self, path: &str) {
        self.paths.retain(|p| p != path);
    }

    /// Create this module on the server (`create_module`).
    pub async fn create(&self) -> Sent {
        let params = self.apply(self.project.params("create_module"));
        self.project.send(&params).await
    }

    /// Replace the server's path list with the local one (`update_module`).
    pub async fn update(&self) -> Sent {
        let params = self.apply(self.project.params("update_module"));
        self.project.send(&params).await
    }

    pub async fn delete(&self) -> Sent {
        let params = self.project.params("delete_module").set("name", &self.name);
        self.project.send(&params).await
    }

    fn apply(&self, params: Params) -> Params {
        params
            .set("name", &self.name)
            .set("paths", self.paths.join(","))
    }
}

impl Named for Module {
    fn name(&self) -> &str {
        &self.name
    }
}

impl fmt::Display for Module {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::KwClient;
    use crate::hydrate::hydrate_lines;

    fn project_ref() -> ProjectRef {
        let client = KwClient::new("http://kw.example.com:8080", "alice", "tok").unwrap();
        ProjectRef::new(client, "demo")
    }

    #[test]
    fn test_module_hydrate() {
        let line = r#"{"name":"JsonLib","allowAll":true,"paths":["**/jsoncpp/**"]}"#;
        let modules: Vec<Module> = hydrate_lines(line, &project_ref()).unwrap();
        assert_eq!(modules[0].name, "JsonLib");
        assert_eq!(modules[0].paths, vec!["**/jsoncpp/**"]);
    }

    #[test]
    fn test_module_path_editing() {
        let mut module = Module::new(project_ref(), "core", ["src/core/**"]);
        module.add_path("src/util/**");
        module.add_path("src/core/**");
        assert_eq!(module.paths, vec!["src/core/**", "src/util/**"]);

        module.remove_path("src/core/**");
        module.remove_path("missing/**");
        assert_eq!(module.paths, vec!["src/util/**"]);
    }

    #[test]
    fn test_module_params() {
        let module = Module::new(project_ref(), "core", ["a/**", "b/**"]);
        let params = module.apply(module.project().params("create_module"));
        assert_eq!(params.get("project"), Some("demo"));
        assert_eq!(params.get("name"), Some("core"));
        assert_eq!(params.get("paths"), Some("a/**,b/**"));
    }
}
