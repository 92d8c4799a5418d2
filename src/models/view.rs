//! View model.
//!
//! A view is a saved search stored on the server. It can be passed wherever
//! a view name is expected and can itself be updated or deleted.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use serde_with::{serde_as, DisplayFromStr, PickFirst};

use super::issue::Issue;
use super::project::{ProjectRef, SearchQuery, ALL_STATES, NEW_STATES, OPEN_STATES};
use super::Named;
use crate::client::{Fetched, Params, Sent};
use crate::error::{KwError, Result};
use crate::hydrate::{Hydrate, JsonObject};

/// Name of the built-in view, which the server does not let clients change.
pub const DEFAULT_VIEW: &str = "*default*";

/// A saved search.
#[derive(Debug, Clone, Serialize)]
pub struct View {
    #[serde(skip)]
    project: ProjectRef,
    pub id: u64,
    pub name: String,
    pub creator: String,
    pub query: String,
    pub is_public: bool,
    pub tags: Vec<String>,
}

#[serde_as]
#[derive(Deserialize)]
struct ViewWire {
    #[serde_as(as = "PickFirst<(_, DisplayFromStr)>")]
    id: u64,
    name: String,
    #[serde(default)]
    creator: String,
    #[serde(default)]
    query: String,
    #[serde(default)]
    is_public: bool,
    #[serde(default)]
    tags: Vec<String>,
}

impl Hydrate for View {
    type Owner = ProjectRef;
    const KIND: &'static str = "view";

    fn hydrate(owner: &ProjectRef, object: JsonObject) -> serde_json::Result<Self> {
        let wire: ViewWire = serde_json::from_value(Value::Object(object))?;
        Ok(Self {
            project: owner.clone(),
            id: wire.id,
            name: wire.name,
            creator: wire.creator,
            query: wire.query,
            is_public: wire.is_public,
            tags: wire.tags,
        })
    }
}

impl View {
    pub fn project(&self) -> &ProjectRef {
        &self.project
    }

    pub fn is_default(&self) -> bool {
        self.name == DEFAULT_VIEW
    }

    /// Search within this view.
    pub async fn issues(&self, query: Option<&str>) -> Result<Fetched<Issue>> {
        let mut search = SearchQuery::new().view(self);
        if let Some(query) = query {
            search = search.query(query);
        }
        self.project.search(&search).await
    }

    /// New and existing issues in this view.
    pub async fn open_issues(&self) -> Result<Fetched<Issue>> {
        let fetched = self.issues(Some("state:New,Existing")).await?;
        Ok(fetched.retain(|i| OPEN_STATES.contains(&i.state.as_str())))
    }

    /// New, existing and fixed issues in this view.
    pub async fn all_issues(&self) -> Result<Fetched<Issue>> {
        let fetched = self.issues(Some("state:New,Existing,Fixed")).await?;
        Ok(fetched.retain(|i| ALL_STATES.contains(&i.state.as_str())))
    }

    pub async fn new_issues(&self) -> Result<Fetched<Issue>> {
        let fetched = self.issues(Some("state:New")).await?;
        Ok(fetched.retain(|i| NEW_STATES.contains(&i.state.as_str())))
    }

    /// Push this view's query, visibility and tags to the server.
    ///
    /// # Errors
    ///
    /// Returns [`KwError::InvalidArgument`] for the default view.
    pub async fn update(&self) -> Result<Sent> {
        self.ensure_mutable("update")?;
        let params = self
            .project
            .params("update_view")
            .set("name", &self.name)
            .set("query", &self.query)
            .set("is_public", self.is_public.to_string());
        let params = if self.tags.is_empty() {
            params
        } else {
            params.set("tags", self.tags.join(","))
        };
        Ok(self.project.send(&params).await)
    }

    /// Delete this view on the server.
    ///
    /// # Errors
    ///
    /// Returns [`KwError::InvalidArgument`] for the default view.
    pub async fn delete(&self) -> Result<Sent> {
        self.ensure_mutable("delete")?;
        let params = self.project.params("delete_view").set("name", &self.name);
        Ok(self.project.send(&params).await)
    }

    fn ensure_mutable(&self, operation: &str) -> Result<()> {
        if self.is_default() {
            return Err(KwError::InvalidArgument(format!(
                "cannot {operation} the {DEFAULT_VIEW} view"
            )));
        }
        Ok(())
    }
}

impl Named for View {
    fn name(&self) -> &str {
        &self.name
    }
}

impl fmt::Display for View {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

/// A view to create with `create_view`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ViewDefinition {
    pub name: String,
    pub query: String,
    pub is_public: bool,
    pub tags: Vec<String>,
}

impl ViewDefinition {
    pub fn new(name: impl Into<String>, query: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            query: query.into(),
            ..Default::default()
        }
    }

    pub fn public(mut self, is_public: bool) -> Self {
        self.is_public = is_public;
        self
    }

    pub fn tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = tags.into_iter().map(Into::into).collect();
        self
    }

    pub(crate) fn apply(&self, params: Params) -> Params {
        let params = params
            .set("name", &self.name)
            .set("query", &self.query)
            .set("is_public", self.is_public.to_string());
        if self.tags.is_empty() {
            params
        } else {
            params.set("tags", self.tags.join(","))
        }
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
    fn test_view_hydrate() {
        let line = r#"{"creator": "klocwork", "is_public": false, "id": 9, "query": "-module:\"JsonLib\"", "name": "onlineapplication"}"#;
        let views: Vec<View> = hydrate_lines(line, &project_ref()).unwrap();
        assert_eq!(views[0].id, 9);
        assert_eq!(views[0].query, "-module:\"JsonLib\"");
        assert!(views[0].tags.is_empty());
        assert_eq!(views[0].to_string(), "onlineapplication");
    }

    #[tokio::test]
    async fn test_default_view_is_immutable() {
        let line = r#"{"id": 1, "name": "*default*"}"#;
        let views: Vec<View> = hydrate_lines(line, &project_ref()).unwrap();
        assert!(views[0].is_default());
        assert!(matches!(
            views[0].update().await,
            Err(KwError::InvalidArgument(_))
        ));
        assert!(matches!(
            views[0].delete().await,
            Err(KwError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_view_definition_params() {
        let params = ViewDefinition::new("critical", "severity:1-2")
            .public(true)
            .tags(["ci", "nightly"])
            .apply(Params::action("create_view"));
        assert_eq!(params.get("name"), Some("critical"));
        assert_eq!(params.get("is_public"), Some("true"));
        assert_eq!(params.get("tags"), Some("ci,nightly"));
    }
}
