//! Build model.

use std::cmp::Ordering;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use serde_with::{serde_as, DisplayFromStr, PickFirst};

use super::issue::Issue;
use super::project::{ProjectRef, SearchQuery, NEW_STATES};
use super::Named;
use crate::client::Fetched;
use crate::error::Result;
use crate::hydrate::{Hydrate, JsonObject};

/// One analysis run of a project.
#[derive(Debug, Clone, Serialize)]
pub struct Build {
    #[serde(skip)]
    project: ProjectRef,
    pub id: u64,
    pub name: String,
    /// Raw build time, epoch milliseconds.
    pub date: i64,
    pub keepit: bool,
    /// Build time as local `ctime` text.
    pub created: String,
}

#[serde_as]
#[derive(Deserialize)]
struct BuildWire {
    #[serde_as(as = "PickFirst<(_, DisplayFromStr)>")]
    id: u64,
    name: String,
    date: i64,
    #[serde(default)]
    keepit: bool,
}

impl Hydrate for Build {
    type Owner = ProjectRef;
    const KIND: &'static str = "build";

    fn hydrate(owner: &ProjectRef, object: JsonObject) -> serde_json::Result<Self> {
        let wire: BuildWire = serde_json::from_value(Value::Object(object))?;
        Ok(Self {
            project: owner.clone(),
            id: wire.id,
            name: wire.name,
            created: super::created_from_millis("date", wire.date)?,
            date: wire.date,
            keepit: wire.keepit,
        })
    }
}

impl Build {
    pub fn project(&self) -> &ProjectRef {
        &self.project
    }

    pub fn created_utc(&self) -> Option<DateTime<Utc>> {
        DateTime::<Utc>::from_timestamp_millis(self.date)
    }

    /// The project configuration recorded for this build.
    pub async fn details(&self) -> Result<Option<JsonObject>> {
        let fetched = self.project.configuration(Some(&self.name)).await?;
        Ok(fetched.into_result()?.into_iter().next())
    }

    /// Issues found in this build, optionally narrowed by `query`.
    pub async fn issues(&self, query: Option<&str>) -> Result<Fetched<Issue>> {
        let mut search = SearchQuery::new().build(self);
        if let Some(query) = query {
            search = search.query(query);
        }
        self.project.search(&search).await
    }

    /// Issues first detected in this build.
    pub async fn new_issues(&self) -> Result<Fetched<Issue>> {
        let fetched = self.issues(Some("state:New")).await?;
        Ok(fetched.retain(|i| NEW_STATES.contains(&i.state.as_str())))
    }
}

impl Named for Build {
    fn name(&self) -> &str {
        &self.name
    }
}

impl fmt::Display for Build {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "id:{} created on {}", self.id, self.created)
    }
}

impl PartialEq for Build {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Build {}

impl PartialOrd for Build {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Build {
    fn cmp(&self, other: &Self) -> Ordering {
        self.id.cmp(&other.id)
    }
}
