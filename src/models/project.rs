//! Project model and the per-project API.
//!
//! A [`Project`] is the main entry point for issue, build, view, module and
//! metric operations. Entities it returns keep a [`ProjectRef`] so they can
//! make follow-up requests on their own.

use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::build::Build;
use super::issue::{Issue, IssueDetails, IssueIds, IssueUpdate};
use super::metric::{Metric, MetricsStatistics};
use super::module::Module;
use super::view::{View, ViewDefinition};
use super::Named;
use crate::client::{Fetched, KwClient, Params, Sent};
use crate::error::{KwError, Result};
use crate::hydrate::{Hydrate, JsonObject};

pub(crate) const OPEN_STATES: &[&str] = &["New", "Existing"];
pub(crate) const ALL_STATES: &[&str] = &["New", "Existing", "Fixed"];
pub(crate) const NEW_STATES: &[&str] = &["New"];

/// Client plus project name: everything needed to act on one project.
///
/// Cheap to clone; every project-scoped entity carries one.
#[derive(Clone)]
pub struct ProjectRef {
    client: KwClient,
    name: Arc<str>,
}

impl fmt::Debug for ProjectRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ProjectRef").field(&&*self.name).finish()
    }
}

impl PartialEq for ProjectRef {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name && self.client.endpoint() == other.client.endpoint()
    }
}

impl ProjectRef {
    pub fn new(client: KwClient, name: &str) -> Self {
        Self {
            client,
            name: Arc::from(name),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn client(&self) -> &KwClient {
        &self.client
    }

    /// Parameters for `action` scoped to this project.
    pub fn params(&self, action: &str) -> Params {
        Params::action(action).set("project", &*self.name)
    }

    pub(crate) async fn fetch<T: Hydrate<Owner = ProjectRef>>(
        &self,
        params: &Params,
    ) -> Result<Fetched<T>> {
        self.client.fetch(params, self).await
    }

    pub(crate) async fn fetch_objects(&self, params: &Params) -> Result<Fetched<JsonObject>> {
        self.client.fetch(params, &()).await
    }

    pub(crate) async fn send(&self, params: &Params) -> Sent {
        self.client.send(params).await
    }

    /// Run `search` with `query`.
    pub async fn search(&self, query: &SearchQuery) -> Result<Fetched<Issue>> {
        self.fetch(&query.params(&self.name)).await
    }

    /// Send `update_status` for `ids`.
    ///
    /// # Errors
    ///
    /// Returns [`KwError::InvalidArgument`] if `ids` is empty or not numeric;
    /// nothing is sent in that case.
    pub async fn update_issues(
        &self,
        ids: impl Into<IssueIds>,
        update: &IssueUpdate,
    ) -> Result<Sent> {
        let ids = ids.into().normalize()?;
        let params = update.apply(self.params("update_status").set("ids", ids));
        Ok(self.send(&params).await)
    }

    pub async fn issue_details(&self, id: u64) -> Result<Fetched<IssueDetails>> {
        let params = self.params("issue_details").set("id", id.to_string());
        self.fetch(&params).await
    }

    pub async fn configuration(&self, build: Option<&str>) -> Result<Fetched<JsonObject>> {
        let params = self.params("project_configuration").set_opt("build", build);
        self.fetch_objects(&params).await
    }
}

/// Filters for `search`. Unset fields are left out of the request.
///
/// # Example
///
/// ```ignore
/// let by_name = SearchQuery::new().view("critical").limit(50);
/// let by_view = SearchQuery::new().view(&critical_view).limit(50);
/// assert_eq!(by_name, by_view);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchQuery {
    pub view: Option<String>,
    pub build: Option<String>,
    pub query: Option<String>,
    pub limit: Option<u32>,
}

impl SearchQuery {
    pub fn new() -> Self {
        Self::default()
    }

    /// Search within a view, given by name or as a [`View`].
    pub fn view(mut self, view: &(impl Named + ?Sized)) -> Self {
        self.view = Some(view.name().to_string());
        self
    }

    /// Restrict to a build, given by name or as a [`Build`].
    pub fn build(mut self, build: &(impl Named + ?Sized)) -> Self {
        self.build = Some(build.name().to_string());
        self
    }

    /// Server-side filter expression, e.g. `state:New,Existing`.
    pub fn query(mut self, query: impl Into<String>) -> Self {
        self.query = Some(query.into());
        self
    }

    pub fn limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }

    /// The `search` parameters for `project`.
    ///
    /// A build restriction becomes a `build:` term at the front of the query.
    pub fn params(&self, project: &str) -> Params {
        let build_term = self.build.as_deref().map(|b| {
            if b.contains(char::is_whitespace) {
                format!("build:\"{b}\"")
            } else {
                format!("build:{b}")
            }
        });
        let query = match (build_term, self.query.as_deref()) {
            (Some(term), Some(q)) => Some(format!("{term} {q}")),
            (Some(term), None) => Some(term),
            (None, q) => q.map(str::to_string),
        };

        Params::action("search")
            .set("project", project)
            .set_opt("view", self.view.clone())
            .set_opt("query", query)
            .set_opt("limit", self.limit.map(|l| l.to_string()))
    }
}

/// Filters for `metrics`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MetricsQuery {
    pub view: Option<String>,
    pub query: Option<String>,
    pub limit: Option<u32>,
    pub aggregate: Option<bool>,
}

impl MetricsQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn view(mut self, view: &(impl Named + ?Sized)) -> Self {
        self.view = Some(view.name().to_string());
        self
    }

    pub fn query(mut self, query: impl Into<String>) -> Self {
        self.query = Some(query.into());
        self
    }

    pub fn limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn aggregate(mut self, aggregate: bool) -> Self {
        self.aggregate = Some(aggregate);
        self
    }

    pub fn params(&self, project: &str) -> Params {
        Params::action("metrics")
            .set("project", project)
            .set_opt("view", self.view.clone())
            .set_opt("query", self.query.clone())
            .set_opt("limit", self.limit.map(|l| l.to_string()))
            .set_opt("aggregate", self.aggregate.map(|a| a.to_string()))
    }
}

/// Project settings to change with `update_project`. Unset fields are not sent.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProjectUpdate {
    pub newname: Option<String>,
    pub description: Option<String>,
    pub tags: Option<Vec<String>>,
    pub auto_delete_builds: Option<bool>,
    pub auto_delete_threshold: Option<u32>,
}

impl ProjectUpdate {
    fn apply(&self, params: Params) -> Params {
        params
            .set_opt("newname", self.newname.clone())
            .set_opt("description", self.description.clone())
            .set_opt("tags", self.tags.as_ref().map(|t| t.join(",")))
            .set_opt(
                "auto_delete_builds",
                self.auto_delete_builds.map(|b| b.to_string()),
            )
            .set_opt(
                "auto_delete_threshold",
                self.auto_delete_threshold.map(|t| t.to_string()),
            )
    }
}

/// Parameters for the `report` action.
///
/// Defaults to a Category × Severity table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportQuery {
    pub build: Option<String>,
    pub filter_query: Option<String>,
    pub view: Option<String>,
    pub x: Option<String>,
    pub x_drilldown: Option<String>,
    pub y: Option<String>,
    pub y_drilldown: Option<String>,
    pub group_issues: Option<bool>,
}

impl Default for ReportQuery {
    fn default() -> Self {
        Self {
            build: None,
            filter_query: None,
            view: None,
            x: Some("Category".to_string()),
            x_drilldown: None,
            y: Some("Severity".to_string()),
            y_drilldown: None,
            group_issues: None,
        }
    }
}

impl ReportQuery {
    fn apply(&self, params: Params) -> Params {
        params
            .set_opt("build", self.build.clone())
            .set_opt("filterQuery", self.filter_query.clone())
            .set_opt("view", self.view.clone())
            .set_opt("x", self.x.clone())
            .set_opt("xDrilldown", self.x_drilldown.clone())
            .set_opt("y", self.y.clone())
            .set_opt("yDrilldown", self.y_drilldown.clone())
            .set_opt("group_issues", self.group_issues.map(|g| g.to_string()))
    }
}

/// A Klocwork project.
///
/// Builds, views and modules are fetched on first access and then kept for
/// the life of this value. Nothing invalidates them: use
/// [`Project::fetch_builds`] (and friends) to see server-side changes.
///
/// Equality, ordering and hashing use the project name only.
#[derive(Debug, Clone, Serialize)]
pub struct Project {
    #[serde(skip)]
    handle: ProjectRef,
    pub id: String,
    pub name: String,
    pub description: String,
    pub creator: String,
    pub tags: Vec<String>,
    #[serde(skip)]
    builds: Option<Vec<Build>>,
    #[serde(skip)]
    views: Option<Vec<View>>,
    #[serde(skip)]
    modules: Option<Vec<Module>>,
}

#[derive(Deserialize)]
struct ProjectWire {
    id: String,
    name: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    creator: String,
    #[serde(default)]
    tags: Vec<String>,
}

impl Hydrate for Project {
    type Owner = KwClient;
    const KIND: &'static str = "project";

    fn hydrate(owner: &KwClient, object: JsonObject) -> serde_json::Result<Self> {
        let wire: ProjectWire = serde_json::from_value(Value::Object(object))?;
        Ok(Self {
            handle: ProjectRef::new(owner.clone(), &wire.name),
            id: wire.id,
            name: wire.name,
            description: wire.description,
            creator: wire.creator,
            tags: wire.tags,
            builds: None,
            views: None,
            modules: None,
        })
    }
}

/// Fill `slot` from `action` unless it already holds a collection.
async fn ensure_loaded<'a, T: Hydrate<Owner = ProjectRef>>(
    slot: &'a mut Option<Vec<T>>,
    handle: &ProjectRef,
    action: &str,
) -> Result<&'a [T]> {
    if slot.is_none() {
        let items = handle.fetch::<T>(&handle.params(action)).await?.into_result()?;
        tracing::debug!(project = handle.name(), action, items = items.len(), "cached collection");
        *slot = Some(items);
    }
    Ok(slot.as_deref().unwrap_or_default())
}

impl Project {
    /// A project known only by name, e.g. one that was just created elsewhere.
    pub fn named(client: KwClient, name: &str) -> Self {
        Self {
            handle: ProjectRef::new(client, name),
            id: name.to_string(),
            name: name.to_string(),
            description: String::new(),
            creator: String::new(),
            tags: Vec::new(),
            builds: None,
            views: None,
            modules: None,
        }
    }

    /// The reference entities of this project carry.
    pub fn handle(&self) -> &ProjectRef {
        &self.handle
    }

    pub fn client(&self) -> &KwClient {
        self.handle.client()
    }

    // ----- issues -----

    /// Search issues.
    pub async fn search(&self, query: &SearchQuery) -> Result<Fetched<Issue>> {
        self.handle.search(query).await
    }

    async fn search_states(&self, states: &[&str]) -> Result<Fetched<Issue>> {
        let query = SearchQuery::new().query(format!("state:{}", states.join(",")));
        let fetched = self.search(&query).await?;
        Ok(fetched.retain(|i| states.contains(&i.state.as_str())))
    }

    /// New and existing issues.
    pub async fn issues(&self) -> Result<Fetched<Issue>> {
        self.search_states(OPEN_STATES).await
    }

    /// New, existing and fixed issues.
    pub async fn all_issues(&self) -> Result<Fetched<Issue>> {
        self.search_states(ALL_STATES).await
    }

    pub async fn new_issues(&self) -> Result<Fetched<Issue>> {
        self.search_states(NEW_STATES).await
    }

    /// Change status, owner, comment or bug tracker id of several issues.
    ///
    /// # Errors
    ///
    /// Returns [`KwError::InvalidArgument`] before sending anything if `ids`
    /// is empty or contains a non-numeric id.
    pub async fn update_issues(
        &self,
        ids: impl Into<IssueIds>,
        update: &IssueUpdate,
    ) -> Result<Sent> {
        self.handle.update_issues(ids, update).await
    }

    pub async fn issue_details(&self, id: u64) -> Result<Fetched<IssueDetails>> {
        self.handle.issue_details(id).await
    }

    // ----- metrics -----

    pub async fn metrics(&self, query: &MetricsQuery) -> Result<Fetched<Metric>> {
        self.handle.fetch(&query.params(&self.name)).await
    }

    /// Per-tag totals (`metrics` with `aggregate=true`).
    pub async fn metrics_total(
        &self,
        view: Option<&str>,
        query: Option<&str>,
    ) -> Result<Fetched<MetricsStatistics>> {
        let params = MetricsQuery {
            view: view.map(str::to_string),
            query: query.map(str::to_string),
            limit: None,
            aggregate: Some(true),
        }
        .params(&self.name);
        self.handle.fetch(&params).await
    }

    // ----- builds -----

    /// Fetch the build list without touching the cache.
    pub async fn fetch_builds(&self) -> Result<Fetched<Build>> {
        self.handle.fetch(&self.handle.params("builds")).await
    }

    /// Builds, fetched once per `Project`.
    ///
    /// # Errors
    ///
    /// Returns [`KwError::Transport`] if the first fetch fails; nothing is
    /// cached then.
    pub async fn builds(&mut self) -> Result<&[Build]> {
        ensure_loaded(&mut self.builds, &self.handle, "builds").await
    }

    /// Look up a build by name in the cached list.
    pub async fn build(&mut self, name: &str) -> Result<Option<&Build>> {
        Ok(self.builds().await?.iter().find(|b| b.name == name))
    }

    // ----- views -----

    pub async fn fetch_views(&self) -> Result<Fetched<View>> {
        self.handle.fetch(&self.handle.params("views")).await
    }

    /// Views, fetched once per `Project`.
    pub async fn views(&mut self) -> Result<&[View]> {
        ensure_loaded(&mut self.views, &self.handle, "views").await
    }

    pub async fn view(&mut self, name: &str) -> Result<Option<&View>> {
        Ok(self.views().await?.iter().find(|v| v.name == name))
    }

    pub async fn create_view(&self, view: &ViewDefinition) -> Sent {
        let params = view.apply(self.handle.params("create_view"));
        self.handle.send(&params).await
    }

    /// Push a view of this project.
    ///
    /// # Errors
    ///
    /// Returns [`KwError::InvalidArgument`] if `view` belongs to another
    /// project or is the default view.
    pub async fn update_view(&self, view: &View) -> Result<Sent> {
        self.ensure_own(view.project(), "view", &view.name)?;
        view.update().await
    }

    pub async fn delete_view(&self, name: &str) -> Result<Sent> {
        if name == super::view::DEFAULT_VIEW {
            return Err(KwError::InvalidArgument(format!("cannot delete the {name} view")));
        }
        let params = self.handle.params("delete_view").set("name", name);
        Ok(self.handle.send(&params).await)
    }

    // ----- modules -----

    pub async fn fetch_modules(&self) -> Result<Fetched<Module>> {
        self.handle.fetch(&self.handle.params("modules")).await
    }

    /// Modules, fetched once per `Project`.
    pub async fn modules(&mut self) -> Result<&[Module]> {
        ensure_loaded(&mut self.modules, &self.handle, "modules").await
    }

    pub async fn module(&mut self, name: &str) -> Result<Option<&Module>> {
        Ok(self.modules().await?.iter().find(|m| m.name == name))
    }

    /// A local module for this project; push it with [`Project::create_module`].
    pub fn new_module<I, S>(&self, name: &str, paths: I) -> Module
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Module::new(self.handle.clone(), name, paths)
    }

    pub async fn create_module(&self, module: &Module) -> Result<Sent> {
        self.ensure_own(module.project(), "module", &module.name)?;
        Ok(module.create().await)
    }

    pub async fn update_module(&self, module: &Module) -> Result<Sent> {
        self.ensure_own(module.project(), "module", &module.name)?;
        Ok(module.update().await)
    }

    pub async fn delete_module(&self, name: &str) -> Sent {
        let params = self.handle.params("delete_module").set("name", name);
        self.handle.send(&params).await
    }

    fn ensure_own(&self, owner: &ProjectRef, kind: &str, name: &str) -> Result<()> {
        if owner != &self.handle {
            return Err(KwError::InvalidArgument(format!(
                "{kind} '{name}' belongs to project '{}', not '{}'",
                owner.name(),
                self.name
            )));
        }
        Ok(())
    }

    // ----- project -----

    /// Change project settings; only the fields set in `update` are sent.
    pub async fn update(&self, update: &ProjectUpdate) -> Sent {
        let params = update.apply(self.handle.params("update_project"));
        self.handle.send(&params).await
    }

    pub async fn delete(&self) -> Sent {
        self.handle.send(&self.handle.params("delete_project")).await
    }

    // ----- pass-through reports -----

    pub async fn configuration(&self, build: Option<&str>) -> Result<Fetched<JsonObject>> {
        self.handle.configuration(build).await
    }

    pub async fn taxonomies(&self) -> Result<Fetched<JsonObject>> {
        self.handle.fetch_objects(&self.handle.params("taxonomies")).await
    }

    pub async fn defect_types(&self) -> Result<Fetched<JsonObject>> {
        self.handle.fetch_objects(&self.handle.params("defect_types")).await
    }

    /// File churn report (`fchurns`).
    pub async fn churns_report(
        &self,
        view: Option<&str>,
        component: Option<&str>,
    ) -> Result<Fetched<JsonObject>> {
        let params = self
            .handle
            .params("fchurns")
            .set_opt("view", view)
            .set_opt("component", component);
        self.handle.fetch_objects(&params).await
    }

    pub async fn report(&self, query: &ReportQuery) -> Result<Fetched<JsonObject>> {
        let params = query.apply(self.handle.params("report"));
        self.handle.fetch_objects(&params).await
    }
}

impl Named for Project {
    fn name(&self) -> &str {
        &self.name
    }
}

impl fmt::Display for Project {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

impl PartialEq for Project {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}

impl Eq for Project {}

impl Hash for Project {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.name.hash(state);
    }
}

impl PartialOrd for Project {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Project {
    fn cmp(&self, other: &Self) -> Ordering {
        self.name.cmp(&other.name)
    }
}
