//! Issue model.
//!
//! Issues are defects reported by the analysis. They are read-only
//! snapshots: changing owner, status or comment sends `update_status` to the
//! server and does not touch the local object.

use std::cmp::Ordering;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use serde_with::{serde_as, DisplayFromStr, PickFirst};

use super::project::ProjectRef;
use crate::client::{Params, Sent};
use crate::error::{KwError, Result};
use crate::hydrate::{Hydrate, JsonObject};

/// A Klocwork issue.
///
/// # Example
///
/// ```ignore
/// let mut new_issues = project.new_issues().await?.into_result()?;
/// for issue in &mut new_issues {
///     if let Some(details) = issue.details().await? {
///         println!("{} at {:?}", issue, details.location);
///     }
/// }
/// ```
#[derive(Debug, Clone, Serialize)]
pub struct Issue {
    #[serde(skip)]
    project: ProjectRef,
    pub id: u64,
    pub message: String,
    pub file: String,
    pub method: String,
    pub code: String,
    pub severity: String,
    pub severity_code: u32,
    pub title: String,
    pub state: String,
    pub status: String,
    pub taxonomy_name: String,
    pub url: String,
    pub owner: String,
    /// Raw creation time, epoch milliseconds.
    pub date_originated: i64,
    /// Creation time as local `ctime` text.
    pub created: String,
    /// `Some(None)` once the server answered with no details.
    #[serde(skip)]
    details: Option<Option<IssueDetails>>,
}

#[serde_as]
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct IssueWire {
    #[serde_as(as = "PickFirst<(_, DisplayFromStr)>")]
    id: u64,
    code: String,
    severity: String,
    state: String,
    status: String,
    date_originated: i64,
    #[serde(default)]
    message: String,
    #[serde(default)]
    file: String,
    #[serde(default)]
    method: String,
    #[serde(default)]
    severity_code: u32,
    #[serde(default)]
    title: String,
    #[serde(default)]
    taxonomy_name: String,
    #[serde(default)]
    url: String,
    #[serde(default)]
    owner: String,
}

impl Hydrate for Issue {
    type Owner = ProjectRef;
    const KIND: &'static str = "issue";

    fn hydrate(owner: &ProjectRef, object: JsonObject) -> serde_json::Result<Self> {
        let wire: IssueWire = serde_json::from_value(Value::Object(object))?;
        Ok(Self {
            project: owner.clone(),
            id: wire.id,
            message: wire.message,
            file: wire.file,
            method: wire.method,
            code: wire.code,
            severity: wire.severity,
            severity_code: wire.severity_code,
            title: wire.title,
            state: wire.state,
            status: wire.status,
            taxonomy_name: wire.taxonomy_name,
            url: wire.url,
            owner: wire.owner,
            created: super::created_from_millis("dateOriginated", wire.date_originated)?,
            date_originated: wire.date_originated,
            details: None,
        })
    }
}

impl Issue {
    /// The project this issue belongs to.
    pub fn project(&self) -> &ProjectRef {
        &self.project
    }

    pub fn created_utc(&self) -> Option<DateTime<Utc>> {
        DateTime::<Utc>::from_timestamp_millis(self.date_originated)
    }

    pub fn is_new(&self) -> bool {
        self.state == "New"
    }

    /// Location and history, fetched on first call and cached afterwards.
    /// An empty answer is cached too.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the response is malformed.
    pub async fn details(&mut self) -> Result<Option<&IssueDetails>> {
        if self.details.is_none() {
            let fetched = self.project.issue_details(self.id).await?;
            self.details = Some(fetched.into_result()?.into_iter().next());
        }
        Ok(self.details.as_ref().and_then(Option::as_ref))
    }

    /// Details if they were already loaded.
    pub fn cached_details(&self) -> Option<&IssueDetails> {
        self.details.as_ref().and_then(Option::as_ref)
    }

    /// Send an `update_status` for this issue only.
    pub async fn update(&self, update: &IssueUpdate) -> Result<Sent> {
        self.project.update_issues(self.id, update).await
    }
}

impl fmt::Display for Issue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "id: {}|severity: {}|state: {}",
            self.id, self.severity, self.state
        )
    }
}

impl PartialEq for Issue {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Issue {}

impl PartialOrd for Issue {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Issue {
    fn cmp(&self, other: &Self) -> Ordering {
        self.id.cmp(&other.id)
    }
}

/// Location and change history of one issue (`issue_details`).
#[derive(Debug, Clone, Serialize)]
pub struct IssueDetails {
    #[serde(skip)]
    project: ProjectRef,
    pub id: u64,
    pub code: String,
    pub name: Option<String>,
    pub location: Option<String>,
    pub build: Option<String>,
    pub severity: Option<String>,
    pub owner: Option<String>,
    pub state: Option<String>,
    pub status: Option<String>,
    pub history: Vec<IssueHistoryEntry>,
}

/// One status change in an issue's history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IssueHistoryEntry {
    /// Epoch milliseconds.
    #[serde(default)]
    pub date: Option<i64>,
    #[serde(default)]
    pub userid: Option<String>,
    #[serde(default)]
    pub comment: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
}

#[serde_as]
#[derive(Deserialize)]
struct IssueDetailsWire {
    #[serde_as(as = "PickFirst<(_, DisplayFromStr)>")]
    id: u64,
    code: String,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    location: Option<String>,
    #[serde(default)]
    build: Option<String>,
    #[serde(default)]
    severity: Option<String>,
    #[serde(default)]
    owner: Option<String>,
    #[serde(default)]
    state: Option<String>,
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    history: Vec<IssueHistoryEntry>,
}

impl Hydrate for IssueDetails {
    type Owner = ProjectRef;
    const KIND: &'static str = "issue details";

    fn hydrate(owner: &ProjectRef, object: JsonObject) -> serde_json::Result<Self> {
        let wire: IssueDetailsWire = serde_json::from_value(Value::Object(object))?;
        Ok(Self {
            project: owner.clone(),
            id: wire.id,
            code: wire.code,
            name: wire.name,
            location: wire.location,
            build: wire.build,
            severity: wire.severity,
            owner: wire.owner,
            state: wire.state,
            status: wire.status,
            history: wire.history,
        })
    }
}

impl IssueDetails {
    pub fn project(&self) -> &ProjectRef {
        &self.project
    }
}

/// Fields to change with `update_status`. Unset fields are not sent.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IssueUpdate {
    pub status: Option<String>,
    pub comment: Option<String>,
    pub owner: Option<String>,
    pub bug_tracker_id: Option<String>,
}

impl IssueUpdate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn status(mut self, status: impl Into<String>) -> Self {
        self.status = Some(status.into());
        self
    }

    pub fn comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = Some(comment.into());
        self
    }

    pub fn owner(mut self, owner: impl Into<String>) -> Self {
        self.owner = Some(owner.into());
        self
    }

    pub fn bug_tracker_id(mut self, id: impl Into<String>) -> Self {
        self.bug_tracker_id = Some(id.into());
        self
    }

    pub(crate) fn apply(&self, params: Params) -> Params {
        params
            .set_opt("status", self.status.clone())
            .set_opt("comment", self.comment.clone())
            .set_opt("owner", self.owner.clone())
            .set_opt("bug_tracker_id", self.bug_tracker_id.clone())
    }
}

/// The issues an `update_status` applies to.
///
/// Built from a single id, a list of ids, or a string of ids separated by
/// commas, semicolons or whitespace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IssueIds {
    List(Vec<u64>),
    Delimited(String),
}

impl IssueIds {
    /// The comma-joined wire value.
    ///
    /// # Errors
    ///
    /// Returns [`KwError::InvalidArgument`] for an empty selection or a
    /// token that is not a numeric id.
    pub fn normalize(&self) -> Result<String> {
        let ids: Vec<u64> = match self {
            Self::List(ids) => ids.clone(),
            Self::Delimited(raw) => raw
                .split(|c: char| c == ',' || c == ';' || c.is_whitespace())
                .filter(|token| !token.is_empty())
                .map(|token| {
                    token.parse::<u64>().map_err(|_| {
                        KwError::InvalidArgument(format!("issue id '{token}' is not numeric"))
                    })
                })
                .collect::<Result<_>>()?,
        };

        if ids.is_empty() {
            return Err(KwError::InvalidArgument("no issue ids given".into()));
        }
        Ok(ids
            .iter()
            .map(u64::to_string)
            .collect::<Vec<_>>()
            .join(","))
    }
}

impl From<u64> for IssueIds {
    fn from(id: u64) -> Self {
        Self::List(vec![id])
    }
}

impl From<Vec<u64>> for IssueIds {
    fn from(ids: Vec<u64>) -> Self {
        Self::List(ids)
    }
}

impl From<&[u64]> for IssueIds {
    fn from(ids: &[u64]) -> Self {
        Self::List(ids.to_vec())
    }
}

impl<const N: usize> From<[u64; N]> for IssueIds {
    fn from(ids: [u64; N]) -> Self {
        Self::List(ids.to_vec())
    }
}

impl From<&str> for IssueIds {
    fn from(ids: &str) -> Self {
        Self::Delimited(ids.to_string())
    }
}

impl From<String> for IssueIds {
    fn from(ids: String) -> Self {
        Self::Delimited(ids)
    }
}

impl From<&[Issue]> for IssueIds {
    fn from(issues: &[Issue]) -> Self {
        Self::List(issues.iter().map(|i| i.id).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::KwClient;
    use crate::hydrate::hydrate_lines;
    use crate::models::format_epoch_millis;

    fn project_ref() -> ProjectRef {
        let client = KwClient::new("http://kw.example.com:8080", "alice", "tok").unwrap();
        ProjectRef::new(client, "demo")
    }

    const ISSUE_LINE: &str = r#"{"severityCode": 4, "id": 42, "file": "src/json_valueiterator.inl", "state": "New", "issueIds": [55732], "url": "http://kw:8080/review/insight-review.html#issuedetails_goto:problemid=42", "code": "MISRA.UMINUS.UNSIGNED", "status": "Analyze", "severity": "Review", "owner": "unowned", "taxonomyName": "MISRA C++ 2008", "title": "Operand of unary minus is unsigned", "dateOriginated": 1561389612207, "method": "index", "message": "Operand of unary minus is unsigned", "reference": "5-3-2 (C++ 2008 req.)"}"#;

    #[test]
    fn test_issue_hydrate() {
        let issues: Vec<Issue> = hydrate_lines(ISSUE_LINE, &project_ref()).unwrap();
        let issue = &issues[0];

        assert_eq!(issue.id, 42);
        assert_eq!(issue.code, "MISRA.UMINUS.UNSIGNED");
        assert_eq!(issue.severity_code, 4);
        assert_eq!(issue.taxonomy_name, "MISRA C++ 2008");
        assert_eq!(issue.date_originated, 1_561_389_612_207);
        assert_eq!(Some(issue.created.clone()), format_epoch_millis(1_561_389_612_207));
        assert_eq!(issue.created_utc().unwrap().timestamp(), 1_561_389_612);
        assert_eq!(issue.project().name(), "demo");
        assert!(issue.is_new());
        assert!(issue.cached_details().is_none());
    }

    #[test]
    fn test_issue_id_accepts_numeric_string() {
        let line = r#"{"id": "56640", "code": "X", "severity": "Critical", "state": "Existing", "status": "Fix", "dateOriginated": 0}"#;
        let issues: Vec<Issue> = hydrate_lines(line, &project_ref()).unwrap();
        assert_eq!(issues[0].id, 56640);
        assert_eq!(issues[0].owner, "");
    }

    #[test]
    fn test_issue_missing_field_is_malformed() {
        let line = r#"{"id": 1, "code": "X", "severity": "Critical", "state": "New", "status": "Analyze"}"#;
        let err = hydrate_lines::<Issue>(line, &project_ref()).unwrap_err();
        match err {
            KwError::MalformedResponse { kind, message, .. } => {
                assert_eq!(kind, "issue");
                assert!(message.contains("dateOriginated"), "{message}");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_issue_display_and_ordering() {
        let mut issues: Vec<Issue> = hydrate_lines(
            &[
                ISSUE_LINE.replace("\"id\": 42", "\"id\": 50"),
                ISSUE_LINE.to_string(),
            ]
            .join("\n"),
            &project_ref(),
        )
        .unwrap();
        issues.sort();
        assert_eq!(issues[0].id, 42);
        assert_eq!(issues[0].to_string(), "id: 42|severity: Review|state: New");
    }

    #[test]
    fn test_issue_details_hydrate() {
        let line = r#"{"id":"42","code":"NPD.FUNC.MUST","name":"Null pointer","location":"src/a.c:10","build":"build_3","severity":"Critical (1)","owner":"bob","state":"Existing","status":"Fix","history":[{"date":1561389612207,"userid":"bob","comment":"mine","status":"Fix"}]}"#;
        let details: Vec<IssueDetails> = hydrate_lines(line, &project_ref()).unwrap();
        assert_eq!(details[0].id, 42);
        assert_eq!(details[0].location.as_deref(), Some("src/a.c:10"));
        assert_eq!(details[0].history.len(), 1);
        assert_eq!(details[0].history[0].userid.as_deref(), Some("bob"));
    }

    #[test]
    fn test_issue_ids_normalize_shapes() {
        assert_eq!(IssueIds::from([1u64, 2, 3]).normalize().unwrap(), "1,2,3");
        assert_eq!(IssueIds::from(vec![1u64, 2, 3]).normalize().unwrap(), "1,2,3");
        assert_eq!(IssueIds::from(&[1u64, 2, 3][..]).normalize().unwrap(), "1,2,3");
        assert_eq!(IssueIds::from("1,2,3").normalize().unwrap(), "1,2,3");
        assert_eq!(IssueIds::from("1; 2  3").normalize().unwrap(), "1,2,3");
        assert_eq!(IssueIds::from(7u64).normalize().unwrap(), "7");
    }

    #[test]
    fn test_issue_ids_rejects_invalid() {
        assert!(matches!(
            IssueIds::from("1,abc").normalize(),
            Err(KwError::InvalidArgument(_))
        ));
        assert!(matches!(
            IssueIds::from(" , ").normalize(),
            Err(KwError::InvalidArgument(_))
        ));
        assert!(matches!(
            IssueIds::from(Vec::<u64>::new()).normalize(),
            Err(KwError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_issue_update_sends_only_given_fields() {
        let params = IssueUpdate::new()
            .status("Fix")
            .comment("on it")
            .apply(Params::action("update_status"));
        assert_eq!(params.get("status"), Some("Fix"));
        assert_eq!(params.get("comment"), Some("on it"));
        assert!(!params.contains("owner"));
        assert!(!params.contains("bug_tracker_id"));
    }
}
