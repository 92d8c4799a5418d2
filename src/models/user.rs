//! User model.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::project::Project;
use crate::client::{Fetched, KwClient, Params};
use crate::error::Result;
use crate::hydrate::{Hydrate, JsonObject};

/// Role name that grants administration of one project.
pub const PROJECT_ADMIN_ROLE: &str = "Project admin";

/// A Klocwork user account.
#[derive(Debug, Clone, Serialize)]
pub struct User {
    #[serde(skip)]
    server: KwClient,
    pub name: String,
    pub readonly: bool,
    pub roles: Vec<UserRole>,
    pub groups: Vec<String>,
}

/// A role assignment, global or scoped to one project.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserRole {
    pub name: String,
    #[serde(default)]
    pub project_id: Option<String>,
    #[serde(default)]
    pub all_projects: bool,
}

#[derive(Deserialize)]
struct UserWire {
    name: String,
    readonly: bool,
    #[serde(default)]
    roles: Vec<UserRole>,
    #[serde(default)]
    groups: Vec<GroupWire>,
}

// Groups arrive either as names or as `{"name": ...}` objects.
#[derive(Deserialize)]
#[serde(untagged)]
enum GroupWire {
    Name(String),
    Object { name: String },
}

impl Hydrate for User {
    type Owner = KwClient;
    const KIND: &'static str = "user";

    fn hydrate(owner: &KwClient, object: JsonObject) -> serde_json::Result<Self> {
        let wire: UserWire = serde_json::from_value(Value::Object(object))?;
        Ok(Self {
            server: owner.clone(),
            name: wire.name,
            readonly: wire.readonly,
            roles: wire.roles,
            groups: wire
                .groups
                .into_iter()
                .map(|g| match g {
                    GroupWire::Name(name) | GroupWire::Object { name } => name,
                })
                .collect(),
        })
    }
}

impl User {
    /// Client of the server this user was listed by.
    pub fn server(&self) -> &KwClient {
        &self.server
    }

    /// Ids of the projects this user holds the `Project admin` role in.
    pub fn projects_as_admin(&self) -> Vec<&str> {
        self.roles
            .iter()
            .filter(|r| r.name == PROJECT_ADMIN_ROLE)
            .filter_map(|r| r.project_id.as_deref())
            .collect()
    }

    /// Fetch the projects this user administers.
    pub async fn administered_projects(&self) -> Result<Fetched<Project>> {
        let admin_of = self.projects_as_admin();
        let fetched = self
            .server
            .fetch::<Project>(&Params::action("projects"), &self.server)
            .await?;
        Ok(fetched.retain(|p| admin_of.contains(&p.id.as_str())))
    }
}

impl fmt::Display for User {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hydrate::hydrate_lines;

    #[test]
    fn test_user_hydrate_and_admin_projects() {
        let client = KwClient::new("http://kw.example.com:8080", "alice", "tok").unwrap();
        let line = r#"{"name":"bob","readonly":false,"roles":[{"name":"Project admin","projectId":"demo","allProjects":false},{"name":"Developer","projectId":"other"},{"name":"Project admin","projectId":"tools"},{"name":"Project administrator","projectId":"x"}],"groups":["devs",{"name":"qa"}]}"#;
        let users: Vec<User> = hydrate_lines(line, &client).unwrap();
        let bob = &users[0];

        assert_eq!(bob.to_string(), "bob");
        assert!(!bob.readonly);
        assert_eq!(bob.groups, vec!["devs", "qa"]);
        assert_eq!(bob.projects_as_admin(), vec!["demo", "tools"]);
    }

    #[test]
    fn test_user_requires_readonly() {
        let client = KwClient::new("http://kw.example.com:8080", "alice", "tok").unwrap();
        let err = hydrate_lines::<User>(r#"{"name":"bob"}"#, &client).unwrap_err();
        assert!(err.to_string().contains("readonly"), "{err}");
    }
}
