//! Server entry point.
//!
//! [`Server`] resolves credentials when it is built, then lists projects and
//! users, caching both for its lifetime.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::client::{Fetched, KwClient, Params};
use crate::config::ServerConfig;
use crate::credentials::{CredentialQuery, CredentialStore, Credentials, DnsResolver, HostResolver};
use crate::error::{KwError, Result};
use crate::hydrate::{Hydrate, JsonObject};
use crate::models::{Project, User};

/// Server version as reported by the `version` action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerVersion {
    #[serde(rename = "majorVersion")]
    pub major: String,
    #[serde(rename = "minorVersion")]
    pub minor: String,
}

impl Hydrate for ServerVersion {
    type Owner = ();
    const KIND: &'static str = "version";

    fn hydrate(_owner: &(), object: JsonObject) -> serde_json::Result<Self> {
        serde_json::from_value(Value::Object(object))
    }
}

impl fmt::Display for ServerVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)
    }
}

/// A logged-in connection to one Klocwork server.
///
/// # Example
///
/// ```no_run
/// use kwapi::{Server, ServerConfig};
///
/// # async fn example() -> kwapi::Result<()> {
/// let mut server = Server::new(ServerConfig::new().host("kw.example.com").port(8080))?;
/// let version = server.version().await?.clone();
/// println!("{server}, version {version}");
///
/// if let Some(project) = server.project("demo").await? {
///     let issues = project.new_issues().await?.into_result()?;
///     println!("{} new issues", issues.len());
/// }
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct Server {
    client: KwClient,
    host: String,
    port: String,
    projects: Option<Vec<Project>>,
    users: Option<Vec<User>>,
    version: Option<ServerVersion>,
}

impl Server {
    /// Resolve credentials from the token store and build a client.
    ///
    /// # Errors
    ///
    /// Returns [`KwError::CredentialNotFound`] if no stored token matches,
    /// or [`KwError::Io`] if the store cannot be read.
    pub fn new(config: ServerConfig) -> Result<Self> {
        Self::with_resolver(config, &DnsResolver)
    }

    /// Like [`Server::new`] with a custom host resolver.
    pub fn with_resolver(config: ServerConfig, resolver: &dyn HostResolver) -> Result<Self> {
        let store = CredentialStore::load(&config.resolved_ltoken_path()?)?;
        let query = CredentialQuery {
            host: config.host,
            port: config.port,
            user: config.user,
        };
        let credentials = store.resolve(&query, resolver)?;
        Self::from_credentials(&credentials)
    }

    /// Build a server from already resolved credentials.
    pub fn from_credentials(credentials: &Credentials) -> Result<Self> {
        Ok(Self {
            client: KwClient::from_credentials(credentials)?,
            host: credentials.host.clone(),
            port: credentials.port.clone(),
            projects: None,
            users: None,
            version: None,
        })
    }

    pub fn client(&self) -> &KwClient {
        &self.client
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> &str {
        &self.port
    }

    pub fn user(&self) -> &str {
        self.client.user()
    }

    /// Server version, queried once.
    ///
    /// # Errors
    ///
    /// Returns [`KwError::Transport`] if the request fails and
    /// [`KwError::MalformedResponse`] if the body carries no version.
    pub async fn version(&mut self) -> Result<&ServerVersion> {
        let version = match self.version.take() {
            Some(version) => version,
            None => {
                let fetched = self
                    .client
                    .fetch::<ServerVersion>(&Params::action("version"), &())
                    .await?;
                fetched.into_result()?.into_iter().next().ok_or_else(|| {
                    KwError::MalformedResponse {
                        kind: ServerVersion::KIND,
                        line: 0,
                        message: "empty response".into(),
                    }
                })?
            }
        };
        Ok(self.version.insert(version))
    }

    /// Fetch the project list without touching the cache.
    pub async fn fetch_projects(&self) -> Result<Fetched<Project>> {
        self.client
            .fetch(&Params::action("projects"), &self.client)
            .await
    }

    /// All projects, fetched once.
    ///
    /// # Errors
    ///
    /// Returns [`KwError::Transport`] if the first fetch fails; nothing is
    /// cached then.
    pub async fn projects(&mut self) -> Result<&mut [Project]> {
        if self.projects.is_none() {
            let projects = self.fetch_projects().await?.into_result()?;
            tracing::debug!(projects = projects.len(), "cached project list");
            self.projects = Some(projects);
        }
        Ok(self.projects.as_deref_mut().unwrap_or_default())
    }

    /// Look up a project by name in the cached list.
    pub async fn project(&mut self, name: &str) -> Result<Option<&mut Project>> {
        Ok(self.projects().await?.iter_mut().find(|p| p.name == name))
    }

    pub async fn fetch_users(&self) -> Result<Fetched<User>> {
        self.client
            .fetch(&Params::action("users"), &self.client)
            .await
    }

    /// All users, fetched once.
    pub async fn users(&mut self) -> Result<&[User]> {
        if self.users.is_none() {
            let users = self.fetch_users().await?.into_result()?;
            self.users = Some(users);
        }
        Ok(self.users.as_deref().unwrap_or_default())
    }

    pub async fn user_named(&mut self, name: &str) -> Result<Option<&User>> {
        Ok(self.users().await?.iter().find(|u| u.name == name))
    }
}

impl fmt::Display for Server {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Login as {} at Klocwork server http://{}:{}",
            self.user(),
            self.host,
            self.port
        )
    }
}
