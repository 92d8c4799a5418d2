//! Klocwork API client.
//!
//! Low-level HTTP client that handles authentication and raw requests.
//! Every call is a form-encoded `POST` to `/review/api`; higher-level
//! operations live on [`Project`](crate::Project) and [`Server`](crate::Server).

use std::fmt;
use std::sync::Arc;

use reqwest::{Client, StatusCode};
use serde::ser::{Serialize, SerializeMap, Serializer};
use url::Url;

use crate::credentials::Credentials;
use crate::error::{KwError, Result, TransportError};
use crate::hydrate::{hydrate_lines, Hydrate};

const API_PATH: &str = "review/api";
const USER_AGENT: &str = concat!("kwapi/", env!("CARGO_PKG_VERSION"));

/// Form parameters for one action.
///
/// Keys keep insertion order. Use [`Params::set_opt`] for optional
/// arguments: `None` leaves the key out of the request entirely.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Params {
    pairs: Vec<(&'static str, String)>,
}

impl Params {
    /// Start a parameter set for `action`.
    pub fn action(action: &str) -> Self {
        Self {
            pairs: vec![("action", action.to_string())],
        }
    }

    /// Set `key`, replacing any previous value.
    #[must_use]
    pub fn set(mut self, key: &'static str, value: impl Into<String>) -> Self {
        let value = value.into();
        match self.pairs.iter_mut().find(|(k, _)| *k == key) {
            Some(pair) => pair.1 = value,
            None => self.pairs.push((key, value)),
        }
        self
    }

    /// Set `key` only when `value` is present.
    #[must_use]
    pub fn set_opt<V: Into<String>>(self, key: &'static str, value: Option<V>) -> Self {
        match value {
            Some(v) => self.set(key, v),
            None => self,
        }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.pairs
            .iter()
            .find(|(k, _)| *k == key)
            .map(|(_, v)| v.as_str())
    }

    /// The action name.
    pub fn action_name(&self) -> &str {
        self.get("action").unwrap_or_default()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&'static str, &str)> {
        self.pairs.iter().map(|(k, v)| (*k, v.as_str()))
    }
}

impl Serialize for Params {
    fn serialize<S: Serializer>(&self, serializer: S) -> core::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.pairs.len()))?;
        for (key, value) in &self.pairs {
            map.serialize_entry(key, value)?;
        }
        map.end()
    }
}

/// Outcome of a read action.
///
/// `success` is true only for an HTTP 200 whose body decoded completely.
#[must_use]
#[derive(Debug)]
pub struct Fetched<T> {
    pub success: bool,
    pub items: Vec<T>,
    pub error: Option<TransportError>,
}

impl<T> Fetched<T> {
    fn ok(items: Vec<T>) -> Self {
        Self {
            success: true,
            items,
            error: None,
        }
    }

    fn failed(error: TransportError) -> Self {
        Self {
            success: false,
            items: Vec::new(),
            error: Some(error),
        }
    }

    /// Convert into a `Result`, turning a captured failure into [`KwError::Transport`].
    pub fn into_result(self) -> Result<Vec<T>> {
        match self.error {
            Some(e) => Err(KwError::Transport(e)),
            None => Ok(self.items),
        }
    }

    /// Keep only the items matching `predicate`.
    pub fn retain<F: FnMut(&T) -> bool>(mut self, predicate: F) -> Self {
        self.items.retain(predicate);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.items.iter()
    }
}

impl<T> IntoIterator for Fetched<T> {
    type Item = T;
    type IntoIter = std::vec::IntoIter<T>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.into_iter()
    }
}

/// Outcome of a write action, judged by status code alone.
#[must_use]
#[derive(Debug)]
pub struct Sent {
    pub success: bool,
    pub error: Option<TransportError>,
}

impl Sent {
    pub fn into_result(self) -> Result<()> {
        match self.error {
            Some(e) => Err(KwError::Transport(e)),
            None => Ok(()),
        }
    }
}

/// Low-level Klocwork API client.
///
/// Holds the endpoint and the resolved identity. This struct is cheaply
/// cloneable; clones share the same connection pool.
///
/// # Example
///
/// ```no_run
/// use kwapi::{KwClient, Params};
///
/// # async fn example() -> kwapi::Result<()> {
/// let client = KwClient::new("http://kw.example.com:8080", "alice", "secret")?;
/// let sent = client.send(&Params::action("delete_project").set("project", "demo")).await;
/// assert!(sent.success);
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct KwClient {
    http: Client,
    endpoint: Arc<Url>,
    user: Arc<str>,
    token: Arc<str>,
}

impl fmt::Debug for KwClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KwClient")
            .field("endpoint", &self.endpoint.as_str())
            .field("user", &&*self.user)
            .finish_non_exhaustive()
    }
}

impl KwClient {
    /// Create a client for the server at `base_url` (e.g. `http://host:8080`).
    ///
    /// # Errors
    ///
    /// Returns an error if the base URL is invalid or the HTTP client cannot be built.
    pub fn new(base_url: &str, user: &str, token: &str) -> Result<Self> {
        let base_url_str = if base_url.ends_with('/') {
            base_url.to_string()
        } else {
            format!("{base_url}/")
        };
        let endpoint = Url::parse(&base_url_str)?.join(API_PATH)?;

        let http = Client::builder()
            .user_agent(USER_AGENT)
            .brotli(true)
            .gzip(true)
            .deflate(true)
            .build()
            .map_err(KwError::Http)?;

        Ok(Self {
            http,
            endpoint: Arc::new(endpoint),
            user: Arc::from(user),
            token: Arc::from(token),
        })
    }

    /// Create a client from resolved credentials.
    pub fn from_credentials(credentials: &Credentials) -> Result<Self> {
        let base_url = format!("http://{}:{}", credentials.host, credentials.port);
        Self::new(&base_url, &credentials.user, &credentials.token)
    }

    /// The full API endpoint URL.
    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    pub fn user(&self) -> &str {
        &self.user
    }

    /// Run a read action and hydrate each response line as `T`.
    ///
    /// Transport failures come back inside [`Fetched`]; only undecodable
    /// response bodies are returned as `Err`.
    ///
    /// # Errors
    ///
    /// Returns [`KwError::MalformedResponse`] if a line is not a JSON object
    /// or does not decode as `T`.
    #[tracing::instrument(skip(self, params, owner), fields(action = params.action_name(), kind = T::KIND))]
    pub async fn fetch<T: Hydrate>(&self, params: &Params, owner: &T::Owner) -> Result<Fetched<T>> {
        let body = match self.post(params).await {
            Ok(body) => body,
            Err(e) => return Ok(Fetched::failed(e)),
        };
        let items = hydrate_lines(&body, owner)?;
        tracing::debug!(items = items.len(), "decoded response");
        Ok(Fetched::ok(items))
    }

    /// Run a write action; only the status code matters.
    #[tracing::instrument(skip(self, params), fields(action = params.action_name()))]
    pub async fn send(&self, params: &Params) -> Sent {
        match self.post(params).await {
            Ok(_) => Sent {
                success: true,
                error: None,
            },
            Err(e) => Sent {
                success: false,
                error: Some(e),
            },
        }
    }

    /// POST the form and return the body of a 200 response.
    async fn post(&self, params: &Params) -> core::result::Result<String, TransportError> {
        tracing::debug!(params = ?params, "sending request");

        let response = self
            .http
            .post(self.endpoint.as_str())
            .form(&Form {
                user: &self.user,
                ltoken: &self.token,
                params,
            })
            .send()
            .await
            .map_err(|e| {
                tracing::warn!(error = %e, "request failed");
                TransportError::Request(e)
            })?;

        let status = response.status();
        tracing::debug!(status = status.as_u16(), "received response");

        if status != StatusCode::OK {
            let body = response.text().await.unwrap_or_default();
            tracing::warn!(status = status.as_u16(), "Klocwork API error");
            return Err(TransportError::Status {
                status: status.as_u16(),
                body: Self::extract_error_message(body),
            });
        }

        response.text().await.map_err(TransportError::Request)
    }

    /// Pull the message out of a JSON error body, or keep the raw text.
    fn extract_error_message(body: String) -> String {
        if let Ok(json) = serde_json::from_str::<serde_json::Value>(&body) {
            if let Some(msg) = json.get("message").and_then(|m| m.as_str()) {
                return msg.to_string();
            }
            if let Some(err) = json.get("error").and_then(|m| m.as_str()) {
                return err.to_string();
            }
        }
        body
    }
}

/// Request body: identity first, then the action parameters.
struct Form<'a> {
    user: &'a str,
    ltoken: &'a str,
    params: &'a Params,
}

impl Serialize for Form<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> core::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.params.pairs.len() + 2))?;
        map.serialize_entry("user", self.user)?;
        map.serialize_entry("ltoken", self.ltoken)?;
        for (key, value) in self.params.iter() {
            map.serialize_entry(key, value)?;
        }
        map.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_debug() {
        let client = KwClient::new("http://kw.example.com:8080", "alice", "test-token").unwrap();
        let debug = format!("{:?}", client);
        assert!(debug.contains("KwClient"));
        assert!(debug.contains("endpoint"));
        // Token should not be in debug output
        assert!(!debug.contains("test-token"));
    }

    #[test]
    fn test_endpoint_trailing_slash() {
        let client1 = KwClient::new("http://kw:8080", "u", "t").unwrap();
        let client2 = KwClient::new("http://kw:8080/", "u", "t").unwrap();
        assert_eq!(client1.endpoint().as_str(), "http://kw:8080/review/api");
        assert_eq!(client1.endpoint().as_str(), client2.endpoint().as_str());
    }

    #[test]
    fn test_from_credentials() {
        let creds = Credentials {
            host: "10.0.0.5".into(),
            port: "8080".into(),
            user: "alice".into(),
            token: "tok".into(),
        };
        let client = KwClient::from_credentials(&creds).unwrap();
        assert_eq!(client.endpoint().as_str(), "http://10.0.0.5:8080/review/api");
        assert_eq!(client.user(), "alice");
    }

    #[test]
    fn test_params_set_replaces_and_set_opt_omits() {
        let params = Params::action("search")
            .set("project", "demo")
            .set("project", "other")
            .set_opt("view", None::<String>)
            .set_opt("query", Some("state:New"));

        assert_eq!(params.action_name(), "search");
        assert_eq!(params.get("project"), Some("other"));
        assert!(!params.contains("view"));
        assert_eq!(params.iter().count(), 3);
    }

    #[test]
    fn test_params_form_encoding() {
        let params = Params::action("search")
            .set("project", "demo")
            .set("query", "state:New,Existing");
        let encoded = serde_qs::to_string(&params).unwrap();
        assert_eq!(encoded, "action=search&project=demo&query=state%3ANew%2CExisting");
    }

    #[test]
    fn test_form_puts_identity_first() {
        let params = Params::action("builds").set("project", "demo");
        let form = Form {
            user: "alice",
            ltoken: "tok",
            params: &params,
        };
        let encoded = serde_qs::to_string(&form).unwrap();
        assert!(encoded.starts_with("user=alice&ltoken=tok&action=builds"));
    }

    #[test]
    fn test_extract_error_message() {
        assert_eq!(
            KwClient::extract_error_message(r#"{"message":"Project not found"}"#.into()),
            "Project not found"
        );
        assert_eq!(KwClient::extract_error_message("plain".into()), "plain");
    }
}
