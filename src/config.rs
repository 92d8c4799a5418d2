//! Connection configuration.
//!
//! Everything left unset here is filled in from the token store when the
//! [`Server`](crate::Server) is constructed.

use std::env;
use std::path::PathBuf;

use directories::BaseDirs;

use crate::error::{KwError, Result};

/// Environment variable naming the Klocwork host.
pub const ENV_HOST: &str = "KLOCWORK_HOST";
/// Environment variable naming the Klocwork port.
pub const ENV_PORT: &str = "KLOCWORK_PORT";
/// Environment variable naming the Klocwork user.
pub const ENV_USER: &str = "KLOCWORK_USER";
/// Environment variable overriding the token store location.
pub const ENV_LTOKEN: &str = "KLOCWORK_LTOKEN";

/// Where to connect and as whom.
///
/// # Example
///
/// ```no_run
/// use kwapi::ServerConfig;
///
/// let config = ServerConfig::new()
///     .host("kw.example.com")
///     .port(8080)
///     .user("alice");
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ServerConfig {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub user: Option<String>,
    /// Token store path; `~/.klocwork/ltoken` when unset.
    pub ltoken_path: Option<PathBuf>,
}

impl ServerConfig {
    /// An empty configuration: every field comes from the token store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Read the configuration from `KLOCWORK_*` environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if `KLOCWORK_PORT` is set but is not a port number.
    pub fn from_env() -> Result<Self> {
        let port = match env::var(ENV_PORT) {
            Ok(raw) => Some(parse_port(&raw)?),
            Err(_) => None,
        };

        Ok(Self {
            host: env::var(ENV_HOST).ok().filter(|h| !h.is_empty()),
            port,
            user: env::var(ENV_USER).ok().filter(|u| !u.is_empty()),
            ltoken_path: env::var(ENV_LTOKEN).ok().map(PathBuf::from),
        })
    }

    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.host = Some(host.into());
        self
    }

    pub fn port(mut self, port: u16) -> Self {
        self.port = Some(port);
        self
    }

    pub fn user(mut self, user: impl Into<String>) -> Self {
        self.user = Some(user.into());
        self
    }

    pub fn ltoken_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.ltoken_path = Some(path.into());
        self
    }

    /// The token store this configuration points at.
    ///
    /// # Errors
    ///
    /// Returns an error if no path is configured and the home directory
    /// cannot be determined.
    pub fn resolved_ltoken_path(&self) -> Result<PathBuf> {
        if let Some(path) = &self.ltoken_path {
            return Ok(path.clone());
        }
        let dirs = BaseDirs::new().ok_or_else(|| {
            KwError::ConfigMissing("cannot locate home directory for ~/.klocwork/ltoken".into())
        })?;
        Ok(dirs.home_dir().join(".klocwork").join("ltoken"))
    }
}

fn parse_port(raw: &str) -> Result<u16> {
    raw.trim().parse().map_err(|_| {
        KwError::ConfigInvalid(format!("{ENV_PORT} must be a port number, got '{raw}'"))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_sets_fields() {
        let config = ServerConfig::new()
            .host("kw.example.com")
            .port(8080)
            .user("alice")
            .ltoken_path("/tmp/ltoken");

        assert_eq!(config.host.as_deref(), Some("kw.example.com"));
        assert_eq!(config.port, Some(8080));
        assert_eq!(config.user.as_deref(), Some("alice"));
        assert_eq!(
            config.resolved_ltoken_path().unwrap(),
            PathBuf::from("/tmp/ltoken")
        );
    }

    #[test]
    fn test_port_value_is_trimmed() {
        assert_eq!(parse_port(" 8080\n").unwrap(), 8080);
    }

    #[test]
    fn test_malformed_port_is_invalid_not_missing() {
        for raw in ["eighty", "70000", ""] {
            match parse_port(raw) {
                Err(KwError::ConfigInvalid(message)) => assert!(message.contains(ENV_PORT)),
                other => panic!("expected ConfigInvalid for {raw:?}, got {other:?}"),
            }
        }
    }

    #[test]
    fn test_default_ltoken_path_is_under_home() {
        let config = ServerConfig::new();
        if let Ok(path) = config.resolved_ltoken_path() {
            assert!(path.ends_with(".klocwork/ltoken"));
        }
    }
}
