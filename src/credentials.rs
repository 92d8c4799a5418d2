//! Token store lookup.
//!
//! The store is the file written by `kwauth`: one `host;port;user;token`
//! record per line. Hosts may be recorded by name or by address, so host
//! comparison goes through a [`HostResolver`].

use std::fmt;
use std::fs;
use std::net::{IpAddr, ToSocketAddrs};
use std::path::Path;

use crate::error::{KwError, Result};

/// One line of the token store.
#[derive(Clone, PartialEq, Eq)]
pub struct CredentialRecord {
    pub host: String,
    pub port: String,
    pub user: String,
    pub token: String,
}

impl fmt::Debug for CredentialRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CredentialRecord")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("user", &self.user)
            .finish_non_exhaustive()
    }
}

/// What the caller knows about the connection; `None` means "take it from the store".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CredentialQuery {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub user: Option<String>,
}

impl fmt::Display for CredentialQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}@{}:{}",
            self.user.as_deref().unwrap_or("*"),
            self.host.as_deref().unwrap_or("*"),
            self.port.map_or_else(|| "*".to_string(), |p| p.to_string())
        )
    }
}

/// A fully resolved identity plus its token.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub host: String,
    pub port: String,
    pub user: String,
    pub token: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("user", &self.user)
            .finish_non_exhaustive()
    }
}

/// Maps a host name or address to an IP address.
pub trait HostResolver {
    /// Returns `None` when the host cannot be resolved.
    fn resolve(&self, host: &str) -> Option<IpAddr>;
}

/// Resolves through the system resolver, preferring IPv4 like `gethostbyname`.
#[derive(Debug, Clone, Copy, Default)]
pub struct DnsResolver;

impl HostResolver for DnsResolver {
    fn resolve(&self, host: &str) -> Option<IpAddr> {
        if let Ok(addr) = host.parse::<IpAddr>() {
            return Some(addr);
        }
        let addrs: Vec<IpAddr> = match (host, 0).to_socket_addrs() {
            Ok(iter) => iter.map(|a| a.ip()).collect(),
            Err(e) => {
                tracing::debug!(host, error = %e, "host lookup failed");
                return None;
            }
        };
        addrs
            .iter()
            .find(|a| a.is_ipv4())
            .or_else(|| addrs.first())
            .copied()
    }
}

/// The parsed token store.
#[derive(Debug, Clone, Default)]
pub struct CredentialStore {
    records: Vec<CredentialRecord>,
}

impl CredentialStore {
    /// Read and parse the store at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`KwError::Io`] if the file cannot be read.
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Ok(Self::parse(&content))
    }

    /// Parse store contents. Lines without four fields or with an empty
    /// token are skipped.
    pub fn parse(content: &str) -> Self {
        let records = content
            .lines()
            .enumerate()
            .filter(|(_, line)| !line.trim().is_empty())
            .filter_map(|(index, line)| {
                let mut fields = line.trim().splitn(4, ';');
                match (fields.next(), fields.next(), fields.next(), fields.next()) {
                    (Some(host), Some(port), Some(user), Some(token))
                        if !token.trim().is_empty() =>
                    {
                        Some(CredentialRecord {
                            host: host.to_string(),
                            port: port.to_string(),
                            user: user.to_string(),
                            token: token.to_string(),
                        })
                    }
                    _ => {
                        tracing::warn!(line = index + 1, "skipping malformed token store record");
                        None
                    }
                }
            })
            .collect();
        Self { records }
    }

    pub fn records(&self) -> &[CredentialRecord] {
        &self.records
    }

    /// Find the token for `query`.
    ///
    /// Records are scanned in order. Unset query fields match anything and
    /// are taken from the first matching record; after that a record has to
    /// match all three fields. The last full match supplies the token.
    ///
    /// # Errors
    ///
    /// Returns [`KwError::CredentialNotFound`] if no record matches.
    pub fn resolve(
        &self,
        query: &CredentialQuery,
        resolver: &dyn HostResolver,
    ) -> Result<Credentials> {
        let mut host = query.host.clone();
        let mut port = query.port.map(|p| p.to_string());
        let mut user = query.user.clone();
        let mut host_addr = host.as_deref().and_then(|h| resolver.resolve(h));
        let mut token = None;

        for record in &self.records {
            let host_matches = match host.as_deref() {
                None => true,
                Some(h) if h == record.host => true,
                Some(_) => host_addr.is_some() && resolver.resolve(&record.host) == host_addr,
            };
            let port_matches = port.as_deref().map_or(true, |p| p == record.port);
            let user_matches = user.as_deref().map_or(true, |u| u == record.user);

            if !(host_matches && port_matches && user_matches) {
                continue;
            }

            if host.is_none() {
                host_addr = resolver.resolve(&record.host);
                host = Some(record.host.clone());
            }
            port.get_or_insert_with(|| record.port.clone());
            user.get_or_insert_with(|| record.user.clone());
            token = Some(record.token.clone());
        }

        match (host, port, user, token) {
            (Some(host), Some(port), Some(user), Some(token)) => {
                tracing::debug!(%host, %port, %user, "resolved Klocwork token");
                Ok(Credentials {
                    host,
                    port,
                    user,
                    token,
                })
            }
            _ => Err(KwError::CredentialNotFound {
                query: query.to_string(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    struct StaticResolver(HashMap<&'static str, IpAddr>);

    impl StaticResolver {
        fn new() -> Self {
            let mut map = HashMap::new();
            map.insert("kwserver", "10.0.0.5".parse().unwrap());
            map.insert("kwserver.example.com", "10.0.0.5".parse().unwrap());
            map.insert("other", "10.0.0.9".parse().unwrap());
            Self(map)
        }
    }

    impl HostResolver for StaticResolver {
        fn resolve(&self, host: &str) -> Option<IpAddr> {
            host.parse()
                .ok()
                .or_else(|| self.0.get(host).copied())
        }
    }

    const STORE: &str = "\
10.0.0.5;8080;alice;token-a
kwserver;8080;bob;token-b
other;9090;alice;token-c
";

    fn query(host: Option<&str>, port: Option<u16>, user: Option<&str>) -> CredentialQuery {
        CredentialQuery {
            host: host.map(str::to_string),
            port,
            user: user.map(str::to_string),
        }
    }

    #[test]
    fn test_parse_skips_blank_and_malformed_lines() {
        let store = CredentialStore::parse("\nfoo;bar\nhost;8080;me;tok;with;semicolons\n");
        assert_eq!(store.records().len(), 1);
        assert_eq!(store.records()[0].token, "tok;with;semicolons");
    }

    #[test]
    fn test_empty_token_record_is_not_a_credential() {
        let store = CredentialStore::parse("kwserver;8080;alice;\nkwserver;8080;bob;  \n");
        assert!(store.records().is_empty());

        let result = store.resolve(&CredentialQuery::default(), &StaticResolver::new());
        assert!(matches!(result, Err(KwError::CredentialNotFound { .. })));
    }

    #[test]
    fn test_empty_token_record_keeps_earlier_token() {
        let store = CredentialStore::parse("kwserver;8080;alice;good\n10.0.0.5;8080;alice;\n");
        let creds = store
            .resolve(&query(Some("kwserver"), Some(8080), Some("alice")), &StaticResolver::new())
            .unwrap();
        assert_eq!(creds.token, "good");
    }

    #[test]
    fn test_resolve_exact_match() {
        let store = CredentialStore::parse(STORE);
        let creds = store
            .resolve(&query(Some("other"), Some(9090), Some("alice")), &StaticResolver::new())
            .unwrap();
        assert_eq!(creds.token, "token-c");
    }

    #[test]
    fn test_resolve_hostname_matches_stored_address() {
        let store = CredentialStore::parse(STORE);
        let creds = store
            .resolve(
                &query(Some("kwserver.example.com"), Some(8080), Some("alice")),
                &StaticResolver::new(),
            )
            .unwrap();
        assert_eq!(creds.token, "token-a");
        assert_eq!(creds.host, "kwserver.example.com");
    }

    #[test]
    fn test_resolve_address_matches_stored_hostname() {
        let store = CredentialStore::parse(STORE);
        let creds = store
            .resolve(&query(Some("10.0.0.5"), Some(8080), Some("bob")), &StaticResolver::new())
            .unwrap();
        assert_eq!(creds.token, "token-b");
    }

    #[test]
    fn test_resolve_fills_unspecified_fields_from_first_match() {
        let store = CredentialStore::parse(STORE);
        let creds = store
            .resolve(&query(None, None, Some("alice")), &StaticResolver::new())
            .unwrap();
        assert_eq!(creds.host, "10.0.0.5");
        assert_eq!(creds.port, "8080");
        assert_eq!(creds.token, "token-a");
    }

    #[test]
    fn test_resolve_last_full_match_wins() {
        let store = CredentialStore::parse(
            "kwserver;8080;alice;old-token\n10.0.0.5;8080;alice;new-token\n",
        );
        let creds = store
            .resolve(&query(Some("kwserver"), Some(8080), Some("alice")), &StaticResolver::new())
            .unwrap();
        assert_eq!(creds.token, "new-token");
    }

    #[test]
    fn test_resolve_no_match_is_credential_not_found() {
        let store = CredentialStore::parse(STORE);
        let result = store.resolve(
            &query(Some("other"), Some(8080), Some("carol")),
            &StaticResolver::new(),
        );
        assert!(matches!(result, Err(KwError::CredentialNotFound { .. })));
    }

    #[test]
    fn test_resolve_empty_store_fails() {
        let store = CredentialStore::parse("");
        let result = store.resolve(&CredentialQuery::default(), &StaticResolver::new());
        assert!(matches!(result, Err(KwError::CredentialNotFound { .. })));
    }

    #[test]
    fn test_unresolvable_host_does_not_match_by_address() {
        let store = CredentialStore::parse(STORE);
        let result = store.resolve(
            &query(Some("nowhere"), Some(8080), Some("alice")),
            &StaticResolver::new(),
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_debug_hides_token() {
        let store = CredentialStore::parse(STORE);
        let debug = format!("{:?}", store);
        assert!(!debug.contains("token-a"));
    }

    #[test]
    fn test_dns_resolver_parses_numeric_addresses() {
        assert_eq!(
            DnsResolver.resolve("127.0.0.1"),
            Some("127.0.0.1".parse().unwrap())
        );
    }
}
