//! Server facade tests: credential lookup at construction and the cached
//! project, user and version lists.

use std::net::IpAddr;
use std::path::PathBuf;

use kwapi::{HostResolver, KwError, Server, ServerConfig};
use wiremock::matchers::{body_string_contains, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Resolves literal addresses only, so tests never touch DNS.
struct LiteralResolver;

impl HostResolver for LiteralResolver {
    fn resolve(&self, host: &str) -> Option<IpAddr> {
        host.parse().ok()
    }
}

fn write_store(dir: &tempfile::TempDir, lines: &[String]) -> PathBuf {
    let path = dir.path().join("ltoken");
    std::fs::write(&path, lines.join("\n")).unwrap();
    path
}

async fn logged_in(mock_server: &MockServer, dir: &tempfile::TempDir) -> Server {
    let port = mock_server.address().port();
    let store = write_store(dir, &[format!("127.0.0.1;{port};alice;tok")]);
    let config = ServerConfig::new().host("127.0.0.1").port(port).ltoken_path(store);
    Server::with_resolver(config, &LiteralResolver).unwrap()
}

#[test]
fn test_no_matching_token_fails_at_construction() {
    let dir = tempfile::tempdir().unwrap();
    let store = write_store(&dir, &["otherhost;8080;bob;tok".to_string()]);

    let config = ServerConfig::new().host("kwserver").ltoken_path(store);
    let err = Server::with_resolver(config, &LiteralResolver).unwrap_err();

    match err {
        KwError::CredentialNotFound { query } => assert_eq!(query, "*@kwserver:*"),
        other => panic!("expected CredentialNotFound, got {other:?}"),
    }
}

#[test]
fn test_missing_store_is_an_io_error() {
    let dir = tempfile::tempdir().unwrap();
    let config = ServerConfig::new().ltoken_path(dir.path().join("absent"));

    assert!(matches!(
        Server::with_resolver(config, &LiteralResolver),
        Err(KwError::Io(_))
    ));
}

#[test]
fn test_unset_fields_come_from_first_match() {
    let dir = tempfile::tempdir().unwrap();
    let store = write_store(
        &dir,
        &[
            "kw1;8080;alice;first".to_string(),
            "kw2;8080;alice;other".to_string(),
            "kw1;8080;alice;latest".to_string(),
        ],
    );

    let server =
        Server::with_resolver(ServerConfig::new().ltoken_path(store), &LiteralResolver).unwrap();
    assert_eq!(server.host(), "kw1");
    assert_eq!(server.port(), "8080");
    assert_eq!(server.user(), "alice");
    assert_eq!(
        server.to_string(),
        "Login as alice at Klocwork server http://kw1:8080"
    );
}

#[tokio::test]
async fn test_projects_are_fetched_once() {
    let mock_server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();

    Mock::given(method("POST"))
        .and(path("/review/api"))
        .and(body_string_contains("user=alice&ltoken=tok&action=projects"))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            "{\"id\":\"demo\",\"name\":\"demo\",\"creator\":\"alice\"}\n\
             {\"id\":\"tools\",\"name\":\"tools\",\"creator\":\"bob\"}\n",
        ))
        .expect(1)
        .mount(&mock_server)
        .await;

    let mut server = logged_in(&mock_server, &dir).await;

    assert_eq!(server.projects().await.unwrap().len(), 2);
    let demo = server.project("demo").await.unwrap().expect("demo exists");
    assert_eq!(demo.creator, "alice");
    assert!(server.project("ghost").await.unwrap().is_none());
}

#[tokio::test]
async fn test_users_and_admin_roles() {
    let mock_server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();

    let users = [
        serde_json::json!({
            "name": "alice",
            "readonly": false,
            "roles": [
                {"name": "Project admin", "projectId": "demo", "allProjects": false},
                {"name": "Developer", "allProjects": true},
            ],
            "groups": ["developers", {"name": "admins"}],
        }),
        serde_json::json!({"name": "bob", "readonly": true}),
    ]
    .iter()
    .map(|u| u.to_string())
    .collect::<Vec<_>>()
    .join("\n");

    Mock::given(method("POST"))
        .and(body_string_contains("action=users"))
        .respond_with(ResponseTemplate::new(200).set_body_string(users))
        .expect(1)
        .mount(&mock_server)
        .await;

    let mut server = logged_in(&mock_server, &dir).await;

    let alice = server.user_named("alice").await.unwrap().unwrap();
    assert_eq!(alice.projects_as_admin(), vec!["demo"]);
    assert_eq!(alice.groups, vec!["developers", "admins"]);

    let bob = server.user_named("bob").await.unwrap().unwrap();
    assert!(bob.readonly);
    assert!(bob.projects_as_admin().is_empty());

    assert_eq!(server.users().await.unwrap().len(), 2);
}

#[tokio::test]
async fn test_version_is_cached() {
    let mock_server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();

    Mock::given(method("POST"))
        .and(body_string_contains("action=version"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(r#"{"majorVersion":"20","minorVersion":"2"}"#),
        )
        .expect(1)
        .mount(&mock_server)
        .await;

    let mut server = logged_in(&mock_server, &dir).await;

    assert_eq!(server.version().await.unwrap().to_string(), "20.2");
    assert_eq!(server.version().await.unwrap().major, "20");
}

#[tokio::test]
async fn test_failed_project_list_is_an_error_and_not_cached() {
    let mock_server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(403).set_body_string("forbidden"))
        .expect(2)
        .mount(&mock_server)
        .await;

    let mut server = logged_in(&mock_server, &dir).await;

    for _ in 0..2 {
        match server.projects().await {
            Err(KwError::Transport(e)) => assert_eq!(e.status(), Some(403)),
            other => panic!("expected a transport error, got {other:?}"),
        }
    }
}
