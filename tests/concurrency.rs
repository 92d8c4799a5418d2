//! Handles are cheap to clone and safe to share across tasks.

use kwapi::{Build, Issue, KwClient, Module, Project, ProjectRef, User, View};
use serde_json::json;
use wiremock::matchers::{body_string_contains, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn assert_send_sync<T: Send + Sync + Clone>() {}

#[test]
fn test_handles_are_send_sync_and_clone() {
    assert_send_sync::<KwClient>();
    assert_send_sync::<ProjectRef>();
    assert_send_sync::<Project>();
    assert_send_sync::<Issue>();
    assert_send_sync::<Build>();
    assert_send_sync::<View>();
    assert_send_sync::<Module>();
    assert_send_sync::<User>();
}

fn totals(tag: &str, sum: f64, entries: u64) -> String {
    json!({"tag": tag, "sum": sum, "min": 1.0, "max": sum, "entries": entries}).to_string()
}

#[tokio::test]
async fn test_cloned_projects_fetch_totals_concurrently() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/review/api"))
        .and(body_string_contains("project=demo&aggregate=true"))
        .respond_with(ResponseTemplate::new(200).set_body_string(totals("LOC_FILE", 200.0, 2)))
        .expect(1)
        .mount(&mock_server)
        .await;
    Mock::given(method("POST"))
        .and(path("/review/api"))
        .and(body_string_contains("view=critical&aggregate=true"))
        .respond_with(ResponseTemplate::new(200).set_body_string(totals("NCLOC_FILE", 30.0, 3)))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = KwClient::new(&mock_server.uri(), "alice", "tok").unwrap();
    let project = Project::named(client, "demo");
    let other = project.clone();

    let (all, critical) = tokio::join!(
        project.metrics_total(None, None),
        other.metrics_total(Some("critical"), None),
    );

    let all = all.unwrap().into_result().unwrap();
    assert_eq!(all.len(), 1);
    assert_eq!(all[0].tag, "LOC_FILE");
    assert_eq!(all[0].mean(), Some(100.0));
    assert_eq!(all[0].project().name(), "demo");

    let critical = critical.unwrap().into_result().unwrap();
    assert_eq!(critical[0].tag, "NCLOC_FILE");
    assert_eq!(critical[0].mean(), Some(10.0));
}

#[tokio::test]
async fn test_cloned_project_moves_into_spawned_task() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(body_string_contains("aggregate=true"))
        .respond_with(ResponseTemplate::new(200).set_body_string(totals("LOC_FILE", 50.0, 5)))
        .expect(2)
        .mount(&mock_server)
        .await;

    let client = KwClient::new(&mock_server.uri(), "alice", "tok").unwrap();
    let project = Project::named(client, "demo");

    let handles: Vec<_> = (0..2)
        .map(|_| {
            let project = project.clone();
            tokio::spawn(async move { project.metrics_total(None, None).await })
        })
        .collect();

    for handle in handles {
        let fetched = handle.await.unwrap().unwrap();
        assert!(fetched.success);
        assert_eq!(fetched.items[0].sum, 50.0);
    }
}
