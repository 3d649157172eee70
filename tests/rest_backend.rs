//! REST backend behavior against a mock HTTP server.

use mockito::{Matcher, Server, ServerGuard};
use serde_json::json;
use std::time::Duration;
use vertexai_preview::backend::{collect_all, ListOptions};
use vertexai_preview::{RestBackend, VertexBackend, VertexClient, VertexConfig};

const PARENT: &str = "projects/demo-project/locations/us-central1";

struct MockVertex {
    server: ServerGuard,
}

impl MockVertex {
    async fn new() -> Self {
        Self {
            server: Server::new_async().await,
        }
    }

    fn config(&self) -> VertexConfig {
        VertexConfig::new("demo-project", "us-central1")
            .with_api_endpoint(self.server.url())
            .with_access_token("test-token")
            .with_lro_poll_interval(Duration::from_millis(5))
            .with_lro_timeout(Duration::from_secs(5))
    }

    fn backend(&self) -> RestBackend {
        RestBackend::new(&self.config()).expect("rest backend")
    }

    fn path(rest: &str) -> String {
        format!("/v1beta1/{}/{}", PARENT, rest)
    }
}

#[tokio::test]
async fn create_polls_long_running_operation() {
    let mut mock = MockVertex::new().await;
    let op_name = format!("{}/datasets/7/operations/99", PARENT);

    let create = mock
        .server
        .mock("POST", MockVertex::path("datasets").as_str())
        .match_header("authorization", "Bearer test-token")
        .match_header("x-goog-user-project", "demo-project")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(json!({ "name": op_name, "done": false }).to_string())
        .create_async()
        .await;
    let poll = mock
        .server
        .mock("GET", format!("/v1beta1/{}", op_name).as_str())
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            json!({
                "name": op_name,
                "done": true,
                "response": {
                    "@type": "type.googleapis.com/google.cloud.aiplatform.v1beta1.Dataset",
                    "name": format!("{}/datasets/7", PARENT),
                    "displayName": "prompt"
                }
            })
            .to_string(),
        )
        .create_async()
        .await;

    let backend = mock.backend();
    let created = backend
        .create(PARENT, "datasets", json!({ "displayName": "prompt" }))
        .await
        .unwrap();
    assert_eq!(created["name"], format!("{}/datasets/7", PARENT));
    assert!(created.get("@type").is_none());
    create.assert_async().await;
    poll.assert_async().await;
}

#[tokio::test]
async fn failed_operation_surfaces_its_status() {
    let mut mock = MockVertex::new().await;
    let op_name = format!("{}/operations/5", PARENT);
    let _m = mock
        .server
        .mock("DELETE", MockVertex::path("datasets/3").as_str())
        .with_status(200)
        .with_body(
            json!({
                "name": op_name,
                "done": true,
                "error": { "code": 9, "message": "dataset is in use" }
            })
            .to_string(),
        )
        .create_async()
        .await;

    let err = mock
        .backend()
        .delete(&format!("{}/datasets/3", PARENT))
        .await
        .unwrap_err();
    assert!(err.to_string().contains("dataset is in use"));
}

#[tokio::test]
async fn listing_follows_page_tokens() {
    let mut mock = MockVertex::new().await;
    let path = MockVertex::path("cachedContents");
    let _first = mock
        .server
        .mock("GET", path.as_str())
        .match_query(Matcher::Exact("pageSize=1".into()))
        .with_status(200)
        .with_body(
            json!({
                "cachedContents": [{ "name": format!("{}/cachedContents/a", PARENT) }],
                "nextPageToken": "page-2"
            })
            .to_string(),
        )
        .create_async()
        .await;
    let _second = mock
        .server
        .mock("GET", path.as_str())
        .match_query(Matcher::Exact("pageSize=1&pageToken=page-2".into()))
        .with_status(200)
        .with_body(
            json!({
                "cachedContents": [{ "name": format!("{}/cachedContents/b", PARENT) }]
            })
            .to_string(),
        )
        .create_async()
        .await;

    let backend = mock.backend();
    let items = collect_all(
        &backend,
        PARENT,
        "cachedContents",
        ListOptions::new().with_page_size(1),
    )
    .await
    .unwrap();
    let names: Vec<&str> = items.iter().filter_map(|v| v["name"].as_str()).collect();
    assert_eq!(
        names,
        vec![
            format!("{}/cachedContents/a", PARENT),
            format!("{}/cachedContents/b", PARENT)
        ]
    );
}

#[tokio::test]
async fn missing_resource_maps_to_not_found() {
    let mut mock = MockVertex::new().await;
    let _m = mock
        .server
        .mock("GET", MockVertex::path("cachedContents/gone").as_str())
        .with_status(404)
        .with_body(json!({ "error": { "code": 404, "message": "not here" } }).to_string())
        .create_async()
        .await;

    let client = VertexClient::builder()
        .with_config(mock.config())
        .build()
        .unwrap();
    let err = client.caching().get("gone").await.unwrap_err();
    assert!(err.is_not_found());
}

#[tokio::test]
async fn error_envelope_message_is_preserved() {
    let mut mock = MockVertex::new().await;
    let _m = mock
        .server
        .mock("POST", MockVertex::path("tuningJobs/1:cancel").as_str())
        .with_status(400)
        .with_body(
            json!({
                "error": {
                    "code": 400,
                    "message": "job already finished",
                    "status": "FAILED_PRECONDITION"
                }
            })
            .to_string(),
        )
        .create_async()
        .await;

    let client = VertexClient::builder()
        .with_config(mock.config())
        .build()
        .unwrap();
    let err = client.tuning().cancel("1").await.unwrap_err();
    assert_eq!(err.status_code(), Some(400));
    assert!(!err.is_retryable());
    assert!(err.to_string().contains("job already finished"));
}

#[tokio::test]
async fn server_errors_are_retryable() {
    let mut mock = MockVertex::new().await;
    let _m = mock
        .server
        .mock("GET", MockVertex::path("tuningJobs/2").as_str())
        .with_status(503)
        .with_body("upstream unavailable")
        .create_async()
        .await;

    let err = mock
        .backend()
        .get(&format!("{}/tuningJobs/2", PARENT))
        .await
        .unwrap_err();
    assert_eq!(err.status_code(), Some(503));
    assert!(err.is_retryable());
}
