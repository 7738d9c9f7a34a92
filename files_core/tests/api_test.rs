use std::sync::Arc;

use axum::{
    body::{to_bytes, Body},
    http::{Method, Request, StatusCode},
    Router,
};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use files_core::{
    connect_in_memory, create_app, run_migrations, AppConfig, AppState, ChannelJobQueue,
    DerivativeJob,
};
use serde_json::{json, Value};
use tempfile::TempDir;
use tokio::sync::mpsc::UnboundedReceiver;
use tower::ServiceExt;

struct TestApp {
    app: Router,
    jobs: UnboundedReceiver<DerivativeJob>,
    _dir: TempDir,
}

async fn spawn_app() -> TestApp {
    let dir = TempDir::new().unwrap();
    let pool = connect_in_memory().await.unwrap();
    run_migrations(pool.clone()).await.unwrap();

    let mut config = AppConfig::default();
    config.files.storage_dir = dir.path().join("blobs");

    let (queue, jobs) = ChannelJobQueue::new();
    let state = AppState::with_sqlite(pool, &config, Arc::new(queue));

    TestApp {
        app: create_app(state),
        jobs,
        _dir: dir,
    }
}

impl TestApp {
    async fn send(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Vec<u8>) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header("X-Token", token);
        }
        let request = match body {
            Some(body) => builder
                .header("Content-Type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, bytes.to_vec())
    }

    async fn json(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let (status, bytes) = self.send(method, uri, token, body).await;
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, value)
    }

    async fn post_raw(
        &self,
        uri: &str,
        token: &str,
        content_type: Option<&str>,
        body: &'static str,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder()
            .method(Method::POST)
            .uri(uri)
            .header("X-Token", token);
        if let Some(content_type) = content_type {
            builder = builder.header("Content-Type", content_type);
        }
        let request = builder.body(Body::from(body)).unwrap();

        let response = self.app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    async fn connect(&self, email: &str, password: &str) -> (StatusCode, Value) {
        let credentials = STANDARD.encode(format!("{}:{}", email, password));
        let request = Request::builder()
            .uri("/connect")
            .header("Authorization", format!("Basic {}", credentials))
            .body(Body::empty())
            .unwrap();

        let response = self.app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    async fn signed_in(&self, email: &str, password: &str) -> String {
        let (status, _) = self
            .json(
                Method::POST,
                "/users",
                None,
                Some(json!({"email": email, "password": password})),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED);

        let (status, body) = self.connect(email, password).await;
        assert_eq!(status, StatusCode::OK);
        body["token"].as_str().unwrap().to_string()
    }
}

#[tokio::test]
async fn test_upload_publish_and_read_scenario() {
    let mut t = spawn_app().await;
    let token = t.signed_in("bob@dylan.com", "toto1234!").await;

    let (status, folder) = t
        .json(Method::POST, "/files", Some(&token), Some(json!({"name": "notes", "type": "folder"})))
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(folder["parentId"], 0);
    assert_eq!(folder["type"], "folder");
    assert_eq!(folder["isPublic"], false);
    let folder_id = folder["id"].as_str().unwrap().to_string();

    let (status, file) = t
        .json(
            Method::POST,
            "/files",
            Some(&token),
            Some(json!({
                "name": "a.txt",
                "type": "file",
                "data": STANDARD.encode("hi"),
                "parentId": folder_id,
            })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(file["parentId"], folder_id.as_str());
    assert_eq!(file["isPublic"], false);
    assert!(file.get("localPath").is_none());
    let file_id = file["id"].as_str().unwrap().to_string();

    let job = t.jobs.try_recv().unwrap();
    assert_eq!(job.file_id.to_string(), file_id);

    let data_uri = format!("/files/{}/data", file_id);
    let (status, bytes) = t.send(Method::GET, &data_uri, Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(bytes, b"hi");

    let (status, _) = t.send(Method::GET, &data_uri, None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, published) = t
        .json(Method::PUT, &format!("/files/{}/publish", file_id), Some(&token), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(published["isPublic"], true);

    let (status, bytes) = t.send(Method::GET, &data_uri, None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(bytes, b"hi");

    let (status, body) = t
        .json(
            Method::POST,
            "/files",
            Some(&token),
            Some(json!({
                "name": "x",
                "type": "file",
                "data": "d",
                "parentId": uuid::Uuid::new_v4().to_string(),
            })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Parent not found");
}

#[tokio::test]
async fn test_session_lifecycle() {
    let t = spawn_app().await;
    let token = t.signed_in("bob@dylan.com", "toto1234!").await;

    let (status, me) = t.json(Method::GET, "/users/me", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(me["email"], "bob@dylan.com");
    assert!(me.get("password_hash").is_none());

    let (status, _) = t.connect("bob@dylan.com", "wrong").await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = t.send(Method::GET, "/disconnect", Some(&token), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, body) = t.json(Method::GET, "/users/me", Some(&token), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body, json!({"error": "Unauthorized", "status": 401}));

    let (status, _) = t.send(Method::GET, "/disconnect", Some(&token), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_registration_errors() {
    let t = spawn_app().await;
    t.signed_in("bob@dylan.com", "toto1234!").await;

    let cases = [
        (json!({"password": "x"}), "Missing email"),
        (json!({"email": "a@b.com"}), "Missing password"),
        (json!({"email": "bob@dylan.com", "password": "x"}), "Already exist"),
    ];
    for (body, message) in cases {
        let (status, body) = t.json(Method::POST, "/users", None, Some(body)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], message);
    }
}

#[tokio::test]
async fn test_protected_routes_require_token() {
    let t = spawn_app().await;

    let (status, _) = t
        .json(Method::POST, "/files", None, Some(json!({"name": "notes", "type": "folder"})))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = t.json(Method::GET, "/files", Some("bogus"), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_private_nodes_are_hidden_from_other_users() {
    let t = spawn_app().await;
    let owner = t.signed_in("owner@example.com", "pw").await;
    let other = t.signed_in("other@example.com", "pw").await;

    let (_, folder) = t
        .json(Method::POST, "/files", Some(&owner), Some(json!({"name": "secret", "type": "folder"})))
        .await;
    let id = folder["id"].as_str().unwrap();

    let (status, body) = t.json(Method::GET, &format!("/files/{}", id), Some(&other), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "Not found");

    let (status, _) = t
        .json(Method::PUT, &format!("/files/{}/publish", id), Some(&other), None)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, body) = t.json(Method::GET, &format!("/files/{}/data", id), Some(&owner), None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "A folder doesn't have content");

    let (status, _) = t.json(Method::GET, "/files/not-a-uuid", Some(&owner), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_listing_pages_and_bad_parents() {
    let t = spawn_app().await;
    let token = t.signed_in("bob@dylan.com", "toto1234!").await;

    let (_, folder) = t
        .json(Method::POST, "/files", Some(&token), Some(json!({"name": "docs", "type": "folder"})))
        .await;
    let folder_id = folder["id"].as_str().unwrap().to_string();

    for i in 0..23 {
        let (status, _) = t
            .json(
                Method::POST,
                "/files",
                Some(&token),
                Some(json!({"name": format!("f{}", i), "type": "folder", "parentId": folder_id})),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED);
    }

    let (status, page0) = t
        .json(Method::GET, &format!("/files?parentId={}", folder_id), Some(&token), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    let page0 = page0.as_array().unwrap();
    assert_eq!(page0.len(), 20);
    assert_eq!(page0[0]["name"], "f0");

    let (_, page1) = t
        .json(Method::GET, &format!("/files?parentId={}&page=1", folder_id), Some(&token), None)
        .await;
    let page1 = page1.as_array().unwrap();
    assert_eq!(page1.len(), 3);
    assert_eq!(page1[2]["name"], "f22");

    let (_, root) = t.json(Method::GET, "/files", Some(&token), None).await;
    assert_eq!(root.as_array().unwrap().len(), 1);

    for blank in ["", "%20"] {
        let (status, body) = t
            .json(Method::GET, &format!("/files?parentId={}", blank), Some(&token), None)
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, root);
    }

    for parent in ["garbage", &uuid::Uuid::new_v4().to_string()] {
        let (status, body) = t
            .json(Method::GET, &format!("/files?parentId={}", parent), Some(&token), None)
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!([]));
    }
}

#[tokio::test]
async fn test_status_and_stats() {
    let t = spawn_app().await;
    let token = t.signed_in("bob@dylan.com", "toto1234!").await;
    t.json(Method::POST, "/files", Some(&token), Some(json!({"name": "docs", "type": "folder"})))
        .await;

    let (status, body) = t.json(Method::GET, "/status", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"db": true, "sessions": true}));

    let (status, body) = t.json(Method::GET, "/stats", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"users": 1, "files": 1}));
}

#[tokio::test]
async fn test_malformed_upload_fields_report_missing_field() {
    let mut t = spawn_app().await;
    let token = t.signed_in("bob@dylan.com", "toto1234!").await;

    let cases = [
        (json!({"name": 5, "type": "folder"}), "Missing name"),
        (json!({"name": "a", "type": 5}), "Missing type"),
        (json!({"name": "a", "type": ["file"]}), "Missing type"),
        (json!({"name": "a", "type": "file", "data": 12}), "Missing data"),
    ];
    for (body, error) in cases {
        let (status, body) = t.json(Method::POST, "/files", Some(&token), Some(body)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body, json!({"error": error, "status": 400}));
    }

    let (status, body) = t.post_raw("/files", &token, None, r#"{"name":"a","type":"folder"}"#).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["name"], "a");

    for (content_type, raw) in [
        (Some("application/json"), "{\"name\": "),
        (Some("application/json"), ""),
        (None, ""),
        (Some("application/json"), "[1]"),
    ] {
        let (status, body) = t.post_raw("/files", &token, content_type, raw).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Missing name");
    }

    let (status, body) = t
        .json(
            Method::POST,
            "/files",
            Some(&token),
            Some(json!({"name": "b", "type": "folder", "isPublic": "yes"})),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["isPublic"], false);
    assert!(t.jobs.try_recv().is_err());
}

#[tokio::test]
async fn test_malformed_registration_fields_report_missing_field() {
    let t = spawn_app().await;

    let (status, body) = t
        .json(Method::POST, "/users", None, Some(json!({"email": 5, "password": "x"})))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Missing email");

    let (status, body) = t
        .json(Method::POST, "/users", None, Some(json!({"email": "a@b.com", "password": true})))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Missing password");
}

#[tokio::test]
async fn test_unparseable_size_is_not_found() {
    let t = spawn_app().await;
    let token = t.signed_in("bob@dylan.com", "toto1234!").await;

    let (_, file) = t
        .json(
            Method::POST,
            "/files",
            Some(&token),
            Some(json!({"name": "a.txt", "type": "file", "data": STANDARD.encode("hi")})),
        )
        .await;
    let data_uri = format!("/files/{}/data", file["id"].as_str().unwrap());

    for size in ["abc", "-1", "100"] {
        let (status, body) = t
            .json(Method::GET, &format!("{}?size={}", data_uri, size), Some(&token), None)
            .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body, json!({"error": "Not found", "status": 404}));
    }

    let (status, bytes) = t.send(Method::GET, &format!("{}?size=", data_uri), Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(bytes, b"hi");
}
