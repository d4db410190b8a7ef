//! Router tests driven in-process with `tower::ServiceExt::oneshot`.

use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use ezft_server::{router, BasicAuth, ServerConfig};
use http_body_util::BodyExt;
use tempfile::TempDir;
use tower::ServiceExt;

const CONTENT: &[u8] = b"Hello, World!";

fn app() -> (TempDir, Router) {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("test.txt"), CONTENT).unwrap();
    std::fs::create_dir(dir.path().join("sub")).unwrap();
    std::fs::write(dir.path().join("sub/nested.bin"), b"nested").unwrap();
    let app = router(&ServerConfig::new(dir.path(), 0)).unwrap();
    (dir, app)
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn get_range(uri: &str, range: &str) -> Request<Body> {
    Request::builder()
        .uri(uri)
        .header(header::RANGE, range)
        .body(Body::empty())
        .unwrap()
}

async fn body_bytes(response: axum::response::Response) -> Vec<u8> {
    response
        .into_body()
        .collect()
        .await
        .unwrap()
        .to_bytes()
        .to_vec()
}

fn header_value(response: &axum::response::Response, name: header::HeaderName) -> String {
    response
        .headers()
        .get(name)
        .map(|v| v.to_str().unwrap().to_string())
        .unwrap_or_default()
}

#[tokio::test]
async fn full_download_has_headers_and_body() {
    let (_dir, app) = app();
    let response = app.oneshot(get("/download/test.txt")).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(header_value(&response, header::ACCEPT_RANGES), "bytes");
    assert_eq!(
        header_value(&response, header::CONTENT_TYPE),
        "application/octet-stream"
    );
    assert_eq!(
        header_value(&response, header::CONTENT_DISPOSITION),
        "attachment; filename=\"test.txt\""
    );
    assert_eq!(header_value(&response, header::CONTENT_LENGTH), "13");
    assert!(header_value(&response, header::LAST_MODIFIED).ends_with("GMT"));
    assert_eq!(body_bytes(response).await, CONTENT);
}

#[tokio::test]
async fn range_request_returns_partial_content() {
    let (_dir, app) = app();
    let response = app
        .oneshot(get_range("/download/test.txt", "bytes=0-4"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::PARTIAL_CONTENT);
    assert_eq!(header_value(&response, header::CONTENT_RANGE), "bytes 0-4/13");
    assert_eq!(header_value(&response, header::CONTENT_LENGTH), "5");
    assert_eq!(body_bytes(response).await, b"Hello");
}

#[tokio::test]
async fn suffix_and_open_ranges() {
    let (_dir, app) = app();
    let response = app
        .clone()
        .oneshot(get_range("/download/test.txt", "bytes=-6"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::PARTIAL_CONTENT);
    assert_eq!(body_bytes(response).await, b"World!");

    let response = app
        .oneshot(get_range("/download/test.txt", "bytes=7-"))
        .await
        .unwrap();
    assert_eq!(header_value(&response, header::CONTENT_RANGE), "bytes 7-12/13");
    assert_eq!(body_bytes(response).await, b"World!");
}

#[tokio::test]
async fn bad_ranges_are_416() {
    let (_dir, app) = app();
    for range in ["bytes=5-2", "bytes=0-13", "items=0-1", "bytes=0-1,3-4", "bytes=x-y"] {
        let response = app
            .clone()
            .oneshot(get_range("/download/test.txt", range))
            .await
            .unwrap();
        assert_eq!(
            response.status(),
            StatusCode::RANGE_NOT_SATISFIABLE,
            "range {}",
            range
        );
        assert_eq!(header_value(&response, header::CONTENT_RANGE), "bytes */13");
    }
}

#[tokio::test]
async fn head_returns_headers_without_body() {
    let (_dir, app) = app();
    let request = Request::builder()
        .method(Method::HEAD)
        .uri("/download/test.txt")
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(header_value(&response, header::CONTENT_LENGTH), "13");
    assert_eq!(header_value(&response, header::ACCEPT_RANGES), "bytes");
    assert!(body_bytes(response).await.is_empty());
}

#[tokio::test]
async fn path_errors() {
    let (_dir, app) = app();
    let cases = [
        ("/download/missing.txt", StatusCode::NOT_FOUND),
        ("/download/", StatusCode::BAD_REQUEST),
        ("/download/sub", StatusCode::BAD_REQUEST),
        ("/download/%2e%2e/etc/passwd", StatusCode::FORBIDDEN),
        ("/download/sub/%2e%2e/%2e%2e/secret", StatusCode::FORBIDDEN),
        ("/info/", StatusCode::BAD_REQUEST),
        ("/info/missing.txt", StatusCode::NOT_FOUND),
        ("/info/sub", StatusCode::BAD_REQUEST),
    ];
    for (uri, status) in cases {
        let response = app.clone().oneshot(get(uri)).await.unwrap();
        assert_eq!(response.status(), status, "{}", uri);
    }
}

#[tokio::test]
async fn nested_files_are_served() {
    let (_dir, app) = app();
    let response = app.oneshot(get("/download/sub/nested.bin")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_bytes(response).await, b"nested");
}

#[tokio::test]
async fn info_reports_name_size_and_mtime() {
    let (_dir, app) = app();
    let response = app.oneshot(get("/info/test.txt")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let json: serde_json::Value = serde_json::from_slice(&body_bytes(response).await).unwrap();
    assert_eq!(json["name"], "test.txt");
    assert_eq!(json["size"], 13);
    let modified = json["modified"].as_str().unwrap();
    assert!(chrono::DateTime::parse_from_rfc3339(modified).is_ok(), "{}", modified);
}

#[tokio::test]
async fn health_is_ok() {
    let (_dir, app) = app();
    let response = app.oneshot(get("/health")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let json: serde_json::Value = serde_json::from_slice(&body_bytes(response).await).unwrap();
    assert_eq!(json["status"], "ok");
    assert!(json["timestamp"].is_string());
}

#[tokio::test]
async fn root_directory_is_created() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path().join("does/not/exist");
    router(&ServerConfig::new(&root, 0)).unwrap();
    assert!(root.is_dir());
}

fn auth_app() -> (TempDir, Router) {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("test.txt"), CONTENT).unwrap();
    let mut config = ServerConfig::new(dir.path(), 0);
    config.basic_auth = Some(BasicAuth {
        username: "admin".into(),
        password: "password".into(),
    });
    (dir, router(&config).unwrap())
}

fn with_credentials(user: &str, pass: &str) -> Request<Body> {
    let encoded = STANDARD.encode(format!("{}:{}", user, pass));
    Request::builder()
        .uri("/download/test.txt")
        .header(header::AUTHORIZATION, format!("Basic {}", encoded))
        .body(Body::empty())
        .unwrap()
}

#[tokio::test]
async fn basic_auth_challenges_missing_credentials() {
    let (_dir, app) = auth_app();
    let response = app.oneshot(get("/download/test.txt")).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(
        header_value(&response, header::WWW_AUTHENTICATE),
        "Basic realm=\"Restricted\""
    );
}

#[tokio::test]
async fn basic_auth_rejects_wrong_and_accepts_right_credentials() {
    let (_dir, app) = auth_app();
    let response = app
        .clone()
        .oneshot(with_credentials("admin", "nope"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = app
        .oneshot(with_credentials("admin", "password"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_bytes(response).await, CONTENT);
}
