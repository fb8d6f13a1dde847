use chat_export_core::contract::{BlobFetcher, FetchError};
use chat_export_core::fetch::HttpBlobFetcher;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[tokio::test]
async fn test_fetch_returns_body_on_success() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/files/f1/preview"))
        .and(header("cookie", "sessionKey=abc"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"image-bytes".to_vec()))
        .expect(1)
        .mount(&server)
        .await;

    let fetcher = HttpBlobFetcher::new(server.uri()).with_session_cookie("sessionKey=abc");
    let bytes = fetcher
        .fetch("/api/files/f1/preview")
        .await
        .expect("fetch should succeed");

    assert_eq!(bytes, b"image-bytes");
}

#[tokio::test]
async fn test_fetch_maps_error_status() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/missing"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let fetcher = HttpBlobFetcher::new(format!("{}/", server.uri()));
    let err = fetcher.fetch("missing").await.unwrap_err();

    assert!(matches!(err, FetchError::Status(404)));
    assert_eq!(err.to_string(), "HTTP error! status: 404");
}

#[test]
fn test_resolve_url() {
    let fetcher = HttpBlobFetcher::new("https://claude.ai/");
    assert_eq!(
        fetcher.resolve_url("/api/a"),
        "https://claude.ai/api/a"
    );
    assert_eq!(fetcher.resolve_url("api/a"), "https://claude.ai/api/a");
    assert_eq!(
        fetcher.resolve_url("https://cdn.example.com/x.png"),
        "https://cdn.example.com/x.png"
    );
}
