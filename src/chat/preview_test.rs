use std::collections::HashMap;

use axum::extract::Query;
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use serde_json::{Value, json};

use super::*;

/// Local stand-in for the preview service.
async fn preview_handler(Query(params): Query<HashMap<String, String>>) -> Result<Json<Value>, StatusCode> {
    let url = params.get("url").cloned().unwrap_or_default();
    if url.contains("broken") {
        return Err(StatusCode::BAD_GATEWAY);
    }
    if url.contains("untitled") {
        return Ok(Json(json!({ "title": "  ", "description": "no title" })));
    }
    Ok(Json(json!({
        "title": format!("Title for {url}"),
        "description": "A page",
        "siteName": "Example",
        "images": ["", "https://img.example.com/a.png"],
    })))
}

async fn spawn_service() -> PreviewConfig {
    let app = Router::new().route("/preview", get(preview_handler));
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    PreviewConfig { base_url: format!("http://{addr}"), timeout_secs: 5 }
}

// =============================================================
// extract_urls
// =============================================================

#[test]
fn extract_urls_finds_http_and_https_in_order() {
    let urls = extract_urls("bak https://a.example.com/x ve http://b.example.org");
    assert_eq!(urls, vec!["https://a.example.com/x", "http://b.example.org"]);
}

#[test]
fn extract_urls_trims_trailing_punctuation() {
    let urls = extract_urls("şuna bak: https://example.com/page. (https://example.com/other)");
    assert_eq!(urls, vec!["https://example.com/page"]);
}

#[test]
fn extract_urls_dedupes() {
    let urls = extract_urls("https://example.com https://example.com, https://example.com!");
    assert_eq!(urls, vec!["https://example.com"]);
}

#[test]
fn extract_urls_ignores_non_http_and_invalid() {
    assert!(extract_urls("ftp://example.com www.example.com mailto:a@b.c").is_empty());
    assert!(extract_urls("https:// http://").is_empty());
    assert!(extract_urls("").is_empty());
}

// =============================================================
// parse_preview
// =============================================================

#[test]
fn parse_preview_maps_fields() {
    let body = r#"{"title":"Hello","description":"d","siteName":"S","images":["https://i/1.png"]}"#;
    let preview = parse_preview("https://x", body).unwrap().unwrap();
    assert_eq!(preview.url, "https://x");
    assert_eq!(preview.title, "Hello");
    assert_eq!(preview.description.as_deref(), Some("d"));
    assert_eq!(preview.site_name.as_deref(), Some("S"));
    assert_eq!(preview.image.as_deref(), Some("https://i/1.png"));
}

#[test]
fn parse_preview_without_title_is_none() {
    assert_eq!(parse_preview("https://x", r#"{"description":"d"}"#).unwrap(), None);
    assert_eq!(parse_preview("https://x", r#"{"title":""}"#).unwrap(), None);
}

#[test]
fn parse_preview_rejects_invalid_json() {
    assert!(matches!(parse_preview("https://x", "<html>"), Err(PreviewError::Parse(_))));
}

// =============================================================
// client
// =============================================================

#[tokio::test]
async fn fetch_reads_service_response() {
    let config = spawn_service().await;
    let client = PreviewClient::new(&config).unwrap();

    let preview = client.fetch("https://example.com/a?b=1").await.unwrap().unwrap();
    assert_eq!(preview.title, "Title for https://example.com/a?b=1");
    assert_eq!(preview.site_name.as_deref(), Some("Example"));
    assert_eq!(preview.image.as_deref(), Some("https://img.example.com/a.png"));
}

#[tokio::test]
async fn fetch_reports_status_errors() {
    let config = spawn_service().await;
    let client = PreviewClient::new(&config).unwrap();
    let err = client.fetch("https://broken.example.com").await.unwrap_err();
    assert!(matches!(err, PreviewError::Status(502)));
}

#[tokio::test]
async fn previews_for_drops_failures_and_untitled() {
    let config = spawn_service().await;
    let client = PreviewClient::new(&config).unwrap();

    let text = "https://one.example.com https://broken.example.com https://untitled.example.com https://two.example.com";
    let previews = client.previews_for(text).await;
    let urls: Vec<&str> = previews.iter().map(|p| p.url.as_str()).collect();
    assert_eq!(urls, vec!["https://one.example.com", "https://two.example.com"]);
}

#[tokio::test]
async fn previews_for_text_without_urls_is_empty() {
    let config = PreviewConfig { base_url: "http://127.0.0.1:9".into(), timeout_secs: 1 };
    let client = PreviewClient::new(&config).unwrap();
    assert!(client.previews_for("merhaba").await.is_empty());
}

#[tokio::test]
async fn unreachable_service_yields_no_previews() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    let config = PreviewConfig { base_url: format!("http://{addr}"), timeout_secs: 2 };
    let client = PreviewClient::new(&config).unwrap();
    assert!(client.previews_for("https://example.com").await.is_empty());
}
