//! Link previews for URLs found in message text.
//!
//! Previews come from an external HTTP service:
//! `GET {base}/preview?url=<url>` returning `{title, description, siteName,
//! images[]}`. They are purely cosmetic, so every failure is dropped and
//! logged at debug level. Nothing is cached.

#[cfg(test)]
#[path = "preview_test.rs"]
mod preview_test;

use std::time::Duration;

use futures::future::join_all;
use reqwest::Url;
use serde::Deserialize;
use tracing::debug;

use crate::config::PreviewConfig;

const CONNECT_TIMEOUT_SECS: u64 = 5;

/// Characters stripped from the end of a URL token (sentence punctuation).
const TRAILING_PUNCTUATION: &[char] = &['.', ',', ';', ':', '!', '?', ')', ']', '}', '"', '\'', '>'];

// =============================================================================
// ERROR
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum PreviewError {
    /// The underlying HTTP client could not be constructed.
    #[error("HTTP client build failed: {0}")]
    HttpClientBuild(String),

    /// The request did not complete.
    #[error("preview request failed: {0}")]
    Request(String),

    /// The service answered with a non-success status.
    #[error("preview service returned status {0}")]
    Status(u16),

    /// The response body was not the expected JSON.
    #[error("preview response parse failed: {0}")]
    Parse(String),
}

// =============================================================================
// TYPES
// =============================================================================

/// Card data for one URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkPreview {
    pub url: String,
    pub title: String,
    pub description: Option<String>,
    pub site_name: Option<String>,
    pub image: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PreviewResponse {
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    site_name: Option<String>,
    #[serde(default)]
    images: Vec<String>,
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

/// Parse a service response. `None` when there is no usable title.
///
/// # Errors
///
/// Returns [`PreviewError::Parse`] when the body is not valid JSON.
pub fn parse_preview(url: &str, body: &str) -> Result<Option<LinkPreview>, PreviewError> {
    let resp: PreviewResponse = serde_json::from_str(body).map_err(|e| PreviewError::Parse(e.to_string()))?;
    let Some(title) = non_blank(resp.title) else {
        return Ok(None);
    };
    Ok(Some(LinkPreview {
        url: url.to_string(),
        title,
        description: non_blank(resp.description),
        site_name: non_blank(resp.site_name),
        image: resp.images.into_iter().find(|i| !i.trim().is_empty()),
    }))
}

// =============================================================================
// URL EXTRACTION
// =============================================================================

/// Distinct `http(s)` URLs in `text`, in order of first appearance.
#[must_use]
pub fn extract_urls(text: &str) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for token in text.split_whitespace() {
        if !(token.starts_with("http://") || token.starts_with("https://")) {
            continue;
        }
        let candidate = token.trim_end_matches(TRAILING_PUNCTUATION);
        let Ok(url) = Url::parse(candidate) else {
            continue;
        };
        if url.host_str().is_none() {
            continue;
        }
        let candidate = candidate.to_string();
        if !out.contains(&candidate) {
            out.push(candidate);
        }
    }
    out
}

// =============================================================================
// CLIENT
// =============================================================================

pub struct PreviewClient {
    http: reqwest::Client,
    endpoint: String,
}

impl PreviewClient {
    /// # Errors
    ///
    /// Returns [`PreviewError::HttpClientBuild`] if the HTTP client fails to
    /// initialize.
    pub fn new(config: &PreviewConfig) -> Result<Self, PreviewError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .connect_timeout(Duration::from_secs(CONNECT_TIMEOUT_SECS))
            .build()
            .map_err(|e| PreviewError::HttpClientBuild(e.to_string()))?;
        Ok(Self { http, endpoint: format!("{}/preview", config.base_url) })
    }

    /// Fetch one preview.
    ///
    /// # Errors
    ///
    /// Transport, status and parse failures.
    pub async fn fetch(&self, url: &str) -> Result<Option<LinkPreview>, PreviewError> {
        let response = self
            .http
            .get(&self.endpoint)
            .query(&[("url", url)])
            .send()
            .await
            .map_err(|e| PreviewError::Request(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(PreviewError::Status(status.as_u16()));
        }
        let text = response
            .text()
            .await
            .map_err(|e| PreviewError::Request(e.to_string()))?;
        parse_preview(url, &text)
    }

    /// Previews for every URL in `text`, fetched concurrently. Failures and
    /// title-less responses are dropped.
    pub async fn previews_for(&self, text: &str) -> Vec<LinkPreview> {
        let urls = extract_urls(text);
        if urls.is_empty() {
            return Vec::new();
        }
        let results = join_all(urls.iter().map(|u| self.fetch(u))).await;
        urls.iter()
            .zip(results)
            .filter_map(|(url, result)| match result {
                Ok(preview) => preview,
                Err(e) => {
                    debug!(%url, error = %e, "link preview dropped");
                    None
                }
            })
            .collect()
    }
}
