//! GitHub REST API client with transparent pagination
//!
//! This module provides:
//! - Authenticated GET with Basic auth and a client-identifying User-Agent
//! - Follow-the-next-link pagination over the `Link` response header,
//!   bounded by a configurable page ceiling
//! - Bounded retry with exponential backoff on transient failures
//! - Typed helpers for the handful of endpoints the catalog sync needs

use crate::config::GithubConfig;
use crate::error::{Error, Result};
use crate::models::{OrgRepo, Release, RepoFile, TreeResponse};
use base64::Engine;
use reqwest::{Client, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

/// Remote API client handle
pub struct GithubClient {
    client: Client,
    api_url: String,
    username: String,
    token: Option<String>,
    max_pages: usize,
    max_retries: u32,
    retry_backoff: Duration,
    per_page: u32,
}

impl GithubClient {
    /// Create a client from configuration, resolving the token from the
    /// environment once up front.
    pub fn new(config: &GithubConfig) -> Result<Self> {
        // Validate the base early so a bad config fails at startup, not mid-run
        let api_url = Url::parse(&config.api_url)?;

        let client = Client::builder()
            .user_agent(&config.user_agent)
            .timeout(Duration::from_secs(config.timeout_secs))
            .gzip(true)
            .build()?;

        Ok(Self {
            client,
            api_url: api_url.as_str().trim_end_matches('/').to_string(),
            username: config.username.clone(),
            token: config.resolve_token(),
            max_pages: config.max_pages,
            max_retries: config.max_retries,
            retry_backoff: Duration::from_millis(config.retry_backoff_ms),
            per_page: config.per_page,
        })
    }

    /// Build a fully-qualified API URL from a path
    pub fn url(&self, path: &str) -> String {
        format!("{}/{}", self.api_url, path.trim_start_matches('/'))
    }

    async fn send(&self, url: &str) -> reqwest::Result<Response> {
        let mut request = self
            .client
            .get(url)
            .header(reqwest::header::ACCEPT, "application/vnd.github+json");
        if let Some(token) = &self.token {
            request = request.basic_auth(&self.username, Some(token));
        }
        request.send().await
    }

    /// Issue one GET, retrying transient failures (connect/timeout errors,
    /// HTTP 5xx and 429) up to the configured attempt limit.
    async fn get_with_retry(&self, url: &str) -> Result<Response> {
        let mut attempt = 0u32;
        loop {
            match self.send(url).await {
                Ok(response) => {
                    let status = response.status();
                    let transient =
                        status.is_server_error() || status == StatusCode::TOO_MANY_REQUESTS;
                    if transient && attempt < self.max_retries {
                        attempt += 1;
                        let delay = self.backoff_delay(attempt);
                        warn!(
                            "HTTP {} from {}; retrying in {:?} (attempt {}/{})",
                            status, url, delay, attempt, self.max_retries
                        );
                        tokio::time::sleep(delay).await;
                        continue;
                    }
                    if !status.is_success() {
                        return Err(Error::Status {
                            url: url.to_string(),
                            status,
                        });
                    }
                    return Ok(response);
                }
                Err(e) if attempt < self.max_retries && (e.is_connect() || e.is_timeout()) => {
                    attempt += 1;
                    let delay = self.backoff_delay(attempt);
                    warn!(
                        "Request to {} failed ({}); retrying in {:?} (attempt {}/{})",
                        url, e, delay, attempt, self.max_retries
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(e) => return Err(e.into()),
            }
        }
    }

    fn backoff_delay(&self, attempt: u32) -> Duration {
        self.retry_backoff * 2u32.saturating_pow(attempt.saturating_sub(1))
    }

    /// Fetch a single resource
    pub async fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T> {
        debug!("GET {}", url);
        let response = self.get_with_retry(url).await?;
        Ok(response.json().await?)
    }

    /// Fetch a single resource where 404 is expected absence
    pub async fn get_optional<T: DeserializeOwned>(&self, url: &str) -> Result<Option<T>> {
        match self.get_json(url).await {
            Ok(value) => Ok(Some(value)),
            Err(e) if e.is_not_found() => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Fetch a collection, following the `Link: rel="next"` relation and
    /// concatenating items across pages, in order. Iteration stops when no
    /// next relation remains or the configured page ceiling is reached.
    pub async fn get_paged<T: DeserializeOwned>(&self, url: &str) -> Result<Vec<T>> {
        let mut items = Vec::new();
        let mut next = Some(url.to_string());
        let mut pages = 0usize;

        while let Some(page_url) = next {
            if pages >= self.max_pages {
                warn!(
                    "Stopping pagination after {} pages; next link ignored: {}",
                    pages, page_url
                );
                break;
            }
            debug!("GET {} (page {})", page_url, pages + 1);
            let response = self.get_with_retry(&page_url).await?;
            next = response
                .headers()
                .get(reqwest::header::LINK)
                .and_then(|v| v.to_str().ok())
                .and_then(parse_next_link);
            let page: Vec<T> = response.json().await?;
            items.extend(page);
            pages += 1;
        }

        Ok(items)
    }

    // ===== Typed endpoints used by the catalog sync =====

    /// Recursive tree listing of a repository at a git ref
    pub async fn repo_tree(&self, owner: &str, repo: &str, git_ref: &str) -> Result<TreeResponse> {
        self.get_json(&self.url(&format!(
            "repos/{}/{}/git/trees/{}?recursive=1",
            owner, repo, git_ref
        )))
        .await
    }

    /// File contents at the repository's default location; `None` when absent
    pub async fn file_contents(
        &self,
        owner: &str,
        repo: &str,
        path: &str,
    ) -> Result<Option<RepoFile>> {
        self.get_optional(&self.url(&format!("repos/{}/{}/contents/{}", owner, repo, path)))
            .await
    }

    /// All repositories of an organization
    pub async fn org_repos(&self, org: &str) -> Result<Vec<OrgRepo>> {
        self.get_paged(&self.url(&format!("orgs/{}/repos?per_page={}", org, self.per_page)))
            .await
    }

    /// Watcher collection of a repository (counted, not trusted from the
    /// repo object, since the remote's own field is unreliable)
    pub async fn repo_watchers(&self, owner: &str, repo: &str) -> Result<Vec<Value>> {
        self.get_paged(&self.url(&format!(
            "repos/{}/{}/watchers?per_page={}",
            owner, repo, self.per_page
        )))
        .await
    }

    /// Open pull requests of a repository
    pub async fn open_pulls(&self, owner: &str, repo: &str) -> Result<Vec<Value>> {
        self.get_paged(&self.url(&format!(
            "repos/{}/{}/pulls?per_page={}",
            owner, repo, self.per_page
        )))
        .await
    }

    /// Full release listing, newest first
    pub async fn releases(&self, owner: &str, repo: &str) -> Result<Vec<Release>> {
        self.get_paged(&self.url(&format!(
            "repos/{}/{}/releases?per_page={}",
            owner, repo, self.per_page
        )))
        .await
    }

    /// Most recent release; `None` when the repository has never released
    pub async fn latest_release(&self, owner: &str, repo: &str) -> Result<Option<Release>> {
        self.get_optional(&self.url(&format!("repos/{}/{}/releases/latest", owner, repo)))
            .await
    }
}

/// Extract the `rel="next"` target from a `Link` response header.
/// Pure so "no more pages" detection is testable without network state.
pub fn parse_next_link(header: &str) -> Option<String> {
    for part in header.split(',') {
        let mut sections = part.trim().split(';');
        let Some(target) = sections.next() else {
            continue;
        };
        let target = target.trim();
        if !(target.starts_with('<') && target.ends_with('>')) {
            continue;
        }
        if sections.any(|p| p.trim() == r#"rel="next""#) {
            return Some(target[1..target.len() - 1].to_string());
        }
    }
    None
}

/// Decode a content-API payload: base64 with embedded newlines.
pub fn decode_content(encoded: &str) -> Result<String> {
    let cleaned: String = encoded
        .chars()
        .filter(|c| !c.is_ascii_whitespace())
        .collect();
    let bytes = base64::engine::general_purpose::STANDARD.decode(cleaned)?;
    Ok(String::from_utf8(bytes)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn test_config(base: &str) -> GithubConfig {
        GithubConfig {
            api_url: base.to_string(),
            username: "ci".to_string(),
            token_env: "MODCAT_TEST_TOKEN_UNSET".to_string(),
            user_agent: "modcat-tests".to_string(),
            timeout_secs: 5,
            max_pages: 10,
            max_retries: 2,
            retry_backoff_ms: 1,
            per_page: 100,
        }
    }

    #[test]
    fn test_parse_next_link() {
        let header = r#"<https://api.example.com/repos?page=3>; rel="prev", <https://api.example.com/repos?page=5>; rel="next", <https://api.example.com/repos?page=9>; rel="last""#;
        assert_eq!(
            parse_next_link(header).as_deref(),
            Some("https://api.example.com/repos?page=5")
        );

        let no_next = r#"<https://api.example.com/repos?page=1>; rel="first""#;
        assert_eq!(parse_next_link(no_next), None);

        assert_eq!(parse_next_link(""), None);
        assert_eq!(parse_next_link("garbage; rel=\"next\""), None);
    }

    #[test]
    fn test_decode_content_with_newlines() {
        // "name: fastqc\n" encoded the way the content API returns it,
        // wrapped with embedded newlines
        let encoded = "bmFtZTog\nZmFzdHFj\nCg==\n";
        assert_eq!(decode_content(encoded).unwrap(), "name: fastqc\n");
    }

    #[tokio::test]
    async fn test_paged_concatenates_all_pages_in_order() {
        let server = MockServer::start().await;
        let base = server.uri();

        Mock::given(method("GET"))
            .and(path("/items"))
            .and(query_param("page", "1"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header(
                        "Link",
                        format!(r#"<{}/items?page=2>; rel="next""#, base).as_str(),
                    )
                    .set_body_json(json!([1, 2])),
            )
            .mount(&server)
            .await;

        Mock::given(method("GET"))
            .and(path("/items"))
            .and(query_param("page", "2"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header(
                        "Link",
                        format!(r#"<{}/items?page=3>; rel="next""#, base).as_str(),
                    )
                    .set_body_json(json!([3, 4])),
            )
            .mount(&server)
            .await;

        Mock::given(method("GET"))
            .and(path("/items"))
            .and(query_param("page", "3"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([5])))
            .mount(&server)
            .await;

        let client = GithubClient::new(&test_config(&base)).unwrap();
        let items: Vec<i64> = client
            .get_paged(&format!("{}/items?page=1", base))
            .await
            .unwrap();
        assert_eq!(items, vec![1, 2, 3, 4, 5]);
    }

    #[tokio::test]
    async fn test_paged_respects_page_ceiling() {
        let server = MockServer::start().await;
        let base = server.uri();

        // Every page points at itself: a malformed next relation that would
        // loop forever without the ceiling.
        Mock::given(method("GET"))
            .and(path("/loop"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("Link", format!(r#"<{}/loop>; rel="next""#, base).as_str())
                    .set_body_json(json!([1])),
            )
            .mount(&server)
            .await;

        let mut config = test_config(&base);
        config.max_pages = 3;
        let client = GithubClient::new(&config).unwrap();
        let items: Vec<i64> = client.get_paged(&format!("{}/loop", base)).await.unwrap();
        assert_eq!(items, vec![1, 1, 1]);
    }

    #[tokio::test]
    async fn test_optional_returns_none_on_404() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/missing"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let client = GithubClient::new(&test_config(&server.uri())).unwrap();
        let result: Option<Value> = client
            .get_optional(&format!("{}/missing", server.uri()))
            .await
            .unwrap();
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn test_non_success_is_a_typed_error() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/forbidden"))
            .respond_with(ResponseTemplate::new(403))
            .mount(&server)
            .await;

        let client = GithubClient::new(&test_config(&server.uri())).unwrap();
        let err = client
            .get_json::<Value>(&format!("{}/forbidden", server.uri()))
            .await
            .unwrap_err();
        match err {
            Error::Status { status, .. } => assert_eq!(status, StatusCode::FORBIDDEN),
            other => panic!("expected status error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_transient_server_error_is_retried() {
        let server = MockServer::start().await;

        // First request fails with 500, the retry succeeds
        Mock::given(method("GET"))
            .and(path("/flaky"))
            .respond_with(ResponseTemplate::new(500))
            .up_to_n_times(1)
            .mount(&server)
            .await;

        Mock::given(method("GET"))
            .and(path("/flaky"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"ok": true})))
            .mount(&server)
            .await;

        let client = GithubClient::new(&test_config(&server.uri())).unwrap();
        let value: Value = client
            .get_json(&format!("{}/flaky", server.uri()))
            .await
            .unwrap();
        assert_eq!(value["ok"], json!(true));
    }
}
