//! HTTP fetcher implementation
//!
//! This module handles all HTTP requests for the crawler, including:
//! - Building the HTTP client with the configured user agent and timeout
//! - GET requests (redirects followed, at most 10 hops)
//! - Scoped clients that refuse to follow a redirect out of the crawl scope
//! - Error classification into status, timeout and network failures
//!
//! There is no retry: a failed fetch is reported once and the item is dropped.

use crate::url::ScopePolicy;
use reqwest::{header::CONTENT_TYPE, redirect::Policy, Client};
use std::time::Duration;
use thiserror::Error;
use url::Url;

/// Maximum number of redirects followed for one request
const MAX_REDIRECTS: usize = 10;

/// A failed fetch
#[derive(Debug, Clone, Error)]
pub enum FetchError {
    /// The server answered with a non-2xx status
    #[error("HTTP {status_code} for {url}")]
    Status { url: String, status_code: u16 },

    /// The request did not complete within the configured timeout
    #[error("Request timeout for {url}")]
    Timeout { url: String },

    /// Connection, TLS, redirect or body read failure
    #[error("Network error for {url}: {message}")]
    Network { url: String, message: String },
}

impl FetchError {
    /// HTTP status code, if the server answered at all
    pub fn status_code(&self) -> Option<u16> {
        match self {
            FetchError::Status { status_code, .. } => Some(*status_code),
            FetchError::Timeout { .. } | FetchError::Network { .. } => None,
        }
    }

    fn from_reqwest(url: &Url, error: reqwest::Error) -> Self {
        if error.is_timeout() {
            FetchError::Timeout {
                url: url.to_string(),
            }
        } else if error.is_connect() {
            FetchError::Network {
                url: url.to_string(),
                message: "Connection refused".to_string(),
            }
        } else {
            FetchError::Network {
                url: url.to_string(),
                message: error.to_string(),
            }
        }
    }
}

/// A successfully fetched document
#[derive(Debug, Clone)]
pub struct FetchedPage {
    /// Final URL after redirects
    pub final_url: Url,
    /// HTTP status code (always 2xx)
    pub status_code: u16,
    /// Content-Type header value, if present
    pub content_type: Option<String>,
    /// Raw body bytes
    pub body: Vec<u8>,
}

impl FetchedPage {
    /// Returns true if the document should be parsed as HTML
    pub fn is_html(&self) -> bool {
        is_html(self.content_type.as_deref(), &self.body)
    }
}

/// Classifies a response as HTML
///
/// A Content-Type header decides on its own (it contains `html`). Without one,
/// the start of the body is sniffed for `<!doctype html` or `<html`.
pub fn is_html(content_type: Option<&str>, body: &[u8]) -> bool {
    if let Some(content_type) = content_type {
        return content_type.to_ascii_lowercase().contains("html");
    }

    let head = &body[..body.len().min(512)];
    let head = String::from_utf8_lossy(head);
    let head = head.trim_start_matches('\u{feff}').trim_start().to_ascii_lowercase();
    head.starts_with("<!doctype html") || head.starts_with("<html")
}

/// Builds an HTTP client with proper configuration
///
/// # Arguments
///
/// * `user_agent` - The User-Agent header sent with every request (robots.txt included)
/// * `timeout` - Total timeout for one request, body included
///
/// # Example
///
/// ```no_run
/// use std::time::Duration;
/// use sumi_mirror::crawler::build_http_client;
///
/// let client = build_http_client("sumi-mirror/1.0", Duration::from_secs(30)).unwrap();
/// ```
pub fn build_http_client(user_agent: &str, timeout: Duration) -> Result<Client, reqwest::Error> {
    build_client(user_agent, timeout, Policy::limited(MAX_REDIRECTS))
}

/// Builds an HTTP client that only follows in-scope redirects
///
/// A redirect whose target is out of scope is not followed; the 3xx response
/// itself is returned and surfaces as [`FetchError::Status`].
pub fn build_scoped_http_client(
    user_agent: &str,
    timeout: Duration,
    scope: ScopePolicy,
) -> Result<Client, reqwest::Error> {
    build_client(user_agent, timeout, scoped_redirect_policy(scope))
}

fn scoped_redirect_policy(scope: ScopePolicy) -> Policy {
    Policy::custom(move |attempt| {
        if attempt.previous().len() > MAX_REDIRECTS {
            attempt.error("too many redirects")
        } else if !scope.in_scope(attempt.url()) {
            tracing::debug!("Not following redirect out of scope: {}", attempt.url());
            attempt.stop()
        } else {
            attempt.follow()
        }
    })
}

fn build_client(user_agent: &str, timeout: Duration, redirect: Policy) -> Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(user_agent)
        .timeout(timeout)
        .connect_timeout(timeout.min(Duration::from_secs(10)))
        .redirect(redirect)
        .gzip(true)
        .brotli(true)
        .build()
}

/// HTTP transport shared by all workers
///
/// Cloning is cheap; clones share one connection pool.
#[derive(Debug, Clone)]
pub struct Fetcher {
    client: Client,
}

impl Fetcher {
    /// Creates a fetcher with a freshly built client
    pub fn new(user_agent: &str, timeout: Duration) -> Result<Self, reqwest::Error> {
        Ok(Self {
            client: build_http_client(user_agent, timeout)?,
        })
    }

    /// Creates a fetcher whose redirects stay within `scope`
    pub fn scoped(user_agent: &str, timeout: Duration, scope: ScopePolicy) -> Result<Self, reqwest::Error> {
        Ok(Self {
            client: build_scoped_http_client(user_agent, timeout, scope)?,
        })
    }

    /// Wraps an existing client
    pub fn with_client(client: Client) -> Self {
        Self { client }
    }

    /// Fetches a URL with a single GET
    ///
    /// # Returns
    ///
    /// * `Ok(FetchedPage)` - A 2xx response with its full body
    /// * `Err(FetchError)` - Non-2xx status, timeout or network failure
    pub async fn fetch(&self, url: &Url) -> Result<FetchedPage, FetchError> {
        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|e| FetchError::from_reqwest(url, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status_code: status.as_u16(),
            });
        }

        let final_url = response.url().clone();
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);

        let body = response
            .bytes()
            .await
            .map_err(|e| FetchError::from_reqwest(url, e))?;

        Ok(FetchedPage {
            final_url,
            status_code: status.as_u16(),
            content_type,
            body: body.to_vec(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn fetcher() -> Fetcher {
        Fetcher::new("TestCrawler/1.0", Duration::from_secs(5)).unwrap()
    }

    #[test]
    fn test_build_http_client() {
        let client = build_http_client("TestCrawler/1.0", Duration::from_secs(30));
        assert!(client.is_ok());
    }

    #[test]
    fn test_is_html_by_content_type() {
        assert!(is_html(Some("text/html; charset=utf-8"), b""));
        assert!(is_html(Some("application/xhtml+xml"), b""));
        assert!(!is_html(Some("text/css"), b"<html>"));
    }

    #[test]
    fn test_is_html_sniffed_without_header() {
        assert!(is_html(None, b"<!DOCTYPE html><html></html>"));
        assert!(is_html(None, b"\n  <html lang=\"en\">"));
        assert!(!is_html(None, b"\x89PNG\r\n"));
        assert!(!is_html(None, b""));
    }

    #[test]
    fn test_fetch_error_status_code() {
        let status = FetchError::Status {
            url: "http://h/".to_string(),
            status_code: 404,
        };
        let timeout = FetchError::Timeout {
            url: "http://h/".to_string(),
        };
        assert_eq!(status.status_code(), Some(404));
        assert_eq!(timeout.status_code(), None);
    }

    #[tokio::test]
    async fn test_fetch_success_sends_user_agent() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/page"))
            .and(header("user-agent", "TestCrawler/1.0"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_raw(b"<html><body>hi</body></html>".to_vec(), "text/html"),
            )
            .expect(1)
            .mount(&server)
            .await;

        let url = Url::parse(&format!("{}/page", server.uri())).unwrap();
        let page = fetcher().fetch(&url).await.unwrap();

        assert_eq!(page.status_code, 200);
        assert_eq!(page.content_type.as_deref(), Some("text/html"));
        assert!(page.is_html());
        assert_eq!(page.body, b"<html><body>hi</body></html>");
    }

    #[tokio::test]
    async fn test_fetch_non_success_status() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/missing"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let url = Url::parse(&format!("{}/missing", server.uri())).unwrap();
        let err = fetcher().fetch(&url).await.unwrap_err();
        assert_eq!(err.status_code(), Some(404));
    }

    #[tokio::test]
    async fn test_fetch_follows_redirect() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/old"))
            .respond_with(
                ResponseTemplate::new(301).insert_header("location", "/new"),
            )
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/new"))
            .respond_with(ResponseTemplate::new(200).set_body_string("moved"))
            .mount(&server)
            .await;

        let url = Url::parse(&format!("{}/old", server.uri())).unwrap();
        let page = fetcher().fetch(&url).await.unwrap();
        assert_eq!(page.final_url.path(), "/new");
        assert_eq!(page.body, b"moved");
    }

    #[tokio::test]
    async fn test_scoped_fetch_stops_at_out_of_scope_redirect() {
        let site = MockServer::start().await;
        let elsewhere = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/go"))
            .respond_with(
                ResponseTemplate::new(302)
                    .insert_header("location", format!("{}/secret", elsewhere.uri()).as_str()),
            )
            .mount(&site)
            .await;
        Mock::given(method("GET"))
            .and(path("/secret"))
            .respond_with(ResponseTemplate::new(200).set_body_string("secret"))
            .expect(0)
            .mount(&elsewhere)
            .await;

        let site_host = format!("127.0.0.1:{}", site.address().port());
        let scope = ScopePolicy::new([site_host.as_str()]);
        let fetcher = Fetcher::scoped("TestCrawler/1.0", Duration::from_secs(5), scope).unwrap();

        let url = Url::parse(&format!("{}/go", site.uri())).unwrap();
        let err = fetcher.fetch(&url).await.unwrap_err();
        assert_eq!(err.status_code(), Some(302));
    }

    #[tokio::test]
    async fn test_scoped_fetch_follows_in_scope_redirect() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/old"))
            .respond_with(ResponseTemplate::new(302).insert_header("location", "/new"))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/new"))
            .respond_with(ResponseTemplate::new(200).set_body_string("here"))
            .mount(&server)
            .await;

        let scope = ScopePolicy::new(["127.0.0.1"]);
        let fetcher = Fetcher::scoped("TestCrawler/1.0", Duration::from_secs(5), scope).unwrap();

        let url = Url::parse(&format!("{}/old", server.uri())).unwrap();
        let page = fetcher.fetch(&url).await.unwrap();
        assert_eq!(page.final_url.path(), "/new");
    }

    #[tokio::test]
    async fn test_fetch_timeout() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(3)))
            .mount(&server)
            .await;

        let fetcher = Fetcher::new("TestCrawler/1.0", Duration::from_millis(200)).unwrap();
        let url = Url::parse(&format!("{}/slow", server.uri())).unwrap();
        let err = fetcher.fetch(&url).await.unwrap_err();
        assert!(matches!(err, FetchError::Timeout { .. }), "got {:?}", err);
    }
}
