//! HTTP fetcher implementation
//!
//! This module handles all HTTP requests for the crawler, including:
//! - Building the shared HTTP client with the fixed browser-like header set
//! - GET requests for page content
//! - Redirect detection (redirects are never followed automatically; the
//!   worker records them as graph edges instead)
//! - Transport error capture
//!
//! Certificate verification is deliberately disabled: the crawler is pointed
//! at sites whose TLS setup is part of what a scan is meant to surface, and a
//! broken certificate must not hide the rest of the site's link graph.

use crate::config::HttpConfig;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, ACCEPT_ENCODING, ACCEPT_LANGUAGE, DNT, RANGE};
use reqwest::{redirect::Policy, Client};
use std::time::Duration;
use url::Url;

/// Outcome of fetching one URL
#[derive(Debug)]
pub enum FetchOutcome {
    /// The server answered with a non-redirect response
    Page {
        /// HTTP status code
        status_code: u16,
        /// Content-Type header value, if present
        content_type: Option<String>,
        /// Response body; only read for 2xx responses whose Content-Type is
        /// in the allowed set
        body: Option<String>,
    },

    /// The server answered with a 3xx carrying a Location header
    Redirect {
        /// HTTP status code
        status_code: u16,
        /// Raw Location header value
        location: String,
    },

    /// No usable HTTP response (DNS failure, timeout, TLS error, body read
    /// failure)
    TransportError {
        /// Error description
        error: String,
    },
}

/// Builds the shared HTTP client
///
/// The header set mimics a desktop browser so that servers vary their
/// responses the same way they would for a real visitor. The Range header
/// caps response bodies at 1 MB on servers that honor it.
///
/// # Arguments
///
/// * `config` - The HTTP transport configuration
///
/// # Returns
///
/// * `Ok(Client)` - Successfully built HTTP client
/// * `Err(reqwest::Error)` - Failed to build client
pub fn build_http_client(config: &HttpConfig) -> Result<Client, reqwest::Error> {
    let mut headers = HeaderMap::new();
    headers.insert(
        ACCEPT,
        HeaderValue::from_static(
            "text/html,application/xhtml+xml,application/xml;q=0.9,image/webp,*/*;q=0.8",
        ),
    );
    headers.insert(ACCEPT_ENCODING, HeaderValue::from_static("gzip, deflate, br"));
    headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("en-US,en;q=0.9"));
    headers.insert(RANGE, HeaderValue::from_static("bytes=0-1000000"));
    headers.insert(
        "Upgrade-Insecure-Requests",
        HeaderValue::from_static("1"),
    );
    headers.insert(DNT, HeaderValue::from_static("1"));

    Client::builder()
        .user_agent(config.user_agent.clone())
        .default_headers(headers)
        .timeout(Duration::from_secs(config.timeout_secs))
        .redirect(Policy::none()) // Redirects become graph edges
        .danger_accept_invalid_certs(true)
        .gzip(true)
        .brotli(true)
        .build()
}

/// Fetches a URL and classifies the response
///
/// The body is read only when the response is 2xx and its Content-Type is an
/// exact match against the allowed set; everything else is recorded by status
/// and header alone.
///
/// # Arguments
///
/// * `client` - The shared HTTP client
/// * `url` - The canonical URL to fetch
/// * `allowed_content_types` - Content types whose bodies are parsed
pub async fn fetch_url(
    client: &Client,
    url: &Url,
    allowed_content_types: &[String],
) -> FetchOutcome {
    let response = match client.get(url.as_str()).send().await {
        Ok(response) => response,
        Err(e) => {
            return FetchOutcome::TransportError {
                error: e.to_string(),
            }
        }
    };

    let status = response.status();

    if status.is_redirection() {
        if let Some(location) = response
            .headers()
            .get("location")
            .and_then(|v| v.to_str().ok())
        {
            return FetchOutcome::Redirect {
                status_code: status.as_u16(),
                location: location.to_string(),
            };
        }
        // A 3xx without a Location header is recorded like any other page.
    }

    let content_type = response
        .headers()
        .get("content-type")
        .and_then(|v| v.to_str().ok())
        .map(|v| v.to_string());

    let parseable = status.is_success()
        && content_type
            .as_deref()
            .map(|ct| allowed_content_types.iter().any(|allowed| allowed == ct))
            .unwrap_or(false);

    if !parseable {
        return FetchOutcome::Page {
            status_code: status.as_u16(),
            content_type,
            body: None,
        };
    }

    match response.text().await {
        Ok(body) => FetchOutcome::Page {
            status_code: status.as_u16(),
            content_type,
            body: Some(body),
        },
        Err(e) => FetchOutcome::TransportError {
            error: e.to_string(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::HttpConfig;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client() -> Client {
        build_http_client(&HttpConfig::default()).unwrap()
    }

    #[test]
    fn test_build_http_client() {
        let config = HttpConfig::default();
        assert!(build_http_client(&config).is_ok());
    }

    #[tokio::test]
    async fn test_fetch_html_page() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/page"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_raw("<html><body>hi</body></html>", "text/html"),
            )
            .mount(&server)
            .await;

        let url = Url::parse(&format!("{}/page", server.uri())).unwrap();
        let allowed = HttpConfig::default().allowed_content_types;
        let outcome = fetch_url(&client(), &url, &allowed).await;

        match outcome {
            FetchOutcome::Page {
                status_code,
                content_type,
                body,
            } => {
                assert_eq!(status_code, 200);
                assert_eq!(content_type.as_deref(), Some("text/html"));
                assert!(body.unwrap().contains("hi"));
            }
            other => panic!("expected page, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_disallowed_content_type_body_skipped() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/data.json"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("content-type", "application/json")
                    .set_body_string("{}"),
            )
            .mount(&server)
            .await;

        let url = Url::parse(&format!("{}/data.json", server.uri())).unwrap();
        let allowed = HttpConfig::default().allowed_content_types;
        let outcome = fetch_url(&client(), &url, &allowed).await;

        match outcome {
            FetchOutcome::Page {
                status_code, body, ..
            } => {
                assert_eq!(status_code, 200);
                assert!(body.is_none());
            }
            other => panic!("expected page, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_content_type_match_is_exact() {
        // "text/html;charset=utf-8" (no space) is not in the allowed set.
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/page"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("content-type", "text/html;charset=utf-8")
                    .set_body_string("<html></html>"),
            )
            .mount(&server)
            .await;

        let url = Url::parse(&format!("{}/page", server.uri())).unwrap();
        let allowed = HttpConfig::default().allowed_content_types;
        let outcome = fetch_url(&client(), &url, &allowed).await;

        match outcome {
            FetchOutcome::Page { body, .. } => assert!(body.is_none()),
            other => panic!("expected page, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_redirect_not_followed() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/old"))
            .respond_with(ResponseTemplate::new(301).insert_header("location", "/new"))
            .mount(&server)
            .await;

        let url = Url::parse(&format!("{}/old", server.uri())).unwrap();
        let allowed = HttpConfig::default().allowed_content_types;
        let outcome = fetch_url(&client(), &url, &allowed).await;

        match outcome {
            FetchOutcome::Redirect {
                status_code,
                location,
            } => {
                assert_eq!(status_code, 301);
                assert_eq!(location, "/new");
            }
            other => panic!("expected redirect, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_http_error_recorded_without_body() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/missing"))
            .respond_with(
                ResponseTemplate::new(404).insert_header("content-type", "text/html"),
            )
            .mount(&server)
            .await;

        let url = Url::parse(&format!("{}/missing", server.uri())).unwrap();
        let allowed = HttpConfig::default().allowed_content_types;
        let outcome = fetch_url(&client(), &url, &allowed).await;

        match outcome {
            FetchOutcome::Page {
                status_code, body, ..
            } => {
                assert_eq!(status_code, 404);
                assert!(body.is_none());
            }
            other => panic!("expected page, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_connection_failure_is_transport_error() {
        // Port 1 is never listening.
        let url = Url::parse("http://127.0.0.1:1/").unwrap();
        let allowed = HttpConfig::default().allowed_content_types;
        let outcome = fetch_url(&client(), &url, &allowed).await;

        assert!(matches!(outcome, FetchOutcome::TransportError { .. }));
    }
}
