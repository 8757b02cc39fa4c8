//! HTTP feed fetcher.
//!
//! Retrieves calendar feeds with a plain GET. `webcal://` links are fetched
//! over HTTPS.

use std::time::Duration;

use calmerge_core::Source;
use reqwest::{Client, Response, StatusCode};
use tracing::{debug, trace, warn};
use url::Url;

use crate::error::{ProviderError, ProviderResult};
use crate::provider::{BoxFuture, FeedFetcher};

/// Configuration for the HTTP fetcher.
#[derive(Debug, Clone)]
pub struct FetcherConfig {
    /// Upper bound on one request, connect and body included.
    pub timeout: Duration,

    /// User agent string.
    pub user_agent: String,

    /// Whether to verify TLS certificates.
    pub verify_tls: bool,
}

impl FetcherConfig {
    /// Default timeout in seconds.
    pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

    /// Creates a configuration with the default timeout and user agent.
    pub fn new() -> Self {
        Self {
            timeout: Duration::from_secs(Self::DEFAULT_TIMEOUT_SECS),
            user_agent: format!("calmerge/{}", env!("CARGO_PKG_VERSION")),
            verify_tls: true,
        }
    }

    /// Sets the request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Sets whether TLS certificates are verified.
    pub fn with_verify_tls(mut self, verify_tls: bool) -> Self {
        self.verify_tls = verify_tls;
        self
    }
}

impl Default for FetcherConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Fetches feeds over HTTP(S).
pub struct HttpFeedFetcher {
    client: Client,
    timeout: Duration,
}

impl HttpFeedFetcher {
    /// Creates a new fetcher with the given configuration.
    pub fn new(config: FetcherConfig) -> ProviderResult<Self> {
        let client = Client::builder()
            .danger_accept_invalid_certs(!config.verify_tls)
            .timeout(config.timeout)
            .user_agent(&config.user_agent)
            .build()
            .map_err(|e| {
                ProviderError::configuration(format!("Failed to create HTTP client: {}", e))
                    .with_cause(e)
            })?;

        if !config.verify_tls {
            warn!("TLS certificate verification is disabled");
        }

        Ok(Self {
            client,
            timeout: config.timeout,
        })
    }

    /// Performs a GET request and returns the body.
    pub async fn get(&self, url: &str) -> ProviderResult<String> {
        let url = resolve_feed_url(url)?;
        trace!(url = %url, "Sending request");

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| self.transport_error("Request failed", e))?;

        self.handle_response(response).await
    }

    /// Handles the HTTP response and extracts the body.
    async fn handle_response(&self, response: Response) -> ProviderResult<String> {
        let status = response.status();
        trace!(status = %status, "Received response");

        match status {
            s if s.is_success() => {
                let bytes = response
                    .bytes()
                    .await
                    .map_err(|e| self.transport_error("Failed to read response", e))?;
                Ok(decode_body(bytes.to_vec()))
            }
            StatusCode::UNAUTHORIZED => Err(ProviderError::authentication(format!(
                "HTTP {}: feed requires authentication",
                status.as_u16()
            ))),
            StatusCode::FORBIDDEN => Err(ProviderError::authorization(format!(
                "HTTP {}: access to feed denied",
                status.as_u16()
            ))),
            StatusCode::NOT_FOUND => Err(ProviderError::not_found(format!(
                "HTTP {}: feed not found",
                status.as_u16()
            ))),
            StatusCode::TOO_MANY_REQUESTS => Err(ProviderError::rate_limited(format!(
                "HTTP {}: too many requests",
                status.as_u16()
            ))),
            s if s.is_server_error() => Err(ProviderError::server(format!(
                "HTTP {}",
                s.as_u16()
            ))),
            s => {
                warn!(status = %s, "Unexpected response status");
                Err(ProviderError::invalid_response(format!(
                    "HTTP {}",
                    s.as_u16()
                )))
            }
        }
    }

    fn transport_error(&self, context: &str, e: reqwest::Error) -> ProviderError {
        if e.is_timeout() {
            ProviderError::timeout(format!(
                "{}: no response within {}s",
                context,
                self.timeout.as_secs_f32()
            ))
            .with_cause(e)
        } else {
            ProviderError::network(format!("{}: {}", context, e)).with_cause(e)
        }
    }
}

impl FeedFetcher for HttpFeedFetcher {
    fn name(&self) -> &str {
        "http"
    }

    fn fetch_raw<'a>(&'a self, source: &'a Source) -> BoxFuture<'a, ProviderResult<String>> {
        Box::pin(async move {
            debug!(source = %source.id, url = %source.url, "Fetching feed");
            self.get(&source.url).await
        })
    }
}

/// Turns a response body into text without touching valid UTF-8.
///
/// A byte order mark is kept. Invalid sequences are replaced rather than
/// failing the whole feed.
fn decode_body(bytes: Vec<u8>) -> String {
    match String::from_utf8(bytes) {
        Ok(text) => text,
        Err(e) => {
            debug!(error = %e, "Feed is not valid UTF-8, decoding lossily");
            String::from_utf8_lossy(e.as_bytes()).into_owned()
        }
    }
}

/// Parses a feed URL, mapping `webcal://` to `https://`.
pub fn resolve_feed_url(url: &str) -> ProviderResult<Url> {
    let url = url.trim();
    let rewritten = match url.get(..9) {
        Some(prefix) if prefix.eq_ignore_ascii_case("webcal://") => {
            format!("https://{}", &url[9..])
        }
        _ => url.to_string(),
    };

    let parsed = Url::parse(&rewritten).map_err(|e| {
        ProviderError::configuration(format!("Invalid feed URL '{}': {}", url, e)).with_cause(e)
    })?;

    match parsed.scheme() {
        "http" | "https" => Ok(parsed),
        other => Err(ProviderError::configuration(format!(
            "Unsupported URL scheme '{}'",
            other
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ProviderErrorCode;
    use wiremock::matchers::{header_exists, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const ICS: &str = "BEGIN:VCALENDAR\r\nVERSION:2.0\r\nEND:VCALENDAR\r\n";

    fn fetcher() -> HttpFeedFetcher {
        HttpFeedFetcher::new(FetcherConfig::new().with_timeout(Duration::from_secs(5))).unwrap()
    }

    fn source(url: String) -> Source {
        Source::new("test", "Test", url)
    }

    #[test]
    fn config_defaults() {
        let config = FetcherConfig::default();
        assert_eq!(config.timeout, Duration::from_secs(30));
        assert!(config.user_agent.starts_with("calmerge/"));
        assert!(config.verify_tls);
    }

    #[test]
    fn webcal_is_fetched_over_https() {
        let url = resolve_feed_url("webcal://calendar.example.com/feed.ics").unwrap();
        assert_eq!(url.as_str(), "https://calendar.example.com/feed.ics");

        let url = resolve_feed_url("WEBCAL://calendar.example.com/feed.ics").unwrap();
        assert_eq!(url.scheme(), "https");
    }

    #[test]
    fn http_urls_are_unchanged() {
        let url = resolve_feed_url("http://localhost:8080/a.ics").unwrap();
        assert_eq!(url.as_str(), "http://localhost:8080/a.ics");
    }

    #[test]
    fn bad_urls_are_configuration_errors() {
        let err = resolve_feed_url("ftp://example.com/a.ics").unwrap_err();
        assert_eq!(err.code(), ProviderErrorCode::ConfigurationError);

        let err = resolve_feed_url("not a url").unwrap_err();
        assert_eq!(err.code(), ProviderErrorCode::ConfigurationError);
    }

    #[tokio::test]
    async fn fetch_returns_body_unchanged() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/cal.ics"))
            .and(header_exists("user-agent"))
            .respond_with(ResponseTemplate::new(200).set_body_string(ICS))
            .mount(&server)
            .await;

        let src = source(format!("{}/cal.ics", server.uri()));
        let body = fetcher().fetch_raw(&src).await.unwrap();
        assert_eq!(body, ICS);
    }

    #[tokio::test]
    async fn body_bytes_are_kept_as_sent() {
        let server = MockServer::start().await;
        let body = format!("\u{feff}{}", ICS);
        Mock::given(method("GET"))
            .and(path("/bom.ics"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_raw(body.clone().into_bytes(), "text/calendar; charset=utf-8"),
            )
            .mount(&server)
            .await;

        let src = source(format!("{}/bom.ics", server.uri()));
        let fetched = fetcher().fetch_raw(&src).await.unwrap();
        assert_eq!(fetched.as_bytes(), body.as_bytes());
    }

    #[test]
    fn invalid_utf8_is_decoded_lossily() {
        let text = decode_body(b"SUMMARY:caf\xe9\r\n".to_vec());
        assert_eq!(text, "SUMMARY:caf\u{fffd}\r\n");
    }

    #[test]
    fn tls_verification_can_be_turned_off() {
        let config = FetcherConfig::new().with_verify_tls(false);
        assert!(!config.verify_tls);
        assert!(HttpFeedFetcher::new(config).is_ok());
    }

    #[tokio::test]
    async fn status_codes_are_mapped() {
        let server = MockServer::start().await;
        for (status, route) in [
            (401, "/unauthorized"),
            (403, "/forbidden"),
            (404, "/missing"),
            (429, "/busy"),
            (503, "/down"),
            (418, "/teapot"),
        ] {
            Mock::given(method("GET"))
                .and(path(route))
                .respond_with(ResponseTemplate::new(status))
                .mount(&server)
                .await;
        }

        let fetcher = fetcher();
        let expectations = [
            ("/unauthorized", ProviderErrorCode::AuthenticationFailed),
            ("/forbidden", ProviderErrorCode::AuthorizationFailed),
            ("/missing", ProviderErrorCode::NotFound),
            ("/busy", ProviderErrorCode::RateLimited),
            ("/down", ProviderErrorCode::ServerError),
            ("/teapot", ProviderErrorCode::InvalidResponse),
        ];

        for (route, code) in expectations {
            let src = source(format!("{}{}", server.uri(), route));
            let err = fetcher.fetch_raw(&src).await.unwrap_err();
            assert_eq!(err.code(), code, "route {}", route);
        }
    }

    #[tokio::test]
    async fn slow_feed_times_out() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string(ICS)
                    .set_delay(Duration::from_secs(3)),
            )
            .mount(&server)
            .await;

        let fetcher =
            HttpFeedFetcher::new(FetcherConfig::new().with_timeout(Duration::from_millis(200)))
                .unwrap();
        let src = source(format!("{}/slow.ics", server.uri()));
        let err = fetcher.fetch_raw(&src).await.unwrap_err();
        assert_eq!(err.code(), ProviderErrorCode::Timeout);
    }

    #[tokio::test]
    async fn unreachable_host_is_a_network_error() {
        // Bind then drop a listener so the port is very likely closed.
        let addr = {
            let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
            listener.local_addr().unwrap()
        };
        let src = source(format!("http://{}/cal.ics", addr));
        let err = fetcher().fetch_raw(&src).await.unwrap_err();
        assert_eq!(err.code(), ProviderErrorCode::NetworkError);
    }
}
