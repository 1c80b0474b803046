//! A single authenticated HTTP attempt against the BambooHR gateway.
//!
//! The transport never judges status codes; it hands back whatever the server
//! said and leaves retries and error normalization to its callers. It fails
//! only when no response was obtained at all (timeout or network).

use std::error::Error as StdError;

use http::Extensions;
use reqwest::{
    Method, Request, Response, StatusCode,
    header::{ACCEPT, CONTENT_TYPE, HeaderMap},
};
use reqwest_middleware::{ClientBuilder, ClientWithMiddleware, Result as MiddlewareResult};
use reqwest_tracing::{
    ReqwestOtelSpanBackend, TracingMiddleware, default_on_request_end, reqwest_otel_span,
};
use serde_json::Value;
use tracing::Span;

use crate::mcp::{error::BambooHrError, http::config::ClientConfig};

// Span backend for outbound calls. Only method and URL are recorded; headers
// carry the API key and must never reach a span.
// Note: This struct is used via TracingMiddleware<BambooHrSpan>, but Rust can't
// detect this usage statically, hence the dead_code attribute.
#[allow(dead_code)]
struct BambooHrSpan;

impl ReqwestOtelSpanBackend for BambooHrSpan {
    fn on_request_start(req: &Request, _extension: &mut Extensions) -> Span {
        reqwest_otel_span!(name = "bamboohr-api-request", req)
    }

    fn on_request_end(
        span: &Span,
        outcome: &MiddlewareResult<Response>,
        _extension: &mut Extensions,
    ) {
        default_on_request_end(span, outcome);
    }
}

/// What the caller wants back from the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Accept {
    /// `Accept: application/json`.
    Json,
    /// No `Accept` restriction; used for raw image bytes.
    Any,
}

/// Status, headers and fully-read body of one response.
#[derive(Debug, Clone)]
pub struct RawResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Vec<u8>,
}

impl RawResponse {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name)?.to_str().ok()
    }
}

pub struct HttpTransport {
    http: ClientWithMiddleware,
    base_url: String,
    api_key: String,
    timeout: std::time::Duration,
}

impl HttpTransport {
    /// # Errors
    /// `InvalidConfig` if the underlying TLS/HTTP client cannot be built.
    pub fn new(config: &ClientConfig) -> Result<Self, BambooHrError> {
        let client = reqwest::Client::builder()
            .build()
            .map_err(|e| BambooHrError::InvalidConfig(format!("failed to build HTTP client: {e}")))?;
        let http = ClientBuilder::new(client)
            .with(TracingMiddleware::<BambooHrSpan>::new())
            .build();

        Ok(Self {
            http,
            base_url: config.base_url.clone(),
            api_key: config.api_key.clone(),
            timeout: config.request_timeout(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Performs exactly one request to `{base_url}{endpoint}`.
    ///
    /// The whole exchange, body included, is bounded by the configured
    /// request timeout.
    ///
    /// # Errors
    /// * `Timeout` - no complete response within the request timeout
    /// * `Network` - DNS, connect, reset or any other transport failure
    pub async fn send(
        &self,
        method: Method,
        endpoint: &str,
        body: Option<&Value>,
        accept: Accept,
    ) -> Result<RawResponse, BambooHrError> {
        let url = format!("{}{endpoint}", self.base_url);
        let mut request_builder = self
            .http
            .request(method, url)
            .basic_auth(&self.api_key, Some("x"));

        if accept == Accept::Json {
            request_builder = request_builder.header(ACCEPT, "application/json");
        }
        if let Some(body) = body {
            request_builder = request_builder
                .header(CONTENT_TYPE, "application/json")
                .body(body.to_string());
        }

        let exchange = async {
            let response = request_builder.send().await?;
            let status = response.status();
            let headers = response.headers().clone();
            let body = response.bytes().await?.to_vec();
            Ok::<_, reqwest_middleware::Error>(RawResponse {
                status,
                headers,
                body,
            })
        };

        match tokio::time::timeout(self.timeout, exchange).await {
            Ok(Ok(response)) => Ok(response),
            Ok(Err(err)) => Err(self.transport_error(endpoint, &err)),
            Err(_) => Err(self.timeout_error(endpoint)),
        }
    }

    fn timeout_error(&self, endpoint: &str) -> BambooHrError {
        BambooHrError::Timeout {
            endpoint: endpoint.to_string(),
            seconds: self.timeout.as_secs_f64(),
        }
    }

    fn transport_error(&self, endpoint: &str, err: &reqwest_middleware::Error) -> BambooHrError {
        match err {
            reqwest_middleware::Error::Reqwest(e) if e.is_timeout() => self.timeout_error(endpoint),
            reqwest_middleware::Error::Reqwest(e) if e.is_connect() => BambooHrError::Network(
                format!("connection failed for {endpoint}: {}", error_chain(err)),
            ),
            _ => BambooHrError::Network(format!("request to {endpoint} failed: {}", error_chain(err))),
        }
    }
}

/// Joins an error with all of its sources, e.g.
/// `error sending request: tcp connect error: Connection refused (os error 111)`.
fn error_chain(err: &(dyn StdError + 'static)) -> String {
    let mut parts = vec![err.to_string()];
    let mut source = err.source();
    while let Some(cause) = source {
        let text = cause.to_string();
        if !parts.iter().any(|p| p.contains(&text)) {
            parts.push(text);
        }
        source = cause.source();
    }
    parts.join(": ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::{
        Mock, MockServer, ResponseTemplate,
        matchers::{body_json, header, method, path},
    };

    fn transport_for(server: &MockServer) -> HttpTransport {
        let config = ClientConfig::new("test-key", "acme")
            .with_base_url(server.uri())
            .with_request_timeout_ms(200);
        HttpTransport::new(&config).unwrap()
    }

    #[tokio::test]
    async fn sends_basic_auth_and_accept_header() {
        let server = MockServer::start().await;
        // base64("test-key:x")
        Mock::given(method("GET"))
            .and(path("/employees/directory"))
            .and(header("Authorization", "Basic dGVzdC1rZXk6eA=="))
            .and(header("Accept", "application/json"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"employees": []})))
            .expect(1)
            .mount(&server)
            .await;

        let response = transport_for(&server)
            .send(Method::GET, "/employees/directory", None, Accept::Json)
            .await
            .unwrap();

        assert_eq!(response.status, StatusCode::OK);
        assert_eq!(
            serde_json::from_slice::<Value>(&response.body).unwrap(),
            json!({"employees": []})
        );
    }

    #[tokio::test]
    async fn post_body_is_json() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/datasets/employee"))
            .and(header("Content-Type", "application/json"))
            .and(body_json(json!({"fields": ["firstName"]})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"data": []})))
            .expect(1)
            .mount(&server)
            .await;

        let body = json!({"fields": ["firstName"]});
        let response = transport_for(&server)
            .send(Method::POST, "/datasets/employee", Some(&body), Accept::Json)
            .await
            .unwrap();
        assert!(response.status.is_success());
    }

    #[tokio::test]
    async fn status_codes_are_not_judged() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503).insert_header("Retry-After", "3"))
            .mount(&server)
            .await;

        let response = transport_for(&server)
            .send(Method::GET, "/datasets", None, Accept::Json)
            .await
            .unwrap();
        assert_eq!(response.status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(response.header("retry-after"), Some("3"));
    }

    #[tokio::test]
    async fn binary_fetch_has_no_accept_header() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(header("Accept", "application/json"))
            .respond_with(ResponseTemplate::new(406))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![1u8; 10]))
            .mount(&server)
            .await;

        let response = transport_for(&server)
            .send(Method::GET, "/employees/1/photo/small", None, Accept::Any)
            .await
            .unwrap();
        assert_eq!(response.status, StatusCode::OK);
        assert_eq!(response.body.len(), 10);
    }

    #[tokio::test]
    async fn slow_response_times_out() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200).set_delay(std::time::Duration::from_millis(1_000)),
            )
            .mount(&server)
            .await;

        let err = transport_for(&server)
            .send(Method::GET, "/slow", None, Accept::Json)
            .await
            .unwrap_err();
        assert!(matches!(err, BambooHrError::Timeout { .. }));
        let text = err.to_string();
        assert!(text.contains("/slow"));
        assert!(text.contains("0.2 seconds"));
    }

    #[tokio::test]
    async fn refused_connection_is_a_network_error() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let address = listener.local_addr().unwrap();
        drop(listener);

        let config = ClientConfig::new("test-key", "acme").with_base_url(format!("http://{address}"));
        let err = HttpTransport::new(&config)
            .unwrap()
            .send(Method::GET, "/datasets", None, Accept::Json)
            .await
            .unwrap_err();

        assert!(matches!(err, BambooHrError::Network(_)));
        assert!(err.is_retryable());
        assert!(!err.to_string().contains("test-key"));
    }
}
