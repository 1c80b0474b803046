//! The BambooHR API client used by every tool.
//!
//! This module provides:
//! - Cached `GET` requests returning JSON exactly as BambooHR sent it
//! - Uncached `POST` requests (dataset queries)
//! - Raw binary downloads for employee photos
//!
//! Every call goes through the retry controller and the error normalizer, so
//! callers only ever see a [`BambooHrError`] with a secret-free message.

use std::fmt;

use reqwest::Method;
use serde_json::Value;
use tracing::debug;

use crate::mcp::{
    error::BambooHrError,
    http::{
        cache::{ResponseCache, cache_key},
        config::ClientConfig,
        normalize::{error_from_response, parse_success_body},
        retry::{RetryPolicy, execute_with_retry},
        transport::{Accept, HttpTransport, RawResponse},
    },
};

/// Smallest body accepted as an image.
pub const MIN_IMAGE_BYTES: usize = 100;
/// Largest image that may be inlined into a tool result.
pub const MAX_INLINE_IMAGE_BYTES: usize = 5 * 1024 * 1024;

/// Per-call knobs for [`BambooHrClient::get_with`].
#[derive(Debug, Clone, Copy, Default)]
pub struct RequestOptions {
    /// Bypass the response cache for this call, both for reading and writing.
    pub skip_cache: bool,
}

pub struct BambooHrClient {
    transport: HttpTransport,
    retry: RetryPolicy,
    cache: ResponseCache,
    api_key: String,
}

impl fmt::Debug for BambooHrClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BambooHrClient")
            .field("base_url", &self.transport.base_url())
            .field("api_key", &"<redacted>")
            .field("retry", &self.retry)
            .finish_non_exhaustive()
    }
}

impl BambooHrClient {
    /// # Errors
    /// `InvalidConfig` if the HTTP client cannot be built.
    pub fn new(config: ClientConfig) -> Result<Self, BambooHrError> {
        Ok(Self {
            transport: HttpTransport::new(&config)?,
            retry: RetryPolicy::from_config(&config),
            cache: ResponseCache::new(config.cache_timeout()),
            api_key: config.api_key,
        })
    }

    /// `GET {base_url}{endpoint}`, served from the cache when possible.
    ///
    /// # Errors
    /// Any [`BambooHrError`] left after retries, including `MalformedResponse`
    /// for a success body that is not JSON.
    pub async fn get(&self, endpoint: &str) -> Result<Value, BambooHrError> {
        self.get_with(endpoint, RequestOptions::default()).await
    }

    /// [`BambooHrClient::get`] with per-call options.
    ///
    /// # Errors
    /// Same as [`BambooHrClient::get`].
    pub async fn get_with(
        &self,
        endpoint: &str,
        options: RequestOptions,
    ) -> Result<Value, BambooHrError> {
        self.request_json(&Method::GET, endpoint, None, options).await
    }

    /// `POST {base_url}{endpoint}` with a JSON body. Never cached.
    ///
    /// # Errors
    /// Same as [`BambooHrClient::get`].
    pub async fn post(&self, endpoint: &str, body: &Value) -> Result<Value, BambooHrError> {
        let options = RequestOptions { skip_cache: true };
        self.request_json(&Method::POST, endpoint, Some(body), options)
            .await
    }

    /// Downloads raw bytes, skipping JSON parsing and the cache.
    ///
    /// With `inline_limit` set, bodies larger than the limit are rejected
    /// with `ImageTooLarge`.
    ///
    /// # Errors
    /// * `InvalidImageData` - empty body or fewer than [`MIN_IMAGE_BYTES`] bytes
    /// * `ImageTooLarge` - body exceeds `inline_limit`
    /// * any request error from the transport, retry or status handling
    pub async fn get_binary(
        &self,
        endpoint: &str,
        inline_limit: Option<usize>,
    ) -> Result<Vec<u8>, BambooHrError> {
        let response = self
            .execute(&Method::GET, endpoint, None, Accept::Any)
            .await?;

        let size = response.body.len();
        if size == 0 {
            return Err(BambooHrError::InvalidImageData(format!(
                "empty response body for {endpoint}"
            )));
        }
        if size < MIN_IMAGE_BYTES {
            return Err(BambooHrError::InvalidImageData(format!(
                "{size} bytes returned for {endpoint} is too small to be an image"
            )));
        }
        if let Some(max) = inline_limit.filter(|max| size > *max) {
            return Err(BambooHrError::ImageTooLarge { size, max });
        }
        Ok(response.body)
    }

    pub fn clear_cache(&self) {
        self.cache.clear();
    }

    /// Base URL for building links shown to end users.
    #[must_use]
    pub fn base_url(&self) -> &str {
        self.transport.base_url()
    }

    async fn request_json(
        &self,
        method: &Method,
        endpoint: &str,
        body: Option<&Value>,
        options: RequestOptions,
    ) -> Result<Value, BambooHrError> {
        let cacheable = *method == Method::GET && !options.skip_cache;
        let key = cache_key(method, endpoint, body);
        if cacheable {
            if let Some(data) = self.cache.get(&key) {
                return Ok(data);
            }
        }

        let response = self.execute(method, endpoint, body, Accept::Json).await?;
        let data = parse_success_body(endpoint, &response.body)
            .map_err(|e| e.redacted(&self.api_key))?;

        if cacheable {
            self.cache.set(key, data.clone());
        }
        Ok(data)
    }

    /// Retry loop plus status check; the returned response is always a success.
    async fn execute(
        &self,
        method: &Method,
        endpoint: &str,
        body: Option<&Value>,
        accept: Accept,
    ) -> Result<RawResponse, BambooHrError> {
        debug!(%method, endpoint, "calling BambooHR API");
        let response = execute_with_retry(&self.retry, endpoint, &self.api_key, || {
            self.transport.send(method.clone(), endpoint, body, accept)
        })
        .await?;

        if !response.status.is_success() {
            return Err(error_from_response(response.status, &response.body).redacted(&self.api_key));
        }
        Ok(response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::{
        sync::{
            Arc,
            atomic::{AtomicUsize, Ordering},
        },
        time::{Duration, Instant},
    };
    use wiremock::{
        Mock, MockServer, Request, ResponseTemplate,
        matchers::{method, path},
    };

    const API_KEY: &str = "sk-live-0123456789abcdef";

    fn client_for(server: &MockServer, configure: impl FnOnce(ClientConfig) -> ClientConfig) -> BambooHrClient {
        let config = ClientConfig::new(API_KEY, "acme")
            .with_base_url(server.uri())
            .with_retry(3, 1, 5);
        BambooHrClient::new(configure(config)).unwrap()
    }

    async fn hits(server: &MockServer) -> usize {
        server.received_requests().await.unwrap().len()
    }

    /// Serves `statuses` in order, then repeats the last one.
    fn sequence(statuses: Vec<ResponseTemplate>) -> impl Fn(&Request) -> ResponseTemplate {
        let calls = Arc::new(AtomicUsize::new(0));
        move |_: &Request| {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            statuses[n.min(statuses.len() - 1)].clone()
        }
    }

    #[tokio::test]
    async fn get_is_cached_within_ttl_and_refetched_after() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/employees/directory"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"employees": [{"id": "1"}]})))
            .mount(&server)
            .await;
        let client = client_for(&server, |c| c.with_cache_timeout_ms(150));

        let first = client.get("/employees/directory").await.unwrap();
        let second = client.get("/employees/directory").await.unwrap();
        assert_eq!(first, second);
        assert_eq!(hits(&server).await, 1);

        tokio::time::sleep(Duration::from_millis(200)).await;
        client.get("/employees/directory").await.unwrap();
        assert_eq!(hits(&server).await, 2);
    }

    #[tokio::test]
    async fn skip_cache_always_hits_the_network() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
            .mount(&server)
            .await;
        let client = client_for(&server, |c| c);
        let options = RequestOptions { skip_cache: true };

        client.get_with("/custom-reports", options).await.unwrap();
        client.get_with("/custom-reports", options).await.unwrap();
        assert_eq!(hits(&server).await, 2);
    }

    #[tokio::test]
    async fn post_is_never_cached() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/datasets/employee"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"data": []})))
            .expect(2)
            .mount(&server)
            .await;
        let client = client_for(&server, |c| c);
        let body = json!({"fields": ["firstName"]});

        client.post("/datasets/employee", &body).await.unwrap();
        client.post("/datasets/employee", &body).await.unwrap();
        assert_eq!(hits(&server).await, 2);
    }

    #[tokio::test]
    async fn clear_cache_forces_a_fresh_call() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"datasets": []})))
            .mount(&server)
            .await;
        let client = client_for(&server, |c| c);

        client.get("/datasets").await.unwrap();
        client.get("/datasets").await.unwrap();
        client.clear_cache();
        client.get("/datasets").await.unwrap();
        assert_eq!(hits(&server).await, 2);
    }

    #[tokio::test]
    async fn server_errors_exhaust_the_retry_budget() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;
        let client = client_for(&server, |c| c);

        let err = client.get("/datasets").await.unwrap_err();
        assert_eq!(hits(&server).await, 4);
        assert!(matches!(err, BambooHrError::ServerError { status: 503, .. }));
        assert!(err.to_string().contains("503"));
    }

    #[tokio::test]
    async fn rate_limit_then_success() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(sequence(vec![
                ResponseTemplate::new(429),
                ResponseTemplate::new(200).set_body_json(json!({"ok": true})),
            ]))
            .mount(&server)
            .await;
        let client = client_for(&server, |c| c.with_retry(3, 20, 1_000));

        let started = Instant::now();
        let data = client.get("/time_off/whos_out").await.unwrap();
        assert_eq!(data, json!({"ok": true}));
        assert_eq!(hits(&server).await, 2);
        // No Retry-After: twice the base delay.
        assert!(started.elapsed() >= Duration::from_millis(40));
    }

    #[tokio::test]
    async fn retry_after_header_is_honored() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(sequence(vec![
                ResponseTemplate::new(429).insert_header("Retry-After", "2"),
                ResponseTemplate::new(200).set_body_json(json!({"ok": true})),
            ]))
            .mount(&server)
            .await;
        let client = client_for(&server, |c| c.with_retry(3, 1, 30_000));

        let started = Instant::now();
        client.get("/datasets").await.unwrap();
        assert!(started.elapsed() >= Duration::from_millis(2_000));
        assert_eq!(hits(&server).await, 2);
    }

    #[tokio::test]
    async fn not_found_is_not_retried() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(404).set_body_json(json!({"message": "Employee 999 not found"})),
            )
            .mount(&server)
            .await;
        let client = client_for(&server, |c| c);

        let err = client.get("/employees/999").await.unwrap_err();
        assert_eq!(hits(&server).await, 1);
        assert!(matches!(err, BambooHrError::ClientError { status: 404, .. }));
        let text = err.to_string();
        assert!(text.contains("404"));
        assert!(text.contains("Employee 999 not found"));
    }

    #[tokio::test]
    async fn forbidden_messages_are_extracted() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/json"))
            .respond_with(ResponseTemplate::new(403).set_body_json(json!({"message": "no access"})))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/text"))
            .respond_with(ResponseTemplate::new(403).set_body_string("plain text error"))
            .mount(&server)
            .await;
        let client = client_for(&server, |c| c);

        let err = client.get("/json").await.unwrap_err();
        assert!(err.to_string().contains("no access"));
        let err = client.get("/text").await.unwrap_err();
        assert!(err.to_string().contains("plain text error"));
    }

    #[tokio::test]
    async fn html_success_body_is_malformed() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html><body>Sign in</body></html>"))
            .mount(&server)
            .await;
        let client = client_for(&server, |c| c);

        let err = client.get("/employees/directory").await.unwrap_err();
        assert!(matches!(err, BambooHrError::MalformedResponse(_)));
        let text = err.to_string();
        assert!(text.contains("HTML"));
        assert!(text.contains("/employees/directory"));
    }

    #[tokio::test]
    async fn api_key_never_leaks_into_errors() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(401).set_body_json(json!({"message": format!("key {API_KEY} is revoked")})),
            )
            .mount(&server)
            .await;
        let client = client_for(&server, |c| c);

        let err = client.get("/employees/0").await.unwrap_err();
        assert!(!err.to_string().contains(API_KEY));
        assert!(!format!("{err:?}").contains(API_KEY));
        assert!(!format!("{client:?}").contains(API_KEY));
    }

    #[tokio::test]
    async fn concurrent_misses_both_succeed() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"employees": []}))
                    .set_delay(Duration::from_millis(50)),
            )
            .mount(&server)
            .await;
        let client = client_for(&server, |c| c);

        let (a, b) = tokio::join!(
            client.get("/employees/directory"),
            client.get("/employees/directory")
        );
        assert_eq!(a.unwrap(), json!({"employees": []}));
        assert_eq!(b.unwrap(), json!({"employees": []}));
        let calls = hits(&server).await;
        assert!((1..=2).contains(&calls));

        client.get("/employees/directory").await.unwrap();
        assert_eq!(hits(&server).await, calls);
    }

    #[tokio::test]
    async fn recovers_after_two_server_errors() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/datasets"))
            .respond_with(sequence(vec![
                ResponseTemplate::new(500),
                ResponseTemplate::new(500),
                ResponseTemplate::new(200).set_body_json(json!({"datasets": []})),
            ]))
            .mount(&server)
            .await;
        let client = client_for(&server, |c| {
            c.with_cache_timeout_ms(1_000).with_retry(2, 100, 30_000)
        });

        let started = Instant::now();
        let data = client.get("/datasets").await.unwrap();
        assert_eq!(data, json!({"datasets": []}));
        assert_eq!(hits(&server).await, 3);
        // 100ms + 200ms, each jittered by at most 12.5%.
        assert!(started.elapsed() >= Duration::from_millis(262));
    }

    #[tokio::test]
    async fn binary_download_is_validated() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/employees/1/photo/small"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![0xFF; 2_048]))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/employees/2/photo/small"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![0xFF; 10]))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/employees/3/photo/small"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;
        let client = client_for(&server, |c| c);

        let bytes = client.get_binary("/employees/1/photo/small", None).await.unwrap();
        assert_eq!(bytes.len(), 2_048);

        let err = client
            .get_binary("/employees/1/photo/small", Some(1_024))
            .await
            .unwrap_err();
        assert!(matches!(err, BambooHrError::ImageTooLarge { size: 2_048, max: 1_024 }));

        let err = client.get_binary("/employees/2/photo/small", None).await.unwrap_err();
        assert!(matches!(err, BambooHrError::InvalidImageData(_)));
        let err = client.get_binary("/employees/3/photo/small", None).await.unwrap_err();
        assert!(matches!(err, BambooHrError::InvalidImageData(_)));

        // Binary downloads bypass the cache.
        assert_eq!(hits(&server).await, 4);
    }

    #[tokio::test]
    async fn binary_download_reports_http_errors() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404).set_body_string("No photo"))
            .mount(&server)
            .await;
        let client = client_for(&server, |c| c);

        let err = client.get_binary("/employees/7/photo/small", None).await.unwrap_err();
        assert!(matches!(err, BambooHrError::ClientError { status: 404, .. }));
        assert!(err.to_string().contains("No photo"));
    }

    #[test]
    fn base_url_accessor() {
        let config = ClientConfig::new(API_KEY, "acme");
        let client = BambooHrClient::new(config).unwrap();
        assert_eq!(
            client.base_url(),
            "https://api.bamboohr.com/api/gateway.php/acme/v1"
        );
    }
}
