//! Request envelope
//!
//! Every EcrasPay call goes through [`ApiClient::send`]: the envelope is turned
//! into an authenticated JSON request against the configured base URL, sent
//! once, and the response is decoded into a JSON value or a typed error.

use crate::payments::config::GatewayConfig;
use crate::payments::errors::{GatewayError, GatewayResult};
use crate::payments::traits::{HttpRequest, HttpResponse, HttpTransport};
use crate::payments::transport::ReqwestTransport;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use reqwest::{Method, Url};
use serde_json::{Map, Value};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, warn};

/// One API call: method, relative endpoint, optional JSON body and query.
#[derive(Debug, Clone)]
pub struct Envelope {
    pub method: Method,
    pub endpoint: String,
    pub body: Option<Map<String, Value>>,
    pub query: Vec<(String, String)>,
    /// Overrides the client's default timeout for this call only
    pub timeout: Option<Duration>,
}

impl Envelope {
    pub fn new(method: Method, endpoint: impl Into<String>) -> Self {
        Self {
            method,
            endpoint: endpoint.into(),
            body: None,
            query: Vec::new(),
            timeout: None,
        }
    }

    pub fn get(endpoint: impl Into<String>) -> Self {
        Self::new(Method::GET, endpoint)
    }

    pub fn post(endpoint: impl Into<String>) -> Self {
        Self::new(Method::POST, endpoint)
    }

    pub fn with_body(mut self, body: Map<String, Value>) -> Self {
        self.body = Some(body);
        self
    }

    pub fn with_query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

/// Authenticated EcrasPay API client.
///
/// Immutable after construction; clone the surrounding `Arc` to share it.
pub struct ApiClient {
    config: GatewayConfig,
    authorization: HeaderValue,
    transport: Arc<dyn HttpTransport>,
}

impl std::fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiClient")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl ApiClient {
    /// Create a client using the default reqwest transport
    pub fn new(config: GatewayConfig) -> GatewayResult<Self> {
        let transport = ReqwestTransport::new()?;
        Self::with_transport(config, Arc::new(transport))
    }

    pub fn with_transport(
        config: GatewayConfig,
        transport: Arc<dyn HttpTransport>,
    ) -> GatewayResult<Self> {
        config.validate()?;

        let mut authorization = HeaderValue::from_str(&format!("Bearer {}", config.api_key.trim()))
            .map_err(|_| GatewayError::configuration("API key contains invalid header characters"))?;
        authorization.set_sensitive(true);

        debug!(
            "EcrasPay client initialized for {} environment with URL: {}",
            config.environment,
            config.base_url()
        );

        Ok(Self {
            config,
            authorization,
            transport,
        })
    }

    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    pub fn base_url(&self) -> &str {
        self.config.base_url()
    }

    /// Resolve `endpoint` against the base URL, appending any query pairs
    pub fn endpoint_url(&self, endpoint: &str, query: &[(String, String)]) -> GatewayResult<Url> {
        let raw = format!("{}/{}", self.base_url(), endpoint.trim_start_matches('/'));
        let mut url = Url::parse(&raw)
            .map_err(|e| GatewayError::configuration(format!("Invalid endpoint URL '{}': {}", raw, e)))?;

        if !query.is_empty() {
            url.query_pairs_mut()
                .extend_pairs(query.iter().map(|(k, v)| (k.as_str(), v.as_str())));
        }

        Ok(url)
    }

    /// Build the wire request for an envelope without sending it
    pub fn prepare(&self, envelope: &Envelope) -> GatewayResult<HttpRequest> {
        let url = self.endpoint_url(&envelope.endpoint, &envelope.query)?;

        let mut headers = HeaderMap::with_capacity(2);
        headers.insert(AUTHORIZATION, self.authorization.clone());
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let body = envelope
            .body
            .as_ref()
            .map(serde_json::to_vec)
            .transpose()?;

        Ok(HttpRequest {
            method: envelope.method.clone(),
            url,
            headers,
            body,
            timeout: envelope.timeout.unwrap_or(self.config.timeout),
        })
    }

    /// Send an envelope and decode the JSON response
    pub async fn send(&self, envelope: Envelope) -> GatewayResult<Value> {
        let request = self.prepare(&envelope)?;
        debug!(method = %request.method, url = %request.url, "Sending EcrasPay request");

        let response = self.transport.execute(request).await?;
        decode_response(&envelope.endpoint, response)
    }

    pub async fn get(&self, endpoint: impl Into<String>) -> GatewayResult<Value> {
        self.send(Envelope::get(endpoint)).await
    }

    pub async fn post(
        &self,
        endpoint: impl Into<String>,
        body: Map<String, Value>,
    ) -> GatewayResult<Value> {
        self.send(Envelope::post(endpoint).with_body(body)).await
    }
}

fn decode_response(endpoint: &str, response: HttpResponse) -> GatewayResult<Value> {
    let success = response.is_success();
    let HttpResponse { status, body } = response;

    if success {
        return serde_json::from_str(&body).map_err(|e| {
            error!("Failed to parse EcrasPay response from {}: {}", endpoint, e);
            GatewayError::response_decode(status, format!("Invalid JSON body: {}", e))
        });
    }

    let decoded = serde_json::from_str::<Value>(&body).ok();
    if status >= 500 {
        error!("EcrasPay server error {} from {}", status, endpoint);
    } else {
        warn!("EcrasPay rejected request to {} with HTTP {}", endpoint, status);
    }

    Err(GatewayError::HttpStatus {
        status,
        endpoint: endpoint.to_string(),
        body: decoded,
        raw: body,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::payments::config::{Environment, LIVE_BASE_URL, SANDBOX_BASE_URL};
    use crate::payments::test_support::RecordingTransport;
    use serde_json::json;

    fn client_with(transport: Arc<RecordingTransport>) -> ApiClient {
        ApiClient::with_transport(GatewayConfig::new("test_key", Environment::Sandbox), transport)
            .unwrap()
    }

    #[test]
    fn test_endpoint_url_joins_with_single_separator() {
        let client = client_with(RecordingTransport::ok(json!({})));
        for endpoint in ["test-endpoint", "/test-endpoint"] {
            let url = client.endpoint_url(endpoint, &[]).unwrap();
            assert_eq!(url.as_str(), format!("{}/test-endpoint", SANDBOX_BASE_URL));
        }
    }

    #[test]
    fn test_live_environment_uses_live_host() {
        let client = ApiClient::with_transport(
            GatewayConfig::new("test_key", Environment::Live),
            RecordingTransport::ok(json!({})),
        )
        .unwrap();
        assert_eq!(client.base_url(), LIVE_BASE_URL);
    }

    #[test]
    fn test_blank_api_key_fails_construction() {
        let result = ApiClient::with_transport(
            GatewayConfig::new("", Environment::Sandbox),
            RecordingTransport::ok(json!({})),
        );
        assert!(matches!(result, Err(GatewayError::Configuration { .. })));
    }

    #[test]
    fn test_prepare_attaches_exactly_two_headers() {
        let client = client_with(RecordingTransport::ok(json!({})));
        let mut body = Map::new();
        body.insert("amount".to_string(), json!(1000));

        let request = client
            .prepare(&Envelope::post("payment/initiate").with_body(body).with_query("page", "2"))
            .unwrap();

        assert_eq!(request.headers.len(), 2);
        assert_eq!(request.headers[AUTHORIZATION], "Bearer test_key");
        assert_eq!(request.headers[CONTENT_TYPE], "application/json");
        assert_eq!(
            request.url.as_str(),
            format!("{}/payment/initiate?page=2", SANDBOX_BASE_URL)
        );
        assert_eq!(request.body.unwrap(), br#"{"amount":1000}"#.to_vec());
        assert_eq!(request.timeout, Duration::from_secs(10));
    }

    #[test]
    fn test_envelope_timeout_overrides_default() {
        let client = client_with(RecordingTransport::ok(json!({})));
        let request = client
            .prepare(&Envelope::get("payment/status/ref-1").with_timeout(Duration::from_secs(3)))
            .unwrap();
        assert_eq!(request.timeout, Duration::from_secs(3));
        assert!(request.body.is_none());
    }

    #[tokio::test]
    async fn test_send_returns_decoded_json() {
        let transport = RecordingTransport::ok(json!({"message": "success"}));
        let client = client_with(transport.clone());

        let response = client.get("test-endpoint").await.unwrap();

        assert_eq!(response, json!({"message": "success"}));
        let calls = transport.requests();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].method, Method::GET);
    }

    #[tokio::test]
    async fn test_non_json_success_body_is_decode_error() {
        let transport = RecordingTransport::respond(HttpResponse::new(200, "Not JSON"));
        let client = client_with(transport);

        let err = client.get("payment/details/ref-1").await.unwrap_err();
        assert!(matches!(err, GatewayError::ResponseDecode { status: 200, .. }));
    }

    #[tokio::test]
    async fn test_client_error_carries_decoded_body() {
        let transport = RecordingTransport::respond(HttpResponse::new(
            400,
            r#"{"status":false,"message":"Invalid payment reference"}"#,
        ));
        let client = client_with(transport);

        let err = client.get("payment/verify/bad").await.unwrap_err();
        match err {
            GatewayError::HttpStatus { status, endpoint, body, .. } => {
                assert_eq!(status, 400);
                assert_eq!(endpoint, "payment/verify/bad");
                assert_eq!(body.unwrap()["message"], "Invalid payment reference");
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_server_error_with_html_body() {
        let transport =
            RecordingTransport::respond(HttpResponse::new(502, "<html>Bad Gateway</html>"));
        let client = client_with(transport);

        let err = client.get("payment/status/ref-1").await.unwrap_err();
        assert_eq!(err.status(), Some(502));
        assert!(err.error_body().is_none());
    }

    #[tokio::test]
    async fn test_transport_failure_is_propagated() {
        let transport = RecordingTransport::fail_with_timeout();
        let client = client_with(transport.clone());

        let err = client.get("payment/status/ref-1").await.unwrap_err();
        assert!(err.is_timeout());
        assert_eq!(transport.requests().len(), 1, "transport failures are not retried");
    }
}
