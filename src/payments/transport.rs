use crate::payments::errors::{GatewayError, GatewayResult};
use crate::payments::traits::{HttpRequest, HttpResponse, HttpTransport};
use async_trait::async_trait;
use reqwest::Client;
use tracing::{debug, error};

/// `HttpTransport` backed by a pooled reqwest client
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: Client,
}

impl ReqwestTransport {
    pub fn new() -> GatewayResult<Self> {
        let client = Client::builder()
            .user_agent(concat!("ecraspay-rust/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| {
                GatewayError::configuration(format!("Failed to create HTTP client: {}", e))
            })?;

        Ok(Self { client })
    }

    pub fn from_client(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn execute(&self, request: HttpRequest) -> GatewayResult<HttpResponse> {
        let mut builder = self
            .client
            .request(request.method, request.url)
            .headers(request.headers)
            .timeout(request.timeout);

        if let Some(body) = request.body {
            builder = builder.body(body);
        }

        let response = builder.send().await.map_err(|e| {
            error!("EcrasPay request failed: {}", e);
            GatewayError::from(e)
        })?;

        let status = response.status().as_u16();
        let body = response.text().await.map_err(|e| {
            error!("Failed to read EcrasPay response body: {}", e);
            GatewayError::from(e)
        })?;

        debug!(status, bytes = body.len(), "EcrasPay response received");
        Ok(HttpResponse { status, body })
    }
}
