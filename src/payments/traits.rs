//! Transport trait definitions
//!
//! The envelope hands a fully prepared request to an `HttpTransport` and gets
//! back the raw status and body. The production transport is reqwest; tests
//! plug in their own.

use crate::payments::errors::GatewayResult;
use async_trait::async_trait;
use reqwest::header::HeaderMap;
use reqwest::{Method, Url};
use std::time::Duration;

/// A request ready to go on the wire
#[derive(Debug, Clone)]
pub struct HttpRequest {
    pub method: Method,
    pub url: Url,
    pub headers: HeaderMap,
    /// Serialized JSON body
    pub body: Option<Vec<u8>>,
    pub timeout: Duration,
}

/// Raw response as received from the gateway
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
}

impl HttpResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Performs a single HTTP exchange.
///
/// Implementations must not retry. Any failure to obtain a status and body
/// (timeout, connection refused, truncated body) is a `GatewayError::Transport`.
#[async_trait]
pub trait HttpTransport: Send + Sync {
    async fn execute(&self, request: HttpRequest) -> GatewayResult<HttpResponse>;
}
