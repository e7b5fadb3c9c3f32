use serde_json::Value;
use thiserror::Error;

pub type GatewayResult<T> = Result<T, GatewayError>;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("Configuration error: {message}")]
    Configuration { message: String },

    #[error("Validation error: {message}")]
    Validation { message: String },

    #[error("Transport error: {message}")]
    Transport {
        message: String,
        is_timeout: bool,
        #[source]
        source: Option<BoxError>,
    },

    #[error("HTTP {status} returned by {endpoint}")]
    HttpStatus {
        status: u16,
        endpoint: String,
        body: Option<Value>,
        raw: String,
    },

    #[error("Response decode error (HTTP {status}): {message}")]
    ResponseDecode { status: u16, message: String },

    #[error("Key format error: {message}")]
    KeyFormat { message: String },

    #[error("Encryption error: {message}")]
    Encryption { message: String },
}

impl GatewayError {
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    pub fn transport(message: impl Into<String>, source: impl Into<BoxError>) -> Self {
        Self::Transport {
            message: message.into(),
            is_timeout: false,
            source: Some(source.into()),
        }
    }

    pub fn timeout(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
            is_timeout: true,
            source: None,
        }
    }

    pub fn response_decode(status: u16, message: impl Into<String>) -> Self {
        Self::ResponseDecode {
            status,
            message: message.into(),
        }
    }

    pub fn key_format(message: impl Into<String>) -> Self {
        Self::KeyFormat {
            message: message.into(),
        }
    }

    pub fn encryption(message: impl Into<String>) -> Self {
        Self::Encryption {
            message: message.into(),
        }
    }

    /// HTTP status carried by the error, if the gateway answered at all.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::HttpStatus { status, .. } | Self::ResponseDecode { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Decoded JSON error body of a non-2xx response.
    pub fn error_body(&self) -> Option<&Value> {
        match self {
            Self::HttpStatus { body, .. } => body.as_ref(),
            _ => None,
        }
    }

    pub fn is_client_error(&self) -> bool {
        matches!(self.status(), Some(400..=499)) && matches!(self, Self::HttpStatus { .. })
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Transport { is_timeout: true, .. })
    }
}

impl From<reqwest::Error> for GatewayError {
    fn from(err: reqwest::Error) -> Self {
        let is_timeout = err.is_timeout();
        let message = if is_timeout {
            format!("request timed out: {}", err)
        } else {
            format!("request failed: {}", err)
        };
        Self::Transport {
            message,
            is_timeout,
            source: Some(Box::new(err)),
        }
    }
}

impl From<serde_json::Error> for GatewayError {
    fn from(err: serde_json::Error) -> Self {
        GatewayError::validation(format!("JSON serialization failed: {}", err))
    }
}

/// Opt-in to the "hand back the gateway's error body" convention.
///
/// A 4xx response whose body decoded as JSON becomes `Ok(body)`; everything
/// else, including every 5xx, is returned unchanged.
pub trait RecoverClientError {
    fn recover_client_error(self) -> GatewayResult<Value>;
}

impl RecoverClientError for GatewayResult<Value> {
    fn recover_client_error(self) -> GatewayResult<Value> {
        match self {
            Err(GatewayError::HttpStatus {
                status: 400..=499,
                body: Some(body),
                ..
            }) => Ok(body),
            other => other,
        }
    }
}
