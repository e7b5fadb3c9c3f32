pub mod health;
pub mod payments;

use crate::database::error::DatabaseErrorKind;
use crate::payments::errors::GatewayError;
use crate::services::{PaymentService, ServiceError};
use http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use rsa::RsaPublicKey;
use serde_json::json;
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing::error;

#[derive(Clone)]
pub struct AppState {
    pub service: PaymentService,
    /// Gateway key for server-side card encryption, if configured
    pub card_public_key: Option<Arc<RsaPublicKey>>,
}

impl AppState {
    pub fn new(service: PaymentService) -> Self {
        Self {
            service,
            card_public_key: None,
        }
    }

    pub fn with_card_public_key(mut self, key: RsaPublicKey) -> Self {
        self.card_public_key = Some(Arc::new(key));
        self
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_check))
        .route("/payments", post(payments::initiate))
        .route("/payments/card/otp", post(payments::submit_otp))
        .route("/payments/card/otp/resend", post(payments::resend_otp))
        .route("/payments/:reference", get(payments::details))
        .route("/payments/:reference/verify", get(payments::verify))
        .route("/payments/:reference/status", get(payments::status))
        .route("/payments/:reference/cancel", post(payments::cancel))
        .route(
            "/payments/:reference/card",
            post(payments::initiate_card).get(payments::card_details),
        )
        .route("/payments/:reference/card/verify", post(payments::verify_card))
        .route("/payments/:reference/ussd", post(payments::initiate_ussd))
        .route("/payments/:reference/bank-transfer", get(payments::bank_transfer))
        .route("/ussd/banks", get(payments::ussd_banks))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        // Gateway client errors are relayed as the gateway sent them
        if let ServiceError::Gateway(GatewayError::HttpStatus {
            status,
            body: Some(body),
            ..
        }) = &self
        {
            if (400..500).contains(status) {
                let status = StatusCode::from_u16(*status).unwrap_or(StatusCode::BAD_REQUEST);
                return (status, Json(body.clone())).into_response();
            }
        }

        let status = match &self {
            ServiceError::PaymentNotFound { .. } => StatusCode::NOT_FOUND,
            ServiceError::InvalidTransition { .. } => StatusCode::CONFLICT,
            ServiceError::Unrecorded { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            ServiceError::Database(e) => match e.kind {
                DatabaseErrorKind::NotFound { .. } => StatusCode::NOT_FOUND,
                DatabaseErrorKind::Conflict { .. }
                | DatabaseErrorKind::UniqueConstraintViolation { .. } => StatusCode::CONFLICT,
                _ => StatusCode::INTERNAL_SERVER_ERROR,
            },
            ServiceError::Gateway(e) => match e {
                GatewayError::Validation { .. } | GatewayError::Encryption { .. } => {
                    StatusCode::BAD_REQUEST
                }
                GatewayError::HttpStatus { status, .. } if (400..500).contains(status) => {
                    StatusCode::from_u16(*status).unwrap_or(StatusCode::BAD_REQUEST)
                }
                GatewayError::Transport {
                    is_timeout: true, ..
                } => StatusCode::GATEWAY_TIMEOUT,
                GatewayError::HttpStatus { .. }
                | GatewayError::Transport { .. }
                | GatewayError::ResponseDecode { .. } => StatusCode::BAD_GATEWAY,
                GatewayError::Configuration { .. } | GatewayError::KeyFormat { .. } => {
                    StatusCode::INTERNAL_SERVER_ERROR
                }
            },
        };

        if status.is_server_error() {
            error!("Request failed: {}", self);
        }

        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}
