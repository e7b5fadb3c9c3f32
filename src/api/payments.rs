use crate::api::AppState;
use crate::payments::card_crypto::encrypt_card_with_key;
use crate::payments::errors::GatewayError;
use crate::payments::types::{CardDetails, InitiateTransactionRequest};
use crate::services::{InitiatedPayment, ServiceError};
use axum::extract::{Path, State};
use axum::Json;
use http::StatusCode;
use serde::Deserialize;
use serde_json::{Map, Value};

type ApiResult<T> = Result<T, ServiceError>;

/// Card charge request: either a payload encrypted by the caller, or raw card
/// data to be encrypted with the server's configured gateway key.
#[derive(Debug, Deserialize)]
pub struct CardPaymentBody {
    #[serde(default)]
    pub payload: Option<String>,
    #[serde(default)]
    pub card: Option<CardDetails>,
    #[serde(default, alias = "deviceDetails")]
    pub device_details: Map<String, Value>,
}

#[derive(Debug, Deserialize)]
pub struct OtpBody {
    pub otp: String,
    #[serde(alias = "gatewayReference")]
    pub gateway_reference: String,
}

#[derive(Debug, Deserialize)]
pub struct ResendOtpBody {
    #[serde(alias = "gatewayReference")]
    pub gateway_reference: String,
}

#[derive(Debug, Deserialize)]
pub struct UssdBody {
    pub bank_name: String,
}

pub async fn initiate(
    State(state): State<AppState>,
    Json(request): Json<InitiateTransactionRequest>,
) -> ApiResult<(StatusCode, Json<InitiatedPayment>)> {
    let initiated = state.service.initiate_transaction(&request).await?;
    Ok((StatusCode::CREATED, Json(initiated)))
}

pub async fn details(
    State(state): State<AppState>,
    Path(reference): Path<String>,
) -> ApiResult<Json<Value>> {
    Ok(Json(state.service.get_transaction_details(&reference).await?))
}

pub async fn verify(
    State(state): State<AppState>,
    Path(reference): Path<String>,
) -> ApiResult<Json<Value>> {
    Ok(Json(state.service.verify_transaction(&reference).await?))
}

pub async fn status(
    State(state): State<AppState>,
    Path(reference): Path<String>,
) -> ApiResult<Json<Value>> {
    Ok(Json(state.service.get_transaction_status(&reference).await?))
}

pub async fn cancel(
    State(state): State<AppState>,
    Path(reference): Path<String>,
) -> ApiResult<Json<Value>> {
    Ok(Json(state.service.cancel_transaction(&reference).await?))
}

pub async fn initiate_card(
    State(state): State<AppState>,
    Path(reference): Path<String>,
    Json(body): Json<CardPaymentBody>,
) -> ApiResult<Json<Value>> {
    let payload = match (body.payload, body.card) {
        (Some(payload), _) => payload,
        (None, Some(card)) => {
            let key = state.card_public_key.as_ref().ok_or_else(|| {
                GatewayError::configuration("no card encryption key configured on this server")
            })?;
            encrypt_card_with_key(&card, key)?
        }
        (None, None) => {
            return Err(GatewayError::validation("either payload or card is required").into())
        }
    };

    Ok(Json(
        state
            .service
            .initiate_card_payment(&reference, &payload, body.device_details)
            .await?,
    ))
}

pub async fn card_details(
    State(state): State<AppState>,
    Path(reference): Path<String>,
) -> ApiResult<Json<Value>> {
    Ok(Json(state.service.get_card_payment_details(&reference).await?))
}

pub async fn verify_card(
    State(state): State<AppState>,
    Path(reference): Path<String>,
) -> ApiResult<Json<Value>> {
    Ok(Json(state.service.verify_card_payment(&reference).await?))
}

pub async fn submit_otp(
    State(state): State<AppState>,
    Json(body): Json<OtpBody>,
) -> ApiResult<Json<Value>> {
    Ok(Json(
        state
            .service
            .submit_card_otp(&body.otp, &body.gateway_reference)
            .await?,
    ))
}

pub async fn resend_otp(
    State(state): State<AppState>,
    Json(body): Json<ResendOtpBody>,
) -> ApiResult<Json<Value>> {
    Ok(Json(state.service.resend_card_otp(&body.gateway_reference).await?))
}

pub async fn initiate_ussd(
    State(state): State<AppState>,
    Path(reference): Path<String>,
    Json(body): Json<UssdBody>,
) -> ApiResult<Json<Value>> {
    Ok(Json(
        state
            .service
            .initiate_ussd_payment(&reference, &body.bank_name)
            .await?,
    ))
}

pub async fn ussd_banks(State(state): State<AppState>) -> ApiResult<Json<Value>> {
    Ok(Json(state.service.get_ussd_supported_banks().await?))
}

pub async fn bank_transfer(
    State(state): State<AppState>,
    Path(reference): Path<String>,
) -> ApiResult<Json<Value>> {
    Ok(Json(state.service.request_bank_transfer_account(&reference).await?))
}

#[cfg(test)]
mod tests {
    use crate::api::{router, AppState};
    use crate::database::memory_store::InMemoryPaymentStore;
    use crate::payments::client::EcrasPay;
    use crate::payments::config::{Environment, GatewayConfig};
    use crate::payments::test_support::RecordingTransport;
    use crate::payments::traits::HttpResponse;
    use crate::services::PaymentService;
    use axum::body::Body;
    use axum::http::{Method, Request, StatusCode};
    use serde_json::{json, Value};
    use std::sync::Arc;
    use tower::ServiceExt;

    fn app(transport: Arc<RecordingTransport>) -> axum::Router {
        let sdk = EcrasPay::with_transport(GatewayConfig::new("sk_test", Environment::Sandbox), transport)
            .unwrap();
        let service = PaymentService::new(sdk, Arc::new(InMemoryPaymentStore::new()));
        router(AppState::new(service))
    }

    async fn call(app: axum::Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let request = Request::builder()
            .method(method)
            .uri(uri)
            .header("content-type", "application/json")
            .body(match body {
                Some(body) => Body::from(body.to_string()),
                None => Body::empty(),
            })
            .unwrap();

        let response = app.oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, value)
    }

    fn initiate_body() -> Value {
        json!({
            "amount": 1000,
            "payment_reference": "ref-1",
            "customer_name": "Ada",
            "customer_email": "ada@example.com",
            "currency": "NGN"
        })
    }

    #[tokio::test]
    async fn test_health() {
        let (status, body) = call(app(RecordingTransport::ok(json!({}))), Method::GET, "/health", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["gateway_environment"], "sandbox");
        assert_eq!(body["card_encryption_configured"], false);
    }

    #[tokio::test]
    async fn test_initiate_creates_payment() {
        let transport = RecordingTransport::ok(json!({
            "responseBody": {"transactionReference": "ECRS-TXN-1"}
        }));
        let (status, body) = call(app(transport), Method::POST, "/payments", Some(initiate_body())).await;

        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["payment"]["status"], "pending");
        assert_eq!(body["payment"]["transaction_reference"], "ECRS-TXN-1");
        assert_eq!(body["gateway_response"]["responseBody"]["transactionReference"], "ECRS-TXN-1");
    }

    #[tokio::test]
    async fn test_gateway_client_error_is_relayed() {
        let transport = RecordingTransport::respond(HttpResponse::new(
            422,
            json!({"responseMessage": "customerEmail is invalid"}).to_string(),
        ));
        let (status, body) = call(app(transport), Method::POST, "/payments", Some(initiate_body())).await;

        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["responseMessage"], "customerEmail is invalid");
    }

    #[tokio::test]
    async fn test_gateway_server_error_is_bad_gateway() {
        let transport = RecordingTransport::respond(HttpResponse::new(503, "unavailable".to_string()));
        let (status, _) = call(app(transport), Method::GET, "/ussd/banks", None).await;
        assert_eq!(status, StatusCode::BAD_GATEWAY);
    }

    #[tokio::test]
    async fn test_verify_unknown_payment_is_not_found() {
        let transport = RecordingTransport::ok(json!({}));
        let (status, body) = call(app(transport.clone()), Method::GET, "/payments/missing/verify", None).await;

        assert_eq!(status, StatusCode::NOT_FOUND);
        assert!(body["error"].as_str().unwrap().contains("missing"));
        assert!(transport.requests().is_empty());
    }

    #[tokio::test]
    async fn test_otp_route_is_not_captured_by_reference_route() {
        let transport = RecordingTransport::ok(json!({"responseMessage": "ok"}));
        let (status, _) = call(
            app(transport.clone()),
            Method::POST,
            "/payments/card/otp",
            Some(json!({"otp": "123456", "gatewayReference": "GW-1"})),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert!(transport.requests()[0].url.path().ends_with("payment/cards/otp/submit/"));
    }

    #[tokio::test]
    async fn test_card_without_payload_or_key_is_rejected() {
        let transport = RecordingTransport::ok(json!({
            "responseBody": {"transactionReference": "ECRS-TXN-1"}
        }));
        let app = app(transport.clone());
        call(app.clone(), Method::POST, "/payments", Some(initiate_body())).await;

        let (status, _) = call(
            app.clone(),
            Method::POST,
            "/payments/ref-1/card",
            Some(json!({"deviceDetails": {}})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = call(
            app,
            Method::POST,
            "/payments/ref-1/card",
            Some(json!({"card": {"pan": "5399", "expiryDate": "12/30", "cvv": "123", "pin": "1234"}})),
        )
        .await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(transport.requests().len(), 1);
    }
}
