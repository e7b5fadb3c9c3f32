//! SDK against an in-process HTTP gateway over the real reqwest transport.

use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, Method, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::Router;
use ecraspay::database::memory_store::InMemoryPaymentStore;
use ecraspay::database::repository::PaymentStore;
use ecraspay::payments::{
    Currency, EcrasPay, Environment, GatewayConfig, GatewayError, InitiateTransactionRequest,
    PaymentStatus, RecoverClientError,
};
use ecraspay::services::PaymentService;
use serde_json::{json, Value};
use std::sync::{Arc, Mutex};
use std::time::Duration;

#[derive(Debug, Clone)]
struct Captured {
    method: Method,
    path: String,
    authorization: Option<String>,
    content_type: Option<String>,
    body: Option<Value>,
}

type Log = Arc<Mutex<Vec<Captured>>>;

async fn gateway(
    State(log): State<Log>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let header = |name: &str| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
    };
    log.lock().unwrap().push(Captured {
        method: method.clone(),
        path: uri.path().to_string(),
        authorization: header("authorization"),
        content_type: header("content-type"),
        body: serde_json::from_slice(&body).ok(),
    });

    match (method.as_str(), uri.path()) {
        ("POST", "/payment/initiate") => (
            StatusCode::OK,
            axum::Json(json!({
                "requestSuccessful": true,
                "responseBody": {"transactionReference": "ECRS-TXN-1", "checkoutUrl": "https://pay"}
            })),
        )
            .into_response(),
        ("GET", "/payment/details/not-json") => (StatusCode::OK, "<html>ok</html>").into_response(),
        ("GET", "/payment/status/bad-ref") => (
            StatusCode::BAD_REQUEST,
            axum::Json(json!({"requestSuccessful": false, "responseMessage": "Invalid reference"})),
        )
            .into_response(),
        ("GET", "/payment/verify/ECRS-TXN-1") => (
            StatusCode::OK,
            axum::Json(json!({"responseBody": {"status": "SUCCESSFUL"}})),
        )
            .into_response(),
        ("GET", "/payment/verify/boom") => (
            StatusCode::INTERNAL_SERVER_ERROR,
            axum::Json(json!({"responseMessage": "internal"})),
        )
            .into_response(),
        ("GET", "/third-party/payment/ussd/supported-banks") => (
            StatusCode::OK,
            axum::Json(json!({"responseBody": [{"bankName": "GTBank"}]})),
        )
            .into_response(),
        ("GET", "/payment/cancel/slow") => {
            tokio::time::sleep(Duration::from_secs(2)).await;
            (StatusCode::OK, axum::Json(json!({}))).into_response()
        }
        _ => StatusCode::NOT_FOUND.into_response(),
    }
}

async fn spawn_gateway() -> (String, Log) {
    let log: Log = Arc::new(Mutex::new(Vec::new()));
    let app = Router::new().fallback(gateway).with_state(log.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    (format!("http://{}/", addr), log)
}

fn client(base_url: &str) -> EcrasPay {
    EcrasPay::new(
        GatewayConfig::new("sk_test_123", Environment::Sandbox)
            .with_base_url(base_url)
            .with_timeout(Duration::from_millis(500)),
    )
    .unwrap()
}

fn request() -> InitiateTransactionRequest {
    InitiateTransactionRequest::new(1000, "ref-1", "Ada Lovelace", "ada@example.com")
        .currency(Currency::Ngn)
}

#[tokio::test]
async fn initiate_sends_one_authenticated_post() {
    let (base, log) = spawn_gateway().await;
    let sdk = client(&base);

    let response = sdk.transaction.initiate_transaction(&request()).await.unwrap();
    assert_eq!(response["responseBody"]["transactionReference"], "ECRS-TXN-1");

    let log = log.lock().unwrap();
    assert_eq!(log.len(), 1);
    let captured = &log[0];
    assert_eq!(captured.method, Method::POST);
    assert_eq!(captured.path, "/payment/initiate");
    assert_eq!(captured.authorization.as_deref(), Some("Bearer sk_test_123"));
    assert_eq!(captured.content_type.as_deref(), Some("application/json"));

    let body = captured.body.as_ref().unwrap();
    assert_eq!(body["amount"], 1000);
    assert_eq!(body["paymentReference"], "ref-1");
    assert_eq!(body["currency"], "NGN");
    assert_eq!(body["paymentMethods"], "card");
}

#[tokio::test]
async fn get_requests_carry_no_body() {
    let (base, log) = spawn_gateway().await;
    let sdk = client(&base);

    let banks = sdk.ussd.get_bank_list().await.unwrap();
    assert_eq!(banks["responseBody"][0]["bankName"], "GTBank");

    let log = log.lock().unwrap();
    assert_eq!(log[0].method, Method::GET);
    assert!(log[0].body.is_none());
}

#[tokio::test]
async fn non_json_success_body_is_a_decode_error() {
    let (base, _log) = spawn_gateway().await;
    let sdk = client(&base);

    let err = sdk
        .transaction
        .get_transaction_details("not-json")
        .await
        .unwrap_err();
    assert!(matches!(err, GatewayError::ResponseDecode { status: 200, .. }));
}

#[tokio::test]
async fn client_errors_raise_and_can_be_recovered() {
    let (base, _log) = spawn_gateway().await;
    let sdk = client(&base);

    let err = sdk
        .transaction
        .get_transaction_status("bad-ref")
        .await
        .unwrap_err();
    assert_eq!(err.status(), Some(400));
    assert_eq!(err.error_body().unwrap()["responseMessage"], "Invalid reference");

    let recovered = sdk
        .transaction
        .get_transaction_status("bad-ref")
        .await
        .recover_client_error()
        .unwrap();
    assert_eq!(recovered["requestSuccessful"], false);
}

#[tokio::test]
async fn server_errors_are_not_recovered() {
    let (base, _log) = spawn_gateway().await;
    let sdk = client(&base);

    let err = sdk
        .transaction
        .verify_transaction("boom")
        .await
        .recover_client_error()
        .unwrap_err();
    assert_eq!(err.status(), Some(500));
}

#[tokio::test]
async fn slow_gateway_times_out() {
    let (base, _log) = spawn_gateway().await;
    let sdk = client(&base);

    let err = sdk.transaction.cancel_transaction("slow").await.unwrap_err();
    assert!(err.is_timeout());
}

#[tokio::test]
async fn unreachable_gateway_is_a_transport_error() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let sdk = client(&format!("http://{}", addr));
    let err = sdk.ussd.get_bank_list().await.unwrap_err();

    assert!(matches!(err, GatewayError::Transport { .. }));
    assert_eq!(err.status(), None);
}

#[tokio::test]
async fn service_records_and_verifies_payment() {
    let (base, log) = spawn_gateway().await;
    let store = Arc::new(InMemoryPaymentStore::new());
    let service = PaymentService::new(client(&base), store.clone());

    let initiated = service.initiate_transaction(&request()).await.unwrap();
    assert_eq!(initiated.payment.status, PaymentStatus::Pending);

    service.verify_transaction("ref-1").await.unwrap();

    let stored = store.find_by_reference("ECRS-TXN-1").await.unwrap().unwrap();
    assert_eq!(stored.status, PaymentStatus::Success);
    assert_eq!(log.lock().unwrap()[1].path, "/payment/verify/ECRS-TXN-1");
}
