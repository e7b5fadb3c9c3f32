use crate::payments::endpoints::path_reference;
use crate::payments::envelope::ApiClient;
use crate::payments::errors::GatewayResult;
use crate::payments::types::InitiateTransactionRequest;
use serde_json::Value;
use std::sync::Arc;
use tracing::info;

/// Transaction lifecycle endpoints
#[derive(Debug, Clone)]
pub struct TransactionApi {
    client: Arc<ApiClient>,
}

impl TransactionApi {
    pub fn new(client: Arc<ApiClient>) -> Self {
        Self { client }
    }

    /// Open a new transaction.
    ///
    /// The request is validated locally first; nothing is sent when it fails.
    /// Without a `redirect_url` the configured default redirect is used.
    pub async fn initiate_transaction(&self, request: &InitiateTransactionRequest) -> GatewayResult<Value> {
        request.validate()?;

        info!(
            "Initiating EcrasPay transaction: {} {} {}",
            request.amount, request.currency, request.payment_reference
        );

        let mut payload = request.to_payload();
        if request.redirect_url.is_none() {
            if let Some(redirect_url) = &self.client.config().redirect_url {
                payload.insert("redirectUrl".to_string(), Value::String(redirect_url.clone()));
            }
        }

        self.client.post("payment/initiate", payload).await
    }

    pub async fn get_transaction_details(&self, transaction_ref: &str) -> GatewayResult<Value> {
        let transaction_ref = path_reference("transaction_ref", transaction_ref)?;
        self.client
            .get(format!("payment/details/{}", transaction_ref))
            .await
    }

    pub async fn verify_transaction(&self, transaction_ref: &str) -> GatewayResult<Value> {
        let transaction_ref = path_reference("transaction_ref", transaction_ref)?;
        info!("Verifying EcrasPay transaction: reference={}", transaction_ref);
        self.client
            .get(format!("payment/verify/{}", transaction_ref))
            .await
    }

    pub async fn get_transaction_status(&self, transaction_ref: &str) -> GatewayResult<Value> {
        let transaction_ref = path_reference("transaction_ref", transaction_ref)?;
        self.client
            .get(format!("payment/status/{}", transaction_ref))
            .await
    }

    pub async fn cancel_transaction(&self, transaction_ref: &str) -> GatewayResult<Value> {
        let transaction_ref = path_reference("transaction_ref", transaction_ref)?;
        info!("Cancelling EcrasPay transaction: reference={}", transaction_ref);
        self.client
            .get(format!("payment/cancel/{}", transaction_ref))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::payments::config::{Environment, GatewayConfig, SANDBOX_BASE_URL};
    use crate::payments::errors::GatewayError;
    use crate::payments::test_support::RecordingTransport;
    use crate::payments::types::Currency;
    use reqwest::Method;
    use serde_json::json;

    fn api(transport: Arc<RecordingTransport>) -> TransactionApi {
        let client =
            ApiClient::with_transport(GatewayConfig::new("test_key", Environment::Sandbox), transport)
                .unwrap();
        TransactionApi::new(Arc::new(client))
    }

    #[tokio::test]
    async fn test_initiate_transaction_posts_payload_once() {
        let reply = json!({"status": "success", "transaction_id": "12345"});
        let transport = RecordingTransport::ok(reply.clone());
        let api = api(transport.clone());

        let request = InitiateTransactionRequest::new(1000, "ref-1", "John Doe", "johndoe@example.com")
            .currency(Currency::Ngn);
        let response = api.initiate_transaction(&request).await.unwrap();

        assert_eq!(response, reply);
        let calls = transport.requests();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].method, Method::POST);
        assert_eq!(calls[0].url.as_str(), format!("{}/payment/initiate", SANDBOX_BASE_URL));

        let body = transport.last_body().unwrap();
        assert_eq!(body["amount"], 1000);
        assert_eq!(body["paymentReference"], "ref-1");
        assert_eq!(body["currency"], "NGN");
        assert_eq!(body["paymentMethods"], "card");
    }

    #[tokio::test]
    async fn test_configured_redirect_is_the_default() {
        let transport = RecordingTransport::ok(json!({}));
        let config = GatewayConfig::new("test_key", Environment::Sandbox)
            .with_redirect_url("https://shop.example.com/return");
        let api = TransactionApi::new(Arc::new(
            ApiClient::with_transport(config, transport.clone()).unwrap(),
        ));

        let request = InitiateTransactionRequest::new(500, "ref-2", "Jane Doe", "jane@example.com");
        api.initiate_transaction(&request).await.unwrap();
        assert_eq!(
            transport.last_body().unwrap()["redirectUrl"],
            "https://shop.example.com/return"
        );

        let request = request.redirect_url("https://shop.example.com/custom");
        api.initiate_transaction(&request).await.unwrap();
        assert_eq!(
            transport.last_body().unwrap()["redirectUrl"],
            "https://shop.example.com/custom"
        );
    }

    #[tokio::test]
    async fn test_invalid_request_never_reaches_transport() {
        let transport = RecordingTransport::ok(json!({}));
        let api = api(transport.clone());

        let request = InitiateTransactionRequest::new(0, "ref-1", "John Doe", "johndoe@example.com");
        let err = api.initiate_transaction(&request).await.unwrap_err();

        assert!(matches!(err, GatewayError::Validation { .. }));
        assert!(transport.requests().is_empty());
    }

    #[tokio::test]
    async fn test_reference_endpoints_use_get() {
        let transport = RecordingTransport::ok(json!({"responseBody": {}}));
        let api = api(transport.clone());

        api.get_transaction_details("txn_1").await.unwrap();
        api.verify_transaction("txn_1").await.unwrap();
        api.get_transaction_status("txn_1").await.unwrap();
        api.cancel_transaction("txn_1").await.unwrap();

        let paths: Vec<String> = transport
            .requests()
            .iter()
            .map(|r| {
                assert_eq!(r.method, Method::GET);
                assert!(r.body.is_none());
                r.url.path().to_string()
            })
            .collect();
        assert_eq!(
            paths,
            vec![
                "/payment/details/txn_1",
                "/payment/verify/txn_1",
                "/payment/status/txn_1",
                "/payment/cancel/txn_1",
            ]
        );
    }
}
