use crate::payments::endpoints::path_reference;
use crate::payments::envelope::ApiClient;
use crate::payments::errors::{GatewayError, GatewayResult};
use serde_json::{Map, Value};
use std::sync::Arc;
use tracing::info;

/// USSD payment endpoints
#[derive(Debug, Clone)]
pub struct UssdApi {
    client: Arc<ApiClient>,
}

impl UssdApi {
    pub fn new(client: Arc<ApiClient>) -> Self {
        Self { client }
    }

    /// Request a USSD dial code for `transaction_ref` at `bank_name`
    pub async fn initiate_ussd_payment(
        &self,
        bank_name: &str,
        transaction_ref: &str,
    ) -> GatewayResult<Value> {
        if bank_name.trim().is_empty() {
            return Err(GatewayError::validation("bank_name is required"));
        }
        let transaction_ref = path_reference("transaction_ref", transaction_ref)?;

        info!(
            "Requesting EcrasPay USSD code: reference={}, bank={}",
            transaction_ref, bank_name
        );

        let mut payload = Map::new();
        payload.insert("bank_name".to_string(), Value::String(bank_name.trim().to_string()));

        self.client
            .post(format!("payment/ussd/request-ussd-code/{}", transaction_ref), payload)
            .await
    }

    /// Banks that accept USSD payments
    pub async fn get_bank_list(&self) -> GatewayResult<Value> {
        self.client
            .get("third-party/payment/ussd/supported-banks")
            .await
    }
}
