use crate::payments::endpoints::path_reference;
use crate::payments::envelope::ApiClient;
use crate::payments::errors::GatewayResult;
use serde_json::Value;
use std::sync::Arc;
use tracing::info;

/// Bank transfer endpoints
#[derive(Debug, Clone)]
pub struct BankTransferApi {
    client: Arc<ApiClient>,
}

impl BankTransferApi {
    pub fn new(client: Arc<ApiClient>) -> Self {
        Self { client }
    }

    /// Request the virtual account the customer should transfer into
    pub async fn initialize_bank_transfer(&self, transaction_ref: &str) -> GatewayResult<Value> {
        let transaction_ref = path_reference("transaction_ref", transaction_ref)?;
        info!("Requesting EcrasPay transfer account: reference={}", transaction_ref);
        self.client
            .get(format!(
                "third-party/payment/bank-transfer/request-bank-account/{}",
                transaction_ref
            ))
            .await
    }
}
