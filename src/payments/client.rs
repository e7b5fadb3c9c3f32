use crate::payments::config::GatewayConfig;
use crate::payments::endpoints::{BankTransferApi, CardApi, TransactionApi, UssdApi};
use crate::payments::envelope::ApiClient;
use crate::payments::errors::GatewayResult;
use crate::payments::traits::HttpTransport;
use std::sync::Arc;

/// EcrasPay SDK facade.
///
/// Every sub-client shares the same immutable [`ApiClient`]. There is no
/// separate checkout sub-client: checkout initiation, details, status,
/// cancel and verify are the [`TransactionApi`] calls, and verification
/// goes to `payment/verify/{ref}` rather than `payment/transaction/verify/{ref}`.
#[derive(Debug, Clone)]
pub struct EcrasPay {
    pub transaction: TransactionApi,
    pub card: CardApi,
    pub ussd: UssdApi,
    pub bank_transfer: BankTransferApi,
    client: Arc<ApiClient>,
}

impl EcrasPay {
    pub fn new(config: GatewayConfig) -> GatewayResult<Self> {
        Ok(Self::from_client(Arc::new(ApiClient::new(config)?)))
    }

    pub fn from_env() -> GatewayResult<Self> {
        Self::new(GatewayConfig::from_env()?)
    }

    pub fn with_transport(
        config: GatewayConfig,
        transport: Arc<dyn HttpTransport>,
    ) -> GatewayResult<Self> {
        Ok(Self::from_client(Arc::new(ApiClient::with_transport(
            config, transport,
        )?)))
    }

    pub fn from_client(client: Arc<ApiClient>) -> Self {
        Self {
            transaction: TransactionApi::new(client.clone()),
            card: CardApi::new(client.clone()),
            ussd: UssdApi::new(client.clone()),
            bank_transfer: BankTransferApi::new(client.clone()),
            client,
        }
    }

    /// The shared envelope client, for endpoints without a typed wrapper
    pub fn client(&self) -> &Arc<ApiClient> {
        &self.client
    }

    pub fn config(&self) -> &GatewayConfig {
        self.client.config()
    }
}
