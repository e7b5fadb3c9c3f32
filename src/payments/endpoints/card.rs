use crate::payments::card_crypto::{encrypt_card, PublicKeySource};
use crate::payments::endpoints::path_reference;
use crate::payments::envelope::ApiClient;
use crate::payments::errors::{GatewayError, GatewayResult};
use crate::payments::types::CardDetails;
use serde_json::{Map, Value};
use std::sync::Arc;
use tracing::info;

/// Direct card payment endpoints
#[derive(Debug, Clone)]
pub struct CardApi {
    client: Arc<ApiClient>,
}

impl CardApi {
    pub fn new(client: Arc<ApiClient>) -> Self {
        Self { client }
    }

    /// Start a card charge with an already encrypted card payload.
    pub async fn initiate_payment(
        &self,
        card_payload: &str,
        transaction_ref: &str,
        device_details: Map<String, Value>,
    ) -> GatewayResult<Value> {
        if card_payload.trim().is_empty() {
            return Err(GatewayError::validation("card_payload is required"));
        }
        let transaction_ref = path_reference("transaction_ref", transaction_ref)?;

        info!("Initiating EcrasPay card payment: reference={}", transaction_ref);

        let mut payload = Map::new();
        payload.insert("payload".to_string(), Value::String(card_payload.to_string()));
        payload.insert(
            "transactionReference".to_string(),
            Value::String(transaction_ref.to_string()),
        );
        payload.insert("deviceDetails".to_string(), Value::Object(device_details));

        self.client.post("payment/cards/initialize", payload).await
    }

    /// Encrypt `card` with the gateway public key, then start the charge.
    pub async fn initiate_payment_with_card<'a>(
        &self,
        card: &CardDetails,
        public_key: impl Into<PublicKeySource<'a>>,
        transaction_ref: &str,
        device_details: Map<String, Value>,
    ) -> GatewayResult<Value> {
        let card_payload = encrypt_card(card, public_key)?;
        self.initiate_payment(&card_payload, transaction_ref, device_details)
            .await
    }

    pub async fn submit_otp(&self, otp: &str, gateway_ref: &str) -> GatewayResult<Value> {
        if otp.trim().is_empty() {
            return Err(GatewayError::validation("otp is required"));
        }
        if gateway_ref.trim().is_empty() {
            return Err(GatewayError::validation("gateway_ref is required"));
        }

        info!("Submitting EcrasPay card OTP: gateway_reference={}", gateway_ref);

        let mut payload = Map::new();
        payload.insert("otp".to_string(), Value::String(otp.trim().to_string()));
        payload.insert(
            "gatewayReference".to_string(),
            Value::String(gateway_ref.trim().to_string()),
        );

        self.client.post("payment/cards/otp/submit/", payload).await
    }

    pub async fn resend_otp(&self, gateway_ref: &str) -> GatewayResult<Value> {
        if gateway_ref.trim().is_empty() {
            return Err(GatewayError::validation("gateway_ref is required"));
        }

        let mut payload = Map::new();
        payload.insert(
            "gatewayReference".to_string(),
            Value::String(gateway_ref.trim().to_string()),
        );

        self.client.post("payment/cards/otp/resend/", payload).await
    }

    pub async fn get_card_details(&self, transaction_ref: &str) -> GatewayResult<Value> {
        let transaction_ref = path_reference("transaction_ref", transaction_ref)?;
        self.client
            .get(format!("payment/cards/details/{}", transaction_ref))
            .await
    }

    pub async fn verify_card_payment(&self, transaction_ref: &str) -> GatewayResult<Value> {
        let transaction_ref = path_reference("transaction_ref", transaction_ref)?;

        info!("Verifying EcrasPay card payment: reference={}", transaction_ref);

        let mut payload = Map::new();
        payload.insert(
            "transactionReference".to_string(),
            Value::String(transaction_ref.to_string()),
        );

        self.client.post("payment/cards/verify/", payload).await
    }
}
