//! Payment service: SDK calls paired with local payment records.
//!
//! Every operation calls the gateway first and only touches the store once
//! the gateway accepted the call. Status changes go through the store's
//! compare-and-set so two concurrent updates cannot both win.

use crate::database::error::{DatabaseError, DatabaseErrorKind};
use crate::database::repository::{NewPayment, Payment, PaymentStore};
use crate::payments::card_crypto::PublicKeySource;
use crate::payments::client::EcrasPay;
use crate::payments::errors::GatewayError;
use crate::payments::types::{CardDetails, InitiateTransactionRequest, PaymentStatus};
use rust_decimal::Decimal;
use serde::Serialize;
use serde_json::{Map, Value};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, error, info, warn};

pub type ServiceResult<T> = Result<T, ServiceError>;

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error(transparent)]
    Gateway(#[from] GatewayError),

    #[error(transparent)]
    Database(#[from] DatabaseError),

    #[error("payment '{reference}' not found")]
    PaymentNotFound { reference: String },

    #[error("payment '{reference}' cannot move from {from} to {to}")]
    InvalidTransition {
        reference: String,
        from: PaymentStatus,
        to: PaymentStatus,
    },

    /// The gateway opened the transaction but no local record was written
    #[error("payment '{payment_reference}' was opened with the gateway but not recorded: {source}")]
    Unrecorded {
        payment_reference: String,
        transaction_reference: Option<String>,
        #[source]
        source: DatabaseError,
    },
}

impl ServiceError {
    fn not_found(reference: &str) -> Self {
        ServiceError::PaymentNotFound {
            reference: reference.to_string(),
        }
    }
}

/// Result of a successful initiation
#[derive(Debug, Clone, Serialize)]
pub struct InitiatedPayment {
    pub payment: Payment,
    pub gateway_response: Value,
}

#[derive(Clone)]
pub struct PaymentService {
    sdk: EcrasPay,
    store: Arc<dyn PaymentStore>,
}

impl PaymentService {
    pub fn new(sdk: EcrasPay, store: Arc<dyn PaymentStore>) -> Self {
        Self { sdk, store }
    }

    pub fn sdk(&self) -> &EcrasPay {
        &self.sdk
    }

    pub fn store(&self) -> &Arc<dyn PaymentStore> {
        &self.store
    }

    /// Local record by payment or transaction reference
    pub async fn get_payment(&self, reference: &str) -> ServiceResult<Payment> {
        self.store
            .find_by_reference(reference)
            .await?
            .ok_or_else(|| ServiceError::not_found(reference))
    }

    // Transactions

    /// Open a transaction with the gateway and record it as `pending`.
    ///
    /// A reference that is already recorded is rejected before the gateway
    /// is contacted.
    pub async fn initiate_transaction(
        &self,
        request: &InitiateTransactionRequest,
    ) -> ServiceResult<InitiatedPayment> {
        request.validate()?;

        if self.store.exists(&request.payment_reference).await? {
            warn!(
                "Payment reference {} already recorded, refusing to initiate again",
                request.payment_reference
            );
            return Err(DatabaseError::new(DatabaseErrorKind::UniqueConstraintViolation {
                column: "payment_reference".to_string(),
                value: request.payment_reference.clone(),
            })
            .into());
        }

        let response = self
            .sdk
            .transaction
            .initiate_transaction(request)
            .await
            .map_err(|e| {
                error!(
                    "Failed to initiate transaction {}: {}",
                    request.payment_reference, e
                );
                e
            })?;

        let transaction_reference = response
            .pointer("/responseBody/transactionReference")
            .and_then(Value::as_str)
            .map(str::to_string);

        let payment = self
            .store
            .create(&NewPayment {
                payment_reference: request.payment_reference.clone(),
                transaction_reference: transaction_reference.clone(),
                amount: Decimal::from(request.amount),
                currency: request.currency,
                payment_method: Some(request.payment_method),
                metadata: request.metadata.clone().unwrap_or_else(|| Value::Object(Map::new())),
            })
            .await
            .map_err(|e| {
                error!(
                    "Gateway opened transaction {} for payment {} but recording it failed: {}",
                    transaction_reference.as_deref().unwrap_or("none"),
                    request.payment_reference,
                    e
                );
                ServiceError::Unrecorded {
                    payment_reference: request.payment_reference.clone(),
                    transaction_reference,
                    source: e,
                }
            })?;

        info!(
            "Transaction {} initialized (gateway reference: {})",
            payment.payment_reference,
            payment.transaction_reference.as_deref().unwrap_or("none")
        );

        Ok(InitiatedPayment {
            payment,
            gateway_response: response,
        })
    }

    pub async fn get_transaction_details(&self, reference: &str) -> ServiceResult<Value> {
        let gateway_ref = self.gateway_reference(reference).await?;
        let response = self
            .sdk
            .transaction
            .get_transaction_details(&gateway_ref)
            .await?;
        info!("Fetched details for transaction {}", gateway_ref);
        Ok(response)
    }

    pub async fn get_transaction_status(&self, reference: &str) -> ServiceResult<Value> {
        let gateway_ref = self.gateway_reference(reference).await?;
        let response = self
            .sdk
            .transaction
            .get_transaction_status(&gateway_ref)
            .await?;
        info!("Fetched status for transaction {}", gateway_ref);
        Ok(response)
    }

    /// Verify with the gateway and record the outcome it reports
    pub async fn verify_transaction(&self, reference: &str) -> ServiceResult<Value> {
        let payment = self.payment_for_verification(reference).await?;
        let gateway_ref = gateway_reference_of(&payment);

        let response = self.sdk.transaction.verify_transaction(gateway_ref).await?;
        self.apply_outcome(&payment, &response).await?;

        info!("Transaction {} verified", gateway_ref);
        Ok(response)
    }

    /// Cancel with the gateway and mark the record `cancelled`
    pub async fn cancel_transaction(&self, reference: &str) -> ServiceResult<Value> {
        let payment = self.payment_for_transition(reference, PaymentStatus::Cancelled).await?;
        let gateway_ref = gateway_reference_of(&payment);

        let response = self.sdk.transaction.cancel_transaction(gateway_ref).await?;
        self.apply_status(&payment, PaymentStatus::Cancelled).await?;

        info!("Transaction {} cancelled", gateway_ref);
        Ok(response)
    }

    // Card

    /// Charge an already encrypted card payload
    pub async fn initiate_card_payment(
        &self,
        reference: &str,
        card_payload: &str,
        device_details: Map<String, Value>,
    ) -> ServiceResult<Value> {
        let payment = self.payment_for_transition(reference, PaymentStatus::InProgress).await?;
        let gateway_ref = gateway_reference_of(&payment);

        let response = self
            .sdk
            .card
            .initiate_payment(card_payload, gateway_ref, device_details)
            .await?;
        self.apply_status(&payment, PaymentStatus::InProgress).await?;

        if let Some(card_ref) = response
            .pointer("/responseBody/gatewayReference")
            .and_then(Value::as_str)
        {
            self.store
                .set_gateway_reference(&payment.payment_reference, card_ref)
                .await?;
            debug!("Payment {} gateway reference {}", payment.payment_reference, card_ref);
        }

        info!("Card payment initiated for transaction {}", gateway_ref);
        Ok(response)
    }

    /// Encrypt `card` locally, then charge it
    pub async fn initiate_card_payment_with_card<'a>(
        &self,
        reference: &str,
        card: &CardDetails,
        public_key: impl Into<PublicKeySource<'a>>,
        device_details: Map<String, Value>,
    ) -> ServiceResult<Value> {
        let card_payload = crate::payments::card_crypto::encrypt_card(card, public_key)?;
        self.initiate_card_payment(reference, &card_payload, device_details)
            .await
    }

    pub async fn submit_card_otp(&self, otp: &str, gateway_ref: &str) -> ServiceResult<Value> {
        let response = self.sdk.card.submit_otp(otp, gateway_ref).await?;
        info!("OTP submitted for gateway reference {}", gateway_ref);
        Ok(response)
    }

    pub async fn resend_card_otp(&self, gateway_ref: &str) -> ServiceResult<Value> {
        let response = self.sdk.card.resend_otp(gateway_ref).await?;
        info!("OTP resend requested for gateway reference {}", gateway_ref);
        Ok(response)
    }

    pub async fn get_card_payment_details(&self, reference: &str) -> ServiceResult<Value> {
        let gateway_ref = self.gateway_reference(reference).await?;
        let response = self.sdk.card.get_card_details(&gateway_ref).await?;
        info!("Retrieved card details for transaction {}", gateway_ref);
        Ok(response)
    }

    /// Verify a card charge and record the outcome it reports
    pub async fn verify_card_payment(&self, reference: &str) -> ServiceResult<Value> {
        let payment = self.payment_for_verification(reference).await?;
        let gateway_ref = gateway_reference_of(&payment);

        let response = self.sdk.card.verify_card_payment(gateway_ref).await?;
        self.apply_outcome(&payment, &response).await?;

        info!("Card payment verified for transaction {}", gateway_ref);
        Ok(response)
    }

    // USSD

    pub async fn initiate_ussd_payment(&self, reference: &str, bank_name: &str) -> ServiceResult<Value> {
        let payment = self.payment_for_transition(reference, PaymentStatus::InProgress).await?;
        let gateway_ref = gateway_reference_of(&payment);

        let response = self
            .sdk
            .ussd
            .initiate_ussd_payment(bank_name, gateway_ref)
            .await?;
        self.apply_status(&payment, PaymentStatus::InProgress).await?;

        info!("USSD payment initiated for transaction {}", gateway_ref);
        Ok(response)
    }

    pub async fn get_ussd_supported_banks(&self) -> ServiceResult<Value> {
        let response = self.sdk.ussd.get_bank_list().await?;
        info!("Retrieved USSD supported banks");
        Ok(response)
    }

    // Bank transfer

    /// Request a virtual account for the transfer and mark the record `in_progress`
    pub async fn request_bank_transfer_account(&self, reference: &str) -> ServiceResult<Value> {
        let payment = self.payment_for_transition(reference, PaymentStatus::InProgress).await?;
        let gateway_ref = gateway_reference_of(&payment);

        let response = self
            .sdk
            .bank_transfer
            .initialize_bank_transfer(gateway_ref)
            .await?;
        self.apply_status(&payment, PaymentStatus::InProgress).await?;

        info!("Bank transfer account requested for transaction {}", gateway_ref);
        Ok(response)
    }

    // Helpers

    /// Gateway reference for a read-only call. Unknown references are passed
    /// through unchanged so transactions created elsewhere can still be read.
    async fn gateway_reference(&self, reference: &str) -> ServiceResult<String> {
        Ok(match self.store.find_by_reference(reference).await? {
            Some(payment) => gateway_reference_of(&payment).to_string(),
            None => reference.to_string(),
        })
    }

    /// Load the record and reject transitions it cannot take before the
    /// gateway is contacted.
    async fn payment_for_transition(
        &self,
        reference: &str,
        target: PaymentStatus,
    ) -> ServiceResult<Payment> {
        let payment = self.get_payment(reference).await?;

        if !payment.status.can_transition_to(target) {
            warn!(
                "Rejected transition for payment {}: {} -> {}",
                payment.payment_reference, payment.status, target
            );
            return Err(ServiceError::InvalidTransition {
                reference: payment.payment_reference,
                from: payment.status,
                to: target,
            });
        }

        Ok(payment)
    }

    /// A verify call can settle the record as either `success` or `failed`,
    /// so only records that can reach neither are turned away.
    async fn payment_for_verification(&self, reference: &str) -> ServiceResult<Payment> {
        let payment = self.get_payment(reference).await?;

        if !payment.status.can_transition_to(PaymentStatus::Success)
            && !payment.status.can_transition_to(PaymentStatus::Failed)
        {
            warn!(
                "Rejected verification for payment {} in status {}",
                payment.payment_reference, payment.status
            );
            return Err(ServiceError::InvalidTransition {
                reference: payment.payment_reference,
                from: payment.status,
                to: PaymentStatus::Success,
            });
        }

        Ok(payment)
    }

    /// Move the record to the status named by `responseBody.status`. Open or
    /// unrecognised outcomes, and outcomes the record can no longer take,
    /// leave it unchanged.
    async fn apply_outcome(&self, payment: &Payment, response: &Value) -> ServiceResult<Payment> {
        let outcome = response
            .pointer("/responseBody/status")
            .and_then(Value::as_str);

        match outcome.and_then(PaymentStatus::from_gateway_outcome) {
            Some(target) if payment.status.can_transition_to(target) => {
                self.apply_status(payment, target).await
            }
            Some(target) => {
                warn!(
                    "Gateway reports {} for payment {} already {}, record left unchanged",
                    target, payment.payment_reference, payment.status
                );
                Ok(payment.clone())
            }
            None => {
                info!(
                    "Gateway outcome {:?} for payment {} is not final, record left unchanged",
                    outcome, payment.payment_reference
                );
                Ok(payment.clone())
            }
        }
    }

    async fn apply_status(&self, payment: &Payment, target: PaymentStatus) -> ServiceResult<Payment> {
        if payment.status == target {
            return Ok(payment.clone());
        }

        let updated = self
            .store
            .update_status(&payment.payment_reference, payment.status, target)
            .await
            .map_err(|e| {
                if e.is_not_found() {
                    ServiceError::not_found(&payment.payment_reference)
                } else {
                    ServiceError::Database(e)
                }
            })?;

        info!(
            "Payment {} status {} -> {}",
            updated.payment_reference, payment.status, updated.status
        );
        Ok(updated)
    }
}

fn gateway_reference_of(payment: &Payment) -> &str {
    payment
        .transaction_reference
        .as_deref()
        .unwrap_or(&payment.payment_reference)
}

impl std::fmt::Debug for PaymentService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PaymentService")
            .field("sdk", &self.sdk)
            .finish_non_exhaustive()
    }
}
