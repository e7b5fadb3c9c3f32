use crate::database::error::DbResult;
use crate::payments::types::{Currency, PaymentMethod, PaymentStatus};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// Stored payment record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Payment {
    pub id: Uuid,
    /// Caller-chosen reference, unique and immutable
    pub payment_reference: String,
    /// Reference assigned by the gateway on initiation
    pub transaction_reference: Option<String>,
    pub amount: Decimal,
    pub currency: Currency,
    pub status: PaymentStatus,
    pub payment_method: Option<PaymentMethod>,
    pub gateway_reference: Option<String>,
    pub metadata: Value,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Fields supplied when a payment is first recorded
#[derive(Debug, Clone)]
pub struct NewPayment {
    pub payment_reference: String,
    pub transaction_reference: Option<String>,
    pub amount: Decimal,
    pub currency: Currency,
    pub payment_method: Option<PaymentMethod>,
    pub metadata: Value,
}

/// Persistence contract for payment records.
///
/// Records are never deleted. `reference` arguments match either the
/// payment reference or the gateway transaction reference.
#[async_trait]
pub trait PaymentStore: Send + Sync {
    /// Insert a new record with status `pending`
    async fn create(&self, payment: &NewPayment) -> DbResult<Payment>;

    async fn find_by_reference(&self, reference: &str) -> DbResult<Option<Payment>>;

    /// Compare-and-set the status.
    ///
    /// Fails with `Conflict` if the stored status is no longer `expected`, and
    /// with `NotFound` if no record matches.
    async fn update_status(
        &self,
        reference: &str,
        expected: PaymentStatus,
        status: PaymentStatus,
    ) -> DbResult<Payment>;

    /// Attach the reference the gateway issued for a card charge
    async fn set_gateway_reference(
        &self,
        reference: &str,
        gateway_reference: &str,
    ) -> DbResult<Payment>;

    /// Check if a record exists by reference
    async fn exists(&self, reference: &str) -> DbResult<bool> {
        match self.find_by_reference(reference).await {
            Ok(Some(_)) => Ok(true),
            Ok(None) => Ok(false),
            Err(e) => Err(e),
        }
    }
}
