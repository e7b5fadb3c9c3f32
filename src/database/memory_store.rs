use crate::database::error::{DatabaseError, DatabaseErrorKind};
use crate::database::repository::{NewPayment, Payment, PaymentStore};
use crate::payments::types::PaymentStatus;
use async_trait::async_trait;
use chrono::Utc;
use std::sync::Mutex;
use uuid::Uuid;

/// In-process `PaymentStore` for tests and database-less runs
#[derive(Debug, Default)]
pub struct InMemoryPaymentStore {
    payments: Mutex<Vec<Payment>>,
}

impl InMemoryPaymentStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.lock().map(|p| p.len()).unwrap_or_default()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Vec<Payment>>, DatabaseError> {
        self.payments.lock().map_err(|_| {
            DatabaseError::new(DatabaseErrorKind::Unknown {
                message: "payment store lock poisoned".to_string(),
            })
        })
    }
}

fn matches_reference(payment: &Payment, reference: &str) -> bool {
    payment.payment_reference == reference
        || payment.transaction_reference.as_deref() == Some(reference)
}

#[async_trait]
impl PaymentStore for InMemoryPaymentStore {
    async fn create(&self, payment: &NewPayment) -> Result<Payment, DatabaseError> {
        let mut payments = self.lock()?;

        if payments
            .iter()
            .any(|p| p.payment_reference == payment.payment_reference)
        {
            return Err(DatabaseError::new(DatabaseErrorKind::UniqueConstraintViolation {
                column: "payment_reference".to_string(),
                value: payment.payment_reference.clone(),
            }));
        }

        let now = Utc::now();
        let record = Payment {
            id: Uuid::new_v4(),
            payment_reference: payment.payment_reference.clone(),
            transaction_reference: payment.transaction_reference.clone(),
            amount: payment.amount,
            currency: payment.currency,
            status: PaymentStatus::Pending,
            payment_method: payment.payment_method,
            gateway_reference: None,
            metadata: payment.metadata.clone(),
            created_at: now,
            updated_at: now,
        };
        payments.push(record.clone());
        Ok(record)
    }

    async fn find_by_reference(&self, reference: &str) -> Result<Option<Payment>, DatabaseError> {
        Ok(self
            .lock()?
            .iter()
            .find(|p| matches_reference(p, reference))
            .cloned())
    }

    async fn update_status(
        &self,
        reference: &str,
        expected: PaymentStatus,
        status: PaymentStatus,
    ) -> Result<Payment, DatabaseError> {
        let mut payments = self.lock()?;
        let payment = payments
            .iter_mut()
            .find(|p| matches_reference(p, reference))
            .ok_or_else(|| DatabaseError::not_found("Payment", reference))?;

        if payment.status != expected {
            return Err(DatabaseError::conflict(
                "Payment",
                reference,
                format!("expected status {} but found {}", expected, payment.status),
            ));
        }

        payment.status = status;
        payment.updated_at = Utc::now();
        Ok(payment.clone())
    }

    async fn set_gateway_reference(
        &self,
        reference: &str,
        gateway_reference: &str,
    ) -> Result<Payment, DatabaseError> {
        let mut payments = self.lock()?;
        let payment = payments
            .iter_mut()
            .find(|p| matches_reference(p, reference))
            .ok_or_else(|| DatabaseError::not_found("Payment", reference))?;

        payment.gateway_reference = Some(gateway_reference.to_string());
        payment.updated_at = Utc::now();
        Ok(payment.clone())
    }
}
