use crate::database::error::{DatabaseError, DatabaseErrorKind};
use crate::database::repository::{NewPayment, Payment, PaymentStore};
use crate::payments::errors::GatewayError;
use crate::payments::types::{Currency, PaymentMethod, PaymentStatus};
use async_trait::async_trait;
use rust_decimal::Decimal;
use sqlx::{FromRow, PgPool};
use tracing::{debug, warn};
use uuid::Uuid;

const PAYMENT_COLUMNS: &str = "id, payment_reference, transaction_reference, amount, currency, status, \
     payment_method, gateway_reference, metadata, created_at, updated_at";

/// Raw `ecraspay_payments` row
#[derive(Debug, Clone, FromRow)]
struct PaymentRow {
    id: Uuid,
    payment_reference: String,
    transaction_reference: Option<String>,
    amount: Decimal,
    currency: String,
    status: String,
    payment_method: Option<String>,
    gateway_reference: Option<String>,
    metadata: serde_json::Value,
    created_at: chrono::DateTime<chrono::Utc>,
    updated_at: chrono::DateTime<chrono::Utc>,
}

impl TryFrom<PaymentRow> for Payment {
    type Error = DatabaseError;

    fn try_from(row: PaymentRow) -> Result<Self, Self::Error> {
        let invalid = |e: GatewayError| {
            DatabaseError::new(DatabaseErrorKind::InvalidData {
                message: e.to_string(),
            })
            .with_context(format!("payment {}", row.payment_reference))
        };

        let currency: Currency = row.currency.parse().map_err(&invalid)?;
        let status: PaymentStatus = row.status.parse().map_err(&invalid)?;
        let payment_method: Option<PaymentMethod> = row
            .payment_method
            .as_deref()
            .map(str::parse::<PaymentMethod>)
            .transpose()
            .map_err(&invalid)?;

        Ok(Payment {
            id: row.id,
            payment_reference: row.payment_reference,
            transaction_reference: row.transaction_reference,
            amount: row.amount,
            currency,
            status,
            payment_method,
            gateway_reference: row.gateway_reference,
            metadata: row.metadata,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

/// Postgres-backed payment repository
#[derive(Debug, Clone)]
pub struct PaymentRepository {
    pool: PgPool,
}

impl PaymentRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl PaymentStore for PaymentRepository {
    async fn create(&self, payment: &NewPayment) -> Result<Payment, DatabaseError> {
        let row = sqlx::query_as::<_, PaymentRow>(&format!(
            "INSERT INTO ecraspay_payments \
             (payment_reference, transaction_reference, amount, currency, status, payment_method, metadata) \
             VALUES ($1, $2, $3, $4, $5, $6, $7) \
             RETURNING {}",
            PAYMENT_COLUMNS
        ))
        .bind(&payment.payment_reference)
        .bind(&payment.transaction_reference)
        .bind(payment.amount)
        .bind(payment.currency.as_str())
        .bind(PaymentStatus::Pending.as_str())
        .bind(payment.payment_method.map(|m| m.as_str()))
        .bind(&payment.metadata)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            DatabaseError::from_sqlx(e).with_context(format!("create payment {}", payment.payment_reference))
        })?;

        debug!("Stored payment {}", payment.payment_reference);
        Payment::try_from(row)
    }

    async fn find_by_reference(&self, reference: &str) -> Result<Option<Payment>, DatabaseError> {
        let row = sqlx::query_as::<_, PaymentRow>(&format!(
            "SELECT {} FROM ecraspay_payments \
             WHERE payment_reference = $1 OR transaction_reference = $1 \
             LIMIT 1",
            PAYMENT_COLUMNS
        ))
        .bind(reference)
        .fetch_optional(&self.pool)
        .await
        .map_err(DatabaseError::from_sqlx)?;

        row.map(Payment::try_from).transpose()
    }

    async fn update_status(
        &self,
        reference: &str,
        expected: PaymentStatus,
        status: PaymentStatus,
    ) -> Result<Payment, DatabaseError> {
        let row = sqlx::query_as::<_, PaymentRow>(&format!(
            "UPDATE ecraspay_payments \
             SET status = $3, updated_at = NOW() \
             WHERE (payment_reference = $1 OR transaction_reference = $1) AND status = $2 \
             RETURNING {}",
            PAYMENT_COLUMNS
        ))
        .bind(reference)
        .bind(expected.as_str())
        .bind(status.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(DatabaseError::from_sqlx)?;

        match row {
            Some(row) => Payment::try_from(row),
            None => match self.find_by_reference(reference).await? {
                Some(current) => {
                    warn!(
                        "Status update for payment {} lost a race: expected {}, found {}",
                        reference, expected, current.status
                    );
                    Err(DatabaseError::conflict(
                        "Payment",
                        reference,
                        format!("expected status {} but found {}", expected, current.status),
                    ))
                }
                None => Err(DatabaseError::not_found("Payment", reference)),
            },
        }
    }

    async fn set_gateway_reference(
        &self,
        reference: &str,
        gateway_reference: &str,
    ) -> Result<Payment, DatabaseError> {
        let row = sqlx::query_as::<_, PaymentRow>(&format!(
            "UPDATE ecraspay_payments \
             SET gateway_reference = $2, updated_at = NOW() \
             WHERE payment_reference = $1 OR transaction_reference = $1 \
             RETURNING {}",
            PAYMENT_COLUMNS
        ))
        .bind(reference)
        .bind(gateway_reference)
        .fetch_optional(&self.pool)
        .await
        .map_err(DatabaseError::from_sqlx)?;

        row.map(Payment::try_from)
            .transpose()?
            .ok_or_else(|| DatabaseError::not_found("Payment", reference))
    }
}
