//! EcrasPay request types and shared payment enums

use crate::payments::errors::{GatewayError, GatewayResult};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;

/// Supported settlement currencies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Currency {
    #[default]
    Usd,
    Eur,
    Gbp,
    Ngn,
}

impl Currency {
    pub fn as_str(&self) -> &'static str {
        match self {
            Currency::Usd => "USD",
            Currency::Eur => "EUR",
            Currency::Gbp => "GBP",
            Currency::Ngn => "NGN",
        }
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Currency {
    type Err = GatewayError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "USD" => Ok(Currency::Usd),
            "EUR" => Ok(Currency::Eur),
            "GBP" => Ok(Currency::Gbp),
            "NGN" => Ok(Currency::Ngn),
            other => Err(GatewayError::validation(format!("Unsupported currency '{}'", other))),
        }
    }
}

/// Payment channel offered at checkout
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    #[default]
    Card,
    BankTransfer,
    Ussd,
}

impl PaymentMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentMethod::Card => "card",
            PaymentMethod::BankTransfer => "bank_transfer",
            PaymentMethod::Ussd => "ussd",
        }
    }
}

impl fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PaymentMethod {
    type Err = GatewayError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "card" => Ok(PaymentMethod::Card),
            "bank_transfer" => Ok(PaymentMethod::BankTransfer),
            "ussd" => Ok(PaymentMethod::Ussd),
            other => Err(GatewayError::validation(format!(
                "Unsupported payment method '{}'",
                other
            ))),
        }
    }
}

/// Who pays the gateway fee
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FeeBearer {
    Customer,
    Merchant,
}

/// Lifecycle status of a stored payment record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    #[default]
    Pending,
    InProgress,
    Success,
    Failed,
    Cancelled,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Pending => "pending",
            PaymentStatus::InProgress => "in_progress",
            PaymentStatus::Success => "success",
            PaymentStatus::Failed => "failed",
            PaymentStatus::Cancelled => "cancelled",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            PaymentStatus::Success | PaymentStatus::Failed | PaymentStatus::Cancelled
        )
    }

    /// Re-applying the current status is always allowed; terminal statuses
    /// accept nothing else.
    pub fn can_transition_to(&self, next: PaymentStatus) -> bool {
        if *self == next {
            return true;
        }
        match self {
            PaymentStatus::Pending => true,
            PaymentStatus::InProgress => next != PaymentStatus::Pending,
            _ => false,
        }
    }
}

impl PaymentStatus {
    /// Record status implied by the `status` a verify call reports.
    ///
    /// `None` for outcomes that are still open or not recognised.
    pub fn from_gateway_outcome(outcome: &str) -> Option<Self> {
        match outcome.trim().to_ascii_uppercase().as_str() {
            "SUCCESS" | "SUCCESSFUL" | "PAID" | "COMPLETED" => Some(PaymentStatus::Success),
            "FAILED" | "FAILURE" | "DECLINED" | "ABANDONED" => Some(PaymentStatus::Failed),
            "CANCELLED" | "CANCELED" => Some(PaymentStatus::Cancelled),
            _ => None,
        }
    }
}

impl fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PaymentStatus {
    type Err = GatewayError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "pending" => Ok(PaymentStatus::Pending),
            "in_progress" => Ok(PaymentStatus::InProgress),
            "success" => Ok(PaymentStatus::Success),
            "failed" => Ok(PaymentStatus::Failed),
            "cancelled" => Ok(PaymentStatus::Cancelled),
            other => Err(GatewayError::validation(format!(
                "Unknown payment status '{}'",
                other
            ))),
        }
    }
}

/// Largest amount a payment record can hold (`NUMERIC(18,2)`)
pub const MAX_AMOUNT: u64 = 9_999_999_999_999_999;

/// Payload keys owned by typed request fields
const TYPED_PAYLOAD_KEYS: &[&str] = &[
    "amount",
    "paymentReference",
    "customerName",
    "customerEmail",
    "redirectUrl",
    "description",
    "feeBearer",
    "currency",
    "paymentMethods",
    "customerPhoneNumber",
    "metadata",
];

/// Request to open a new transaction with the gateway
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InitiateTransactionRequest {
    /// Amount to charge, in the currency's major unit as the gateway expects
    pub amount: u64,
    /// Caller-chosen unique reference
    pub payment_reference: String,
    pub customer_name: String,
    pub customer_email: String,
    #[serde(default)]
    pub redirect_url: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub fee_bearer: Option<FeeBearer>,
    #[serde(default)]
    pub currency: Currency,
    #[serde(default)]
    pub payment_method: PaymentMethod,
    #[serde(default)]
    pub customer_phone: Option<String>,
    #[serde(default)]
    pub metadata: Option<Value>,
    /// Additional gateway fields, merged into the payload verbatim. Keys
    /// owned by the typed fields are rejected by `validate`.
    #[serde(default)]
    pub extra: Map<String, Value>,
}

impl InitiateTransactionRequest {
    pub fn new(
        amount: u64,
        payment_reference: impl Into<String>,
        customer_name: impl Into<String>,
        customer_email: impl Into<String>,
    ) -> Self {
        Self {
            amount,
            payment_reference: payment_reference.into(),
            customer_name: customer_name.into(),
            customer_email: customer_email.into(),
            redirect_url: None,
            description: None,
            fee_bearer: None,
            currency: Currency::default(),
            payment_method: PaymentMethod::default(),
            customer_phone: None,
            metadata: None,
            extra: Map::new(),
        }
    }

    pub fn currency(mut self, currency: Currency) -> Self {
        self.currency = currency;
        self
    }

    pub fn payment_method(mut self, payment_method: PaymentMethod) -> Self {
        self.payment_method = payment_method;
        self
    }

    pub fn redirect_url(mut self, redirect_url: impl Into<String>) -> Self {
        self.redirect_url = Some(redirect_url.into());
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn fee_bearer(mut self, fee_bearer: FeeBearer) -> Self {
        self.fee_bearer = Some(fee_bearer);
        self
    }

    pub fn customer_phone(mut self, customer_phone: impl Into<String>) -> Self {
        self.customer_phone = Some(customer_phone.into());
        self
    }

    pub fn metadata(mut self, metadata: Value) -> Self {
        self.metadata = Some(metadata);
        self
    }

    pub fn extra(mut self, key: impl Into<String>, value: Value) -> Self {
        self.extra.insert(key.into(), value);
        self
    }

    pub fn validate(&self) -> GatewayResult<()> {
        if self.amount == 0 {
            return Err(GatewayError::validation("amount must be greater than 0"));
        }
        if self.amount > MAX_AMOUNT {
            return Err(GatewayError::validation(format!(
                "amount must not exceed {}",
                MAX_AMOUNT
            )));
        }
        if self.payment_reference.trim().is_empty() {
            return Err(GatewayError::validation("payment_reference is required"));
        }
        if self.customer_name.trim().is_empty() {
            return Err(GatewayError::validation("customer_name is required"));
        }
        if self.customer_email.trim().is_empty() {
            return Err(GatewayError::validation("customer_email is required"));
        }
        if let Some(key) = self
            .extra
            .keys()
            .find(|key| TYPED_PAYLOAD_KEYS.contains(&key.as_str()))
        {
            return Err(GatewayError::validation(format!(
                "extra field '{}' must be set through its typed field",
                key
            )));
        }
        Ok(())
    }

    /// Gateway payload: absent optionals are omitted, `extra` is merged last.
    pub fn to_payload(&self) -> Map<String, Value> {
        let mut payload = Map::new();
        payload.insert("amount".to_string(), Value::from(self.amount));
        payload.insert(
            "paymentReference".to_string(),
            Value::String(self.payment_reference.clone()),
        );
        payload.insert(
            "customerName".to_string(),
            Value::String(self.customer_name.clone()),
        );
        payload.insert(
            "customerEmail".to_string(),
            Value::String(self.customer_email.clone()),
        );

        if let Some(redirect_url) = &self.redirect_url {
            payload.insert("redirectUrl".to_string(), Value::String(redirect_url.clone()));
        }
        if let Some(description) = &self.description {
            payload.insert("description".to_string(), Value::String(description.clone()));
        }
        if let Some(fee_bearer) = self.fee_bearer {
            payload.insert("feeBearer".to_string(), serde_json::json!(fee_bearer));
        }

        payload.insert(
            "currency".to_string(),
            Value::String(self.currency.as_str().to_string()),
        );
        payload.insert(
            "paymentMethods".to_string(),
            Value::String(self.payment_method.as_str().to_string()),
        );

        if let Some(phone) = &self.customer_phone {
            payload.insert("customerPhoneNumber".to_string(), Value::String(phone.clone()));
        }
        if let Some(metadata) = &self.metadata {
            payload.insert("metadata".to_string(), metadata.clone());
        }

        for (key, value) in &self.extra {
            payload.insert(key.clone(), value.clone());
        }

        payload
    }
}

/// Raw card data, encrypted before it ever leaves the process
#[derive(Clone, Serialize, Deserialize)]
pub struct CardDetails {
    pub pan: String,
    #[serde(rename = "expiryDate", alias = "expiry_date")]
    pub expiry_date: String,
    pub cvv: String,
    pub pin: String,
}

impl CardDetails {
    pub fn new(
        pan: impl Into<String>,
        expiry_date: impl Into<String>,
        cvv: impl Into<String>,
        pin: impl Into<String>,
    ) -> Self {
        Self {
            pan: pan.into(),
            expiry_date: expiry_date.into(),
            cvv: cvv.into(),
            pin: pin.into(),
        }
    }
}

impl fmt::Debug for CardDetails {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("CardDetails { <redacted> }")
    }
}
