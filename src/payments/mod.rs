//! EcrasPay gateway SDK
//!
//! A thin client over the EcrasPay REST API: a request envelope that handles
//! authentication and error translation, typed sub-clients per API area, and
//! card payload encryption for the direct card flow.

pub mod card_crypto;
pub mod client;
pub mod config;
pub mod endpoints;
pub mod envelope;
pub mod errors;
pub mod traits;
pub mod transport;
pub mod types;

#[cfg(test)]
pub(crate) mod test_support;

pub use card_crypto::{encrypt_card, encrypt_card_with_key, load_public_key, PublicKeySource};
pub use client::EcrasPay;
pub use config::{Environment, GatewayConfig};
pub use envelope::{ApiClient, Envelope};
pub use errors::{GatewayError, GatewayResult, RecoverClientError};
pub use traits::{HttpRequest, HttpResponse, HttpTransport};
pub use transport::ReqwestTransport;
pub use types::{
    CardDetails, Currency, FeeBearer, InitiateTransactionRequest, PaymentMethod, PaymentStatus,
    MAX_AMOUNT,
};
