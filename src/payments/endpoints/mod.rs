//! Typed wrappers over the EcrasPay REST endpoints
//!
//! One sub-client per API area. Each method builds its payload, sends it
//! through the shared [`ApiClient`](crate::payments::envelope::ApiClient) and
//! returns the gateway's JSON response untouched.

pub mod bank_transfer;
pub mod card;
pub mod transaction;
pub mod ussd;

pub use bank_transfer::BankTransferApi;
pub use card::CardApi;
pub use transaction::TransactionApi;
pub use ussd::UssdApi;

use crate::payments::errors::{GatewayError, GatewayResult};

/// Check a value interpolated into an endpoint path.
pub(crate) fn path_reference<'a>(name: &str, value: &'a str) -> GatewayResult<&'a str> {
    let value = value.trim();
    if value.is_empty() {
        return Err(GatewayError::validation(format!("{} is required", name)));
    }
    if value.contains(['/', '?', '#']) {
        return Err(GatewayError::validation(format!(
            "{} must not contain '/', '?' or '#'",
            name
        )));
    }
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_path_reference_rejects_blank_and_separators() {
        assert_eq!(path_reference("transaction_ref", " txn_1 ").unwrap(), "txn_1");
        assert!(path_reference("transaction_ref", "").is_err());
        assert!(path_reference("transaction_ref", "../status").is_err());
        assert!(path_reference("transaction_ref", "a?b=c").is_err());
    }
}
