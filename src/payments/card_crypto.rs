//! Card payload encryption
//!
//! Card fields are serialized to `{"pan","expiryDate","cvv","pin"}`,
//! encrypted with the gateway's RSA public key using PKCS#1 v1.5 padding and
//! base64-encoded for transport.

use crate::payments::errors::{GatewayError, GatewayResult};
use crate::payments::types::CardDetails;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use rsa::pkcs1::DecodeRsaPublicKey;
use rsa::pkcs8::DecodePublicKey;
use rsa::traits::PublicKeyParts;
use rsa::{Pkcs1v15Encrypt, RsaPublicKey};
use std::path::Path;
use tracing::debug;

/// PKCS#1 v1.5 encryption padding overhead in bytes
pub const PKCS1_V15_OVERHEAD: usize = 11;

/// Where the gateway public key comes from
#[derive(Debug, Clone, Copy)]
pub enum PublicKeySource<'a> {
    /// A path to a key file, or the key text itself when no such file can be read
    Text(&'a str),
    /// Key text as raw bytes; must be UTF-8
    Bytes(&'a [u8]),
}

impl<'a> From<&'a str> for PublicKeySource<'a> {
    fn from(value: &'a str) -> Self {
        PublicKeySource::Text(value)
    }
}

impl<'a> From<&'a String> for PublicKeySource<'a> {
    fn from(value: &'a String) -> Self {
        PublicKeySource::Text(value.as_str())
    }
}

impl<'a> From<&'a [u8]> for PublicKeySource<'a> {
    fn from(value: &'a [u8]) -> Self {
        PublicKeySource::Bytes(value)
    }
}

impl<'a> From<&'a Path> for PublicKeySource<'a> {
    fn from(value: &'a Path) -> Self {
        // Non-UTF-8 paths end up rejected as unsupported key input.
        match value.to_str() {
            Some(text) => PublicKeySource::Text(text),
            None => PublicKeySource::Bytes(value.as_os_str().as_encoded_bytes()),
        }
    }
}

/// Load an RSA public key, trying the text as a file path first.
pub fn load_public_key<'a>(source: impl Into<PublicKeySource<'a>>) -> GatewayResult<RsaPublicKey> {
    let key_data = match source.into() {
        PublicKeySource::Text(text) => match std::fs::read_to_string(text) {
            Ok(contents) => {
                debug!("Loaded public key from file");
                contents
            }
            Err(_) => text.to_string(),
        },
        PublicKeySource::Bytes(bytes) => std::str::from_utf8(bytes)
            .map_err(|_| {
                GatewayError::configuration(
                    "Invalid public key format. Provide UTF-8 key data or a key file path.",
                )
            })?
            .to_string(),
    };

    parse_public_key(&key_data)
}

/// Parse SPKI or PKCS#1 key material, PEM-armoured or bare base64 DER.
pub fn parse_public_key(key_data: &str) -> GatewayResult<RsaPublicKey> {
    let key_data = key_data.trim();

    if key_data.contains("-----BEGIN RSA PUBLIC KEY-----") {
        return RsaPublicKey::from_pkcs1_pem(key_data)
            .map_err(|e| GatewayError::key_format(format!("Invalid PKCS#1 public key: {}", e)));
    }

    if key_data.contains("-----BEGIN") {
        return RsaPublicKey::from_public_key_pem(key_data)
            .map_err(|e| GatewayError::key_format(format!("Invalid public key PEM: {}", e)));
    }

    let compact: String = key_data.split_whitespace().collect();
    let der = BASE64
        .decode(compact.as_bytes())
        .map_err(|_| GatewayError::key_format("Public key is neither PEM nor base64 DER"))?;

    RsaPublicKey::from_public_key_der(&der)
        .or_else(|_| RsaPublicKey::from_pkcs1_der(&der))
        .map_err(|e| GatewayError::key_format(format!("Invalid public key DER: {}", e)))
}

/// Largest plaintext a key can carry under PKCS#1 v1.5
pub fn max_plaintext_len(key: &RsaPublicKey) -> usize {
    key.size().saturating_sub(PKCS1_V15_OVERHEAD)
}

/// Encrypt card details with an already-loaded key.
pub fn encrypt_card_with_key(card: &CardDetails, key: &RsaPublicKey) -> GatewayResult<String> {
    let plaintext = serde_json::to_vec(card)
        .map_err(|e| GatewayError::encryption(format!("Failed to serialize card payload: {}", e)))?;

    let capacity = max_plaintext_len(key);
    if plaintext.len() > capacity {
        return Err(GatewayError::encryption(format!(
            "Card payload is {} bytes but a {}-bit key carries at most {} bytes",
            plaintext.len(),
            key.size() * 8,
            capacity
        )));
    }

    let mut rng = rand::thread_rng();
    let ciphertext = key
        .encrypt(&mut rng, Pkcs1v15Encrypt, &plaintext)
        .map_err(|e| GatewayError::encryption(format!("RSA encryption failed: {}", e)))?;

    Ok(BASE64.encode(ciphertext))
}

/// Encrypt card details for `card.initiate_payment`.
pub fn encrypt_card<'a>(
    card: &CardDetails,
    public_key: impl Into<PublicKeySource<'a>>,
) -> GatewayResult<String> {
    let key = load_public_key(public_key)?;
    encrypt_card_with_key(card, &key)
}
