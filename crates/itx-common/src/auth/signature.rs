//! Ed25519 request signature verification
//!
//! The platform signs every HTTPS delivery over `timestamp || body` and sends the
//! hex signature and the timestamp in two headers.

use ed25519_dalek::{Signature, VerifyingKey, PUBLIC_KEY_LENGTH, SIGNATURE_LENGTH};

use crate::error::ClientError;

/// Header carrying the hex-encoded signature
pub const SIGNATURE_HEADER: &str = "X-Signature-Ed25519";
/// Header carrying the signed timestamp
pub const TIMESTAMP_HEADER: &str = "X-Signature-Timestamp";

/// Verifies signed deliveries against the application's public key
#[derive(Debug, Clone)]
pub struct SignatureVerifier {
    key: VerifyingKey,
}

impl SignatureVerifier {
    /// Build a verifier from the hex public key shown in the developer portal
    pub fn from_hex(public_key: &str) -> Result<Self, ClientError> {
        let bytes = hex::decode(public_key.trim())
            .map_err(|e| ClientError::InvalidPublicKey(e.to_string()))?;
        let bytes: [u8; PUBLIC_KEY_LENGTH] = bytes.try_into().map_err(|bytes: Vec<u8>| {
            ClientError::InvalidPublicKey(format!(
                "expected {PUBLIC_KEY_LENGTH} bytes, got {}",
                bytes.len()
            ))
        })?;
        let key = VerifyingKey::from_bytes(&bytes)
            .map_err(|e| ClientError::InvalidPublicKey(e.to_string()))?;

        Ok(Self { key })
    }

    pub fn from_key(key: VerifyingKey) -> Self {
        Self { key }
    }

    /// Check a delivery's signature
    ///
    /// Returns `false` for missing, malformed or non-matching signatures.
    pub fn verify(&self, signature_hex: &str, timestamp: &str, body: &[u8]) -> bool {
        if signature_hex.is_empty() || timestamp.is_empty() {
            return false;
        }

        let Ok(bytes) = hex::decode(signature_hex) else {
            return false;
        };
        let Ok(bytes) = <[u8; SIGNATURE_LENGTH]>::try_from(bytes) else {
            return false;
        };

        // The top three bits of S must be clear for a canonical signature
        if bytes[SIGNATURE_LENGTH - 1] & 0b1110_0000 != 0 {
            return false;
        }

        let signature = Signature::from_bytes(&bytes);

        let mut message = Vec::with_capacity(timestamp.len() + body.len());
        message.extend_from_slice(timestamp.as_bytes());
        message.extend_from_slice(body);

        self.key.verify_strict(&message, &signature).is_ok()
    }
}
