//! Security utilities for Shopify webhook verification
//!
//! Shopify signs every webhook body with HMAC-SHA256 using the app secret and
//! sends the base64 encoded digest in the `X-Shopify-Hmac-Sha256` header.
//!
//! # Important Notes
//!
//! - The signature MUST be computed on the raw request body bytes, not parsed JSON
//! - The comparison must be constant-time to prevent timing attacks
//! - A missing secret or a missing header is a failed verification, never a skip

use base64::{Engine, engine::general_purpose::STANDARD};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use std::fmt;
use subtle::ConstantTimeEq;

type HmacSha256 = Hmac<Sha256>;

/// Computes the base64 encoded HMAC-SHA256 of `payload` keyed with `secret`
pub fn compute_signature(payload: &[u8], secret: &str) -> Option<String> {
    let mut mac = match HmacSha256::new_from_slice(secret.as_bytes()) {
        Ok(m) => m,
        Err(e) => {
            logfire::error!(
                "Failed to create HMAC instance: {error}",
                error = e.to_string()
            );
            return None;
        }
    };
    mac.update(payload);

    Some(STANDARD.encode(mac.finalize().into_bytes()))
}

/// Verifies the `X-Shopify-Hmac-Sha256` header value against the raw payload
///
/// # Arguments
///
/// * `payload` - The raw request body bytes
/// * `signature_header` - The claimed base64 signature, if the header was sent
/// * `secret` - The signing secret, if one is configured
///
/// # Returns
///
/// `true` only when both values are present and the signatures match.
pub fn verify_signature(
    payload: &[u8],
    signature_header: Option<&str>,
    secret: Option<&str>,
) -> bool {
    let (Some(claimed), Some(secret)) = (signature_header, secret) else {
        return false;
    };
    if claimed.is_empty() || secret.is_empty() {
        return false;
    }

    let Some(expected) = compute_signature(payload, secret) else {
        return false;
    };
    if expected.len() != claimed.len() {
        return false;
    }

    expected.as_bytes().ct_eq(claimed.as_bytes()).into()
}

/// Ordered set of secrets accepted for webhook signatures.
///
/// Every secret is equally trusted; holding more than one lets a secret be
/// rotated without dropping deliveries signed with the previous one.
#[derive(Clone, Default)]
pub struct SigningSecrets(Vec<String>);

impl SigningSecrets {
    pub fn new<I, S>(secrets: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(secrets.into_iter().map(Into::into).collect())
    }

    pub fn as_slice(&self) -> &[String] {
        &self.0
    }

    /// Accepts the payload if any of the secrets produces the claimed signature
    pub fn verify_any(&self, payload: &[u8], signature_header: Option<&str>) -> bool {
        self.0
            .iter()
            .any(|secret| verify_signature(payload, signature_header, Some(secret.as_str())))
    }
}

impl fmt::Debug for SigningSecrets {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SigningSecrets([REDACTED; {}])", self.0.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAYLOAD: &[u8] = b"{\"id\":555,\"line_items\":[]}";

    #[test]
    fn test_verify_signature_valid() {
        let signature = compute_signature(PAYLOAD, "test_secret").unwrap();

        assert!(verify_signature(PAYLOAD, Some(signature.as_str()), Some("test_secret")));
    }

    #[test]
    fn test_compute_signature_known_vector() {
        // echo -n 'hello' | openssl dgst -sha256 -hmac 'secret' -binary | base64
        assert_eq!(
            compute_signature(b"hello", "secret").as_deref(),
            Some("iKqz7ejTrflNJquQ07r9SiCDBww7zOnAFO4EpEOEfAs=")
        );
    }

    #[test]
    fn test_compute_signature_accepts_any_key_length() {
        let long_key = "k".repeat(200);

        assert!(compute_signature(PAYLOAD, "").is_some());
        assert!(compute_signature(PAYLOAD, &long_key).is_some());
    }

    #[test]
    fn test_verify_signature_wrong_secret() {
        let signature = compute_signature(PAYLOAD, "wrong_secret").unwrap();

        assert!(!verify_signature(PAYLOAD, Some(signature.as_str()), Some("test_secret")));
    }

    #[test]
    fn test_verify_signature_missing_secret_or_header() {
        let signature = compute_signature(PAYLOAD, "test_secret").unwrap();

        assert!(!verify_signature(PAYLOAD, Some(signature.as_str()), None));
        assert!(!verify_signature(PAYLOAD, Some(signature.as_str()), Some("")));
        assert!(!verify_signature(PAYLOAD, None, Some("test_secret")));
        assert!(!verify_signature(PAYLOAD, Some(""), Some("test_secret")));
    }

    #[test]
    fn test_verify_signature_length_mismatch() {
        let signature = compute_signature(PAYLOAD, "test_secret").unwrap();
        let truncated = &signature[..signature.len() - 1];

        assert!(!verify_signature(PAYLOAD, Some(truncated), Some("test_secret")));
        assert!(!verify_signature(PAYLOAD, Some("abc"), Some("test_secret")));
    }

    #[test]
    fn test_verify_signature_tampered_payload() {
        let signature = compute_signature(PAYLOAD, "test_secret").unwrap();
        let tampered = b"{\"id\":556,\"line_items\":[]}";

        assert!(!verify_signature(tampered, Some(signature.as_str()), Some("test_secret")));
    }

    #[test]
    fn test_verify_any_accepts_each_rotated_secret() {
        let secrets = SigningSecrets::new(["old_secret", "new_secret"]);

        let old = compute_signature(PAYLOAD, "old_secret").unwrap();
        let new = compute_signature(PAYLOAD, "new_secret").unwrap();
        let other = compute_signature(PAYLOAD, "other_secret").unwrap();

        assert!(secrets.verify_any(PAYLOAD, Some(old.as_str())));
        assert!(secrets.verify_any(PAYLOAD, Some(new.as_str())));
        assert!(!secrets.verify_any(PAYLOAD, Some(other.as_str())));
        assert!(!secrets.verify_any(PAYLOAD, None));
    }

    #[test]
    fn test_verify_any_empty_set_rejects() {
        let signature = compute_signature(PAYLOAD, "test_secret").unwrap();

        assert!(!SigningSecrets::default().verify_any(PAYLOAD, Some(signature.as_str())));
    }

    #[test]
    fn test_debug_redacts_secrets() {
        let secrets = SigningSecrets::new(["super_secret"]);

        assert!(!format!("{secrets:?}").contains("super_secret"));
    }
}
