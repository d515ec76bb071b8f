/// Webhook signature verification
///
/// Paystack signs the raw request body with HMAC-SHA512 using the account's
/// secret key and sends the lowercase hex digest in `X-Paystack-Signature`.

use hmac::digest::InvalidLength;
use hmac::{Hmac, Mac};
use sha2::Sha512;

type HmacSha512 = Hmac<Sha512>;

/// Header carrying the signature
pub const SIGNATURE_HEADER: &str = "x-paystack-signature";

/// Hex HMAC-SHA512 of `payload`, as Paystack computes it
pub fn sign_payload(payload: &[u8], secret: &str) -> Result<String, InvalidLength> {
    let mut mac = HmacSha512::new_from_slice(secret.as_bytes())?;
    mac.update(payload);
    Ok(hex::encode(mac.finalize().into_bytes()))
}

/// Checks `signature` against the payload in constant time.
///
/// Malformed hex, wrong length, or an empty secret all fail verification.
pub fn verify_signature(payload: &[u8], signature: &str, secret: &str) -> bool {
    if secret.is_empty() {
        return false;
    }
    let Ok(expected) = hex::decode(signature.trim()) else {
        return false;
    };
    let Ok(mut mac) = HmacSha512::new_from_slice(secret.as_bytes()) else {
        return false;
    };
    mac.update(payload);
    mac.verify_slice(&expected).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "sk_test_0123456789abcdef";

    #[test]
    fn test_valid_signature() {
        let body = br#"{"event":"charge.success","data":{"reference":"ref_1"}}"#;
        let signature = sign_payload(body, SECRET).unwrap();
        assert_eq!(signature.len(), 128);
        assert!(verify_signature(body, &signature, SECRET));
    }

    #[test]
    fn test_tampered_body_fails() {
        let body = br#"{"event":"charge.success","data":{"amount":50000}}"#;
        let signature = sign_payload(body, SECRET).unwrap();
        let tampered = br#"{"event":"charge.success","data":{"amount":5000000}}"#;
        assert!(!verify_signature(tampered, &signature, SECRET));
    }

    #[test]
    fn test_wrong_secret_fails() {
        let body = b"{}";
        let signature = sign_payload(body, SECRET).unwrap();
        assert!(!verify_signature(body, &signature, "sk_test_other"));
    }

    #[test]
    fn test_malformed_signature_fails() {
        assert!(!verify_signature(b"{}", "not-hex", SECRET));
        assert!(!verify_signature(b"{}", "abcd", SECRET));
        assert!(!verify_signature(b"{}", "", SECRET));
    }

    #[test]
    fn test_empty_secret_fails() {
        let signature = sign_payload(b"{}", "").unwrap();
        assert!(!verify_signature(b"{}", &signature, ""));
    }

    #[test]
    fn test_sign_accepts_any_key_length() {
        let long_key = "k".repeat(300);
        let signature = sign_payload(b"payload", &long_key).unwrap();
        assert!(verify_signature(b"payload", &signature, &long_key));
        assert!(sign_payload(b"payload", "").is_ok());
    }

    #[test]
    fn test_uppercase_hex_accepted() {
        let body = b"payload";
        let signature = sign_payload(body, SECRET).unwrap().to_uppercase();
        assert!(verify_signature(body, &signature, SECRET));
    }
}
