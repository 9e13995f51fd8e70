//! Webhook signature verification

use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Verify a GitHub webhook signature.
///
/// `signature` is the value of the `X-Hub-Signature-256` header, in the form
/// `sha256=<hex digest>`. `secret` is the webhook secret configured on the
/// App, and `body` is the raw request body — the exact bytes received, before
/// any JSON parsing. Re-serializing the payload changes the byte stream and
/// invalidates the signature.
///
/// Returns `false` on a missing prefix, a non-hex digest, a digest of the
/// wrong length, or a mismatch; never errors. The digest comparison is
/// constant-time (`Mac::verify_slice`).
pub fn verify_signature(signature: &str, secret: &str, body: &[u8]) -> bool {
    let digest = match signature.strip_prefix("sha256=") {
        Some(d) => d,
        None => return false,
    };

    let digest_bytes = match hex::decode(digest) {
        Ok(b) => b,
        Err(_) => return false,
    };

    let mut mac = match HmacSha256::new_from_slice(secret.as_bytes()) {
        Ok(m) => m,
        Err(_) => return false,
    };

    mac.update(body);
    mac.verify_slice(&digest_bytes).is_ok()
}

/// Sign a body the way GitHub does. Used by tests and local tooling.
pub fn sign(secret: &str, body: &[u8]) -> String {
    let mut mac =
        HmacSha256::new_from_slice(secret.as_bytes()).expect("HMAC accepts keys of any length");
    mac.update(body);
    format!("sha256={}", hex::encode(mac.finalize().into_bytes()))
}
