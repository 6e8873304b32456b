use constant_time_eq::constant_time_eq;
use hmac::{Hmac, Mac};
use sha2::Sha256;
use thiserror::Error;
use zeroize::Zeroizing;

type HmacSha256 = Hmac<Sha256>;

/// Centralized keyed hashing for the enrollment subsystem.
///
/// Two secrets live here:
/// - the gateway key secret, used to recompute callback signatures as
///   lowercase hex HMAC-SHA-256 over `"{order_id}|{payment_id}"`;
/// - the session token key shared with the auth collaborator, used to hash
///   bearer tokens before they are looked up.
pub struct EnrollmentCrypto {
    callback_secret: Zeroizing<Vec<u8>>,
    token_hmac_key: Zeroizing<Vec<u8>>,
}

impl std::fmt::Debug for EnrollmentCrypto {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EnrollmentCrypto").finish_non_exhaustive()
    }
}

#[derive(Debug, Error)]
pub enum CryptoError {
    #[error("gateway callback secret must not be empty")]
    EmptyCallbackSecret,
    #[error("token HMAC key must not be empty")]
    EmptyTokenKey,
}

impl EnrollmentCrypto {
    pub fn new(
        callback_secret: impl AsRef<[u8]>,
        token_hmac_key: impl AsRef<[u8]>,
    ) -> Result<Self, CryptoError> {
        let secret = callback_secret.as_ref();
        if secret.is_empty() {
            return Err(CryptoError::EmptyCallbackSecret);
        }

        let key = token_hmac_key.as_ref();
        if key.is_empty() {
            return Err(CryptoError::EmptyTokenKey);
        }

        Ok(Self {
            callback_secret: Zeroizing::new(secret.to_vec()),
            token_hmac_key: Zeroizing::new(key.to_vec()),
        })
    }

    /// Signature the gateway attaches to a settled payment callback.
    pub fn sign_callback(&self, order_id: &str, payment_id: &str) -> String {
        let mut mac = mac_for(&self.callback_secret);
        mac.update(order_id.as_bytes());
        mac.update(b"|");
        mac.update(payment_id.as_bytes());
        hex::encode(mac.finalize().into_bytes())
    }

    /// Recompute the callback signature and compare it in constant time.
    /// Hex case is ignored; anything that is not 64 hex digits fails.
    pub fn verify_callback(
        &self,
        order_id: &str,
        payment_id: &str,
        signature: &str,
    ) -> bool {
        let expected = self.sign_callback(order_id, payment_id);
        let provided = signature.trim().to_ascii_lowercase();
        constant_time_eq(expected.as_bytes(), provided.as_bytes())
    }

    /// Hash an opaque bearer token using HMAC-SHA-256 with the shared token
    /// key. The digest is returned as hex, matching what the auth
    /// collaborator stores.
    pub fn hash_token(&self, token: &str) -> String {
        let mut mac = mac_for(&self.token_hmac_key);
        mac.update(token.as_bytes());
        hex::encode(mac.finalize().into_bytes())
    }
}

fn mac_for(key: &[u8]) -> HmacSha256 {
    // HMAC accepts keys of any length; `new_from_slice` only fails for
    // fixed-size MACs.
    match HmacSha256::new_from_slice(key) {
        Ok(mac) => mac,
        Err(_) => unreachable!("HMAC-SHA-256 accepts keys of any size"),
    }
}
