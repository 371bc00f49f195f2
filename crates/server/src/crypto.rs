//! Sealing of addresses and payment details.
//!
//! Values are serialized to JSON and encrypted with AES-256-GCM under the
//! server key. The sealed form is `base64(nonce || ciphertext)`, safe to store
//! in a `TEXT` column or hand to a browser.

use aes_gcm::aead::{Aead, AeadCore, KeyInit, OsRng};
use aes_gcm::{Aes256Gcm, Key, Nonce};
use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use secrecy::ExposeSecret;
use serde::Serialize;
use serde::de::DeserializeOwned;
use thiserror::Error;

use crate::config::EncryptionKey;

/// AES-GCM nonce length in bytes.
const NONCE_LENGTH: usize = 12;

/// Errors from sealing or opening a value.
#[derive(Debug, Error)]
pub enum CryptoError {
    /// The sealed string is not valid base64 or is too short.
    #[error("malformed sealed value")]
    Malformed,

    /// Authentication failed: wrong key or tampered ciphertext.
    #[error("sealed value could not be authenticated")]
    Authentication,

    /// Encryption itself failed.
    #[error("encryption failed")]
    Encryption,

    /// The plaintext was not the expected JSON shape.
    #[error("sealed payload has unexpected shape: {0}")]
    Payload(#[from] serde_json::Error),
}

/// Symmetric sealer shared by every request.
#[derive(Clone)]
pub struct Sealer {
    cipher: Aes256Gcm,
}

impl std::fmt::Debug for Sealer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Sealer").finish_non_exhaustive()
    }
}

impl Sealer {
    /// Create a sealer from the configured key.
    #[must_use]
    pub fn new(key: &EncryptionKey) -> Self {
        let key = Key::<Aes256Gcm>::from_slice(key.expose_secret());
        Self {
            cipher: Aes256Gcm::new(key),
        }
    }

    /// Serialize and encrypt a value.
    ///
    /// # Errors
    ///
    /// Returns `CryptoError::Payload` if the value cannot be serialized.
    pub fn seal<T: Serialize + ?Sized>(&self, value: &T) -> Result<String, CryptoError> {
        let plaintext = serde_json::to_vec(value)?;
        let nonce = Aes256Gcm::generate_nonce(&mut OsRng);
        let ciphertext = self
            .cipher
            .encrypt(&nonce, plaintext.as_slice())
            .map_err(|_| CryptoError::Encryption)?;

        let mut sealed = Vec::with_capacity(NONCE_LENGTH + ciphertext.len());
        sealed.extend_from_slice(&nonce);
        sealed.extend_from_slice(&ciphertext);
        Ok(BASE64.encode(sealed))
    }

    /// Decrypt and deserialize a value produced by [`Sealer::seal`].
    ///
    /// # Errors
    ///
    /// Returns `CryptoError::Malformed` for non-base64 or truncated input,
    /// `CryptoError::Authentication` if the key is wrong or the value was
    /// modified, and `CryptoError::Payload` if the JSON does not match `T`.
    pub fn open<T: DeserializeOwned>(&self, sealed: &str) -> Result<T, CryptoError> {
        let bytes = BASE64
            .decode(sealed.trim())
            .map_err(|_| CryptoError::Malformed)?;
        if bytes.len() <= NONCE_LENGTH {
            return Err(CryptoError::Malformed);
        }
        let (nonce, ciphertext) = bytes.split_at(NONCE_LENGTH);

        let plaintext = self
            .cipher
            .decrypt(Nonce::from_slice(nonce), ciphertext)
            .map_err(|_| CryptoError::Authentication)?;

        Ok(serde_json::from_slice(&plaintext)?)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use secrecy::SecretBox;
    use serde::Deserialize;

    use super::*;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Card {
        holder: String,
        last4: String,
    }

    fn sealer(seed: u8) -> Sealer {
        let mut key = [0_u8; 32];
        for (i, byte) in key.iter_mut().enumerate() {
            *byte = seed.wrapping_add(u8::try_from(i).unwrap());
        }
        Sealer::new(&SecretBox::new(Box::new(key)))
    }

    fn card() -> Card {
        Card {
            holder: "Ada Lovelace".to_string(),
            last4: "4242".to_string(),
        }
    }

    #[test]
    fn test_open_returns_sealed_value() {
        let sealer = sealer(1);
        let token = sealer.seal(&card()).unwrap();
        let opened: Card = sealer.open(&token).unwrap();
        assert_eq!(opened, card());
    }

    #[test]
    fn test_seal_uses_fresh_nonce() {
        let sealer = sealer(1);
        assert_ne!(sealer.seal(&card()).unwrap(), sealer.seal(&card()).unwrap());
    }

    #[test]
    fn test_sealed_value_hides_plaintext() {
        let token = sealer(1).seal(&card()).unwrap();
        let raw = BASE64.decode(token).unwrap();
        let raw = String::from_utf8_lossy(&raw);
        assert!(!raw.contains("Lovelace"));
    }

    #[test]
    fn test_wrong_key_fails_authentication() {
        let token = sealer(1).seal(&card()).unwrap();
        let result = sealer(2).open::<Card>(&token);
        assert!(matches!(result, Err(CryptoError::Authentication)));
    }

    #[test]
    fn test_tampered_ciphertext_fails_authentication() {
        let sealer = sealer(1);
        let mut raw = BASE64.decode(sealer.seal(&card()).unwrap()).unwrap();
        if let Some(last) = raw.last_mut() {
            *last ^= 0x01;
        }
        let result = sealer.open::<Card>(&BASE64.encode(raw));
        assert!(matches!(result, Err(CryptoError::Authentication)));
    }

    #[test]
    fn test_malformed_input() {
        let sealer = sealer(1);
        assert!(matches!(
            sealer.open::<Card>("%%% not base64"),
            Err(CryptoError::Malformed)
        ));
        assert!(matches!(
            sealer.open::<Card>(&BASE64.encode([0_u8; 8])),
            Err(CryptoError::Malformed)
        ));
    }

    #[test]
    fn test_unexpected_shape() {
        let sealer = sealer(1);
        let token = sealer.seal(&42_u32).unwrap();
        assert!(matches!(
            sealer.open::<Card>(&token),
            Err(CryptoError::Payload(_))
        ));
    }
}
