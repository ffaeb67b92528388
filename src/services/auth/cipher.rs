//! Symmetric encryption of cookie values.
//!
//! The key is derived from a secret that ships with the client, so anyone holding the client
//! build can decrypt these values. This hides tokens from casual inspection of the cookie jar; it
//! does not provide confidentiality and must not be presented as a protection mechanism.

use aes_gcm::{
    Aes256Gcm, Key, Nonce,
    aead::{Aead, KeyInit},
};
use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use rand::RngCore;
use sha2::{Digest, Sha256};

use crate::error::{AppError, Result};

const NONCE_LEN: usize = 12;

pub struct TokenCipher {
    cipher: Aes256Gcm,
}

impl TokenCipher {
    pub fn new(client_secret: &str) -> Self {
        let digest = Sha256::digest(client_secret.as_bytes());
        let key = Key::<Aes256Gcm>::from_slice(&digest);

        Self {
            cipher: Aes256Gcm::new(key),
        }
    }

    /// Encrypts `plaintext` into a cookie-safe string: base64url(nonce || ciphertext).
    pub fn encrypt(&self, plaintext: &str) -> Result<String> {
        let mut nonce = [0u8; NONCE_LEN];
        rand::rng().fill_bytes(&mut nonce);

        let ciphertext = self
            .cipher
            .encrypt(Nonce::from_slice(&nonce), plaintext.as_bytes())
            .map_err(|e| AppError::CryptoError(format!("Encryption failed: {e}")))?;

        let mut sealed = Vec::with_capacity(NONCE_LEN + ciphertext.len());
        sealed.extend_from_slice(&nonce);
        sealed.extend_from_slice(&ciphertext);

        Ok(URL_SAFE_NO_PAD.encode(sealed))
    }

    /// Returns `None` for anything that is not a value produced by `encrypt` under this key.
    pub fn decrypt(&self, sealed: &str) -> Option<String> {
        let bytes = URL_SAFE_NO_PAD.decode(sealed.trim()).ok()?;
        if bytes.len() <= NONCE_LEN {
            return None;
        }

        let (nonce, ciphertext) = bytes.split_at(NONCE_LEN);
        let plaintext = self
            .cipher
            .decrypt(Nonce::from_slice(nonce), ciphertext)
            .ok()?;

        String::from_utf8(plaintext).ok()
    }
}
