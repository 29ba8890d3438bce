use crate::error::VaultError;
use aes_gcm::aead::{Aead, AeadCore, KeyInit, OsRng};
use aes_gcm::{Aes256Gcm, Key, Nonce};
use base64::Engine;
use serde::{Deserialize, Serialize};

const MASTER_KEY_LEN: usize = 32;

/// A ciphertext envelope as stored by `meridian-persistence`: the AES-GCM
/// nonce alongside the sealed payload, both base64-encoded for a
/// transport/storage-agnostic representation.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct SealedSecret {
    pub nonce_b64: String,
    pub ciphertext_b64: String,
}

/// Wraps a 256-bit master key loaded once at process start
/// (`meridian::Config`) and used to seal/open every credential in the
/// vault. Never logged, never persisted.
pub struct MasterCipher {
    key: Key<Aes256Gcm>,
}

impl MasterCipher {
    pub fn from_bytes(key_bytes: &[u8]) -> Result<Self, VaultError> {
        if key_bytes.len() != MASTER_KEY_LEN {
            return Err(VaultError::InvalidMasterKey);
        }
        Ok(Self {
            key: *Key::<Aes256Gcm>::from_slice(key_bytes),
        })
    }

    pub fn seal(&self, plaintext: &str) -> Result<SealedSecret, VaultError> {
        let cipher = Aes256Gcm::new(&self.key);
        let nonce = Aes256Gcm::generate_nonce(&mut OsRng);
        let ciphertext = cipher
            .encrypt(&nonce, plaintext.as_bytes())
            .map_err(|e| VaultError::DecryptionFailed(e.to_string()))?;

        let engine = base64::engine::general_purpose::STANDARD;
        Ok(SealedSecret {
            nonce_b64: engine.encode(nonce),
            ciphertext_b64: engine.encode(ciphertext),
        })
    }

    pub fn open(&self, sealed: &SealedSecret) -> Result<String, VaultError> {
        let engine = base64::engine::general_purpose::STANDARD;
        let nonce_bytes = engine
            .decode(&sealed.nonce_b64)
            .map_err(|e| VaultError::DecryptionFailed(e.to_string()))?;
        let ciphertext = engine
            .decode(&sealed.ciphertext_b64)
            .map_err(|e| VaultError::DecryptionFailed(e.to_string()))?;

        let nonce = Nonce::from_slice(&nonce_bytes);
        let cipher = Aes256Gcm::new(&self.key);
        let plaintext = cipher
            .decrypt(nonce, ciphertext.as_slice())
            .map_err(|e| VaultError::DecryptionFailed(e.to_string()))?;

        String::from_utf8(plaintext).map_err(|e| VaultError::DecryptionFailed(e.to_string()))
    }
}
