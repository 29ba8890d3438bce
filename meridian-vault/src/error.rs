use meridian_core::CoreError;
use thiserror::Error;

/// Errors internal to the vault, converted into [`CoreError`] at every
/// other crate's boundary — the same pattern `meridian-integration`'s
/// `SocketError` follows.
#[derive(Debug, Error)]
pub enum VaultError {
    #[error("no credential found for id {0}")]
    NotFound(String),

    #[error("credential ciphertext could not be decrypted: {0}")]
    DecryptionFailed(String),

    #[error("credential could not be verified against the upstream: {0}")]
    VerificationFailed(String),

    #[error("master key is missing or malformed")]
    InvalidMasterKey,

    #[error("credential {0} has been revoked")]
    Revoked(String),

    #[error("credential {0} has expired")]
    Expired(String),
}

impl From<VaultError> for CoreError {
    fn from(err: VaultError) -> Self {
        match err {
            VaultError::NotFound(id) => CoreError::NotFound(format!("credential {id}")),
            VaultError::DecryptionFailed(reason) => CoreError::Internal(reason),
            VaultError::VerificationFailed(reason) => CoreError::UpstreamRejected(reason),
            VaultError::InvalidMasterKey => CoreError::Internal("invalid master key".into()),
            VaultError::Revoked(id) => CoreError::Unauthorized(format!("credential {id} is revoked")),
            VaultError::Expired(id) => CoreError::Unauthorized(format!("credential {id} is expired")),
        }
    }
}
