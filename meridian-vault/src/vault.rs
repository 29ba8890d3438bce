use crate::cipher::{MasterCipher, SealedSecret};
use crate::error::VaultError;
use crate::secret::PlaintextSecret;
use crate::verifier::CredentialVerifier;
use chrono::Utc;
use meridian_core::credential::{ApiCredential, CredentialStatus};
use meridian_core::ids::CredentialId;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::instrument;

struct StoredCredential {
    metadata: ApiCredential,
    sealed: SealedSecret,
}

/// The Credential Vault (C1). Holds exchange/LLM API credentials sealed at
/// rest under a single master key, exposing `get`/`put`/`verify` as the
/// only ways plaintext ever surfaces, and only for the duration of a
/// single call.
///
/// Storage here is in-memory; a production deployment backs this with
/// `meridian-persistence`'s `PersistencePort` for the sealed blob while
/// keeping the cipher and verification logic in this crate.
pub struct CredentialVault {
    cipher: MasterCipher,
    verifier: Arc<dyn CredentialVerifier>,
    store: RwLock<HashMap<CredentialId, StoredCredential>>,
}

impl CredentialVault {
    pub fn new(cipher: MasterCipher, verifier: Arc<dyn CredentialVerifier>) -> Self {
        Self {
            cipher,
            verifier,
            store: RwLock::new(HashMap::new()),
        }
    }

    /// Seal `plaintext` under the master key and store it alongside its
    /// metadata. If `verify` is set, probes the credential before
    /// accepting it; a failed probe leaves the vault unchanged.
    #[instrument(skip(self, plaintext))]
    pub async fn put(
        &self,
        mut metadata: ApiCredential,
        plaintext: PlaintextSecret,
        verify: bool,
    ) -> Result<ApiCredential, VaultError> {
        if verify {
            self.verifier.verify(&metadata, &plaintext).await?;
            metadata.mark_verified(Utc::now());
        }

        let sealed = self.cipher.seal(plaintext.expose())?;
        let id = metadata.id;
        self.store.write().insert(
            id,
            StoredCredential {
                metadata: metadata.clone(),
                sealed,
            },
        );
        Ok(metadata)
    }

    /// Open the credential's ciphertext and hand back the plaintext for
    /// exactly as long as the caller holds the returned guard. Fails with
    /// `NotFound`, `Revoked`, or `Expired` (`spec.md` §4.1) before any
    /// decryption is attempted.
    #[instrument(skip(self))]
    pub fn get(&self, id: CredentialId) -> Result<(ApiCredential, PlaintextSecret), VaultError> {
        let store = self.store.read();
        let stored = store
            .get(&id)
            .ok_or_else(|| VaultError::NotFound(id.to_string()))?;

        if stored.metadata.status == CredentialStatus::Revoked {
            return Err(VaultError::Revoked(id.to_string()));
        }
        if stored.metadata.status == CredentialStatus::Expired || stored.metadata.has_expired(Utc::now()) {
            return Err(VaultError::Expired(id.to_string()));
        }

        let plaintext = self.cipher.open(&stored.sealed)?;
        Ok((stored.metadata.clone(), PlaintextSecret::new(plaintext)))
    }

    /// Re-run the verification probe against the currently stored
    /// credential, updating its status in place.
    #[instrument(skip(self))]
    pub async fn verify(&self, id: CredentialId) -> Result<ApiCredential, VaultError> {
        let (mut metadata, plaintext) = self.get(id)?;
        match self.verifier.verify(&metadata, &plaintext).await {
            Ok(()) => {
                metadata.mark_verified(Utc::now());
            }
            Err(err) => {
                metadata.mark_invalid();
                self.store.write().get_mut(&id).map(|s| s.metadata = metadata.clone());
                return Err(err);
            }
        }
        self.store.write().get_mut(&id).map(|s| s.metadata = metadata.clone());
        Ok(metadata)
    }

    pub fn metadata(&self, id: CredentialId) -> Option<ApiCredential> {
        self.store.read().get(&id).map(|s| s.metadata.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::verifier::NoopVerifier;
    use meridian_core::ids::UserId;
    use meridian_instrument::ExchangeId;

    struct RejectingVerifier;

    #[async_trait::async_trait]
    impl CredentialVerifier for RejectingVerifier {
        async fn verify(
            &self,
            _credential: &ApiCredential,
            _plaintext: &PlaintextSecret,
        ) -> Result<(), VaultError> {
            Err(VaultError::VerificationFailed("bad signature".into()))
        }
    }

    fn vault(verifier: Arc<dyn CredentialVerifier>) -> CredentialVault {
        CredentialVault::new(MasterCipher::from_bytes(&[3u8; 32]).unwrap(), verifier)
    }

    #[tokio::test]
    async fn put_then_get_round_trips_plaintext() {
        let vault = vault(Arc::new(NoopVerifier));
        let metadata = ApiCredential::new(UserId::random(), ExchangeId::BinanceSpot, "main", Utc::now());
        let id = metadata.id;
        vault
            .put(metadata, PlaintextSecret::new("sk-live-abc".into()), false)
            .await
            .unwrap();

        let (_, plaintext) = vault.get(id).unwrap();
        assert_eq!(plaintext.expose(), "sk-live-abc");
    }

    #[tokio::test]
    async fn revoked_credential_is_refused_without_decrypting() {
        let vault = vault(Arc::new(NoopVerifier));
        let mut metadata = ApiCredential::new(UserId::random(), ExchangeId::BinanceSpot, "main", Utc::now());
        metadata.revoke();
        let id = metadata.id;
        vault
            .put(metadata, PlaintextSecret::new("sk-live-abc".into()), false)
            .await
            .unwrap();

        assert!(matches!(vault.get(id), Err(VaultError::Revoked(_))));
    }

    #[tokio::test]
    async fn expired_credential_is_refused_even_while_marked_active() {
        let vault = vault(Arc::new(NoopVerifier));
        let now = Utc::now();
        let mut metadata = ApiCredential::new(UserId::random(), ExchangeId::BinanceSpot, "main", now);
        metadata.expires_at = Some(now - chrono::Duration::seconds(1));
        let id = metadata.id;
        vault
            .put(metadata, PlaintextSecret::new("sk-live-abc".into()), false)
            .await
            .unwrap();

        assert!(matches!(vault.get(id), Err(VaultError::Expired(_))));
    }

    #[tokio::test]
    async fn failed_verification_does_not_store_credential() {
        let vault = vault(Arc::new(RejectingVerifier));
        let metadata = ApiCredential::new(UserId::random(), ExchangeId::BinanceSpot, "main", Utc::now());
        let id = metadata.id;
        let result = vault
            .put(metadata, PlaintextSecret::new("sk-live-abc".into()), true)
            .await;
        assert!(result.is_err());
        assert!(vault.get(id).is_err());
    }

    #[tokio::test]
    async fn reverify_marks_credential_invalid_on_failure() {
        let vault = vault(Arc::new(NoopVerifier));
        let metadata = ApiCredential::new(UserId::random(), ExchangeId::BinanceSpot, "main", Utc::now());
        let id = metadata.id;
        vault
            .put(metadata, PlaintextSecret::new("sk-live-abc".into()), false)
            .await
            .unwrap();

        let failing = CredentialVault::new(
            MasterCipher::from_bytes(&[3u8; 32]).unwrap(),
            Arc::new(RejectingVerifier),
        );
        failing
            .put(
                vault.metadata(id).unwrap(),
                PlaintextSecret::new("sk-live-abc".into()),
                false,
            )
            .await
            .unwrap();
        assert!(failing.verify(id).await.is_err());
        assert!(!failing.metadata(id).unwrap().is_usable());
    }
}
