use crate::error::VaultError;
use crate::secret::PlaintextSecret;
use async_trait::async_trait;
use meridian_core::credential::ApiCredential;

/// Decouples the vault from any concrete exchange or LLM HTTP client,
/// mirroring the trait-object seam `jackbot-execution::client::ExecutionClient`
/// draws between order routing and transport. A probe call is made with
/// the live plaintext; the vault never inspects the probe's semantics.
#[async_trait]
pub trait CredentialVerifier: Send + Sync {
    async fn verify(
        &self,
        credential: &ApiCredential,
        plaintext: &PlaintextSecret,
    ) -> Result<(), VaultError>;
}

/// A verifier that always succeeds, useful for wiring the vault in tests
/// or for credential kinds (e.g. an LLM key with no cheap health probe)
/// that opt out of active verification.
pub struct NoopVerifier;

#[async_trait]
impl CredentialVerifier for NoopVerifier {
    async fn verify(
        &self,
        _credential: &ApiCredential,
        _plaintext: &PlaintextSecret,
    ) -> Result<(), VaultError> {
        Ok(())
    }
}
