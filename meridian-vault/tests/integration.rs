use chrono::Utc;
use meridian_core::credential::{ApiCredential, CredentialStatus};
use meridian_core::ids::UserId;
use meridian_instrument::ExchangeId;
use meridian_vault::{CredentialVault, MasterCipher, NoopVerifier, PlaintextSecret, VaultError};
use std::sync::Arc;

fn vault() -> CredentialVault {
    CredentialVault::new(MasterCipher::from_bytes(&[7u8; 32]).unwrap(), Arc::new(NoopVerifier))
}

#[tokio::test]
async fn missing_credential_never_reaches_the_cipher() {
    let vault = vault();
    let result = vault.get(meridian_core::ids::CredentialId::random());
    assert!(matches!(result, Err(VaultError::NotFound(_))));
}

#[tokio::test]
async fn verify_marks_a_previously_failed_credential_active_again() {
    let vault = vault();
    let mut metadata = ApiCredential::new(UserId::random(), ExchangeId::BinanceSpot, "main", Utc::now());
    metadata.status = CredentialStatus::VerificationFailed;
    let id = metadata.id;
    vault
        .put(metadata, PlaintextSecret::new("sk-live-xyz".into()), false)
        .await
        .unwrap();

    let reverified = vault.verify(id).await.unwrap();
    assert_eq!(reverified.status, CredentialStatus::Active);
    assert!(reverified.last_verified_at.is_some());
}

#[tokio::test]
async fn the_vault_holds_more_than_one_credential_independently() {
    let vault = vault();
    let first = ApiCredential::new(UserId::random(), ExchangeId::BinanceSpot, "first", Utc::now());
    let mut second = ApiCredential::new(UserId::random(), ExchangeId::BinanceSpotTestnet, "second", Utc::now());
    second.revoke();

    let first_id = first.id;
    let second_id = second.id;
    vault.put(first, PlaintextSecret::new("sk-a".into()), false).await.unwrap();
    vault.put(second, PlaintextSecret::new("sk-b".into()), false).await.unwrap();

    assert_eq!(vault.get(first_id).unwrap().1.expose(), "sk-a");
    assert!(matches!(vault.get(second_id), Err(VaultError::Revoked(_))));
}
