use crate::ids::{CredentialId, UserId};
use chrono::{DateTime, Utc};
use derive_more::Display;
use serde::{Deserialize, Serialize};

use meridian_instrument::ExchangeId;

/// `spec.md` §3's full six-value APICredential status enum. `get` on the
/// vault must be able to distinguish every one of these at the boundary
/// (`spec.md` §4.1: "Fails with `NotFound`, `Revoked`, or `Expired`"),
/// so none of them collapse into a shared "not usable" bucket here.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Deserialize, Serialize, Display)]
#[serde(rename_all = "snake_case")]
pub enum CredentialStatus {
    Active,
    Inactive,
    Revoked,
    VerificationPending,
    VerificationFailed,
    Expired,
}

/// Metadata about an exchange API credential (`spec.md` §3, §4.1). The
/// secret material itself never lives here or in persistence — only
/// `meridian-vault` ever holds plaintext, and only for the duration of a
/// signing call. This struct is what C2 persists and what everything else
/// reasons about.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ApiCredential {
    pub id: CredentialId,
    pub owner: UserId,
    pub exchange: ExchangeId,
    pub label: String,
    pub status: CredentialStatus,
    pub created_at: DateTime<Utc>,
    pub last_verified_at: Option<DateTime<Utc>>,
    pub last_used_at: Option<DateTime<Utc>>,
    /// Absolute expiry the upstream service attached to this credential,
    /// if any. `Vault::get` checks this against the current time on every
    /// call rather than relying solely on a stored `Expired` status, since
    /// expiry is a fact about time rather than an event the vault is told
    /// about.
    pub expires_at: Option<DateTime<Utc>>,
}

impl ApiCredential {
    pub fn new(owner: UserId, exchange: ExchangeId, label: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            id: CredentialId::random(),
            owner,
            exchange,
            label: label.into(),
            status: CredentialStatus::Active,
            created_at: now,
            last_verified_at: None,
            last_used_at: None,
            expires_at: None,
        }
    }

    pub fn mark_verified(&mut self, now: DateTime<Utc>) {
        self.status = CredentialStatus::Active;
        self.last_verified_at = Some(now);
    }

    pub fn mark_invalid(&mut self) {
        self.status = CredentialStatus::VerificationFailed;
    }

    pub fn revoke(&mut self) {
        self.status = CredentialStatus::Revoked;
    }

    /// Whether `expires_at` has passed as of `now`. Independent of
    /// `status`, which may not yet have been updated to `Expired`.
    pub fn has_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|at| now >= at)
    }

    pub fn is_usable(&self) -> bool {
        matches!(self.status, CredentialStatus::Active)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn newly_verified_credential_is_usable() {
        let mut cred = ApiCredential::new(UserId::random(), ExchangeId::BinanceSpot, "main", Utc::now());
        cred.mark_invalid();
        assert!(!cred.is_usable());
        cred.mark_verified(Utc::now());
        assert!(cred.is_usable());
    }

    #[test]
    fn revoked_credential_is_not_usable() {
        let mut cred = ApiCredential::new(UserId::random(), ExchangeId::BinanceSpot, "main", Utc::now());
        cred.revoke();
        assert_eq!(cred.status, CredentialStatus::Revoked);
        assert!(!cred.is_usable());
    }

    #[test]
    fn expiry_is_checked_against_the_supplied_instant() {
        let now = Utc::now();
        let mut cred = ApiCredential::new(UserId::random(), ExchangeId::BinanceSpot, "main", now);
        cred.expires_at = Some(now + Duration::seconds(60));
        assert!(!cred.has_expired(now));
        assert!(cred.has_expired(now + Duration::seconds(61)));
    }
}
