#![forbid(unsafe_code)]
#![warn(
    unused,
    clippy::cognitive_complexity,
    missing_debug_implementations,
    rust_2018_idioms
)]

//! The Credential Vault (C1): encrypted at-rest storage for exchange and
//! LLM API credentials, with scoped plaintext exposure and a pluggable
//! verification probe. No other crate holds plaintext secret material.

mod cipher;
mod error;
mod secret;
mod vault;
mod verifier;

pub use cipher::{MasterCipher, SealedSecret};
pub use error::VaultError;
pub use secret::PlaintextSecret;
pub use vault::CredentialVault;
pub use verifier::{CredentialVerifier, NoopVerifier};
