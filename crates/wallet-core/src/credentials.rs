//! Read-only access to the user's secrets.
//!
//! Storage itself (keychain, keystore, encrypted file) lives outside the
//! engine; services only ask for a seed phrase or an imported private key
//! and turn it into signing material for one operation.

use crypto_utils::ZeroizingString;
use secrecy::{ExposeSecret, SecretString};

use crate::address::private_key_to_derived_key;
use crate::error::WalletError;
use crate::hd_derivation::{derive_secp256k1_key, DerivedKey};
use crate::mnemonic::SeedWallet;

/// Secure storage collaborator.
pub trait CredentialStore: Send + Sync {
    fn seed_phrase(&self) -> Option<SecretString>;

    fn private_key(&self) -> Option<SecretString>;
}

/// Resolves the signing key for `derivation_path`.
///
/// A stored seed phrase wins. An imported private key stands for a single
/// account, so it only answers for `account_index == 0`.
pub fn load_signing_key(
    store: &dyn CredentialStore,
    derivation_path: &str,
    account_index: u32,
) -> Result<DerivedKey, WalletError> {
    if let Some(phrase) = store.seed_phrase() {
        let wallet = SeedWallet::load(phrase.expose_secret())?;
        return derive_secp256k1_key(wallet.seed(), derivation_path);
    }

    match store.private_key() {
        Some(key) if account_index == 0 => private_key_to_derived_key(key.expose_secret()),
        _ => Err(WalletError::NoPrivateKey),
    }
}

/// In-memory [`CredentialStore`], for embedding and tests.
#[derive(Debug, Default, Clone)]
pub struct StaticCredentials {
    seed_phrase: Option<ZeroizingString>,
    private_key: Option<ZeroizingString>,
}

impl StaticCredentials {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn from_seed_phrase(phrase: impl Into<String>) -> Self {
        Self {
            seed_phrase: Some(ZeroizingString::new(phrase.into())),
            private_key: None,
        }
    }

    pub fn from_private_key(key_hex: impl Into<String>) -> Self {
        Self {
            seed_phrase: None,
            private_key: Some(ZeroizingString::new(key_hex.into())),
        }
    }
}

impl CredentialStore for StaticCredentials {
    fn seed_phrase(&self) -> Option<SecretString> {
        self.seed_phrase
            .as_ref()
            .map(|p| SecretString::from(p.to_string()))
    }

    fn private_key(&self) -> Option<SecretString> {
        self.private_key
            .as_ref()
            .map(|k| SecretString::from(k.to_string()))
    }
}
