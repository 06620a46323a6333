use std::fmt;

use bip32::{DerivationPath, XPrv};
use crypto_utils::SecretKeyBytes;
use k256::ecdsa::SigningKey;
use zeroize::Zeroize;

use crate::error::WalletError;

/// BIP-44 path for EVM accounts: `m/44'/{coin_type}'/0'/0/{account_index}`.
///
/// Every EVM network sharing a coin type derives the same address; the chain
/// id only matters at signing time.
pub fn evm_derivation_path(coin_type: u32, account_index: u32) -> String {
    format!("m/44'/{coin_type}'/0'/0/{account_index}")
}

/// Derive a secp256k1 key from a BIP-39 seed along `path` (BIP-32).
pub fn derive_secp256k1_key(seed: &[u8], path: &str) -> Result<DerivedKey, WalletError> {
    let parsed: DerivationPath = path
        .parse()
        .map_err(|e: bip32::Error| WalletError::DerivationFailed(format!("{path}: {e}")))?;

    let xprv = XPrv::derive_from_path(seed, &parsed)
        .map_err(|e| WalletError::DerivationFailed(e.to_string()))?;

    let mut private_key_bytes: [u8; 32] = xprv.to_bytes().into();
    let key = DerivedKey::from_secret(SecretKeyBytes::new(private_key_bytes), path.to_string());
    private_key_bytes.zeroize();
    key
}

/// Derived secp256k1 key (for BTC and ETH)
pub struct DerivedKey {
    pub private_key: SecretKeyBytes,
    pub public_key_compressed: [u8; 33],
    pub public_key_uncompressed: [u8; 65],
    /// Path the key came from, or `"imported"` for a raw private key.
    pub derivation_path: String,
}

impl DerivedKey {
    /// Wraps an existing scalar, computing both public key encodings.
    pub fn from_secret(
        private_key: SecretKeyBytes,
        derivation_path: String,
    ) -> Result<Self, WalletError> {
        let signing_key = SigningKey::from_bytes(private_key.as_bytes().into())
            .map_err(|e| WalletError::InvalidPrivateKey(e.to_string()))?;
        let verifying_key = signing_key.verifying_key();

        let public_key_compressed: [u8; 33] = verifying_key
            .to_encoded_point(true)
            .as_bytes()
            .try_into()
            .map_err(|_| WalletError::DerivationFailed("Invalid public key length".into()))?;

        let public_key_uncompressed: [u8; 65] = verifying_key
            .to_encoded_point(false)
            .as_bytes()
            .try_into()
            .map_err(|_| WalletError::DerivationFailed("Invalid uncompressed public key".into()))?;

        Ok(Self {
            private_key,
            public_key_compressed,
            public_key_uncompressed,
            derivation_path,
        })
    }

    pub fn private_key(&self) -> &[u8; 32] {
        self.private_key.as_bytes()
    }
}

impl fmt::Debug for DerivedKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DerivedKey")
            .field("public_key", &hex::encode(self.public_key_compressed))
            .field("derivation_path", &self.derivation_path)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mnemonic::SeedWallet;

    // BIP-39 test vector: "abandon" x11 + "about"
    const TEST_MNEMONIC: &str = "abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon about";

    fn test_wallet() -> SeedWallet {
        SeedWallet::load(TEST_MNEMONIC).unwrap()
    }

    #[test]
    fn test_derive_eth_key() {
        let wallet = test_wallet();
        let key = derive_secp256k1_key(wallet.seed(), &evm_derivation_path(60, 0)).unwrap();
        assert_eq!(key.derivation_path, "m/44'/60'/0'/0/0");
        assert!(key.public_key_compressed[0] == 0x02 || key.public_key_compressed[0] == 0x03);
        assert_eq!(key.public_key_uncompressed[0], 0x04);
        // Same X coordinate in both encodings.
        assert_eq!(key.public_key_compressed[1..], key.public_key_uncompressed[1..33]);
    }

    #[test]
    fn test_bip32_vector_private_key() {
        let wallet = test_wallet();
        let key = derive_secp256k1_key(wallet.seed(), "m/44'/60'/0'/0/0").unwrap();
        assert_eq!(
            hex::encode(key.private_key()),
            "1ab42cc412b618bdea3a599e3c9bae199ebf030895b039e9db1e30dafb12b727"
        );
    }

    #[test]
    fn test_derivation_deterministic() {
        let wallet = test_wallet();
        let key1 = derive_secp256k1_key(wallet.seed(), "m/84'/0'/0'/0/0").unwrap();
        let key2 = derive_secp256k1_key(wallet.seed(), "m/84'/0'/0'/0/0").unwrap();
        assert_eq!(key1.private_key(), key2.private_key());
    }

    #[test]
    fn test_different_indices_different_keys() {
        let wallet = test_wallet();
        let key0 = derive_secp256k1_key(wallet.seed(), &evm_derivation_path(60, 0)).unwrap();
        let key1 = derive_secp256k1_key(wallet.seed(), &evm_derivation_path(60, 1)).unwrap();
        assert_ne!(key0.private_key(), key1.private_key());
    }

    #[test]
    fn test_bad_path_rejected() {
        let wallet = test_wallet();
        for path in ["", "44'/60'", "m/44'/x'/0'", "m/44''/60'"] {
            assert!(
                matches!(
                    derive_secp256k1_key(wallet.seed(), path),
                    Err(WalletError::DerivationFailed(_))
                ),
                "{path}"
            );
        }
    }

    #[test]
    fn test_from_secret_rejects_zero_scalar() {
        let result = DerivedKey::from_secret(SecretKeyBytes::new([0u8; 32]), "imported".into());
        assert!(matches!(result, Err(WalletError::InvalidPrivateKey(_))));
    }

    #[test]
    fn test_debug_hides_private_key() {
        let key =
            DerivedKey::from_secret(SecretKeyBytes::new([0x11; 32]), "imported".into()).unwrap();
        let debug = format!("{key:?}");
        assert!(!debug.contains(&"11".repeat(32)));
        assert!(debug.contains("imported"));
    }
}
