use std::fmt;

use bip39::{Language, Mnemonic};
use crypto_utils::random::fill_entropy;
use crypto_utils::{ZeroizingBytes, ZeroizingString};
use zeroize::Zeroize;

use crate::error::WalletError;

/// Entropy sizes BIP-39 allows, in bits (12 to 24 words).
pub const ALLOWED_STRENGTHS: [u32; 5] = [128, 160, 192, 224, 256];

/// A normalized, checksum-valid mnemonic phrase. Wiped on drop.
#[derive(Clone, PartialEq, Eq)]
pub struct MnemonicPhrase(ZeroizingString);

impl MnemonicPhrase {
    /// Normalizes `raw` and checks it against the English word list.
    pub fn parse(raw: &str) -> Result<Self, WalletError> {
        let normalized = ZeroizingString::new(normalize_mnemonic(raw));
        if !is_valid_mnemonic(&normalized) {
            return Err(WalletError::InvalidMnemonic(
                "phrase fails BIP-39 word list or checksum".into(),
            ));
        }
        Ok(Self(normalized))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn words(&self) -> Vec<&str> {
        self.0.split(' ').collect()
    }

    pub fn word_count(&self) -> usize {
        self.0.split(' ').count()
    }
}

impl fmt::Debug for MnemonicPhrase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "MnemonicPhrase(<{} words redacted>)", self.word_count())
    }
}

/// Generates a fresh English mnemonic from `strength_bits` of OS entropy.
pub fn generate_mnemonic(strength_bits: u32) -> Result<MnemonicPhrase, WalletError> {
    if !ALLOWED_STRENGTHS.contains(&strength_bits) {
        return Err(WalletError::GenerationFailed(format!(
            "unsupported strength {strength_bits} bits, expected one of {ALLOWED_STRENGTHS:?}"
        )));
    }

    let mut entropy = vec![0u8; strength_bits as usize / 8];
    let result = fill_entropy(&mut entropy)
        .map_err(WalletError::from)
        .and_then(|()| {
            Mnemonic::from_entropy_in(Language::English, &entropy)
                .map_err(|e| WalletError::GenerationFailed(e.to_string()))
        });
    entropy.zeroize();

    let mnemonic = result?;
    Ok(MnemonicPhrase(ZeroizingString::new(mnemonic.to_string())))
}

/// Lowercases, splits on any whitespace, drops empty pieces and joins with
/// single spaces. Idempotent.
pub fn normalize_mnemonic(raw: &str) -> String {
    raw.split_whitespace()
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join(" ")
}

/// BIP-39 English word list and checksum check. Expects normalized input.
pub fn is_valid_mnemonic(normalized: &str) -> bool {
    Mnemonic::parse_in_normalized(Language::English, normalized).is_ok()
}

/// Validate a single word against the BIP-39 word list
pub fn is_valid_word(word: &str) -> bool {
    Language::English.find_word(word).is_some()
}

/// Holds the 64-byte BIP-39 seed derived from a mnemonic with an empty
/// passphrase. Rebuilt per operation and never persisted.
pub struct SeedWallet {
    seed: ZeroizingBytes,
}

impl SeedWallet {
    /// Normalizes and validates `mnemonic`, then stretches it into a seed.
    pub fn load(mnemonic: &str) -> Result<Self, WalletError> {
        let phrase = MnemonicPhrase::parse(mnemonic)?;
        Self::from_phrase(&phrase)
    }

    pub fn from_phrase(phrase: &MnemonicPhrase) -> Result<Self, WalletError> {
        let parsed = Mnemonic::parse_in_normalized(Language::English, phrase.as_str())
            .map_err(|e| WalletError::InvalidMnemonic(e.to_string()))?;
        let mut seed = parsed.to_seed("");
        let wallet = Self {
            seed: ZeroizingBytes::from(&seed[..]),
        };
        seed.zeroize();
        Ok(wallet)
    }

    pub fn seed(&self) -> &[u8] {
        &self.seed
    }
}

impl fmt::Debug for SeedWallet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SeedWallet(<redacted>)")
    }
}
