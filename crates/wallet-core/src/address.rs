use chain_btc::{AddressScheme, BtcNetwork};
use crypto_utils::{SecretKeyBytes, ZeroizingString};

use crate::error::WalletError;
use crate::hd_derivation::{derive_secp256k1_key, evm_derivation_path, DerivedKey};
use crate::mnemonic::SeedWallet;
use crate::types::{BlockchainType, Chain, ChainAccount, DerivationScheme};

/// Derive an account address from a seed wallet.
///
/// For Bitcoin schemes the coin type selects the network: 0 is mainnet, 1 is
/// testnet/signet (same address encodings).
pub fn derive_address(
    wallet: &SeedWallet,
    coin_type: u32,
    scheme: DerivationScheme,
    account_index: u32,
) -> Result<ChainAccount, WalletError> {
    match scheme {
        DerivationScheme::Evm => derive_evm_account(wallet, coin_type, account_index),
        DerivationScheme::Bitcoin(btc_scheme) => {
            let network = match coin_type {
                0 => BtcNetwork::Mainnet,
                1 => BtcNetwork::Testnet,
                other => {
                    return Err(WalletError::UnsupportedChain(format!(
                        "bitcoin coin type {other}"
                    )))
                }
            };
            derive_bitcoin_account(wallet, btc_scheme, network, account_index)
        }
    }
}

pub fn derive_evm_account(
    wallet: &SeedWallet,
    coin_type: u32,
    account_index: u32,
) -> Result<ChainAccount, WalletError> {
    let key = derive_secp256k1_key(wallet.seed(), &evm_derivation_path(coin_type, account_index))?;
    let address = chain_eth::address::pubkey_to_eth_address(&key.public_key_uncompressed)?;

    Ok(ChainAccount {
        blockchain_type: BlockchainType::Evm,
        scheme: DerivationScheme::Evm,
        coin_type,
        derivation_path: key.derivation_path.clone(),
        address,
        account_index,
    })
}

pub fn derive_bitcoin_account(
    wallet: &SeedWallet,
    scheme: AddressScheme,
    network: BtcNetwork,
    account_index: u32,
) -> Result<ChainAccount, WalletError> {
    let path = scheme.derivation_path(network, account_index);
    let key = derive_secp256k1_key(wallet.seed(), &path)?;
    let address = bitcoin_address_for_key(&key, scheme, network)?;

    Ok(ChainAccount {
        blockchain_type: BlockchainType::Bitcoin,
        scheme: DerivationScheme::Bitcoin(scheme),
        coin_type: network.coin_type(),
        derivation_path: path,
        address,
        account_index,
    })
}

pub(crate) fn bitcoin_address_for_key(
    key: &DerivedKey,
    scheme: AddressScheme,
    network: BtcNetwork,
) -> Result<String, WalletError> {
    Ok(chain_btc::address::pubkey_to_address(
        &key.public_key_compressed,
        scheme,
        network,
    )?)
}

/// Strips `0x`, lowercases and checks for a valid 32-byte secp256k1 scalar.
pub fn normalize_private_key(raw: &str) -> Result<ZeroizingString, WalletError> {
    let trimmed = raw.trim();
    let stripped = trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
        .unwrap_or(trimmed);
    let lower = ZeroizingString::new(stripped.to_ascii_lowercase());

    if lower.len() != 64 {
        return Err(WalletError::InvalidPrivateKey(format!(
            "expected 64 hex characters, got {}",
            lower.len()
        )));
    }

    let bytes = SecretKeyBytes::from_hex(&lower)?;
    DerivedKey::from_secret(bytes, String::new())?;
    Ok(lower)
}

/// Parses a raw private key (any accepted form) into key material.
pub fn private_key_to_derived_key(raw: &str) -> Result<DerivedKey, WalletError> {
    let normalized = normalize_private_key(raw)?;
    DerivedKey::from_secret(SecretKeyBytes::from_hex(&normalized)?, "imported".into())
}

/// Lowercase `0x` address controlled by a raw private key.
pub fn derive_ethereum_address(private_key_hex: &str) -> Result<String, WalletError> {
    let key = private_key_to_derived_key(private_key_hex)?;
    Ok(chain_eth::address::pubkey_to_eth_address(&key.public_key_uncompressed)?)
}

/// Validate an address for a given chain.
///
/// `Ok(false)` means well-formed but wrong: an EIP-55 checksum mismatch or a
/// Bitcoin address for another network.
pub fn validate_address(chain: Chain, address: &str) -> Result<bool, WalletError> {
    match chain {
        Chain::Evm { .. } => chain_eth::address::validate_address(address)
            .map_err(|e| WalletError::InvalidAddress(e.to_string())),
        Chain::Bitcoin(network) => chain_btc::address::validate_address(address, network)
            .map_err(|e| WalletError::InvalidAddress(e.to_string())),
    }
}
