use bitcoin::address::{Address, NetworkUnchecked};
use bitcoin::secp256k1::Secp256k1;
use bitcoin::CompressedPublicKey;
use serde::{Deserialize, Serialize};

use crate::error::BtcError;
use crate::network::BtcNetwork;

/// BIP purpose levels and the output script each one fixes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AddressScheme {
    /// Legacy P2PKH (`1...` / `m...`, `n...`).
    Bip44,
    /// P2SH-wrapped SegWit (`3...` / `2...`).
    Bip49,
    /// Native SegWit P2WPKH (`bc1q...` / `tb1q...`).
    #[default]
    Bip84,
    /// Taproot key-path P2TR (`bc1p...` / `tb1p...`).
    Bip86,
}

impl AddressScheme {
    pub fn purpose(self) -> u32 {
        match self {
            AddressScheme::Bip44 => 44,
            AddressScheme::Bip49 => 49,
            AddressScheme::Bip84 => 84,
            AddressScheme::Bip86 => 86,
        }
    }

    /// `m/{purpose}'/{coin}'/0'/0/{account_index}`.
    pub fn derivation_path(self, network: BtcNetwork, account_index: u32) -> String {
        format!(
            "m/{}'/{}'/0'/0/{}",
            self.purpose(),
            network.coin_type(),
            account_index
        )
    }
}

impl std::fmt::Display for AddressScheme {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "BIP{}", self.purpose())
    }
}

fn parse_pubkey(pubkey_bytes: &[u8; 33]) -> Result<CompressedPublicKey, BtcError> {
    CompressedPublicKey::from_slice(pubkey_bytes).map_err(|e| {
        BtcError::InvalidPublicKey(format!("failed to parse compressed public key: {e}"))
    })
}

/// Encodes a compressed secp256k1 public key as an address of the given scheme.
pub fn pubkey_to_address(
    pubkey_bytes: &[u8; 33],
    scheme: AddressScheme,
    network: BtcNetwork,
) -> Result<String, BtcError> {
    let pk = parse_pubkey(pubkey_bytes)?;
    let net = network.to_bitcoin_network();

    let address = match scheme {
        AddressScheme::Bip44 => Address::p2pkh(pk.pubkey_hash(), net),
        AddressScheme::Bip49 => Address::p2shwpkh(&pk, net),
        AddressScheme::Bip84 => Address::p2wpkh(&pk, net),
        AddressScheme::Bip86 => {
            let secp = Secp256k1::verification_only();
            let (internal_key, _parity) = pk.0.x_only_public_key();
            Address::p2tr(&secp, internal_key, None, net)
        }
    };

    Ok(address.to_string())
}

/// Derive a P2WPKH (native SegWit bech32) address from a compressed public key.
pub fn pubkey_to_p2wpkh_address(
    pubkey_bytes: &[u8; 33],
    network: BtcNetwork,
) -> Result<String, BtcError> {
    pubkey_to_address(pubkey_bytes, AddressScheme::Bip84, network)
}

/// Parses an address and requires it to belong to `network`.
pub fn parse_address(address: &str, network: BtcNetwork) -> Result<Address, BtcError> {
    address
        .parse::<Address<NetworkUnchecked>>()
        .map_err(|e| BtcError::InvalidAddress(format!("failed to parse address: {e}")))?
        .require_network(network.to_bitcoin_network())
        .map_err(|e| BtcError::InvalidAddress(format!("address on wrong network: {e}")))
}

/// Validate a Bitcoin address string for the given network.
///
/// Supports P2PKH, P2SH, P2WPKH, P2WSH, and P2TR address formats.
/// Returns `true` if the address is valid for the specified network,
/// `false` if it is valid but for a different network.
pub fn validate_address(address: &str, network: BtcNetwork) -> Result<bool, BtcError> {
    let parsed = address
        .parse::<Address<NetworkUnchecked>>()
        .map_err(|e| BtcError::InvalidAddress(format!("failed to parse address: {e}")))?;

    Ok(parsed.is_valid_for_network(network.to_bitcoin_network()))
}
