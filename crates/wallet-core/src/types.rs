use chain_btc::{AddressScheme, BtcNetwork};
use serde::{Deserialize, Serialize};

/// Family of chains an account belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BlockchainType {
    Evm,
    Bitcoin,
}

/// How an account's key maps to an address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "scheme", rename_all = "snake_case")]
pub enum DerivationScheme {
    /// keccak256 of the uncompressed key, last 20 bytes.
    Evm,
    Bitcoin(AddressScheme),
}

impl DerivationScheme {
    pub fn blockchain_type(self) -> BlockchainType {
        match self {
            DerivationScheme::Evm => BlockchainType::Evm,
            DerivationScheme::Bitcoin(_) => BlockchainType::Bitcoin,
        }
    }
}

/// A target for address validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Chain {
    Evm { chain_id: u64 },
    Bitcoin(BtcNetwork),
}

/// One derived account on one chain family.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainAccount {
    pub blockchain_type: BlockchainType,
    pub scheme: DerivationScheme,
    pub coin_type: u32,
    pub derivation_path: String,
    pub address: String,
    pub account_index: u32,
}

/// The index to use for the next account of `blockchain_type` on the same
/// seed: one past the highest index in use, or 0.
pub fn next_account_index(accounts: &[ChainAccount], blockchain_type: BlockchainType) -> u32 {
    accounts
        .iter()
        .filter(|a| a.blockchain_type == blockchain_type)
        .map(|a| a.account_index.saturating_add(1))
        .max()
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn account(blockchain_type: BlockchainType, account_index: u32) -> ChainAccount {
        let scheme = match blockchain_type {
            BlockchainType::Evm => DerivationScheme::Evm,
            BlockchainType::Bitcoin => DerivationScheme::Bitcoin(AddressScheme::Bip84),
        };
        ChainAccount {
            blockchain_type,
            scheme,
            coin_type: 60,
            derivation_path: String::new(),
            address: String::new(),
            account_index,
        }
    }

    #[test]
    fn first_account_is_zero() {
        assert_eq!(next_account_index(&[], BlockchainType::Evm), 0);
    }

    #[test]
    fn next_index_follows_highest_of_same_type() {
        let accounts = vec![
            account(BlockchainType::Evm, 0),
            account(BlockchainType::Evm, 3),
            account(BlockchainType::Bitcoin, 7),
        ];
        assert_eq!(next_account_index(&accounts, BlockchainType::Evm), 4);
        assert_eq!(next_account_index(&accounts, BlockchainType::Bitcoin), 8);
    }

    #[test]
    fn scheme_serializes_with_tag() {
        let json = serde_json::to_string(&DerivationScheme::Bitcoin(AddressScheme::Bip86)).unwrap();
        assert_eq!(json, r#"{"kind":"bitcoin","scheme":"bip86"}"#);
        let evm: DerivationScheme = serde_json::from_str(r#"{"kind":"evm"}"#).unwrap();
        assert_eq!(evm.blockchain_type(), BlockchainType::Evm);
    }
}
