use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::EthError;

fn default_decimals() -> u8 {
    18
}

fn default_true() -> bool {
    true
}

fn default_coin_type() -> u32 {
    60
}

/// Definition of an EVM-compatible network, injected from configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvmNetwork {
    pub name: String,
    pub chain_id: u64,
    pub rpc_url: String,
    pub native_symbol: String,
    #[serde(default = "default_decimals")]
    pub native_decimals: u8,
    /// BIP-44 coin type for account derivation (60 for most EVM chains).
    #[serde(default = "default_coin_type")]
    pub coin_type: u32,
    /// Whether blocks carry a base fee; selects the EIP-1559 gas path.
    #[serde(default = "default_true")]
    pub supports_eip1559: bool,
    /// Sign type-2 envelopes instead of legacy EIP-155 ones.
    #[serde(default)]
    pub typed_transactions: bool,
    /// Uniswap-V2 style router used for swaps.
    #[serde(default)]
    pub router_address: Option<String>,
    /// Wrapped native token (WETH, WBNB, ...) substituted into swap paths.
    #[serde(default)]
    pub wrapped_native: Option<String>,
}

/// Networks keyed by chain id.
#[derive(Debug, Clone, Default)]
pub struct NetworkRegistry {
    networks: BTreeMap<u64, EvmNetwork>,
}

impl NetworkRegistry {
    /// Builds a registry, rejecting duplicate chain ids.
    pub fn new(networks: impl IntoIterator<Item = EvmNetwork>) -> Result<Self, EthError> {
        let mut map = BTreeMap::new();
        for network in networks {
            let chain_id = network.chain_id;
            if map.insert(chain_id, network).is_some() {
                return Err(EthError::TransactionBuildError(format!(
                    "chain id {chain_id} configured twice"
                )));
            }
        }
        Ok(Self { networks: map })
    }

    pub fn get(&self, chain_id: u64) -> Result<&EvmNetwork, EthError> {
        self.networks
            .get(&chain_id)
            .ok_or(EthError::UnsupportedChain(chain_id))
    }

    pub fn iter(&self) -> impl Iterator<Item = &EvmNetwork> {
        self.networks.values()
    }

    pub fn len(&self) -> usize {
        self.networks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.networks.is_empty()
    }
}
