//! Engine configuration.
//!
//! Network tables (RPC endpoints, chain ids, routers) are data, not code:
//! they are read from TOML and checked once before any service is built.
//!
//! ```toml
//! [logging]
//! level = "info"
//! format = "json"
//!
//! [bitcoin]
//! network = "mainnet"
//!
//! [[evm_networks]]
//! name = "Ethereum"
//! chain_id = 1
//! rpc_url = "https://eth.llamarpc.com"
//! native_symbol = "ETH"
//! router_address = "0x7a250d5630B4cF539739dF2C5dAcb4c659F2488D"
//! wrapped_native = "0xC02aaA39b223FE8D0A0e5C4F27eAD9083C756Cc2"
//! ```

use std::collections::HashSet;
use std::fs;
use std::path::Path;

use chain_btc::{AddressScheme, BtcNetwork};
use chain_eth::chains::{EvmNetwork, NetworkRegistry};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::WalletError;
use crate::logging::LoggingConfig;

/// Native decimals above this are treated as a typo.
pub const MAX_NATIVE_DECIMALS: u8 = 36;

/// `[bitcoin]` section. Endpoints default to the network's public ones.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct BitcoinConfig {
    #[serde(default)]
    pub network: BtcNetwork,
    #[serde(default)]
    pub esplora_url: Option<String>,
    #[serde(default)]
    pub fee_api_url: Option<String>,
    /// Scheme used for new Bitcoin accounts.
    #[serde(default)]
    pub default_scheme: AddressScheme,
}

impl BitcoinConfig {
    pub fn esplora_url(&self) -> &str {
        self.esplora_url
            .as_deref()
            .unwrap_or_else(|| self.network.default_esplora_url())
    }

    pub fn fee_api_url(&self) -> &str {
        self.fee_api_url
            .as_deref()
            .unwrap_or_else(|| self.network.default_fee_api_url())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct EngineConfig {
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub bitcoin: BitcoinConfig,
    #[serde(default)]
    pub evm_networks: Vec<EvmNetwork>,
}

impl EngineConfig {
    /// Parses and validates a TOML document.
    pub fn from_toml_str(content: &str) -> Result<Self, WalletError> {
        let config: EngineConfig =
            toml::from_str(content).map_err(|e| WalletError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate configuration from a TOML file.
    pub fn load(path: &Path) -> Result<Self, WalletError> {
        let content = fs::read_to_string(path)
            .map_err(|e| WalletError::Config(format!("{}: {e}", path.display())))?;
        Self::from_toml_str(&content)
    }

    /// Checks every section and reports all problems at once.
    pub fn validate(&self) -> Result<(), WalletError> {
        let mut problems = Vec::new();
        let mut chain_ids = HashSet::new();

        for net in &self.evm_networks {
            let label = format!("evm network '{}'", net.name);
            if !chain_ids.insert(net.chain_id) {
                problems.push(format!("chain id {} configured twice", net.chain_id));
            }
            if net.chain_id == 0 {
                problems.push(format!("{label}: chain id must be positive"));
            }
            if let Err(e) = check_http_url(&net.rpc_url) {
                problems.push(format!("{label}: rpc_url {e}"));
            }
            if net.native_decimals > MAX_NATIVE_DECIMALS {
                problems.push(format!(
                    "{label}: native_decimals {} exceeds {MAX_NATIVE_DECIMALS}",
                    net.native_decimals
                ));
            }
            for (field, value) in [
                ("router_address", &net.router_address),
                ("wrapped_native", &net.wrapped_native),
            ] {
                if let Some(address) = value {
                    if let Err(e) = chain_eth::address::parse_address(address) {
                        problems.push(format!("{label}: {field} {e}"));
                    }
                }
            }
        }

        for (field, value) in [
            ("esplora_url", &self.bitcoin.esplora_url),
            ("fee_api_url", &self.bitcoin.fee_api_url),
        ] {
            if let Some(url) = value {
                if let Err(e) = check_http_url(url) {
                    problems.push(format!("bitcoin: {field} {e}"));
                }
            }
        }

        if problems.is_empty() {
            Ok(())
        } else {
            Err(WalletError::Config(problems.join("; ")))
        }
    }

    pub fn network_registry(&self) -> Result<NetworkRegistry, WalletError> {
        NetworkRegistry::new(self.evm_networks.iter().cloned())
            .map_err(|e| WalletError::Config(e.to_string()))
    }
}

fn check_http_url(raw: &str) -> Result<(), String> {
    let url = Url::parse(raw).map_err(|e| format!("'{raw}' is not a URL: {e}"))?;
    match url.scheme() {
        "http" | "https" => Ok(()),
        other => Err(format!("'{raw}' has unsupported scheme {other}")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
        [logging]
        level = "debug"
        format = "json"

        [bitcoin]
        network = "testnet"

        [[evm_networks]]
        name = "Ethereum"
        chain_id = 1
        rpc_url = "https://eth.example"
        native_symbol = "ETH"
        typed_transactions = true
        router_address = "0x7a250d5630B4cF539739dF2C5dAcb4c659F2488D"
        wrapped_native = "0xC02aaA39b223FE8D0A0e5C4F27eAD9083C756Cc2"

        [[evm_networks]]
        name = "BSC"
        chain_id = 56
        rpc_url = "https://bsc.example"
        native_symbol = "BNB"
        supports_eip1559 = false
    "#;

    #[test]
    fn parses_sample() {
        let config = EngineConfig::from_toml_str(SAMPLE).unwrap();
        assert_eq!(config.evm_networks.len(), 2);
        assert_eq!(config.bitcoin.network, BtcNetwork::Testnet);
        assert_eq!(config.bitcoin.default_scheme, AddressScheme::Bip84);
        assert_eq!(config.bitcoin.esplora_url(), BtcNetwork::Testnet.default_esplora_url());

        let registry = config.network_registry().unwrap();
        let bsc = registry.get(56).unwrap();
        assert!(!bsc.supports_eip1559);
        assert!(registry.get(1).unwrap().typed_transactions);
    }

    #[test]
    fn empty_document_is_valid() {
        let config = EngineConfig::from_toml_str("").unwrap();
        assert!(config.evm_networks.is_empty());
        assert_eq!(config.bitcoin.network, BtcNetwork::Mainnet);
    }

    #[test]
    fn collects_every_problem() {
        let toml = r#"
            [bitcoin]
            esplora_url = "ftp://mirror"

            [[evm_networks]]
            name = "a"
            chain_id = 5
            rpc_url = "not a url"
            native_symbol = "X"
            native_decimals = 40
            router_address = "0x1234"

            [[evm_networks]]
            name = "b"
            chain_id = 5
            rpc_url = "http://localhost:8545"
            native_symbol = "Y"
        "#;
        let err = EngineConfig::from_toml_str(toml).unwrap_err().to_string();
        for needle in [
            "configured twice",
            "rpc_url",
            "native_decimals 40",
            "router_address",
            "esplora_url",
        ] {
            assert!(err.contains(needle), "{needle} missing from {err}");
        }
    }

    #[test]
    fn syntax_error_is_config_error() {
        let err = EngineConfig::from_toml_str("[[evm_networks]\nname=").unwrap_err();
        assert!(matches!(err, WalletError::Config(_)));
    }

    #[test]
    fn load_missing_file() {
        let err = EngineConfig::load(Path::new("/nonexistent/engine.toml")).unwrap_err();
        assert!(err.to_string().contains("engine.toml"));
    }
}
