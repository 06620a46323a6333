use std::sync::Arc;

use chain_eth::chains::NetworkRegistry;
use chain_eth::rpc::EthRpcClient;

use crate::address::{derive_address, derive_bitcoin_account};
use crate::btc_service::BitcoinService;
use crate::config::EngineConfig;
use crate::error::WalletError;
use crate::evm_service::{AccountLocks, EvmService};
use crate::mnemonic::SeedWallet;
use crate::types::{next_account_index, BlockchainType, ChainAccount, DerivationScheme};

/// Entry point wiring configuration to per-chain services.
///
/// Every [`EvmService`] handed out shares one [`AccountLocks`] map, so sends
/// for the same account are serialized even across service instances.
pub struct WalletEngine {
    config: EngineConfig,
    registry: NetworkRegistry,
    locks: Arc<AccountLocks>,
    bitcoin: BitcoinService,
}

impl WalletEngine {
    pub fn from_config(config: EngineConfig) -> Result<Self, WalletError> {
        config.validate()?;
        let registry = config.network_registry()?;
        let bitcoin = BitcoinService::from_config(&config.bitcoin);
        Ok(Self {
            config,
            registry,
            locks: Arc::new(AccountLocks::new()),
            bitcoin,
        })
    }

    /// Replaces the Bitcoin backend, e.g. with a local Esplora instance.
    pub fn with_bitcoin(mut self, bitcoin: BitcoinService) -> Self {
        self.bitcoin = bitcoin;
        self
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn networks(&self) -> &NetworkRegistry {
        &self.registry
    }

    pub fn bitcoin(&self) -> &BitcoinService {
        &self.bitcoin
    }

    /// Service for `chain_id` over HTTP JSON-RPC.
    pub fn evm(&self, chain_id: u64) -> Result<EvmService, WalletError> {
        let network = self.registry.get(chain_id)?.clone();
        Ok(EvmService::connect(network, self.locks.clone()))
    }

    /// Service for `chain_id` over a caller-supplied client.
    pub fn evm_with_rpc(
        &self,
        chain_id: u64,
        rpc: EthRpcClient,
    ) -> Result<EvmService, WalletError> {
        let network = self.registry.get(chain_id)?.clone();
        Ok(EvmService::new(network, rpc, self.locks.clone()))
    }

    /// Derives the next account of `scheme`'s family and appends it.
    pub fn add_account(
        &self,
        wallet: &SeedWallet,
        accounts: &mut Vec<ChainAccount>,
        coin_type: u32,
        scheme: DerivationScheme,
    ) -> Result<ChainAccount, WalletError> {
        let index = next_account_index(accounts, scheme.blockchain_type());
        let account = derive_address(wallet, coin_type, scheme, index)?;
        accounts.push(account.clone());
        Ok(account)
    }

    /// Next Bitcoin account on the configured network, using
    /// `[bitcoin].default_scheme`.
    pub fn add_bitcoin_account(
        &self,
        wallet: &SeedWallet,
        accounts: &mut Vec<ChainAccount>,
    ) -> Result<ChainAccount, WalletError> {
        let bitcoin = &self.config.bitcoin;
        let index = next_account_index(accounts, BlockchainType::Bitcoin);
        let account =
            derive_bitcoin_account(wallet, bitcoin.default_scheme, bitcoin.network, index)?;
        accounts.push(account.clone());
        Ok(account)
    }
}
