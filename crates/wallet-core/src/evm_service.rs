//! EVM sends: validate, resolve gas, then fetch nonce, sign and broadcast
//! while holding the sender's account lock.

use std::collections::HashMap;
use std::sync::Arc;

use chain_eth::address::{private_key_to_address, validate_address};
use chain_eth::broadcast::EvmBroadcaster;
use chain_eth::chains::EvmNetwork;
use chain_eth::gas::{
    check_gas_limit, GasPrice, GasPriceEngine, GasPriceEstimate, ERC20_TRANSFER_GAS_LIMIT,
    NATIVE_TRANSFER_GAS_LIMIT,
};
use chain_eth::rpc::EthRpcClient;
use chain_eth::transaction::{
    build_contract_call, build_erc20_transfer, build_transfer, sign_eip1559_transaction,
    sign_legacy_transaction, LegacyTransaction, SignedTransaction,
};
use chain_eth::units::parse_units;
use chain_eth::{abi, erc20, EthError, U256};
use serde::Serialize;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::{debug, info};

use crate::credentials::{load_signing_key, CredentialStore};
use crate::error::WalletError;
use crate::hd_derivation::{evm_derivation_path, DerivedKey};

/// One async mutex per `(chain_id, address)`.
///
/// Held from the nonce read until the node has accepted the transaction, so
/// two sends from the same account can never read the same nonce. Different
/// accounts do not contend.
///
/// The nonce is read at the `"latest"` block, so this only holds when the
/// node counts an accepted transaction before it is mined. Against a node
/// that counts mined transactions only, back-to-back sends from one account
/// can still reuse a nonce. Entries are never evicted; the map holds one
/// mutex per account that has ever sent.
#[derive(Debug, Default)]
pub struct AccountLocks {
    locks: Mutex<HashMap<(u64, String), Arc<Mutex<()>>>>,
}

impl AccountLocks {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn acquire(&self, chain_id: u64, address: &str) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self.locks.lock().await;
            locks
                .entry((chain_id, address.to_ascii_lowercase()))
                .or_default()
                .clone()
        };
        lock.lock_owned().await
    }

    /// Number of accounts that have sent through this map.
    pub async fn tracked_accounts(&self) -> usize {
        self.locks.lock().await.len()
    }
}

/// What a successful send reports back.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SendReceipt {
    pub chain_id: u64,
    pub from: String,
    pub nonce: u64,
    pub tx_hash: String,
    pub gas_price: GasPrice,
    /// Signed as a type-2 envelope rather than legacy EIP-155.
    pub typed: bool,
}

/// Transfer and contract-call service for one configured network.
#[derive(Clone)]
pub struct EvmService {
    network: EvmNetwork,
    rpc: EthRpcClient,
    gas: GasPriceEngine,
    broadcaster: EvmBroadcaster,
    locks: Arc<AccountLocks>,
}

impl EvmService {
    pub fn new(network: EvmNetwork, rpc: EthRpcClient, locks: Arc<AccountLocks>) -> Self {
        Self {
            gas: GasPriceEngine::new(rpc.clone()),
            broadcaster: EvmBroadcaster::new(rpc.clone(), network.chain_id),
            network,
            rpc,
            locks,
        }
    }

    /// Service talking JSON-RPC over HTTP to the network's `rpc_url`.
    pub fn connect(network: EvmNetwork, locks: Arc<AccountLocks>) -> Self {
        let rpc = EthRpcClient::http(network.rpc_url.clone());
        Self::new(network, rpc, locks)
    }

    pub fn network(&self) -> &EvmNetwork {
        &self.network
    }

    pub fn chain_id(&self) -> u64 {
        self.network.chain_id
    }

    /// Key for `account_index` at `m/44'/{coin_type}'/0'/0/{index}`.
    pub fn signing_key(
        &self,
        store: &dyn CredentialStore,
        account_index: u32,
    ) -> Result<DerivedKey, WalletError> {
        let path = evm_derivation_path(self.network.coin_type, account_index);
        load_signing_key(store, &path, account_index)
    }

    /// Standard-tier recommendation using the network's fee model.
    pub async fn estimate_gas(&self) -> GasPriceEstimate {
        self.gas.estimate(self.network.supports_eip1559).await
    }

    /// Slow, standard and fast recommendations.
    pub async fn estimate_gas_tiers(&self) -> [GasPriceEstimate; 3] {
        self.gas
            .estimate_all_tiers(self.network.supports_eip1559)
            .await
    }

    /// On-chain transaction count of `address` at the latest block.
    pub async fn nonce(&self, address: &str) -> Result<u64, WalletError> {
        check_evm_address(address)?;
        Ok(self.rpc.transaction_count(address).await?)
    }

    /// ERC-20 `balanceOf(owner)` through `eth_call`.
    pub async fn token_balance(&self, token: &str, owner: &str) -> Result<U256, WalletError> {
        check_evm_address(token)?;
        let data = erc20::encode_balance_of(owner)?;
        let output = self.rpc.call(token, &data).await?;
        Ok(abi::decode_uint256(&output)?)
    }

    /// Sends `amount` (decimal string in native units) to `to`.
    pub async fn send_native(
        &self,
        key: &DerivedKey,
        to: &str,
        amount: &str,
        gas_price: Option<GasPrice>,
    ) -> Result<SendReceipt, WalletError> {
        check_evm_address(to)?;
        let value = parse_units(amount, self.network.native_decimals)?;
        let chain_id = self.network.chain_id;

        self.submit(key, gas_price, NATIVE_TRANSFER_GAS_LIMIT, |nonce, price| {
            build_transfer(chain_id, nonce, to, value, price, NATIVE_TRANSFER_GAS_LIMIT)
        })
        .await
    }

    /// Sends `amount` of the ERC-20 at `token` (with `decimals`) to `to`.
    pub async fn send_erc20(
        &self,
        key: &DerivedKey,
        token: &str,
        decimals: u8,
        to: &str,
        amount: &str,
        gas_price: Option<GasPrice>,
    ) -> Result<SendReceipt, WalletError> {
        check_evm_address(token)?;
        check_evm_address(to)?;
        let value = parse_units(amount, decimals)?;
        let chain_id = self.network.chain_id;

        self.submit(key, gas_price, ERC20_TRANSFER_GAS_LIMIT, |nonce, price| {
            build_erc20_transfer(
                chain_id,
                nonce,
                token,
                to,
                value,
                price,
                ERC20_TRANSFER_GAS_LIMIT,
            )
        })
        .await
    }

    /// Sends arbitrary calldata (router swaps, approvals) with `value_wei`.
    pub async fn send_contract_call(
        &self,
        key: &DerivedKey,
        contract: &str,
        value_wei: U256,
        data: Vec<u8>,
        gas_limit: u64,
        gas_price: Option<GasPrice>,
    ) -> Result<SendReceipt, WalletError> {
        check_evm_address(contract)?;
        let chain_id = self.network.chain_id;

        self.submit(key, gas_price, gas_limit, move |nonce, price| {
            build_contract_call(chain_id, nonce, contract, value_wei, data, price, gas_limit)
        })
        .await
    }

    async fn submit<F>(
        &self,
        key: &DerivedKey,
        gas_price: Option<GasPrice>,
        gas_limit: u64,
        build: F,
    ) -> Result<SendReceipt, WalletError>
    where
        F: FnOnce(u64, u128) -> Result<LegacyTransaction, EthError>,
    {
        check_gas_limit(gas_limit)?;
        let from = private_key_to_address(key.private_key())?;
        let chain_id = self.network.chain_id;

        let gas_price = match gas_price {
            Some(price) => price,
            None => self.estimate_gas().await.recommended,
        };

        let _guard = self.locks.acquire(chain_id, &from).await;

        let nonce = self.rpc.transaction_count(&from).await?;
        debug!(chain_id, %from, nonce, gas_limit, "signing transaction");

        let tx = build(nonce, gas_price.legacy_gas_price())?;
        let signed = self.sign(tx, &gas_price, key)?;
        let tx_hash = self.broadcaster.broadcast(&signed).await?;

        info!(chain_id, %from, nonce, %tx_hash, "send complete");
        Ok(SendReceipt {
            chain_id,
            from,
            nonce,
            tx_hash,
            gas_price,
            typed: self.network.typed_transactions,
        })
    }

    fn sign(
        &self,
        tx: LegacyTransaction,
        gas_price: &GasPrice,
        key: &DerivedKey,
    ) -> Result<SignedTransaction, EthError> {
        if !self.network.typed_transactions {
            return sign_legacy_transaction(&tx, key.private_key());
        }

        let (priority, max_fee) = match *gas_price {
            GasPrice::Eip1559 {
                max_fee_per_gas,
                max_priority_fee_per_gas,
            } => (max_priority_fee_per_gas, max_fee_per_gas),
            GasPrice::Legacy { gas_price } => (gas_price, gas_price),
        };
        sign_eip1559_transaction(&tx.into_eip1559(priority, max_fee), key.private_key())
    }
}

/// `0x` + 40 hex digits, with a valid EIP-55 checksum when mixed case.
fn check_evm_address(address: &str) -> Result<(), WalletError> {
    if validate_address(address)? {
        Ok(())
    } else {
        Err(WalletError::InvalidAddress(format!(
            "{address}: EIP-55 checksum mismatch"
        )))
    }
}
