use std::sync::Arc;

use chain_btc::address::parse_address;
use chain_btc::amount::{format_btc, parse_btc};
use chain_btc::balance::BtcBalance;
use chain_btc::esplora::{recommended_fees_or_fallback, EsploraApi, EsploraClient, TxSummary};
use chain_btc::fee::{FeeRecommendation, FeeTier};
use chain_btc::transaction::{build_p2wpkh_transaction, ensure_signable, sign_transaction};
use chain_btc::utxo::{select_utxos, Utxo, UtxoSelection};
use chain_btc::{AddressScheme, BtcNetwork};
use serde::Serialize;
use tracing::{debug, info};

use crate::address::bitcoin_address_for_key;
use crate::config::BitcoinConfig;
use crate::credentials::{load_signing_key, CredentialStore};
use crate::error::WalletError;
use crate::hd_derivation::DerivedKey;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BtcSendReceipt {
    pub txid: String,
    pub from: String,
    pub amount_sat: u64,
    pub fee_sat: u64,
    pub fee_rate: u64,
}

/// Balance, history, fee and send operations against an Esplora backend.
#[derive(Clone)]
pub struct BitcoinService {
    api: Arc<dyn EsploraApi>,
    network: BtcNetwork,
}

impl BitcoinService {
    pub fn new(api: Arc<dyn EsploraApi>, network: BtcNetwork) -> Self {
        Self { api, network }
    }

    pub fn from_config(config: &BitcoinConfig) -> Self {
        let client = EsploraClient::new(config.esplora_url(), config.fee_api_url());
        Self::new(Arc::new(client), config.network)
    }

    pub fn network(&self) -> BtcNetwork {
        self.network
    }

    /// Key for `account_index` under `scheme` on this network.
    pub fn signing_key(
        &self,
        store: &dyn CredentialStore,
        scheme: AddressScheme,
        account_index: u32,
    ) -> Result<DerivedKey, WalletError> {
        let path = scheme.derivation_path(self.network, account_index);
        load_signing_key(store, &path, account_index)
    }

    pub async fn balance(&self, address: &str) -> Result<BtcBalance, WalletError> {
        parse_address(address, self.network)?;
        let stats = self.api.address_stats(address).await?;
        Ok(BtcBalance::from(&stats))
    }

    pub async fn utxos(&self, address: &str) -> Result<Vec<Utxo>, WalletError> {
        parse_address(address, self.network)?;
        Ok(self.api.utxos(address).await?)
    }

    pub async fn transactions(&self, address: &str) -> Result<Vec<TxSummary>, WalletError> {
        parse_address(address, self.network)?;
        Ok(self.api.transactions(address).await?)
    }

    /// Recommended rates; the fixed fallback table if the fee API is down.
    pub async fn fee_rates(&self) -> FeeRecommendation {
        recommended_fees_or_fallback(self.api.as_ref()).await
    }

    /// Selects coins for `amount_sat` at the tier's rate without signing.
    pub async fn plan_send(
        &self,
        address: &str,
        amount_sat: u64,
        tier: FeeTier,
    ) -> Result<UtxoSelection, WalletError> {
        let utxos = self.utxos(address).await?;
        let rate = self.fee_rates().await.rate(tier);
        Ok(select_utxos(&utxos, amount_sat, rate)?)
    }

    /// Builds, signs and broadcasts a payment from the key's `scheme` address.
    ///
    /// Only BIP84 accounts can spend; other schemes fail with
    /// [`WalletError::Unsupported`] before anything touches the network.
    pub async fn send(
        &self,
        key: &DerivedKey,
        scheme: AddressScheme,
        recipient: &str,
        amount_sat: u64,
        tier: FeeTier,
    ) -> Result<BtcSendReceipt, WalletError> {
        ensure_signable(scheme)?;
        parse_address(recipient, self.network)?;
        let from = bitcoin_address_for_key(key, scheme, self.network)?;

        let utxos = self.api.utxos(&from).await?;
        let fee_rate = self.fee_rates().await.rate(tier);
        debug!(%from, utxos = utxos.len(), fee_rate, amount_sat, "building bitcoin payment");

        let unsigned = build_p2wpkh_transaction(
            &utxos,
            &from,
            recipient,
            amount_sat,
            fee_rate,
            self.network,
        )?;
        let signed = sign_transaction(&unsigned, key.private_key())?;

        let txid = self.api.broadcast(&signed.raw_hex()).await?;
        if txid != signed.txid {
            debug!(local = %signed.txid, remote = %txid, "backend reported a different txid");
        }
        info!(
            %from,
            %txid,
            amount = %format_btc(amount_sat),
            fee_sat = signed.fee_sat,
            "bitcoin payment sent"
        );

        Ok(BtcSendReceipt {
            txid,
            from,
            amount_sat,
            fee_sat: signed.fee_sat,
            fee_rate,
        })
    }

    /// [`send`](Self::send) with the amount as a BTC decimal string.
    pub async fn send_btc(
        &self,
        key: &DerivedKey,
        scheme: AddressScheme,
        recipient: &str,
        amount_btc: &str,
        tier: FeeTier,
    ) -> Result<BtcSendReceipt, WalletError> {
        let amount_sat = parse_btc(amount_btc)?;
        self.send(key, scheme, recipient, amount_sat, tier).await
    }
}
