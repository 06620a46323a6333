//! Esplora REST client (Blockstream / mempool.space compatible).

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::balance::AddressStats;
use crate::error::BtcError;
use crate::fee::FeeRecommendation;
use crate::network::BtcNetwork;
use crate::utxo::{EsploraUtxo, Utxo};

#[derive(Debug, Clone, Default, Deserialize)]
struct EsploraTxStatus {
    #[serde(default)]
    confirmed: bool,
    #[serde(default)]
    block_height: Option<u32>,
    #[serde(default)]
    block_time: Option<u64>,
}

#[derive(Debug, Clone, Deserialize)]
struct EsploraTx {
    txid: String,
    #[serde(default)]
    fee: Option<u64>,
    #[serde(default)]
    status: EsploraTxStatus,
}

/// One entry of an address's transaction list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TxSummary {
    pub txid: String,
    pub confirmed: bool,
    pub block_height: Option<u32>,
    pub block_time: Option<u64>,
    pub fee_sat: Option<u64>,
}

impl From<EsploraTx> for TxSummary {
    fn from(tx: EsploraTx) -> Self {
        TxSummary {
            txid: tx.txid,
            confirmed: tx.status.confirmed,
            block_height: tx.status.block_height,
            block_time: tx.status.block_time,
            fee_sat: tx.fee,
        }
    }
}

/// The Esplora endpoints the wallet uses.
#[async_trait]
pub trait EsploraApi: Send + Sync {
    /// `GET /address/{address}`.
    async fn address_stats(&self, address: &str) -> Result<AddressStats, BtcError>;

    /// `GET /address/{address}/utxo`.
    async fn utxos(&self, address: &str) -> Result<Vec<Utxo>, BtcError>;

    /// `GET /address/{address}/txs`.
    async fn transactions(&self, address: &str) -> Result<Vec<TxSummary>, BtcError>;

    /// `POST /tx` with the raw hex as body; returns the txid.
    async fn broadcast(&self, raw_tx_hex: &str) -> Result<String, BtcError>;

    /// `GET /v1/fees/recommended` on the fee API host.
    async fn recommended_fees(&self) -> Result<FeeRecommendation, BtcError>;
}

/// Fee rates from the API, or the static fallback when the call fails.
pub async fn recommended_fees_or_fallback(api: &dyn EsploraApi) -> FeeRecommendation {
    match api.recommended_fees().await {
        Ok(fees) => fees,
        Err(e) => {
            warn!(error = %e, "fee recommendation unavailable, using fallback rates");
            FeeRecommendation::FALLBACK
        }
    }
}

/// [`EsploraApi`] over HTTP using reqwest.
pub struct EsploraClient {
    client: reqwest::Client,
    base_url: String,
    fee_api_url: String,
}

impl EsploraClient {
    pub fn new(base_url: impl Into<String>, fee_api_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: trim_slash(base_url.into()),
            fee_api_url: trim_slash(fee_api_url.into()),
        }
    }

    /// Client for the network's public default endpoints.
    pub fn for_network(network: BtcNetwork) -> Self {
        Self::new(network.default_esplora_url(), network.default_fee_api_url())
    }

    async fn get_json<T: serde::de::DeserializeOwned>(&self, url: String) -> Result<T, BtcError> {
        debug!(%url, "esplora GET");
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| BtcError::Network(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| BtcError::Network(e.to_string()))?;

        if !status.is_success() {
            return Err(BtcError::Network(format!("HTTP {status}: {body}")));
        }

        serde_json::from_str(&body).map_err(|e| BtcError::Protocol(format!("{url}: {e}")))
    }
}

fn trim_slash(mut url: String) -> String {
    while url.ends_with('/') {
        url.pop();
    }
    url
}

#[async_trait]
impl EsploraApi for EsploraClient {
    async fn address_stats(&self, address: &str) -> Result<AddressStats, BtcError> {
        self.get_json(format!("{}/address/{address}", self.base_url))
            .await
    }

    async fn utxos(&self, address: &str) -> Result<Vec<Utxo>, BtcError> {
        let raw: Vec<EsploraUtxo> = self
            .get_json(format!("{}/address/{address}/utxo", self.base_url))
            .await?;
        Ok(raw.into_iter().map(Utxo::from).collect())
    }

    async fn transactions(&self, address: &str) -> Result<Vec<TxSummary>, BtcError> {
        let raw: Vec<EsploraTx> = self
            .get_json(format!("{}/address/{address}/txs", self.base_url))
            .await?;
        Ok(raw.into_iter().map(TxSummary::from).collect())
    }

    async fn broadcast(&self, raw_tx_hex: &str) -> Result<String, BtcError> {
        let url = format!("{}/tx", self.base_url);
        let response = self
            .client
            .post(&url)
            .header(reqwest::header::CONTENT_TYPE, "text/plain")
            .body(raw_tx_hex.to_string())
            .send()
            .await
            .map_err(|e| BtcError::Network(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| BtcError::Network(e.to_string()))?;

        if !status.is_success() {
            warn!(%status, body = %body, "bitcoin broadcast rejected");
            return Err(BtcError::Network(body));
        }

        let txid = body.trim().to_string();
        info!(%txid, "bitcoin transaction broadcast");
        Ok(txid)
    }

    async fn recommended_fees(&self) -> Result<FeeRecommendation, BtcError> {
        self.get_json(format!("{}/v1/fees/recommended", self.fee_api_url))
            .await
    }
}
