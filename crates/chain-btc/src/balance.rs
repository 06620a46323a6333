use serde::{Deserialize, Serialize};

/// Funded/spent output sums as reported by Esplora.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
pub struct TxoStats {
    #[serde(default)]
    pub funded_txo_sum: u64,
    #[serde(default)]
    pub spent_txo_sum: u64,
}

/// `GET /address/{address}` body (only the fields the wallet reads).
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct AddressStats {
    #[serde(default)]
    pub chain_stats: TxoStats,
    #[serde(default)]
    pub mempool_stats: TxoStats,
}

/// Address balance in satoshis.
///
/// `unconfirmed` goes negative while spends of confirmed coins sit in the mempool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct BtcBalance {
    pub confirmed: u64,
    pub unconfirmed: i64,
    pub total: i64,
}

impl From<&AddressStats> for BtcBalance {
    fn from(stats: &AddressStats) -> Self {
        let confirmed = stats
            .chain_stats
            .funded_txo_sum
            .saturating_sub(stats.chain_stats.spent_txo_sum);
        let unconfirmed =
            stats.mempool_stats.funded_txo_sum as i64 - stats.mempool_stats.spent_txo_sum as i64;

        BtcBalance {
            confirmed,
            unconfirmed,
            total: confirmed as i64 + unconfirmed,
        }
    }
}
