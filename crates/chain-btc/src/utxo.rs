use serde::{Deserialize, Serialize};

use crate::error::BtcError;
use crate::fee::estimate_fee;

/// A single unspent transaction output (UTXO).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Utxo {
    /// Transaction ID as a hex string (display order).
    pub txid: String,
    /// Output index within the transaction.
    pub vout: u32,
    /// Value in satoshis.
    pub value_sat: u64,
    pub confirmed: bool,
}

#[derive(Debug, Clone, Deserialize)]
struct EsploraStatus {
    #[serde(default)]
    confirmed: bool,
}

/// `GET /address/{address}/utxo` element.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct EsploraUtxo {
    txid: String,
    vout: u32,
    value: u64,
    status: EsploraStatus,
}

impl From<EsploraUtxo> for Utxo {
    fn from(u: EsploraUtxo) -> Self {
        Utxo {
            txid: u.txid,
            vout: u.vout,
            value_sat: u.value,
            confirmed: u.status.confirmed,
        }
    }
}

/// Result of UTXO selection: the chosen UTXOs and their aggregate value.
#[derive(Debug, Clone)]
pub struct UtxoSelection {
    pub selected: Vec<Utxo>,
    pub total_sat: u64,
    /// Fee assumed during selection (two outputs).
    pub fee_sat: u64,
}

/// Select confirmed UTXOs to cover `target_sat` plus the two-output fee.
///
/// Largest-first: confirmed outputs sorted by value descending, added until
/// `sum >= target + estimate_fee(n, 2, rate)`. Unconfirmed outputs are never
/// spent.
pub fn select_utxos(
    utxos: &[Utxo],
    target_sat: u64,
    fee_rate_sat_vbyte: u64,
) -> Result<UtxoSelection, BtcError> {
    let mut sorted: Vec<&Utxo> = utxos.iter().filter(|u| u.confirmed).collect();
    sorted.sort_by(|a, b| b.value_sat.cmp(&a.value_sat));

    let mut selected: Vec<Utxo> = Vec::new();
    let mut total_sat: u64 = 0;

    for utxo in sorted {
        selected.push(utxo.clone());
        total_sat = total_sat.saturating_add(utxo.value_sat);

        let fee_sat = estimate_fee(selected.len(), 2, fee_rate_sat_vbyte);
        if total_sat >= target_sat.saturating_add(fee_sat) {
            return Ok(UtxoSelection {
                selected,
                total_sat,
                fee_sat,
            });
        }
    }

    let fee = estimate_fee(selected.len().max(1), 2, fee_rate_sat_vbyte);
    Err(BtcError::InsufficientFunds {
        available: total_sat,
        required: target_sat.saturating_add(fee),
    })
}
