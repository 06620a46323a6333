use bitcoin::{Amount, Denomination};

use crate::error::BtcError;

/// Parses a BTC decimal string (`"0.0005"`) into satoshis without floats.
pub fn parse_btc(amount: &str) -> Result<u64, BtcError> {
    Amount::from_str_in(amount.trim(), Denomination::Bitcoin)
        .map(Amount::to_sat)
        .map_err(|e| BtcError::InvalidAmount(format!("'{amount}': {e}")))
}

/// Formats satoshis as a BTC decimal string with trailing zeros removed.
pub fn format_btc(sats: u64) -> String {
    let text = Amount::from_sat(sats).to_string_in(Denomination::Bitcoin);
    if text.contains('.') {
        text.trim_end_matches('0').trim_end_matches('.').to_string()
    } else {
        text
    }
}
