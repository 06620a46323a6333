use bitcoin::absolute::LockTime;
use bitcoin::hashes::Hash;
use bitcoin::script::ScriptBuf;
use bitcoin::secp256k1::{Message, Secp256k1, SecretKey};
use bitcoin::sighash::{EcdsaSighashType, SighashCache};
use bitcoin::transaction::Version;
use bitcoin::{
    Amount, CompressedPublicKey, OutPoint, Sequence, Transaction, TxIn, TxOut, Txid, Witness,
};

use crate::address::{parse_address, AddressScheme};
use crate::error::BtcError;
use crate::fee::{estimate_fee, DUST_THRESHOLD_SAT};
use crate::network::BtcNetwork;
use crate::utxo::{select_utxos, Utxo};

/// An unsigned Bitcoin transaction ready for signing.
#[derive(Debug, Clone)]
pub struct UnsignedBtcTx {
    /// The bitcoin transaction with empty witnesses.
    pub tx: Transaction,
    /// The outputs being spent, in input order. Needed for sighashes.
    pub prevouts: Vec<TxOut>,
    /// Fee paid, including any dust change folded into it.
    pub fee_sat: u64,
}

/// A signed transaction ready for `POST /tx`.
#[derive(Debug, Clone)]
pub struct SignedBtcTx {
    pub raw_tx: Vec<u8>,
    pub txid: String,
    pub fee_sat: u64,
}

impl SignedBtcTx {
    pub fn raw_hex(&self) -> String {
        hex::encode(&self.raw_tx)
    }
}

/// Only BIP84 (P2WPKH) accounts can be spent from; the other schemes derive
/// addresses but have no signer.
pub fn ensure_signable(scheme: AddressScheme) -> Result<(), BtcError> {
    match scheme {
        AddressScheme::Bip84 => Ok(()),
        other => Err(BtcError::UnsupportedScheme(other.to_string())),
    }
}

/// Build an unsigned P2WPKH Bitcoin transaction.
///
/// UTXOs are assumed to belong to `owner_address`, whose script is used for
/// every prevout and for change. A change output is added only if it exceeds
/// the dust threshold (546 sats); otherwise it goes to the fee.
pub fn build_p2wpkh_transaction(
    utxos: &[Utxo],
    owner_address: &str,
    recipient: &str,
    amount_sat: u64,
    fee_rate_sat_vbyte: u64,
    network: BtcNetwork,
) -> Result<UnsignedBtcTx, BtcError> {
    if amount_sat == 0 {
        return Err(BtcError::InvalidAmount("amount must be positive".into()));
    }
    if amount_sat <= DUST_THRESHOLD_SAT {
        return Err(BtcError::InvalidAmount(format!(
            "{amount_sat} sat is below the dust threshold"
        )));
    }

    let recipient_addr = parse_address(recipient, network)?;
    let owner_addr = parse_address(owner_address, network)?;
    let owner_script = owner_addr.script_pubkey();
    if !owner_script.is_p2wpkh() {
        return Err(BtcError::UnsupportedScheme(format!(
            "{owner_address} is not a P2WPKH address"
        )));
    }

    let selection = select_utxos(utxos, amount_sat, fee_rate_sat_vbyte)?;

    let mut inputs = Vec::with_capacity(selection.selected.len());
    let mut prevouts = Vec::with_capacity(selection.selected.len());

    for utxo in &selection.selected {
        let txid: Txid = utxo
            .txid
            .parse()
            .map_err(|e| BtcError::TransactionBuildError(format!("invalid txid: {e}")))?;

        inputs.push(TxIn {
            previous_output: OutPoint::new(txid, utxo.vout),
            script_sig: ScriptBuf::new(),
            sequence: Sequence::ENABLE_RBF_NO_LOCKTIME,
            witness: Witness::default(),
        });

        prevouts.push(TxOut {
            value: Amount::from_sat(utxo.value_sat),
            script_pubkey: owner_script.clone(),
        });
    }

    let n_inputs = selection.selected.len();
    let fee_2_outputs = estimate_fee(n_inputs, 2, fee_rate_sat_vbyte);
    let fee_1_output = estimate_fee(n_inputs, 1, fee_rate_sat_vbyte);

    let change_sat = selection
        .total_sat
        .saturating_sub(amount_sat.saturating_add(fee_2_outputs));

    let mut outputs = vec![TxOut {
        value: Amount::from_sat(amount_sat),
        script_pubkey: recipient_addr.script_pubkey(),
    }];

    let fee_sat = if change_sat > DUST_THRESHOLD_SAT {
        outputs.push(TxOut {
            value: Amount::from_sat(change_sat),
            script_pubkey: owner_script,
        });
        fee_2_outputs
    } else {
        selection.total_sat - amount_sat
    };

    debug_assert!(fee_sat >= fee_1_output);

    let tx = Transaction {
        version: Version::TWO,
        lock_time: LockTime::ZERO,
        input: inputs,
        output: outputs,
    };

    Ok(UnsignedBtcTx {
        tx,
        prevouts,
        fee_sat,
    })
}

/// Sign an unsigned P2WPKH transaction with the given private key.
///
/// All inputs must be locked to the key's P2WPKH script; a mismatch is a
/// signing error rather than an invalid transaction on the wire.
pub fn sign_transaction(
    unsigned_tx: &UnsignedBtcTx,
    private_key: &[u8; 32],
) -> Result<SignedBtcTx, BtcError> {
    let secp = Secp256k1::new();
    let secret_key = SecretKey::from_slice(private_key)
        .map_err(|e| BtcError::InvalidPrivateKey(format!("invalid secret key: {e}")))?;
    let public_key = bitcoin::secp256k1::PublicKey::from_secret_key(&secp, &secret_key);
    let compressed_pk = CompressedPublicKey(public_key);
    let script_code = ScriptBuf::new_p2wpkh(&compressed_pk.wpubkey_hash());

    if unsigned_tx.prevouts.len() != unsigned_tx.tx.input.len() {
        return Err(BtcError::SigningError(format!(
            "{} prevouts for {} inputs",
            unsigned_tx.prevouts.len(),
            unsigned_tx.tx.input.len()
        )));
    }

    let mut signed_tx = unsigned_tx.tx.clone();
    let mut sighash_cache = SighashCache::new(&unsigned_tx.tx);

    for (input_index, prevout) in unsigned_tx.prevouts.iter().enumerate() {
        if prevout.script_pubkey != script_code {
            return Err(BtcError::SigningError(format!(
                "input {input_index} is not locked to this key"
            )));
        }

        let sighash = sighash_cache
            .p2wpkh_signature_hash(input_index, &script_code, prevout.value, EcdsaSighashType::All)
            .map_err(|e| BtcError::SigningError(format!("sighash computation failed: {e}")))?;

        let msg = Message::from_digest(sighash.to_byte_array());
        let signature = secp.sign_ecdsa(&msg, &secret_key);

        // DER signature followed by the sighash type byte.
        let mut sig_bytes = signature.serialize_der().to_vec();
        sig_bytes.push(EcdsaSighashType::All as u8);

        let mut witness = Witness::new();
        witness.push(&sig_bytes);
        witness.push(public_key.serialize());

        signed_tx.input[input_index].witness = witness;
    }

    Ok(SignedBtcTx {
        raw_tx: bitcoin::consensus::serialize(&signed_tx),
        txid: signed_tx.compute_txid().to_string(),
        fee_sat: unsigned_tx.fee_sat,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::address::pubkey_to_p2wpkh_address;

    const RECIPIENT: &str = "bc1qw508d6qejxtdg4y5r3zarvary0c5xw7kv8f3t4";

    fn owner(key: [u8; 32], network: BtcNetwork) -> String {
        let secp = Secp256k1::new();
        let sk = SecretKey::from_slice(&key).unwrap();
        let pk = bitcoin::secp256k1::PublicKey::from_secret_key(&secp, &sk);
        pubkey_to_p2wpkh_address(&pk.serialize(), network).unwrap()
    }

    fn utxo(txid_char: char, value_sat: u64) -> Utxo {
        Utxo {
            txid: txid_char.to_string().repeat(64),
            vout: 0,
            value_sat,
            confirmed: true,
        }
    }

    #[test]
    fn single_input_with_change() {
        let from = owner([0xcd; 32], BtcNetwork::Mainnet);
        let unsigned = build_p2wpkh_transaction(
            &[utxo('a', 100_000)],
            &from,
            RECIPIENT,
            50_000,
            1,
            BtcNetwork::Mainnet,
        )
        .unwrap();

        assert_eq!(unsigned.tx.input.len(), 1);
        assert_eq!(unsigned.tx.output.len(), 2);
        assert_eq!(unsigned.tx.output[0].value.to_sat(), 50_000);
        assert_eq!(unsigned.tx.output[1].value.to_sat(), 100_000 - 50_000 - 140);
        assert_eq!(unsigned.fee_sat, 140);
        assert_eq!(unsigned.prevouts[0].script_pubkey, unsigned.tx.output[1].script_pubkey);
    }

    #[test]
    fn dust_change_goes_to_fee() {
        let from = owner([0xcd; 32], BtcNetwork::Mainnet);
        let unsigned = build_p2wpkh_transaction(
            &[utxo('b', 100_000)],
            &from,
            RECIPIENT,
            99_700,
            1,
            BtcNetwork::Mainnet,
        )
        .unwrap();

        assert_eq!(unsigned.tx.output.len(), 1);
        assert_eq!(unsigned.fee_sat, 300);
    }

    #[test]
    fn insufficient_funds() {
        let from = owner([0xcd; 32], BtcNetwork::Mainnet);
        let result = build_p2wpkh_transaction(
            &[utxo('c', 1_000)],
            &from,
            RECIPIENT,
            500_000,
            1,
            BtcNetwork::Mainnet,
        );
        assert!(matches!(result, Err(BtcError::InsufficientFunds { .. })));
    }

    #[test]
    fn rejects_bad_inputs() {
        let from = owner([0xcd; 32], BtcNetwork::Mainnet);
        let utxos = [utxo('d', 100_000)];

        let build = |to: &str, amount: u64, network: BtcNetwork| {
            build_p2wpkh_transaction(&utxos, &from, to, amount, 1, network)
        };

        assert!(build("not_a_valid_address", 50_000, BtcNetwork::Mainnet).is_err());
        assert!(build(RECIPIENT, 0, BtcNetwork::Mainnet).is_err());
        assert!(build(RECIPIENT, 500, BtcNetwork::Mainnet).is_err());
        // Mainnet recipient on testnet.
        assert!(build(RECIPIENT, 50_000, BtcNetwork::Testnet).is_err());
    }

    #[test]
    fn non_segwit_owner_is_unsupported() {
        let result = build_p2wpkh_transaction(
            &[utxo('e', 100_000)],
            "1A1zP1eP5QGefi2DMPTfTL5SLmv7DivfNa",
            RECIPIENT,
            50_000,
            1,
            BtcNetwork::Mainnet,
        );
        assert!(matches!(result, Err(BtcError::UnsupportedScheme(_))));
    }

    #[test]
    fn only_bip84_is_signable() {
        assert!(ensure_signable(AddressScheme::Bip84).is_ok());
        for scheme in [AddressScheme::Bip44, AddressScheme::Bip49, AddressScheme::Bip86] {
            assert!(matches!(ensure_signable(scheme), Err(BtcError::UnsupportedScheme(_))));
        }
    }

    #[test]
    fn build_and_sign_roundtrip_testnet() {
        let key = [0x42; 32];
        let from = owner(key, BtcNetwork::Testnet);

        let unsigned = build_p2wpkh_transaction(
            &[utxo('a', 200_000), utxo('c', 150_000)],
            &from,
            &from,
            300_000,
            2,
            BtcNetwork::Testnet,
        )
        .unwrap();
        assert_eq!(unsigned.tx.input.len(), 2);

        let signed = sign_transaction(&unsigned, &key).unwrap();
        assert!(signed.raw_tx.len() > 200);
        assert_eq!(signed.txid.len(), 64);
        assert_eq!(signed.raw_hex().len(), signed.raw_tx.len() * 2);

        let decoded: Transaction = bitcoin::consensus::deserialize(&signed.raw_tx).unwrap();
        assert_eq!(decoded.compute_txid().to_string(), signed.txid);
        for input in &decoded.input {
            assert_eq!(input.witness.len(), 2);
        }
    }

    #[test]
    fn signing_with_wrong_key_fails() {
        let from = owner([0x42; 32], BtcNetwork::Mainnet);
        let unsigned = build_p2wpkh_transaction(
            &[utxo('f', 100_000)],
            &from,
            RECIPIENT,
            50_000,
            1,
            BtcNetwork::Mainnet,
        )
        .unwrap();

        assert!(matches!(
            sign_transaction(&unsigned, &[0x43; 32]),
            Err(BtcError::SigningError(_))
        ));
        assert!(matches!(
            sign_transaction(&unsigned, &[0u8; 32]),
            Err(BtcError::InvalidPrivateKey(_))
        ));
    }
}
