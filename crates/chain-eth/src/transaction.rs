use alloy_primitives::{Address, Bytes, U256};
use alloy_rlp::{Encodable, RlpEncodable};
use k256::ecdsa::signature::hazmat::PrehashSigner;
use k256::ecdsa::{RecoveryId, Signature, SigningKey, VerifyingKey};
use sha3::{Digest, Keccak256};
use zeroize::Zeroize;

use crate::address::{parse_address, pubkey_to_eth_address};
use crate::erc20;
use crate::error::EthError;
use crate::rlp::RlpItem;

/// An unsigned legacy (pre-typed) transaction, signed with EIP-155 replay
/// protection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LegacyTransaction {
    pub nonce: u64,
    pub gas_price: u128,
    pub gas_limit: u64,
    pub to: Address,
    pub value: U256,
    pub data: Vec<u8>,
    pub chain_id: u64,
}

/// An unsigned EIP-1559 (type 2) transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Eip1559Transaction {
    pub chain_id: u64,
    pub nonce: u64,
    pub max_priority_fee_per_gas: u128,
    pub max_fee_per_gas: u128,
    pub gas_limit: u64,
    pub to: Address,
    pub value: U256,
    pub data: Vec<u8>,
}

/// A signed transaction ready for `eth_sendRawTransaction`. Single use.
#[derive(Debug, Clone)]
pub struct SignedTransaction {
    /// Raw bytes (legacy RLP list, or `0x02 || rlp` for type 2).
    pub raw_tx: Vec<u8>,
    /// Keccak-256 of `raw_tx`, `0x`-prefixed.
    pub tx_hash: String,
    /// EIP-155 `v` for legacy, y-parity for type 2.
    pub v: u64,
    pub r: U256,
    pub s: U256,
}

impl SignedTransaction {
    /// `0x`-prefixed hex of the raw transaction.
    pub fn raw_hex(&self) -> String {
        format!("0x{}", hex::encode(&self.raw_tx))
    }
}

/// A decoded signed legacy transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedLegacyTransaction {
    pub tx: LegacyTransaction,
    pub v: u64,
    pub r: U256,
    pub s: U256,
}

fn to_address(to: &str) -> Result<Address, EthError> {
    Ok(Address::from(parse_address(to)?))
}

/// Builds an unsigned native-coin transfer.
pub fn build_transfer(
    chain_id: u64,
    nonce: u64,
    to: &str,
    value_wei: U256,
    gas_price: u128,
    gas_limit: u64,
) -> Result<LegacyTransaction, EthError> {
    Ok(LegacyTransaction {
        nonce,
        gas_price,
        gas_limit,
        to: to_address(to)?,
        value: value_wei,
        data: Vec::new(),
        chain_id,
    })
}

/// Builds an unsigned ERC-20 `transfer(address,uint256)` call to `token_contract`.
pub fn build_erc20_transfer(
    chain_id: u64,
    nonce: u64,
    token_contract: &str,
    to: &str,
    amount: U256,
    gas_price: u128,
    gas_limit: u64,
) -> Result<LegacyTransaction, EthError> {
    let contract = to_address(token_contract)?;
    let calldata = erc20::encode_transfer(to, amount)?;

    Ok(LegacyTransaction {
        nonce,
        gas_price,
        gas_limit,
        to: contract,
        value: U256::ZERO,
        data: calldata,
        chain_id,
    })
}

/// Builds an unsigned call carrying arbitrary calldata (router swaps, approvals).
pub fn build_contract_call(
    chain_id: u64,
    nonce: u64,
    contract: &str,
    value_wei: U256,
    data: Vec<u8>,
    gas_price: u128,
    gas_limit: u64,
) -> Result<LegacyTransaction, EthError> {
    Ok(LegacyTransaction {
        nonce,
        gas_price,
        gas_limit,
        to: to_address(contract)?,
        value: value_wei,
        data,
        chain_id,
    })
}

impl LegacyTransaction {
    /// Re-targets the same call at an EIP-1559 fee market.
    pub fn into_eip1559(
        self,
        max_priority_fee_per_gas: u128,
        max_fee_per_gas: u128,
    ) -> Eip1559Transaction {
        Eip1559Transaction {
            chain_id: self.chain_id,
            nonce: self.nonce,
            max_priority_fee_per_gas,
            max_fee_per_gas,
            gas_limit: self.gas_limit,
            to: self.to,
            value: self.value,
            data: self.data,
        }
    }
}

/// RLP of `[nonce, gasPrice, gasLimit, to, value, data, chainId, "", ""]`,
/// the EIP-155 signing payload.
pub fn encode_legacy_signing_payload(tx: &LegacyTransaction) -> Vec<u8> {
    let fields = LegacySigningFields {
        nonce: tx.nonce,
        gas_price: tx.gas_price,
        gas_limit: tx.gas_limit,
        to: tx.to,
        value: tx.value,
        data: Bytes::copy_from_slice(&tx.data),
        chain_id: tx.chain_id,
        empty_r: 0,
        empty_s: 0,
    };

    let mut out = Vec::with_capacity(fields.length());
    fields.encode(&mut out);
    out
}

/// Signs a legacy transaction with EIP-155 replay protection.
///
/// 1. RLP-encode `[nonce, gasPrice, gasLimit, to, value, data, chainId, "", ""]`.
/// 2. Keccak-256 the encoding.
/// 3. Sign the hash (RFC 6979 nonce, low-s) to get `(r, s, recId)`.
/// 4. `v = chainId * 2 + 35 + recId`.
/// 5. RLP-encode `[nonce, gasPrice, gasLimit, to, value, data, v, r, s]`.
pub fn sign_legacy_transaction(
    tx: &LegacyTransaction,
    private_key: &[u8; 32],
) -> Result<SignedTransaction, EthError> {
    let payload = encode_legacy_signing_payload(tx);
    let msg_hash = Keccak256::digest(&payload);

    let (r, s, rec_id) = sign_hash(msg_hash.as_slice(), private_key)?;

    let v = tx
        .chain_id
        .checked_mul(2)
        .and_then(|x| x.checked_add(35 + u64::from(rec_id)))
        .ok_or_else(|| EthError::TransactionBuildError("chain id too large for EIP-155".into()))?;

    let signed = LegacySignedFields {
        nonce: tx.nonce,
        gas_price: tx.gas_price,
        gas_limit: tx.gas_limit,
        to: tx.to,
        value: tx.value,
        data: Bytes::copy_from_slice(&tx.data),
        v,
        r,
        s,
    };

    let mut raw_tx = Vec::with_capacity(signed.length());
    signed.encode(&mut raw_tx);

    Ok(SignedTransaction {
        tx_hash: tx_hash(&raw_tx),
        raw_tx,
        v,
        r,
        s,
    })
}

/// Encodes the unsigned EIP-1559 transaction as `0x02 || rlp(fields)`.
///
/// The RLP-encoded fields are:
/// `[chain_id, nonce, max_priority_fee_per_gas, max_fee_per_gas, gas_limit, to,
///   value, data, access_list]`
pub fn encode_eip1559_signing_payload(tx: &Eip1559Transaction) -> Vec<u8> {
    let fields = Eip1559UnsignedFields {
        chain_id: tx.chain_id,
        nonce: tx.nonce,
        max_priority_fee_per_gas: tx.max_priority_fee_per_gas,
        max_fee_per_gas: tx.max_fee_per_gas,
        gas_limit: tx.gas_limit,
        to: tx.to,
        value: tx.value,
        data: Bytes::copy_from_slice(&tx.data),
        access_list: Vec::new(),
    };

    let mut payload = Vec::with_capacity(1 + fields.length());
    payload.push(0x02);
    fields.encode(&mut payload);
    payload
}

/// Signs an EIP-1559 transaction; `v` in the result is the y-parity.
pub fn sign_eip1559_transaction(
    tx: &Eip1559Transaction,
    private_key: &[u8; 32],
) -> Result<SignedTransaction, EthError> {
    let payload = encode_eip1559_signing_payload(tx);
    let msg_hash = Keccak256::digest(&payload);

    let (r, s, y_parity) = sign_hash(msg_hash.as_slice(), private_key)?;

    let signed = Eip1559SignedFields {
        chain_id: tx.chain_id,
        nonce: tx.nonce,
        max_priority_fee_per_gas: tx.max_priority_fee_per_gas,
        max_fee_per_gas: tx.max_fee_per_gas,
        gas_limit: tx.gas_limit,
        to: tx.to,
        value: tx.value,
        data: Bytes::copy_from_slice(&tx.data),
        access_list: Vec::new(),
        signature_y_parity: y_parity,
        signature_r: r,
        signature_s: s,
    };

    let mut raw_tx = Vec::with_capacity(1 + signed.length());
    raw_tx.push(0x02);
    signed.encode(&mut raw_tx);

    Ok(SignedTransaction {
        tx_hash: tx_hash(&raw_tx),
        raw_tx,
        v: u64::from(y_parity),
        r,
        s,
    })
}

/// Decodes a raw signed legacy transaction.
///
/// `v` of 27/28 (no replay protection) decodes with `chain_id = 0`.
pub fn decode_signed_legacy(raw: &[u8]) -> Result<DecodedLegacyTransaction, EthError> {
    let item = RlpItem::decode(raw)?;
    let fields = item.as_list()?;
    if fields.len() != 9 {
        return Err(EthError::EncodingError(format!(
            "legacy transaction has 9 fields, got {}",
            fields.len()
        )));
    }

    let to_bytes = fields[3].as_bytes()?;
    if to_bytes.len() != 20 {
        return Err(EthError::EncodingError(format!(
            "expected 20-byte recipient, got {}",
            to_bytes.len()
        )));
    }

    let v = item_u64(&fields[6])?;
    let chain_id = if v >= 35 { (v - 35) / 2 } else { 0 };

    Ok(DecodedLegacyTransaction {
        tx: LegacyTransaction {
            nonce: item_u64(&fields[0])?,
            gas_price: fields[1].as_u128()?,
            gas_limit: item_u64(&fields[2])?,
            to: Address::from_slice(to_bytes),
            value: item_u256(&fields[4])?,
            data: fields[5].as_bytes()?.to_vec(),
            chain_id,
        },
        v,
        r: item_u256(&fields[7])?,
        s: item_u256(&fields[8])?,
    })
}

/// Recovers the lowercase sender address of a raw signed legacy transaction.
pub fn recover_legacy_sender(raw: &[u8]) -> Result<String, EthError> {
    let decoded = decode_signed_legacy(raw)?;

    let (msg_hash, rec_byte) = if decoded.v >= 35 {
        let payload = encode_legacy_signing_payload(&decoded.tx);
        (Keccak256::digest(&payload), ((decoded.v - 35) % 2) as u8)
    } else if decoded.v == 27 || decoded.v == 28 {
        let unprotected = UnprotectedSigningFields {
            nonce: decoded.tx.nonce,
            gas_price: decoded.tx.gas_price,
            gas_limit: decoded.tx.gas_limit,
            to: decoded.tx.to,
            value: decoded.tx.value,
            data: Bytes::copy_from_slice(&decoded.tx.data),
        };
        let mut payload = Vec::new();
        unprotected.encode(&mut payload);
        (Keccak256::digest(&payload), (decoded.v - 27) as u8)
    } else {
        return Err(EthError::SigningError(format!("invalid v value {}", decoded.v)));
    };

    let signature = Signature::from_scalars(
        decoded.r.to_be_bytes::<32>(),
        decoded.s.to_be_bytes::<32>(),
    )
    .map_err(|e| EthError::SigningError(e.to_string()))?;

    let recovery_id = RecoveryId::from_byte(rec_byte)
        .ok_or_else(|| EthError::SigningError("invalid recovery id".into()))?;

    let key = VerifyingKey::recover_from_prehash(msg_hash.as_slice(), &signature, recovery_id)
        .map_err(|e| EthError::SigningError(e.to_string()))?;

    let point = key.to_encoded_point(false);
    let key_65: [u8; 65] = point
        .as_bytes()
        .try_into()
        .map_err(|_| EthError::InvalidPublicKey("unexpected uncompressed length".into()))?;

    pubkey_to_eth_address(&key_65)
}

/// Keccak-256 of raw transaction bytes, `0x`-prefixed.
pub fn tx_hash(raw_tx: &[u8]) -> String {
    format!("0x{}", hex::encode(Keccak256::digest(raw_tx)))
}

/// Signs a 32-byte prehash, returning `(r, s, y_parity)`.
fn sign_hash(msg_hash: &[u8], private_key: &[u8; 32]) -> Result<(U256, U256, u8), EthError> {
    let mut key_bytes = *private_key;
    let signing_key = SigningKey::from_bytes((&key_bytes).into())
        .map_err(|e| EthError::InvalidPrivateKey(e.to_string()));
    key_bytes.zeroize();
    let signing_key = signing_key?;

    let (signature, recovery_id): (Signature, RecoveryId) = signing_key
        .sign_prehash(msg_hash)
        .map_err(|e| EthError::SigningError(e.to_string()))?;

    let r = U256::from_be_slice(&signature.r().to_bytes());
    let s = U256::from_be_slice(&signature.s().to_bytes());

    Ok((r, s, recovery_id.is_y_odd() as u8))
}

fn item_u64(item: &RlpItem) -> Result<u64, EthError> {
    let value = item.as_u128()?;
    u64::try_from(value).map_err(|_| EthError::EncodingError(format!("{value} exceeds u64")))
}

fn item_u256(item: &RlpItem) -> Result<U256, EthError> {
    let bytes = item.as_bytes()?;
    if bytes.len() > 32 {
        return Err(EthError::EncodingError(format!(
            "integer of {} bytes does not fit in uint256",
            bytes.len()
        )));
    }
    if bytes.first() == Some(&0) {
        return Err(EthError::EncodingError("integer has leading zero".into()));
    }
    Ok(U256::from_be_slice(bytes))
}

// ---------------------------------------------------------------------------
// RLP-encodable structures
// ---------------------------------------------------------------------------

/// EIP-155 signing payload. The two trailing zero integers encode as 0x80.
#[derive(RlpEncodable)]
struct LegacySigningFields {
    nonce: u64,
    gas_price: u128,
    gas_limit: u64,
    to: Address,
    value: U256,
    data: Bytes,
    chain_id: u64,
    empty_r: u8,
    empty_s: u8,
}

/// Pre-EIP-155 signing payload, only used when recovering v=27/28 senders.
#[derive(RlpEncodable)]
struct UnprotectedSigningFields {
    nonce: u64,
    gas_price: u128,
    gas_limit: u64,
    to: Address,
    value: U256,
    data: Bytes,
}

#[derive(RlpEncodable)]
struct LegacySignedFields {
    nonce: u64,
    gas_price: u128,
    gas_limit: u64,
    to: Address,
    value: U256,
    data: Bytes,
    v: u64,
    r: U256,
    s: U256,
}

#[derive(RlpEncodable)]
struct Eip1559UnsignedFields {
    chain_id: u64,
    nonce: u64,
    max_priority_fee_per_gas: u128,
    max_fee_per_gas: u128,
    gas_limit: u64,
    to: Address,
    value: U256,
    data: Bytes,
    access_list: Vec<AccessListItem>,
}

#[derive(RlpEncodable)]
struct Eip1559SignedFields {
    chain_id: u64,
    nonce: u64,
    max_priority_fee_per_gas: u128,
    max_fee_per_gas: u128,
    gas_limit: u64,
    to: Address,
    value: U256,
    data: Bytes,
    access_list: Vec<AccessListItem>,
    signature_y_parity: u8,
    signature_r: U256,
    signature_s: U256,
}

/// An EIP-2930 access list entry (always empty here).
#[derive(Debug, Clone, RlpEncodable)]
struct AccessListItem {
    address: Address,
    storage_keys: Vec<alloy_primitives::B256>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::address::private_key_to_address;
    use crate::units::{ETHER, GWEI};

    /// Well-known test private key (DO NOT use on mainnet).
    const TEST_PRIVKEY: [u8; 32] = {
        let mut key = [0u8; 32];
        key[31] = 1;
        key
    };

    const TEST_ADDRESS: &str = "0x000000000000000000000000000000000000dEaD";

    fn one_address() -> String {
        format!("0x{}01", "00".repeat(19))
    }

    #[test]
    fn unsigned_payload_matches_pinned_fixture() {
        let tx = build_transfer(1, 5, &one_address(), U256::from(ETHER), 20 * GWEI, 21_000)
            .unwrap();

        let expected = format!(
            "ec058504a817c80082520894{}01880de0b6b3a764000080018080",
            "00".repeat(19)
        );
        assert_eq!(hex::encode(encode_legacy_signing_payload(&tx)), expected);
    }

    #[test]
    fn eip155_reference_vector() {
        // The worked example from EIP-155.
        let to = "0x3535353535353535353535353535353535353535";
        let tx = build_transfer(1, 9, to, U256::from(ETHER), 20 * GWEI, 21_000).unwrap();

        assert_eq!(
            hex::encode(encode_legacy_signing_payload(&tx)),
            "ec098504a817c800825208943535353535353535353535353535353535353535880de0b6b3a764000080018080"
        );

        let signed = sign_legacy_transaction(&tx, &[0x46; 32]).unwrap();
        assert_eq!(signed.v, 37);
        assert_eq!(
            hex::encode(&signed.raw_tx),
            concat!(
                "f86c098504a817c800825208943535353535353535353535353535353535353535",
                "880de0b6b3a76400008025",
                "a028ef61340bd939bc2195fe537567866003e1a15d3c71ff63e1590620aa636276",
                "a067cbe9d8997f761aecb703304b3800ccf555c9f3dc64214b297fb1966a3b6d83"
            )
        );
    }

    #[test]
    fn v_follows_chain_id_formula() {
        for chain_id in [1u64, 56, 137, 42161] {
            let tx = build_transfer(chain_id, 0, TEST_ADDRESS, U256::ZERO, GWEI, 21_000).unwrap();
            let signed = sign_legacy_transaction(&tx, &TEST_PRIVKEY).unwrap();
            let base = chain_id * 2 + 35;
            assert!(signed.v == base || signed.v == base + 1, "v={} chain={}", signed.v, chain_id);
        }
    }

    #[test]
    fn signed_legacy_decodes_and_recovers_sender() {
        let tx = build_erc20_transfer(
            137,
            42,
            "0xA0b86991c6218b36c1d19D4a2e9Eb0cE3606eB48",
            TEST_ADDRESS,
            U256::from(1_000_000u64),
            30 * GWEI,
            65_000,
        )
        .unwrap();

        let signed = sign_legacy_transaction(&tx, &TEST_PRIVKEY).unwrap();
        let decoded = decode_signed_legacy(&signed.raw_tx).unwrap();

        assert_eq!(decoded.tx, tx);
        assert_eq!(decoded.v, signed.v);
        assert_eq!(decoded.r, signed.r);
        assert_eq!(decoded.s, signed.s);

        assert_eq!(
            recover_legacy_sender(&signed.raw_tx).unwrap(),
            private_key_to_address(&TEST_PRIVKEY).unwrap()
        );
    }

    #[test]
    fn signing_is_deterministic_and_hash_matches_raw() {
        let tx = build_transfer(1, 0, TEST_ADDRESS, U256::from(1u8), GWEI, 21_000).unwrap();

        let a = sign_legacy_transaction(&tx, &TEST_PRIVKEY).unwrap();
        let b = sign_legacy_transaction(&tx, &TEST_PRIVKEY).unwrap();

        assert_eq!(a.raw_tx, b.raw_tx);
        assert_eq!(a.tx_hash, tx_hash(&a.raw_tx));
        assert_eq!(a.tx_hash.len(), 66);
        assert!(a.raw_hex().starts_with("0x"));
    }

    #[test]
    fn different_nonces_differ() {
        let tx1 = build_transfer(1, 0, TEST_ADDRESS, U256::ZERO, 100, 21_000).unwrap();
        let tx2 = build_transfer(1, 1, TEST_ADDRESS, U256::ZERO, 100, 21_000).unwrap();

        let s1 = sign_legacy_transaction(&tx1, &TEST_PRIVKEY).unwrap();
        let s2 = sign_legacy_transaction(&tx2, &TEST_PRIVKEY).unwrap();
        assert_ne!(s1.tx_hash, s2.tx_hash);
    }

    #[test]
    fn invalid_private_key_rejected() {
        let tx = build_transfer(1, 0, TEST_ADDRESS, U256::ZERO, 0, 21_000).unwrap();
        assert!(matches!(
            sign_legacy_transaction(&tx, &[0u8; 32]),
            Err(EthError::InvalidPrivateKey(_))
        ));
    }

    #[test]
    fn builders_reject_bad_addresses() {
        assert!(build_transfer(1, 0, "bad-address", U256::ZERO, 0, 21_000).is_err());
        assert!(build_transfer(1, 0, "0x1234", U256::ZERO, 0, 21_000).is_err());
        assert!(build_erc20_transfer(1, 0, "nope", TEST_ADDRESS, U256::ZERO, 0, 65_000).is_err());
        assert!(build_erc20_transfer(1, 0, TEST_ADDRESS, "bad", U256::ZERO, 0, 65_000).is_err());
        assert!(build_contract_call(1, 0, "0x", U256::ZERO, vec![], 0, 200_000).is_err());
    }

    #[test]
    fn erc20_transfer_carries_calldata_and_zero_value() {
        let tx = build_erc20_transfer(
            1,
            5,
            "0xA0b86991c6218b36c1d19D4a2e9Eb0cE3606eB48",
            TEST_ADDRESS,
            U256::from(100u8),
            GWEI,
            65_000,
        )
        .unwrap();

        assert_eq!(tx.value, U256::ZERO);
        assert_eq!(tx.data.len(), 68);
        assert_eq!(&tx.data[..4], &[0xa9, 0x05, 0x9c, 0xbb]);
    }

    #[test]
    fn eip1559_payload_starts_with_type_byte() {
        let tx = build_transfer(1, 0, TEST_ADDRESS, U256::ZERO, 0, 21_000)
            .unwrap()
            .into_eip1559(2 * GWEI, 50 * GWEI);

        let payload = encode_eip1559_signing_payload(&tx);
        assert_eq!(payload[0], 0x02);

        let signed = sign_eip1559_transaction(&tx, &TEST_PRIVKEY).unwrap();
        assert_eq!(signed.raw_tx[0], 0x02);
        assert!(signed.v <= 1);
        assert_eq!(signed.tx_hash, tx_hash(&signed.raw_tx));
    }

    #[test]
    fn eip1559_different_chains_differ() {
        let base = build_transfer(1, 0, TEST_ADDRESS, U256::ZERO, 0, 21_000).unwrap();
        let mut other = base.clone();
        other.chain_id = 137;

        let s1 = sign_eip1559_transaction(&base.into_eip1559(100, 200), &TEST_PRIVKEY).unwrap();
        let s2 = sign_eip1559_transaction(&other.into_eip1559(100, 200), &TEST_PRIVKEY).unwrap();
        assert_ne!(s1.raw_tx, s2.raw_tx);
    }

    #[test]
    fn decode_rejects_wrong_shape() {
        let not_list = RlpItem::Bytes(vec![1, 2, 3]).encode();
        assert!(decode_signed_legacy(&not_list).is_err());

        let short = RlpItem::List(vec![RlpItem::uint(1); 6]).encode();
        assert!(decode_signed_legacy(&short).is_err());
    }
}
