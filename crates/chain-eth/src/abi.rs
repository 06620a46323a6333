//! Minimal ABI encoding for EVM function calls.
//!
//! Covers the static word types plus `address[]`, which is all the ERC-20
//! and Uniswap-V2 router calls used by the wallet need.

use alloy_primitives::U256;

use crate::error::EthError;

/// A single ABI-encoded parameter.
#[derive(Debug, Clone)]
pub enum AbiParam {
    /// A 20-byte Ethereum address, left-padded to 32 bytes.
    Address([u8; 20]),
    /// A 256-bit unsigned integer, big-endian.
    Uint256(U256),
    /// Dynamic `address[]`: a head offset word, then length and elements in the tail.
    AddressArray(Vec<[u8; 20]>),
}

impl AbiParam {
    fn is_dynamic(&self) -> bool {
        matches!(self, AbiParam::AddressArray(_))
    }
}

/// Encodes a function call with the given 4-byte selector and ABI parameters.
///
/// Static parameters are written inline in the head. Dynamic parameters put
/// the byte offset of their tail data (measured from the start of the
/// arguments, after the selector) in the head.
pub fn encode_function_call(selector: [u8; 4], params: &[AbiParam]) -> Vec<u8> {
    let head_len = params.len() * 32;
    let mut head = Vec::with_capacity(head_len);
    let mut tail = Vec::new();

    for param in params {
        if param.is_dynamic() {
            let offset = U256::from(head_len + tail.len());
            head.extend_from_slice(&offset.to_be_bytes::<32>());
            tail.extend_from_slice(&encode_tail(param));
        } else {
            head.extend_from_slice(&encode_word(param));
        }
    }

    let mut data = Vec::with_capacity(4 + head.len() + tail.len());
    data.extend_from_slice(&selector);
    data.extend_from_slice(&head);
    data.extend_from_slice(&tail);
    data
}

fn address_word(addr: &[u8; 20]) -> [u8; 32] {
    let mut word = [0u8; 32];
    word[12..].copy_from_slice(addr);
    word
}

/// Encodes a static [`AbiParam`] as a single 32-byte word.
fn encode_word(param: &AbiParam) -> [u8; 32] {
    match param {
        AbiParam::Address(addr) => address_word(addr),
        AbiParam::Uint256(value) => value.to_be_bytes::<32>(),
        AbiParam::AddressArray(_) => [0u8; 32],
    }
}

fn encode_tail(param: &AbiParam) -> Vec<u8> {
    match param {
        AbiParam::AddressArray(addrs) => {
            let mut out = Vec::with_capacity(32 * (addrs.len() + 1));
            out.extend_from_slice(&U256::from(addrs.len()).to_be_bytes::<32>());
            for addr in addrs {
                out.extend_from_slice(&address_word(addr));
            }
            out
        }
        _ => Vec::new(),
    }
}

/// Decodes a single uint256 return value from ABI-encoded data.
///
/// Used for `balanceOf` / `allowance` results, which return one word.
pub fn decode_uint256(data: &[u8]) -> Result<U256, EthError> {
    if data.len() < 32 {
        return Err(EthError::EncodingError(format!(
            "expected at least 32 bytes for uint256, got {}",
            data.len()
        )));
    }

    Ok(U256::from_be_slice(&data[..32]))
}
