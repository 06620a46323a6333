use alloy_primitives::U256;

use crate::abi::{encode_function_call, AbiParam};
use crate::address::parse_address;
use crate::error::EthError;

/// Function selector for `transfer(address,uint256)`: `0xa9059cbb`.
pub const TRANSFER_SELECTOR: [u8; 4] = [0xa9, 0x05, 0x9c, 0xbb];

/// Function selector for `balanceOf(address)`: `0x70a08231`.
pub const BALANCE_OF_SELECTOR: [u8; 4] = [0x70, 0xa0, 0x82, 0x31];

/// Function selector for `approve(address,uint256)`: `0x095ea7b3`.
pub const APPROVE_SELECTOR: [u8; 4] = [0x09, 0x5e, 0xa7, 0xb3];

/// Function selector for `allowance(address,address)`: `0xdd62ed3e`.
pub const ALLOWANCE_SELECTOR: [u8; 4] = [0xdd, 0x62, 0xed, 0x3e];

/// Encodes an ERC-20 `transfer(address,uint256)` call.
///
/// Layout is `a9059cbb ‖ pad32(to) ‖ pad32(amount)`, 68 bytes total.
pub fn encode_transfer(to: &str, amount: U256) -> Result<Vec<u8>, EthError> {
    let addr = parse_address(to)?;
    let params = [AbiParam::Address(addr), AbiParam::Uint256(amount)];
    Ok(encode_function_call(TRANSFER_SELECTOR, &params))
}

/// Encodes an ERC-20 `balanceOf(address)` call.
pub fn encode_balance_of(owner: &str) -> Result<Vec<u8>, EthError> {
    let addr = parse_address(owner)?;
    Ok(encode_function_call(BALANCE_OF_SELECTOR, &[AbiParam::Address(addr)]))
}

/// Encodes an ERC-20 `approve(address,uint256)` call.
pub fn encode_approve(spender: &str, amount: U256) -> Result<Vec<u8>, EthError> {
    let addr = parse_address(spender)?;
    let params = [AbiParam::Address(addr), AbiParam::Uint256(amount)];
    Ok(encode_function_call(APPROVE_SELECTOR, &params))
}

/// Encodes an ERC-20 `allowance(address,address)` call.
pub fn encode_allowance(owner: &str, spender: &str) -> Result<Vec<u8>, EthError> {
    let owner = parse_address(owner)?;
    let spender = parse_address(spender)?;
    let params = [AbiParam::Address(owner), AbiParam::Address(spender)];
    Ok(encode_function_call(ALLOWANCE_SELECTOR, &params))
}
