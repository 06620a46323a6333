//! Ethereum/EVM chain support for the wallet engine.
//!
//! This crate provides:
//! - Ethereum address derivation from secp256k1 keys (with EIP-55 checksums)
//! - RLP items, legacy EIP-155 and EIP-1559 transaction signing and decoding
//! - ERC-20 and router calldata via a minimal ABI encoder
//! - Decimal/base-unit conversion
//! - A JSON-RPC client, gas price engine and broadcaster
//! - Configured EVM network definitions

pub mod abi;
pub mod address;
pub mod broadcast;
pub mod chains;
pub mod erc20;
pub mod error;
pub mod gas;
pub mod rlp;
pub mod rpc;
pub mod transaction;
pub mod units;

pub use alloy_primitives::U256;
pub use error::EthError;
