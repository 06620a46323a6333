//! Multi-chain wallet transaction engine.
//!
//! Keys come from a BIP-39 seed or a raw private key supplied through a
//! [`CredentialStore`]. EVM sends go through [`EvmService`], Bitcoin through
//! [`BitcoinService`], and router swaps through [`SwapQuoteEngine`].
//! [`WalletEngine`] wires them up from an [`EngineConfig`].

pub mod address;
pub mod btc_service;
pub mod config;
pub mod credentials;
pub mod engine;
pub mod error;
pub mod evm_service;
pub mod hd_derivation;
pub mod logging;
pub mod mnemonic;
pub mod swap;
pub mod types;

pub use address::{
    derive_address, derive_ethereum_address, normalize_private_key, validate_address,
};
pub use btc_service::{BitcoinService, BtcSendReceipt};
pub use config::{BitcoinConfig, EngineConfig};
pub use credentials::{load_signing_key, CredentialStore, StaticCredentials};
pub use engine::WalletEngine;
pub use error::{ErrorKind, WalletError};
pub use evm_service::{AccountLocks, EvmService, SendReceipt};
pub use hd_derivation::DerivedKey;
pub use logging::{LogFormat, LoggingConfig};
pub use mnemonic::{
    generate_mnemonic, is_valid_mnemonic, normalize_mnemonic, MnemonicPhrase, SeedWallet,
};
pub use swap::{PriceSource, StaticPrices, SwapQuote, SwapQuoteEngine, Token};
pub use types::{next_account_index, BlockchainType, Chain, ChainAccount, DerivationScheme};

pub use chain_btc::{AddressScheme, BtcNetwork};
pub use chain_eth::gas::{GasPrice, GasPriceEstimate, GasWarning};
