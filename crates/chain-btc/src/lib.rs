//! Bitcoin chain support for the wallet engine.
//!
//! Provides BIP44/49/84/86 address encodings, the UTXO model with
//! largest-first coin selection, fee estimation, an Esplora REST client, and
//! P2WPKH transaction building and signing.

pub mod address;
pub mod amount;
pub mod balance;
pub mod error;
pub mod esplora;
pub mod fee;
pub mod network;
pub mod transaction;
pub mod utxo;

pub use address::AddressScheme;
pub use error::BtcError;
pub use network::BtcNetwork;
