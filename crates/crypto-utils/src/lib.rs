//! # crypto-utils
//!
//! Secret-holding buffers and OS entropy shared by the wallet crates. Every
//! type here wipes its contents on drop so private keys and seeds only live
//! as long as the operation that needs them.

pub mod error;
pub mod random;
pub mod zeroizing;

pub use error::CryptoError;
pub use zeroizing::{SecretKeyBytes, ZeroizingBytes, ZeroizingString};
