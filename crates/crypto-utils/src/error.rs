use thiserror::Error;

/// Errors raised while handling key material or drawing entropy.
#[derive(Debug, Error)]
pub enum CryptoError {
    #[error("entropy source unavailable: {0}")]
    EntropyUnavailable(String),

    #[error("invalid key length: expected {expected} bytes, got {actual}")]
    InvalidKeyLength { expected: usize, actual: usize },

    #[error("invalid hex: {0}")]
    InvalidHex(String),
}
