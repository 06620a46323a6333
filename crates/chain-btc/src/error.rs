use thiserror::Error;

/// Bitcoin chain operation errors.
#[derive(Debug, Error)]
pub enum BtcError {
    #[error("invalid private key: {0}")]
    InvalidPrivateKey(String),

    #[error("invalid public key: {0}")]
    InvalidPublicKey(String),

    #[error("invalid address: {0}")]
    InvalidAddress(String),

    #[error("invalid amount: {0}")]
    InvalidAmount(String),

    #[error("transaction build error: {0}")]
    TransactionBuildError(String),

    #[error("signing error: {0}")]
    SigningError(String),

    #[error("invalid network: {0}")]
    InvalidNetwork(String),

    #[error("insufficient funds: have {available} sat, need {required} sat")]
    InsufficientFunds { available: u64, required: u64 },

    /// Transport failure or a non-2xx answer (carries the body text).
    #[error("network error: {0}")]
    Network(String),

    /// The server answered with something that does not parse.
    #[error("protocol error: {0}")]
    Protocol(String),

    #[error("unsupported address scheme for signing: {0}")]
    UnsupportedScheme(String),
}
