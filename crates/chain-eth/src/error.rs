use thiserror::Error;

/// Ethereum chain operation errors.
#[derive(Debug, Error)]
pub enum EthError {
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

    #[error("encoding error: {0}")]
    EncodingError(String),

    /// Transport failure or a JSON-RPC `error.message`.
    #[error("network error: {0}")]
    Network(String),

    /// The node answered, but not in the shape the method promises.
    #[error("protocol error: {0}")]
    Protocol(String),

    /// `eth_sendRawTransaction` returned neither a result nor an error.
    #[error("failed to send transaction")]
    FailedToSendTransaction,

    #[error("unsupported chain: {0}")]
    UnsupportedChain(u64),
}
