use chain_btc::BtcError;
use chain_eth::EthError;
use crypto_utils::CryptoError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum WalletError {
    #[error("Invalid mnemonic: {0}")]
    InvalidMnemonic(String),

    #[error("Invalid private key: {0}")]
    InvalidPrivateKey(String),

    #[error("Invalid address: {0}")]
    InvalidAddress(String),

    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    #[error("Mnemonic generation failed: {0}")]
    GenerationFailed(String),

    #[error("Key derivation failed: {0}")]
    DerivationFailed(String),

    #[error("Signing failed: {0}")]
    SigningFailed(String),

    #[error("No private key available")]
    NoPrivateKey,

    #[error("Insufficient funds: have {available}, need {required}")]
    InsufficientFunds { available: u64, required: u64 },

    #[error("Insufficient liquidity for {0}")]
    InsufficientLiquidity(String),

    #[error("Invalid token pair: {0}")]
    InvalidTokenPair(String),

    #[error("Unsupported chain: {0}")]
    UnsupportedChain(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Failed to send transaction")]
    FailedToSendTransaction,

    #[error("Unexpected response: {0}")]
    Protocol(String),

    #[error("Unsupported: {0}")]
    Unsupported(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Credential store error: {0}")]
    Credential(String),
}

/// Coarse classification callers branch on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    Crypto,
    InsufficientFunds,
    InsufficientLiquidity,
    Network,
    Protocol,
    Unsupported,
    Config,
}

impl WalletError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            WalletError::InvalidMnemonic(_)
            | WalletError::InvalidPrivateKey(_)
            | WalletError::InvalidAddress(_)
            | WalletError::InvalidAmount(_)
            | WalletError::InvalidTokenPair(_) => ErrorKind::Validation,
            WalletError::GenerationFailed(_)
            | WalletError::DerivationFailed(_)
            | WalletError::SigningFailed(_)
            | WalletError::NoPrivateKey => ErrorKind::Crypto,
            WalletError::InsufficientFunds { .. } => ErrorKind::InsufficientFunds,
            WalletError::InsufficientLiquidity(_) => ErrorKind::InsufficientLiquidity,
            WalletError::Network(_) | WalletError::FailedToSendTransaction => ErrorKind::Network,
            WalletError::Protocol(_) => ErrorKind::Protocol,
            WalletError::Unsupported(_) | WalletError::UnsupportedChain(_) => {
                ErrorKind::Unsupported
            }
            WalletError::Config(_) | WalletError::Credential(_) => ErrorKind::Config,
        }
    }

    /// Whether the user can fix the input and try again. A missing key or a
    /// bad mnemonic ends the operation.
    pub fn is_recoverable(&self) -> bool {
        !matches!(
            self,
            WalletError::NoPrivateKey
                | WalletError::InvalidMnemonic(_)
                | WalletError::Credential(_)
                | WalletError::Config(_)
        )
    }
}

impl From<CryptoError> for WalletError {
    fn from(e: CryptoError) -> Self {
        match e {
            CryptoError::EntropyUnavailable(msg) => WalletError::GenerationFailed(msg),
            other => WalletError::InvalidPrivateKey(other.to_string()),
        }
    }
}

impl From<BtcError> for WalletError {
    fn from(e: BtcError) -> Self {
        match e {
            BtcError::InvalidPrivateKey(m) => WalletError::InvalidPrivateKey(m),
            BtcError::InvalidAddress(m) | BtcError::InvalidNetwork(m) => {
                WalletError::InvalidAddress(m)
            }
            BtcError::InvalidAmount(m) => WalletError::InvalidAmount(m),
            BtcError::InvalidPublicKey(m) => WalletError::DerivationFailed(m),
            BtcError::TransactionBuildError(m) | BtcError::SigningError(m) => {
                WalletError::SigningFailed(format!("BTC: {m}"))
            }
            BtcError::InsufficientFunds {
                available,
                required,
            } => WalletError::InsufficientFunds {
                available,
                required,
            },
            BtcError::Network(m) => WalletError::Network(m),
            BtcError::Protocol(m) => WalletError::Protocol(m),
            BtcError::UnsupportedScheme(scheme) => {
                WalletError::Unsupported(format!("signing for {scheme} accounts"))
            }
        }
    }
}

impl From<EthError> for WalletError {
    fn from(e: EthError) -> Self {
        match e {
            EthError::InvalidPrivateKey(m) => WalletError::InvalidPrivateKey(m),
            EthError::InvalidAddress(m) => WalletError::InvalidAddress(m),
            EthError::InvalidAmount(m) => WalletError::InvalidAmount(m),
            EthError::InvalidPublicKey(m) => WalletError::DerivationFailed(m),
            EthError::TransactionBuildError(m)
            | EthError::SigningError(m)
            | EthError::EncodingError(m) => WalletError::SigningFailed(format!("ETH: {m}")),
            EthError::Network(m) => WalletError::Network(m),
            EthError::Protocol(m) => WalletError::Protocol(m),
            EthError::FailedToSendTransaction => WalletError::FailedToSendTransaction,
            EthError::UnsupportedChain(id) => WalletError::UnsupportedChain(id.to_string()),
        }
    }
}
