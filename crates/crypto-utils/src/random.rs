use rand_core::{OsRng, RngCore};

use crate::error::CryptoError;

/// Fills `buf` from the operating system CSPRNG.
///
/// Unlike `fill_bytes`, a failing entropy source is reported instead of
/// panicking, so mnemonic generation can surface it as a typed error.
pub fn fill_entropy(buf: &mut [u8]) -> Result<(), CryptoError> {
    OsRng
        .try_fill_bytes(buf)
        .map_err(|e| CryptoError::EntropyUnavailable(e.to_string()))
}
