use crate::error::{Result, SlmError};

/// Fill `buf` from the OS CSPRNG. Fails closed; there is no fallback source.
pub fn fill(buf: &mut [u8]) -> Result<()> {
    getrandom::getrandom(buf).map_err(|e| SlmError::Crypto(format!("CSPRNG failure: {e}")))
}
