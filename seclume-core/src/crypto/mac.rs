use hmac::{Hmac, Mac};
use sha2::Sha256;
use subtle::ConstantTimeEq;

use crate::crypto::aead::KEY_SIZE;
use crate::error::{Result, SlmError};

pub const HMAC_SIZE: usize = 32;

type HmacSha256 = Hmac<Sha256>;

/// HMAC-SHA256 over `data` with a 32-byte key.
pub fn compute(key: &[u8; KEY_SIZE], data: &[u8]) -> Result<[u8; HMAC_SIZE]> {
    let mut mac = HmacSha256::new_from_slice(key)
        .map_err(|_| SlmError::Crypto("HMAC key rejected".into()))?;
    mac.update(data);
    Ok(mac.finalize().into_bytes().into())
}

/// Constant-time comparison against an expected MAC.
pub fn verify(key: &[u8; KEY_SIZE], data: &[u8], expected: &[u8; HMAC_SIZE]) -> Result<bool> {
    let computed = compute(key, data)?;
    Ok(computed.as_slice().ct_eq(expected.as_slice()).into())
}
