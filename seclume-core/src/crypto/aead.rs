use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::{Aes256Gcm, Key, Nonce};

use crate::crypto::random;
use crate::error::{Result, SlmError};

pub const KEY_SIZE: usize = 32;
pub const NONCE_SIZE: usize = 12;
pub const TAG_SIZE: usize = 16;

/// Draw a fresh random 96-bit nonce. Every sealed blob in an archive gets its
/// own; nonce reuse under one key breaks GCM.
pub fn fresh_nonce() -> Result<[u8; NONCE_SIZE]> {
    let mut nonce = [0u8; NONCE_SIZE];
    random::fill(&mut nonce)?;
    Ok(nonce)
}

/// AES-256-GCM seal. Returns ciphertext and detached 128-bit tag.
/// The v4..v6 wire format carries no associated data.
pub fn seal(
    key: &[u8; KEY_SIZE],
    nonce: &[u8; NONCE_SIZE],
    plaintext: &[u8],
) -> Result<(Vec<u8>, [u8; TAG_SIZE])> {
    let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(key));
    let mut sealed = cipher
        .encrypt(Nonce::from_slice(nonce), plaintext)
        .map_err(|_| SlmError::Crypto("AES-GCM seal failed".into()))?;
    let tag_at = sealed.len() - TAG_SIZE;
    let mut tag = [0u8; TAG_SIZE];
    tag.copy_from_slice(&sealed[tag_at..]);
    sealed.truncate(tag_at);
    Ok((sealed, tag))
}

/// AES-256-GCM open. Tag verification is constant-time inside the cipher and
/// fails closed: no plaintext is returned on mismatch.
pub fn open(
    key: &[u8; KEY_SIZE],
    nonce: &[u8; NONCE_SIZE],
    ciphertext: &[u8],
    tag: &[u8; TAG_SIZE],
) -> Result<Vec<u8>> {
    let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(key));
    let mut sealed = Vec::with_capacity(ciphertext.len() + TAG_SIZE);
    sealed.extend_from_slice(ciphertext);
    sealed.extend_from_slice(tag);
    cipher
        .decrypt(Nonce::from_slice(nonce), sealed.as_slice())
        .map_err(|_| SlmError::Auth)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seal_open_round_trip() {
        let key = [7u8; KEY_SIZE];
        let nonce = fresh_nonce().unwrap();
        let (ct, tag) = seal(&key, &nonce, b"attack at dawn").unwrap();
        assert_eq!(ct.len(), 14);
        let pt = open(&key, &nonce, &ct, &tag).unwrap();
        assert_eq!(pt, b"attack at dawn");
    }

    #[test]
    fn tampered_ciphertext_fails() {
        let key = [7u8; KEY_SIZE];
        let nonce = [1u8; NONCE_SIZE];
        let (mut ct, tag) = seal(&key, &nonce, b"payload").unwrap();
        ct[0] ^= 0x01;
        assert!(matches!(
            open(&key, &nonce, &ct, &tag),
            Err(crate::error::SlmError::Auth)
        ));
    }

    #[test]
    fn tampered_tag_fails() {
        let key = [7u8; KEY_SIZE];
        let nonce = [1u8; NONCE_SIZE];
        let (ct, mut tag) = seal(&key, &nonce, b"payload").unwrap();
        tag[15] ^= 0x80;
        assert!(open(&key, &nonce, &ct, &tag).is_err());
    }

    #[test]
    fn wrong_nonce_fails() {
        let key = [7u8; KEY_SIZE];
        let (ct, tag) = seal(&key, &[1u8; NONCE_SIZE], b"payload").unwrap();
        assert!(open(&key, &[2u8; NONCE_SIZE], &ct, &tag).is_err());
    }

    #[test]
    fn empty_plaintext_seals() {
        let key = [0u8; KEY_SIZE];
        let nonce = [0u8; NONCE_SIZE];
        let (ct, tag) = seal(&key, &nonce, b"").unwrap();
        assert!(ct.is_empty());
        assert_eq!(open(&key, &nonce, &ct, &tag).unwrap(), b"");
    }
}
