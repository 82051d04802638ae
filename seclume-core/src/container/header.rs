use std::io::{Read, Write};

use crate::codec::CompressionAlgo;
use crate::crypto::aead::{self, KEY_SIZE, NONCE_SIZE, TAG_SIZE};
use crate::crypto::kdf::SALT_SIZE;
use crate::crypto::mac::{self, HMAC_SIZE};
use crate::error::{Result, SlmError};
use crate::util::sanitize::has_traversal;

pub const MAGIC: [u8; 4] = *b"SLM\0";
pub const VERSION_MIN: u16 = 4;
pub const VERSION_CURRENT: u16 = 6;

pub const MAX_FILES: u32 = 1024;
pub const MAX_OUTDIR: usize = 4096;

/// Longest outdir plaintext that still leaves room for nonce and tag
/// inside the fixed field.
pub const MAX_OUTDIR_PLAIN: usize = MAX_OUTDIR - NONCE_SIZE - TAG_SIZE;

/// Serialized header size: all fields packed, little-endian, no padding.
pub const HEADER_LEN: usize = 4 + 2 + 4 + SALT_SIZE + 1 + 1 + 4 + MAX_OUTDIR + HMAC_SIZE;
/// The HMAC covers every header byte before the hmac field itself.
pub const HMAC_OFFSET: usize = HEADER_LEN - HMAC_SIZE;

/// On-disk archive header. One fixed layout serves versions 4 through 6;
/// older readers ignore the fields their version predates.
#[derive(Clone)]
pub struct ArchiveHeader {
    pub version: u16,
    pub file_count: u32,
    pub salt: [u8; SALT_SIZE],
    pub compression_algo: u8,
    pub compression_level: u8,
    /// Plaintext length of the sealed outdir; 0 when unset. v6 only.
    pub outdir_len: u32,
    /// `ciphertext ‖ nonce ‖ tag` when `outdir_len > 0`, zeros otherwise.
    pub outdir: [u8; MAX_OUTDIR],
    pub hmac: [u8; HMAC_SIZE],
}

impl ArchiveHeader {
    pub fn new(
        file_count: u32,
        salt: [u8; SALT_SIZE],
        algo: CompressionAlgo,
        level: u8,
    ) -> Self {
        Self {
            version: VERSION_CURRENT,
            file_count,
            salt,
            compression_algo: algo as u8,
            compression_level: level,
            outdir_len: 0,
            outdir: [0u8; MAX_OUTDIR],
            hmac: [0u8; HMAC_SIZE],
        }
    }

    pub fn to_bytes(&self) -> [u8; HEADER_LEN] {
        let mut buf = [0u8; HEADER_LEN];
        buf[0..4].copy_from_slice(&MAGIC);
        buf[4..6].copy_from_slice(&self.version.to_le_bytes());
        buf[6..10].copy_from_slice(&self.file_count.to_le_bytes());
        buf[10..26].copy_from_slice(&self.salt);
        buf[26] = self.compression_algo;
        buf[27] = self.compression_level;
        buf[28..32].copy_from_slice(&self.outdir_len.to_le_bytes());
        buf[32..32 + MAX_OUTDIR].copy_from_slice(&self.outdir);
        buf[HMAC_OFFSET..].copy_from_slice(&self.hmac);
        buf
    }

    pub fn write_to(&self, mut w: impl Write) -> Result<()> {
        w.write_all(&self.to_bytes())?;
        Ok(())
    }

    /// Read and structurally validate a header. HMAC verification is a
    /// separate step because the keys come from the salt read here.
    pub fn read_from(mut r: impl Read) -> Result<Self> {
        let mut buf = [0u8; HEADER_LEN];
        r.read_exact(&mut buf)?;

        if buf[0..4] != MAGIC {
            return Err(SlmError::Format("invalid archive magic".into()));
        }
        let version = u16::from_le_bytes([buf[4], buf[5]]);
        if !(VERSION_MIN..=VERSION_CURRENT).contains(&version) {
            return Err(SlmError::Format(format!(
                "unsupported archive version (expected {VERSION_MIN} to {VERSION_CURRENT}, got {version})"
            )));
        }
        let file_count = u32::from_le_bytes([buf[6], buf[7], buf[8], buf[9]]);
        if file_count > MAX_FILES {
            return Err(SlmError::SizeBound {
                what: "file count in archive",
                got: u64::from(file_count),
                max: u64::from(MAX_FILES),
            });
        }
        let mut salt = [0u8; SALT_SIZE];
        salt.copy_from_slice(&buf[10..26]);
        let compression_algo = buf[26];
        if version > 4 {
            CompressionAlgo::from_u8(compression_algo)?;
        }
        let mut outdir = [0u8; MAX_OUTDIR];
        outdir.copy_from_slice(&buf[32..32 + MAX_OUTDIR]);
        let mut hmac = [0u8; HMAC_SIZE];
        hmac.copy_from_slice(&buf[HMAC_OFFSET..]);

        Ok(Self {
            version,
            file_count,
            salt,
            compression_algo,
            compression_level: buf[27],
            outdir_len: u32::from_le_bytes([buf[28], buf[29], buf[30], buf[31]]),
            outdir,
            hmac,
        })
    }

    /// Version-aware codec selection: v4 archives are always LZMA and carry
    /// no selector byte worth trusting.
    pub fn effective_algo(&self) -> Result<CompressionAlgo> {
        if self.version == 4 {
            Ok(CompressionAlgo::Lzma)
        } else {
            CompressionAlgo::from_u8(self.compression_algo)
        }
    }

    /// Compute the header HMAC with `file_key` and store it. Call after
    /// every other field is final.
    pub fn seal_hmac(&mut self, file_key: &[u8; KEY_SIZE]) -> Result<()> {
        let bytes = self.to_bytes();
        self.hmac = mac::compute(file_key, &bytes[..HMAC_OFFSET])?;
        Ok(())
    }

    pub fn verify_hmac(&self, file_key: &[u8; KEY_SIZE]) -> Result<()> {
        let bytes = self.to_bytes();
        if mac::verify(file_key, &bytes[..HMAC_OFFSET], &self.hmac)? {
            Ok(())
        } else {
            Err(SlmError::HmacMismatch)
        }
    }

    /// Seal a default extraction directory into the outdir field under
    /// `meta_key`.
    pub fn seal_outdir(&mut self, meta_key: &[u8; KEY_SIZE], outdir: &str) -> Result<()> {
        let plain = outdir.as_bytes();
        if plain.len() > MAX_OUTDIR_PLAIN {
            return Err(SlmError::SizeBound {
                what: "output directory length",
                got: plain.len() as u64,
                max: MAX_OUTDIR_PLAIN as u64,
            });
        }
        let nonce = aead::fresh_nonce()?;
        let (ciphertext, tag) = aead::seal(meta_key, &nonce, plain)?;
        self.outdir = [0u8; MAX_OUTDIR];
        self.outdir[..ciphertext.len()].copy_from_slice(&ciphertext);
        self.outdir[ciphertext.len()..ciphertext.len() + NONCE_SIZE].copy_from_slice(&nonce);
        self.outdir[ciphertext.len() + NONCE_SIZE..ciphertext.len() + NONCE_SIZE + TAG_SIZE]
            .copy_from_slice(&tag);
        self.outdir_len = ciphertext.len() as u32;
        Ok(())
    }

    /// Open the stored outdir, if any. The result has passed the traversal
    /// check and is safe to join under.
    pub fn open_outdir(&self, meta_key: &[u8; KEY_SIZE]) -> Result<Option<String>> {
        if self.version < 6 || self.outdir_len == 0 {
            return Ok(None);
        }
        let len = self.outdir_len as usize;
        if len > MAX_OUTDIR_PLAIN {
            return Err(SlmError::Format(format!(
                "invalid output directory length ({len})"
            )));
        }
        let ciphertext = &self.outdir[..len];
        let mut nonce = [0u8; NONCE_SIZE];
        nonce.copy_from_slice(&self.outdir[len..len + NONCE_SIZE]);
        let mut tag = [0u8; TAG_SIZE];
        tag.copy_from_slice(&self.outdir[len + NONCE_SIZE..len + NONCE_SIZE + TAG_SIZE]);

        let plain = aead::open(meta_key, &nonce, ciphertext, &tag)?;
        let outdir = String::from_utf8(plain)
            .map_err(|_| SlmError::Format("stored output directory is not valid UTF-8".into()))?;
        if has_traversal(&outdir) {
            return Err(SlmError::PathTraversal(outdir));
        }
        Ok(Some(outdir))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::CompressionAlgo;

    fn sample() -> ArchiveHeader {
        ArchiveHeader::new(3, [0xA5; SALT_SIZE], CompressionAlgo::Zlib, 6)
    }

    #[test]
    fn layout_is_4160_bytes() {
        assert_eq!(HEADER_LEN, 4160);
        assert_eq!(HMAC_OFFSET, 4128);
    }

    #[test]
    fn round_trip() {
        let h = sample();
        let got = ArchiveHeader::read_from(&h.to_bytes()[..]).unwrap();
        assert_eq!(got.version, VERSION_CURRENT);
        assert_eq!(got.file_count, 3);
        assert_eq!(got.salt, [0xA5; SALT_SIZE]);
        assert_eq!(got.compression_algo, CompressionAlgo::Zlib as u8);
        assert_eq!(got.compression_level, 6);
        assert_eq!(got.outdir_len, 0);
    }

    #[test]
    fn bad_magic_rejected() {
        let mut bytes = sample().to_bytes();
        bytes[0] = b'X';
        assert!(matches!(
            ArchiveHeader::read_from(&bytes[..]),
            Err(SlmError::Format(_))
        ));
    }

    #[test]
    fn version_gate() {
        for bad in [0u16, 3, 7] {
            let mut bytes = sample().to_bytes();
            bytes[4..6].copy_from_slice(&bad.to_le_bytes());
            assert!(ArchiveHeader::read_from(&bytes[..]).is_err());
        }
    }

    #[test]
    fn file_count_gate() {
        let mut bytes = sample().to_bytes();
        bytes[6..10].copy_from_slice(&(MAX_FILES + 1).to_le_bytes());
        assert!(matches!(
            ArchiveHeader::read_from(&bytes[..]),
            Err(SlmError::SizeBound { .. })
        ));
    }

    #[test]
    fn v4_is_always_lzma() {
        let mut bytes = sample().to_bytes();
        bytes[4..6].copy_from_slice(&4u16.to_le_bytes());
        bytes[26] = 0xFF; // selector byte is junk in v4 archives
        let h = ArchiveHeader::read_from(&bytes[..]).unwrap();
        assert_eq!(h.effective_algo().unwrap(), CompressionAlgo::Lzma);
    }

    #[test]
    fn v6_rejects_unknown_algo() {
        let mut bytes = sample().to_bytes();
        bytes[26] = 2;
        assert!(ArchiveHeader::read_from(&bytes[..]).is_err());
    }

    #[test]
    fn hmac_seal_verify_and_bitflip() {
        let key = [0x11u8; KEY_SIZE];
        let mut h = sample();
        h.seal_hmac(&key).unwrap();
        h.verify_hmac(&key).unwrap();

        let mut tampered = h.clone();
        tampered.file_count ^= 1;
        assert!(matches!(
            tampered.verify_hmac(&key),
            Err(SlmError::HmacMismatch)
        ));
        assert!(matches!(
            h.verify_hmac(&[0x12u8; KEY_SIZE]),
            Err(SlmError::HmacMismatch)
        ));
    }

    #[test]
    fn outdir_seal_open_round_trip() {
        let key = [0x22u8; KEY_SIZE];
        let mut h = sample();
        h.seal_outdir(&key, "backups/2024").unwrap();
        assert_eq!(h.outdir_len, 12);
        assert_eq!(h.open_outdir(&key).unwrap().as_deref(), Some("backups/2024"));
    }

    #[test]
    fn outdir_wrong_key_fails_auth() {
        let mut h = sample();
        h.seal_outdir(&[0x22u8; KEY_SIZE], "out").unwrap();
        assert!(matches!(
            h.open_outdir(&[0x23u8; KEY_SIZE]),
            Err(SlmError::Auth)
        ));
    }

    #[test]
    fn outdir_traversal_rejected_after_open() {
        let key = [0x22u8; KEY_SIZE];
        let mut h = sample();
        h.seal_outdir(&key, "../evil").unwrap();
        assert!(matches!(
            h.open_outdir(&key),
            Err(SlmError::PathTraversal(_))
        ));
    }

    #[test]
    fn outdir_absent_below_v6() {
        let key = [0x22u8; KEY_SIZE];
        let mut h = sample();
        h.seal_outdir(&key, "out").unwrap();
        h.version = 5;
        assert_eq!(h.open_outdir(&key).unwrap(), None);
    }

    #[test]
    fn oversized_outdir_rejected() {
        let mut h = sample();
        let long = "d".repeat(MAX_OUTDIR_PLAIN + 1);
        assert!(matches!(
            h.seal_outdir(&[0u8; KEY_SIZE], &long),
            Err(SlmError::SizeBound { .. })
        ));
    }
}
