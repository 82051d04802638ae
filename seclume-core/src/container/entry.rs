use std::io::{Read, Write};

use zeroize::Zeroizing;

use crate::crypto::aead::{self, KEY_SIZE, NONCE_SIZE, TAG_SIZE};
use crate::error::{Result, SlmError};
use crate::util::sanitize::has_traversal;

pub const MAX_FILENAME: usize = 256;
pub const MAX_FILE_SIZE: u64 = u32::MAX as u64;

/// Serialized `FileEntryPlain`: filename[256] ‖ original_size:u64 ‖
/// compressed_size:u64 ‖ mode:u32, little-endian, packed.
pub const PLAIN_LEN: usize = MAX_FILENAME + 8 + 8 + 4;
/// On-disk entry record: nonce ‖ tag ‖ sealed metadata.
pub const ENTRY_LEN: usize = NONCE_SIZE + TAG_SIZE + PLAIN_LEN;

#[inline]
fn le64(x: &[u8]) -> u64 {
    u64::from_le_bytes(x.try_into().unwrap())
}

/// One sealed metadata record as it appears in the archive.
pub struct FileEntry {
    pub nonce: [u8; NONCE_SIZE],
    pub tag: [u8; TAG_SIZE],
    pub encrypted: [u8; PLAIN_LEN],
}

impl FileEntry {
    pub fn write_to(&self, mut w: impl Write) -> Result<()> {
        w.write_all(&self.nonce)?;
        w.write_all(&self.tag)?;
        w.write_all(&self.encrypted)?;
        Ok(())
    }

    pub fn read_from(mut r: impl Read) -> Result<Self> {
        let mut nonce = [0u8; NONCE_SIZE];
        let mut tag = [0u8; TAG_SIZE];
        let mut encrypted = [0u8; PLAIN_LEN];
        r.read_exact(&mut nonce)?;
        r.read_exact(&mut tag)?;
        r.read_exact(&mut encrypted)?;
        Ok(Self {
            nonce,
            tag,
            encrypted,
        })
    }
}

/// Decoded per-file metadata.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileEntryPlain {
    pub filename: String,
    pub original_size: u64,
    pub compressed_size: u64,
    pub mode: u32,
}

/// Seal metadata under `meta_key` with a fresh nonce.
///
/// Rejects names the decoder would refuse: too long, interior NUL, or
/// containing a traversal component.
pub fn encode_entry(meta_key: &[u8; KEY_SIZE], plain: &FileEntryPlain) -> Result<FileEntry> {
    let name = plain.filename.as_bytes();
    if name.len() >= MAX_FILENAME {
        return Err(SlmError::SizeBound {
            what: "filename length",
            got: name.len() as u64,
            max: (MAX_FILENAME - 1) as u64,
        });
    }
    if name.contains(&0) {
        return Err(SlmError::InvalidMetadata("filename contains NUL byte"));
    }
    if has_traversal(&plain.filename) {
        return Err(SlmError::PathTraversal(plain.filename.clone()));
    }
    if plain.original_size > MAX_FILE_SIZE {
        return Err(SlmError::SizeBound {
            what: "file size",
            got: plain.original_size,
            max: MAX_FILE_SIZE,
        });
    }

    let mut buf = Zeroizing::new([0u8; PLAIN_LEN]);
    buf[..name.len()].copy_from_slice(name);
    buf[MAX_FILENAME..MAX_FILENAME + 8].copy_from_slice(&plain.original_size.to_le_bytes());
    buf[MAX_FILENAME + 8..MAX_FILENAME + 16].copy_from_slice(&plain.compressed_size.to_le_bytes());
    buf[MAX_FILENAME + 16..].copy_from_slice(&plain.mode.to_le_bytes());

    let nonce = aead::fresh_nonce()?;
    let (ciphertext, tag) = aead::seal(meta_key, &nonce, buf.as_slice())?;
    let encrypted: [u8; PLAIN_LEN] = ciphertext
        .try_into()
        .map_err(|_| SlmError::Crypto("sealed metadata has unexpected length".into()))?;
    Ok(FileEntry {
        nonce,
        tag,
        encrypted,
    })
}

/// Decrypted but not yet validated metadata. Every field is still
/// attacker-controlled; only `validate` promotes it to `FileEntryPlain`.
/// The listing path needs the raw sizes even when validation fails, to
/// skip the payload that follows a bad entry.
pub struct RawEntryPlain {
    filename: Zeroizing<[u8; MAX_FILENAME]>,
    pub original_size: u64,
    pub compressed_size: u64,
    pub mode: u32,
}

/// AEAD-open one metadata record. Tag mismatch is `Auth`.
pub fn open_entry(meta_key: &[u8; KEY_SIZE], entry: &FileEntry) -> Result<RawEntryPlain> {
    let plain = Zeroizing::new(aead::open(
        meta_key,
        &entry.nonce,
        &entry.encrypted,
        &entry.tag,
    )?);
    if plain.len() != PLAIN_LEN {
        return Err(SlmError::InvalidMetadata("metadata has unexpected length"));
    }
    let mut filename = Zeroizing::new([0u8; MAX_FILENAME]);
    filename.copy_from_slice(&plain[..MAX_FILENAME]);
    Ok(RawEntryPlain {
        filename,
        original_size: le64(&plain[MAX_FILENAME..MAX_FILENAME + 8]),
        compressed_size: le64(&plain[MAX_FILENAME + 8..MAX_FILENAME + 16]),
        mode: u32::from_le_bytes(plain[MAX_FILENAME + 16..].try_into().unwrap()),
    })
}

impl RawEntryPlain {
    /// Enforce every metadata invariant. Any lapse is `InvalidMetadata`.
    pub fn validate(&self) -> Result<FileEntryPlain> {
        if self.filename[MAX_FILENAME - 1] != 0 {
            return Err(SlmError::InvalidMetadata("filename is not NUL-terminated"));
        }
        let name_end = self
            .filename
            .iter()
            .position(|&b| b == 0)
            .unwrap_or(MAX_FILENAME - 1);
        let filename = std::str::from_utf8(&self.filename[..name_end])
            .map_err(|_| SlmError::InvalidMetadata("filename is not valid UTF-8"))?
            .to_owned();
        if has_traversal(&filename) {
            return Err(SlmError::InvalidMetadata("filename contains path traversal"));
        }
        if self.compressed_size > 0 && self.original_size == 0 {
            return Err(SlmError::InvalidMetadata(
                "compressed size present for empty file",
            ));
        }
        if self.original_size > MAX_FILE_SIZE {
            return Err(SlmError::InvalidMetadata("original size exceeds limit"));
        }
        Ok(FileEntryPlain {
            filename,
            original_size: self.original_size,
            compressed_size: self.compressed_size,
            mode: self.mode,
        })
    }
}

/// Open and validate in one step. Extract uses this; the listing path
/// keeps the two stages separate.
pub fn decode_entry(meta_key: &[u8; KEY_SIZE], entry: &FileEntry) -> Result<FileEntryPlain> {
    open_entry(meta_key, entry)?.validate()
}
