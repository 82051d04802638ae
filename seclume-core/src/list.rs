use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::Path;

use tracing::{debug, info, warn};

use crate::container::entry::{self, FileEntry};
use crate::container::header::ArchiveHeader;
use crate::crypto::aead::{NONCE_SIZE, TAG_SIZE};
use crate::crypto::kdf;
use crate::error::{Result, SlmError};
use crate::util::modestr::mode_string;

/// Outcome of a listing pass. `failed > 0` means at least one entry could
/// not be decoded; the caller decides the exit status.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ListSummary {
    pub listed: u32,
    pub failed: u32,
}

/// Print the archive's table of contents to stdout.
///
/// Lenient where extract is strict: a bad entry is counted and skipped when
/// its payload size is known. A metadata record that fails authentication
/// leaves the payload size unknown, so listing can only continue past it at
/// end of archive; otherwise it stops early.
pub fn list(archive: &Path, password: &[u8]) -> Result<ListSummary> {
    let mut input = File::open(archive)?;
    let header = ArchiveHeader::read_from(&mut input)?;
    let algo = header.effective_algo()?;
    info!(
        "read archive header, version {}, {} files, compression {} level {}",
        header.version,
        header.file_count,
        algo.name(),
        header.compression_level
    );

    let keys = kdf::derive_keys(password, &header.salt)?;
    debug!("derived encryption keys");
    header.verify_hmac(&keys.file_key)?;
    debug!("verified header HMAC");

    println!("Contents of {}:", archive.display());
    println!("{:<11} {:<12} {}", "Permissions", "Size", "Filename");
    println!("{:<11} {:<12} {}", "-----------", "------------", "--------");

    let mut summary = ListSummary::default();
    for i in 0..header.file_count {
        let entry_pos = input.stream_position()?;
        let entry = FileEntry::read_from(&mut input)?;

        let raw = match entry::open_entry(&keys.meta_key, &entry) {
            Ok(raw) => raw,
            Err(SlmError::Auth) => {
                warn!(
                    "entry {i} at offset {entry_pos}: metadata authentication failed \
                     (wrong password or corrupted data?)"
                );
                summary.failed += 1;
                // Without metadata the payload size is unknown. If payload
                // bytes follow we cannot resync; at end of archive there is
                // nothing left to skip.
                let pos = input.stream_position()?;
                let mut probe = [0u8; NONCE_SIZE + TAG_SIZE];
                if input.read_exact(&mut probe).is_ok() {
                    warn!("cannot skip payload of entry {i} (unknown size); stopping");
                    return Ok(summary);
                }
                input.seek(SeekFrom::Start(pos))?;
                continue;
            }
            Err(e) => return Err(e),
        };

        match raw.validate() {
            Ok(plain) => {
                println!(
                    "{:<11} {:>12} {}",
                    mode_string(plain.mode),
                    plain.original_size,
                    plain.filename
                );
                summary.listed += 1;
                if plain.compressed_size > 0 {
                    skip_payload(&mut input, plain.compressed_size)?;
                }
            }
            Err(SlmError::InvalidMetadata(reason)) => {
                warn!("entry {i} at offset {entry_pos}: {reason}");
                summary.failed += 1;
                if raw.compressed_size > 0 {
                    skip_payload(&mut input, raw.compressed_size)?;
                }
            }
            Err(e) => return Err(e),
        }
    }

    if summary.failed > 0 {
        warn!("{} file entries could not be processed", summary.failed);
    }
    Ok(summary)
}

fn skip_payload(input: &mut File, compressed_size: u64) -> Result<()> {
    let skip = compressed_size
        .checked_add((NONCE_SIZE + TAG_SIZE) as u64)
        .and_then(|n| i64::try_from(n).ok())
        .ok_or_else(|| SlmError::Format("payload size overflows seek offset".into()))?;
    input.seek(SeekFrom::Current(skip))?;
    Ok(())
}
