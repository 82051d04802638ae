use std::fs::{self, File};
use std::io::Read;
use std::path::Path;

use tracing::{debug, info, warn};
use zeroize::Zeroizing;

use crate::codec;
use crate::container::entry::{self, FileEntry};
use crate::container::header::ArchiveHeader;
use crate::crypto::aead::{self, NONCE_SIZE, TAG_SIZE};
use crate::crypto::kdf;
use crate::error::{Result, SlmError};
use crate::util::sanitize::join_under;

#[derive(Clone, Default)]
pub struct ExtractOptions {
    /// Caller-chosen extraction directory; wins over the one stored in the
    /// archive.
    pub outdir: Option<String>,
    /// Overwrite existing output files.
    pub force: bool,
}

/// Extract every file from `archive`. Strict: the first bad entry aborts
/// the whole operation. Outputs written before the failure are left in
/// place.
pub fn extract(archive: &Path, password: &[u8], opts: &ExtractOptions) -> Result<()> {
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

    let mut outdir = match opts.outdir.clone() {
        Some(dir) => dir,
        None => header
            .open_outdir(&keys.meta_key)?
            .unwrap_or_else(|| ".".into()),
    };
    if !Path::new(&outdir).is_dir() {
        warn!("output directory {outdir} does not exist, falling back to current directory");
        outdir = ".".into();
        if !Path::new(&outdir).is_dir() {
            return Err(SlmError::Format("current directory is not accessible".into()));
        }
    }
    info!("extracting to directory: {outdir}");

    let codec = codec::codec_for(algo);
    for i in 0..header.file_count {
        let entry = FileEntry::read_from(&mut input)?;
        let plain = entry::decode_entry(&keys.meta_key, &entry)?;

        let full_path = join_under(&outdir, &plain.filename);
        if !opts.force && full_path.exists() {
            return Err(SlmError::Exists(full_path));
        }
        if let Some(parent) = full_path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        if plain.original_size == 0 {
            File::create(&full_path)?;
            set_mode(&full_path, plain.mode);
            debug!("extracted empty file: {}", full_path.display());
            continue;
        }

        let mut nonce = [0u8; NONCE_SIZE];
        let mut tag = [0u8; TAG_SIZE];
        input.read_exact(&mut nonce)?;
        input.read_exact(&mut tag)?;
        let compressed_len = usize::try_from(plain.compressed_size)
            .map_err(|_| SlmError::InvalidMetadata("compressed size is not addressable"))?;
        let mut ciphertext = vec![0u8; compressed_len];
        input.read_exact(&mut ciphertext)?;

        let comp = Zeroizing::new(aead::open(&keys.file_key, &nonce, &ciphertext, &tag)?);
        debug!("entry {i}: decrypted {} bytes", comp.len());
        let data = Zeroizing::new(codec.decompress(&comp, plain.original_size as usize)?);

        fs::write(&full_path, data.as_slice())?;
        set_mode(&full_path, plain.mode);
        debug!("extracted file: {}", full_path.display());
    }

    info!("extraction completed: {}", archive.display());
    Ok(())
}

/// Permission restore is best-effort: a refusal is worth a warning, not a
/// failed extraction.
#[cfg(unix)]
fn set_mode(path: &Path, mode: u32) {
    use std::os::unix::fs::PermissionsExt;
    if let Err(e) = fs::set_permissions(path, fs::Permissions::from_mode(mode)) {
        warn!("failed to set permissions on {}: {e}", path.display());
    } else {
        debug!("restored permissions on {}: {mode:o}", path.display());
    }
}

#[cfg(not(unix))]
fn set_mode(_path: &Path, _mode: u32) {}
