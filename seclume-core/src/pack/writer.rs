use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use tracing::{debug, info};
use zeroize::Zeroizing;

use crate::codec::{self, CompressionAlgo, MAX_LEVEL};
use crate::container::entry::{self, FileEntryPlain, MAX_FILENAME, MAX_FILE_SIZE};
use crate::container::header::{ArchiveHeader, MAX_FILES};
use crate::crypto::aead;
use crate::crypto::kdf::{self, DerivedKeys, SALT_SIZE};
use crate::crypto::random;
use crate::error::{Result, SlmError};
use crate::util::sanitize::has_traversal;

#[derive(Clone)]
pub struct PackOptions {
    pub algo: CompressionAlgo,
    pub level: u8,
    /// Default extraction directory sealed into the header, if any.
    pub outdir_hint: Option<String>,
    /// Overwrite an existing archive file.
    pub force: bool,
}

impl Default for PackOptions {
    fn default() -> Self {
        Self {
            algo: CompressionAlgo::Lzma,
            level: 6,
            outdir_hint: None,
            force: false,
        }
    }
}

/// One file to pack: where to read it on disk and the name it carries
/// inside the archive.
#[derive(Clone, Debug)]
pub struct PackEntry {
    pub src: PathBuf,
    pub name: String,
    pub mode: u32,
}

/// Create an archive at `out` from `inputs`, in order.
///
/// All preconditions are checked before the output file is created; a
/// failure after that point removes the partial archive. Keys are wiped on
/// every exit path.
pub fn pack(out: &Path, inputs: &[PackEntry], password: &[u8], opts: &PackOptions) -> Result<()> {
    if inputs.is_empty() {
        return Err(SlmError::Format("no input files".into()));
    }
    if inputs.len() as u64 > u64::from(MAX_FILES) {
        return Err(SlmError::SizeBound {
            what: "input file count",
            got: inputs.len() as u64,
            max: u64::from(MAX_FILES),
        });
    }
    if opts.level > MAX_LEVEL {
        return Err(SlmError::Format(format!(
            "compression level {} out of range 0..={MAX_LEVEL}",
            opts.level
        )));
    }
    for input in inputs {
        if input.name.len() >= MAX_FILENAME {
            return Err(SlmError::SizeBound {
                what: "filename length",
                got: input.name.len() as u64,
                max: (MAX_FILENAME - 1) as u64,
            });
        }
        if has_traversal(&input.name) {
            return Err(SlmError::PathTraversal(input.name.clone()));
        }
        let md = fs::metadata(&input.src)?;
        if md.len() > MAX_FILE_SIZE {
            return Err(SlmError::SizeBound {
                what: "file size",
                got: md.len(),
                max: MAX_FILE_SIZE,
            });
        }
    }
    if !opts.force && out.exists() {
        return Err(SlmError::Exists(out.to_path_buf()));
    }

    let mut salt = [0u8; SALT_SIZE];
    random::fill(&mut salt)?;
    let keys = kdf::derive_keys(password, &salt)?;
    debug!("derived encryption keys");

    let mut header = ArchiveHeader::new(inputs.len() as u32, salt, opts.algo, opts.level);
    if let Some(outdir) = opts.outdir_hint.as_deref().filter(|d| !d.is_empty()) {
        header.seal_outdir(&keys.meta_key, outdir)?;
    }
    header.seal_hmac(&keys.file_key)?;

    info!(
        "packing {} files into {} (compression {} level {})",
        inputs.len(),
        out.display(),
        opts.algo.name(),
        opts.level
    );

    let mut file = File::create(out)?;
    let res = write_archive(&mut file, &header, inputs, &keys, opts);
    drop(file);
    if res.is_err() {
        // Leave no partial archive behind.
        let _ = fs::remove_file(out);
    }
    res
}

fn write_archive(
    out: &mut File,
    header: &ArchiveHeader,
    inputs: &[PackEntry],
    keys: &DerivedKeys,
    opts: &PackOptions,
) -> Result<()> {
    header.write_to(&mut *out)?;

    let codec = codec::codec_for(opts.algo);
    for input in inputs {
        let raw = Zeroizing::new(fs::read(&input.src)?);
        if raw.len() as u64 > MAX_FILE_SIZE {
            return Err(SlmError::SizeBound {
                what: "file size",
                got: raw.len() as u64,
                max: MAX_FILE_SIZE,
            });
        }

        if raw.is_empty() {
            let plain = FileEntryPlain {
                filename: input.name.clone(),
                original_size: 0,
                compressed_size: 0,
                mode: input.mode,
            };
            entry::encode_entry(&keys.meta_key, &plain)?.write_to(&mut *out)?;
            debug!("stored empty file: {}", input.name);
            continue;
        }

        let comp = Zeroizing::new(codec.compress(&raw, u32::from(opts.level))?);
        debug!(
            "compressed {}: {} -> {} bytes",
            input.name,
            raw.len(),
            comp.len()
        );

        let plain = FileEntryPlain {
            filename: input.name.clone(),
            original_size: raw.len() as u64,
            compressed_size: comp.len() as u64,
            mode: input.mode,
        };
        entry::encode_entry(&keys.meta_key, &plain)?.write_to(&mut *out)?;

        let nonce = aead::fresh_nonce()?;
        let (ciphertext, tag) = aead::seal(&keys.file_key, &nonce, &comp)?;
        out.write_all(&nonce)?;
        out.write_all(&tag)?;
        out.write_all(&ciphertext)?;
    }

    out.sync_all()?;
    Ok(())
}
