use std::path::PathBuf;

use glob::Pattern;
use tracing::{debug, info};
use walkdir::WalkDir;

use seclume_core::MAX_FILES;
use seclume_core::prelude::*;

use crate::presentation::cli::AlgoArg;

impl From<AlgoArg> for CompressionAlgo {
    fn from(a: AlgoArg) -> Self {
        match a {
            AlgoArg::Zlib => CompressionAlgo::Zlib,
            AlgoArg::Lzma => CompressionAlgo::Lzma,
        }
    }
}

pub fn handle_pack(
    archive: PathBuf,
    inputs: Vec<PathBuf>,
    algo: AlgoArg,
    level: u8,
    outdir: Option<String>,
    force: bool,
    exclude: Vec<String>,
    weak_password: bool,
    password: Option<String>,
) -> Result<()> {
    let password = obtain_password(password)?;
    check_password_strength(&password, weak_password)?;

    let patterns = compile_patterns(&exclude)?;
    let entries = collect_inputs(&inputs, &patterns)?;
    if entries.is_empty() {
        return Err(SlmError::Format("no input files after exclusions".into()));
    }

    let opts = PackOptions {
        algo: algo.into(),
        level,
        outdir_hint: outdir,
        force,
    };
    pack(&archive, &entries, password.as_bytes(), &opts)
}

pub fn handle_extract(
    archive: PathBuf,
    outdir: Option<String>,
    force: bool,
    password: Option<String>,
) -> Result<()> {
    let password = obtain_password(password)?;
    extract(
        &archive,
        password.as_bytes(),
        &ExtractOptions { outdir, force },
    )
}

pub fn handle_list(archive: PathBuf, password: Option<String>) -> Result<()> {
    let password = obtain_password(password)?;
    let summary = list(&archive, password.as_bytes())?;
    if summary.failed > 0 {
        return Err(SlmError::Format(format!(
            "{} file entries could not be processed",
            summary.failed
        )));
    }
    Ok(())
}

fn obtain_password(arg: Option<String>) -> Result<String> {
    match arg {
        Some(p) => Ok(p),
        None => Ok(rpassword::prompt_password("Password: ")?),
    }
}

/// Minimum 8 characters with upper, lower, digit and special, unless the
/// user explicitly opted out.
fn check_password_strength(password: &str, weak_password: bool) -> Result<()> {
    if weak_password {
        return Ok(());
    }
    if password.chars().count() < 8 {
        return Err(SlmError::Format(
            "password too short (minimum 8 characters); pass --weak-password to override".into(),
        ));
    }
    let has_upper = password.chars().any(|c| c.is_ascii_uppercase());
    let has_lower = password.chars().any(|c| c.is_ascii_lowercase());
    let has_digit = password.chars().any(|c| c.is_ascii_digit());
    let has_special = password
        .chars()
        .any(|c| !c.is_ascii_uppercase() && !c.is_ascii_lowercase() && !c.is_ascii_digit());
    if !(has_upper && has_lower && has_digit && has_special) {
        return Err(SlmError::Format(
            "password must contain uppercase, lowercase, digits, and special characters; \
             pass --weak-password to override"
                .into(),
        ));
    }
    Ok(())
}

fn compile_patterns(exclude: &[String]) -> Result<Vec<Pattern>> {
    exclude
        .iter()
        .map(|p| {
            Pattern::new(p).map_err(|e| SlmError::Format(format!("invalid exclude pattern {p}: {e}")))
        })
        .collect()
}

/// Walk the argument list, recursing into directories, and turn every
/// regular file into a pack entry named by its walked path. Symlinks are
/// skipped.
fn collect_inputs(inputs: &[PathBuf], patterns: &[Pattern]) -> Result<Vec<PackEntry>> {
    let mut entries = Vec::new();
    for root in inputs {
        for e in WalkDir::new(root).follow_links(false) {
            let e = e.map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e))?;
            if !e.file_type().is_file() {
                continue;
            }
            let file_name = e.file_name().to_string_lossy();
            if let Some(p) = patterns.iter().find(|p| p.matches(&file_name)) {
                info!("excluding file: {} (matches pattern {p})", e.path().display());
                continue;
            }
            if entries.len() >= MAX_FILES as usize {
                return Err(SlmError::SizeBound {
                    what: "input file count",
                    got: entries.len() as u64 + 1,
                    max: u64::from(MAX_FILES),
                });
            }
            let md = e
                .metadata()
                .map_err(|err| std::io::Error::new(std::io::ErrorKind::Other, err))?;
            debug!("collected file: {}", e.path().display());
            entries.push(PackEntry {
                src: e.path().to_path_buf(),
                name: e.path().to_string_lossy().into_owned(),
                mode: mode_from(&md),
            });
        }
    }
    Ok(entries)
}

fn mode_from(_md: &std::fs::Metadata) -> u32 {
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        _md.permissions().mode()
    }
    #[cfg(not(unix))]
    {
        0o644
    }
}
