use std::fs;
use std::path::{Path, PathBuf};

use seclume_core::prelude::*;
use tempfile::TempDir;

const PASSWORD: &[u8] = b"Tr0ub4dor&3";

const HEADER_LEN: u64 = 4160;
const ENTRY_LEN: u64 = 304;

fn pack_one(tmp: &TempDir, contents: &[u8]) -> PathBuf {
    let src = tmp.path().join("src.bin");
    fs::write(&src, contents).unwrap();
    let archive = tmp.path().join("a.slm");
    let inputs = vec![PackEntry {
        src,
        name: "src.bin".into(),
        mode: 0o644,
    }];
    pack(
        &archive,
        &inputs,
        PASSWORD,
        &PackOptions {
            algo: CompressionAlgo::Zlib,
            level: 6,
            ..Default::default()
        },
    )
    .unwrap();
    archive
}

fn flip_bit(archive: &Path, offset: u64) {
    let mut bytes = fs::read(archive).unwrap();
    bytes[offset as usize] ^= 0x01;
    fs::write(archive, bytes).unwrap();
}

fn extract_into(archive: &Path, tmp: &TempDir) -> Result<()> {
    let out = tmp.path().join("out");
    let _ = fs::create_dir(&out);
    extract(
        archive,
        PASSWORD,
        &ExtractOptions {
            outdir: Some(out.to_string_lossy().into_owned()),
            force: true,
        },
    )
}

#[test]
fn header_bitflips_are_detected() {
    // file_count, salt, compression level, outdir field: all under the
    // header HMAC.
    for offset in [6u64, 10, 27, 100] {
        let tmp = TempDir::new().unwrap();
        let archive = pack_one(&tmp, b"important data");
        flip_bit(&archive, offset);
        let err = extract_into(&archive, &tmp).unwrap_err();
        assert!(
            matches!(err, SlmError::HmacMismatch),
            "offset {offset}: got {err}"
        );
    }
}

#[test]
fn version_bitflip_is_rejected() {
    let tmp = TempDir::new().unwrap();
    let archive = pack_one(&tmp, b"important data");
    flip_bit(&archive, 4); // version 6 -> 7
    assert!(matches!(
        extract_into(&archive, &tmp).unwrap_err(),
        SlmError::Format(_)
    ));
}

#[test]
fn metadata_bitflip_fails_auth() {
    // nonce, tag, and ciphertext of the sealed metadata record.
    for offset in [HEADER_LEN, HEADER_LEN + 12, HEADER_LEN + 28] {
        let tmp = TempDir::new().unwrap();
        let archive = pack_one(&tmp, b"important data");
        flip_bit(&archive, offset);
        let err = extract_into(&archive, &tmp).unwrap_err();
        assert!(matches!(err, SlmError::Auth), "offset {offset}: got {err}");
    }
}

#[test]
fn payload_bitflip_fails_auth() {
    let tmp = TempDir::new().unwrap();
    let archive = pack_one(&tmp, b"important data");
    // payload record follows the entry: nonce(12) tag(16) ciphertext
    flip_bit(&archive, HEADER_LEN + ENTRY_LEN + 28 + 2);
    assert!(matches!(
        extract_into(&archive, &tmp).unwrap_err(),
        SlmError::Auth
    ));
}

#[test]
fn truncated_archive_is_fatal() {
    let tmp = TempDir::new().unwrap();
    let archive = pack_one(&tmp, b"important data");
    let bytes = fs::read(&archive).unwrap();
    fs::write(&archive, &bytes[..bytes.len() - 10]).unwrap();
    assert!(matches!(
        extract_into(&archive, &tmp).unwrap_err(),
        SlmError::Io(_)
    ));
}

#[test]
fn list_counts_undecodable_trailing_entry() {
    // Two entries; the second is an empty file, so its sealed metadata is
    // the last record in the archive. Corrupting it must not hide the
    // first entry from the listing.
    let tmp = TempDir::new().unwrap();
    let a = tmp.path().join("one.txt");
    let b = tmp.path().join("two.txt");
    fs::write(&a, b"contents").unwrap();
    fs::write(&b, b"").unwrap();
    let archive = tmp.path().join("a.slm");
    pack(
        &archive,
        &[
            PackEntry {
                src: a,
                name: "one.txt".into(),
                mode: 0o644,
            },
            PackEntry {
                src: b,
                name: "two.txt".into(),
                mode: 0o644,
            },
        ],
        PASSWORD,
        &PackOptions::default(),
    )
    .unwrap();

    let len = fs::metadata(&archive).unwrap().len();
    flip_bit(&archive, len - ENTRY_LEN + 30); // inside the last record's ciphertext

    let summary = list(&archive, PASSWORD).unwrap();
    assert_eq!(summary.listed, 1);
    assert_eq!(summary.failed, 1);
}

#[test]
fn extract_is_strict_about_bad_metadata() {
    let tmp = TempDir::new().unwrap();
    let a = tmp.path().join("one.txt");
    fs::write(&a, b"").unwrap();
    let archive = tmp.path().join("a.slm");
    pack(
        &archive,
        &[PackEntry {
            src: a,
            name: "one.txt".into(),
            mode: 0o644,
        }],
        PASSWORD,
        &PackOptions::default(),
    )
    .unwrap();
    flip_bit(&archive, HEADER_LEN + 40);
    assert!(matches!(
        extract_into(&archive, &tmp).unwrap_err(),
        SlmError::Auth
    ));
}
