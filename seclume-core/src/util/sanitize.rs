use std::path::PathBuf;

/// True if `path` could escape the directory it is joined under.
///
/// Flags `../` and `..\` anywhere, a bare `..`, and a leading `..`
/// component after at most one leading `/` is stripped.
pub fn has_traversal(path: &str) -> bool {
    if path.contains("../") || path.contains("..\\") || path == ".." {
        return true;
    }
    let p = path.strip_prefix('/').unwrap_or(path);
    match p.as_bytes() {
        [b'.', b'.'] => true,
        [b'.', b'.', b'/', ..] => true,
        _ => false,
    }
}

/// Textual join of an extraction directory and a stored filename. Both
/// components must already have passed `has_traversal`.
pub fn join_under(outdir: &str, filename: &str) -> PathBuf {
    PathBuf::from(format!("{outdir}/{filename}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_traversal_components() {
        for bad in [
            "..",
            "../",
            "../etc/passwd",
            "a/../b",
            "/..",
            "/../x",
            "..\\windows",
            "a\\..\\b",
        ] {
            assert!(has_traversal(bad), "{bad} should be rejected");
        }
    }

    #[test]
    fn accepts_ordinary_paths() {
        for ok in [
            "file.txt",
            "dir/file.txt",
            "a/b/c",
            "..file",
            "file..",
            "a/..",
            "..hidden/x",
            "/abs/path",
            ".",
            "./x",
        ] {
            assert!(!has_traversal(ok), "{ok} should be accepted");
        }
    }

    #[test]
    fn join_is_textual() {
        assert_eq!(join_under("out", "a/b.txt"), PathBuf::from("out/a/b.txt"));
        assert_eq!(join_under(".", "x"), PathBuf::from("./x"));
    }
}
