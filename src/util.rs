//! Sample asset lookup

use std::path::PathBuf;

/// Overrides the directory searched by [`data_path`]
pub const DATA_DIR_ENV: &str = "VIDARRAY_DATA_DIR";

/// Path of a sample asset: `$VIDARRAY_DATA_DIR` (or `<crate>/data`) joined with `parts`
///
/// The file is not required to exist.
pub fn data_path(parts: &[&str]) -> PathBuf {
    let mut path = match std::env::var_os(DATA_DIR_ENV) {
        Some(dir) if !dir.is_empty() => PathBuf::from(dir),
        _ => PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("data"),
    };
    path.extend(parts);
    path
}

#[cfg(test)]
mod tests {
    use super::*;

    // One test so the env var is never mutated concurrently
    #[test]
    fn test_data_path() {
        std::env::remove_var(DATA_DIR_ENV);
        let path = data_path(&["video", "hello.mp4"]);
        assert!(path.starts_with(env!("CARGO_MANIFEST_DIR")));
        assert!(path.ends_with("data/video/hello.mp4"));
        assert_eq!(data_path(&[]), PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("data"));

        let dir = tempfile::tempdir().unwrap();
        std::env::set_var(DATA_DIR_ENV, dir.path());
        assert_eq!(data_path(&["a.png"]), dir.path().join("a.png"));
        std::env::remove_var(DATA_DIR_ENV);
    }
}
