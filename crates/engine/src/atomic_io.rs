use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

/// Replaces `path` with `text` via a sibling temp file, so a reader sees
/// either the previous level or the new one.
pub(crate) fn write_text_atomic(path: &Path, text: &str) -> io::Result<()> {
    if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }

    let staging = staging_path(path);
    let written = File::create(&staging).and_then(|mut file| {
        file.write_all(text.as_bytes())?;
        file.sync_all()
    });
    // rename overwrites the destination on every supported platform.
    let result = written.and_then(|()| fs::rename(&staging, path));
    if result.is_err() {
        let _ = fs::remove_file(&staging);
    }
    result
}

fn staging_path(path: &Path) -> PathBuf {
    let stem = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| "level.json".to_string());
    path.with_file_name(format!(".{stem}.{}.saving", std::process::id()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn overwrites_previous_contents_without_leftovers() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("nested").join("level.json");

        write_text_atomic(&path, "first").expect("first write");
        write_text_atomic(&path, "second").expect("second write");

        assert_eq!(fs::read_to_string(&path).expect("read"), "second");
        let entries = fs::read_dir(path.parent().expect("parent"))
            .expect("list")
            .count();
        assert_eq!(entries, 1);
    }

    #[test]
    fn failed_write_keeps_existing_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let target = dir.path().join("level.json");
        fs::create_dir(&target).expect("directory in the way");

        assert!(write_text_atomic(&target, "{}").is_err());
        assert!(target.is_dir());
        assert_eq!(fs::read_dir(dir.path()).expect("list").count(), 1);
    }
}
