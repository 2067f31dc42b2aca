//! Atomic JSON file writes
//!
//! Documents are written to a temporary file in the destination directory,
//! flushed and synced, then renamed over the target. The temporary file is a
//! [`tempfile::NamedTempFile`], so any early return deletes it and the previous
//! document stays intact.

use serde::Serialize;
use serde::de::DeserializeOwned;
use std::io::{BufWriter, Write};
use std::path::Path;

use crate::error::{MnemoError, Result};

/// Serialize `value` to `path` atomically.
pub fn write_json_atomic<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(dir)?;

    let temp = tempfile::Builder::new()
        .prefix(".mnemo-")
        .suffix(".tmp")
        .tempfile_in(dir)?;

    {
        let mut writer = BufWriter::new(temp.as_file());
        serde_json::to_writer(&mut writer, value)?;
        writer.flush()?;
    }
    temp.as_file().sync_all()?;
    temp.persist(path)?;

    tracing::trace!(path = %path.display(), "Wrote document atomically");
    Ok(())
}

/// Outcome of reading a document that may be missing or damaged
#[derive(Debug)]
pub enum LoadOutcome<T> {
    Loaded(T),
    Missing,
    Corrupt(MnemoError),
}

/// Read a JSON document, distinguishing "missing" from "unreadable".
pub fn read_json<T: DeserializeOwned>(path: &Path) -> LoadOutcome<T> {
    let bytes = match std::fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return LoadOutcome::Missing,
        Err(e) => return LoadOutcome::Corrupt(e.into()),
    };

    match serde_json::from_slice(&bytes) {
        Ok(value) => LoadOutcome::Loaded(value),
        Err(e) => LoadOutcome::Corrupt(MnemoError::Storage(format!(
            "invalid document at {}: {}",
            path.display(),
            e
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;
    use tempfile::TempDir;

    #[test]
    fn test_write_then_read() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("doc.json");
        let mut doc = BTreeMap::new();
        doc.insert("a".to_string(), 1u32);

        write_json_atomic(&path, &doc).unwrap();

        match read_json::<BTreeMap<String, u32>>(&path) {
            LoadOutcome::Loaded(back) => assert_eq!(back, doc),
            other => panic!("unexpected outcome: {:?}", other),
        }
    }

    #[test]
    fn test_no_temp_files_left_behind() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("doc.json");

        write_json_atomic(&path, &vec![1, 2, 3]).unwrap();
        write_json_atomic(&path, &vec![4, 5]).unwrap();

        let names: Vec<String> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["doc.json".to_string()]);
    }

    #[test]
    fn test_failed_write_reports_error() {
        let dir = TempDir::new().unwrap();
        let blocker = dir.path().join("file");
        std::fs::write(&blocker, b"x").unwrap();

        assert!(write_json_atomic(&blocker.join("doc.json"), &vec![1]).is_err());
        let names: Vec<_> = std::fs::read_dir(dir.path()).unwrap().collect();
        assert_eq!(names.len(), 1);
    }

    #[test]
    fn test_missing_and_corrupt() {
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("nope.json");
        assert!(matches!(read_json::<Vec<u8>>(&missing), LoadOutcome::Missing));

        let broken = dir.path().join("broken.json");
        std::fs::write(&broken, b"{\"records\": [").unwrap();
        assert!(matches!(
            read_json::<Vec<u8>>(&broken),
            LoadOutcome::Corrupt(_)
        ));
    }
}
