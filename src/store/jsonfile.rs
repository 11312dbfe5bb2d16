//! Small JSON file helpers: missing files read as `None`, writes replace the file atomically.

use crate::store::StoreError;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs::File;
use std::io::{BufReader, ErrorKind, Write};
use std::path::Path;
use tempfile::NamedTempFile;

pub(crate) fn read_json<T: DeserializeOwned>(path: &Path) -> Result<Option<T>, StoreError> {
    let file = match File::open(path) {
        Ok(f) => f,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
        Err(e) => {
            return Err(StoreError::Read {
                path: path.to_path_buf(),
                source: e,
            })
        }
    };
    serde_json::from_reader(BufReader::new(file))
        .map(Some)
        .map_err(|e| StoreError::DecodeJson {
            path: path.to_path_buf(),
            source: e,
        })
}

/// Serialize `value` into a fresh temp file beside `path`, then persist it over `path`
/// so readers never see a partial file.
pub(crate) fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<(), StoreError> {
    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(parent).map_err(|e| StoreError::CreateDir {
        path: parent.to_path_buf(),
        source: e,
    })?;
    let data = serde_json::to_vec_pretty(value).map_err(|e| StoreError::EncodeJson {
        path: path.to_path_buf(),
        source: e,
    })?;

    let write_err = |e| StoreError::Write {
        path: path.to_path_buf(),
        source: e,
    };
    let mut tmp = NamedTempFile::new_in(parent).map_err(write_err)?;
    tmp.write_all(&data).map_err(write_err)?;
    tmp.as_file_mut().sync_all().map_err(write_err)?;
    tmp.persist(path).map_err(|e| write_err(e.error))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;
    use tempfile::TempDir;

    #[test]
    fn missing_file_reads_as_none() -> Result<(), StoreError> {
        let dir = TempDir::new().unwrap();
        let value: Option<BTreeMap<String, u32>> = read_json(&dir.path().join("nope.json"))?;
        assert!(value.is_none());
        Ok(())
    }

    #[test]
    fn write_creates_parent_dirs_and_leaves_no_temp_file() -> Result<(), StoreError> {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("value.json");
        let mut map = BTreeMap::new();
        map.insert("a".to_string(), 1u32);
        write_json(&path, &map)?;

        let back: Option<BTreeMap<String, u32>> = read_json(&path)?;
        assert_eq!(back, Some(map));
        let entries = std::fs::read_dir(dir.path().join("nested")).unwrap().count();
        assert_eq!(entries, 1);
        Ok(())
    }

    #[test]
    fn concurrent_writers_to_one_path_all_succeed() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("shared.json");
        let handles: Vec<_> = (0..4u32)
            .map(|writer| {
                let path = path.clone();
                std::thread::spawn(move || {
                    for i in 0..100u32 {
                        let mut map = BTreeMap::new();
                        map.insert(format!("w{writer}"), i);
                        write_json(&path, &map).unwrap();
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }

        let back: Option<BTreeMap<String, u32>> = read_json(&path).unwrap();
        assert_eq!(back.unwrap().values().copied().collect::<Vec<_>>(), vec![99]);
        let entries = std::fs::read_dir(dir.path()).unwrap().count();
        assert_eq!(entries, 1);
    }

    #[test]
    fn invalid_json_is_a_decode_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("bad.json");
        std::fs::write(&path, b"{not json").unwrap();
        let result: Result<Option<BTreeMap<String, u32>>, _> = read_json(&path);
        assert!(matches!(result, Err(StoreError::DecodeJson { .. })));
    }
}
