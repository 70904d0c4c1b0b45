//! JSON document persistence.
//!
//! Documents are small and fully rewritten on every change. Writes go to a
//! temp file in the target directory which is then renamed over the old
//! document, so readers never see a half-written file.
//!
//! Loading never fails: a missing document is silently empty, an unreadable
//! or corrupt one is logged and treated as empty.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::Serialize;
use tempfile::NamedTempFile;
use thiserror::Error;
use tracing::{trace, warn};

/// Errors from writing a persisted document.
#[derive(Debug, Error)]
pub enum PersistError {
    #[error("{context} ({path}): {source}")]
    Io {
        context: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to serialize {path}: {source}")]
    Serialize {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Atomically replaces `path` with the pretty-printed JSON of `value`.
pub fn save_json<T: Serialize>(path: &Path, value: &T) -> Result<(), PersistError> {
    let io_err = |context: &'static str| {
        let path = path.to_path_buf();
        move |source| PersistError::Io {
            context,
            path,
            source,
        }
    };

    let content = serde_json::to_string_pretty(value).map_err(|source| PersistError::Serialize {
        path: path.to_path_buf(),
        source,
    })?;

    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    fs::create_dir_all(dir).map_err(io_err("Failed to create directory"))?;

    let mut tmp = NamedTempFile::new_in(dir).map_err(io_err("Failed to create temp file"))?;
    tmp.write_all(content.as_bytes())
        .map_err(io_err("Failed to write temp file"))?;
    tmp.flush().map_err(io_err("Failed to flush temp file"))?;
    tmp.persist(path)
        .map_err(|e| io_err("Failed to persist file")(e.error))?;

    trace!(path = %path.display(), bytes = content.len(), "Document saved");
    Ok(())
}

/// Loads a document, or `None` if it is missing, empty or corrupt.
pub fn load_json<T: DeserializeOwned>(path: &Path) -> Option<T> {
    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return None,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "Failed to read document, starting empty");
            return None;
        }
    };

    if content.trim().is_empty() {
        warn!(path = %path.display(), "Empty document, starting empty");
        return None;
    }

    match serde_json::from_str(&content) {
        Ok(value) => Some(value),
        Err(e) => {
            warn!(path = %path.display(), error = %e, "Corrupt document, starting empty");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use tempfile::TempDir;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Doc {
        items: Vec<String>,
    }

    #[test]
    fn test_save_then_load() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("doc.json");
        let doc = Doc {
            items: vec!["a".into(), "b".into()],
        };

        save_json(&path, &doc).unwrap();
        let text = fs::read_to_string(&path).unwrap();
        assert!(text.contains('\n'), "pretty-printed");
        assert_eq!(load_json::<Doc>(&path), Some(doc));
    }

    #[test]
    fn test_save_replaces_whole_document() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("doc.json");
        save_json(&path, &Doc { items: vec!["old".into(); 10] }).unwrap();
        save_json(&path, &Doc { items: vec![] }).unwrap();
        assert_eq!(load_json::<Doc>(&path), Some(Doc { items: vec![] }));
        // Only the document remains, no temp files.
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[test]
    fn test_load_missing_empty_corrupt() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("doc.json");
        assert_eq!(load_json::<Doc>(&path), None);

        fs::write(&path, "  \n").unwrap();
        assert_eq!(load_json::<Doc>(&path), None);

        fs::write(&path, "{\"items\": [").unwrap();
        assert_eq!(load_json::<Doc>(&path), None);

        fs::write(&path, "{\"other\": 1}").unwrap();
        assert_eq!(load_json::<Doc>(&path), None);
    }
}
