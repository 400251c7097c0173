use std::fs;
use std::path::{Path, PathBuf};

use serde_json::Value;

/// Destination for serialized reports.
pub trait OutputSink: Send + Sync {
    fn write(&self, data: &Value, path: &Path) -> Result<(), PersistenceError>;
}

/// Writes pretty-printed JSON, creating parent directories on demand.
#[derive(Debug, Default, Clone, Copy)]
pub struct JsonFileSink;

impl OutputSink for JsonFileSink {
    fn write(&self, data: &Value, path: &Path) -> Result<(), PersistenceError> {
        let wrap = |source| PersistenceError::Io {
            path: path.to_path_buf(),
            source,
        };

        if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(wrap)?;
        }

        let body = serde_json::to_string_pretty(data).map_err(|source| {
            PersistenceError::Encode {
                path: path.to_path_buf(),
                source,
            }
        })?;
        fs::write(path, body).map_err(wrap)
    }
}

/// Failure to persist a report, always naming the target path.
#[derive(Debug, thiserror::Error)]
pub enum PersistenceError {
    #[error("failed to write output to {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to write output to {}: {source}", path.display())]
    Encode {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

impl PersistenceError {
    pub fn path(&self) -> &Path {
        match self {
            Self::Io { path, .. } | Self::Encode { path, .. } => path,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn writes_pretty_json_and_creates_parents() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("nested").join("out.json");

        JsonFileSink
            .write(&json!({ "foo": "bar" }), &path)
            .expect("write succeeds");

        let saved: Value =
            serde_json::from_str(&fs::read_to_string(&path).expect("readable")).expect("json");
        assert_eq!(saved, json!({ "foo": "bar" }));
    }

    #[test]
    fn write_failure_names_the_target_path() {
        let dir = tempfile::tempdir().expect("tempdir");
        let blocker = dir.path().join("blocker");
        fs::write(&blocker, "file, not a directory").expect("write blocker");
        let path = blocker.join("out.json");

        let error = JsonFileSink
            .write(&json!({ "foo": "bar" }), &path)
            .expect_err("parent is a file");

        assert_eq!(error.path(), path.as_path());
        assert!(error
            .to_string()
            .starts_with(&format!("failed to write output to {}", path.display())));
    }
}
