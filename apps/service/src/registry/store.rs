use serde::{Deserialize, Serialize};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::monitoring::types::Target;
use crate::validation::{UrlRejection, validate_http_endpoint};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("failed to read targets file {path}: {source}")]
    Read { path: PathBuf, source: std::io::Error },
    #[error("failed to parse targets file {path}: {source}")]
    Parse { path: PathBuf, source: serde_json::Error },
    #[error("stored target '{id}' has an invalid URL: {reason}")]
    InvalidStoredTarget { id: String, reason: UrlRejection },
    #[error("failed to serialize targets: {0}")]
    Serialize(#[from] serde_json::Error),
    #[error("failed to write targets file {path}: {source}")]
    Write { path: PathBuf, source: std::io::Error },
}

/// On-disk shape of a target
#[derive(Debug, Serialize, Deserialize)]
struct StoredTarget {
    id: String,
    url: String,
}

/// JSON file holding the full registry, rewritten on every mutation
#[derive(Debug, Clone)]
pub struct TargetStore {
    path: PathBuf,
}

impl TargetStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load stored targets; a missing file means an empty set
    pub async fn load(&self) -> Result<Vec<Target>, StoreError> {
        let raw = match tokio::fs::read_to_string(&self.path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(source) => return Err(StoreError::Read { path: self.path.clone(), source }),
        };

        let stored: Vec<StoredTarget> = serde_json::from_str(&raw)
            .map_err(|source| StoreError::Parse { path: self.path.clone(), source })?;

        stored
            .into_iter()
            .map(|StoredTarget { id, url }| match validate_http_endpoint(&url) {
                Ok(url) => Ok(Target { id, url }),
                Err(reason) => Err(StoreError::InvalidStoredTarget { id, reason }),
            })
            .collect()
    }

    /// Replace the file contents with `targets`
    ///
    /// Written to a sibling temp file first and renamed into place, so a failed
    /// write never leaves a truncated file behind.
    pub async fn save<'a>(
        &self,
        targets: impl IntoIterator<Item = &'a Target>,
    ) -> Result<(), StoreError> {
        let stored: Vec<StoredTarget> = targets
            .into_iter()
            .map(|t| StoredTarget { id: t.id.clone(), url: t.url.to_string() })
            .collect();
        let data = serde_json::to_string_pretty(&stored)?;

        let write_err = |source| StoreError::Write { path: self.path.clone(), source };

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await.map_err(write_err)?;
        }

        let mut tmp = self.path.clone().into_os_string();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);

        tokio::fs::write(&tmp, data).await.map_err(write_err)?;
        tokio::fs::rename(&tmp, &self.path).await.map_err(write_err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_missing_file_is_empty() {
        let dir = tempdir().unwrap();
        let store = TargetStore::new(dir.path().join("targets.json"));

        assert!(store.load().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_save_then_load() {
        let dir = tempdir().unwrap();
        let store = TargetStore::new(dir.path().join("nested/targets.json"));
        let targets = vec![
            Target::parse("a", "https://a.example.test/health").unwrap(),
            Target::parse("b", "http://b.example.test:8080/").unwrap(),
        ];

        store.save(&targets).await.unwrap();

        assert_eq!(store.load().await.unwrap(), targets);
    }

    #[tokio::test]
    async fn test_file_layout() {
        let dir = tempdir().unwrap();
        let store = TargetStore::new(dir.path().join("targets.json"));
        store.save(&[Target::parse("a", "https://a.example.test/").unwrap()]).await.unwrap();

        let raw = std::fs::read_to_string(store.path()).unwrap();
        let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(value, serde_json::json!([{ "id": "a", "url": "https://a.example.test/" }]));
    }

    #[tokio::test]
    async fn test_invalid_stored_url_is_an_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("targets.json");
        std::fs::write(&path, r#"[{"id": "bad", "url": "ftp://example.test"}]"#).unwrap();

        let err = TargetStore::new(&path).load().await.unwrap_err();
        assert!(matches!(err, StoreError::InvalidStoredTarget { ref id, .. } if id == "bad"));
    }

    #[tokio::test]
    async fn test_garbage_file_is_a_parse_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("targets.json");
        std::fs::write(&path, "{ not json").unwrap();

        assert!(matches!(TargetStore::new(&path).load().await, Err(StoreError::Parse { .. })));
    }
}
