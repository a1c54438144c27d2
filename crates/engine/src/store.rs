//! Key-value preference persistence.
//!
//! Values are opaque strings; callers own their encoding. The file-backed
//! store keeps everything in one JSON object and rewrites the whole file on
//! each mutation, so a stored list is always the list as last saved.

use anyhow::{Context, Result};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

pub trait KvStore {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&mut self, key: &str, value: &str) -> Result<()>;
    fn remove(&mut self, key: &str) -> Result<()>;
}

/// JSON-file store under the user's config directory.
pub struct FileStore {
    path: PathBuf,
    values: BTreeMap<String, String>,
}

impl FileStore {
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let values = match fs::read_to_string(&path) {
            Ok(raw) => match serde_json::from_str(&raw) {
                Ok(values) => values,
                Err(err) => {
                    tracing::warn!(%err, path = %path.display(), "preference file unreadable, starting fresh");
                    BTreeMap::new()
                }
            },
            Err(_) => BTreeMap::new(),
        };
        Self { path, values }
    }

    pub fn open_default() -> Self {
        let path = directories::ProjectDirs::from("com.local", "Guro", "Guro")
            .map(|dirs| dirs.config_dir().join("preferences.json"))
            .unwrap_or_else(|| PathBuf::from("./guro-preferences.json"));
        Self::open(path)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn persist(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("creating {}", parent.display()))?;
        }
        let json = serde_json::to_string_pretty(&self.values)?;
        // Write-then-rename so a crash mid-write cannot truncate the file.
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, json).with_context(|| format!("writing {}", tmp.display()))?;
        fs::rename(&tmp, &self.path)
            .with_context(|| format!("replacing {}", self.path.display()))?;
        Ok(())
    }
}

impl KvStore for FileStore {
    fn get(&self, key: &str) -> Option<String> {
        self.values.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: &str) -> Result<()> {
        self.values.insert(key.to_string(), value.to_string());
        self.persist()
    }

    fn remove(&mut self, key: &str) -> Result<()> {
        if self.values.remove(key).is_some() {
            self.persist()?;
        }
        Ok(())
    }
}

/// In-memory store for tests and ephemeral runs.
#[derive(Default)]
pub struct MemoryStore {
    values: BTreeMap<String, String>,
}

impl KvStore for MemoryStore {
    fn get(&self, key: &str) -> Option<String> {
        self.values.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: &str) -> Result<()> {
        self.values.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<()> {
        self.values.remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_store_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("prefs.json");

        let mut store = FileStore::open(&path);
        store.set("guro-theme", "light").unwrap();
        store.set("guro-accent-color", "blue").unwrap();

        let reopened = FileStore::open(&path);
        assert_eq!(reopened.get("guro-theme").as_deref(), Some("light"));
        assert_eq!(reopened.get("guro-accent-color").as_deref(), Some("blue"));
    }

    #[test]
    fn test_file_store_remove_persists() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("prefs.json");

        let mut store = FileStore::open(&path);
        store.set("k", "v").unwrap();
        store.remove("k").unwrap();

        let reopened = FileStore::open(&path);
        assert_eq!(reopened.get("k"), None);
    }

    #[test]
    fn test_corrupt_file_starts_fresh() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("prefs.json");
        fs::write(&path, "not json at all").unwrap();

        let store = FileStore::open(&path);
        assert_eq!(store.get("anything"), None);
    }

    #[test]
    fn test_memory_store() {
        let mut store = MemoryStore::default();
        assert_eq!(store.get("a"), None);
        store.set("a", "1").unwrap();
        assert_eq!(store.get("a").as_deref(), Some("1"));
        store.remove("a").unwrap();
        assert_eq!(store.get("a"), None);
    }
}
