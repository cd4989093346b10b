use std::path::{Path, PathBuf};

use tokio::sync::Mutex;
use tracing::debug;

use crate::error::LabelError;
use crate::record::{LabelRecord, NewLabel, sanitize_world};

/// Append-only label storage, one pretty-printed JSON array per world under
/// `root` (`labels-<world>.json`).
pub struct FileLabelStore {
    root: PathBuf,
    lock: Mutex<()>,
}

impl FileLabelStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            lock: Mutex::new(()),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn path_for(&self, world: &str) -> PathBuf {
        self.root.join(format!("labels-{}.json", sanitize_world(world)))
    }

    /// Labels for `world` in insertion order; empty if none were stored.
    pub async fn list(&self, world: &str) -> Result<Vec<LabelRecord>, LabelError> {
        let _g = self.lock.lock().await;
        self.load_unlocked(&self.path_for(world)).await
    }

    /// Store `label` stamped with `ts` and return the new count.
    pub async fn append(&self, world: &str, label: NewLabel, ts: i64) -> Result<usize, LabelError> {
        let _g = self.lock.lock().await;
        let path = self.path_for(world);
        let mut items = self.load_unlocked(&path).await?;
        items.push(label.into_record(ts));
        self.save_unlocked(&path, &items).await?;
        debug!("stored label {} in {}", items.len(), path.display());
        Ok(items.len())
    }

    async fn load_unlocked(&self, path: &Path) -> Result<Vec<LabelRecord>, LabelError> {
        match tokio::fs::read_to_string(path).await {
            Ok(s) => Ok(serde_json::from_str(&s)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Vec::new()),
            Err(e) => Err(e.into()),
        }
    }

    async fn save_unlocked(&self, path: &Path, items: &[LabelRecord]) -> Result<(), LabelError> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let tmp = path.with_extension("json.tmp");
        tokio::fs::write(&tmp, serde_json::to_string_pretty(items)?).await?;
        tokio::fs::rename(&tmp, path).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[tokio::test]
    async fn missing_file_reads_as_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileLabelStore::new(dir.path());
        assert_eq!(store.list("earth").await.unwrap(), Vec::new());
    }

    #[tokio::test]
    async fn append_persists_in_order_per_world() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileLabelStore::new(dir.path().join("data"));

        assert_eq!(store.append("Earth", NewLabel::new(1.0, 2.0, "a"), 10).await.unwrap(), 1);
        assert_eq!(store.append("earth", NewLabel::new(3.0, 4.0, "b"), 11).await.unwrap(), 2);
        assert_eq!(store.append("mars", NewLabel::new(5.0, 6.0, "c"), 12).await.unwrap(), 1);

        let earth = store.list("earth").await.unwrap();
        let titles: Vec<&str> = earth.iter().map(|l| l.title.as_str()).collect();
        assert_eq!(titles, vec!["a", "b"]);
        assert_eq!(earth[1].ts, 11);

        let reopened = FileLabelStore::new(dir.path().join("data"));
        assert_eq!(reopened.list("mars").await.unwrap().len(), 1);
        assert!(store.path_for("mars").ends_with("labels-mars.json"));
    }

    #[tokio::test]
    async fn world_key_cannot_escape_root() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileLabelStore::new(dir.path());
        store.append("../outside", NewLabel::default(), 1).await.unwrap();
        assert!(dir.path().join("labels-outside.json").exists());
    }

    #[tokio::test]
    async fn corrupt_file_is_a_decode_error() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileLabelStore::new(dir.path());
        std::fs::write(store.path_for("earth"), "{not json").unwrap();
        assert!(matches!(store.list("earth").await, Err(LabelError::Decode(_))));
    }
}
