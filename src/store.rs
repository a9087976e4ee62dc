//! Append-only JSON-array collections, one file per collection.
//!
//! Every collection is a single JSON array on disk. Reads return the raw JSON
//! values without schema checks, so records of an older shape are passed through
//! as-is. Writes are serialized per collection and land via temp file + rename.

use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;
use tracing::{debug, error};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Collection {
    Videos,
    Ads,
}

impl Collection {
    pub const ALL: [Collection; 2] = [Collection::Videos, Collection::Ads];

    pub fn name(self) -> &'static str {
        match self {
            Collection::Videos => "videos",
            Collection::Ads => "ads",
        }
    }

    pub fn file_name(self) -> &'static str {
        match self {
            Collection::Videos => "videos_db.json",
            Collection::Ads => "ads_db.json",
        }
    }
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("collection {collection} is malformed: {reason}")]
    Malformed {
        collection: Collection,
        reason: String,
    },
    #[error("failed to serialize collection {collection}: {source}")]
    Serialize {
        collection: Collection,
        source: serde_json::Error,
    },
    #[error("i/o error on collection {collection}: {source}")]
    Io {
        collection: Collection,
        source: std::io::Error,
    },
}

pub struct FlatFileStore {
    data_dir: PathBuf,
    write_locks: HashMap<Collection, Mutex<()>>,
}

impl FlatFileStore {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        let write_locks = Collection::ALL
            .into_iter()
            .map(|c| (c, Mutex::new(())))
            .collect();
        Self {
            data_dir: data_dir.into(),
            write_locks,
        }
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    pub fn path(&self, collection: Collection) -> PathBuf {
        self.data_dir.join(collection.file_name())
    }

    /// Read a collection. A missing file is an empty collection.
    pub async fn load(&self, collection: Collection) -> Result<Vec<Value>, StoreError> {
        let path = self.path(collection);
        let content = match tokio::fs::read(&path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(source) => return Err(StoreError::Io { collection, source }),
        };

        let value: Value =
            serde_json::from_slice(&content).map_err(|e| StoreError::Malformed {
                collection,
                reason: e.to_string(),
            })?;

        match value {
            Value::Array(records) => Ok(records),
            other => Err(StoreError::Malformed {
                collection,
                reason: format!("expected a JSON array, found {}", json_kind(&other)),
            }),
        }
    }

    /// Write an empty array for every collection that has no file yet.
    pub async fn ensure_collections(&self) -> Result<(), StoreError> {
        for collection in Collection::ALL {
            match tokio::fs::try_exists(self.path(collection)).await {
                Ok(true) => {}
                Ok(false) => self.save(collection, &[]).await?,
                Err(source) => return Err(StoreError::Io { collection, source }),
            }
        }
        Ok(())
    }

    /// Overwrite a collection with `records`.
    pub async fn save(&self, collection: Collection, records: &[Value]) -> Result<(), StoreError> {
        let _guard = self.write_locks[&collection].lock().await;
        self.write_unlocked(collection, records).await
    }

    /// Append one record, holding the collection's write lock across the
    /// read-modify-write so concurrent appends never drop each other.
    pub async fn append<T: Serialize>(
        &self,
        collection: Collection,
        record: &T,
    ) -> Result<(), StoreError> {
        let record = serde_json::to_value(record)
            .map_err(|source| StoreError::Serialize { collection, source })?;

        let _guard = self.write_locks[&collection].lock().await;
        let mut records = self.load(collection).await?;
        records.push(record);
        self.write_unlocked(collection, &records).await?;

        debug!(
            "[store] appended to {} ({} records)",
            collection,
            records.len()
        );
        Ok(())
    }

    async fn write_unlocked(
        &self,
        collection: Collection,
        records: &[Value],
    ) -> Result<(), StoreError> {
        let io_err = |source: std::io::Error| StoreError::Io { collection, source };

        let body = serde_json::to_vec(records)
            .map_err(|source| StoreError::Serialize { collection, source })?;

        tokio::fs::create_dir_all(&self.data_dir)
            .await
            .map_err(io_err)?;

        let path = self.path(collection);
        let tmp_path = self
            .data_dir
            .join(format!(".{}.tmp", collection.file_name()));

        tokio::fs::write(&tmp_path, body).await.map_err(io_err)?;
        if let Err(e) = tokio::fs::rename(&tmp_path, &path).await {
            error!("[store] failed to replace {:?}: {}", path, e);
            let _ = tokio::fs::remove_file(&tmp_path).await;
            return Err(io_err(e));
        }
        Ok(())
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::VideoRecord;
    use serde_json::json;
    use std::sync::Arc;
    use tempfile::TempDir;

    #[tokio::test]
    async fn missing_file_loads_as_empty() {
        let temp_dir = TempDir::new().unwrap();
        let store = FlatFileStore::new(temp_dir.path());

        assert!(store.load(Collection::Videos).await.unwrap().is_empty());
        assert!(store.load(Collection::Ads).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn appends_keep_order() {
        let temp_dir = TempDir::new().unwrap();
        let store = FlatFileStore::new(temp_dir.path());

        for n in 0..5 {
            store
                .append(Collection::Ads, &format!("https://cdn.example/{}.mp4", n))
                .await
                .unwrap();
        }

        let ads = store.load(Collection::Ads).await.unwrap();
        assert_eq!(ads.len(), 5);
        for (n, ad) in ads.iter().enumerate() {
            assert_eq!(ad, &json!(format!("https://cdn.example/{}.mp4", n)));
        }
    }

    #[tokio::test]
    async fn collections_are_separate_files() {
        let temp_dir = TempDir::new().unwrap();
        let store = FlatFileStore::new(temp_dir.path());

        let record = VideoRecord {
            title: "clip.mp4".to_string(),
            url: "https://cdn.example/clip.mp4".to_string(),
            thumbnails: vec!["a".into(), "b".into(), "c".into()],
        };
        store.append(Collection::Videos, &record).await.unwrap();

        assert!(temp_dir.path().join("videos_db.json").exists());
        assert!(!temp_dir.path().join("ads_db.json").exists());
        assert!(store.load(Collection::Ads).await.unwrap().is_empty());

        let videos = store.load(Collection::Videos).await.unwrap();
        let stored: VideoRecord = serde_json::from_value(videos[0].clone()).unwrap();
        assert_eq!(stored, record);
    }

    #[tokio::test]
    async fn save_then_load_round_trips() {
        let temp_dir = TempDir::new().unwrap();
        let store = FlatFileStore::new(temp_dir.path());

        store.save(Collection::Videos, &[]).await.unwrap();
        assert_eq!(store.load(Collection::Videos).await.unwrap(), Vec::<Value>::new());

        let records = vec![
            json!({ "title": "a.mp4", "url": "u", "thumbnails": ["1", "2", "3"] }),
            json!("legacy-shape"),
            json!({ "nested": { "n": 1.5, "ok": true, "none": null } }),
        ];
        store.save(Collection::Videos, &records).await.unwrap();
        assert_eq!(store.load(Collection::Videos).await.unwrap(), records);
    }

    #[tokio::test]
    async fn invalid_json_is_malformed() {
        let temp_dir = TempDir::new().unwrap();
        std::fs::write(temp_dir.path().join("videos_db.json"), b"[{\"title\":").unwrap();
        let store = FlatFileStore::new(temp_dir.path());

        let err = store.load(Collection::Videos).await.unwrap_err();
        assert!(matches!(
            err,
            StoreError::Malformed {
                collection: Collection::Videos,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn non_array_is_malformed_and_append_refuses() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("ads_db.json");
        std::fs::write(&path, br#"{"ads": []}"#).unwrap();
        let store = FlatFileStore::new(temp_dir.path());

        let err = store.load(Collection::Ads).await.unwrap_err();
        assert!(err.to_string().contains("expected a JSON array, found an object"));

        assert!(store.append(Collection::Ads, &"url").await.is_err());
        // The corrupt file is left untouched for manual repair.
        assert_eq!(std::fs::read(&path).unwrap(), br#"{"ads": []}"#);
    }

    #[tokio::test]
    async fn unserializable_record_is_a_serialize_error() {
        let temp_dir = TempDir::new().unwrap();
        let store = FlatFileStore::new(temp_dir.path());
        let record: HashMap<(u8, u8), u8> = [((1, 2), 3)].into_iter().collect();

        let err = store.append(Collection::Videos, &record).await.unwrap_err();
        assert!(matches!(
            err,
            StoreError::Serialize {
                collection: Collection::Videos,
                ..
            }
        ));
        assert!(!temp_dir.path().join("videos_db.json").exists());
    }

    #[tokio::test]
    async fn concurrent_appends_all_land() {
        let temp_dir = TempDir::new().unwrap();
        let store = Arc::new(FlatFileStore::new(temp_dir.path()));

        let tasks = (0..16).map(|n| {
            let store = store.clone();
            tokio::spawn(async move {
                store
                    .append(Collection::Ads, &format!("https://cdn.example/{}.mp4", n))
                    .await
            })
        });
        for result in futures::future::join_all(tasks).await {
            result.unwrap().unwrap();
        }

        let ads = store.load(Collection::Ads).await.unwrap();
        assert_eq!(ads.len(), 16);
        for n in 0..16 {
            assert!(ads.contains(&json!(format!("https://cdn.example/{}.mp4", n))));
        }
    }

    #[tokio::test]
    async fn ensure_collections_seeds_missing_files_only() {
        let temp_dir = TempDir::new().unwrap();
        let store = FlatFileStore::new(temp_dir.path());
        store.append(Collection::Ads, &"https://cdn.example/ad.mp4").await.unwrap();

        store.ensure_collections().await.unwrap();

        assert_eq!(
            std::fs::read_to_string(temp_dir.path().join("videos_db.json")).unwrap(),
            "[]"
        );
        assert_eq!(
            store.load(Collection::Ads).await.unwrap(),
            vec![json!("https://cdn.example/ad.mp4")]
        );
    }

    #[tokio::test]
    async fn creates_data_dir_on_first_write() {
        let temp_dir = TempDir::new().unwrap();
        let data_dir = temp_dir.path().join("nested").join("data");
        let store = FlatFileStore::new(&data_dir);

        store.append(Collection::Ads, &"url").await.unwrap();
        assert!(data_dir.join("ads_db.json").exists());
    }
}
