//! JSON-file store, one file per (ingredient, region).
//!
//! Writes go to a temporary sibling and are renamed into place, so readers
//! never see a half-written record. Merges are serialized per key within the
//! process.

use async_trait::async_trait;
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use super::locks::KeyLocks;
use super::{ConversionKey, ConversionRecord, ConversionStore, StoreError};

#[derive(Debug)]
pub struct DiskStore {
    dir: PathBuf,
    locks: KeyLocks,
}

impl DiskStore {
    pub fn new(dir: PathBuf) -> Self {
        Self {
            dir,
            locks: KeyLocks::new(),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Format: {region}/{hash[0:2]}/{slug}-{hash[0:16]}.json
    fn path_for(&self, key: &ConversionKey) -> PathBuf {
        let hash = hex::encode(Sha256::digest(key.ingredient().as_bytes()));
        let slug: String = key
            .ingredient()
            .chars()
            .map(|c| if c.is_alphanumeric() { c } else { '-' })
            .take(64)
            .collect();

        self.dir
            .join(key.region().as_str().to_lowercase())
            .join(&hash[..2])
            .join(format!("{}-{}.json", slug, &hash[..16]))
    }
}

fn read_record(path: &Path) -> Result<Option<ConversionRecord>, StoreError> {
    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e.into()),
    };
    serde_json::from_str(&content)
        .map(Some)
        .map_err(|source| StoreError::Corrupt {
            path: path.to_path_buf(),
            source,
        })
}

fn write_record(path: &Path, record: &ConversionRecord) -> Result<(), StoreError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    let json = serde_json::to_string_pretty(record)
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;

    let tmp = path.with_extension(format!("json.{}.tmp", uuid::Uuid::new_v4().simple()));
    fs::write(&tmp, json)?;
    if let Err(e) = fs::rename(&tmp, path) {
        let _ = fs::remove_file(&tmp);
        return Err(e.into());
    }
    Ok(())
}

async fn blocking<T, F>(f: F) -> Result<T, StoreError>
where
    F: FnOnce() -> Result<T, StoreError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| StoreError::Unavailable(format!("store task failed: {}", e)))?
}

#[async_trait]
impl ConversionStore for DiskStore {
    async fn get(&self, key: &ConversionKey) -> Result<Option<ConversionRecord>, StoreError> {
        let path = self.path_for(key);
        blocking(move || read_record(&path)).await
    }

    async fn merge(
        &self,
        key: &ConversionKey,
        units: &BTreeMap<String, f64>,
    ) -> Result<ConversionRecord, StoreError> {
        let _guard = self.locks.lock(key).await;

        let path = self.path_for(key);
        let key = key.clone();
        let units = units.clone();
        blocking(move || {
            let mut record = read_record(&path)?.unwrap_or_else(|| ConversionRecord::empty(&key));
            if record.merge(&units) || !path.exists() {
                write_record(&path, &record)?;
                tracing::debug!(key = %key, path = %path.display(), "Wrote conversion record");
            }
            Ok(record)
        })
        .await
    }

    fn backend_name(&self) -> &'static str {
        "disk"
    }
}
