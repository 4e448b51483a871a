//! Per-owner archive of recipes inferred from photos of baked products.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;
use uuid::Uuid;

use crate::types::BakedRecipe;

/// Bound on a single archive read or write.
pub const DEFAULT_ARCHIVE_TIMEOUT: Duration = Duration::from_secs(3);

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArchivedRecipe {
    pub id: Uuid,
    pub owner: String,
    pub image_url: String,
    pub recipe: BakedRecipe,
    pub created_at: DateTime<Utc>,
}

/// Disk-backed archive: `{dir}/{owner-slug}-{sha256(owner)[0:16]}/{id}.json`.
#[derive(Debug, Clone)]
pub struct RecipeArchive {
    dir: PathBuf,
    timeout: Duration,
}

impl RecipeArchive {
    pub fn new(dir: PathBuf) -> Self {
        Self {
            dir,
            timeout: DEFAULT_ARCHIVE_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn owner_dir(&self, owner: &str) -> PathBuf {
        self.dir.join(owner_dir_name(owner))
    }

    async fn blocking<T, F>(&self, f: F) -> io::Result<T>
    where
        F: FnOnce() -> io::Result<T> + Send + 'static,
        T: Send + 'static,
    {
        match tokio::time::timeout(self.timeout, tokio::task::spawn_blocking(f)).await {
            Ok(Ok(result)) => result,
            Ok(Err(e)) => Err(io::Error::other(format!("archive task failed: {}", e))),
            Err(_) => Err(io::Error::new(
                io::ErrorKind::TimedOut,
                format!("archive timed out after {}ms", self.timeout.as_millis()),
            )),
        }
    }

    pub async fn save(
        &self,
        owner: &str,
        image_url: &str,
        recipe: &BakedRecipe,
    ) -> io::Result<ArchivedRecipe> {
        let owner = owner.trim();
        let entry = ArchivedRecipe {
            id: Uuid::new_v4(),
            owner: owner.to_string(),
            image_url: image_url.to_string(),
            recipe: recipe.clone(),
            created_at: Utc::now(),
        };

        let path = self.owner_dir(owner).join(format!("{}.json", entry.id));
        let to_write = entry.clone();
        self.blocking(move || write_entry(&path, &to_write)).await?;
        Ok(entry)
    }

    /// All recipes archived for `owner`, newest first. Unreadable entries are skipped.
    pub async fn list(&self, owner: &str) -> io::Result<Vec<ArchivedRecipe>> {
        let owner = owner.trim().to_string();
        let dir = self.owner_dir(&owner);
        self.blocking(move || read_entries(&dir, &owner)).await
    }
}

fn write_entry(path: &Path, entry: &ArchivedRecipe) -> io::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    let json = serde_json::to_string_pretty(entry)
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;

    let tmp = path.with_extension("json.tmp");
    fs::write(&tmp, json)?;
    if let Err(e) = fs::rename(&tmp, path) {
        let _ = fs::remove_file(&tmp);
        return Err(e);
    }
    Ok(())
}

fn read_entries(dir: &Path, owner: &str) -> io::Result<Vec<ArchivedRecipe>> {
    if !dir.exists() {
        return Ok(Vec::new());
    }

    let mut entries = Vec::new();
    for entry in fs::read_dir(dir)?.filter_map(|e| e.ok()) {
        let path = entry.path();
        if path.extension().and_then(|ext| ext.to_str()) != Some("json") {
            continue;
        }
        match fs::read_to_string(&path)
            .ok()
            .and_then(|content| serde_json::from_str::<ArchivedRecipe>(&content).ok())
        {
            Some(recipe) if recipe.owner == owner => entries.push(recipe),
            Some(recipe) => tracing::warn!(
                path = %path.display(),
                stored_owner = %recipe.owner,
                "Skipping archived recipe of another owner"
            ),
            None => tracing::warn!(path = %path.display(), "Skipping unreadable archived recipe"),
        }
    }

    entries.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    Ok(entries)
}

/// Readable slug plus a hash of the exact owner, so owners that slug alike
/// still get separate directories.
fn owner_dir_name(owner: &str) -> String {
    let hash = hex::encode(Sha256::digest(owner.as_bytes()));
    let slug: String = owner
        .chars()
        .map(|c| {
            if c.is_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .take(64)
        .collect();
    format!("{}-{}", slug, &hash[..16])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::RecipeIngredient;
    use tempfile::TempDir;

    fn recipe(name: &str) -> BakedRecipe {
        BakedRecipe {
            name: name.to_string(),
            description: None,
            ingredients: vec![RecipeIngredient {
                ingredient: "flour".to_string(),
                quantity: "2".to_string(),
                unit: "cups".to_string(),
                notes: None,
            }],
            steps: vec!["Mix.".to_string(), "Bake.".to_string()],
        }
    }

    #[tokio::test]
    async fn test_save_and_list() {
        let temp = TempDir::new().unwrap();
        let archive = RecipeArchive::new(temp.path().to_path_buf());

        archive.save("alice", "https://img/1.jpg", &recipe("Banana bread")).await.unwrap();
        archive.save("alice", "https://img/2.jpg", &recipe("Scones")).await.unwrap();
        archive.save("bob", "https://img/3.jpg", &recipe("Focaccia")).await.unwrap();

        let alice = archive.list("alice").await.unwrap();
        assert_eq!(alice.len(), 2);
        assert!(alice.iter().all(|r| r.owner == "alice"));
        assert_eq!(archive.list(" bob ").await.unwrap().len(), 1);
        assert!(archive.list("carol").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_similar_owners_stay_separate() {
        let temp = TempDir::new().unwrap();
        let archive = RecipeArchive::new(temp.path().to_path_buf());

        archive
            .save("alice.smith", "https://img/1.jpg", &recipe("Brioche"))
            .await
            .unwrap();

        assert!(archive.list("alice_smith").await.unwrap().is_empty());
        let own = archive.list("alice.smith").await.unwrap();
        assert_eq!(own.len(), 1);
        assert_eq!(own[0].owner, "alice.smith");
    }

    #[tokio::test]
    async fn test_foreign_entry_in_owner_dir_is_skipped() {
        let temp = TempDir::new().unwrap();
        let archive = RecipeArchive::new(temp.path().to_path_buf());

        let theirs = archive.save("mallory", "https://img/1.jpg", &recipe("Tart")).await.unwrap();
        let src = archive.owner_dir("mallory").join(format!("{}.json", theirs.id));
        let dest_dir = archive.owner_dir("alice");
        fs::create_dir_all(&dest_dir).unwrap();
        fs::copy(&src, dest_dir.join("planted.json")).unwrap();

        assert!(archive.list("alice").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_owner_cannot_escape_dir() {
        let name = owner_dir_name("../../etc");
        assert!(name.starts_with("______etc-"));
        assert!(!name.contains('/'));

        let temp = TempDir::new().unwrap();
        let archive = RecipeArchive::new(temp.path().to_path_buf());
        archive.save("../x", "https://img/1.jpg", &recipe("Pie")).await.unwrap();

        let dirs: Vec<_> = fs::read_dir(temp.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        assert_eq!(dirs.len(), 1);
        assert!(dirs[0].starts_with("___x-"));
        assert_eq!(archive.list("../x").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_no_temp_files_left_behind() {
        let temp = TempDir::new().unwrap();
        let archive = RecipeArchive::new(temp.path().to_path_buf());
        let entry = archive.save("alice", "https://img/1.jpg", &recipe("Pie")).await.unwrap();

        let names: Vec<_> = fs::read_dir(archive.owner_dir("alice"))
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec![format!("{}.json", entry.id)]);
    }
}
