//! Filesystem-backed store for captured photos.
//!
//! Each photo is a blob `<id>.photo` plus a small JSON sidecar
//! `<id>.meta.json` holding its [`PhotoResource`] description. Blobs whose
//! sidecar is missing or unreadable are still enumerated (with the file's
//! modification time as capture time) so they stay collectable.

use crate::error::{StoreError, StoreResult};
use crate::types::{CacheStats, PhotoResource};
use chrono::{DateTime, Utc};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

const BLOB_EXT: &str = "photo";
const META_SUFFIX: &str = ".meta.json";

/// Owns the temporary photo blobs awaiting analysis.
#[derive(Debug, Clone)]
pub struct ResourceStore {
    root: PathBuf,
}

impl ResourceStore {
    /// Open (and create if needed) a store rooted at `root`.
    pub async fn open(root: impl Into<PathBuf>) -> StoreResult<Self> {
        let root = root.into();
        tokio::fs::create_dir_all(&root).await?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Store a freshly captured photo under a new random id.
    pub async fn create(&self, bytes: &[u8], created_at: DateTime<Utc>) -> StoreResult<PhotoResource> {
        let id = uuid::Uuid::new_v4().simple().to_string();
        self.create_with_id(&id, bytes, created_at).await
    }

    /// Store a photo under a caller-chosen id, replacing any previous blob with that id.
    pub async fn create_with_id(
        &self,
        id: &str,
        bytes: &[u8],
        created_at: DateTime<Utc>,
    ) -> StoreResult<PhotoResource> {
        validate_id(id)?;
        let resource = PhotoResource {
            id: id.to_string(),
            path: self.blob_path(id),
            created_at,
            size_bytes: bytes.len() as u64,
        };

        tokio::fs::write(&resource.path, bytes).await?;
        self.write_meta(&resource).await?;

        tracing::debug!(photo_id = id, size_bytes = resource.size_bytes, "Stored photo");
        Ok(resource)
    }

    /// Copy a photo file into the store. The capture time is now.
    pub async fn import(&self, src: &Path) -> StoreResult<PhotoResource> {
        let bytes = match tokio::fs::read(src).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(StoreError::SourceNotFound(src.to_path_buf()))
            }
            Err(e) => return Err(e.into()),
        };
        self.create(&bytes, Utc::now()).await
    }

    /// Look up a photo's description.
    pub async fn get(&self, id: &str) -> StoreResult<PhotoResource> {
        validate_id(id)?;
        let blob = self.blob_path(id);
        let meta = match tokio::fs::metadata(&blob).await {
            Ok(meta) => meta,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(StoreError::Missing(id.to_string()))
            }
            Err(e) => return Err(e.into()),
        };
        Ok(self.describe(id, blob, &meta).await)
    }

    /// Read a photo's bytes.
    pub async fn read(&self, id: &str) -> StoreResult<Vec<u8>> {
        validate_id(id)?;
        match tokio::fs::read(self.blob_path(id)).await {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == ErrorKind::NotFound => Err(StoreError::Missing(id.to_string())),
            Err(e) => Err(e.into()),
        }
    }

    /// Delete a photo. Idempotent: deleting an absent photo is not an error.
    ///
    /// Returns the number of bytes reclaimed, or `None` if nothing was there.
    pub async fn delete(&self, id: &str) -> StoreResult<Option<u64>> {
        validate_id(id)?;
        let blob = self.blob_path(id);

        let size = match tokio::fs::metadata(&blob).await {
            Ok(meta) => Some(meta.len()),
            Err(e) if e.kind() == ErrorKind::NotFound => None,
            Err(e) => return Err(e.into()),
        };

        remove_if_present(&blob).await?;
        remove_if_present(&self.meta_path(id)).await?;

        if size.is_some() {
            tracing::debug!(photo_id = id, "Deleted photo");
        }
        Ok(size)
    }

    /// Enumerate every photo in the store, ordered by capture time.
    pub async fn list(&self) -> StoreResult<Vec<PhotoResource>> {
        let mut photos = Vec::new();
        let mut entries = tokio::fs::read_dir(&self.root).await?;

        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some(BLOB_EXT) {
                continue;
            }
            let Some(id) = path.file_stem().and_then(|s| s.to_str()).map(str::to_string) else {
                continue;
            };
            if validate_id(&id).is_err() {
                continue;
            }
            // Blob may vanish between read_dir and metadata (concurrent delete)
            let meta = match entry.metadata().await {
                Ok(meta) if meta.is_file() => meta,
                _ => continue,
            };
            photos.push(self.describe(&id, path, &meta).await);
        }

        photos.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        Ok(photos)
    }

    /// Enumerate photos together with their age at `now`.
    pub async fn list_with_age(
        &self,
        now: DateTime<Utc>,
    ) -> StoreResult<Vec<(PhotoResource, chrono::Duration)>> {
        Ok(self
            .list()
            .await?
            .into_iter()
            .map(|p| {
                let age = p.age_at(now);
                (p, age)
            })
            .collect())
    }

    /// Total bytes held by the store.
    pub async fn total_size(&self) -> StoreResult<u64> {
        Ok(self.list().await?.iter().map(|p| p.size_bytes).sum())
    }

    /// Cache snapshot as of now.
    pub async fn stats(&self) -> StoreResult<CacheStats> {
        self.stats_at(Utc::now()).await
    }

    /// Cache snapshot as of `now`.
    pub async fn stats_at(&self, now: DateTime<Utc>) -> StoreResult<CacheStats> {
        let photos = self.list().await?;
        Ok(CacheStats {
            total_size_bytes: photos.iter().map(|p| p.size_bytes).sum(),
            photo_count: photos.len(),
            oldest_photo_age_hours: photos.first().map(|p| p.age_at(now).num_hours()),
        })
    }

    fn blob_path(&self, id: &str) -> PathBuf {
        self.root.join(format!("{id}.{BLOB_EXT}"))
    }

    fn meta_path(&self, id: &str) -> PathBuf {
        self.root.join(format!("{id}{META_SUFFIX}"))
    }

    async fn write_meta(&self, resource: &PhotoResource) -> StoreResult<()> {
        let json = serde_json::to_vec_pretty(resource).map_err(|source| StoreError::Metadata {
            id: resource.id.clone(),
            source,
        })?;
        let final_path = self.meta_path(&resource.id);
        let tmp_path = final_path.with_extension("json.tmp");
        tokio::fs::write(&tmp_path, json).await?;
        tokio::fs::rename(&tmp_path, &final_path).await?;
        Ok(())
    }

    /// Build a description from the sidecar, falling back to filesystem metadata.
    async fn describe(&self, id: &str, blob: PathBuf, meta: &std::fs::Metadata) -> PhotoResource {
        let size_bytes = meta.len();
        if let Ok(raw) = tokio::fs::read(self.meta_path(id)).await {
            match serde_json::from_slice::<PhotoResource>(&raw) {
                Ok(stored) => {
                    return PhotoResource {
                        path: blob,
                        size_bytes,
                        ..stored
                    }
                }
                Err(e) => tracing::warn!(photo_id = id, "Ignoring unreadable photo metadata: {e}"),
            }
        }

        let created_at = meta
            .modified()
            .map(DateTime::<Utc>::from)
            .unwrap_or_else(|_| Utc::now());
        PhotoResource {
            id: id.to_string(),
            path: blob,
            created_at,
            size_bytes,
        }
    }
}

async fn remove_if_present(path: &Path) -> std::io::Result<()> {
    match tokio::fs::remove_file(path).await {
        Err(e) if e.kind() != ErrorKind::NotFound => Err(e),
        _ => Ok(()),
    }
}

fn validate_id(id: &str) -> StoreResult<()> {
    let ok = !id.is_empty()
        && id.len() <= 128
        && id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
    if ok {
        Ok(())
    } else {
        Err(StoreError::InvalidId(id.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    async fn store() -> (tempfile::TempDir, ResourceStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = ResourceStore::open(dir.path().join("photos")).await.unwrap();
        (dir, store)
    }

    #[tokio::test]
    async fn test_create_read_get() {
        let (_dir, store) = store().await;
        let now = Utc::now();
        let photo = store.create_with_id("p1", b"jpegbytes", now).await.unwrap();

        assert_eq!(photo.size_bytes, 9);
        assert_eq!(store.read("p1").await.unwrap(), b"jpegbytes");

        let fetched = store.get("p1").await.unwrap();
        assert_eq!(fetched.created_at, now);
        assert_eq!(fetched.path, photo.path);
    }

    #[tokio::test]
    async fn test_create_assigns_unique_ids() {
        let (_dir, store) = store().await;
        let a = store.create(b"a", Utc::now()).await.unwrap();
        let b = store.create(b"b", Utc::now()).await.unwrap();
        assert_ne!(a.id, b.id);
        assert_eq!(store.list().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_delete_is_idempotent() {
        let (_dir, store) = store().await;
        store.create_with_id("p1", b"12345", Utc::now()).await.unwrap();

        assert_eq!(store.delete("p1").await.unwrap(), Some(5));
        assert_eq!(store.delete("p1").await.unwrap(), None);
        assert_eq!(store.delete("never-existed").await.unwrap(), None);

        assert!(store.list().await.unwrap().is_empty());
        assert!(matches!(store.read("p1").await, Err(StoreError::Missing(_))));
    }

    #[tokio::test]
    async fn test_rejects_path_traversal_ids() {
        let (_dir, store) = store().await;
        for bad in ["../etc/passwd", "a/b", "", "dot.dot"] {
            assert!(matches!(
                store.create_with_id(bad, b"x", Utc::now()).await,
                Err(StoreError::InvalidId(_))
            ));
            assert!(matches!(store.delete(bad).await, Err(StoreError::InvalidId(_))));
        }
    }

    #[tokio::test]
    async fn test_list_with_age_and_stats() {
        let (_dir, store) = store().await;
        let now = Utc::now();
        store
            .create_with_id("old", b"0123456789", now - Duration::hours(30))
            .await
            .unwrap();
        store
            .create_with_id("new", b"01234", now - Duration::hours(2))
            .await
            .unwrap();

        let aged = store.list_with_age(now).await.unwrap();
        assert_eq!(aged[0].0.id, "old");
        assert_eq!(aged[0].1, Duration::hours(30));
        assert_eq!(aged[1].1, Duration::hours(2));

        let stats = store.stats_at(now).await.unwrap();
        assert_eq!(stats.photo_count, 2);
        assert_eq!(stats.total_size_bytes, 15);
        assert_eq!(stats.oldest_photo_age_hours, Some(30));
        assert_eq!(store.total_size().await.unwrap(), 15);
    }

    #[tokio::test]
    async fn test_empty_store_stats() {
        let (_dir, store) = store().await;
        let stats = store.stats().await.unwrap();
        assert_eq!(stats, CacheStats::default());
    }

    #[tokio::test]
    async fn test_orphan_blob_without_metadata_is_listed() {
        let (_dir, store) = store().await;
        std::fs::write(store.root().join("orphan.photo"), b"abc").unwrap();
        std::fs::write(store.root().join("notes.txt"), b"ignored").unwrap();

        let photos = store.list().await.unwrap();
        assert_eq!(photos.len(), 1);
        assert_eq!(photos[0].id, "orphan");
        assert_eq!(photos[0].size_bytes, 3);
        assert_eq!(store.delete("orphan").await.unwrap(), Some(3));
    }

    #[tokio::test]
    async fn test_corrupt_metadata_falls_back_to_mtime() {
        let (_dir, store) = store().await;
        store.create_with_id("p1", b"abc", Utc::now() - Duration::days(3)).await.unwrap();
        std::fs::write(store.root().join("p1.meta.json"), b"{not json").unwrap();

        let photo = store.get("p1").await.unwrap();
        assert!(photo.age_at(Utc::now()) < Duration::hours(1));
    }

    #[tokio::test]
    async fn test_import_copies_file() {
        let (dir, store) = store().await;
        let src = dir.path().join("capture.jpg");
        std::fs::write(&src, b"\xFF\xD8meal").unwrap();

        let photo = store.import(&src).await.unwrap();
        assert_eq!(store.read(&photo.id).await.unwrap(), b"\xFF\xD8meal");
        assert!(src.exists());

        let missing = store.import(&dir.path().join("nope.jpg")).await;
        assert!(matches!(missing, Err(StoreError::SourceNotFound(_))));
    }
}
