//! # Showcase FileSystem Storage
//!
//! Local file system backends for the showcase catalog.
//!
//! * [`JsonCatalogStore`] keeps the whole catalog in a single JSON array file.
//! * [`FileSystemAssets`] stores uploaded images under a public directory and
//!   hands out `/products/<file>` references.
//!
//! ## Features
//!
//! * **Atomic Writes**: Uses temporary files and rename operations so a crash
//!   mid-write never leaves a half-written catalog or image behind.
//!
//! ## Usage
//!
//! ```no_run
//! use showcase_fs::{FileSystemAssets, JsonCatalogStore};
//!
//! let catalog = JsonCatalogStore::new("./data/products.json");
//! let assets = FileSystemAssets::new("./public");
//! ```

use bytes::Bytes;
use showcase_core::prelude::*;
use std::ffi::OsString;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::fs;
use tracing::{error, warn};

use showcase_core::clock::MonotonicMillis;

async fn atomic_write(path: &Path, data: &[u8]) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).await?;
    }

    let mut tmp_name = path.file_name().map(OsString::from).unwrap_or_default();
    tmp_name.push(".tmp");
    let tmp_path = path.with_file_name(tmp_name);

    if let Err(e) = fs::write(&tmp_path, data).await {
        let _ = fs::remove_file(&tmp_path).await;
        return Err(e);
    }
    fs::rename(&tmp_path, path).await
}

/// What to do when the catalog file exists but is not a valid JSON array.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum CorruptCatalogPolicy {
    /// Surface [`StoreError::Corrupt`]. The file is left untouched.
    #[default]
    Fail,
    /// Log a warning and treat the catalog as empty. The next write replaces the file.
    TreatAsEmpty,
}

#[derive(Clone, Debug)]
pub struct JsonCatalogStore {
    path: PathBuf,
    on_corrupt: CorruptCatalogPolicy,
}

impl JsonCatalogStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            on_corrupt: CorruptCatalogPolicy::default(),
        }
    }

    pub fn with_corrupt_policy(mut self, policy: CorruptCatalogPolicy) -> Self {
        self.on_corrupt = policy;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn ensure_parent(&self) -> std::io::Result<()> {
        match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => fs::create_dir_all(parent).await,
            _ => Ok(()),
        }
    }
}

impl CatalogStore for JsonCatalogStore {
    async fn load_all(&self) -> Result<Vec<Product>, StoreError> {
        self.ensure_parent().await?;

        let data = match fs::read(&self.path).await {
            Ok(data) => data,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(StoreError::Io(e)),
        };

        match serde_json::from_slice(&data) {
            Ok(products) => Ok(products),
            Err(e) => match self.on_corrupt {
                CorruptCatalogPolicy::Fail => Err(StoreError::Corrupt(e)),
                CorruptCatalogPolicy::TreatAsEmpty => {
                    warn!(
                        path = %self.path.display(),
                        "Catalog file is corrupt, treating as empty: {e}"
                    );
                    Ok(Vec::new())
                }
            },
        }
    }

    async fn save_all(&self, products: &[Product]) -> Result<(), StoreError> {
        let data = serde_json::to_vec_pretty(products).map_err(StoreError::Serialization)?;
        atomic_write(&self.path, &data).await?;
        Ok(())
    }
}

/// Namespace of managed asset references and the sub-directory they live in.
pub const ASSET_NAMESPACE: &str = "products";
pub const ASSET_PREFIX: &str = "product-";

const MAX_NAME_ATTEMPTS: usize = 100;

#[derive(Clone, Debug)]
pub struct FileSystemAssets {
    dir: PathBuf,
    clock: Arc<MonotonicMillis>,
}

impl FileSystemAssets {
    /// Stores files under `<public_dir>/products`.
    pub fn new(public_dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: public_dir.into().join(ASSET_NAMESPACE),
            clock: Arc::new(MonotonicMillis::new()),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Maps a managed reference to its file, `None` for anything else.
    pub fn path_for(&self, reference: &str) -> Option<PathBuf> {
        let name = reference
            .strip_prefix('/')
            .and_then(|r| r.strip_prefix(ASSET_NAMESPACE))
            .and_then(|r| r.strip_prefix('/'))?;

        let is_plain_name = !name.is_empty()
            && name != "."
            && name != ".."
            && !name.contains(['/', '\\', '\0']);
        is_plain_name.then(|| self.dir.join(name))
    }

    fn generate_name(&self, suggested_name: &str) -> String {
        let extension = Path::new(suggested_name)
            .extension()
            .and_then(|e| e.to_str())
            .filter(|e| !e.is_empty() && e.chars().all(|c| c.is_ascii_alphanumeric()))
            .map(|e| format!(".{e}"))
            .unwrap_or_default();
        format!("{ASSET_PREFIX}{}{extension}", self.clock.next())
    }

    /// Claims a file name that does not exist yet.
    ///
    /// The clock only guarantees uniqueness within this process, so names
    /// left by an earlier run are skipped instead of overwritten.
    async fn reserve_name(&self, suggested_name: &str) -> std::io::Result<String> {
        fs::create_dir_all(&self.dir).await?;

        for _ in 0..MAX_NAME_ATTEMPTS {
            let file_name = self.generate_name(suggested_name);
            let created = fs::OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(self.dir.join(&file_name))
                .await;
            match created {
                Ok(_) => return Ok(file_name),
                Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                    warn!(%file_name, "Asset name already taken, trying the next one");
                }
                Err(e) => return Err(e),
            }
        }
        Err(std::io::Error::new(
            ErrorKind::AlreadyExists,
            "no free asset name",
        ))
    }
}

impl AssetStore for FileSystemAssets {
    async fn store(&self, data: Bytes, suggested_name: &str) -> Result<StoredAsset, AssetError> {
        let file_name = self.reserve_name(suggested_name).await?;
        let path = self.dir.join(&file_name);
        if let Err(e) = atomic_write(&path, &data).await {
            let _ = fs::remove_file(&path).await;
            return Err(e.into());
        }

        Ok(StoredAsset {
            url: format!("/{ASSET_NAMESPACE}/{file_name}"),
            file_name,
        })
    }

    async fn remove(&self, reference: &str) -> bool {
        let Some(path) = self.path_for(reference) else {
            return false;
        };

        match fs::remove_file(&path).await {
            Ok(()) => true,
            Err(e) if e.kind() == ErrorKind::NotFound => false,
            Err(e) => {
                error!(path = %path.display(), "Failed to delete asset: {e}");
                false
            }
        }
    }

    fn is_managed(&self, reference: &str) -> bool {
        self.path_for(reference).is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_plain_names_in_namespace_are_managed() {
        let assets = FileSystemAssets::new("/srv/public");
        assert_eq!(
            assets.path_for("/products/x.jpg"),
            Some(PathBuf::from("/srv/public/products/x.jpg"))
        );
        for reference in [
            "/products/",
            "/products/../secret",
            "/products/a/b.jpg",
            "/productsx/a.jpg",
            "products/a.jpg",
            "https://cdn.example.com/products/a.jpg",
            "/images/a.jpg",
        ] {
            assert!(!assets.is_managed(reference), "{reference}");
        }
    }

    #[test]
    fn generated_names_keep_a_safe_extension() {
        let assets = FileSystemAssets::new("/srv/public");
        let name = assets.generate_name("photo.final.JPG");
        assert!(name.starts_with(ASSET_PREFIX));
        assert!(name.ends_with(".JPG"));

        assert!(!assets.generate_name("noext").contains('.'));
        assert!(!assets.generate_name("evil.j/pg").contains('/'));
        assert_ne!(assets.generate_name("a.png"), assets.generate_name("a.png"));
    }
}
