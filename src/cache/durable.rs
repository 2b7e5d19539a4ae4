use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;

use crate::error::{Error, Result};

/// Tier 2 binding. One implementation is selected at construction time from
/// configuration; the cache never probes a store's shape at runtime.
///
/// The `ttl` on `put` is a garbage-collection hint for stores that support
/// native expiry. Reads trust the entry's embedded expiry instead.
#[async_trait]
pub trait DurableStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>>;
    async fn put(&self, key: &str, bytes: &[u8], ttl: Duration) -> Result<()>;
}

/// File-per-key store. Writes go through a temp file and rename so a crashed
/// writer never leaves a torn entry behind.
pub struct FsStore {
    dir: PathBuf,
}

impl FsStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        FsStore { dir: dir.into() }
    }

    fn path_for(&self, key: &str) -> PathBuf {
        // Keys carry a `snapshot:` namespace prefix; keep filenames portable.
        let name: String = key
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
            .collect();
        self.dir.join(format!("{}.json", name))
    }
}

fn store_error(path: &Path, e: std::io::Error) -> Error {
    Error::DurableTierUnavailable(format!("{}: {}", path.display(), e))
}

#[async_trait]
impl DurableStore for FsStore {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let path = self.path_for(key);
        match tokio::fs::read(&path).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(store_error(&path, e)),
        }
    }

    async fn put(&self, key: &str, bytes: &[u8], _ttl: Duration) -> Result<()> {
        let path = self.path_for(key);
        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(|e| store_error(&self.dir, e))?;

        let tmp = path.with_extension("json.tmp");
        tokio::fs::write(&tmp, bytes)
            .await
            .map_err(|e| store_error(&tmp, e))?;
        tokio::fs::rename(&tmp, &path)
            .await
            .map_err(|e| store_error(&path, e))
    }
}
