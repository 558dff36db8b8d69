pub mod codec;
pub mod legacy;

use async_trait::async_trait;
use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use tokio::sync::{RwLock, watch};
use tracing::debug;

use crate::fs_util::{set_secure_dir_permissions, write_atomic};

/// The blobs the reactor persists. Each is stored and loaded independently.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Blob {
    MessageStore,
    TermSizeIndex,
    ThrottleLedger,
}

impl Blob {
    pub const ALL: [Blob; 3] = [Blob::MessageStore, Blob::TermSizeIndex, Blob::ThrottleLedger];

    /// Stable storage name.
    pub fn name(&self) -> &'static str {
        match self {
            Blob::MessageStore => "reactMessageStore",
            Blob::TermSizeIndex => "reactTermSizes",
            Blob::ThrottleLedger => "reactThrottleLedger",
        }
    }
}

impl fmt::Display for Blob {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Key-value persistence for the reactor's blobs.
#[async_trait]
pub trait Brain: Send + Sync {
    /// Resolves once persisted data is available. Callers bound this with a
    /// timeout and carry on regardless.
    async fn ready(&self) {}

    /// `Ok(None)` when the blob was never written.
    async fn get(&self, blob: Blob) -> anyhow::Result<Option<Vec<u8>>>;

    async fn set(&self, blob: Blob, data: Vec<u8>) -> anyhow::Result<()>;
}

/// One file per blob in a state directory.
pub struct FileBrain {
    dir: PathBuf,
}

impl FileBrain {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path(&self, blob: Blob) -> PathBuf {
        self.dir.join(blob.name())
    }
}

#[async_trait]
impl Brain for FileBrain {
    async fn get(&self, blob: Blob) -> anyhow::Result<Option<Vec<u8>>> {
        let path = self.path(blob);
        match tokio::fs::read(&path).await {
            Ok(data) => Ok(Some(data)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(anyhow::anyhow!("failed to read {}: {e}", path.display())),
        }
    }

    async fn set(&self, blob: Blob, data: Vec<u8>) -> anyhow::Result<()> {
        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(|e| anyhow::anyhow!("failed to create {}: {e}", self.dir.display()))?;
        set_secure_dir_permissions(&self.dir)?;
        write_atomic(&self.path(blob), &data).await?;
        debug!(blob = %blob, bytes = data.len(), "wrote blob");
        Ok(())
    }
}

/// In-process brain. Can start out "not loaded" to mimic a backend whose
/// data arrives asynchronously.
pub struct MemoryBrain {
    blobs: RwLock<HashMap<Blob, Vec<u8>>>,
    loaded: watch::Sender<bool>,
}

impl MemoryBrain {
    pub fn new() -> Self {
        Self::with_loaded(true)
    }

    /// A brain whose `ready()` blocks until [`MemoryBrain::mark_loaded`].
    pub fn pending() -> Self {
        Self::with_loaded(false)
    }

    fn with_loaded(loaded: bool) -> Self {
        let (tx, _) = watch::channel(loaded);
        Self {
            blobs: RwLock::new(HashMap::new()),
            loaded: tx,
        }
    }

    pub fn mark_loaded(&self) {
        self.loaded.send_replace(true);
    }

    /// Raw bytes of a blob, bypassing the codec.
    pub async fn raw(&self, blob: Blob) -> Option<Vec<u8>> {
        self.blobs.read().await.get(&blob).cloned()
    }

    pub async fn put_raw(&self, blob: Blob, data: impl Into<Vec<u8>>) {
        self.blobs.write().await.insert(blob, data.into());
    }
}

impl Default for MemoryBrain {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Brain for MemoryBrain {
    async fn ready(&self) {
        let mut rx = self.loaded.subscribe();
        while !*rx.borrow_and_update() {
            if rx.changed().await.is_err() {
                return;
            }
        }
    }

    async fn get(&self, blob: Blob) -> anyhow::Result<Option<Vec<u8>>> {
        Ok(self.raw(blob).await)
    }

    async fn set(&self, blob: Blob, data: Vec<u8>) -> anyhow::Result<()> {
        self.put_raw(blob, data).await;
        Ok(())
    }
}
