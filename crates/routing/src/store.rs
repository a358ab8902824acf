//! Local blob storage keyed by opaque name.

use crate::error::{Result, RouteError};
use async_trait::async_trait;
use dashmap::DashMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

/// Byte-content store under one node's data root.
#[async_trait]
pub trait BlobStore: Send + Sync + 'static {
    async fn get(&self, name: &str) -> Result<Option<Vec<u8>>>;

    /// Write `content`, replacing any previous blob. Returns true if the name
    /// was not present before.
    async fn put(&self, name: &str, content: &[u8]) -> Result<bool>;

    /// Returns true if a blob was removed.
    async fn delete(&self, name: &str) -> Result<bool>;

    async fn names(&self) -> Result<Vec<String>>;
}

/// Names are flat: no separators, no relative components.
pub fn validate_name(name: &str) -> Result<()> {
    let bad = name.is_empty()
        || name == "."
        || name == ".."
        || name.contains('/')
        || name.contains('\\')
        || name.contains('\0');
    if bad {
        return Err(RouteError::InvalidName(name.to_string()));
    }
    Ok(())
}

#[derive(Debug, Default)]
pub struct MemoryBlobStore {
    blobs: DashMap<String, Vec<u8>>,
}

impl MemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl BlobStore for MemoryBlobStore {
    async fn get(&self, name: &str) -> Result<Option<Vec<u8>>> {
        validate_name(name)?;
        Ok(self.blobs.get(name).map(|v| v.value().clone()))
    }

    async fn put(&self, name: &str, content: &[u8]) -> Result<bool> {
        validate_name(name)?;
        Ok(self.blobs.insert(name.to_string(), content.to_vec()).is_none())
    }

    async fn delete(&self, name: &str) -> Result<bool> {
        validate_name(name)?;
        Ok(self.blobs.remove(name).is_some())
    }

    async fn names(&self) -> Result<Vec<String>> {
        let mut names: Vec<String> = self.blobs.iter().map(|e| e.key().clone()).collect();
        names.sort();
        Ok(names)
    }
}

/// One file per blob directly under `root`.
#[derive(Debug, Clone)]
pub struct FsBlobStore {
    root: PathBuf,
}

impl FsBlobStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path(&self, name: &str) -> Result<PathBuf> {
        validate_name(name)?;
        Ok(self.root.join(name))
    }
}

#[async_trait]
impl BlobStore for FsBlobStore {
    async fn get(&self, name: &str) -> Result<Option<Vec<u8>>> {
        let path = self.path(name)?;
        match tokio::fs::read(&path).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn put(&self, name: &str, content: &[u8]) -> Result<bool> {
        let path = self.path(name)?;
        tokio::fs::create_dir_all(&self.root).await?;
        let created = !tokio::fs::try_exists(&path).await?;
        tokio::fs::write(&path, content).await?;
        tracing::debug!(path = %path.display(), created, "wrote blob");
        Ok(created)
    }

    async fn delete(&self, name: &str) -> Result<bool> {
        let path = self.path(name)?;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    async fn names(&self) -> Result<Vec<String>> {
        let mut dir = match tokio::fs::read_dir(&self.root).await {
            Ok(dir) => dir,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };
        let mut names = Vec::new();
        while let Some(entry) = dir.next_entry().await? {
            if !entry.file_type().await?.is_file() {
                continue;
            }
            if let Some(name) = entry.file_name().to_str() {
                names.push(name.to_string());
            }
        }
        names.sort();
        Ok(names)
    }
}
