//! A [`FileSystem`] over a directory of the host.
//!
//! Paths are resolved below the root directory; paths that would leave it
//! are reported as not found. Symbolic links are reported as links and are
//! never followed. Entries whose names are not UTF-8 cannot be addressed by
//! path and are left out of listings.

use std::io;
use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;
use tracing::{debug, trace};

use crate::fs_util::local_metadata;
use crate::vfs::{DirEntry, FileSystem, FsError, Metadata};

#[derive(Debug, Clone)]
pub struct LocalFs {
    root: PathBuf,
}

impl LocalFs {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        LocalFs { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn resolve(&self, path: &str) -> Result<PathBuf, FsError> {
        let relative = Path::new(path.trim_start_matches('/'));
        let mut resolved = self.root.clone();
        for component in relative.components() {
            match component {
                Component::Normal(part) => resolved.push(part),
                Component::CurDir => {}
                _ => return Err(FsError::NotFound(path.to_string())),
            }
        }
        Ok(resolved)
    }
}

fn map_err(path: &str, err: io::Error) -> FsError {
    match err.kind() {
        io::ErrorKind::NotFound => FsError::NotFound(path.to_string()),
        _ => FsError::Io(err),
    }
}

#[async_trait]
impl FileSystem for LocalFs {
    async fn list_directory(&self, path: &str) -> Result<Vec<DirEntry>, FsError> {
        let dir = self.resolve(path)?;
        let meta = tokio::fs::symlink_metadata(&dir).await.map_err(|e| map_err(path, e))?;
        if !meta.is_dir() {
            return Err(FsError::NotDirectory(path.to_string()));
        }

        let mut entries = Vec::new();
        let mut read_dir = tokio::fs::read_dir(&dir).await.map_err(|e| map_err(path, e))?;
        while let Some(entry) = read_dir.next_entry().await? {
            let Ok(name) = entry.file_name().into_string() else {
                debug!("skipping non UTF-8 name {:?} in {:?}", entry.file_name(), dir);
                continue;
            };
            let meta = match entry.metadata().await {
                Ok(meta) => local_metadata(&meta),
                // Removed while listing
                Err(e) if e.kind() == io::ErrorKind::NotFound => continue,
                Err(e) => return Err(e.into()),
            };
            entries.push(DirEntry { name, meta });
        }
        entries.sort_by(|a, b| a.name.cmp(&b.name));
        trace!("list_directory({:?}) -> {} entries", path, entries.len());
        Ok(entries)
    }

    async fn stat(&self, path: &str) -> Result<Metadata, FsError> {
        let resolved = self.resolve(path)?;
        let meta = tokio::fs::symlink_metadata(&resolved).await.map_err(|e| map_err(path, e))?;
        Ok(local_metadata(&meta))
    }
}
