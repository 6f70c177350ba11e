//! Capability interfaces between the protocol engine and what it serves.
//!
//! Three seams are defined here:
//! - [`FileSystem`]: the backing store, addressed by path. It only has to
//!   list directories, stat paths and join path segments.
//! - [`Handler`]: resolves `MOUNT` requests to a file system root and reports
//!   what the export supports.
//! - [`HandleDirectory`]: translates between opaque NFS file handles and
//!   `(file system, path segments)` pairs.
//!
//! Procedures receive an [`NfsHandler`], which is anything implementing both
//! of the last two. [`NullAuthHandler`] is a plain [`Handler`] exporting a
//! single file system; wrap it in [`crate::handle::PathHandles`] to get an
//! [`NfsHandler`].
//!
//! Paths
//! -----
//! A path is the string produced by [`FileSystem::join`]. The export root is
//! `"/"` (or `""`, which the default join yields for the root sentinel
//! segment); everything below it is relative, e.g. `"docs/a.txt"`.

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use crate::protocol::xdr::{mount, nfs3};

/// Kind of a file system object.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum EntryKind {
    #[default]
    File,
    Directory,
    Symlink,
    /// Devices, sockets, pipes
    Other,
}

/// What the backing file system knows about one object.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Metadata {
    pub kind: EntryKind,
    /// Permission bits
    pub mode: u32,
    pub nlink: u32,
    pub uid: u32,
    pub gid: u32,
    /// Size in bytes
    pub size: u64,
    pub atime: nfs3::nfstime3,
    pub mtime: nfs3::nfstime3,
    pub ctime: nfs3::nfstime3,
}

impl Metadata {
    pub fn is_dir(&self) -> bool {
        self.kind == EntryKind::Directory
    }
}

/// One named entry of a directory listing.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DirEntry {
    /// File name, without path components
    pub name: String,
    pub meta: Metadata,
}

/// Failures reported by a [`FileSystem`].
#[derive(Debug, Error)]
pub enum FsError {
    #[error("no such file or directory: {0:?}")]
    NotFound(String),
    #[error("not a directory: {0:?}")]
    NotDirectory(String),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl FsError {
    /// NFS status reported to the client for this failure.
    pub fn status(&self) -> nfs3::nfsstat3 {
        match self {
            FsError::NotFound(_) => nfs3::nfsstat3::NFS3ERR_NOENT,
            FsError::NotDirectory(_) => nfs3::nfsstat3::NFS3ERR_NOTDIR,
            FsError::Io(_) => nfs3::nfsstat3::NFS3ERR_IO,
        }
    }
}

/// Access capabilities of an export.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Capabilities {
    ReadOnly,
    ReadWrite,
}

/// A hierarchical namespace the server can export.
///
/// Implementations must be safe to call concurrently from every connection.
/// `list_directory` must return entries in the same order on every call for
/// an unchanged directory: listing cookies are positions in that order.
#[async_trait]
pub trait FileSystem: Send + Sync {
    /// Lists the entries of the directory at `path`, without `.` and `..`.
    async fn list_directory(&self, path: &str) -> Result<Vec<DirEntry>, FsError>;

    /// Returns the metadata of the object at `path`.
    async fn stat(&self, path: &str) -> Result<Metadata, FsError>;

    /// Joins path segments into a path of this file system.
    fn join(&self, segments: &[String]) -> String {
        join_path(segments)
    }
}

/// Joins segments with `/` and cleans the result lexically: empty and `.`
/// segments are dropped and `..` removes the preceding segment. The result
/// is absolute when the first segment is, and `""` when nothing remains of
/// a relative path.
pub fn join_path<S: AsRef<str>>(segments: &[S]) -> String {
    let absolute = segments
        .iter()
        .find(|s| !s.as_ref().is_empty())
        .is_some_and(|s| s.as_ref().starts_with('/'));
    let mut parts: Vec<&str> = Vec::new();
    for part in segments.iter().flat_map(|s| s.as_ref().split('/')) {
        match part {
            "" | "." => {}
            ".." => {
                if parts.last().is_some_and(|p| *p != "..") {
                    parts.pop();
                } else if !absolute {
                    parts.push("..");
                }
            }
            part => parts.push(part),
        }
    }
    let joined = parts.join("/");
    if absolute {
        format!("/{joined}")
    } else {
        joined
    }
}

/// Resolves mounts and describes the export.
#[async_trait]
pub trait Handler: Send + Sync {
    /// Resolves a `MOUNT` request for `dirpath` to the file system to serve
    /// and the path segments of the mounted directory within it.
    async fn mount(
        &self,
        dirpath: &[u8],
    ) -> Result<(Arc<dyn FileSystem>, Vec<String>), mount::mountstat3>;

    /// Name clients mount, e.g. `/export`.
    fn export_name(&self) -> &str;

    fn capabilities(&self) -> Capabilities;
}

/// Translates between opaque file handles and file system paths.
pub trait HandleDirectory: Send + Sync {
    /// Mints the handle of `path` in `fs`. An empty `path` names the root.
    fn to_handle(&self, fs: &dyn FileSystem, path: &[String]) -> nfs3::nfs_fh3;

    /// Resolves a handle minted by [`HandleDirectory::to_handle`].
    fn from_handle(
        &self,
        handle: &nfs3::nfs_fh3,
    ) -> Result<(Arc<dyn FileSystem>, Vec<String>), crate::handle::HandleError>;

    /// Number of handles that can safely be minted for one reply.
    fn handle_capacity(&self) -> usize;
}

/// Everything the procedures need from the embedding application.
pub trait NfsHandler: Handler + HandleDirectory {}

impl<T: Handler + HandleDirectory> NfsHandler for T {}

/// A [`Handler`] exporting one file system to every client, without any
/// authentication.
pub struct NullAuthHandler {
    fs: Arc<dyn FileSystem>,
    export_name: String,
}

impl NullAuthHandler {
    pub fn new(fs: Arc<dyn FileSystem>) -> Self {
        NullAuthHandler { fs, export_name: "/".to_string() }
    }

    /// Sets the name clients mount. A leading slash is added and trailing
    /// slashes are removed.
    pub fn with_export_name<S: AsRef<str>>(mut self, export_name: S) -> Self {
        self.export_name =
            format!("/{}", export_name.as_ref().trim_end_matches('/').trim_start_matches('/'));
        self
    }

    pub fn file_system(&self) -> Arc<dyn FileSystem> {
        self.fs.clone()
    }
}

#[async_trait]
impl Handler for NullAuthHandler {
    async fn mount(
        &self,
        dirpath: &[u8],
    ) -> Result<(Arc<dyn FileSystem>, Vec<String>), mount::mountstat3> {
        let dirpath =
            std::str::from_utf8(dirpath).map_err(|_| mount::mountstat3::MNT3ERR_INVAL)?;
        let export = self.export_name.trim_end_matches('/');
        let rest = match dirpath.strip_prefix(export) {
            Some(rest) if rest.is_empty() || rest.starts_with('/') || export.is_empty() => rest,
            _ => return Err(mount::mountstat3::MNT3ERR_NOENT),
        };
        let segments: Vec<String> =
            rest.split('/').filter(|s| !s.is_empty()).map(str::to_string).collect();
        if !segments.is_empty() {
            let meta = self
                .fs
                .stat(&self.fs.join(&segments))
                .await
                .map_err(|_| mount::mountstat3::MNT3ERR_NOENT)?;
            if !meta.is_dir() {
                return Err(mount::mountstat3::MNT3ERR_NOTDIR);
            }
        }
        Ok((self.fs.clone(), segments))
    }

    fn export_name(&self) -> &str {
        &self.export_name
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities::ReadOnly
    }
}
