//! Stateless file handles that carry their own path.
//!
//! A handle is laid out as
//!
//! ```text
//! +------------------+---------------------------+
//! | file id (u64 BE) | canonical path (UTF-8)    |
//! +------------------+---------------------------+
//! ```
//!
//! The file id is the first 8 bytes of the SHA-256 digest of the path. It
//! doubles as the `fileid` attribute of the object, and decoding checks it
//! so corrupted or forged handles are reported as stale instead of being
//! resolved to some other path.
//!
//! Nothing is stored server side: any handle minted by any instance serving
//! the same tree decodes back to its path. Handles grow with path depth and
//! expose the path to the client.

use std::sync::Arc;

use async_trait::async_trait;
use sha2::{Digest, Sha256};
use thiserror::Error;

use crate::protocol::xdr::{mount, nfs3};
use crate::vfs::{Capabilities, FileSystem, HandleDirectory, Handler};

/// Bytes taken by the file id at the start of every handle.
pub const FILE_ID_LEN: usize = 8;

/// Default number of handles one reply may mint.
pub const DEFAULT_HANDLE_CAPACITY: usize = 1024;

const ROOT_PATH: &str = "/";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum HandleError {
    /// The handle is too short to carry a file id.
    #[error("malformed file handle of {0} bytes")]
    Malformed(usize),
    /// The handle does not decode to a path minted by this directory.
    #[error("stale file handle")]
    Stale,
}

impl HandleError {
    pub fn status(&self) -> nfs3::nfsstat3 {
        match self {
            HandleError::Malformed(_) | HandleError::Stale => nfs3::nfsstat3::NFS3ERR_STALE,
        }
    }
}

/// File id derived from a canonical path. Never zero.
pub fn file_id_of_path(path: &str) -> nfs3::fileid3 {
    let digest = Sha256::digest(path.as_bytes());
    let mut id = [0_u8; FILE_ID_LEN];
    id.copy_from_slice(&digest[..FILE_ID_LEN]);
    u64::from_be_bytes(id).max(1)
}

/// The file id embedded in a handle, or 0 when the handle is too short to
/// carry one.
pub fn file_id(handle: &nfs3::nfs_fh3) -> nfs3::fileid3 {
    handle
        .data
        .get(..FILE_ID_LEN)
        .and_then(|id| id.try_into().ok())
        .map(u64::from_be_bytes)
        .unwrap_or(0)
}

/// Encodes the handle of a canonical path.
pub fn encode(path: &str) -> nfs3::nfs_fh3 {
    let mut data = Vec::with_capacity(FILE_ID_LEN + path.len());
    data.extend_from_slice(&file_id_of_path(path).to_be_bytes());
    data.extend_from_slice(path.as_bytes());
    nfs3::nfs_fh3 { data }
}

/// Decodes a handle to path segments. The root decodes to a single empty
/// segment.
pub fn decode(handle: &nfs3::nfs_fh3) -> Result<Vec<String>, HandleError> {
    if handle.data.len() < FILE_ID_LEN {
        return Err(HandleError::Malformed(handle.data.len()));
    }
    let path = std::str::from_utf8(&handle.data[FILE_ID_LEN..]).map_err(|_| HandleError::Stale)?;
    if file_id(handle) != file_id_of_path(path) {
        return Err(HandleError::Stale);
    }
    if path == ROOT_PATH {
        return Ok(vec![String::new()]);
    }
    Ok(path.split('/').map(str::to_string).collect())
}

/// Gives a [`Handler`] path-carrying file handles.
///
/// Handle translation is the only thing added; mount resolution and
/// everything else is forwarded to the wrapped handler.
pub struct PathHandles<H> {
    inner: H,
    fs: Arc<dyn FileSystem>,
    capacity: usize,
}

impl<H: Handler> PathHandles<H> {
    /// `fs` is the file system handles resolve to.
    pub fn new(inner: H, fs: Arc<dyn FileSystem>) -> Self {
        PathHandles { inner, fs, capacity: DEFAULT_HANDLE_CAPACITY }
    }

    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }

    pub fn inner(&self) -> &H {
        &self.inner
    }
}

impl<H: Handler> HandleDirectory for PathHandles<H> {
    fn to_handle(&self, fs: &dyn FileSystem, path: &[String]) -> nfs3::nfs_fh3 {
        let joined = fs.join(path);
        if joined.is_empty() {
            return encode(ROOT_PATH);
        }
        encode(&joined)
    }

    fn from_handle(
        &self,
        handle: &nfs3::nfs_fh3,
    ) -> Result<(Arc<dyn FileSystem>, Vec<String>), HandleError> {
        Ok((self.fs.clone(), decode(handle)?))
    }

    fn handle_capacity(&self) -> usize {
        self.capacity
    }
}

#[async_trait]
impl<H: Handler> Handler for PathHandles<H> {
    async fn mount(
        &self,
        dirpath: &[u8],
    ) -> Result<(Arc<dyn FileSystem>, Vec<String>), mount::mountstat3> {
        self.inner.mount(dirpath).await
    }

    fn export_name(&self) -> &str {
        self.inner.export_name()
    }

    fn capabilities(&self) -> Capabilities {
        self.inner.capabilities()
    }
}
