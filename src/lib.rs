//! nfs-pathserve - a read-only NFS version 3 server that names files by path
//!
//! The server answers the MOUNT and NFSv3 procedures a client needs to mount
//! an export and browse it: file attributes, lookups, access checks and
//! directory listings through `READDIRPLUS`. File handles carry the path of
//! the object they name, so the server keeps no per-file state and handles
//! survive restarts.
//!
//! ## Main Components
//!
//! - `vfs`: the capabilities an application provides: a [`vfs::FileSystem`]
//!   to list and stat paths, and a [`vfs::Handler`] resolving mounts.
//!
//! - `handle`: [`handle::PathHandles`], which wraps a handler and translates
//!   between paths and file handles.
//!
//! - `tcp`: the TCP server accepting client connections and serving each on
//!   its own task.
//!
//! - `protocol`: ONC RPC framing and dispatch, XDR encoding and the
//!   procedures of the MOUNT and NFSv3 programs.
//!
//! - `local_fs`: a [`vfs::FileSystem`] over a directory of the host.
//!
//! ## Standards Compliance
//!
//! - RFC 1813: NFS Version 3 Protocol Specification
//! - RFC 5531: RPC: Remote Procedure Call Protocol Specification Version 2
//! - RFC 4506: XDR: External Data Representation Standard
//!
//! ## Usage
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use nfs_pathserve::handle::PathHandles;
//! use nfs_pathserve::local_fs::LocalFs;
//! use nfs_pathserve::tcp::{NFSTcp, NFSTcpListener};
//! use nfs_pathserve::vfs::{FileSystem, NullAuthHandler};
//!
//! # async fn run() -> std::io::Result<()> {
//! let fs: Arc<dyn FileSystem> = Arc::new(LocalFs::new("/srv/data"));
//! let handler = PathHandles::new(NullAuthHandler::new(fs.clone()), fs);
//! let listener = NFSTcpListener::bind("127.0.0.1:11111", handler).await?;
//! listener.handle_forever().await
//! # }
//! ```

pub mod fs_util;
pub mod handle;
pub mod local_fs;
pub mod protocol;
pub mod tcp;
pub mod vfs;
mod write_counter;

pub use protocol::xdr;
