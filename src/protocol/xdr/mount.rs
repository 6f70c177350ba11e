//! XDR data structures of the `MOUNT` version 3 protocol (RFC 1813 Appendix I).
//!
//! `MOUNT` hands out the initial file handle a client uses as the root of
//! the exported file system.

// RFC 1813 naming
#![allow(non_camel_case_types)]

use std::io::Write;

use num_derive::{FromPrimitive, ToPrimitive};

use super::*;

/// MOUNT program number for RPC
pub const PROGRAM: u32 = 100005;
/// MOUNT protocol version 3
pub const VERSION: u32 = 3;

/// Maximum bytes in a path name
pub const MNTPATHLEN: u32 = 1024;
/// Maximum bytes in a name
pub const MNTNAMLEN: u32 = 255;

/// File handle for NFS version 3
pub type fhandle3 = Vec<u8>;
/// Directory path on the server
pub type dirpath = Vec<u8>;
/// Name in the directory
pub type name = Vec<u8>;

/// Status codes returned by `MOUNT` protocol operations
#[derive(Copy, Clone, Debug, PartialEq, Eq, FromPrimitive, ToPrimitive)]
#[repr(u32)]
pub enum mountstat3 {
    /// No error
    MNT3_OK = 0,
    /// Not owner
    MNT3ERR_PERM = 1,
    /// No such file or directory
    MNT3ERR_NOENT = 2,
    /// I/O error
    MNT3ERR_IO = 5,
    /// Permission denied
    MNT3ERR_ACCES = 13,
    /// Not a directory
    MNT3ERR_NOTDIR = 20,
    /// Invalid argument
    MNT3ERR_INVAL = 22,
    /// Filename too long
    MNT3ERR_NAMETOOLONG = 63,
    /// Operation not supported
    MNT3ERR_NOTSUPP = 10004,
    /// A failure on the server
    MNT3ERR_SERVERFAULT = 10006,
}
impl SerializeEnum for mountstat3 {}
impl DeserializeEnum for mountstat3 {}

impl Default for mountstat3 {
    fn default() -> Self {
        mountstat3::MNT3_OK
    }
}

/// Successful response to a mount request
#[derive(Clone, Debug, Default)]
pub struct mountres3_ok {
    /// File handle for the mounted directory
    pub fhandle: fhandle3,
    /// List of authentication flavors supported by the server
    pub auth_flavors: Vec<u32>,
}
DeserializeStruct!(mountres3_ok, fhandle, auth_flavors);
SerializeStruct!(mountres3_ok, fhandle, auth_flavors);

/// One node of the `exports` linked list returned by `MOUNTPROC3_EXPORT`.
/// `groups` is always empty: every client may mount every export.
#[derive(Clone, Debug, Default)]
pub struct exportnode {
    /// Exported directory path
    pub ex_dir: dirpath,
    /// Client groups allowed to mount it
    pub ex_groups: Vec<name>,
}

impl Serialize for exportnode {
    fn serialize<W: Write>(&self, dest: &mut W) -> std::io::Result<()> {
        self.ex_dir.serialize(dest)?;
        for group in &self.ex_groups {
            true.serialize(dest)?;
            group.serialize(dest)?;
        }
        false.serialize(dest)
    }
}

/// Procedure numbers for the `MOUNT` version 3 protocol
#[allow(clippy::upper_case_acronyms)]
#[derive(Copy, Clone, Debug, FromPrimitive, ToPrimitive)]
pub enum MountProgram {
    /// Null procedure for service availability testing
    MOUNTPROC3_NULL = 0,
    /// Mount a file system
    MOUNTPROC3_MNT = 1,
    /// Get list of mounted file systems
    MOUNTPROC3_DUMP = 2,
    /// Unmount a file system
    MOUNTPROC3_UMNT = 3,
    /// Unmount all file systems
    MOUNTPROC3_UMNTALL = 4,
    /// Get list of exported file systems
    MOUNTPROC3_EXPORT = 5,
}
