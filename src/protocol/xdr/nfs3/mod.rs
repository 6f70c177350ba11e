//! XDR data types and constants of NFS version 3 (RFC 1813) needed by the
//! read-only procedures this server answers.
//!
//! Optional values (`post_op_attr`, `post_op_fh3`) are plain `Option`s: the
//! generic `Option<T>` codec writes the `attributes_follow` / `handle_follows`
//! discriminant in front of the value.

// Preserve original RFC naming conventions
#![allow(non_camel_case_types)]

use std::fmt;
use std::io::{Read, Write};

use num_derive::{FromPrimitive, ToPrimitive};

use super::{
    Deserialize, DeserializeEnum, DeserializeStruct, Serialize, SerializeEnum, SerializeStruct,
};

pub mod dir;
pub mod fs;

/// The RPC program number for NFS version 3 service.
pub const PROGRAM: u32 = 100003;
/// The version number for NFS version 3 protocol.
pub const VERSION: u32 = 3;

/// The size in bytes of the opaque cookie verifier passed by
/// READDIR and READDIRPLUS.
pub const NFS3_COOKIEVERFSIZE: u32 = 8;

/// Read data from file or read a directory.
pub const ACCESS3_READ: u32 = 0x0001;
/// Look up a name in a directory (no meaning for non-directory objects).
pub const ACCESS3_LOOKUP: u32 = 0x0002;
/// Rewrite existing file data or modify existing directory entries.
pub const ACCESS3_MODIFY: u32 = 0x0004;
/// Write new data or add directory entries.
pub const ACCESS3_EXTEND: u32 = 0x0008;
/// Delete an existing directory entry.
pub const ACCESS3_DELETE: u32 = 0x0010;
/// Execute file (no meaning for a directory).
pub const ACCESS3_EXECUTE: u32 = 0x0020;

/// A byte string used for file names. Names are not required to be UTF-8
/// on the wire; the path-addressed file systems served here reject
/// names that are not.
#[derive(Default, Clone, PartialEq, Eq)]
pub struct nfsstring(pub Vec<u8>);

impl nfsstring {
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<Vec<u8>> for nfsstring {
    fn from(value: Vec<u8>) -> Self {
        Self(value)
    }
}

impl From<&str> for nfsstring {
    fn from(value: &str) -> Self {
        Self(value.as_bytes().to_vec())
    }
}

impl AsRef<[u8]> for nfsstring {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Debug for nfsstring {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", String::from_utf8_lossy(&self.0))
    }
}

impl fmt::Display for nfsstring {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", String::from_utf8_lossy(&self.0))
    }
}

impl Serialize for nfsstring {
    fn serialize<W: Write>(&self, dest: &mut W) -> std::io::Result<()> {
        self.0.serialize(dest)
    }
}

impl Deserialize for nfsstring {
    fn deserialize<R: Read>(&mut self, src: &mut R) -> std::io::Result<()> {
        self.0.deserialize(src)
    }
}

/// Procedure numbers for NFS version 3 protocol.
#[allow(clippy::upper_case_acronyms)]
#[derive(Copy, Clone, Debug, FromPrimitive, ToPrimitive)]
pub enum NFSProgram {
    NFSPROC3_NULL = 0,
    NFSPROC3_GETATTR = 1,
    NFSPROC3_SETATTR = 2,
    NFSPROC3_LOOKUP = 3,
    NFSPROC3_ACCESS = 4,
    NFSPROC3_READLINK = 5,
    NFSPROC3_READ = 6,
    NFSPROC3_WRITE = 7,
    NFSPROC3_CREATE = 8,
    NFSPROC3_MKDIR = 9,
    NFSPROC3_SYMLINK = 10,
    NFSPROC3_MKNOD = 11,
    NFSPROC3_REMOVE = 12,
    NFSPROC3_RMDIR = 13,
    NFSPROC3_RENAME = 14,
    NFSPROC3_LINK = 15,
    NFSPROC3_READDIR = 16,
    NFSPROC3_READDIRPLUS = 17,
    NFSPROC3_FSSTAT = 18,
    NFSPROC3_FSINFO = 19,
    NFSPROC3_PATHCONF = 20,
    NFSPROC3_COMMIT = 21,
}

pub type filename3 = nfsstring;
pub type fileid3 = u64;
pub type cookie3 = u64;
pub type cookieverf3 = [u8; NFS3_COOKIEVERFSIZE as usize];
pub type uid3 = u32;
pub type gid3 = u32;
pub type size3 = u64;
pub type mode3 = u32;
pub type count3 = u32;

/// Status codes returned by NFS version 3 operations
#[derive(Copy, Clone, Debug, PartialEq, Eq, FromPrimitive, ToPrimitive)]
#[repr(u32)]
pub enum nfsstat3 {
    /// The call completed successfully.
    NFS3_OK = 0,
    /// Not owner.
    NFS3ERR_PERM = 1,
    /// No such file or directory.
    NFS3ERR_NOENT = 2,
    /// A hard error occurred while processing the request.
    NFS3ERR_IO = 5,
    /// No such device or address.
    NFS3ERR_NXIO = 6,
    /// Permission denied.
    NFS3ERR_ACCES = 13,
    /// File exists.
    NFS3ERR_EXIST = 17,
    /// Attempt to do a cross-device hard link.
    NFS3ERR_XDEV = 18,
    /// No such device.
    NFS3ERR_NODEV = 19,
    /// The caller specified a non-directory in a directory operation.
    NFS3ERR_NOTDIR = 20,
    /// The caller specified a directory in a non-directory operation.
    NFS3ERR_ISDIR = 21,
    /// Invalid or unsupported argument.
    NFS3ERR_INVAL = 22,
    /// File too large.
    NFS3ERR_FBIG = 27,
    /// No space left on device.
    NFS3ERR_NOSPC = 28,
    /// Read-only file system.
    NFS3ERR_ROFS = 30,
    /// Too many hard links.
    NFS3ERR_MLINK = 31,
    /// The filename in an operation was too long.
    NFS3ERR_NAMETOOLONG = 63,
    /// Directory not empty.
    NFS3ERR_NOTEMPTY = 66,
    /// Resource (quota) hard limit exceeded.
    NFS3ERR_DQUOT = 69,
    /// The file handle no longer refers to a live object.
    NFS3ERR_STALE = 70,
    /// Too many levels of remote in path.
    NFS3ERR_REMOTE = 71,
    /// The file handle failed internal consistency checks.
    NFS3ERR_BADHANDLE = 10001,
    /// Update synchronization mismatch during SETATTR.
    NFS3ERR_NOT_SYNC = 10002,
    /// READDIR or READDIRPLUS cookie is stale.
    NFS3ERR_BAD_COOKIE = 10003,
    /// Operation is not supported.
    NFS3ERR_NOTSUPP = 10004,
    /// Buffer or request is too small.
    NFS3ERR_TOOSMALL = 10005,
    /// A server error that maps to no other status.
    NFS3ERR_SERVERFAULT = 10006,
    /// Object type not supported by the server.
    NFS3ERR_BADTYPE = 10007,
    /// The request could not be completed in a timely fashion.
    NFS3ERR_JUKEBOX = 10008,
}
impl SerializeEnum for nfsstat3 {}
impl DeserializeEnum for nfsstat3 {}

impl Default for nfsstat3 {
    fn default() -> Self {
        nfsstat3::NFS3_OK
    }
}

/// File type of a file system object (RFC 1813 section 2.3.5)
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, FromPrimitive, ToPrimitive)]
#[repr(u32)]
pub enum ftype3 {
    /// Regular File
    #[default]
    NF3REG = 1,
    /// Directory
    NF3DIR = 2,
    /// Block Special Device
    NF3BLK = 3,
    /// Character Special Device
    NF3CHR = 4,
    /// Symbolic Link
    NF3LNK = 5,
    /// Socket
    NF3SOCK = 6,
    /// Named Pipe
    NF3FIFO = 7,
}
impl SerializeEnum for ftype3 {}
impl DeserializeEnum for ftype3 {}

/// Major and minor device numbers of special files
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct specdata3 {
    pub specdata1: u32,
    pub specdata2: u32,
}
DeserializeStruct!(specdata3, specdata1, specdata2);
SerializeStruct!(specdata3, specdata1, specdata2);

/// The NFS version 3 file handle.
///
/// Its content is private to the server; see [`crate::handle`] for the
/// layout used here.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct nfs_fh3 {
    pub data: Vec<u8>,
}
DeserializeStruct!(nfs_fh3, data);
SerializeStruct!(nfs_fh3, data);

/// Timestamp with nanosecond precision
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct nfstime3 {
    /// Seconds since Unix epoch
    pub seconds: u32,
    /// Nanoseconds (0-999999999)
    pub nseconds: u32,
}
DeserializeStruct!(nfstime3, seconds, nseconds);
SerializeStruct!(nfstime3, seconds, nseconds);

impl From<filetime::FileTime> for nfstime3 {
    fn from(time: filetime::FileTime) -> Self {
        nfstime3 {
            seconds: time.unix_seconds().clamp(0, u32::MAX as i64) as u32,
            nseconds: time.nanoseconds(),
        }
    }
}

impl From<nfstime3> for filetime::FileTime {
    fn from(time: nfstime3) -> Self {
        filetime::FileTime::from_unix_time(time.seconds as i64, time.nseconds)
    }
}

/// File attributes (RFC 1813 section 2.3.5)
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct fattr3 {
    pub ftype: ftype3,
    pub mode: mode3,
    pub nlink: u32,
    pub uid: uid3,
    pub gid: gid3,
    pub size: size3,
    pub used: size3,
    pub rdev: specdata3,
    pub fsid: u64,
    pub fileid: fileid3,
    pub atime: nfstime3,
    pub mtime: nfstime3,
    pub ctime: nfstime3,
}
DeserializeStruct!(
    fattr3, ftype, mode, nlink, uid, gid, size, used, rdev, fsid, fileid, atime, mtime, ctime
);
SerializeStruct!(
    fattr3, ftype, mode, nlink, uid, gid, size, used, rdev, fsid, fileid, atime, mtime, ctime
);

/// Attributes returned after an operation, when the server has them.
pub type post_op_attr = Option<fattr3>;

/// A file handle returned by an operation, when the server has one.
pub type post_op_fh3 = Option<nfs_fh3>;

/// A directory handle together with a name inside it
#[derive(Clone, Debug, Default)]
pub struct diropargs3 {
    pub dir: nfs_fh3,
    pub name: filename3,
}
DeserializeStruct!(diropargs3, dir, name);
SerializeStruct!(diropargs3, dir, name);
