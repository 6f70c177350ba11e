//! Conversions between file system metadata and NFS attributes.

use std::fs;

#[cfg(unix)]
use std::os::unix::fs::MetadataExt;

use crate::protocol::xdr::nfs3;
use crate::vfs::{EntryKind, Metadata};

/// Builds the NFS attributes of an object.
///
/// # Arguments
///
/// * `fileid` - File id reported for the object; the id embedded in its handle
/// * `meta` - Metadata reported by the backing file system
pub fn metadata_to_fattr3(fileid: nfs3::fileid3, meta: &Metadata) -> nfs3::fattr3 {
    let (ftype, default_nlink) = match meta.kind {
        EntryKind::File => (nfs3::ftype3::NF3REG, 1),
        EntryKind::Directory => (nfs3::ftype3::NF3DIR, 2),
        EntryKind::Symlink => (nfs3::ftype3::NF3LNK, 1),
        EntryKind::Other => (nfs3::ftype3::NF3FIFO, 1),
    };
    nfs3::fattr3 {
        ftype,
        mode: meta.mode & 0o7777,
        nlink: if meta.nlink == 0 { default_nlink } else { meta.nlink },
        uid: meta.uid,
        gid: meta.gid,
        size: meta.size,
        used: meta.size,
        rdev: nfs3::specdata3::default(),
        fsid: 0,
        fileid,
        atime: meta.atime,
        mtime: meta.mtime,
        ctime: meta.ctime,
    }
}

fn entry_kind(file_type: fs::FileType) -> EntryKind {
    if file_type.is_dir() {
        EntryKind::Directory
    } else if file_type.is_symlink() {
        EntryKind::Symlink
    } else if file_type.is_file() {
        EntryKind::File
    } else {
        EntryKind::Other
    }
}

/// Converts metadata of a local file, as returned by `symlink_metadata`.
#[cfg(unix)]
pub fn local_metadata(meta: &fs::Metadata) -> Metadata {
    Metadata {
        kind: entry_kind(meta.file_type()),
        mode: meta.mode(),
        nlink: meta.nlink() as u32,
        uid: meta.uid(),
        gid: meta.gid(),
        size: meta.size(),
        atime: filetime::FileTime::from_last_access_time(meta).into(),
        mtime: filetime::FileTime::from_last_modification_time(meta).into(),
        ctime: nfs3::nfstime3 {
            seconds: meta.ctime().clamp(0, u32::MAX as i64) as u32,
            nseconds: meta.ctime_nsec() as u32,
        },
    }
}

/// Converts metadata of a local file, as returned by `symlink_metadata`.
#[cfg(not(unix))]
pub fn local_metadata(meta: &fs::Metadata) -> Metadata {
    let kind = entry_kind(meta.file_type());
    let mode = match (kind, meta.permissions().readonly()) {
        (EntryKind::Directory, _) => 0o755,
        (_, true) => 0o444,
        (_, false) => 0o644,
    };
    let mtime: nfs3::nfstime3 = filetime::FileTime::from_last_modification_time(meta).into();
    Metadata {
        kind,
        mode,
        nlink: 0,
        uid: 0,
        gid: 0,
        size: meta.len(),
        atime: filetime::FileTime::from_last_access_time(meta).into(),
        mtime,
        ctime: filetime::FileTime::from_creation_time(meta).map(Into::into).unwrap_or(mtime),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn directory_attributes() {
        let meta = Metadata {
            kind: EntryKind::Directory,
            mode: 0o40755,
            size: 4096,
            mtime: nfs3::nfstime3 { seconds: 10, nseconds: 5 },
            ..Default::default()
        };
        let attr = metadata_to_fattr3(42, &meta);
        assert_eq!(attr.ftype, nfs3::ftype3::NF3DIR);
        assert_eq!(attr.mode, 0o755);
        assert_eq!(attr.nlink, 2);
        assert_eq!(attr.fileid, 42);
        assert_eq!(attr.size, 4096);
        assert_eq!(attr.mtime, nfs3::nfstime3 { seconds: 10, nseconds: 5 });
    }
}
