//! Procedures of the programs the server answers.
//!
//! - `mount`: the MOUNT protocol, which gives clients the root file handle
//!   of the export.
//! - `v3`: the read-only subset of NFS version 3 (RFC 1813) needed to browse
//!   an export.
//!
//! Each program registers its procedures into a
//! [`DispatchTableBuilder`]; [`default_table`] builds the table with both.

use crate::protocol::rpc::{DispatchError, DispatchTable, DispatchTableBuilder};

pub mod mount;
pub mod v3;

/// Dispatch table serving MOUNT v3 and NFS v3.
pub fn default_table() -> Result<DispatchTable, DispatchError> {
    let mut builder = DispatchTableBuilder::new();
    mount::register(&mut builder)?;
    v3::register(&mut builder)?;
    Ok(builder.build())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::xdr::{mount, nfs3};

    #[test]
    fn default_table_serves_mount_and_nfs() {
        let table = default_table().unwrap();
        assert_eq!(table.len(), 12);
        assert_eq!(table.version(mount::PROGRAM), Some(mount::VERSION));
        assert_eq!(table.version(nfs3::PROGRAM), Some(nfs3::VERSION));
        let readdirplus = nfs3::NFSProgram::NFSPROC3_READDIRPLUS as u32;
        assert!(table.lookup(nfs3::PROGRAM, readdirplus).is_some());
        assert!(table.lookup(nfs3::PROGRAM, nfs3::NFSProgram::NFSPROC3_WRITE as u32).is_none());
        let dump = mount::MountProgram::MOUNTPROC3_DUMP as u32;
        assert!(table.lookup(mount::PROGRAM, dump).is_none());
    }

    #[test]
    fn programs_register_once() {
        let mut builder = DispatchTableBuilder::new();
        v3::register(&mut builder).unwrap();
        assert!(matches!(
            v3::register(&mut builder),
            Err(DispatchError::AlreadyRegistered { .. })
        ));
    }
}
