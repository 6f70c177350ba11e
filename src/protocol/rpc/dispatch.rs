//! Routing of `(program, procedure)` pairs to procedure implementations.
//!
//! The table is filled through a [`DispatchTableBuilder`] before the server
//! starts and frozen by [`DispatchTableBuilder::build`]. Connections only
//! ever read the resulting [`DispatchTable`], so it is shared without locks.

use std::collections::HashMap;
use std::io::{Cursor, Read};

use futures::future::BoxFuture;
use thiserror::Error;

use super::Context;
use crate::handle::HandleError;
use crate::protocol::xdr::{self, mount, nfs3, Deserialize};
use crate::vfs::FsError;

/// Arguments of one call: the record bytes, positioned after the RPC header.
pub type ArgStream = Cursor<Vec<u8>>;

/// Implementation of one procedure.
///
/// It reads its arguments from the stream and writes a complete reply,
/// starting with the RPC success header, to the buffer. The buffer is only
/// sent when `Ok` is returned; on `Err` it is dropped and a reply carrying
/// the error status is generated instead.
pub type ProcedureFn = for<'a> fn(
    xid: u32,
    input: &'a mut ArgStream,
    output: &'a mut Vec<u8>,
    context: &'a Context,
) -> BoxFuture<'a, Result<(), ProcedureError>>;

/// Result fields following the status in a generated error reply.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ErrorBody {
    /// The status is the whole reply
    Empty,
    /// A `post_op_attr` without attributes follows the status
    PostOpAttr,
}

#[derive(Copy, Clone)]
pub struct Procedure {
    /// Name used in logs
    pub name: &'static str,
    pub run: ProcedureFn,
    pub error_body: ErrorBody,
}

impl std::fmt::Debug for Procedure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Procedure")
            .field("name", &self.name)
            .field("error_body", &self.error_body)
            .finish()
    }
}

/// An RPC program and the single version of it that is served.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct RpcProgram {
    pub number: u32,
    pub version: u32,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DispatchError {
    #[error("procedure {procedure} of program {program} is already registered")]
    AlreadyRegistered { program: u32, procedure: u32 },
    #[error("program {program} is served as version {registered}, not {requested}")]
    VersionConflict { program: u32, registered: u32, requested: u32 },
}

/// Failure of a procedure that is reported to the client as a status.
#[derive(Debug, Error)]
pub enum ProcedureError {
    #[error("{0:?}")]
    Nfs(nfs3::nfsstat3),
    #[error("{0:?}")]
    Mount(mount::mountstat3),
    /// The arguments could not be decoded
    #[error("malformed arguments: {0}")]
    BadArgs(std::io::Error),
    /// The reply could not be encoded
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl ProcedureError {
    pub fn nfs_status(&self) -> nfs3::nfsstat3 {
        match self {
            ProcedureError::Nfs(stat) => *stat,
            ProcedureError::Mount(stat) => match stat {
                mount::mountstat3::MNT3_OK => nfs3::nfsstat3::NFS3_OK,
                mount::mountstat3::MNT3ERR_PERM => nfs3::nfsstat3::NFS3ERR_PERM,
                mount::mountstat3::MNT3ERR_NOENT => nfs3::nfsstat3::NFS3ERR_NOENT,
                mount::mountstat3::MNT3ERR_IO => nfs3::nfsstat3::NFS3ERR_IO,
                mount::mountstat3::MNT3ERR_ACCES => nfs3::nfsstat3::NFS3ERR_ACCES,
                mount::mountstat3::MNT3ERR_NOTDIR => nfs3::nfsstat3::NFS3ERR_NOTDIR,
                mount::mountstat3::MNT3ERR_INVAL => nfs3::nfsstat3::NFS3ERR_INVAL,
                mount::mountstat3::MNT3ERR_NAMETOOLONG => nfs3::nfsstat3::NFS3ERR_NAMETOOLONG,
                mount::mountstat3::MNT3ERR_NOTSUPP => nfs3::nfsstat3::NFS3ERR_NOTSUPP,
                mount::mountstat3::MNT3ERR_SERVERFAULT => nfs3::nfsstat3::NFS3ERR_SERVERFAULT,
            },
            ProcedureError::BadArgs(_) => nfs3::nfsstat3::NFS3ERR_INVAL,
            ProcedureError::Io(_) => nfs3::nfsstat3::NFS3ERR_SERVERFAULT,
        }
    }

    pub fn mount_status(&self) -> mount::mountstat3 {
        match self {
            ProcedureError::Mount(stat) => *stat,
            ProcedureError::Nfs(stat) => match stat {
                nfs3::nfsstat3::NFS3_OK => mount::mountstat3::MNT3_OK,
                nfs3::nfsstat3::NFS3ERR_PERM => mount::mountstat3::MNT3ERR_PERM,
                nfs3::nfsstat3::NFS3ERR_NOENT | nfs3::nfsstat3::NFS3ERR_STALE => {
                    mount::mountstat3::MNT3ERR_NOENT
                }
                nfs3::nfsstat3::NFS3ERR_IO => mount::mountstat3::MNT3ERR_IO,
                nfs3::nfsstat3::NFS3ERR_ACCES => mount::mountstat3::MNT3ERR_ACCES,
                nfs3::nfsstat3::NFS3ERR_NOTDIR => mount::mountstat3::MNT3ERR_NOTDIR,
                nfs3::nfsstat3::NFS3ERR_INVAL => mount::mountstat3::MNT3ERR_INVAL,
                nfs3::nfsstat3::NFS3ERR_NAMETOOLONG => mount::mountstat3::MNT3ERR_NAMETOOLONG,
                nfs3::nfsstat3::NFS3ERR_NOTSUPP => mount::mountstat3::MNT3ERR_NOTSUPP,
                _ => mount::mountstat3::MNT3ERR_SERVERFAULT,
            },
            ProcedureError::BadArgs(_) => mount::mountstat3::MNT3ERR_INVAL,
            ProcedureError::Io(_) => mount::mountstat3::MNT3ERR_SERVERFAULT,
        }
    }
}

impl From<nfs3::nfsstat3> for ProcedureError {
    fn from(stat: nfs3::nfsstat3) -> Self {
        ProcedureError::Nfs(stat)
    }
}

impl From<mount::mountstat3> for ProcedureError {
    fn from(stat: mount::mountstat3) -> Self {
        ProcedureError::Mount(stat)
    }
}

impl From<HandleError> for ProcedureError {
    fn from(err: HandleError) -> Self {
        ProcedureError::Nfs(err.status())
    }
}

impl From<FsError> for ProcedureError {
    fn from(err: FsError) -> Self {
        ProcedureError::Nfs(err.status())
    }
}

/// Decodes procedure arguments, reporting failures as [`ProcedureError::BadArgs`].
pub fn decode_args<T: Deserialize + Default>(
    input: &mut impl Read,
) -> Result<T, ProcedureError> {
    xdr::deserialize(input).map_err(ProcedureError::BadArgs)
}

/// Collects procedure registrations before serving starts.
#[derive(Default)]
pub struct DispatchTableBuilder {
    versions: HashMap<u32, u32>,
    procedures: HashMap<(u32, u32), Procedure>,
}

impl DispatchTableBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `procedure` of `program`. A pair can only be registered
    /// once; a failed registration leaves the table unchanged.
    pub fn register(
        &mut self,
        program: RpcProgram,
        procedure: u32,
        implementation: Procedure,
    ) -> Result<(), DispatchError> {
        if let Some(&registered) = self.versions.get(&program.number) {
            if registered != program.version {
                return Err(DispatchError::VersionConflict {
                    program: program.number,
                    registered,
                    requested: program.version,
                });
            }
        }
        let key = (program.number, procedure);
        if self.procedures.contains_key(&key) {
            return Err(DispatchError::AlreadyRegistered { program: program.number, procedure });
        }
        self.versions.insert(program.number, program.version);
        self.procedures.insert(key, implementation);
        Ok(())
    }

    pub fn build(self) -> DispatchTable {
        DispatchTable { versions: self.versions, procedures: self.procedures }
    }
}

/// Frozen routing table consulted for every call.
#[derive(Debug)]
pub struct DispatchTable {
    versions: HashMap<u32, u32>,
    procedures: HashMap<(u32, u32), Procedure>,
}

impl DispatchTable {
    pub fn lookup(&self, program: u32, procedure: u32) -> Option<&Procedure> {
        self.procedures.get(&(program, procedure))
    }

    /// Served version of `program`, `None` when nothing of it is registered.
    pub fn version(&self, program: u32) -> Option<u32> {
        self.versions.get(&program).copied()
    }

    pub fn len(&self) -> usize {
        self.procedures.len()
    }

    pub fn is_empty(&self) -> bool {
        self.procedures.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PROGRAM: RpcProgram = RpcProgram { number: 400_000, version: 1 };

    fn noop<'a>(
        _xid: u32,
        _input: &'a mut ArgStream,
        _output: &'a mut Vec<u8>,
        _context: &'a Context,
    ) -> BoxFuture<'a, Result<(), ProcedureError>> {
        Box::pin(async { Ok(()) })
    }

    fn procedure(name: &'static str) -> Procedure {
        Procedure { name, run: noop, error_body: ErrorBody::Empty }
    }

    #[test]
    fn duplicate_registration_keeps_first() {
        let mut builder = DispatchTableBuilder::new();
        builder.register(PROGRAM, 1, procedure("first")).unwrap();
        let err = builder.register(PROGRAM, 1, procedure("second")).unwrap_err();
        assert_eq!(err, DispatchError::AlreadyRegistered { program: 400_000, procedure: 1 });

        let table = builder.build();
        assert_eq!(table.len(), 1);
        assert_eq!(table.lookup(400_000, 1).unwrap().name, "first");
    }

    #[test]
    fn unknown_keys_have_no_handler() {
        let mut builder = DispatchTableBuilder::new();
        builder.register(PROGRAM, 0, procedure("null")).unwrap();
        let table = builder.build();
        assert!(table.lookup(400_000, 7).is_none());
        assert!(table.lookup(1, 0).is_none());
        assert_eq!(table.version(400_000), Some(1));
        assert_eq!(table.version(1), None);
    }

    #[test]
    fn one_version_per_program() {
        let mut builder = DispatchTableBuilder::new();
        builder.register(PROGRAM, 0, procedure("null")).unwrap();
        let err = builder
            .register(RpcProgram { number: 400_000, version: 2 }, 1, procedure("v2"))
            .unwrap_err();
        assert_eq!(
            err,
            DispatchError::VersionConflict { program: 400_000, registered: 1, requested: 2 }
        );
        assert!(builder.build().lookup(400_000, 1).is_none());
    }

    #[test]
    fn error_statuses_follow_the_program() {
        let err = ProcedureError::BadArgs(std::io::ErrorKind::UnexpectedEof.into());
        assert_eq!(err.nfs_status(), nfs3::nfsstat3::NFS3ERR_INVAL);
        assert_eq!(err.mount_status(), mount::mountstat3::MNT3ERR_INVAL);

        let err = ProcedureError::from(HandleError::Stale);
        assert_eq!(err.nfs_status(), nfs3::nfsstat3::NFS3ERR_STALE);
    }
}
