//! Implementation of the `READDIRPLUS` procedure (procedure 17) for NFS version 3 protocol
//! as defined in RFC 1813 section 3.3.17.
//!
//! `READDIRPLUS` returns directory entries together with their attributes and
//! file handles, so clients need no separate `LOOKUP` per entry.
//!
//! Cookies are positions in the directory listing:
//!
//! | cookie | meaning                                   |
//! |--------|-------------------------------------------|
//! | 0      | start a fresh listing                     |
//! | 1      | the synthetic `.` entry                   |
//! | 2      | the synthetic `..` entry                  |
//! | n >= 3 | real entry at index `n - 3` of the listing |
//!
//! A call with cookie `n > 0` resumes at index `n - 3` (index 0 for cookies 1
//! and 2) of a fresh listing of the directory. There is no snapshot between
//! calls: if the directory changes while a client pages through it, entries
//! can be skipped or repeated. The cookie verifier is always zero and is not
//! checked.
//!
//! Budgets: every real entry costs `name length + 20` bytes of `dircount` and
//! an estimated 512 bytes of `maxcount`, on top of 100 bytes of reply
//! overhead. An entry is also refused when its actual encoding would push the
//! reply past `maxcount`, and no more entries are added once more than half
//! the handle capacity of the server has been minted.

use std::io::{Read, Write};

use tracing::{debug, trace};

use super::{resolve, stale_if_missing};
use crate::fs_util::metadata_to_fattr3;
use crate::handle;
use crate::protocol::rpc::{self, decode_args, ProcedureError};
use crate::protocol::xdr::{self, nfs3, Serialize};
use crate::write_counter::WriteCounter;

/// Smallest `dircount` served; smaller budgets get `NFS3ERR_TOOSMALL`.
pub const MIN_DIR_COUNT: u32 = 1024;
/// Smallest `maxcount` served; smaller budgets get `NFS3ERR_TOOSMALL`.
pub const MIN_MAX_COUNT: u32 = 4096;

/// Estimated reply bytes before the first entry
const BASE_OVERHEAD: u64 = 100;
/// Estimated `dircount` cost of an entry, besides its name
const NAME_OVERHEAD: u64 = 20;
/// Estimated `maxcount` cost of an entry with attributes and handle
const ENTRY_ESTIMATE: u64 = 512;
/// The final `value_follows` FALSE and the `eof` flag
const TRAILER_LEN: usize = 8;

const COOKIE_DOT: nfs3::cookie3 = 1;
const COOKIE_DOTDOT: nfs3::cookie3 = 2;
const FIRST_ENTRY_COOKIE: nfs3::cookie3 = 3;

fn synthetic_entry(name: &str, fileid: nfs3::fileid3, cookie: nfs3::cookie3) -> nfs3::dir::entryplus3 {
    nfs3::dir::entryplus3 {
        fileid,
        name: name.into(),
        cookie,
        name_attributes: None,
        name_handle: None,
    }
}

/// Handles `NFSv3` `READDIRPLUS` procedure (procedure 17)
///
/// Reply layout after the status: directory attributes, the zero cookie
/// verifier, then for a fresh listing the `.` and `..` entries, then the
/// accepted real entries, each preceded by a TRUE `value_follows`, a final
/// FALSE and the `eof` flag. `eof` is only set when the listing was
/// exhausted.
///
/// # Arguments
///
/// * `xid` - RPC transaction ID
/// * `input` - Input stream containing the `READDIRPLUS` arguments
/// * `output` - Output stream for writing the response
/// * `context` - Server context
///
/// # Returns
///
/// * `NFS3ERR_INVAL` for undecodable arguments
/// * `NFS3ERR_STALE` for unresolvable handles
/// * `NFS3ERR_TOOSMALL` when the budgets are below the served minimum, or
///   too small for a single entry while entries remain
/// * `NFS3ERR_NOTDIR` when the handle names something other than a directory
pub async fn nfsproc3_readdirplus(
    xid: u32,
    input: &mut impl Read,
    output: &mut impl Write,
    context: &rpc::Context,
) -> Result<(), ProcedureError> {
    let args = decode_args::<nfs3::dir::READDIRPLUS3args>(input)?;
    debug!("nfsproc3_readdirplus({:?},{:?}) ", xid, args);

    let dir = resolve(context, &args.dir)?;
    if args.dircount < MIN_DIR_COUNT || args.maxcount < MIN_MAX_COUNT {
        debug!(" -- budget too small: dircount {} maxcount {}", args.dircount, args.maxcount);
        return Err(nfs3::nfsstat3::NFS3ERR_TOOSMALL.into());
    }

    let contents = dir.fs.list_directory(&dir.path).await.map_err(stale_if_missing)?;
    let dir_attr = dir.attributes().await.ok();

    let fresh = args.cookie == 0;
    let start = if fresh {
        0
    } else {
        usize::try_from(args.cookie.saturating_sub(FIRST_ENTRY_COOKIE)).unwrap_or(usize::MAX)
    };

    let mut reply = WriteCounter::new(Vec::new());
    nfs3::nfsstat3::NFS3_OK.serialize(&mut reply)?;
    dir_attr.serialize(&mut reply)?;
    nfs3::cookieverf3::default().serialize(&mut reply)?;

    if fresh {
        let parent_id = if dir.is_root() {
            0
        } else {
            let parent = &dir.segments[..dir.segments.len() - 1];
            handle::file_id(&context.handler.to_handle(dir.fs.as_ref(), parent))
        };
        for entry in [
            synthetic_entry(".", dir.fileid, COOKIE_DOT),
            synthetic_entry("..", parent_id, COOKIE_DOTDOT),
        ] {
            true.serialize(&mut reply)?;
            entry.serialize(&mut reply)?;
        }
    }

    let max_handles = context.handler.handle_capacity() / 2;
    let mut dir_bytes: u64 = 0;
    let mut max_bytes: u64 = BASE_OVERHEAD;
    let mut accepted = 0;
    let mut index = start;
    let mut entry_buf = Vec::new();
    while index < contents.len() {
        let content = &contents[index];
        dir_bytes += content.name.len() as u64 + NAME_OVERHEAD;
        max_bytes += ENTRY_ESTIMATE;
        if dir_bytes > args.dircount as u64
            || max_bytes > args.maxcount as u64
            || accepted > max_handles
        {
            trace!(" -- estimated budget exhausted after {} entries", accepted);
            break;
        }

        let mut segments = dir.segments.clone();
        segments.push(content.name.clone());
        let handle = context.handler.to_handle(dir.fs.as_ref(), &segments);
        let fileid = handle::file_id(&handle);
        let entry = nfs3::dir::entryplus3 {
            fileid,
            name: content.name.as_str().into(),
            cookie: index as u64 + FIRST_ENTRY_COOKIE,
            name_attributes: Some(metadata_to_fattr3(fileid, &content.meta)),
            name_handle: Some(handle),
        };
        entry_buf.clear();
        true.serialize(&mut entry_buf)?;
        entry.serialize(&mut entry_buf)?;
        if reply.bytes_written() + entry_buf.len() + TRAILER_LEN > args.maxcount as usize {
            trace!(" -- maxcount reached after {} entries", accepted);
            break;
        }
        trace!("  -- dirent {:?}", entry);
        reply.write_all(&entry_buf)?;
        accepted += 1;
        index += 1;
    }

    let eof = index >= contents.len();
    if !eof && accepted == 0 {
        debug!(" -- no entry fits dircount {} maxcount {}", args.dircount, args.maxcount);
        return Err(nfs3::nfsstat3::NFS3ERR_TOOSMALL.into());
    }
    false.serialize(&mut reply)?;
    eof.serialize(&mut reply)?;
    debug!(
        "readdirplus {:?} start at {}, sending {} entries, eof {}",
        dir.path, args.cookie, accepted, eof
    );

    xdr::rpc::make_success_reply(xid).serialize(output)?;
    output.write_all(&reply.into_inner())?;
    Ok(())
}
