//! RPC message framing (RFC 5531 section 11, Record Marking Standard) and
//! the per-connection request loop.
//!
//! Every record is a sequence of fragments, each preceded by a 4-byte
//! header: the highest bit marks the last fragment of the record, the lower
//! 31 bits carry the fragment length. One record holds one call or reply.

use std::io::{self, Cursor, Write};

use anyhow::anyhow;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tracing::{debug, error, trace, warn};

use super::{ArgStream, Context, ErrorBody, Procedure, ProcedureError};
use crate::protocol::xdr::{self, deserialize, mount, nfs3, Serialize};

/// Initial size of the reply buffer of one call
const DEFAULT_RESPONSE_BUFFER_CAPACITY: usize = 8192;

/// Handles one RPC call record and writes exactly one reply to `output`.
///
/// Protocol level problems (wrong RPC version, unknown program, version or
/// procedure, procedure failures) become replies. An error is only returned
/// when the record is not an RPC call at all, in which case no reply can be
/// addressed and the connection should be closed.
pub async fn handle_rpc(
    input: &mut ArgStream,
    output: &mut Vec<u8>,
    context: &mut Context,
) -> Result<(), anyhow::Error> {
    let recv = deserialize::<xdr::rpc::rpc_msg>(input)?;
    let xid = recv.xid;
    let xdr::rpc::rpc_body::CALL(call) = recv.body else {
        error!("Unexpectedly received a Reply instead of a Call");
        return Err(anyhow!("Bad RPC Call format"));
    };

    if call.rpcvers != xdr::rpc::RPC_VERSION {
        warn!("Invalid RPC version {} != {}", call.rpcvers, xdr::rpc::RPC_VERSION);
        xdr::rpc::rpc_vers_mismatch(xid).serialize(output)?;
        return Ok(());
    }

    context.auth = match call.cred.flavor {
        xdr::rpc::auth_flavor::AUTH_UNIX => {
            match deserialize(&mut Cursor::new(&call.cred.body)) {
                Ok(auth) => auth,
                Err(e) => {
                    warn!("Undecodable AUTH_UNIX credentials: {}", e);
                    xdr::rpc::garbage_args_reply_message(xid).serialize(output)?;
                    return Ok(());
                }
            }
        }
        _ => xdr::rpc::auth_unix::default(),
    };

    let procedure = match context.dispatch.version(call.prog) {
        None => {
            warn!("Unknown RPC program number {}", call.prog);
            xdr::rpc::prog_unavail_reply_message(xid).serialize(output)?;
            return Ok(());
        }
        Some(version) if version != call.vers => {
            warn!(
                "Unsupported version {} of program {} (serving {})",
                call.vers, call.prog, version
            );
            xdr::rpc::prog_mismatch_reply_message(xid, version).serialize(output)?;
            return Ok(());
        }
        Some(_) => match context.dispatch.lookup(call.prog, call.proc) {
            Some(procedure) => *procedure,
            None => {
                warn!("Unimplemented procedure {} of program {}", call.proc, call.prog);
                xdr::rpc::proc_unavail_reply_message(xid).serialize(output)?;
                return Ok(());
            }
        },
    };

    let mut reply = Vec::with_capacity(DEFAULT_RESPONSE_BUFFER_CAPACITY);
    match (procedure.run)(xid, input, &mut reply, context).await {
        Ok(()) => Write::write_all(output, &reply)?,
        Err(e) => {
            debug!("{} failed: {}", procedure.name, e);
            write_error_reply(xid, call.prog, &procedure, &e, output)?;
        }
    }
    Ok(())
}

/// Replaces a failed procedure's reply by its status and the empty result
/// fields the procedure declares for errors.
fn write_error_reply(
    xid: u32,
    program: u32,
    procedure: &Procedure,
    err: &ProcedureError,
    output: &mut impl Write,
) -> io::Result<()> {
    xdr::rpc::make_success_reply(xid).serialize(output)?;
    if program == mount::PROGRAM {
        err.mount_status().serialize(output)?;
    } else {
        err.nfs_status().serialize(output)?;
    }
    if procedure.error_body == ErrorBody::PostOpAttr {
        nfs3::post_op_attr::None.serialize(output)?;
    }
    Ok(())
}

/// Reads one fragment and appends it to `append_to`. Returns whether it
/// was the last fragment of its record.
async fn read_fragment(
    socket: &mut (impl AsyncRead + Unpin),
    append_to: &mut Vec<u8>,
) -> io::Result<bool> {
    let mut header_buf = [0_u8; 4];
    socket.read_exact(&mut header_buf).await?;
    let fragment_header = u32::from_be_bytes(header_buf);
    let is_last = (fragment_header & (1 << 31)) > 0;
    let length = (fragment_header & ((1 << 31) - 1)) as usize;
    trace!("Reading fragment length:{}, last:{}", length, is_last);
    if append_to.len().saturating_add(length) > super::MAX_RPC_RECORD_LENGTH {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            format!("RPC record length exceeds max {}", super::MAX_RPC_RECORD_LENGTH),
        ));
    }
    let start_offset = append_to.len();
    append_to.resize(start_offset + length, 0);
    socket.read_exact(&mut append_to[start_offset..]).await?;
    Ok(is_last)
}

/// Reads one complete record. Returns `None` when the peer closed the
/// stream between records.
pub async fn read_record(
    socket: &mut (impl AsyncRead + Unpin),
) -> Result<Option<Vec<u8>>, anyhow::Error> {
    let mut record = Vec::new();
    let mut first = true;
    loop {
        match read_fragment(socket, &mut record).await {
            Ok(true) => return Ok(Some(record)),
            Ok(false) => first = false,
            Err(e) if first && e.kind() == io::ErrorKind::UnexpectedEof && record.is_empty() => {
                return Ok(None)
            }
            Err(e) => return Err(e.into()),
        }
    }
}

/// Writes `buf` as one record, split into fragments of at most 2^31 - 1 bytes.
pub async fn write_fragment(
    socket: &mut (impl AsyncWrite + Unpin),
    buf: &[u8],
) -> Result<(), anyhow::Error> {
    const MAX_FRAGMENT_SIZE: usize = (1 << 31) - 1;

    let mut offset = 0;
    loop {
        let fragment_size = std::cmp::min(buf.len() - offset, MAX_FRAGMENT_SIZE);
        let is_last = offset + fragment_size >= buf.len();
        let fragment_header =
            if is_last { fragment_size as u32 + (1 << 31) } else { fragment_size as u32 };

        socket.write_all(&u32::to_be_bytes(fragment_header)).await?;
        trace!("Writing fragment length:{}, last:{}", fragment_size, is_last);
        socket.write_all(&buf[offset..offset + fragment_size]).await?;

        offset += fragment_size;
        if is_last {
            break;
        }
    }
    socket.flush().await?;
    Ok(())
}

/// Serves the calls of one connection, one at a time.
pub struct SocketMessageHandler<S> {
    socket: S,
    context: Context,
}

impl<S: AsyncRead + AsyncWrite + Unpin> SocketMessageHandler<S> {
    pub fn new(socket: S, context: Context) -> Self {
        SocketMessageHandler { socket, context }
    }

    /// Reads one call and writes its reply. Returns `false` once the peer
    /// has closed the stream.
    pub async fn handle_next(&mut self) -> Result<bool, anyhow::Error> {
        let Some(record) = read_record(&mut self.socket).await? else {
            return Ok(false);
        };
        let mut input = Cursor::new(record);
        let mut output = Vec::with_capacity(DEFAULT_RESPONSE_BUFFER_CAPACITY);
        handle_rpc(&mut input, &mut output, &mut self.context).await?;
        write_fragment(&mut self.socket, &output).await?;
        Ok(true)
    }

    /// Serves calls until the stream closes or fails.
    pub async fn run(mut self) -> Result<(), anyhow::Error> {
        while self.handle_next().await? {}
        debug!("Connection from {} closed", self.context.client_addr);
        Ok(())
    }
}
