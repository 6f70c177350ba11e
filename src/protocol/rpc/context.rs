//! Per-connection state passed to every procedure.

use std::fmt;
use std::sync::Arc;

use tokio::sync::mpsc;

use super::DispatchTable;
use crate::protocol::xdr;
use crate::vfs::NfsHandler;

/// Execution context of the calls arriving on one connection.
///
/// Everything except `auth` is shared with the listener and the other
/// connections and is read only.
#[derive(Clone)]
pub struct Context {
    /// Port the server is listening on
    pub local_port: u16,

    /// Client address (IP:port), used for logging
    pub client_addr: String,

    /// `AUTH_UNIX` credentials of the call being handled, default when the
    /// call carried none
    pub auth: xdr::rpc::auth_unix,

    /// Mount resolution and handle translation
    pub handler: Arc<dyn NfsHandler>,

    /// Procedures the server answers
    pub dispatch: Arc<DispatchTable>,

    /// Random identity of this server instance
    pub server_id: [u8; 8],

    /// Receives `true` on every MNT and `false` on every UMNT / UMNTALL
    pub mount_signal: Option<mpsc::Sender<bool>>,
}

impl fmt::Debug for Context {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("rpc::Context")
            .field("local_port", &self.local_port)
            .field("client_addr", &self.client_addr)
            .field("auth", &self.auth)
            .field("server_id", &self.server_id)
            .finish()
    }
}
