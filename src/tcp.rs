//! The TCP module accepts NFS client connections and serves them.
//!
//! [`NFSTcpListener`] binds the listening socket, holds the state shared by
//! all connections (handler, dispatch table, server identity, mount
//! listener) and runs the accept loop. Every accepted connection is served
//! by its own task, one call at a time.
//!
//! Accept failures that are expected to clear up on their own (aborted
//! connections, descriptor exhaustion) are retried after a delay growing
//! from 5ms to at most 1s; the delay is reset by the next successful
//! accept. Any other accept failure ends the loop and is returned.

use std::io;
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use rand::RngCore;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tracing::{error, info, info_span, warn, Instrument};

use crate::protocol::nfs;
use crate::protocol::rpc::{self, DispatchTable};
use crate::protocol::xdr;
use crate::vfs::NfsHandler;

/// First delay after a temporary accept failure
pub const INITIAL_BACKOFF: Duration = Duration::from_millis(5);
/// Upper bound of the accept retry delay
pub const MAX_BACKOFF: Duration = Duration::from_secs(1);

/// Delay between retries of a failing accept: 5ms, doubling on every
/// consecutive failure, capped at [`MAX_BACKOFF`].
#[derive(Debug, Default)]
pub struct Backoff {
    current: Duration,
}

impl Backoff {
    pub fn next_delay(&mut self) -> Duration {
        self.current = if self.current.is_zero() {
            INITIAL_BACKOFF
        } else {
            std::cmp::min(self.current * 2, MAX_BACKOFF)
        };
        self.current
    }

    pub fn reset(&mut self) {
        self.current = Duration::ZERO;
    }
}

/// Whether an accept failure is worth retrying.
pub fn is_temporary(err: &io::Error) -> bool {
    // ENFILE, EMFILE, ENOBUFS, ENOMEM
    #[cfg(target_os = "linux")]
    if matches!(err.raw_os_error(), Some(23 | 24 | 105 | 12)) {
        return true;
    }
    matches!(
        err.kind(),
        io::ErrorKind::ConnectionAborted
            | io::ErrorKind::ConnectionReset
            | io::ErrorKind::Interrupted
            | io::ErrorKind::WouldBlock
            | io::ErrorKind::TimedOut
    )
}

/// A source of client connections.
#[async_trait]
pub trait Accept: Send + Sync {
    type Stream: AsyncRead + AsyncWrite + Unpin + Send + 'static;

    /// Waits for the next connection and returns it with the peer address.
    async fn accept(&self) -> io::Result<(Self::Stream, SocketAddr)>;
}

#[async_trait]
impl Accept for TcpListener {
    type Stream = TcpStream;

    async fn accept(&self) -> io::Result<(TcpStream, SocketAddr)> {
        let (socket, peer) = TcpListener::accept(self).await?;
        let _ = socket.set_nodelay(true);
        Ok((socket, peer))
    }
}

/// Accepts connections from `listener` until it fails with a non temporary
/// error, serving each connection on its own task with a copy of `context`.
///
/// # Arguments
///
/// * `listener` - Source of connections
/// * `context` - Shared server state; `client_addr` is set per connection
pub async fn serve<L: Accept>(listener: &L, context: rpc::Context) -> io::Result<()> {
    let mut backoff = Backoff::default();
    loop {
        match listener.accept().await {
            Ok((socket, peer)) => {
                backoff.reset();
                let mut context = context.clone();
                context.client_addr = peer.to_string();
                info!("Accepting connection from {}", context.client_addr);
                spawn_connection(socket, context);
            }
            Err(e) if is_temporary(&e) => {
                let delay = backoff.next_delay();
                warn!("Accept error: {}; retrying in {:?}", e, delay);
                tokio::time::sleep(delay).await;
            }
            Err(e) => {
                error!("Accept failed: {}", e);
                return Err(e);
            }
        }
    }
}

fn spawn_connection<S>(socket: S, context: rpc::Context)
where
    S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    let span = info_span!("connection", peer = %context.client_addr);
    tokio::spawn(
        async move {
            if let Err(e) = rpc::SocketMessageHandler::new(socket, context).run().await {
                error!("Connection failed: {:?}", e);
            }
        }
        .instrument(span),
    );
}

/// Returns `configured`, or a fresh random identity when it is all zero.
pub fn server_identity(configured: [u8; 8]) -> [u8; 8] {
    if configured != [0; 8] {
        return configured;
    }
    let mut id = [0; 8];
    while id == [0; 8] {
        rand::thread_rng().fill_bytes(&mut id);
    }
    id
}

/// Generates a local loopback IP address from a 16-bit host number
/// Used for creating multiple local test addresses in the 127.88.x.y range
pub fn generate_host_ip(hostnum: u16) -> String {
    format!("127.88.{}.{}", ((hostnum >> 8) & 0xFF) as u8, (hostnum & 0xFF) as u8)
}

/// Interface of NFS TCP servers.
#[async_trait]
pub trait NFSTcp: Send + Sync {
    /// Returns the actual port number on which the server is listening
    ///
    /// This is especially useful when binding to port 0, which allows the OS
    /// to assign any available port.
    fn get_listen_port(&self) -> u16;

    /// Returns the IP address on which the server is listening
    fn get_listen_ip(&self) -> IpAddr;

    /// Registers a channel to receive notifications about mount and unmount events
    ///
    /// # Arguments
    ///
    /// * `signal` - MPSC sender that will receive boolean values:
    ///   * `true` when a client mounts the file system
    ///   * `false` when a client unmounts the file system
    fn set_mount_listener(&mut self, signal: mpsc::Sender<bool>);

    /// Accepts and serves client connections.
    ///
    /// Only returns when accepting fails with a non temporary error.
    async fn handle_forever(&self) -> io::Result<()>;
}

/// NFS server listening on a TCP socket.
pub struct NFSTcpListener {
    listener: TcpListener,
    local_addr: SocketAddr,
    handler: Arc<dyn NfsHandler>,
    dispatch: Arc<DispatchTable>,
    server_id: [u8; 8],
    mount_signal: Option<mpsc::Sender<bool>>,
}

impl NFSTcpListener {
    /// Creates a new NFS TCP listener bound to the specified IP address and port
    ///
    /// The listener answers the MOUNT and NFSv3 procedures of
    /// [`nfs::default_table`] until [`with_dispatch_table`](Self::with_dispatch_table)
    /// replaces them.
    ///
    /// # Arguments
    ///
    /// * `ipstr` - IP address and port in the format "IP:PORT" (e.g. "127.0.0.1:2049")
    ///   Special value "auto:PORT" attempts to find an available local address
    /// * `handler` - Mount resolution and handle translation of the export
    pub async fn bind(ipstr: &str, handler: impl NfsHandler + 'static) -> io::Result<NFSTcpListener> {
        let (ip, port) = ipstr.split_once(':').ok_or_else(|| {
            io::Error::new(io::ErrorKind::AddrNotAvailable, "IP Address must be of form ip:port")
        })?;
        let port = port.parse::<u16>().map_err(|_| {
            io::Error::new(io::ErrorKind::AddrNotAvailable, "Port not in range 0..=65535")
        })?;
        let handler: Arc<dyn NfsHandler> = Arc::new(handler);

        if ip != "auto" {
            return NFSTcpListener::bind_internal(ip, port, handler).await;
        }

        const NUM_TRIES: u16 = 32;
        for try_ip in 1..=NUM_TRIES {
            let ip = generate_host_ip(try_ip);
            let result = NFSTcpListener::bind_internal(&ip, port, handler.clone()).await;

            if result.is_ok() {
                return result;
            }
        }

        Err(io::Error::other("Can't bind automatically"))
    }

    async fn bind_internal(
        ip: &str,
        port: u16,
        handler: Arc<dyn NfsHandler>,
    ) -> io::Result<NFSTcpListener> {
        let ipstr = format!("{ip}:{port}");
        let listener = TcpListener::bind(&ipstr).await?;
        let local_addr = listener.local_addr()?;
        info!("Listening on {:?}", local_addr);

        let dispatch = nfs::default_table().map_err(io::Error::other)?;
        Ok(NFSTcpListener {
            listener,
            local_addr,
            handler,
            dispatch: Arc::new(dispatch),
            server_id: server_identity([0; 8]),
            mount_signal: None,
        })
    }

    /// Serves the procedures of `table` instead of the default ones.
    pub fn with_dispatch_table(mut self, table: DispatchTable) -> Self {
        self.dispatch = Arc::new(table);
        self
    }

    /// Sets the server identity; an all zero id is replaced by a random one.
    pub fn with_server_id(mut self, server_id: [u8; 8]) -> Self {
        self.server_id = server_identity(server_id);
        self
    }

    pub fn server_id(&self) -> [u8; 8] {
        self.server_id
    }

    fn context(&self) -> rpc::Context {
        rpc::Context {
            local_port: self.local_addr.port(),
            client_addr: String::new(),
            auth: xdr::rpc::auth_unix::default(),
            handler: self.handler.clone(),
            dispatch: self.dispatch.clone(),
            server_id: self.server_id,
            mount_signal: self.mount_signal.clone(),
        }
    }
}

#[async_trait]
impl NFSTcp for NFSTcpListener {
    fn get_listen_port(&self) -> u16 {
        self.local_addr.port()
    }

    fn get_listen_ip(&self) -> IpAddr {
        self.local_addr.ip()
    }

    fn set_mount_listener(&mut self, signal: mpsc::Sender<bool>) {
        self.mount_signal = Some(signal);
    }

    async fn handle_forever(&self) -> io::Result<()> {
        info!(
            "Serving {} procedures as server {:02x?}",
            self.dispatch.len(),
            self.server_id
        );
        serve(&self.listener, self.context()).await
    }
}
