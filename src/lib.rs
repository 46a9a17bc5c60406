//!
//! Blocking client for the Source engine A2S query protocol.
//!
//! The `rgs_a2s` crate retrieves server metadata, the connected player list
//! and server rules from a game server over UDP, without joining a game.
//!
//! ```no_run
//! let client = rgs_a2s::Client::new("127.0.0.1:27015".parse().unwrap());
//! match client.query_server_info() {
//!     Ok(info) => println!("{} on {}", info.name, info.map),
//!     Err(e) => eprintln!("query failed: {}", e),
//! }
//! ```

pub mod errors;
pub mod models;
pub mod protocols;
pub mod transport;

pub use errors::{QueryError, Result};
pub use models::*;
pub use transport::{Connector, Transport, UdpConnector, UdpTransport};

use anyhow::Context;
use protocols::a2s::{self, challenge};
use std::{
    net::{SocketAddr, ToSocketAddrs},
    time::Duration,
};
use tracing::{debug, debug_span};

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(1);
/// Large enough for single-packet rule sets.
pub const DEFAULT_BUFFER_SIZE: usize = 81920;

/// Queries one game server. Holds configuration only; every query opens and
/// releases its own connection and returns a freshly decoded value.
#[derive(Clone, Debug)]
pub struct Client<C = UdpConnector> {
    addr: SocketAddr,
    timeout: Duration,
    buffer_size: usize,
    connector: C,
}

impl Client {
    pub fn new(addr: SocketAddr) -> Self {
        ClientBuilder::new(addr).build()
    }

    pub fn builder(addr: SocketAddr) -> ClientBuilder {
        ClientBuilder::new(addr)
    }
}

impl<C: Connector> Client<C> {
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// A2S_INFO. Sent once, without a challenge.
    pub fn query_server_info(&self) -> Result<ServerInfo> {
        self.with_connection(QueryKind::Info, |transport, buf| {
            let request = a2s::encode_request(QueryKind::Info, None);
            let body = challenge::round_trip(transport, &request, buf)?;
            a2s::decode_info(body, self.addr)
        })
    }

    /// A2S_PLAYER, after completing the challenge handshake.
    pub fn query_players(&self) -> Result<Vec<Player>> {
        self.with_connection(QueryKind::Player, |transport, buf| {
            let body = challenge::challenged_request(transport, QueryKind::Player, buf)?;
            a2s::decode_player_response(&body)
        })
    }

    /// A2S_RULES, after completing the challenge handshake.
    pub fn query_rules(&self) -> Result<Rules> {
        self.with_connection(QueryKind::Rules, |transport, buf| {
            let body = challenge::challenged_request(transport, QueryKind::Rules, buf)?;
            a2s::decode_rules_response(&body)
        })
    }

    fn with_connection<T, F>(&self, kind: QueryKind, f: F) -> Result<T>
    where
        F: FnOnce(&mut C::Transport, &mut [u8]) -> Result<T>,
    {
        let span = debug_span!("query", %kind, addr = %self.addr);
        let _enter = span.enter();

        let mut transport = self
            .connector
            .connect(self.addr, self.timeout)
            .with_context(|| format!("Failed to open connection to {}", self.addr))?;
        let mut buf = vec![0u8; self.buffer_size];

        let result = f(&mut transport, &mut buf);
        drop(transport);

        match &result {
            Ok(_) => debug!("Query succeeded"),
            Err(e) => debug!(error = %e, "Query failed"),
        }
        result
    }
}

/// Configures a `Client`.
#[derive(Clone, Debug)]
pub struct ClientBuilder<C = UdpConnector> {
    addr: SocketAddr,
    timeout: Duration,
    buffer_size: usize,
    connector: C,
}

impl ClientBuilder {
    pub fn new(addr: SocketAddr) -> Self {
        Self {
            addr,
            timeout: DEFAULT_TIMEOUT,
            buffer_size: DEFAULT_BUFFER_SIZE,
            connector: UdpConnector,
        }
    }

    /// Resolves `target` (e.g. `("example.com", 27015)`) and uses its first address.
    pub fn resolve<A: ToSocketAddrs>(target: A) -> Result<Self> {
        let addr = target
            .to_socket_addrs()
            .context("Failed to resolve host")?
            .next()
            .ok_or_else(|| QueryError::Unknown("Host resolved to no addresses".into()))?;
        Ok(Self::new(addr))
    }
}

impl<C> ClientBuilder<C> {
    /// Bounds each individual receive. Zero is treated as one millisecond.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout.max(Duration::from_millis(1));
        self
    }

    pub fn with_buffer_size(mut self, size: usize) -> Self {
        self.buffer_size = size;
        self
    }

    pub fn with_connector<C2: Connector>(self, connector: C2) -> ClientBuilder<C2> {
        ClientBuilder {
            addr: self.addr,
            timeout: self.timeout,
            buffer_size: self.buffer_size,
            connector,
        }
    }

    pub fn build(self) -> Client<C> {
        Client {
            addr: self.addr,
            timeout: self.timeout,
            buffer_size: self.buffer_size,
            connector: self.connector,
        }
    }
}
