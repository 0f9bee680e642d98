//! Free port allocation for a new session.

use std::io;
use std::net::{SocketAddr, TcpListener};

use thiserror::Error;

use usercouch_config::BindAddress;

/// Errors raised while reserving listening ports.
#[derive(Debug, Error)]
#[error("failed to reserve a port on {address}: {source}")]
pub struct PortError {
    /// Address the listener attempted to bind.
    pub address: SocketAddr,
    /// Underlying IO error.
    #[source]
    pub source: io::Error,
}

/// Ports reserved for a session.
///
/// The listeners stay bound until [`Ports::release`] so no other process
/// can claim the ports between allocation and server start. Ports are
/// released before the server is spawned; a race in that window is
/// accepted.
#[derive(Debug)]
pub struct Ports {
    bind: BindAddress,
    http: TcpListener,
    ssl: Option<TcpListener>,
}

impl Ports {
    /// Binds an ephemeral HTTP port and, when `with_ssl` is set, a second
    /// ephemeral port for HTTPS.
    pub fn allocate(bind: BindAddress, with_ssl: bool) -> Result<Self, PortError> {
        let http = bind_ephemeral(bind)?;
        let ssl = if with_ssl {
            Some(bind_ephemeral(bind)?)
        } else {
            None
        };
        Ok(Self { bind, http, ssl })
    }

    /// OS-assigned HTTP port.
    pub fn http_port(&self) -> Result<u16, PortError> {
        local_port(self.bind, &self.http)
    }

    /// OS-assigned HTTPS port, when reserved.
    pub fn ssl_port(&self) -> Result<Option<u16>, PortError> {
        self.ssl
            .as_ref()
            .map(|listener| local_port(self.bind, listener))
            .transpose()
    }

    /// Closes every reserved listener.
    pub fn release(self) {
        drop(self);
    }
}

fn bind_ephemeral(bind: BindAddress) -> Result<TcpListener, PortError> {
    let address = SocketAddr::new(bind.ip(), 0);
    TcpListener::bind(address).map_err(|source| PortError { address, source })
}

fn local_port(bind: BindAddress, listener: &TcpListener) -> Result<u16, PortError> {
    listener
        .local_addr()
        .map(|addr| addr.port())
        .map_err(|source| PortError {
            address: SocketAddr::new(bind.ip(), 0),
            source,
        })
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    fn allocates_distinct_ports_for_http_and_ssl() {
        let ports = Ports::allocate(BindAddress::Loopback, true).expect("ports");
        let http = ports.http_port().expect("http port");
        let ssl = ports
            .ssl_port()
            .expect("ssl port")
            .expect("ssl port requested");
        assert_ne!(http, 0);
        assert_ne!(ssl, 0);
        assert_ne!(http, ssl);
    }

    #[rstest]
    fn ssl_port_is_absent_unless_requested() {
        let ports = Ports::allocate(BindAddress::Loopback, false).expect("ports");
        assert!(ports.ssl_port().expect("no error").is_none());
    }

    #[rstest]
    fn released_port_can_be_bound_again() {
        let ports = Ports::allocate(BindAddress::Loopback, false).expect("ports");
        let port = ports.http_port().expect("http port");
        ports.release();
        TcpListener::bind(("127.0.0.1", port)).expect("port should be free after release");
    }

    #[rstest]
    fn allocates_on_ipv6_loopback() {
        if TcpListener::bind(("::1", 0)).is_err() {
            eprintln!("skipping: IPv6 loopback unavailable");
            return;
        }
        let ports = Ports::allocate(BindAddress::LoopbackV6, true).expect("ports");
        let http = ports.http_port().expect("http port");
        let ssl = ports
            .ssl_port()
            .expect("ssl port")
            .expect("ssl port requested");
        assert_ne!(http, ssl);
        ports.release();
        TcpListener::bind(("::1", http)).expect("port should be free after release");
    }
}
