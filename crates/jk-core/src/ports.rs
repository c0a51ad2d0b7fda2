//! Free port discovery
//!
//! Asks the OS for unused TCP ports on loopback by binding port 0 and
//! reading back the assigned number. The temporary socket is closed before the
//! port is returned, so another process may take it in the meantime; callers
//! are expected to bind it again promptly.

use std::io;
use std::net::{Ipv4Addr, SocketAddr, TcpListener};

/// Address every temporary socket binds to
pub const LOOPBACK: Ipv4Addr = Ipv4Addr::LOCALHOST;

/// Find one available TCP port on loopback
pub fn find_available_port() -> io::Result<u16> {
    let listener = TcpListener::bind(SocketAddr::from((LOOPBACK, 0)))?;
    let port = listener.local_addr()?.port();
    tracing::debug!(port, "OS assigned ephemeral port");
    Ok(port)
}

/// Find `count` distinct available ports
///
/// All temporary sockets stay bound until every port has been read, so the OS
/// cannot hand out the same port twice within one call.
pub fn find_available_ports(count: usize) -> io::Result<Vec<u16>> {
    let listeners = (0..count)
        .map(|_| TcpListener::bind(SocketAddr::from((LOOPBACK, 0))))
        .collect::<io::Result<Vec<_>>>()?;

    let ports = listeners
        .iter()
        .map(|l| l.local_addr().map(|a| a.port()))
        .collect::<io::Result<Vec<_>>>()?;

    tracing::debug!(?ports, "OS assigned ephemeral ports");
    Ok(ports)
}
