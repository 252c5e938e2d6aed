use std::io::ErrorKind;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr, ToSocketAddrs, UdpSocket};
use std::time::Duration;

use tracing::{debug, info, trace};

use crate::error::{Result, TransportError};

/// UDP endpoint for direct (unframed) delivery to one vehicle.
///
/// Every outbound payload becomes exactly one datagram addressed to the
/// remote. Inbound datagrams are accepted from any sender; the remote side
/// does its own demultiplexing.
#[derive(Debug)]
pub struct UdpEndpoint {
    socket: UdpSocket,
    remote: SocketAddr,
}

impl UdpEndpoint {
    /// Largest datagram the endpoint will read.
    pub const MAX_DATAGRAM: usize = 65_507;

    /// Connect to `remote`, binding the local socket to `remote.port() + 1`
    /// on all interfaces (the vehicle replies to that port).
    pub fn connect(remote: SocketAddr) -> Result<Self> {
        let unspecified = match remote.ip() {
            IpAddr::V4(_) => IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            IpAddr::V6(_) => IpAddr::V6(Ipv6Addr::UNSPECIFIED),
        };
        let local_port = remote.port().checked_add(1).unwrap_or(0);
        Self::bind(SocketAddr::new(unspecified, local_port), remote)
    }

    /// Bind to an explicit local address and target `remote`.
    pub fn bind(local: SocketAddr, remote: SocketAddr) -> Result<Self> {
        let socket = UdpSocket::bind(local).map_err(|source| TransportError::Bind {
            addr: local,
            source,
        })?;
        info!(%remote, local = %socket.local_addr()?, "udp endpoint ready");
        Ok(Self { socket, remote })
    }

    /// Resolve `host:port` to the first matching socket address.
    pub fn resolve(addr: &str) -> Result<SocketAddr> {
        let mut addrs = addr
            .to_socket_addrs()
            .map_err(|source| TransportError::Connect {
                addr: addr.to_string(),
                source,
            })?;
        addrs.next().ok_or_else(|| TransportError::Connect {
            addr: addr.to_string(),
            source: std::io::Error::new(ErrorKind::NotFound, "address did not resolve"),
        })
    }

    /// Send one payload as a single datagram.
    pub fn send_datagram(&self, payload: &[u8]) -> Result<()> {
        let written = self.socket.send_to(payload, self.remote)?;
        if written != payload.len() {
            return Err(TransportError::ShortWrite {
                written,
                len: payload.len(),
            });
        }
        trace!(remote = %self.remote, size = written, "datagram sent");
        Ok(())
    }

    /// Receive one datagram into `buf`.
    ///
    /// Returns `Ok(None)` when the read timeout elapses without data.
    pub fn recv_datagram(&self, buf: &mut [u8]) -> Result<Option<(usize, SocketAddr)>> {
        match self.socket.recv_from(buf) {
            Ok((len, from)) => {
                trace!(%from, size = len, "datagram received");
                Ok(Some((len, from)))
            }
            Err(err) if matches!(err.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut) => {
                Ok(None)
            }
            Err(err) if err.kind() == ErrorKind::Interrupted => Ok(None),
            Err(err) => Err(TransportError::Io(err)),
        }
    }

    /// Set read timeout for [`recv_datagram`](Self::recv_datagram).
    pub fn set_read_timeout(&self, timeout: Option<Duration>) -> Result<()> {
        self.socket.set_read_timeout(timeout).map_err(Into::into)
    }

    /// Try to clone this endpoint (shares the underlying socket).
    pub fn try_clone(&self) -> Result<Self> {
        Ok(Self {
            socket: self.socket.try_clone()?,
            remote: self.remote,
        })
    }

    /// Remote address datagrams are sent to.
    pub fn remote_addr(&self) -> SocketAddr {
        self.remote
    }

    /// Local address of the bound socket.
    pub fn local_addr(&self) -> Result<SocketAddr> {
        self.socket.local_addr().map_err(Into::into)
    }
}

impl Drop for UdpEndpoint {
    fn drop(&mut self) {
        debug!(remote = %self.remote, "udp endpoint closed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn loopback() -> SocketAddr {
        SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), 0)
    }

    #[test]
    fn datagrams_flow_between_endpoints() {
        let vehicle = UdpSocket::bind(loopback()).unwrap();
        let vehicle_addr = vehicle.local_addr().unwrap();

        let endpoint = UdpEndpoint::bind(loopback(), vehicle_addr).unwrap();
        endpoint.send_datagram(&[1, 12]).unwrap();

        let mut buf = [0u8; 16];
        let (len, from) = vehicle.recv_from(&mut buf).unwrap();
        assert_eq!(&buf[..len], &[1, 12]);

        vehicle.send_to(&[1, 9], from).unwrap();
        endpoint
            .set_read_timeout(Some(Duration::from_secs(2)))
            .unwrap();
        let (len, _) = endpoint.recv_datagram(&mut buf).unwrap().unwrap();
        assert_eq!(&buf[..len], &[1, 9]);
    }

    #[test]
    fn recv_times_out_with_none() {
        let endpoint = UdpEndpoint::bind(loopback(), loopback()).unwrap();
        endpoint
            .set_read_timeout(Some(Duration::from_millis(20)))
            .unwrap();
        let mut buf = [0u8; 8];
        assert!(endpoint.recv_datagram(&mut buf).unwrap().is_none());
    }

    #[test]
    fn resolve_rejects_garbage() {
        assert!(matches!(
            UdpEndpoint::resolve("not an address"),
            Err(TransportError::Connect { .. })
        ));
        assert_eq!(
            UdpEndpoint::resolve("127.0.0.1:8300").unwrap().port(),
            8300
        );
    }

    #[test]
    fn clone_shares_remote() {
        let endpoint = UdpEndpoint::bind(loopback(), "127.0.0.1:9".parse().unwrap()).unwrap();
        let clone = endpoint.try_clone().unwrap();
        assert_eq!(clone.remote_addr(), endpoint.remote_addr());
        assert_eq!(clone.local_addr().unwrap(), endpoint.local_addr().unwrap());
    }
}
