use std::io::{ErrorKind, Read};
use std::net::{TcpStream, ToSocketAddrs};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{mpsc, Arc};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use carlink_interface::{Event, PacketInterface, Ticker, TICK_INTERVAL};
use carlink_transport::{StreamSink, UdpEndpoint};
use tracing::{info, warn};

use crate::cmd::LinkArgs;
use crate::exit::{
    interface_error, io_error, transport_error, CliError, CliResult, FAILURE, TIMEOUT, USAGE,
};

/// Poll interval of the TCP receive thread's stop flag.
const READ_POLL: Duration = Duration::from_millis(100);

/// An open vehicle link: the packet interface plus its ticker and, over TCP,
/// the stream receive thread. Everything stops when dropped.
pub struct Link {
    pub iface: Arc<PacketInterface>,
    pub id: u8,
    events: mpsc::Receiver<Event>,
    stop: Arc<AtomicBool>,
    reader: Option<JoinHandle<()>>,
    _ticker: Ticker,
}

impl Link {
    pub fn open(args: &LinkArgs) -> CliResult<Self> {
        let iface = Arc::new(PacketInterface::new());
        let events = iface.subscribe();
        let stop = Arc::new(AtomicBool::new(false));

        let reader = match (&args.endpoint.udp, &args.endpoint.tcp) {
            (Some(addr), None) => {
                connect_udp(&iface, addr)?;
                None
            }
            (None, Some(addr)) => Some(spawn_tcp(&iface, addr, Arc::clone(&stop))?),
            _ => {
                return Err(CliError::new(
                    USAGE,
                    "exactly one of --udp or --tcp is required",
                ))
            }
        };

        let ticker = Ticker::spawn(Arc::clone(&iface), TICK_INTERVAL)
            .map_err(|err| io_error("failed to start ticker", err))?;

        Ok(Self {
            iface,
            id: args.id,
            events,
            stop,
            reader,
            _ticker: ticker,
        })
    }

    /// Wait for the first event `pick` accepts.
    pub fn wait_for<T>(
        &self,
        timeout: Duration,
        what: &str,
        mut pick: impl FnMut(Event) -> Option<T>,
    ) -> CliResult<T> {
        let deadline = Instant::now() + timeout;
        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                break;
            }
            match self.events.recv_timeout(remaining) {
                Ok(event) => {
                    if let Some(found) = pick(event) {
                        return Ok(found);
                    }
                }
                Err(mpsc::RecvTimeoutError::Timeout) => break,
                Err(mpsc::RecvTimeoutError::Disconnected) => {
                    return Err(CliError::new(FAILURE, "link closed"))
                }
            }
        }
        Err(CliError::new(
            TIMEOUT,
            format!("no {what} within {timeout:?}"),
        ))
    }

    /// Next event, or `None` after `timeout`.
    pub fn next_event(&self, timeout: Duration) -> Option<Event> {
        self.events.recv_timeout(timeout).ok()
    }
}

impl Drop for Link {
    fn drop(&mut self) {
        self.stop.store(true, Ordering::SeqCst);
        self.iface.disconnect_udp();
        if let Some(reader) = self.reader.take() {
            if reader.join().is_err() {
                warn!("receive thread panicked");
            }
        }
    }
}

fn connect_udp(iface: &PacketInterface, addr: &str) -> CliResult<()> {
    let remote =
        UdpEndpoint::resolve(addr).map_err(|err| transport_error("invalid --udp address", err))?;
    let local = iface
        .connect_udp(remote)
        .map_err(|err| interface_error("udp connect failed", err))?
        .ok_or_else(|| CliError::new(USAGE, "--udp needs a concrete vehicle address"))?;
    info!(%remote, %local, "direct udp link open");
    Ok(())
}

fn spawn_tcp(
    iface: &Arc<PacketInterface>,
    addr: &str,
    stop: Arc<AtomicBool>,
) -> CliResult<JoinHandle<()>> {
    let target = addr
        .to_socket_addrs()
        .map_err(|err| io_error("invalid --tcp address", err))?
        .next()
        .ok_or_else(|| CliError::new(USAGE, format!("--tcp address {addr} did not resolve")))?;
    let stream = TcpStream::connect(target).map_err(|err| io_error("tcp connect failed", err))?;
    stream
        .set_nodelay(true)
        .map_err(|err| io_error("tcp setup failed", err))?;
    let mut rx = stream
        .try_clone()
        .map_err(|err| io_error("tcp setup failed", err))?;
    rx.set_read_timeout(Some(READ_POLL))
        .map_err(|err| io_error("tcp setup failed", err))?;
    info!(%target, "connected to serial bridge");
    iface.set_byte_sink(StreamSink::new(stream));

    let iface = Arc::clone(iface);
    thread::Builder::new()
        .name("carlink-tcp-rx".into())
        .spawn(move || {
            let mut buf = [0u8; 4096];
            while !stop.load(Ordering::SeqCst) {
                match rx.read(&mut buf) {
                    Ok(0) => {
                        info!("serial bridge closed the connection");
                        break;
                    }
                    Ok(n) => iface.on_bytes_received(&buf[..n]),
                    Err(err)
                        if matches!(
                            err.kind(),
                            ErrorKind::WouldBlock | ErrorKind::TimedOut | ErrorKind::Interrupted
                        ) => {}
                    Err(err) => {
                        warn!(error = %err, "tcp receive failed");
                        break;
                    }
                }
            }
        })
        .map_err(|err| io_error("failed to start receive thread", err))
}
