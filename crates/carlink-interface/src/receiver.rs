use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use carlink_transport::{TransportError, UdpEndpoint};
use tracing::{debug, trace, warn};

use crate::error::Result;
use crate::interface::Inbound;

/// Read timeout of the receive socket; bounds how long a stop waits.
const RECV_POLL: Duration = Duration::from_millis(50);

/// Receive thread of the direct UDP path.
///
/// Owns its clone of the endpoint socket. Stopping joins the thread, so
/// once [`stop`](Self::stop) returns the clone is closed and only the
/// sending half still holds the port.
#[derive(Debug)]
pub(crate) struct UdpReceiver {
    stop: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl UdpReceiver {
    pub(crate) fn spawn(endpoint: UdpEndpoint, inbound: Arc<Inbound>) -> Result<Self> {
        endpoint.set_read_timeout(Some(RECV_POLL))?;

        let stop = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&stop);
        let handle = thread::Builder::new()
            .name("carlink-udp-rx".into())
            .spawn(move || {
                let remote = endpoint.remote_addr();
                debug!(%remote, "udp receiver started");
                let mut buf = vec![0u8; UdpEndpoint::MAX_DATAGRAM];
                while !flag.load(Ordering::Relaxed) {
                    match endpoint.recv_datagram(&mut buf) {
                        Ok(Some((len, from))) => {
                            trace!(%from, len, "datagram");
                            inbound.on_datagram(&buf[..len]);
                        }
                        Ok(None) => {}
                        Err(err) => {
                            warn!(%remote, error = %err, "udp receive failed");
                            break;
                        }
                    }
                }
                debug!(%remote, "udp receiver stopped");
            })
            .map_err(TransportError::from)?;

        Ok(Self {
            stop,
            handle: Some(handle),
        })
    }

    pub(crate) fn stop(&mut self) {
        self.stop.store(true, Ordering::Relaxed);
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                warn!("udp receive thread panicked");
            }
        }
    }
}

impl Drop for UdpReceiver {
    fn drop(&mut self) {
        self.stop();
    }
}

