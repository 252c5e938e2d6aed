use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use tracing::{debug, warn};

use crate::interface::PacketInterface;

/// Period of the parser inactivity timer.
pub const TICK_INTERVAL: Duration = Duration::from_millis(10);

/// Background thread calling [`PacketInterface::on_tick`] at a fixed
/// interval. Stops and joins when dropped.
#[derive(Debug)]
pub struct Ticker {
    stop: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl Ticker {
    pub fn spawn(iface: Arc<PacketInterface>, interval: Duration) -> io::Result<Self> {
        let stop = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&stop);
        let handle = thread::Builder::new()
            .name("carlink-ticker".into())
            .spawn(move || {
                debug!(?interval, "ticker started");
                while !flag.load(Ordering::Relaxed) {
                    thread::sleep(interval);
                    iface.on_tick();
                }
                debug!("ticker stopped");
            })?;
        Ok(Self {
            stop,
            handle: Some(handle),
        })
    }

    pub fn stop(&mut self) {
        self.stop.store(true, Ordering::Relaxed);
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                warn!("ticker thread panicked");
            }
        }
    }
}

impl Drop for Ticker {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use carlink_frame::ParserConfig;

    use super::*;

    #[test]
    fn ticker_expires_partial_frames() {
        let iface = Arc::new(PacketInterface::with_config(ParserConfig {
            rx_timeout_ticks: 3,
            ..ParserConfig::default()
        }));
        let _ticker = Ticker::spawn(Arc::clone(&iface), Duration::from_millis(1)).unwrap();

        iface.on_bytes_received(&[0x02, 40, 0, 1]);
        for _ in 0..500 {
            if iface.parser_stats().timeouts == 1 {
                return;
            }
            thread::sleep(Duration::from_millis(2));
        }
        panic!("partial frame never expired");
    }

    #[test]
    fn stop_joins_thread() {
        let iface = Arc::new(PacketInterface::new());
        let mut ticker = Ticker::spawn(Arc::clone(&iface), TICK_INTERVAL).unwrap();
        ticker.stop();
        ticker.stop();
        assert_eq!(Arc::strong_count(&iface), 1);
    }
}
