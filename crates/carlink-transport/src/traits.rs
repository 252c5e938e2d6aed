use std::io::{ErrorKind, Write};
use std::sync::mpsc;

use bytes::Bytes;

use crate::error::{Result, TransportError};

/// Destination for framed output bytes.
///
/// The link layer hands complete, already-framed byte runs to the sink; the
/// sink is responsible for the physical delivery (serial driver, TCP bridge,
/// test harness).
pub trait ByteSink: Send {
    /// Deliver one run of bytes.
    fn send_bytes(&mut self, bytes: &[u8]) -> Result<()>;
}

impl ByteSink for mpsc::Sender<Bytes> {
    fn send_bytes(&mut self, bytes: &[u8]) -> Result<()> {
        self.send(Bytes::copy_from_slice(bytes))
            .map_err(|_| TransportError::Closed)
    }
}

impl<S: ByteSink + ?Sized> ByteSink for Box<S> {
    fn send_bytes(&mut self, bytes: &[u8]) -> Result<()> {
        (**self).send_bytes(bytes)
    }
}

/// Adapts a closure into a [`ByteSink`].
pub struct FnSink<F>(pub F);

impl<F> ByteSink for FnSink<F>
where
    F: FnMut(&[u8]) -> Result<()> + Send,
{
    fn send_bytes(&mut self, bytes: &[u8]) -> Result<()> {
        (self.0)(bytes)
    }
}

/// Writes byte runs to any `Write` stream.
pub struct StreamSink<W> {
    inner: W,
}

impl<W: Write + Send> StreamSink<W> {
    /// Wrap a stream.
    pub fn new(inner: W) -> Self {
        Self { inner }
    }

    /// Borrow the underlying stream.
    pub fn get_ref(&self) -> &W {
        &self.inner
    }

    /// Consume the sink and return the inner stream.
    pub fn into_inner(self) -> W {
        self.inner
    }
}

impl<W: Write + Send> ByteSink for StreamSink<W> {
    fn send_bytes(&mut self, bytes: &[u8]) -> Result<()> {
        let mut offset = 0usize;
        while offset < bytes.len() {
            match self.inner.write(&bytes[offset..]) {
                Ok(0) => return Err(TransportError::Closed),
                Ok(n) => offset += n,
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) if err.kind() == ErrorKind::WouldBlock => continue,
                Err(err) => return Err(TransportError::Io(err)),
            }
        }

        loop {
            match self.inner.flush() {
                Ok(()) => return Ok(()),
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) if err.kind() == ErrorKind::WouldBlock => continue,
                Err(err) => return Err(TransportError::Io(err)),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;

    #[test]
    fn stream_sink_writes_all_bytes() {
        let mut sink = StreamSink::new(Cursor::new(Vec::<u8>::new()));
        sink.send_bytes(b"\x02\x02ab").unwrap();
        sink.send_bytes(b"cd").unwrap();
        assert_eq!(sink.into_inner().into_inner(), b"\x02\x02abcd");
    }

    #[test]
    fn stream_sink_retries_interrupted_writes() {
        let mut sink = StreamSink::new(InterruptedOnce {
            interrupted: false,
            written: Vec::new(),
        });
        sink.send_bytes(b"payload").unwrap();
        assert_eq!(sink.get_ref().written, b"payload");
    }

    #[test]
    fn stream_sink_reports_closed_stream() {
        let mut sink = StreamSink::new(ZeroWriter);
        let err = sink.send_bytes(b"x").unwrap_err();
        assert!(matches!(err, TransportError::Closed));
    }

    #[test]
    fn channel_sink_forwards_and_detects_hangup() {
        let (tx, rx) = mpsc::channel::<Bytes>();
        let mut sink = tx;
        sink.send_bytes(b"abc").unwrap();
        assert_eq!(rx.recv().unwrap().as_ref(), b"abc");

        drop(rx);
        assert!(matches!(
            sink.send_bytes(b"late"),
            Err(TransportError::Closed)
        ));
    }

    #[test]
    fn fn_sink_calls_closure() {
        let mut seen = Vec::new();
        {
            let mut sink = FnSink(|bytes: &[u8]| {
                seen.extend_from_slice(bytes);
                Ok(())
            });
            sink.send_bytes(b"hi").unwrap();
        }
        assert_eq!(seen, b"hi");
    }

    struct InterruptedOnce {
        interrupted: bool,
        written: Vec<u8>,
    }

    impl Write for InterruptedOnce {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            if !self.interrupted {
                self.interrupted = true;
                return Err(std::io::Error::from(ErrorKind::Interrupted));
            }
            self.written.extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    struct ZeroWriter;

    impl Write for ZeroWriter {
        fn write(&mut self, _buf: &[u8]) -> std::io::Result<usize> {
            Ok(0)
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }
}
