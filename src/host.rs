//! Hosted (`std`) adapters: thin `embedded_io`/`Clock`/`TcpConnector`/
//! `TcpAcceptor` glue over `std::time` and `std::net`, so the crate is
//! directly usable from a hosted binary without every integrator writing
//! their own plumbing. None of this module contains protocol logic.

use crate::clock::Clock;
use crate::port::PortAllocator;
use crate::transport::{TcpAcceptor, TcpConnector};
use std::io;
use std::net::{Ipv4Addr, SocketAddr, SocketAddrV4, TcpListener, TcpStream};
use std::time::{Duration, Instant};

/// A millisecond clock backed by `std::time::Instant`.
pub struct StdClock(Instant);

impl StdClock {
    pub fn new() -> Self {
        StdClock(Instant::now())
    }
}

impl Default for StdClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for StdClock {
    fn now_ms(&self) -> u32 {
        self.0.elapsed().as_millis() as u32
    }
}

/// A serial handle's byte-availability check, the one capability
/// `std::io::Read`/`Write` don't expose and that the RTU transports need
/// for non-blocking polling. Real serial port crates (e.g. a `SerialPort`
/// trait object) expose this directly; implement it as a thin forwarder.
pub trait SerialBytesAvailable {
    fn bytes_to_read(&mut self) -> io::Result<u32>;
}

/// Wraps any `std::io::Read + std::io::Write` serial handle that also
/// reports its pending byte count, presenting it as the
/// `embedded_io::Read + Write + ReadReady` bound the RTU transports need.
pub struct StdSerialPort<T>(T);

impl<T> StdSerialPort<T> {
    pub fn new(inner: T) -> Self {
        StdSerialPort(inner)
    }

    pub fn into_inner(self) -> T {
        self.0
    }
}

impl<T> embedded_io::ErrorType for StdSerialPort<T> {
    type Error = io::Error;
}

impl<T: io::Read> embedded_io::Read for StdSerialPort<T> {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, Self::Error> {
        match self.0.read(buf) {
            Err(e) if e.kind() == io::ErrorKind::WouldBlock => Ok(0),
            other => other,
        }
    }
}

impl<T: io::Write> embedded_io::Write for StdSerialPort<T> {
    fn write(&mut self, buf: &[u8]) -> Result<usize, Self::Error> {
        self.0.write(buf)
    }

    fn flush(&mut self) -> Result<(), Self::Error> {
        self.0.flush()
    }
}

impl<T: SerialBytesAvailable> embedded_io::ReadReady for StdSerialPort<T> {
    fn read_ready(&mut self) -> Result<bool, Self::Error> {
        Ok(self.0.bytes_to_read()? > 0)
    }
}

/// A non-blocking TCP client socket, built on `std::net::TcpStream`.
///
/// `std::net` has no genuinely non-blocking connect, so `poll_connect`
/// performs a single bounded blocking `connect_timeout` call on its first
/// poll and reports the outcome immediately rather than truly polling
/// across multiple calls; the socket is switched to non-blocking mode for
/// all reads/writes once established, which is where this crate's own
/// poll-driven engines actually need the non-blocking behaviour.
pub struct StdTcpConnector<P> {
    stream: Option<TcpStream>,
    ports: P,
    connect_timeout: Duration,
}

impl<P: PortAllocator> StdTcpConnector<P> {
    pub fn new(ports: P, connect_timeout: Duration) -> Self {
        StdTcpConnector { stream: None, ports, connect_timeout }
    }
}

impl<P: PortAllocator> TcpConnector for StdTcpConnector<P> {
    type Error = io::Error;

    fn poll_connect(&mut self, ip: [u8; 4], port: u16) -> nb::Result<(), Self::Error> {
        if self.stream.is_some() {
            return Ok(());
        }
        // Reserve-then-release a local port from our own range so two
        // masters in this process don't race for the same ephemeral
        // source port; the OS is free to reuse it by the time `connect`
        // runs, so this is a best-effort hint, not a hard guarantee.
        let local = SocketAddrV4::new(Ipv4Addr::new(0, 0, 0, 0), self.ports.next_port());
        drop(TcpListener::bind(local));

        let addr = SocketAddr::from((Ipv4Addr::new(ip[0], ip[1], ip[2], ip[3]), port));
        let stream = TcpStream::connect_timeout(&addr, self.connect_timeout).map_err(nb::Error::Other)?;
        stream.set_nonblocking(true).map_err(nb::Error::Other)?;
        stream.set_nodelay(true).ok();
        self.stream = Some(stream);
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.stream.is_some()
    }

    fn disconnect(&mut self) -> Result<(), Self::Error> {
        self.stream = None;
        Ok(())
    }
}

impl<P> embedded_io::ErrorType for StdTcpConnector<P> {
    type Error = io::Error;
}

impl<P> embedded_io::Read for StdTcpConnector<P> {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, Self::Error> {
        match &mut self.stream {
            Some(s) => match io::Read::read(s, buf) {
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => Ok(0),
                other => other,
            },
            None => Ok(0),
        }
    }
}

impl<P> embedded_io::Write for StdTcpConnector<P> {
    fn write(&mut self, buf: &[u8]) -> Result<usize, Self::Error> {
        match &mut self.stream {
            Some(s) => io::Write::write(s, buf),
            None => Err(io::Error::new(io::ErrorKind::NotConnected, "not connected")),
        }
    }

    fn flush(&mut self) -> Result<(), Self::Error> {
        match &mut self.stream {
            Some(s) => io::Write::flush(s),
            None => Ok(()),
        }
    }
}

impl<P> embedded_io::ReadReady for StdTcpConnector<P> {
    fn read_ready(&mut self) -> Result<bool, Self::Error> {
        peek_ready(self.stream.as_ref())
    }
}

fn peek_ready(stream: Option<&TcpStream>) -> io::Result<bool> {
    match stream {
        Some(s) => {
            let mut peek = [0u8; 1];
            match s.peek(&mut peek) {
                Ok(n) => Ok(n > 0),
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => Ok(false),
                Err(e) => Err(e),
            }
        }
        None => Ok(false),
    }
}

/// A non-blocking TCP connection accepted by [`StdTcpAcceptor`].
pub struct StdTcpConnection(TcpStream);

impl embedded_io::ErrorType for StdTcpConnection {
    type Error = io::Error;
}

impl embedded_io::Read for StdTcpConnection {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, Self::Error> {
        match io::Read::read(&mut self.0, buf) {
            Err(e) if e.kind() == io::ErrorKind::WouldBlock => Ok(0),
            other => other,
        }
    }
}

impl embedded_io::Write for StdTcpConnection {
    fn write(&mut self, buf: &[u8]) -> Result<usize, Self::Error> {
        io::Write::write(&mut self.0, buf)
    }

    fn flush(&mut self) -> Result<(), Self::Error> {
        io::Write::flush(&mut self.0)
    }
}

impl embedded_io::ReadReady for StdTcpConnection {
    fn read_ready(&mut self) -> Result<bool, Self::Error> {
        peek_ready(Some(&self.0))
    }
}

/// A non-blocking TCP listener, built on `std::net::TcpListener`.
pub struct StdTcpAcceptor {
    listener: TcpListener,
}

impl StdTcpAcceptor {
    /// Binds `port` on all interfaces.
    pub fn bind(port: u16) -> io::Result<Self> {
        let listener = TcpListener::bind(SocketAddr::from((Ipv4Addr::new(0, 0, 0, 0), port)))?;
        listener.set_nonblocking(true)?;
        Ok(StdTcpAcceptor { listener })
    }
}

impl TcpAcceptor for StdTcpAcceptor {
    type Error = io::Error;
    type Connection = StdTcpConnection;

    fn poll_accept(&mut self) -> nb::Result<Self::Connection, Self::Error> {
        match self.listener.accept() {
            Ok((stream, _addr)) => {
                stream.set_nonblocking(true).map_err(nb::Error::Other)?;
                stream.set_nodelay(true).ok();
                Ok(StdTcpConnection(stream))
            }
            Err(e) if e.kind() == io::ErrorKind::WouldBlock => Err(nb::Error::WouldBlock),
            Err(e) => Err(nb::Error::Other(e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clock_is_monotonic_nondecreasing() {
        let clock = StdClock::new();
        let a = clock.now_ms();
        let b = clock.now_ms();
        assert!(b >= a);
    }
}
