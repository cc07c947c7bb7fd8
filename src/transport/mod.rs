//! Transport IO: frame read/write for RTU (serial) and TCP (MBAP), behind
//! a shared buffer-windowing abstraction so the master/slave engines never
//! see transport-specific header bytes.

pub mod rtu;
pub mod tcp;

/// A byte buffer owned by a transport, windowed so callers address the
/// payload region starting immediately after the transport's header.
///
/// RTU's header is `[slave, func]` (2 bytes); TCP's header is the 6-byte
/// MBAP prefix plus `[unit_id, func]` (8 bytes total). Every index passed
/// to these methods is relative to the start of the *payload window*, not
/// the start of the underlying buffer.
pub trait TransportBuffer {
    /// Number of payload bytes currently valid in the window.
    fn window_len(&self) -> u16;
    fn byte_at(&self, offset: u16) -> u8;
    fn bytes_at(&self, offset: u16, out: &mut [u8]);
    fn set_byte_at(&mut self, offset: u16, value: u8);
    fn set_bytes_at(&mut self, offset: u16, data: &[u8]);
    /// Sets the number of valid payload bytes in the window, e.g. after
    /// building an outbound frame.
    fn set_window_len(&mut self, len: u16);
}

/// Non-blocking TCP client connection lifecycle. Implemented by concrete
/// socket wrappers (see `host::StdTcpConnector` under `feature = "std"`).
pub trait TcpConnector {
    type Error;

    /// Begins (or continues) connecting to `ip:port`. Returns
    /// `Ok(nb::Error::WouldBlock)` while still in progress.
    fn poll_connect(&mut self, ip: [u8; 4], port: u16) -> nb::Result<(), Self::Error>;
    fn is_connected(&self) -> bool;
    fn disconnect(&mut self) -> Result<(), Self::Error>;
}

/// Non-blocking TCP server accept lifecycle.
pub trait TcpAcceptor {
    type Error;
    type Connection: embedded_io::Read + embedded_io::Write + embedded_io::ReadReady;

    /// Returns a freshly accepted connection, or `WouldBlock` if none is
    /// waiting.
    fn poll_accept(&mut self) -> nb::Result<Self::Connection, Self::Error>;
}
