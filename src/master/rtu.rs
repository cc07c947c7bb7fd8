//! RTU channel for [`MasterEngine`](super::MasterEngine): a serial byte
//! stream plus a [`Clock`], framed per [`crate::transport::rtu`].

use super::MasterChannel;
use crate::clock::Clock;
use crate::config::RtuTimeouts;
use crate::response::Response;
use crate::transport::rtu::{RtuBuffer, RtuReader};
use embedded_io::{Read, ReadReady, Write};

/// Drives a master transaction over a serial line. Generic over any byte
/// stream implementing `embedded_io`'s `Read + Write + ReadReady` (a real
/// UART, a loopback buffer, or `host::StdSerialPort`) and a [`Clock`] for
/// the first-byte / inter-byte timeouts.
pub struct RtuMasterChannel<S, C> {
    serial: S,
    clock: C,
    buffer: RtuBuffer,
    reader: Option<RtuReader>,
    timeouts: RtuTimeouts,
}

impl<S, C> RtuMasterChannel<S, C>
where
    S: Read + Write + ReadReady,
    C: Clock,
{
    pub fn new(serial: S, clock: C, timeouts: RtuTimeouts) -> Self {
        RtuMasterChannel { serial, clock, buffer: RtuBuffer::new(), reader: None, timeouts }
    }

    pub fn serial_mut(&mut self) -> &mut S {
        &mut self.serial
    }
}

impl<S, C> MasterChannel for RtuMasterChannel<S, C>
where
    S: Read + Write + ReadReady,
    C: Clock,
{
    type Buffer = RtuBuffer;

    fn buffer(&self) -> &Self::Buffer {
        &self.buffer
    }

    fn buffer_mut(&mut self) -> &mut Self::Buffer {
        &mut self.buffer
    }

    fn begin_request(&mut self, slave: u8, func: u8, payload_len: u16) {
        self.buffer.set_slave(slave);
        self.buffer.set_func(func);
        self.buffer.set_window_len(payload_len);
        self.reader = None;
    }

    fn poll_connect(&mut self) -> Result<(), Response> {
        // RTU is connectionless: there is nothing to establish.
        Ok(())
    }

    fn poll_send(&mut self) -> Result<(), Response> {
        self.buffer.write_frame(&mut self.serial)?;
        self.reader = Some(RtuReader::new(self.clock.now_ms()));
        Ok(())
    }

    fn poll_recv(&mut self) -> Result<(), Response> {
        let reader = self.reader.as_mut().ok_or(Response::CmnErrNotCorrect)?;
        reader.poll(&mut self.buffer, &mut self.serial, &self.clock, &self.timeouts)
    }

    fn response_slave(&self) -> u8 {
        self.buffer.slave()
    }

    fn response_func(&self) -> u8 {
        self.buffer.func()
    }
}
