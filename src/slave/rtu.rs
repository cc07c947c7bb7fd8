//! RTU channel for [`SlaveEngine`](super::SlaveEngine): serves requests
//! arriving on a serial line with no accept phase and no first-byte
//! timeout — the slave waits indefinitely for the next frame.

use super::SlaveChannel;
use crate::clock::Clock;
use crate::config::RtuTimeouts;
use crate::response::Response;
use crate::transport::rtu::{RtuBuffer, RtuReader};
use embedded_io::{Read, ReadReady, Write};

pub struct RtuSlaveChannel<S, C> {
    serial: S,
    clock: C,
    buffer: RtuBuffer,
    reader: RtuReader,
    timeouts: RtuTimeouts,
}

impl<S, C> RtuSlaveChannel<S, C>
where
    S: Read + Write + ReadReady,
    C: Clock,
{
    /// `inter_byte_ms` is the only meaningful timeout server-side; the
    /// first-byte wait never expires (the server has nothing better to do
    /// than keep listening).
    pub fn new(serial: S, clock: C, inter_byte_ms: u32) -> Self {
        let timeouts = RtuTimeouts { first_byte_ms: u32::MAX, inter_byte_ms };
        let now = clock.now_ms();
        RtuSlaveChannel { serial, clock, buffer: RtuBuffer::new(), reader: RtuReader::new(now), timeouts }
    }
}

impl<S, C> SlaveChannel for RtuSlaveChannel<S, C>
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

    fn poll_accept(&mut self) -> Result<(), Response> {
        Ok(())
    }

    fn poll_recv(&mut self) -> Result<(), Response> {
        let result = self.reader.poll(&mut self.buffer, &mut self.serial, &self.clock, &self.timeouts);
        if !matches!(result, Err(Response::Processing)) {
            self.reader = RtuReader::new(self.clock.now_ms());
        }
        result
    }

    fn begin_reply(&mut self, slave: u8, func: u8, payload_len: u16) {
        self.buffer.set_slave(slave);
        self.buffer.set_func(func);
        self.buffer.set_window_len(payload_len);
    }

    fn poll_send(&mut self) -> Result<(), Response> {
        self.buffer.write_frame(&mut self.serial)
    }

    fn request_slave(&self) -> u8 {
        self.buffer.slave()
    }

    fn request_func(&self) -> u8 {
        self.buffer.func()
    }
}
