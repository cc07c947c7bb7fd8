//! RTU framing: `[slave][func][payload...][crc_lo][crc_hi]`.

use super::TransportBuffer;
use crate::clock::{elapsed_at_least, Clock};
use crate::config::RtuTimeouts;
use crate::framing::crc16;
#[cfg(feature = "log")]
use crate::framing::FrameTrace;
use crate::response::Response;
use embedded_io::{Read, ReadReady, Write};

/// Total buffer size: `slave(1) + func(1) + payload(256) + crc(2)`.
pub const BUFF_SZ: usize = 260;
/// Offset of the payload window: bytes before this are the frame header.
pub const HEADER_LEN: u16 = 2;

/// Owns the RTU wire buffer and exposes the payload region through
/// [`TransportBuffer`].
pub struct RtuBuffer {
    buf: [u8; BUFF_SZ],
    len: u16,
}

impl RtuBuffer {
    pub const fn new() -> Self {
        RtuBuffer { buf: [0u8; BUFF_SZ], len: 0 }
    }

    pub fn slave(&self) -> u8 {
        self.buf[0]
    }

    pub fn set_slave(&mut self, slave: u8) {
        self.buf[0] = slave;
    }

    pub fn func(&self) -> u8 {
        self.buf[1]
    }

    pub fn set_func(&mut self, func: u8) {
        self.buf[1] = func;
    }

    /// Total frame length currently held (header + payload, no CRC).
    fn frame_len(&self) -> u16 {
        HEADER_LEN + self.len
    }

    /// Writes the full frame (header + payload + CRC) to `serial`.
    pub fn write_frame<S: Write>(&mut self, serial: &mut S) -> Result<(), Response> {
        let frame_len = self.frame_len() as usize;
        let crc = crc16(&self.buf[..frame_len]);
        self.buf[frame_len] = (crc & 0xFF) as u8;
        self.buf[frame_len + 1] = (crc >> 8) as u8;
        #[cfg(feature = "log")]
        log::trace!("{}", FrameTrace { name: None, label: "Tx: ", bytes: &self.buf[..frame_len + 2] });
        serial
            .write_all(&self.buf[..frame_len + 2])
            .map_err(|_| Response::SerialErrWrite)
    }

    /// Raw bytes of the whole frame presently held, including header and
    /// any trailing CRC already written by `write_frame`. Used for tracing.
    pub fn raw_frame(&self) -> &[u8] {
        &self.buf[..self.frame_len() as usize]
    }
}

impl Default for RtuBuffer {
    fn default() -> Self {
        Self::new()
    }
}

impl TransportBuffer for RtuBuffer {
    fn window_len(&self) -> u16 {
        self.len
    }

    fn byte_at(&self, offset: u16) -> u8 {
        self.buf[(HEADER_LEN + offset) as usize]
    }

    fn bytes_at(&self, offset: u16, out: &mut [u8]) {
        let start = (HEADER_LEN + offset) as usize;
        out.copy_from_slice(&self.buf[start..start + out.len()]);
    }

    fn set_byte_at(&mut self, offset: u16, value: u8) {
        self.buf[(HEADER_LEN + offset) as usize] = value;
    }

    fn set_bytes_at(&mut self, offset: u16, data: &[u8]) {
        let start = (HEADER_LEN + offset) as usize;
        self.buf[start..start + data.len()].copy_from_slice(data);
    }

    fn set_window_len(&mut self, len: u16) {
        self.len = len;
    }
}

/// Drives the inter-byte-timeout read loop shared by the RTU master and
/// slave. Advances as bytes arrive on `serial`; once the inter-byte gap
/// exceeds `timeouts.inter_byte_ms` (or the first-byte timeout elapses
/// with nothing read), the frame is validated (length, CRC) and its
/// `slave`/`func` plus payload window become available in `buffer`.
pub struct RtuReader {
    state: ReadState,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ReadState {
    WaitFirstByte { start: u32 },
    WaitInterByte { last_byte: u32, received: u16 },
}

impl RtuReader {
    pub fn new(now_ms: u32) -> Self {
        RtuReader { state: ReadState::WaitFirstByte { start: now_ms } }
    }

    /// Polls `serial` for more bytes, advancing the frame into `buffer`'s
    /// raw storage. Returns `Ok(())` once a complete, CRC-valid frame is
    /// available (with `buffer`'s payload window set), `Err(Processing)`
    /// while still waiting, or a terminal error.
    pub fn poll<S, C>(
        &mut self,
        buffer: &mut RtuBuffer,
        serial: &mut S,
        clock: &C,
        timeouts: &RtuTimeouts,
    ) -> Result<(), Response>
    where
        S: Read + ReadReady,
        C: Clock,
    {
        loop {
            match self.state {
                ReadState::WaitFirstByte { start } => {
                    let ready = serial.read_ready().map_err(|_| Response::SerialErrRead)?;
                    if !ready {
                        if elapsed_at_least(start, clock.now_ms(), timeouts.first_byte_ms) {
                            return Err(Response::CmnErrNoResponse);
                        }
                        return Err(Response::Processing);
                    }
                    let mut byte = [0u8; 1];
                    let n = serial.read(&mut byte).map_err(|_| Response::SerialErrRead)?;
                    if n == 0 {
                        return Err(Response::Processing);
                    }
                    buffer.buf[0] = byte[0];
                    self.state = ReadState::WaitInterByte { last_byte: clock.now_ms(), received: 1 };
                }
                ReadState::WaitInterByte { last_byte, received } => {
                    let ready = serial.read_ready().map_err(|_| Response::SerialErrRead)?;
                    if ready {
                        if received as usize >= BUFF_SZ {
                            return Err(Response::CmnErrReadBuffOverflow);
                        }
                        let mut byte = [0u8; 1];
                        let n = serial.read(&mut byte).map_err(|_| Response::SerialErrRead)?;
                        if n > 0 {
                            buffer.buf[received as usize] = byte[0];
                            self.state = ReadState::WaitInterByte {
                                last_byte: clock.now_ms(),
                                received: received + 1,
                            };
                        }
                        continue;
                    }
                    if !elapsed_at_least(last_byte, clock.now_ms(), timeouts.inter_byte_ms) {
                        return Err(Response::Processing);
                    }
                    return Self::finish_frame(buffer, received);
                }
            }
        }
    }

    fn finish_frame(buffer: &mut RtuBuffer, received: u16) -> Result<(), Response> {
        if received < 4 {
            return Err(Response::CmnErrNotCorrect);
        }
        let data_len = received - 2;
        let crc = crc16(&buffer.buf[..data_len as usize]);
        let got_lo = buffer.buf[data_len as usize];
        let got_hi = buffer.buf[data_len as usize + 1];
        if (crc & 0xFF) as u8 != got_lo || (crc >> 8) as u8 != got_hi {
            return Err(Response::RtuErrCrc);
        }
        buffer.len = data_len - HEADER_LEN;
        #[cfg(feature = "log")]
        log::trace!("{}", FrameTrace { name: None, label: "Rx: ", bytes: &buffer.buf[..received as usize] });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::Clock;

    struct FixedClock(core::cell::Cell<u32>);
    impl Clock for FixedClock {
        fn now_ms(&self) -> u32 {
            self.0.get()
        }
    }

    /// A byte source that replays a fixed frame, reporting `read_ready`
    /// only once bytes remain.
    struct LoopbackSerial<'a> {
        data: &'a [u8],
        pos: usize,
    }

    impl<'a> embedded_io::ErrorType for LoopbackSerial<'a> {
        type Error = core::convert::Infallible;
    }

    impl<'a> Read for LoopbackSerial<'a> {
        fn read(&mut self, buf: &mut [u8]) -> Result<usize, Self::Error> {
            if self.pos >= self.data.len() {
                return Ok(0);
            }
            buf[0] = self.data[self.pos];
            self.pos += 1;
            Ok(1)
        }
    }

    impl<'a> ReadReady for LoopbackSerial<'a> {
        fn read_ready(&mut self) -> Result<bool, Self::Error> {
            Ok(self.pos < self.data.len())
        }
    }

    #[test]
    fn reads_valid_frame() {
        let frame = [0x01u8, 0x03, 0x00, 0x00, 0x00, 0x01, 0x84, 0x0A];
        let mut serial = LoopbackSerial { data: &frame, pos: 0 };
        let clock = FixedClock(core::cell::Cell::new(0));
        let timeouts = RtuTimeouts { first_byte_ms: 5000, inter_byte_ms: 20 };
        let mut buffer = RtuBuffer::new();
        let mut reader = RtuReader::new(0);

        loop {
            match reader.poll(&mut buffer, &mut serial, &clock, &timeouts) {
                Ok(()) => break,
                Err(Response::Processing) => clock.0.set(clock.0.get() + 25),
                Err(e) => panic!("unexpected error {e:?}"),
            }
        }
        assert_eq!(buffer.slave(), 0x01);
        assert_eq!(buffer.func(), 0x03);
        assert_eq!(buffer.window_len(), 4);
    }

    #[test]
    fn rejects_bad_crc() {
        let frame = [0x01u8, 0x03, 0x00, 0x00, 0x00, 0x01, 0x00, 0x00];
        let mut serial = LoopbackSerial { data: &frame, pos: 0 };
        let clock = FixedClock(core::cell::Cell::new(0));
        let timeouts = RtuTimeouts { first_byte_ms: 5000, inter_byte_ms: 20 };
        let mut buffer = RtuBuffer::new();
        let mut reader = RtuReader::new(0);

        let result = loop {
            match reader.poll(&mut buffer, &mut serial, &clock, &timeouts) {
                Err(Response::Processing) => clock.0.set(clock.0.get() + 25),
                other => break other,
            }
        };
        assert_eq!(result, Err(Response::RtuErrCrc));
    }
}
