//! MBAP (Modbus TCP) framing:
//! `[txn_id:2][proto_id:2 = 0][length:2][unit_id:1][func:1][payload...]`.

use super::TransportBuffer;
use crate::framing::function;
#[cfg(feature = "log")]
use crate::framing::FrameTrace;
use crate::response::Response;
use embedded_io::{Read, ReadReady, Write};

/// Total buffer size: 6-byte MBAP prefix + unit_id + func + 256 payload +
/// 2 reserved padding bytes, kept symmetric with the RTU buffer's 260.
pub const BUFF_SZ: usize = 266;
/// Offset of the payload window (MBAP prefix + unit_id + func).
pub const HEADER_LEN: u16 = 8;

pub const STANDARD_PORT: u16 = 502;

/// Owns the MBAP wire buffer and exposes the payload region through
/// [`TransportBuffer`].
pub struct TcpBuffer {
    buf: [u8; BUFF_SZ],
    len: u16,
}

impl TcpBuffer {
    pub const fn new() -> Self {
        TcpBuffer { buf: [0u8; BUFF_SZ], len: 0 }
    }

    pub fn txn_id(&self) -> u16 {
        u16::from_be_bytes([self.buf[0], self.buf[1]])
    }

    pub fn set_txn_id(&mut self, id: u16) {
        let b = id.to_be_bytes();
        self.buf[0] = b[0];
        self.buf[1] = b[1];
    }

    pub fn proto_id(&self) -> u16 {
        u16::from_be_bytes([self.buf[2], self.buf[3]])
    }

    pub fn length_field(&self) -> u16 {
        u16::from_be_bytes([self.buf[4], self.buf[5]])
    }

    pub fn unit_id(&self) -> u8 {
        self.buf[6]
    }

    pub fn set_unit_id(&mut self, unit: u8) {
        self.buf[6] = unit;
    }

    pub fn func(&self) -> u8 {
        self.buf[7]
    }

    pub fn set_func(&mut self, func: u8) {
        self.buf[7] = func;
    }

    /// Finalises the header fields (proto_id=0, length) from the payload
    /// window's current length, and writes the whole frame to `stream`.
    pub fn write_frame<S: Write>(&mut self, stream: &mut S) -> Result<(), Response> {
        let payload_len = self.len;
        let frame_len = (HEADER_LEN + payload_len) as usize;
        self.buf[2] = 0;
        self.buf[3] = 0;
        let length = payload_len + 2; // unit_id + func
        let lb = length.to_be_bytes();
        self.buf[4] = lb[0];
        self.buf[5] = lb[1];
        #[cfg(feature = "log")]
        log::trace!("{}", FrameTrace { name: None, label: "Tx: ", bytes: &self.buf[..frame_len] });
        stream
            .write_all(&self.buf[..frame_len])
            .map_err(|_| Response::TcpErrSend)
    }

    pub fn raw_frame(&self) -> &[u8] {
        &self.buf[..(HEADER_LEN + self.len) as usize]
    }
}

impl Default for TcpBuffer {
    fn default() -> Self {
        Self::new()
    }
}

impl TransportBuffer for TcpBuffer {
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

/// Reads one MBAP frame from `stream` into `buffer`, non-blocking: returns
/// `Err(Processing)` while data is still arriving.
pub struct TcpReader {
    received: u16,
}

impl TcpReader {
    pub fn new() -> Self {
        TcpReader { received: 0 }
    }

    pub fn poll<S>(&mut self, buffer: &mut TcpBuffer, stream: &mut S) -> Result<(), Response>
    where
        S: Read + ReadReady,
    {
        loop {
            let ready = stream.read_ready().map_err(|_| Response::TcpErrRecv)?;
            if !ready {
                return Err(Response::Processing);
            }
            if (self.received as usize) >= BUFF_SZ {
                return Err(Response::CmnErrReadBuffOverflow);
            }
            let mut byte = [0u8; 1];
            let n = stream.read(&mut byte).map_err(|_| Response::TcpErrRecv)?;
            if n == 0 {
                return Err(Response::Processing);
            }
            buffer.buf[self.received as usize] = byte[0];
            self.received += 1;

            if self.received >= 6 {
                let expected_len = buffer.length_field();
                let total = 6 + expected_len;
                if self.received >= total {
                    self.received = 0;
                    if buffer.proto_id() != 0 {
                        return Err(Response::CmnErrNotCorrect);
                    }
                    if expected_len < 2 {
                        return Err(Response::CmnErrNotCorrect);
                    }
                    buffer.len = expected_len - 2;
                    #[cfg(feature = "log")]
                    log::trace!("{}", FrameTrace { name: None, label: "Rx: ", bytes: &buffer.buf[..total as usize] });
                    return Ok(());
                }
            }
        }
    }
}

impl Default for TcpReader {
    fn default() -> Self {
        Self::new()
    }
}

/// Validates that `reply` is the response to `request` per the MBAP
/// contract: matching transaction id, protocol id zero, and (if the
/// request named a non-zero unit) a matching unit id.
pub fn validate_reply(request: &TcpBuffer, reply: &TcpBuffer, requested_slave: u8) -> Result<(), Response> {
    if reply.txn_id() != request.txn_id() {
        return Err(Response::CmnErrNotCorrect);
    }
    if reply.proto_id() != 0 {
        return Err(Response::CmnErrNotCorrect);
    }
    if requested_slave != 0 && reply.unit_id() != requested_slave {
        return Err(Response::CmnErrNotCorrect);
    }
    if reply.func() & function::EXCEPTION_FLAG == 0 && reply.func() != request.func() {
        return Err(Response::CmnErrNotCorrect);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn write_frame_builds_header() {
        let mut buffer = TcpBuffer::new();
        buffer.set_txn_id(0x0042);
        buffer.set_unit_id(0x01);
        buffer.set_func(function::READ_HOLDING_REGISTERS);
        buffer.set_bytes_at(0, &[0x00, 0x00, 0x00, 0x02]);
        buffer.set_window_len(4);

        let mut out = alloc_free_vec::new();
        buffer.write_frame(&mut out).unwrap();
        assert_eq!(
            out.as_slice(),
            &[0x00, 0x42, 0x00, 0x00, 0x00, 0x06, 0x01, 0x03, 0x00, 0x00, 0x00, 0x02]
        );
    }

    #[test]
    fn validate_reply_checks_txn_proto_unit_and_func() {
        let mut request = TcpBuffer::new();
        request.set_txn_id(7);
        request.set_unit_id(3);
        request.set_func(function::READ_HOLDING_REGISTERS);

        let mut reply = TcpBuffer::new();
        reply.set_txn_id(7);
        reply.set_unit_id(3);
        reply.set_func(function::READ_HOLDING_REGISTERS);
        assert_eq!(validate_reply(&request, &reply, 3), Ok(()));

        let mut wrong_txn = reply_with_txn_id(9);
        wrong_txn.set_unit_id(3);
        wrong_txn.set_func(function::READ_HOLDING_REGISTERS);
        assert_eq!(validate_reply(&request, &wrong_txn, 3), Err(Response::CmnErrNotCorrect));

        let mut wrong_unit = reply_with_txn_id(7);
        wrong_unit.set_unit_id(9);
        wrong_unit.set_func(function::READ_HOLDING_REGISTERS);
        assert_eq!(validate_reply(&request, &wrong_unit, 3), Err(Response::CmnErrNotCorrect));

        let mut exception_reply = reply_with_txn_id(7);
        exception_reply.set_unit_id(3);
        exception_reply.set_func(function::READ_HOLDING_REGISTERS | function::EXCEPTION_FLAG);
        assert_eq!(validate_reply(&request, &exception_reply, 3), Ok(()));
    }

    fn reply_with_txn_id(id: u16) -> TcpBuffer {
        let mut buf = TcpBuffer::new();
        buf.set_txn_id(id);
        buf
    }

    mod alloc_free_vec {
        pub struct FixedVec {
            buf: [u8; 64],
            len: usize,
        }
        impl FixedVec {
            pub fn as_slice(&self) -> &[u8] {
                &self.buf[..self.len]
            }
        }
        impl embedded_io::ErrorType for FixedVec {
            type Error = core::convert::Infallible;
        }
        impl embedded_io::Write for FixedVec {
            fn write(&mut self, buf: &[u8]) -> Result<usize, Self::Error> {
                self.buf[self.len..self.len + buf.len()].copy_from_slice(buf);
                self.len += buf.len();
                Ok(buf.len())
            }
            fn flush(&mut self) -> Result<(), Self::Error> {
                Ok(())
            }
        }
        pub fn new() -> FixedVec {
            FixedVec { buf: [0u8; 64], len: 0 }
        }
    }
}
