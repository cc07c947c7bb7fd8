//! Master (client) transaction engine: builds a request for one of the
//! eight register-access operations, drives it across an injected
//! transport channel, and parses the response.

pub mod rtu;
pub mod tcp;

use crate::framing::{function, MAX_DISCRETES, MAX_REGISTERS};
use crate::interface::RegisterAccess;
use crate::response::Response;
use crate::transport::TransportBuffer;

/// Master transaction states. `Write` and `Read` are transient
/// single-poll states; the `WaitFor*` states are where `Processing` is
/// actually returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    Unknown,
    WaitForConnect,
    Write,
    WaitForWrite,
    WaitForRead,
    WaitForReadAll,
    Read,
}

/// The request this engine is currently (or about to be) executing.
/// Memoised across `Processing` polls so a caller's repeated identical
/// call resumes rather than restarts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct PendingOp {
    func: u8,
    offset: u16,
    count: u16,
    value: u16,
}

/// A transport-specific channel a [`MasterEngine`] drives. Implemented
/// once per transport (RTU, TCP); the engine itself contains no
/// transport-specific code.
pub trait MasterChannel {
    type Buffer: TransportBuffer;

    fn buffer(&self) -> &Self::Buffer;
    fn buffer_mut(&mut self) -> &mut Self::Buffer;

    /// Prepares the channel to send a request addressed to `slave`/`func`
    /// with a payload of `payload_len` bytes already written into the
    /// buffer window.
    fn begin_request(&mut self, slave: u8, func: u8, payload_len: u16);

    /// Drives connection establishment (a no-op, always `Ok`, for
    /// connectionless transports like RTU). Returns `Processing` while
    /// still connecting.
    fn poll_connect(&mut self) -> Result<(), Response>;

    /// Sends the buffered request. May need more than one poll if the
    /// underlying sink is non-blocking.
    fn poll_send(&mut self) -> Result<(), Response>;

    /// Fills the buffer with the next response frame.
    fn poll_recv(&mut self) -> Result<(), Response>;

    /// Slave address that actually answered (RTU: echoed in the reply
    /// header; TCP: the MBAP unit id).
    fn response_slave(&self) -> u8;

    /// Function code of the response (high bit set on exception).
    fn response_func(&self) -> u8;
}

/// Generic master transaction engine, driven by any [`MasterChannel]`.
pub struct MasterEngine<Ch: MasterChannel> {
    channel: Ch,
    state: State,
    pending: Option<PendingOp>,
}

impl<Ch: MasterChannel> MasterEngine<Ch> {
    pub fn new(channel: Ch) -> Self {
        MasterEngine { channel, state: State::Unknown, pending: None }
    }

    pub fn state(&self) -> State {
        self.state
    }

    pub fn channel(&self) -> &Ch {
        &self.channel
    }

    pub fn channel_mut(&mut self) -> &mut Ch {
        &mut self.channel
    }

    /// Drives one register-access call end to end as a poll-loop step.
    /// `build` writes the request payload into the buffer and returns its
    /// byte length; `parse` interprets a successful non-exception reply.
    fn drive(
        &mut self,
        slave: &mut u8,
        func: u8,
        offset: u16,
        count: u16,
        value: u16,
        build: impl FnOnce(&mut Ch::Buffer, u16, u16, u16) -> u16,
        parse: impl FnOnce(&Ch::Buffer, u16, u16) -> Result<u16, Response>,
        fact: Option<&mut u16>,
    ) -> Response {
        let op = PendingOp { func, offset, count, value };

        match self.state {
            State::Unknown => {
                self.pending = Some(op);
                let len = build(self.channel.buffer_mut(), offset, count, value);
                self.channel.begin_request(*slave, func, len);
                self.state = State::WaitForConnect;
                self.poll_continue(slave, fact, parse)
            }
            State::WaitForConnect
            | State::Write
            | State::WaitForWrite
            | State::WaitForRead
            | State::WaitForReadAll
            | State::Read => {
                if self.pending != Some(op) {
                    // Caller changed arguments mid-transaction: treat as a
                    // fresh request.
                    self.pending = Some(op);
                    let len = build(self.channel.buffer_mut(), offset, count, value);
                    self.channel.begin_request(*slave, func, len);
                    self.state = State::WaitForConnect;
                }
                self.poll_continue(slave, fact, parse)
            }
        }
    }

    fn poll_continue(
        &mut self,
        slave: &mut u8,
        fact: Option<&mut u16>,
        parse: impl FnOnce(&Ch::Buffer, u16, u16) -> Result<u16, Response>,
    ) -> Response {
        loop {
            match self.state {
                State::WaitForConnect => match self.channel.poll_connect() {
                    Ok(()) => self.state = State::Write,
                    Err(Response::Processing) => return Response::Processing,
                    Err(e) => {
                        #[cfg(feature = "log")]
                        log::debug!("modbus master: connect failed: {e}");
                        self.state = State::Unknown;
                        return e;
                    }
                },
                State::Write => match self.channel.poll_send() {
                    Ok(()) => self.state = State::WaitForRead,
                    Err(Response::Processing) => {
                        self.state = State::WaitForWrite;
                        return Response::Processing;
                    }
                    Err(e) => {
                        self.state = State::Unknown;
                        return e;
                    }
                },
                State::WaitForWrite => match self.channel.poll_send() {
                    Ok(()) => self.state = State::WaitForRead,
                    Err(Response::Processing) => return Response::Processing,
                    Err(e) => {
                        self.state = State::Unknown;
                        return e;
                    }
                },
                State::WaitForRead | State::WaitForReadAll => match self.channel.poll_recv() {
                    Ok(()) => self.state = State::Read,
                    Err(Response::Processing) => {
                        self.state = State::WaitForReadAll;
                        return Response::Processing;
                    }
                    Err(e) => {
                        #[cfg(feature = "log")]
                        log::debug!("modbus master: receive failed: {e}");
                        self.state = State::Unknown;
                        return e;
                    }
                },
                State::Read => {
                    let result = self.finish(slave, fact, parse);
                    self.state = State::Unknown;
                    self.pending = None;
                    return result;
                }
                State::Unknown => {
                    return Response::CmnErrNotCorrect;
                }
            }
        }
    }

    fn finish(
        &mut self,
        slave: &mut u8,
        fact: Option<&mut u16>,
        parse: impl FnOnce(&Ch::Buffer, u16, u16) -> Result<u16, Response>,
    ) -> Response {
        let Some(op) = self.pending else {
            return Response::CmnErrNotCorrect;
        };
        let resp_func = self.channel.response_func();
        *slave = self.channel.response_slave();

        if resp_func & function::EXCEPTION_FLAG != 0 {
            let code = self.channel.buffer().byte_at(0);
            return Response::from_exception_code(code);
        }
        if resp_func != op.func {
            return Response::CmnErrNotCorrect;
        }
        let mut actual = 0u16;
        match parse(self.channel.buffer(), op.offset, op.count) {
            Ok(n) => actual = n,
            Err(e) => return e,
        }
        if let Some(f) = fact {
            *f = actual;
        }
        Response::Ok
    }
}

impl<Ch: MasterChannel> RegisterAccess for MasterEngine<Ch> {
    fn read_coils(
        &mut self,
        slave: &mut u8,
        offset: u16,
        count: u16,
        bits: &mut [u8],
        fact: Option<&mut u16>,
    ) -> Response {
        read_bits_op(self, slave, function::READ_COILS, offset, count, bits, fact)
    }

    fn read_discrete_inputs(
        &mut self,
        slave: &mut u8,
        offset: u16,
        count: u16,
        bits: &mut [u8],
        fact: Option<&mut u16>,
    ) -> Response {
        read_bits_op(self, slave, function::READ_DISCRETE_INPUTS, offset, count, bits, fact)
    }

    fn read_holding_registers(
        &mut self,
        slave: &mut u8,
        offset: u16,
        count: u16,
        values: &mut [u16],
        fact: Option<&mut u16>,
    ) -> Response {
        read_registers_op(self, slave, function::READ_HOLDING_REGISTERS, offset, count, values, fact)
    }

    fn read_input_registers(
        &mut self,
        slave: &mut u8,
        offset: u16,
        count: u16,
        values: &mut [u16],
        fact: Option<&mut u16>,
    ) -> Response {
        read_registers_op(self, slave, function::READ_INPUT_REGISTERS, offset, count, values, fact)
    }

    fn force_single_coil(&mut self, slave: &mut u8, offset: u16, value: bool) -> Response {
        let build = |buf: &mut Ch::Buffer, offset: u16, _count: u16, value: u16| -> u16 {
            buf.set_bytes_at(0, &(offset.to_be_bytes()));
            let v = if value != 0 { 0xFF00u16 } else { 0x0000u16 };
            buf.set_bytes_at(2, &v.to_be_bytes());
            4
        };
        let parse = |buf: &Ch::Buffer, offset: u16, _count: u16| -> Result<u16, Response> {
            let got_off = u16::from_be_bytes([buf.byte_at(0), buf.byte_at(1)]);
            let got_val = u16::from_be_bytes([buf.byte_at(2), buf.byte_at(3)]);
            let expect_val = 0xFF00u16;
            if got_off == offset && got_val == expect_val {
                Ok(1)
            } else {
                Err(Response::CmnErrNotCorrect)
            }
        };
        self.drive(slave, function::FORCE_SINGLE_COIL, offset, 1, value as u16, build, parse, None)
    }

    fn force_single_register(&mut self, slave: &mut u8, offset: u16, value: u16) -> Response {
        let build = |buf: &mut Ch::Buffer, offset: u16, _count: u16, value: u16| -> u16 {
            buf.set_bytes_at(0, &offset.to_be_bytes());
            buf.set_bytes_at(2, &value.to_be_bytes());
            4
        };
        let parse = |buf: &Ch::Buffer, offset: u16, _count: u16| -> Result<u16, Response> {
            let got_off = u16::from_be_bytes([buf.byte_at(0), buf.byte_at(1)]);
            let got_val = u16::from_be_bytes([buf.byte_at(2), buf.byte_at(3)]);
            // Both the offset echo and the value echo must match.
            if got_off == offset && got_val == value {
                Ok(1)
            } else {
                Err(Response::CmnErrNotCorrect)
            }
        };
        self.drive(slave, function::FORCE_SINGLE_REGISTER, offset, 1, value, build, parse, None)
    }

    fn force_multiple_coils(
        &mut self,
        slave: &mut u8,
        offset: u16,
        count: u16,
        bits: &[u8],
        fact: Option<&mut u16>,
    ) -> Response {
        if count == 0 || count > MAX_DISCRETES {
            return Response::IllegalDataValue;
        }
        let byte_count = ((count + 7) / 8) as usize;
        let mut scratch = [0u8; 256];
        scratch[..byte_count].copy_from_slice(&bits[..byte_count]);

        let build = |buf: &mut Ch::Buffer, offset: u16, count: u16, _value: u16| -> u16 {
            buf.set_bytes_at(0, &offset.to_be_bytes());
            buf.set_bytes_at(2, &count.to_be_bytes());
            buf.set_byte_at(4, byte_count as u8);
            buf.set_bytes_at(5, &scratch[..byte_count]);
            5 + byte_count as u16
        };
        let parse = |buf: &Ch::Buffer, offset: u16, _count: u16| -> Result<u16, Response> {
            let got_off = u16::from_be_bytes([buf.byte_at(0), buf.byte_at(1)]);
            if got_off != offset {
                return Err(Response::CmnErrNotCorrect);
            }
            Ok(u16::from_be_bytes([buf.byte_at(2), buf.byte_at(3)]))
        };
        self.drive(slave, function::FORCE_MULTIPLE_COILS, offset, count, 0, build, parse, fact)
    }

    fn force_multiple_registers(
        &mut self,
        slave: &mut u8,
        offset: u16,
        count: u16,
        values: &[u16],
        fact: Option<&mut u16>,
    ) -> Response {
        if count == 0 || count > MAX_REGISTERS {
            return Response::IllegalDataValue;
        }
        let byte_count = (count * 2) as usize;
        let mut scratch = [0u8; 254];
        for i in 0..count as usize {
            let b = values[i].to_be_bytes();
            scratch[i * 2] = b[0];
            scratch[i * 2 + 1] = b[1];
        }

        let build = |buf: &mut Ch::Buffer, offset: u16, count: u16, _value: u16| -> u16 {
            buf.set_bytes_at(0, &offset.to_be_bytes());
            buf.set_bytes_at(2, &count.to_be_bytes());
            buf.set_byte_at(4, byte_count as u8);
            buf.set_bytes_at(5, &scratch[..byte_count]);
            5 + byte_count as u16
        };
        let parse = |buf: &Ch::Buffer, offset: u16, _count: u16| -> Result<u16, Response> {
            let got_off = u16::from_be_bytes([buf.byte_at(0), buf.byte_at(1)]);
            if got_off != offset {
                return Err(Response::CmnErrNotCorrect);
            }
            Ok(u16::from_be_bytes([buf.byte_at(2), buf.byte_at(3)]))
        };
        self.drive(slave, function::FORCE_MULTIPLE_REGISTERS, offset, count, 0, build, parse, fact)
    }
}

fn read_bits_op<Ch: MasterChannel>(
    engine: &mut MasterEngine<Ch>,
    slave: &mut u8,
    func: u8,
    offset: u16,
    count: u16,
    bits: &mut [u8],
    fact: Option<&mut u16>,
) -> Response {
    if count == 0 || count > MAX_DISCRETES {
        return Response::IllegalDataValue;
    }
    let build = |buf: &mut Ch::Buffer, offset: u16, count: u16, _value: u16| -> u16 {
        buf.set_bytes_at(0, &offset.to_be_bytes());
        buf.set_bytes_at(2, &count.to_be_bytes());
        4
    };

    // `parse` cannot borrow `bits` (FnOnce over generic closures can't
    // capture a `&mut [u8]` and still satisfy the trait bound used by
    // `drive`, which calls `parse` once `self` is no longer borrowed), so
    // the response bytes are copied out in two steps: first determine the
    // actual bit count, then copy the packed bytes directly here.
    let parse = |buf: &Ch::Buffer, _offset: u16, requested: u16| -> Result<u16, Response> {
        let byte_count = buf.byte_at(0) as u16;
        let actual = requested.min(byte_count * 8);
        Ok(actual)
    };

    let result = engine.drive(slave, func, offset, count, 0, build, parse, fact);
    if result == Response::Ok {
        let byte_count = ((engine.channel.buffer().byte_at(0) as u16) as usize).min(bits.len());
        let mut tmp = [0u8; 255];
        engine.channel.buffer().bytes_at(1, &mut tmp[..byte_count]);
        bits[..byte_count].copy_from_slice(&tmp[..byte_count]);
    }
    result
}

fn read_registers_op<Ch: MasterChannel>(
    engine: &mut MasterEngine<Ch>,
    slave: &mut u8,
    func: u8,
    offset: u16,
    count: u16,
    values: &mut [u16],
    fact: Option<&mut u16>,
) -> Response {
    if count == 0 || count > MAX_REGISTERS {
        return Response::IllegalDataValue;
    }
    let build = |buf: &mut Ch::Buffer, offset: u16, count: u16, _value: u16| -> u16 {
        buf.set_bytes_at(0, &offset.to_be_bytes());
        buf.set_bytes_at(2, &count.to_be_bytes());
        4
    };
    let parse = |buf: &Ch::Buffer, _offset: u16, requested: u16| -> Result<u16, Response> {
        let byte_count = buf.byte_at(0) as u16;
        if byte_count % 2 != 0 {
            return Err(Response::CmnErrNotCorrect);
        }
        let regs = byte_count / 2;
        if regs > requested {
            return Err(Response::CmnErrNotCorrect);
        }
        Ok(regs)
    };

    let result = engine.drive(slave, func, offset, count, 0, build, parse, fact);
    if result == Response::Ok {
        let byte_count = engine.channel.buffer().byte_at(0) as usize;
        let regs = (byte_count / 2).min(values.len());
        let mut tmp = [0u8; 254];
        engine.channel.buffer().bytes_at(1, &mut tmp[..byte_count.min(254)]);
        for i in 0..regs {
            values[i] = u16::from_be_bytes([tmp[i * 2], tmp[i * 2 + 1]]);
        }
    }
    result
}
