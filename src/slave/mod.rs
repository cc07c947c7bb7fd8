//! Slave (server) transaction engine: reads a request frame, decodes and
//! dispatches it to an attached [`RegisterAccess`] implementation in
//! fixed-size chunks, and encodes the reply or exception.

pub mod rtu;
pub mod tcp;

use crate::config::ChunkWindows;
use crate::framing::{function, MAX_DISCRETES, MAX_REGISTERS};
use crate::interface::RegisterAccess;
use crate::response::Response;
use crate::transport::TransportBuffer;

/// Slave transaction states driven by [`SlaveEngine::poll`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    Unknown,
    BeginRead,
    WaitForRead,
    WaitForReadAll,
    Read,
    ProcessDevice,
    Write,
    WaitForWrite,
}

/// A transport-specific channel a [`SlaveEngine`] drives: accept a peer
/// (TCP) or treat the line as already available (RTU), read one request
/// frame, and write one reply frame.
pub trait SlaveChannel {
    type Buffer: TransportBuffer;

    fn buffer(&self) -> &Self::Buffer;
    fn buffer_mut(&mut self) -> &mut Self::Buffer;

    /// Accepts (or confirms) a peer to serve. A no-op, always `Ok`, for
    /// connectionless transports like RTU; for TCP this drives the
    /// listen/accept lifecycle. Returns `Processing` while still waiting.
    fn poll_accept(&mut self) -> Result<(), Response>;

    /// Fills the buffer with the next request frame.
    fn poll_recv(&mut self) -> Result<(), Response>;

    /// Prepares the channel to send a reply addressed as `slave`/`func`
    /// with a payload of `payload_len` bytes already written into the
    /// buffer window. For TCP, the request's transaction id is left
    /// untouched so it is automatically echoed back.
    fn begin_reply(&mut self, slave: u8, func: u8, payload_len: u16);

    /// Sends the buffered reply. May need more than one poll.
    fn poll_send(&mut self) -> Result<(), Response>;

    /// Slave/unit address the current request was addressed to.
    fn request_slave(&self) -> u8;

    /// Function code of the current request.
    fn request_func(&self) -> u8;
}

/// In-flight dispatch to the attached [`RegisterAccess`] device, chunked
/// so a fixed scratch buffer suffices regardless of request size. `done`
/// counts bits (for bit ops) or registers (for register ops) completed so
/// far; re-entering `drive_device` while a chunk is in flight (device
/// returned `Processing`) recomputes the identical chunk, satisfying the
/// "re-invoke with identical arguments" contract of [`RegisterAccess`].
#[derive(Debug, Clone, Copy)]
enum DeviceOp {
    ReadBits { offset: u16, count: u16, done: u16, func: u8 },
    ReadRegs { offset: u16, count: u16, done: u16, func: u8 },
    WriteBits { offset: u16, count: u16, done: u16 },
    WriteRegs { offset: u16, count: u16, done: u16 },
    ForceCoil { offset: u16, value: bool },
    ForceRegister { offset: u16, value: u16 },
}

enum Decoded {
    Dispatch(DeviceOp),
    Exception(Response),
    /// Frame does not satisfy the function's structural contract; no reply
    /// is emitted at all (not even an exception).
    StructuralError,
    /// Address filter rejected the frame; silently dropped.
    Drop,
}

/// Generic slave transaction engine, driven by any [`SlaveChannel`] and
/// dispatching to any [`RegisterAccess`] device (an in-process [`Memory`]
/// space, or — via the bridge — a remote master).
///
/// [`Memory`]: crate::memory::Memory
pub struct SlaveEngine<Ch: SlaveChannel, Dev: RegisterAccess> {
    channel: Ch,
    device: Dev,
    /// `None` accepts any unit id (used by the bridge); `Some(addr)`
    /// silently drops frames addressed to a different non-zero unit.
    fixed_address: Option<u8>,
    windows: ChunkWindows,
    state: State,
    pending_op: Option<DeviceOp>,
    device_slave: u8,
}

impl<Ch: SlaveChannel, Dev: RegisterAccess> SlaveEngine<Ch, Dev> {
    pub fn new(channel: Ch, device: Dev, fixed_address: Option<u8>, windows: ChunkWindows) -> Self {
        SlaveEngine {
            channel,
            device,
            fixed_address,
            windows,
            state: State::Unknown,
            pending_op: None,
            device_slave: fixed_address.unwrap_or(0),
        }
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

    pub fn device_mut(&mut self) -> &mut Dev {
        &mut self.device
    }

    /// Advances the engine by one poll-loop step. Returns `Processing`
    /// while waiting for a peer, a frame, or a chunked device call to
    /// complete; `Ok` once a reply has been sent (or a frame was silently
    /// dropped and the engine is ready for the next one); or a terminal
    /// transport-level error.
    pub fn poll(&mut self) -> Response {
        loop {
            match self.state {
                State::Unknown => match self.channel.poll_accept() {
                    Ok(()) => self.state = State::BeginRead,
                    Err(Response::Processing) => return Response::Processing,
                    Err(_e) => return Response::Processing,
                },
                State::BeginRead => self.state = State::WaitForRead,
                State::WaitForRead | State::WaitForReadAll => match self.channel.poll_recv() {
                    Ok(()) => self.state = State::Read,
                    Err(Response::Processing) => {
                        self.state = State::WaitForReadAll;
                        return Response::Processing;
                    }
                    Err(_e) => {
                        // Frame-level errors (bad CRC, overflow, peer
                        // closed) are dropped; re-enter from the top so a
                        // dead TCP connection gets re-accepted.
                        self.state = State::Unknown;
                        return Response::Processing;
                    }
                },
                State::Read => match self.decode() {
                    Decoded::Drop | Decoded::StructuralError => {
                        self.state = State::BeginRead;
                        return Response::Processing;
                    }
                    Decoded::Exception(resp) => {
                        self.encode_exception(resp);
                        self.state = State::Write;
                    }
                    Decoded::Dispatch(op) => {
                        self.pending_op = Some(op);
                        self.state = State::ProcessDevice;
                    }
                },
                State::ProcessDevice => match self.drive_device() {
                    Response::Processing => return Response::Processing,
                    Response::Ok => self.state = State::Write,
                    err => {
                        self.encode_exception(err);
                        self.state = State::Write;
                    }
                },
                State::Write | State::WaitForWrite => match self.channel.poll_send() {
                    Ok(()) => {
                        self.state = State::Unknown;
                        return Response::Ok;
                    }
                    Err(Response::Processing) => {
                        self.state = State::WaitForWrite;
                        return Response::Processing;
                    }
                    Err(e) => {
                        self.state = State::Unknown;
                        return e;
                    }
                },
            }
        }
    }

    fn decode(&mut self) -> Decoded {
        let incoming = self.channel.request_slave();
        if let Some(fixed) = self.fixed_address {
            if incoming != 0 && incoming != fixed {
                return Decoded::Drop;
            }
        }
        self.device_slave = self.fixed_address.unwrap_or(incoming);

        let func = self.channel.request_func();
        let payload_len = self.channel.buffer().window_len();
        let buf = self.channel.buffer();

        match func {
            function::READ_COILS
            | function::READ_DISCRETE_INPUTS
            | function::READ_HOLDING_REGISTERS
            | function::READ_INPUT_REGISTERS => {
                if payload_len != 4 {
                    return Decoded::StructuralError;
                }
                let offset = be16(buf, 0);
                let mut count = be16(buf, 2);
                let is_bits = func == function::READ_COILS || func == function::READ_DISCRETE_INPUTS;
                count = count.min(if is_bits { MAX_DISCRETES } else { MAX_REGISTERS });
                Decoded::Dispatch(if is_bits {
                    DeviceOp::ReadBits { offset, count, done: 0, func }
                } else {
                    DeviceOp::ReadRegs { offset, count, done: 0, func }
                })
            }
            function::FORCE_SINGLE_COIL => {
                if payload_len != 4 {
                    return Decoded::StructuralError;
                }
                let offset = be16(buf, 0);
                let vhi = buf.byte_at(2);
                let vlo = buf.byte_at(3);
                if !(vhi == 0x00 || vhi == 0xFF) || vlo != 0 {
                    return Decoded::Exception(Response::IllegalDataValue);
                }
                Decoded::Dispatch(DeviceOp::ForceCoil { offset, value: vhi == 0xFF })
            }
            function::FORCE_SINGLE_REGISTER => {
                if payload_len != 4 {
                    return Decoded::StructuralError;
                }
                let offset = be16(buf, 0);
                let value = be16(buf, 2);
                Decoded::Dispatch(DeviceOp::ForceRegister { offset, value })
            }
            function::FORCE_MULTIPLE_COILS => {
                if payload_len < 5 {
                    return Decoded::StructuralError;
                }
                let offset = be16(buf, 0);
                let count = be16(buf, 2);
                let byte_count = buf.byte_at(4) as u16;
                if payload_len != 5 + byte_count || byte_count != (count + 7) / 8 {
                    return Decoded::StructuralError;
                }
                Decoded::Dispatch(DeviceOp::WriteBits { offset, count, done: 0 })
            }
            function::FORCE_MULTIPLE_REGISTERS => {
                if payload_len < 5 {
                    return Decoded::StructuralError;
                }
                let offset = be16(buf, 0);
                let count = be16(buf, 2);
                let byte_count = buf.byte_at(4) as u16;
                if payload_len != 5 + byte_count || byte_count != count * 2 {
                    return Decoded::StructuralError;
                }
                Decoded::Dispatch(DeviceOp::WriteRegs { offset, count, done: 0 })
            }
            _ => Decoded::Exception(Response::IllegalFunction),
        }
    }

    /// Advances the pending device dispatch by (at most) one chunk.
    /// Returns `Processing` if the device is still mid-chunk, `Ok` once
    /// the whole request has been serviced and the reply payload is
    /// staged in the channel buffer, or a terminal exception.
    fn drive_device(&mut self) -> Response {
        let Some(op) = self.pending_op else {
            return Response::CmnErrNotCorrect;
        };
        match op {
            DeviceOp::ReadBits { offset, count, done, func } => self.step_read_bits(offset, count, done, func),
            DeviceOp::ReadRegs { offset, count, done, func } => self.step_read_regs(offset, count, done, func),
            DeviceOp::WriteBits { offset, count, done } => self.step_write_bits(offset, count, done),
            DeviceOp::WriteRegs { offset, count, done } => self.step_write_regs(offset, count, done),
            DeviceOp::ForceCoil { offset, value } => {
                let mut slave = self.device_slave;
                match self.device.force_single_coil(&mut slave, offset, value) {
                    Response::Ok => {
                        let echo = if value { 0xFF00u16 } else { 0x0000u16 };
                        self.encode_write_echo(function::FORCE_SINGLE_COIL, offset, echo);
                        self.pending_op = None;
                        Response::Ok
                    }
                    other => other,
                }
            }
            DeviceOp::ForceRegister { offset, value } => {
                let mut slave = self.device_slave;
                match self.device.force_single_register(&mut slave, offset, value) {
                    Response::Ok => {
                        self.encode_write_echo(function::FORCE_SINGLE_REGISTER, offset, value);
                        self.pending_op = None;
                        Response::Ok
                    }
                    other => other,
                }
            }
        }
    }

    fn step_read_bits(&mut self, offset: u16, count: u16, done: u16, func: u8) -> Response {
        if done >= count {
            self.encode_bit_read(count);
            self.pending_op = None;
            return Response::Ok;
        }
        let window = self.windows.bits;
        let chunk = (count - done).min(window);
        let mut scratch = [0u8; 32];
        let mut slave = self.device_slave;
        let mut fact = 0u16;
        let r = if func == function::READ_COILS {
            self.device.read_coils(&mut slave, offset + done, chunk, &mut scratch, Some(&mut fact))
        } else {
            self.device
                .read_discrete_inputs(&mut slave, offset + done, chunk, &mut scratch, Some(&mut fact))
        };
        match r {
            Response::Ok => {
                let out_byte_off = done / 8;
                let chunk_bytes = ((fact + 7) / 8) as usize;
                self.channel.buffer_mut().set_bytes_at(1 + out_byte_off, &scratch[..chunk_bytes]);
                let new_done = done + fact;
                let new_count = if fact < chunk { new_done } else { count };
                self.pending_op = Some(DeviceOp::ReadBits { offset, count: new_count, done: new_done, func });
                Response::Processing
            }
            Response::IllegalDataAddress if done == 0 => Response::IllegalDataAddress,
            Response::IllegalDataAddress => {
                self.encode_bit_read(done);
                self.pending_op = None;
                Response::Ok
            }
            other => other,
        }
    }

    fn step_read_regs(&mut self, offset: u16, count: u16, done: u16, func: u8) -> Response {
        if done >= count {
            self.encode_reg_read(count);
            self.pending_op = None;
            return Response::Ok;
        }
        let window = self.windows.registers;
        let chunk = (count - done).min(window);
        let mut scratch = [0u16; 16];
        let mut slave = self.device_slave;
        let mut fact = 0u16;
        let r = if func == function::READ_HOLDING_REGISTERS {
            self.device
                .read_holding_registers(&mut slave, offset + done, chunk, &mut scratch, Some(&mut fact))
        } else {
            self.device
                .read_input_registers(&mut slave, offset + done, chunk, &mut scratch, Some(&mut fact))
        };
        match r {
            Response::Ok => {
                for i in 0..fact as usize {
                    self.channel.buffer_mut().set_bytes_at(1 + (done + i as u16) * 2, &scratch[i].to_be_bytes());
                }
                let new_done = done + fact;
                let new_count = if fact < chunk { new_done } else { count };
                self.pending_op = Some(DeviceOp::ReadRegs { offset, count: new_count, done: new_done, func });
                Response::Processing
            }
            Response::IllegalDataAddress if done == 0 => Response::IllegalDataAddress,
            Response::IllegalDataAddress => {
                self.encode_reg_read(done);
                self.pending_op = None;
                Response::Ok
            }
            other => other,
        }
    }

    fn step_write_bits(&mut self, offset: u16, count: u16, done: u16) -> Response {
        if done >= count {
            self.encode_write_echo(function::FORCE_MULTIPLE_COILS, offset, count);
            self.pending_op = None;
            return Response::Ok;
        }
        let window = self.windows.bits;
        let chunk = (count - done).min(window);
        // Request payload bits start right after offset(2)+count(2)+byte_count(1) = 5.
        // `done` is not guaranteed byte-aligned (a prior chunk may have been
        // clamped short by the device's capacity), so pull bits out one at a
        // time rather than assuming the chunk starts on a byte boundary.
        let mut scratch = [0u8; 32];
        let len = ((chunk + 7) / 8) as usize;
        extract_packed_bits(self.channel.buffer(), 5, done, chunk, &mut scratch[..len]);
        let mut slave = self.device_slave;
        let mut fact = 0u16;
        let r = self
            .device
            .force_multiple_coils(&mut slave, offset + done, chunk, &scratch[..len], Some(&mut fact));
        match r {
            Response::Ok => {
                let new_done = done + fact;
                self.pending_op = Some(DeviceOp::WriteBits { offset, count, done: new_done });
                Response::Processing
            }
            Response::IllegalDataAddress if done == 0 => Response::IllegalDataAddress,
            Response::IllegalDataAddress => {
                self.encode_write_echo(function::FORCE_MULTIPLE_COILS, offset, done);
                self.pending_op = None;
                Response::Ok
            }
            other => other,
        }
    }

    fn step_write_regs(&mut self, offset: u16, count: u16, done: u16) -> Response {
        if done >= count {
            self.encode_write_echo(function::FORCE_MULTIPLE_REGISTERS, offset, count);
            self.pending_op = None;
            return Response::Ok;
        }
        let window = self.windows.registers;
        let chunk = (count - done).min(window);
        let mut scratch = [0u16; 16];
        for i in 0..chunk as usize {
            let hi = self.channel.buffer().byte_at(5 + (done + i as u16) * 2);
            let lo = self.channel.buffer().byte_at(5 + (done + i as u16) * 2 + 1);
            scratch[i] = u16::from_be_bytes([hi, lo]);
        }
        let mut slave = self.device_slave;
        let mut fact = 0u16;
        let r = self
            .device
            .force_multiple_registers(&mut slave, offset + done, chunk, &scratch[..chunk as usize], Some(&mut fact));
        match r {
            Response::Ok => {
                let new_done = done + fact;
                self.pending_op = Some(DeviceOp::WriteRegs { offset, count, done: new_done });
                Response::Processing
            }
            Response::IllegalDataAddress if done == 0 => Response::IllegalDataAddress,
            Response::IllegalDataAddress => {
                self.encode_write_echo(function::FORCE_MULTIPLE_REGISTERS, offset, done);
                self.pending_op = None;
                Response::Ok
            }
            other => other,
        }
    }

    fn encode_bit_read(&mut self, actual_bits: u16) {
        let byte_count = (actual_bits + 7) / 8;
        self.channel.buffer_mut().set_byte_at(0, byte_count as u8);
        let func = self.channel.request_func();
        let slave = self.device_slave;
        self.channel.begin_reply(slave, func, 1 + byte_count);
    }

    fn encode_reg_read(&mut self, actual_regs: u16) {
        let byte_count = actual_regs * 2;
        self.channel.buffer_mut().set_byte_at(0, byte_count as u8);
        let func = self.channel.request_func();
        let slave = self.device_slave;
        self.channel.begin_reply(slave, func, 1 + byte_count);
    }

    fn encode_write_echo(&mut self, func: u8, offset: u16, count: u16) {
        self.channel.buffer_mut().set_bytes_at(0, &offset.to_be_bytes());
        self.channel.buffer_mut().set_bytes_at(2, &count.to_be_bytes());
        let slave = self.device_slave;
        self.channel.begin_reply(slave, func, 4);
    }

    fn encode_exception(&mut self, resp: Response) {
        let func = self.channel.request_func() | function::EXCEPTION_FLAG;
        let code = resp.exception_code().unwrap_or(0);
        self.channel.buffer_mut().set_byte_at(0, code);
        let slave = self.device_slave;
        self.channel.begin_reply(slave, func, 1);
    }
}

fn be16<B: TransportBuffer>(buf: &B, offset: u16) -> u16 {
    u16::from_be_bytes([buf.byte_at(offset), buf.byte_at(offset + 1)])
}

/// Reads `count` bits starting at bit `start_bit` past byte `base_offset`
/// in `buf`, packing them LSB-first into `out` starting at bit 0 — i.e.
/// independent of whether `start_bit` itself falls on a byte boundary.
fn extract_packed_bits<B: TransportBuffer>(buf: &B, base_offset: u16, start_bit: u16, count: u16, out: &mut [u8]) {
    out.iter_mut().for_each(|b| *b = 0);
    for i in 0..count {
        let bit_pos = start_bit + i;
        let byte = buf.byte_at(base_offset + bit_pos / 8);
        if (byte >> (bit_pos % 8)) & 1 != 0 {
            out[(i / 8) as usize] |= 1 << (i % 8);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::Memory;
    use crate::transport::TransportBuffer;

    /// A minimal in-memory [`SlaveChannel`] for exercising the engine
    /// without a real transport: one request frame is pre-loaded, and the
    /// reply is captured for inspection.
    struct FakeChannel {
        buf: FakeBuffer,
        slave: u8,
        func: u8,
        reply_slave: u8,
        reply_func: u8,
        reply_payload: [u8; 256],
        reply_len: u16,
        served: bool,
    }

    struct FakeBuffer {
        data: [u8; 256],
        len: u16,
    }

    impl TransportBuffer for FakeBuffer {
        fn window_len(&self) -> u16 {
            self.len
        }
        fn byte_at(&self, offset: u16) -> u8 {
            self.data[offset as usize]
        }
        fn bytes_at(&self, offset: u16, out: &mut [u8]) {
            out.copy_from_slice(&self.data[offset as usize..offset as usize + out.len()]);
        }
        fn set_byte_at(&mut self, offset: u16, value: u8) {
            self.data[offset as usize] = value;
        }
        fn set_bytes_at(&mut self, offset: u16, data: &[u8]) {
            self.data[offset as usize..offset as usize + data.len()].copy_from_slice(data);
        }
        fn set_window_len(&mut self, len: u16) {
            self.len = len;
        }
    }

    impl FakeChannel {
        fn with_request(slave: u8, func: u8, payload: &[u8]) -> Self {
            let mut data = [0u8; 256];
            data[..payload.len()].copy_from_slice(payload);
            FakeChannel {
                buf: FakeBuffer { data, len: payload.len() as u16 },
                slave,
                func,
                reply_slave: 0,
                reply_func: 0,
                reply_payload: [0u8; 256],
                reply_len: 0,
                served: false,
            }
        }
    }

    impl SlaveChannel for FakeChannel {
        type Buffer = FakeBuffer;

        fn buffer(&self) -> &Self::Buffer {
            &self.buf
        }
        fn buffer_mut(&mut self) -> &mut Self::Buffer {
            &mut self.buf
        }
        fn poll_accept(&mut self) -> Result<(), Response> {
            Ok(())
        }
        fn poll_recv(&mut self) -> Result<(), Response> {
            if self.served {
                Err(Response::Processing)
            } else {
                Ok(())
            }
        }
        fn begin_reply(&mut self, slave: u8, func: u8, payload_len: u16) {
            self.reply_slave = slave;
            self.reply_func = func;
            self.reply_payload[..payload_len as usize].copy_from_slice(&self.buf.data[..payload_len as usize]);
            self.reply_len = payload_len;
        }
        fn poll_send(&mut self) -> Result<(), Response> {
            self.served = true;
            Ok(())
        }
        fn request_slave(&self) -> u8 {
            self.slave
        }
        fn request_func(&self) -> u8 {
            self.func
        }
    }

    #[test]
    fn read_coils_roundtrip() {
        let channel = FakeChannel::with_request(1, function::READ_COILS, &[0x00, 0x00, 0x00, 0x04]);
        let mut device: Memory<8, 0, 0, 0> = Memory::new();
        let mut slave_hint = 1u8;
        device.force_multiple_coils(&mut slave_hint, 0, 4, &[0b0000_1011], None);
        let mut engine = SlaveEngine::new(channel, device, Some(1), ChunkWindows::default());

        let resp = engine.poll();
        assert_eq!(resp, Response::Ok);
        assert_eq!(engine.channel().reply_slave, 1);
        assert_eq!(engine.channel().reply_func, function::READ_COILS);
        assert_eq!(engine.channel().reply_payload[0], 1); // byte count
        assert_eq!(engine.channel().reply_payload[1], 0b0000_1011);
    }

    #[test]
    fn unsupported_function_replies_exception() {
        let channel = FakeChannel::with_request(1, 7, &[]);
        let device: Memory<8, 8, 8, 8> = Memory::new();
        let mut engine = SlaveEngine::new(channel, device, Some(1), ChunkWindows::default());

        let resp = engine.poll();
        assert_eq!(resp, Response::Ok);
        assert_eq!(engine.channel().reply_func, 7 | function::EXCEPTION_FLAG);
        assert_eq!(engine.channel().reply_payload[0], Response::IllegalFunction.exception_code().unwrap());
    }

    #[test]
    fn mismatched_fixed_address_is_dropped() {
        let channel = FakeChannel::with_request(9, function::READ_COILS, &[0x00, 0x00, 0x00, 0x01]);
        let device: Memory<8, 8, 8, 8> = Memory::new();
        let mut engine = SlaveEngine::new(channel, device, Some(1), ChunkWindows::default());

        assert_eq!(engine.poll(), Response::Processing);
        assert_eq!(engine.state(), State::BeginRead);
    }

    #[test]
    fn force_single_register_echoes() {
        let channel = FakeChannel::with_request(1, function::FORCE_SINGLE_REGISTER, &[0x00, 0x00, 0x12, 0x34]);
        let device: Memory<0, 0, 0, 8> = Memory::new();
        let mut engine = SlaveEngine::new(channel, device, Some(1), ChunkWindows::default());

        let resp = engine.poll();
        assert_eq!(resp, Response::Ok);
        assert_eq!(&engine.channel().reply_payload[..4], &[0x00, 0x00, 0x12, 0x34]);
    }

    #[test]
    fn force_multiple_coils_chunked_write() {
        let payload = [0x00, 0x13, 0x00, 0x0A, 0x02, 0xCD, 0x01];
        let channel = FakeChannel::with_request(0x11, function::FORCE_MULTIPLE_COILS, &payload);
        let device: Memory<32, 0, 0, 0> = Memory::new();
        let mut engine = SlaveEngine::new(channel, device, Some(0x11), ChunkWindows::default());

        let resp = engine.poll();
        assert_eq!(resp, Response::Ok);
        assert_eq!(&engine.channel().reply_payload[..4], &[0x00, 0x13, 0x00, 0x0A]);
        let mut out = [0u8; 2];
        let mut slave = 0x11;
        engine.device_mut().read_coils(&mut slave, 19, 10, &mut out, None);
        assert_eq!(out[0], 0xCD);
        assert_eq!(out[1] & 0x03, 0x01);
    }
}
