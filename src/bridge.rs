//! Bridge: relays requests arriving on one transport to an arbitrary
//! [`RegisterAccess`] implementation — typically a [`MasterEngine`] on a
//! different transport, so an RTU request can be serviced by forwarding
//! it onto a TCP device and vice versa.
//!
//! This is the same [`SlaveEngine`] machinery as §4.f with one difference:
//! the bridge never filters by unit id (`fixed_address` is always `None`),
//! so it forwards whatever address the upstream caller used. When the
//! downstream device is itself a transaction engine, its `Processing`
//! return threads straight through [`SlaveEngine::poll`]'s `ProcessDevice`
//! state, so the state machine survives across round-trips without the
//! bridge needing any extra bookkeeping of its own.
//!
//! [`MasterEngine`]: crate::master::MasterEngine

use crate::config::ChunkWindows;
use crate::interface::RegisterAccess;
use crate::response::Response;
use crate::slave::{SlaveChannel, SlaveEngine};

pub struct Bridge<Ch: SlaveChannel, Dev: RegisterAccess> {
    engine: SlaveEngine<Ch, Dev>,
}

impl<Ch: SlaveChannel, Dev: RegisterAccess> Bridge<Ch, Dev> {
    pub fn new(channel: Ch, downstream: Dev, windows: ChunkWindows) -> Self {
        Bridge { engine: SlaveEngine::new(channel, downstream, None, windows) }
    }

    pub fn downstream_mut(&mut self) -> &mut Dev {
        self.engine.device_mut()
    }

    /// Advances the bridge by one poll-loop step; see
    /// [`SlaveEngine::poll`] for the return-value contract.
    pub fn poll(&mut self) -> Response {
        self.engine.poll()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::framing::function;
    use crate::memory::Memory;
    use crate::transport::TransportBuffer;

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

    struct FakeChannel {
        buf: FakeBuffer,
        slave: u8,
        func: u8,
        reply_payload: [u8; 256],
        reply_len: u16,
        served: bool,
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
            let _ = slave;
            self.func = func;
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
    fn forwards_any_unit_to_downstream_memory() {
        let mut data = [0u8; 256];
        data[..4].copy_from_slice(&[0x00, 0x00, 0x00, 0x02]);
        let channel = FakeChannel {
            buf: FakeBuffer { data, len: 4 },
            slave: 0x42,
            func: function::READ_HOLDING_REGISTERS,
            reply_payload: [0u8; 256],
            reply_len: 0,
            served: false,
        };
        let mut downstream: Memory<0, 0, 0, 8> = Memory::new();
        let mut hint = 0u8;
        downstream.force_multiple_registers(&mut hint, 0, 2, &[0xAABB, 0xCCDD], None);

        let mut bridge = Bridge::new(channel, downstream, ChunkWindows::default());
        let resp = bridge.poll();
        assert_eq!(resp, Response::Ok);
        let engine_channel = &bridge.engine.channel().reply_payload;
        assert_eq!(&engine_channel[..5], &[0x04, 0xAA, 0xBB, 0xCC, 0xDD]);
    }
}
