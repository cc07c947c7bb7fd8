//! TCP (MBAP) channel for [`MasterEngine`](super::MasterEngine).
//!
//! Generic over any socket type that is simultaneously a [`TcpConnector`]
//! (connection lifecycle) and an `embedded_io` byte stream (once
//! connected), so a real `std::net::TcpStream` wrapper and a test double
//! satisfy the same bound.

use super::MasterChannel;
use crate::clock::{elapsed_at_least, Clock};
use crate::config::TcpTimeouts;
use crate::response::Response;
use crate::transport::tcp::{TcpBuffer, TcpReader};
use crate::transport::TcpConnector;
use embedded_io::{Read, ReadReady, Write};

pub struct TcpMasterChannel<Sock, C> {
    sock: Sock,
    clock: C,
    buffer: TcpBuffer,
    reader: TcpReader,
    timeouts: TcpTimeouts,
    ip: [u8; 4],
    port: u16,
    next_txn_id: u16,
    expect_txn_id: u16,
    requested_slave: u8,
    recv_start: u32,
}

impl<Sock, C> TcpMasterChannel<Sock, C>
where
    Sock: TcpConnector + Read + Write + ReadReady,
    C: Clock,
{
    pub fn new(sock: Sock, clock: C, ip: [u8; 4], port: u16, timeouts: TcpTimeouts) -> Self {
        TcpMasterChannel {
            sock,
            clock,
            buffer: TcpBuffer::new(),
            reader: TcpReader::new(),
            timeouts,
            ip,
            port,
            next_txn_id: 0,
            expect_txn_id: 0,
            requested_slave: 0,
            recv_start: 0,
        }
    }

    pub fn sock_mut(&mut self) -> &mut Sock {
        &mut self.sock
    }
}

impl<Sock, C> MasterChannel for TcpMasterChannel<Sock, C>
where
    Sock: TcpConnector + Read + Write + ReadReady,
    C: Clock,
{
    type Buffer = TcpBuffer;

    fn buffer(&self) -> &Self::Buffer {
        &self.buffer
    }

    fn buffer_mut(&mut self) -> &mut Self::Buffer {
        &mut self.buffer
    }

    fn begin_request(&mut self, slave: u8, func: u8, payload_len: u16) {
        self.next_txn_id = self.next_txn_id.wrapping_add(1);
        self.buffer.set_txn_id(self.next_txn_id);
        self.buffer.set_unit_id(slave);
        self.buffer.set_func(func);
        self.buffer.set_window_len(payload_len);
        self.expect_txn_id = self.next_txn_id;
        self.requested_slave = slave;
        self.reader = TcpReader::new();
    }

    fn poll_connect(&mut self) -> Result<(), Response> {
        if self.sock.is_connected() {
            return Ok(());
        }
        match self.sock.poll_connect(self.ip, self.port) {
            Ok(()) => Ok(()),
            Err(nb::Error::WouldBlock) => Err(Response::Processing),
            Err(nb::Error::Other(_)) => Err(Response::TcpErrConnect),
        }
    }

    fn poll_send(&mut self) -> Result<(), Response> {
        self.buffer.write_frame(&mut self.sock)?;
        self.recv_start = self.clock.now_ms();
        Ok(())
    }

    fn poll_recv(&mut self) -> Result<(), Response> {
        match self.reader.poll(&mut self.buffer, &mut self.sock) {
            Ok(()) => {
                if self.buffer.txn_id() != self.expect_txn_id {
                    return Err(Response::CmnErrNotCorrect);
                }
                if self.buffer.proto_id() != 0 {
                    return Err(Response::CmnErrNotCorrect);
                }
                if self.requested_slave != 0 && self.buffer.unit_id() != self.requested_slave {
                    return Err(Response::CmnErrNotCorrect);
                }
                Ok(())
            }
            Err(Response::Processing) => {
                if elapsed_at_least(self.recv_start, self.clock.now_ms(), self.timeouts.inactivity_ms) {
                    let _ = self.sock.disconnect();
                    Err(Response::TcpErrRecv)
                } else {
                    Err(Response::Processing)
                }
            }
            Err(e) => Err(e),
        }
    }

    fn response_slave(&self) -> u8 {
        self.buffer.unit_id()
    }

    fn response_func(&self) -> u8 {
        self.buffer.func()
    }
}
