//! TCP (MBAP) channel for [`SlaveEngine`](super::SlaveEngine): accepts a
//! peer via a [`TcpAcceptor`], serves requests on it until inactivity
//! exceeds the configured request timeout or the peer half-closes, then
//! goes back to accepting.

use super::SlaveChannel;
use crate::clock::{elapsed_at_least, Clock};
use crate::config::TcpTimeouts;
use crate::response::Response;
use crate::transport::tcp::{TcpBuffer, TcpReader};
use crate::transport::TcpAcceptor;

pub struct TcpSlaveChannel<A: TcpAcceptor, C> {
    acceptor: A,
    conn: Option<A::Connection>,
    clock: C,
    buffer: TcpBuffer,
    reader: TcpReader,
    timeouts: TcpTimeouts,
    last_activity: u32,
}

impl<A, C> TcpSlaveChannel<A, C>
where
    A: TcpAcceptor,
    C: Clock,
{
    pub fn new(acceptor: A, clock: C, timeouts: TcpTimeouts) -> Self {
        TcpSlaveChannel {
            acceptor,
            conn: None,
            clock,
            buffer: TcpBuffer::new(),
            reader: TcpReader::new(),
            timeouts,
            last_activity: 0,
        }
    }
}

impl<A, C> SlaveChannel for TcpSlaveChannel<A, C>
where
    A: TcpAcceptor,
    C: Clock,
{
    type Buffer = TcpBuffer;

    fn buffer(&self) -> &Self::Buffer {
        &self.buffer
    }

    fn buffer_mut(&mut self) -> &mut Self::Buffer {
        &mut self.buffer
    }

    fn poll_accept(&mut self) -> Result<(), Response> {
        if self.conn.is_some() {
            return Ok(());
        }
        match self.acceptor.poll_accept() {
            Ok(conn) => {
                self.conn = Some(conn);
                self.reader = TcpReader::new();
                self.last_activity = self.clock.now_ms();
                Ok(())
            }
            Err(nb::Error::WouldBlock) => Err(Response::Processing),
            Err(nb::Error::Other(_)) => Err(Response::TcpErrServer),
        }
    }

    fn poll_recv(&mut self) -> Result<(), Response> {
        let Some(conn) = self.conn.as_mut() else {
            return Err(Response::Processing);
        };
        match self.reader.poll(&mut self.buffer, conn) {
            Ok(()) => {
                self.last_activity = self.clock.now_ms();
                Ok(())
            }
            Err(Response::Processing) => {
                if elapsed_at_least(self.last_activity, self.clock.now_ms(), self.timeouts.inactivity_ms) {
                    self.conn = None;
                    Err(Response::TcpErrRecv)
                } else {
                    Err(Response::Processing)
                }
            }
            Err(e) => {
                self.conn = None;
                Err(e)
            }
        }
    }

    fn begin_reply(&mut self, slave: u8, func: u8, payload_len: u16) {
        // `txn_id` (bytes 0..2) is left untouched so it is automatically
        // echoed from the request that is still sitting in the buffer.
        self.buffer.set_unit_id(slave);
        self.buffer.set_func(func);
        self.buffer.set_window_len(payload_len);
    }

    fn poll_send(&mut self) -> Result<(), Response> {
        let Some(conn) = self.conn.as_mut() else {
            return Err(Response::CmnErrNotCorrect);
        };
        self.buffer.write_frame(conn)
    }

    fn request_slave(&self) -> u8 {
        self.buffer.unit_id()
    }

    fn request_func(&self) -> u8 {
        self.buffer.func()
    }
}
