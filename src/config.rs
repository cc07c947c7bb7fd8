//! Configuration objects for the transaction engines.
//!
//! Plain structs with `Default` impls — construction-time parameters, not
//! a deployment configuration file.

/// Timeout thresholds for the RTU transports, in milliseconds.
#[derive(Debug, Clone, Copy)]
pub struct RtuTimeouts {
    /// Maximum time to wait for the first byte of a response/request.
    pub first_byte_ms: u32,
    /// Maximum gap between consecutive bytes before a frame is considered
    /// complete.
    pub inter_byte_ms: u32,
}

impl Default for RtuTimeouts {
    fn default() -> Self {
        RtuTimeouts {
            first_byte_ms: 5000,
            inter_byte_ms: 20,
        }
    }
}

/// Timeout thresholds for the TCP transports, in milliseconds.
#[derive(Debug, Clone, Copy)]
pub struct TcpTimeouts {
    /// Maximum time to wait for a connect to complete.
    pub connect_ms: u32,
    /// Maximum time a connection may sit idle before it is considered
    /// unresponsive (client: awaiting a reply; server: awaiting a request).
    pub inactivity_ms: u32,
}

impl Default for TcpTimeouts {
    fn default() -> Self {
        TcpTimeouts {
            connect_ms: 5000,
            inactivity_ms: 10000,
        }
    }
}

/// The window sizes the slave engine chunks large requests into, so a
/// fixed amount of scratch memory suffices regardless of request size.
/// `bits` is 256 (32 scratch bytes packed LSB-first) and `registers` is 16
/// (32 scratch bytes, two per register).
#[derive(Debug, Clone, Copy)]
pub struct ChunkWindows {
    pub registers: u16,
    pub bits: u16,
}

impl Default for ChunkWindows {
    fn default() -> Self {
        ChunkWindows {
            registers: 16,
            bits: 256,
        }
    }
}
