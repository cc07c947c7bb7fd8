//! The single status/error taxonomy shared by every layer of the stack.

/// Outcome of a register-access operation or a transaction-engine poll.
///
/// `Processing` is the only non-terminal variant: a caller that receives it
/// must re-invoke the same operation with identical arguments. Every other
/// variant is terminal. The discriminants are numerically compatible with
/// the wire-level Modbus exception codes plus the framing-layer codes this
/// crate adds on top, so `response as i32` reproduces the documented code
/// for any variant that has one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum Response {
    /// Transaction is still in flight; re-invoke with the same arguments.
    Processing = -1,
    /// Operation completed successfully.
    Ok = 0,
    IllegalFunction = 1,
    IllegalDataAddress = 2,
    IllegalDataValue = 3,
    SlaveDeviceFailure = 4,
    Acknowledge = 5,
    SlaveDeviceBusy = 6,
    NegativeAcknowledge = 7,
    MemoryParityError = 8,

    CmnErrNoResponse = 32,
    CmnErrNotCorrect = 33,
    CmnErrReadBuffOverflow = 34,
    CmnErrWriteBuffOverflow = 35,

    SerialErrOpen = 64,
    SerialErrRead = 65,
    SerialErrWrite = 66,

    AsciiErrMissColon = 72,
    AsciiErrMissCR = 73,
    AsciiErrMissLF = 74,
    AsciiErrLrc = 75,

    RtuErrCrc = 80,

    TcpErrConnect = 88,
    TcpErrRecv = 89,
    TcpErrSend = 90,
    TcpErrDisconnect = 91,

    /// Exception byte in the response was not a recognised code.
    UnknownError = 127,
    /// Server-side bind/listen failure.
    TcpErrServer = 256,
}

impl Response {
    /// True for [`Response::Processing`], the one value that must be re-polled.
    pub const fn is_processing(self) -> bool {
        matches!(self, Response::Processing)
    }

    /// True for [`Response::Ok`].
    pub const fn is_ok(self) -> bool {
        matches!(self, Response::Ok)
    }

    /// Maps a Modbus exception byte (1..=8) to its `Response` variant.
    /// Any other value becomes [`Response::UnknownError`].
    pub const fn from_exception_code(code: u8) -> Response {
        match code {
            1 => Response::IllegalFunction,
            2 => Response::IllegalDataAddress,
            3 => Response::IllegalDataValue,
            4 => Response::SlaveDeviceFailure,
            5 => Response::Acknowledge,
            6 => Response::SlaveDeviceBusy,
            7 => Response::NegativeAcknowledge,
            8 => Response::MemoryParityError,
            _ => Response::UnknownError,
        }
    }

    /// The exception byte to place on the wire for this response, if any.
    /// Returns `None` for `Ok`/`Processing`, which never become exceptions.
    pub const fn exception_code(self) -> Option<u8> {
        match self {
            Response::IllegalFunction => Some(1),
            Response::IllegalDataAddress => Some(2),
            Response::IllegalDataValue => Some(3),
            Response::SlaveDeviceFailure => Some(4),
            Response::Acknowledge => Some(5),
            Response::SlaveDeviceBusy => Some(6),
            Response::NegativeAcknowledge => Some(7),
            Response::MemoryParityError => Some(8),
            _ => None,
        }
    }
}

impl core::fmt::Display for Response {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let msg = match self {
            Response::Processing => "transaction still processing",
            Response::Ok => "ok",
            Response::IllegalFunction => "illegal function",
            Response::IllegalDataAddress => "illegal data address",
            Response::IllegalDataValue => "illegal data value",
            Response::SlaveDeviceFailure => "slave device failure",
            Response::Acknowledge => "acknowledge",
            Response::SlaveDeviceBusy => "slave device busy",
            Response::NegativeAcknowledge => "negative acknowledge",
            Response::MemoryParityError => "memory parity error",
            Response::CmnErrNoResponse => "no response received",
            Response::CmnErrNotCorrect => "response is not correct",
            Response::CmnErrReadBuffOverflow => "read buffer overflow",
            Response::CmnErrWriteBuffOverflow => "write buffer overflow",
            Response::SerialErrOpen => "serial port open error",
            Response::SerialErrRead => "serial read error",
            Response::SerialErrWrite => "serial write error",
            Response::AsciiErrMissColon => "ascii frame missing leading colon",
            Response::AsciiErrMissCR => "ascii frame missing CR",
            Response::AsciiErrMissLF => "ascii frame missing LF",
            Response::AsciiErrLrc => "ascii LRC mismatch",
            Response::RtuErrCrc => "rtu CRC mismatch",
            Response::TcpErrConnect => "tcp connect error",
            Response::TcpErrRecv => "tcp receive error",
            Response::TcpErrSend => "tcp send error",
            Response::TcpErrDisconnect => "tcp disconnect error",
            Response::UnknownError => "unknown error",
            Response::TcpErrServer => "tcp server bind/listen error",
        };
        f.write_str(msg)
    }
}

#[cfg(feature = "std")]
impl std::error::Error for Response {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exception_round_trip() {
        for code in 1u8..=8 {
            let r = Response::from_exception_code(code);
            assert_eq!(r.exception_code(), Some(code));
        }
    }

    #[test]
    fn unknown_exception_code() {
        assert_eq!(Response::from_exception_code(9), Response::UnknownError);
        assert_eq!(Response::UnknownError.exception_code(), None);
    }

    #[test]
    fn discriminants_match_documented_codes() {
        assert_eq!(Response::Processing as i32, -1);
        assert_eq!(Response::Ok as i32, 0);
        assert_eq!(Response::RtuErrCrc as i32, 80);
        assert_eq!(Response::TcpErrServer as i32, 256);
    }
}
