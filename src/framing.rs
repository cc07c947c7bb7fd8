//! Framing primitives shared by the RTU and ASCII-reserved wire formats:
//! the CRC-16 checksum, the LRC checksum, and a hex tracing helper.

/// Function code constants, shared by the master and slave engines.
pub mod function {
    pub const READ_COILS: u8 = 1;
    pub const READ_DISCRETE_INPUTS: u8 = 2;
    pub const READ_HOLDING_REGISTERS: u8 = 3;
    pub const READ_INPUT_REGISTERS: u8 = 4;
    pub const FORCE_SINGLE_COIL: u8 = 5;
    pub const FORCE_SINGLE_REGISTER: u8 = 6;
    pub const FORCE_MULTIPLE_COILS: u8 = 15;
    pub const FORCE_MULTIPLE_REGISTERS: u8 = 16;

    /// Marks a function-code byte as carrying an exception response.
    pub const EXCEPTION_FLAG: u8 = 0x80;
}

/// Maximum number of bits a single FC 1/2/15 request may span.
pub const MAX_DISCRETES: u16 = 2040;
/// Maximum number of registers a single FC 3/4/16 request may span.
pub const MAX_REGISTERS: u16 = 127;

/// Computes the Modbus RTU CRC-16 (polynomial 0xA001, reflected 0x8005,
/// seed 0xFFFF) over `bytes`. The result is placed on the wire
/// little-endian (low byte first).
pub fn crc16(bytes: &[u8]) -> u16 {
    let mut crc: u16 = 0xFFFF;
    for &b in bytes {
        crc ^= b as u16;
        for _ in 0..8 {
            if crc & 0x0001 != 0 {
                crc >>= 1;
                crc ^= 0xA001;
            } else {
                crc >>= 1;
            }
        }
    }
    crc
}

/// Appends the little-endian CRC-16 of `bytes` and returns it, for callers
/// that want the two trailer bytes directly.
pub fn crc16_bytes(bytes: &[u8]) -> [u8; 2] {
    let crc = crc16(bytes);
    [(crc & 0xFF) as u8, (crc >> 8) as u8]
}

/// Computes the Modbus ASCII LRC: the two's complement of the arithmetic
/// sum of all bytes. Provided for completeness; this crate does not
/// implement the ASCII transport itself.
pub fn lrc(bytes: &[u8]) -> u8 {
    let sum: u8 = bytes.iter().fold(0u8, |acc, &b| acc.wrapping_add(b));
    (!sum).wrapping_add(1)
}

/// Writes `bytes` as a space-separated two-hex-digit dump into `out`,
/// prefixed by `label` (conventionally `"Tx: "` or `"Rx: "`) and an
/// optional instance `name`. Mirrors the verbose byte-stream tracing the
/// rest of the ecosystem expects from a Modbus-family crate, without
/// requiring an allocator.
pub fn trace_frame<W: core::fmt::Write>(
    out: &mut W,
    name: Option<&str>,
    label: &str,
    bytes: &[u8],
) -> core::fmt::Result {
    if let Some(name) = name {
        write!(out, "{name}: ")?;
    }
    out.write_str(label)?;
    for (i, b) in bytes.iter().enumerate() {
        if i > 0 {
            out.write_char(' ')?;
        }
        write!(out, "{b:02X}")?;
    }
    Ok(())
}

/// A `core::fmt::Display` adapter over [`trace_frame`], so a whole frame
/// can be handed to `log::trace!("{}", ...)` without an intermediate
/// allocation.
pub struct FrameTrace<'a> {
    pub name: Option<&'a str>,
    pub label: &'a str,
    pub bytes: &'a [u8],
}

impl core::fmt::Display for FrameTrace<'_> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        trace_frame(f, self.name, self.label, self.bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn crc16_of_empty_is_ffff() {
        assert_eq!(crc16(&[]), 0xFFFF);
    }

    #[test]
    fn crc16_of_known_frame() {
        // slave=1, FC=3 (read holding registers), offset=0, count=1
        let frame = [0x01, 0x03, 0x00, 0x00, 0x00, 0x01];
        assert_eq!(crc16(&frame), 0x0A84);
        assert_eq!(crc16_bytes(&frame), [0x84, 0x0A]);
    }

    #[test]
    fn lrc_of_empty_is_zero() {
        assert_eq!(lrc(&[]), 0);
    }

    #[test]
    fn lrc_checksums_to_zero_when_appended() {
        let mut frame = [0x01, 0x03, 0x00, 0x00, 0x00, 0x01, 0x00];
        let checksum = lrc(&frame[..6]);
        frame[6] = checksum;
        assert_eq!(lrc(&frame), 0);
    }

    #[test]
    fn trace_frame_formats_hex() {
        let mut s = alloc_free_string::new();
        trace_frame(&mut s, Some("m"), "Tx: ", &[0x01, 0x03, 0xAB]).unwrap();
        assert_eq!(s.as_str(), "m: Tx: 01 03 AB");
    }

    /// Minimal fixed-capacity `core::fmt::Write` sink for tests, since this
    /// crate is `no_std` and has no `String` available in test scope either
    /// without pulling in `std` — tests run under `std`, but we keep the
    /// helper local and tiny rather than reaching for `format!` + `std`.
    mod alloc_free_string {
        pub struct FixedString {
            buf: [u8; 64],
            len: usize,
        }

        impl FixedString {
            pub fn as_str(&self) -> &str {
                core::str::from_utf8(&self.buf[..self.len]).unwrap()
            }
        }

        impl core::fmt::Write for FixedString {
            fn write_str(&mut self, s: &str) -> core::fmt::Result {
                let bytes = s.as_bytes();
                self.buf[self.len..self.len + bytes.len()].copy_from_slice(bytes);
                self.len += bytes.len();
                Ok(())
            }
        }

        pub fn new() -> FixedString {
            FixedString {
                buf: [0u8; 64],
                len: 0,
            }
        }
    }
}
