//! The register-access contract shared by the in-process memory device,
//! the master transaction engine, and the bridge.

use crate::response::Response;

/// One of the four Modbus register address spaces.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Space {
    /// `0x` — read/write discrete outputs (coils).
    Coils,
    /// `1x` — read-only discrete inputs.
    DiscreteInputs,
    /// `3x` — read-only 16-bit input registers.
    InputRegisters,
    /// `4x` — read/write 16-bit holding registers.
    HoldingRegisters,
}

impl Space {
    /// True for the two bit-addressed spaces (`Coils`, `DiscreteInputs`).
    pub const fn is_bit_space(self) -> bool {
        matches!(self, Space::Coils | Space::DiscreteInputs)
    }

    /// True for the two spaces a master/slave may write to.
    pub const fn is_writable(self) -> bool {
        matches!(self, Space::Coils | Space::HoldingRegisters)
    }
}

/// The eight register-access operations every Modbus responder exposes,
/// whether it is backed by local memory, a remote master (via the
/// bridge), or anything else.
///
/// Every method takes `slave` as an in/out parameter: on call it may carry
/// an address hint (0 meaning "any"), and on return it is filled with the
/// address that actually serviced the request. `fact`, when provided,
/// receives the number of bits or registers actually processed (which may
/// be less than requested if the request ran past the end of the space).
///
/// Implementations backed by a master-style transaction engine may return
/// [`Response::Processing`]; the caller must then re-invoke the same
/// operation with identical arguments until a terminal `Response` comes
/// back. Memory-backed implementations never return `Processing`.
pub trait RegisterAccess {
    fn read_coils(
        &mut self,
        slave: &mut u8,
        offset: u16,
        count: u16,
        bits: &mut [u8],
        fact: Option<&mut u16>,
    ) -> Response;

    fn read_discrete_inputs(
        &mut self,
        slave: &mut u8,
        offset: u16,
        count: u16,
        bits: &mut [u8],
        fact: Option<&mut u16>,
    ) -> Response;

    fn read_holding_registers(
        &mut self,
        slave: &mut u8,
        offset: u16,
        count: u16,
        values: &mut [u16],
        fact: Option<&mut u16>,
    ) -> Response;

    fn read_input_registers(
        &mut self,
        slave: &mut u8,
        offset: u16,
        count: u16,
        values: &mut [u16],
        fact: Option<&mut u16>,
    ) -> Response;

    fn force_single_coil(&mut self, slave: &mut u8, offset: u16, value: bool) -> Response;

    fn force_single_register(&mut self, slave: &mut u8, offset: u16, value: u16) -> Response;

    fn force_multiple_coils(
        &mut self,
        slave: &mut u8,
        offset: u16,
        count: u16,
        bits: &[u8],
        fact: Option<&mut u16>,
    ) -> Response;

    fn force_multiple_registers(
        &mut self,
        slave: &mut u8,
        offset: u16,
        count: u16,
        values: &[u16],
        fact: Option<&mut u16>,
    ) -> Response;
}
