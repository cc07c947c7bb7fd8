#![cfg_attr(not(feature = "std"), no_std)]
//! A platform-agnostic Modbus implementation: RTU (serial) and TCP (MBAP)
//! framing, poll-driven master and slave transaction engines, an in-memory
//! register device, and a bridge that relays requests between the two.
//!
//! Every engine in this crate is non-blocking: `poll()` is called
//! repeatedly from the application's main loop (or an executor) and
//! returns [`response::Response::Processing`] while work is in flight, so
//! nothing here ever blocks a thread or requires an allocator.
//!
//! # Layout
//! - [`framing`] — function codes, CRC-16 and LRC checksums, frame tracing.
//! - [`transport`] — the RTU and TCP byte-level framing state machines.
//! - [`interface`] — [`interface::RegisterAccess`], the trait every
//!   register-holding device (a master, a slave's backing store, or a
//!   bridge's downstream) implements.
//! - [`memory`] — [`memory::Memory`], an in-process `RegisterAccess`
//!   device over four fixed-capacity register/bit spaces.
//! - [`master`] — the master/client transaction engine.
//! - [`slave`] — the slave/server transaction engine.
//! - [`bridge`] — relays one transport's requests onto any
//!   [`interface::RegisterAccess`] device, typically a master engine on a
//!   second transport.
//! - [`clock`] / [`config`] / [`port`] — injected timing, timeout
//!   configuration, and ephemeral TCP port allocation.
//! - [`host`] (feature `std`) — hosted adapters over `std::net`/`std::time`.

pub mod bridge;
pub mod clock;
pub mod config;
pub mod framing;
pub mod interface;
pub mod master;
pub mod memory;
pub mod port;
pub mod response;
pub mod slave;
pub mod transport;

#[cfg(feature = "std")]
pub mod host;

pub use bridge::Bridge;
pub use clock::Clock;
pub use interface::{RegisterAccess, Space};
pub use master::MasterEngine;
pub use memory::Memory;
pub use port::PortAllocator;
pub use response::Response;
pub use slave::SlaveEngine;
