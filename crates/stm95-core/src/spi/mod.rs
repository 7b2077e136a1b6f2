//! SPI wire-level types
//!
//! This module provides the M95 command set, 24-bit address encoding and
//! the status register layout.

mod address;
pub mod opcodes;
mod status;

pub use address::{Address, ADDRESS_MASK};
pub use opcodes::Command;
pub use status::Status;

/// Maximum payload of a single gated write transaction, in bytes
pub const MAX_BURST_SIZE: usize = 62;

/// Length of an addressed command header (opcode + 3 address bytes)
pub const HEADER_LEN: usize = 4;

/// Build the 4-byte header of an addressed command
pub fn header(command: Command, address: Address) -> [u8; HEADER_LEN] {
    debug_assert!(command.has_address(), "{:?} takes no address", command);
    let [a2, a1, a0] = address.to_be_bytes();
    [command.opcode(), a2, a1, a0]
}
