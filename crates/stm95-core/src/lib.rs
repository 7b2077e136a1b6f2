//! stm95-core - Protocol engine for M95-family SPI EEPROMs
//!
//! This crate implements the command protocol spoken by ST M95xxx serial
//! EEPROMs: addressed reads, latch-gated writes with busy polling, status
//! register access and a chunked write that respects the device's burst
//! limit. The bus itself is injected through the [`Transport`] trait, so the
//! engine runs unchanged on top of Linux spidev, an in-memory emulator or a
//! microcontroller HAL.
//!
//! The crate is `no_std`; every operation is synchronous and blocks the
//! calling thread until the transport returns.
//!
//! # Features
//!
//! - `std` - Enable standard library support (includes `alloc`)
//! - `alloc` - Implement [`Transport`] for boxed transports
//!
//! # Example
//!
//! ```ignore
//! use stm95_core::Eeprom;
//!
//! fn dump<T: stm95_core::Transport>(transport: T) -> stm95_core::Result<()> {
//!     let mut eeprom = Eeprom::new(transport);
//!     let mut buf = [0u8; 16];
//!     eeprom.read(0x0000, &mut buf, 0)?;
//!     eeprom.write_safe(0x0100, &buf, 0)?;
//!     Ok(())
//! }
//! ```

#![no_std]
#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

#[cfg(feature = "alloc")]
extern crate alloc;

#[cfg(any(test, feature = "std"))]
extern crate std;

pub mod device;
pub mod error;
pub mod protocol;
pub mod spi;
pub mod transport;

pub use device::Eeprom;
pub use error::{Error, Result};
pub use protocol::PollPolicy;
pub use spi::{Address, Command, Status, MAX_BURST_SIZE};
pub use transport::{FnTransport, Handle, Transport};
