//! EEPROM device wrapper
//!
//! [`Eeprom`] bundles a transport with the poll policy and exposes the
//! protocol functions as methods. It keeps no bus state between calls.

use crate::error::Result;
use crate::protocol::{self, PollPolicy};
use crate::spi::{Address, Status};
use crate::transport::{FnTransport, Handle, Transport};

/// An M95 EEPROM reached through a transport
///
/// Pass `&mut transport` to borrow a transport instead of moving it in.
/// Callers sharing one bus between threads must serialize access
/// themselves, e.g. with one mutex per bus.
pub struct Eeprom<T> {
    transport: T,
    poll: PollPolicy,
}

impl<C> Eeprom<FnTransport<C>> {
    /// Create a device from a callback handle
    ///
    /// Fails with [`crate::Error::InvalidHandle`] if a callback is missing.
    pub fn from_handle(handle: Handle<C>) -> Result<Self> {
        Ok(Self::new(handle.validate()?))
    }
}

impl<T: Transport> Eeprom<T> {
    /// Create a device that waits for writes without a poll limit
    pub fn new(transport: T) -> Self {
        Self {
            transport,
            poll: PollPolicy::UNBOUNDED,
        }
    }

    /// Set the busy-poll policy used by write operations
    pub fn with_poll_policy(mut self, poll: PollPolicy) -> Self {
        self.poll = poll;
        self
    }

    /// Get the busy-poll policy
    pub fn poll_policy(&self) -> PollPolicy {
        self.poll
    }

    /// Get a reference to the transport
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Get a mutable reference to the transport
    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    /// Consume the device and return the transport
    pub fn into_inner(self) -> T {
        self.transport
    }

    /// Read `buf.len()` bytes starting at `address`
    ///
    /// Bits 24..32 of `address` are ignored.
    pub fn read(&mut self, address: u32, buf: &mut [u8], cs: usize) -> Result<()> {
        protocol::read(&mut self.transport, Address::new(address), buf, cs)
    }

    /// Write a single burst and wait for the device to finish
    pub fn write(&mut self, address: u32, data: &[u8], cs: usize) -> Result<()> {
        protocol::write(&mut self.transport, Address::new(address), data, cs, self.poll)
    }

    /// Write any amount of data in bursts of [`crate::MAX_BURST_SIZE`]
    pub fn write_safe(&mut self, address: u32, data: &[u8], cs: usize) -> Result<()> {
        protocol::write_safe(&mut self.transport, Address::new(address), data, cs, self.poll)
    }

    /// Read the raw status register
    pub fn read_register(&mut self, cs: usize) -> Result<u8> {
        protocol::read_register(&mut self.transport, cs)
    }

    /// Write the raw status register
    pub fn write_register(&mut self, value: u8, cs: usize) -> Result<()> {
        protocol::write_register(&mut self.transport, value, cs)
    }

    /// Read and decode the status register
    pub fn read_status(&mut self, cs: usize) -> Result<Status> {
        protocol::read_status(&mut self.transport, cs)
    }

    /// Check if a write cycle is in progress
    pub fn is_busy(&mut self, cs: usize) -> Result<bool> {
        protocol::is_busy(&mut self.transport, cs)
    }

    /// Set the write enable latch
    pub fn write_latch_enable(&mut self, cs: usize) -> Result<()> {
        protocol::write_enable(&mut self.transport, cs)
    }

    /// Reset the write enable latch
    pub fn write_latch_disable(&mut self, cs: usize) -> Result<()> {
        protocol::write_disable(&mut self.transport, cs)
    }

    /// Block until the current write cycle finishes
    pub fn wait_write_complete(&mut self, cs: usize) -> Result<()> {
        protocol::wait_ready(&mut self.transport, cs, self.poll)
    }
}
