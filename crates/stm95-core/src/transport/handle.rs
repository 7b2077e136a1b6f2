//! Callback-based transport
//!
//! Some platforms hand out a driver context plus a set of plain functions
//! rather than a type implementing [`Transport`]. [`Handle`] collects those
//! functions and checks, once, that the set is complete.

use super::Transport;
use crate::error::{Error, Result};

/// Read callback: fill the buffer from the device
pub type ReadFn<C> = fn(&mut C, &mut [u8]) -> Result<()>;
/// Write callback: send the bytes to the device
pub type WriteFn<C> = fn(&mut C, &[u8]) -> Result<()>;
/// Chip-select callback: assert or deassert the given line
pub type SelectFn<C> = fn(&mut C, usize) -> Result<()>;

/// Unvalidated set of transport callbacks
///
/// # Example
///
/// ```ignore
/// let transport = Handle::new(bus)
///     .with_read(bus_read)
///     .with_write(bus_write)
///     .with_cs_enable(cs_low)
///     .with_cs_disable(cs_high)
///     .validate()?;
/// ```
pub struct Handle<C> {
    /// Driver state passed to every callback
    pub context: C,
    /// Read callback
    pub read: Option<ReadFn<C>>,
    /// Write callback
    pub write: Option<WriteFn<C>>,
    /// Chip-select assert callback
    pub cs_enable: Option<SelectFn<C>>,
    /// Chip-select deassert callback
    pub cs_disable: Option<SelectFn<C>>,
}

impl<C> Handle<C> {
    /// Create a handle with no callbacks set
    pub fn new(context: C) -> Self {
        Self {
            context,
            read: None,
            write: None,
            cs_enable: None,
            cs_disable: None,
        }
    }

    /// Set the read callback
    pub fn with_read(mut self, f: ReadFn<C>) -> Self {
        self.read = Some(f);
        self
    }

    /// Set the write callback
    pub fn with_write(mut self, f: WriteFn<C>) -> Self {
        self.write = Some(f);
        self
    }

    /// Set the chip-select assert callback
    pub fn with_cs_enable(mut self, f: SelectFn<C>) -> Self {
        self.cs_enable = Some(f);
        self
    }

    /// Set the chip-select deassert callback
    pub fn with_cs_disable(mut self, f: SelectFn<C>) -> Self {
        self.cs_disable = Some(f);
        self
    }

    /// Check that every callback is present
    ///
    /// Returns [`Error::InvalidHandle`] otherwise. No callback is invoked.
    pub fn validate(self) -> Result<FnTransport<C>> {
        match (self.read, self.write, self.cs_enable, self.cs_disable) {
            (Some(read), Some(write), Some(cs_enable), Some(cs_disable)) => Ok(FnTransport {
                context: self.context,
                read,
                write,
                cs_enable,
                cs_disable,
            }),
            _ => {
                log::debug!("stm95: transport handle is missing a callback");
                Err(Error::InvalidHandle)
            }
        }
    }
}

/// A validated [`Handle`]
pub struct FnTransport<C> {
    context: C,
    read: ReadFn<C>,
    write: WriteFn<C>,
    cs_enable: SelectFn<C>,
    cs_disable: SelectFn<C>,
}

impl<C> FnTransport<C> {
    /// Get a reference to the driver context
    pub fn context(&self) -> &C {
        &self.context
    }

    /// Consume the transport and return the driver context
    pub fn into_context(self) -> C {
        self.context
    }
}

impl<C> Transport for FnTransport<C> {
    type Error = Error;

    fn read(&mut self, buf: &mut [u8]) -> Result<()> {
        (self.read)(&mut self.context, buf)
    }

    fn write(&mut self, data: &[u8]) -> Result<()> {
        (self.write)(&mut self.context, data)
    }

    fn enable(&mut self, cs: usize) -> Result<()> {
        (self.cs_enable)(&mut self.context, cs)
    }

    fn disable(&mut self, cs: usize) -> Result<()> {
        (self.cs_disable)(&mut self.context, cs)
    }
}
