//! Transport trait definition

use core::fmt::Debug;

/// Byte-level bus access with explicit chip-select control
///
/// Implementations move bytes while a chip-select line is asserted. The
/// engine guarantees that every `enable` it issues is matched by a
/// `disable` before the public operation returns, so implementations may
/// buffer traffic between the two and flush on `disable`.
///
/// The chip-select index is opaque to the engine and passed through
/// unchanged.
pub trait Transport {
    /// Transport-specific error, logged by the engine before it is reported
    /// as [`crate::Error::Transfer`]
    type Error: Debug;

    /// Fill `buf` with bytes clocked in from the selected device
    fn read(&mut self, buf: &mut [u8]) -> Result<(), Self::Error>;

    /// Clock `data` out to the selected device
    fn write(&mut self, data: &[u8]) -> Result<(), Self::Error>;

    /// Assert chip-select `cs`
    fn enable(&mut self, cs: usize) -> Result<(), Self::Error>;

    /// Deassert chip-select `cs`
    fn disable(&mut self, cs: usize) -> Result<(), Self::Error>;

    /// Delay for the specified number of microseconds
    ///
    /// Only used between busy polls when a poll delay is configured.
    fn delay_us(&mut self, _us: u32) {}
}

impl<T: Transport + ?Sized> Transport for &mut T {
    type Error = T::Error;

    fn read(&mut self, buf: &mut [u8]) -> Result<(), Self::Error> {
        (**self).read(buf)
    }

    fn write(&mut self, data: &[u8]) -> Result<(), Self::Error> {
        (**self).write(data)
    }

    fn enable(&mut self, cs: usize) -> Result<(), Self::Error> {
        (**self).enable(cs)
    }

    fn disable(&mut self, cs: usize) -> Result<(), Self::Error> {
        (**self).disable(cs)
    }

    fn delay_us(&mut self, us: u32) {
        (**self).delay_us(us)
    }
}

#[cfg(feature = "alloc")]
impl<T: Transport + ?Sized> Transport for alloc::boxed::Box<T> {
    type Error = T::Error;

    fn read(&mut self, buf: &mut [u8]) -> Result<(), Self::Error> {
        (**self).read(buf)
    }

    fn write(&mut self, data: &[u8]) -> Result<(), Self::Error> {
        (**self).write(data)
    }

    fn enable(&mut self, cs: usize) -> Result<(), Self::Error> {
        (**self).enable(cs)
    }

    fn disable(&mut self, cs: usize) -> Result<(), Self::Error> {
        (**self).disable(cs)
    }

    fn delay_us(&mut self, us: u32) {
        (**self).delay_us(us)
    }
}
